//! Process wide defaults.
//!
//! Values come from the environment (a `.env` file is loaded by the binary)
//! and can be overridden one by one with the builder methods.

use log::{debug, warn};
use std::env;
use std::path::{Path, PathBuf};

use crate::{
    context::Orientation, error::Error, fonts::FontCatalog, labels::LabelTable, model::Model,
};

#[derive(Debug, Clone)]
pub struct Settings {
    default_font_family: String,
    default_font_style: String,
    default_label_size: String,
    default_orientation: Orientation,
    font_folder: Option<PathBuf>,
    printer: String,
    model: Model,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl Settings {
    pub fn new() -> Self {
        Settings {
            default_font_family: "DejaVu Sans".to_string(),
            default_font_style: "Book".to_string(),
            default_label_size: "62".to_string(),
            default_orientation: Orientation::Standard,
            font_folder: None,
            printer: "file:///dev/usb/lp0".to_string(),
            model: Model::QL500,
        }
    }

    /// Defaults overridden by `QL_*` environment variables.
    pub fn from_env() -> Result<Self, Error> {
        let mut settings = Self::new();
        if let Ok(family) = env::var("QL_DEFAULT_FONT_FAMILY") {
            settings.default_font_family = family;
        }
        if let Ok(style) = env::var("QL_DEFAULT_FONT_STYLE") {
            settings.default_font_style = style;
        }
        if let Ok(size) = env::var("QL_DEFAULT_LABEL_SIZE") {
            settings.default_label_size = size;
        }
        if let Ok(orientation) = env::var("QL_DEFAULT_ORIENTATION") {
            settings.default_orientation = orientation.parse()?;
        }
        if let Ok(folder) = env::var("QL_FONT_FOLDER") {
            settings.font_folder = Some(PathBuf::from(folder));
        }
        if let Ok(printer) = env::var("QL_PRINTER") {
            settings.printer = printer;
        }
        if let Ok(model) = env::var("QL_MODEL") {
            settings.model = model.parse()?;
        }
        debug!("{:?}", settings);
        Ok(settings)
    }

    pub fn default_font(self, family: impl Into<String>, style: impl Into<String>) -> Self {
        Settings {
            default_font_family: family.into(),
            default_font_style: style.into(),
            ..self
        }
    }

    pub fn default_label_size(&self) -> &str {
        &self.default_label_size
    }

    pub fn with_default_label_size(self, size: impl Into<String>) -> Self {
        Settings {
            default_label_size: size.into(),
            ..self
        }
    }

    pub fn default_orientation(&self) -> Orientation {
        self.default_orientation
    }

    pub fn with_default_orientation(self, orientation: Orientation) -> Self {
        Settings {
            default_orientation: orientation,
            ..self
        }
    }

    pub fn default_font_family(&self) -> &str {
        &self.default_font_family
    }

    pub fn default_font_style(&self) -> &str {
        &self.default_font_style
    }

    pub fn font_folder(&self) -> Option<&Path> {
        self.font_folder.as_deref()
    }

    pub fn with_font_folder(self, folder: impl Into<PathBuf>) -> Self {
        Settings {
            font_folder: Some(folder.into()),
            ..self
        }
    }

    pub fn printer(&self) -> &str {
        &self.printer
    }

    pub fn with_printer(self, printer: impl Into<String>) -> Self {
        Settings {
            printer: printer.into(),
            ..self
        }
    }

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn with_model(self, model: Model) -> Self {
        Settings { model, ..self }
    }

    /// The default label size must exist in `labels`.
    pub fn validate(&self, labels: &LabelTable) -> Result<(), Error> {
        if labels.get(&self.default_label_size).is_none() {
            return Err(Error::UnknownLabelSize(self.default_label_size.clone()));
        }
        Ok(())
    }

    /// Replace a default font missing from `fonts` by the first font available.
    pub fn fallback_font(self, fonts: &FontCatalog) -> Result<Self, Error> {
        if fonts
            .get(&self.default_font_family, &self.default_font_style)
            .is_some()
        {
            return Ok(self);
        }
        let fallback = fonts.families().find_map(|family| {
            fonts
                .styles(family)
                .next()
                .map(|style| (family.to_string(), style.to_string()))
        });
        match fallback {
            Some((family, style)) => {
                warn!(
                    "Could not find the default font {} ({}), using {} ({})",
                    self.default_font_family, self.default_font_style, family, style
                );
                Ok(self.default_font(family, style))
            }
            None => Err(Error::FontNotFound {
                family: self.default_font_family,
                style: self.default_font_style,
            }),
        }
    }
}
