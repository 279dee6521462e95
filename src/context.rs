//! Resolution of raw request parameters into a [`RenderContext`].
//!
//! Parsing is permissive: a numeric field that does not parse falls back to
//! its default with a warning instead of failing the request. Only an unknown
//! font or label size is an error.

use image::Rgb;
use log::{debug, warn};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::{
    config::Settings,
    error::Error,
    fonts::FontCatalog,
    labels::{LabelSpec, LabelTable},
    request::RenderRequest,
};

pub const DEFAULT_FONT_SIZE: u32 = 100;
/// Largest accepted font size, above the longest printable edge of any stock.
pub const MAX_FONT_SIZE: u32 = 2000;
pub const DEFAULT_MARGIN: i32 = 10;
pub const DEFAULT_THRESHOLD: u8 = 70;

pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
pub const RED: Rgb<u8> = Rgb([255, 0, 0]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Standard,
    Rotated,
}

impl FromStr for Orientation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "rotated" => Ok(Self::Rotated),
            _ => Err(Error::InvalidConfig(format!("unknown orientation {:?}", s))),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => f.write_str("standard"),
            Self::Rotated => f.write_str("rotated"),
        }
    }
}

/// Horizontal alignment of each line inside the text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

impl FromStr for Align {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "center" => Ok(Self::Center),
            "right" => Ok(Self::Right),
            _ => Err(Error::InvalidConfig(format!("unknown alignment {:?}", s))),
        }
    }
}

/// Margins as fractions of the font size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarginFractions {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Default for MarginFractions {
    fn default() -> Self {
        MarginFractions {
            top: 0.24,
            bottom: 0.45,
            left: 0.35,
            right: 0.35,
        }
    }
}

/// Margins in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Margins {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl Margins {
    /// Pixel margins for `font_size`, truncated toward zero.
    pub fn from_fractions(font_size: u32, fractions: &MarginFractions) -> Self {
        let px = |fraction: f64| (font_size as f64 * fraction) as u32;
        Margins {
            top: px(fractions.top),
            bottom: px(fractions.bottom),
            left: px(fractions.left),
            right: px(fractions.right),
        }
    }
}

/// Everything needed to lay out and draw one label.
///
/// `canvas_width` and `canvas_height` hold the fixed stock dimensions after
/// the orientation swap. For continuous tape one of them is replaced by the
/// canvas sizer.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderContext {
    pub text: Option<String>,
    pub font_family: String,
    pub font_style: String,
    pub font_path: PathBuf,
    pub font_size: u32,
    pub label: LabelSpec,
    pub orientation: Orientation,
    pub margins: Margins,
    pub align: Align,
    pub fill_color: Rgb<u8>,
    pub threshold: u8,
    /// Carried for compatibility only, never used for layout.
    pub legacy_margin: i32,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl RenderContext {
    pub fn is_red(&self) -> bool {
        self.fill_color == RED
    }
}

/// Baseline canvas for a label: landscape first, then swapped once more when rotated.
pub fn baseline_canvas(label: &LabelSpec, orientation: Orientation) -> (u32, u32) {
    let (mut width, mut height) = (label.printable_width, label.printable_height);
    if height > width {
        std::mem::swap(&mut width, &mut height);
    }
    if orientation == Orientation::Rotated {
        std::mem::swap(&mut width, &mut height);
    }
    (width, height)
}

pub fn resolve(
    request: &RenderRequest,
    fonts: &FontCatalog,
    labels: &LabelTable,
    settings: &Settings,
) -> Result<RenderContext, Error> {
    let (font_family, font_style) = match (&request.font_family, &request.font_style) {
        (Some(family), Some(style)) if !family.is_empty() && !style.is_empty() => {
            (family.clone(), style.clone())
        }
        _ => (
            settings.default_font_family().to_string(),
            settings.default_font_style().to_string(),
        ),
    };
    let font_path = fonts
        .get(&font_family, &font_style)
        .map(|path| path.to_path_buf())
        .ok_or_else(|| Error::FontNotFound {
            family: font_family.clone(),
            style: font_style.clone(),
        })?;

    let label_size = request
        .label_size
        .as_deref()
        .unwrap_or_else(|| settings.default_label_size());
    let label = labels
        .get(label_size)
        .cloned()
        .ok_or_else(|| Error::UnknownLabelSize(label_size.to_string()))?;

    let font_size = match parse_or("font_size", &request.font_size, DEFAULT_FONT_SIZE) {
        size if size == 0 || size > MAX_FONT_SIZE => {
            warn!(
                "font_size must be between 1 and {}, using {}",
                MAX_FONT_SIZE, DEFAULT_FONT_SIZE
            );
            DEFAULT_FONT_SIZE
        }
        size => size,
    };
    let legacy_margin = parse_or("margin", &request.margin, DEFAULT_MARGIN);
    let threshold = parse_or("threshold", &request.threshold, DEFAULT_THRESHOLD as i64)
        .max(0)
        .min(100) as u8;

    let defaults = MarginFractions::default();
    let fractions = MarginFractions {
        top: percent_or("margin_top", &request.margin_top, defaults.top),
        bottom: percent_or("margin_bottom", &request.margin_bottom, defaults.bottom),
        left: percent_or("margin_left", &request.margin_left, defaults.left),
        right: percent_or("margin_right", &request.margin_right, defaults.right),
    };
    let margins = Margins::from_fractions(font_size, &fractions);

    let align = parse_or("align", &request.align, Align::Center);
    let orientation = parse_or(
        "orientation",
        &request.orientation,
        settings.default_orientation(),
    );

    let fill_color = if label.is_red() { RED } else { BLACK };
    let (canvas_width, canvas_height) = baseline_canvas(&label, orientation);

    let context = RenderContext {
        text: request.text.clone(),
        font_family,
        font_style,
        font_path,
        font_size,
        label,
        orientation,
        margins,
        align,
        fill_color,
        threshold,
        legacy_margin,
        canvas_width,
        canvas_height,
    };
    debug!("Resolved render context: {:?}", context);
    Ok(context)
}

fn parse_or<T: FromStr>(field: &str, value: &Option<String>, default: T) -> T {
    match value {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("Invalid value {:?} for {}, using the default", raw, field);
                default
            }
        },
        None => default,
    }
}

/// A percentage of the font size as a fraction, defaulting on negative or non-finite input.
fn percent_or(field: &str, value: &Option<String>, default: f64) -> f64 {
    let percent: f64 = parse_or(field, value, default * 100.0);
    if percent.is_finite() && percent >= 0.0 {
        percent / 100.0
    } else {
        warn!("Invalid value {:?} for {}, using the default", value, field);
        default
    }
}
