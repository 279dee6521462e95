//! Brother QL text labels
//!
//! This crate lays out and rasterizes text for Brother QL series label
//! printers, encodes the result as raster commands and sends it to the
//! printer.
//!
//! # Example
//!
//! ```rust,no_run
//! use ql_label::{render_label, resolve, FontCatalog, LabelTable, RenderRequest, Settings};
//!
//! let fonts = FontCatalog::system();
//! let labels = LabelTable::builtin();
//! let settings = Settings::new();
//!
//! let request = RenderRequest::new("Hello\nWorld").with_combined_font("DejaVu Sans (Bold)");
//! let context = resolve(&request, &fonts, &labels, &settings).unwrap();
//! let label = render_label(&context).unwrap();
//! label.image.save("label.png").unwrap();
//! ```

mod config;
mod context;
mod encoder;
mod error;
mod font;
mod fonts;
mod labels;
mod layout;
mod model;
mod raster;
mod request;
pub mod transport;

#[cfg(test)]
mod testing;

use image::RgbImage;
use log::debug;

pub use crate::{
    config::Settings,
    context::{
        baseline_canvas, resolve, Align, MarginFractions, Margins, Orientation, RenderContext,
        BLACK, RED,
    },
    encoder::{encode, PrintOptions, Rotate},
    error::{Error, PrinterError},
    font::{FontFace, LineExtent, TrueTypeFace, VMetrics},
    fonts::FontCatalog,
    labels::{LabelClass, LabelSpec, LabelTable},
    layout::{
        canvas_size, layout_lines, measure, normalize_text, place, CanvasSize, Offset,
        PositionedLine, TextBlock,
    },
    model::Model,
    raster::rasterize,
    request::{split_font_family, RenderRequest},
};

/// Print head width in pins for the 62mm class printers (QL-500 to QL-820NWB).
pub const NORMAL_PRINTER_WIDTH: u32 = 720;

/// Print head width in pins for the wide QL-1000 series.
pub const WIDE_PRINTER_WIDTH: u32 = 1296;

/// A finished label bitmap and what the encoder needs to print it.
#[derive(Debug, Clone)]
pub struct RenderedLabel {
    pub image: RgbImage,
    pub label: LabelSpec,
    pub red: bool,
    pub threshold: u8,
    pub rotate: Rotate,
    /// `false` when the request had no text, such a label can be previewed but not printed.
    pub has_text: bool,
}

impl RenderedLabel {
    /// Encoder settings matching this label.
    pub fn print_options(&self) -> PrintOptions {
        PrintOptions::default()
            .red(self.red)
            .threshold(self.threshold)
            .rotate(self.rotate)
    }

    /// Encode the label as a print job, refusing labels without text.
    pub fn encode(&self, model: Model, options: PrintOptions) -> Result<Vec<u8>, Error> {
        if !self.has_text {
            return Err(Error::MissingText);
        }
        encode(&self.image, &self.label, model, &options)
    }
}

/// Render `ctx` with the font file it names.
pub fn render_label(ctx: &RenderContext) -> Result<RenderedLabel, Error> {
    let face = TrueTypeFace::open(&ctx.font_path, ctx.font_size)?;
    Ok(render_with_face(ctx, &face))
}

/// Measure, size, place and draw the text of `ctx` with `face`.
pub fn render_with_face(ctx: &RenderContext, face: &dyn FontFace) -> RenderedLabel {
    let text = ctx.text.as_deref().unwrap_or("");
    let (lines, block) = layout_lines(face, text, ctx.align);
    let size = canvas_size(ctx, &block);
    let offset = place(size, &block, ctx.orientation, ctx.label.class, &ctx.margins);
    let image = rasterize(face, &lines, size, offset, ctx.fill_color);
    debug!(
        "Rendered {}x{} label {} for {:?}",
        image.width(),
        image.height(),
        ctx.label.id,
        block
    );

    RenderedLabel {
        image,
        label: ctx.label.clone(),
        red: ctx.is_red(),
        threshold: ctx.threshold,
        rotate: Rotate::for_label(ctx.label.class, ctx.orientation),
        has_text: ctx.text.is_some(),
    }
}
