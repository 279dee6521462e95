//! Glyph measurement and drawing.
//!
//! Layout only needs a handful of metrics from a font, so the engine talks to
//! fonts through the [`FontFace`] trait. [`TrueTypeFace`] implements it on
//! top of `rusttype`.

use log::debug;
use rusttype::{point, Font, Scale};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;

/// Vertical font metrics at the face's pixel size.
///
/// `descent` is negative for fonts that extend below the baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VMetrics {
    pub ascent: f32,
    pub descent: f32,
    pub line_gap: f32,
}

/// Horizontal advance and inked rows of a single line of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineExtent {
    pub width: i32,
    /// Topmost and bottommost inked rows relative to the baseline, `None`
    /// when the line has no visible glyphs.
    pub ink: Option<(i32, i32)>,
}

pub trait FontFace {
    fn v_metrics(&self) -> VMetrics;

    fn measure_line(&self, line: &str) -> LineExtent;

    /// Draw `line` with its pen starting at `x` on `baseline`.
    ///
    /// `plot` receives absolute pixel coordinates and a coverage in `0.0..=1.0`.
    fn draw_line(&self, line: &str, x: f32, baseline: f32, plot: &mut dyn FnMut(i32, i32, f32));
}

/// A TrueType or OpenType font at a fixed pixel size.
pub struct TrueTypeFace {
    font: Font<'static>,
    scale: Scale,
}

impl TrueTypeFace {
    pub fn open(path: impl AsRef<Path>, size: u32) -> Result<Self, Error> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        debug!("Loaded {} bytes of font data from {:?}", data.len(), path);
        Self::from_bytes(data, size, path)
    }

    /// `origin` only names the font in the error.
    pub fn from_bytes(data: Vec<u8>, size: u32, origin: impl Into<PathBuf>) -> Result<Self, Error> {
        match Font::try_from_vec(data) {
            Some(font) => Ok(TrueTypeFace {
                font,
                scale: Scale::uniform(size as f32),
            }),
            None => Err(Error::Rasterization {
                path: origin.into(),
            }),
        }
    }
}

impl FontFace for TrueTypeFace {
    fn v_metrics(&self) -> VMetrics {
        let v = self.font.v_metrics(self.scale);
        VMetrics {
            ascent: v.ascent,
            descent: v.descent,
            line_gap: v.line_gap,
        }
    }

    fn measure_line(&self, line: &str) -> LineExtent {
        let mut advance: f32 = 0.0;
        let mut ink: Option<(i32, i32)> = None;

        for glyph in self.font.layout(line, self.scale, point(0.0, 0.0)) {
            advance = glyph.position().x + glyph.unpositioned().h_metrics().advance_width;
            if let Some(bb) = glyph.pixel_bounding_box() {
                ink = Some(match ink {
                    Some((top, bottom)) => (top.min(bb.min.y), bottom.max(bb.max.y)),
                    None => (bb.min.y, bb.max.y),
                });
            }
        }

        LineExtent {
            width: advance.ceil() as i32,
            ink,
        }
    }

    fn draw_line(&self, line: &str, x: f32, baseline: f32, plot: &mut dyn FnMut(i32, i32, f32)) {
        for glyph in self.font.layout(line, self.scale, point(x, baseline)) {
            if let Some(bb) = glyph.pixel_bounding_box() {
                glyph.draw(|gx, gy, v| plot(bb.min.x + gx as i32, bb.min.y + gy as i32, v));
            }
        }
    }
}
