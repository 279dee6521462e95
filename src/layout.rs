//! Text measurement, canvas sizing and text placement.

use log::debug;

use crate::{
    context::{Align, Margins, Orientation, RenderContext},
    font::FontFace,
    labels::LabelClass,
};

/// Extra pixels between consecutive lines.
pub const LINE_SPACING: i32 = 4;

/// Bounding box of the whole text block relative to the drawing origin.
///
/// `top` and `left` can be negative when glyphs overshoot the ascent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextBlock {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl TextBlock {
    pub fn width(&self) -> i32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> i32 {
        self.bottom.saturating_sub(self.top)
    }
}

/// One line of the block, positioned relative to the drawing origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionedLine {
    pub text: String,
    pub x: i32,
    pub baseline: i32,
}

/// Final canvas dimensions, never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

/// Where the drawing origin of the text block goes on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offset {
    pub x: i32,
    pub y: i32,
}

/// Replace every empty line by a single space so that it still has height.
pub fn normalize_text(text: &str) -> String {
    text.split('\n')
        .map(|line| if line.is_empty() { " " } else { line })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Position every line of `text` and compute the enclosing block.
///
/// `text` is normalized first. Lines are aligned against the widest one.
pub fn layout_lines(face: &dyn FontFace, text: &str, align: Align) -> (Vec<PositionedLine>, TextBlock) {
    let text = normalize_text(text);
    let metrics = face.v_metrics();
    let ascent = metrics.ascent.round() as i32;
    let descent = metrics.descent.round() as i32;
    // Metrics are saturated into i32 and combined without overflow for any face.
    let line_advance =
        ((metrics.ascent - metrics.descent + metrics.line_gap).round() as i32).saturating_add(LINE_SPACING);

    let extents: Vec<_> = text.split('\n').map(|line| face.measure_line(line)).collect();
    let block_width = extents.iter().map(|extent| extent.width).max().unwrap_or(0);

    let mut lines = Vec::with_capacity(extents.len());
    let mut block: Option<TextBlock> = None;

    for (index, (line, extent)) in text.split('\n').zip(extents.iter()).enumerate() {
        let x = match align {
            Align::Left => 0,
            Align::Center => (block_width - extent.width) / 2,
            Align::Right => block_width - extent.width,
        };
        let baseline = ascent.saturating_add((index as i32).saturating_mul(line_advance));
        let (ink_top, ink_bottom) = extent.ink.unwrap_or((-ascent, -descent));
        let line_box = TextBlock {
            left: x,
            top: baseline.saturating_add(ink_top),
            right: x.saturating_add(extent.width),
            bottom: baseline.saturating_add(ink_bottom),
        };
        block = Some(match block {
            Some(b) => TextBlock {
                left: b.left.min(line_box.left),
                top: b.top.min(line_box.top),
                right: b.right.max(line_box.right),
                bottom: b.bottom.max(line_box.bottom),
            },
            None => line_box,
        });
        lines.push(PositionedLine {
            text: line.to_string(),
            x,
            baseline,
        });
    }

    // split always yields at least one line
    let block = block.unwrap_or(TextBlock {
        left: 0,
        top: 0,
        right: 0,
        bottom: ascent.saturating_sub(descent),
    });
    (lines, block)
}

pub fn measure(face: &dyn FontFace, text: &str, align: Align) -> TextBlock {
    layout_lines(face, text, align).1
}

/// Canvas dimensions for `block`.
///
/// Fixed stock keeps the context's baseline canvas. Continuous tape grows
/// along the feed axis: the height in standard orientation, the width when
/// rotated.
pub fn canvas_size(ctx: &RenderContext, block: &TextBlock) -> CanvasSize {
    let (mut width, mut height) = (ctx.canvas_width as i64, ctx.canvas_height as i64);
    let margins = &ctx.margins;

    if ctx.label.class == LabelClass::Continuous {
        match ctx.orientation {
            Orientation::Standard => {
                height = block.bottom as i64 + margins.top as i64 + margins.bottom as i64
            }
            Orientation::Rotated => {
                width = block.right as i64 + margins.left as i64 + margins.right as i64
            }
        }
    }

    let size = CanvasSize {
        width: clamp_dimension(width),
        height: clamp_dimension(height),
    };
    debug!("Canvas size for label {}: {:?}", ctx.label.id, size);
    size
}

fn clamp_dimension(value: i64) -> u32 {
    value.max(1).min(u32::MAX as i64) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AxisRule {
    /// Centre the block on the axis.
    Center,
    /// Centre, then shift by half the difference of the leading and trailing margins.
    CenterBiased,
    /// Start right after the leading margin.
    LeadingMargin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Placement {
    horizontal: AxisRule,
    vertical: AxisRule,
}

/// Placement rules keyed by orientation and label class.
fn placement(orientation: Orientation, class: LabelClass) -> Placement {
    use AxisRule::*;
    use LabelClass::*;
    use Orientation::*;

    match (orientation, class) {
        (Standard, DieCut) | (Standard, RoundDieCut) => Placement {
            horizontal: Center,
            vertical: CenterBiased,
        },
        (Standard, Continuous) => Placement {
            horizontal: Center,
            vertical: LeadingMargin,
        },
        (Rotated, DieCut) | (Rotated, RoundDieCut) => Placement {
            horizontal: Center,
            vertical: CenterBiased,
        },
        // Unlike standard continuous tape, the cross-feed axis is centred.
        (Rotated, Continuous) => Placement {
            horizontal: LeadingMargin,
            vertical: CenterBiased,
        },
    }
}

fn axis_offset(rule: AxisRule, canvas: u32, extent: i32, leading: u32, trailing: u32) -> i32 {
    let centered = (canvas as i32 - extent) / 2;
    let offset = match rule {
        AxisRule::Center => centered,
        AxisRule::CenterBiased => centered + (leading as i32 - trailing as i32) / 2,
        AxisRule::LeadingMargin => leading as i32,
    };
    offset.max(0)
}

/// Offset of the drawing origin of `block` on a canvas of `size`.
///
/// Both coordinates are clamped to zero, a block larger than the canvas is
/// clipped on the right and bottom.
pub fn place(
    size: CanvasSize,
    block: &TextBlock,
    orientation: Orientation,
    class: LabelClass,
    margins: &Margins,
) -> Offset {
    let rule = placement(orientation, class);
    let offset = Offset {
        x: axis_offset(
            rule.horizontal,
            size.width,
            block.width(),
            margins.left,
            margins.right,
        ),
        y: axis_offset(
            rule.vertical,
            size.height,
            block.height(),
            margins.top,
            margins.bottom,
        ),
    };
    debug!("Text offset {:?} for {:?} on {:?}", offset, block, size);
    offset
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Settings,
        context::resolve,
        font::{LineExtent, VMetrics},
        fonts::FontCatalog,
        labels::LabelTable,
        request::RenderRequest,
        testing::BlockFace,
    };

    const NO_MARGINS: Margins = Margins {
        top: 0,
        bottom: 0,
        left: 0,
        right: 0,
    };

    fn context(label: &str, orientation: &str) -> RenderContext {
        let mut fonts = FontCatalog::new();
        fonts.insert("DejaVu Sans", "Book", "/fonts/DejaVuSans.ttf");
        let request = RenderRequest {
            label_size: Some(label.to_string()),
            orientation: Some(orientation.to_string()),
            ..RenderRequest::default()
        };
        resolve(&request, &fonts, &LabelTable::builtin(), &Settings::new()).unwrap()
    }

    #[test]
    fn normalizes_empty_lines() {
        assert_eq!(normalize_text(""), " ");
        assert_eq!(normalize_text("a\n\nb\n"), "a\n \nb\n ");
        assert_eq!(normalize_text("a b"), "a b");
    }

    #[test]
    fn measures_multi_line_block() {
        let face = BlockFace::new(100);
        let (lines, block) = layout_lines(&face, "Hello\nWorld", Align::Center);
        // advance 50, ascent 80, line advance 80 + 20 + 4
        assert_eq!(lines[0].baseline, 80);
        assert_eq!(lines[1].baseline, 184);
        assert_eq!(
            block,
            TextBlock {
                left: 0,
                top: 10,
                right: 250,
                bottom: 184
            }
        );
    }

    struct HugeFace;

    impl FontFace for HugeFace {
        fn v_metrics(&self) -> VMetrics {
            VMetrics {
                ascent: 1.2e9,
                descent: -3.0e8,
                line_gap: 0.0,
            }
        }

        fn measure_line(&self, line: &str) -> LineExtent {
            LineExtent {
                width: line.chars().count() as i32 * 1_000_000_000,
                ink: Some((-1_100_000_000, 200_000_000)),
            }
        }

        fn draw_line(&self, _: &str, _: f32, _: f32, _: &mut dyn FnMut(i32, i32, f32)) {}
    }

    #[test]
    fn enormous_metrics_saturate() {
        let (lines, block) = layout_lines(&HugeFace, "a\nb", Align::Center);
        assert_eq!(lines[0].baseline, 1_200_000_000);
        assert_eq!(lines[1].baseline, i32::MAX);
        assert_eq!(block.bottom, i32::MAX);
        assert_eq!(block.right, 1_000_000_000);
        assert!(block.height() > 0);
    }

    #[test]
    fn aligns_lines_against_widest() {
        let face = BlockFace::new(100);
        let xs = |align| {
            layout_lines(&face, "abcd\nab", align)
                .0
                .iter()
                .map(|line| line.x)
                .collect::<Vec<_>>()
        };
        assert_eq!(xs(Align::Left), vec![0, 0]);
        assert_eq!(xs(Align::Center), vec![0, 50]);
        assert_eq!(xs(Align::Right), vec![0, 100]);
    }

    #[test]
    fn blank_text_still_has_height() {
        let face = BlockFace::new(100);
        let block = measure(&face, "", Align::Center);
        // a lone space: nominal line from the ascent to the descent
        assert_eq!(block.top, 0);
        assert_eq!(block.bottom, 100);
        assert_eq!(block.width(), 50);

        let block = measure(&face, "\n\n", Align::Left);
        assert_eq!(block.bottom, 80 + 2 * 104 + 20);
    }

    #[test]
    fn continuous_standard_grows_height() {
        let face = BlockFace::new(100);
        let ctx = context("62", "standard");
        for text in &["Hello\nWorld", "x", "", "a much longer single line of text"] {
            let block = measure(&face, text, ctx.align);
            let size = canvas_size(&ctx, &block);
            assert_eq!(size.width, 696);
            assert_eq!(size.height as i32, block.bottom + 24 + 45);
        }
    }

    #[test]
    fn continuous_rotated_grows_width() {
        let face = BlockFace::new(100);
        let ctx = context("29", "rotated");
        let block = measure(&face, "Hello", ctx.align);
        let size = canvas_size(&ctx, &block);
        assert_eq!(size.height, 306);
        assert_eq!(size.width as i32, 250 + 35 + 35);
    }

    #[test]
    fn fixed_stock_ignores_content() {
        let face = BlockFace::new(100);
        for label in LabelTable::builtin().iter().filter(|l| l.class.is_fixed()) {
            for orientation in &["standard", "rotated"] {
                let ctx = context(label.id, orientation);
                for text in &["", "Hi", "a\nvery\nlong\nlabel text that overflows"] {
                    let size = canvas_size(&ctx, &measure(&face, text, Align::Center));
                    assert_eq!((size.width, size.height), (ctx.canvas_width, ctx.canvas_height));
                }
            }
        }
    }

    #[test]
    fn canvas_is_never_degenerate() {
        let mut ctx = context("62", "standard");
        ctx.margins = NO_MARGINS;
        let block = TextBlock {
            left: 0,
            top: -5,
            right: 0,
            bottom: -3,
        };
        let size = canvas_size(&ctx, &block);
        assert_eq!(size, CanvasSize { width: 696, height: 1 });
    }

    #[test]
    fn placement_table() {
        let margins = Margins {
            top: 24,
            bottom: 45,
            left: 35,
            right: 35,
        };
        let size = CanvasSize {
            width: 1000,
            height: 400,
        };
        let block = TextBlock {
            left: 0,
            top: 10,
            right: 250,
            bottom: 110,
        };
        let at = |orientation, class| place(size, &block, orientation, class, &margins);

        // (400 - 100) / 2 + (24 - 45) / 2 = 150 - 10
        for class in &[LabelClass::DieCut, LabelClass::RoundDieCut] {
            assert_eq!(at(Orientation::Standard, *class), Offset { x: 375, y: 140 });
            assert_eq!(at(Orientation::Rotated, *class), Offset { x: 375, y: 140 });
        }
        assert_eq!(
            at(Orientation::Standard, LabelClass::Continuous),
            Offset { x: 375, y: 24 }
        );
        assert_eq!(
            at(Orientation::Rotated, LabelClass::Continuous),
            Offset { x: 35, y: 140 }
        );
    }

    #[test]
    fn oversized_block_is_clamped_to_origin() {
        let size = CanvasSize {
            width: 100,
            height: 50,
        };
        let block = TextBlock {
            left: 0,
            top: 0,
            right: 400,
            bottom: 300,
        };
        for orientation in &[Orientation::Standard, Orientation::Rotated] {
            for class in &[
                LabelClass::Continuous,
                LabelClass::DieCut,
                LabelClass::RoundDieCut,
            ] {
                let offset = place(size, &block, *orientation, *class, &NO_MARGINS);
                assert!(offset.x >= 0 && offset.y >= 0);
            }
        }
        let biased = Margins {
            top: 0,
            bottom: 90,
            ..NO_MARGINS
        };
        let offset = place(size, &block, Orientation::Standard, LabelClass::DieCut, &biased);
        assert_eq!(offset, Offset { x: 0, y: 0 });
    }
}
