//! Drawing the text block onto the label canvas.

use image::{Rgb, RgbImage};

use crate::{
    font::FontFace,
    layout::{CanvasSize, Offset, PositionedLine},
};

pub const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Draw `lines` onto a white canvas of `size`, shifted by `offset`.
///
/// Glyph coverage is blended from white toward `fill`. Anything falling
/// outside the canvas is clipped.
pub fn rasterize(
    face: &dyn FontFace,
    lines: &[PositionedLine],
    size: CanvasSize,
    offset: Offset,
    fill: Rgb<u8>,
) -> RgbImage {
    let mut image = RgbImage::from_pixel(size.width, size.height, BACKGROUND);
    let (width, height) = (size.width as i32, size.height as i32);

    for line in lines {
        let x = (offset.x + line.x) as f32;
        let baseline = (offset.y + line.baseline) as f32;
        face.draw_line(&line.text, x, baseline, &mut |px, py, coverage| {
            if px < 0 || py < 0 || px >= width || py >= height {
                return;
            }
            let coverage = coverage.max(0.0).min(1.0);
            if coverage == 0.0 {
                return;
            }
            let dst = image.get_pixel_mut(px as u32, py as u32);
            for channel in 0..3 {
                let current = dst.0[channel] as f32;
                let target = fill.0[channel] as f32;
                dst.0[channel] = (current + (target - current) * coverage).round() as u8;
            }
        });
    }

    image
}
