//! Synthetic font used by the unit tests.

use crate::font::{FontFace, LineExtent, VMetrics};

/// Every visible character is a solid box, spaces are blank.
///
/// With a size of 100: advance 50, ascent 80, descent -20, ink from 70
/// above the baseline down to the baseline.
pub(crate) struct BlockFace {
    size: i32,
}

impl BlockFace {
    pub(crate) fn new(size: u32) -> Self {
        BlockFace { size: size as i32 }
    }

    fn advance(&self) -> i32 {
        self.size / 2
    }

    fn ink_height(&self) -> i32 {
        self.size * 7 / 10
    }
}

impl FontFace for BlockFace {
    fn v_metrics(&self) -> VMetrics {
        VMetrics {
            ascent: (self.size * 4 / 5) as f32,
            descent: -(self.size / 5) as f32,
            line_gap: 0.0,
        }
    }

    fn measure_line(&self, line: &str) -> LineExtent {
        let width = line.chars().count() as i32 * self.advance();
        let ink = if line.chars().any(|c| !c.is_whitespace()) {
            Some((-self.ink_height(), 0))
        } else {
            None
        };
        LineExtent { width, ink }
    }

    fn draw_line(&self, line: &str, x: f32, baseline: f32, plot: &mut dyn FnMut(i32, i32, f32)) {
        let x = x.round() as i32;
        let baseline = baseline.round() as i32;
        for (i, c) in line.chars().enumerate() {
            if c.is_whitespace() {
                continue;
            }
            let left = x + i as i32 * self.advance();
            for py in baseline - self.ink_height()..baseline {
                for px in left..left + self.advance() {
                    plot(px, py, 1.0);
                }
            }
        }
    }
}
