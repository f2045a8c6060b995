use image::{Rgba, RgbaImage};

use crate::canvas::{PixelBuffer, PixelRect, Point};

use super::{CircularMask, RegionOperator, SkipReason, StepOutcome};

/// Upper bound on the side of the square sampled for the fill color.
pub const FILL_SAMPLE_CAP: u32 = 50;

/// Paint a flat, opaque disc in the average color of the surroundings.
///
/// The sample square is twice the brush diameter (capped), so a disc that
/// was just painted doesn't dominate the next sample. Sampling happens
/// before any pixel of the disc is written.
#[derive(Clone, Copy, Debug)]
pub struct AverageFill {
    pub max_sample: u32,
}

impl Default for AverageFill {
    fn default() -> Self {
        Self {
            max_sample: FILL_SAMPLE_CAP,
        }
    }
}

impl AverageFill {
    pub fn sample_side(&self, diameter: u32) -> u32 {
        diameter.saturating_mul(2).min(self.max_sample).max(1)
    }
}

impl RegionOperator for AverageFill {
    fn name(&self) -> &'static str {
        "fill"
    }

    fn apply(&self, target: &mut PixelBuffer, center: Point, mask: &CircularMask) -> StepOutcome {
        let sample_rect = PixelRect::centered_square(center, self.sample_side(mask.diameter()));
        let Some((_, sample)) = target.get_region_clipped(sample_rect) else {
            return StepOutcome::Skipped(SkipReason::OutOfBounds(sample_rect));
        };
        let [r, g, b] = average_rgb(&sample);
        let color = Rgba([r, g, b, 255]);

        let disc = PixelRect::centered_square(center, mask.diameter());
        let mut painted = 0usize;
        for (col, row) in mask.iter() {
            if target.set_pixel(disc.x + col as i64, disc.y + row as i64, color) {
                painted += 1;
            }
        }

        if painted == 0 {
            StepOutcome::Skipped(SkipReason::OutOfBounds(disc))
        } else {
            StepOutcome::Applied
        }
    }
}

/// Mean of the R, G and B channels, rounded to nearest (halves round up).
/// Alpha is ignored.
pub fn average_rgb(sample: &RgbaImage) -> [u8; 3] {
    let count = sample.width() as u64 * sample.height() as u64;
    if count == 0 {
        return [0, 0, 0];
    }
    let mut sum = [0u64; 3];
    for p in sample.pixels() {
        for c in 0..3 {
            sum[c] += p.0[c] as u64;
        }
    }
    sum.map(|s| ((s * 2 + count) / (count * 2)) as u8)
}
