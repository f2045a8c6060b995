// ============================================================================
// BLUR BRUSH - box blur over the brush square, written back through the disc
// ============================================================================

use image::{Rgba, RgbaImage};

use crate::canvas::{PixelBuffer, PixelRect, Point};

use super::{CircularMask, RegionOperator, SkipReason, StepOutcome};

/// Neighborhood radius of the blur kernel (a 7×7 window).
pub const BLUR_KERNEL_RADIUS: u32 = 3;

/// Box blur restricted to the brush disc.
///
/// The blur is computed over the whole (clipped) square so disc pixels see
/// their full neighborhood, but only disc pixels are written back.
#[derive(Clone, Copy, Debug)]
pub struct BoxBlur {
    pub kernel_radius: u32,
}

impl Default for BoxBlur {
    fn default() -> Self {
        Self {
            kernel_radius: BLUR_KERNEL_RADIUS,
        }
    }
}

impl RegionOperator for BoxBlur {
    fn name(&self) -> &'static str {
        "blur"
    }

    fn apply(&self, target: &mut PixelBuffer, center: Point, mask: &CircularMask) -> StepOutcome {
        let square = PixelRect::centered_square(center, mask.diameter());
        let Some((clipped, region)) = target.get_region_clipped(square) else {
            return StepOutcome::Skipped(SkipReason::OutOfBounds(square));
        };

        let blurred = box_blur_rgba(&region, self.kernel_radius);

        // Offset of the clipped rect inside the mask's square.
        let off_x = (clipped.x - square.x) as u32;
        let off_y = (clipped.y - square.y) as u32;
        target.put_region_where(clipped.x, clipped.y, &blurred, |col, row| {
            mask.contains(col + off_x, row + off_y)
        });
        StepOutcome::Applied
    }
}

/// Per-channel mean over the `(2r+1)²` window around each pixel.
///
/// Only neighbors inside `src` are averaged (edge pixels average fewer
/// samples, no zero padding); integer division truncates.
pub fn box_blur_rgba(src: &RgbaImage, kernel_radius: u32) -> RgbaImage {
    let (w, h) = src.dimensions();
    let r = kernel_radius as i64;
    let mut out = RgbaImage::new(w, h);

    for y in 0..h as i64 {
        let y0 = (y - r).max(0);
        let y1 = (y + r).min(h as i64 - 1);
        for x in 0..w as i64 {
            let x0 = (x - r).max(0);
            let x1 = (x + r).min(w as i64 - 1);

            let mut sum = [0u32; 4];
            let mut count = 0u32;
            for ny in y0..=y1 {
                for nx in x0..=x1 {
                    let p = src.get_pixel(nx as u32, ny as u32).0;
                    for c in 0..4 {
                        sum[c] += p[c] as u32;
                    }
                    count += 1;
                }
            }

            out.put_pixel(
                x as u32,
                y as u32,
                Rgba([
                    (sum[0] / count) as u8,
                    (sum[1] / count) as u8,
                    (sum[2] / count) as u8,
                    (sum[3] / count) as u8,
                ]),
            );
        }
    }

    out
}
