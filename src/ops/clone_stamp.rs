use crate::canvas::{PixelBuffer, PixelRect, Point};

use super::{CircularMask, RegionOperator, SkipReason, StepOutcome};

/// Stamp the disc around a fixed source anchor onto the pointer position.
///
/// The anchor does not follow the pointer, so every step of a stroke copies
/// the same source disc. Both boxes must be fully inside the buffer; if
/// either overhangs, the step is skipped.
#[derive(Clone, Copy, Debug)]
pub struct CloneStamp {
    pub anchor: Point,
}

impl CloneStamp {
    pub fn new(anchor: Point) -> Self {
        Self { anchor }
    }
}

impl RegionOperator for CloneStamp {
    fn name(&self) -> &'static str {
        "clone"
    }

    fn apply(&self, target: &mut PixelBuffer, center: Point, mask: &CircularMask) -> StepOutcome {
        let side = mask.diameter();
        let (width, height) = target.dimensions();
        let src_rect = PixelRect::centered_square(self.anchor, side);
        let dst_rect = PixelRect::centered_square(center, side);

        if !dst_rect.fits_within(width, height) {
            return StepOutcome::Skipped(SkipReason::OutOfBounds(dst_rect));
        }
        // Source is read in full before any write, so overlapping boxes are safe.
        let Some(source) = target.get_region(src_rect) else {
            return StepOutcome::Skipped(SkipReason::OutOfBounds(src_rect));
        };

        target.put_region_where(dst_rect.x, dst_rect.y, &source, |col, row| {
            mask.contains(col, row)
        });
        StepOutcome::Applied
    }
}
