use crate::canvas::{PixelBuffer, PixelRect, Point, Snapshot};

use super::{CircularMask, RegionOperator, SkipReason, StepOutcome};

/// "Eraser": paint the pristine loaded image back through the disc.
///
/// Reads from the original snapshot, never from the undo history, so it
/// reverts to the loaded pixels no matter how much history was evicted.
#[derive(Clone, Copy, Debug)]
pub struct Restore<'a> {
    pub original: &'a Snapshot,
}

impl<'a> Restore<'a> {
    pub fn new(original: &'a Snapshot) -> Self {
        Self { original }
    }
}

impl RegionOperator for Restore<'_> {
    fn name(&self) -> &'static str {
        "eraser"
    }

    fn apply(&self, target: &mut PixelBuffer, center: Point, mask: &CircularMask) -> StepOutcome {
        let disc = PixelRect::centered_square(center, mask.diameter());
        let mut restored = 0usize;

        for (col, row) in mask.iter() {
            let x = disc.x + col as i64;
            let y = disc.y + row as i64;
            if !target.contains(x, y) {
                continue;
            }
            if let Some(pixel) = self.original.get_pixel(x as u32, y as u32)
                && target.set_pixel(x, y, pixel)
            {
                restored += 1;
            }
        }

        if restored == 0 {
            StepOutcome::Skipped(SkipReason::OutOfBounds(disc))
        } else {
            StepOutcome::Applied
        }
    }
}
