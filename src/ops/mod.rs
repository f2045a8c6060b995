// ============================================================================
// REGION OPERATORS - brush-driven edits applied through a circular mask
// ============================================================================

pub mod clone_stamp;
pub mod fill;
pub mod filters;
pub mod mask;
pub mod restore;
pub mod scripting;

use crate::canvas::{PixelBuffer, PixelRect, Point};

pub use clone_stamp::CloneStamp;
pub use fill::AverageFill;
pub use filters::BoxBlur;
pub use mask::CircularMask;
pub use restore::Restore;

/// Why an operator left the buffer untouched for one move event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The region the step needed is (partly) outside the buffer.
    OutOfBounds(PixelRect),
    /// Clone step requested before a source anchor exists.
    NoSource,
}

/// Result of one operator step. Skips are never errors; the stroke carries on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Applied,
    Skipped(SkipReason),
}

impl StepOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, StepOutcome::Applied)
    }
}

/// One brush algorithm. `mask` fixes both the brush diameter and the disc;
/// `center` is the pointer position for this step.
pub trait RegionOperator {
    fn name(&self) -> &'static str;
    fn apply(&self, target: &mut PixelBuffer, center: Point, mask: &CircularMask) -> StepOutcome;
}
