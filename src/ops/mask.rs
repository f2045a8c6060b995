// ============================================================================
// CIRCULAR MASK - which cells of a brush's bounding square lie in its disc
// ============================================================================

use crate::components::tools::MAX_BRUSH_SIZE;

/// Disc inscribed in a `diameter`×`diameter` square.
///
/// Cell `(col, row)` is tested at its pixel center, i.e. at offset
/// `(col + 0.5 - r, row + 0.5 - r)` from the square's center with
/// `r = diameter / 2`. Boundary cells (`dx² + dy² == r²`) are inside.
#[derive(Clone, Debug, PartialEq)]
pub struct CircularMask {
    diameter: u32,
    cells: Vec<bool>,
    inside: usize,
}

impl CircularMask {
    /// `diameter` is clamped to `1..=MAX_BRUSH_SIZE`.
    pub fn new(diameter: u32) -> Self {
        let diameter = diameter.clamp(1, MAX_BRUSH_SIZE);
        let radius = diameter as f32 / 2.0;
        let side = diameter as usize;

        let mut cells = Vec::with_capacity(side * side);
        for row in 0..diameter {
            for col in 0..diameter {
                let dx = col as f32 + 0.5 - radius;
                let dy = row as f32 + 0.5 - radius;
                cells.push(Self::contains_offset(dx, dy, radius));
            }
        }
        let inside = cells.iter().filter(|&&c| c).count();

        Self {
            diameter,
            cells,
            inside,
        }
    }

    /// The raw predicate: closed disc of radius `radius` around the origin.
    #[inline]
    pub fn contains_offset(dx: f32, dy: f32, radius: f32) -> bool {
        dx * dx + dy * dy <= radius * radius
    }

    pub fn diameter(&self) -> u32 {
        self.diameter
    }

    /// Cells outside the bounding square are never inside.
    #[inline]
    pub fn contains(&self, col: u32, row: u32) -> bool {
        col < self.diameter
            && row < self.diameter
            && self.cells[row as usize * self.diameter as usize + col as usize]
    }

    /// Number of cells inside the disc.
    pub fn count(&self) -> usize {
        self.inside
    }

    /// `(col, row)` of every inside cell, row-major.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let side = self.diameter;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, inside)| **inside)
            .map(move |(idx, _)| (idx as u32 % side, idx as u32 / side))
    }
}
