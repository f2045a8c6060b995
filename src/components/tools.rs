use std::fmt;
use std::str::FromStr;

use crate::canvas::Point;

/// Brush diameter used when nothing else is configured.
pub const DEFAULT_BRUSH_SIZE: u32 = 20;

/// Largest brush diameter. Masks and stamp regions are `diameter²` cells.
pub const MAX_BRUSH_SIZE: u32 = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ToolKind {
    /// Clone stamp: first press picks the source, later strokes stamp it.
    #[default]
    Clone,
    Blur,
    Fill,
    /// Paints the originally loaded pixels back ("eraser").
    Restore,
}

impl ToolKind {
    pub fn all() -> &'static [ToolKind] {
        &[ToolKind::Clone, ToolKind::Blur, ToolKind::Fill, ToolKind::Restore]
    }

    /// User-facing name, as accepted by [`ToolKind::from_name`].
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::Clone => "clone",
            ToolKind::Blur => "blur",
            ToolKind::Fill => "fill",
            ToolKind::Restore => "eraser",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "clone" | "clone_stamp" | "stamp" => Some(ToolKind::Clone),
            "blur" => Some(ToolKind::Blur),
            "fill" => Some(ToolKind::Fill),
            "eraser" | "restore" => Some(ToolKind::Restore),
            _ => None,
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ToolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| {
            let known: Vec<&str> = Self::all().iter().map(|t| t.name()).collect();
            format!("unknown tool '{}' (expected one of: {})", s, known.join(", "))
        })
    }
}

/// The single brush shared by every tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BrushSpec {
    pub diameter: u32,
}

impl BrushSpec {
    /// Diameters are clamped to `1..=MAX_BRUSH_SIZE`.
    pub fn new(diameter: u32) -> Self {
        Self {
            diameter: diameter.clamp(1, MAX_BRUSH_SIZE),
        }
    }
}

impl Default for BrushSpec {
    fn default() -> Self {
        Self::new(DEFAULT_BRUSH_SIZE)
    }
}

/// State for the Clone Stamp tool.
#[derive(Clone, Debug, Default)]
pub struct CloneStampState {
    /// Source anchor in buffer coordinates, set by the first press after
    /// the tool is activated.
    pub source: Option<Point>,
}

impl CloneStampState {
    pub fn set_source(&mut self, point: Point) {
        self.source = Some(point);
    }

    pub fn clear(&mut self) {
        self.source = None;
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }
}

// ============================================================================
// POINTER INPUT
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerPhase {
    Press,
    Move,
    Release,
    /// Pointer left the canvas; ends the stroke exactly like `Release`.
    Leave,
}

/// A pointer event already translated into buffer coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub point: Point,
}

impl PointerEvent {
    pub fn press(x: f32, y: f32) -> Self {
        Self { phase: PointerPhase::Press, point: Point::new(x, y) }
    }

    pub fn moved(x: f32, y: f32) -> Self {
        Self { phase: PointerPhase::Move, point: Point::new(x, y) }
    }

    pub fn release(x: f32, y: f32) -> Self {
        Self { phase: PointerPhase::Release, point: Point::new(x, y) }
    }
}

/// Book-keeping for the stroke in progress (press → moves → release).
#[derive(Clone, Copy, Debug, Default)]
pub struct StrokeState {
    pub active: bool,
    /// The press only picked a clone source; moves of this stroke do nothing.
    pub picking_source: bool,
    pub applied_steps: u32,
    pub skipped_steps: u32,
}

impl StrokeState {
    pub fn begin(&mut self) {
        *self = StrokeState {
            active: true,
            ..Default::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_names_round_trip() {
        for tool in ToolKind::all() {
            assert_eq!(ToolKind::from_name(tool.name()), Some(*tool));
            assert_eq!(tool.to_string().parse::<ToolKind>(), Ok(*tool));
        }
        assert_eq!(ToolKind::from_name(" Restore "), Some(ToolKind::Restore));
        assert!("smudge".parse::<ToolKind>().is_err());
    }

    #[test]
    fn brush_diameter_is_clamped() {
        assert_eq!(BrushSpec::new(0).diameter, 1);
        assert_eq!(BrushSpec::new(MAX_BRUSH_SIZE).diameter, MAX_BRUSH_SIZE);
        assert_eq!(BrushSpec::new(u32::MAX).diameter, MAX_BRUSH_SIZE);
        assert_eq!(BrushSpec::default().diameter, DEFAULT_BRUSH_SIZE);
    }

    #[test]
    fn stroke_begin_resets_counters() {
        let mut stroke = StrokeState { active: false, picking_source: true, applied_steps: 4, skipped_steps: 2 };
        stroke.begin();
        assert!(stroke.active);
        assert!(!stroke.picking_source);
        assert_eq!((stroke.applied_steps, stroke.skipped_steps), (0, 0));
    }
}
