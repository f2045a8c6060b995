use image::RgbaImage;
use tracing::{debug, info};

use crate::canvas::{PixelBuffer, Point, Snapshot};
use crate::components::history::{DEFAULT_HISTORY_CAPACITY, HistoryStack};
use crate::components::tools::{
    BrushSpec, CloneStampState, PointerEvent, PointerPhase, StrokeState, ToolKind,
};
use crate::ops::{
    AverageFill, BoxBlur, CircularMask, CloneStamp, RegionOperator, Restore, SkipReason,
    StepOutcome,
};
use crate::settings::EditorSettings;

/// One open image and everything needed to edit it.
///
/// Owns the live buffer, the pristine original (kept apart from the undo
/// history so the eraser can always reach it) and the history itself.
/// Strokes run press → moves → release; every stroke commits exactly one
/// snapshot when it ends, including one that only picked a clone source.
pub struct EditSession {
    buffer: PixelBuffer,
    original: Snapshot,
    history: HistoryStack,
    tool: ToolKind,
    brush: BrushSpec,
    mask: CircularMask,
    clone_stamp: CloneStampState,
    stroke: StrokeState,
    /// Operator steps skipped for out-of-bounds regions, over the session.
    skipped_steps: u64,
}

impl EditSession {
    /// Seed the buffer, original and history from a decoded bitmap.
    pub fn initialize(bitmap: RgbaImage) -> Self {
        Self::with_capacity(bitmap, DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_capacity(bitmap: RgbaImage, capacity: usize) -> Self {
        let original = Snapshot::from(bitmap);
        let buffer = PixelBuffer::from_image(original.as_image().clone());
        let brush = BrushSpec::default();
        info!(
            "session initialized: {}x{}, history capacity {}",
            buffer.width(),
            buffer.height(),
            capacity.max(1)
        );
        Self {
            buffer,
            history: HistoryStack::new(capacity, original.clone()),
            original,
            tool: ToolKind::default(),
            brush,
            mask: CircularMask::new(brush.diameter),
            clone_stamp: CloneStampState::default(),
            stroke: StrokeState::default(),
            skipped_steps: 0,
        }
    }

    pub fn from_settings(bitmap: RgbaImage, settings: &EditorSettings) -> Self {
        let mut session = Self::with_capacity(bitmap, settings.max_undo_steps);
        session.set_tool(settings.default_tool);
        session.set_brush_diameter(settings.brush_size);
        session
    }

    /// Replace the image. Tool and brush survive; history, anchor and
    /// original start over.
    pub fn load_image(&mut self, bitmap: RgbaImage) {
        self.finish_stroke();
        let original = Snapshot::from(bitmap);
        self.buffer = PixelBuffer::from_image(original.as_image().clone());
        self.history = HistoryStack::new(self.history.capacity(), original.clone());
        self.original = original;
        self.clone_stamp.clear();
        info!("image replaced: {}x{}", self.buffer.width(), self.buffer.height());
    }

    // ------------------------------------------------------------------
    // Tool / brush control
    // ------------------------------------------------------------------

    /// Switch tools. Always drops the clone source.
    pub fn set_tool(&mut self, tool: ToolKind) {
        self.finish_stroke();
        self.tool = tool;
        self.clone_stamp.clear();
        debug!("tool -> {}", tool);
    }

    pub fn set_brush_diameter(&mut self, diameter: u32) {
        let brush = BrushSpec::new(diameter);
        if brush != self.brush {
            self.brush = brush;
            self.mask = CircularMask::new(brush.diameter);
        }
    }

    // ------------------------------------------------------------------
    // Pointer input
    // ------------------------------------------------------------------

    /// Dispatch one pointer event. Returns the outcome of the operator step
    /// it triggered, if any.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> Option<StepOutcome> {
        match event.phase {
            PointerPhase::Press => self.press(event.point),
            PointerPhase::Move => self.move_to(event.point),
            PointerPhase::Release | PointerPhase::Leave => {
                self.release();
                None
            }
        }
    }

    /// Start a stroke. With the clone tool and no source yet, this picks the
    /// source instead of painting.
    pub fn press(&mut self, point: Point) -> Option<StepOutcome> {
        self.finish_stroke();
        self.stroke.begin();

        if self.tool == ToolKind::Clone && !self.clone_stamp.has_source() {
            self.clone_stamp.set_source(point);
            self.stroke.picking_source = true;
            info!("clone source set at ({:.1}, {:.1})", point.x, point.y);
            return None;
        }

        Some(self.apply_at(point))
    }

    /// Continue the active stroke. Ignored when no stroke is active.
    pub fn move_to(&mut self, point: Point) -> Option<StepOutcome> {
        if !self.stroke.active || self.stroke.picking_source {
            return None;
        }
        Some(self.apply_at(point))
    }

    /// End the stroke; returns whether a stroke was active (and so committed).
    pub fn release(&mut self) -> bool {
        self.finish_stroke()
    }

    fn apply_at(&mut self, point: Point) -> StepOutcome {
        let outcome = match self.tool {
            ToolKind::Clone => match self.clone_stamp.source {
                Some(anchor) => CloneStamp::new(anchor).apply(&mut self.buffer, point, &self.mask),
                None => StepOutcome::Skipped(SkipReason::NoSource),
            },
            ToolKind::Blur => BoxBlur::default().apply(&mut self.buffer, point, &self.mask),
            ToolKind::Fill => AverageFill::default().apply(&mut self.buffer, point, &self.mask),
            ToolKind::Restore => {
                Restore::new(&self.original).apply(&mut self.buffer, point, &self.mask)
            }
        };

        match outcome {
            StepOutcome::Applied => self.stroke.applied_steps += 1,
            StepOutcome::Skipped(SkipReason::NoSource) => {
                self.stroke.skipped_steps += 1;
                self.skipped_steps += 1;
                debug!("clone step at ({:.1}, {:.1}) skipped: no source", point.x, point.y);
            }
            StepOutcome::Skipped(SkipReason::OutOfBounds(rect)) => {
                self.stroke.skipped_steps += 1;
                self.skipped_steps += 1;
                debug!(
                    "{} step at ({:.1}, {:.1}) skipped: region {}x{} at ({}, {}) out of bounds",
                    self.tool, point.x, point.y, rect.width, rect.height, rect.x, rect.y
                );
            }
        }
        outcome
    }

    fn finish_stroke(&mut self) -> bool {
        if !self.stroke.active {
            return false;
        }
        let stroke = std::mem::take(&mut self.stroke);
        self.history.push(self.buffer.full_copy());
        debug!(
            "stroke committed: {} steps applied, {} skipped, history {}/{}",
            stroke.applied_steps,
            stroke.skipped_steps,
            self.history.len(),
            self.history.capacity()
        );
        true
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Step back one stroke. `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Option<&PixelBuffer> {
        self.finish_stroke();
        let snapshot = self.history.undo()?;
        self.buffer.restore(snapshot);
        self.clone_stamp.clear();
        Some(&self.buffer)
    }

    /// Step forward one stroke. `None` when there is nothing to redo.
    pub fn redo(&mut self) -> Option<&PixelBuffer> {
        self.finish_stroke();
        let snapshot = self.history.redo()?;
        self.buffer.restore(snapshot);
        self.clone_stamp.clear();
        Some(&self.buffer)
    }

    /// Back to the loaded image with a fresh single-entry history.
    pub fn reset(&mut self) -> &PixelBuffer {
        self.finish_stroke();
        self.buffer.restore(&self.original);
        self.history.reset_to(self.original.clone());
        self.clone_stamp.clear();
        info!("reset to original image");
        &self.buffer
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Owned copy of the live pixels for export.
    pub fn current_bitmap(&self) -> RgbaImage {
        self.buffer.to_image()
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub fn original(&self) -> &Snapshot {
        &self.original
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    pub fn brush(&self) -> BrushSpec {
        self.brush
    }

    pub fn clone_source(&self) -> Option<Point> {
        self.clone_stamp.source
    }

    pub fn is_stroke_active(&self) -> bool {
        self.stroke.active
    }

    pub fn skipped_steps(&self) -> u64 {
        self.skipped_steps
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::tools::MAX_BRUSH_SIZE;
    use image::Rgba;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 128, 255]))
    }

    fn stroke(session: &mut EditSession, points: &[(f32, f32)]) {
        let (x, y) = points[0];
        session.press(Point::new(x, y));
        for &(x, y) in &points[1..] {
            session.move_to(Point::new(x, y));
        }
        session.release();
    }

    #[test]
    fn first_clone_press_only_sets_source() {
        let mut session = EditSession::initialize(gradient(64, 64));
        assert_eq!(session.tool(), ToolKind::Clone);

        assert!(session.press(Point::new(10.0, 10.0)).is_none());
        assert!(session.move_to(Point::new(40.0, 40.0)).is_none());
        assert!(session.release());
        assert!(!session.release());

        assert_eq!(session.clone_source(), Some(Point::new(10.0, 10.0)));
        assert_eq!(session.current_bitmap(), gradient(64, 64));
        // the pick is its own (unchanged) undo step
        assert_eq!(session.history().len(), 2);
        assert!(session.undo().is_some());
        assert_eq!(session.current_bitmap(), gradient(64, 64));
    }

    #[test]
    fn clone_stroke_commits_one_snapshot() {
        let mut session = EditSession::initialize(gradient(64, 64));
        session.set_brush_diameter(10);
        stroke(&mut session, &[(10.0, 10.0)]);
        stroke(&mut session, &[(40.0, 40.0), (41.0, 40.0), (42.0, 40.0)]);

        assert_eq!(session.history().len(), 3);
        // last dab at (42, 40) copied the anchor's center onto its own center
        assert_eq!(session.buffer().get_pixel(42, 40), Some(Rgba([10, 10, 128, 255])));
        // anchor survives strokes
        assert!(session.clone_source().is_some());
    }

    #[test]
    fn switching_tools_clears_source() {
        let mut session = EditSession::initialize(gradient(32, 32));
        stroke(&mut session, &[(5.0, 5.0)]);
        session.set_tool(ToolKind::Blur);
        session.set_tool(ToolKind::Clone);
        assert!(session.clone_source().is_none());
    }

    #[test]
    fn undo_redo_restore_buffer_and_clear_source() {
        let mut session = EditSession::initialize(gradient(32, 32));
        session.set_tool(ToolKind::Fill);
        session.set_brush_diameter(6);
        stroke(&mut session, &[(16.0, 16.0)]);
        let edited = session.current_bitmap();
        assert_ne!(edited, gradient(32, 32));

        session.set_tool(ToolKind::Clone);
        stroke(&mut session, &[(4.0, 4.0)]);
        assert!(session.clone_source().is_some());

        // undo the pick, then the fill
        assert!(session.undo().is_some());
        assert_eq!(session.current_bitmap(), edited);
        assert!(session.clone_source().is_none());
        assert!(session.undo().is_some());
        assert_eq!(session.current_bitmap(), gradient(32, 32));
        assert!(session.undo().is_none());

        assert!(session.redo().is_some());
        assert_eq!(session.current_bitmap(), edited);
        assert!(session.redo().is_some());
        assert!(session.redo().is_none());
    }

    #[test]
    fn failed_undo_keeps_source() {
        // capacity 1: committing the pick evicts the loaded image
        let mut session = EditSession::with_capacity(gradient(16, 16), 1);
        stroke(&mut session, &[(8.0, 8.0)]);
        assert_eq!(session.history().len(), 1);
        assert!(session.undo().is_none());
        assert!(session.clone_source().is_some());
    }

    #[test]
    fn reset_restores_original_and_history() {
        let mut session = EditSession::initialize(gradient(32, 32));
        session.set_tool(ToolKind::Fill);
        stroke(&mut session, &[(10.0, 10.0), (20.0, 20.0)]);
        assert_eq!(session.history().len(), 2);

        session.reset();
        assert_eq!(session.current_bitmap(), gradient(32, 32));
        assert_eq!(session.history().len(), 1);
        assert!(!session.can_undo());
    }

    #[test]
    fn out_of_bounds_steps_are_counted_not_fatal() {
        let mut session = EditSession::initialize(gradient(32, 32));
        session.set_brush_diameter(10);
        stroke(&mut session, &[(16.0, 16.0)]);
        // destination hangs off the right edge
        stroke(&mut session, &[(31.0, 16.0)]);

        assert_eq!(session.skipped_steps(), 1);
        // pick + skipped stroke, both committed unchanged
        assert_eq!(session.history().len(), 3);
        assert_eq!(session.current_bitmap(), gradient(32, 32));
    }

    #[test]
    fn extreme_points_are_skipped_for_every_tool() {
        let far = [
            Point::new(f32::MAX, 0.0),
            Point::new(0.0, f32::MIN),
            Point::new(f32::NEG_INFINITY, f32::INFINITY),
            Point::new(f32::NAN, 5.0),
            Point::new(1e19, 5.0),
        ];
        for &tool in ToolKind::all() {
            for &point in &far {
                let mut session = EditSession::initialize(gradient(32, 32));
                session.set_tool(tool);
                session.set_brush_diameter(10);
                if tool == ToolKind::Clone {
                    stroke(&mut session, &[(16.0, 16.0)]);
                }
                let outcome = session.press(point);
                assert!(
                    matches!(outcome, Some(StepOutcome::Skipped(SkipReason::OutOfBounds(_)))),
                    "{} at {:?}: {:?}",
                    tool,
                    point,
                    outcome
                );
                assert!(matches!(
                    session.move_to(point),
                    Some(StepOutcome::Skipped(SkipReason::OutOfBounds(_)))
                ));
                session.release();
                assert_eq!(session.current_bitmap(), gradient(32, 32));
            }
        }
    }

    #[test]
    fn far_clone_source_skips_steps() {
        let mut session = EditSession::initialize(gradient(32, 32));
        session.set_brush_diameter(10);
        stroke(&mut session, &[(f32::MAX, f32::MAX)]);
        assert!(matches!(
            session.press(Point::new(16.0, 16.0)),
            Some(StepOutcome::Skipped(SkipReason::OutOfBounds(_)))
        ));
        session.release();
        assert_eq!(session.current_bitmap(), gradient(32, 32));
    }

    #[test]
    fn huge_brush_is_capped() {
        let mut session = EditSession::initialize(gradient(16, 16));
        session.set_tool(ToolKind::Fill);
        session.set_brush_diameter(u32::MAX);
        assert_eq!(session.brush().diameter, MAX_BRUSH_SIZE);
        assert!(session.press(Point::new(8.0, 8.0)).is_some_and(|o| o.is_applied()));
        session.release();
    }

    #[test]
    fn leave_ends_stroke_like_release() {
        let mut session = EditSession::initialize(gradient(32, 32));
        session.set_tool(ToolKind::Fill);
        session.handle_pointer(PointerEvent::press(10.0, 10.0));
        session.handle_pointer(PointerEvent {
            phase: PointerPhase::Leave,
            point: Point::new(-5.0, 10.0),
        });
        assert!(!session.is_stroke_active());
        assert_eq!(session.history().len(), 2);
        assert!(session.handle_pointer(PointerEvent::moved(12.0, 12.0)).is_none());
    }

    #[test]
    fn settings_seed_tool_brush_and_capacity() {
        let settings = EditorSettings {
            max_undo_steps: 3,
            brush_size: 7,
            default_tool: ToolKind::Restore,
        };
        let session = EditSession::from_settings(gradient(8, 8), &settings);
        assert_eq!(session.tool(), ToolKind::Restore);
        assert_eq!(session.brush().diameter, 7);
        assert_eq!(session.history().capacity(), 3);
    }

    #[test]
    fn load_image_starts_over() {
        let mut session = EditSession::initialize(gradient(16, 16));
        session.set_tool(ToolKind::Fill);
        stroke(&mut session, &[(8.0, 8.0)]);
        session.load_image(gradient(20, 10));

        assert_eq!(session.buffer().dimensions(), (20, 10));
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.tool(), ToolKind::Fill);
        assert_eq!(session.original().as_image(), &gradient(20, 10));
    }
}
