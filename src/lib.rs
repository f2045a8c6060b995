//! RetouchFE: brush-based photo retouching (clone stamp, blur, fill, eraser)
//! over an RGBA buffer with bounded snapshot undo/redo.

pub mod canvas;
pub mod cli;
pub mod components;
pub mod io;
pub mod logger;
pub mod ops;
pub mod session;
pub mod settings;

pub use canvas::{PixelBuffer, PixelRect, Point, Snapshot};
pub use components::history::HistoryStack;
pub use components::tools::{BrushSpec, PointerEvent, PointerPhase, ToolKind};
pub use ops::{RegionOperator, SkipReason, StepOutcome};
pub use session::EditSession;
pub use settings::EditorSettings;
