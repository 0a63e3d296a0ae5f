//! Damage Report Common Library
//!
//! CLIとデスクトップで共有される損傷マーキングのコア

pub mod types;
pub mod canvas;
pub mod store;
pub mod marking;
pub mod notes;
pub mod render;
pub mod error;

pub use types::{
    DamageMarker, DamageType, MarkerDraft, MarkerId, MarkerPatch, Severity, Snapshot,
    CANVAS_HEIGHT, CANVAS_WIDTH, MARKER_RADIUS,
};
pub use canvas::{CanvasPoint, DiagramSurface, PointerEvent, ScreenPos, ScreenRect, ViewBox};
pub use store::MarkerStore;
pub use marking::{
    DamageForm, DescriptionPolicy, MarkingSession, MarkingState, SessionEvent, SessionInit,
};
pub use notes::{synthesize, NotesEditor, NOTES_SOFT_LIMIT};
pub use render::{RenderGate, RenderRequest, RenderResponse, RenderedReport};
pub use error::{Error, MarkingError, Result};
