//! Client-side route drafting engine.
//!
//! A [`DraftSession`] owns the whole draft: finalized segments, the segment
//! being drawn, status, undo/redo history and the local metrics estimate.
//! Rendering and persistence are delegated to the [`render::MapSurface`] and
//! [`backend::RouteBackend`] collaborators.

pub mod assembler;
pub mod backend;
pub mod builder;
pub mod config;
pub mod error;
pub mod history;
pub mod metrics;
pub mod queue;
pub mod render;
pub mod session;
pub mod snap;
pub mod status;

pub use builder::{DrawMode, Gesture};
pub use config::DraftConfig;
pub use error::{BackendError, DraftError};
pub use session::{Download, DraftSession, Notice, NoticeLevel, SelectedRoute};
pub use shared::{Metrics, Point, RouteDraft, Segment, Status, SurfaceType};
