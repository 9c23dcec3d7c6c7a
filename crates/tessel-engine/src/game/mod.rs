//! Game-facing contracts.
//!
//! Defines the interface between the window runtime and user code and the
//! per-frame call sequence the runtime drives.

mod app;
mod ctx;

pub use app::{Game, GameControl};
pub use ctx::DrawCtx;

pub(crate) use app::run_frame;
