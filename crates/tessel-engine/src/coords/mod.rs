//! Pixel-space geometry shared by draw calls.
//!
//! Canonical space:
//! - Pixels of the target being drawn into
//! - Origin top-left
//! - +X right, +Y down

mod rect;

pub use rect::Rect;
