//! Rendering core.
//!
//! Image draws become quads in a pooled [`VertexArena`]; [`RenderTarget`]s
//! submit them to a [`GraphicsDevice`](crate::device::GraphicsDevice), and
//! [`GraphicsContext`] owns the virtual screen and composites it to the output
//! once per frame.
//!
//! Convention:
//! - Target coordinates are pixels (top-left origin, +Y down).
//! - Texture storage is premultiplied RGBA8, padded to powers of two.

mod graphics;
mod resources;
mod target;
mod texture;
mod vertices;

pub use graphics::{Canvas, FramePhase, GraphicsConfig, GraphicsContext};
pub use resources::{ResourceEvent, ResourceQueue, ResourceSender};
pub use target::{ImagePart, RenderTarget};
pub use texture::Texture;
pub use vertices::{
    quad_vertices, vertex, write_quad, SourceRect, VertexArena, VertexBatch, DEFAULT_ARENA_QUADS,
};
