//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and the single game window, and wires them to
//! the wgpu device and the graphics context.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
