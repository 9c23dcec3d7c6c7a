//! tessel engine crate.
//!
//! 2D drawing core: affine geometry and color matrices, quad vertex
//! generation over a pooled arena, render targets and the per-frame graphics
//! context, plus the wgpu device and winit runtime that host them.

pub mod affine;
pub mod coords;
pub mod device;
pub mod game;
pub mod logging;
pub mod paint;
pub mod render;
pub mod time;
pub mod window;
