//! Affine transforms applied per draw call.
//!
//! - [`GeometryMatrix`]: 2×3 transform over 2D points (logical pixels).
//! - [`ColorMatrix`]: 4×5 transform over straight-alpha RGBA.
//!
//! Both are small `Copy` values whose default is an implicit identity; every
//! operation short-circuits on identity operands.

mod color;
mod geometry;

pub use color::{ColorMatrix, COLOR_MATRIX_DIM};
pub use geometry::{GeometryMatrix, GEOMETRY_MATRIX_DIM};
