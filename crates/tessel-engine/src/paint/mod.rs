//! Color representation shared by the color matrix and the renderers.
//!
//! Colors are premultiplied; straight-alpha conversions live next to the type.

mod color;

pub use color::{premultiply_rgba8, Color};
