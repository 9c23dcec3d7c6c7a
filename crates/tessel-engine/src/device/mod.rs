//! GPU device + surface management.
//!
//! The rendering core talks to the GPU only through [`GraphicsDevice`].
//! [`WgpuDevice`] is the production implementation; it owns a [`Gpu`]
//! (instance, adapter, device, queue and the configured window surface).

mod backend;
mod error;
mod frame;
mod gpu;
mod init;
mod surface;
mod wgpu_device;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{
    quad_indices, Filter, FramebufferId, GraphicsDevice, TextureId, COLOR_BODY_OFFSET,
    COLOR_TRANSLATE_OFFSET, POSITION_OFFSET, QUAD_FLOATS, QUAD_INDICES, QUAD_VERTICES,
    UV_OFFSET, UV_OPPOSITE_OFFSET, VERTEX_FLOATS, VERTEX_STRIDE,
};
pub use error::{GpuError, SurfaceErrorAction};
pub use frame::GpuFrame;
pub use gpu::Gpu;
pub use init::GpuInit;
pub use wgpu_device::WgpuDevice;
