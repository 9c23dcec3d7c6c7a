use std::fmt;

use super::{FramebufferId, TextureId};

/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM); terminate gracefully.
    Fatal,
}

/// Failure reported by a [`GraphicsDevice`](super::GraphicsDevice).
///
/// These are recoverable from the core's point of view: render targets and the
/// graphics context propagate them unchanged and never retry.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuError {
    /// Requested texture exceeds the device limit (sizes are power-of-two padded).
    TextureTooLarge { width: u32, height: u32, max: u32 },
    /// Pixel data does not match `width * height * 4` bytes.
    PixelDataSize { expected: usize, actual: usize },
    UnknownTexture(TextureId),
    UnknownFramebuffer(FramebufferId),
    /// A target was asked to draw its own texture into itself.
    FeedbackLoop(TextureId),
    /// The output surface could not be acquired this frame.
    SurfaceUnavailable,
    OutOfMemory,
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::TextureTooLarge { width, height, max } => {
                write!(f, "texture {width}x{height} exceeds device limit {max}")
            }
            GpuError::PixelDataSize { expected, actual } => {
                write!(f, "pixel data has {actual} bytes, expected {expected}")
            }
            GpuError::UnknownTexture(id) => write!(f, "unknown texture {id:?}"),
            GpuError::UnknownFramebuffer(id) => write!(f, "unknown framebuffer {id:?}"),
            GpuError::FeedbackLoop(id) => {
                write!(f, "texture {id:?} is both draw source and destination")
            }
            GpuError::SurfaceUnavailable => f.write_str("output surface unavailable"),
            GpuError::OutOfMemory => f.write_str("GPU out of memory"),
        }
    }
}

impl std::error::Error for GpuError {}
