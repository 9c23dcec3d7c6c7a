use crate::device::{Filter, GpuError, GraphicsDevice, TextureId};
use crate::paint::premultiply_rgba8;

/// GPU texture with its logical size.
///
/// Device storage is padded to powers of two; only the logical size is
/// visible here and it is what vertex generation normalizes against.
/// Release with [`dispose`](Self::dispose).
#[derive(Debug, PartialEq, Eq)]
pub struct Texture {
    id: TextureId,
    width: u32,
    height: u32,
}

impl Texture {
    /// Allocates a transparent texture.
    pub fn new<D: GraphicsDevice + ?Sized>(
        device: &mut D,
        width: u32,
        height: u32,
        filter: Filter,
    ) -> Result<Self, GpuError> {
        let id = device.create_texture(width, height, None, filter)?;
        Ok(Self { id, width, height })
    }

    /// Uploads decoded straight-alpha RGBA8 pixels (premultiplied on the way).
    pub fn from_rgba8<D: GraphicsDevice + ?Sized>(
        device: &mut D,
        width: u32,
        height: u32,
        mut pixels: Vec<u8>,
        filter: Filter,
    ) -> Result<Self, GpuError> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(GpuError::PixelDataSize { expected, actual: pixels.len() });
        }
        premultiply_rgba8(&mut pixels);
        let id = device.create_texture(width, height, Some(&pixels), filter)?;
        Ok(Self { id, width, height })
    }

    #[inline]
    pub fn id(&self) -> TextureId {
        self.id
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn dispose<D: GraphicsDevice + ?Sized>(self, device: &mut D) {
        device.delete_texture(self.id);
    }
}
