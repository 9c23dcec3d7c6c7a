//! In-memory [`GraphicsDevice`] that records every call, for tests.

use std::collections::HashMap;

use super::{Filter, FramebufferId, GpuError, GraphicsDevice, TextureId, QUAD_FLOATS};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DeviceCall {
    CreateTexture { id: TextureId, width: u32, height: u32, filter: Filter, has_pixels: bool },
    CreateFramebuffer { id: FramebufferId, texture: TextureId },
    OutputFramebuffer { id: FramebufferId, width: u32, height: u32 },
    Clear(FramebufferId),
    DrawQuads { framebuffer: FramebufferId, texture: TextureId, vertices: Vec<f32> },
    Flush,
    DeleteFramebuffer(FramebufferId),
    DeleteTexture(TextureId),
}

impl DeviceCall {
    pub(crate) fn quad_count(&self) -> usize {
        match self {
            DeviceCall::DrawQuads { vertices, .. } => vertices.len() / QUAD_FLOATS,
            _ => 0,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct RecordingDevice {
    pub calls: Vec<DeviceCall>,
    next_id: u32,
    live_textures: HashMap<TextureId, (u32, u32)>,
    live_framebuffers: HashMap<FramebufferId, Option<TextureId>>,
    /// When set, the next `clear` fails with this error.
    pub fail_next_clear: Option<GpuError>,
    /// When set, the next `create_framebuffer` fails with this error.
    pub fail_next_framebuffer: Option<GpuError>,
}

impl RecordingDevice {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn live_texture_count(&self) -> usize {
        self.live_textures.len()
    }

    pub(crate) fn live_framebuffer_count(&self) -> usize {
        self.live_framebuffers.len()
    }

    pub(crate) fn draws(&self) -> Vec<&DeviceCall> {
        self.calls.iter().filter(|c| matches!(c, DeviceCall::DrawQuads { .. })).collect()
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl GraphicsDevice for RecordingDevice {
    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        pixels: Option<&[u8]>,
        filter: Filter,
    ) -> Result<TextureId, GpuError> {
        if let Some(p) = pixels {
            let expected = width as usize * height as usize * 4;
            if p.len() != expected {
                return Err(GpuError::PixelDataSize { expected, actual: p.len() });
            }
        }
        let id = TextureId::new(self.next());
        self.live_textures.insert(id, (width, height));
        self.calls.push(DeviceCall::CreateTexture {
            id,
            width,
            height,
            filter,
            has_pixels: pixels.is_some(),
        });
        Ok(id)
    }

    fn create_framebuffer(&mut self, texture: TextureId) -> Result<FramebufferId, GpuError> {
        if let Some(err) = self.fail_next_framebuffer.take() {
            return Err(err);
        }
        if !self.live_textures.contains_key(&texture) {
            return Err(GpuError::UnknownTexture(texture));
        }
        let id = FramebufferId::new(self.next());
        self.live_framebuffers.insert(id, Some(texture));
        self.calls.push(DeviceCall::CreateFramebuffer { id, texture });
        Ok(id)
    }

    fn output_framebuffer(&mut self, width: u32, height: u32) -> Result<FramebufferId, GpuError> {
        let id = FramebufferId::new(self.next());
        self.live_framebuffers.insert(id, None);
        self.calls.push(DeviceCall::OutputFramebuffer { id, width, height });
        Ok(id)
    }

    fn clear(&mut self, framebuffer: FramebufferId) -> Result<(), GpuError> {
        if let Some(err) = self.fail_next_clear.take() {
            return Err(err);
        }
        if !self.live_framebuffers.contains_key(&framebuffer) {
            return Err(GpuError::UnknownFramebuffer(framebuffer));
        }
        self.calls.push(DeviceCall::Clear(framebuffer));
        Ok(())
    }

    fn draw_quads(
        &mut self,
        framebuffer: FramebufferId,
        texture: TextureId,
        vertices: &[f32],
    ) -> Result<(), GpuError> {
        if !self.live_framebuffers.contains_key(&framebuffer) {
            return Err(GpuError::UnknownFramebuffer(framebuffer));
        }
        if !self.live_textures.contains_key(&texture) {
            return Err(GpuError::UnknownTexture(texture));
        }
        self.calls.push(DeviceCall::DrawQuads {
            framebuffer,
            texture,
            vertices: vertices.to_vec(),
        });
        Ok(())
    }

    fn flush(&mut self) -> Result<(), GpuError> {
        self.calls.push(DeviceCall::Flush);
        Ok(())
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        self.live_framebuffers.remove(&framebuffer);
        self.calls.push(DeviceCall::DeleteFramebuffer(framebuffer));
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.live_textures.remove(&texture);
        self.calls.push(DeviceCall::DeleteTexture(texture));
    }
}
