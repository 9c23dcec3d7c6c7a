use crate::affine::{ColorMatrix, GeometryMatrix};
use crate::device::{Filter, GpuError, GraphicsDevice};

use super::{ImagePart, RenderTarget, Texture, VertexArena};

/// Virtual screen configuration.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GraphicsConfig {
    /// Virtual screen size in pixels.
    pub screen_width: u32,
    pub screen_height: u32,
    /// Integer scale applied when the screen is composited to the window.
    pub screen_scale: u32,
    /// Sampling used when the screen is scaled up.
    pub screen_filter: Filter,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            screen_width: 256,
            screen_height: 240,
            screen_scale: 2,
            screen_filter: Filter::Nearest,
        }
    }
}

impl GraphicsConfig {
    /// Window size in physical pixels, saturating at `u32::MAX`.
    pub fn output_size(&self) -> (u32, u32) {
        let scale = self.screen_scale.max(1);
        (
            self.screen_width.saturating_mul(scale),
            self.screen_height.saturating_mul(scale),
        )
    }
}

/// Where the context is within a frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FramePhase {
    /// No frame started yet.
    Idle,
    /// Screen cleared; content draws go here.
    Cleared,
    /// Screen composited to the output and flushed.
    Composited,
}

/// Owns the virtual screen, the output target and the vertex arena.
///
/// Each frame is `pre_update` → content draws through [`canvas`](Self::canvas)
/// → `post_update`. The screen is composited to the output exactly once per
/// frame, after all content.
#[derive(Debug)]
pub struct GraphicsContext {
    screen: RenderTarget,
    output: RenderTarget,
    screen_scale: u32,
    arena: VertexArena,
    phase: FramePhase,
}

impl GraphicsContext {
    pub fn new<D: GraphicsDevice + ?Sized>(
        device: &mut D,
        config: &GraphicsConfig,
    ) -> Result<Self, GpuError> {
        let screen_scale = config.screen_scale.max(1);
        if screen_scale != config.screen_scale {
            log::warn!("screen scale {} raised to 1", config.screen_scale);
        }

        let output =
            RenderTarget::output(device, config.screen_width, config.screen_height, screen_scale)?;
        let screen = match RenderTarget::new(
            device,
            config.screen_width,
            config.screen_height,
            config.screen_filter,
        ) {
            Ok(screen) => screen,
            Err(err) => {
                output.dispose(device);
                return Err(err);
            }
        };

        log::debug!(
            "graphics context ready: screen {}x{} at scale {screen_scale}",
            config.screen_width,
            config.screen_height
        );

        Ok(Self {
            screen,
            output,
            screen_scale,
            arena: VertexArena::new(),
            phase: FramePhase::Idle,
        })
    }

    #[inline]
    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    #[inline]
    pub fn screen(&self) -> &RenderTarget {
        &self.screen
    }

    #[inline]
    pub fn screen_size(&self) -> (u32, u32) {
        self.screen.size()
    }

    #[inline]
    pub fn screen_scale(&self) -> u32 {
        self.screen_scale
    }

    /// Starts a frame by clearing the virtual screen.
    pub fn pre_update<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D) -> Result<(), GpuError> {
        self.screen.clear(device)?;
        self.phase = FramePhase::Cleared;
        Ok(())
    }

    /// Draw surface for the virtual screen.
    pub fn canvas<'a, D: GraphicsDevice + ?Sized>(&'a mut self, device: &'a mut D) -> Canvas<'a, D> {
        Canvas { device, arena: &mut self.arena, target: &self.screen }
    }

    /// Draw surface for another offscreen target, sharing the context's arena.
    pub fn canvas_for<'a, D: GraphicsDevice + ?Sized>(
        &'a mut self,
        device: &'a mut D,
        target: &'a RenderTarget,
    ) -> Canvas<'a, D> {
        Canvas { device, arena: &mut self.arena, target }
    }

    /// Ends the frame: draws the screen onto the output at the integer scale and flushes.
    ///
    /// The output is not cleared first; the composite covers all of it.
    pub fn post_update<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D) -> Result<(), GpuError> {
        if self.phase != FramePhase::Cleared {
            log::warn!("post_update in phase {:?}; screen was not cleared this frame", self.phase);
        }

        let texture = self
            .screen
            .texture()
            .ok_or(GpuError::UnknownFramebuffer(self.screen.framebuffer()))?;
        let (w, h) = texture.size();
        let scale = f64::from(self.screen_scale);

        self.output.draw_image(
            device,
            &mut self.arena,
            texture,
            &[ImagePart::whole(w, h)],
            &GeometryMatrix::scaling(scale, scale),
            &ColorMatrix::identity(),
        )?;
        device.flush()?;
        self.phase = FramePhase::Composited;
        Ok(())
    }

    /// Releases the screen and output targets.
    pub fn dispose<D: GraphicsDevice + ?Sized>(self, device: &mut D) {
        self.screen.dispose(device);
        self.output.dispose(device);
    }
}

/// Draw calls into one render target.
pub struct Canvas<'a, D: GraphicsDevice + ?Sized> {
    device: &'a mut D,
    arena: &'a mut VertexArena,
    target: &'a RenderTarget,
}

impl<D: GraphicsDevice + ?Sized> Canvas<'_, D> {
    /// Target coordinate space.
    #[inline]
    pub fn size(&self) -> (u32, u32) {
        self.target.size()
    }

    pub fn clear(&mut self) -> Result<(), GpuError> {
        self.target.clear(self.device)
    }

    pub fn draw_image(
        &mut self,
        texture: &Texture,
        parts: &[ImagePart],
        geo: &GeometryMatrix,
        color: &ColorMatrix,
    ) -> Result<(), GpuError> {
        self.target.draw_image(self.device, self.arena, texture, parts, geo, color)
    }

    /// Draws the whole texture with its top-left corner at `geo`'s origin.
    pub fn draw_texture(
        &mut self,
        texture: &Texture,
        geo: &GeometryMatrix,
        color: &ColorMatrix,
    ) -> Result<(), GpuError> {
        let (w, h) = texture.size();
        self.draw_image(texture, &[ImagePart::whole(w, h)], geo, color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::testing::{DeviceCall, RecordingDevice};
    use crate::device::{QUAD_FLOATS, VERTEX_FLOATS};

    fn config() -> GraphicsConfig {
        GraphicsConfig { screen_width: 320, screen_height: 240, screen_scale: 2, ..Default::default() }
    }

    fn bounds(vertices: &[f32]) -> (f32, f32, f32, f32) {
        let mut b = (f32::MAX, f32::MAX, f32::MIN, f32::MIN);
        for v in vertices.chunks_exact(VERTEX_FLOATS) {
            b = (b.0.min(v[0]), b.1.min(v[1]), b.2.max(v[0]), b.3.max(v[1]));
        }
        b
    }

    #[test]
    fn frame_clears_screen_draws_composites_and_flushes() {
        let mut device = RecordingDevice::new();
        let mut ctx = GraphicsContext::new(&mut device, &config()).unwrap();
        let sprite = Texture::new(&mut device, 16, 16, Filter::Nearest).unwrap();
        let screen_fb = ctx.screen().framebuffer();
        device.calls.clear();

        ctx.pre_update(&mut device).unwrap();
        ctx.canvas(&mut device)
            .draw_texture(&sprite, &GeometryMatrix::translation(10.0, 10.0), &ColorMatrix::identity())
            .unwrap();
        ctx.post_update(&mut device).unwrap();
        assert_eq!(ctx.phase(), FramePhase::Composited);

        let calls = &device.calls;
        assert_eq!(calls.len(), 4, "{calls:?}");
        assert_eq!(calls[0], DeviceCall::Clear(screen_fb));
        assert!(matches!(&calls[1], DeviceCall::DrawQuads { framebuffer, .. } if *framebuffer == screen_fb));
        assert_eq!(calls[3], DeviceCall::Flush);

        let DeviceCall::DrawQuads { framebuffer, texture, vertices } = &calls[2] else {
            panic!("expected composite, got {:?}", calls[2]);
        };
        assert_ne!(*framebuffer, screen_fb);
        assert_eq!(Some(*texture), ctx.screen().texture().map(Texture::id));
        assert_eq!(vertices.len(), QUAD_FLOATS);
        assert_eq!(bounds(vertices), (0.0, 0.0, 640.0, 480.0));

        // The output is never cleared.
        assert_eq!(calls.iter().filter(|c| matches!(c, DeviceCall::Clear(_))).count(), 1);

        sprite.dispose(&mut device);
        ctx.dispose(&mut device);
    }

    #[test]
    fn composite_uses_identity_color() {
        let mut device = RecordingDevice::new();
        let mut ctx = GraphicsContext::new(&mut device, &config()).unwrap();
        ctx.pre_update(&mut device).unwrap();
        ctx.post_update(&mut device).unwrap();

        let (body, translate) = ColorMatrix::identity().elements();
        let DeviceCall::DrawQuads { vertices, .. } = device.draws()[0].clone() else {
            unreachable!()
        };
        assert_eq!(&vertices[6..22], &body);
        assert_eq!(&vertices[22..26], &translate);
        ctx.dispose(&mut device);
    }

    #[test]
    fn clear_failure_propagates() {
        let mut device = RecordingDevice::new();
        let mut ctx = GraphicsContext::new(&mut device, &config()).unwrap();
        device.fail_next_clear = Some(GpuError::SurfaceUnavailable);

        assert_eq!(ctx.pre_update(&mut device), Err(GpuError::SurfaceUnavailable));
        assert_eq!(ctx.phase(), FramePhase::Idle);
        ctx.dispose(&mut device);
    }

    #[test]
    fn canvas_for_draws_into_other_target() {
        let mut device = RecordingDevice::new();
        let mut ctx = GraphicsContext::new(&mut device, &config()).unwrap();
        let layer = RenderTarget::new(&mut device, 64, 64, Filter::Linear).unwrap();
        let sprite = Texture::new(&mut device, 8, 8, Filter::Nearest).unwrap();
        device.calls.clear();

        {
            let mut canvas = ctx.canvas_for(&mut device, &layer);
            assert_eq!(canvas.size(), (64, 64));
            canvas.clear().unwrap();
            canvas
                .draw_texture(&sprite, &GeometryMatrix::identity(), &ColorMatrix::identity())
                .unwrap();
        }
        assert_eq!(device.calls[0], DeviceCall::Clear(layer.framebuffer()));
        assert!(matches!(
            &device.calls[1],
            DeviceCall::DrawQuads { framebuffer, .. } if *framebuffer == layer.framebuffer()
        ));

        sprite.dispose(&mut device);
        layer.dispose(&mut device);
        ctx.dispose(&mut device);
    }

    #[test]
    fn dispose_releases_everything() {
        let mut device = RecordingDevice::new();
        let ctx = GraphicsContext::new(&mut device, &GraphicsConfig::default()).unwrap();
        assert_eq!(device.live_texture_count(), 1);
        assert_eq!(device.live_framebuffer_count(), 2);

        ctx.dispose(&mut device);
        assert_eq!(device.live_texture_count(), 0);
        assert_eq!(device.live_framebuffer_count(), 0);
    }

    #[test]
    fn default_config_is_256_by_240_at_2x() {
        let config = GraphicsConfig::default();
        assert_eq!(config.output_size(), (512, 480));
        assert_eq!(config.screen_filter, Filter::Nearest);
    }

    #[test]
    fn output_size_saturates() {
        let config = GraphicsConfig {
            screen_width: u32::MAX / 2 + 1,
            screen_scale: 4,
            ..GraphicsConfig::default()
        };
        assert_eq!(config.output_size(), (u32::MAX, 960));
    }
}
