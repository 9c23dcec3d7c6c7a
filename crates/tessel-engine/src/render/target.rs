use crate::affine::{ColorMatrix, GeometryMatrix};
use crate::coords::Rect;
use crate::device::{Filter, FramebufferId, GpuError, GraphicsDevice};

use super::{SourceRect, Texture, VertexArena};

/// One rectangle of a source texture and where it lands, before the draw's geometry.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ImagePart {
    pub dst: Rect,
    pub src: Rect,
}

impl ImagePart {
    #[inline]
    pub const fn new(dst: Rect, src: Rect) -> Self {
        Self { dst, src }
    }

    /// Whole `width` × `height` image drawn at the origin.
    pub fn whole(width: u32, height: u32) -> Self {
        let r = Rect::from_size(width as f32, height as f32);
        Self { dst: r, src: r }
    }

    /// Source rectangle and the transform mapping its local space through `geo`.
    ///
    /// The local quad is scaled to the destination size, moved to the
    /// destination origin, then `geo` applies. `None` when either rectangle
    /// cannot produce a visible quad.
    fn placement(&self, geo: &GeometryMatrix) -> Option<(SourceRect, GeometryMatrix)> {
        let src = SourceRect::new(self.src.x, self.src.y, self.src.right(), self.src.bottom());
        if src.is_degenerate() || !self.dst.is_finite() {
            return None;
        }

        let mut part_geo = GeometryMatrix::scaling(
            f64::from(self.dst.width) / f64::from(self.src.width),
            f64::from(self.dst.height) / f64::from(self.src.height),
        );
        part_geo.translate(f64::from(self.dst.x), f64::from(self.dst.y));
        part_geo.concat(geo);
        Some((src, part_geo))
    }
}

/// A surface quads are drawn into: an owned offscreen texture, or the output.
///
/// Offscreen targets own a [`Texture`] that can itself be drawn elsewhere.
/// The output target has no texture; its coordinate space is the window in
/// physical pixels and it remembers the integer scale it was created for.
///
/// GPU handles are released only by [`dispose`](Self::dispose).
#[derive(Debug)]
pub struct RenderTarget {
    texture: Option<Texture>,
    framebuffer: FramebufferId,
    width: u32,
    height: u32,
    scale: u32,
    disposed: bool,
}

impl RenderTarget {
    /// Allocates an offscreen `width` × `height` target.
    pub fn new<D: GraphicsDevice + ?Sized>(
        device: &mut D,
        width: u32,
        height: u32,
        filter: Filter,
    ) -> Result<Self, GpuError> {
        let texture = Texture::new(device, width, height, filter)?;
        let framebuffer = match device.create_framebuffer(texture.id()) {
            Ok(fb) => fb,
            Err(err) => {
                texture.dispose(device);
                return Err(err);
            }
        };
        log::debug!("render target {framebuffer:?} created: {width}x{height}");
        Ok(Self {
            texture: Some(texture),
            framebuffer,
            width,
            height,
            scale: 1,
            disposed: false,
        })
    }

    /// Binds the output surface for a `width` × `height` screen shown at `scale`.
    pub fn output<D: GraphicsDevice + ?Sized>(
        device: &mut D,
        width: u32,
        height: u32,
        scale: u32,
    ) -> Result<Self, GpuError> {
        let scale = scale.max(1);
        let (Some(w), Some(h)) = (width.checked_mul(scale), height.checked_mul(scale)) else {
            return Err(GpuError::TextureTooLarge { width, height, max: u32::MAX / scale });
        };
        let framebuffer = device.output_framebuffer(w, h)?;
        Ok(Self {
            texture: None,
            framebuffer,
            width: w,
            height: h,
            scale,
            disposed: false,
        })
    }

    /// Drawable texture of an offscreen target.
    #[inline]
    pub fn texture(&self) -> Option<&Texture> {
        self.texture.as_ref()
    }

    #[inline]
    pub fn framebuffer(&self) -> FramebufferId {
        self.framebuffer
    }

    /// Size of the target's coordinate space.
    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Composite scale (1 for offscreen targets).
    #[inline]
    pub fn scale(&self) -> u32 {
        self.scale
    }

    #[inline]
    pub fn is_output(&self) -> bool {
        self.texture.is_none()
    }

    /// Clears to transparent.
    pub fn clear<D: GraphicsDevice + ?Sized>(&self, device: &mut D) -> Result<(), GpuError> {
        device.clear(self.framebuffer)
    }

    /// Draws `parts` of `texture` through `geo` and `color`.
    ///
    /// Parts are batched into arena windows; each non-empty window is one
    /// device submission. Degenerate parts are skipped.
    pub fn draw_image<D: GraphicsDevice + ?Sized>(
        &self,
        device: &mut D,
        arena: &mut VertexArena,
        texture: &Texture,
        parts: &[ImagePart],
        geo: &GeometryMatrix,
        color: &ColorMatrix,
    ) -> Result<(), GpuError> {
        if self.texture.as_ref().is_some_and(|t| t.id() == texture.id()) {
            return Err(GpuError::FeedbackLoop(texture.id()));
        }

        let (width, height) = texture.size();
        for window in parts.chunks(arena.capacity_quads()) {
            let mut batch = arena.checkout(window.len());
            for part in window {
                if let Some((src, part_geo)) = part.placement(geo) {
                    batch.push_quad(width, height, src, &part_geo, color);
                }
            }
            if !batch.is_empty() {
                device.draw_quads(self.framebuffer, texture.id(), batch.vertices())?;
            }
        }
        Ok(())
    }

    /// Releases the framebuffer, then the texture.
    pub fn dispose<D: GraphicsDevice + ?Sized>(mut self, device: &mut D) {
        device.delete_framebuffer(self.framebuffer);
        if let Some(texture) = self.texture.take() {
            texture.dispose(device);
        }
        self.disposed = true;
        log::debug!("render target {:?} disposed", self.framebuffer);
    }
}

impl Drop for RenderTarget {
    fn drop(&mut self) {
        if !self.disposed {
            log::warn!(
                "render target {:?} ({}x{}) dropped without dispose; GPU handles leaked",
                self.framebuffer,
                self.width,
                self.height
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::testing::{DeviceCall, RecordingDevice};
    use crate::device::{POSITION_OFFSET, QUAD_FLOATS, VERTEX_FLOATS};

    fn setup() -> (RecordingDevice, RenderTarget, Texture) {
        let mut device = RecordingDevice::new();
        let target = RenderTarget::new(&mut device, 64, 64, Filter::Nearest).unwrap();
        let texture = Texture::new(&mut device, 16, 16, Filter::Nearest).unwrap();
        device.calls.clear();
        (device, target, texture)
    }

    fn teardown(mut device: RecordingDevice, target: RenderTarget, texture: Texture) {
        target.dispose(&mut device);
        texture.dispose(&mut device);
    }

    fn corner(vertices: &[f32], quad: usize, vertex: usize) -> (f32, f32) {
        let base = quad * QUAD_FLOATS + vertex * VERTEX_FLOATS + POSITION_OFFSET;
        (vertices[base], vertices[base + 1])
    }

    #[test]
    fn parts_share_one_submission() {
        let (mut device, target, texture) = setup();
        let mut arena = VertexArena::with_capacity(8);
        let parts = [
            ImagePart::new(Rect::new(0.0, 0.0, 8.0, 8.0), Rect::new(0.0, 0.0, 8.0, 8.0)),
            ImagePart::new(Rect::new(8.0, 0.0, 8.0, 8.0), Rect::new(8.0, 0.0, 8.0, 8.0)),
        ];
        target
            .draw_image(
                &mut device,
                &mut arena,
                &texture,
                &parts,
                &GeometryMatrix::identity(),
                &ColorMatrix::identity(),
            )
            .unwrap();

        let draws = device.draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].quad_count(), 2);
        teardown(device, target, texture);
    }

    #[test]
    fn windows_follow_arena_capacity() {
        let (mut device, target, texture) = setup();
        let mut arena = VertexArena::with_capacity(2);
        let parts = [ImagePart::whole(16, 16); 5];
        target
            .draw_image(
                &mut device,
                &mut arena,
                &texture,
                &parts,
                &GeometryMatrix::identity(),
                &ColorMatrix::identity(),
            )
            .unwrap();

        let counts: Vec<usize> = device.draws().iter().map(|c| c.quad_count()).collect();
        assert_eq!(counts, vec![2, 2, 1]);
        teardown(device, target, texture);
    }

    #[test]
    fn destination_rect_then_geometry() {
        let (mut device, target, texture) = setup();
        let mut arena = VertexArena::new();
        // 4x4 source stretched to 8x2 at (10, 20), then shifted by (1, 1).
        let parts = [ImagePart::new(Rect::new(10.0, 20.0, 8.0, 2.0), Rect::new(4.0, 4.0, 4.0, 4.0))];
        target
            .draw_image(
                &mut device,
                &mut arena,
                &texture,
                &parts,
                &GeometryMatrix::translation(1.0, 1.0),
                &ColorMatrix::identity(),
            )
            .unwrap();

        let DeviceCall::DrawQuads { vertices, .. } = device.draws()[0].clone() else {
            panic!("expected a draw");
        };
        assert_eq!(corner(&vertices, 0, 0), (11.0, 21.0));
        assert_eq!(corner(&vertices, 0, 3), (19.0, 23.0));
        teardown(device, target, texture);
    }

    #[test]
    fn degenerate_parts_submit_nothing() {
        let (mut device, target, texture) = setup();
        let mut arena = VertexArena::new();
        let parts = [
            ImagePart::new(Rect::new(0.0, 0.0, 8.0, 8.0), Rect::new(3.0, 0.0, 0.0, 8.0)),
            ImagePart::new(Rect::new(0.0, 0.0, 8.0, 8.0), Rect::new(-8.0, -8.0, 4.0, 4.0)),
        ];
        target
            .draw_image(
                &mut device,
                &mut arena,
                &texture,
                &parts,
                &GeometryMatrix::identity(),
                &ColorMatrix::identity(),
            )
            .unwrap();
        assert!(device.draws().is_empty());
        teardown(device, target, texture);
    }

    #[test]
    fn drawing_own_texture_is_rejected() {
        let mut device = RecordingDevice::new();
        let mut arena = VertexArena::new();
        let target = RenderTarget::new(&mut device, 8, 8, Filter::Nearest).unwrap();
        let other = RenderTarget::new(&mut device, 8, 8, Filter::Nearest).unwrap();
        let own = other.texture().unwrap();

        // Another target's texture is fine.
        target
            .draw_image(
                &mut device,
                &mut arena,
                own,
                &[ImagePart::whole(8, 8)],
                &GeometryMatrix::identity(),
                &ColorMatrix::identity(),
            )
            .unwrap();

        let tex = target.texture().unwrap();
        let err = target.draw_image(
            &mut device,
            &mut arena,
            tex,
            &[ImagePart::whole(8, 8)],
            &GeometryMatrix::identity(),
            &ColorMatrix::identity(),
        );
        assert_eq!(err, Err(GpuError::FeedbackLoop(tex.id())));

        target.dispose(&mut device);
        other.dispose(&mut device);
    }

    #[test]
    fn output_size_overflow_is_an_error() {
        let mut device = RecordingDevice::new();
        let err = RenderTarget::output(&mut device, u32::MAX / 2 + 1, 240, 2).unwrap_err();
        assert!(matches!(err, GpuError::TextureTooLarge { max, .. } if max == u32::MAX / 2));
        assert!(device.calls.is_empty());
    }

    #[test]
    fn output_target_is_scaled() {
        let mut device = RecordingDevice::new();
        let output = RenderTarget::output(&mut device, 320, 240, 3).unwrap();
        assert!(output.is_output());
        assert_eq!(output.size(), (960, 720));
        assert_eq!(output.scale(), 3);
        assert!(matches!(
            device.calls[0],
            DeviceCall::OutputFramebuffer { width: 960, height: 720, .. }
        ));
        output.dispose(&mut device);
    }

    #[test]
    fn dispose_releases_framebuffer_then_texture() {
        let mut device = RecordingDevice::new();
        let target = RenderTarget::new(&mut device, 8, 8, Filter::Nearest).unwrap();
        let fb = target.framebuffer();
        let tex = target.texture().unwrap().id();
        target.dispose(&mut device);

        let n = device.calls.len();
        assert_eq!(
            &device.calls[n - 2..],
            &[DeviceCall::DeleteFramebuffer(fb), DeviceCall::DeleteTexture(tex)]
        );
        assert_eq!(device.live_texture_count(), 0);
        assert_eq!(device.live_framebuffer_count(), 0);
    }

    #[test]
    fn failed_framebuffer_releases_texture() {
        let mut device = RecordingDevice::new();
        device.fail_next_framebuffer = Some(GpuError::OutOfMemory);
        let err = RenderTarget::new(&mut device, 8, 8, Filter::Nearest).unwrap_err();
        assert_eq!(err, GpuError::OutOfMemory);
        assert_eq!(device.live_texture_count(), 0);
    }
}
