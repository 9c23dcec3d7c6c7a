use super::GpuError;

// ── vertex layout ─────────────────────────────────────────────────────────
//
// One vertex is 26 `f32` (104 bytes):
//
//  float  byte  count  attribute         wgsl location
//      0     0      2  position.xy       0
//      2     8      2  uv.xy             1
//      4    16      2  uv_opposite.xy    2
//      6    24     16  color body        3..=6 (one column each)
//     22    88      4  color translate   7
//
// A quad is four vertices in the order (0,0) (x1,0) (0,y1) (x1,y1), drawn with
// the index pattern [0, 1, 2, 1, 2, 3].

/// Floats per vertex.
pub const VERTEX_FLOATS: usize = 26;
/// Bytes per vertex.
pub const VERTEX_STRIDE: usize = VERTEX_FLOATS * std::mem::size_of::<f32>();
/// Vertices per quad.
pub const QUAD_VERTICES: usize = 4;
/// Floats per quad.
pub const QUAD_FLOATS: usize = VERTEX_FLOATS * QUAD_VERTICES;
/// Indices per quad.
pub const QUAD_INDICES: usize = 6;

pub const POSITION_OFFSET: usize = 0;
pub const UV_OFFSET: usize = 2;
pub const UV_OPPOSITE_OFFSET: usize = 4;
pub const COLOR_BODY_OFFSET: usize = 6;
pub const COLOR_TRANSLATE_OFFSET: usize = 22;

/// Index pattern for quad `q` (two triangles sharing the 1–2 diagonal).
#[inline]
pub fn quad_indices(q: u16) -> [u16; QUAD_INDICES] {
    let b = q * QUAD_VERTICES as u16;
    [b, b + 1, b + 2, b + 1, b + 2, b + 3]
}

// ── handles ───────────────────────────────────────────────────────────────

/// Opaque texture handle issued by a [`GraphicsDevice`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TextureId(u32);

impl TextureId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Opaque framebuffer (render attachment) handle issued by a [`GraphicsDevice`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FramebufferId(u32);

impl FramebufferId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Texture sampling filter.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum Filter {
    #[default]
    Nearest,
    Linear,
}

// ── device contract ───────────────────────────────────────────────────────

/// GPU operations the rendering core depends on.
///
/// All calls happen on the render thread. Implementations report failures as
/// [`GpuError`]; callers propagate them and never retry.
pub trait GraphicsDevice {
    /// Allocates a texture for a `width` × `height` image.
    ///
    /// Storage is padded to the next power of two in each dimension; vertex
    /// UVs are computed against the padded size. `pixels`, when given, is
    /// tightly packed premultiplied RGBA8 for the logical region and is
    /// uploaded to the top-left corner. Padding is transparent.
    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        pixels: Option<&[u8]>,
        filter: Filter,
    ) -> Result<TextureId, GpuError>;

    /// Makes `texture` drawable. Positions are in texels of the padded storage.
    fn create_framebuffer(&mut self, texture: TextureId) -> Result<FramebufferId, GpuError>;

    /// Binds the output surface with a `width` × `height` pixel coordinate space.
    fn output_framebuffer(&mut self, width: u32, height: u32) -> Result<FramebufferId, GpuError>;

    /// Clears `framebuffer` to transparent black.
    fn clear(&mut self, framebuffer: FramebufferId) -> Result<(), GpuError>;

    /// Draws `vertices.len() / QUAD_FLOATS` quads sampling `texture` into `framebuffer`.
    ///
    /// `vertices` follows the layout documented in this module. Colors are
    /// blended as premultiplied alpha.
    fn draw_quads(
        &mut self,
        framebuffer: FramebufferId,
        texture: TextureId,
        vertices: &[f32],
    ) -> Result<(), GpuError>;

    /// Submits recorded work and presents the output surface if it was drawn.
    fn flush(&mut self) -> Result<(), GpuError>;

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId);

    fn delete_texture(&mut self, texture: TextureId);
}
