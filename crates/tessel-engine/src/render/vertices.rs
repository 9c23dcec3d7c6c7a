//! Quad vertex generation and the pooled vertex arena.
//!
//! Every quad is 104 `f32` laid out as documented in [`crate::device`]:
//! four vertices of `[x, y, u, v, u_opp, v_opp, body[16], translate[4]]`.
//! `u_opp, v_opp` is the diagonally opposite texture coordinate; the fragment
//! stage uses the pair to recover the source rectangle without a uniform.

use crate::affine::{ColorMatrix, GeometryMatrix};
use crate::device::{
    COLOR_BODY_OFFSET, COLOR_TRANSLATE_OFFSET, POSITION_OFFSET, QUAD_FLOATS, QUAD_VERTICES,
    UV_OFFSET, UV_OPPOSITE_OFFSET, VERTEX_FLOATS,
};

/// Default arena capacity in quads.
pub const DEFAULT_ARENA_QUADS: usize = 1024;

/// Source rectangle of one quad in texels of the texture's logical size.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SourceRect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl SourceRect {
    #[inline]
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Empty, inverted, entirely non-positive or non-finite rectangles produce no geometry.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        let finite = self.x0.is_finite()
            && self.y0.is_finite()
            && self.x1.is_finite()
            && self.y1.is_finite();
        !finite || self.x0 >= self.x1 || self.y0 >= self.y1 || self.x1 <= 0.0 || self.y1 <= 0.0
    }
}

/// Writes one quad into `out[..QUAD_FLOATS]`.
///
/// `width` and `height` are the logical texture size; UVs are normalized
/// against the next power of two of each, matching the padded storage.
/// `geo` maps the local rectangle `(0, 0)-(x1 - x0, y1 - y0)` to target pixels.
/// Returns `false` without touching `out` when `src` is degenerate.
pub fn write_quad(
    out: &mut [f32],
    width: u32,
    height: u32,
    src: SourceRect,
    geo: &GeometryMatrix,
    color: &ColorMatrix,
) -> bool {
    if src.is_degenerate() {
        return false;
    }
    debug_assert!(out.len() >= QUAD_FLOATS, "quad region too small: {}", out.len());

    let (Some(w), Some(h)) = (
        width.max(1).checked_next_power_of_two(),
        height.max(1).checked_next_power_of_two(),
    ) else {
        return false;
    };
    let (w, h) = (w as f32, h as f32);
    let (u0, v0, u1, v1) = (src.x0 / w, src.y0 / h, src.x1 / w, src.y1 / h);

    let x1 = f64::from(src.x1 - src.x0);
    let y1 = f64::from(src.y1 - src.y0);

    // (local corner, uv, opposite uv)
    let corners = [
        ((0.0, 0.0), [u0, v0], [u1, v1]),
        ((x1, 0.0), [u1, v0], [u0, v1]),
        ((0.0, y1), [u0, v1], [u1, v0]),
        ((x1, y1), [u1, v1], [u0, v0]),
    ];

    let (body, translate) = color.elements();

    for (vertex, ((lx, ly), uv, uv_opposite)) in
        out[..QUAD_FLOATS].chunks_exact_mut(VERTEX_FLOATS).zip(corners)
    {
        let (x, y) = geo.apply32(lx, ly);
        vertex[POSITION_OFFSET] = x;
        vertex[POSITION_OFFSET + 1] = y;
        vertex[UV_OFFSET..UV_OFFSET + 2].copy_from_slice(&uv);
        vertex[UV_OPPOSITE_OFFSET..UV_OPPOSITE_OFFSET + 2].copy_from_slice(&uv_opposite);
        vertex[COLOR_BODY_OFFSET..COLOR_TRANSLATE_OFFSET].copy_from_slice(&body);
        vertex[COLOR_TRANSLATE_OFFSET..VERTEX_FLOATS].copy_from_slice(&translate);
    }
    true
}

/// Generates one quad into the next arena region.
///
/// Returns `None` for a degenerate source; no arena space is consumed then.
/// The returned slice is only valid until the next arena request, which the
/// borrow on `arena` enforces.
pub fn quad_vertices<'a>(
    arena: &'a mut VertexArena,
    width: u32,
    height: u32,
    src: SourceRect,
    geo: &GeometryMatrix,
    color: &ColorMatrix,
) -> Option<&'a [f32]> {
    if src.is_degenerate() {
        return None;
    }
    let region = arena.get();
    write_quad(region, width, height, src, geo, color);
    Some(region)
}

/// Reusable flat vertex store handing out quad-sized regions.
///
/// Regions are taken from a ring: when the next request does not fit, the
/// cursor restarts at zero and [`generation`](Self::generation) increments.
/// The backing storage is allocated once.
#[derive(Debug)]
pub struct VertexArena {
    store: Vec<f32>,
    /// Next free float.
    cursor: usize,
    generation: u64,
}

impl Default for VertexArena {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_ARENA_QUADS)
    }
}

impl VertexArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arena holding `quads` quads (at least one).
    pub fn with_capacity(quads: usize) -> Self {
        Self {
            store: vec![0.0; quads.max(1) * QUAD_FLOATS],
            cursor: 0,
            generation: 0,
        }
    }

    #[inline]
    pub fn capacity_quads(&self) -> usize {
        self.store.len() / QUAD_FLOATS
    }

    /// Number of times the ring restarted from zero.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Next single-quad region.
    pub fn get(&mut self) -> &mut [f32] {
        let start = self.reserve(QUAD_FLOATS);
        &mut self.store[start..start + QUAD_FLOATS]
    }

    /// Reserves a contiguous window for up to `quads` quads (clamped to capacity).
    pub fn checkout(&mut self, quads: usize) -> VertexBatch<'_> {
        let quads = quads.clamp(1, self.capacity_quads());
        let floats = quads * QUAD_FLOATS;
        let start = self.reserve(floats);
        VertexBatch {
            region: &mut self.store[start..start + floats],
            len: 0,
        }
    }

    fn reserve(&mut self, floats: usize) -> usize {
        if self.cursor + floats > self.store.len() {
            self.cursor = 0;
            self.generation += 1;
            log::trace!("vertex arena wrapped (generation {})", self.generation);
        }
        let start = self.cursor;
        self.cursor += floats;
        start
    }
}

/// Contiguous arena window filled quad by quad and submitted as one draw.
#[derive(Debug)]
pub struct VertexBatch<'a> {
    region: &'a mut [f32],
    /// Quads written so far.
    len: usize,
}

impl VertexBatch<'_> {
    /// Appends one quad. Returns `false` when `src` is degenerate or the window is full.
    pub fn push_quad(
        &mut self,
        width: u32,
        height: u32,
        src: SourceRect,
        geo: &GeometryMatrix,
        color: &ColorMatrix,
    ) -> bool {
        if self.is_full() {
            return false;
        }
        let start = self.len * QUAD_FLOATS;
        let written = write_quad(
            &mut self.region[start..start + QUAD_FLOATS],
            width,
            height,
            src,
            geo,
            color,
        );
        if written {
            self.len += 1;
        }
        written
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len * QUAD_FLOATS >= self.region.len()
    }

    #[inline]
    pub fn quad_count(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The filled part of the window.
    #[inline]
    pub fn vertices(&self) -> &[f32] {
        &self.region[..self.len * QUAD_FLOATS]
    }
}

/// Vertex `i` of a quad (test and debugging helper).
#[inline]
pub fn vertex(quad: &[f32], i: usize) -> &[f32] {
    debug_assert!(i < QUAD_VERTICES);
    &quad[i * VERTEX_FLOATS..(i + 1) * VERTEX_FLOATS]
}
