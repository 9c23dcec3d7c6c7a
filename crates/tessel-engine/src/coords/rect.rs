/// Axis-aligned rectangle in pixels (top-left origin, +Y down).
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// `width` × `height` at the origin.
    #[inline]
    pub const fn from_size(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    #[inline]
    pub fn right(self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(self) -> f32 {
        self.y + self.height
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Splits a sheet of `columns` equal cells per row into the cell at `index`.
    pub fn cell(self, columns: u32, cell_width: f32, cell_height: f32, index: u32) -> Rect {
        let columns = columns.max(1);
        Rect::new(
            self.x + (index % columns) as f32 * cell_width,
            self.y + (index / columns) as f32 * cell_height,
            cell_width,
            cell_height,
        )
    }
}
