/// Number of columns of a [`GeometryMatrix`] (the implicit third row is `[0 0 1]`).
pub const GEOMETRY_MATRIX_DIM: usize = 3;

#[derive(Debug, Copy, Clone, PartialEq)]
struct GeometryElements {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    tx: f64,
    ty: f64,
}

impl GeometryElements {
    const IDENTITY: Self = Self { a: 1.0, b: 0.0, c: 0.0, d: 1.0, tx: 0.0, ty: 0.0 };

    #[inline]
    fn det(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }
}

/// 2×3 affine transform applied to geometry when drawing an image.
///
/// Rows are `[a b tx; c d ty]`. The default value is the identity and is
/// stored implicitly, so untransformed draws carry no coefficients at all.
///
/// Transforms accumulate in call order: `m.scale(2.0, 2.0); m.translate(10.0, 0.0);`
/// scales first, then translates.
#[derive(Debug, Copy, Clone, Default)]
pub struct GeometryMatrix {
    elements: Option<GeometryElements>,
}

impl GeometryMatrix {
    /// Identity transform.
    #[inline]
    pub const fn identity() -> Self {
        Self { elements: None }
    }

    /// Builds a matrix from its six coefficients.
    #[inline]
    pub const fn new(a: f64, b: f64, c: f64, d: f64, tx: f64, ty: f64) -> Self {
        Self { elements: Some(GeometryElements { a, b, c, d, tx, ty }) }
    }

    #[inline]
    pub fn scaling(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    #[inline]
    pub fn translation(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// Rotation by `theta` radians (+Y down, so positive angles turn clockwise on screen).
    #[inline]
    pub fn rotation(theta: f64) -> Self {
        let (sin, cos) = theta.sin_cos();
        Self::new(cos, -sin, sin, cos, 0.0, 0.0)
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        self.elements.is_none()
    }

    /// Returns `(a, b, c, d, tx, ty)`.
    #[inline]
    pub fn elements(&self) -> (f64, f64, f64, f64, f64, f64) {
        let e = self.elements.unwrap_or(GeometryElements::IDENTITY);
        (e.a, e.b, e.c, e.d, e.tx, e.ty)
    }

    /// Resets the matrix to identity.
    #[inline]
    pub fn reset(&mut self) {
        self.elements = None;
    }

    /// Computes `M * (x, y, 1)^T`.
    #[inline]
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        match &self.elements {
            None => (x, y),
            Some(e) => (e.a * x + e.b * y + e.tx, e.c * x + e.d * y + e.ty),
        }
    }

    /// Like [`apply`](Self::apply), rounded to `f32` for vertex data.
    #[inline]
    pub fn apply32(&self, x: f64, y: f64) -> (f32, f32) {
        let (x, y) = self.apply(x, y);
        (x as f32, y as f32)
    }

    /// Appends `other`: the result applies `self` first, then `other`
    /// (`other * self` in matrix terms).
    pub fn concat(&mut self, other: &GeometryMatrix) {
        let Some(o) = other.elements else { return };
        let Some(s) = self.elements else {
            self.elements = Some(o);
            return;
        };

        self.elements = Some(GeometryElements {
            a: o.a * s.a + o.b * s.c,
            b: o.a * s.b + o.b * s.d,
            c: o.c * s.a + o.d * s.c,
            d: o.c * s.b + o.d * s.d,
            tx: o.a * s.tx + o.b * s.ty + o.tx,
            ty: o.c * s.tx + o.d * s.ty + o.ty,
        });
    }

    #[inline]
    pub fn scale(&mut self, sx: f64, sy: f64) {
        self.concat(&Self::scaling(sx, sy));
    }

    #[inline]
    pub fn translate(&mut self, tx: f64, ty: f64) {
        self.concat(&Self::translation(tx, ty));
    }

    /// Rotates by `theta` radians.
    #[inline]
    pub fn rotate(&mut self, theta: f64) {
        self.concat(&Self::rotation(theta));
    }

    #[inline]
    pub fn is_invertible(&self) -> bool {
        match &self.elements {
            None => true,
            Some(e) => e.det() != 0.0,
        }
    }

    /// Inverts the matrix in place.
    ///
    /// # Panics
    /// Panics if the matrix is not invertible; check [`is_invertible`](Self::is_invertible) first.
    pub fn invert(&mut self) {
        let Some(e) = self.elements else { return };
        let det = e.det();
        assert!(det != 0.0, "GeometryMatrix::invert: matrix is not invertible");

        self.elements = Some(GeometryElements {
            a: e.d / det,
            b: -e.b / det,
            c: -e.c / det,
            d: e.a / det,
            tx: (-e.d * e.tx + e.b * e.ty) / det,
            ty: (e.c * e.tx - e.a * e.ty) / det,
        });
    }

    /// Returns the element at row `i`, column `j`.
    ///
    /// # Panics
    /// Panics unless `i < 2` and `j < 3`.
    pub fn element(&self, i: usize, j: usize) -> f64 {
        let e = self.elements.unwrap_or(GeometryElements::IDENTITY);
        match (i, j) {
            (0, 0) => e.a,
            (0, 1) => e.b,
            (0, 2) => e.tx,
            (1, 0) => e.c,
            (1, 1) => e.d,
            (1, 2) => e.ty,
            _ => panic!("GeometryMatrix::element: ({i}, {j}) is out of range"),
        }
    }

    /// Sets the element at row `i`, column `j`.
    ///
    /// # Panics
    /// Panics unless `i < 2` and `j < 3`.
    pub fn set_element(&mut self, i: usize, j: usize, value: f64) {
        let mut e = self.elements.unwrap_or(GeometryElements::IDENTITY);
        let slot = match (i, j) {
            (0, 0) => &mut e.a,
            (0, 1) => &mut e.b,
            (0, 2) => &mut e.tx,
            (1, 0) => &mut e.c,
            (1, 1) => &mut e.d,
            (1, 2) => &mut e.ty,
            _ => panic!("GeometryMatrix::set_element: ({i}, {j}) is out of range"),
        };
        *slot = value;
        self.elements = Some(e);
    }
}

impl PartialEq for GeometryMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.elements() == other.elements()
    }
}
