use crate::paint::Color;

/// Number of columns of a [`ColorMatrix`]: four channels plus the translate column.
pub const COLOR_MATRIX_DIM: usize = 5;

const BODY_IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0, //
];

// Full-range BT.601 conversions, column-major like `ColorElements::body`.
// Y is in [0, 1], Cb and Cr in [-0.5, 0.5].
const RGB_TO_YCBCR: [f32; 16] = [
    0.2990, -0.1687, 0.5000, 0.0, //
    0.5870, -0.3313, -0.4187, 0.0, //
    0.1140, 0.5000, -0.0813, 0.0, //
    0.0, 0.0, 0.0, 1.0, //
];

const YCBCR_TO_RGB: [f32; 16] = [
    1.0, 1.0, 1.0, 0.0, //
    0.0, -0.34414, 1.77200, 0.0, //
    1.40200, -0.71414, 0.0, 0.0, //
    0.0, 0.0, 0.0, 1.0, //
];

#[derive(Debug, Copy, Clone, PartialEq)]
struct ColorElements {
    /// 4×4 body, column-major: element `(i, j)` lives at `body[i + 4 * j]`.
    body: [f32; 16],
    translate: [f32; 4],
}

impl ColorElements {
    const IDENTITY: Self = Self { body: BODY_IDENTITY, translate: [0.0; 4] };

    #[inline]
    const fn from_body(body: [f32; 16]) -> Self {
        Self { body, translate: [0.0; 4] }
    }
}

/// 4×5 affine transform applied to colors when drawing an image.
///
/// The matrix acts on the straight-alpha vector `(r, g, b, a, 1)`. Since image
/// storage is premultiplied, [`apply`](Self::apply) un-premultiplies first,
/// clamps every channel to `[0, 1]` and premultiplies again. The GPU path
/// performs the same steps per fragment.
///
/// The default value is the identity and is stored implicitly.
#[derive(Debug, Copy, Clone, Default)]
pub struct ColorMatrix {
    elements: Option<ColorElements>,
}

impl ColorMatrix {
    #[inline]
    pub const fn identity() -> Self {
        Self { elements: None }
    }

    /// Diagonal scale matrix.
    #[inline]
    pub fn scaling(r: f32, g: f32, b: f32, a: f32) -> Self {
        let mut body = [0.0; 16];
        body[0] = r;
        body[5] = g;
        body[10] = b;
        body[15] = a;
        Self { elements: Some(ColorElements::from_body(body)) }
    }

    /// Pure translation matrix.
    #[inline]
    pub fn translation(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { elements: Some(ColorElements { body: BODY_IDENTITY, translate: [r, g, b, a] }) }
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        self.elements.is_none()
    }

    /// Returns the column-major body and the translate column.
    #[inline]
    pub fn elements(&self) -> ([f32; 16], [f32; 4]) {
        let e = self.elements.unwrap_or(ColorElements::IDENTITY);
        (e.body, e.translate)
    }

    #[inline]
    pub fn reset(&mut self) {
        self.elements = None;
    }

    /// Transforms a premultiplied color.
    ///
    /// The identity matrix returns `color` untouched.
    pub fn apply(&self, color: Color) -> Color {
        let Some(e) = &self.elements else { return color };

        let (r, g, b, a) = color.to_straight();
        let v = [r, g, b, a];
        let mut out = [0.0f32; 4];
        for (i, o) in out.iter_mut().enumerate() {
            *o = e.body[i] * v[0]
                + e.body[i + 4] * v[1]
                + e.body[i + 8] * v[2]
                + e.body[i + 12] * v[3]
                + e.translate[i];
        }

        Color::from_straight(out[0], out[1], out[2], out[3])
    }

    /// Appends `other`: the result applies `self` first, then `other`.
    pub fn concat(&mut self, other: &ColorMatrix) {
        let Some(lhs) = other.elements else { return };
        let Some(rhs) = self.elements else {
            self.elements = Some(lhs);
            return;
        };

        let mut body = [0.0f32; 16];
        for j in 0..4 {
            for i in 0..4 {
                body[i + 4 * j] = (0..4).map(|k| lhs.body[i + 4 * k] * rhs.body[k + 4 * j]).sum();
            }
        }

        let mut translate = [0.0f32; 4];
        for (i, t) in translate.iter_mut().enumerate() {
            *t = (0..4).map(|k| lhs.body[i + 4 * k] * rhs.translate[k]).sum::<f32>()
                + lhs.translate[i];
        }

        self.elements = Some(ColorElements { body, translate });
    }

    #[inline]
    pub fn scale(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.concat(&Self::scaling(r, g, b, a));
    }

    #[inline]
    pub fn translate(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.concat(&Self::translation(r, g, b, a));
    }

    /// Rotates the hue by `theta` radians.
    #[inline]
    pub fn rotate_hue(&mut self, theta: f64) {
        self.change_hsv(theta, 1.0, 1.0);
    }

    /// Rotates hue by `hue_theta` radians and scales saturation and value.
    ///
    /// Works in YCbCr: hue is a rotation of the (Cb, Cr) plane, saturation
    /// scales chroma and value scales every component.
    pub fn change_hsv(&mut self, hue_theta: f64, saturation_scale: f32, value_scale: f32) {
        let (sin, cos) = hue_theta.sin_cos();
        let (s, c) = (sin as f32, cos as f32);

        self.concat(&Self { elements: Some(ColorElements::from_body(RGB_TO_YCBCR)) });
        self.concat(&Self {
            elements: Some(ColorElements::from_body([
                1.0, 0.0, 0.0, 0.0, //
                0.0, c, s, 0.0, //
                0.0, -s, c, 0.0, //
                0.0, 0.0, 0.0, 1.0, //
            ])),
        });

        let sv = saturation_scale * value_scale;
        self.scale(value_scale, sv, sv, 1.0);
        self.concat(&Self { elements: Some(ColorElements::from_body(YCBCR_TO_RGB)) });
    }

    /// Returns the element at row `i`, column `j`; column 4 is the translate column.
    ///
    /// # Panics
    /// Panics unless `i < 4` and `j < 5`.
    pub fn element(&self, i: usize, j: usize) -> f32 {
        Self::check_index("element", i, j);
        let e = self.elements.unwrap_or(ColorElements::IDENTITY);
        if j < COLOR_MATRIX_DIM - 1 { e.body[i + 4 * j] } else { e.translate[i] }
    }

    /// Sets the element at row `i`, column `j`.
    ///
    /// # Panics
    /// Panics unless `i < 4` and `j < 5`.
    pub fn set_element(&mut self, i: usize, j: usize, value: f32) {
        Self::check_index("set_element", i, j);
        let mut e = self.elements.unwrap_or(ColorElements::IDENTITY);
        if j < COLOR_MATRIX_DIM - 1 {
            e.body[i + 4 * j] = value;
        } else {
            e.translate[i] = value;
        }
        self.elements = Some(e);
    }

    #[inline]
    fn check_index(op: &str, i: usize, j: usize) {
        assert!(
            i < COLOR_MATRIX_DIM - 1 && j < COLOR_MATRIX_DIM,
            "ColorMatrix::{op}: ({i}, {j}) is out of range"
        );
    }
}

impl PartialEq for ColorMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.elements() == other.elements()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    fn close(a: Color, b: Color) -> bool {
        (a.r - b.r).abs() < EPS
            && (a.g - b.g).abs() < EPS
            && (a.b - b.b).abs() < EPS
            && (a.a - b.a).abs() < EPS
    }

    #[test]
    fn identity_apply_is_exact() {
        let m = ColorMatrix::default();
        for c in [
            Color::from_premul(0.1, 0.2, 0.3, 0.4),
            Color::from_premul(1.0, 1.0, 1.0, 1.0),
            Color::from_premul(0.0, 0.0, 0.0, 0.0),
            Color::from_premul(0.333, 0.0, 0.777, 0.9),
        ] {
            assert_eq!(m.apply(c), c);
        }
    }

    #[test]
    fn identity_elements() {
        let m = ColorMatrix::identity();
        for i in 0..4 {
            for j in 0..5 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_eq!(m.element(i, j), expected, "({i}, {j})");
            }
        }
    }

    #[test]
    fn identity_law() {
        let mut m = ColorMatrix::scaling(0.5, 0.25, 1.0, 1.0);
        m.translate(0.1, 0.0, 0.0, 0.0);

        let mut left = m;
        left.concat(&ColorMatrix::identity());
        let mut right = ColorMatrix::identity();
        right.concat(&m);
        assert_eq!(left, m);
        assert_eq!(right, m);
    }

    #[test]
    fn scale_works_on_straight_alpha() {
        let mut m = ColorMatrix::default();
        m.scale(0.5, 1.0, 1.0, 1.0);
        let half_red = Color::from_straight(1.0, 0.0, 0.0, 0.5);
        assert_eq!(m.apply(half_red), Color::from_premul(0.25, 0.0, 0.0, 0.5));
    }

    #[test]
    fn apply_clamps_channels() {
        let mut m = ColorMatrix::default();
        m.translate(0.5, -0.5, 0.0, 0.0);
        let out = m.apply(Color::from_straight(0.75, 0.25, 0.5, 1.0));
        assert_eq!(out, Color::from_premul(1.0, 0.0, 0.5, 1.0));
    }

    #[test]
    fn alpha_translate_lifts_transparent_input() {
        let mut m = ColorMatrix::default();
        m.translate(0.0, 0.0, 0.0, 1.0);
        assert_eq!(m.apply(Color::transparent()), Color::from_premul(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn transparent_input_without_translate_stays_transparent() {
        let mut m = ColorMatrix::default();
        m.scale(0.5, 2.0, 1.0, 3.0);
        assert_eq!(m.apply(Color::transparent()), Color::transparent());
    }

    #[test]
    fn concat_order_matters() {
        let mut scale_then_shift = ColorMatrix::default();
        scale_then_shift.scale(0.5, 1.0, 1.0, 1.0);
        scale_then_shift.translate(0.25, 0.0, 0.0, 0.0);

        let mut shift_then_scale = ColorMatrix::default();
        shift_then_scale.translate(0.25, 0.0, 0.0, 0.0);
        shift_then_scale.scale(0.5, 1.0, 1.0, 1.0);

        assert_eq!(scale_then_shift.element(0, 4), 0.25);
        assert_eq!(shift_then_scale.element(0, 4), 0.125);

        let white = Color::white();
        assert_eq!(scale_then_shift.apply(white).r, 0.75);
        assert_eq!(shift_then_scale.apply(white).r, 0.625);
    }

    #[test]
    fn hue_rotation_round_trip() {
        let theta = 1.2;
        let mut m = ColorMatrix::default();
        m.change_hsv(theta, 1.0, 1.0);
        m.change_hsv(-theta, 1.0, 1.0);

        for c in [
            Color::from_straight(1.0, 0.0, 0.0, 1.0),
            Color::from_straight(0.0, 1.0, 0.0, 1.0),
            Color::from_straight(0.0, 0.0, 1.0, 1.0),
        ] {
            let out = m.apply(c);
            assert!(close(out, c), "{c:?} -> {out:?}");
        }
    }

    #[test]
    fn hue_rotation_changes_color() {
        let mut m = ColorMatrix::default();
        m.rotate_hue(std::f64::consts::FRAC_PI_2);
        let red = Color::from_straight(1.0, 0.0, 0.0, 1.0);
        assert!(!close(m.apply(red), red));
    }

    #[test]
    fn full_turn_is_identity_within_tolerance() {
        let mut m = ColorMatrix::default();
        m.rotate_hue(std::f64::consts::TAU);
        let c = Color::from_straight(0.2, 0.6, 0.9, 1.0);
        assert!(close(m.apply(c), c));
    }

    #[test]
    fn zero_saturation_yields_luma() {
        let mut m = ColorMatrix::default();
        m.change_hsv(0.0, 0.0, 1.0);
        let out = m.apply(Color::from_straight(1.0, 0.0, 0.0, 1.0));
        assert!(close(out, Color::from_straight(0.299, 0.299, 0.299, 1.0)), "{out:?}");
    }

    #[test]
    fn set_element_translate_column() {
        let mut m = ColorMatrix::default();
        m.set_element(3, 4, -0.5);
        assert!(!m.is_identity());
        let (_, t) = m.elements();
        assert_eq!(t, [0.0, 0.0, 0.0, -0.5]);
        assert_eq!(m.element(3, 3), 1.0);
    }

    #[test]
    fn element_is_row_column() {
        let mut m = ColorMatrix::default();
        m.set_element(0, 1, 0.7);
        let (body, _) = m.elements();
        // Row 0, column 1 contributes green to red.
        assert_eq!(body[4], 0.7);
        let out = m.apply(Color::from_straight(0.0, 1.0, 0.0, 1.0));
        assert!(close(out, Color::from_straight(0.7, 1.0, 0.0, 1.0)));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn element_out_of_range_panics() {
        ColorMatrix::default().element(4, 0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn set_element_out_of_range_panics() {
        ColorMatrix::default().set_element(0, 5, 1.0);
    }
}
