//! Procedural straight-alpha RGBA8 images, generated off the render thread.

/// Two-color checkerboard, `size` × `size`, with square cells of `cell` pixels.
pub fn checker(size: u32, cell: u32, a: [u8; 4], b: [u8; 4]) -> Vec<u8> {
    let cell = cell.max(1);
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let c = if (x / cell + y / cell) % 2 == 0 { a } else { b };
            pixels.extend_from_slice(&c);
        }
    }
    pixels
}

/// Soft disc of color `rgb`: opaque in the middle, fading to transparent at the rim.
pub fn orb(size: u32, rgb: [u8; 3]) -> Vec<u8> {
    let r = size as f32 / 2.0;
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let dx = x as f32 + 0.5 - r;
            let dy = y as f32 + 0.5 - r;
            let d = (dx * dx + dy * dy).sqrt() / r;
            let alpha = (1.0 - d).clamp(0.0, 1.0).powf(0.6);
            pixels.extend_from_slice(&[rgb[0], rgb[1], rgb[2], (alpha * 255.0).round() as u8]);
        }
    }
    pixels
}
