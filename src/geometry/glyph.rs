//! Seven-segment digit meshes for the floating neon numbers.

use glam::{Mat4, Vec3};

use crate::error::{InvalidParameters, require_positive};
use crate::geometry::mesh::TriangleMesh;
use crate::geometry::primitives::plane_mesh;

const WIDTH_RATIO: f32 = 0.55;
const STROKE_RATIO: f32 = 0.12;

// Bits a..g, a = top, clockwise, g = middle.
const SEGMENTS: [u8; 10] = [
    0b0111111, // 0
    0b0000110, // 1
    0b1011011, // 2
    0b1001111, // 3
    0b1100110, // 4
    0b1101101, // 5
    0b1111101, // 6
    0b0000111, // 7
    0b1111111, // 8
    0b1101111, // 9
];

/// Digit `c` with cap height `size`, centred, facing +Z.
pub fn digit_mesh(c: char, size: f32) -> Result<TriangleMesh, InvalidParameters> {
    require_positive("glyph size", size)?;
    let digit = c
        .to_digit(10)
        .ok_or_else(|| InvalidParameters::new(format!("no glyph for {c:?}")))?;

    let h = size;
    let w = size * WIDTH_RATIO;
    let t = size * STROKE_RATIO;

    // (centre, extent) per segment a..g
    let rects = [
        (Vec3::new(0.0, h / 2.0 - t / 2.0, 0.0), (w, t)),
        (Vec3::new(w / 2.0 - t / 2.0, h / 4.0, 0.0), (t, h / 2.0)),
        (Vec3::new(w / 2.0 - t / 2.0, -h / 4.0, 0.0), (t, h / 2.0)),
        (Vec3::new(0.0, -h / 2.0 + t / 2.0, 0.0), (w, t)),
        (Vec3::new(-w / 2.0 + t / 2.0, -h / 4.0, 0.0), (t, h / 2.0)),
        (Vec3::new(-w / 2.0 + t / 2.0, h / 4.0, 0.0), (t, h / 2.0)),
        (Vec3::ZERO, (w, t)),
    ];

    let mask = SEGMENTS[digit as usize];
    let mut mesh = TriangleMesh::default();
    for (bit, (centre, (sw, sh))) in rects.into_iter().enumerate() {
        if mask & (1 << bit) != 0 {
            let quad = plane_mesh(sw, sh)?.transformed(Mat4::from_translation(centre));
            mesh.append(&quad);
        }
    }
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eight_lights_every_segment() {
        let m = digit_mesh('8', 0.28).unwrap();
        assert_eq!(m.triangle_count(), 7 * 2);
        let one = digit_mesh('1', 0.28).unwrap();
        assert_eq!(one.triangle_count(), 2 * 2);
    }

    #[test]
    fn glyph_fits_its_cell() {
        let m = digit_mesh('0', 0.28).unwrap();
        let (lo, hi) = m.bounds().unwrap();
        assert!((hi.y - lo.y - 0.28).abs() < 1e-5);
        assert!((hi.x - lo.x - 0.28 * WIDTH_RATIO).abs() < 1e-5);
        assert_eq!(lo.z, 0.0);
        assert_eq!(hi.z, 0.0);
    }

    #[test]
    fn rejects_non_digits() {
        assert!(digit_mesh('x', 0.28).is_err());
        assert!(digit_mesh('3', 0.0).is_err());
    }
}
