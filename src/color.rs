use glam::Vec3;

pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

pub fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// `0xRRGGBB` sRGB colour to linear RGB.
pub fn hex(rgb: u32) -> Vec3 {
    let r = ((rgb >> 16) & 0xff) as f32 / 255.0;
    let g = ((rgb >> 8) & 0xff) as f32 / 255.0;
    let b = (rgb & 0xff) as f32 / 255.0;
    Vec3::new(srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b))
}

pub fn luminance(c: Vec3) -> f32 {
    c.dot(Vec3::new(0.2126, 0.7152, 0.0722))
}

/// Linear colour to an 8-bit sRGB channel triple, clamped.
pub fn encode_srgb8(c: Vec3) -> [u8; 3] {
    let q = |v: f32| (linear_to_srgb(v.clamp(0.0, 1.0)) * 255.0 + 0.5) as u8;
    [q(c.x), q(c.y), q(c.z)]
}

/// Hermite step from `edge0` to `edge1`. Equal edges give a hard step at the edge.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge0 == edge1 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srgb_round_trip_is_stable() {
        for i in 0..=255u32 {
            let v = i as f32 / 255.0;
            let back = linear_to_srgb(srgb_to_linear(v));
            assert!((back - v).abs() < 1e-4, "{v} -> {back}");
        }
    }

    #[test]
    fn hex_decodes_channels() {
        let c = hex(0x00ff88);
        assert_eq!(c.x, 0.0);
        assert!((c.y - 1.0).abs() < 1e-6);
        assert!(c.z > 0.2 && c.z < 0.3);
    }

    #[test]
    fn smoothstep_handles_reversed_edges() {
        assert_eq!(smoothstep(0.8, 0.16, 0.0), 1.0);
        assert_eq!(smoothstep(0.8, 0.16, 1.0), 0.0);
    }

    #[test]
    fn smoothstep_with_equal_edges_is_a_step() {
        assert_eq!(smoothstep(0.2, 0.2, 0.1), 0.0);
        assert_eq!(smoothstep(0.2, 0.2, 0.2), 1.0);
        assert_eq!(smoothstep(0.2, 0.2, 0.3), 1.0);
    }
}
