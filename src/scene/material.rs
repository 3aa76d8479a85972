use glam::Vec3;

use crate::color::hex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shading {
    /// Lights, environment and specular.
    Lit,
    /// Flat base colour, no lighting.
    Unlit,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    /// Linear RGB.
    pub base_color: Vec3,
    pub emissive: Vec3,
    pub metalness: f32,
    pub roughness: f32,
    pub opacity: f32,
    pub transmission: f32,
    pub clearcoat: f32,
    pub shading: Shading,
    pub double_sided: bool,
}

impl Material {
    pub fn standard(rgb: u32, metalness: f32, roughness: f32) -> Self {
        Self {
            base_color: hex(rgb),
            emissive: Vec3::ZERO,
            metalness,
            roughness,
            opacity: 1.0,
            transmission: 0.0,
            clearcoat: 0.0,
            shading: Shading::Lit,
            double_sided: false,
        }
    }

    pub fn unlit(rgb: u32, opacity: f32) -> Self {
        Self {
            opacity,
            shading: Shading::Unlit,
            ..Self::standard(rgb, 0.0, 1.0)
        }
    }

    pub fn frame_metal() -> Self {
        Self::standard(0x101826, 0.9, 0.25)
    }

    pub fn floor_metal() -> Self {
        Self::standard(0x0b1220, 0.8, 0.4)
    }

    pub fn gold() -> Self {
        Self::standard(0xf4c95d, 1.0, 0.2)
    }

    pub fn dark_glass() -> Self {
        Self {
            opacity: 0.9,
            transmission: 0.7,
            clearcoat: 1.0,
            double_sided: true,
            ..Self::standard(0x0a0f19, 0.2, 0.1)
        }
    }

    pub fn neon() -> Self {
        Self {
            double_sided: true,
            ..Self::unlit(0x00ff88, 1.0)
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.opacity < 1.0 || self.transmission > 0.0
    }
}
