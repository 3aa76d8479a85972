use glam::Vec3;

use crate::color::hex;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AmbientLight {
    pub color: Vec3,
    pub intensity: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalLight {
    pub position: Vec3,
    pub target: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpotLight {
    pub position: Vec3,
    pub target: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    /// Half-angle of the cone, radians.
    pub angle: f32,
    pub penumbra: f32,
}

/// One light sample at a surface point: direction towards the light and arriving radiance.
#[derive(Clone, Copy, Debug)]
pub struct LightSample {
    pub direction: Vec3,
    pub radiance: Vec3,
}

impl DirectionalLight {
    pub fn sample(&self) -> LightSample {
        LightSample {
            direction: (self.position - self.target).normalize(),
            radiance: self.color * self.intensity,
        }
    }
}

impl PointLight {
    pub fn sample(&self, at: Vec3) -> LightSample {
        let to_light = self.position - at;
        let d2 = to_light.length_squared().max(1e-4);
        LightSample {
            direction: to_light / d2.sqrt(),
            radiance: self.color * self.intensity / d2,
        }
    }
}

impl SpotLight {
    pub fn sample(&self, at: Vec3) -> LightSample {
        let to_light = self.position - at;
        let d2 = to_light.length_squared().max(1e-4);
        let direction = to_light / d2.sqrt();
        let axis = (self.target - self.position).normalize();
        let cos_outer = self.angle.cos();
        let cos_inner = (self.angle * (1.0 - self.penumbra)).cos();
        let cone = crate::color::smoothstep(cos_outer, cos_inner, (-direction).dot(axis));
        LightSample {
            direction,
            radiance: self.color * self.intensity * cone / d2,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Lights {
    pub ambient: AmbientLight,
    pub directional: Vec<DirectionalLight>,
    pub points: Vec<PointLight>,
    pub spots: Vec<SpotLight>,
}

impl Lights {
    /// Cool key light, blue rim spot and a green glow inside the container.
    pub fn studio() -> Self {
        Self {
            ambient: AmbientLight {
                color: Vec3::ONE,
                intensity: 0.25,
            },
            directional: vec![DirectionalLight {
                position: Vec3::new(5.0, 6.0, 3.0),
                target: Vec3::ZERO,
                color: hex(0x9fe6c3),
                intensity: 2.2,
            }],
            points: vec![PointLight {
                position: Vec3::new(0.0, 1.1, 0.0),
                color: hex(0x00ff88),
                intensity: 1.8,
            }],
            spots: vec![SpotLight {
                position: Vec3::new(-6.0, 8.0, -4.0),
                target: Vec3::ZERO,
                color: hex(0x88c0ff),
                intensity: 2.0,
                angle: 0.45,
                penumbra: 0.5,
            }],
        }
    }

    pub fn samples(&self, at: Vec3) -> impl Iterator<Item = LightSample> + '_ {
        self.directional
            .iter()
            .map(DirectionalLight::sample)
            .chain(self.points.iter().map(move |l| l.sample(at)))
            .chain(self.spots.iter().map(move |l| l.sample(at)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_light_falls_off_with_square_distance() {
        let l = PointLight {
            position: Vec3::ZERO,
            color: Vec3::ONE,
            intensity: 4.0,
        };
        let near = l.sample(Vec3::new(1.0, 0.0, 0.0));
        let far = l.sample(Vec3::new(2.0, 0.0, 0.0));
        assert!((near.radiance.x - 4.0).abs() < 1e-5);
        assert!((far.radiance.x - 1.0).abs() < 1e-5);
        assert!((near.direction - Vec3::NEG_X).length() < 1e-6);
    }

    #[test]
    fn spot_light_is_dark_outside_cone() {
        let l = SpotLight {
            position: Vec3::new(0.0, 5.0, 0.0),
            target: Vec3::ZERO,
            color: Vec3::ONE,
            intensity: 1.0,
            angle: 0.45,
            penumbra: 0.5,
        };
        assert!(l.sample(Vec3::ZERO).radiance.x > 0.0);
        assert_eq!(l.sample(Vec3::new(10.0, 0.0, 0.0)).radiance.x, 0.0);
    }
}
