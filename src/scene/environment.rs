//! Reflection environments. Resolved once when the scene is assembled.

use std::fmt::Debug;
use std::sync::Arc;

use glam::Vec3;

use crate::color::hex;
use crate::error::InvalidParameters;

pub trait EnvironmentMap: Debug + Send + Sync {
    /// Incoming radiance from world direction `dir` (unit length).
    fn radiance(&self, dir: Vec3) -> Vec3;
}

/// Three-band sky: zenith, horizon and ground, with a warm streak of city lights
/// just above the horizon.
#[derive(Clone, Debug, PartialEq)]
pub struct GradientEnvironment {
    pub zenith: Vec3,
    pub horizon: Vec3,
    pub ground: Vec3,
    pub glow: Vec3,
    pub intensity: f32,
}

impl GradientEnvironment {
    pub fn city() -> Self {
        Self {
            zenith: hex(0x1d2b45),
            horizon: hex(0x8a9bb5),
            ground: hex(0x2a2623),
            glow: hex(0xffb86b),
            intensity: 1.0,
        }
    }

    pub fn night() -> Self {
        Self {
            zenith: hex(0x02040a),
            horizon: hex(0x1b2436),
            ground: hex(0x050608),
            glow: hex(0x3a6cff),
            intensity: 0.6,
        }
    }
}

impl EnvironmentMap for GradientEnvironment {
    fn radiance(&self, dir: Vec3) -> Vec3 {
        let y = dir.y.clamp(-1.0, 1.0);
        let sky = if y >= 0.0 {
            self.horizon.lerp(self.zenith, y.powf(0.6))
        } else {
            self.horizon.lerp(self.ground, (-y).powf(0.3))
        };
        let streak = (-((y - 0.08) / 0.06).powi(2)).exp();
        (sky + self.glow * streak * 0.5) * self.intensity
    }
}

/// Looks up a named environment preset.
pub fn environment_preset(id: &str) -> Result<Arc<dyn EnvironmentMap>, InvalidParameters> {
    match id {
        "city" => Ok(Arc::new(GradientEnvironment::city())),
        "night" => Ok(Arc::new(GradientEnvironment::night())),
        other => Err(InvalidParameters::new(format!(
            "unknown environment preset {other:?}"
        ))),
    }
}
