use std::f32::consts::TAU;
use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{InvalidParameters, require_positive};

/// Resting height of every instance before jitter.
pub const BASE_HEIGHT: f32 = 0.08;

const JITTER_MIN: f32 = 0.08;
const JITTER_MAX: f32 = 0.5;
const JITTER_STEP: f32 = 0.015;
const JITTER_SCALE: f32 = 0.03;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InstanceTransform {
    pub position: Vec3,
    /// Rotation about +Y, radians in `[0, 2π)`.
    pub yaw: f32,
    pub scale: f32,
}

impl InstanceTransform {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.scale),
            Quat::from_rotation_y(self.yaw),
            self.position,
        )
    }
}

/// Immutable batch of transforms. Clones share storage; nothing can mutate it.
#[derive(Clone, Debug, PartialEq)]
pub struct InstanceSet {
    transforms: Arc<[InstanceTransform]>,
}

impl InstanceSet {
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn transforms(&self) -> &[InstanceTransform] {
        &self.transforms
    }

    pub fn matrices(&self) -> Vec<Mat4> {
        self.transforms.iter().map(InstanceTransform::matrix).collect()
    }
}

/// Scatters `count` transforms over the X/Z rectangle centred on the origin.
/// `None` draws the seed from the OS.
pub fn build_instance_transforms(
    count: usize,
    bounds_x: f32,
    bounds_z: f32,
    seed: Option<u64>,
) -> Result<InstanceSet, InvalidParameters> {
    require_positive("bounds_x", bounds_x)?;
    require_positive("bounds_z", bounds_z)?;

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let half_x = bounds_x / 2.0;
    let half_z = bounds_z / 2.0;

    let transforms: Vec<InstanceTransform> = (0..count)
        .map(|i| {
            let x = rng.gen_range(-half_x..=half_x);
            let z = rng.gen_range(-half_z..=half_z);
            let jitter = rng.gen_range(JITTER_MIN..JITTER_MAX) + (i % 5) as f32 * JITTER_STEP;
            let yaw = rng.gen_range(0.0..TAU);
            InstanceTransform {
                position: Vec3::new(x, BASE_HEIGHT + jitter * JITTER_SCALE, z),
                yaw,
                scale: 1.0,
            }
        })
        .collect();

    Ok(InstanceSet {
        transforms: transforms.into(),
    })
}
