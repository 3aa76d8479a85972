pub mod assembler;
pub mod environment;
pub mod lights;
pub mod material;

use std::sync::Arc;

use glam::{EulerRot, Mat4, Vec3};

use crate::geometry::{InstanceSet, TriangleMesh};

pub use assembler::{SceneAssembler, SceneSettings};
pub use environment::EnvironmentMap;
pub use lights::Lights;
pub use material::{Material, Shading};

const FLOAT_SPEED: f32 = 1.2;
const FLOAT_ROTATION_INTENSITY: f32 = 0.2;
const FLOAT_INTENSITY: f32 = 0.25;

/// A mesh drawn once per transform.
#[derive(Clone, Debug)]
pub struct SceneNode {
    pub name: String,
    pub mesh: Arc<TriangleMesh>,
    pub material: Material,
    pub transforms: Vec<Mat4>,
}

impl SceneNode {
    pub(crate) fn single(name: &str, mesh: TriangleMesh, material: Material, transform: Mat4) -> Self {
        Self {
            name: name.to_string(),
            mesh: Arc::new(mesh),
            material,
            transforms: vec![transform],
        }
    }
}

/// A floating digit. Bobs and tilts slightly around its resting pose.
#[derive(Clone, Debug)]
pub struct GlyphNode {
    pub digit: char,
    pub mesh: Arc<TriangleMesh>,
    pub material: Material,
    pub group: Mat4,
    pub local: Mat4,
    pub phase: f32,
}

impl GlyphNode {
    /// Offset of the float group at `time` seconds.
    pub fn float_offset(&self, time: f32) -> Mat4 {
        let t = (self.phase + time) / 4.0 * FLOAT_SPEED;
        let rotation = Vec3::new(
            t.cos() / 8.0,
            t.sin() / 8.0,
            t.sin() / 20.0,
        ) * FLOAT_ROTATION_INTENSITY;
        let lift = t.sin() / 10.0 * FLOAT_INTENSITY;
        Mat4::from_translation(Vec3::Y * lift)
            * Mat4::from_euler(EulerRot::XYZ, rotation.x, rotation.y, rotation.z)
    }

    pub fn transform(&self, time: f32) -> Mat4 {
        self.group * self.float_offset(time) * self.local
    }
}

/// One mesh placement ready for the rasterizer.
#[derive(Clone, Copy, Debug)]
pub struct DrawItem<'a> {
    pub name: &'a str,
    pub mesh: &'a TriangleMesh,
    pub material: &'a Material,
    pub transform: Mat4,
}

#[derive(Clone, Debug)]
pub struct Scene {
    pub(crate) nodes: Vec<SceneNode>,
    pub(crate) glyphs: Vec<GlyphNode>,
    pub(crate) coins: InstanceSet,
    pub(crate) lights: Lights,
    pub(crate) background: Vec3,
    pub(crate) environment: Arc<dyn EnvironmentMap>,
}

impl Scene {
    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn glyphs(&self) -> &[GlyphNode] {
        &self.glyphs
    }

    pub fn coins(&self) -> &InstanceSet {
        &self.coins
    }

    pub fn lights(&self) -> &Lights {
        &self.lights
    }

    /// Linear clear colour.
    pub fn background(&self) -> Vec3 {
        self.background
    }

    pub fn environment(&self) -> &dyn EnvironmentMap {
        self.environment.as_ref()
    }

    /// Every placement in the scene, with glyph animation sampled at `time`.
    pub fn draw_items(&self, time: f32) -> Vec<DrawItem<'_>> {
        let statics = self.nodes.iter().flat_map(|node| {
            node.transforms.iter().map(move |&transform| DrawItem {
                name: &node.name,
                mesh: &node.mesh,
                material: &node.material,
                transform,
            })
        });
        let glyphs = self.glyphs.iter().map(|g| DrawItem {
            name: "glyph",
            mesh: &g.mesh,
            material: &g.material,
            transform: g.transform(time),
        });
        statics.chain(glyphs).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> Scene {
        SceneAssembler::new(SceneSettings {
            seed: Some(1),
            ..SceneSettings::default()
        })
        .assemble()
        .unwrap()
    }

    #[test]
    fn draw_items_cover_instances() {
        let s = scene();
        let placements: usize = s.nodes().iter().map(|n| n.transforms.len()).sum();
        assert_eq!(s.draw_items(0.0).len(), placements + s.glyphs().len());
    }

    #[test]
    fn glyphs_float_within_bounds() {
        let s = scene();
        for g in s.glyphs() {
            let rest = (g.group * g.local).transform_point3(Vec3::ZERO);
            for step in 0..50 {
                let p = g.transform(step as f32 * 0.37).transform_point3(Vec3::ZERO);
                assert!((p - rest).length() < 0.08, "glyph {} drifted to {p}", g.digit);
            }
        }
    }

    #[test]
    fn glyphs_move_over_time() {
        let s = scene();
        let g = &s.glyphs()[0];
        assert_ne!(g.transform(0.0), g.transform(2.0));
    }
}
