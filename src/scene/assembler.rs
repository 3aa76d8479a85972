use std::f32::consts::{FRAC_PI_2, PI, TAU};
use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use log::info;
use serde::Deserialize;

use crate::color::hex;
use crate::error::InvalidParameters;
use crate::geometry::glyph::digit_mesh;
use crate::geometry::primitives::{box_mesh, cylinder_mesh, disc_mesh, plane_mesh};
use crate::geometry::{MeshParams, TriangleMesh, build_corrugated_panel, build_instance_transforms};
use crate::scene::environment::environment_preset;
use crate::scene::lights::Lights;
use crate::scene::material::Material;
use crate::scene::{GlyphNode, Scene, SceneNode};

const FRAME_HEIGHT: f32 = 1.6;
const FRAME_LENGTH: f32 = 3.1;
const FRAME_DEPTH: f32 = 1.7;
const BEAM: f32 = 0.08;

const COIN_SPREAD_X: f32 = 2.6;
const COIN_SPREAD_Z: f32 = 1.3;

const DIGITS: &str = "8016429375";
const DIGIT_RING_RADIUS: f32 = 0.55;
const DIGIT_SIZE: f32 = 0.28;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    /// Coin scatter seed. `None` scatters differently on every run.
    pub seed: Option<u64>,
    pub coin_count: usize,
    pub environment: String,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            seed: None,
            coin_count: 42,
            environment: "city".to_string(),
        }
    }
}

impl SceneSettings {
    pub fn validate(&self) -> Result<(), InvalidParameters> {
        if self.environment.trim().is_empty() {
            return Err(InvalidParameters::new("environment preset must be named"));
        }
        Ok(())
    }
}

/// Builds the fixed container scene from its settings.
pub struct SceneAssembler {
    settings: SceneSettings,
}

impl SceneAssembler {
    pub fn new(settings: SceneSettings) -> Self {
        Self { settings }
    }

    pub fn assemble(&self) -> Result<Scene, InvalidParameters> {
        self.settings.validate()?;
        let environment = environment_preset(&self.settings.environment)?;

        let mut nodes = vec![SceneNode::single("frame", frame_mesh()?, Material::frame_metal(), Mat4::IDENTITY)];
        nodes.extend(panel_nodes()?);
        nodes.push(SceneNode::single(
            "floor",
            plane_mesh(3.12, 1.72)?,
            Material::floor_metal(),
            Mat4::from_rotation_x(-FRAC_PI_2),
        ));

        let coins = build_instance_transforms(
            self.settings.coin_count,
            COIN_SPREAD_X,
            COIN_SPREAD_Z,
            self.settings.seed,
        )?;
        // Coins stand on their rim; the tilt is baked into the mesh so instances only carry yaw.
        let coin_mesh = cylinder_mesh(0.07, 0.02, 32)?.transformed(Mat4::from_rotation_x(-FRAC_PI_2));
        nodes.push(SceneNode {
            name: "coins".to_string(),
            mesh: Arc::new(coin_mesh),
            material: Material::gold(),
            transforms: coins.matrices(),
        });

        nodes.push(SceneNode::single(
            "ground-glow",
            disc_mesh(3.2, 64)?,
            Material::unlit(0x00ff88, 0.08),
            Mat4::from_rotation_translation(
                Quat::from_rotation_x(-FRAC_PI_2),
                Vec3::new(0.0, -0.01, 0.0),
            ),
        ));

        let glyphs = glyph_nodes()?;

        info!(
            "assembled scene: {} nodes, {} coins, {} glyphs, environment {:?}",
            nodes.len(),
            coins.len(),
            glyphs.len(),
            self.settings.environment
        );

        Ok(Scene {
            nodes,
            glyphs,
            coins,
            lights: Lights::studio(),
            background: hex(0x0b1220),
            environment,
        })
    }
}

fn frame_mesh() -> Result<TriangleMesh, InvalidParameters> {
    let (hx, hz, hy) = (FRAME_LENGTH / 2.0, FRAME_DEPTH / 2.0, FRAME_HEIGHT / 2.0);
    let beams = [
        // vertical posts
        ([-hx, hy, -hz], [BEAM, FRAME_HEIGHT, BEAM]),
        ([hx, hy, -hz], [BEAM, FRAME_HEIGHT, BEAM]),
        ([-hx, hy, hz], [BEAM, FRAME_HEIGHT, BEAM]),
        ([hx, hy, hz], [BEAM, FRAME_HEIGHT, BEAM]),
        // top edges
        ([0.0, FRAME_HEIGHT, hz], [FRAME_LENGTH, BEAM, BEAM]),
        ([0.0, FRAME_HEIGHT, -hz], [FRAME_LENGTH, BEAM, BEAM]),
        // bottom edges
        ([0.0, 0.0, hz], [FRAME_LENGTH, BEAM, BEAM]),
        ([0.0, 0.0, -hz], [FRAME_LENGTH, BEAM, BEAM]),
        // end slabs
        ([-hx, hy, 0.0], [BEAM, FRAME_HEIGHT, FRAME_DEPTH]),
        ([hx, hy, 0.0], [BEAM, FRAME_HEIGHT, FRAME_DEPTH]),
    ];

    let mut mesh = TriangleMesh::default();
    for (pos, size) in beams {
        let beam = box_mesh(Vec3::from_array(size))?;
        mesh.append(&beam.transformed(Mat4::from_translation(Vec3::from_array(pos))));
    }
    Ok(mesh)
}

fn panel_nodes() -> Result<Vec<SceneNode>, InvalidParameters> {
    let (hx, hz, hy) = (FRAME_LENGTH / 2.0, FRAME_DEPTH / 2.0, FRAME_HEIGHT / 2.0);

    let long = Arc::new(
        build_corrugated_panel(MeshParams {
            width: FRAME_LENGTH,
            height: FRAME_HEIGHT,
            ..MeshParams::default()
        })?
        .mesh,
    );
    let short = Arc::new(
        build_corrugated_panel(MeshParams {
            width: FRAME_DEPTH,
            height: FRAME_HEIGHT,
            ..MeshParams::default()
        })?
        .mesh,
    );
    let roof = Arc::new(
        build_corrugated_panel(MeshParams {
            width: FRAME_LENGTH,
            height: FRAME_DEPTH,
            corrugation_count: 30,
            corrugation_amplitude: 0.02,
            ..MeshParams::default()
        })?
        .mesh,
    );

    let placed = |rotation: Quat, position: [f32; 3]| {
        vec![Mat4::from_rotation_translation(rotation, Vec3::from_array(position))]
    };

    let glass = Material::dark_glass();
    Ok(vec![
        SceneNode {
            name: "panel-front".to_string(),
            mesh: Arc::clone(&long),
            material: glass,
            transforms: placed(Quat::IDENTITY, [0.0, hy, hz]),
        },
        SceneNode {
            name: "panel-back".to_string(),
            mesh: long,
            material: glass,
            transforms: placed(Quat::from_rotation_y(PI), [0.0, hy, -hz]),
        },
        SceneNode {
            name: "panel-right".to_string(),
            mesh: Arc::clone(&short),
            material: glass,
            transforms: placed(Quat::from_rotation_y(-FRAC_PI_2), [hx, hy, 0.0]),
        },
        SceneNode {
            name: "panel-left".to_string(),
            mesh: short,
            material: glass,
            transforms: placed(Quat::from_rotation_y(FRAC_PI_2), [-hx, hy, 0.0]),
        },
        SceneNode {
            name: "panel-roof".to_string(),
            mesh: roof,
            material: glass,
            transforms: placed(Quat::from_rotation_x(FRAC_PI_2), [0.0, FRAME_HEIGHT, 0.0]),
        },
    ])
}

fn glyph_nodes() -> Result<Vec<GlyphNode>, InvalidParameters> {
    let group = Mat4::from_translation(Vec3::new(0.0, 0.85, 0.0));
    let count = DIGITS.chars().count();

    DIGITS
        .chars()
        .enumerate()
        .map(|(i, digit)| {
            let a = i as f32 / count as f32 * TAU;
            let local = Mat4::from_rotation_translation(
                Quat::from_rotation_y(-a + FRAC_PI_2),
                Vec3::new(
                    a.cos() * DIGIT_RING_RADIUS,
                    0.2 + (i % 3) as f32 * 0.08,
                    a.sin() * DIGIT_RING_RADIUS,
                ),
            );
            Ok(GlyphNode {
                digit,
                mesh: Arc::new(digit_mesh(digit, DIGIT_SIZE)?),
                material: Material::neon(),
                group,
                local,
                // golden-ratio spacing keeps neighbours out of step
                phase: (i as f32 * 0.618_034).fract() * 100.0,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> Scene {
        SceneAssembler::new(SceneSettings {
            seed: Some(42),
            ..SceneSettings::default()
        })
        .assemble()
        .unwrap()
    }

    #[test]
    fn assembles_every_part() {
        let s = scene();
        let names: Vec<_> = s.nodes().iter().map(|n| n.name.as_str()).collect();
        for expected in [
            "frame",
            "panel-front",
            "panel-back",
            "panel-left",
            "panel-right",
            "panel-roof",
            "floor",
            "coins",
            "ground-glow",
        ] {
            assert!(names.contains(&expected), "missing {expected}");
        }
        assert_eq!(s.coins().len(), 42);
        assert_eq!(s.glyphs().len(), 10);
        let frame = s.nodes().iter().find(|n| n.name == "frame").unwrap();
        assert_eq!(frame.mesh.triangle_count(), 10 * 12);
    }

    #[test]
    fn seeded_scenes_match() {
        let a = scene();
        let b = scene();
        assert_eq!(a.coins(), b.coins());
    }

    #[test]
    fn unknown_environment_is_rejected() {
        let err = SceneAssembler::new(SceneSettings {
            environment: "moon".to_string(),
            ..SceneSettings::default()
        })
        .assemble()
        .unwrap_err();
        assert!(err.0.contains("moon"));
    }

    #[test]
    fn panels_sit_on_the_frame() {
        let s = scene();
        let front = s.nodes().iter().find(|n| n.name == "panel-front").unwrap();
        let centre = front.transforms[0].transform_point3(Vec3::ZERO);
        assert!((centre - Vec3::new(0.0, 0.8, 0.85)).length() < 1e-5);
    }
}
