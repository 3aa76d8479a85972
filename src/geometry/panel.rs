//! Corrugated sheet panels.
//!
//! A panel starts as a flat grid in the XY plane facing +Z and is displaced
//! along Z by `amplitude * sin(2π * count * x / width)`. Normals come from the
//! derivative of that displacement, not from the faces.

use std::f64::consts::{PI, TAU};

use glam::Vec3;

use crate::error::{InvalidParameters, require_positive};
use crate::geometry::mesh::TriangleMesh;

/// Rows of the panel grid, independent of the ripple count.
pub const PANEL_GRID_ROWS: u32 = 40;

/// Columns per ripple period.
pub const COLUMNS_PER_RIPPLE: u32 = 8;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshParams {
    pub width: f32,
    pub height: f32,
    pub panel_thickness: f32,
    pub corrugation_count: u32,
    pub corrugation_amplitude: f32,
}

impl Default for MeshParams {
    fn default() -> Self {
        Self {
            width: 3.0,
            height: 1.6,
            panel_thickness: 0.04,
            corrugation_count: 28,
            corrugation_amplitude: 0.03,
        }
    }
}

impl MeshParams {
    pub fn validate(&self) -> Result<(), InvalidParameters> {
        require_positive("width", self.width)?;
        require_positive("height", self.height)?;
        require_positive("panel_thickness", self.panel_thickness)?;
        require_positive("corrugation_amplitude", self.corrugation_amplitude)?;
        if self.corrugation_count == 0 {
            return Err(InvalidParameters::new("corrugation_count must be positive"));
        }
        Ok(())
    }

    /// Grid columns. The extra column keeps vertices off the ripple crests,
    /// where a recomputed normal would collapse back to the flat normal.
    pub fn grid_x(&self) -> u32 {
        self.corrugation_count * COLUMNS_PER_RIPPLE + 1
    }

    pub fn offset_at(&self, x: f32) -> f32 {
        (self.corrugation_amplitude as f64 * self.phase_at(x as f64).sin()) as f32
    }

    /// d(offset)/dx.
    pub fn slope_at(&self, x: f32) -> f32 {
        (self.slope_scale() * self.phase_at(x as f64).cos()) as f32
    }

    /// Peak slope: amplitude times the angular frequency.
    fn slope_scale(&self) -> f64 {
        self.corrugation_amplitude as f64 * TAU * self.corrugation_count as f64 / self.width as f64
    }

    fn phase_at(&self, x: f64) -> f64 {
        TAU * self.corrugation_count as f64 * x / self.width as f64
    }

    /// Phase of grid column `col`, exact in the column index so crests stay
    /// between columns at any ripple count.
    fn column_phase(&self, col: u32) -> f64 {
        let count = self.corrugation_count as f64;
        PI * (2.0 * count * col as f64 / self.grid_x() as f64 - count)
    }
}

#[derive(Clone, Debug)]
pub struct DeformedMesh {
    pub params: MeshParams,
    pub grid_x: u32,
    pub grid_y: u32,
    pub mesh: TriangleMesh,
}

impl DeformedMesh {
    pub fn vertex_index(&self, row: u32, col: u32) -> usize {
        (row * (self.grid_x + 1) + col) as usize
    }

    pub fn vertex(&self, row: u32, col: u32) -> Vec3 {
        self.mesh.positions[self.vertex_index(row, col)]
    }

    pub fn normal(&self, row: u32, col: u32) -> Vec3 {
        self.mesh.normals[self.vertex_index(row, col)]
    }
}

pub fn build_corrugated_panel(params: MeshParams) -> Result<DeformedMesh, InvalidParameters> {
    params.validate()?;

    let grid_x = params.grid_x();
    let grid_y = PANEL_GRID_ROWS;
    let cols = grid_x + 1;
    let rows = grid_y + 1;

    let half_w = params.width / 2.0;
    let half_h = params.height / 2.0;
    let seg_w = params.width / grid_x as f32;
    let seg_h = params.height / grid_y as f32;

    let amplitude = params.corrugation_amplitude as f64;
    let slope_scale = params.slope_scale();
    let columns: Vec<(f32, Vec3)> = (0..cols)
        .map(|ix| {
            let phase = params.column_phase(ix);
            let slope = (slope_scale * phase.cos()) as f32;
            ((amplitude * phase.sin()) as f32, Vec3::new(-slope, 0.0, 1.0).normalize())
        })
        .collect();

    let mut positions = Vec::with_capacity((cols * rows) as usize);
    let mut normals = Vec::with_capacity((cols * rows) as usize);
    for iy in 0..rows {
        let y = half_h - iy as f32 * seg_h;
        for (ix, &(offset, normal)) in columns.iter().enumerate() {
            let x = ix as f32 * seg_w - half_w;
            positions.push(Vec3::new(x, y, offset));
            normals.push(normal);
        }
    }

    let mut indices = Vec::with_capacity((grid_x * grid_y * 6) as usize);
    for iy in 0..grid_y {
        for ix in 0..grid_x {
            let a = ix + cols * iy;
            let b = ix + cols * (iy + 1);
            let c = (ix + 1) + cols * (iy + 1);
            let d = (ix + 1) + cols * iy;

            indices.extend_from_slice(&[a, b, d]);
            indices.extend_from_slice(&[b, c, d]);
        }
    }

    let mesh = TriangleMesh {
        positions,
        normals,
        indices,
    };

    Ok(DeformedMesh {
        params,
        grid_x,
        grid_y,
        mesh,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_count_matches_grid() {
        let params = MeshParams {
            corrugation_count: 5,
            ..MeshParams::default()
        };
        let panel = build_corrugated_panel(params).unwrap();
        assert_eq!(panel.grid_x, 41);
        assert_eq!(panel.grid_y, PANEL_GRID_ROWS);
        assert_eq!(
            panel.mesh.vertex_count(),
            ((panel.grid_x + 1) * (panel.grid_y + 1)) as usize
        );
        assert_eq!(
            panel.mesh.triangle_count(),
            (panel.grid_x * panel.grid_y * 2) as usize
        );
    }

    #[test]
    fn deformation_only_moves_z() {
        let params = MeshParams::default();
        let panel = build_corrugated_panel(params).unwrap();
        let seg_w = params.width / panel.grid_x as f32;
        for col in 0..=panel.grid_x {
            let v = panel.vertex(7, col);
            let x = col as f32 * seg_w - params.width / 2.0;
            assert!((v.x - x).abs() < 1e-5);
            assert!((v.z - params.offset_at(x)).abs() < 1e-6);
            assert!(v.z.abs() <= params.corrugation_amplitude + 1e-6);
        }
    }

    #[test]
    fn front_faces_wind_towards_plus_z() {
        let panel = build_corrugated_panel(MeshParams::default()).unwrap();
        let mid = panel.normal(PANEL_GRID_ROWS / 2, 3);
        assert!(mid.z > 0.0);
    }

    #[test]
    fn displaced_vertices_never_keep_the_flat_normal() {
        for count in [1, 2, 3, 7, 28, 30, 64, 200, 500] {
            for (width, amplitude) in [(3.0, 0.03), (3.0, 0.005), (3.1, 0.02), (1.7, 0.03)] {
                let params = MeshParams {
                    width,
                    corrugation_count: count,
                    corrugation_amplitude: amplitude,
                    ..MeshParams::default()
                };
                let panel = build_corrugated_panel(params).unwrap();
                for row in [0, 1, PANEL_GRID_ROWS / 2, PANEL_GRID_ROWS - 1, PANEL_GRID_ROWS] {
                    for col in 0..=panel.grid_x {
                        let v = panel.vertex(row, col);
                        let n = panel.normal(row, col);
                        if v.z.abs() <= 1e-6 {
                            continue;
                        }
                        assert!(
                            n.x.abs() > 1e-6 && n.z < 1.0,
                            "flat normal {n} at count {count} amp {amplitude} row {row} col {col} z {}",
                            v.z
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn normals_follow_the_ripple_slope() {
        let params = MeshParams::default();
        let panel = build_corrugated_panel(params).unwrap();
        for col in 0..=panel.grid_x {
            let v = panel.vertex(0, col);
            let n = panel.normal(0, col);
            let expected = Vec3::new(-params.slope_at(v.x), 0.0, 1.0).normalize();
            assert!((n - expected).length() < 1e-3, "col {col}: {n} vs {expected}");
            assert_eq!(n, panel.normal(PANEL_GRID_ROWS, col));
        }
    }

    #[test]
    fn is_deterministic() {
        let a = build_corrugated_panel(MeshParams::default()).unwrap();
        let b = build_corrugated_panel(MeshParams::default()).unwrap();
        assert_eq!(a.mesh, b.mesh);
    }

    #[test]
    fn rejects_bad_params() {
        let bad = [
            MeshParams { width: 0.0, ..MeshParams::default() },
            MeshParams { height: -1.0, ..MeshParams::default() },
            MeshParams { panel_thickness: f32::NAN, ..MeshParams::default() },
            MeshParams { corrugation_count: 0, ..MeshParams::default() },
            MeshParams { corrugation_amplitude: f32::INFINITY, ..MeshParams::default() },
        ];
        for params in bad {
            assert!(build_corrugated_panel(params).is_err(), "{params:?}");
        }
    }
}
