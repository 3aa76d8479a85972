use std::f32::consts::TAU;

use glam::Vec3;

use crate::error::{InvalidParameters, require_positive};
use crate::geometry::mesh::TriangleMesh;

/// Axis-aligned box centred on the origin, flat-shaded.
pub fn box_mesh(size: Vec3) -> Result<TriangleMesh, InvalidParameters> {
    require_positive("box width", size.x)?;
    require_positive("box height", size.y)?;
    require_positive("box depth", size.z)?;

    let h = size / 2.0;
    // (normal, u axis, v axis) with u x v == normal
    let faces = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];

    let mut mesh = TriangleMesh::default();
    for (n, u, v) in faces {
        let base = mesh.positions.len() as u32;
        let c = n * h;
        let du = u * h;
        let dv = v * h;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            mesh.positions.push(c + du * su + dv * sv);
            mesh.normals.push(n);
        }
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    Ok(mesh)
}

/// Capped cylinder along +Y, centred on the origin.
pub fn cylinder_mesh(radius: f32, height: f32, segments: u32) -> Result<TriangleMesh, InvalidParameters> {
    require_positive("cylinder radius", radius)?;
    require_positive("cylinder height", height)?;
    if segments < 3 {
        return Err(InvalidParameters::new("cylinder needs at least 3 segments"));
    }

    let half = height / 2.0;
    let ring = |i: u32| {
        let a = i as f32 / segments as f32 * TAU;
        Vec3::new(a.sin(), 0.0, a.cos())
    };

    let mut mesh = TriangleMesh::default();

    for i in 0..=segments {
        let dir = ring(i);
        mesh.positions.push(dir * radius + Vec3::Y * half);
        mesh.normals.push(dir);
        mesh.positions.push(dir * radius - Vec3::Y * half);
        mesh.normals.push(dir);
    }
    for i in 0..segments {
        let top = i * 2;
        let bottom = top + 1;
        let next_top = top + 2;
        let next_bottom = top + 3;
        mesh.indices
            .extend_from_slice(&[top, bottom, next_top, bottom, next_bottom, next_top]);
    }

    for (y, n) in [(half, Vec3::Y), (-half, Vec3::NEG_Y)] {
        let centre = mesh.positions.len() as u32;
        mesh.positions.push(Vec3::new(0.0, y, 0.0));
        mesh.normals.push(n);
        for i in 0..=segments {
            mesh.positions.push(ring(i) * radius + Vec3::Y * y);
            mesh.normals.push(n);
        }
        for i in 0..segments {
            let a = centre + 1 + i;
            let b = a + 1;
            if n.y > 0.0 {
                mesh.indices.extend_from_slice(&[centre, a, b]);
            } else {
                mesh.indices.extend_from_slice(&[centre, b, a]);
            }
        }
    }

    Ok(mesh)
}

/// Filled circle in the XY plane facing +Z.
pub fn disc_mesh(radius: f32, segments: u32) -> Result<TriangleMesh, InvalidParameters> {
    require_positive("disc radius", radius)?;
    if segments < 3 {
        return Err(InvalidParameters::new("disc needs at least 3 segments"));
    }

    let mut mesh = TriangleMesh::default();
    mesh.positions.push(Vec3::ZERO);
    mesh.normals.push(Vec3::Z);
    for i in 0..=segments {
        let a = i as f32 / segments as f32 * TAU;
        mesh.positions.push(Vec3::new(a.cos() * radius, a.sin() * radius, 0.0));
        mesh.normals.push(Vec3::Z);
    }
    for i in 1..=segments {
        mesh.indices.extend_from_slice(&[0, i, i + 1]);
    }
    Ok(mesh)
}

/// Flat rectangle in the XY plane facing +Z.
pub fn plane_mesh(width: f32, height: f32) -> Result<TriangleMesh, InvalidParameters> {
    require_positive("plane width", width)?;
    require_positive("plane height", height)?;

    let (w, h) = (width / 2.0, height / 2.0);
    Ok(TriangleMesh {
        positions: vec![
            Vec3::new(-w, -h, 0.0),
            Vec3::new(w, -h, 0.0),
            Vec3::new(w, h, 0.0),
            Vec3::new(-w, h, 0.0),
        ],
        normals: vec![Vec3::Z; 4],
        indices: vec![0, 1, 2, 0, 2, 3],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_outward_winding(mesh: &TriangleMesh) {
        for [a, b, c] in mesh.triangles() {
            let face = (mesh.positions[b] - mesh.positions[a])
                .cross(mesh.positions[c] - mesh.positions[a]);
            let n = mesh.normals[a] + mesh.normals[b] + mesh.normals[c];
            assert!(face.dot(n) > 0.0, "triangle {a},{b},{c} winds inward");
        }
    }

    #[test]
    fn box_faces_wind_outward() {
        let m = box_mesh(Vec3::new(3.1, 0.08, 0.08)).unwrap();
        assert_eq!(m.vertex_count(), 24);
        assert_eq!(m.triangle_count(), 12);
        assert_outward_winding(&m);
        let (lo, hi) = m.bounds().unwrap();
        assert!((hi - lo - Vec3::new(3.1, 0.08, 0.08)).length() < 1e-5);
    }

    #[test]
    fn cylinder_faces_wind_outward() {
        let m = cylinder_mesh(0.07, 0.02, 32).unwrap();
        assert_eq!(m.triangle_count(), 32 * 4);
        assert_outward_winding(&m);
    }

    #[test]
    fn disc_and_plane_face_plus_z() {
        assert_outward_winding(&disc_mesh(3.2, 64).unwrap());
        assert_outward_winding(&plane_mesh(3.12, 1.72).unwrap());
    }

    #[test]
    fn rejects_degenerate_shapes() {
        assert!(box_mesh(Vec3::new(1.0, 0.0, 1.0)).is_err());
        assert!(cylinder_mesh(1.0, 1.0, 2).is_err());
        assert!(disc_mesh(-1.0, 8).is_err());
        assert!(plane_mesh(1.0, f32::NAN).is_err());
    }
}
