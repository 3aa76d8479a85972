use glam::{Mat3, Mat4, Vec3};

/// Indexed triangle list with per-vertex normals.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TriangleMesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl TriangleMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.indices
            .chunks_exact(3)
            .map(|t| [t[0] as usize, t[1] as usize, t[2] as usize])
    }

    /// Copy with positions and normals moved through `m`.
    pub fn transformed(&self, m: Mat4) -> TriangleMesh {
        let normal_m = Mat3::from_mat4(m).inverse().transpose();
        TriangleMesh {
            positions: self.positions.iter().map(|&p| m.transform_point3(p)).collect(),
            normals: self
                .normals
                .iter()
                .map(|&n| (normal_m * n).normalize_or_zero())
                .collect(),
            indices: self.indices.clone(),
        }
    }

    /// Appends `other`, rebasing its indices.
    pub fn append(&mut self, other: &TriangleMesh) {
        let base = self.positions.len() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }

    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.positions.first()?;
        Some(
            self.positions
                .iter()
                .fold((first, first), |(lo, hi), &p| (lo.min(p), hi.max(p))),
        )
    }
}
