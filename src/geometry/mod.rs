pub mod glyph;
pub mod instances;
pub mod mesh;
pub mod panel;
pub mod primitives;

pub use instances::{InstanceSet, InstanceTransform, build_instance_transforms};
pub use mesh::TriangleMesh;
pub use panel::{DeformedMesh, MeshParams, build_corrugated_panel};
