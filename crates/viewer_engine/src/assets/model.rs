//! OBJ model loading
//!
//! Flattens every face-vertex reference into its own vertex entry with a
//! sequential index. No deduplication is attempted: a position shared by
//! three faces appears three times in the vertex array. This keeps the
//! upload path trivial at the cost of larger vertex buffers.

use crate::render::Vertex;
use std::io::BufRead;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("OBJ parse error: {0}")]
    Parse(#[from] tobj::LoadError),
    #[error("Invalid model: {0}")]
    InvalidFormat(String),
}

/// Loaded model geometry
pub struct Mesh {
    /// Interleaved vertex attributes
    pub vertices: Vec<Vertex>,
    /// Sequential indices, one per face-vertex reference
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Load a triangulated mesh from an OBJ file
    pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let file = std::fs::File::open(path)?;
        let mut reader = std::io::BufReader::new(file);
        Self::read_obj(&mut reader)
    }

    /// Load a triangulated mesh from any OBJ byte stream
    pub fn read_obj<R: BufRead>(reader: &mut R) -> Result<Self, ModelError> {
        let load_options = tobj::LoadOptions {
            triangulate: true,
            ignore_points: true,
            ignore_lines: true,
            ..Default::default()
        };

        // Materials are not used; resolve any mtllib reference to an
        // empty material set.
        let (models, _) = tobj::load_obj_buf(reader, &load_options, |_| Ok(Default::default()))?;

        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for model in &models {
            let mesh = &model.mesh;

            for (i, &pos_index) in mesh.indices.iter().enumerate() {
                let p = pos_index as usize;
                let position = [
                    mesh.positions[3 * p],
                    mesh.positions[3 * p + 1],
                    mesh.positions[3 * p + 2],
                ];

                let normal = mesh
                    .normal_indices
                    .get(i)
                    .map(|&n| {
                        let n = n as usize;
                        [
                            mesh.normals[3 * n],
                            mesh.normals[3 * n + 1],
                            mesh.normals[3 * n + 2],
                        ]
                    })
                    .unwrap_or([0.0, 0.0, 1.0]);

                // OBJ texture space has V growing upward; Vulkan samples
                // with V growing downward.
                let tex_coord = mesh
                    .texcoord_indices
                    .get(i)
                    .map(|&t| {
                        let t = t as usize;
                        [mesh.texcoords[2 * t], 1.0 - mesh.texcoords[2 * t + 1]]
                    })
                    .unwrap_or([0.0, 0.0]);

                vertices.push(Vertex {
                    position,
                    normal,
                    tex_coord,
                });
                indices.push(indices.len() as u32);
            }
        }

        if vertices.is_empty() {
            return Err(ModelError::InvalidFormat(
                "no vertices found in OBJ data".to_string(),
            ));
        }

        Ok(Self { vertices, indices })
    }

    /// Number of indices to draw
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    // Three triangles fanning around the first vertex.
    const SHARED_VERTEX_OBJ: &str = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 1.0 1.0 0.0
v 0.0 1.0 0.0
v -1.0 0.5 0.0
vn 0.0 0.0 1.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
vt 0.5 0.5
f 1/1/1 2/2/1 3/3/1
f 1/1/1 3/3/1 4/4/1
f 1/1/1 4/4/1 5/5/1
";

    #[test]
    fn test_shared_vertices_are_duplicated_per_face_reference() {
        let mesh = Mesh::read_obj(&mut Cursor::new(SHARED_VERTEX_OBJ)).unwrap();

        // Three triangles sharing a vertex still yield nine entries each.
        assert_eq!(mesh.vertices.len(), 9);
        assert_eq!(mesh.indices.len(), 9);

        // Sequential renumbering: no two indices reference the same slot.
        let mut seen = std::collections::HashSet::new();
        for &index in &mesh.indices {
            assert!(seen.insert(index), "index {} referenced twice", index);
        }
        assert_eq!(mesh.indices, (0..9).collect::<Vec<u32>>());

        // The shared corner appears once per face that references it.
        let shared = [0.0, 0.0, 0.0];
        let copies = mesh.vertices.iter().filter(|v| v.position == shared).count();
        assert_eq!(copies, 3);
    }

    #[test]
    fn test_texcoord_v_is_flipped() {
        let mesh = Mesh::read_obj(&mut Cursor::new(SHARED_VERTEX_OBJ)).unwrap();
        // First face vertex uses vt (0.0, 0.0) which flips to (0.0, 1.0).
        assert_eq!(mesh.vertices[0].tex_coord, [0.0, 1.0]);
        // Third face vertex uses vt (1.0, 1.0) which flips to (1.0, 0.0).
        assert_eq!(mesh.vertices[2].tex_coord, [1.0, 0.0]);
    }

    #[test]
    fn test_empty_obj_is_rejected() {
        let result = Mesh::read_obj(&mut Cursor::new("# nothing here\n"));
        assert!(matches!(result, Err(ModelError::InvalidFormat(_))));
    }

    #[test]
    fn test_material_references_are_ignored() {
        // mtllib/usemtl lines route through the material resolver; the
        // geometry must load even when the .mtl file does not exist.
        let obj = "\
mtllib missing.mtl
usemtl wood
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 1.0 1.0 0.0
f 1 2 3
";
        let mesh = Mesh::read_obj(&mut Cursor::new(obj)).unwrap();
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_quads_are_triangulated() {
        let obj = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 1.0 1.0 0.0
v 0.0 1.0 0.0
f 1 2 3 4
";
        let mesh = Mesh::read_obj(&mut Cursor::new(obj)).unwrap();
        assert_eq!(mesh.indices.len(), 6);
        assert_eq!(mesh.index_count(), 6);
    }
}
