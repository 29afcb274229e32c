//! CPU mesh reconstruction from voxel readback data
//!
//! Pure function of the voxel array and cell size; one cube per filled
//! voxel. Consumers that want smooth surfaces can swap in their own
//! mesher, this one only depends on the readback contract.

use rayon::prelude::*;

use crate::core::types::{Vec2, Vec3};
use crate::voxel::grid::Voxel;

/// Renderable mesh rebuilt from a voxel grid
#[derive(Clone, Debug, Default)]
pub struct ReconstructedMesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
}

impl ReconstructedMesh {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Cube face corners in half-extent units, wound counter-clockwise
/// seen from outside.
const FACES: [([f32; 3], [[f32; 3]; 4]); 6] = [
    ([1.0, 0.0, 0.0], [
        [1.0, -1.0, -1.0], [1.0, 1.0, -1.0], [1.0, 1.0, 1.0], [1.0, -1.0, 1.0],
    ]),
    ([-1.0, 0.0, 0.0], [
        [-1.0, -1.0, -1.0], [-1.0, -1.0, 1.0], [-1.0, 1.0, 1.0], [-1.0, 1.0, -1.0],
    ]),
    ([0.0, 1.0, 0.0], [
        [-1.0, 1.0, -1.0], [-1.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, -1.0],
    ]),
    ([0.0, -1.0, 0.0], [
        [-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [1.0, -1.0, 1.0], [-1.0, -1.0, 1.0],
    ]),
    ([0.0, 0.0, 1.0], [
        [-1.0, -1.0, 1.0], [1.0, -1.0, 1.0], [1.0, 1.0, 1.0], [-1.0, 1.0, 1.0],
    ]),
    ([0.0, 0.0, -1.0], [
        [-1.0, -1.0, -1.0], [-1.0, 1.0, -1.0], [1.0, 1.0, -1.0], [1.0, -1.0, -1.0],
    ]),
];

/// Per-face corner UVs used when the voxel UV is not propagated
const FACE_UVS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

/// Build a cube mesh from the filled voxels.
///
/// Every filled voxel contributes 24 vertices and 36 indices (6 faces
/// with per-face normals). With `use_uv` each cube vertex carries the
/// voxel's surface UV sample instead of the per-face default.
pub fn build_mesh(voxels: &[Voxel], unit: f32, use_uv: bool) -> ReconstructedMesh {
    let half = unit * 0.5;

    let cubes: Vec<(Vec<Vec3>, Vec<Vec3>, Vec<Vec2>)> = voxels
        .par_iter()
        .filter(|v| v.is_filled())
        .map(|v| {
            let center = Vec3::from_array(v.position);
            let mut positions = Vec::with_capacity(24);
            let mut normals = Vec::with_capacity(24);
            let mut uvs = Vec::with_capacity(24);
            for (normal, corners) in &FACES {
                let normal = Vec3::from_array(*normal);
                for (k, corner) in corners.iter().enumerate() {
                    positions.push(center + Vec3::from_array(*corner) * half);
                    normals.push(normal);
                    uvs.push(if use_uv {
                        Vec2::from_array(v.uv)
                    } else {
                        Vec2::from_array(FACE_UVS[k])
                    });
                }
            }
            (positions, normals, uvs)
        })
        .collect();

    let mut mesh = ReconstructedMesh::default();
    for (positions, normals, uvs) in cubes {
        let base = mesh.positions.len() as u32;
        for face in 0..6u32 {
            let f = base + face * 4;
            mesh.indices
                .extend_from_slice(&[f, f + 1, f + 2, f, f + 2, f + 3]);
        }
        mesh.positions.extend(positions);
        mesh.normals.extend(normals);
        mesh.uvs.extend(uvs);
    }

    log::debug!(
        "Reconstructed {} vertices / {} triangles",
        mesh.positions.len(),
        mesh.indices.len() / 3
    );
    mesh
}
