//! Voxmesh - GPU triangle-mesh voxelization
//!
//! Converts a triangle mesh into a dense voxel grid with compute
//! kernels (volume or surface fill), then either reads the grid back
//! for CPU mesh reconstruction or rasterizes it into a 3D texture.

pub mod core;
pub mod gpu;
pub mod math;
pub mod voxel;

pub use crate::core::{Error, Result};
pub use crate::gpu::GpuContext;
pub use crate::math::Aabb;
pub use crate::voxel::{
    build_mesh, GridDescriptor, MeshData, ReconstructedMesh, VolumeTexture, VolumeTextureBuilder,
    Voxel, VoxelGrid, VoxelizeOptions, Voxelizer,
};
