//! Voxelization core: grid dimensioning, mesh upload, fill dispatch,
//! readback and consumers

pub mod grid;
pub mod mesh;
pub mod reconstruct;
pub mod texture;
pub mod volume;
pub mod voxelizer;

pub use grid::{near_pow2, voxel_index, GridDescriptor, Voxel};
pub use mesh::{MeshBuffers, MeshData};
pub use reconstruct::{build_mesh, ReconstructedMesh};
pub use texture::{VolumeTexture, VolumeTextureBuilder};
pub use volume::VoxelGrid;
pub use voxelizer::{FillMode, VoxelizeOptions, Voxelizer, WORKGROUP_AXIS};
