//! Source mesh data and GPU upload buffers

use crate::core::error::Error;
use crate::core::types::{Result, Vec2, Vec3};
use crate::math::Aabb;

/// Triangle mesh input: flat positions, optional UVs, triangle indices.
///
/// UVs are either empty (a neutral zero default is uploaded) or exactly
/// one per vertex. Read-only for the duration of a voxelization call.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn triangle_count(&self) -> u32 {
        (self.indices.len() / 3) as u32
    }

    /// Bounding box of the vertex positions
    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(&self.positions)
    }

    /// Reject malformed input before any device work
    pub fn validate(&self) -> Result<()> {
        if self.positions.is_empty() || self.indices.is_empty() {
            return Err(Error::InvalidArgument("mesh has no triangles".into()));
        }
        if self.indices.len() % 3 != 0 {
            return Err(Error::InvalidArgument(format!(
                "index count {} is not a multiple of 3",
                self.indices.len()
            )));
        }
        if !self.uvs.is_empty() && self.uvs.len() != self.positions.len() {
            return Err(Error::InvalidArgument(format!(
                "{} UVs for {} vertices",
                self.uvs.len(),
                self.positions.len()
            )));
        }
        if let Some(&i) = self.indices.iter().find(|&&i| i as usize >= self.positions.len()) {
            return Err(Error::InvalidArgument(format!(
                "index {} out of range for {} vertices",
                i,
                self.positions.len()
            )));
        }
        if self.positions.iter().any(|p| !p.is_finite()) {
            return Err(Error::InvalidArgument("non-finite vertex position".into()));
        }
        Ok(())
    }
}

/// GPU-resident mesh buffers, created fresh per voxelization call.
///
/// Written once before dispatch, read-only for the kernel. Dropped after
/// the fill dispatch is submitted; queue ordering guarantees the kernel
/// sees the uploaded data.
pub struct MeshBuffers {
    pub vertex: wgpu::Buffer,
    pub uv: wgpu::Buffer,
    pub index: wgpu::Buffer,
    pub triangle_count: u32,
}

impl MeshBuffers {
    /// Stage positions, UVs (defaulted if absent) and indices into
    /// storage buffers sized exactly to the source arrays.
    pub fn upload(device: &wgpu::Device, queue: &wgpu::Queue, mesh: &MeshData) -> Self {
        // vec3 storage arrays have vec4 stride in WGSL; pad on upload.
        let positions: Vec<[f32; 4]> = mesh
            .positions
            .iter()
            .map(|p| [p.x, p.y, p.z, 0.0])
            .collect();

        let uvs: Vec<[f32; 2]> = if mesh.uvs.is_empty() {
            vec![[0.0, 0.0]; mesh.positions.len()]
        } else {
            mesh.uvs.iter().map(|uv| [uv.x, uv.y]).collect()
        };

        let vertex = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mesh_vertices"),
            size: (positions.len() * std::mem::size_of::<[f32; 4]>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uv = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mesh_uvs"),
            size: (uvs.len() * std::mem::size_of::<[f32; 2]>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let index = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mesh_indices"),
            size: (mesh.indices.len() * std::mem::size_of::<u32>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        queue.write_buffer(&vertex, 0, bytemuck::cast_slice(&positions));
        queue.write_buffer(&uv, 0, bytemuck::cast_slice(&uvs));
        queue.write_buffer(&index, 0, bytemuck::cast_slice(&mesh.indices));

        log::debug!(
            "Uploaded mesh: {} vertices, {} triangles",
            mesh.positions.len(),
            mesh.indices.len() / 3
        );

        Self {
            vertex,
            uv,
            index,
            triangle_count: mesh.triangle_count(),
        }
    }
}
