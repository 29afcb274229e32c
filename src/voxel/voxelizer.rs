//! Mesh voxelization compute pipelines

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::Result;
use crate::gpu::GpuContext;
use crate::math::Aabb;
use crate::voxel::grid::GridDescriptor;
use crate::voxel::mesh::{MeshBuffers, MeshData};
use crate::voxel::volume::VoxelGrid;

/// Threads per workgroup axis for the fill kernels.
///
/// Dispatches are padded to `dim / WORKGROUP_AXIS + 1` groups on every
/// axis; the kernels bounds-check and no-op past the grid edge.
pub const WORKGROUP_AXIS: u32 = 4;

/// Fill rule selecting which kernel runs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillMode {
    /// Cell occupied if its center lies inside the closed mesh
    Volume,
    /// Cell occupied if its cube intersects any triangle
    Surface,
}

/// Voxelization parameters
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct VoxelizeOptions {
    /// Cell count along the longest bounding-volume axis
    pub resolution: u32,
    /// Volume fill when true, surface shell otherwise
    pub volume: bool,
    /// Round each axis count up to a power of two
    pub pow2: bool,
}

impl Default for VoxelizeOptions {
    fn default() -> Self {
        Self {
            resolution: 32,
            volume: true,
            pow2: false,
        }
    }
}

impl VoxelizeOptions {
    pub fn fill_mode(&self) -> FillMode {
        if self.volume {
            FillMode::Volume
        } else {
            FillMode::Surface
        }
    }
}

/// Fill kernel uniforms (matches `VoxelParams` in voxelize.wgsl)
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct FillParams {
    start: [f32; 4],
    end: [f32; 4],
    size: [f32; 4],
    unit: f32,
    inv_unit: f32,
    half_unit: f32,
    tri_count: u32,
    width: u32,
    height: u32,
    depth: u32,
    _pad: u32,
}

/// Compute pipelines for the volume and surface fill kernels.
///
/// Both kernels share one binding contract: the params uniform, the
/// read-only mesh buffers and the read-write voxel buffer. The bind
/// group layout is the single place that contract is defined.
pub struct Voxelizer {
    volume_pipeline: wgpu::ComputePipeline,
    surface_pipeline: wgpu::ComputePipeline,
    params_buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl Voxelizer {
    pub fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("voxelize_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../shaders/voxelize.wgsl").into()),
        });

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("voxelize_params"),
            size: std::mem::size_of::<FillParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("voxelize_layout"),
            entries: &[
                // binding 0: params
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // binding 1: vertex positions
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // binding 2: vertex UVs
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // binding 3: triangle indices
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // binding 4: voxel buffer
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("voxelize_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let volume_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("fill_volume_pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("fill_volume"),
            compilation_options: Default::default(),
            cache: None,
        });

        let surface_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("fill_surface_pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("fill_surface"),
            compilation_options: Default::default(),
            cache: None,
        });

        Self {
            volume_pipeline,
            surface_pipeline,
            params_buffer,
            bind_group_layout,
        }
    }

    /// Voxelize a mesh using its own bounding box
    pub async fn voxelize(
        &self,
        ctx: &GpuContext,
        mesh: &MeshData,
        opts: &VoxelizeOptions,
    ) -> Result<VoxelGrid> {
        let bounds = mesh.bounds();
        self.voxelize_with_bounds(ctx, mesh, bounds, opts).await
    }

    /// Voxelize a mesh into a grid covering an explicit bounding volume.
    ///
    /// Validates inputs, dimensions the grid, clears the voxel buffer so
    /// unfilled cells read as empty, then dispatches the selected fill
    /// kernel over one thread per cell. A grid with a zero-count axis
    /// short-circuits to an empty [`VoxelGrid`] without dispatching.
    pub async fn voxelize_with_bounds(
        &self,
        ctx: &GpuContext,
        mesh: &MeshData,
        bounds: Aabb,
        opts: &VoxelizeOptions,
    ) -> Result<VoxelGrid> {
        mesh.validate()?;
        let desc = GridDescriptor::from_bounds(&bounds, opts.resolution, opts.pow2)?;

        if desc.is_empty() {
            log::debug!("degenerate grid {:?}, skipping dispatch", bounds);
            return Ok(VoxelGrid::empty(desc));
        }

        // Allocation failures for very large grids/meshes surface as
        // ResourceExhaustion with nothing retained.
        let error_scope = ctx.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let voxel_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("voxel_buffer"),
            size: desc.buffer_size(),
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mesh_buffers = MeshBuffers::upload(&ctx.device, &ctx.queue, mesh);
        if let Some(err) = error_scope.pop().await {
            return Err(Error::ResourceExhaustion(err.to_string()));
        }

        let size = bounds.size();
        let params = FillParams {
            start: [bounds.min.x, bounds.min.y, bounds.min.z, 0.0],
            end: [bounds.max.x, bounds.max.y, bounds.max.z, 0.0],
            size: [size.x, size.y, size.z, 0.0],
            unit: desc.unit,
            inv_unit: desc.inv_unit(),
            half_unit: desc.half_unit(),
            tri_count: mesh_buffers.triangle_count,
            width: desc.width,
            height: desc.height,
            depth: desc.depth,
            _pad: 0,
        };
        ctx.queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("voxelize_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: mesh_buffers.vertex.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: mesh_buffers.uv.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: mesh_buffers.index.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: voxel_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("voxelize_encoder"),
            });

        // Unfilled-means-empty is an explicit invariant, not an
        // allocator default.
        encoder.clear_buffer(&voxel_buffer, 0, None);
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("voxel_fill_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(match opts.fill_mode() {
                FillMode::Volume => &self.volume_pipeline,
                FillMode::Surface => &self.surface_pipeline,
            });
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(
                desc.width / WORKGROUP_AXIS + 1,
                desc.height / WORKGROUP_AXIS + 1,
                desc.depth / WORKGROUP_AXIS + 1,
            );
        }
        ctx.queue.submit([encoder.finish()]);

        // Upload buffers are scoped to this dispatch; the submission
        // above already owns the data.
        drop(mesh_buffers);

        log::info!(
            "Voxelized {} triangles into {}x{}x{} grid (unit {})",
            mesh.triangle_count(),
            desc.width,
            desc.height,
            desc.depth,
            desc.unit
        );

        Ok(VoxelGrid::new(voxel_buffer, desc))
    }
}
