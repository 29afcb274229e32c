//! Volume texture construction from a voxel grid

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use image::RgbaImage;

use crate::core::error::Error;
use crate::core::types::Result;
use crate::gpu::GpuContext;
use crate::voxel::voxelizer::WORKGROUP_AXIS;
use crate::voxel::volume::VoxelGrid;

/// Texture kernel uniforms (matches `TexParams` in volume_texture.wgsl)
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct TexParams {
    width: u32,
    height: u32,
    depth: u32,
    _pad: u32,
}

/// A 3D texture rasterized from a voxel grid.
///
/// Owns its texture, view and sampler; its lifetime is independent of
/// the source grid, which may be released once the build returns. A
/// degenerate source grid yields zero dimensions and no device texture.
pub struct VolumeTexture {
    pub texture: Option<wgpu::Texture>,
    pub view: Option<wgpu::TextureView>,
    pub sampler: Option<wgpu::Sampler>,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub format: wgpu::TextureFormat,
}

impl VolumeTexture {
    pub fn is_empty(&self) -> bool {
        self.texture.is_none()
    }
}

struct FormatPipeline {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

/// Dispatches the `build_texture3d` kernel: one thread per grid cell,
/// writing `color_sample(uv) * fill` into a 3D storage texture.
///
/// WGSL declares the storage texture format in the shader, so the
/// builder specializes the module per requested format and caches one
/// pipeline per format.
pub struct VolumeTextureBuilder {
    params_buffer: wgpu::Buffer,
    pipelines: HashMap<wgpu::TextureFormat, FormatPipeline>,
}

/// Storage-writable formats the texture kernel supports
fn storage_format_token(format: wgpu::TextureFormat) -> Option<&'static str> {
    match format {
        wgpu::TextureFormat::Rgba8Unorm => Some("rgba8unorm"),
        wgpu::TextureFormat::Rgba16Float => Some("rgba16float"),
        wgpu::TextureFormat::Rgba32Float => Some("rgba32float"),
        _ => None,
    }
}

impl VolumeTextureBuilder {
    pub fn new(device: &wgpu::Device) -> Self {
        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("texture3d_params"),
            size: std::mem::size_of::<TexParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            params_buffer,
            pipelines: HashMap::new(),
        }
    }

    fn pipeline_for(
        &mut self,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
    ) -> Result<&FormatPipeline> {
        let token = storage_format_token(format).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "{format:?} is not a supported storage texture format"
            ))
        })?;

        if !self.pipelines.contains_key(&format) {
            let source =
                include_str!("../../shaders/volume_texture.wgsl").replace("rgba8unorm", token);
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("volume_texture_shader"),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

            let bind_group_layout =
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("texture3d_layout"),
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
                        // binding 1: voxel buffer
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
                        // binding 2: 2D color source
                        wgpu::BindGroupLayoutEntry {
                            binding: 2,
                            visibility: wgpu::ShaderStages::COMPUTE,
                            ty: wgpu::BindingType::Texture {
                                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                                view_dimension: wgpu::TextureViewDimension::D2,
                                multisampled: false,
                            },
                            count: None,
                        },
                        // binding 3: color sampler
                        wgpu::BindGroupLayoutEntry {
                            binding: 3,
                            visibility: wgpu::ShaderStages::COMPUTE,
                            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                            count: None,
                        },
                        // binding 4: output 3D texture
                        wgpu::BindGroupLayoutEntry {
                            binding: 4,
                            visibility: wgpu::ShaderStages::COMPUTE,
                            ty: wgpu::BindingType::StorageTexture {
                                access: wgpu::StorageTextureAccess::WriteOnly,
                                format,
                                view_dimension: wgpu::TextureViewDimension::D3,
                            },
                            count: None,
                        },
                    ],
                });

            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("texture3d_pipeline_layout"),
                bind_group_layouts: &[&bind_group_layout],
                immediate_size: 0,
            });

            let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("build_texture3d_pipeline"),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some("build_texture3d"),
                compilation_options: Default::default(),
                cache: None,
            });

            self.pipelines.insert(
                format,
                FormatPipeline {
                    pipeline,
                    bind_group_layout,
                },
            );
        }

        Ok(&self.pipelines[&format])
    }

    /// Build a 3D texture matching the grid dimensions.
    ///
    /// `color` is sampled by each voxel's UV; `None` means a uniform
    /// white source. Filtering is caller-configurable, addressing is
    /// clamp-to-edge. A degenerate grid returns an empty
    /// [`VolumeTexture`] without dispatching.
    ///
    /// # Panics
    /// If the grid has been released.
    pub async fn build(
        &mut self,
        ctx: &GpuContext,
        grid: &VoxelGrid,
        color: Option<&RgbaImage>,
        format: wgpu::TextureFormat,
        filter: wgpu::FilterMode,
    ) -> Result<VolumeTexture> {
        let desc = *grid.descriptor();
        let Some(voxel_buffer) = grid.buffer() else {
            log::debug!("degenerate grid, skipping texture build");
            return Ok(VolumeTexture {
                texture: None,
                view: None,
                sampler: None,
                width: desc.width,
                height: desc.height,
                depth: desc.depth,
                format,
            });
        };

        self.pipeline_for(&ctx.device, format)?;

        let error_scope = ctx.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("volume_texture"),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: desc.depth,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D3,
            format,
            usage: wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let color_texture = upload_color_source(&ctx.device, &ctx.queue, color);
        if let Some(err) = error_scope.pop().await {
            return Err(Error::ResourceExhaustion(err.to_string()));
        }

        let sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("volume_texture_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter,
            min_filter: filter,
            ..Default::default()
        });

        let params = TexParams {
            width: desc.width,
            height: desc.height,
            depth: desc.depth,
            _pad: 0,
        };
        ctx.queue
            .write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let color_view = color_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let entry = &self.pipelines[&format];
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("texture3d_bind_group"),
            layout: &entry.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: voxel_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&color_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
            ],
        });

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("texture3d_encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("build_texture3d_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&entry.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(
                desc.width / WORKGROUP_AXIS + 1,
                desc.height / WORKGROUP_AXIS + 1,
                desc.depth / WORKGROUP_AXIS + 1,
            );
        }
        ctx.queue.submit([encoder.finish()]);

        log::info!(
            "Built {}x{}x{} volume texture ({:?})",
            desc.width,
            desc.height,
            desc.depth,
            format
        );

        Ok(VolumeTexture {
            texture: Some(texture),
            view: Some(view),
            sampler: Some(sampler),
            width: desc.width,
            height: desc.height,
            depth: desc.depth,
            format,
        })
    }
}

/// Upload the 2D color source; `None` becomes a 1x1 white texture.
fn upload_color_source(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    color: Option<&RgbaImage>,
) -> wgpu::Texture {
    let white = RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 255]));
    let source = color.unwrap_or(&white);
    let (width, height) = source.dimensions();

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("color_source"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        source.as_raw(),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );

    texture
}
