//! End-to-end voxelization tests against a real adapter.
//!
//! Each test acquires its own device and skips (with a note on stderr)
//! when the host has no usable GPU.

use glam::{Vec2, Vec3};

use voxmesh::{
    Aabb, GpuContext, MeshData, VolumeTextureBuilder, VoxelizeOptions, Voxelizer,
};

fn context() -> Option<GpuContext> {
    match GpuContext::new_blocking() {
        Ok(ctx) => Some(ctx),
        Err(e) => {
            eprintln!("skipping GPU test: {e}");
            None
        }
    }
}

/// Closed unit cube: 8 vertices, 12 triangles, outward winding.
fn unit_cube() -> MeshData {
    MeshData {
        positions: vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
        ],
        uvs: vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ],
        indices: vec![
            0, 2, 1, 0, 3, 2, // -z
            4, 5, 6, 4, 6, 7, // +z
            0, 1, 5, 0, 5, 4, // -y
            3, 7, 6, 3, 6, 2, // +y
            0, 4, 7, 0, 7, 3, // -x
            1, 2, 6, 1, 6, 5, // +x
        ],
    }
}

#[test]
fn volume_fill_unit_cube() {
    let Some(ctx) = context() else { return };
    let voxelizer = Voxelizer::new(&ctx.device);
    let opts = VoxelizeOptions {
        resolution: 4,
        volume: true,
        pow2: false,
    };

    let mut grid = pollster::block_on(voxelizer.voxelize(&ctx, &unit_cube(), &opts)).unwrap();
    let desc = *grid.descriptor();
    assert_eq!((desc.width, desc.height, desc.depth), (4, 4, 4));
    assert_eq!(desc.unit, 0.25);

    let voxels = grid.readback(&ctx).unwrap();
    assert_eq!(voxels.len(), 64);
    // Every cell center is strictly inside the cube.
    assert!(voxels.iter().all(|v| v.is_filled()));

    // Row-major order: voxel (x, y, z) sits at min + (xyz + 0.5) * unit.
    let v = &voxels[voxmesh::voxel::voxel_index(3, 2, 1, 4, 4)];
    let expected = Vec3::new(3.5, 2.5, 1.5) * 0.25;
    assert!((Vec3::from_array(v.position) - expected).length() < 1e-5);

    grid.release();
}

#[test]
fn surface_fill_unit_cube() {
    let Some(ctx) = context() else { return };
    let voxelizer = Voxelizer::new(&ctx.device);
    let opts = VoxelizeOptions {
        resolution: 4,
        volume: false,
        pow2: false,
    };

    let grid = pollster::block_on(voxelizer.voxelize(&ctx, &unit_cube(), &opts)).unwrap();
    let voxels = grid.readback(&ctx).unwrap();
    assert_eq!(voxels.len(), 64);

    // Exactly the 56 boundary cells touch the cube's surface; the
    // 2x2x2 interior block does not.
    let filled = voxels.iter().filter(|v| v.is_filled()).count();
    assert_eq!(filled, 56);
    for z in 0..4u32 {
        for y in 0..4u32 {
            for x in 0..4u32 {
                let boundary =
                    [x, y, z].iter().any(|&i| i == 0 || i == 3);
                let v = &voxels[voxmesh::voxel::voxel_index(x, y, z, 4, 4)];
                assert_eq!(v.is_filled(), boundary, "cell ({x},{y},{z})");
            }
        }
    }
}

#[test]
fn readback_is_repeatable() {
    let Some(ctx) = context() else { return };
    let voxelizer = Voxelizer::new(&ctx.device);
    let opts = VoxelizeOptions::default();

    let grid = pollster::block_on(voxelizer.voxelize(&ctx, &unit_cube(), &opts)).unwrap();
    let first = grid.readback(&ctx).unwrap();
    let second = grid.readback(&ctx).unwrap();
    assert_eq!(first.len(), second.len());
    assert_eq!(first, second);
}

#[test]
fn pow2_grid_dimensions() {
    let Some(ctx) = context() else { return };
    let voxelizer = Voxelizer::new(&ctx.device);
    let opts = VoxelizeOptions {
        resolution: 5,
        volume: true,
        pow2: true,
    };

    let grid = pollster::block_on(voxelizer.voxelize(&ctx, &unit_cube(), &opts)).unwrap();
    let desc = grid.descriptor();
    assert_eq!((desc.width, desc.height, desc.depth), (8, 8, 8));
    assert_eq!(grid.readback(&ctx).unwrap().len(), 512);
}

#[test]
fn degenerate_mesh_yields_empty_grid() {
    let Some(ctx) = context() else { return };
    let voxelizer = Voxelizer::new(&ctx.device);

    // Flat quad: zero extent along z.
    let mesh = MeshData {
        positions: vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ],
        uvs: vec![],
        indices: vec![0, 1, 2, 0, 2, 3],
    };

    let grid =
        pollster::block_on(voxelizer.voxelize(&ctx, &mesh, &VoxelizeOptions::default())).unwrap();
    assert!(grid.is_empty());
    assert!(grid.readback(&ctx).unwrap().is_empty());

    // Texture building from an empty grid must not dispatch either.
    let mut builder = VolumeTextureBuilder::new(&ctx.device);
    let texture = pollster::block_on(builder.build(
        &ctx,
        &grid,
        None,
        wgpu::TextureFormat::Rgba8Unorm,
        wgpu::FilterMode::Linear,
    ))
    .unwrap();
    assert!(texture.is_empty());
    assert_eq!(texture.depth, 0);
}

#[test]
fn build_volume_texture_from_cube() {
    let Some(ctx) = context() else { return };
    let voxelizer = Voxelizer::new(&ctx.device);
    let opts = VoxelizeOptions {
        resolution: 4,
        volume: true,
        pow2: false,
    };

    let mut grid = pollster::block_on(voxelizer.voxelize(&ctx, &unit_cube(), &opts)).unwrap();

    let color = image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255]));
    let mut builder = VolumeTextureBuilder::new(&ctx.device);
    let texture = pollster::block_on(builder.build(
        &ctx,
        &grid,
        Some(&color),
        wgpu::TextureFormat::Rgba8Unorm,
        wgpu::FilterMode::Nearest,
    ))
    .unwrap();

    assert!(!texture.is_empty());
    assert_eq!((texture.width, texture.height, texture.depth), (4, 4, 4));

    // The texture owns its storage; the source grid can go away.
    grid.release();
    assert!(texture.texture.is_some());
}

#[test]
fn explicit_bounds_override_mesh_extent() {
    let Some(ctx) = context() else { return };
    let voxelizer = Voxelizer::new(&ctx.device);
    let opts = VoxelizeOptions {
        resolution: 4,
        volume: false,
        pow2: false,
    };

    // Bounds twice the mesh size: the cube occupies one octant.
    let bounds = Aabb::new(Vec3::ZERO, Vec3::splat(2.0));
    let grid = pollster::block_on(
        voxelizer.voxelize_with_bounds(&ctx, &unit_cube(), bounds, &opts),
    )
    .unwrap();
    let desc = grid.descriptor();
    assert_eq!((desc.width, desc.height, desc.depth), (4, 4, 4));
    assert_eq!(desc.unit, 0.5);

    let voxels = grid.readback(&ctx).unwrap();
    // No surface reaches the far layer of the expanded bounds.
    let far = voxels
        .iter()
        .enumerate()
        .filter(|(i, _)| i / 16 == 3) // z == 3, spans [1.5, 2.0]
        .filter(|(_, v)| v.is_filled())
        .count();
    assert_eq!(far, 0);
}

#[test]
fn invalid_mesh_is_rejected_before_dispatch() {
    let Some(ctx) = context() else { return };
    let voxelizer = Voxelizer::new(&ctx.device);

    let mut mesh = unit_cube();
    mesh.indices[0] = 99;
    let err = pollster::block_on(voxelizer.voxelize(&ctx, &mesh, &VoxelizeOptions::default()));
    assert!(matches!(err, Err(voxmesh::Error::InvalidArgument(_))));

    let err = pollster::block_on(voxelizer.voxelize(
        &ctx,
        &unit_cube(),
        &VoxelizeOptions {
            resolution: 0,
            ..Default::default()
        },
    ));
    assert!(matches!(err, Err(voxmesh::Error::InvalidArgument(_))));
}
