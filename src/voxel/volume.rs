//! Voxel grid handle: device buffer ownership, readback, release

use crate::core::error::Error;
use crate::core::types::Result;
use crate::gpu::GpuContext;
use crate::voxel::grid::{GridDescriptor, Voxel};

/// A populated voxel grid on the device.
///
/// Sole owner of the voxel buffer. The buffer holds exactly
/// `width * height * depth` [`Voxel`] records in row-major order
/// (x fastest, then y, then z).
///
/// [`VoxelGrid::release`] frees the device storage. Releasing twice, or
/// touching the grid after release, is a programming error and panics.
pub struct VoxelGrid {
    buffer: Option<wgpu::Buffer>,
    desc: GridDescriptor,
    released: bool,
}

impl VoxelGrid {
    pub(crate) fn new(buffer: wgpu::Buffer, desc: GridDescriptor) -> Self {
        Self {
            buffer: Some(buffer),
            desc,
            released: false,
        }
    }

    /// Degenerate grid: zero cells, no device storage, no dispatch ran.
    pub(crate) fn empty(desc: GridDescriptor) -> Self {
        Self {
            buffer: None,
            desc,
            released: false,
        }
    }

    pub fn descriptor(&self) -> &GridDescriptor {
        &self.desc
    }

    pub fn unit(&self) -> f32 {
        self.desc.unit
    }

    /// Total cell count
    pub fn len(&self) -> usize {
        self.desc.len()
    }

    /// True for a degenerate (zero-cell) grid
    pub fn is_empty(&self) -> bool {
        self.desc.is_empty()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    fn assert_alive(&self) {
        assert!(!self.released, "voxel grid used after release");
    }

    /// Device buffer, if the grid is non-degenerate.
    ///
    /// # Panics
    /// If the grid has been released.
    pub fn buffer(&self) -> Option<&wgpu::Buffer> {
        self.assert_alive();
        self.buffer.as_ref()
    }

    /// Blocking transfer of the full voxel buffer to host memory.
    ///
    /// Waits for outstanding device work, so the fill dispatch is always
    /// complete before data is returned. Row-major ordering is
    /// preserved. Safe to call repeatedly while the grid is alive; a
    /// degenerate grid yields an empty vec.
    ///
    /// # Panics
    /// If the grid has been released.
    pub fn readback(&self, ctx: &GpuContext) -> Result<Vec<Voxel>> {
        self.assert_alive();
        let Some(buffer) = self.buffer.as_ref() else {
            return Ok(Vec::new());
        };

        let staging = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("voxel_staging"),
            size: self.desc.buffer_size(),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("voxel_readback"),
            });
        encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, staging.size());
        ctx.queue.submit([encoder.finish()]);

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = ctx.device.poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: None,
        });

        rx.recv()
            .map_err(|e| Error::Gpu(format!("readback channel closed: {e}")))?
            .map_err(|e| Error::Gpu(format!("voxel readback map failed: {e}")))?;

        let data = slice.get_mapped_range();
        let voxels: Vec<Voxel> = bytemuck::cast_slice(&data).to_vec();
        drop(data);
        staging.unmap();

        log::debug!("Read back {} voxels", voxels.len());
        Ok(voxels)
    }

    /// Free the device storage.
    ///
    /// # Panics
    /// If called twice.
    pub fn release(&mut self) {
        assert!(!self.released, "voxel grid released twice");
        self.released = true;
        if let Some(buffer) = self.buffer.take() {
            buffer.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Vec3;
    use crate::math::Aabb;

    fn degenerate() -> VoxelGrid {
        let bounds = Aabb::new(Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0));
        let desc = GridDescriptor::from_bounds(&bounds, 4, false).unwrap();
        VoxelGrid::empty(desc)
    }

    #[test]
    fn test_empty_grid() {
        let grid = degenerate();
        assert!(grid.is_empty());
        assert_eq!(grid.len(), 0);
        assert!(!grid.is_released());
    }

    #[test]
    fn test_release_marks_grid() {
        let mut grid = degenerate();
        grid.release();
        assert!(grid.is_released());
    }

    #[test]
    #[should_panic(expected = "released twice")]
    fn test_double_release_panics() {
        let mut grid = degenerate();
        grid.release();
        grid.release();
    }

    #[test]
    #[should_panic(expected = "used after release")]
    fn test_use_after_release_panics() {
        let mut grid = degenerate();
        grid.release();
        let _ = grid.buffer();
    }
}
