//! Voxel grid dimensioning and the per-cell record

use bytemuck::{Pod, Zeroable};

use crate::core::error::Error;
use crate::core::types::{Result, Vec3};
use crate::math::Aabb;

/// Per-cell record written by the fill kernels (32 bytes, matches WGSL
/// layout). `fill` is 0 for empty cells; the whole buffer is cleared
/// before dispatch so unfilled cells are unambiguously empty.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Voxel {
    /// World-space center of the cell
    pub position: [f32; 3],
    /// Occupancy flag (0 = empty, 1 = filled)
    pub fill: u32,
    /// UV sampled from the nearest mesh surface (zero if none)
    pub uv: [f32; 2],
    pub _pad: [f32; 2],
}

impl Voxel {
    pub fn is_filled(&self) -> bool {
        self.fill != 0
    }
}

/// Linear index of cell (x, y, z) in a row-major buffer
/// (x fastest, then y, then z).
pub fn voxel_index(x: u32, y: u32, z: u32, width: u32, height: u32) -> usize {
    (x + width * (y + height * z)) as usize
}

/// Smallest power of two >= n, as an axis cell count.
/// Non-positive input yields 0 (degenerate axis).
pub fn near_pow2(n: f32) -> u32 {
    if n <= 0.0 {
        return 0;
    }
    let k = n.log2().ceil() as u32;
    2u32.pow(k)
}

/// Grid dimensions and cell size derived from a bounding volume.
///
/// Cell (i, j, k) occupies the world-space box
/// `[min + (i,j,k)*unit, min + (i+1,j+1,k+1)*unit]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridDescriptor {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    /// Cell edge length
    pub unit: f32,
    /// Min corner of the bounding volume
    pub start: Vec3,
    /// Max corner of the bounding volume
    pub end: Vec3,
}

impl GridDescriptor {
    /// Compute grid dimensions from a bounding volume and a target
    /// resolution.
    ///
    /// `unit = max_extent / resolution`, so the longest axis is divided
    /// into exactly `resolution` cells when `pow2` is false. The other
    /// axes round up independently; with `pow2` each axis count is the
    /// smallest power of two covering it.
    pub fn from_bounds(bounds: &Aabb, resolution: u32, pow2: bool) -> Result<Self> {
        bounds.validate()?;
        if resolution == 0 {
            return Err(Error::InvalidArgument(
                "resolution must be positive".into(),
            ));
        }

        let size = bounds.size();
        let max_extent = bounds.max_extent();
        if max_extent <= 0.0 {
            // Point-like bounds: no cells on any axis.
            return Ok(Self {
                width: 0,
                height: 0,
                depth: 0,
                unit: 0.0,
                start: bounds.min,
                end: bounds.max,
            });
        }

        let unit = max_extent / resolution as f32;
        let (width, height, depth) = if pow2 {
            (
                near_pow2(size.x / unit),
                near_pow2(size.y / unit),
                near_pow2(size.z / unit),
            )
        } else {
            (
                (size.x / unit).ceil() as u32,
                (size.y / unit).ceil() as u32,
                (size.z / unit).ceil() as u32,
            )
        };

        Ok(Self {
            width,
            height,
            depth,
            unit,
            start: bounds.min,
            end: bounds.max,
        })
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize * self.depth as usize
    }

    /// True when some axis has no cells
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn inv_unit(&self) -> f32 {
        1.0 / self.unit
    }

    pub fn half_unit(&self) -> f32 {
        self.unit * 0.5
    }

    /// Voxel buffer size in bytes
    pub fn buffer_size(&self) -> u64 {
        self.len() as u64 * std::mem::size_of::<Voxel>() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voxel_layout() {
        // Must match the WGSL Voxel struct.
        assert_eq!(std::mem::size_of::<Voxel>(), 32);
    }

    #[test]
    fn test_voxel_index_row_major() {
        // x fastest, then y, then z
        assert_eq!(voxel_index(0, 0, 0, 4, 3), 0);
        assert_eq!(voxel_index(1, 0, 0, 4, 3), 1);
        assert_eq!(voxel_index(0, 1, 0, 4, 3), 4);
        assert_eq!(voxel_index(0, 0, 1, 4, 3), 12);
        assert_eq!(voxel_index(3, 2, 1, 4, 3), 3 + 4 * (2 + 3 * 1));
    }

    #[test]
    fn test_near_pow2() {
        assert_eq!(near_pow2(-1.0), 0);
        assert_eq!(near_pow2(0.0), 0);
        assert_eq!(near_pow2(1.0), 1);
        assert_eq!(near_pow2(3.0), 4);
        assert_eq!(near_pow2(4.0), 4);
        assert_eq!(near_pow2(4.2), 8);
        assert_eq!(near_pow2(100.0), 128);
    }

    #[test]
    fn test_unit_cube_dims() {
        let bounds = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let desc = GridDescriptor::from_bounds(&bounds, 4, false).unwrap();
        assert_eq!((desc.width, desc.height, desc.depth), (4, 4, 4));
        assert_eq!(desc.unit, 0.25);
        assert_eq!(desc.len(), 64);
    }

    #[test]
    fn test_non_uniform_dims() {
        // Longest axis gets exactly `resolution` cells, the others
        // round up independently.
        let bounds = Aabb::new(Vec3::ZERO, Vec3::new(2.0, 1.0, 0.5));
        let desc = GridDescriptor::from_bounds(&bounds, 8, false).unwrap();
        assert_eq!(desc.unit, 0.25);
        assert_eq!((desc.width, desc.height, desc.depth), (8, 4, 2));

        let bounds = Aabb::new(Vec3::ZERO, Vec3::new(1.0, 0.3, 0.3));
        let desc = GridDescriptor::from_bounds(&bounds, 7, false).unwrap();
        assert_eq!(desc.width, 7);
        // 0.3 / (1/7) = 2.1 -> 3
        assert_eq!(desc.height, 3);
        assert_eq!(desc.depth, 3);
    }

    #[test]
    fn test_pow2_dims() {
        let bounds = Aabb::new(Vec3::ZERO, Vec3::new(2.0, 1.0, 0.6));
        let desc = GridDescriptor::from_bounds(&bounds, 10, true).unwrap();
        let plain = GridDescriptor::from_bounds(&bounds, 10, false).unwrap();
        for (p2, n) in [
            (desc.width, plain.width),
            (desc.height, plain.height),
            (desc.depth, plain.depth),
        ] {
            assert!(p2.is_power_of_two());
            assert!(p2 >= n);
            // Smallest power of two covering the axis.
            assert!(p2 / 2 < n);
        }
    }

    #[test]
    fn test_zero_extent_axis_is_degenerate() {
        let bounds = Aabb::new(Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0));
        let desc = GridDescriptor::from_bounds(&bounds, 4, false).unwrap();
        assert_eq!(desc.depth, 0);
        assert!(desc.is_empty());
        assert_eq!(desc.len(), 0);
    }

    #[test]
    fn test_point_bounds_are_degenerate() {
        let bounds = Aabb::new(Vec3::ONE, Vec3::ONE);
        let desc = GridDescriptor::from_bounds(&bounds, 4, false).unwrap();
        assert!(desc.is_empty());
    }

    #[test]
    fn test_invalid_inputs() {
        let bounds = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert!(GridDescriptor::from_bounds(&bounds, 0, false).is_err());

        let bad = Aabb::new(Vec3::splat(f32::NAN), Vec3::ONE);
        assert!(GridDescriptor::from_bounds(&bad, 4, false).is_err());
    }
}
