//! Error types for the voxelizer

use thiserror::Error;

/// Main error type for the crate.
///
/// A degenerate grid (zero voxels on some axis) is not an error; it
/// yields an empty grid or texture. Operating on a released
/// [`crate::voxel::VoxelGrid`] is a programming error and panics instead
/// of returning a variant here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("resource exhaustion: {0}")]
    ResourceExhaustion(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
