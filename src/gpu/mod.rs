//! GPU device plumbing

pub mod context;

pub use context::GpuContext;
