//! wgpu render pipelines.

pub mod quad;

pub use quad::QuadPipeline;
