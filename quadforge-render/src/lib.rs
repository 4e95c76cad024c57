//! # quadforge-render
//!
//! Instanced 2D quad renderer built on `wgpu`.  Every quad is one instance
//! of a single shared unit quad; a frame is drawn with as few instanced
//! draw calls as its textures allow.
//!
//! ## Architecture
//!
//! ```text
//!  QuadRequest × N  (Quad, texture, atlas region, layer)
//!       │
//!       ▼
//!  Batcher.finish(&textures)        ◀─── sort by (layer, variant, texture)
//!       │                                 → packed instance records
//!       ▼
//!  FrameRenderList (DrawBatch runs) + InstanceBuffer bytes
//!       │
//!       ▼
//!  Renderer.prepare()               ◀─── uploads instances + camera
//!       │
//!       ▼
//!  Renderer.render_to_surface()     ◀─── one draw_indexed per batch
//! ```
//!
//! Everything above the `Renderer` is plain CPU code and can be used (and
//! tested) without a GPU.
//!
//! ## Crate modules
//!
//! - [`geometry`] — the shared unit quad
//! - [`vertex`] — vertex, instance, and camera data layouts
//! - [`atlas`] — atlas regions and sprite sheets
//! - [`instance_buffer`] — growable per-frame instance storage
//! - [`batcher`] — request sorting and draw-batch construction
//! - [`frame`] — the per-frame draw list
//! - [`camera`] — view-projection math and the camera uniform
//! - [`shapes`] — position/size/rotation quads
//! - [`textures`] — texture handles and GPU texture storage
//! - [`context`] — GPU device/queue/surface initialisation
//! - [`pipelines`] — wgpu render pipelines (textured, solid)
//! - [`renderer`] — high-level frame orchestration

pub mod atlas;
pub mod batcher;
pub mod camera;
pub mod context;
pub mod frame;
pub mod geometry;
pub mod instance_buffer;
pub mod pipelines;
pub mod renderer;
pub mod shapes;
pub mod textures;
pub mod vertex;

// Re-exports for convenience
pub use atlas::{AtlasRegion, SpriteSheet};
pub use batcher::{BatchError, Batcher, BatcherConfig, Diagnostic, QuadRequest};
pub use camera::{Camera2D, CameraUniformWriter};
pub use context::GpuContext;
pub use frame::{DrawBatch, FrameId, FrameRenderList};
pub use geometry::GeometryTable;
pub use instance_buffer::{CapacityError, InstanceBuffer};
pub use renderer::{FrameStats, RenderError, Renderer};
pub use shapes::Quad;
pub use textures::{TextureHandle, TextureRegistry, TextureStore};
pub use vertex::{CameraUniform, PipelineVariant, QuadInstance, Vertex};
