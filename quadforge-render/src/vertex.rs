//! GPU vertex, instance, and camera data types for the quad pipelines.
//!
//! Packed records derive `bytemuck::Pod` + `Zeroable` for zero-copy upload
//! to GPU buffers.  Attribute locations are shared with
//! `shaders/quad.wgsl` and `shaders/solid.wgsl` and must not move.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::{BufferAddress, VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode};

use crate::atlas::AtlasRegion;

// ───────────────────────────────────────────────────────────────────
// Pipeline variant
// ───────────────────────────────────────────────────────────────────

/// The two quad pipelines.  Chosen once when the pipeline object is built;
/// every draw batch names the variant it targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PipelineVariant {
    /// Camera uniform (group 0), texture + sampler (group 1), full
    /// instance record.
    Textured,
    /// Position-only input, no bind groups, fixed output color.
    Solid,
}

impl PipelineVariant {
    pub const ALL: [PipelineVariant; 2] = [PipelineVariant::Textured, PipelineVariant::Solid];

    /// Vertex-step buffer layout (slot 0).
    pub fn vertex_layout(self) -> VertexBufferLayout<'static> {
        match self {
            PipelineVariant::Textured => Vertex::layout(),
            PipelineVariant::Solid => Vertex::position_layout(),
        }
    }

    /// Instance-step buffer layout (slot 1).
    pub fn instance_layout(self) -> VertexBufferLayout<'static> {
        match self {
            PipelineVariant::Textured => TexturedInstanceRaw::layout(),
            PipelineVariant::Solid => SolidInstanceRaw::layout(),
        }
    }

    /// Bytes per packed instance record.
    pub fn instance_stride(self) -> usize {
        match self {
            PipelineVariant::Textured => std::mem::size_of::<TexturedInstanceRaw>(),
            PipelineVariant::Solid => std::mem::size_of::<SolidInstanceRaw>(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PipelineVariant::Textured => "textured",
            PipelineVariant::Solid => "solid",
        }
    }
}

// ───────────────────────────────────────────────────────────────────
// Vertex (unit quad)
// ───────────────────────────────────────────────────────────────────

/// A single vertex of the shared unit quad.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Position in [0, 1] model space.
    pub position: [f32; 2],
    /// Native texture coordinate in [0, 1].
    pub tex_coords: [f32; 2],
}

impl Vertex {
    /// location(0) = position, location(1) = tex_coords.
    pub fn layout() -> VertexBufferLayout<'static> {
        static ATTRS: &[VertexAttribute] = &[
            VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: VertexFormat::Float32x2,
            },
            VertexAttribute {
                offset: 8,
                shader_location: 1,
                format: VertexFormat::Float32x2,
            },
        ];
        VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as BufferAddress,
            step_mode: VertexStepMode::Vertex,
            attributes: ATTRS,
        }
    }

    /// Same buffer, but only location(0) is read (solid variant).
    pub fn position_layout() -> VertexBufferLayout<'static> {
        static ATTRS: &[VertexAttribute] = &[VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: VertexFormat::Float32x2,
        }];
        VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as BufferAddress,
            step_mode: VertexStepMode::Vertex,
            attributes: ATTRS,
        }
    }
}

// ───────────────────────────────────────────────────────────────────
// Instance data
// ───────────────────────────────────────────────────────────────────

/// One quad as the caller describes it.
///
/// The transform stays a `Mat4` here; it is flattened into four column
/// rows only when packed with [`QuadInstance::to_textured`] or
/// [`QuadInstance::to_solid`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadInstance {
    /// Model transform of the unit quad in world space.
    pub transform: Mat4,
    /// Straight-alpha RGBA, multiplied with the sampled texel.
    pub color: [f32; 4],
    /// Sub-rectangle of the bound texture.
    pub region: AtlasRegion,
}

impl Default for QuadInstance {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY)
    }
}

impl QuadInstance {
    /// Opaque white, full texture.
    pub fn new(transform: Mat4) -> Self {
        Self {
            transform,
            color: [1.0; 4],
            region: AtlasRegion::FULL,
        }
    }

    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.color = color;
        self
    }

    pub fn with_region(mut self, region: AtlasRegion) -> Self {
        self.region = region;
        self
    }

    /// Pack into the textured pipeline's instance record.
    pub fn to_textured(&self) -> TexturedInstanceRaw {
        TexturedInstanceRaw {
            model: self.transform.to_cols_array_2d(),
            color: self.color,
            region_scale: self.region.scale,
            region_offset: self.region.offset,
        }
    }

    /// Pack into the solid pipeline's instance record (transform only).
    pub fn to_solid(&self) -> SolidInstanceRaw {
        SolidInstanceRaw {
            model: self.transform.to_cols_array_2d(),
        }
    }
}

/// Packed per-instance record of the textured pipeline.
///
/// 96 bytes per instance — 100,000 quads = 9.6 MB of GPU memory.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct TexturedInstanceRaw {
    /// Model matrix, column-major (locations 2–5).
    pub model: [[f32; 4]; 4],
    /// RGBA color (location 6).
    pub color: [f32; 4],
    /// Atlas region scale (location 7).
    pub region_scale: [f32; 2],
    /// Atlas region offset (location 8).
    pub region_offset: [f32; 2],
}

impl TexturedInstanceRaw {
    pub fn layout() -> VertexBufferLayout<'static> {
        static ATTRS: &[VertexAttribute] = &[
            // location(2..=5) = model matrix columns
            VertexAttribute {
                offset: 0,
                shader_location: 2,
                format: VertexFormat::Float32x4,
            },
            VertexAttribute {
                offset: 16,
                shader_location: 3,
                format: VertexFormat::Float32x4,
            },
            VertexAttribute {
                offset: 32,
                shader_location: 4,
                format: VertexFormat::Float32x4,
            },
            VertexAttribute {
                offset: 48,
                shader_location: 5,
                format: VertexFormat::Float32x4,
            },
            // location(6) = color
            VertexAttribute {
                offset: 64,
                shader_location: 6,
                format: VertexFormat::Float32x4,
            },
            // location(7) = region scale
            VertexAttribute {
                offset: 80,
                shader_location: 7,
                format: VertexFormat::Float32x2,
            },
            // location(8) = region offset
            VertexAttribute {
                offset: 88,
                shader_location: 8,
                format: VertexFormat::Float32x2,
            },
        ];
        VertexBufferLayout {
            array_stride: std::mem::size_of::<TexturedInstanceRaw>() as BufferAddress,
            step_mode: VertexStepMode::Instance,
            attributes: ATTRS,
        }
    }
}

/// Packed per-instance record of the solid pipeline.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SolidInstanceRaw {
    /// Model matrix, column-major (locations 2–5).
    pub model: [[f32; 4]; 4],
}

impl SolidInstanceRaw {
    pub fn layout() -> VertexBufferLayout<'static> {
        static ATTRS: &[VertexAttribute] = &[
            VertexAttribute {
                offset: 0,
                shader_location: 2,
                format: VertexFormat::Float32x4,
            },
            VertexAttribute {
                offset: 16,
                shader_location: 3,
                format: VertexFormat::Float32x4,
            },
            VertexAttribute {
                offset: 32,
                shader_location: 4,
                format: VertexFormat::Float32x4,
            },
            VertexAttribute {
                offset: 48,
                shader_location: 5,
                format: VertexFormat::Float32x4,
            },
        ];
        VertexBufferLayout {
            array_stride: std::mem::size_of::<SolidInstanceRaw>() as BufferAddress,
            step_mode: VertexStepMode::Instance,
            attributes: ATTRS,
        }
    }
}

// ───────────────────────────────────────────────────────────────────
// Camera uniform
// ───────────────────────────────────────────────────────────────────

/// Camera uniform sent to the GPU once per frame (group 0, binding 0).
///
/// 64 bytes — fits in a single uniform buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct CameraUniform {
    /// 4×4 view-projection matrix (column-major).
    pub view_proj: [[f32; 4]; 4],
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::from_matrix(Mat4::IDENTITY)
    }
}

impl CameraUniform {
    pub fn from_matrix(view_proj: Mat4) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.view_proj)
    }
}

// ===================================================================
// Tests
// ===================================================================
