//! Quad render pipeline — instanced rendering of the shared unit quad.
//!
//! One pipeline object per [`PipelineVariant`].  The textured variant binds
//! the camera at group 0 and a texture + sampler at group 1; the solid
//! variant has no bind groups at all.

use wgpu::{
    BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingType, BlendState,
    BufferBindingType, ColorTargetState, ColorWrites, Device, FragmentState, FrontFace,
    MultisampleState, PipelineCompilationOptions, PipelineLayoutDescriptor, PolygonMode,
    PrimitiveState, PrimitiveTopology, RenderPipeline, RenderPipelineDescriptor,
    ShaderModuleDescriptor, ShaderStages, TextureFormat, VertexState,
};

use crate::vertex::PipelineVariant;

/// A compiled pipeline for one variant.
pub struct QuadPipeline {
    variant: PipelineVariant,
    pipeline: RenderPipeline,
}

impl QuadPipeline {
    /// Build the pipeline for `variant`.
    ///
    /// `camera_bgl` and `texture_bgl` are only used by the textured variant.
    pub fn new(
        device: &Device,
        surface_format: TextureFormat,
        variant: PipelineVariant,
        camera_bgl: &BindGroupLayout,
        texture_bgl: &BindGroupLayout,
    ) -> Self {
        // ── Shader ──────────────────────────────────────────────
        let source = match variant {
            PipelineVariant::Textured => include_str!("../shaders/quad.wgsl"),
            PipelineVariant::Solid => include_str!("../shaders/solid.wgsl"),
        };
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some(variant.label()),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        // ── Pipeline layout ─────────────────────────────────────
        let textured_layouts = [camera_bgl, texture_bgl];
        let bind_group_layouts: &[&BindGroupLayout] = match variant {
            PipelineVariant::Textured => &textured_layouts,
            PipelineVariant::Solid => &[],
        };
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("quad_pipeline_layout"),
            bind_group_layouts,
            push_constant_ranges: &[],
        });

        // ── Render pipeline ─────────────────────────────────────
        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some(variant.label()),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: PipelineCompilationOptions::default(),
                buffers: &[variant.vertex_layout(), variant.instance_layout()],
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: PipelineCompilationOptions::default(),
                targets: &[Some(ColorTargetState {
                    format: surface_format,
                    blend: Some(BlendState::ALPHA_BLENDING),
                    write_mask: ColorWrites::ALL,
                })],
            }),
            primitive: PrimitiveState {
                topology: PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: FrontFace::Ccw,
                cull_mode: None, // 2D — no backface culling
                polygon_mode: PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self { variant, pipeline }
    }

    /// Group-0 layout holding the camera uniform at binding 0.
    pub fn create_camera_bind_group_layout(device: &Device) -> BindGroupLayout {
        device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("camera_bgl"),
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::VERTEX,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        })
    }

    pub fn variant(&self) -> PipelineVariant {
        self.variant
    }

    pub fn pipeline(&self) -> &RenderPipeline {
        &self.pipeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::GpuContext;
    use crate::textures::TextureStore;

    #[test]
    fn test_both_variants_build_headless() {
        let gpu = pollster::block_on(GpuContext::new_headless());
        // May fail in CI without GPU — skip gracefully.
        if let Ok(gpu) = gpu {
            let camera_bgl = QuadPipeline::create_camera_bind_group_layout(&gpu.device);
            let texture_bgl = TextureStore::create_bind_group_layout(&gpu.device);
            for variant in PipelineVariant::ALL {
                let pipeline = QuadPipeline::new(&gpu.device, gpu.surface_format, variant, &camera_bgl, &texture_bgl);
                assert_eq!(pipeline.variant(), variant);
            }
        }
    }
}
