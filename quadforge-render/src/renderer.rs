//! High-level renderer that ties the GPU context, pipelines, batcher, and
//! camera together into a single `render_*()` call per frame.
//!
//! ```ignore
//! let mut renderer = Renderer::new(&gpu, BatcherConfig::default());
//! renderer.begin(camera.view_proj())?;
//! renderer.draw_quad(&quad)?;
//! let stats = renderer.render_to_surface(&gpu)?;
//! ```

use glam::Mat4;
use log::{debug, warn};
use thiserror::Error;
use wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, Buffer, BufferDescriptor, BufferUsages,
    Color, CommandEncoder, CommandEncoderDescriptor, Device, IndexFormat, LoadOp, Operations,
    Queue, RenderPass, RenderPassColorAttachment, RenderPassDescriptor, StoreOp, TextureView,
    TextureViewDescriptor,
};

use crate::atlas::AtlasRegion;
use crate::batcher::{BatchError, Batcher, BatcherConfig, QuadRequest};
use crate::camera::CameraUniformWriter;
use crate::context::GpuContext;
use crate::frame::{FrameId, FrameRenderList};
use crate::geometry::GeometryTable;
use crate::pipelines::QuadPipeline;
use crate::shapes::Quad;
use crate::textures::{TextureError, TextureHandle, TextureStore};
use crate::vertex::{CameraUniform, PipelineVariant, Vertex};

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("No surface configured (headless mode)")]
    NoSurface,
    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),
    #[error("Texture error: {0}")]
    Texture(#[from] TextureError),
}

/// Frame statistics returned after each render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Number of quads drawn.
    pub quad_count: u32,
    /// Number of draw calls.
    pub draw_calls: u32,
    /// Requests dropped or clamped while batching.
    pub diagnostics: u32,
}

impl FrameStats {
    fn from_list(list: &FrameRenderList) -> Self {
        Self {
            quad_count: list.instance_count(),
            draw_calls: list.len() as u32,
            diagnostics: list.diagnostics().len() as u32,
        }
    }
}

/// GPU copy of one variant's instance buffer.
struct GpuInstanceBuffer {
    variant: PipelineVariant,
    buffer: Buffer,
    /// Capacity in records.
    capacity: usize,
}

impl GpuInstanceBuffer {
    fn new(device: &Device, variant: PipelineVariant, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let buffer = device.create_buffer(&BufferDescriptor {
            label: Some(variant.label()),
            size: (capacity * variant.instance_stride()) as u64,
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self {
            variant,
            buffer,
            capacity,
        }
    }

    /// Reallocate if the CPU side grew past us, then upload `bytes`.
    fn sync(&mut self, device: &Device, queue: &Queue, bytes: &[u8], resync: Option<usize>) {
        let required = bytes.len() / self.variant.instance_stride();
        let target = resync.unwrap_or(0).max(required);
        if target > self.capacity {
            debug!(
                "Resynchronising {} instance buffer: {} -> {} records",
                self.variant.label(),
                self.capacity,
                target
            );
            self.buffer.destroy();
            *self = Self::new(device, self.variant, target);
        }
        if !bytes.is_empty() {
            queue.write_buffer(&self.buffer, 0, bytes);
        }
    }
}

/// Main quad renderer.
///
/// Owns both pipeline variants, the shared quad geometry, the GPU instance
/// buffers, the camera uniform, and the texture store, and drives a
/// [`Batcher`] once per frame.
pub struct Renderer {
    textured_pipeline: QuadPipeline,
    solid_pipeline: QuadPipeline,
    textures: TextureStore,

    // Geometry
    vertex_buffer: Buffer,
    index_buffer: Buffer,

    // Instancing
    batcher: Batcher,
    textured_instances: GpuInstanceBuffer,
    solid_instances: GpuInstanceBuffer,

    // Camera
    camera: CameraUniformWriter,
    camera_buffer: Buffer,
    camera_bind_group: BindGroup,

    clear_color: Color,
}

impl Renderer {
    /// Create a new renderer for the given GPU context.
    pub fn new(gpu: &GpuContext, config: BatcherConfig) -> Self {
        let device = &gpu.device;
        let textures = TextureStore::new(device, &gpu.queue);
        let camera_bgl = QuadPipeline::create_camera_bind_group_layout(device);

        let textured_pipeline = QuadPipeline::new(
            device,
            gpu.surface_format,
            PipelineVariant::Textured,
            &camera_bgl,
            textures.bind_group_layout(),
        );
        let solid_pipeline = QuadPipeline::new(
            device,
            gpu.surface_format,
            PipelineVariant::Solid,
            &camera_bgl,
            textures.bind_group_layout(),
        );

        // ── Static quad geometry ────────────────────────────────
        let (vertices, indices) = GeometryTable::unit_quad();
        let vertex_buffer = device.create_buffer(&BufferDescriptor {
            label: Some("quad_vb"),
            size: std::mem::size_of::<[Vertex; 4]>() as u64,
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let index_buffer = device.create_buffer(&BufferDescriptor {
            label: Some("quad_ib"),
            size: std::mem::size_of::<[u16; 6]>() as u64,
            usage: BufferUsages::INDEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        gpu.queue.write_buffer(&vertex_buffer, 0, bytemuck::cast_slice(&vertices));
        gpu.queue.write_buffer(&index_buffer, 0, bytemuck::cast_slice(&indices));

        // ── Instance buffers ────────────────────────────────────
        let batcher = Batcher::new(config);
        let textured_instances =
            GpuInstanceBuffer::new(device, PipelineVariant::Textured, config.initial_capacity);
        let solid_instances =
            GpuInstanceBuffer::new(device, PipelineVariant::Solid, config.initial_capacity);

        // ── Camera uniform ──────────────────────────────────────
        let camera_buffer = device.create_buffer(&BufferDescriptor {
            label: Some("camera_ub"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let camera_bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("camera_bg"),
            layout: &camera_bgl,
            entries: &[BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        Self {
            textured_pipeline,
            solid_pipeline,
            textures,
            vertex_buffer,
            index_buffer,
            batcher,
            textured_instances,
            solid_instances,
            camera: CameraUniformWriter::new(),
            camera_buffer,
            camera_bind_group,
            clear_color: Color {
                r: 0.1,
                g: 0.1,
                b: 0.2,
                a: 1.0,
            },
        }
    }

    /// Set the background clear color.
    pub fn set_clear_color(&mut self, r: f64, g: f64, b: f64, a: f64) {
        self.clear_color = Color { r, g, b, a };
    }

    // ───────────────────── Textures ───────────────────────────────

    /// Upload an RGBA8 texture and return its handle.
    pub fn create_texture_rgba(
        &mut self,
        gpu: &GpuContext,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<TextureHandle, RenderError> {
        Ok(self
            .textures
            .create_rgba(&gpu.device, &gpu.queue, width, height, pixels)?)
    }

    /// The built-in white texture used by [`Renderer::draw_quad`].
    pub fn white_texture(&self) -> TextureHandle {
        self.textures.white()
    }

    pub fn textures(&self) -> &TextureStore {
        &self.textures
    }

    // ───────────────────── Frame building ─────────────────────────

    /// Start a frame with the given view-projection matrix.
    pub fn begin(&mut self, view_proj: Mat4) -> Result<FrameId, RenderError> {
        let frame = self.batcher.begin_frame()?;
        self.camera.update(view_proj);
        Ok(frame)
    }

    /// A colored quad (white texture).
    pub fn draw_quad(&mut self, quad: &Quad) -> Result<(), RenderError> {
        self.draw_quad_textured(quad, self.textures.white(), AtlasRegion::FULL)
    }

    /// A quad sampling `region` of `texture`, tinted by the quad's color.
    pub fn draw_quad_textured(
        &mut self,
        quad: &Quad,
        texture: TextureHandle,
        region: AtlasRegion,
    ) -> Result<(), RenderError> {
        let instance = quad.instance().with_region(region);
        self.submit(QuadRequest::textured(texture, instance))
    }

    /// A debug quad through the solid pipeline; `clip_transform` maps the
    /// unit quad directly to clip space.
    pub fn draw_solid(&mut self, clip_transform: Mat4) -> Result<(), RenderError> {
        self.submit(QuadRequest::solid(clip_transform))
    }

    pub fn submit(&mut self, request: QuadRequest) -> Result<(), RenderError> {
        Ok(self.batcher.submit(request)?)
    }

    /// Drop the frame being built.
    pub fn discard(&mut self) {
        self.batcher.discard_frame();
    }

    // ───────────────────── Submission ─────────────────────────────

    /// Render to the window surface.  Returns frame statistics.
    pub fn render_to_surface(&mut self, gpu: &GpuContext) -> Result<FrameStats, RenderError> {
        let surface = gpu.surface.as_ref().ok_or(RenderError::NoSurface)?;
        let output = match surface.get_current_texture() {
            Ok(output) => output,
            Err(e) => {
                self.batcher.discard_frame();
                return Err(e.into());
            }
        };
        let view = output.texture.create_view(&TextureViewDescriptor::default());

        let stats = self.render_frame(gpu, &view, "quadforge_frame_encoder")?;
        output.present();
        Ok(stats)
    }

    /// Render to an off-screen texture (headless mode).
    pub fn render_to_texture(
        &mut self,
        gpu: &GpuContext,
        target_view: &TextureView,
    ) -> Result<FrameStats, RenderError> {
        self.render_frame(gpu, target_view, "quadforge_offscreen_encoder")
    }

    fn render_frame(
        &mut self,
        gpu: &GpuContext,
        target: &TextureView,
        label: &str,
    ) -> Result<FrameStats, RenderError> {
        let list = self.prepare(gpu)?;

        let mut encoder = gpu
            .device
            .create_command_encoder(&CommandEncoderDescriptor { label: Some(label) });
        self.record_pass(&mut encoder, target, &list);
        gpu.queue.submit(std::iter::once(encoder.finish()));

        // write_buffer already copied the instance bytes into wgpu's
        // staging memory, so the slot can be reused.
        self.acknowledge(list.frame());

        Ok(FrameStats::from_list(&list))
    }

    /// Close the frame and make its data GPU-visible: resynchronise grown
    /// instance buffers, upload instances, and flush the camera uniform.
    ///
    /// For callers recording into their own pass with [`Renderer::draw`].
    /// The frame's slot stays reserved until [`Renderer::acknowledge`] is
    /// called after the `queue.submit` that consumes it.
    pub fn prepare(&mut self, gpu: &GpuContext) -> Result<FrameRenderList, RenderError> {
        let list = self.batcher.finish(&self.textures)?;

        let resync = self.batcher.take_resync(PipelineVariant::Textured);
        self.textured_instances.sync(
            &gpu.device,
            &gpu.queue,
            self.batcher.instance_bytes(PipelineVariant::Textured),
            resync,
        );
        let resync = self.batcher.take_resync(PipelineVariant::Solid);
        self.solid_instances.sync(
            &gpu.device,
            &gpu.queue,
            self.batcher.instance_bytes(PipelineVariant::Solid),
            resync,
        );

        if self.camera.take_dirty() {
            gpu.queue.write_buffer(&self.camera_buffer, 0, self.camera.as_bytes());
        }
        Ok(list)
    }

    fn record_pass(&self, encoder: &mut CommandEncoder, target: &TextureView, list: &FrameRenderList) {
        let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("quadforge_render_pass"),
            color_attachments: &[Some(RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: Operations {
                    load: LoadOp::Clear(self.clear_color),
                    store: StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        self.draw(&mut pass, list);
    }

    /// Record one `draw_indexed` per batch, in list order.  Pipeline and
    /// texture bindings are only changed when they differ from the
    /// previous batch.
    pub fn draw<'a>(&'a self, pass: &mut RenderPass<'a>, list: &FrameRenderList) {
        if list.is_empty() {
            return;
        }

        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), IndexFormat::Uint16);

        let mut bound_variant = None;
        let mut bound_texture = None;
        for batch in list {
            if bound_variant != Some(batch.variant) {
                let (pipeline, instances) = match batch.variant {
                    PipelineVariant::Textured => (&self.textured_pipeline, &self.textured_instances),
                    PipelineVariant::Solid => (&self.solid_pipeline, &self.solid_instances),
                };
                pass.set_pipeline(pipeline.pipeline());
                pass.set_vertex_buffer(1, instances.buffer.slice(..));
                if batch.variant == PipelineVariant::Textured {
                    pass.set_bind_group(0, &self.camera_bind_group, &[]);
                }
                bound_variant = Some(batch.variant);
                bound_texture = None;
            }

            if let Some(handle) = batch.texture {
                if bound_texture != Some(handle) {
                    let Some(texture) = self.textures.get(handle) else {
                        warn!(
                            "{}: skipping {} quads, {handle:?} has no GPU texture",
                            list.frame(),
                            batch.instance_count
                        );
                        continue;
                    };
                    pass.set_bind_group(1, &texture.bind_group, &[]);
                    bound_texture = Some(handle);
                }
            }

            pass.draw_indexed(0..GeometryTable::INDEX_COUNT, 0, batch.instance_range());
        }
    }

    /// Release the slot of a frame returned by [`Renderer::prepare`].
    /// Returns `false` if `frame` is not in flight.
    pub fn acknowledge(&mut self, frame: FrameId) -> bool {
        self.batcher.acknowledge(frame)
    }

    pub fn batcher(&self) -> &Batcher {
        &self.batcher
    }

    pub fn camera(&self) -> &CameraUniformWriter {
        &self.camera
    }
}

// ===================================================================
// Tests
// ===================================================================
