//! Frame batcher — turns an unordered stream of quad requests into the
//! minimal ordered list of instanced draw calls.
//!
//! ```text
//!  begin_frame()          ◀─── picks a free frame slot, resets its buffers
//!       │
//!  submit(request) × N    ◀─── one request = one quad
//!       │
//!  finish(&textures)      ◀─── validate → stable sort → pack → DrawBatch runs
//!       │
//!       ▼
//!  FrameRenderList  +  textured_instances() / solid_instances()
//!       │
//!  acknowledge(frame)     ◀─── submission layer is done with the slot
//! ```
//!
//! Requests are ordered by `(layer, variant, texture)`.  The sort is stable,
//! so quads with the same key are drawn in submission order (painter's
//! algorithm within a batch).  Quads with different keys on the same layer
//! have no mutual order beyond batch order.

use log::{debug, warn};
use thiserror::Error;

use crate::atlas::InvalidRegionError;
use crate::frame::{DrawBatch, FrameId, FrameRenderList};
use crate::instance_buffer::{CapacityError, InstanceBuffer};
use crate::textures::{TextureHandle, TextureRegistry};
use crate::vertex::{PipelineVariant, QuadInstance, SolidInstanceRaw, TexturedInstanceRaw};

/// Records each instance buffer is allocated with before any growth.
pub const DEFAULT_INITIAL_CAPACITY: usize = 1_024;

/// Hard cap on instances per variant per frame.
pub const DEFAULT_MAX_INSTANCES: usize = 100_000;

/// Instance offsets and counts are `u32` on the draw side.
pub const MAX_ADDRESSABLE_INSTANCES: usize = u32::MAX as usize;

/// Frames whose instance data may be owned by the GPU layer at once.
pub const DEFAULT_FRAMES_IN_FLIGHT: usize = 2;

// ───────────────────────────────────────────────────────────────────
// Configuration
// ───────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatcherConfig {
    pub initial_capacity: usize,
    pub max_instances: usize,
    pub frames_in_flight: usize,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_instances: DEFAULT_MAX_INSTANCES,
            frames_in_flight: DEFAULT_FRAMES_IN_FLIGHT,
        }
    }
}

impl BatcherConfig {
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Clamped to [`MAX_ADDRESSABLE_INSTANCES`].
    pub fn with_max_instances(mut self, max: usize) -> Self {
        self.max_instances = max.min(MAX_ADDRESSABLE_INSTANCES);
        self
    }

    /// Clamped to at least 1.
    pub fn with_frames_in_flight(mut self, frames: usize) -> Self {
        self.frames_in_flight = frames.max(1);
        self
    }
}

// ───────────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Request {request} references unregistered texture {texture:?}")]
pub struct UnknownTextureError {
    /// Submission index within the frame.
    pub request: usize,
    pub texture: TextureHandle,
}

/// A per-request problem that was recovered from locally.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// The request was dropped from the frame.
    #[error("Dropped: {0}")]
    UnknownTexture(UnknownTextureError),
    /// The request's atlas region was clamped into the atlas.
    #[error("Request {request} clamped: {error}")]
    InvalidRegion {
        request: usize,
        error: InvalidRegionError,
    },
}

impl Diagnostic {
    /// Submission index of the offending request.
    pub fn request(&self) -> usize {
        match self {
            Diagnostic::UnknownTexture(e) => e.request,
            Diagnostic::InvalidRegion { request, .. } => *request,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("Frame aborted: {0}")]
    Capacity(#[from] CapacityError),
    #[error("No frame in progress")]
    NoFrame,
    #[error("Frame slot still owned by {0}")]
    SlotInFlight(FrameId),
}

// ───────────────────────────────────────────────────────────────────
// Requests
// ───────────────────────────────────────────────────────────────────

/// One quad to draw this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadRequest {
    variant: PipelineVariant,
    texture: Option<TextureHandle>,
    instance: QuadInstance,
    layer: i32,
}

impl QuadRequest {
    /// A quad sampled from `texture` through the textured pipeline.
    pub fn textured(texture: TextureHandle, instance: QuadInstance) -> Self {
        Self {
            variant: PipelineVariant::Textured,
            texture: Some(texture),
            instance,
            layer: 0,
        }
    }

    /// A fixed-color debug quad through the solid pipeline.  Only the
    /// transform is used; it maps straight to clip space.
    pub fn solid(transform: glam::Mat4) -> Self {
        Self {
            variant: PipelineVariant::Solid,
            texture: None,
            instance: QuadInstance::new(transform),
            layer: 0,
        }
    }

    /// Lower layers are drawn first.  Default 0.
    pub fn with_layer(mut self, layer: i32) -> Self {
        self.layer = layer;
        self
    }

    pub fn variant(&self) -> PipelineVariant {
        self.variant
    }

    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    pub fn instance(&self) -> &QuadInstance {
        &self.instance
    }

    pub fn layer(&self) -> i32 {
        self.layer
    }

    fn sort_key(&self) -> (i32, PipelineVariant, Option<TextureHandle>) {
        (self.layer, self.variant, self.texture)
    }
}

// ───────────────────────────────────────────────────────────────────
// Batcher
// ───────────────────────────────────────────────────────────────────

/// Instance storage reserved for one frame until it is acknowledged.
struct FrameSlot {
    textured: InstanceBuffer<TexturedInstanceRaw>,
    solid: InstanceBuffer<SolidInstanceRaw>,
    in_flight: Option<FrameId>,
}

impl FrameSlot {
    fn new(config: &BatcherConfig) -> Self {
        Self {
            textured: InstanceBuffer::new(config.initial_capacity, config.max_instances),
            solid: InstanceBuffer::new(config.initial_capacity, config.max_instances),
            in_flight: None,
        }
    }

    fn reset(&mut self) {
        self.textured.reset();
        self.solid.reset();
    }
}

#[derive(Clone, Copy, Debug)]
struct OpenFrame {
    id: FrameId,
    slot: usize,
}

/// Groups per-frame quad requests into draw batches and packs their
/// instance records.
///
/// Driven from a single thread: packing order decides draw order.
pub struct Batcher {
    config: BatcherConfig,
    slots: Vec<FrameSlot>,
    /// Slot of the most recently begun frame; its buffers are what
    /// `textured_instances()` / `solid_instances()` expose.
    current_slot: usize,
    open: Option<OpenFrame>,
    next_frame: u64,
    requests: Vec<QuadRequest>,
    /// Scratch: indices of accepted requests, sorted each frame.
    order: Vec<usize>,
}

impl Default for Batcher {
    fn default() -> Self {
        Self::new(BatcherConfig::default())
    }
}

impl Batcher {
    pub fn new(config: BatcherConfig) -> Self {
        let config = config
            .with_frames_in_flight(config.frames_in_flight)
            .with_max_instances(config.max_instances);
        let slots = (0..config.frames_in_flight)
            .map(|_| FrameSlot::new(&config))
            .collect();
        Self {
            config,
            slots,
            current_slot: 0,
            open: None,
            next_frame: 0,
            requests: Vec::new(),
            order: Vec::new(),
        }
    }

    pub fn config(&self) -> &BatcherConfig {
        &self.config
    }

    /// Start a frame.  An unfinished previous frame is discarded.
    ///
    /// Fails with [`BatchError::SlotInFlight`] when the next slot still
    /// holds a frame the submission layer has not acknowledged.
    pub fn begin_frame(&mut self) -> Result<FrameId, BatchError> {
        self.discard_frame();

        let slot = (self.next_frame % self.slots.len() as u64) as usize;
        if let Some(busy) = self.slots[slot].in_flight {
            return Err(BatchError::SlotInFlight(busy));
        }

        let id = FrameId(self.next_frame);
        self.next_frame += 1;
        self.slots[slot].reset();
        self.current_slot = slot;
        self.open = Some(OpenFrame { id, slot });
        Ok(id)
    }

    /// Queue one quad for the open frame.
    pub fn submit(&mut self, request: QuadRequest) -> Result<(), BatchError> {
        if self.open.is_none() {
            return Err(BatchError::NoFrame);
        }
        self.requests.push(request);
        Ok(())
    }

    /// Requests queued in the open frame.
    pub fn pending(&self) -> usize {
        self.requests.len()
    }

    pub fn is_frame_open(&self) -> bool {
        self.open.is_some()
    }

    /// Drop the open frame, if any.  Nothing it queued becomes visible.
    pub fn discard_frame(&mut self) {
        if let Some(open) = self.open.take() {
            debug!("Discarding unfinished {}", open.id);
            self.slots[open.slot].reset();
        }
        self.requests.clear();
    }

    /// Close the open frame: validate, sort, and pack every request.
    ///
    /// Unknown textures drop their request and invalid atlas regions are
    /// clamped; both are reported on the returned list.  Only running out
    /// of instance capacity aborts the frame.
    pub fn finish<R: TextureRegistry + ?Sized>(&mut self, textures: &R) -> Result<FrameRenderList, BatchError> {
        let open = self.open.take().ok_or(BatchError::NoFrame)?;

        let mut diagnostics = Vec::new();
        self.order.clear();
        let (mut textured_total, mut solid_total) = (0usize, 0usize);

        for (index, request) in self.requests.iter_mut().enumerate() {
            match (request.variant, request.texture) {
                (PipelineVariant::Textured, Some(texture)) => {
                    if !textures.contains(texture) {
                        let error = UnknownTextureError {
                            request: index,
                            texture,
                        };
                        warn!("{}: {error}, dropping quad", open.id);
                        diagnostics.push(Diagnostic::UnknownTexture(error));
                        continue;
                    }
                    if let Err(error) = request.instance.region.validate() {
                        warn!("{}: request {index}: {error}, clamping", open.id);
                        request.instance.region = request.instance.region.clamped();
                        diagnostics.push(Diagnostic::InvalidRegion {
                            request: index,
                            error,
                        });
                    }
                    textured_total += 1;
                }
                _ => solid_total += 1,
            }
            self.order.push(index);
        }

        let requests = &self.requests;
        self.order.sort_by_key(|&i| requests[i].sort_key());

        let slot = &mut self.slots[open.slot];
        let packed = Self::pack(slot, requests, &self.order, textured_total, solid_total);
        self.requests.clear();

        let batches = match packed {
            Ok(batches) => batches,
            Err(error) => {
                warn!("{}: {error}", open.id);
                slot.reset();
                return Err(error.into());
            }
        };

        slot.in_flight = Some(open.id);
        debug!(
            "{}: {} quads in {} batches ({} diagnostics)",
            open.id,
            textured_total + solid_total,
            batches.len(),
            diagnostics.len()
        );
        Ok(FrameRenderList::new(open.id, batches, diagnostics))
    }

    fn pack(
        slot: &mut FrameSlot,
        requests: &[QuadRequest],
        order: &[usize],
        textured_total: usize,
        solid_total: usize,
    ) -> Result<Vec<DrawBatch>, CapacityError> {
        slot.textured.reserve(textured_total)?;
        slot.solid.reserve(solid_total)?;

        let mut batches: Vec<DrawBatch> = Vec::new();
        for &index in order {
            let request = &requests[index];
            let offset = match request.variant {
                PipelineVariant::Textured => slot.textured.push(request.instance.to_textured())?,
                PipelineVariant::Solid => slot.solid.push(request.instance.to_solid())?,
            };

            match batches.last_mut() {
                Some(batch) if batch.variant == request.variant && batch.texture == request.texture => {
                    batch.instance_count += 1;
                }
                _ => batches.push(DrawBatch {
                    texture: request.texture,
                    variant: request.variant,
                    instance_offset: offset as u32,
                    instance_count: 1,
                }),
            }
        }
        Ok(batches)
    }

    /// Release the slot holding `frame` once its data has been consumed.
    /// Returns `false` for frames that are not in flight.
    pub fn acknowledge(&mut self, frame: FrameId) -> bool {
        match self.slots.iter_mut().find(|s| s.in_flight == Some(frame)) {
            Some(slot) => {
                slot.in_flight = None;
                true
            }
            None => false,
        }
    }

    /// Frames finished but not yet acknowledged.
    pub fn frames_in_flight(&self) -> usize {
        self.slots.iter().filter(|s| s.in_flight.is_some()).count()
    }

    /// Textured records of the current frame, for upload.
    pub fn textured_instances(&self) -> &InstanceBuffer<TexturedInstanceRaw> {
        &self.slots[self.current_slot].textured
    }

    /// Solid records of the current frame, for upload.
    pub fn solid_instances(&self) -> &InstanceBuffer<SolidInstanceRaw> {
        &self.slots[self.current_slot].solid
    }

    /// Pending GPU-buffer resync for `variant` in the current slot.
    pub fn take_resync(&mut self, variant: PipelineVariant) -> Option<usize> {
        let slot = &mut self.slots[self.current_slot];
        match variant {
            PipelineVariant::Textured => slot.textured.take_resync(),
            PipelineVariant::Solid => slot.solid.take_resync(),
        }
    }

    /// Packed bytes of `variant` in the current slot.
    pub fn instance_bytes(&self, variant: PipelineVariant) -> &[u8] {
        match variant {
            PipelineVariant::Textured => self.textured_instances().as_bytes(),
            PipelineVariant::Solid => self.solid_instances().as_bytes(),
        }
    }
}

// ===================================================================
// Tests
// ===================================================================
