//! Texture handles and the GPU texture store.
//!
//! The batcher only needs to know whether a handle is registered
//! ([`TextureRegistry`]); the store additionally owns each texture's
//! group-1 bind group (texture at binding 0, sampler at binding 1).

use std::collections::HashSet;

use log::info;
use thiserror::Error;
use wgpu::{
    AddressMode, BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout,
    BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingResource, BindingType, Device,
    Extent3d, FilterMode, Queue, Sampler, SamplerBindingType, SamplerDescriptor, ShaderStages,
    Texture, TextureDescriptor, TextureDimension, TextureFormat, TextureSampleType,
    TextureUsages, TextureViewDimension,
};

/// Opaque identifier of a registered texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub(crate) u32);

impl TextureHandle {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn id(self) -> u32 {
        self.0
    }
}

/// Lookup used by the batcher to reject unregistered handles.
pub trait TextureRegistry {
    fn contains(&self, handle: TextureHandle) -> bool;
}

impl TextureRegistry for HashSet<TextureHandle> {
    fn contains(&self, handle: TextureHandle) -> bool {
        HashSet::contains(self, &handle)
    }
}

#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Texture dimensions must be non-zero, got {width}×{height}")]
    EmptySize { width: u32, height: u32 },
    #[error("Expected {expected} bytes of RGBA data, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}

/// One uploaded texture and its bind group.
pub struct GpuTexture {
    pub texture: Texture,
    pub bind_group: BindGroup,
    pub width: u32,
    pub height: u32,
}

/// Owns every texture the renderer can bind.
///
/// Handles are indices into the store and are never recycled.  Slot 0 is
/// a 1×1 white texture so colored quads can share the textured pipeline.
pub struct TextureStore {
    layout: BindGroupLayout,
    sampler: Sampler,
    textures: Vec<GpuTexture>,
    white: TextureHandle,
}

impl TextureStore {
    pub fn new(device: &Device, queue: &Queue) -> Self {
        let layout = Self::create_bind_group_layout(device);
        let sampler = device.create_sampler(&SamplerDescriptor {
            label: Some("quad_texture_sampler"),
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            mag_filter: FilterMode::Nearest,
            min_filter: FilterMode::Linear,
            ..Default::default()
        });

        let mut store = Self {
            layout,
            sampler,
            textures: Vec::new(),
            white: TextureHandle(0),
        };
        store.white = store.upload(device, queue, 1, 1, &[255, 255, 255, 255]);
        store
    }

    /// Group-1 layout: texture (binding 0) + filtering sampler (binding 1).
    pub fn create_bind_group_layout(device: &Device) -> BindGroupLayout {
        device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("quad_texture_bgl"),
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: TextureSampleType::Float { filterable: true },
                        view_dimension: TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        })
    }

    pub fn bind_group_layout(&self) -> &BindGroupLayout {
        &self.layout
    }

    /// Upload tightly packed RGBA8 pixels and register the texture.
    pub fn create_rgba(
        &mut self,
        device: &Device,
        queue: &Queue,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<TextureHandle, TextureError> {
        if width == 0 || height == 0 {
            return Err(TextureError::EmptySize { width, height });
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(TextureError::SizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(self.upload(device, queue, width, height, pixels))
    }

    fn upload(&mut self, device: &Device, queue: &Queue, width: u32, height: u32, pixels: &[u8]) -> TextureHandle {
        let size = Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&TextureDescriptor {
            label: Some("quad_texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TextureFormat::Rgba8UnormSrgb,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("quad_texture_bg"),
            layout: &self.layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: BindingResource::TextureView(&view),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let handle = TextureHandle(self.textures.len() as u32);
        info!("Registered texture {} ({width}×{height})", handle.0);
        self.textures.push(GpuTexture {
            texture,
            bind_group,
            width,
            height,
        });
        handle
    }

    pub fn get(&self, handle: TextureHandle) -> Option<&GpuTexture> {
        self.textures.get(handle.0 as usize)
    }

    /// The built-in 1×1 white texture.
    pub fn white(&self) -> TextureHandle {
        self.white
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

impl TextureRegistry for TextureStore {
    fn contains(&self, handle: TextureHandle) -> bool {
        (handle.0 as usize) < self.textures.len()
    }
}

// ===================================================================
// Tests
// ===================================================================
