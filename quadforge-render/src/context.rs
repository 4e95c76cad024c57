//! GPU context — device, queue, and the optional window surface.
//!
//! Headless contexts ([`GpuContext::new_headless`]) back the tests, the
//! benchmarks, and off-screen rendering into [`GpuContext::create_render_target`]
//! views.  Windowed contexts ([`GpuContext::new_with_surface`]) are what
//! `quadforge-desktop` draws into.

use log::info;
use thiserror::Error;
use wgpu::{
    Adapter, CompositeAlphaMode, Device, DeviceDescriptor, Extent3d, Instance,
    InstanceDescriptor, PowerPreference, PresentMode, Queue, RequestAdapterOptions, Surface,
    SurfaceCapabilities, SurfaceConfiguration, TextureDescriptor, TextureDimension,
    TextureFormat, TextureUsages, TextureView, TextureViewDescriptor,
};

/// Format used when no surface dictates one.
pub const HEADLESS_FORMAT: TextureFormat = TextureFormat::Bgra8UnormSrgb;

#[derive(Error, Debug)]
pub enum GpuError {
    #[error("No suitable GPU adapter found")]
    NoAdapter,
    #[error("Failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("Failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("Surface supports no texture formats on this adapter")]
    NoSurfaceFormat,
}

/// Presentation settings for a windowed context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceOptions {
    pub present_mode: PresentMode,
    /// Frames the presentation engine may queue.  Matches the batcher's
    /// default frames in flight.
    pub frame_latency: u32,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            present_mode: PresentMode::Fifo, // VSync
            frame_latency: 2,
        }
    }
}

/// Prefer an sRGB format so straight-alpha colors blend as authored.
pub fn choose_surface_format(caps: &SurfaceCapabilities) -> Option<TextureFormat> {
    caps.formats
        .iter()
        .find(|f| f.is_srgb())
        .or_else(|| caps.formats.first())
        .copied()
}

pub struct GpuContext {
    pub device: Device,
    pub queue: Queue,
    pub adapter: Adapter,
    /// Present only when rendering to a window.
    pub surface: Option<Surface<'static>>,
    pub surface_config: Option<SurfaceConfiguration>,
    /// Color target format every pipeline is built for.
    pub surface_format: TextureFormat,
}

async fn open_device(
    instance: &Instance,
    surface: Option<&Surface<'_>>,
    label: &'static str,
) -> Result<(Adapter, Device, Queue), GpuError> {
    let adapter = instance
        .request_adapter(&RequestAdapterOptions {
            power_preference: PowerPreference::HighPerformance,
            compatible_surface: surface,
            force_fallback_adapter: false,
        })
        .await
        .ok_or(GpuError::NoAdapter)?;

    let (device, queue) = adapter
        .request_device(
            &DeviceDescriptor {
                label: Some(label),
                ..Default::default()
            },
            None,
        )
        .await?;
    Ok((adapter, device, queue))
}

impl GpuContext {
    /// Create a headless context (no window, no surface).
    pub async fn new_headless() -> Result<Self, GpuError> {
        let instance = Instance::new(&InstanceDescriptor::default());
        let (adapter, device, queue) = open_device(&instance, None, "quadforge-headless").await?;
        info!("Headless GPU context on {}", adapter.get_info().name);

        Ok(Self {
            device,
            queue,
            adapter,
            surface: None,
            surface_config: None,
            surface_format: HEADLESS_FORMAT,
        })
    }

    /// Create a context presenting to `window`.  The window handles must
    /// stay valid for the lifetime of the context.
    pub async fn new_with_surface<W>(
        window: W,
        width: u32,
        height: u32,
        options: SurfaceOptions,
    ) -> Result<Self, GpuError>
    where
        W: wgpu::WasmNotSendSync + Into<wgpu::SurfaceTarget<'static>>,
    {
        let instance = Instance::new(&InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;
        let (adapter, device, queue) =
            open_device(&instance, Some(&surface), "quadforge-windowed").await?;

        let caps = surface.get_capabilities(&adapter);
        let format = choose_surface_format(&caps).ok_or(GpuError::NoSurfaceFormat)?;
        let config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: options.present_mode,
            desired_maximum_frame_latency: options.frame_latency,
            alpha_mode: caps.alpha_modes.first().copied().unwrap_or(CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        info!(
            "GPU context on {} ({format:?}, {}×{}, {:?})",
            adapter.get_info().name,
            config.width,
            config.height,
            options.present_mode
        );

        Ok(Self {
            device,
            queue,
            adapter,
            surface: Some(surface),
            surface_config: Some(config),
            surface_format: format,
        })
    }

    /// Reconfigure the surface.  Ignored when headless or minimised.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let (Some(surface), Some(config)) = (&self.surface, &mut self.surface_config) else {
            return;
        };
        config.width = width;
        config.height = height;
        surface.configure(&self.device, config);
    }

    /// Current surface dimensions, or `(0, 0)` if headless.
    pub fn surface_size(&self) -> (u32, u32) {
        self.surface_config
            .as_ref()
            .map_or((0, 0), |c| (c.width, c.height))
    }

    /// An off-screen color target in [`Self::surface_format`], for
    /// `Renderer::render_to_texture`.
    pub fn create_render_target(&self, width: u32, height: u32) -> TextureView {
        self.device
            .create_texture(&TextureDescriptor {
                label: Some("quadforge_render_target"),
                size: Extent3d {
                    width: width.max(1),
                    height: height.max(1),
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: TextureDimension::D2,
                format: self.surface_format,
                usage: TextureUsages::RENDER_ATTACHMENT | TextureUsages::COPY_SRC,
                view_formats: &[],
            })
            .create_view(&TextureViewDescriptor::default())
    }
}
