//! QuadForge Desktop — a sprite grid drawn through the quad batcher.
//!
//! Controls: middle/right drag pans, the wheel zooms, Space pauses the
//! spin, `D` toggles the solid debug marker, Escape quits.

mod state;

use std::sync::Arc;
use std::time::Instant;

use log::{error, info};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalPosition};
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowAttributes, WindowId};

use quadforge_render::context::{GpuContext, SurfaceOptions};
use quadforge_render::renderer::RenderError;
use state::AppState;

/// Frames between stats log lines.
const STATS_INTERVAL: u64 = 300;

/// Pixels of trackpad scroll per wheel notch.
const PIXELS_PER_LINE: f32 = 50.0;

/// Pointer state carried between cursor events.
#[derive(Debug, Default)]
struct Pointer {
    position: (f64, f64),
    dragging: bool,
}

struct App {
    window: Option<Arc<Window>>,
    state: Option<AppState>,
    pointer: Pointer,
    last_frame: Instant,
    frames: u64,
}

impl App {
    fn new() -> Self {
        Self {
            window: None,
            state: None,
            pointer: Pointer::default(),
            last_frame: Instant::now(),
            frames: 0,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), String> {
        let attrs = WindowAttributes::default()
            .with_title("QuadForge")
            .with_inner_size(LogicalSize::new(1280, 800))
            .with_min_inner_size(LogicalSize::new(320, 240));
        let window = Arc::new(event_loop.create_window(attrs).map_err(|e| e.to_string())?);

        let size = window.inner_size();
        let (width, height) = (size.width.max(1), size.height.max(1));
        let gpu = pollster::block_on(GpuContext::new_with_surface(
            window.clone(),
            width,
            height,
            SurfaceOptions::default(),
        ))
        .map_err(|e| e.to_string())?;
        let state = AppState::new(gpu, width, height).map_err(|e| e.to_string())?;

        info!("QuadForge ready on {:?}", state.gpu.adapter.get_info().name);
        window.request_redraw();
        self.window = Some(window);
        self.state = Some(state);
        self.last_frame = Instant::now();
        Ok(())
    }

    fn on_key(state: &mut AppState, event: KeyEvent, event_loop: &ActiveEventLoop) {
        if event.state != ElementState::Pressed {
            return;
        }
        match event.logical_key {
            Key::Named(NamedKey::Escape) => event_loop.exit(),
            Key::Named(NamedKey::Space) => {
                state.paused = !state.paused;
                info!("Animation {}", if state.paused { "paused" } else { "resumed" });
            }
            Key::Character(c) if c.eq_ignore_ascii_case("d") => {
                state.scene.show_debug = !state.scene.show_debug;
            }
            _ => {}
        }
    }

    fn redraw(&mut self, window: &Window) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        match state.render_frame(dt) {
            Ok(stats) => {
                self.frames += 1;
                if self.frames % STATS_INTERVAL == 0 {
                    info!(
                        "Frame {}: {} quads in {} draw call(s), {} diagnostic(s)",
                        self.frames, stats.quad_count, stats.draw_calls, stats.diagnostics
                    );
                }
            }
            Err(RenderError::Surface(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                let size = window.inner_size();
                state.resize(size.width, size.height);
            }
            Err(e) => error!("Render error: {e}"),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            error!("Startup failed: {e}");
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.clone() else {
            return;
        };
        let Some(state) = self.state.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                info!("Closing after {} frames", self.frames);
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => Self::on_key(state, event, event_loop),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::CursorMoved {
                position: PhysicalPosition { x, y },
                ..
            } => {
                let (px, py) = self.pointer.position;
                if self.pointer.dragging {
                    state.pan((x - px) as f32, (y - py) as f32);
                } else {
                    state.update_hover(x as f32, y as f32);
                }
                self.pointer.position = (x, y);
            }
            WindowEvent::MouseInput { state: button_state, button, .. } => {
                if matches!(button, MouseButton::Middle | MouseButton::Right) {
                    self.pointer.dragging = button_state == ElementState::Pressed;
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let notches = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_LINE,
                };
                let (px, py) = self.pointer.position;
                state.zoom_at(px as f32, py as f32, notches);
            }
            WindowEvent::RedrawRequested => {
                self.redraw(&window);
                // Continuous redraw drives the animation.
                window.request_redraw();
            }
            _ => {}
        }
    }
}

fn main() {
    env_logger::init();

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            error!("Failed to create event loop: {e}");
            return;
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new();
    if let Err(e) = event_loop.run_app(&mut app) {
        error!("Event loop error: {e}");
    }
}
