//! Application state — owns the GPU context, renderer, camera, and the
//! demo scene fed through the batcher every frame.
//!
//! The scene itself ([`DemoScene`]) is pure data so it can be built and
//! inspected without a GPU.

use glam::{Mat4, Vec2, Vec3};
use log::info;
use quadforge_render::context::GpuContext;
use quadforge_render::renderer::{FrameStats, RenderError, Renderer};
use quadforge_render::{
    AtlasRegion, BatcherConfig, Camera2D, Quad, QuadRequest, SpriteSheet, TextureHandle,
};

// ── Atlas layout ────────────────────────────────────────────────────
/// Sprite cell edge in pixels.
const CELL_SIZE: u32 = 32;
/// Cells across the generated atlas.
const ATLAS_CELLS: u32 = 4;

// ── Scene tuning ────────────────────────────────────────────────────
const GRID_COLUMNS: usize = 24;
const GRID_ROWS: usize = 16;
const SPRITE_SIZE: f32 = 36.0;
const SPRITE_SPACING: f32 = 48.0;
const GRID_ORIGIN: Vec2 = Vec2::new(40.0, 40.0);
/// Degrees per second.
const SPIN_SPEED: f32 = 45.0;

const PANEL_COLOR: [f32; 4] = [0.12, 0.12, 0.16, 1.0];
const HIGHLIGHT_COLOR: [f32; 4] = [0.26, 0.52, 0.96, 0.35];

/// Layers, drawn lowest first.
const LAYER_BACKGROUND: i32 = 0;
const LAYER_SPRITES: i32 = 1;
const LAYER_OVERLAY: i32 = 2;

/// Generate an RGBA8 atlas of `ATLAS_CELLS` square cells in a row, each a
/// two-tone checkerboard in its own hue.
pub fn generate_atlas() -> (u32, u32, Vec<u8>) {
    let width = CELL_SIZE * ATLAS_CELLS;
    let height = CELL_SIZE;
    let palette: [[u8; 3]; ATLAS_CELLS as usize] = [
        [230, 80, 80],
        [80, 200, 120],
        [90, 140, 240],
        [240, 200, 70],
    ];

    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let [r, g, b] = palette[(x / CELL_SIZE) as usize];
            let light = ((x / 8) + (y / 8)) % 2 == 0;
            let shade = |c: u8| if light { c } else { c / 2 };
            pixels.extend_from_slice(&[shade(r), shade(g), shade(b), 255]);
        }
    }
    (width, height, pixels)
}

/// One animated sprite of the demo grid.
#[derive(Debug, Clone)]
pub struct SceneSprite {
    pub quad: Quad,
    pub region: AtlasRegion,
    /// Spin direction and rate multiplier.
    pub spin: f32,
}

/// Everything drawn by the demo, in world coordinates.
#[derive(Debug, Clone)]
pub struct DemoScene {
    pub background: Quad,
    pub sprites: Vec<SceneSprite>,
    /// Sprite index under the cursor, if any.
    pub hovered: Option<usize>,
    /// Draw the solid-pipeline marker in the clip-space corner.
    pub show_debug: bool,
}

impl DemoScene {
    pub fn new(sheet: &SpriteSheet) -> Self {
        let mut sprites = Vec::with_capacity(GRID_COLUMNS * GRID_ROWS);
        for row in 0..GRID_ROWS {
            for col in 0..GRID_COLUMNS {
                let index = row * GRID_COLUMNS + col;
                let position = GRID_ORIGIN
                    + Vec2::new(col as f32, row as f32) * SPRITE_SPACING
                    + Vec2::splat((SPRITE_SPACING - SPRITE_SIZE) / 2.0);
                let region = sheet.get_by_index(index % sheet.len().max(1)).unwrap_or_default();
                let spin = if (row + col) % 2 == 0 { 1.0 } else { -0.5 };
                sprites.push(SceneSprite {
                    quad: Quad::new(position, Vec2::splat(SPRITE_SIZE)),
                    region,
                    spin,
                });
            }
        }

        let extent = Vec2::new(GRID_COLUMNS as f32, GRID_ROWS as f32) * SPRITE_SPACING;
        let background = Quad::new(GRID_ORIGIN, extent).with_color(PANEL_COLOR);

        Self {
            background,
            sprites,
            hovered: None,
            show_debug: true,
        }
    }

    /// Advance sprite rotation by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        for sprite in &mut self.sprites {
            sprite.quad.rotate(SPIN_SPEED * sprite.spin * dt);
        }
    }

    /// Index of the sprite whose unrotated cell contains the world point.
    pub fn hit_test(&self, wx: f32, wy: f32) -> Option<usize> {
        let local = (Vec2::new(wx, wy) - GRID_ORIGIN) / SPRITE_SPACING;
        if local.x < 0.0 || local.y < 0.0 {
            return None;
        }
        let (col, row) = (local.x as usize, local.y as usize);
        (col < GRID_COLUMNS && row < GRID_ROWS).then_some(row * GRID_COLUMNS + col)
    }

    /// This frame's quad requests.  Submission order is arbitrary; layers
    /// keep the background under the sprites and the highlight on top.
    pub fn requests(&self, atlas: TextureHandle, white: TextureHandle) -> Vec<QuadRequest> {
        let mut requests = Vec::with_capacity(self.sprites.len() + 3);

        for sprite in &self.sprites {
            let instance = sprite.quad.instance().with_region(sprite.region);
            requests.push(QuadRequest::textured(atlas, instance).with_layer(LAYER_SPRITES));
        }

        if let Some(sprite) = self.hovered.and_then(|i| self.sprites.get(i)) {
            let mut highlight = sprite.quad.with_color(HIGHLIGHT_COLOR);
            highlight.position -= Vec2::splat(4.0);
            highlight.size += Vec2::splat(8.0);
            requests.push(QuadRequest::textured(white, highlight.instance()).with_layer(LAYER_OVERLAY));
        }

        requests.push(
            QuadRequest::textured(white, self.background.instance()).with_layer(LAYER_BACKGROUND),
        );

        if self.show_debug {
            // Bottom-right corner of clip space, independent of the camera.
            let marker = Mat4::from_translation(Vec3::new(0.9, -1.0, 0.0))
                * Mat4::from_scale(Vec3::new(0.1, 0.1, 1.0));
            requests.push(QuadRequest::solid(marker).with_layer(LAYER_OVERLAY));
        }

        requests
    }
}

/// Owns the entire application pipeline.
pub struct AppState {
    pub gpu: GpuContext,
    pub renderer: Renderer,
    pub camera: Camera2D,
    pub scene: DemoScene,
    atlas: TextureHandle,
    pub paused: bool,
}

impl AppState {
    /// Build a new AppState after GPU context has been created.
    pub fn new(gpu: GpuContext, width: u32, height: u32) -> Result<Self, RenderError> {
        let mut renderer = Renderer::new(&gpu, BatcherConfig::default());
        renderer.set_clear_color(0.05, 0.05, 0.08, 1.0);

        let (atlas_w, atlas_h, pixels) = generate_atlas();
        let atlas = renderer.create_texture_rgba(&gpu, atlas_w, atlas_h, &pixels)?;
        let sheet = SpriteSheet::new((atlas_w, atlas_h), (CELL_SIZE, CELL_SIZE));
        let scene = DemoScene::new(&sheet);
        info!("Demo scene: {} sprites over {} atlas cells", scene.sprites.len(), sheet.len());

        Ok(Self {
            gpu,
            renderer,
            camera: Camera2D::new(width as f32, height as f32),
            scene,
            atlas,
            paused: false,
        })
    }

    /// Animate by `dt` seconds, batch the scene, and render a frame.
    pub fn render_frame(&mut self, dt: f32) -> Result<FrameStats, RenderError> {
        if !self.paused {
            self.scene.update(dt);
        }

        self.renderer.begin(self.camera.view_proj())?;
        let white = self.renderer.white_texture();
        for request in self.scene.requests(self.atlas, white) {
            self.renderer.submit(request)?;
        }
        self.renderer.render_to_surface(&self.gpu)
    }

    /// Handle window resize.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.gpu.resize(width, height);
        self.camera.resize(width as f32, height as f32);
    }

    /// Update the hovered sprite from a cursor position.
    pub fn update_hover(&mut self, screen_x: f32, screen_y: f32) {
        let (wx, wy) = self.camera.screen_to_world(screen_x, screen_y);
        self.scene.hovered = self.scene.hit_test(wx, wy);
    }

    /// Pan the camera by screen-space delta.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.camera.pan(dx, dy);
    }

    /// Zoom toward screen point.
    pub fn zoom_at(&mut self, screen_x: f32, screen_y: f32, delta: f32) {
        let factor = if delta > 0.0 { 1.1 } else { 1.0 / 1.1 };
        self.camera.zoom_at(screen_x, screen_y, factor);
    }
}

// ===================================================================
// Tests
// ===================================================================
