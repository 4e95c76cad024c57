//! Atlas regions — sub-rectangles of a shared texture addressed by
//! scale + offset instead of a separate texture per quad.
//!
//! A region maps the quad's native UV (0,0)→(1,1) to
//! `uv * scale + offset`.  Valid regions stay inside the atlas:
//! every `scale` component lies in (0, 1] and `offset + scale` in [0, 1].

use thiserror::Error;

/// Slack allowed on `offset + scale <= 1` for regions computed from
/// pixel coordinates (e.g. thirds of an atlas).
const REGION_EPSILON: f32 = 1e-5;

/// Smallest scale a clamped region keeps, so it never collapses to zero.
const MIN_SCALE: f32 = f32::EPSILON;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[error("Atlas region out of bounds: scale {scale:?}, offset {offset:?}")]
pub struct InvalidRegionError {
    pub scale: [f32; 2],
    pub offset: [f32; 2],
}

/// A sub-rectangle of a texture atlas in normalized coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AtlasRegion {
    /// Width/height fraction of the atlas.
    pub scale: [f32; 2],
    /// Top-left corner of the region.
    pub offset: [f32; 2],
}

impl Default for AtlasRegion {
    fn default() -> Self {
        Self::FULL
    }
}

impl AtlasRegion {
    /// The whole texture.
    pub const FULL: AtlasRegion = AtlasRegion {
        scale: [1.0, 1.0],
        offset: [0.0, 0.0],
    };

    pub const fn new(offset: [f32; 2], scale: [f32; 2]) -> Self {
        Self { scale, offset }
    }

    /// Region covering the pixel rectangle `(x, y, width, height)` of an
    /// atlas `atlas_width × atlas_height` pixels large.
    pub fn from_pixels(
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        atlas_width: u32,
        atlas_height: u32,
    ) -> Self {
        let aw = atlas_width.max(1) as f32;
        let ah = atlas_height.max(1) as f32;
        Self {
            scale: [width as f32 / aw, height as f32 / ah],
            offset: [x as f32 / aw, y as f32 / ah],
        }
    }

    pub fn validate(&self) -> Result<(), InvalidRegionError> {
        let axis_ok = |s: f32, o: f32| s > 0.0 && s <= 1.0 && o >= 0.0 && o + s <= 1.0 + REGION_EPSILON;
        if axis_ok(self.scale[0], self.offset[0]) && axis_ok(self.scale[1], self.offset[1]) {
            Ok(())
        } else {
            Err(InvalidRegionError {
                scale: self.scale,
                offset: self.offset,
            })
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Nearest region inside the atlas.  Non-finite components fall back
    /// to the full-axis defaults.
    pub fn clamped(&self) -> Self {
        let mut out = *self;
        for axis in 0..2 {
            let s = self.scale[axis];
            let s = if s.is_finite() { s.clamp(MIN_SCALE, 1.0) } else { 1.0 };
            let o = self.offset[axis];
            let o = if o.is_finite() { o.clamp(0.0, 1.0 - s) } else { 0.0 };
            out.scale[axis] = s;
            out.offset[axis] = o;
        }
        out
    }

    /// The atlas UV sampled for native quad UV `uv`.
    pub fn apply(&self, uv: [f32; 2]) -> [f32; 2] {
        [
            uv[0] * self.scale[0] + self.offset[0],
            uv[1] * self.scale[1] + self.offset[1],
        ]
    }
}

/// Row-major cell index, computed in `usize` so large grids cannot wrap.
fn cell_index(columns: u32, row: u32, col: u32) -> usize {
    row as usize * columns as usize + col as usize
}

/// A uniform grid of equally sized sprites laid out row-major over an atlas.
#[derive(Clone, Debug, Default)]
pub struct SpriteSheet {
    regions: Vec<AtlasRegion>,
    columns: u32,
    rows: u32,
}

impl SpriteSheet {
    /// Slice an atlas of `atlas_size` pixels into cells of `sprite_size`.
    /// Partial cells at the right/bottom edges are ignored.
    pub fn new(atlas_size: (u32, u32), sprite_size: (u32, u32)) -> Self {
        let (atlas_w, atlas_h) = atlas_size;
        let (sprite_w, sprite_h) = sprite_size;
        if sprite_w == 0 || sprite_h == 0 {
            return Self::default();
        }

        let columns = atlas_w / sprite_w;
        let rows = atlas_h / sprite_h;
        let mut regions = Vec::with_capacity(cell_index(columns, rows, 0));
        for row in 0..rows {
            for col in 0..columns {
                regions.push(AtlasRegion::from_pixels(
                    col * sprite_w,
                    row * sprite_h,
                    sprite_w,
                    sprite_h,
                    atlas_w,
                    atlas_h,
                ));
            }
        }

        Self {
            regions,
            columns,
            rows,
        }
    }

    pub fn get(&self, col: u32, row: u32) -> Option<AtlasRegion> {
        if col >= self.columns || row >= self.rows {
            return None;
        }
        self.get_by_index(cell_index(self.columns, row, col))
    }

    pub fn get_by_index(&self, index: usize) -> Option<AtlasRegion> {
        self.regions.get(index).copied()
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
