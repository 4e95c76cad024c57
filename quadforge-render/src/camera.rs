//! Camera: view-projection math and the shared uniform slot.

use glam::Mat4;

use crate::vertex::CameraUniform;

/// Owns the single camera uniform shared by every textured draw of a frame.
///
/// The submission layer must flush a dirty uniform ([`Self::take_dirty`])
/// before issuing any of the frame's draw calls.
#[derive(Debug)]
pub struct CameraUniformWriter {
    uniform: CameraUniform,
    dirty: bool,
}

impl Default for CameraUniformWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraUniformWriter {
    /// Starts at identity, dirty so the first frame uploads it.
    pub fn new() -> Self {
        Self {
            uniform: CameraUniform::default(),
            dirty: true,
        }
    }

    /// Replace the view-projection matrix.  Accepted as-is.
    pub fn update(&mut self, view_proj: Mat4) {
        self.uniform = CameraUniform::from_matrix(view_proj);
        self.dirty = true;
    }

    pub fn uniform(&self) -> &CameraUniform {
        &self.uniform
    }

    pub fn view_proj(&self) -> Mat4 {
        self.uniform.matrix()
    }

    /// Uniform buffer contents (64 bytes).
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(&self.uniform)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns whether an upload is needed and clears the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

/// 2D viewport camera with pan and zoom.
///
/// World units are pixels at zoom 1; (0,0) is the top-left of the
/// viewport and Y grows downward.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera2D {
    pub pan_x: f32,
    pub pan_y: f32,
    pub zoom: f32,
    pub viewport_width: f32,
    pub viewport_height: f32,
}

impl Camera2D {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            pan_x: 0.0,
            pan_y: 0.0,
            zoom: 1.0,
            viewport_width: width,
            viewport_height: height,
        }
    }

    /// Orthographic projection for a `width × height` viewport.
    ///
    /// Maps world (pan_x, pan_y) to NDC (-1, 1) and
    /// (pan_x + width/zoom, pan_y + height/zoom) to NDC (1, -1).
    pub fn orthographic(width: f32, height: f32, pan_x: f32, pan_y: f32, zoom: f32) -> Mat4 {
        // ndc_x = (world_x - pan_x) * (2 * zoom / width) - 1
        // ndc_y = 1 - (world_y - pan_y) * (2 * zoom / height)
        let sx = 2.0 * zoom / width;
        let sy = -2.0 * zoom / height; // flip Y for top-left origin
        let tx = -pan_x * sx - 1.0;
        let ty = -pan_y * sy + 1.0;

        Mat4::from_cols_array_2d(&[
            [sx, 0.0, 0.0, 0.0],
            [0.0, sy, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [tx, ty, 0.0, 1.0],
        ])
    }

    pub fn view_proj(&self) -> Mat4 {
        Self::orthographic(
            self.viewport_width,
            self.viewport_height,
            self.pan_x,
            self.pan_y,
            self.zoom,
        )
    }

    /// Convert screen pixel coordinates to world coordinates.
    pub fn screen_to_world(&self, screen_x: f32, screen_y: f32) -> (f32, f32) {
        (screen_x / self.zoom + self.pan_x, screen_y / self.zoom + self.pan_y)
    }

    /// Pan by delta pixels (in screen space).
    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.pan_x -= dx / self.zoom;
        self.pan_y -= dy / self.zoom;
    }

    /// Zoom toward/away from screen point (sx, sy), keeping the world
    /// point under it fixed.
    pub fn zoom_at(&mut self, sx: f32, sy: f32, factor: f32) {
        let (wx, wy) = self.screen_to_world(sx, sy);

        self.zoom = (self.zoom * factor).clamp(0.1, 50.0);

        self.pan_x = wx - sx / self.zoom;
        self.pan_y = wy - sy / self.zoom;
    }

    /// Update viewport dimensions (on resize).
    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport_width = width;
        self.viewport_height = height;
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn ndc(m: Mat4, x: f32, y: f32) -> (f32, f32) {
        let p = m.transform_point3(Vec3::new(x, y, 0.0));
        (p.x, p.y)
    }

    fn assert_near(got: (f32, f32), want: (f32, f32)) {
        assert!(
            (got.0 - want.0).abs() < 1e-5 && (got.1 - want.1).abs() < 1e-5,
            "expected {want:?}, got {got:?}"
        );
    }

    #[test]
    fn test_orthographic_corners() {
        let m = Camera2D::new(800.0, 600.0).view_proj();
        assert_near(ndc(m, 0.0, 0.0), (-1.0, 1.0));
        assert_near(ndc(m, 800.0, 600.0), (1.0, -1.0));
        assert_near(ndc(m, 400.0, 300.0), (0.0, 0.0));
    }

    #[test]
    fn test_orthographic_zoom() {
        let m = Camera2D::orthographic(800.0, 600.0, 0.0, 0.0, 2.0);
        // At 2× zoom only the top-left quarter is visible.
        assert_near(ndc(m, 400.0, 300.0), (1.0, -1.0));
    }

    #[test]
    fn test_orthographic_pan() {
        let m = Camera2D::orthographic(800.0, 600.0, 100.0, 50.0, 1.0);
        assert_near(ndc(m, 100.0, 50.0), (-1.0, 1.0));
    }

    #[test]
    fn test_zoom_at_keeps_point_fixed() {
        let mut cam = Camera2D::new(800.0, 600.0);
        let before = cam.screen_to_world(200.0, 150.0);
        cam.zoom_at(200.0, 150.0, 1.5);
        let after = cam.screen_to_world(200.0, 150.0);
        assert_near(after, before);
        assert!((cam.zoom - 1.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_pan_moves_opposite_to_drag() {
        let mut cam = Camera2D::new(800.0, 600.0);
        cam.zoom = 2.0;
        cam.pan(10.0, -20.0);
        assert_near((cam.pan_x, cam.pan_y), (-5.0, 10.0));
    }

    #[test]
    fn test_writer_tracks_dirty() {
        let mut writer = CameraUniformWriter::new();
        assert!(writer.take_dirty());
        assert!(!writer.take_dirty());

        let m = Camera2D::new(640.0, 480.0).view_proj();
        writer.update(m);
        assert!(writer.is_dirty());
        assert_eq!(writer.view_proj(), m);
        assert_eq!(writer.as_bytes().len(), 64);
        assert!(writer.take_dirty());
    }

    #[test]
    fn test_writer_accepts_degenerate_matrix() {
        let mut writer = CameraUniformWriter::new();
        writer.update(Mat4::ZERO);
        assert_eq!(writer.uniform().view_proj, [[0.0; 4]; 4]);
    }
}
