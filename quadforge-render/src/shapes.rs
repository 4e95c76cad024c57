//! Quad shape helper: position/size/rotation to a model transform.

use glam::{Mat4, Quat, Vec2};

use crate::vertex::QuadInstance;

/// An axis-aligned rectangle in world space, optionally rotated about its
/// centre.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quad {
    /// Top-left corner before rotation.
    pub position: Vec2,
    pub size: Vec2,
    /// Degrees, counter-clockwise in a Y-up frame.
    pub rotation: f32,
    pub color: [f32; 4],
}

impl Quad {
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            size,
            rotation: 0.0,
            color: [1.0; 4],
        }
    }

    pub fn with_rotation(mut self, degrees: f32) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.color = color;
        self
    }

    pub fn rotate(&mut self, delta_degrees: f32) {
        self.rotation += delta_degrees;
    }

    /// Maps the unit quad onto this rectangle.
    pub fn transform(&self) -> Mat4 {
        let rotation = Quat::from_rotation_z(self.rotation.to_radians());
        let center = (self.size * 0.5).extend(0.0);
        // Translate so rotation pivots on the centre, not the corner.
        let translation = self.position.extend(0.0) + center + rotation * -center;
        Mat4::from_scale_rotation_translation(self.size.extend(1.0), rotation, translation)
    }

    pub fn instance(&self) -> QuadInstance {
        QuadInstance::new(self.transform()).with_color(self.color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn near(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn test_unrotated_maps_corners() {
        let quad = Quad::new(Vec2::new(10.0, 20.0), Vec2::new(100.0, 50.0));
        let m = quad.transform();
        assert!(near(m.transform_point3(Vec3::ZERO), Vec3::new(10.0, 20.0, 0.0)));
        assert!(near(m.transform_point3(Vec3::new(1.0, 1.0, 0.0)), Vec3::new(110.0, 70.0, 0.0)));
    }

    #[test]
    fn test_rotation_pivots_on_centre() {
        let quad = Quad::new(Vec2::new(0.0, 0.0), Vec2::new(40.0, 20.0)).with_rotation(90.0);
        let m = quad.transform();
        let centre = m.transform_point3(Vec3::new(0.5, 0.5, 0.0));
        assert!(near(centre, Vec3::new(20.0, 10.0, 0.0)));
        // 90° swaps the extents around the centre.
        let corner = m.transform_point3(Vec3::ZERO);
        assert!(near(corner, Vec3::new(30.0, -10.0, 0.0)));
    }

    #[test]
    fn test_instance_carries_color() {
        let quad = Quad::new(Vec2::ZERO, Vec2::ONE).with_color([0.5, 0.5, 0.5, 1.0]);
        let inst = quad.instance();
        assert_eq!(inst.color, [0.5, 0.5, 0.5, 1.0]);
        assert_eq!(inst.transform, quad.transform());
    }

    #[test]
    fn test_rotate_accumulates() {
        let mut quad = Quad::new(Vec2::ZERO, Vec2::ONE);
        quad.rotate(30.0);
        quad.rotate(15.0);
        assert!((quad.rotation - 45.0).abs() < f32::EPSILON);
    }
}
