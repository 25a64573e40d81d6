use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Vec3};

use crate::config::CameraConfig;

// Slightly less than π/2 so forward never becomes parallel to world up
const PITCH_LIMIT: f32 = 1.5533;

/// Position and look angles of the viewer. Angles are in radians: `horizontal`
/// rotates about +Y starting from +Z, `vertical` tilts up from the horizon.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraState {
    pub position: Vec3,
    pub horizontal: f32,
    pub vertical: f32,
}

impl CameraState {
    pub fn new(position: Vec3, horizontal: f32, vertical: f32) -> Self {
        Self { position, horizontal, vertical }
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        Self::new(Vec3::from_array(config.position), config.horizontal, config.vertical)
    }

    pub fn forward(&self) -> Vec3 {
        let (h, v) = (self.horizontal, self.vertical);
        Vec3::new(v.cos() * h.sin(), v.sin(), v.cos() * h.cos())
    }

    /// Horizontal, pointing to the viewer's right
    pub fn right(&self) -> Vec3 {
        let h = self.horizontal - FRAC_PI_2;
        Vec3::new(h.sin(), 0.0, h.cos())
    }

    pub fn up(&self) -> Vec3 {
        self.right().cross(self.forward())
    }

    pub fn target(&self) -> Vec3 {
        self.position + self.forward()
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target(), self.up())
    }

    /// View matrix of a camera at the origin looking the same way
    pub fn rotation_only_view(&self) -> Mat4 {
        Mat4::look_at_rh(Vec3::ZERO, self.forward(), self.up())
    }

    /// Turn by the given angle deltas, keeping the pitch away from the poles
    pub fn rotate(&mut self, d_horizontal: f32, d_vertical: f32) {
        self.horizontal += d_horizontal;
        self.vertical = (self.vertical + d_vertical).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    pub fov_y: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Projection {
    pub fn new(config: &CameraConfig, width: u32, height: u32) -> Self {
        let mut projection = Self {
            fov_y: config.fov_y_degrees.to_radians(),
            aspect: 1.0,
            z_near: config.z_near,
            z_far: config.z_far,
        };
        projection.set_aspect(width, height);
        projection
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.z_near, self.z_far)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn zero_angles_look_down_positive_z() {
        let camera = CameraState::new(Vec3::ZERO, 0.0, 0.0);
        assert_relative_eq!(camera.forward().z, 1.0);
        assert_relative_eq!(camera.right().x, -1.0, epsilon = 1e-6);
        assert_relative_eq!(camera.up().y, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn basis_is_orthonormal() {
        let camera = CameraState::new(Vec3::new(3.0, 1.0, -2.0), 0.7, -0.4);
        let (f, r, u) = (camera.forward(), camera.right(), camera.up());
        assert_relative_eq!(f.length(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(r.length(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(f.dot(r), 0.0, epsilon = 1e-6);
        assert_relative_eq!(u.dot(r), 0.0, epsilon = 1e-6);
        assert_relative_eq!(u.dot(f), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn rotate_clamps_pitch() {
        let mut camera = CameraState::new(Vec3::ZERO, 0.0, 0.0);
        camera.rotate(0.5, 10.0);
        assert_relative_eq!(camera.vertical, PITCH_LIMIT);
        assert_relative_eq!(camera.horizontal, 0.5);
    }

    #[test]
    fn rotation_only_view_ignores_translation() {
        let a = CameraState::new(Vec3::ZERO, 1.2, 0.3);
        let b = CameraState::new(Vec3::new(500.0, -3.0, 12.0), 1.2, 0.3);
        assert_eq!(a.rotation_only_view(), b.rotation_only_view());
        assert_ne!(a.view(), b.view());
    }

    #[test]
    fn projection_survives_zero_height() {
        let projection = Projection::new(&CameraConfig::default(), 800, 0);
        assert_relative_eq!(projection.aspect, 800.0);
        assert_relative_eq!(projection.fov_y, 90f32.to_radians());
    }
}
