use glam::Vec3;

use crate::config::CameraConfig;
use crate::controller::input::{InputProcessor, InputState};
use crate::model::CameraState;

/// Handles camera movement and orientation
#[derive(Clone, Debug)]
pub struct CameraController {
    pub move_speed: f32,
    pub mouse_sensitivity: f32,
    /// constant velocity applied every frame, regardless of input
    pub drift: Vec3,
}

impl CameraController {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            move_speed: config.move_speed,
            mouse_sensitivity: config.mouse_sensitivity,
            drift: Vec3::from_array(config.drift),
        }
    }

    /// Apply mouse look delta to camera; moving the mouse right turns right
    pub fn apply_look(&self, camera: &mut CameraState, dx: f32, dy: f32) {
        camera.rotate(-dx * self.mouse_sensitivity, -dy * self.mouse_sensitivity);
    }

    /// Update camera position based on pressed keys
    pub fn update_movement(&self, camera: &mut CameraState, input: &InputState, processor: &InputProcessor, dt: f32) {
        let mut cam_move = Vec3::ZERO;

        // W/S follow the aim, pitch included
        if processor.is_moving_forward(input) {
            cam_move += camera.forward();
        }
        if processor.is_moving_backward(input) {
            cam_move -= camera.forward();
        }

        let cam_right = camera.right();
        if processor.is_moving_left(input) {
            cam_move -= cam_right;
        }
        if processor.is_moving_right(input) {
            cam_move += cam_right;
        }

        if processor.is_rising(input) {
            cam_move += Vec3::Y;
        }
        if processor.is_sinking(input) {
            cam_move -= Vec3::Y;
        }

        if cam_move.length_squared() > 0.0 {
            camera.position += cam_move.normalize() * self.move_speed * dt;
        }
        camera.position += self.drift * dt;
    }
}
