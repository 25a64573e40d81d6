// CONTROLLER: input, camera movement and the per-frame update
pub mod camera_controller;
pub mod frame_loop;
pub mod input;

pub use camera_controller::CameraController;
pub use frame_loop::{FpsCounter, FrameLoopContext};
pub use input::{InputEvent, InputProcessor, InputState, KeyAction, KeyBindings};
