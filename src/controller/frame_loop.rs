use glam::Mat4;

use crate::config::WorldConfig;
use crate::controller::camera_controller::CameraController;
use crate::controller::input::{InputEvent, InputProcessor, InputState, KeyAction};
use crate::model::{CameraState, Projection};
use crate::scene::{default_light_view, FrameInput, FrameStats, RenderBackend, SceneComposer};

// Long stalls (window drag, breakpoint) must not teleport the camera
const MAX_FRAME_DT: f32 = 0.1;

/// Frames per second, averaged over roughly half a second
#[derive(Clone, Copy, Debug, Default)]
pub struct FpsCounter {
    frames: u32,
    elapsed: f32,
    fps: f32,
}

impl FpsCounter {
    pub fn tick(&mut self, dt: f32) {
        self.frames += 1;
        self.elapsed += dt;
        if self.elapsed >= 0.5 {
            self.fps = self.frames as f32 / self.elapsed;
            self.frames = 0;
            self.elapsed = 0.0;
        }
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }
}

/// Per-frame state and update logic, independent of window and GPU
pub struct FrameLoopContext {
    pub camera: CameraState,
    pub projection: Projection,
    pub light_view: Mat4,
    pub input_state: InputState,
    pub processor: InputProcessor,
    pub camera_controller: CameraController,
    pub composer: SceneComposer,
    pub last_stats: FrameStats,
    pub fps: FpsCounter,
}

impl FrameLoopContext {
    pub fn new(config: &WorldConfig, width: u32, height: u32) -> Self {
        let input_state = InputState::from_config(config);
        let composer = SceneComposer::new(config, input_state.modes);
        Self::assemble(config, width, height, input_state, composer)
    }

    /// Drive a prebuilt composer, e.g. one with a custom height source
    pub fn with_composer(config: &WorldConfig, width: u32, height: u32, composer: SceneComposer) -> Self {
        Self::assemble(config, width, height, InputState::from_config(config), composer)
    }

    fn assemble(
        config: &WorldConfig,
        width: u32,
        height: u32,
        input_state: InputState,
        composer: SceneComposer,
    ) -> Self {
        Self {
            camera: CameraState::from_config(&config.camera),
            projection: Projection::new(&config.camera, width, height),
            light_view: default_light_view(),
            input_state,
            processor: InputProcessor::default(),
            camera_controller: CameraController::new(&config.camera),
            composer,
            last_stats: FrameStats::default(),
            fps: FpsCounter::default(),
        }
    }

    /// Feed one input event; returns the action a key press triggered, if any
    pub fn handle_event(&mut self, event: &InputEvent) -> Option<KeyAction> {
        self.input_state.process_event(event);
        match event {
            InputEvent::KeyDown(key) => self.processor.apply_key(key, &mut self.input_state),
            _ => None,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.projection.set_aspect(width, height);
    }

    /// Move the camera, hand the modes to the scene and compose one frame
    pub fn update<B: RenderBackend + ?Sized>(&mut self, backend: &mut B, dt: f32) -> FrameStats {
        let dt = dt.clamp(0.0, MAX_FRAME_DT);
        self.fps.tick(dt);

        let (dx, dy) = self.input_state.consume_look();
        self.camera_controller.apply_look(&mut self.camera, dx, dy);
        self.camera_controller
            .update_movement(&mut self.camera, &self.input_state, &self.processor, dt);

        self.composer.on_input_changed(self.input_state.modes);

        let frame = FrameInput {
            camera: self.camera,
            light_view: self.light_view,
            projection: self.projection.matrix(),
        };
        let stats = self.composer.on_frame(backend, &frame);
        if stats.shifts > 0 || stats.chunks_built > 0 {
            tracing::debug!(
                "frame: {} shifts, {} chunks built, {} cached, center {:?}",
                stats.shifts,
                stats.chunks_built,
                stats.cache_hits,
                self.composer.window().center()
            );
        }
        self.last_stats = stats;
        stats
    }
}
