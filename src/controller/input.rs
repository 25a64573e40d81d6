//! Platform-agnostic input handling system
use std::collections::HashSet;

use crate::config::WorldConfig;
use crate::model::RenderModes;

/// Platform-independent input events
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    KeyDown(String),
    KeyUp(String),

    MouseMove { dx: f32, dy: f32 },

    FocusLost,
    PointerLockChanged { locked: bool },
}

/// Key and mouse state plus the render modes the keys toggle
pub struct InputState {
    pub pressed_keys: HashSet<String>,
    pub look_delta: (f32, f32),
    pub pointer_locked: bool,
    pub modes: RenderModes,
    height_scale_min: u32,
    height_scale_max: u32,
}

impl InputState {
    pub fn new(modes: RenderModes, height_scale_min: u32, height_scale_max: u32) -> Self {
        Self {
            pressed_keys: HashSet::new(),
            look_delta: (0.0, 0.0),
            pointer_locked: false,
            modes,
            height_scale_min,
            height_scale_max,
        }
    }

    /// Start with the configured height scale, cycling up to `height_scale_max`
    pub fn from_config(config: &WorldConfig) -> Self {
        let min = config.height_scale.max(0) as u32;
        let max = config.height_scale_max.max(0) as u32;
        Self::new(RenderModes::new(min), min, max.max(min))
    }

    /// Process an input event and update state
    pub fn process_event(&mut self, event: &InputEvent) {
        match event {
            InputEvent::KeyDown(key) => {
                self.pressed_keys.insert(key.clone());
            }
            InputEvent::KeyUp(key) => {
                self.pressed_keys.remove(key.as_str());
            }
            InputEvent::MouseMove { dx, dy } => {
                if self.pointer_locked {
                    self.look_delta.0 += dx;
                    self.look_delta.1 += dy;
                }
            }
            InputEvent::FocusLost => {
                self.clear_keys();
            }
            InputEvent::PointerLockChanged { locked } => {
                self.pointer_locked = *locked;
                if !locked {
                    self.look_delta = (0.0, 0.0);
                }
            }
        }
    }

    pub fn is_key_pressed(&self, key: &str) -> bool {
        self.pressed_keys.contains(key)
    }

    pub fn clear_keys(&mut self) {
        self.pressed_keys.clear();
    }

    pub fn consume_look(&mut self) -> (f32, f32) {
        let result = self.look_delta;
        self.look_delta = (0.0, 0.0);
        result
    }

    pub fn cycle_height_scale(&mut self) {
        self.modes.cycle_height_scale(self.height_scale_min, self.height_scale_max);
    }

    pub fn toggle_colour_mode(&mut self) {
        self.modes.toggle_colour_mode();
    }

    pub fn cycle_draw_mode(&mut self) {
        self.modes.cycle_draw_mode();
    }

    pub fn height_scale_range(&self) -> (u32, u32) {
        (self.height_scale_min, self.height_scale_max)
    }
}

/// Key mapping configuration
#[derive(Clone, Debug)]
pub struct KeyBindings {
    pub forward: String,
    pub backward: String,
    pub left: String,
    pub right: String,
    pub up: String,
    pub down: String,
    pub cycle_height_scale: String,
    pub toggle_colour_mode: String,
    pub cycle_draw_mode: String,
    pub escape: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: "w".to_string(),
            backward: "s".to_string(),
            left: "a".to_string(),
            right: "d".to_string(),
            up: " ".to_string(),
            down: "Shift".to_string(),
            cycle_height_scale: "h".to_string(),
            toggle_colour_mode: "m".to_string(),
            cycle_draw_mode: "n".to_string(),
            escape: "Escape".to_string(),
        }
    }
}

/// What a single key press asks for, besides being held down
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    CycleHeightScale,
    ToggleColourMode,
    CycleDrawMode,
    Escape,
}

/// High-level input processor
#[derive(Clone, Debug, Default)]
pub struct InputProcessor {
    bindings: KeyBindings,
}

impl InputProcessor {
    pub fn new(bindings: KeyBindings) -> Self {
        Self { bindings }
    }

    pub fn is_moving_forward(&self, input: &InputState) -> bool {
        input.is_key_pressed(&self.bindings.forward) || input.is_key_pressed("ArrowUp")
    }

    pub fn is_moving_backward(&self, input: &InputState) -> bool {
        input.is_key_pressed(&self.bindings.backward) || input.is_key_pressed("ArrowDown")
    }

    pub fn is_moving_left(&self, input: &InputState) -> bool {
        input.is_key_pressed(&self.bindings.left) || input.is_key_pressed("ArrowLeft")
    }

    pub fn is_moving_right(&self, input: &InputState) -> bool {
        input.is_key_pressed(&self.bindings.right) || input.is_key_pressed("ArrowRight")
    }

    pub fn is_rising(&self, input: &InputState) -> bool {
        input.is_key_pressed(&self.bindings.up)
    }

    pub fn is_sinking(&self, input: &InputState) -> bool {
        input.is_key_pressed(&self.bindings.down)
    }

    pub fn action_for(&self, key: &str) -> Option<KeyAction> {
        if key == self.bindings.escape {
            Some(KeyAction::Escape)
        } else if key.eq_ignore_ascii_case(&self.bindings.cycle_height_scale) {
            Some(KeyAction::CycleHeightScale)
        } else if key.eq_ignore_ascii_case(&self.bindings.toggle_colour_mode) {
            Some(KeyAction::ToggleColourMode)
        } else if key.eq_ignore_ascii_case(&self.bindings.cycle_draw_mode) {
            Some(KeyAction::CycleDrawMode)
        } else {
            None
        }
    }

    /// Apply the mode change bound to `key`. Escape is left to the host,
    /// which owns the cursor and the window.
    pub fn apply_key(&self, key: &str, input: &mut InputState) -> Option<KeyAction> {
        let action = self.action_for(key)?;
        match action {
            KeyAction::CycleHeightScale => input.cycle_height_scale(),
            KeyAction::ToggleColourMode => input.toggle_colour_mode(),
            KeyAction::CycleDrawMode => input.cycle_draw_mode(),
            KeyAction::Escape => {}
        }
        Some(action)
    }
}

/// Translation from winit keyboard events to the string keys above
pub mod native {
    use winit::keyboard::{Key, NamedKey};

    use super::InputEvent;

    pub fn key_name(key: &Key) -> Option<String> {
        match key {
            Key::Character(c) => Some(c.to_lowercase()),
            Key::Named(NamedKey::Space) => Some(" ".to_string()),
            Key::Named(NamedKey::Shift) => Some("Shift".to_string()),
            Key::Named(NamedKey::Escape) => Some("Escape".to_string()),
            Key::Named(NamedKey::ArrowUp) => Some("ArrowUp".to_string()),
            Key::Named(NamedKey::ArrowDown) => Some("ArrowDown".to_string()),
            Key::Named(NamedKey::ArrowLeft) => Some("ArrowLeft".to_string()),
            Key::Named(NamedKey::ArrowRight) => Some("ArrowRight".to_string()),
            _ => None,
        }
    }

    pub fn keyboard_event_to_input(key: &Key, is_down: bool) -> Option<InputEvent> {
        let name = key_name(key)?;
        Some(if is_down {
            InputEvent::KeyDown(name)
        } else {
            InputEvent::KeyUp(name)
        })
    }

    pub fn mouse_motion_to_input(delta: (f64, f64)) -> InputEvent {
        InputEvent::MouseMove {
            dx: delta.0 as f32,
            dy: delta.1 as f32,
        }
    }
}
