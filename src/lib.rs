// Re-export all public modules so they can be used from main.rs
pub mod config;
pub mod error;
pub mod logging;
pub mod scene;
pub mod ui;

// MVC Architecture
pub mod controller;
pub mod model;
pub mod view;

pub use config::WorldConfig;
pub use error::StartupError;
pub use scene::{FrameInput, FrameStats, RenderBackend, SceneComposer};
