// MODEL: terrain data and camera state, no GPU types in here
pub mod camera;
pub mod chunk_block;
pub mod chunk_cache;
pub mod chunk_window;
pub mod modes;
pub mod noise_field;
pub mod palette;

pub use camera::{CameraState, Projection};
pub use chunk_block::{ChunkBlock, VoxelInstance};
pub use chunk_cache::{BuildParams, ChunkCache, ChunkSource, Fetch};
pub use chunk_window::{ChunkWindow, GridCell, Shift, ShiftPlan};
pub use modes::{ColourMode, DrawMode, RenderModes};
pub use noise_field::{ConstantHeight, HeightSource, NoiseField};
