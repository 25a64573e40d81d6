use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Environment variable naming an optional YAML world config
pub const CONFIG_ENV_VAR: &str = "BLOCKWORLD_CONFIG";

const MIN_CHUNK_SIDE: usize = 2;
const MAX_CHUNK_SIDE: usize = 64;
const MAX_OCTAVES: u32 = 16;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("chunk side {0} outside 2..=64")]
    InvalidChunkSide(usize),
    #[error("height bounds [{min}, {max}] do not fit a chunk of side {side}")]
    InvalidHeightBounds { min: i32, max: i32, side: usize },
    #[error("height scale must not be negative (got {0})")]
    NegativeHeightScale(i32),
    #[error("height scale cycle {start}..={max} is empty")]
    InvalidHeightScaleRange { start: i32, max: i32 },
    #[error("tree column {index} out of range for {columns} columns")]
    TreeColumnOutOfRange { index: usize, columns: usize },
    #[error("tree scale must be positive and finite (got {0})")]
    InvalidTreeScale(f32),
    #[error("invalid noise parameters: {0}")]
    InvalidNoise(String),
}

/// How much of each column is emitted as voxel instances
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FillMode {
    /// one voxel per column, at the surface
    #[default]
    Surface,
    /// every voxel from the chunk floor up to the surface
    Solid,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeKind {
    Pine,
    Broadleaf,
}

/// One tree drawn on every chunk, anchored on top of a column.
/// `column` is the flattened column index `ix * side + iz`.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct TreePlacement {
    pub column: usize,
    pub kind: TreeKind,
    #[serde(default = "default_tree_scale")]
    pub scale: f32,
}

fn default_tree_scale() -> f32 {
    1.0
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    pub seed: u32,
    pub frequency: f64,
    pub octaves: u32,
    pub persistence: f64,
    pub lacunarity: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            seed: 1337,
            frequency: 0.03,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChunkConfig {
    /// side length `S` of a chunk in voxels
    pub side: usize,
    /// world-space y of every chunk origin
    pub floor_y: f32,
    pub min_height: i32,
    /// defaults to `side - 1` when absent
    pub max_height: Option<i32>,
    pub fill: FillMode,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            side: 16,
            floor_y: -20.0,
            min_height: 0,
            max_height: None,
            fill: FillMode::Surface,
        }
    }
}

impl ChunkConfig {
    pub fn max_height(&self) -> i32 {
        self.max_height.unwrap_or(self.side as i32 - 1)
    }

    pub fn columns(&self) -> usize {
        self.side * self.side
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    /// radians
    pub horizontal: f32,
    /// radians
    pub vertical: f32,
    pub move_speed: f32,
    pub mouse_sensitivity: f32,
    pub fov_y_degrees: f32,
    pub z_near: f32,
    pub z_far: f32,
    /// constant velocity applied every frame, in world units per second
    pub drift: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [13.0, 0.0, 13.0],
            horizontal: 0.0,
            vertical: 0.0,
            move_speed: 10.0,
            mouse_sensitivity: 0.002,
            fov_y_degrees: 90.0,
            z_near: 0.1,
            z_far: 100.0,
            drift: [0.0, 0.0, 0.0],
        }
    }
}

/// Complete startup configuration
///
/// Usage:
///   // defaults reproduce the classic block world
///   let config = WorldConfig::default();
///
///   // or read `BLOCKWORLD_CONFIG` if set
///   let config = WorldConfig::from_env()?;
///   config.validate()?;
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub noise: NoiseConfig,
    pub chunk: ChunkConfig,
    pub camera: CameraConfig,
    /// initial height scale; `H` cycles it up to `height_scale_max`
    pub height_scale: i32,
    pub height_scale_max: i32,
    pub trees: Vec<TreePlacement>,
    pub cache_chunks: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            noise: NoiseConfig::default(),
            chunk: ChunkConfig::default(),
            camera: CameraConfig::default(),
            height_scale: 10,
            height_scale_max: 30,
            trees: vec![
                TreePlacement { column: 15 * 16 + 14, kind: TreeKind::Pine, scale: 1.0 },
                TreePlacement { column: 7 * 16 + 3, kind: TreeKind::Broadleaf, scale: 1.0 },
            ],
            cache_chunks: true,
        }
    }
}

impl WorldConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Load from the file named by `BLOCKWORLD_CONFIG`, or defaults if it is unset
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) => {
                tracing::info!("loading world config from {path}");
                Self::load(path)
            }
            Err(_) => Ok(Self::default()),
        }
    }

    /// Reject every configuration the frame loop cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let chunk = &self.chunk;
        if !(MIN_CHUNK_SIDE..=MAX_CHUNK_SIDE).contains(&chunk.side) {
            return Err(ConfigError::InvalidChunkSide(chunk.side));
        }

        let max_height = chunk.max_height();
        if chunk.min_height < 0 || chunk.min_height > max_height || max_height >= chunk.side as i32 {
            return Err(ConfigError::InvalidHeightBounds {
                min: chunk.min_height,
                max: max_height,
                side: chunk.side,
            });
        }

        if self.height_scale < 0 {
            return Err(ConfigError::NegativeHeightScale(self.height_scale));
        }
        if self.height_scale_max < self.height_scale {
            return Err(ConfigError::InvalidHeightScaleRange {
                start: self.height_scale,
                max: self.height_scale_max,
            });
        }

        let columns = chunk.columns();
        if let Some(tree) = self.trees.iter().find(|t| t.column >= columns) {
            return Err(ConfigError::TreeColumnOutOfRange { index: tree.column, columns });
        }
        if let Some(tree) = self.trees.iter().find(|t| !(t.scale > 0.0) || !t.scale.is_finite()) {
            return Err(ConfigError::InvalidTreeScale(tree.scale));
        }

        let noise = &self.noise;
        if noise.octaves == 0 || noise.octaves > MAX_OCTAVES {
            return Err(ConfigError::InvalidNoise(format!(
                "octaves must be in 1..={MAX_OCTAVES}, got {}",
                noise.octaves
            )));
        }
        if !(noise.frequency > 0.0) || !noise.frequency.is_finite() {
            return Err(ConfigError::InvalidNoise(format!(
                "frequency must be positive, got {}",
                noise.frequency
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        WorldConfig::default().validate().unwrap();
    }

    #[test]
    fn default_max_height_is_top_of_chunk() {
        assert_eq!(ChunkConfig::default().max_height(), 15);
    }

    #[test]
    fn rejects_bad_chunk_side() {
        let mut config = WorldConfig::default();
        config.chunk.side = 1;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidChunkSide(1))));
    }

    #[test]
    fn rejects_height_bounds_outside_chunk() {
        let mut config = WorldConfig::default();
        config.chunk.max_height = Some(16);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidHeightBounds { .. })));

        let mut config = WorldConfig::default();
        config.chunk.min_height = 9;
        config.chunk.max_height = Some(8);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidHeightBounds { .. })));

        let mut config = WorldConfig::default();
        config.chunk.min_height = -1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidHeightBounds { min: -1, .. })
        ));
    }

    #[test]
    fn rejects_negative_height_scale() {
        let mut config = WorldConfig::default();
        config.height_scale = -1;
        assert!(matches!(config.validate(), Err(ConfigError::NegativeHeightScale(-1))));
    }

    #[test]
    fn rejects_empty_height_scale_cycle() {
        let mut config = WorldConfig::default();
        config.height_scale_max = 5;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidHeightScaleRange { .. })));
    }

    #[test]
    fn rejects_tree_column_past_chunk() {
        let mut config = WorldConfig::default();
        config.trees.push(TreePlacement { column: 256, kind: TreeKind::Pine, scale: 1.0 });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TreeColumnOutOfRange { index: 256, columns: 256 })
        ));
    }

    #[test]
    fn rejects_degenerate_tree_scale() {
        for scale in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let mut config = WorldConfig::default();
            config.trees[0].scale = scale;
            assert!(matches!(config.validate(), Err(ConfigError::InvalidTreeScale(_))), "scale {scale}");
        }
    }

    #[test]
    fn rejects_degenerate_noise() {
        let mut config = WorldConfig::default();
        config.noise.octaves = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidNoise(_))));

        let mut config = WorldConfig::default();
        config.noise.frequency = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidNoise(_))));
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = "
height_scale: 12
chunk:
  side: 8
  fill: solid
trees:
  - column: 10
    kind: broadleaf
";
        let config: WorldConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.height_scale, 12);
        assert_eq!(config.height_scale_max, 30);
        assert_eq!(config.chunk.side, 8);
        assert_eq!(config.chunk.fill, FillMode::Solid);
        assert_eq!(config.chunk.floor_y, -20.0);
        assert_eq!(config.trees.len(), 1);
        assert_eq!(config.trees[0].scale, 1.0);
        config.validate().unwrap();
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = WorldConfig::load("/definitely/not/here.yaml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
