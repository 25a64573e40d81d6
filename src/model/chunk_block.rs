use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use super::modes::ColourMode;
use super::noise_field::HeightSource;
use super::palette::voxel_color;
use crate::config::{ChunkConfig, FillMode};

/// One voxel as uploaded to the GPU: world position of its min corner and its colour
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct VoxelInstance {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl VoxelInstance {
    pub fn translation(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }
}

/// Surface height of a column: `floor(height_scale * noise)` clamped to `[min, max]`
pub fn column_height(height_scale: u32, noise: f64, min: i32, max: i32) -> i32 {
    let h = (height_scale as f64 * noise).floor();
    (h as i32).clamp(min, max)
}

/// Instance data of a single chunk, rebuilt for whatever origin it is asked for.
///
/// Columns are visited `ix` outer, `iz` inner, so column `(ix, iz)` has the
/// flattened index `ix * side + iz`. In `FillMode::Surface` that is also the
/// instance index; in `FillMode::Solid` use `column_top` to find it.
#[derive(Clone, Debug)]
pub struct ChunkBlock {
    side: usize,
    min_height: i32,
    max_height: i32,
    fill: FillMode,

    origin: Vec3,
    instances: Vec<VoxelInstance>,

    // per column: surface height and the instance index of its top voxel
    heights: Vec<i32>,
    column_tops: Vec<usize>,
}

impl ChunkBlock {
    pub fn new(config: &ChunkConfig) -> Self {
        let columns = config.columns();
        Self {
            side: config.side,
            min_height: config.min_height,
            max_height: config.max_height(),
            fill: config.fill,
            origin: Vec3::ZERO,
            instances: Vec::with_capacity(columns),
            heights: Vec::with_capacity(columns),
            column_tops: Vec::with_capacity(columns),
        }
    }

    /// Regenerate every column for a chunk anchored at `origin`.
    /// Noise is sampled at world coordinates, so the result depends only on
    /// the arguments and never on which chunk was built before.
    pub fn build<H: HeightSource + ?Sized>(
        &mut self,
        origin: Vec3,
        height_scale: u32,
        colour_mode: ColourMode,
        source: &H,
    ) -> &[VoxelInstance] {
        self.origin = origin;
        self.instances.clear();
        self.heights.clear();
        self.column_tops.clear();

        for ix in 0..self.side {
            for iz in 0..self.side {
                let world_x = origin.x as f64 + ix as f64;
                let world_z = origin.z as f64 + iz as f64;
                let h = column_height(
                    height_scale,
                    source.height(world_x, world_z),
                    self.min_height,
                    self.max_height,
                );
                self.heights.push(h);

                let bottom = match self.fill {
                    FillMode::Surface => h,
                    FillMode::Solid => self.min_height,
                };
                for iy in bottom..=h {
                    self.instances.push(VoxelInstance {
                        position: [
                            origin.x + ix as f32,
                            origin.y + iy as f32,
                            origin.z + iz as f32,
                        ],
                        color: voxel_color(iy, self.min_height, self.max_height, colour_mode),
                    });
                }
                self.column_tops.push(self.instances.len() - 1);
            }
        }

        tracing::trace!(
            "built chunk at ({:.1}, {:.1}, {:.1}) with {} instances",
            origin.x, origin.y, origin.z, self.instances.len()
        );

        &self.instances
    }

    pub fn instances(&self) -> &[VoxelInstance] {
        &self.instances
    }

    /// World-space positions of the instances, in build order
    pub fn translations(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.instances.iter().map(VoxelInstance::translation)
    }

    pub fn translation(&self, index: usize) -> Option<Vec3> {
        self.instances.get(index).map(VoxelInstance::translation)
    }

    pub fn column_index(&self, ix: usize, iz: usize) -> usize {
        ix * self.side + iz
    }

    /// Surface height of column `(ix, iz)` from the last build
    pub fn column_height(&self, ix: usize, iz: usize) -> Option<i32> {
        if ix >= self.side || iz >= self.side {
            return None;
        }
        self.heights.get(self.column_index(ix, iz)).copied()
    }

    /// Position of the top voxel of a flattened column
    pub fn column_top(&self, column: usize) -> Option<Vec3> {
        self.column_tops.get(column).and_then(|&idx| self.translation(idx))
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn columns(&self) -> usize {
        self.side * self.side
    }
}
