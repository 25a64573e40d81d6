use glam::{Mat3, Mat4, Vec3};

use crate::config::{TreeKind, TreePlacement, WorldConfig};
use crate::model::{
    BuildParams, CameraState, ChunkSource, ChunkWindow, ColourMode, DrawMode, Fetch, HeightSource,
    NoiseField, RenderModes, VoxelInstance,
};

/// Uniform scale of the skybox cube
pub const SKYBOX_SCALE: f32 = 200.0;

/// Everything the GPU side needs to draw a frame, in the order the composer
/// emits it: one skybox, one terrain pass, then chunks each followed by its trees.
pub trait RenderBackend {
    fn draw_skybox(&mut self, pass: &SkyboxPass);
    fn begin_terrain(&mut self, pass: &TerrainPass);
    fn draw_chunk(&mut self, instances: &[VoxelInstance]);
    fn draw_tree(&mut self, tree: &TreeInstance);
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SkyboxPass {
    /// rotation only, the sky never gets closer
    pub view: Mat4,
    pub projection: Mat4,
    pub model: Mat4,
    pub colour_mode: ColourMode,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TerrainPass {
    pub view: Mat4,
    pub light_view: Mat4,
    pub projection: Mat4,
    pub colour_mode: ColourMode,
    pub draw_mode: DrawMode,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TreeInstance {
    pub kind: TreeKind,
    pub model: Mat4,
    /// transforms normals into light-view space
    pub normal: Mat3,
}

/// Immutable per-frame input handed over by the frame loop
#[derive(Clone, Copy, Debug)]
pub struct FrameInput {
    pub camera: CameraState,
    pub light_view: Mat4,
    pub projection: Mat4,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub shifts: usize,
    pub chunks_built: usize,
    pub cache_hits: usize,
    pub instances: usize,
    pub trees: usize,
}

/// Fixed sun "camera" the tree lighting is computed in
pub fn default_light_view() -> Mat4 {
    Mat4::look_at_rh(Vec3::new(-8.0, 4.0, 2.0), Vec3::new(1.0, 0.0, 1.0), Vec3::new(1.0, 1.0, 1.0))
}

/// Drives one frame of the world: moves the chunk window with the camera,
/// then feeds skybox, chunks and trees to a `RenderBackend`.
///
/// Usage:
///   let mut composer = SceneComposer::new(&config, modes);
///   composer.on_input_changed(input.modes);
///   let stats = composer.on_frame(&mut backend, &frame_input);
pub struct SceneComposer {
    window: ChunkWindow,
    chunks: ChunkSource,
    source: Box<dyn HeightSource>,
    trees: Vec<TreePlacement>,
    modes: RenderModes,
}

impl SceneComposer {
    pub fn new(config: &WorldConfig, modes: RenderModes) -> Self {
        Self::with_source(config, modes, Box::new(NoiseField::new(config.noise)))
    }

    /// `config` is expected to have passed `WorldConfig::validate`
    pub fn with_source(config: &WorldConfig, modes: RenderModes, source: Box<dyn HeightSource>) -> Self {
        let camera = Vec3::from_array(config.camera.position);
        let window = ChunkWindow::new(config.chunk.side, config.chunk.floor_y, camera);
        tracing::info!(
            "scene ready: chunk side {}, window center {:?}, {} trees per chunk, cache {}",
            config.chunk.side,
            window.center(),
            config.trees.len(),
            if config.cache_chunks { "on" } else { "off" }
        );

        Self {
            window,
            chunks: ChunkSource::new(&config.chunk, config.cache_chunks),
            source,
            trees: config.trees.clone(),
            modes,
        }
    }

    /// Apply new modes; they take effect from the next frame on
    pub fn on_input_changed(&mut self, modes: RenderModes) {
        if modes == self.modes {
            return;
        }
        if modes.height_scale != self.modes.height_scale || modes.colour_mode != self.modes.colour_mode {
            self.chunks.invalidate();
        }
        tracing::info!("render modes changed: {:?}", modes);
        self.modes = modes;
    }

    pub fn on_frame<B: RenderBackend + ?Sized>(&mut self, backend: &mut B, input: &FrameInput) -> FrameStats {
        let mut stats = FrameStats::default();

        let plan = self.window.update(input.camera.position);
        if !plan.is_empty() {
            stats.shifts = plan.len();
            self.chunks.on_shift(&self.window);
        }

        backend.draw_skybox(&SkyboxPass {
            view: input.camera.rotation_only_view(),
            projection: input.projection,
            model: Mat4::from_scale(Vec3::splat(SKYBOX_SCALE)),
            colour_mode: self.modes.colour_mode,
        });

        backend.begin_terrain(&TerrainPass {
            view: input.camera.view(),
            light_view: input.light_view,
            projection: input.projection,
            colour_mode: self.modes.colour_mode,
            draw_mode: self.modes.draw_mode,
        });

        let params = BuildParams {
            height_scale: self.modes.height_scale,
            colour_mode: self.modes.colour_mode,
        };

        for origin in self.window.origins() {
            let (chunk, fetch) = self.chunks.fetch(*origin, params, self.source.as_ref());
            match fetch {
                Fetch::Built => stats.chunks_built += 1,
                Fetch::Cached => stats.cache_hits += 1,
            }

            let instances = chunk.instances();
            stats.instances += instances.len();
            backend.draw_chunk(instances);
            tracing::trace!("drew chunk at {:?} ({} instances)", origin, instances.len());

            for tree in &self.trees {
                let Some(top) = chunk.column_top(tree.column) else {
                    tracing::error!("tree column {} outside chunk of {} columns", tree.column, chunk.columns());
                    continue;
                };
                let model = Mat4::from_translation(top) * Mat4::from_scale(Vec3::splat(tree.scale));
                let normal = Mat3::from_mat4(input.light_view * model).inverse().transpose();
                backend.draw_tree(&TreeInstance { kind: tree.kind, model, normal });
                stats.trees += 1;
            }
        }

        stats
    }

    pub fn window(&self) -> &ChunkWindow {
        &self.window
    }

    pub fn modes(&self) -> RenderModes {
        self.modes
    }

    pub fn is_caching(&self) -> bool {
        self.chunks.is_cached()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{ConstantHeight, GridCell};
    use approx::assert_relative_eq;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum Call {
        Skybox(SkyboxPass),
        Terrain(TerrainPass),
        Chunk(Vec<VoxelInstance>),
        Tree(TreeInstance),
    }

    /// Backend double that remembers every call
    #[derive(Default)]
    pub(crate) struct RecordingBackend {
        pub calls: Vec<Call>,
    }

    impl RenderBackend for RecordingBackend {
        fn draw_skybox(&mut self, pass: &SkyboxPass) {
            self.calls.push(Call::Skybox(*pass));
        }
        fn begin_terrain(&mut self, pass: &TerrainPass) {
            self.calls.push(Call::Terrain(*pass));
        }
        fn draw_chunk(&mut self, instances: &[VoxelInstance]) {
            self.calls.push(Call::Chunk(instances.to_vec()));
        }
        fn draw_tree(&mut self, tree: &TreeInstance) {
            self.calls.push(Call::Tree(*tree));
        }
    }

    fn frame(position: Vec3) -> FrameInput {
        FrameInput {
            camera: CameraState::new(position, 0.3, -0.1),
            light_view: default_light_view(),
            projection: Mat4::perspective_rh(1.5, 1.0, 0.1, 100.0),
        }
    }

    fn composer(cache: bool) -> SceneComposer {
        let config = WorldConfig { cache_chunks: cache, ..WorldConfig::default() };
        SceneComposer::new(&config, RenderModes::new(10))
    }

    #[test]
    fn draw_order_is_sky_terrain_then_chunks_with_trees() {
        let mut composer = composer(false);
        let mut backend = RecordingBackend::default();
        let stats = composer.on_frame(&mut backend, &frame(Vec3::new(13.0, 0.0, 13.0)));

        let calls = &backend.calls;
        assert!(matches!(calls[0], Call::Skybox(_)));
        assert!(matches!(calls[1], Call::Terrain(_)));

        let per_chunk = 1 + 2;
        assert_eq!(calls.len(), 2 + 9 * per_chunk);
        for (i, group) in calls[2..].chunks(per_chunk).enumerate() {
            let Call::Chunk(instances) = &group[0] else { panic!("expected chunk at group {i}") };
            // first column of a surface chunk sits on the cell origin
            let origin = composer.window().origins()[i];
            assert_relative_eq!(instances[0].position[0], origin.x);
            assert_relative_eq!(instances[0].position[2], origin.z);
            assert!(group[1..].iter().all(|c| matches!(c, Call::Tree(_))));
        }

        assert_eq!(stats.chunks_built, 9);
        assert_eq!(stats.trees, 18);
        assert_eq!(stats.instances, 9 * 256);
    }

    #[test]
    fn trees_sit_on_their_column_tops() {
        let config = WorldConfig { cache_chunks: false, ..WorldConfig::default() };
        let mut composer = SceneComposer::with_source(&config, RenderModes::new(10), Box::new(ConstantHeight(0.5)));
        let mut backend = RecordingBackend::default();
        composer.on_frame(&mut backend, &frame(Vec3::new(13.0, 0.0, 13.0)));

        let center = composer.window().cell(GridCell::CENTER);
        let trees: Vec<&TreeInstance> = backend
            .calls
            .iter()
            .filter_map(|c| if let Call::Tree(t) = c { Some(t) } else { None })
            .collect();
        // center chunk is the fifth drawn, two trees each
        let pine = trees[4 * 2];
        let column = config.trees[0].column;
        let (ix, iz) = (column / 16, column % 16);
        let expected = center + Vec3::new(ix as f32, 5.0, iz as f32);
        assert_eq!(pine.kind, TreeKind::Pine);
        assert_eq!(pine.model.w_axis.truncate(), expected);
    }

    #[test]
    fn tree_normal_matrix_inverts_light_view_model() {
        let mut composer = composer(false);
        let mut backend = RecordingBackend::default();
        let input = frame(Vec3::new(13.0, 0.0, 13.0));
        composer.on_frame(&mut backend, &input);

        let tree = backend
            .calls
            .iter()
            .find_map(|c| if let Call::Tree(t) = c { Some(*t) } else { None })
            .unwrap();
        let product = tree.normal.transpose() * Mat3::from_mat4(input.light_view * tree.model);
        assert!(product.abs_diff_eq(Mat3::IDENTITY, 1e-4));
    }

    #[test]
    fn skybox_ignores_camera_translation() {
        let mut composer = composer(false);
        let mut near = RecordingBackend::default();
        let mut far = RecordingBackend::default();
        composer.on_frame(&mut near, &frame(Vec3::new(13.0, 0.0, 13.0)));
        composer.on_frame(&mut far, &frame(Vec3::new(14.0, 30.0, 12.0)));

        let (Call::Skybox(a), Call::Skybox(b)) = (&near.calls[0], &far.calls[0]) else { panic!("skybox not first") };
        assert_eq!(a.view, b.view);
        assert_eq!(a.model, Mat4::from_scale(Vec3::splat(SKYBOX_SCALE)));
    }

    #[test]
    fn cache_rebuilds_only_new_cells() {
        let mut composer = composer(true);
        let mut backend = RecordingBackend::default();

        let first = composer.on_frame(&mut backend, &frame(Vec3::new(13.0, 0.0, 13.0)));
        assert_eq!(first.chunks_built, 9);

        let still = composer.on_frame(&mut backend, &frame(Vec3::new(14.0, 0.0, 12.0)));
        assert_eq!((still.chunks_built, still.cache_hits, still.shifts), (0, 9, 0));

        // cross into the +X neighbour: one new column of three chunks
        let moved = composer.on_frame(&mut backend, &frame(Vec3::new(22.0, 0.0, 13.0)));
        assert_eq!((moved.shifts, moved.chunks_built, moved.cache_hits), (1, 3, 6));
    }

    #[test]
    fn mode_change_invalidates_cache() {
        let mut composer = composer(true);
        let mut backend = RecordingBackend::default();
        let input = frame(Vec3::new(13.0, 0.0, 13.0));
        composer.on_frame(&mut backend, &input);

        let mut modes = composer.modes();
        modes.draw_mode = modes.draw_mode.next();
        composer.on_input_changed(modes);
        assert_eq!(composer.on_frame(&mut backend, &input).cache_hits, 9);

        modes.height_scale = 11;
        composer.on_input_changed(modes);
        assert_eq!(composer.on_frame(&mut backend, &input).chunks_built, 9);
    }

    #[test]
    fn modes_reach_terrain_pass() {
        let mut composer = composer(false);
        let mut modes = composer.modes();
        modes.colour_mode = ColourMode::Contour;
        modes.draw_mode = DrawMode::Points;
        composer.on_input_changed(modes);

        let mut backend = RecordingBackend::default();
        composer.on_frame(&mut backend, &frame(Vec3::new(13.0, 0.0, 13.0)));
        let Call::Terrain(pass) = &backend.calls[1] else { panic!("terrain pass not second") };
        assert_eq!(pass.colour_mode, ColourMode::Contour);
        assert_eq!(pass.draw_mode, DrawMode::Points);
    }

    #[test]
    fn uncached_frames_rebuild_everything() {
        let mut composer = composer(false);
        let mut backend = RecordingBackend::default();
        for _ in 0..3 {
            let stats = composer.on_frame(&mut backend, &frame(Vec3::new(13.0, 0.0, 13.0)));
            assert_eq!(stats.chunks_built, 9);
            assert_eq!(stats.cache_hits, 0);
        }
    }
}
