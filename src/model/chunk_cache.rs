use std::collections::HashMap;

use glam::Vec3;

use super::chunk_block::ChunkBlock;
use super::chunk_window::ChunkWindow;
use super::modes::ColourMode;
use super::noise_field::HeightSource;
use crate::config::ChunkConfig;

/// Inputs besides the origin that change what a chunk build produces
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BuildParams {
    pub height_scale: u32,
    pub colour_mode: ColourMode,
}

/// Bit pattern of a chunk origin. Origins only ever move by whole chunk sides,
/// so equal positions have equal bits (after folding -0.0 into 0.0).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OriginKey([u32; 3]);

impl From<Vec3> for OriginKey {
    fn from(v: Vec3) -> Self {
        OriginKey([(v.x + 0.0).to_bits(), (v.y + 0.0).to_bits(), (v.z + 0.0).to_bits()])
    }
}

/// Where a chunk handed out by `ChunkSource::fetch` came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fetch {
    Built,
    Cached,
}

/// Built chunks keyed by origin.
///
/// All entries were built with the same `BuildParams`; asking for different
/// params drops everything. Shifts evict whatever fell out of the window.
pub struct ChunkCache {
    chunk: ChunkConfig,
    params: Option<BuildParams>,
    entries: HashMap<OriginKey, ChunkBlock>,
}

impl ChunkCache {
    pub fn new(chunk: ChunkConfig) -> Self {
        Self {
            chunk,
            params: None,
            entries: HashMap::new(),
        }
    }

    pub fn get_or_build<H: HeightSource + ?Sized>(
        &mut self,
        origin: Vec3,
        params: BuildParams,
        source: &H,
    ) -> (&ChunkBlock, Fetch) {
        if self.params != Some(params) {
            if !self.entries.is_empty() {
                tracing::debug!("build params changed to {:?}, dropping {} cached chunks", params, self.entries.len());
            }
            self.entries.clear();
            self.params = Some(params);
        }

        let config = &self.chunk;
        let mut fetch = Fetch::Cached;
        let block = self.entries.entry(OriginKey::from(origin)).or_insert_with(|| {
            fetch = Fetch::Built;
            let mut block = ChunkBlock::new(config);
            block.build(origin, params.height_scale, params.colour_mode, source);
            block
        });
        (&*block, fetch)
    }

    /// Drop every chunk that is no longer one of the window's cells
    pub fn retain_window(&mut self, window: &ChunkWindow) {
        let keep: Vec<OriginKey> = window.origins().iter().copied().map(OriginKey::from).collect();
        let before = self.entries.len();
        self.entries.retain(|key, _| keep.contains(key));
        let evicted = before - self.entries.len();
        if evicted > 0 {
            tracing::debug!("evicted {evicted} chunks after window shift");
        }
    }

    pub fn contains(&self, origin: Vec3) -> bool {
        self.entries.contains_key(&OriginKey::from(origin))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.params = None;
    }
}

/// How the composer obtains chunk instance data: a single block rebuilt for
/// every cell every frame, or the origin-keyed cache.
pub enum ChunkSource {
    Rebuild(ChunkBlock),
    Cached(ChunkCache),
}

impl ChunkSource {
    pub fn new(chunk: &ChunkConfig, cache: bool) -> Self {
        if cache {
            ChunkSource::Cached(ChunkCache::new(*chunk))
        } else {
            ChunkSource::Rebuild(ChunkBlock::new(chunk))
        }
    }

    pub fn fetch<H: HeightSource + ?Sized>(
        &mut self,
        origin: Vec3,
        params: BuildParams,
        source: &H,
    ) -> (&ChunkBlock, Fetch) {
        match self {
            ChunkSource::Rebuild(block) => {
                block.build(origin, params.height_scale, params.colour_mode, source);
                (&*block, Fetch::Built)
            }
            ChunkSource::Cached(cache) => cache.get_or_build(origin, params, source),
        }
    }

    /// Called after the window moved
    pub fn on_shift(&mut self, window: &ChunkWindow) {
        if let ChunkSource::Cached(cache) = self {
            cache.retain_window(window);
        }
    }

    pub fn invalidate(&mut self) {
        if let ChunkSource::Cached(cache) = self {
            cache.clear();
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, ChunkSource::Cached(_))
    }
}
