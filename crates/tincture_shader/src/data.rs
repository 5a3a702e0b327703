//! Draw Data
//!
//! Per-draw uniform bytes and sampled textures produced alongside a paint
//! program key, and the caches that intern them.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use tincture_core::{Layout, UniformDataBlock, UniformManager};
use xxhash_rust::xxh3::Xxh3;

/// Opaque handle to a texture owned by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureProxyId(pub u64);

/// Sampling state for one texture binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerDesc {
    pub address_mode_u: wgpu::AddressMode,
    pub address_mode_v: wgpu::AddressMode,
    pub filter: wgpu::FilterMode,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            filter: wgpu::FilterMode::Nearest,
        }
    }
}

/// Ordered textures one draw samples, with a precomputed hash.
#[derive(Debug, Clone)]
pub struct TextureDataBlock {
    textures: SmallVec<[(TextureProxyId, SamplerDesc); 2]>,
    hash: u64,
}

impl TextureDataBlock {
    #[must_use]
    pub fn new(textures: SmallVec<[(TextureProxyId, SamplerDesc); 2]>) -> Self {
        let mut hasher = Xxh3::new();
        textures.hash(&mut hasher);
        Self {
            hash: hasher.finish(),
            textures,
        }
    }

    #[inline]
    #[must_use]
    pub fn textures(&self) -> &[(TextureProxyId, SamplerDesc)] {
        &self.textures
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

impl PartialEq for TextureDataBlock {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.textures == other.textures
    }
}

impl Eq for TextureDataBlock {}

impl Hash for TextureDataBlock {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

// ─── Gatherer ────────────────────────────────────────────────────────────────

/// Collects one draw's uniforms and textures while its key is built.
#[derive(Debug)]
pub struct PipelineDataGatherer {
    uniforms: UniformManager,
    textures: SmallVec<[(TextureProxyId, SamplerDesc); 2]>,
}

impl PipelineDataGatherer {
    #[must_use]
    pub fn new(layout: Layout) -> Self {
        Self {
            uniforms: UniformManager::new(layout),
            textures: SmallVec::new(),
        }
    }

    #[inline]
    pub fn uniforms(&mut self) -> &mut UniformManager {
        &mut self.uniforms
    }

    pub fn add_texture(&mut self, texture: TextureProxyId, sampler: SamplerDesc) {
        self.textures.push((texture, sampler));
    }

    pub fn reset(&mut self) {
        self.uniforms.reset();
        self.textures.clear();
    }

    /// Finishes the draw; either block is `None` when nothing was written.
    pub fn finish(&mut self) -> (Option<UniformDataBlock>, Option<TextureDataBlock>) {
        let uniforms = (!self.uniforms.is_empty()).then(|| self.uniforms.finish());
        let textures = (!self.textures.is_empty())
            .then(|| TextureDataBlock::new(std::mem::take(&mut self.textures)));
        self.reset();
        (uniforms, textures)
    }
}

// ─── Caches ──────────────────────────────────────────────────────────────────

/// Interns values so that equal blocks share one allocation. Entries live
/// until the cache is dropped.
#[derive(Debug)]
pub struct DataBlockCache<T> {
    blocks: Mutex<FxHashSet<Arc<T>>>,
}

impl<T> Default for DataBlockCache<T> {
    fn default() -> Self {
        Self {
            blocks: Mutex::new(FxHashSet::default()),
        }
    }
}

impl<T: Hash + Eq> DataBlockCache<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the canonical copy of `block`.
    pub fn insert(&self, block: T) -> Arc<T> {
        let mut blocks = self.blocks.lock();
        if let Some(existing) = blocks.get(&block) {
            return Arc::clone(existing);
        }
        let block = Arc::new(block);
        blocks.insert(Arc::clone(&block));
        block
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.lock().is_empty()
    }
}

pub type UniformDataCache = DataBlockCache<UniformDataBlock>;
pub type TextureDataCache = DataBlockCache<TextureDataBlock>;

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn equal_uniform_blocks_share_an_allocation() {
        let cache = UniformDataCache::new();
        let mut gatherer = PipelineDataGatherer::new(Layout::Std140);
        gatherer.uniforms().write_vec4(Vec4::ONE);
        let (a, _) = gatherer.finish();
        gatherer.uniforms().write_vec4(Vec4::ONE);
        let (b, _) = gatherer.finish();

        let a = cache.insert(a.unwrap());
        let b = cache.insert(b.unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn texture_order_matters() {
        let sampler = SamplerDesc::default();
        let ab = TextureDataBlock::new(SmallVec::from_slice(&[
            (TextureProxyId(1), sampler),
            (TextureProxyId(2), sampler),
        ]));
        let ba = TextureDataBlock::new(SmallVec::from_slice(&[
            (TextureProxyId(2), sampler),
            (TextureProxyId(1), sampler),
        ]));
        assert_ne!(ab, ba);
    }

    #[test]
    fn empty_draws_produce_no_blocks() {
        let mut gatherer = PipelineDataGatherer::new(Layout::Std430);
        let (uniforms, textures) = gatherer.finish();
        assert!(uniforms.is_none());
        assert!(textures.is_none());
    }
}
