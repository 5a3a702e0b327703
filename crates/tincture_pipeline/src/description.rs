//! Pipeline descriptions and the keys they are cached under.
//!
//! A [`PipelineDescription`] names a pipeline without referring to any GPU
//! resource: the render step that draws, the paint program that shades, and
//! the render pass being drawn into.

use std::hash::{Hash, Hasher};

use tincture_shader::{DstReadStrategy, RenderPassDesc, RenderStepId, UniquePaintProgramId};

/// Everything that determines one compiled pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineDescription {
    pub render_step: RenderStepId,
    pub paint_id: UniquePaintProgramId,
    pub render_pass: RenderPassDesc,
}

impl PipelineDescription {
    #[must_use]
    pub fn new(render_step: RenderStepId, paint_id: UniquePaintProgramId, render_pass: RenderPassDesc) -> Self {
        Self {
            render_step,
            paint_id,
            render_pass,
        }
    }

    #[must_use]
    pub fn cache_key(&self) -> PipelineCacheKey {
        PipelineCacheKey {
            render_step: self.render_step.as_u32(),
            paint_id: self.paint_id.as_u32(),
            color_format: self.render_pass.color_format,
            sample_count: self.render_pass.sample_count,
            write_swizzle: self.render_pass.write_swizzle.to_u32(),
            dst_read_strategy: self.render_pass.dst_read_strategy,
        }
    }
}

/// Flattened, hashable identity of a [`PipelineDescription`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineCacheKey {
    pub render_step: u32,
    pub paint_id: u32,
    pub color_format: wgpu::TextureFormat,
    pub sample_count: u32,
    pub write_swizzle: u32,
    pub dst_read_strategy: DstReadStrategy,
}

impl PipelineCacheKey {
    /// Short hash for log lines.
    #[must_use]
    pub fn fx_hash(&self) -> u64 {
        let mut hasher = rustc_hash::FxHasher::default();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_descriptions_share_a_key() {
        let a = PipelineDescription::new(RenderStepId(3), UniquePaintProgramId::from_raw(1), RenderPassDesc::default());
        let b = a;
        assert_eq!(a.cache_key(), b.cache_key());
        assert_eq!(a.cache_key().fx_hash(), b.cache_key().fx_hash());

        let other_pass = RenderPassDesc {
            sample_count: 4,
            ..RenderPassDesc::default()
        };
        let c = PipelineDescription::new(RenderStepId(3), UniquePaintProgramId::from_raw(1), other_pass);
        assert_ne!(a.cache_key(), c.cache_key());
    }
}
