//! Recorder
//!
//! The gather pass of a frame. Each recorded draw builds its paint program
//! key and data through the key helpers, interns both, and requests a
//! pipeline handle without waiting for compilation.
//!
//! ```rust,ignore
//! let mut recorder = context.recorder();
//! recorder.record_draw(FILL, &pass, paint_color, |ctx, builder, gatherer| {
//!     key_helpers::add_solid_color(ctx, builder, gatherer, color);
//!     key_helpers::add_fixed_blend(builder, BlendMode::SrcOver, false);
//! })?;
//! let draws = recorder.resolve();
//! ```

use std::sync::Arc;

use glam::Vec4;
use tincture_core::{Result, TinctureError, UniformDataBlock};
use tincture_pipeline::{PipelineCompiler, PipelineDescription, PipelineHandle};
use tincture_shader::{
    KeyContext, PaintProgramKeyBuilder, PipelineDataGatherer, RenderPassDesc, RenderStepId, TextureDataBlock,
    UniquePaintProgramId,
};

use crate::context::Context;

/// One gathered draw whose pipeline may still be compiling.
#[derive(Debug)]
pub struct DrawRecord<P> {
    pub description: PipelineDescription,
    pub pipeline: PipelineHandle<P>,
    pub uniforms: Option<Arc<UniformDataBlock>>,
    pub textures: Option<Arc<TextureDataBlock>>,
}

/// A draw ready for submission.
#[derive(Debug)]
pub struct ResolvedDraw<P> {
    pub description: PipelineDescription,
    pub pipeline: Arc<P>,
    pub uniforms: Option<Arc<UniformDataBlock>>,
    pub textures: Option<Arc<TextureDataBlock>>,
}

pub struct Recorder<'c, C: PipelineCompiler> {
    context: &'c Context<C>,
    builder: PaintProgramKeyBuilder<'c>,
    gatherer: PipelineDataGatherer,
    draws: Vec<DrawRecord<C::Pipeline>>,
}

impl<'c, C: PipelineCompiler> Recorder<'c, C> {
    pub(crate) fn new(context: &'c Context<C>) -> Self {
        Self {
            context,
            builder: PaintProgramKeyBuilder::new(context.dictionary()),
            gatherer: PipelineDataGatherer::new(context.options().caps.paint_uniform_layout()),
            draws: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn draws(&self) -> &[DrawRecord<C::Pipeline>] {
        &self.draws
    }

    /// Records one draw. `build` adds the paint's blocks; it is skipped for
    /// steps that do not shade. Returns the index of the draw.
    pub fn record_draw<F>(
        &mut self,
        render_step: RenderStepId,
        render_pass: &RenderPassDesc,
        paint_color: Vec4,
        build: F,
    ) -> Result<usize>
    where
        F: FnOnce(&KeyContext<'_>, &mut PaintProgramKeyBuilder<'_>, &mut PipelineDataGatherer),
    {
        let step = self
            .context
            .render_steps()
            .get(render_step)
            .ok_or(TinctureError::UnknownRenderStep(render_step.as_u32()))?;

        self.builder.reset();
        self.gatherer.reset();

        let paint_id = if step.performs_shading() {
            let ctx = KeyContext::new(self.context.dictionary(), paint_color);
            build(&ctx, &mut self.builder, &mut self.gatherer);
            self.context.dictionary().find_or_create(self.builder.lock_as_key())
        } else {
            UniquePaintProgramId::INVALID
        };

        let (uniforms, textures) = self.gatherer.finish();
        let description = PipelineDescription::new(render_step, paint_id, *render_pass);
        self.draws.push(DrawRecord {
            description,
            pipeline: self.context.pipelines().request(&description),
            uniforms: uniforms.map(|block| self.context.uniform_data().insert(block)),
            textures: textures.map(|block| self.context.texture_data().insert(block)),
        });
        Ok(self.draws.len() - 1)
    }

    /// Waits for every pipeline, compiling the ones nobody has started.
    /// Draws whose pipeline failed are dropped.
    #[must_use]
    pub fn resolve(self) -> Vec<ResolvedDraw<C::Pipeline>> {
        let pipelines = self.context.pipelines();
        self.draws
            .into_iter()
            .filter_map(|draw| {
                let Some(pipeline) = pipelines.resolve(&draw.pipeline) else {
                    log::warn!(
                        "Dropping draw: no pipeline for step {} / paint {}",
                        draw.description.render_step.as_u32(),
                        draw.description.paint_id.as_u32()
                    );
                    return None;
                };
                Some(ResolvedDraw {
                    description: draw.description,
                    pipeline,
                    uniforms: draw.uniforms,
                    textures: draw.textures,
                })
            })
            .collect()
    }
}
