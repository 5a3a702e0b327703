//! The long-lived owner of everything shared between recordings.

use std::sync::Arc;

use tincture_core::Result;
use tincture_pipeline::{
    DeserializeError, GlobalPipelineCache, PipelineCompiler, PipelineDescription, PipelineManager,
};
use tincture_shader::{RenderStep, RenderStepRegistry, ShaderCodeDictionary, TextureDataCache, UniformDataCache};

use crate::options::ContextOptions;
use crate::recorder::Recorder;

/// Owns the shader code dictionary, the render step registry and the
/// pipeline manager for one device.
///
/// A context is shared by reference between recording threads; all of its
/// state is internally synchronized.
pub struct Context<C: PipelineCompiler> {
    options: ContextOptions,
    dictionary: Arc<ShaderCodeDictionary>,
    render_steps: Arc<RenderStepRegistry>,
    pipelines: PipelineManager<C>,
    uniform_data: UniformDataCache,
    texture_data: TextureDataCache,
}

impl<C: PipelineCompiler> Context<C> {
    pub fn new(compiler: C, options: ContextOptions) -> Result<Self> {
        options.validate()?;
        let dictionary = Arc::new(ShaderCodeDictionary::new());
        let render_steps = Arc::new(RenderStepRegistry::new());
        let pipelines = PipelineManager::new(
            compiler,
            Arc::clone(&dictionary),
            Arc::clone(&render_steps),
            Arc::new(GlobalPipelineCache::new()),
            options.manager_config(),
        );
        log::info!(
            "Context created (dual source: {}, advanced blend: {}, storage buffers: {})",
            options.caps.dual_source_blending,
            options.caps.hardware_advanced_blending,
            options.caps.storage_buffer_support,
        );
        Ok(Self {
            options,
            dictionary,
            render_steps,
            pipelines,
            uniform_data: UniformDataCache::new(),
            texture_data: TextureDataCache::new(),
        })
    }

    #[inline]
    #[must_use]
    pub fn options(&self) -> &ContextOptions {
        &self.options
    }

    #[inline]
    #[must_use]
    pub fn dictionary(&self) -> &Arc<ShaderCodeDictionary> {
        &self.dictionary
    }

    #[inline]
    #[must_use]
    pub fn render_steps(&self) -> &Arc<RenderStepRegistry> {
        &self.render_steps
    }

    #[inline]
    #[must_use]
    pub fn pipelines(&self) -> &PipelineManager<C> {
        &self.pipelines
    }

    #[inline]
    #[must_use]
    pub(crate) fn uniform_data(&self) -> &UniformDataCache {
        &self.uniform_data
    }

    #[inline]
    #[must_use]
    pub(crate) fn texture_data(&self) -> &TextureDataCache {
        &self.texture_data
    }

    pub fn register_render_step(&self, step: RenderStep) -> Arc<RenderStep> {
        self.render_steps.register(step)
    }

    #[must_use]
    pub fn recorder(&self) -> Recorder<'_, C> {
        Recorder::new(self)
    }

    /// Compiles every description in a persisted blob list, skipping blobs
    /// that fail to decode. Returns how many pipelines are available
    /// afterwards.
    pub fn precompile_serialized<'b>(&self, blobs: impl IntoIterator<Item = &'b [u8]>) -> usize {
        blobs
            .into_iter()
            .filter_map(|bytes| match self.decode(bytes) {
                Ok(desc) => self.pipelines.precompile(&desc),
                Err(e) => {
                    log::warn!("Skipping persisted pipeline: {e}");
                    None
                }
            })
            .count()
    }

    fn decode(&self, bytes: &[u8]) -> std::result::Result<PipelineDescription, DeserializeError> {
        tincture_pipeline::deserialize(bytes, &self.dictionary)
    }
}
