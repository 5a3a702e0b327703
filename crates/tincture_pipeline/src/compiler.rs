//! The backend capability that turns generated programs into pipelines.

use tincture_shader::{RenderStep, ShaderInfo};

use crate::description::PipelineDescription;

/// Everything a backend needs to build one pipeline.
#[derive(Debug, Clone, Copy)]
pub struct PipelineProgram<'a> {
    pub description: &'a PipelineDescription,
    pub shader_info: &'a ShaderInfo,
    pub render_step: &'a RenderStep,
    /// Present when pipeline labelling is enabled.
    pub label: Option<&'a str>,
}

impl PipelineProgram<'_> {
    /// The color target state for `wgpu`. `None` blend means the blend
    /// equation has no `wgpu` counterpart.
    #[must_use]
    pub fn color_target(&self) -> wgpu::ColorTargetState {
        let blend_info = self.shader_info.blend_info();
        wgpu::ColorTargetState {
            format: self.description.render_pass.color_format,
            blend: blend_info.to_wgpu(),
            write_mask: blend_info.color_writes(),
        }
    }

    #[must_use]
    pub fn stencil_state(&self) -> wgpu::StencilState {
        self.render_step.depth_stencil().stencil_state()
    }
}

/// Compiles generated programs into backend pipelines. Returning `None`
/// marks the pipeline as failed; it is not retried.
pub trait PipelineCompiler: Send + Sync {
    type Pipeline: Send + Sync;

    fn compile(&self, program: &PipelineProgram<'_>) -> Option<Self::Pipeline>;
}
