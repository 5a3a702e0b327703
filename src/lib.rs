//! # Tincture
//!
//! Compiles 2D paints into GPU programs and shares the resulting pipelines
//! across recording threads.
//!
//! A draw is described by a render step (geometry and coverage) and a paint
//! program key (shading, blending and clipping). The key is interned in the
//! [`ShaderCodeDictionary`], expanded into program text by [`ShaderInfo`] and
//! compiled once per pipeline description by the [`PipelineManager`].
//!
//! The member crates are re-exported for convenience:
//!
//! - [`core`]: blend formulas, uniform layout and errors
//! - [`shader`]: keys, snippets, dictionary and program generation
//! - [`pipeline`]: pipeline descriptions, caching and serialization

pub mod context;
pub mod options;
pub mod recorder;

pub use tincture_core as core;
pub use tincture_pipeline as pipeline;
pub use tincture_shader as shader;

pub use context::Context;
pub use options::ContextOptions;
pub use recorder::{DrawRecord, Recorder, ResolvedDraw};

pub use tincture_core::{BlendInfo, BlendMode, Layout, Result, TinctureError, UniformDataBlock};
pub use tincture_pipeline::{
    PipelineCompiler, PipelineDescription, PipelineHandle, PipelineManager, PipelineProgram,
};
pub use tincture_shader::{
    Caps, DstReadStrategy, KeyContext, PaintProgramKeyBuilder, PipelineDataGatherer, RenderPassDesc, RenderStep,
    RenderStepId, ShaderCodeDictionary, ShaderInfo, UniquePaintProgramId, key_helpers,
};
