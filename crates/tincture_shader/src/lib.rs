//! # Tincture Shader
//!
//! Paint program keys and the code generator that turns them back into
//! GPU programs.
//!
//! - [`key`]: the flat block encoding of a paint and its builder
//! - [`snippet`], [`builtins`], [`runtime_effect`]: shading primitives
//! - [`dictionary`]: interning of keys and registration of snippets
//! - [`node`], [`shader_info`]: expansion of an interned key into program text
//! - [`caps`], [`render_step`], [`render_pass`]: what the generator targets
//! - [`data`], [`key_helpers`]: per-draw uniform and texture gathering

pub mod builtins;
pub mod caps;
pub mod data;
pub mod dictionary;
pub mod key;
pub mod key_helpers;
pub mod node;
pub mod render_pass;
pub mod render_step;
pub mod runtime_effect;
pub mod shader_info;
pub mod snippet;
mod templates;

pub use builtins::{BuiltInCodeSnippetId, GradientType};
pub use caps::{Caps, DstReadStrategy, ResourceBindingRequirements};
pub use data::{
    DataBlockCache, PipelineDataGatherer, SamplerDesc, TextureDataBlock, TextureDataCache,
    TextureProxyId, UniformDataCache,
};
pub use dictionary::ShaderCodeDictionary;
pub use key::{PaintProgramKey, PaintProgramKeyBuilder, UniquePaintProgramId, describe_key, validate_key_words};
pub use key_helpers::KeyContext;
pub use node::{NodeId, ShaderNode};
pub use render_pass::{RenderPassDesc, Swizzle};
pub use render_step::{
    Attribute, Coverage, DepthStencilSettings, RenderStep, RenderStepId, RenderStepRegistry,
    StencilFace, Varying,
};
pub use runtime_effect::{RuntimeEffect, RuntimeEffectKind};
pub use shader_info::ShaderInfo;
pub use snippet::{ShaderSnippet, SnippetArgs, SnippetRequirementFlags};
