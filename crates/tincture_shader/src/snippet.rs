//! Code Snippets
//!
//! A [`ShaderSnippet`] is the static descriptor of one shading primitive:
//! its name, the uniforms and textures it reads, what it needs from its
//! environment, how many children it composes, and the two generator
//! callbacks that turn a node of that snippet into program text.
//!
//! Built-in snippets and snippets registered at runtime share this one
//! descriptor type; generators are plain `fn` pointers so a new snippet only
//! supplies data plus two functions.

use std::borrow::Cow;
use std::sync::Arc;

use bitflags::bitflags;
use tincture_core::{TextureAndSampler, Uniform};

use crate::node::ShaderNode;
use crate::shader_info::ShaderInfo;

bitflags! {
    /// What a snippet needs from the code around it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SnippetRequirementFlags: u32 {
        const NONE               = 0;
        const LOCAL_COORDS       = 1 << 0;
        const PRIOR_STAGE_OUTPUT = 1 << 1;
        const BLENDER_DST_COLOR  = 1 << 2;
        const PRIMITIVE_COLOR    = 1 << 3;
    }
}

/// Expressions a node is invoked with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetArgs {
    pub prior_stage_output: String,
    pub blender_dst_color: String,
    pub local_coords: String,
}

impl SnippetArgs {
    /// The parameters of a generated helper function.
    #[must_use]
    pub fn helper_params() -> Self {
        Self {
            prior_stage_output: "inColor".to_string(),
            blender_dst_color: "destColor".to_string(),
            local_coords: "coords".to_string(),
        }
    }

    #[must_use]
    pub fn with_prior_stage_output(&self, prior_stage_output: impl Into<String>) -> Self {
        Self {
            prior_stage_output: prior_stage_output.into(),
            ..self.clone()
        }
    }
}

/// Interpretation of one payload word, used for labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadType {
    U32,
    I32,
    F32,
    BlendMode,
}

/// One word of fixed data stored in the key after a block's snippet id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PayloadField {
    pub name: &'static str,
    pub ty: PayloadType,
}

impl PayloadField {
    #[must_use]
    pub const fn new(name: &'static str, ty: PayloadType) -> Self {
        Self { name, ty }
    }
}

/// Produces the expression that evaluates `node` given `args`.
pub type GenerateExpressionFn = fn(&ShaderInfo, &ShaderNode, &SnippetArgs) -> String;

/// Produces helper definitions `node` needs in the program preamble.
pub type GeneratePreambleFn = fn(&ShaderInfo, &ShaderNode) -> String;

/// Static descriptor of one shading primitive.
#[derive(Debug, Clone)]
pub struct ShaderSnippet {
    /// Base name; mangled with the node index for generated identifiers.
    pub name: Cow<'static, str>,
    /// The implementation function leaf invocations call.
    pub static_function_name: Cow<'static, str>,
    pub requirement_flags: SnippetRequirementFlags,
    pub uniforms: Cow<'static, [Uniform]>,
    /// When set, the uniforms are declared as one nested struct of this type.
    pub uniform_struct_name: Option<&'static str>,
    pub textures_and_samplers: Cow<'static, [TextureAndSampler]>,
    pub num_children: usize,
    pub data_payload: Cow<'static, [PayloadField]>,
    pub expression_generator: GenerateExpressionFn,
    pub preamble_generator: Option<GeneratePreambleFn>,
    /// Function body of a runtime-registered program.
    pub program_body: Option<Arc<str>>,
}

impl ShaderSnippet {
    #[inline]
    #[must_use]
    pub fn needs_local_coords(&self) -> bool {
        self.requirement_flags
            .contains(SnippetRequirementFlags::LOCAL_COORDS)
    }

    #[inline]
    #[must_use]
    pub fn needs_prior_stage_output(&self) -> bool {
        self.requirement_flags
            .contains(SnippetRequirementFlags::PRIOR_STAGE_OUTPUT)
    }

    #[inline]
    #[must_use]
    pub fn needs_blender_dst_color(&self) -> bool {
        self.requirement_flags
            .contains(SnippetRequirementFlags::BLENDER_DST_COLOR)
    }

    /// Key words following the snippet id.
    #[inline]
    #[must_use]
    pub fn payload_word_count(&self) -> usize {
        self.data_payload.len()
    }

    #[inline]
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.num_children == 0
    }
}

/// `base` made unique within one expansion by the node's index.
#[inline]
#[must_use]
pub fn mangle(base: &str, index: usize) -> String {
    format!("{base}_{index}")
}
