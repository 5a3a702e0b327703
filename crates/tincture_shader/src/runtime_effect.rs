//! Runtime Effects
//!
//! Shading programs supplied at runtime as source text. A runtime effect is
//! registered with the dictionary once, becomes a user-defined snippet, and
//! is then keyed like any built-in block.
//!
//! The source is the body of a function with the parameters
//! `half4 inColor`, `half4 destColor` and `float2 coords`. Children are
//! available as `half4 child0`, `child1`, ... and uniforms by their declared
//! names; the generated helper renames them to the mangled paint uniforms.

use std::borrow::Cow;
use std::fmt::Write as _;
use std::sync::Arc;

use tincture_core::Uniform;
use xxhash_rust::xxh3::xxh3_64;

use crate::builtins::{emit_child_as, helper_call, helper_signature};
use crate::node::ShaderNode;
use crate::shader_info::ShaderInfo;
use crate::snippet::{ShaderSnippet, SnippetArgs, SnippetRequirementFlags};

/// Where a runtime effect plugs into a paint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeEffectKind {
    /// Produces color from local coordinates.
    Shader,
    /// Transforms the prior stage's color.
    ColorFilter,
    /// Combines the prior stage's color with the destination.
    Blender,
}

impl RuntimeEffectKind {
    #[must_use]
    pub const fn requirement_flags(self) -> SnippetRequirementFlags {
        match self {
            Self::Shader => SnippetRequirementFlags::LOCAL_COORDS,
            Self::ColorFilter => SnippetRequirementFlags::PRIOR_STAGE_OUTPUT,
            Self::Blender => SnippetRequirementFlags::PRIOR_STAGE_OUTPUT
                .union(SnippetRequirementFlags::BLENDER_DST_COLOR),
        }
    }
}

/// A shading program supplied as source text.
#[derive(Debug, Clone)]
pub struct RuntimeEffect {
    name: String,
    kind: RuntimeEffectKind,
    source: Arc<str>,
    uniforms: Vec<Uniform>,
    num_children: usize,
}

impl RuntimeEffect {
    #[must_use]
    pub fn new(kind: RuntimeEffectKind, name: impl Into<String>, source: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            kind,
            source: source.into(),
            uniforms: Vec::new(),
            num_children: 0,
        }
    }

    #[must_use]
    pub fn with_uniforms(mut self, uniforms: Vec<Uniform>) -> Self {
        self.uniforms = uniforms;
        self
    }

    /// Child effects evaluated before the body runs, available as `childN`.
    #[must_use]
    pub fn with_children(mut self, num_children: usize) -> Self {
        self.num_children = num_children;
        self
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> RuntimeEffectKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[inline]
    #[must_use]
    pub fn uniforms(&self) -> &[Uniform] {
        &self.uniforms
    }

    #[inline]
    #[must_use]
    pub fn num_children(&self) -> usize {
        self.num_children
    }

    #[must_use]
    pub fn content_hash(&self) -> u64 {
        xxh3_64(self.source.as_bytes())
    }

    /// Packed byte size of the uniforms, ignoring layout padding.
    #[must_use]
    pub fn uniform_size(&self) -> u32 {
        self.uniforms.iter().map(Uniform::packed_size).sum()
    }

    pub(crate) fn to_snippet(&self) -> ShaderSnippet {
        ShaderSnippet {
            name: Cow::Owned(sanitize_name(&self.name)),
            static_function_name: Cow::Borrowed(""),
            requirement_flags: self.kind.requirement_flags(),
            uniforms: Cow::Owned(self.uniforms.clone()),
            uniform_struct_name: None,
            textures_and_samplers: Cow::Borrowed(&[]),
            num_children: self.num_children,
            data_payload: Cow::Borrowed(&[]),
            expression_generator: runtime_effect_expression,
            preamble_generator: Some(runtime_effect_preamble),
            program_body: Some(Arc::clone(&self.source)),
        }
    }
}

fn sanitize_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if out.is_empty() {
        out.push_str("RuntimeEffect");
    } else if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

fn runtime_effect_expression(_: &ShaderInfo, node: &ShaderNode, args: &SnippetArgs) -> String {
    helper_call(node, args)
}

fn runtime_effect_preamble(info: &ShaderInfo, node: &ShaderNode) -> String {
    let snippet = node.snippet();
    let params = SnippetArgs::helper_params();
    let mut code = helper_signature(node);
    for (i, &child) in node.children().iter().enumerate() {
        emit_child_as(&mut code, info, info.node(child), &params, &format!("child{i}"));
    }

    let replacements: Vec<(&str, String)> = snippet
        .uniforms
        .iter()
        .enumerate()
        .map(|(i, uniform)| (uniform.name(), info.uniform_expr(node, i)))
        .collect();
    let body = rename_identifiers(snippet.program_body.as_deref().unwrap_or(""), &replacements);
    for line in body.lines() {
        let _ = writeln!(code, "    {line}");
    }
    code.push_str("}\n");
    code
}

/// Replaces whole identifiers found in `replacements`; member accesses such
/// as `.x` are left alone.
fn rename_identifiers(source: &str, replacements: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.char_indices().peekable();
    let mut prev: Option<char> = None;
    while let Some((start, c)) = chars.next() {
        if c.is_ascii_alphabetic() || c == '_' {
            let mut end = start + c.len_utf8();
            while let Some(&(i, next)) = chars.peek() {
                if next.is_ascii_alphanumeric() || next == '_' {
                    end = i + next.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let ident = &source[start..end];
            match replacements.iter().find(|(name, _)| *name == ident) {
                Some((_, replacement)) if prev != Some('.') => out.push_str(replacement),
                _ => out.push_str(ident),
            }
            prev = ident.chars().last();
        } else {
            out.push(c);
            prev = Some(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_renamed_whole() {
        let renamed = rename_identifiers(
            "return inColor * gain + gainBias + v.gain;",
            &[("gain", "gain_3".to_string())],
        );
        assert_eq!(renamed, "return inColor * gain_3 + gainBias + v.gain;");
    }

    #[test]
    fn names_are_sanitized() {
        assert_eq!(sanitize_name("my effect!"), "my_effect_");
        assert_eq!(sanitize_name("3d"), "_3d");
        assert_eq!(sanitize_name(""), "RuntimeEffect");
    }

    #[test]
    fn kind_selects_requirements() {
        let blender = RuntimeEffect::new(RuntimeEffectKind::Blender, "b", "return inColor;");
        let snippet = blender.to_snippet();
        assert!(snippet.needs_blender_dst_color());
        assert!(snippet.needs_prior_stage_output());
        assert!(!snippet.needs_local_coords());
    }
}
