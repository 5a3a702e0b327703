//! Built-in Snippets
//!
//! The fixed catalog of shading primitives every dictionary starts with,
//! together with the generators that turn their nodes into program text.
//!
//! # Generators
//!
//! | Generator | Used by |
//! |-----------|---------|
//! | [`generate_default_expression`] | leaves call their function, inner nodes call their helper |
//! | [`generate_default_preamble`] | inner nodes: evaluate children, forward outputs |
//! | `local_matrix_preamble` | transforms coordinates before the child |
//! | `compose_preamble` | chains the first child's output into the second |
//! | `fixed_blend_expression` | bakes the payload blend mode into the call |
//!
//! Default argument order for a call is: prior stage output, destination
//! color, local coordinates (each only if the snippet requires it), then the
//! node's uniforms, samplers and child outputs.

use std::borrow::Cow;
use std::fmt::Write as _;
use std::sync::Arc;

use tincture_core::{BlendMode, SlType, TextureAndSampler, Uniform};

use crate::node::ShaderNode;
use crate::shader_info::ShaderInfo;
use crate::snippet::{
    GenerateExpressionFn, GeneratePreambleFn, PayloadField, PayloadType, ShaderSnippet,
    SnippetArgs, SnippetRequirementFlags as Flags, mangle,
};

/// Ids of the built-in snippets. User-defined snippets start at
/// [`BuiltInCodeSnippetId::COUNT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(i32)]
pub enum BuiltInCodeSnippetId {
    Error,
    PriorOutput,
    SolidColorShader,
    RgbPaintColor,
    AlphaOnlyPaintColor,
    LocalMatrixShader,
    LinearGradientShader4,
    LinearGradientShader8,
    RadialGradientShader4,
    RadialGradientShader8,
    SweepGradientShader4,
    SweepGradientShader8,
    ConicalGradientShader4,
    ConicalGradientShader8,
    ImageShader,
    ColorSpaceTransform,
    MatrixColorFilter,
    Compose,
    BlendShader,
    ShaderBasedBlend,
    FixedBlend,
    RectClip,
    PrimitiveColor,
}

impl BuiltInCodeSnippetId {
    pub const LAST: Self = Self::PrimitiveColor;
    pub const COUNT: i32 = Self::LAST as i32 + 1;
}

impl From<BuiltInCodeSnippetId> for i32 {
    fn from(id: BuiltInCodeSnippetId) -> Self {
        id as i32
    }
}

/// Gradient geometry variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GradientType {
    Linear,
    Radial,
    Sweep,
    Conical,
}

impl GradientType {
    /// The snippet for this geometry with room for `stops` color stops.
    /// Gradients with more than 8 stops are not supported by the catalog.
    #[must_use]
    pub const fn snippet_id(self, stops: usize) -> BuiltInCodeSnippetId {
        use BuiltInCodeSnippetId as Id;
        let small = stops <= 4;
        match self {
            Self::Linear if small => Id::LinearGradientShader4,
            Self::Linear => Id::LinearGradientShader8,
            Self::Radial if small => Id::RadialGradientShader4,
            Self::Radial => Id::RadialGradientShader8,
            Self::Sweep if small => Id::SweepGradientShader4,
            Self::Sweep => Id::SweepGradientShader8,
            Self::Conical if small => Id::ConicalGradientShader4,
            Self::Conical => Id::ConicalGradientShader8,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Radial => "radial",
            Self::Sweep => "sweep",
            Self::Conical => "conical",
        }
    }

    fn geometry_uniforms(self) -> Vec<Uniform> {
        match self {
            Self::Linear => vec![
                Uniform::new("point0", SlType::Float2),
                Uniform::new("point1", SlType::Float2),
            ],
            Self::Radial => vec![
                Uniform::new("center", SlType::Float2),
                Uniform::new("radius", SlType::Float),
            ],
            Self::Sweep => vec![
                Uniform::new("center", SlType::Float2),
                Uniform::new("bias", SlType::Float),
                Uniform::new("scale", SlType::Float),
            ],
            Self::Conical => vec![
                Uniform::new("point0", SlType::Float2),
                Uniform::new("point1", SlType::Float2),
                Uniform::new("radius0", SlType::Float),
                Uniform::new("radius1", SlType::Float),
            ],
        }
    }
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

fn snippet(
    name: &'static str,
    function: &'static str,
    flags: Flags,
    uniforms: Vec<Uniform>,
    num_children: usize,
) -> ShaderSnippet {
    ShaderSnippet {
        name: Cow::Borrowed(name),
        static_function_name: Cow::Borrowed(function),
        requirement_flags: flags,
        uniforms: Cow::Owned(uniforms),
        uniform_struct_name: None,
        textures_and_samplers: Cow::Borrowed(&[]),
        num_children,
        data_payload: Cow::Borrowed(&[]),
        expression_generator: generate_default_expression,
        preamble_generator: (num_children > 0).then_some(generate_default_preamble as GeneratePreambleFn),
        program_body: None,
    }
}

fn with_expression(mut snippet: ShaderSnippet, generator: GenerateExpressionFn) -> ShaderSnippet {
    snippet.expression_generator = generator;
    snippet
}

fn with_preamble(mut snippet: ShaderSnippet, generator: GeneratePreambleFn) -> ShaderSnippet {
    snippet.preamble_generator = Some(generator);
    snippet
}

fn gradient_snippet(ty: GradientType, stops: u32) -> ShaderSnippet {
    let name = match (ty, stops) {
        (GradientType::Linear, 4) => "LinearGradient4",
        (GradientType::Linear, _) => "LinearGradient8",
        (GradientType::Radial, 4) => "RadialGradient4",
        (GradientType::Radial, _) => "RadialGradient8",
        (GradientType::Sweep, 4) => "SweepGradient4",
        (GradientType::Sweep, _) => "SweepGradient8",
        (GradientType::Conical, 4) => "ConicalGradient4",
        (GradientType::Conical, _) => "ConicalGradient8",
    };
    let mut uniforms = vec![
        Uniform::array("colors", SlType::Float4, stops),
        if stops == 4 {
            Uniform::new("offsets", SlType::Float4)
        } else {
            Uniform::array("offsets", SlType::Float4, stops / 4)
        },
    ];
    uniforms.extend(ty.geometry_uniforms());
    uniforms.extend([
        Uniform::new("tilemode", SlType::Int),
        Uniform::new("colorSpace", SlType::Int),
        Uniform::new("doUnPremul", SlType::Int),
    ]);
    let mut snippet = snippet(name, "", Flags::LOCAL_COORDS, uniforms, 0);
    snippet.static_function_name = Cow::Owned(format!("sk_{}_grad_{stops}_shader", ty.name()));
    snippet
}

static IMAGE_SAMPLERS: [TextureAndSampler; 1] = [TextureAndSampler::new("image")];
static TABLE_PAYLOAD: [PayloadField; 2] = [
    PayloadField::new("blendMode", PayloadType::BlendMode),
    PayloadField::new("srcIsOpaque", PayloadType::U32),
];

/// Builds the built-in catalog, indexed by [`BuiltInCodeSnippetId`].
#[must_use]
pub fn built_in_snippets() -> Vec<Arc<ShaderSnippet>> {
    let catalog = vec![
        snippet("Error", "sk_error", Flags::NONE, vec![], 0),
        with_expression(
            snippet("PriorOutput", "", Flags::PRIOR_STAGE_OUTPUT, vec![], 0),
            passthrough_expression,
        ),
        snippet(
            "SolidColor",
            "sk_solid_shader",
            Flags::NONE,
            vec![Uniform::new("color", SlType::Float4)],
            0,
        ),
        snippet(
            "RGBPaintColor",
            "sk_rgb_opaque",
            Flags::NONE,
            vec![Uniform::paint_color()],
            0,
        ),
        snippet(
            "AlphaOnlyPaintColor",
            "sk_alpha_only",
            Flags::NONE,
            vec![Uniform::paint_color()],
            0,
        ),
        with_preamble(
            snippet(
                "LocalMatrix",
                "",
                Flags::LOCAL_COORDS,
                vec![Uniform::new("localMatrix", SlType::Float4x4)],
                1,
            ),
            local_matrix_preamble,
        ),
        gradient_snippet(GradientType::Linear, 4),
        gradient_snippet(GradientType::Linear, 8),
        gradient_snippet(GradientType::Radial, 4),
        gradient_snippet(GradientType::Radial, 8),
        gradient_snippet(GradientType::Sweep, 4),
        gradient_snippet(GradientType::Sweep, 8),
        gradient_snippet(GradientType::Conical, 4),
        gradient_snippet(GradientType::Conical, 8),
        ShaderSnippet {
            textures_and_samplers: Cow::Borrowed(&IMAGE_SAMPLERS),
            ..snippet(
                "Image",
                "sk_image_shader",
                Flags::LOCAL_COORDS,
                vec![
                    Uniform::new("invImgSize", SlType::Float2),
                    Uniform::new("subset", SlType::Float4),
                    Uniform::new("tilemodeX", SlType::Int),
                    Uniform::new("tilemodeY", SlType::Int),
                    Uniform::new("filterMode", SlType::Int),
                ],
                0,
            )
        },
        ShaderSnippet {
            uniform_struct_name: Some("ColorSpaceXform"),
            ..snippet(
                "ColorSpaceTransform",
                "sk_color_space_transform",
                Flags::PRIOR_STAGE_OUTPUT,
                vec![
                    Uniform::new("flags", SlType::Int),
                    Uniform::new("srcKind", SlType::Int),
                    Uniform::new("gamutTransform", SlType::Half3x3),
                    Uniform::new("dstKind", SlType::Int),
                    Uniform::array("srcCoeffs", SlType::Half, 7),
                    Uniform::array("dstCoeffs", SlType::Half, 7),
                ],
                0,
            )
        },
        snippet(
            "MatrixColorFilter",
            "sk_matrix_colorfilter",
            Flags::PRIOR_STAGE_OUTPUT,
            vec![
                Uniform::new("matrix", SlType::Float4x4),
                Uniform::new("translate", SlType::Float4),
                Uniform::new("inHSL", SlType::Int),
            ],
            0,
        ),
        with_preamble(snippet("Compose", "", Flags::NONE, vec![], 2), compose_preamble),
        snippet(
            "BlendShader",
            "sk_blend_shader",
            Flags::NONE,
            vec![Uniform::new("blendMode", SlType::Int)],
            2,
        ),
        snippet(
            "ShaderBasedBlend",
            "sk_blend",
            Flags::PRIOR_STAGE_OUTPUT | Flags::BLENDER_DST_COLOR,
            vec![Uniform::new("blendMode", SlType::Int)],
            0,
        ),
        ShaderSnippet {
            data_payload: Cow::Borrowed(&TABLE_PAYLOAD),
            ..with_expression(
                snippet(
                    "FixedBlend",
                    "sk_blend",
                    Flags::PRIOR_STAGE_OUTPUT | Flags::BLENDER_DST_COLOR,
                    vec![],
                    0,
                ),
                fixed_blend_expression,
            )
        },
        with_expression(
            snippet(
                "RectClip",
                "sk_rect_clip",
                Flags::NONE,
                vec![Uniform::new("rect", SlType::Float4)],
                0,
            ),
            rect_clip_expression,
        ),
        with_expression(
            snippet("PrimitiveColor", "", Flags::PRIMITIVE_COLOR, vec![], 0),
            primitive_color_expression,
        ),
    ];
    debug_assert_eq!(catalog.len(), BuiltInCodeSnippetId::COUNT as usize);
    catalog.into_iter().map(Arc::new).collect()
}

// ─── Default Generators ──────────────────────────────────────────────────────

/// Name of the helper function generated for an inner node.
#[must_use]
pub fn helper_name(node: &ShaderNode) -> String {
    mangle(&node.snippet().name, node.key_index())
}

/// `Name_N(prior, dst, coords)`
#[must_use]
pub fn helper_call(node: &ShaderNode, args: &SnippetArgs) -> String {
    format!(
        "{}({}, {}, {})",
        helper_name(node),
        args.prior_stage_output,
        args.blender_dst_color,
        args.local_coords
    )
}

/// `half4 Name_N(half4 inColor, half4 destColor, float2 coords) {`
#[must_use]
pub fn helper_signature(node: &ShaderNode) -> String {
    format!(
        "half4 {}(half4 inColor, half4 destColor, float2 coords) {{\n",
        helper_name(node)
    )
}

/// Arguments in default order for invoking `node`'s static function.
#[must_use]
pub fn default_call_args(
    info: &ShaderInfo,
    node: &ShaderNode,
    args: &SnippetArgs,
    child_outputs: &[String],
) -> Vec<String> {
    let snippet = node.snippet();
    let mut out = Vec::with_capacity(
        3 + snippet.uniforms.len() + snippet.textures_and_samplers.len() + child_outputs.len(),
    );
    if snippet.needs_prior_stage_output() {
        out.push(args.prior_stage_output.clone());
    }
    if snippet.needs_blender_dst_color() {
        out.push(args.blender_dst_color.clone());
    }
    if snippet.needs_local_coords() {
        out.push(args.local_coords.clone());
    }
    out.extend((0..snippet.uniforms.len()).map(|i| info.uniform_expr(node, i)));
    out.extend((0..snippet.textures_and_samplers.len()).map(|i| info.sampler_expr(node, i)));
    out.extend(child_outputs.iter().cloned());
    out
}

/// Leaves call their static function; inner nodes call their helper.
#[must_use]
pub fn generate_default_expression(info: &ShaderInfo, node: &ShaderNode, args: &SnippetArgs) -> String {
    if node.num_children() == 0 {
        let call_args = default_call_args(info, node, args, &[]);
        format!("{}({})", node.snippet().static_function_name, call_args.join(", "))
    } else {
        helper_call(node, args)
    }
}

/// Evaluates `child` into a mangled local and returns the local's name.
pub fn emit_child(code: &mut String, info: &ShaderInfo, child: &ShaderNode, args: &SnippetArgs) -> String {
    let output = mangle("outColor", child.key_index());
    emit_child_as(code, info, child, args, &output);
    output
}

/// Evaluates `child` into the local `output`.
pub fn emit_child_as(code: &mut String, info: &ShaderInfo, child: &ShaderNode, args: &SnippetArgs, output: &str) {
    let _ = writeln!(code, "    half4 {output} = {};", child.generate_expression(info, args));
}

/// Helper that evaluates every child with the helper's own arguments and
/// forwards their outputs to the static function.
#[must_use]
pub fn generate_default_preamble(info: &ShaderInfo, node: &ShaderNode) -> String {
    if node.num_children() == 0 {
        return String::new();
    }
    let params = SnippetArgs::helper_params();
    let mut code = helper_signature(node);
    let outputs: Vec<String> = node
        .children()
        .iter()
        .map(|&child| emit_child(&mut code, info, info.node(child), &params))
        .collect();
    let call_args = default_call_args(info, node, &params, &outputs);
    let _ = writeln!(
        code,
        "    return {}({});",
        node.snippet().static_function_name,
        call_args.join(", ")
    );
    code.push_str("}\n");
    code
}

// ─── Specialized Generators ──────────────────────────────────────────────────

fn passthrough_expression(_: &ShaderInfo, _: &ShaderNode, args: &SnippetArgs) -> String {
    args.prior_stage_output.clone()
}

fn primitive_color_expression(_: &ShaderInfo, _: &ShaderNode, _: &SnippetArgs) -> String {
    "primitiveColor".to_string()
}

fn fixed_blend_expression(_: &ShaderInfo, node: &ShaderNode, args: &SnippetArgs) -> String {
    let mode = node
        .data()
        .first()
        .copied()
        .unwrap_or(BlendMode::SrcOver as u32);
    format!(
        "{}({}, {}, {mode})",
        node.snippet().static_function_name,
        args.prior_stage_output,
        args.blender_dst_color
    )
}

fn rect_clip_expression(info: &ShaderInfo, node: &ShaderNode, _: &SnippetArgs) -> String {
    format!(
        "{}(sk_FragCoord.xy, {})",
        node.snippet().static_function_name,
        info.uniform_expr(node, 0)
    )
}

fn local_matrix_preamble(info: &ShaderInfo, node: &ShaderNode) -> String {
    let Some(&child) = node.children().first() else {
        return String::new();
    };
    let params = SnippetArgs::helper_params();
    let mut code = helper_signature(node);
    let _ = writeln!(
        code,
        "    coords = ({} * float4(coords, 0.0, 1.0)).xy;",
        info.uniform_expr(node, 0)
    );
    let _ = writeln!(
        code,
        "    return {};",
        info.node(child).generate_expression(info, &params)
    );
    code.push_str("}\n");
    code
}

fn compose_preamble(info: &ShaderInfo, node: &ShaderNode) -> String {
    let [inner, outer] = node.children() else {
        return String::new();
    };
    let params = SnippetArgs::helper_params();
    let mut code = helper_signature(node);
    let inner_output = emit_child(&mut code, info, info.node(*inner), &params);
    let outer_output = emit_child(
        &mut code,
        info,
        info.node(*outer),
        &params.with_prior_stage_output(inner_output),
    );
    let _ = writeln!(code, "    return {outer_output};");
    code.push_str("}\n");
    code
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_indexed_by_id() {
        let catalog = built_in_snippets();
        assert_eq!(catalog.len(), BuiltInCodeSnippetId::COUNT as usize);
        assert_eq!(catalog[BuiltInCodeSnippetId::Compose as usize].name, "Compose");
        assert_eq!(catalog[BuiltInCodeSnippetId::FixedBlend as usize].payload_word_count(), 2);
        assert_eq!(
            catalog[BuiltInCodeSnippetId::SweepGradientShader8 as usize].static_function_name,
            "sk_sweep_grad_8_shader"
        );
    }

    #[test]
    fn only_inner_nodes_get_default_preambles() {
        let catalog = built_in_snippets();
        assert!(catalog[BuiltInCodeSnippetId::SolidColorShader as usize].preamble_generator.is_none());
        assert!(catalog[BuiltInCodeSnippetId::BlendShader as usize].preamble_generator.is_some());
    }

    #[test]
    fn gradient_stop_count_selects_variant() {
        assert_eq!(
            GradientType::Radial.snippet_id(3),
            BuiltInCodeSnippetId::RadialGradientShader4
        );
        assert_eq!(
            GradientType::Radial.snippet_id(5),
            BuiltInCodeSnippetId::RadialGradientShader8
        );
    }
}
