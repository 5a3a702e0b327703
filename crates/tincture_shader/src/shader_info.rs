//! Program Generation
//!
//! [`ShaderInfo`] expands one interned paint program for one render step
//! into vertex and fragment program text plus the fixed-function blend state
//! the program expects.
//!
//! # Fragment main
//!
//! ```text
//! shadingOutput  = shading root (prior = primitive color, coords = local coords)
//! dstColor       = destination read, only if hardware cannot blend
//! blendOutput    = blend root (prior = shadingOutput, dst = dstColor)
//! outputCoverage = step coverage, multiplied by the clip root
//! sk_FragColor   = blendOutput combined with outputCoverage
//! ```
//!
//! When fixed-function blending realizes the requested blend, the blend root
//! is not invoked and `blendOutput` is the shading output itself.
//!
//! Paint uniforms are declared in pre-order over the node arena with the same
//! [`UniformOffsetCalculator`] rules the data gatherer writes with, so the
//! declared offsets always match the bytes written for a draw.

use serde::Serialize;
use smallvec::SmallVec;
use tincture_core::{
    BlendInfo, BlendMode, OutputType, Result, SlType, TinctureError, Uniform,
    UniformOffsetCalculator,
};

use crate::builtins::BuiltInCodeSnippetId;
use crate::caps::{Caps, DstReadStrategy, hardware_blend_formula};
use crate::dictionary::ShaderCodeDictionary;
use crate::key::{UniquePaintProgramId, describe_key};
use crate::node::{NodeId, ShaderNode, build_tree};
use crate::render_pass::{RenderPassDesc, Swizzle};
use crate::render_step::{Coverage, RenderStep};
use crate::snippet::{SnippetArgs, SnippetRequirementFlags, mangle};
use crate::templates;

const LOCAL_COORDS_VAR: &str = "localCoordsVar";
const SSBO_INDEX_VAR: &str = "ssboIndexVar";
const SSBO_INDEX_ATTRIBUTE: &str = "ssboIndex";
const PAINT_DATA_ARRAY: &str = "fsUniformData";

/// How the final color reaches the render target.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ColorOutput {
    /// The shader blends against a destination read and writes the result.
    DstRead,
    /// Fixed-function advanced blend equation.
    AdvancedHardware,
    /// Fixed-function coefficient blend described by formula outputs.
    Formula {
        primary: OutputType,
        secondary: OutputType,
        tweak_alpha: bool,
    },
}

/// The expanded program for one (render step, paint program) pair.
#[derive(Debug, Clone)]
pub struct ShaderInfo {
    nodes: Vec<ShaderNode>,
    roots: SmallVec<[NodeId; 3]>,
    uniform_exprs: Vec<Vec<String>>,
    sampler_exprs: Vec<Vec<String>>,

    fragment_program: Option<String>,
    vertex_program: String,
    blend_info: BlendInfo,
    dst_read_strategy: DstReadStrategy,
    num_fragment_textures: u32,
    num_paint_uniforms: u32,
    paint_uniforms_size: u32,
    label: String,
}

impl ShaderInfo {
    /// Expands `paint_id` for `step` drawing into `pass`.
    ///
    /// Steps that do not shade, and ids that name no interned key, produce
    /// a vertex program only.
    pub fn make(
        caps: &Caps,
        dict: &ShaderCodeDictionary,
        pass: &RenderPassDesc,
        step: &RenderStep,
        paint_id: UniquePaintProgramId,
    ) -> Result<Self> {
        let key = if step.performs_shading() && paint_id.is_valid() {
            let key = dict.lookup(paint_id);
            if key.is_none() {
                log::warn!(
                    "Paint program {} is not interned; {} draws without shading",
                    paint_id.as_u32(),
                    step.name()
                );
            }
            key
        } else {
            None
        };

        let Some(key) = key else {
            return Self::depth_only(caps, step);
        };

        let (nodes, roots) = build_tree(dict, key.words())?;
        if !(2..=3).contains(&roots.len()) {
            return Err(TinctureError::MalformedKey(format!(
                "expected shading, blend and optional clip roots, found {} roots",
                roots.len()
            )));
        }

        let mut info = Self {
            nodes,
            roots,
            uniform_exprs: Vec::new(),
            sampler_exprs: Vec::new(),
            fragment_program: None,
            vertex_program: String::new(),
            blend_info: BlendInfo::default(),
            dst_read_strategy: DstReadStrategy::NoneRequired,
            num_fragment_textures: 0,
            num_paint_uniforms: 0,
            paint_uniforms_size: 0,
            label: format!("{} + {}", step.name(), describe_key(dict, key.words())),
        };

        let coverage = match (step.coverage(), info.clip_root()) {
            (Coverage::None, Some(_)) => Coverage::SingleChannel,
            (coverage, _) => coverage,
        };
        let output = info.select_blend(caps, pass, coverage)?;

        let paint_block = info.declare_paint_uniforms(caps);
        let textures = info.declare_textures(caps, step);
        let needs_local_coords = info
            .required_flags()
            .contains(SnippetRequirementFlags::LOCAL_COORDS);
        let use_ssbo = caps.storage_buffer_support;

        let varyings = varying_decls(step, needs_local_coords, use_ssbo);
        info.vertex_program = render_vertex(caps, step, &varyings, needs_local_coords, use_ssbo, &info.label)?;

        let fragment = FragmentTemplate {
            label: &info.label,
            slots: BindingSlots::new(caps),
            step_uniforms: step_uniform_decls(caps, step),
            paint: paint_block,
            textures,
            dst_read: DstReadDecl::new(info.dst_read_strategy),
            varyings,
            secondary_output: matches!(
                output,
                ColorOutput::Formula { secondary, .. } if secondary != OutputType::None
            ),
            preamble: info.emit_preamble(),
            body: info.emit_main(step, coverage, output, pass.write_swizzle, needs_local_coords),
        };
        let fragment_program = templates::render("fragment", &fragment)?;
        log::trace!("Generated fragment program for {}:\n{fragment_program}", info.label);
        info.fragment_program = Some(fragment_program);
        Ok(info)
    }

    fn depth_only(caps: &Caps, step: &RenderStep) -> Result<Self> {
        let label = step.name().to_string();
        let varyings = varying_decls(step, false, false);
        let vertex_program = render_vertex(caps, step, &varyings, false, false, &label)?;
        Ok(Self {
            nodes: Vec::new(),
            roots: SmallVec::new(),
            uniform_exprs: Vec::new(),
            sampler_exprs: Vec::new(),
            fragment_program: None,
            vertex_program,
            blend_info: BlendInfo {
                writes_color: false,
                ..BlendInfo::default()
            },
            dst_read_strategy: DstReadStrategy::NoneRequired,
            num_fragment_textures: 0,
            num_paint_uniforms: 0,
            paint_uniforms_size: 0,
            label,
        })
    }

    // ─── Accessors ───────────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub fn fragment_program(&self) -> Option<&str> {
        self.fragment_program.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn vertex_program(&self) -> &str {
        &self.vertex_program
    }

    #[inline]
    #[must_use]
    pub fn blend_info(&self) -> BlendInfo {
        self.blend_info
    }

    #[inline]
    #[must_use]
    pub fn dst_read_strategy(&self) -> DstReadStrategy {
        self.dst_read_strategy
    }

    /// Textures sampled by the fragment program, including a destination
    /// copy.
    #[inline]
    #[must_use]
    pub fn num_fragment_textures(&self) -> u32 {
        self.num_fragment_textures
    }

    /// Paint uniform fields declared; the shared paint color counts once.
    #[inline]
    #[must_use]
    pub fn num_paint_uniforms(&self) -> u32 {
        self.num_paint_uniforms
    }

    /// Byte size of one draw's paint uniform data.
    #[inline]
    #[must_use]
    pub fn paint_uniforms_size(&self) -> u32 {
        self.paint_uniforms_size
    }

    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &[ShaderNode] {
        &self.nodes
    }

    #[inline]
    #[must_use]
    pub fn node(&self, id: NodeId) -> &ShaderNode {
        &self.nodes[id]
    }

    /// Expression reading uniform `index` of `node`.
    #[must_use]
    pub fn uniform_expr(&self, node: &ShaderNode, index: usize) -> String {
        self.uniform_exprs
            .get(node.key_index())
            .and_then(|exprs| exprs.get(index))
            .cloned()
            .unwrap_or_else(|| {
                debug_assert!(false, "uniform {index} of {} was not declared", node.snippet().name);
                "0".to_string()
            })
    }

    /// Expression naming sampler `index` of `node`.
    #[must_use]
    pub fn sampler_expr(&self, node: &ShaderNode, index: usize) -> String {
        self.sampler_exprs
            .get(node.key_index())
            .and_then(|exprs| exprs.get(index))
            .cloned()
            .unwrap_or_else(|| {
                debug_assert!(false, "sampler {index} of {} was not declared", node.snippet().name);
                "sampler".to_string()
            })
    }

    fn shading_root(&self) -> &ShaderNode {
        &self.nodes[self.roots[0]]
    }

    fn blend_root(&self) -> &ShaderNode {
        &self.nodes[self.roots[1]]
    }

    fn clip_root(&self) -> Option<&ShaderNode> {
        self.roots.get(2).map(|&id| &self.nodes[id])
    }

    fn required_flags(&self) -> SnippetRequirementFlags {
        self.roots
            .iter()
            .fold(SnippetRequirementFlags::NONE, |flags, &root| {
                flags | self.nodes[root].required_flags()
            })
    }

    // ─── Blending ────────────────────────────────────────────────────────────

    fn select_blend(&mut self, caps: &Caps, pass: &RenderPassDesc, coverage: Coverage) -> Result<ColorOutput> {
        let blend_root = self.blend_root();
        let fixed = (blend_root.snippet_id() == BuiltInCodeSnippetId::FixedBlend as i32)
            .then(|| {
                let mode = blend_root.data().first().copied().and_then(BlendMode::from_u32)?;
                let opaque = blend_root.data().get(1).is_some_and(|&word| word != 0);
                Some((mode, opaque))
            })
            .flatten();

        if let Some((mode, opaque)) = fixed
            && caps.can_use_hardware_blending(mode, opaque, coverage)
        {
            if !mode.is_coeff_mode() {
                self.blend_info = BlendInfo::for_mode(mode);
                return Ok(ColorOutput::AdvancedHardware);
            }
            let (formula, tweak_alpha) = hardware_blend_formula(mode, opaque, coverage);
            self.blend_info = BlendInfo {
                equation: formula.equation(),
                src_blend: formula.src_coeff(),
                dst_blend: formula.dst_coeff(),
                writes_color: formula.modifies_dst(),
            };
            return Ok(ColorOutput::Formula {
                primary: formula.primary_output(),
                secondary: formula.secondary_output(),
                tweak_alpha,
            });
        }

        let strategy = match pass.dst_read_strategy {
            DstReadStrategy::NoneRequired => caps.default_dst_read_strategy,
            strategy => strategy,
        };
        if strategy == DstReadStrategy::NoneRequired {
            let name = fixed.map_or("ShaderBased", |(mode, _)| mode.name());
            return Err(TinctureError::MissingDstReadStrategy(name));
        }
        self.dst_read_strategy = strategy;
        self.blend_info = BlendInfo::default();
        Ok(ColorOutput::DstRead)
    }

    // ─── Declarations ────────────────────────────────────────────────────────

    fn declare_paint_uniforms(&mut self, caps: &Caps) -> PaintBlock {
        let layout = caps.paint_uniform_layout();
        let use_ssbo = caps.storage_buffer_support;
        let access_prefix = if use_ssbo {
            format!("{PAINT_DATA_ARRAY}[{SSBO_INDEX_VAR}].")
        } else {
            String::new()
        };

        let mut calc = UniformOffsetCalculator::for_top_level(layout);
        let mut block = PaintBlock {
            use_ssbo,
            structs: Vec::new(),
            fields: Vec::new(),
        };
        let mut paint_color_declared = false;
        self.uniform_exprs = Vec::with_capacity(self.nodes.len());

        for node in &self.nodes {
            let snippet = node.snippet();
            let index = node.key_index();
            let mut exprs = Vec::with_capacity(snippet.uniforms.len());

            if let Some(struct_name) = snippet.uniform_struct_name {
                let mut sub = UniformOffsetCalculator::for_struct(layout);
                let members: Vec<String> = snippet
                    .uniforms
                    .iter()
                    .map(|uniform| field_decl(&mut sub, uniform, uniform.name()))
                    .collect();
                if !block.structs.iter().any(|s| s.name == struct_name) {
                    block.structs.push(StructDecl {
                        name: struct_name,
                        members,
                    });
                }
                let instance = mangle("node", index);
                let offset = calc.advance_struct(&sub, Uniform::NON_ARRAY);
                block
                    .fields
                    .push(format!("layout(offset={offset}) {struct_name} {instance};"));
                exprs.extend(
                    snippet
                        .uniforms
                        .iter()
                        .map(|uniform| format!("{access_prefix}{instance}.{}", uniform.name())),
                );
            } else {
                for uniform in snippet.uniforms.iter() {
                    if uniform.is_paint_color() {
                        if paint_color_declared {
                            block
                                .fields
                                .push(format!("// {} deduplicated ({})", uniform.name(), mangle(&snippet.name, index)));
                        } else {
                            block.fields.push(field_decl(&mut calc, uniform, uniform.name()));
                            paint_color_declared = true;
                        }
                        exprs.push(format!("{access_prefix}{}", uniform.name()));
                    } else {
                        let name = mangle(uniform.name(), index);
                        block.fields.push(field_decl(&mut calc, uniform, &name));
                        exprs.push(format!("{access_prefix}{name}"));
                    }
                }
            }

            self.num_paint_uniforms += if snippet.uniform_struct_name.is_some() {
                snippet.uniforms.len() as u32
            } else {
                snippet
                    .uniforms
                    .iter()
                    .filter(|u| !u.is_paint_color())
                    .count() as u32
            };
            self.uniform_exprs.push(exprs);
        }
        self.num_paint_uniforms += u32::from(paint_color_declared);
        self.paint_uniforms_size = calc.aligned_size();
        block
    }

    fn declare_textures(&mut self, caps: &Caps, step: &RenderStep) -> Vec<String> {
        let requirements = caps.resource_binding_requirements;
        let set = requirements.textures_and_samplers_set_index;
        let separate = requirements.separate_texture_and_sampler_binding;
        let mut binding = 0u32;
        let mut decls = Vec::new();

        let mut declare = |name: &str| -> String {
            if separate {
                decls.push(format!("layout(set={set}, binding={binding}) texture2D {name}_texture;"));
                decls.push(format!(
                    "layout(set={set}, binding={}) sampler {name}_sampler;",
                    binding + 1
                ));
                binding += 2;
                format!("sampler2D({name}_texture, {name}_sampler)")
            } else {
                decls.push(format!("layout(set={set}, binding={binding}) sampler2D {name};"));
                binding += 1;
                name.to_string()
            }
        };

        for texture in step.textures() {
            declare(texture.name());
        }
        self.sampler_exprs = self
            .nodes
            .iter()
            .map(|node| {
                node.snippet()
                    .textures_and_samplers
                    .iter()
                    .map(|texture| declare(&mangle(texture.name(), node.key_index())))
                    .collect()
            })
            .collect();
        let paint_textures: usize = self.sampler_exprs.iter().map(Vec::len).sum();
        if self.dst_read_strategy.uses_dst_sampler() {
            declare("dstSampler");
        }

        self.num_fragment_textures = (step.textures().len()
            + paint_textures
            + usize::from(self.dst_read_strategy.uses_dst_sampler())) as u32;
        decls
    }

    // ─── Code ────────────────────────────────────────────────────────────────

    fn emit_preamble(&self) -> Vec<String> {
        let mut preamble = Vec::new();
        for &root in &self.roots {
            self.emit_node_preamble(root, &mut preamble);
        }
        preamble
    }

    /// Children before parents, so every helper is defined before its caller.
    fn emit_node_preamble(&self, id: NodeId, out: &mut Vec<String>) {
        let node = &self.nodes[id];
        for &child in node.children() {
            self.emit_node_preamble(child, out);
        }
        if let Some(code) = node.generate_preamble(self) {
            out.push(format!("// [{}] {}\n{code}", node.key_index(), node.snippet().name));
        }
    }

    fn emit_main(
        &self,
        step: &RenderStep,
        coverage: Coverage,
        output: ColorOutput,
        write_swizzle: Swizzle,
        needs_local_coords: bool,
    ) -> Vec<String> {
        let mut body = Vec::new();

        let prior = if let Some(program) = step.primitive_color_program() {
            body.push("half4 primitiveColor;".to_string());
            body.push(program.to_string());
            "primitiveColor"
        } else {
            if self
                .required_flags()
                .contains(SnippetRequirementFlags::PRIMITIVE_COLOR)
            {
                body.push("half4 primitiveColor = half4(1);".to_string());
            }
            "half4(0)"
        };
        let coords = if needs_local_coords { LOCAL_COORDS_VAR } else { "float2(0)" };
        let shading_args = SnippetArgs {
            prior_stage_output: prior.to_string(),
            blender_dst_color: "half4(1)".to_string(),
            local_coords: coords.to_string(),
        };
        body.push(format!(
            "half4 shadingOutput = {};",
            self.shading_root().generate_expression(self, &shading_args)
        ));

        if output == ColorOutput::DstRead {
            body.push(format!("half4 dstColor = {};", dst_read_expr(self.dst_read_strategy)));
            let blend_args = SnippetArgs {
                prior_stage_output: "shadingOutput".to_string(),
                blender_dst_color: "dstColor".to_string(),
                local_coords: coords.to_string(),
            };
            body.push(format!(
                "half4 blendOutput = {};",
                self.blend_root().generate_expression(self, &blend_args)
            ));
        } else {
            body.push("half4 blendOutput = shadingOutput;".to_string());
        }

        body.push("half4 outputCoverage = half4(1);".to_string());
        if let Some(program) = step.coverage_program() {
            body.push(program.to_string());
        }
        if let Some(clip) = self.clip_root() {
            let clip_args = SnippetArgs {
                prior_stage_output: "half4(1)".to_string(),
                blender_dst_color: "half4(1)".to_string(),
                local_coords: coords.to_string(),
            };
            body.push(format!(
                "outputCoverage *= {}.a;",
                clip.generate_expression(self, &clip_args)
            ));
        }

        match output {
            ColorOutput::DstRead => {
                body.push(
                    "half4 finalColor = blendOutput * outputCoverage + dstColor * (half4(1) - outputCoverage);"
                        .to_string(),
                );
                if coverage == Coverage::Lcd {
                    body.push(
                        "half coverageAlpha = max(max(outputCoverage.r, outputCoverage.g), outputCoverage.b);"
                            .to_string(),
                    );
                    body.push(
                        "finalColor.a = blendOutput.a * coverageAlpha + dstColor.a * (1 - coverageAlpha);"
                            .to_string(),
                    );
                }
            }
            ColorOutput::AdvancedHardware => {
                body.push("half4 finalColor = blendOutput * outputCoverage;".to_string());
            }
            ColorOutput::Formula {
                primary,
                secondary,
                tweak_alpha,
            } => {
                if tweak_alpha {
                    body.push("half4 finalColor = blendOutput * outputCoverage;".to_string());
                } else {
                    body.push(format!("half4 finalColor = {};", output_expr(primary)));
                }
                if secondary != OutputType::None {
                    body.push(format!("sk_SecondaryFragColor = {};", output_expr(secondary)));
                }
            }
        }

        body.push(if write_swizzle.is_identity() {
            "sk_FragColor = finalColor;".to_string()
        } else {
            format!("sk_FragColor = {};", write_swizzle.apply("finalColor"))
        });
        body
    }
}

fn output_expr(output: OutputType) -> &'static str {
    match output {
        OutputType::None => "half4(0)",
        OutputType::Coverage => "outputCoverage",
        OutputType::Modulate => "blendOutput * outputCoverage",
        OutputType::SAModulate => "blendOutput.a * outputCoverage",
        OutputType::ISAModulate => "(1 - blendOutput.a) * outputCoverage",
        OutputType::ISCModulate => "(half4(1) - blendOutput) * outputCoverage",
    }
}

fn dst_read_expr(strategy: DstReadStrategy) -> &'static str {
    match strategy {
        DstReadStrategy::TextureCopy | DstReadStrategy::TextureSample => {
            "sample(dstSampler, (sk_FragCoord.xy - dstReadBounds.xy) * dstReadBounds.zw)"
        }
        DstReadStrategy::ReadFromInput => "subpassLoad(dstColorInput)",
        DstReadStrategy::FramebufferFetch => "sk_LastFragColor",
        DstReadStrategy::NoneRequired => "half4(0)",
    }
}

fn field_decl(calc: &mut UniformOffsetCalculator, uniform: &Uniform, name: &str) -> String {
    let offset = calc.advance_offset(uniform.ty(), uniform.count());
    if uniform.is_array() {
        format!(
            "layout(offset={offset}) {} {name}[{}];",
            uniform.ty().name(),
            uniform.count()
        )
    } else {
        format!("layout(offset={offset}) {} {name};", uniform.ty().name())
    }
}

fn step_uniform_decls(caps: &Caps, step: &RenderStep) -> Vec<String> {
    let mut calc =
        UniformOffsetCalculator::for_top_level(caps.resource_binding_requirements.uniform_buffer_layout);
    step.uniforms()
        .iter()
        .map(|uniform| field_decl(&mut calc, uniform, uniform.name()))
        .collect()
}

fn varying_decls(step: &RenderStep, local_coords: bool, ssbo_index: bool) -> Vec<VaryingDecl> {
    let mut varyings: Vec<VaryingDecl> = step
        .varyings()
        .iter()
        .map(|v| VaryingDecl {
            location: 0,
            ty: v.ty.name(),
            name: v.name.to_string(),
            flat: v.ty.is_integral(),
        })
        .collect();
    if local_coords {
        varyings.push(VaryingDecl {
            location: 0,
            ty: SlType::Float2.name(),
            name: LOCAL_COORDS_VAR.to_string(),
            flat: false,
        });
    }
    if ssbo_index {
        varyings.push(VaryingDecl {
            location: 0,
            ty: SlType::UInt.name(),
            name: SSBO_INDEX_VAR.to_string(),
            flat: true,
        });
    }
    for (location, varying) in varyings.iter_mut().enumerate() {
        varying.location = location as u32;
    }
    varyings
}

fn render_vertex(
    caps: &Caps,
    step: &RenderStep,
    varyings: &[VaryingDecl],
    forward_local_coords: bool,
    ssbo_index: bool,
    label: &str,
) -> Result<String> {
    let mut attributes: Vec<AttributeDecl> = step
        .vertex_attributes()
        .iter()
        .chain(step.instance_attributes())
        .enumerate()
        .map(|(location, attribute)| AttributeDecl {
            location: location as u32,
            ty: attribute.ty.name(),
            name: attribute.name.to_string(),
        })
        .collect();
    if ssbo_index {
        attributes.push(AttributeDecl {
            location: attributes.len() as u32,
            ty: SlType::UInt.name(),
            name: SSBO_INDEX_ATTRIBUTE.to_string(),
        });
    }

    let mut forwards = Vec::new();
    if forward_local_coords {
        forwards.push(format!("{LOCAL_COORDS_VAR} = stepLocalCoords;"));
    }
    if ssbo_index {
        forwards.push(format!("{SSBO_INDEX_VAR} = {SSBO_INDEX_ATTRIBUTE};"));
    }

    let vertex = VertexTemplate {
        label,
        slots: BindingSlots::new(caps),
        step_uniforms: step_uniform_decls(caps, step),
        attributes,
        varyings,
        step_program: step.vertex_program(),
        forwards,
    };
    templates::render("vertex", &vertex)
}

// ─── Template Contexts ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct BindingSlots {
    uniforms_set: u32,
    input_attachment_set: u32,
    intrinsic_binding: u32,
    render_step_binding: u32,
    paint_binding: u32,
}

impl BindingSlots {
    fn new(caps: &Caps) -> Self {
        let requirements = caps.resource_binding_requirements;
        Self {
            uniforms_set: requirements.uniforms_set_index,
            input_attachment_set: requirements.input_attachment_set_index,
            intrinsic_binding: requirements.intrinsic_buffer_binding,
            render_step_binding: requirements.render_step_buffer_binding,
            paint_binding: requirements.paint_params_buffer_binding,
        }
    }
}

#[derive(Debug, Serialize)]
struct StructDecl {
    name: &'static str,
    members: Vec<String>,
}

#[derive(Debug, Serialize)]
struct PaintBlock {
    use_ssbo: bool,
    structs: Vec<StructDecl>,
    fields: Vec<String>,
}

#[derive(Debug, Serialize)]
struct VaryingDecl {
    location: u32,
    ty: &'static str,
    name: String,
    flat: bool,
}

#[derive(Debug, Serialize)]
struct AttributeDecl {
    location: u32,
    ty: &'static str,
    name: String,
}

#[derive(Debug, Serialize)]
struct DstReadDecl {
    input_attachment: bool,
    framebuffer_fetch: bool,
}

impl DstReadDecl {
    fn new(strategy: DstReadStrategy) -> Self {
        Self {
            input_attachment: strategy == DstReadStrategy::ReadFromInput,
            framebuffer_fetch: strategy == DstReadStrategy::FramebufferFetch,
        }
    }
}

#[derive(Debug, Serialize)]
struct FragmentTemplate<'a> {
    label: &'a str,
    slots: BindingSlots,
    step_uniforms: Vec<String>,
    paint: PaintBlock,
    textures: Vec<String>,
    dst_read: DstReadDecl,
    varyings: Vec<VaryingDecl>,
    secondary_output: bool,
    preamble: Vec<String>,
    body: Vec<String>,
}

#[derive(Debug, Serialize)]
struct VertexTemplate<'a> {
    label: &'a str,
    slots: BindingSlots,
    step_uniforms: Vec<String>,
    attributes: Vec<AttributeDecl>,
    varyings: &'a [VaryingDecl],
    step_program: &'a str,
    forwards: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::BuiltInCodeSnippetId as Id;
    use crate::key::PaintProgramKeyBuilder;
    use crate::render_step::RenderStepId;
    use tincture_core::{BlendCoeff, BlendEquation};

    fn fill_step() -> RenderStep {
        RenderStep::new(RenderStepId(1), "FillRect", "devPosition = float4(position, 0, 1);")
            .with_vertex_attributes(vec![crate::render_step::Attribute::new("position", SlType::Float2)])
    }

    fn solid_key(dict: &ShaderCodeDictionary, mode: BlendMode, clip: bool) -> UniquePaintProgramId {
        let mut builder = PaintProgramKeyBuilder::new(dict);
        builder.add_block(Id::SolidColorShader);
        builder.add_block_with_data(Id::FixedBlend, &[mode as u32, 0]);
        if clip {
            builder.add_block(Id::RectClip);
        }
        dict.find_or_create(builder.lock_as_key())
    }

    #[test]
    fn src_over_uses_hardware_blending() {
        let dict = ShaderCodeDictionary::new();
        let id = solid_key(&dict, BlendMode::SrcOver, false);
        let info = ShaderInfo::make(&Caps::default(), &dict, &RenderPassDesc::default(), &fill_step(), id).unwrap();

        let blend = info.blend_info();
        assert_eq!(blend.equation, BlendEquation::Add);
        assert_eq!(blend.src_blend, BlendCoeff::One);
        assert_eq!(blend.dst_blend, BlendCoeff::ISA);
        assert!(blend.writes_color);
        assert_eq!(info.dst_read_strategy(), DstReadStrategy::NoneRequired);

        let text = info.fragment_program().unwrap();
        assert!(text.contains("half4 shadingOutput = sk_solid_shader(color_0);"));
        assert!(text.contains("layout(offset=0) float4 color_0;"));
        assert!(!text.contains("dstColor ="));
        assert_eq!(info.num_paint_uniforms(), 1);
        assert_eq!(info.paint_uniforms_size(), 16);
    }

    #[test]
    fn non_shading_steps_have_no_fragment_program() {
        let dict = ShaderCodeDictionary::new();
        let id = solid_key(&dict, BlendMode::SrcOver, false);
        let step = fill_step().with_performs_shading(false);
        let info = ShaderInfo::make(&Caps::default(), &dict, &RenderPassDesc::default(), &step, id).unwrap();
        assert!(info.fragment_program().is_none());
        assert!(!info.blend_info().writes_color);
        assert!(info.vertex_program().contains("devPosition = float4(position, 0, 1);"));
    }

    #[test]
    fn advanced_modes_need_a_dst_read() {
        let dict = ShaderCodeDictionary::new();
        let id = solid_key(&dict, BlendMode::Multiply, false);
        let caps = Caps::default();
        let err = ShaderInfo::make(&caps, &dict, &RenderPassDesc::default(), &fill_step(), id).unwrap_err();
        assert_eq!(err, TinctureError::MissingDstReadStrategy("Multiply"));

        let pass = RenderPassDesc {
            dst_read_strategy: DstReadStrategy::TextureCopy,
            ..RenderPassDesc::default()
        };
        let info = ShaderInfo::make(&caps, &dict, &pass, &fill_step(), id).unwrap();
        assert_eq!(info.dst_read_strategy(), DstReadStrategy::TextureCopy);
        assert_eq!(info.num_fragment_textures(), 1);
        assert_eq!(info.blend_info(), BlendInfo::default());
        let text = info.fragment_program().unwrap();
        assert!(text.contains("sampler2D dstSampler;"));
        assert!(text.contains("half4 blendOutput = sk_blend(shadingOutput, dstColor, "));
    }

    #[test]
    fn clip_forces_coverage() {
        let dict = ShaderCodeDictionary::new();
        let id = solid_key(&dict, BlendMode::SrcOver, true);
        let info = ShaderInfo::make(&Caps::default(), &dict, &RenderPassDesc::default(), &fill_step(), id).unwrap();
        let text = info.fragment_program().unwrap();
        assert!(text.contains("outputCoverage *= sk_rect_clip(sk_FragCoord.xy, rect_2).a;"));
        assert!(text.contains("half4 finalColor = blendOutput * outputCoverage;"));
    }

    #[test]
    fn storage_buffer_uniforms_are_indexed() {
        let dict = ShaderCodeDictionary::new();
        let id = solid_key(&dict, BlendMode::SrcOver, false);
        let caps = Caps {
            storage_buffer_support: true,
            ..Caps::default()
        };
        let info = ShaderInfo::make(&caps, &dict, &RenderPassDesc::default(), &fill_step(), id).unwrap();
        let text = info.fragment_program().unwrap();
        assert!(text.contains("sk_solid_shader(fsUniformData[ssboIndexVar].color_0)"));
        assert!(text.contains("flat in uint ssboIndexVar;"));
        assert!(info.vertex_program().contains("ssboIndexVar = ssboIndex;"));
    }

    #[test]
    fn write_swizzle_applies_to_output() {
        let dict = ShaderCodeDictionary::new();
        let id = solid_key(&dict, BlendMode::Src, false);
        let pass = RenderPassDesc {
            write_swizzle: Swizzle::RRRA,
            ..RenderPassDesc::default()
        };
        let info = ShaderInfo::make(&Caps::default(), &dict, &pass, &fill_step(), id).unwrap();
        assert!(
            info.fragment_program()
                .unwrap()
                .contains("sk_FragColor = half4(finalColor.r, finalColor.r, finalColor.r, finalColor.a);")
        );
    }
}
