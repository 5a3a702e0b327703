//! Program generation tests
//!
//! Tests for:
//! - The compose example: interning, helper invocations, uniform references
//! - Byte-identical expansion from many threads
//! - Uniform bytes gathered alongside the key matching the declared block
//! - Destination reads and gradients end to end

use std::sync::Arc;
use std::thread;

use glam::{Vec2, Vec4};
use tincture::core::{BlendMode, Layout, SlType};
use tincture::key_helpers::{self, GradientData, GradientGeometry};
use tincture::shader::{
    Attribute, Caps, DstReadStrategy, KeyContext, PaintProgramKeyBuilder, PipelineDataGatherer,
    RenderPassDesc, RenderStep, RenderStepId, ShaderCodeDictionary, ShaderInfo, UniquePaintProgramId,
};

// ============================================================================
// Helper
// ============================================================================

fn fill_step() -> RenderStep {
    RenderStep::new(RenderStepId(1), "FillRect", "devPosition = float4(position, 0, 1);")
        .with_vertex_attributes(vec![Attribute::new("position", SlType::Float2)])
}

/// `Compose[SolidColor, FixedBlend(src-over)]` shading with a src-over blend root.
fn compose_key(dict: &ShaderCodeDictionary, gatherer: &mut PipelineDataGatherer) -> UniquePaintProgramId {
    let ctx = KeyContext::new(dict, Vec4::ONE);
    let mut builder = PaintProgramKeyBuilder::new(dict);
    key_helpers::begin_compose(&mut builder);
    key_helpers::add_solid_color(&ctx, &mut builder, gatherer, Vec4::new(1.0, 0.0, 0.0, 1.0));
    key_helpers::add_fixed_blend(&mut builder, BlendMode::SrcOver, false);
    builder.end_block();
    key_helpers::add_fixed_blend(&mut builder, BlendMode::SrcOver, false);
    dict.find_or_create(builder.lock_as_key())
}

fn expand(dict: &ShaderCodeDictionary, id: UniquePaintProgramId) -> ShaderInfo {
    ShaderInfo::make(&Caps::default(), dict, &RenderPassDesc::default(), &fill_step(), id)
        .expect("program generation")
}

// ============================================================================
// Compose Example
// ============================================================================

#[test]
fn compose_interns_to_the_first_id_twice() {
    let dict = ShaderCodeDictionary::new();
    let mut gatherer = PipelineDataGatherer::new(Layout::Std140);
    let first = compose_key(&dict, &mut gatherer);
    gatherer.reset();
    let second = compose_key(&dict, &mut gatherer);
    assert_eq!(first.as_u32(), 1);
    assert_eq!(second.as_u32(), 1);
}

#[test]
fn compose_expands_to_two_helper_invocations() {
    let dict = ShaderCodeDictionary::new();
    let mut gatherer = PipelineDataGatherer::new(Layout::Std140);
    let id = compose_key(&dict, &mut gatherer);
    let info = expand(&dict, id);
    let text = info.fragment_program().expect("fragment program");

    assert_eq!(text.matches("= sk_").count(), 2, "{text}");
    assert!(text.contains("half4 outColor_1 = sk_solid_shader(color_1);"));
    assert!(text.contains("half4 outColor_2 = sk_blend(outColor_1, "));
    assert!(text.contains("half4 shadingOutput = Compose_0("));

    assert_eq!(info.num_paint_uniforms(), 1);
    assert_eq!(text.matches("float4 color_1;").count(), 1);
}

#[test]
fn gathered_uniforms_match_the_declared_block() {
    let dict = ShaderCodeDictionary::new();
    let mut gatherer = PipelineDataGatherer::new(Layout::Std140);
    let id = compose_key(&dict, &mut gatherer);
    let (uniforms, textures) = gatherer.finish();
    let uniforms = uniforms.expect("solid color writes a uniform");

    let info = expand(&dict, id);
    assert_eq!(uniforms.len() as u32, info.paint_uniforms_size());
    assert!(textures.is_none());
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn concurrent_expansion_is_byte_identical() {
    let dict = Arc::new(ShaderCodeDictionary::new());
    let mut gatherer = PipelineDataGatherer::new(Layout::Std140);
    let id = compose_key(&dict, &mut gatherer);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let dict = Arc::clone(&dict);
            thread::spawn(move || {
                let info = expand(&dict, id);
                (
                    info.fragment_program().map(str::to_owned),
                    info.vertex_program().to_owned(),
                )
            })
        })
        .collect();

    let texts: Vec<_> = handles.into_iter().map(|h| h.join().expect("expansion thread")).collect();
    assert!(texts[0].0.is_some());
    for text in &texts[1..] {
        assert_eq!(text, &texts[0]);
    }
}

// ============================================================================
// End to End
// ============================================================================

#[test]
fn shader_based_blend_reads_the_destination() {
    let dict = ShaderCodeDictionary::new();
    let ctx = KeyContext::new(&dict, Vec4::ONE);
    let mut gatherer = PipelineDataGatherer::new(Layout::Std140);
    let mut builder = PaintProgramKeyBuilder::new(&dict);
    key_helpers::add_solid_color(&ctx, &mut builder, &mut gatherer, Vec4::ONE);
    key_helpers::add_shader_based_blend(&ctx, &mut builder, &mut gatherer, BlendMode::Overlay);
    let id = dict.find_or_create(builder.lock_as_key());

    let caps = Caps {
        default_dst_read_strategy: DstReadStrategy::TextureCopy,
        ..Caps::default()
    };
    let info = ShaderInfo::make(&caps, &dict, &RenderPassDesc::default(), &fill_step(), id)
        .expect("program generation");
    assert_eq!(info.dst_read_strategy(), DstReadStrategy::TextureCopy);
    assert_eq!(info.num_fragment_textures(), 1);
    assert_eq!(info.num_paint_uniforms(), 2);
}

#[test]
fn gradients_declare_their_stops() {
    let dict = ShaderCodeDictionary::new();
    let ctx = KeyContext::new(&dict, Vec4::ONE);
    let mut gatherer = PipelineDataGatherer::new(Layout::Std140);
    let mut builder = PaintProgramKeyBuilder::new(&dict);
    let gradient = GradientData {
        geometry: GradientGeometry::Linear {
            point0: Vec2::ZERO,
            point1: Vec2::new(100.0, 0.0),
        },
        colors: vec![Vec4::new(1.0, 0.0, 0.0, 1.0), Vec4::new(0.0, 0.0, 1.0, 1.0)].into(),
        offsets: vec![0.0, 1.0].into(),
        tile_mode: 0,
        color_space: 0,
        do_unpremul: false,
    };
    key_helpers::add_gradient(&ctx, &mut builder, &mut gatherer, &gradient);
    key_helpers::add_fixed_blend(&mut builder, BlendMode::SrcOver, false);
    let id = dict.find_or_create(builder.lock_as_key());

    let info = expand(&dict, id);
    let text = info.fragment_program().expect("fragment program");
    assert!(text.contains("float4 colors_0[4];"), "{text}");
    assert!(text.contains("sk_linear_grad_4_shader("));

    let (uniforms, _) = gatherer.finish();
    assert_eq!(
        uniforms.map(|block| block.len() as u32),
        Some(info.paint_uniforms_size())
    );
}
