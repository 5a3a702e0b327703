//! Context and recorder tests
//!
//! Tests for:
//! - ContextOptions JSON round trips and defaults
//! - Recording draws through the key helpers
//! - Dropping draws whose pipeline cannot be built
//! - Precompiling from persisted descriptions

use std::sync::atomic::{AtomicUsize, Ordering};

use glam::Vec4;
use tincture::core::BlendMode;
use tincture::pipeline::{PipelineCompiler, PipelineProgram};
use tincture::shader::{Caps, DstReadStrategy, RenderPassDesc, RenderStep, RenderStepId};
use tincture::{Context, ContextOptions, TinctureError, key_helpers};

// ============================================================================
// Helper
// ============================================================================

#[derive(Default)]
struct LabelCompiler {
    calls: AtomicUsize,
}

impl PipelineCompiler for LabelCompiler {
    type Pipeline = (wgpu::ColorTargetState, String);

    fn compile(&self, program: &PipelineProgram<'_>) -> Option<Self::Pipeline> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Some((
            program.color_target(),
            program.label.unwrap_or_default().to_string(),
        ))
    }
}

const FILL: RenderStepId = RenderStepId(1);
const STENCIL: RenderStepId = RenderStepId(2);

fn context(options: ContextOptions) -> Context<LabelCompiler> {
    let _ = env_logger::builder().is_test(true).try_init();
    let context = Context::new(LabelCompiler::default(), options).expect("valid options");
    context.register_render_step(RenderStep::new(FILL, "FillRect", "devPosition = float4(0, 0, 0, 1);"));
    context.register_render_step(
        RenderStep::new(STENCIL, "StencilPath", "devPosition = float4(0, 0, 0, 1);").with_performs_shading(false),
    );
    context
}

// ============================================================================
// Options
// ============================================================================

#[test]
fn options_round_trip_through_json() -> anyhow::Result<()> {
    let options = ContextOptions {
        caps: Caps {
            dual_source_blending: true,
            storage_buffer_support: true,
            default_dst_read_strategy: DstReadStrategy::TextureSample,
            ..Caps::default()
        },
        max_pipeline_tasks_in_flight: 32,
        label_pipelines: true,
    };
    let json = serde_json::to_string(&options)?;
    let decoded: ContextOptions = serde_json::from_str(&json)?;
    assert_eq!(decoded, options);
    Ok(())
}

#[test]
fn missing_option_fields_take_defaults() -> anyhow::Result<()> {
    let decoded: ContextOptions = serde_json::from_str(r#"{ "max_pipeline_tasks_in_flight": 4 }"#)?;
    assert_eq!(decoded.max_pipeline_tasks_in_flight, 4);
    assert_eq!(decoded.caps, Caps::default());
    Ok(())
}

#[test]
fn invalid_options_are_rejected() {
    let mut options = ContextOptions::default();
    options.caps.resource_binding_requirements.render_step_buffer_binding =
        options.caps.resource_binding_requirements.intrinsic_buffer_binding;
    assert!(matches!(
        Context::new(LabelCompiler::default(), options),
        Err(TinctureError::InvalidOptions(_))
    ));
}

// ============================================================================
// Recording
// ============================================================================

#[test]
fn equal_draws_share_pipelines_and_data() -> anyhow::Result<()> {
    let context = context(ContextOptions::default());
    let pass = RenderPassDesc::default();
    let mut recorder = context.recorder();
    for _ in 0..3 {
        recorder.record_draw(FILL, &pass, Vec4::ONE, |ctx, builder, gatherer| {
            key_helpers::add_rgb_paint_color(ctx, builder, gatherer);
            key_helpers::add_fixed_blend(builder, BlendMode::SrcOver, false);
        })?;
    }
    assert_eq!(recorder.draws().len(), 3);

    let draws = recorder.resolve();
    assert_eq!(draws.len(), 3);
    assert_eq!(context.pipelines().compiler().calls.load(Ordering::Relaxed), 1);
    assert_eq!(context.dictionary().num_programs(), 1);

    let first = draws[0].uniforms.as_ref().expect("paint color uniform");
    for draw in &draws[1..] {
        assert!(std::sync::Arc::ptr_eq(&draw.pipeline, &draws[0].pipeline));
        assert!(std::sync::Arc::ptr_eq(draw.uniforms.as_ref().expect("uniforms"), first));
    }

    let (target, _) = &*draws[0].pipeline;
    assert_eq!(target.blend, Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING));
    Ok(())
}

#[test]
fn non_shading_steps_skip_the_paint() -> anyhow::Result<()> {
    let context = context(ContextOptions::default());
    let mut recorder = context.recorder();
    let mut called = false;
    recorder.record_draw(STENCIL, &RenderPassDesc::default(), Vec4::ONE, |_, _, _| called = true)?;
    assert!(!called);
    assert!(!recorder.draws()[0].description.paint_id.is_valid());

    let draws = recorder.resolve();
    assert_eq!(draws.len(), 1);
    assert!(draws[0].uniforms.is_none());
    assert_eq!(draws[0].pipeline.0.write_mask, wgpu::ColorWrites::empty());
    Ok(())
}

#[test]
fn unknown_steps_are_an_error() {
    let context = context(ContextOptions::default());
    let mut recorder = context.recorder();
    let result = recorder.record_draw(RenderStepId(77), &RenderPassDesc::default(), Vec4::ONE, |_, _, _| {});
    assert_eq!(result, Err(TinctureError::UnknownRenderStep(77)));
}

#[test]
fn draws_needing_an_unavailable_dst_read_are_dropped() -> anyhow::Result<()> {
    let context = context(ContextOptions::default());
    let pass = RenderPassDesc::default();
    let mut recorder = context.recorder();
    recorder.record_draw(FILL, &pass, Vec4::ONE, |ctx, builder, gatherer| {
        key_helpers::add_solid_color(ctx, builder, gatherer, Vec4::ONE);
        key_helpers::add_fixed_blend(builder, BlendMode::Multiply, false);
    })?;
    recorder.record_draw(FILL, &pass, Vec4::ONE, |ctx, builder, gatherer| {
        key_helpers::add_solid_color(ctx, builder, gatherer, Vec4::ONE);
        key_helpers::add_fixed_blend(builder, BlendMode::SrcOver, false);
    })?;

    let draws = recorder.resolve();
    assert_eq!(draws.len(), 1);
    assert_eq!(context.pipelines().stats().failures, 1);
    Ok(())
}

#[test]
fn labels_follow_the_options() -> anyhow::Result<()> {
    for label_pipelines in [false, true] {
        let context = context(ContextOptions {
            label_pipelines,
            ..ContextOptions::default()
        });
        let mut recorder = context.recorder();
        recorder.record_draw(FILL, &RenderPassDesc::default(), Vec4::ONE, |ctx, builder, gatherer| {
            key_helpers::add_solid_color(ctx, builder, gatherer, Vec4::ONE);
            key_helpers::add_fixed_blend(builder, BlendMode::Src, true);
        })?;
        let draws = recorder.resolve();
        assert_eq!(!draws[0].pipeline.1.is_empty(), label_pipelines);
    }
    Ok(())
}

// ============================================================================
// Precompilation
// ============================================================================

#[test]
fn persisted_descriptions_precompile() -> anyhow::Result<()> {
    let source = context(ContextOptions::default());
    let mut recorder = source.recorder();
    recorder.record_draw(FILL, &RenderPassDesc::default(), Vec4::ONE, |ctx, builder, gatherer| {
        key_helpers::add_solid_color(ctx, builder, gatherer, Vec4::ONE);
        key_helpers::add_fixed_blend(builder, BlendMode::Screen, false);
    })?;
    let blob = tincture::pipeline::serialize(&recorder.draws()[0].description, source.dictionary())?;

    let target = context(ContextOptions::default());
    let garbage = [0u8; 12];
    let available = target.precompile_serialized([blob.as_slice(), &garbage[..]]);
    assert_eq!(available, 1);
    assert_eq!(target.pipelines().global_cache().len(), 1);
    assert_eq!(target.dictionary().num_programs(), 1);
    Ok(())
}
