//! Key Helpers
//!
//! One helper per block kind. Each adds its block to the key and writes the
//! block's uniforms and textures to the gatherer, so key words and uniform
//! bytes are produced in the same pre-order that program generation
//! declares them in.
//!
//! Helpers named `begin_*` open a block with children; the caller adds the
//! children and then calls [`PaintProgramKeyBuilder::end_block`].

use glam::{Mat3, Mat4, Vec2, Vec4};
use smallvec::SmallVec;
use tincture_core::{BlendMode, UniformValues};

use crate::builtins::{BuiltInCodeSnippetId as Id, GradientType};
use crate::data::{PipelineDataGatherer, SamplerDesc, TextureProxyId};
use crate::dictionary::ShaderCodeDictionary;
use crate::key::PaintProgramKeyBuilder;
use crate::runtime_effect::RuntimeEffect;

/// State shared by every block of one paint.
#[derive(Debug, Clone, Copy)]
pub struct KeyContext<'a> {
    dict: &'a ShaderCodeDictionary,
    paint_color: Vec4,
}

impl<'a> KeyContext<'a> {
    #[must_use]
    pub fn new(dict: &'a ShaderCodeDictionary, paint_color: Vec4) -> Self {
        Self { dict, paint_color }
    }

    #[inline]
    #[must_use]
    pub fn dictionary(&self) -> &'a ShaderCodeDictionary {
        self.dict
    }

    #[inline]
    #[must_use]
    pub fn paint_color(&self) -> Vec4 {
        self.paint_color
    }

    fn expect_uniforms(&self, gatherer: &mut PipelineDataGatherer, snippet_id: impl Into<i32>) {
        if let Some(snippet) = self.dict.get_entry(snippet_id.into()) {
            gatherer.uniforms().set_expected_uniforms(&snippet.uniforms);
        }
    }
}

// ─── Colors ──────────────────────────────────────────────────────────────────

pub fn add_solid_color(
    ctx: &KeyContext<'_>,
    builder: &mut PaintProgramKeyBuilder<'_>,
    gatherer: &mut PipelineDataGatherer,
    color: Vec4,
) {
    ctx.expect_uniforms(gatherer, Id::SolidColorShader);
    gatherer.uniforms().write_vec4(color);
    gatherer.uniforms().done_with_expected_uniforms();
    builder.add_block(Id::SolidColorShader);
}

/// The paint color with its alpha forced to one.
pub fn add_rgb_paint_color(
    ctx: &KeyContext<'_>,
    builder: &mut PaintProgramKeyBuilder<'_>,
    gatherer: &mut PipelineDataGatherer,
) {
    ctx.expect_uniforms(gatherer, Id::RgbPaintColor);
    gatherer.uniforms().write_paint_color(ctx.paint_color);
    gatherer.uniforms().done_with_expected_uniforms();
    builder.add_block(Id::RgbPaintColor);
}

/// The paint alpha applied to the prior color.
pub fn add_alpha_only_paint_color(
    ctx: &KeyContext<'_>,
    builder: &mut PaintProgramKeyBuilder<'_>,
    gatherer: &mut PipelineDataGatherer,
) {
    ctx.expect_uniforms(gatherer, Id::AlphaOnlyPaintColor);
    gatherer.uniforms().write_paint_color(ctx.paint_color);
    gatherer.uniforms().done_with_expected_uniforms();
    builder.add_block(Id::AlphaOnlyPaintColor);
}

pub fn add_prior_output(builder: &mut PaintProgramKeyBuilder<'_>) {
    builder.add_block(Id::PriorOutput);
}

pub fn add_primitive_color(builder: &mut PaintProgramKeyBuilder<'_>) {
    builder.add_block(Id::PrimitiveColor);
}

// ─── Shaders ─────────────────────────────────────────────────────────────────

/// Opens a block that transforms local coordinates for its one child.
pub fn begin_local_matrix(
    ctx: &KeyContext<'_>,
    builder: &mut PaintProgramKeyBuilder<'_>,
    gatherer: &mut PipelineDataGatherer,
    local_matrix: &Mat4,
) {
    ctx.expect_uniforms(gatherer, Id::LocalMatrixShader);
    gatherer.uniforms().write_mat4(local_matrix);
    gatherer.uniforms().done_with_expected_uniforms();
    builder.begin_block(Id::LocalMatrixShader);
}

/// Gradient geometry in local coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GradientGeometry {
    Linear { point0: Vec2, point1: Vec2 },
    Radial { center: Vec2, radius: f32 },
    Sweep { center: Vec2, bias: f32, scale: f32 },
    Conical { point0: Vec2, point1: Vec2, radius0: f32, radius1: f32 },
}

impl GradientGeometry {
    #[must_use]
    pub const fn gradient_type(&self) -> GradientType {
        match self {
            Self::Linear { .. } => GradientType::Linear,
            Self::Radial { .. } => GradientType::Radial,
            Self::Sweep { .. } => GradientType::Sweep,
            Self::Conical { .. } => GradientType::Conical,
        }
    }
}

/// A gradient of at most 8 stops.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientData {
    pub geometry: GradientGeometry,
    pub colors: SmallVec<[Vec4; 8]>,
    pub offsets: SmallVec<[f32; 8]>,
    pub tile_mode: i32,
    pub color_space: i32,
    pub do_unpremul: bool,
}

pub fn add_gradient(
    ctx: &KeyContext<'_>,
    builder: &mut PaintProgramKeyBuilder<'_>,
    gatherer: &mut PipelineDataGatherer,
    gradient: &GradientData,
) {
    debug_assert_eq!(gradient.colors.len(), gradient.offsets.len());
    debug_assert!(gradient.colors.len() <= 8, "gradients are limited to 8 stops");

    let snippet_id = gradient.geometry.gradient_type().snippet_id(gradient.colors.len());
    let stops = if gradient.colors.len() <= 4 { 4 } else { 8 };

    // Unused stops repeat the last one.
    let last_color = gradient.colors.last().copied().unwrap_or(Vec4::ZERO);
    let last_offset = gradient.offsets.last().copied().unwrap_or(1.0);
    let mut colors = [last_color; 8];
    let mut offsets = [last_offset; 8];
    colors[..gradient.colors.len().min(8)].copy_from_slice(&gradient.colors[..gradient.colors.len().min(8)]);
    offsets[..gradient.offsets.len().min(8)].copy_from_slice(&gradient.offsets[..gradient.offsets.len().min(8)]);

    ctx.expect_uniforms(gatherer, snippet_id);
    let uniforms = gatherer.uniforms();
    uniforms.write_vec4_array(&colors[..stops]);
    if stops == 4 {
        uniforms.write_vec4(Vec4::from_slice(&offsets[..4]));
    } else {
        uniforms.write_vec4_array(&[Vec4::from_slice(&offsets[..4]), Vec4::from_slice(&offsets[4..])]);
    }
    match gradient.geometry {
        GradientGeometry::Linear { point0, point1 } => {
            uniforms.write_vec2(point0);
            uniforms.write_vec2(point1);
        }
        GradientGeometry::Radial { center, radius } => {
            uniforms.write_vec2(center);
            uniforms.write_float(radius);
        }
        GradientGeometry::Sweep { center, bias, scale } => {
            uniforms.write_vec2(center);
            uniforms.write_float(bias);
            uniforms.write_float(scale);
        }
        GradientGeometry::Conical {
            point0,
            point1,
            radius0,
            radius1,
        } => {
            uniforms.write_vec2(point0);
            uniforms.write_vec2(point1);
            uniforms.write_float(radius0);
            uniforms.write_float(radius1);
        }
    }
    uniforms.write_int(gradient.tile_mode);
    uniforms.write_int(gradient.color_space);
    uniforms.write_int(i32::from(gradient.do_unpremul));
    uniforms.done_with_expected_uniforms();

    builder.add_block(snippet_id);
}

/// A sampled image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageData {
    pub texture: TextureProxyId,
    pub sampler: SamplerDesc,
    pub image_size: Vec2,
    /// Sampled region as `(left, top, right, bottom)`.
    pub subset: Vec4,
    pub tile_mode_x: i32,
    pub tile_mode_y: i32,
    pub filter_mode: i32,
}

pub fn add_image(
    ctx: &KeyContext<'_>,
    builder: &mut PaintProgramKeyBuilder<'_>,
    gatherer: &mut PipelineDataGatherer,
    image: &ImageData,
) {
    ctx.expect_uniforms(gatherer, Id::ImageShader);
    let uniforms = gatherer.uniforms();
    uniforms.write_vec2(image.image_size.recip());
    uniforms.write_vec4(image.subset);
    uniforms.write_int(image.tile_mode_x);
    uniforms.write_int(image.tile_mode_y);
    uniforms.write_int(image.filter_mode);
    uniforms.done_with_expected_uniforms();
    gatherer.add_texture(image.texture, image.sampler);

    builder.add_block(Id::ImageShader);
}

// ─── Color Filters ───────────────────────────────────────────────────────────

/// Parameters converting between two color spaces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorSpaceTransformData {
    pub flags: i32,
    pub src_kind: i32,
    pub gamut_transform: Mat3,
    pub dst_kind: i32,
    pub src_coeffs: [f32; 7],
    pub dst_coeffs: [f32; 7],
}

pub fn add_color_space_transform(
    ctx: &KeyContext<'_>,
    builder: &mut PaintProgramKeyBuilder<'_>,
    gatherer: &mut PipelineDataGatherer,
    data: &ColorSpaceTransformData,
) {
    let Some(snippet) = ctx.dict.get_entry(Id::ColorSpaceTransform.into()) else {
        return;
    };
    let uniforms = gatherer.uniforms();
    uniforms.set_expected_uniforms(&snippet.uniforms);
    uniforms.begin_struct(&snippet.uniforms);
    uniforms.write_int(data.flags);
    uniforms.write_int(data.src_kind);
    uniforms.write_half3x3(&data.gamut_transform);
    uniforms.write_int(data.dst_kind);
    uniforms.write_half_array(&data.src_coeffs);
    uniforms.write_half_array(&data.dst_coeffs);
    uniforms.end_struct();
    uniforms.done_with_expected_uniforms();

    builder.add_block(Id::ColorSpaceTransform);
}

pub fn add_matrix_color_filter(
    ctx: &KeyContext<'_>,
    builder: &mut PaintProgramKeyBuilder<'_>,
    gatherer: &mut PipelineDataGatherer,
    matrix: &Mat4,
    translate: Vec4,
    in_hsl: bool,
) {
    ctx.expect_uniforms(gatherer, Id::MatrixColorFilter);
    let uniforms = gatherer.uniforms();
    uniforms.write_mat4(matrix);
    uniforms.write_vec4(translate);
    uniforms.write_int(i32::from(in_hsl));
    uniforms.done_with_expected_uniforms();

    builder.add_block(Id::MatrixColorFilter);
}

// ─── Composition and Blending ────────────────────────────────────────────────

/// Opens a block whose first child's output is the second child's input.
pub fn begin_compose(builder: &mut PaintProgramKeyBuilder<'_>) {
    builder.begin_block(Id::Compose);
}

/// Opens a block blending its two children (source, then destination).
pub fn begin_blend_shader(
    ctx: &KeyContext<'_>,
    builder: &mut PaintProgramKeyBuilder<'_>,
    gatherer: &mut PipelineDataGatherer,
    mode: BlendMode,
) {
    ctx.expect_uniforms(gatherer, Id::BlendShader);
    gatherer.uniforms().write_int(mode as i32);
    gatherer.uniforms().done_with_expected_uniforms();
    builder.begin_block(Id::BlendShader);
}

/// Blends in the shader with the mode supplied as a uniform.
pub fn add_shader_based_blend(
    ctx: &KeyContext<'_>,
    builder: &mut PaintProgramKeyBuilder<'_>,
    gatherer: &mut PipelineDataGatherer,
    mode: BlendMode,
) {
    ctx.expect_uniforms(gatherer, Id::ShaderBasedBlend);
    gatherer.uniforms().write_int(mode as i32);
    gatherer.uniforms().done_with_expected_uniforms();
    builder.add_block(Id::ShaderBasedBlend);
}

/// Blend mode fixed in the key; realized by hardware when possible.
pub fn add_fixed_blend(builder: &mut PaintProgramKeyBuilder<'_>, mode: BlendMode, src_is_opaque: bool) {
    builder.add_block_with_data(Id::FixedBlend, &[mode as u32, u32::from(src_is_opaque)]);
}

/// Coverage from a device-space rectangle `(left, top, right, bottom)`.
pub fn add_rect_clip(
    ctx: &KeyContext<'_>,
    builder: &mut PaintProgramKeyBuilder<'_>,
    gatherer: &mut PipelineDataGatherer,
    rect: Vec4,
) {
    ctx.expect_uniforms(gatherer, Id::RectClip);
    gatherer.uniforms().write_vec4(rect);
    gatherer.uniforms().done_with_expected_uniforms();
    builder.add_block(Id::RectClip);
}

// ─── Runtime Effects ─────────────────────────────────────────────────────────

/// Registers `effect` if needed and opens its block; the caller adds
/// `effect.num_children()` children and closes it. `values` holds one entry
/// per declared uniform, in order.
pub fn begin_runtime_effect(
    ctx: &KeyContext<'_>,
    builder: &mut PaintProgramKeyBuilder<'_>,
    gatherer: &mut PipelineDataGatherer,
    effect: &RuntimeEffect,
    values: &[UniformValues<'_>],
) {
    debug_assert_eq!(values.len(), effect.uniforms().len(), "one value per runtime uniform");
    let snippet_id = ctx.dict.find_or_create_runtime_effect(effect);

    let uniforms = gatherer.uniforms();
    uniforms.set_expected_uniforms(effect.uniforms());
    for (uniform, value) in effect.uniforms().iter().zip(values) {
        uniforms.write(uniform.ty(), uniform.count(), *value);
    }
    uniforms.done_with_expected_uniforms();

    builder.begin_block(snippet_id);
}

/// A runtime effect without children.
pub fn add_runtime_effect(
    ctx: &KeyContext<'_>,
    builder: &mut PaintProgramKeyBuilder<'_>,
    gatherer: &mut PipelineDataGatherer,
    effect: &RuntimeEffect,
    values: &[UniformValues<'_>],
) {
    debug_assert_eq!(effect.num_children(), 0);
    begin_runtime_effect(ctx, builder, gatherer, effect, values);
    builder.end_block();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tincture_core::Layout;

    #[test]
    fn paint_color_is_written_once() {
        let dict = ShaderCodeDictionary::new();
        let ctx = KeyContext::new(&dict, Vec4::new(1.0, 0.5, 0.25, 1.0));
        let mut builder = PaintProgramKeyBuilder::new(&dict);
        let mut gatherer = PipelineDataGatherer::new(Layout::Std140);

        begin_compose(&mut builder);
        add_rgb_paint_color(&ctx, &mut builder, &mut gatherer);
        add_alpha_only_paint_color(&ctx, &mut builder, &mut gatherer);
        builder.end_block();
        add_fixed_blend(&mut builder, BlendMode::SrcOver, true);

        let (uniforms, textures) = gatherer.finish();
        assert_eq!(uniforms.map(|u| u.len()), Some(16));
        assert!(textures.is_none());
        assert_eq!(builder.num_roots(), 2);
    }

    #[test]
    fn gradient_pads_unused_stops() {
        let dict = ShaderCodeDictionary::new();
        let ctx = KeyContext::new(&dict, Vec4::ONE);
        let mut builder = PaintProgramKeyBuilder::new(&dict);
        let mut gatherer = PipelineDataGatherer::new(Layout::Std140);

        add_gradient(
            &ctx,
            &mut builder,
            &mut gatherer,
            &GradientData {
                geometry: GradientGeometry::Radial {
                    center: Vec2::ZERO,
                    radius: 10.0,
                },
                colors: SmallVec::from_slice(&[Vec4::X, Vec4::Y, Vec4::Z]),
                offsets: SmallVec::from_slice(&[0.0, 0.5, 1.0]),
                tile_mode: 0,
                color_space: 0,
                do_unpremul: false,
            },
        );
        assert_eq!(builder.lock_as_key(), &[Id::RadialGradientShader4 as u32]);

        let (uniforms, _) = gatherer.finish();
        let bytes = uniforms.unwrap();
        // colors[4] at 0, offsets at 64, center at 80, radius at 88, ints after.
        let offset_word = |at: usize| f32::from_le_bytes(bytes.as_bytes()[at..at + 4].try_into().unwrap());
        assert_eq!(offset_word(64 + 12), 1.0);
        assert_eq!(offset_word(88), 10.0);
        assert_eq!(bytes.len(), 112);
    }
}
