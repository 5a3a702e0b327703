//! Device Capabilities
//!
//! [`Caps`] describes what the target device and backend can do. Program
//! generation consults it to choose between hardware and in-shader blending,
//! to pick a destination-read strategy, and to lay out uniform data.

use serde::{Deserialize, Serialize};
use tincture_core::{BlendFormula, BlendMode, Layout, get_blend_formula, get_lcd_blend_formula};

use crate::render_step::Coverage;

/// How a shader obtains the destination color when hardware blending cannot
/// express the requested blend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DstReadStrategy {
    /// Hardware blending suffices; nothing is read.
    #[default]
    NoneRequired,
    /// The destination is copied to a texture before the draw.
    TextureCopy,
    /// The destination texture is sampled directly.
    TextureSample,
    /// The destination is bound as an input attachment.
    ReadFromInput,
    /// The last fragment color is read in the same pass.
    FramebufferFetch,
}

impl DstReadStrategy {
    pub const ALL: [Self; 5] = [
        Self::NoneRequired,
        Self::TextureCopy,
        Self::TextureSample,
        Self::ReadFromInput,
        Self::FramebufferFetch,
    ];

    #[inline]
    #[must_use]
    pub fn from_u32(value: u32) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    #[inline]
    #[must_use]
    pub const fn uses_dst_sampler(self) -> bool {
        matches!(self, Self::TextureCopy | Self::TextureSample)
    }
}

/// Buffer layouts and binding slots the backend expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceBindingRequirements {
    pub uniform_buffer_layout: Layout,
    pub storage_buffer_layout: Layout,
    /// Textures and samplers are bound separately rather than combined.
    pub separate_texture_and_sampler_binding: bool,

    pub uniforms_set_index: u32,
    pub textures_and_samplers_set_index: u32,
    pub input_attachment_set_index: u32,

    pub intrinsic_buffer_binding: u32,
    pub render_step_buffer_binding: u32,
    pub paint_params_buffer_binding: u32,
}

impl Default for ResourceBindingRequirements {
    fn default() -> Self {
        Self {
            uniform_buffer_layout: Layout::Std140,
            storage_buffer_layout: Layout::Std430,
            separate_texture_and_sampler_binding: false,
            uniforms_set_index: 0,
            textures_and_samplers_set_index: 1,
            input_attachment_set_index: 2,
            intrinsic_buffer_binding: 0,
            render_step_buffer_binding: 1,
            paint_params_buffer_binding: 2,
        }
    }
}

/// Capabilities of the target device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Caps {
    pub resource_binding_requirements: ResourceBindingRequirements,
    /// Fragment shaders may write a second color consumed by blending.
    pub dual_source_blending: bool,
    /// The advanced blend equations are available in fixed function.
    pub hardware_advanced_blending: bool,
    /// Paint uniforms may live in per-draw storage buffer arrays.
    pub storage_buffer_support: bool,
    /// Strategy used when a render pass does not choose one.
    pub default_dst_read_strategy: DstReadStrategy,
}

impl Caps {
    /// Layout of the paint uniform data, depending on whether it lives in a
    /// storage buffer.
    #[inline]
    #[must_use]
    pub fn paint_uniform_layout(&self) -> Layout {
        if self.storage_buffer_support {
            self.resource_binding_requirements.storage_buffer_layout
        } else {
            self.resource_binding_requirements.uniform_buffer_layout
        }
    }

    /// Whether fixed-function blending can realize `mode` under `coverage`
    /// without the shader reading the destination.
    #[must_use]
    pub fn can_use_hardware_blending(&self, mode: BlendMode, is_opaque: bool, coverage: Coverage) -> bool {
        if !mode.is_coeff_mode() {
            return self.hardware_advanced_blending && coverage != Coverage::Lcd;
        }
        let (formula, _) = hardware_blend_formula(mode, is_opaque, coverage);
        !formula.has_secondary_output() || self.dual_source_blending
    }
}

/// The formula fixed-function blending uses for a coefficient mode, and
/// whether single-channel coverage is folded into the color instead of
/// being handled by the formula.
#[must_use]
pub fn hardware_blend_formula(mode: BlendMode, is_opaque: bool, coverage: Coverage) -> (BlendFormula, bool) {
    if coverage == Coverage::SingleChannel {
        let plain = get_blend_formula(is_opaque, false, mode);
        if plain.can_tweak_alpha_for_coverage() {
            return (plain, true);
        }
    }
    (coverage_blend_formula(mode, is_opaque, coverage), false)
}

/// The formula-table entry for a coefficient mode under `coverage`.
#[must_use]
pub fn coverage_blend_formula(mode: BlendMode, is_opaque: bool, coverage: Coverage) -> BlendFormula {
    match coverage {
        Coverage::Lcd => get_lcd_blend_formula(mode),
        Coverage::None => get_blend_formula(is_opaque, false, mode),
        Coverage::SingleChannel => get_blend_formula(is_opaque, true, mode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn src_over_is_always_hardware_blendable() {
        let caps = Caps::default();
        for coverage in [Coverage::None, Coverage::SingleChannel] {
            assert!(caps.can_use_hardware_blending(BlendMode::SrcOver, false, coverage));
        }
    }

    #[test]
    fn src_with_coverage_needs_dual_source() {
        let mut caps = Caps::default();
        assert!(!caps.can_use_hardware_blending(BlendMode::Src, false, Coverage::SingleChannel));
        caps.dual_source_blending = true;
        assert!(caps.can_use_hardware_blending(BlendMode::Src, false, Coverage::SingleChannel));
    }

    #[test]
    fn src_over_coverage_folds_into_alpha() {
        let (formula, tweak) = hardware_blend_formula(BlendMode::SrcOver, false, Coverage::SingleChannel);
        assert!(tweak);
        assert!(!formula.has_secondary_output());
        let (_, tweak) = hardware_blend_formula(BlendMode::SrcOver, false, Coverage::Lcd);
        assert!(!tweak);
    }

    #[test]
    fn advanced_modes_need_hardware_support_and_no_lcd() {
        let mut caps = Caps::default();
        assert!(!caps.can_use_hardware_blending(BlendMode::Multiply, false, Coverage::None));
        caps.hardware_advanced_blending = true;
        assert!(caps.can_use_hardware_blending(BlendMode::Multiply, false, Coverage::None));
        assert!(!caps.can_use_hardware_blending(BlendMode::Multiply, false, Coverage::Lcd));
    }
}
