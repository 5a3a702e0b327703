//! Blend Modes and Fixed-Function Blend State
//!
//! [`BlendMode`] names a Porter-Duff or advanced color composition.
//! [`BlendEquation`] and [`BlendCoeff`] describe how fixed-function hardware
//! combines the shader output with the destination, and [`BlendInfo`] bundles
//! them into the state handed to a backend.

use serde::{Deserialize, Serialize};

// ─── Blend Mode ──────────────────────────────────────────────────────────────

/// A color composition mode.
///
/// The first 15 variants are coefficient modes expressible with a blend
/// equation and two coefficients. The rest are advanced modes that need
/// either hardware advanced blending or in-shader emulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum BlendMode {
    Clear,
    Src,
    Dst,
    SrcOver,
    DstOver,
    SrcIn,
    DstIn,
    SrcOut,
    DstOut,
    SrcATop,
    DstATop,
    Xor,
    Plus,
    Modulate,
    Screen,

    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Multiply,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

impl BlendMode {
    pub const LAST_COEFF_MODE: Self = Self::Screen;
    pub const LAST_SEPARABLE_MODE: Self = Self::Multiply;
    pub const LAST: Self = Self::Luminosity;

    /// Number of coefficient modes (the formula table width).
    pub const COEFF_MODE_COUNT: usize = Self::LAST_COEFF_MODE as usize + 1;
    pub const COUNT: usize = Self::LAST as usize + 1;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Clear,
        Self::Src,
        Self::Dst,
        Self::SrcOver,
        Self::DstOver,
        Self::SrcIn,
        Self::DstIn,
        Self::SrcOut,
        Self::DstOut,
        Self::SrcATop,
        Self::DstATop,
        Self::Xor,
        Self::Plus,
        Self::Modulate,
        Self::Screen,
        Self::Overlay,
        Self::Darken,
        Self::Lighten,
        Self::ColorDodge,
        Self::ColorBurn,
        Self::HardLight,
        Self::SoftLight,
        Self::Difference,
        Self::Exclusion,
        Self::Multiply,
        Self::Hue,
        Self::Saturation,
        Self::Color,
        Self::Luminosity,
    ];

    #[inline]
    #[must_use]
    pub fn from_u32(value: u32) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    #[inline]
    #[must_use]
    pub const fn is_coeff_mode(self) -> bool {
        (self as u8) <= Self::LAST_COEFF_MODE as u8
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::Src => "Src",
            Self::Dst => "Dst",
            Self::SrcOver => "SrcOver",
            Self::DstOver => "DstOver",
            Self::SrcIn => "SrcIn",
            Self::DstIn => "DstIn",
            Self::SrcOut => "SrcOut",
            Self::DstOut => "DstOut",
            Self::SrcATop => "SrcATop",
            Self::DstATop => "DstATop",
            Self::Xor => "Xor",
            Self::Plus => "Plus",
            Self::Modulate => "Modulate",
            Self::Screen => "Screen",
            Self::Overlay => "Overlay",
            Self::Darken => "Darken",
            Self::Lighten => "Lighten",
            Self::ColorDodge => "ColorDodge",
            Self::ColorBurn => "ColorBurn",
            Self::HardLight => "HardLight",
            Self::SoftLight => "SoftLight",
            Self::Difference => "Difference",
            Self::Exclusion => "Exclusion",
            Self::Multiply => "Multiply",
            Self::Hue => "Hue",
            Self::Saturation => "Saturation",
            Self::Color => "Color",
            Self::Luminosity => "Luminosity",
        }
    }
}

// ─── Equations & Coefficients ────────────────────────────────────────────────

/// Fixed-function blend equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlendEquation {
    Add,
    Subtract,
    ReverseSubtract,

    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Multiply,
    HslHue,
    HslSaturation,
    HslColor,
    HslLuminosity,

    Illegal,
}

impl BlendEquation {
    /// Advanced equations ignore the coefficients.
    #[inline]
    #[must_use]
    pub const fn is_advanced(self) -> bool {
        !matches!(
            self,
            Self::Add | Self::Subtract | Self::ReverseSubtract | Self::Illegal
        )
    }

    #[must_use]
    pub const fn for_advanced_mode(mode: BlendMode) -> Self {
        match mode {
            BlendMode::Screen => Self::Screen,
            BlendMode::Overlay => Self::Overlay,
            BlendMode::Darken => Self::Darken,
            BlendMode::Lighten => Self::Lighten,
            BlendMode::ColorDodge => Self::ColorDodge,
            BlendMode::ColorBurn => Self::ColorBurn,
            BlendMode::HardLight => Self::HardLight,
            BlendMode::SoftLight => Self::SoftLight,
            BlendMode::Difference => Self::Difference,
            BlendMode::Exclusion => Self::Exclusion,
            BlendMode::Multiply => Self::Multiply,
            BlendMode::Hue => Self::HslHue,
            BlendMode::Saturation => Self::HslSaturation,
            BlendMode::Color => Self::HslColor,
            BlendMode::Luminosity => Self::HslLuminosity,
            _ => Self::Illegal,
        }
    }
}

/// Fixed-function blend coefficient.
///
/// `S2*` coefficients reference the secondary (dual-source) shader output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlendCoeff {
    Zero,
    One,
    /// src color
    SC,
    /// one minus src color
    ISC,
    /// dst color
    DC,
    /// one minus dst color
    IDC,
    /// src alpha
    SA,
    /// one minus src alpha
    ISA,
    /// dst alpha
    DA,
    /// one minus dst alpha
    IDA,
    /// constant color
    ConstC,
    /// one minus constant color
    IConstC,
    S2C,
    IS2C,
    S2A,
    IS2A,

    Illegal,
}

impl BlendCoeff {
    #[inline]
    #[must_use]
    pub const fn refs_src(self) -> bool {
        matches!(self, Self::SC | Self::ISC | Self::SA | Self::ISA)
    }

    #[inline]
    #[must_use]
    pub const fn refs_dst(self) -> bool {
        matches!(self, Self::DC | Self::IDC | Self::DA | Self::IDA)
    }

    #[inline]
    #[must_use]
    pub const fn refs_src2(self) -> bool {
        matches!(self, Self::S2C | Self::IS2C | Self::S2A | Self::IS2A)
    }

    #[inline]
    #[must_use]
    pub const fn refs_const(self) -> bool {
        matches!(self, Self::ConstC | Self::IConstC)
    }

    fn to_wgpu(self) -> Option<wgpu::BlendFactor> {
        use wgpu::BlendFactor as F;
        Some(match self {
            Self::Zero => F::Zero,
            Self::One => F::One,
            Self::SC => F::Src,
            Self::ISC => F::OneMinusSrc,
            Self::DC => F::Dst,
            Self::IDC => F::OneMinusDst,
            Self::SA => F::SrcAlpha,
            Self::ISA => F::OneMinusSrcAlpha,
            Self::DA => F::DstAlpha,
            Self::IDA => F::OneMinusDstAlpha,
            Self::ConstC => F::Constant,
            Self::IConstC => F::OneMinusConstant,
            Self::S2C => F::Src1,
            Self::IS2C => F::OneMinusSrc1,
            Self::S2A => F::Src1Alpha,
            Self::IS2A => F::OneMinusSrc1Alpha,
            Self::Illegal => return None,
        })
    }
}

/// Does the blend (eq, src, dst) leave the destination untouched?
#[inline]
#[must_use]
pub const fn blend_modifies_dst(eq: BlendEquation, src: BlendCoeff, dst: BlendCoeff) -> bool {
    !matches!(eq, BlendEquation::Add | BlendEquation::ReverseSubtract)
        || !matches!(src, BlendCoeff::Zero)
        || !matches!(dst, BlendCoeff::One)
}

/// Whether the blend output depends on the destination color.
#[inline]
#[must_use]
pub const fn blend_uses_dst_color(src: BlendCoeff, dst: BlendCoeff, src_is_opaque: bool) -> bool {
    src.refs_dst()
        || (!matches!(dst, BlendCoeff::Zero) && !(matches!(dst, BlendCoeff::ISA) && src_is_opaque))
}

/// Whether the blend output depends on the primary source color.
#[inline]
#[must_use]
pub const fn blend_uses_src_color(src: BlendCoeff, dst: BlendCoeff) -> bool {
    !matches!(src, BlendCoeff::Zero) || dst.refs_src()
}

/// Whether coverage may be applied by scaling the source alpha.
#[inline]
#[must_use]
pub const fn blend_allows_coverage_as_alpha(
    eq: BlendEquation,
    src: BlendCoeff,
    dst: BlendCoeff,
) -> bool {
    eq.is_advanced()
        || !blend_modifies_dst(eq, src, dst)
        || (matches!(eq, BlendEquation::Add | BlendEquation::ReverseSubtract)
            && !src.refs_src()
            && matches!(dst, BlendCoeff::One | BlendCoeff::ISC | BlendCoeff::ISA))
}

// ─── Blend Info ──────────────────────────────────────────────────────────────

/// Fixed-function blend state for one pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendInfo {
    pub equation: BlendEquation,
    pub src_blend: BlendCoeff,
    pub dst_blend: BlendCoeff,
    pub writes_color: bool,
}

impl Default for BlendInfo {
    fn default() -> Self {
        Self {
            equation: BlendEquation::Add,
            src_blend: BlendCoeff::One,
            dst_blend: BlendCoeff::Zero,
            writes_color: true,
        }
    }
}

impl BlendInfo {
    /// The plain fixed-function mapping of a blend mode, ignoring coverage.
    #[must_use]
    pub const fn for_mode(mode: BlendMode) -> Self {
        use BlendCoeff as C;
        let (src_blend, dst_blend) = match mode {
            BlendMode::Clear => (C::Zero, C::Zero),
            BlendMode::Src => (C::One, C::Zero),
            BlendMode::Dst => (C::Zero, C::One),
            BlendMode::SrcOver => (C::One, C::ISA),
            BlendMode::DstOver => (C::IDA, C::One),
            BlendMode::SrcIn => (C::DA, C::Zero),
            BlendMode::DstIn => (C::Zero, C::SA),
            BlendMode::SrcOut => (C::IDA, C::Zero),
            BlendMode::DstOut => (C::Zero, C::ISA),
            BlendMode::SrcATop => (C::DA, C::ISA),
            BlendMode::DstATop => (C::IDA, C::SA),
            BlendMode::Xor => (C::IDA, C::ISA),
            BlendMode::Plus => (C::One, C::One),
            BlendMode::Modulate => (C::Zero, C::SC),
            BlendMode::Screen => (C::One, C::ISC),
            _ => {
                return Self {
                    equation: BlendEquation::for_advanced_mode(mode),
                    src_blend: C::One,
                    dst_blend: C::ISA,
                    writes_color: true,
                };
            }
        };
        Self {
            equation: BlendEquation::Add,
            src_blend,
            dst_blend,
            writes_color: true,
        }
    }

    #[inline]
    #[must_use]
    pub const fn modifies_dst(&self) -> bool {
        blend_modifies_dst(self.equation, self.src_blend, self.dst_blend)
    }

    /// Converts to `wgpu` blend state. Advanced equations have no `wgpu`
    /// counterpart and yield `None`.
    #[must_use]
    pub fn to_wgpu(&self) -> Option<wgpu::BlendState> {
        let operation = match self.equation {
            BlendEquation::Add => wgpu::BlendOperation::Add,
            BlendEquation::Subtract => wgpu::BlendOperation::Subtract,
            BlendEquation::ReverseSubtract => wgpu::BlendOperation::ReverseSubtract,
            _ => return None,
        };
        let component = wgpu::BlendComponent {
            src_factor: self.src_blend.to_wgpu()?,
            dst_factor: self.dst_blend.to_wgpu()?,
            operation,
        };
        Some(wgpu::BlendState {
            color: component,
            alpha: component,
        })
    }

    /// Color write mask matching `writes_color`.
    #[must_use]
    pub fn color_writes(&self) -> wgpu::ColorWrites {
        if self.writes_color {
            wgpu::ColorWrites::ALL
        } else {
            wgpu::ColorWrites::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coeff_mode_boundary() {
        assert!(BlendMode::Screen.is_coeff_mode());
        assert!(!BlendMode::Overlay.is_coeff_mode());
        assert_eq!(BlendMode::COEFF_MODE_COUNT, 15);
        assert_eq!(BlendMode::COUNT, 29);
    }

    #[test]
    fn from_u32_round_trips_discriminants() {
        for mode in BlendMode::ALL {
            assert_eq!(BlendMode::from_u32(mode as u32), Some(mode));
        }
        assert_eq!(BlendMode::from_u32(29), None);
    }

    #[test]
    fn src_over_maps_to_wgpu_premultiplied_alpha() {
        let state = BlendInfo::for_mode(BlendMode::SrcOver).to_wgpu();
        assert_eq!(state, Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING));
    }

    #[test]
    fn advanced_modes_have_no_wgpu_state() {
        assert!(BlendInfo::for_mode(BlendMode::Multiply).to_wgpu().is_none());
    }

    #[test]
    fn dst_mode_does_not_modify_dst() {
        assert!(!BlendInfo::for_mode(BlendMode::Dst).modifies_dst());
        assert!(BlendInfo::for_mode(BlendMode::SrcOver).modifies_dst());
    }
}
