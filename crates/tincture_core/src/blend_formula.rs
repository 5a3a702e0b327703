//! Blend Formula Table
//!
//! Maps `(source is opaque, has coverage, blend mode)` to a [`BlendFormula`]:
//! the shader outputs to produce and the fixed-function state that combines
//! them with the destination so that
//!
//! ```text
//! result = coverage * blend(src, dst) + (1 - coverage) * dst
//! ```
//!
//! holds without reading the destination in the shader.
//!
//! # Formula families
//!
//! | Constructor | Coverage handling |
//! |-------------|-------------------|
//! | [`coeff`] | none, coefficients pass through |
//! | [`sa_modulate`] | primary output scaled by source alpha |
//! | [`coverage_formula`] | secondary output with `IS2C` destination coefficient |
//! | [`src_coeff_zero`] | reverse-subtract, source coefficient folded into output |
//! | [`dst_coeff_zero`] | destination coefficient folded into `IS2A` |
//!
//! All tables are built at compile time; lookups are plain indexing.

use bitflags::bitflags;

use crate::blend::{
    BlendCoeff, BlendEquation, BlendMode, blend_allows_coverage_as_alpha, blend_modifies_dst,
    blend_uses_dst_color, blend_uses_src_color,
};

// ─── Output Types ────────────────────────────────────────────────────────────

/// What a shader writes to one of its color outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OutputType {
    /// No output.
    None,
    /// `outputCoverage`
    Coverage,
    /// `inputColor * outputCoverage`
    Modulate,
    /// `inputColor.a * outputCoverage`
    SAModulate,
    /// `(1 - inputColor.a) * outputCoverage`
    ISAModulate,
    /// `(1 - inputColor) * outputCoverage`
    ISCModulate,
}

bitflags! {
    /// Properties derived from the equation and coefficients of a formula.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BlendFormulaProperties: u8 {
        const MODIFIES_DST                   = 1 << 0;
        const UNAFFECTED_BY_DST              = 1 << 1;
        const UNAFFECTED_BY_DST_IF_OPAQUE    = 1 << 2;
        const USES_INPUT_COLOR               = 1 << 3;
        const CAN_TWEAK_ALPHA_FOR_COVERAGE   = 1 << 4;
    }
}

// ─── Blend Formula ───────────────────────────────────────────────────────────

/// An immutable blend descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendFormula {
    primary_output: OutputType,
    secondary_output: OutputType,
    equation: BlendEquation,
    src_coeff: BlendCoeff,
    dst_coeff: BlendCoeff,
    props: BlendFormulaProperties,
}

impl BlendFormula {
    const fn new(
        primary_output: OutputType,
        secondary_output: OutputType,
        equation: BlendEquation,
        src_coeff: BlendCoeff,
        dst_coeff: BlendCoeff,
    ) -> Self {
        Self {
            primary_output,
            secondary_output,
            equation,
            src_coeff,
            dst_coeff,
            props: Self::derive_properties(
                primary_output,
                secondary_output,
                equation,
                src_coeff,
                dst_coeff,
            ),
        }
    }

    const fn derive_properties(
        primary: OutputType,
        secondary: OutputType,
        eq: BlendEquation,
        src: BlendCoeff,
        dst: BlendCoeff,
    ) -> BlendFormulaProperties {
        let modifies_dst = blend_modifies_dst(eq, src, dst);
        let primary_modulates = primary as u8 >= OutputType::Modulate as u8;
        let secondary_modulates = secondary as u8 >= OutputType::Modulate as u8;

        let mut bits = 0u8;
        if modifies_dst {
            bits |= BlendFormulaProperties::MODIFIES_DST.bits();
        }
        if !blend_uses_dst_color(src, dst, false) {
            bits |= BlendFormulaProperties::UNAFFECTED_BY_DST.bits();
        }
        if !blend_uses_dst_color(src, dst, true) {
            bits |= BlendFormulaProperties::UNAFFECTED_BY_DST_IF_OPAQUE.bits();
        }
        if (primary_modulates && blend_uses_src_color(src, dst))
            || (secondary_modulates && dst.refs_src2())
        {
            bits |= BlendFormulaProperties::USES_INPUT_COLOR.bits();
        }
        if matches!(primary, OutputType::Modulate | OutputType::None)
            && matches!(secondary, OutputType::None)
            && blend_allows_coverage_as_alpha(eq, src, dst)
        {
            bits |= BlendFormulaProperties::CAN_TWEAK_ALPHA_FOR_COVERAGE.bits();
        }
        BlendFormulaProperties::from_bits_retain(bits)
    }

    #[inline]
    #[must_use]
    pub const fn primary_output(&self) -> OutputType {
        self.primary_output
    }

    #[inline]
    #[must_use]
    pub const fn secondary_output(&self) -> OutputType {
        self.secondary_output
    }

    #[inline]
    #[must_use]
    pub const fn equation(&self) -> BlendEquation {
        self.equation
    }

    #[inline]
    #[must_use]
    pub const fn src_coeff(&self) -> BlendCoeff {
        self.src_coeff
    }

    #[inline]
    #[must_use]
    pub const fn dst_coeff(&self) -> BlendCoeff {
        self.dst_coeff
    }

    #[inline]
    #[must_use]
    pub const fn properties(&self) -> BlendFormulaProperties {
        self.props
    }

    /// Requires dual-source blending.
    #[inline]
    #[must_use]
    pub const fn has_secondary_output(&self) -> bool {
        !matches!(self.secondary_output, OutputType::None)
    }

    #[inline]
    #[must_use]
    pub const fn modifies_dst(&self) -> bool {
        self.props.contains(BlendFormulaProperties::MODIFIES_DST)
    }

    #[inline]
    #[must_use]
    pub const fn unaffected_by_dst(&self) -> bool {
        self.props.contains(BlendFormulaProperties::UNAFFECTED_BY_DST)
    }

    #[inline]
    #[must_use]
    pub const fn unaffected_by_dst_if_opaque(&self) -> bool {
        self.props
            .contains(BlendFormulaProperties::UNAFFECTED_BY_DST_IF_OPAQUE)
    }

    #[inline]
    #[must_use]
    pub const fn uses_input_color(&self) -> bool {
        self.props.contains(BlendFormulaProperties::USES_INPUT_COLOR)
    }

    #[inline]
    #[must_use]
    pub const fn can_tweak_alpha_for_coverage(&self) -> bool {
        self.props
            .contains(BlendFormulaProperties::CAN_TWEAK_ALPHA_FOR_COVERAGE)
    }
}

// ─── Formula Families ────────────────────────────────────────────────────────

/// Coefficients pass through; no coverage. A zero source coefficient with
/// a zero or one destination coefficient needs no color output.
const fn coeff(src: BlendCoeff, dst: BlendCoeff) -> BlendFormula {
    let primary = if matches!(src, BlendCoeff::Zero) && matches!(dst, BlendCoeff::Zero | BlendCoeff::One) {
        OutputType::None
    } else {
        OutputType::Modulate
    };
    BlendFormula::new(
        primary,
        OutputType::None,
        BlendEquation::Add,
        src,
        dst,
    )
}

/// Primary output scaled by the source alpha.
const fn sa_modulate(src: BlendCoeff, dst: BlendCoeff) -> BlendFormula {
    BlendFormula::new(
        OutputType::SAModulate,
        OutputType::None,
        BlendEquation::Add,
        src,
        dst,
    )
}

/// Coverage carried by a secondary output, `D' = S * src + (1 - S2) * D`.
const fn coverage_formula(one_minus_dst_coeff: OutputType, src: BlendCoeff) -> BlendFormula {
    BlendFormula::new(
        OutputType::Modulate,
        one_minus_dst_coeff,
        BlendEquation::Add,
        src,
        BlendCoeff::IS2C,
    )
}

/// `D' = D - D * f * coverage` for formulas whose source coefficient is zero.
const fn src_coeff_zero(one_minus_dst_coeff: OutputType) -> BlendFormula {
    BlendFormula::new(
        one_minus_dst_coeff,
        OutputType::None,
        BlendEquation::ReverseSubtract,
        BlendCoeff::DC,
        BlendCoeff::One,
    )
}

/// `D' = S * src + (1 - coverage) * D` for formulas whose destination
/// coefficient is zero.
const fn dst_coeff_zero(src: BlendCoeff) -> BlendFormula {
    BlendFormula::new(
        OutputType::Modulate,
        OutputType::Coverage,
        BlendEquation::Add,
        src,
        BlendCoeff::IS2A,
    )
}

// ─── Tables ──────────────────────────────────────────────────────────────────

use BlendCoeff::{DA, IDA, ISA, ISC, One, SA, SC, Zero};
use OutputType::{Coverage, ISAModulate, ISCModulate, SAModulate};

type ModeRow = [BlendFormula; BlendMode::COEFF_MODE_COUNT];

/// Indexed `[source is opaque][has coverage][mode]`.
static BLEND_TABLE: [[ModeRow; 2]; 2] = [
    // Source alpha unknown.
    [
        // No coverage.
        [
            /* clear */ coeff(Zero, Zero),
            /* src */ coeff(One, Zero),
            /* dst */ coeff(Zero, One),
            /* src-over */ coeff(One, ISA),
            /* dst-over */ coeff(IDA, One),
            /* src-in */ coeff(DA, Zero),
            /* dst-in */ coeff(Zero, SA),
            /* src-out */ coeff(IDA, Zero),
            /* dst-out */ coeff(Zero, ISA),
            /* src-atop */ coeff(DA, ISA),
            /* dst-atop */ coeff(IDA, SA),
            /* xor */ coeff(IDA, ISA),
            /* plus */ coeff(One, One),
            /* modulate */ coeff(Zero, SC),
            /* screen */ coeff(One, ISC),
        ],
        // Has coverage.
        [
            /* clear */ src_coeff_zero(Coverage),
            /* src */ dst_coeff_zero(One),
            /* dst */ coeff(Zero, One),
            /* src-over */ coeff(One, ISA),
            /* dst-over */ coeff(IDA, One),
            /* src-in */ dst_coeff_zero(DA),
            /* dst-in */ src_coeff_zero(ISAModulate),
            /* src-out */ dst_coeff_zero(IDA),
            /* dst-out */ coeff(Zero, ISA),
            /* src-atop */ coeff(DA, ISA),
            /* dst-atop */ coverage_formula(ISAModulate, IDA),
            /* xor */ coeff(IDA, ISA),
            /* plus */ coeff(One, One),
            /* modulate */ src_coeff_zero(ISCModulate),
            /* screen */ coeff(One, ISC),
        ],
    ],
    // Source is opaque.
    [
        // No coverage.
        [
            /* clear */ coeff(Zero, Zero),
            /* src */ coeff(One, Zero),
            /* dst */ coeff(Zero, One),
            /* src-over */ coeff(One, Zero),
            /* dst-over */ coeff(IDA, One),
            /* src-in */ coeff(DA, Zero),
            /* dst-in */ coeff(Zero, One),
            /* src-out */ coeff(IDA, Zero),
            /* dst-out */ coeff(Zero, Zero),
            /* src-atop */ coeff(DA, Zero),
            /* dst-atop */ coeff(IDA, One),
            /* xor */ coeff(IDA, Zero),
            /* plus */ coeff(One, One),
            /* modulate */ coeff(Zero, SC),
            /* screen */ coeff(One, ISC),
        ],
        // Has coverage.
        [
            /* clear */ src_coeff_zero(Coverage),
            /* src */ coeff(One, ISA),
            /* dst */ coeff(Zero, One),
            /* src-over */ coeff(One, ISA),
            /* dst-over */ coeff(IDA, One),
            /* src-in */ coeff(DA, ISA),
            /* dst-in */ coeff(Zero, One),
            /* src-out */ coeff(IDA, ISA),
            /* dst-out */ src_coeff_zero(Coverage),
            /* src-atop */ coeff(DA, ISA),
            /* dst-atop */ coeff(IDA, One),
            /* xor */ coeff(IDA, ISA),
            /* plus */ coeff(One, One),
            /* modulate */ src_coeff_zero(ISCModulate),
            /* screen */ coeff(One, ISC),
        ],
    ],
];

/// Per-channel (LCD) coverage.
static LCD_BLEND_TABLE: ModeRow = [
    /* clear */ src_coeff_zero(Coverage),
    /* src */ coverage_formula(Coverage, One),
    /* dst */ coeff(Zero, One),
    /* src-over */ coverage_formula(SAModulate, One),
    /* dst-over */ coeff(IDA, One),
    /* src-in */ coverage_formula(Coverage, DA),
    /* dst-in */ src_coeff_zero(ISAModulate),
    /* src-out */ coverage_formula(Coverage, IDA),
    /* dst-out */ sa_modulate(Zero, ISC),
    /* src-atop */ coverage_formula(SAModulate, DA),
    /* dst-atop */ coverage_formula(ISAModulate, IDA),
    /* xor */ coverage_formula(SAModulate, IDA),
    /* plus */ coeff(One, One),
    /* modulate */ src_coeff_zero(ISCModulate),
    /* screen */ coeff(One, ISC),
];

/// Looks up the formula for a coefficient blend mode.
///
/// # Panics
///
/// Panics if `mode` is not a coefficient mode.
#[inline]
#[must_use]
pub fn get_blend_formula(is_opaque: bool, has_coverage: bool, mode: BlendMode) -> BlendFormula {
    assert!(
        mode.is_coeff_mode(),
        "blend formula table has no entry for {}",
        mode.name()
    );
    BLEND_TABLE[usize::from(is_opaque)][usize::from(has_coverage)][mode as usize]
}

/// Looks up the formula for per-channel (LCD) coverage.
///
/// # Panics
///
/// Panics if `mode` is not a coefficient mode.
#[inline]
#[must_use]
pub fn get_lcd_blend_formula(mode: BlendMode) -> BlendFormula {
    assert!(
        mode.is_coeff_mode(),
        "LCD blend formula table has no entry for {}",
        mode.name()
    );
    LCD_BLEND_TABLE[mode as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn src_over_without_coverage_passes_coefficients_through() {
        let f = get_blend_formula(false, false, BlendMode::SrcOver);
        assert_eq!(f.primary_output(), OutputType::Modulate);
        assert_eq!(f.secondary_output(), OutputType::None);
        assert_eq!(f.equation(), BlendEquation::Add);
        assert_eq!(f.src_coeff(), One);
        assert_eq!(f.dst_coeff(), ISA);
        assert!(f.modifies_dst());
        assert!(f.can_tweak_alpha_for_coverage());
        assert!(!f.unaffected_by_dst());
        assert!(f.unaffected_by_dst_if_opaque());
    }

    #[test]
    fn src_with_coverage_needs_secondary_output() {
        let f = get_blend_formula(false, true, BlendMode::Src);
        assert!(f.has_secondary_output());
        assert_eq!(f.secondary_output(), OutputType::Coverage);
        assert_eq!(f.dst_coeff(), BlendCoeff::IS2A);
        assert!(!f.can_tweak_alpha_for_coverage());
    }

    #[test]
    fn opaque_src_with_coverage_reduces_to_src_over() {
        let f = get_blend_formula(true, true, BlendMode::Src);
        assert!(!f.has_secondary_output());
        assert_eq!(
            (f.src_coeff(), f.dst_coeff()),
            (One, ISA)
        );
    }

    #[test]
    fn clear_with_coverage_uses_reverse_subtract() {
        let f = get_blend_formula(false, true, BlendMode::Clear);
        assert_eq!(f.equation(), BlendEquation::ReverseSubtract);
        assert_eq!(f.primary_output(), OutputType::Coverage);
        assert_eq!((f.src_coeff(), f.dst_coeff()), (BlendCoeff::DC, One));
        assert!(!f.uses_input_color());
    }

    #[test]
    fn dst_never_modifies_destination() {
        for opaque in [false, true] {
            for coverage in [false, true] {
                let f = get_blend_formula(opaque, coverage, BlendMode::Dst);
                assert!(!f.modifies_dst());
            }
        }
        assert!(!get_lcd_blend_formula(BlendMode::Dst).modifies_dst());
    }

    #[test]
    fn zero_source_pass_through_has_no_color_output() {
        for mode in [BlendMode::Clear, BlendMode::Dst, BlendMode::DstIn] {
            let f = get_blend_formula(true, false, mode);
            assert_eq!(f.primary_output(), OutputType::None, "{}", mode.name());
            assert!(!f.uses_input_color());
        }
        assert_eq!(
            get_blend_formula(true, false, BlendMode::Modulate).primary_output(),
            OutputType::Modulate
        );
    }

    #[test]
    fn lcd_src_over_modulates_by_source_alpha() {
        let f = get_lcd_blend_formula(BlendMode::SrcOver);
        assert_eq!(f.primary_output(), OutputType::Modulate);
        assert_eq!(f.secondary_output(), OutputType::SAModulate);
        assert!(f.uses_input_color());
    }

    #[test]
    fn lcd_dst_out_uses_sa_modulate_family() {
        let f = get_lcd_blend_formula(BlendMode::DstOut);
        assert_eq!(f.primary_output(), OutputType::SAModulate);
        assert_eq!((f.src_coeff(), f.dst_coeff()), (Zero, ISC));
    }

    #[test]
    #[should_panic(expected = "no entry for Overlay")]
    fn advanced_mode_is_rejected() {
        let _ = get_blend_formula(false, false, BlendMode::Overlay);
    }
}
