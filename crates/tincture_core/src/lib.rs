//! # Tincture Core
//!
//! Foundational types shared by the Tincture crates:
//!
//! - [`blend`]: blend modes, equations, coefficients and fixed-function state
//! - [`blend_formula`]: the precomputed blend formula tables
//! - [`uniform`]: shading-language element types and uniform declarations
//! - [`layout`]: buffer layout conventions and the offset calculator
//! - [`uniform_manager`]: the uniform value writer and data blocks
//! - [`errors`]: the shared error type

pub mod blend;
pub mod blend_formula;
pub mod errors;
pub mod layout;
pub mod uniform;
pub mod uniform_manager;

pub use blend::{BlendCoeff, BlendEquation, BlendInfo, BlendMode};
pub use blend_formula::{BlendFormula, OutputType, get_blend_formula, get_lcd_blend_formula};
pub use errors::{Result, TinctureError};
pub use layout::{Layout, LayoutRules, UniformOffsetCalculator};
pub use uniform::{SlType, TextureAndSampler, Uniform};
pub use uniform_manager::{UniformDataBlock, UniformManager, UniformValues};
