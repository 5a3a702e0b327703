//! Error Types
//!
//! This module defines the error types shared by every Tincture crate.
//!
//! # Overview
//!
//! The main error type [`TinctureError`] covers the recoverable failure modes:
//! - Paint program lookups that resolve to nothing
//! - Program generation that needs a capability the device lacks
//! - Template rendering failures
//! - Unknown render steps and unserializable render pass settings
//! - Inconsistent context options
//!
//! Internal-consistency violations (arity mismatches, layout desync) are
//! assertions, not error values.
//!
//! # Usage
//!
//! Fallible APIs return [`Result<T>`], an alias for
//! `std::result::Result<T, TinctureError>`.

use thiserror::Error;

/// The main error type for Tincture.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TinctureError {
    // ========================================================================
    // Key & Dictionary Errors
    // ========================================================================
    /// The paint program id does not name an interned key.
    #[error("Unknown paint program id: {0}")]
    UnknownPaintProgram(u32),

    /// A snippet id is outside both the built-in and the user-defined range.
    #[error("Unknown code snippet id: {0}")]
    UnknownSnippet(i32),

    /// Key words do not decode into a well-formed block tree.
    #[error("Malformed paint program key: {0}")]
    MalformedKey(String),

    // ========================================================================
    // Program Generation Errors
    // ========================================================================
    /// The blend requires a destination read but the render pass offers none.
    #[error("Blend mode {0} requires a destination read, but no strategy is available")]
    MissingDstReadStrategy(&'static str),

    /// The program template failed to render.
    #[error("Template error: {0}")]
    Template(String),

    // ========================================================================
    // Pipeline Errors
    // ========================================================================
    /// No render step is registered under the given id.
    #[error("Unknown render step id: {0}")]
    UnknownRenderStep(u32),

    /// The color format has no entry in the serialization format table.
    #[error("Unsupported color format: {0:?}")]
    UnsupportedColorFormat(wgpu::TextureFormat),

    /// The sample count cannot be read back from a serialized description.
    #[error("Unsupported sample count: {0}")]
    UnsupportedSampleCount(u32),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Context options that no device can satisfy.
    #[error("Invalid context options: {0}")]
    InvalidOptions(String),
}

/// Alias for `Result<T, TinctureError>`.
pub type Result<T> = std::result::Result<T, TinctureError>;
