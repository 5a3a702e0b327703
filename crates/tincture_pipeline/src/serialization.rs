//! Pipeline Description Serialization
//!
//! Byte-exact encoding of a [`PipelineDescription`] for persisted
//! precompilation caches. The paint program is stored as its key words, so
//! a blob written by one dictionary can be read into another.
//!
//! # Format
//!
//! Little-endian `u32` words:
//!
//! ```text
//! magic "TPDS" | version | render step | color format index | sample count
//! | write swizzle | dst read strategy | key word count | key words... | "TEND"
//! ```
//!
//! Readers reject anything that is not exactly this sequence.

use thiserror::Error;
use tincture_core::{Result, TinctureError};
use tincture_shader::{
    DstReadStrategy, RenderPassDesc, RenderStepId, ShaderCodeDictionary, Swizzle, UniquePaintProgramId,
    validate_key_words,
};

use crate::description::PipelineDescription;

pub const MAGIC: u32 = u32::from_le_bytes(*b"TPDS");
pub const END_TAG: u32 = u32::from_le_bytes(*b"TEND");
pub const VERSION: u32 = 1;

/// Color formats a serialized description may name, by index.
pub const SERIALIZABLE_FORMATS: [wgpu::TextureFormat; 10] = [
    wgpu::TextureFormat::Rgba8Unorm,
    wgpu::TextureFormat::Rgba8UnormSrgb,
    wgpu::TextureFormat::Bgra8Unorm,
    wgpu::TextureFormat::Bgra8UnormSrgb,
    wgpu::TextureFormat::R8Unorm,
    wgpu::TextureFormat::Rg8Unorm,
    wgpu::TextureFormat::R16Float,
    wgpu::TextureFormat::Rgba16Float,
    wgpu::TextureFormat::Rgb10a2Unorm,
    wgpu::TextureFormat::Rgba32Float,
];

const SERIALIZABLE_SAMPLE_COUNTS: [u32; 5] = [1, 2, 4, 8, 16];

/// Why a serialized description was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeserializeError {
    #[error("Bad magic tag: {0:#010x}")]
    BadMagic(u32),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Stream truncated")]
    Truncated,

    #[error("Missing end tag")]
    MissingEndTag,

    #[error("Unknown {field} value: {value}")]
    UnknownValue { field: &'static str, value: u32 },

    #[error("Invalid paint program key: {0}")]
    InvalidKey(String),

    #[error("{0} trailing bytes after end tag")]
    TrailingBytes(usize),
}

/// Encodes `desc`, storing its paint program as key words from `dict`.
pub fn serialize(desc: &PipelineDescription, dict: &ShaderCodeDictionary) -> Result<Vec<u8>> {
    let format_index = SERIALIZABLE_FORMATS
        .iter()
        .position(|&format| format == desc.render_pass.color_format)
        .ok_or(TinctureError::UnsupportedColorFormat(desc.render_pass.color_format))?;
    if !SERIALIZABLE_SAMPLE_COUNTS.contains(&desc.render_pass.sample_count) {
        return Err(TinctureError::UnsupportedSampleCount(desc.render_pass.sample_count));
    }

    let key = if desc.paint_id.is_valid() {
        Some(
            dict.lookup(desc.paint_id)
                .ok_or(TinctureError::UnknownPaintProgram(desc.paint_id.as_u32()))?,
        )
    } else {
        None
    };
    let key_words = key.as_ref().map_or(&[][..], |key| key.words());

    let mut words = Vec::with_capacity(9 + key_words.len());
    words.extend([
        MAGIC,
        VERSION,
        desc.render_step.as_u32(),
        format_index as u32,
        desc.render_pass.sample_count,
        desc.render_pass.write_swizzle.to_u32(),
        desc.render_pass.dst_read_strategy as u32,
        key_words.len() as u32,
    ]);
    words.extend_from_slice(key_words);
    words.push(END_TAG);

    Ok(words.iter().flat_map(|word| word.to_le_bytes()).collect())
}

struct WordReader<'a> {
    bytes: &'a [u8],
    cursor: usize,
}

impl<'a> WordReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, cursor: 0 }
    }

    fn remaining_words(&self) -> usize {
        (self.bytes.len() - self.cursor) / 4
    }

    fn next(&mut self) -> std::result::Result<u32, DeserializeError> {
        let word = self
            .bytes
            .get(self.cursor..self.cursor + 4)
            .and_then(|bytes| <[u8; 4]>::try_from(bytes).ok())
            .ok_or(DeserializeError::Truncated)?;
        self.cursor += 4;
        Ok(u32::from_le_bytes(word))
    }
}

/// Decodes a description, interning its paint program into `dict`.
pub fn deserialize(
    bytes: &[u8],
    dict: &ShaderCodeDictionary,
) -> std::result::Result<PipelineDescription, DeserializeError> {
    if bytes.len() % 4 != 0 {
        return Err(DeserializeError::Truncated);
    }
    let mut reader = WordReader::new(bytes);

    let magic = reader.next()?;
    if magic != MAGIC {
        return Err(DeserializeError::BadMagic(magic));
    }
    let version = reader.next()?;
    if version != VERSION {
        return Err(DeserializeError::VersionMismatch {
            expected: VERSION,
            found: version,
        });
    }

    let render_step = RenderStepId(reader.next()?);
    let format_index = reader.next()?;
    let color_format = *SERIALIZABLE_FORMATS
        .get(format_index as usize)
        .ok_or(DeserializeError::UnknownValue {
            field: "color format",
            value: format_index,
        })?;
    let sample_count = reader.next()?;
    if !SERIALIZABLE_SAMPLE_COUNTS.contains(&sample_count) {
        return Err(DeserializeError::UnknownValue {
            field: "sample count",
            value: sample_count,
        });
    }
    let swizzle_word = reader.next()?;
    let write_swizzle = Swizzle::from_u32(swizzle_word).ok_or(DeserializeError::UnknownValue {
        field: "write swizzle",
        value: swizzle_word,
    })?;
    let strategy_word = reader.next()?;
    let dst_read_strategy = DstReadStrategy::from_u32(strategy_word).ok_or(DeserializeError::UnknownValue {
        field: "dst read strategy",
        value: strategy_word,
    })?;

    let key_len = reader.next()? as usize;
    if key_len > reader.remaining_words() {
        return Err(DeserializeError::Truncated);
    }
    let key_words = (0..key_len)
        .map(|_| reader.next())
        .collect::<std::result::Result<Vec<u32>, _>>()?;

    if reader.next()? != END_TAG {
        return Err(DeserializeError::MissingEndTag);
    }
    let trailing = bytes.len() - reader.cursor;
    if trailing != 0 {
        return Err(DeserializeError::TrailingBytes(trailing));
    }

    let paint_id = if key_words.is_empty() {
        UniquePaintProgramId::INVALID
    } else {
        validate_key_words(dict, &key_words).map_err(|e| DeserializeError::InvalidKey(e.to_string()))?;
        dict.find_or_create(&key_words)
    };

    Ok(PipelineDescription {
        render_step,
        paint_id,
        render_pass: RenderPassDesc {
            color_format,
            sample_count,
            write_swizzle,
            dst_read_strategy,
        },
    })
}
