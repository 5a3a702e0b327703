//! Paint Program Keys
//!
//! A paint program key is a flat sequence of `u32` words encoding a forest
//! of blocks in pre-order. Each block is
//!
//! ```text
//! [snippet id] [payload word]* [child block]*
//! ```
//!
//! where the payload length and the child count are fixed by the snippet, so
//! nothing but ids and payload are stored. A complete key has a shading
//! root, a blend root and an optional clip root.
//!
//! Keys are assembled with [`PaintProgramKeyBuilder`], interned by the
//! [`ShaderCodeDictionary`], and referred to afterwards by their
//! [`UniquePaintProgramId`].

use std::fmt::Write as _;
use std::sync::Arc;

use tincture_core::{BlendMode, Result, TinctureError};

use crate::dictionary::ShaderCodeDictionary;
use crate::snippet::PayloadType;

/// Deepest block nesting accepted from untrusted key words.
pub const MAX_KEY_DEPTH: usize = 64;

// ─── Ids ─────────────────────────────────────────────────────────────────────

/// Names one interned key within one dictionary. `0` is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct UniquePaintProgramId(u32);

impl UniquePaintProgramId {
    pub const INVALID: Self = Self(0);

    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

// ─── Key ─────────────────────────────────────────────────────────────────────

/// An interned, immutable key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PaintProgramKey {
    words: Arc<[u32]>,
}

impl PaintProgramKey {
    pub(crate) fn from_arc(words: Arc<[u32]>) -> Self {
        Self { words }
    }

    #[inline]
    #[must_use]
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

// ─── Builder ─────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct BlockFrame {
    snippet_id: i32,
    expected_children: usize,
    children_added: usize,
    payload_remaining: usize,
}

/// Transient builder for one draw's key.
pub struct PaintProgramKeyBuilder<'d> {
    dict: &'d ShaderCodeDictionary,
    words: Vec<u32>,
    stack: Vec<BlockFrame>,
    num_roots: usize,
}

impl<'d> PaintProgramKeyBuilder<'d> {
    #[must_use]
    pub fn new(dict: &'d ShaderCodeDictionary) -> Self {
        Self {
            dict,
            words: Vec::with_capacity(16),
            stack: Vec::with_capacity(8),
            num_roots: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn dictionary(&self) -> &'d ShaderCodeDictionary {
        self.dict
    }

    pub fn reset(&mut self) {
        self.words.clear();
        self.stack.clear();
        self.num_roots = 0;
    }

    #[inline]
    #[must_use]
    pub fn num_roots(&self) -> usize {
        self.num_roots
    }

    /// Opens a block. Its payload must be added next, then exactly as many
    /// child blocks as the snippet declares.
    pub fn begin_block(&mut self, snippet_id: impl Into<i32>) {
        let mut snippet_id = snippet_id.into();
        let snippet = match self.dict.get_entry(snippet_id) {
            Some(snippet) => snippet,
            None => {
                debug_assert!(false, "unknown snippet id {snippet_id}");
                log::warn!("Unknown snippet id {snippet_id}; substituting the error snippet");
                snippet_id = crate::builtins::BuiltInCodeSnippetId::Error.into();
                match self.dict.get_entry(snippet_id) {
                    Some(snippet) => snippet,
                    None => return,
                }
            }
        };

        match self.stack.last_mut() {
            Some(parent) => {
                debug_assert_eq!(parent.payload_remaining, 0, "child added before payload");
                parent.children_added += 1;
                debug_assert!(
                    parent.children_added <= parent.expected_children,
                    "snippet {} given too many children",
                    parent.snippet_id
                );
            }
            None => self.num_roots += 1,
        }

        self.words.push(snippet_id as u32);
        self.stack.push(BlockFrame {
            snippet_id,
            expected_children: snippet.num_children,
            children_added: 0,
            payload_remaining: snippet.payload_word_count(),
        });
    }

    /// Appends payload words to the open block.
    pub fn add_data(&mut self, data: &[u32]) {
        if let Some(frame) = self.stack.last_mut() {
            debug_assert!(
                data.len() <= frame.payload_remaining,
                "snippet {} given too much payload",
                frame.snippet_id
            );
            frame.payload_remaining = frame.payload_remaining.saturating_sub(data.len());
        } else {
            debug_assert!(false, "payload added outside a block");
        }
        self.words.extend_from_slice(data);
    }

    pub fn end_block(&mut self) {
        let frame = self.stack.pop();
        debug_assert!(frame.is_some(), "end_block without begin_block");
        if let Some(frame) = frame {
            debug_assert_eq!(
                frame.payload_remaining, 0,
                "snippet {} closed with missing payload",
                frame.snippet_id
            );
            debug_assert_eq!(
                frame.children_added, frame.expected_children,
                "snippet {} closed with wrong child count",
                frame.snippet_id
            );
        }
    }

    /// A block with no payload and no children.
    pub fn add_block(&mut self, snippet_id: impl Into<i32>) {
        self.begin_block(snippet_id);
        self.end_block();
    }

    /// A leaf block with payload.
    pub fn add_block_with_data(&mut self, snippet_id: impl Into<i32>, data: &[u32]) {
        self.begin_block(snippet_id);
        self.add_data(data);
        self.end_block();
    }

    /// The finished key words. All blocks must be closed.
    #[must_use]
    pub fn lock_as_key(&self) -> &[u32] {
        debug_assert!(self.stack.is_empty(), "key locked with open blocks");
        &self.words
    }
}

// ─── Walking ─────────────────────────────────────────────────────────────────

/// Checks that `words` decode into complete blocks of known snippets and
/// returns the number of roots. Never panics on malformed input.
pub fn validate_key_words(dict: &ShaderCodeDictionary, words: &[u32]) -> Result<usize> {
    let mut cursor = 0;
    let mut roots = 0;
    while cursor < words.len() {
        skip_block(dict, words, &mut cursor, 0)?;
        roots += 1;
    }
    Ok(roots)
}

fn skip_block(
    dict: &ShaderCodeDictionary,
    words: &[u32],
    cursor: &mut usize,
    depth: usize,
) -> Result<()> {
    if depth >= MAX_KEY_DEPTH {
        return Err(TinctureError::MalformedKey(format!(
            "blocks nested deeper than {MAX_KEY_DEPTH}"
        )));
    }
    let raw = *words
        .get(*cursor)
        .ok_or_else(|| TinctureError::MalformedKey("truncated block".into()))?;
    let snippet_id = raw as i32;
    let snippet = dict
        .get_entry(snippet_id)
        .ok_or(TinctureError::UnknownSnippet(snippet_id))?;
    *cursor += 1 + snippet.payload_word_count();
    if *cursor > words.len() {
        return Err(TinctureError::MalformedKey(format!(
            "truncated payload for {}",
            snippet.name
        )));
    }
    for _ in 0..snippet.num_children {
        skip_block(dict, words, cursor, depth + 1)?;
    }
    Ok(())
}

/// Human-readable rendering such as `Compose [ SolidColor FixedBlend(SrcOver, 0) ]`.
#[must_use]
pub fn describe_key(dict: &ShaderCodeDictionary, words: &[u32]) -> String {
    let mut out = String::new();
    let mut cursor = 0;
    while cursor < words.len() {
        if !out.is_empty() {
            out.push(' ');
        }
        if describe_block(dict, words, &mut cursor, &mut out, 0).is_err() {
            out.push_str("<malformed>");
            break;
        }
    }
    out
}

fn describe_block(
    dict: &ShaderCodeDictionary,
    words: &[u32],
    cursor: &mut usize,
    out: &mut String,
    depth: usize,
) -> Result<()> {
    if depth >= MAX_KEY_DEPTH {
        return Err(TinctureError::MalformedKey("too deep".into()));
    }
    let raw = *words
        .get(*cursor)
        .ok_or_else(|| TinctureError::MalformedKey("truncated block".into()))?;
    let snippet = dict
        .get_entry(raw as i32)
        .ok_or(TinctureError::UnknownSnippet(raw as i32))?;
    *cursor += 1;
    out.push_str(&snippet.name);

    if !snippet.data_payload.is_empty() {
        let payload = words
            .get(*cursor..*cursor + snippet.payload_word_count())
            .ok_or_else(|| TinctureError::MalformedKey("truncated payload".into()))?;
        *cursor += payload.len();
        out.push('(');
        for (i, (field, word)) in snippet.data_payload.iter().zip(payload).enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = match field.ty {
                PayloadType::U32 => write!(out, "{word}"),
                PayloadType::I32 => write!(out, "{}", *word as i32),
                PayloadType::F32 => write!(out, "{}", f32::from_bits(*word)),
                PayloadType::BlendMode => match BlendMode::from_u32(*word) {
                    Some(mode) => write!(out, "{}", mode.name()),
                    None => write!(out, "?{word}"),
                },
            };
        }
        out.push(')');
    }

    if snippet.num_children > 0 {
        out.push_str(" [ ");
        for i in 0..snippet.num_children {
            if i > 0 {
                out.push(' ');
            }
            describe_block(dict, words, cursor, out, depth + 1)?;
        }
        out.push_str(" ]");
    }
    Ok(())
}
