//! Expansion Nodes
//!
//! Expanding a key rebuilds a tree of [`ShaderNode`]s in a flat arena owned
//! by the expansion. Nodes are stored in pre-order, so a node's arena index
//! is also the position used to mangle its identifiers.

use std::sync::Arc;

use smallvec::SmallVec;
use tincture_core::{Result, TinctureError};

use crate::dictionary::ShaderCodeDictionary;
use crate::key::MAX_KEY_DEPTH;
use crate::shader_info::ShaderInfo;
use crate::snippet::{ShaderSnippet, SnippetArgs, SnippetRequirementFlags};

/// Index of a node within one expansion.
pub type NodeId = usize;

/// One block occurrence of an expanded key.
#[derive(Debug, Clone)]
pub struct ShaderNode {
    snippet_id: i32,
    snippet: Arc<ShaderSnippet>,
    key_index: usize,
    children: SmallVec<[NodeId; 4]>,
    required_flags: SnippetRequirementFlags,
    data: SmallVec<[u32; 4]>,
}

impl ShaderNode {
    #[inline]
    #[must_use]
    pub fn snippet_id(&self) -> i32 {
        self.snippet_id
    }

    #[inline]
    #[must_use]
    pub fn snippet(&self) -> &ShaderSnippet {
        &self.snippet
    }

    /// Pre-order position within the expansion.
    #[inline]
    #[must_use]
    pub fn key_index(&self) -> usize {
        self.key_index
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    #[inline]
    #[must_use]
    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    /// The snippet's own requirements united with those of every descendant.
    #[inline]
    #[must_use]
    pub fn required_flags(&self) -> SnippetRequirementFlags {
        self.required_flags
    }

    /// Payload words stored in the key.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &[u32] {
        &self.data
    }

    #[must_use]
    pub fn generate_expression(&self, info: &ShaderInfo, args: &SnippetArgs) -> String {
        (self.snippet.expression_generator)(info, self, args)
    }

    #[must_use]
    pub fn generate_preamble(&self, info: &ShaderInfo) -> Option<String> {
        self.snippet
            .preamble_generator
            .map(|generate| generate(info, self))
            .filter(|code| !code.is_empty())
    }
}

/// Rebuilds the node arena for `words` and returns it with the root ids.
pub fn build_tree(
    dict: &ShaderCodeDictionary,
    words: &[u32],
) -> Result<(Vec<ShaderNode>, SmallVec<[NodeId; 3]>)> {
    let mut nodes = Vec::with_capacity(words.len());
    let mut roots = SmallVec::new();
    let mut cursor = 0;
    while cursor < words.len() {
        roots.push(build_node(dict, words, &mut cursor, &mut nodes, 0)?);
    }
    Ok((nodes, roots))
}

fn build_node(
    dict: &ShaderCodeDictionary,
    words: &[u32],
    cursor: &mut usize,
    nodes: &mut Vec<ShaderNode>,
    depth: usize,
) -> Result<NodeId> {
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
    *cursor += 1;

    let data_end = *cursor + snippet.payload_word_count();
    let data = words
        .get(*cursor..data_end)
        .ok_or_else(|| TinctureError::MalformedKey(format!("truncated payload for {}", snippet.name)))?;
    *cursor = data_end;

    // Reserve the slot first so the arena index is the pre-order position.
    let id = nodes.len();
    nodes.push(ShaderNode {
        snippet_id,
        required_flags: snippet.requirement_flags,
        snippet: Arc::clone(&snippet),
        key_index: id,
        children: SmallVec::new(),
        data: SmallVec::from_slice(data),
    });

    let mut children = SmallVec::<[NodeId; 4]>::new();
    let mut flags = snippet.requirement_flags;
    for _ in 0..snippet.num_children {
        let child = build_node(dict, words, cursor, nodes, depth + 1)?;
        flags |= nodes[child].required_flags;
        children.push(child);
    }
    debug_assert_eq!(children.len(), snippet.num_children);

    let node = &mut nodes[id];
    node.children = children;
    node.required_flags = flags;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::BuiltInCodeSnippetId as Id;
    use crate::key::PaintProgramKeyBuilder;

    #[test]
    fn nodes_are_numbered_in_pre_order() {
        let dict = ShaderCodeDictionary::new();
        let mut builder = PaintProgramKeyBuilder::new(&dict);
        builder.begin_block(Id::Compose);
        builder.begin_block(Id::LocalMatrixShader);
        builder.add_block(Id::LinearGradientShader4);
        builder.end_block();
        builder.add_block(Id::MatrixColorFilter);
        builder.end_block();
        builder.add_block_with_data(Id::FixedBlend, &[3, 0]);

        let (nodes, roots) = build_tree(&dict, builder.lock_as_key()).unwrap();
        assert_eq!(roots.as_slice(), &[0, 4]);
        assert_eq!(nodes[0].children(), &[1, 3]);
        assert_eq!(nodes[1].children(), &[2]);
        assert_eq!(nodes[4].data(), &[3, 0]);
    }

    #[test]
    fn requirements_propagate_to_ancestors() {
        let dict = ShaderCodeDictionary::new();
        let mut builder = PaintProgramKeyBuilder::new(&dict);
        builder.begin_block(Id::Compose);
        builder.add_block(Id::ImageShader);
        builder.add_block(Id::MatrixColorFilter);
        builder.end_block();

        let (nodes, _) = build_tree(&dict, builder.lock_as_key()).unwrap();
        let flags = nodes[0].required_flags();
        assert!(flags.contains(SnippetRequirementFlags::LOCAL_COORDS));
        assert!(flags.contains(SnippetRequirementFlags::PRIOR_STAGE_OUTPUT));
        assert!(!nodes[0].snippet().needs_local_coords());
    }

    #[test]
    fn truncated_words_are_rejected() {
        let dict = ShaderCodeDictionary::new();
        let words = [Id::Compose as u32, Id::SolidColorShader as u32];
        assert!(matches!(
            build_tree(&dict, &words),
            Err(TinctureError::MalformedKey(_))
        ));
        let payload = [Id::FixedBlend as u32, 3];
        assert!(build_tree(&dict, &payload).is_err());
    }
}
