//! Shader Code Dictionary
//!
//! Interns paint program keys into [`UniquePaintProgramId`]s and owns the
//! snippet catalog: the fixed built-ins followed by user-defined snippets
//! and registered runtime effects.
//!
//! One lock guards interning and registration. Expansion only reads a key
//! and its snippets, so any number of threads may expand concurrently.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::builtins::{BuiltInCodeSnippetId, built_in_snippets};
use crate::key::{PaintProgramKey, UniquePaintProgramId, describe_key};
use crate::runtime_effect::RuntimeEffect;
use crate::snippet::ShaderSnippet;

#[derive(Debug, Default)]
struct DictionaryState {
    key_map: FxHashMap<Arc<[u32]>, UniquePaintProgramId>,
    /// Indexed by id - 1.
    keys: Vec<Arc<[u32]>>,
    user_snippets: Vec<Arc<ShaderSnippet>>,
    /// (source hash, packed uniform size) to snippet id.
    runtime_effects: FxHashMap<(u64, u32), i32>,
}

/// Interns keys and resolves snippet ids. Shared between threads.
#[derive(Debug)]
pub struct ShaderCodeDictionary {
    built_in: Vec<Arc<ShaderSnippet>>,
    state: RwLock<DictionaryState>,
}

impl Default for ShaderCodeDictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl ShaderCodeDictionary {
    #[must_use]
    pub fn new() -> Self {
        Self {
            built_in: built_in_snippets(),
            state: RwLock::new(DictionaryState::default()),
        }
    }

    // ─── Interning ───────────────────────────────────────────────────────────

    /// Returns the id of `words`, interning a copy on first sight. An empty
    /// key yields [`UniquePaintProgramId::INVALID`].
    pub fn find_or_create(&self, words: &[u32]) -> UniquePaintProgramId {
        if words.is_empty() {
            return UniquePaintProgramId::INVALID;
        }
        if let Some(&id) = self.state.read().key_map.get(words) {
            return id;
        }

        let mut state = self.state.write();
        // Another thread may have interned it between the two locks.
        if let Some(&id) = state.key_map.get(words) {
            return id;
        }
        let words: Arc<[u32]> = Arc::from(words);
        state.keys.push(Arc::clone(&words));
        let id = UniquePaintProgramId::from_raw(state.keys.len() as u32);
        state.key_map.insert(words, id);
        drop(state);

        log::debug!("Interned paint program {}: {}", id.as_u32(), self.id_to_string(id));
        id
    }

    /// The key interned under `id`, if any.
    #[must_use]
    pub fn lookup(&self, id: UniquePaintProgramId) -> Option<PaintProgramKey> {
        let index = (id.as_u32() as usize).checked_sub(1)?;
        self.state
            .read()
            .keys
            .get(index)
            .map(|words| PaintProgramKey::from_arc(Arc::clone(words)))
    }

    #[must_use]
    pub fn num_programs(&self) -> usize {
        self.state.read().keys.len()
    }

    /// Human-readable form of the key behind `id`.
    #[must_use]
    pub fn id_to_string(&self, id: UniquePaintProgramId) -> String {
        match self.lookup(id) {
            Some(key) => describe_key(self, key.words()),
            None => "*invalid*".to_string(),
        }
    }

    // ─── Snippets ────────────────────────────────────────────────────────────

    #[must_use]
    pub fn get_entry(&self, snippet_id: i32) -> Option<Arc<ShaderSnippet>> {
        let index = usize::try_from(snippet_id).ok()?;
        if let Some(snippet) = self.built_in.get(index) {
            return Some(Arc::clone(snippet));
        }
        let user_index = index - self.built_in.len();
        self.state.read().user_snippets.get(user_index).cloned()
    }

    #[must_use]
    pub fn is_valid_snippet_id(&self, snippet_id: i32) -> bool {
        self.get_entry(snippet_id).is_some()
    }

    #[must_use]
    pub fn num_user_snippets(&self) -> usize {
        self.state.read().user_snippets.len()
    }

    /// Appends a snippet after the built-ins and returns its id.
    pub fn add_user_defined_snippet(&self, snippet: ShaderSnippet) -> i32 {
        let mut state = self.state.write();
        Self::push_user_snippet(&mut state, snippet)
    }

    fn push_user_snippet(state: &mut DictionaryState, snippet: ShaderSnippet) -> i32 {
        let id = BuiltInCodeSnippetId::COUNT + state.user_snippets.len() as i32;
        log::debug!("Registered snippet {} as {id}", snippet.name);
        state.user_snippets.push(Arc::new(snippet));
        id
    }

    /// Returns the snippet id of `effect`, registering it on first sight.
    ///
    /// Effects are identified by their source hash and packed uniform size.
    /// Two different sources colliding on both resolve to the first one
    /// registered.
    pub fn find_or_create_runtime_effect(&self, effect: &RuntimeEffect) -> i32 {
        let key = (effect.content_hash(), effect.uniform_size());
        if let Some(&id) = self.state.read().runtime_effects.get(&key) {
            return id;
        }

        let mut state = self.state.write();
        if let Some(&id) = state.runtime_effects.get(&key) {
            return id;
        }
        let id = Self::push_user_snippet(&mut state, effect.to_snippet());
        state.runtime_effects.insert(key, id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::BuiltInCodeSnippetId as Id;
    use crate::runtime_effect::RuntimeEffectKind;
    use tincture_core::{SlType, Uniform};

    #[test]
    fn ids_start_at_one_and_are_stable() {
        let dict = ShaderCodeDictionary::new();
        let a = [Id::SolidColorShader as u32, Id::FixedBlend as u32, 3, 0];
        let b = [Id::RgbPaintColor as u32, Id::FixedBlend as u32, 3, 0];
        let id_a = dict.find_or_create(&a);
        let id_b = dict.find_or_create(&b);
        assert_eq!(id_a.as_u32(), 1);
        assert_eq!(id_b.as_u32(), 2);
        assert_eq!(dict.find_or_create(&a.to_vec()), id_a);
        assert_eq!(dict.lookup(id_b).unwrap().words(), &b);
    }

    #[test]
    fn invalid_ids_look_up_to_nothing() {
        let dict = ShaderCodeDictionary::new();
        assert_eq!(dict.find_or_create(&[]), UniquePaintProgramId::INVALID);
        assert!(dict.lookup(UniquePaintProgramId::INVALID).is_none());
        assert!(dict.lookup(UniquePaintProgramId::from_raw(7)).is_none());
        assert_eq!(dict.id_to_string(UniquePaintProgramId::from_raw(7)), "*invalid*");
    }

    #[test]
    fn snippet_ranges() {
        let dict = ShaderCodeDictionary::new();
        assert!(dict.is_valid_snippet_id(Id::PrimitiveColor.into()));
        assert!(!dict.is_valid_snippet_id(Id::COUNT));
        assert!(!dict.is_valid_snippet_id(-1));
    }

    #[test]
    fn runtime_effects_are_deduplicated() {
        let dict = ShaderCodeDictionary::new();
        let effect = RuntimeEffect::new(RuntimeEffectKind::ColorFilter, "gain", "return inColor * gain;")
            .with_uniforms(vec![Uniform::owned("gain", SlType::Half, 0)]);
        let id = dict.find_or_create_runtime_effect(&effect);
        assert_eq!(id, Id::COUNT);
        assert_eq!(dict.find_or_create_runtime_effect(&effect.clone()), id);

        let other = RuntimeEffect::new(RuntimeEffectKind::ColorFilter, "gain", "return inColor;");
        assert_eq!(dict.find_or_create_runtime_effect(&other), Id::COUNT + 1);
        assert_eq!(dict.num_user_snippets(), 2);
        assert_eq!(dict.get_entry(id).unwrap().name, "gain");
    }
}
