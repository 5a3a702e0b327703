//! Shader code dictionary tests
//!
//! Tests for:
//! - Interning equal keys to one id and distinct keys to distinct ids
//! - Lookup returning the interned key
//! - Concurrent interning from many threads
//! - Runtime effect registration

use std::sync::Arc;
use std::thread;

use tincture::core::{BlendMode, SlType, Uniform};
use tincture::shader::{
    BuiltInCodeSnippetId as Id, PaintProgramKeyBuilder, RuntimeEffect, RuntimeEffectKind, ShaderCodeDictionary,
    UniquePaintProgramId,
};

fn solid_over(dict: &ShaderCodeDictionary, mode: BlendMode) -> Vec<u32> {
    let mut builder = PaintProgramKeyBuilder::new(dict);
    builder.add_block(Id::SolidColorShader);
    builder.add_block_with_data(Id::FixedBlend, &[mode as u32, 0]);
    builder.lock_as_key().to_vec()
}

// ============================================================================
// Interning
// ============================================================================

#[test]
fn equal_keys_share_an_id() {
    let dict = ShaderCodeDictionary::new();
    let a = dict.find_or_create(&solid_over(&dict, BlendMode::SrcOver));
    let b = dict.find_or_create(&solid_over(&dict, BlendMode::SrcOver));
    assert!(a.is_valid());
    assert_eq!(a, b);
    assert_eq!(dict.num_programs(), 1);
}

#[test]
fn distinct_keys_get_distinct_ids() {
    let dict = ShaderCodeDictionary::new();
    let ids: Vec<UniquePaintProgramId> = BlendMode::ALL
        .iter()
        .map(|&mode| dict.find_or_create(&solid_over(&dict, mode)))
        .collect();
    for (i, a) in ids.iter().enumerate() {
        for b in &ids[i + 1..] {
            assert_ne!(a, b);
        }
    }
    assert_eq!(dict.num_programs(), BlendMode::COUNT);
}

#[test]
fn lookup_returns_the_interned_key() {
    let dict = ShaderCodeDictionary::new();
    let words = solid_over(&dict, BlendMode::Screen);
    let id = dict.find_or_create(&words);
    let key = dict.lookup(id).expect("interned key");
    assert_eq!(key.words(), words.as_slice());
}

#[test]
fn invalid_ids_resolve_to_nothing() {
    let dict = ShaderCodeDictionary::new();
    assert!(dict.lookup(UniquePaintProgramId::INVALID).is_none());
    assert_eq!(dict.find_or_create(&[]), UniquePaintProgramId::INVALID);
    assert_eq!(dict.id_to_string(UniquePaintProgramId::INVALID), "*invalid*");
}

#[test]
fn concurrent_interning_agrees() {
    let dict = Arc::new(ShaderCodeDictionary::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let dict = Arc::clone(&dict);
            thread::spawn(move || {
                BlendMode::ALL
                    .iter()
                    .map(|&mode| dict.find_or_create(&solid_over(&dict, mode)))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let results: Vec<Vec<UniquePaintProgramId>> =
        handles.into_iter().map(|h| h.join().expect("interning thread")).collect();
    for ids in &results[1..] {
        assert_eq!(ids, &results[0]);
    }
    assert_eq!(dict.num_programs(), BlendMode::COUNT);
}

// ============================================================================
// Runtime Effects
// ============================================================================

#[test]
fn runtime_effects_register_once() {
    let dict = ShaderCodeDictionary::new();
    let effect = RuntimeEffect::new(RuntimeEffectKind::ColorFilter, "tint", "return inColor * tint;")
        .with_uniforms(vec![Uniform::new("tint", SlType::Half4)]);

    let a = dict.find_or_create_runtime_effect(&effect);
    let b = dict.find_or_create_runtime_effect(&effect);
    assert_eq!(a, b);
    assert!(a > Id::LAST as i32);
    assert!(dict.is_valid_snippet_id(a));
    assert_eq!(dict.num_user_snippets(), 1);
}
