//! Property-based tests for `veil_core`.
//!
//! These tests verify invariants that should hold for all inputs,
//! catching edge cases that hand-written tests might miss.

use proptest::prelude::*;
use veil_core::prelude::*;

/// One plausible (or deliberately malformed) dotenv line.
fn dotenv_line() -> impl Strategy<Value = String> {
    let key = "[A-Z_][A-Z0-9_]{0,8}";
    prop_oneof![
        (key, "[a-zA-Z0-9%+/@.:-]{0,20}").prop_map(|(k, v)| format!("{k}={v}")),
        (key, "[a-z0-9]{1,16}").prop_map(|(k, v)| format!("export {k}={v}")),
        (key, "[a-z0-9 ]{0,16}").prop_map(|(k, v)| format!("{k}='{v}'")),
        (key, "[a-z0-9 ]{0,16}").prop_map(|(k, v)| format!("{k}=\"{v}\"")),
        (key, "[a-z0-9]{1,12}").prop_map(|(k, v)| format!("{k}={v} # trailing comment")),
        (key, "[a-z0-9]{0,12}").prop_map(|(k, v)| format!("#{k}={v}")),
        "[ a-zA-Z0-9]{0,20}".prop_map(|c| format!("# {c}")),
        Just(String::new()),
        // Lines that must parse to nothing.
        "[a-z !?.]{0,12}",
    ]
}

fn dotenv_content() -> impl Strategy<Value = String> {
    proptest::collection::vec(dotenv_line(), 0..12).prop_map(|lines| lines.join("\n"))
}

proptest! {
    /// Every record points at real input bytes, inside its line envelope,
    /// in ascending order, and never masks a value with itself.
    #[test]
    fn records_are_span_exact_and_ordered(content in dotenv_content()) {
        let mut engine = MaskEngine::new();
        let set = engine.generate(content.as_bytes(), Some("test.env")).unwrap();

        let mut sentinel = set.line_offsets.clone();
        sentinel.push(content.len());

        for record in &set.masks {
            prop_assert!(record.value_start < record.value_end);
            prop_assert!(record.value_end <= content.len());
            prop_assert_eq!(&content[record.value_start..record.value_end], record.value);
            prop_assert!(record.mask.as_ref() != record.value);
            prop_assert!(record.line_number <= record.value_end_line);
            prop_assert!(set.line_offsets[record.line_number - 1] <= record.value_start);
            prop_assert!(record.value_end <= sentinel[record.value_end_line]);
        }

        prop_assert!(set.masks.windows(2).all(|w| w[0].value_start < w[1].value_start));
    }

    /// Line offsets always start at zero and strictly increase.
    #[test]
    fn line_offsets_are_strictly_increasing(content in dotenv_content()) {
        let mut engine = MaskEngine::new();
        let parsed = engine.parse(content.as_bytes(), ParseOptions::default()).unwrap();

        prop_assert_eq!(parsed.line_offsets[0], 0);
        prop_assert!(parsed.line_offsets.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(parsed.line_offsets.iter().all(|&o| o <= content.len()));
    }

    /// Generating twice over the same input yields identical output.
    #[test]
    fn generate_is_idempotent(content in dotenv_content()) {
        let mut engine = MaskEngine::new();
        let first = engine.generate(content.as_bytes(), Some("a.env")).unwrap();
        let second = engine.generate(content.as_bytes(), Some("a.env")).unwrap();

        prop_assert_eq!(first, second);
    }

    /// An incremental full rebuild is indistinguishable from `generate`.
    #[test]
    fn incremental_full_rebuild_matches_generate(content in dotenv_content()) {
        let mut engine = MaskEngine::new();
        let mut cache = BufferCache::new();

        let incremental = engine
            .generate_incremental(content.as_bytes(), Some("a.env"), EditScope::FullRebuild, &mut cache)
            .unwrap();
        let full = engine.generate(content.as_bytes(), Some("a.env")).unwrap();

        prop_assert_eq!(&incremental.masks, &full.masks);
        prop_assert_eq!(&incremental.line_offsets, &full.line_offsets);
        prop_assert_eq!(&incremental.masks_to_apply, &full.masks);
    }

    /// When the fingerprint matches, the cached records come back verbatim
    /// and nothing is marked for redraw.
    #[test]
    fn fingerprint_fast_path_echoes_the_cache(content in dotenv_content()) {
        let mut engine = MaskEngine::new();
        let mut cache = BufferCache::new();

        let first = engine
            .generate_incremental(content.as_bytes(), None, EditScope::FullRebuild, &mut cache)
            .unwrap();
        let second = engine
            .generate_incremental(content.as_bytes(), None, EditScope::FullRebuild, &mut cache)
            .unwrap();

        prop_assert!(second.unchanged);
        prop_assert!(second.masks_to_apply.is_empty());
        prop_assert_eq!(second.masks, first.masks);
    }

    /// Re-masking only the lines that exist leaves the result equal to a
    /// full generate, for single-line edits that preserve byte layout.
    #[test]
    fn single_line_incremental_matches_generate(
        keys in proptest::collection::vec("[A-Z][A-Z0-9_]{0,6}", 2..6),
        edit_idx in 0usize..6,
    ) {
        // Build one entry per line with equal-length values, then rewrite
        // one line's value in place.
        let edit_idx = edit_idx % keys.len();
        let pre: String = keys.iter().map(|k| format!("{k}=val{:04}\n", 7)).collect();
        let post: String = keys
            .iter()
            .enumerate()
            .map(|(i, k)| {
                if i == edit_idx {
                    format!("{k}=new{:04}\n", 9)
                } else {
                    format!("{k}=val{:04}\n", 7)
                }
            })
            .collect();

        let mut engine = MaskEngine::new();
        let mut cache = BufferCache::new();
        engine
            .generate_incremental(pre.as_bytes(), None, EditScope::FullRebuild, &mut cache)
            .unwrap();

        let line = edit_idx + 1;
        let incremental = engine
            .generate_incremental(
                post.as_bytes(),
                None,
                EditScope::LineRange { min_line: line, max_line: line },
                &mut cache,
            )
            .unwrap();
        let full = engine.generate(post.as_bytes(), None).unwrap();

        prop_assert_eq!(incremental.masks, full.masks);
    }

    /// The tokeniser never panics, whatever the input.
    #[test]
    fn parse_never_panics(content in "\\PC*") {
        let mut engine = MaskEngine::new();
        let _ = engine.parse(content.as_bytes(), ParseOptions::default());
        let _ = engine.generate(content.as_bytes(), Some("x.env"));
    }

    /// Full-mode masks always match the value's byte length, whatever the
    /// configured mask character - including multi-byte ones.
    #[test]
    fn full_mode_preserves_byte_length(
        content in dotenv_content(),
        mask_char in prop_oneof![Just('*'), Just('#'), Just('•'), Just('█')],
    ) {
        let mut engine = MaskEngine::new();
        let options = ModeOptions::from([("mask_char".to_string(), OptionValue::from(mask_char))]);
        engine.configure_mode("full", options).unwrap();

        let set = engine.generate(content.as_bytes(), None).unwrap();

        for record in &set.masks {
            prop_assert_eq!(record.mask.len(), record.value.len());
        }
    }
}
