//! Normalization is idempotent on arbitrary artifact text.

use leap::artifact::normalize;
use leap::artifact::{canonicalize_colors, replace_bare_tex};
use proptest::prelude::*;

const FRAGMENTS: &[&str] = &[
    "Tex(",
    "Tex (",
    "MathTex(",
    "Text(",
    "SingleStringMathTex(",
    "color='blue'",
    "color = \"red\" ,",
    "fill_color='green')",
    "stroke_color=\"Yellow\",",
    ".set_color('purple')",
    "self.play(Write(",
    "\"",
    "'",
    ")",
    ",",
    " ",
    "\n",
    "\n    ",
    "x",
];

fn artifact_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            3 => prop::sample::select(FRAGMENTS).prop_map(str::to_string),
            1 => "[ -~]{0,8}",
        ],
        0..40,
    )
    .prop_map(|parts| parts.concat())
}

/// normalize(normalize(x)) == normalize(x)
#[test]
fn test_normalize_idempotent_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&artifact_text(), |text| {
            let once = normalize(&text);
            let twice = normalize(&once);
            prop_assert_eq!(once, twice);
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_each_pass_idempotent_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&artifact_text(), |text| {
            let colors = canonicalize_colors(&text);
            prop_assert_eq!(canonicalize_colors(&colors), colors.clone());
            let tex = replace_bare_tex(&text);
            prop_assert_eq!(replace_bare_tex(&tex), tex);
            Ok(())
        })
        .unwrap();
}

proptest! {
    #[test]
    fn normalized_text_has_no_bare_tex_calls(text in artifact_text()) {
        let normalized = normalize(&text);
        let bytes = normalized.as_bytes();
        for (i, _) in normalized.match_indices("Tex(") {
            let preceded_by_letter = i > 0 && bytes[i - 1].is_ascii_alphabetic();
            prop_assert!(preceded_by_letter, "bare Tex( at {} in {:?}", i, normalized);
        }
    }

    #[test]
    fn arbitrary_unicode_is_stable(text in any::<String>()) {
        let once = normalize(&text);
        prop_assert_eq!(normalize(&once), once);
    }
}
