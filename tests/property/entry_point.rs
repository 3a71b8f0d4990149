//! Structural and pattern resolution agree on well-formed single-scene artifacts.

use leap::artifact::entry_point::SCENE_BASES;
use leap::artifact::{resolve_by_pattern, resolve_entry_point, resolve_structural, Resolution};
use proptest::prelude::*;

const BODIES: &[&str] = &[
    "    def construct(self):\n        self.wait(1)\n",
    "    def construct(self):\n        eq = MathTex(r\"a^2 + b^2 = c^2\")\n        self.play(Write(eq))\n",
    "    \"\"\"Narrated scene.\"\"\"\n\n    def construct(self):\n        with self.voiceover(text=\"Hello\") as tracker:\n            self.play(Create(Circle()), run_time=tracker.duration)\n",
];

/// Module docstring quoting a scene declaration that must not be picked.
const DECOY_DOCSTRING: &str =
    "\"\"\"Example from the docs:\n\nclass Decoy(Scene):\n    def construct(self):\n        pass\n\"\"\"\n\n";

fn class_name() -> impl Strategy<Value = String> {
    "[A-Z][A-Za-z0-9_]{0,15}".prop_filter("not a keyword", |name| {
        !matches!(name.as_str(), "None" | "True" | "False")
    })
}

fn artifact() -> impl Strategy<Value = (String, String)> {
    (
        class_name(),
        prop::sample::select(SCENE_BASES),
        prop::sample::select(BODIES),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(name, base, body, with_helper, with_docstring)| {
            let mut text = String::new();
            if with_docstring {
                text.push_str(DECOY_DOCSTRING);
            }
            text.push_str(
                "from manim import *\nfrom leap.templates.base_scene import ManimVoiceoverBase\n\n",
            );
            if with_helper {
                text.push_str("def helper(x):\n    return x * 2\n\n");
            }
            text.push_str(&format!("class {}({}):\n{}", name, base, body));
            (text, name)
        })
}

#[test]
fn test_structural_and_pattern_resolution_agree_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&artifact(), |(text, name)| {
            let structural = resolve_structural(&text).map_err(|e| {
                TestCaseError::fail(format!("structural failed: {} on {:?}", e, text))
            })?;
            let pattern = resolve_by_pattern(&text).map_err(|e| {
                TestCaseError::fail(format!("pattern failed: {} on {:?}", e, text))
            })?;
            prop_assert_eq!(&structural, &name);
            prop_assert_eq!(&pattern, &name);

            let entry = resolve_entry_point(&text).unwrap();
            prop_assert_eq!(entry.via, Resolution::Structural);
            Ok(())
        })
        .unwrap();
}

proptest! {
    #[test]
    fn unparseable_artifacts_fall_back_to_pattern(name in class_name()) {
        let text = format!("class {}(Scene):\n    def construct(self:\n        pass\n", name);
        let entry = resolve_entry_point(&text).unwrap();
        prop_assert_eq!(entry.via, Resolution::Pattern);
        prop_assert_eq!(entry.name, name);
    }
}
