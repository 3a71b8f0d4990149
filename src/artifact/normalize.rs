//! Text canonicalization applied to every generated artifact before validation.
//!
//! Two passes run in order:
//! 1. quoted color names passed to style arguments become the upper-case constants
//!    the scene library exports (`color="blue"` -> `color=BLUE`);
//! 2. bare `Tex(` calls become `MathTex(`.
//!
//! Both passes are idempotent, so `normalize(normalize(x)) == normalize(x)`.

use regex::{Captures, Regex};
use std::sync::OnceLock;

fn style_argument_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"\b(color|fill_color|stroke_color|background_stroke_color)\s*=\s*['"]([A-Za-z_]+)['"](\s*[,)])"#,
        )
        .expect("style argument pattern is valid")
    })
}

fn set_color_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"\.set_color\(\s*['"]([A-Za-z_]+)['"]\s*\)"#)
            .expect("set_color pattern is valid")
    })
}

fn bare_tex_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(^|[^A-Za-z])Tex\s*\(").expect("bare Tex pattern is valid")
    })
}

/// Run both normalization passes.
pub fn normalize(text: &str) -> String {
    let text = canonicalize_colors(text);
    replace_bare_tex(&text)
}

/// Pass (a): quoted color literals to upper-case constants.
pub fn canonicalize_colors(text: &str) -> String {
    let text = style_argument_pattern().replace_all(text, |caps: &Captures| {
        format!("{}={}{}", &caps[1], caps[2].to_uppercase(), &caps[3])
    });
    set_color_pattern()
        .replace_all(&text, |caps: &Captures| {
            format!(".set_color({})", caps[1].to_uppercase())
        })
        .into_owned()
}

/// Pass (b): `Tex(` to `MathTex(` wherever `Tex` is not the tail of a longer name.
pub fn replace_bare_tex(text: &str) -> String {
    // The leading context character is consumed by each match, so back-to-back
    // occurrences (`Tex(Tex(`) need another sweep.
    let mut current = text.to_string();
    loop {
        let next = bare_tex_pattern()
            .replace_all(&current, "${1}MathTex(")
            .into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Byte offsets of bare `Tex(` calls, used by the validator.
pub(crate) fn bare_tex_offsets(text: &str) -> Vec<usize> {
    bare_tex_pattern()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.end()))
        .collect()
}
