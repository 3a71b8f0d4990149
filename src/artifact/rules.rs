//! Static rule checks over artifact text.
//!
//! Every check runs on every artifact, so one pass reports the complete finding list.
//! An artifact passes when it has no error-severity finding.

use crate::artifact::normalize::bare_tex_offsets;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Info => "INFO",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reported problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFinding {
    pub severity: Severity,
    pub message: String,
    /// 1-based line of the first offending occurrence.
    pub line: Option<usize>,
    pub suggestion: Option<String>,
}

impl ValidationFinding {
    fn error(message: &str, suggestion: &str) -> Self {
        Self {
            severity: Severity::Error,
            message: message.to_string(),
            line: None,
            suggestion: Some(suggestion.to_string()),
        }
    }

    fn warning(message: &str, suggestion: &str) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(message, suggestion)
        }
    }

    fn at_offset(mut self, text: &str, offset: usize) -> Self {
        self.line = Some(line_of(text, offset));
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)?;
        if let Some(line) = self.line {
            write!(f, " (Line {})", line)?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, " - Suggestion: {}", suggestion)?;
        }
        Ok(())
    }
}

fn line_of(text: &str, offset: usize) -> usize {
    text[..offset.min(text.len())].matches('\n').count() + 1
}

/// True when no finding is error-severity.
pub fn passes(findings: &[ValidationFinding]) -> bool {
    !findings.iter().any(ValidationFinding::is_error)
}

/// One finding per line, in report order.
pub fn format_findings(findings: &[ValidationFinding]) -> String {
    findings
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

pub const REQUIRED_IMPORTS: &[(&str, &str)] = &[
    ("from manim import *", "Code must import all Manim classes"),
    (
        "from leap.templates.base_scene import ManimVoiceoverBase",
        "Code must import ManimVoiceoverBase",
    ),
];

const BACKGROUND_PATTERNS: &[&str] = &[
    r"Rectangle\s*\(\s*width\s*=\s*FRAME_WIDTH",
    r"Rectangle\s*\(\s*width\s*=\s*config\.frame_width",
    r"Rectangle\s*\(\s*height\s*=\s*FRAME_HEIGHT",
    r"Rectangle\s*\(\s*height\s*=\s*config\.frame_height",
    r"ImageMobject\s*\(\s*.*\s*\)\s*.*\s*background",
    r"self\.camera\.background",
    r"ReplacementTransform\s*\(\s*self\.camera\.background",
];

fn background_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        BACKGROUND_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("background pattern is valid"))
            .collect()
    })
}

/// The fixed scene checklist.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleSet;

impl RuleSet {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate every rule in order and return all findings.
    pub fn validate(&self, text: &str) -> Vec<ValidationFinding> {
        let mut findings = Vec::new();
        check_imports(text, &mut findings);
        check_voiceover(text, &mut findings);
        check_construct(text, &mut findings);
        check_deprecated(text, &mut findings);
        check_background(text, &mut findings);
        check_math_primitive(text, &mut findings);
        findings
    }
}

fn check_imports(text: &str, findings: &mut Vec<ValidationFinding>) {
    for (import, message) in REQUIRED_IMPORTS {
        if !text.contains(import) {
            findings.push(ValidationFinding::error(
                message,
                &format!("Add '{}' at the top of the file", import),
            ));
        }
    }
}

fn check_voiceover(text: &str, findings: &mut Vec<ValidationFinding>) {
    if !text.contains("with self.voiceover") {
        findings.push(ValidationFinding::error(
            "Code must use voiceover blocks for animations",
            "Wrap animations in 'with self.voiceover(text=\"...\") as tracker:' blocks",
        ));
    }
}

fn check_construct(text: &str, findings: &mut Vec<ValidationFinding>) {
    if !text.contains("def construct(self)") {
        findings.push(ValidationFinding::error(
            "Scene class must have a construct method",
            "Add a 'def construct(self):' method to your Scene class",
        ));
    }
}

fn check_deprecated(text: &str, findings: &mut Vec<ValidationFinding>) {
    if let Some(offset) = text.find("self.clear()") {
        findings.push(
            ValidationFinding::error(
                "self.clear() removes the background. Use self.fade_out_scene() instead.",
                "Replace self.clear() with self.fade_out_scene()",
            )
            .at_offset(text, offset),
        );
    }
    if let Some(offset) = text.find("ShowCreation") {
        findings.push(
            ValidationFinding::warning(
                "ShowCreation is deprecated. Use Create() instead.",
                "Replace ShowCreation with Create",
            )
            .at_offset(text, offset),
        );
    }
}

fn check_background(text: &str, findings: &mut Vec<ValidationFinding>) {
    if let Some(m) = background_patterns().iter().find_map(|re| re.find(text)) {
        findings.push(
            ValidationFinding::error(
                "Code creates a background element which will conflict with the base scene background",
                "Remove all background creation. The base class already provides a background image.",
            )
            .at_offset(text, m.start()),
        );
    }
}

fn check_math_primitive(text: &str, findings: &mut Vec<ValidationFinding>) {
    if let Some(&offset) = bare_tex_offsets(text).first() {
        findings.push(
            ValidationFinding::error(
                "Using Tex instead of MathTex for mathematical expressions",
                "Replace Tex with MathTex for mathematical expressions",
            )
            .at_offset(text, offset),
        );
    }
}
