//! Entry-point resolution: which scene class the renderer should be told to run.
//!
//! The structural path parses the artifact with tree-sitter and walks class
//! definitions in document order. If the text does not parse cleanly, a line-oriented
//! pattern match over `class Name(Bases):` declarations is used instead. Both paths
//! apply the same preference: the first class whose base is a known scene type,
//! otherwise the first class declared.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::OnceLock;
use thiserror::Error;
use tree_sitter::{Node, Parser};

/// Base classes that mark a renderable scene.
pub const SCENE_BASES: &[&str] = &[
    "Scene",
    "ManimVoiceoverBase",
    "ThreeDScene",
    "MovingCameraScene",
];

/// How an entry point was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Structural,
    Pattern,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPoint {
    pub name: String,
    pub via: Resolution,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("Artifact could not be parsed: {0}")]
    Unparseable(String),

    #[error("No class definition found in the artifact")]
    NoClassFound,
}

/// A declared class and the simple names of its bases.
#[derive(Debug, Clone)]
struct ClassDecl {
    name: String,
    bases: Vec<String>,
}

impl ClassDecl {
    fn is_scene(&self) -> bool {
        self.bases.iter().any(|b| SCENE_BASES.contains(&b.as_str()))
    }
}

fn pick(classes: Vec<ClassDecl>) -> Option<String> {
    let preferred = classes.iter().position(ClassDecl::is_scene).unwrap_or(0);
    classes.into_iter().nth(preferred).map(|c| c.name)
}

/// Resolve the entry point, falling back to pattern matching when parsing fails.
pub fn resolve_entry_point(text: &str) -> Result<EntryPoint, ResolveError> {
    match resolve_structural(text) {
        Ok(name) => Ok(EntryPoint {
            name,
            via: Resolution::Structural,
        }),
        Err(structural) => {
            tracing::debug!(error = %structural, "Structural resolution failed, using pattern fallback");
            resolve_by_pattern(text).map(|name| EntryPoint {
                name,
                via: Resolution::Pattern,
            })
        }
    }
}

/// Resolve by parsing the artifact. Any syntax error counts as a failure.
pub fn resolve_structural(text: &str) -> Result<String, ResolveError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| ResolveError::Unparseable(e.to_string()))?;
    let tree = parser
        .parse(text, None)
        .ok_or_else(|| ResolveError::Unparseable("parser returned no tree".to_string()))?;

    let root = tree.root_node();
    if root.has_error() {
        return Err(ResolveError::Unparseable(
            "syntax error in artifact".to_string(),
        ));
    }

    let mut classes = Vec::new();
    collect_classes(root, text.as_bytes(), &mut classes);
    pick(classes).ok_or(ResolveError::NoClassFound)
}

fn collect_classes(node: Node, source: &[u8], out: &mut Vec<ClassDecl>) {
    if node.kind() == "class_definition" {
        if let Some(name) = node
            .child_by_field_name("name")
            .and_then(|n| n.utf8_text(source).ok())
        {
            out.push(ClassDecl {
                name: name.to_string(),
                bases: superclass_names(node, source),
            });
        }
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_classes(child, source, out);
    }
}

fn superclass_names(class_node: Node, source: &[u8]) -> Vec<String> {
    let Some(args) = class_node.child_by_field_name("superclasses") else {
        return Vec::new();
    };
    let mut cursor = args.walk();
    args.named_children(&mut cursor)
        .filter_map(|arg| match arg.kind() {
            "identifier" => arg.utf8_text(source).ok().map(str::to_string),
            "attribute" => arg
                .child_by_field_name("attribute")
                .and_then(|a| a.utf8_text(source).ok())
                .map(str::to_string),
            _ => None,
        })
        .collect()
}

fn class_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?m)^\s*class\s+(\w+)\s*(?:\(([^)]*)\))?\s*:")
            .expect("class declaration pattern is valid")
    })
}

fn triple_quoted() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?s)""".*?"""|'''.*?'''"#).expect("triple-quote pattern is valid")
    })
}

/// Blank out triple-quoted string bodies, keeping line breaks.
fn mask_triple_quoted(text: &str) -> Cow<'_, str> {
    triple_quoted().replace_all(text, |caps: &regex::Captures| {
        caps[0]
            .chars()
            .map(|c| if c == '\n' { '\n' } else { ' ' })
            .collect::<String>()
    })
}

/// Resolve from `class Name(Bases):` declarations without parsing.
///
/// Declarations inside closed triple-quoted strings are ignored.
pub fn resolve_by_pattern(text: &str) -> Result<String, ResolveError> {
    let masked = mask_triple_quoted(text);
    let classes = class_pattern()
        .captures_iter(&masked)
        .map(|caps| ClassDecl {
            name: caps[1].to_string(),
            bases: caps
                .get(2)
                .map(|m| {
                    m.as_str()
                        .split(',')
                        .filter_map(|base| {
                            let base = base.trim();
                            let simple = base.rsplit('.').next().unwrap_or(base).trim();
                            (!simple.is_empty()).then(|| simple.to_string())
                        })
                        .collect()
                })
                .unwrap_or_default(),
        })
        .collect();
    pick(classes).ok_or(ResolveError::NoClassFound)
}
