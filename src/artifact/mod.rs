//! Generated scene artifacts: canonicalization, entry-point lookup and static rules.

pub mod entry_point;
pub mod normalize;
pub mod rules;

pub use entry_point::{
    resolve_by_pattern, resolve_entry_point, resolve_structural, EntryPoint, Resolution,
    ResolveError,
};
pub use normalize::{canonicalize_colors, normalize, replace_bare_tex};
pub use rules::{format_findings, passes, RuleSet, Severity, ValidationFinding};

/// Result of running the full static pass over one artifact.
#[derive(Debug, Clone)]
pub struct StaticReport {
    pub normalized: String,
    pub entry_point: Result<EntryPoint, ResolveError>,
    pub findings: Vec<ValidationFinding>,
}

impl StaticReport {
    pub fn passes(&self) -> bool {
        passes(&self.findings)
    }
}

/// Normalize, resolve and validate `text` in one go.
pub fn inspect(text: &str, rules: &RuleSet) -> StaticReport {
    let normalized = normalize(text);
    let entry_point = resolve_entry_point(&normalized);
    let findings = rules.validate(&normalized);
    StaticReport {
        normalized,
        entry_point,
        findings,
    }
}
