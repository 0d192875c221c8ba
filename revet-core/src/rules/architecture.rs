//! Architecture family: responsibility clustering, concrete coupling,
//! god objects, and tangled control flow.

use super::{Rule, RuleContext};
use crate::findings::{rule_ids, Family, Finding, Location, Severity};

/// Verb-prefix clusters used to estimate how many distinct responsibilities
/// a class carries. Matching is on method-name prefixes after lowercasing;
/// a method that fits no cluster is ignored rather than counted as its own.
const RESPONSIBILITY_CLUSTERS: &[(&str, &[&str])] = &[
    ("messaging", &["send", "notify", "emit", "publish", "broadcast"]),
    ("validation", &["validate", "check", "verify", "assert", "ensure"]),
    ("persistence", &["persist", "save", "store", "load", "read", "write", "delete"]),
    ("presentation", &["parse", "format", "render", "serialize", "deserialize", "display"]),
    ("computation", &["compute", "calculate", "derive", "score", "aggregate"]),
];

fn responsibility_clusters(method_names: &[String]) -> Vec<&'static str> {
    let mut hit = Vec::new();
    for (label, prefixes) in RESPONSIBILITY_CLUSTERS {
        let any = method_names.iter().any(|m| {
            let lower = m.to_lowercase();
            let trimmed = lower.strip_prefix('_').unwrap_or(&lower);
            prefixes.iter().any(|p| trimmed.starts_with(p))
        });
        if any {
            hit.push(*label);
        }
    }
    hit
}

/// Flags classes whose method names span more than one responsibility
/// cluster.
pub struct SrpResponsibilities;

impl Rule for SrpResponsibilities {
    fn id(&self) -> &'static str {
        rule_ids::SRP_VIOLATION
    }

    fn family(&self) -> Family {
        Family::Architecture
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let Some(model) = ctx.model else {
            return Vec::new();
        };
        let max_clusters = ctx.param(self.id(), "max_clusters", 1.0) as usize;

        model
            .classes
            .iter()
            .filter_map(|c| {
                let clusters = responsibility_clusters(&c.method_names);
                if clusters.len() <= max_clusters {
                    return None;
                }
                Some(Finding {
                    rule_id: self.id().to_string(),
                    family: self.family(),
                    severity: Severity::Medium,
                    location: Location::new(&ctx.file.path, c.span.start_line, c.span.end_line),
                    message: format!(
                        "class `{}` mixes {} responsibilities: {}",
                        c.name,
                        clusters.len(),
                        clusters.join(", ")
                    ),
                    recommendation: "split the class so each part owns one of these concerns"
                        .to_string(),
                    evidence: clusters.iter().map(|s| s.to_string()).collect(),
                    external_id: None,
                })
            })
            .collect()
    }
}

/// Flags classes that construct many concrete collaborators directly
/// instead of receiving them.
pub struct DirectInstantiation;

impl Rule for DirectInstantiation {
    fn id(&self) -> &'static str {
        rule_ids::DIP_VIOLATION
    }

    fn family(&self) -> Family {
        Family::Architecture
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let Some(model) = ctx.model else {
            return Vec::new();
        };
        let max_constructions = ctx.param(self.id(), "max_constructions", 2.0) as usize;

        model
            .classes
            .iter()
            .filter_map(|c| {
                let constructed: Vec<&str> = model
                    .call_sites
                    .iter()
                    .filter(|call| call.is_constructor && c.span.contains(&call.span))
                    .map(|call| call.callee.as_str())
                    .collect();
                if constructed.len() <= max_constructions {
                    return None;
                }
                Some(Finding {
                    rule_id: self.id().to_string(),
                    family: self.family(),
                    severity: Severity::Medium,
                    location: Location::new(&ctx.file.path, c.span.start_line, c.span.end_line),
                    message: format!(
                        "class `{}` directly instantiates {} concrete collaborators",
                        c.name,
                        constructed.len()
                    ),
                    recommendation: "inject the collaborators through the constructor or accept \
                                     an interface"
                        .to_string(),
                    evidence: constructed.iter().map(|s| s.to_string()).collect(),
                    external_id: None,
                })
            })
            .collect()
    }
}

/// Flags classes that have grown past reasonable single-unit size.
pub struct GodObject;

impl Rule for GodObject {
    fn id(&self) -> &'static str {
        rule_ids::GOD_OBJECT
    }

    fn family(&self) -> Family {
        Family::Architecture
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let Some(model) = ctx.model else {
            return Vec::new();
        };
        let max_lines = ctx.param(self.id(), "max_lines", 400.0) as usize;
        let max_methods = ctx.param(self.id(), "max_methods", 30.0) as usize;

        model
            .classes
            .iter()
            .filter(|c| c.line_count > max_lines || c.method_count() > max_methods)
            .map(|c| Finding {
                rule_id: self.id().to_string(),
                family: self.family(),
                severity: Severity::High,
                location: Location::new(&ctx.file.path, c.span.start_line, c.span.end_line),
                message: format!(
                    "class `{}` spans {} lines with {} methods; it has become a god object",
                    c.name,
                    c.line_count,
                    c.method_count()
                ),
                recommendation: "carve the class into smaller units along its data boundaries"
                    .to_string(),
                evidence: vec![c.name.clone()],
                external_id: None,
            })
            .collect()
    }
}

/// Flags functions whose cyclomatic complexity exceeds the limit.
pub struct SpaghettiComplexity;

impl Rule for SpaghettiComplexity {
    fn id(&self) -> &'static str {
        rule_ids::SPAGHETTI_CODE
    }

    fn family(&self) -> Family {
        Family::Architecture
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let Some(model) = ctx.model else {
            return Vec::new();
        };
        let max_cyclomatic = ctx.param(self.id(), "max_cyclomatic", 15.0) as usize;

        model
            .functions
            .iter()
            .filter(|f| f.cyclomatic > max_cyclomatic)
            .map(|f| Finding {
                rule_id: self.id().to_string(),
                family: self.family(),
                severity: Severity::Medium,
                location: Location::new(&ctx.file.path, f.span.start_line, f.span.end_line),
                message: format!(
                    "function `{}` has cyclomatic complexity {} (limit {})",
                    f.name, f.cyclomatic, max_cyclomatic
                ),
                recommendation: "flatten the branching with early returns or a dispatch table"
                    .to_string(),
                evidence: vec![f.name.clone()],
                external_id: None,
            })
            .collect()
    }
}
