//! Finding value objects and the stable rule-id registry.

use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::Span;

/// Rule families. Every rule belongs to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Quality,
    Security,
    Performance,
    Architecture,
}

impl Family {
    pub fn all() -> &'static [Family] {
        &[
            Family::Quality,
            Family::Security,
            Family::Performance,
            Family::Architecture,
        ]
    }

    pub fn from_name(name: &str) -> Option<Family> {
        match name.to_lowercase().as_str() {
            "quality" => Some(Family::Quality),
            "security" => Some(Family::Security),
            "performance" => Some(Family::Performance),
            "architecture" => Some(Family::Architecture),
            _ => None,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Family::Quality => "quality",
            Family::Security => "security",
            Family::Performance => "performance",
            Family::Architecture => "architecture",
        })
    }
}

/// Severity tiers. Declared least-severe-first so the derived `Ord` makes
/// `Critical` the maximum; report ordering sorts descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Numeric weight feeding the aggregate quality score.
    pub fn weight(&self) -> f64 {
        match self {
            Severity::Critical => 40.0,
            Severity::High => 20.0,
            Severity::Medium => 8.0,
            Severity::Low => 2.0,
            Severity::Info => 0.0,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        })
    }
}

/// Where a finding points, sufficient to render a navigable reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: PathBuf,
    pub span: Span,
}

impl Location {
    pub fn new(file: impl Into<PathBuf>, start_line: usize, end_line: usize) -> Location {
        Location {
            file: file.into(),
            span: Span::new(start_line, end_line),
        }
    }
}

/// A single reported issue. Immutable value object; identity for
/// deduplication is `(rule_id, location, evidence fingerprint)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub rule_id: String,
    pub family: Family,
    pub severity: Severity,
    pub location: Location,
    pub message: String,
    pub recommendation: String,
    /// Snippets or fingerprints backing the finding; merged on dedup.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<String>,
    /// CWE/OWASP tag where one applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

impl Finding {
    /// Short stable fingerprint of the dedup identity.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.rule_id.as_bytes());
        hasher.update(self.location.file.to_string_lossy().as_bytes());
        hasher.update(self.location.span.start_line.to_le_bytes());
        hasher.update(self.location.span.end_line.to_le_bytes());
        if let Some(first) = self.evidence.first() {
            hasher.update(first.as_bytes());
        }
        let digest = hasher.finalize();
        digest[..8].iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Deterministic report ordering: severity descending, then file path,
    /// then line, then rule id.
    pub fn report_order(&self, other: &Finding) -> Ordering {
        other
            .severity
            .cmp(&self.severity)
            .then_with(|| self.location.file.cmp(&other.location.file))
            .then_with(|| self.location.span.start_line.cmp(&other.location.span.start_line))
            .then_with(|| self.rule_id.cmp(&other.rule_id))
    }
}

/// Stable dot-separated rule identifiers. These are part of the structured
/// report contract; never rename a shipped id.
pub mod rule_ids {
    pub const LONG_METHOD: &str = "quality.long_method";
    pub const LARGE_CLASS: &str = "quality.large_class";
    pub const DEAD_CODE: &str = "quality.dead_code";

    pub const INJECTION: &str = "security.injection";
    pub const HARDCODED_SECRET: &str = "security.hardcoded_secret";
    pub const WEAK_CRYPTO: &str = "security.weak_crypto";

    pub const ALGORITHMIC_COMPLEXITY: &str = "performance.algorithmic_complexity";
    pub const N_PLUS_ONE_QUERY: &str = "performance.n_plus_one_query";

    pub const SRP_VIOLATION: &str = "architecture.srp_violation";
    pub const DIP_VIOLATION: &str = "architecture.dip_violation";
    pub const GOD_OBJECT: &str = "architecture.god_object";
    pub const SPAGHETTI_CODE: &str = "architecture.spaghetti_code";

    /// Emitted by the engine itself when a file exceeds its time budget.
    pub const ANALYSIS_TIMEOUT: &str = "engine.timeout";

    /// Every configurable rule id, used to validate threshold overrides.
    pub const ALL: &[&str] = &[
        LONG_METHOD,
        LARGE_CLASS,
        DEAD_CODE,
        INJECTION,
        HARDCODED_SECRET,
        WEAK_CRYPTO,
        ALGORITHMIC_COMPLEXITY,
        N_PLUS_ONE_QUERY,
        SRP_VIOLATION,
        DIP_VIOLATION,
        GOD_OBJECT,
        SPAGHETTI_CODE,
    ];
}
