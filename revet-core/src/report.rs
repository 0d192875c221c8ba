//! Aggregated report types.
//!
//! The JSON rendering of [`AggregatedReport`] is a stable contract for
//! downstream tooling; field removals or renames require bumping
//! [`REPORT_FORMAT_VERSION`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::findings::{Family, Finding, Severity};

/// Version of the structured report schema.
pub const REPORT_FORMAT_VERSION: u32 = 1;

/// How much of one file the engine actually analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageStatus {
    /// Parsed and all applicable rules ran to completion.
    Full,
    /// Analysis degraded: partial parse, timeout, or unsupported language
    /// with only raw-text rules applied.
    Partial,
    /// Nothing ran (unreadable file, cancelled before start).
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageEntry {
    pub file: PathBuf,
    pub status: CoverageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A non-fatal problem encountered during analysis, surfaced in the report
/// instead of aborting the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineWarning {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    pub message: String,
}

/// Per-family rollup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilySummary {
    pub family: Family,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highest_severity: Option<Severity>,
}

/// One entry of the prioritized fix list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionItem {
    pub rank: usize,
    pub rule_id: String,
    pub family: Family,
    pub severity: Severity,
    pub file: PathBuf,
    pub line: usize,
    pub message: String,
}

/// The final output of one engine run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedReport {
    pub format_version: u32,
    pub files_analyzed: usize,
    pub total_lines: usize,
    /// 0..=100, higher is better.
    pub quality_score: f64,
    /// Highest severity among security findings; `None` when none fired.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_risk_level: Option<Severity>,
    pub family_summaries: Vec<FamilySummary>,
    pub findings: Vec<Finding>,
    pub action_items: Vec<ActionItem>,
    pub coverage: Vec<CoverageEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<EngineWarning>,
}

impl AggregatedReport {
    /// True when no coverage entry degraded below `Full`.
    pub fn is_complete(&self) -> bool {
        self.coverage.iter().all(|c| c.status == CoverageStatus::Full)
    }
}
