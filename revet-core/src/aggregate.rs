//! Aggregation: dedup, scoring, rollups, action items.
//!
//! Everything here is deterministic given the same per-file results; the
//! final sort means worker completion order never leaks into the report.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use crate::config::EngineConfig;
use crate::engine::FileAnalysis;
use crate::findings::{Family, Finding, Severity};
use crate::report::{
    ActionItem, AggregatedReport, FamilySummary, REPORT_FORMAT_VERSION,
};

/// Cap on the prioritized fix list.
const MAX_ACTION_ITEMS: usize = 10;

/// Fold per-file results into the final report.
pub fn aggregate(config: &EngineConfig, results: Vec<FileAnalysis>) -> AggregatedReport {
    let files_analyzed = results.len();
    let total_lines: usize = results.iter().map(|r| r.lines).sum();

    let mut findings = Vec::new();
    let mut coverage = Vec::new();
    let mut warnings = Vec::new();
    for result in results {
        findings.extend(result.findings);
        coverage.push(result.coverage);
        warnings.extend(result.warnings);
    }
    coverage.sort_by(|a, b| a.file.cmp(&b.file));

    let mut findings = dedup_findings(findings, config.dedup_overlap_fraction);
    findings.sort_by(|a, b| a.report_order(b));

    let quality_score = quality_score(&findings, total_lines);
    let security_risk_level = findings
        .iter()
        .filter(|f| f.family == Family::Security)
        .map(|f| f.severity)
        .max();

    let family_summaries = config
        .enabled_families
        .iter()
        .map(|family| {
            let in_family: Vec<&Finding> =
                findings.iter().filter(|f| f.family == *family).collect();
            FamilySummary {
                family: *family,
                count: in_family.len(),
                highest_severity: in_family.iter().map(|f| f.severity).max(),
            }
        })
        .collect();

    let action_items = action_items(&findings);

    AggregatedReport {
        format_version: REPORT_FORMAT_VERSION,
        files_analyzed,
        total_lines,
        quality_score,
        security_risk_level,
        family_summaries,
        findings,
        action_items,
        coverage,
        warnings,
    }
}

/// Merge findings of the same rule whose line ranges overlap by more than
/// `overlap_fraction` of the shorter span. Findings of different rules
/// never merge, whatever their location. The survivor keeps the higher
/// severity and the union of evidence; deduplication is idempotent.
///
/// Exact duplicates collapse first, keyed by the
/// `(rule, location, evidence)` fingerprint. The overlap pass requires a
/// strict excess over the fraction, so at `overlap_fraction = 1.0` the
/// fingerprint pass is the only thing that merges a finding with its
/// identical twin (same file submitted twice).
pub fn dedup_findings(findings: Vec<Finding>, overlap_fraction: f64) -> Vec<Finding> {
    let mut seen = HashSet::new();
    let findings: Vec<Finding> = findings
        .into_iter()
        .filter(|f| seen.insert(f.fingerprint()))
        .collect();

    let mut groups: BTreeMap<(String, PathBuf), Vec<Finding>> = BTreeMap::new();
    for finding in findings {
        groups
            .entry((finding.rule_id.clone(), finding.location.file.clone()))
            .or_default()
            .push(finding);
    }

    let mut out = Vec::new();
    for (_, mut group) in groups {
        group.sort_by_key(|f| (f.location.span.start_line, f.location.span.end_line));
        let mut survivors: Vec<Finding> = Vec::new();
        'next: for finding in group {
            for survivor in survivors.iter_mut() {
                let overlap = survivor
                    .location
                    .span
                    .overlap_fraction(&finding.location.span);
                if overlap > overlap_fraction {
                    merge_into(survivor, finding);
                    continue 'next;
                }
            }
            survivors.push(finding);
        }
        out.extend(survivors);
    }
    out
}

fn merge_into(survivor: &mut Finding, other: Finding) {
    if other.severity > survivor.severity {
        survivor.severity = other.severity;
        survivor.message = other.message;
        survivor.recommendation = other.recommendation;
    }
    for item in other.evidence {
        if !survivor.evidence.contains(&item) {
            survivor.evidence.push(item);
        }
    }
    if survivor.external_id.is_none() {
        survivor.external_id = other.external_id;
    }
}

/// `100 - total severity weight / scale`, clamped to `[0, 100]`. The scale
/// normalizes by codebase size so one Medium in a 50k-line tree does not
/// score the same as one Medium in a 50-line script; the 1000-line floor
/// keeps tiny inputs from being graded on a cliff.
fn quality_score(findings: &[Finding], total_lines: usize) -> f64 {
    let total_weight: f64 = findings.iter().map(|f| f.severity.weight()).sum();
    let scale = total_lines.max(1000) as f64 / 1000.0;
    (100.0 - total_weight / scale).clamp(0.0, 100.0)
}

/// Top findings to fix first: severity descending, security before the
/// other families within a tier, then path and line for stability.
fn action_items(findings: &[Finding]) -> Vec<ActionItem> {
    let mut ranked: Vec<&Finding> = findings
        .iter()
        .filter(|f| f.severity > Severity::Info)
        .collect();
    ranked.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| {
                let sec = |f: &Finding| f.family != Family::Security;
                sec(a).cmp(&sec(b))
            })
            .then_with(|| a.location.file.cmp(&b.location.file))
            .then_with(|| a.location.span.start_line.cmp(&b.location.span.start_line))
            .then_with(|| a.rule_id.cmp(&b.rule_id))
    });

    ranked
        .into_iter()
        .take(MAX_ACTION_ITEMS)
        .enumerate()
        .map(|(i, f)| ActionItem {
            rank: i + 1,
            rule_id: f.rule_id.clone(),
            family: f.family,
            severity: f.severity,
            file: f.location.file.clone(),
            line: f.location.span.start_line,
            message: f.message.clone(),
        })
        .collect()
}
