//! Report rendering: JSON for machines, markdown and plain text for
//! humans. Coloring is left to the caller; these renderers are pure
//! string builders.

use std::fmt::Write as _;
use std::str::FromStr;

use crate::report::{AggregatedReport, CoverageStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Markdown,
    Text,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<OutputFormat, String> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "text" | "txt" => Ok(OutputFormat::Text),
            other => Err(format!("unknown output format `{other}`")),
        }
    }
}

pub fn render(report: &AggregatedReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format_json(report),
        OutputFormat::Markdown => format_markdown(report),
        OutputFormat::Text => format_text(report),
    }
}

pub fn format_json(report: &AggregatedReport) -> String {
    // Serialization of plain data with no non-string map keys cannot fail.
    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
}

pub fn format_markdown(report: &AggregatedReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Code Review Report\n");
    let _ = writeln!(
        out,
        "**Quality score:** {:.1}/100 across {} files ({} lines)\n",
        report.quality_score, report.files_analyzed, report.total_lines
    );
    if let Some(risk) = report.security_risk_level {
        let _ = writeln!(out, "**Security risk:** {risk}\n");
    }

    let _ = writeln!(out, "## Findings by family\n");
    let _ = writeln!(out, "| Family | Count | Highest severity |");
    let _ = writeln!(out, "|---|---|---|");
    for summary in &report.family_summaries {
        let highest = summary
            .highest_severity
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(out, "| {} | {} | {} |", summary.family, summary.count, highest);
    }

    if !report.action_items.is_empty() {
        let _ = writeln!(out, "\n## Fix first\n");
        for item in &report.action_items {
            let _ = writeln!(
                out,
                "{}. **[{}]** {} ({}:{})",
                item.rank,
                item.severity,
                item.message,
                item.file.display(),
                item.line
            );
        }
    }

    if !report.findings.is_empty() {
        let _ = writeln!(out, "\n## All findings\n");
        for finding in &report.findings {
            let _ = writeln!(
                out,
                "- `{}` [{}] {}:{}: {}",
                finding.rule_id,
                finding.severity,
                finding.location.file.display(),
                finding.location.span.start_line,
                finding.message
            );
            let _ = writeln!(out, "  - fix: {}", finding.recommendation);
            if let Some(ext) = &finding.external_id {
                let _ = writeln!(out, "  - ref: {ext}");
            }
        }
    }

    if !report.is_complete() {
        let _ = writeln!(out, "\n## Coverage notes\n");
        for entry in report.coverage.iter().filter(|c| c.status != CoverageStatus::Full) {
            let _ = writeln!(
                out,
                "- {}: {:?}{}",
                entry.file.display(),
                entry.status,
                entry
                    .reason
                    .as_deref()
                    .map(|r| format!(" ({r})"))
                    .unwrap_or_default()
            );
        }
    }

    if !report.warnings.is_empty() {
        let _ = writeln!(out, "\n## Warnings\n");
        for warning in &report.warnings {
            let _ = writeln!(out, "- {}", warning.message);
        }
    }
    out
}

pub fn format_text(report: &AggregatedReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "quality {:.1}/100 | {} files | {} lines | {} findings",
        report.quality_score,
        report.files_analyzed,
        report.total_lines,
        report.findings.len()
    );
    if let Some(risk) = report.security_risk_level {
        let _ = writeln!(out, "security risk: {risk}");
    }
    for finding in &report.findings {
        let _ = writeln!(
            out,
            "{:>8}  {}:{}  {}  {}",
            finding.severity.to_string(),
            finding.location.file.display(),
            finding.location.span.start_line,
            finding.rule_id,
            finding.message
        );
    }
    if !report.is_complete() {
        let _ = writeln!(out, "note: some files were not fully analyzed");
    }
    for warning in &report.warnings {
        let _ = writeln!(out, "warning: {}", warning.message);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::{Family, Finding, Location, Severity};
    use crate::report::{AggregatedReport, CoverageEntry, FamilySummary, REPORT_FORMAT_VERSION};

    fn sample() -> AggregatedReport {
        AggregatedReport {
            format_version: REPORT_FORMAT_VERSION,
            files_analyzed: 1,
            total_lines: 120,
            quality_score: 92.0,
            security_risk_level: Some(Severity::High),
            family_summaries: vec![FamilySummary {
                family: Family::Security,
                count: 1,
                highest_severity: Some(Severity::High),
            }],
            findings: vec![Finding {
                rule_id: "security.injection".to_string(),
                family: Family::Security,
                severity: Severity::High,
                location: Location::new("app.js", 14, 14),
                message: "possible SQL injection".to_string(),
                recommendation: "use parameterized queries".to_string(),
                evidence: vec!["db.query".to_string()],
                external_id: Some("CWE-89".to_string()),
            }],
            action_items: vec![],
            coverage: vec![CoverageEntry {
                file: "app.js".into(),
                status: CoverageStatus::Full,
                reason: None,
            }],
            warnings: vec![],
        }
    }

    #[test]
    fn json_round_trips() {
        let rendered = format_json(&sample());
        let back: AggregatedReport = serde_json::from_str(&rendered).unwrap();
        assert_eq!(back.format_version, REPORT_FORMAT_VERSION);
        assert_eq!(back.findings.len(), 1);
    }

    #[test]
    fn markdown_names_the_finding_and_reference() {
        let md = format_markdown(&sample());
        assert!(md.contains("security.injection"));
        assert!(md.contains("CWE-89"));
        assert!(md.contains("92.0/100"));
    }

    #[test]
    fn coverage_notes_appear_only_when_degraded() {
        let full = sample();
        assert!(!format_markdown(&full).contains("Coverage notes"));
        assert!(!format_text(&full).contains("not fully analyzed"));

        let mut degraded = sample();
        degraded.coverage[0].status = CoverageStatus::Partial;
        degraded.coverage[0].reason = Some("parse failure: syntax errors".to_string());
        let md = format_markdown(&degraded);
        assert!(md.contains("Coverage notes"));
        assert!(md.contains("syntax errors"));
        assert!(format_text(&degraded).contains("not fully analyzed"));
    }

    #[test]
    fn format_parses_from_str() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
