#![deny(dead_code)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use walkdir::WalkDir;

use revet_core::engine::FileInput;
use revet_core::language::Language;
use revet_core::output::{self, OutputFormat};
use revet_core::{AggregatedReport, Engine, EngineConfig, Family, Severity};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(
    name = "revet",
    about = "Multi-language static code review",
    long_about = None,
)]
struct Cli {
    /// File or directory to review.
    path: PathBuf,

    /// Output format: pretty, text, markdown, or json.
    #[arg(long, default_value = "pretty")]
    format: String,

    /// Config file path (default: .revet.toml next to the target, if present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Worker pool size override.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Per-file time budget override, in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Rule families to run. Comma-separated, e.g. `--families security,quality`
    #[arg(long, value_delimiter = ',')]
    families: Option<Vec<String>>,

    /// Treat every input as this language instead of detecting by
    /// extension. Accepts names and common aliases (py, ts, golang).
    #[arg(long)]
    language: Option<String>,

    /// Exit 1 when any security finding reaches this severity.
    #[arg(long, default_value = "high")]
    fail_on: String,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(gate_passed) => {
            if gate_passed {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<bool> {
    let fail_on = parse_severity(&cli.fail_on)?;
    let config = build_config(&cli)?;

    let hint = match &cli.language {
        Some(name) => Some(
            Language::from_hint(name)
                .with_context(|| format!("unknown language `{name}`"))?,
        ),
        None => None,
    };
    let inputs = collect_inputs(&cli.path, hint)?;
    if inputs.is_empty() {
        bail!("no reviewable files under {}", cli.path.display());
    }

    let engine = Engine::new(config)?;
    let report = engine.run(&inputs)?;

    if cli.format == "pretty" {
        print_pretty(&report);
    } else {
        let format: OutputFormat = cli
            .format
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?;
        print!("{}", output::render(&report, format));
    }

    Ok(gate_passes(report.security_risk_level, fail_on))
}

/// The gate fails when the security risk reaches the threshold.
fn gate_passes(risk: Option<Severity>, fail_on: Severity) -> bool {
    risk.map(|r| r < fail_on).unwrap_or(true)
}

fn build_config(cli: &Cli) -> Result<EngineConfig> {
    let config_path = cli.config.clone().or_else(|| {
        let root = if cli.path.is_dir() {
            cli.path.clone()
        } else {
            cli.path.parent().map(Path::to_path_buf).unwrap_or_default()
        };
        let candidate = root.join(".revet.toml");
        candidate.exists().then_some(candidate)
    });

    let mut config = match config_path {
        Some(path) => {
            let doc = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            EngineConfig::from_toml_str(&doc)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => EngineConfig::default(),
    };

    if let Some(n) = cli.concurrency {
        config.concurrency = n;
    }
    if let Some(ms) = cli.timeout_ms {
        config.per_file_timeout_ms = ms;
    }
    if let Some(names) = &cli.families {
        config.enabled_families = names
            .iter()
            .map(|name| {
                Family::from_name(name)
                    .with_context(|| format!("unknown rule family `{name}`"))
            })
            .collect::<Result<_>>()?;
    }
    Ok(config)
}

fn parse_severity(name: &str) -> Result<Severity> {
    Ok(match name.to_lowercase().as_str() {
        "info" => Severity::Info,
        "low" => Severity::Low,
        "medium" => Severity::Medium,
        "high" => Severity::High,
        "critical" => Severity::Critical,
        other => bail!("unknown severity `{other}`"),
    })
}

/// Extensions worth loading. Source extensions get the full pipeline;
/// config-shaped files still go through the raw-text rules (secrets hide
/// in .env and .yml as often as in code).
const REVIEWABLE_EXTENSIONS: &[&str] = &[
    "rs", "py", "js", "mjs", "go", "toml", "yaml", "yml", "json", "ini", "env", "cfg", "conf",
];

const SKIP_DIRS: &[&str] = &["node_modules", "target", "vendor", "dist", "__pycache__"];

fn collect_inputs(root: &Path, hint: Option<Language>) -> Result<Vec<FileInput>> {
    if root.is_file() {
        return Ok(vec![FileInput {
            path: root.to_path_buf(),
            language_hint: hint,
        }]);
    }
    if !root.is_dir() {
        bail!("{} is neither a file nor a directory", root.display());
    }

    let mut inputs = Vec::new();
    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        let name = entry.file_name().to_string_lossy();
        let hidden = name.starts_with('.') && name.len() > 1 && entry.depth() > 0;
        let skipped = entry.file_type().is_dir() && SKIP_DIRS.contains(&name.as_ref());
        !(hidden || skipped)
    });
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let reviewable = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| REVIEWABLE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false);
        if reviewable {
            inputs.push(FileInput {
                path: entry.path().to_path_buf(),
                language_hint: hint,
            });
        }
    }
    inputs.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(inputs)
}

// ---------------------------------------------------------------------------
// Pretty terminal output
// ---------------------------------------------------------------------------

fn severity_label(severity: Severity) -> colored::ColoredString {
    let text = format!("{severity:>8}", severity = severity.to_string());
    match severity {
        Severity::Critical => text.red().bold(),
        Severity::High => text.red(),
        Severity::Medium => text.yellow(),
        Severity::Low => text.cyan(),
        Severity::Info => text.dimmed(),
    }
}

fn print_pretty(report: &AggregatedReport) {
    let score = format!("{:.1}", report.quality_score);
    let score = if report.quality_score >= 80.0 {
        score.green()
    } else if report.quality_score >= 50.0 {
        score.yellow()
    } else {
        score.red()
    };
    println!(
        "{} {score}/100  ({} files, {} lines)",
        "quality".bold(),
        report.files_analyzed,
        report.total_lines
    );
    if let Some(risk) = report.security_risk_level {
        println!("{} {}", "security risk".bold(), risk.to_string().red());
    }
    println!();

    for summary in &report.family_summaries {
        if summary.count == 0 {
            continue;
        }
        println!("{:>14}: {}", summary.family.to_string(), summary.count);
    }
    if !report.findings.is_empty() {
        println!();
    }
    for finding in &report.findings {
        println!(
            "{}  {}:{}  {}",
            severity_label(finding.severity),
            finding.location.file.display(),
            finding.location.span.start_line,
            finding.message
        );
    }

    if !report.action_items.is_empty() {
        println!("\n{}", "fix first".bold());
        for item in &report.action_items {
            println!(
                "  {}. {} ({}:{})",
                item.rank,
                item.message,
                item.file.display(),
                item.line
            );
        }
    }
    for warning in &report.warnings {
        println!("{} {}", "warning:".yellow(), warning.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn collect_inputs_skips_junk_dirs_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("node_modules")).unwrap();
        let write = |rel: &str| {
            let path = dir.path().join(rel);
            let mut f = std::fs::File::create(path).unwrap();
            f.write_all(b"x = 1\n").unwrap();
        };
        write("b.py");
        write("a.js");
        write("notes.md");
        write("node_modules/dep.js");

        let inputs = collect_inputs(dir.path(), None).unwrap();
        let names: Vec<String> = inputs
            .iter()
            .map(|i| i.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.js", "b.py"]);
        assert!(inputs.iter().all(|i| i.language_hint.is_none()));
    }

    #[test]
    fn language_hint_applies_to_every_input() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.py", "b.txt.cfg"] {
            let mut f = std::fs::File::create(dir.path().join(name)).unwrap();
            f.write_all(b"x = 1\n").unwrap();
        }
        let inputs = collect_inputs(dir.path(), Some(Language::Python)).unwrap();
        assert_eq!(inputs.len(), 2);
        assert!(inputs
            .iter()
            .all(|i| i.language_hint == Some(Language::Python)));
    }

    #[test]
    fn severity_parsing() {
        assert_eq!(parse_severity("HIGH").unwrap(), Severity::High);
        assert!(parse_severity("fatal").is_err());
    }

    #[test]
    fn gate_thresholds() {
        assert!(!gate_passes(Some(Severity::High), Severity::High));
        assert!(!gate_passes(Some(Severity::Critical), Severity::High));
        assert!(gate_passes(Some(Severity::Medium), Severity::High));
        assert!(gate_passes(None, Severity::High));
        // Loosened gate lets High through but still stops Critical.
        assert!(gate_passes(Some(Severity::High), Severity::Critical));
        assert!(!gate_passes(Some(Severity::Critical), Severity::Critical));
    }

    #[test]
    fn high_security_findings_fail_the_default_gate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.js");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(
            b"function loadOrders(userInput) {\n  db.query(\"SELECT * FROM orders WHERE id=\" + userInput);\n}\n",
        )
        .unwrap();

        let engine = Engine::new(EngineConfig::default()).unwrap();
        let report = engine.run(&[FileInput::new(&path)]).unwrap();
        assert_eq!(report.security_risk_level, Some(Severity::High));

        let default_gate = parse_severity("high").unwrap();
        assert!(!gate_passes(report.security_risk_level, default_gate));
        assert!(gate_passes(report.security_risk_level, Severity::Critical));
    }
}
