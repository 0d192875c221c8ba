#![deny(dead_code)]

//! Multi-language static review engine.
//!
//! Files flow through a fixed pipeline: load and normalize, parse into a
//! language-agnostic structural model, evaluate the rule families, then
//! aggregate into one deduplicated, deterministically ordered report.

pub mod adapters;
pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod findings;
pub mod language;
pub mod loader;
pub mod model;
pub mod output;
pub mod report;
pub mod rules;

pub use config::EngineConfig;
pub use engine::{CancelToken, Engine, FileInput};
pub use error::EngineError;
pub use findings::{Family, Finding, Severity};
pub use report::{AggregatedReport, REPORT_FORMAT_VERSION};

use std::path::Path;

/// Analyze a set of paths with the default configuration and rules.
pub fn analyze_paths<P: AsRef<Path>>(paths: &[P]) -> Result<AggregatedReport, EngineError> {
    let engine = Engine::new(EngineConfig::default())?;
    let inputs: Vec<FileInput> = paths.iter().map(|p| FileInput::new(p.as_ref())).collect();
    engine.run(&inputs)
}
