use std::path::PathBuf;

use thiserror::Error;

use crate::model::StructuralModel;

/// Errors from the language adapter layer. Both variants are recovered
/// locally by the engine: `UnsupportedLanguage` still runs the raw-text
/// rules, `ParseFailure` degrades to the partial model when one exists.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("no adapter registered for this language")]
    UnsupportedLanguage,

    #[error("parse failure: {reason}")]
    ParseFailure {
        reason: String,
        /// Best-effort partial model; rules must tolerate incompleteness.
        partial: Option<Box<StructuralModel>>,
    },
}

/// A rule invocation that could not complete. Never fatal: the engine
/// converts this into a report warning and moves on.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("rule {rule_id} skipped: {reason}")]
    Skipped { rule_id: String, reason: String },
}

/// Engine-level errors. `ConfigInvalid` is the only fatal category and is
/// surfaced before any analysis starts; `Timeout` is recovered into
/// partial coverage plus an informational finding.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("analysis of {file} exceeded the {budget_ms}ms per-file budget")]
    Timeout { file: PathBuf, budget_ms: u64 },

    #[error("worker pool: {0}")]
    Pool(String),
}
