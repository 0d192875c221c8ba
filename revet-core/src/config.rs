//! Engine configuration.
//!
//! An [`EngineConfig`] is a plain value built once at engine start and
//! passed by reference into every worker; there is no process-wide mutable
//! registry. Threshold overrides come from a `.revet.toml` file or from the
//! embedding caller, and invalid configuration is fatal before analysis
//! starts ([`EngineError::ConfigInvalid`]).

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::findings::{rule_ids, Family};

/// Per-rule numeric parameter overrides, keyed by rule id then parameter
/// name, e.g. `thresholds["quality.long_method"]["max_lines"] = 80`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Thresholds(HashMap<String, HashMap<String, f64>>);

impl Thresholds {
    /// Look up a rule parameter, falling back to the rule's documented
    /// default. Rules never hard-wire their thresholds at the use site.
    pub fn get(&self, rule_id: &str, param: &str, default: f64) -> f64 {
        self.0
            .get(rule_id)
            .and_then(|params| params.get(param))
            .copied()
            .unwrap_or(default)
    }

    pub fn set(&mut self, rule_id: &str, param: &str, value: f64) {
        self.0
            .entry(rule_id.to_string())
            .or_default()
            .insert(param.to_string(), value);
    }

    fn validate(&self) -> Result<(), EngineError> {
        for (rule_id, params) in &self.0 {
            if !rule_ids::ALL.contains(&rule_id.as_str()) {
                return Err(EngineError::ConfigInvalid(format!(
                    "threshold override for unknown rule id `{rule_id}`"
                )));
            }
            for (param, value) in params {
                if !value.is_finite() || *value < 0.0 {
                    return Err(EngineError::ConfigInvalid(format!(
                        "threshold `{rule_id}.{param}` must be a non-negative number, got {value}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Full engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Worker pool size for per-file analysis.
    pub concurrency: usize,
    /// Cooperative per-file time budget.
    pub per_file_timeout_ms: u64,
    /// Rule families to run.
    pub enabled_families: BTreeSet<Family>,
    /// Minimum line-range overlap at which two same-rule findings merge.
    pub dedup_overlap_fraction: f64,
    /// Per-rule parameter overrides.
    pub thresholds: Thresholds,
}

impl Default for EngineConfig {
    fn default() -> EngineConfig {
        EngineConfig {
            concurrency: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            per_file_timeout_ms: 5_000,
            enabled_families: Family::all().iter().copied().collect(),
            dedup_overlap_fraction: 0.5,
            thresholds: Thresholds::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a `.revet.toml` document. Unknown keys are rejected so typos
    /// fail loudly instead of silently producing a meaningless report.
    pub fn from_toml_str(doc: &str) -> Result<EngineConfig, EngineError> {
        let config: EngineConfig = toml::from_str(doc)
            .map_err(|e| EngineError::ConfigInvalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.concurrency == 0 {
            return Err(EngineError::ConfigInvalid(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.per_file_timeout_ms == 0 {
            return Err(EngineError::ConfigInvalid(
                "per_file_timeout_ms must be at least 1".to_string(),
            ));
        }
        if self.enabled_families.is_empty() {
            return Err(EngineError::ConfigInvalid(
                "enabled_families must not be empty".to_string(),
            ));
        }
        if !(self.dedup_overlap_fraction > 0.0 && self.dedup_overlap_fraction <= 1.0) {
            return Err(EngineError::ConfigInvalid(format!(
                "dedup_overlap_fraction must be in (0, 1], got {}",
                self.dedup_overlap_fraction
            )));
        }
        self.thresholds.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn toml_round_trip() {
        let doc = r#"
            concurrency = 2
            per_file_timeout_ms = 1000
            enabled_families = ["quality", "security"]
            dedup_overlap_fraction = 0.75

            [thresholds."quality.long_method"]
            max_lines = 80
        "#;
        let config = EngineConfig::from_toml_str(doc).unwrap();
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.enabled_families.len(), 2);
        assert_eq!(
            config.thresholds.get(rule_ids::LONG_METHOD, "max_lines", 50.0),
            80.0
        );
        // Unset params keep their default.
        assert_eq!(
            config.thresholds.get(rule_ids::LARGE_CLASS, "max_methods", 20.0),
            20.0
        );
    }

    #[test]
    fn unknown_keys_are_fatal() {
        assert!(EngineConfig::from_toml_str("per_file_tiemout_ms = 10").is_err());
    }

    #[test]
    fn unknown_rule_id_is_fatal() {
        let doc = r#"
            [thresholds."quality.long_methods"]
            max_lines = 80
        "#;
        assert!(EngineConfig::from_toml_str(doc).is_err());
    }

    #[test]
    fn out_of_range_values_are_fatal() {
        let mut config = EngineConfig::default();
        config.dedup_overlap_fraction = 0.0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.dedup_overlap_fraction = 1.5;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.enabled_families.clear();
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.thresholds.set(rule_ids::LONG_METHOD, "max_lines", f64::NAN);
        assert!(config.validate().is_err());
    }
}
