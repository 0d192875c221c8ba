//! Rule engine.
//!
//! Every rule is a pure `(model, raw text) -> findings` evaluator,
//! runnable in isolation. Rules are grouped in four families and collected
//! into an explicit [`RuleSet`] value at engine start; there is no global
//! registry. A rule that does not apply to a file returns no findings; it
//! never signals "not applicable" through an error.

pub mod architecture;
pub mod performance;
pub mod quality;
pub mod security;

use crate::config::Thresholds;
use crate::findings::{Family, Finding};
use crate::loader::SourceFile;
use crate::model::StructuralModel;

/// Everything a rule may look at for one file. `model` is `None` when no
/// adapter exists or parsing failed without a partial model; rules that
/// need structure must tolerate that by returning nothing.
pub struct RuleContext<'a> {
    pub file: &'a SourceFile,
    pub model: Option<&'a StructuralModel>,
    pub thresholds: &'a Thresholds,
}

impl RuleContext<'_> {
    /// Convenience: threshold lookup scoped to a rule.
    pub fn param(&self, rule_id: &str, name: &str, default: f64) -> f64 {
        self.thresholds.get(rule_id, name, default)
    }
}

pub trait Rule: Send + Sync {
    /// Stable identifier from [`crate::findings::rule_ids`].
    fn id(&self) -> &'static str;

    fn family(&self) -> Family;

    /// Whether this rule needs a structural model. Raw-text rules (secret
    /// scanning) return `false` and run even for unsupported languages.
    fn needs_model(&self) -> bool {
        true
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<Finding>;
}

/// An immutable, shareable collection of rules.
pub struct RuleSet {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleSet {
    /// The full default rule catalogue.
    pub fn default_rules() -> RuleSet {
        RuleSet {
            rules: vec![
                Box::new(quality::LongMethod),
                Box::new(quality::LargeClass),
                Box::new(quality::DeadCode),
                Box::new(security::Injection),
                Box::new(security::HardcodedSecret::new()),
                Box::new(security::WeakCrypto),
                Box::new(performance::AlgorithmicComplexity),
                Box::new(performance::NPlusOneQuery),
                Box::new(architecture::SrpResponsibilities),
                Box::new(architecture::DirectInstantiation),
                Box::new(architecture::GodObject),
                Box::new(architecture::SpaghettiComplexity),
            ],
        }
    }

    pub fn from_rules(rules: Vec<Box<dyn Rule>>) -> RuleSet {
        RuleSet { rules }
    }

    /// Keep only the rules of the given families.
    pub fn retain_families(mut self, enabled: &std::collections::BTreeSet<Family>) -> RuleSet {
        self.rules.retain(|r| enabled.contains(&r.family()));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
