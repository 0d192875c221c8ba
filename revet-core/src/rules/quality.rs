//! Quality family: size thresholds and dead code.

use super::{Rule, RuleContext};
use crate::findings::{rule_ids, Family, Finding, Location, Severity};

/// Flags methods longer than a configured line count.
///
/// Default: `max_lines = 50`.
pub struct LongMethod;

impl Rule for LongMethod {
    fn id(&self) -> &'static str {
        rule_ids::LONG_METHOD
    }

    fn family(&self) -> Family {
        Family::Quality
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let Some(model) = ctx.model else {
            return Vec::new();
        };
        let max_lines = ctx.param(self.id(), "max_lines", 50.0) as usize;

        model
            .functions
            .iter()
            .filter(|f| f.line_count > max_lines)
            .map(|f| Finding {
                rule_id: self.id().to_string(),
                family: self.family(),
                severity: Severity::Medium,
                location: Location::new(&ctx.file.path, f.span.start_line, f.span.end_line),
                message: format!(
                    "function `{}` is {} lines long (limit {})",
                    f.name, f.line_count, max_lines
                ),
                recommendation: "extract cohesive blocks into named helper functions".to_string(),
                evidence: vec![f.name.clone()],
                external_id: None,
            })
            .collect()
    }
}

/// Flags classes with more methods than the configured limit.
///
/// Default: `max_methods = 20`.
pub struct LargeClass;

impl Rule for LargeClass {
    fn id(&self) -> &'static str {
        rule_ids::LARGE_CLASS
    }

    fn family(&self) -> Family {
        Family::Quality
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let Some(model) = ctx.model else {
            return Vec::new();
        };
        let max_methods = ctx.param(self.id(), "max_methods", 20.0) as usize;

        model
            .classes
            .iter()
            .filter(|c| c.method_count() > max_methods)
            .map(|c| Finding {
                rule_id: self.id().to_string(),
                family: self.family(),
                severity: Severity::Medium,
                location: Location::new(&ctx.file.path, c.span.start_line, c.span.end_line),
                message: format!(
                    "class `{}` has {} methods (limit {})",
                    c.name,
                    c.method_count(),
                    max_methods
                ),
                recommendation: "split the class along its distinct responsibilities".to_string(),
                evidence: vec![c.name.clone()],
                external_id: None,
            })
            .collect()
    }
}

/// Flags imports that are never referenced in the file.
///
/// Side-effect-only imports (bare JS imports, Go `_`, wildcard imports) are
/// excluded rather than guessed at; flagging those would be unacceptable
/// false positives.
pub struct DeadCode;

impl Rule for DeadCode {
    fn id(&self) -> &'static str {
        rule_ids::DEAD_CODE
    }

    fn family(&self) -> Family {
        Family::Quality
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let Some(model) = ctx.model else {
            return Vec::new();
        };

        model
            .imports
            .iter()
            .filter(|edge| !edge.has_side_effects)
            .filter(|edge| edge.symbol.is_some() && edge.reference_count == 0)
            .map(|edge| {
                let symbol = edge.symbol.as_deref().unwrap_or_default();
                Finding {
                    rule_id: self.id().to_string(),
                    family: self.family(),
                    severity: Severity::Low,
                    location: Location::new(&ctx.file.path, edge.span.start_line, edge.span.end_line),
                    message: format!("import `{}` from `{}` is never used", symbol, edge.module),
                    recommendation: "remove the unused import".to_string(),
                    evidence: vec![symbol.to_string()],
                    external_id: None,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Thresholds;
    use crate::language::Language;
    use crate::loader::SourceFile;
    use crate::model::{ClassNode, FunctionNode, ImportEdge, Span, StructuralModel};
    use std::path::PathBuf;

    fn file() -> SourceFile {
        SourceFile::from_content(&PathBuf::from("t.py"), Some(Language::Python), "x = 1\n")
    }

    fn ctx<'a>(
        file: &'a SourceFile,
        model: Option<&'a StructuralModel>,
        thresholds: &'a Thresholds,
    ) -> RuleContext<'a> {
        RuleContext { file, model, thresholds }
    }

    fn function(name: &str, lines: usize) -> FunctionNode {
        FunctionNode {
            name: name.to_string(),
            span: Span::new(1, lines),
            params: vec![],
            line_count: lines,
            cyclomatic: 1,
            cognitive: 0,
            nesting_depth: 1,
            max_loop_depth: 0,
            is_async: false,
        }
    }

    #[test]
    fn long_method_threshold_is_configurable() {
        let f = file();
        let mut model = StructuralModel::empty(Language::Python);
        model.functions.push(function("handler", 60));

        let defaults = Thresholds::default();
        assert_eq!(LongMethod.evaluate(&ctx(&f, Some(&model), &defaults)).len(), 1);

        let mut relaxed = Thresholds::default();
        relaxed.set(rule_ids::LONG_METHOD, "max_lines", 100.0);
        assert!(LongMethod.evaluate(&ctx(&f, Some(&model), &relaxed)).is_empty());
    }

    #[test]
    fn large_class_over_twenty_methods() {
        let f = file();
        let mut model = StructuralModel::empty(Language::Python);
        model.classes.push(ClassNode {
            name: "Mega".to_string(),
            span: Span::new(1, 100),
            method_names: (0..25).map(|i| format!("m{i}")).collect(),
            line_count: 100,
            bases: vec![],
            inheritance_depth: 0,
        });
        let thresholds = Thresholds::default();
        let findings = LargeClass.evaluate(&ctx(&f, Some(&model), &thresholds));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Medium);
    }

    #[test]
    fn dead_code_skips_side_effect_imports() {
        let f = file();
        let mut model = StructuralModel::empty(Language::Python);
        let edge = |symbol: Option<&str>, side: bool, refs: usize| ImportEdge {
            module: "m".to_string(),
            symbol: symbol.map(str::to_string),
            span: Span::new(1, 1),
            has_side_effects: side,
            reference_count: refs,
        };
        model.imports.push(edge(Some("unused"), false, 0));
        model.imports.push(edge(Some("used"), false, 3));
        model.imports.push(edge(None, true, 0));

        let thresholds = Thresholds::default();
        let findings = DeadCode.evaluate(&ctx(&f, Some(&model), &thresholds));
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.contains("unused"));
    }

    #[test]
    fn empty_model_yields_no_findings() {
        let f = file();
        let model = StructuralModel::empty(Language::Python);
        let thresholds = Thresholds::default();
        assert!(LongMethod.evaluate(&ctx(&f, Some(&model), &thresholds)).is_empty());
        assert!(LargeClass.evaluate(&ctx(&f, Some(&model), &thresholds)).is_empty());
        assert!(DeadCode.evaluate(&ctx(&f, None, &thresholds)).is_empty());
    }
}
