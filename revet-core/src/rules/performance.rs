//! Performance family: nested-loop complexity and per-iteration queries.

use super::{Rule, RuleContext};
use crate::findings::{rule_ids, Family, Finding, Location, Severity};
use crate::model::CallSite;

/// Flags functions whose loop nesting suggests superlinear behavior.
///
/// This is structural evidence, not proof; the wording stays at "may
/// exhibit" because loop bounds are unknown statically.
pub struct AlgorithmicComplexity;

impl Rule for AlgorithmicComplexity {
    fn id(&self) -> &'static str {
        rule_ids::ALGORITHMIC_COMPLEXITY
    }

    fn family(&self) -> Family {
        Family::Performance
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let Some(model) = ctx.model else {
            return Vec::new();
        };
        let min_depth = ctx.param(self.id(), "min_loop_depth", 2.0) as usize;

        model
            .functions
            .iter()
            .filter(|f| f.max_loop_depth >= min_depth)
            .map(|f| {
                let (severity, order) = if f.max_loop_depth >= 3 {
                    (Severity::High, "O(n\u{b3}) or worse")
                } else {
                    (Severity::Medium, "O(n\u{b2})")
                };
                Finding {
                    rule_id: self.id().to_string(),
                    family: self.family(),
                    severity,
                    location: Location::new(&ctx.file.path, f.span.start_line, f.span.end_line),
                    message: format!(
                        "function `{}` nests loops {} deep and may exhibit {order} behavior",
                        f.name, f.max_loop_depth
                    ),
                    recommendation: "restructure with a lookup table or precomputed index to \
                                     avoid rescanning inner collections"
                        .to_string(),
                    evidence: vec![f.name.clone()],
                    external_id: None,
                }
            })
            .collect()
    }
}

/// Flags read queries issued inside a loop body.
///
/// Writes are excluded: batched inserts inside a loop are a different
/// problem with different fixes, and flagging them here doubles the noise.
pub struct NPlusOneQuery;

const QUERY_CALLEES: &[&str] = &["query", "execute", "exec", "find", "findone", "fetch", "get_object", "select"];
const WRITE_PREFIXES: &[&str] = &["insert", "update", "delete", "replace"];

fn is_read_query(call: &CallSite) -> bool {
    let segment = call.callee_segment();
    let query_shaped = QUERY_CALLEES.contains(&segment.as_str());
    let select_literal = call
        .args
        .string_literals
        .iter()
        .any(|lit| lit.trim_start().to_lowercase().starts_with("select"));
    let write_literal = call.args.string_literals.iter().any(|lit| {
        let lower = lit.trim_start().to_lowercase();
        WRITE_PREFIXES.iter().any(|p| lower.starts_with(p))
    });
    (query_shaped || select_literal) && !write_literal
}

impl Rule for NPlusOneQuery {
    fn id(&self) -> &'static str {
        rule_ids::N_PLUS_ONE_QUERY
    }

    fn family(&self) -> Family {
        Family::Performance
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let Some(model) = ctx.model else {
            return Vec::new();
        };

        model
            .call_sites
            .iter()
            .filter(|c| c.loop_depth > 0 && is_read_query(c))
            .map(|c| Finding {
                rule_id: self.id().to_string(),
                family: self.family(),
                severity: Severity::High,
                location: Location::new(&ctx.file.path, c.span.start_line, c.span.end_line),
                message: format!(
                    "`{}` is called inside a loop (depth {}); each iteration issues a query",
                    c.callee, c.loop_depth
                ),
                recommendation: "hoist the query out of the loop and fetch the rows in one \
                                 batched call"
                    .to_string(),
                evidence: vec![c.callee.clone()],
                external_id: None,
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
    use crate::model::{ArgFacts, FunctionNode, Span, StructuralModel};
    use std::path::PathBuf;

    fn file() -> SourceFile {
        SourceFile::from_content(&PathBuf::from("t.py"), Some(Language::Python), "x = 1\n")
    }

    fn function(name: &str, loop_depth: usize) -> FunctionNode {
        FunctionNode {
            name: name.to_string(),
            span: Span::new(1, 20),
            params: vec![],
            line_count: 20,
            cyclomatic: 3,
            cognitive: 4,
            nesting_depth: loop_depth,
            max_loop_depth: loop_depth,
            is_async: false,
        }
    }

    fn query_call(callee: &str, loop_depth: usize, literal: Option<&str>) -> CallSite {
        CallSite {
            callee: callee.to_string(),
            span: Span::new(5, 5),
            loop_depth,
            enclosing_function: Some("f".to_string()),
            is_constructor: false,
            args: ArgFacts {
                string_literals: literal.map(str::to_string).into_iter().collect(),
                ..ArgFacts::default()
            },
        }
    }

    #[test]
    fn loop_depth_two_is_medium_three_is_high() {
        let f = file();
        let thresholds = Thresholds::default();
        let mut model = StructuralModel::empty(Language::Python);
        model.functions.push(function("flat", 1));
        model.functions.push(function("pairs", 2));
        model.functions.push(function("triples", 3));

        let ctx = RuleContext { file: &f, model: Some(&model), thresholds: &thresholds };
        let findings = AlgorithmicComplexity.evaluate(&ctx);
        assert_eq!(findings.len(), 2);

        let pairs = findings.iter().find(|f| f.evidence[0] == "pairs").unwrap();
        assert_eq!(pairs.severity, Severity::Medium);
        assert!(pairs.message.contains("may exhibit"));

        let triples = findings.iter().find(|f| f.evidence[0] == "triples").unwrap();
        assert_eq!(triples.severity, Severity::High);
    }

    #[test]
    fn query_in_loop_flagged_outside_loop_not() {
        let f = file();
        let thresholds = Thresholds::default();
        let mut model = StructuralModel::empty(Language::Python);
        model.call_sites.push(query_call("db.query", 1, None));
        model.call_sites.push(query_call("db.query", 0, None));

        let ctx = RuleContext { file: &f, model: Some(&model), thresholds: &thresholds };
        let findings = NPlusOneQuery.evaluate(&ctx);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::High);
    }

    #[test]
    fn select_literal_counts_write_literal_does_not() {
        let f = file();
        let thresholds = Thresholds::default();
        let mut model = StructuralModel::empty(Language::Python);
        model
            .call_sites
            .push(query_call("session.run", 1, Some("SELECT id FROM users")));
        model
            .call_sites
            .push(query_call("db.execute", 2, Some("INSERT INTO log VALUES (?)")));

        let ctx = RuleContext { file: &f, model: Some(&model), thresholds: &thresholds };
        let findings = NPlusOneQuery.evaluate(&ctx);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].evidence[0], "session.run");
    }
}
