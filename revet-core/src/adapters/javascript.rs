//! JavaScript / TypeScript adapter.

use tree_sitter::Node;

use super::{
    cognitive, cyclomatic, max_loop_depth, max_nesting, node_text, parse_with, reference_counts,
    span_of, KindTables, LanguageAdapter,
};
use crate::error::AdapterError;
use crate::language::Language;
use crate::loader::SourceFile;
use crate::model::{ArgFacts, CallSite, ClassNode, FunctionNode, ImportEdge, StructuralModel};

pub struct JavaScriptAdapter;

const TABLES: KindTables = KindTables {
    functions: &[
        "function_declaration",
        "generator_function_declaration",
        "function_expression",
        "function",
        "arrow_function",
        "method_definition",
    ],
    decisions: &[
        "if_statement",
        "for_statement",
        "for_in_statement",
        "while_statement",
        "do_statement",
        "switch_case",
        "ternary_expression",
        "catch_clause",
    ],
    loops: &[
        "for_statement",
        "for_in_statement",
        "while_statement",
        "do_statement",
    ],
    nesting: &["statement_block"],
};

impl LanguageAdapter for JavaScriptAdapter {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn parse(&self, file: &SourceFile) -> Result<StructuralModel, AdapterError> {
        parse_with(Language::JavaScript, file, |root, src| {
            let mut model = StructuralModel::empty(Language::JavaScript);
            visit(root, src, 0, None, &mut model);
            let counts = reference_counts(
                root,
                src,
                &["import_statement"],
                &["identifier", "property_identifier", "shorthand_property_identifier"],
            );
            for edge in &mut model.imports {
                if let Some(symbol) = &edge.symbol {
                    edge.reference_count = counts.get(symbol).copied().unwrap_or(0);
                }
            }
            model
        })
    }
}

fn visit(
    node: Node<'_>,
    src: &[u8],
    loop_depth: usize,
    current_fn: Option<&str>,
    model: &mut StructuralModel,
) {
    let mut loop_depth = loop_depth;
    let mut fn_name: Option<String> = None;

    match node.kind() {
        "function_declaration" | "generator_function_declaration" => {
            if let Some(name) = child_identifier(node, src, "identifier") {
                record_function(node, src, &name, model);
                fn_name = Some(name);
                loop_depth = 0;
            }
        }
        "method_definition" => {
            if let Some(name) = node
                .children(&mut node.walk())
                .find(|c| c.kind() == "property_identifier" || c.kind() == "identifier")
                .map(|c| node_text(c, src).to_string())
            {
                record_function(node, src, &name, model);
                fn_name = Some(name);
                loop_depth = 0;
            }
        }
        "variable_declarator" => {
            let has_fn = node.children(&mut node.walk()).any(|c| {
                matches!(c.kind(), "arrow_function" | "function_expression" | "function")
            });
            if has_fn {
                if let Some(name) = child_identifier(node, src, "identifier") {
                    record_function(node, src, &name, model);
                    fn_name = Some(name);
                    loop_depth = 0;
                }
            }
        }
        "class_declaration" => record_class(node, src, model),
        "import_statement" => record_import(node, src, model),
        "call_expression" => {
            if let Some(callee) = node.child_by_field_name("function") {
                model.call_sites.push(CallSite {
                    callee: node_text(callee, src).to_string(),
                    span: span_of(node),
                    loop_depth,
                    enclosing_function: current_fn.map(str::to_string),
                    is_constructor: false,
                    args: arg_facts(node.child_by_field_name("arguments"), src),
                });
            }
        }
        "new_expression" => {
            if let Some(callee) = node.child_by_field_name("constructor") {
                model.call_sites.push(CallSite {
                    callee: node_text(callee, src).to_string(),
                    span: span_of(node),
                    loop_depth,
                    enclosing_function: current_fn.map(str::to_string),
                    is_constructor: true,
                    args: arg_facts(node.child_by_field_name("arguments"), src),
                });
            }
        }
        _ => {}
    }

    if TABLES.loops.contains(&node.kind()) {
        loop_depth += 1;
    }
    let next_fn = fn_name.as_deref().or(current_fn);
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        visit(child, src, loop_depth, next_fn, model);
    }
}

fn child_identifier(node: Node<'_>, src: &[u8], kind: &str) -> Option<String> {
    node.children(&mut node.walk())
        .find(|c| c.kind() == kind)
        .map(|c| node_text(c, src).to_string())
}

fn record_function(node: Node<'_>, src: &[u8], name: &str, model: &mut StructuralModel) {
    let span = span_of(node);
    let is_async = node
        .children(&mut node.walk())
        .any(|c| c.kind() == "async")
        || node_text(node, src).starts_with("async ");
    let params = node
        .children(&mut node.walk())
        .chain(descendant_params(node))
        .find(|c| c.kind() == "formal_parameters")
        .map(|p| collect_identifiers(p, src, &["identifier"]))
        .unwrap_or_default();

    model.functions.push(FunctionNode {
        name: name.to_string(),
        span,
        params,
        line_count: span.len(),
        cyclomatic: cyclomatic(node, &TABLES),
        cognitive: cognitive(node, &TABLES),
        nesting_depth: max_nesting(node, &TABLES),
        max_loop_depth: max_loop_depth(node, &TABLES),
        is_async,
    });
}

/// Parameters of arrow/function expressions hang off the value, one level
/// down from the declarator.
fn descendant_params<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut out = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        let mut inner = child.walk();
        for grandchild in child.children(&mut inner) {
            out.push(grandchild);
        }
    }
    out
}

fn record_class(node: Node<'_>, src: &[u8], model: &mut StructuralModel) {
    let name = match node.child_by_field_name("name") {
        Some(n) => node_text(n, src).to_string(),
        None => return,
    };
    let span = span_of(node);
    let mut method_names = Vec::new();
    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        for child in body.children(&mut cursor) {
            if child.kind() == "method_definition" {
                if let Some(m) = child
                    .children(&mut child.walk())
                    .find(|c| c.kind() == "property_identifier")
                {
                    method_names.push(node_text(m, src).to_string());
                }
            }
        }
    }
    let bases: Vec<String> = node
        .children(&mut node.walk())
        .filter(|c| c.kind() == "class_heritage")
        .filter_map(|h| h.named_child(0).map(|b| node_text(b, src).to_string()))
        .collect();

    model.classes.push(ClassNode {
        name,
        span,
        line_count: span.len(),
        inheritance_depth: usize::from(!bases.is_empty()),
        bases,
        method_names,
    });
}

fn record_import(node: Node<'_>, src: &[u8], model: &mut StructuralModel) {
    let module = node
        .child_by_field_name("source")
        .map(|s| node_text(s, src).trim_matches(['"', '\'', '`']).to_string())
        .unwrap_or_default();
    let span = span_of(node);

    let clause = node
        .children(&mut node.walk())
        .find(|c| c.kind() == "import_clause");

    let Some(clause) = clause else {
        // `import "./polyfill"`: side-effect only, must not be flagged dead.
        model.imports.push(ImportEdge {
            module,
            symbol: None,
            span,
            has_side_effects: true,
            reference_count: 0,
        });
        return;
    };

    let symbols = collect_identifiers(clause, src, &["identifier"]);
    if symbols.is_empty() {
        model.imports.push(ImportEdge {
            module: module.clone(),
            symbol: None,
            span,
            has_side_effects: false,
            reference_count: 0,
        });
    }
    for symbol in symbols {
        model.imports.push(ImportEdge {
            module: module.clone(),
            symbol: Some(symbol),
            span,
            has_side_effects: false,
            reference_count: 0,
        });
    }
}

fn collect_identifiers(node: Node<'_>, src: &[u8], kinds: &[&str]) -> Vec<String> {
    let mut out = Vec::new();
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        if kinds.contains(&n.kind()) {
            out.push(node_text(n, src).to_string());
        }
        let mut cursor = n.walk();
        for child in n.children(&mut cursor) {
            stack.push(child);
        }
    }
    out.reverse();
    out
}

fn arg_facts(args: Option<Node<'_>>, src: &[u8]) -> ArgFacts {
    let mut facts = ArgFacts::default();
    let Some(args) = args else {
        return facts;
    };
    let mut stack = vec![args];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "identifier" => facts.identifiers.push(node_text(node, src).to_string()),
            "string_fragment" => facts.string_literals.push(node_text(node, src).to_string()),
            "template_string" => {
                let has_subst = node
                    .children(&mut node.walk())
                    .any(|c| c.kind() == "template_substitution");
                if has_subst {
                    facts.has_interpolation = true;
                }
            }
            "binary_expression" => {
                let plus = node
                    .child_by_field_name("operator")
                    .map(|op| node_text(op, src) == "+")
                    .unwrap_or(false);
                if plus && subtree_has_string(node) {
                    facts.has_concatenation = true;
                }
            }
            _ => {}
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            stack.push(child);
        }
    }
    facts
}

fn subtree_has_string(node: Node<'_>) -> bool {
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        if matches!(n.kind(), "string" | "template_string") {
            return true;
        }
        let mut cursor = n.walk();
        for child in n.children(&mut cursor) {
            stack.push(child);
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(source: &str) -> StructuralModel {
        let file = SourceFile::from_content(&PathBuf::from("test.js"), None, source);
        JavaScriptAdapter.parse(&file).unwrap()
    }

    #[test]
    fn extracts_functions_with_params() {
        let model = parse("function load(userInput, limit) { return userInput; }\n");
        assert_eq!(model.functions.len(), 1);
        let f = &model.functions[0];
        assert_eq!(f.name, "load");
        assert_eq!(f.params, vec!["userInput", "limit"]);
        assert!(!f.is_async);
    }

    #[test]
    fn arrow_function_assigned_to_const() {
        let model = parse("const add = (a, b) => a + b;\n");
        assert_eq!(model.functions.len(), 1);
        assert_eq!(model.functions[0].name, "add");
        assert_eq!(model.functions[0].params, vec!["a", "b"]);
    }

    #[test]
    fn call_in_loop_records_depth_and_concat() {
        let source = r#"
function load(userInput) {
  for (const id of ids) {
    db.query("SELECT * FROM t WHERE id=" + userInput);
  }
}
"#;
        let model = parse(source);
        let call = model
            .call_sites
            .iter()
            .find(|c| c.callee == "db.query")
            .unwrap();
        assert_eq!(call.loop_depth, 1);
        assert_eq!(call.enclosing_function.as_deref(), Some("load"));
        assert!(call.args.has_concatenation);
        assert!(call.args.identifiers.contains(&"userInput".to_string()));
        assert!(call
            .args
            .string_literals
            .iter()
            .any(|s| s.starts_with("SELECT")));
    }

    #[test]
    fn template_interpolation_flagged() {
        let model = parse("function f(name) { el.innerHTML = render(`<b>${name}</b>`); }\n");
        let call = model.call_sites.iter().find(|c| c.callee == "render").unwrap();
        assert!(call.args.has_interpolation);
    }

    #[test]
    fn classes_methods_and_heritage() {
        let source = r#"
class OrderService extends BaseService {
  sendEmail() {}
  validateInput() {}
  persistOrder() {}
}
"#;
        let model = parse(source);
        assert_eq!(model.classes.len(), 1);
        let class = &model.classes[0];
        assert_eq!(class.name, "OrderService");
        assert_eq!(class.method_names.len(), 3);
        assert_eq!(class.bases, vec!["BaseService"]);
        assert_eq!(class.inheritance_depth, 1);
    }

    #[test]
    fn new_expression_is_constructor() {
        let model = parse("function f() { const repo = new PgRepo(); }\n");
        let call = model.call_sites.iter().find(|c| c.is_constructor).unwrap();
        assert_eq!(call.callee, "PgRepo");
    }

    #[test]
    fn imports_side_effect_and_named() {
        let source = "import './polyfill';\nimport { used, unused } from './util';\nused();\n";
        let model = parse(source);
        let side_effect = model.imports.iter().find(|i| i.has_side_effects).unwrap();
        assert_eq!(side_effect.module, "./polyfill");
        let used = model
            .imports
            .iter()
            .find(|i| i.symbol.as_deref() == Some("used"))
            .unwrap();
        assert!(used.reference_count >= 1);
        let unused = model
            .imports
            .iter()
            .find(|i| i.symbol.as_deref() == Some("unused"))
            .unwrap();
        assert_eq!(unused.reference_count, 0);
    }

    #[test]
    fn loop_metrics_on_functions() {
        let source = r#"
function matmul(a, b) {
  for (let i = 0; i < n; i++) {
    for (let j = 0; j < n; j++) {
      for (let k = 0; k < n; k++) {
        acc(i, j, k);
      }
    }
  }
}
"#;
        let model = parse(source);
        assert_eq!(model.functions[0].max_loop_depth, 3);
        let call = model.call_sites.iter().find(|c| c.callee == "acc").unwrap();
        assert_eq!(call.loop_depth, 3);
    }

    #[test]
    fn broken_source_yields_partial_model() {
        let file = SourceFile::from_content(
            &PathBuf::from("broken.js"),
            None,
            "function ok() { fine(); }\nfunction broken( {{{\n",
        );
        match JavaScriptAdapter.parse(&file) {
            Err(AdapterError::ParseFailure { partial: Some(model), .. }) => {
                assert!(model.functions.iter().any(|f| f.name == "ok"));
            }
            other => panic!("expected partial parse failure, got {other:?}"),
        }
    }
}
