//! Go adapter.
//!
//! Methods are grouped by receiver type into [`ClassNode`]s; `_` imports
//! are recorded as side-effect-only edges.

use std::collections::BTreeMap;

use tree_sitter::Node;

use super::{
    cognitive, cyclomatic, max_loop_depth, max_nesting, node_text, parse_with, reference_counts,
    span_of, KindTables, LanguageAdapter,
};
use crate::error::AdapterError;
use crate::language::Language;
use crate::loader::SourceFile;
use crate::model::{ArgFacts, CallSite, ClassNode, FunctionNode, ImportEdge, Span, StructuralModel};

pub struct GoAdapter;

const TABLES: KindTables = KindTables {
    functions: &["function_declaration", "method_declaration", "func_literal"],
    decisions: &[
        "if_statement",
        "for_statement",
        "expression_case",
        "type_case",
        "select_statement",
    ],
    loops: &["for_statement"],
    nesting: &["block"],
};

impl LanguageAdapter for GoAdapter {
    fn language(&self) -> Language {
        Language::Go
    }

    fn parse(&self, file: &SourceFile) -> Result<StructuralModel, AdapterError> {
        parse_with(Language::Go, file, |root, src| {
            let mut model = StructuralModel::empty(Language::Go);
            let mut receivers: BTreeMap<String, ClassNode> = BTreeMap::new();
            visit(root, src, 0, None, &mut model, &mut receivers);
            model.classes.extend(receivers.into_values());
            model.classes.sort_by_key(|c| c.span.start_line);

            let counts = reference_counts(
                root,
                src,
                &["import_declaration"],
                &["identifier", "type_identifier", "package_identifier", "field_identifier"],
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
    receivers: &mut BTreeMap<String, ClassNode>,
) {
    let mut loop_depth = loop_depth;
    let mut fn_name: Option<String> = None;

    match node.kind() {
        "function_declaration" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, src).to_string();
                record_function(node, src, &name, model);
                fn_name = Some(name);
                loop_depth = 0;
            }
        }
        "method_declaration" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, src).to_string();
                record_function(node, src, &name, model);
                record_method(node, src, &name, receivers);
                fn_name = Some(name);
                loop_depth = 0;
            }
        }
        "import_spec" => record_import(node, src, model),
        "call_expression" => {
            if let Some(callee) = node.child_by_field_name("function") {
                let callee_text = node_text(callee, src).to_string();
                let segment = callee_text.rsplit('.').next().unwrap_or(&callee_text);
                let is_constructor = segment.starts_with("New")
                    && segment.chars().nth(3).map(char::is_uppercase).unwrap_or(true);
                model.call_sites.push(CallSite {
                    callee: callee_text.clone(),
                    span: span_of(node),
                    loop_depth,
                    enclosing_function: current_fn.map(str::to_string),
                    is_constructor,
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
        visit(child, src, loop_depth, next_fn, model, receivers);
    }
}

fn record_function(node: Node<'_>, src: &[u8], name: &str, model: &mut StructuralModel) {
    let span = span_of(node);
    let params = node
        .child_by_field_name("parameters")
        .map(|p| {
            let mut out = Vec::new();
            let mut stack = vec![p];
            while let Some(n) = stack.pop() {
                if n.kind() == "parameter_declaration" {
                    if let Some(ident) = n.child_by_field_name("name") {
                        out.push(node_text(ident, src).to_string());
                    }
                    continue;
                }
                let mut cursor = n.walk();
                for child in n.children(&mut cursor) {
                    stack.push(child);
                }
            }
            out.reverse();
            out
        })
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
        is_async: false, // goroutines are call-site facts, not declarations
    });
}

fn record_method(
    node: Node<'_>,
    src: &[u8],
    name: &str,
    receivers: &mut BTreeMap<String, ClassNode>,
) {
    let receiver_type = node
        .child_by_field_name("receiver")
        .map(|r| {
            node_text(r, src)
                .trim_matches(['(', ')'])
                .rsplit(|c: char| c.is_whitespace() || c == '*')
                .next()
                .unwrap_or("")
                .to_string()
        })
        .unwrap_or_default();
    if receiver_type.is_empty() {
        return;
    }
    let span = span_of(node);
    let entry = receivers.entry(receiver_type.clone()).or_insert_with(|| ClassNode {
        name: receiver_type,
        span,
        line_count: 0,
        method_names: Vec::new(),
        bases: Vec::new(),
        inheritance_depth: 0,
    });
    entry.span = Span::new(
        entry.span.start_line.min(span.start_line),
        entry.span.end_line.max(span.end_line),
    );
    entry.line_count += span.len();
    entry.method_names.push(name.to_string());
}

fn record_import(node: Node<'_>, src: &[u8], model: &mut StructuralModel) {
    let Some(path_node) = node.child_by_field_name("path") else {
        return;
    };
    let module = node_text(path_node, src).trim_matches('"').to_string();
    let name = node.child_by_field_name("name").map(|n| node_text(n, src));

    let (symbol, has_side_effects) = match name {
        Some("_") => (None, true), // blank import: side effects only
        Some(".") => (None, true), // dot import: usage untrackable
        Some(alias) => (Some(alias.to_string()), false),
        None => (
            module.rsplit('/').next().map(str::to_string),
            false,
        ),
    };

    model.imports.push(ImportEdge {
        module,
        symbol,
        span: span_of(node),
        has_side_effects,
        reference_count: 0,
    });
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
            "interpreted_string_literal" | "raw_string_literal" => facts
                .string_literals
                .push(node_text(node, src).trim_matches(['"', '`']).to_string()),
            "binary_expression" => {
                let plus = node
                    .child_by_field_name("operator")
                    .map(|op| node_text(op, src) == "+")
                    .unwrap_or(false);
                let has_string = has_descendant_kind(
                    node,
                    &["interpreted_string_literal", "raw_string_literal"],
                );
                if plus && has_string {
                    facts.has_concatenation = true;
                }
            }
            "call_expression" => {
                let sprintf = node
                    .child_by_field_name("function")
                    .map(|f| node_text(f, src).ends_with("Sprintf"))
                    .unwrap_or(false);
                if sprintf {
                    facts.has_interpolation = true;
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

fn has_descendant_kind(node: Node<'_>, kinds: &[&str]) -> bool {
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        if kinds.contains(&n.kind()) {
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
        let file = SourceFile::from_content(&PathBuf::from("main.go"), None, source);
        GoAdapter.parse(&file).unwrap()
    }

    #[test]
    fn functions_and_methods_grouped_by_receiver() {
        let source = r#"
package main

func Load(id int) int { return id }

func (s *Store) Get(key string) string { return key }

func (s *Store) Put(key string) {}
"#;
        let model = parse(source);
        assert!(model.functions.iter().any(|f| f.name == "Load"));
        assert_eq!(model.classes.len(), 1);
        let class = &model.classes[0];
        assert_eq!(class.name, "Store");
        assert_eq!(class.method_names, vec!["Get", "Put"]);
    }

    #[test]
    fn blank_import_is_side_effect() {
        let source = "package main\n\nimport (\n\t_ \"net/http/pprof\"\n\t\"fmt\"\n)\n\nfunc main() { fmt.Println(\"x\") }\n";
        let model = parse(source);
        let blank = model.imports.iter().find(|i| i.has_side_effects).unwrap();
        assert_eq!(blank.module, "net/http/pprof");
        let fmt_edge = model
            .imports
            .iter()
            .find(|i| i.symbol.as_deref() == Some("fmt"))
            .unwrap();
        assert!(fmt_edge.reference_count >= 1);
    }

    #[test]
    fn query_concat_in_loop() {
        let source = r#"
package main

func fetch(userID string) {
	for _, id := range ids {
		db.Query("SELECT * FROM t WHERE id=" + userID)
	}
}
"#;
        let model = parse(source);
        let call = model.call_sites.iter().find(|c| c.callee == "db.Query").unwrap();
        assert_eq!(call.loop_depth, 1);
        assert!(call.args.has_concatenation);
        assert!(call.args.identifiers.contains(&"userID".to_string()));
    }

    #[test]
    fn new_prefix_is_constructor() {
        let source = "package main\n\nfunc build() {\n\tc := NewClient()\n\t_ = c\n}\n";
        let model = parse(source);
        let call = model.call_sites.iter().find(|c| c.callee == "NewClient").unwrap();
        assert!(call.is_constructor);
    }

    #[test]
    fn sprintf_argument_marks_interpolation() {
        let source = "package main\n\nfunc q(name string) {\n\tdb.Exec(fmt.Sprintf(\"SELECT %s\", name))\n}\n";
        let model = parse(source);
        let call = model.call_sites.iter().find(|c| c.callee == "db.Exec").unwrap();
        assert!(call.args.has_interpolation);
    }
}
