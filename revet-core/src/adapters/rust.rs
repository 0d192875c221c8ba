//! Rust adapter.
//!
//! Impl blocks map onto [`ClassNode`]: the impl target is the class, its
//! functions are the methods, and implemented traits land in `bases`.
//! Multiple impl blocks for one type are merged into a single node.

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

pub struct RustAdapter;

const TABLES: KindTables = KindTables {
    functions: &["function_item", "closure_expression"],
    decisions: &[
        "if_expression",
        "while_expression",
        "for_expression",
        "loop_expression",
        "match_arm",
    ],
    loops: &["for_expression", "while_expression", "loop_expression"],
    nesting: &["block"],
};

impl LanguageAdapter for RustAdapter {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn parse(&self, file: &SourceFile) -> Result<StructuralModel, AdapterError> {
        parse_with(Language::Rust, file, |root, src| {
            let mut model = StructuralModel::empty(Language::Rust);
            let mut impls: BTreeMap<String, ClassNode> = BTreeMap::new();
            visit(root, src, 0, None, &mut model, &mut impls);
            model.classes.extend(impls.into_values());
            model.classes.sort_by_key(|c| c.span.start_line);

            let counts = reference_counts(
                root,
                src,
                &["use_declaration"],
                &["identifier", "type_identifier"],
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
    impls: &mut BTreeMap<String, ClassNode>,
) {
    let mut loop_depth = loop_depth;
    let mut fn_name: Option<String> = None;

    match node.kind() {
        "function_item" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, src).to_string();
                record_function(node, src, &name, model);
                fn_name = Some(name);
                loop_depth = 0;
            }
        }
        "impl_item" => record_impl(node, src, impls),
        "use_declaration" => record_use(node, src, model),
        "call_expression" => {
            if let Some(callee) = node.child_by_field_name("function") {
                let callee_text = node_text(callee, src).to_string();
                let is_constructor = callee_text.ends_with("::new");
                model.call_sites.push(CallSite {
                    callee: callee_text,
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
        visit(child, src, loop_depth, next_fn, model, impls);
    }
}

fn record_function(node: Node<'_>, src: &[u8], name: &str, model: &mut StructuralModel) {
    let span = span_of(node);
    let is_async = node
        .children(&mut node.walk())
        .find(|c| c.kind() == "function_modifiers")
        .map(|m| node_text(m, src).contains("async"))
        .unwrap_or(false);

    let params = node
        .child_by_field_name("parameters")
        .map(|p| {
            let mut out = Vec::new();
            let mut cursor = p.walk();
            for child in p.children(&mut cursor) {
                if child.kind() != "parameter" {
                    continue;
                }
                if let Some(pattern) = child.child_by_field_name("pattern") {
                    if pattern.kind() == "identifier" {
                        out.push(node_text(pattern, src).to_string());
                    }
                }
            }
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
        is_async,
    });
}

fn record_impl(node: Node<'_>, src: &[u8], impls: &mut BTreeMap<String, ClassNode>) {
    let Some(type_node) = node.child_by_field_name("type") else {
        return;
    };
    let name = node_text(type_node, src).to_string();
    let span = span_of(node);
    let trait_name = node
        .child_by_field_name("trait")
        .map(|t| node_text(t, src).to_string());

    let mut method_names = Vec::new();
    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        for child in body.children(&mut cursor) {
            if child.kind() == "function_item" {
                if let Some(m) = child.child_by_field_name("name") {
                    method_names.push(node_text(m, src).to_string());
                }
            }
        }
    }

    let entry = impls.entry(name.clone()).or_insert_with(|| ClassNode {
        name,
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
    entry.method_names.extend(method_names);
    if let Some(t) = trait_name {
        if !entry.bases.contains(&t) {
            entry.bases.push(t);
            entry.inheritance_depth = 1;
        }
    }
}

fn record_use(node: Node<'_>, src: &[u8], model: &mut StructuralModel) {
    let Some(arg) = node.child_by_field_name("argument") else {
        return;
    };
    let span = span_of(node);
    push_use_tree(arg, src, span, "", model);
}

/// Flatten a use tree into one edge per imported leaf symbol.
fn push_use_tree(node: Node<'_>, src: &[u8], span: Span, prefix: &str, model: &mut StructuralModel) {
    match node.kind() {
        "identifier" | "scoped_identifier" | "crate" | "self" | "super" => {
            let text = node_text(node, src);
            let symbol = text.rsplit("::").next().unwrap_or(text).to_string();
            let module = if prefix.is_empty() {
                text.to_string()
            } else {
                format!("{prefix}::{text}")
            };
            model.imports.push(ImportEdge {
                module,
                symbol: Some(symbol),
                span,
                has_side_effects: false,
                reference_count: 0,
            });
        }
        "use_as_clause" => {
            let module = node
                .child_by_field_name("path")
                .map(|p| node_text(p, src).to_string())
                .unwrap_or_default();
            let symbol = node
                .child_by_field_name("alias")
                .map(|a| node_text(a, src).to_string());
            model.imports.push(ImportEdge {
                module,
                symbol,
                span,
                has_side_effects: false,
                reference_count: 0,
            });
        }
        "scoped_use_list" => {
            let path = node
                .child_by_field_name("path")
                .map(|p| node_text(p, src).to_string())
                .unwrap_or_default();
            let joined = if prefix.is_empty() {
                path
            } else {
                format!("{prefix}::{path}")
            };
            if let Some(list) = node.child_by_field_name("list") {
                let mut cursor = list.walk();
                for child in list.children(&mut cursor) {
                    if child.is_named() {
                        push_use_tree(child, src, span, &joined, model);
                    }
                }
            }
        }
        "use_wildcard" => {
            // Glob imports are unknowable statically; never flag them dead.
            model.imports.push(ImportEdge {
                module: node_text(node, src).to_string(),
                symbol: None,
                span,
                has_side_effects: true,
                reference_count: 0,
            });
        }
        _ => {}
    }
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
            "string_literal" => facts
                .string_literals
                .push(node_text(node, src).trim_matches('"').to_string()),
            "binary_expression" => {
                let plus = node
                    .child_by_field_name("operator")
                    .map(|op| node_text(op, src) == "+")
                    .unwrap_or(false);
                let has_string = {
                    let mut found = false;
                    let mut inner = vec![node];
                    while let Some(n) = inner.pop() {
                        if n.kind() == "string_literal" {
                            found = true;
                            break;
                        }
                        let mut cursor = n.walk();
                        for child in n.children(&mut cursor) {
                            inner.push(child);
                        }
                    }
                    found
                };
                if plus && has_string {
                    facts.has_concatenation = true;
                }
            }
            "macro_invocation" => {
                let is_format = node
                    .child_by_field_name("macro")
                    .map(|m| node_text(m, src) == "format")
                    .unwrap_or(false);
                if is_format {
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(source: &str) -> StructuralModel {
        let file = SourceFile::from_content(&PathBuf::from("test.rs"), None, source);
        RustAdapter.parse(&file).unwrap()
    }

    #[test]
    fn functions_with_params_and_async() {
        let source = "async fn fetch(url: String, retries: u32) -> u32 { retries }\n";
        let model = parse(source);
        let f = &model.functions[0];
        assert_eq!(f.name, "fetch");
        assert_eq!(f.params, vec!["url", "retries"]);
        assert!(f.is_async);
    }

    #[test]
    fn impl_blocks_merge_into_one_class() {
        let source = r#"
struct Store;

impl Store {
    fn get(&self) {}
    fn put(&self) {}
}

impl Drop for Store {
    fn drop(&mut self) {}
}
"#;
        let model = parse(source);
        assert_eq!(model.classes.len(), 1);
        let class = &model.classes[0];
        assert_eq!(class.name, "Store");
        assert_eq!(class.method_names, vec!["get", "put", "drop"]);
        assert_eq!(class.bases, vec!["Drop"]);
    }

    #[test]
    fn path_new_is_constructor() {
        let source = "fn build() { let c = HttpClient::new(); }\n";
        let model = parse(source);
        let call = model.call_sites.iter().find(|c| c.is_constructor).unwrap();
        assert_eq!(call.callee, "HttpClient::new");
    }

    #[test]
    fn use_list_flattens_to_leaf_symbols() {
        let source = "use std::collections::{HashMap, HashSet};\nfn f() { let _m: HashMap<u8, u8> = HashMap::new(); }\n";
        let model = parse(source);
        let map = model
            .imports
            .iter()
            .find(|i| i.symbol.as_deref() == Some("HashMap"))
            .unwrap();
        assert!(map.reference_count >= 1);
        let set = model
            .imports
            .iter()
            .find(|i| i.symbol.as_deref() == Some("HashSet"))
            .unwrap();
        assert_eq!(set.reference_count, 0);
    }

    #[test]
    fn loop_depth_at_call_site() {
        let source = r#"
fn process(rows: Vec<u32>) {
    for row in &rows {
        for col in &rows {
            handle(row, col);
        }
    }
}
"#;
        let model = parse(source);
        let call = model.call_sites.iter().find(|c| c.callee == "handle").unwrap();
        assert_eq!(call.loop_depth, 2);
        assert_eq!(model.functions[0].max_loop_depth, 2);
    }

    #[test]
    fn format_macro_marks_interpolation() {
        let source = "fn q(id: u32) { db.execute(format!(\"SELECT {id}\")); }\n";
        let model = parse(source);
        let call = model.call_sites.iter().find(|c| c.callee == "db.execute").unwrap();
        assert!(call.args.has_interpolation);
    }
}
