//! Python adapter.

use tree_sitter::Node;

use super::{
    cognitive, cyclomatic, max_loop_depth, max_nesting, node_text, parse_with, reference_counts,
    span_of, KindTables, LanguageAdapter,
};
use crate::error::AdapterError;
use crate::language::Language;
use crate::loader::SourceFile;
use crate::model::{ArgFacts, CallSite, ClassNode, FunctionNode, ImportEdge, StructuralModel};

pub struct PythonAdapter;

const TABLES: KindTables = KindTables {
    functions: &["function_definition", "lambda"],
    decisions: &[
        "if_statement",
        "elif_clause",
        "for_statement",
        "while_statement",
        "except_clause",
        "conditional_expression",
        "boolean_operator",
    ],
    loops: &["for_statement", "while_statement"],
    nesting: &["block"],
};

impl LanguageAdapter for PythonAdapter {
    fn language(&self) -> Language {
        Language::Python
    }

    fn parse(&self, file: &SourceFile) -> Result<StructuralModel, AdapterError> {
        parse_with(Language::Python, file, |root, src| {
            let mut model = StructuralModel::empty(Language::Python);
            visit(root, src, 0, None, None, &mut model);
            let counts = reference_counts(
                root,
                src,
                &["import_statement", "import_from_statement"],
                &["identifier"],
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
    current_class: Option<&str>,
    model: &mut StructuralModel,
) {
    let mut loop_depth = loop_depth;
    let mut fn_name: Option<String> = None;
    let mut class_name: Option<String> = None;

    match node.kind() {
        "function_definition" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, src).to_string();
                record_function(node, src, &name, model);
                fn_name = Some(name);
                loop_depth = 0;
            }
        }
        "class_definition" => {
            if let Some(name) = record_class(node, src, model) {
                class_name = Some(name);
            }
        }
        "import_statement" | "import_from_statement" => record_import(node, src, model),
        "call" => {
            if let Some(callee) = node.child_by_field_name("function") {
                let callee_text = node_text(callee, src).to_string();
                let last = callee_text
                    .rsplit('.')
                    .next()
                    .unwrap_or(&callee_text);
                // Capitalized callees are treated as constructor calls,
                // excluding an explicit super().__init__ chain.
                let is_constructor = last
                    .chars()
                    .next()
                    .map(|c| c.is_ascii_uppercase())
                    .unwrap_or(false)
                    && current_class.map(|c| c != last).unwrap_or(true);
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
    let next_class = class_name.as_deref().or(current_class);
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        visit(child, src, loop_depth, next_fn, next_class, model);
    }
}

fn record_function(node: Node<'_>, src: &[u8], name: &str, model: &mut StructuralModel) {
    let span = span_of(node);
    let is_async = node.children(&mut node.walk()).any(|c| c.kind() == "async")
        || node
            .prev_sibling()
            .map(|s| s.kind() == "async")
            .unwrap_or(false);

    let params = node
        .child_by_field_name("parameters")
        .map(|p| {
            let mut out = Vec::new();
            let mut cursor = p.walk();
            for child in p.children(&mut cursor) {
                let ident = match child.kind() {
                    "identifier" => Some(child),
                    "typed_parameter" | "default_parameter" | "typed_default_parameter" => child
                        .children(&mut child.walk())
                        .find(|c| c.kind() == "identifier"),
                    _ => None,
                };
                if let Some(ident) = ident {
                    let text = node_text(ident, src);
                    if text != "self" && text != "cls" {
                        out.push(text.to_string());
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

fn record_class(node: Node<'_>, src: &[u8], model: &mut StructuralModel) -> Option<String> {
    let name = node_text(node.child_by_field_name("name")?, src).to_string();
    let span = span_of(node);

    let mut method_names = Vec::new();
    if let Some(body) = node.child_by_field_name("body") {
        let mut stack = vec![body];
        while let Some(n) = stack.pop() {
            if n.kind() == "function_definition" {
                if let Some(m) = n.child_by_field_name("name") {
                    method_names.push(node_text(m, src).to_string());
                }
                continue; // do not descend into nested defs
            }
            let mut cursor = n.walk();
            for child in n.children(&mut cursor) {
                stack.push(child);
            }
        }
    }
    method_names.reverse();

    let bases: Vec<String> = node
        .child_by_field_name("superclasses")
        .map(|args| {
            let mut out = Vec::new();
            let mut cursor = args.walk();
            for child in args.children(&mut cursor) {
                if matches!(child.kind(), "identifier" | "attribute") {
                    out.push(node_text(child, src).to_string());
                }
            }
            out
        })
        .unwrap_or_default();

    model.classes.push(ClassNode {
        name: name.clone(),
        span,
        line_count: span.len(),
        inheritance_depth: usize::from(!bases.is_empty()),
        bases,
        method_names,
    });
    Some(name)
}

fn record_import(node: Node<'_>, src: &[u8], model: &mut StructuralModel) {
    let span = span_of(node);
    if node.kind() == "import_from_statement" {
        let module = node
            .child_by_field_name("module_name")
            .map(|m| node_text(m, src).to_string())
            .unwrap_or_default();
        let mut cursor = node.walk();
        let mut seen_import_kw = false;
        for child in node.children(&mut cursor) {
            if child.kind() == "import" {
                seen_import_kw = true;
                continue;
            }
            if !seen_import_kw {
                continue;
            }
            match child.kind() {
                "dotted_name" | "aliased_import" => {
                    let symbol = match child.kind() {
                        "aliased_import" => child
                            .child_by_field_name("alias")
                            .map(|a| node_text(a, src).to_string()),
                        _ => Some(node_text(child, src).to_string()),
                    };
                    model.imports.push(ImportEdge {
                        module: module.clone(),
                        symbol,
                        span,
                        has_side_effects: false,
                        reference_count: 0,
                    });
                }
                "wildcard_import" => {
                    // `from m import *`: unknowable usage, treat as side-effectful.
                    model.imports.push(ImportEdge {
                        module: module.clone(),
                        symbol: None,
                        span,
                        has_side_effects: true,
                        reference_count: 0,
                    });
                }
                _ => {}
            }
        }
    } else {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "dotted_name" => {
                    let text = node_text(child, src);
                    let symbol = text.split('.').next().unwrap_or(text).to_string();
                    model.imports.push(ImportEdge {
                        module: text.to_string(),
                        symbol: Some(symbol),
                        span,
                        has_side_effects: false,
                        reference_count: 0,
                    });
                }
                "aliased_import" => {
                    let module = child
                        .child_by_field_name("name")
                        .map(|n| node_text(n, src).to_string())
                        .unwrap_or_default();
                    let symbol = child
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
                _ => {}
            }
        }
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
            "string" => {
                let has_interp = node
                    .children(&mut node.walk())
                    .any(|c| c.kind() == "interpolation");
                if has_interp {
                    facts.has_interpolation = true;
                }
                facts
                    .string_literals
                    .push(node_text(node, src).trim_matches(['"', '\'']).to_string());
            }
            "binary_operator" => {
                let op = node
                    .child_by_field_name("operator")
                    .map(|o| node_text(o, src))
                    .unwrap_or("");
                let string_operand = node
                    .children(&mut node.walk())
                    .any(|c| c.kind() == "string" || c.kind() == "concatenated_string");
                if (op == "+" || op == "%") && string_operand {
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(source: &str) -> StructuralModel {
        let file = SourceFile::from_content(&PathBuf::from("test.py"), None, source);
        PythonAdapter.parse(&file).unwrap()
    }

    #[test]
    fn functions_and_methods() {
        let source = "class Repo:\n    def save(self, order):\n        pass\n\ndef main():\n    pass\n";
        let model = parse(source);
        let names: Vec<&str> = model.functions.iter().map(|f| f.name.as_str()).collect();
        assert!(names.contains(&"save"));
        assert!(names.contains(&"main"));
        let save = model.functions.iter().find(|f| f.name == "save").unwrap();
        assert_eq!(save.params, vec!["order"]);
    }

    #[test]
    fn class_with_bases_and_methods() {
        let source = "class OrderService(Base):\n    def send(self): pass\n    def validate(self): pass\n";
        let model = parse(source);
        let class = &model.classes[0];
        assert_eq!(class.name, "OrderService");
        assert_eq!(class.bases, vec!["Base"]);
        assert_eq!(class.method_names, vec!["send", "validate"]);
    }

    #[test]
    fn query_call_in_loop_with_percent_format() {
        let source = "def fetch(user_id):\n    for row in rows:\n        cursor.execute(\"SELECT * FROM t WHERE id=%s\" % user_id)\n";
        let model = parse(source);
        let call = model
            .call_sites
            .iter()
            .find(|c| c.callee == "cursor.execute")
            .unwrap();
        assert_eq!(call.loop_depth, 1);
        assert!(call.args.has_concatenation);
        assert!(call.args.identifiers.contains(&"user_id".to_string()));
    }

    #[test]
    fn fstring_marks_interpolation() {
        let source = "def q(name):\n    db.query(f\"SELECT * FROM {name}\")\n";
        let model = parse(source);
        let call = model.call_sites.iter().find(|c| c.callee == "db.query").unwrap();
        assert!(call.args.has_interpolation);
    }

    #[test]
    fn capitalized_callee_is_constructor() {
        let source = "def build():\n    repo = PostgresRepo()\n    return repo\n";
        let model = parse(source);
        let call = model.call_sites.iter().find(|c| c.callee == "PostgresRepo").unwrap();
        assert!(call.is_constructor);
    }

    #[test]
    fn imports_and_reference_counts() {
        let source = "import os\nimport hashlib\nfrom json import dumps\n\nprint(os.path.sep)\nprint(dumps({}))\n";
        let model = parse(source);
        let os_edge = model
            .imports
            .iter()
            .find(|i| i.symbol.as_deref() == Some("os"))
            .unwrap();
        assert!(os_edge.reference_count >= 1);
        let hashlib_edge = model
            .imports
            .iter()
            .find(|i| i.symbol.as_deref() == Some("hashlib"))
            .unwrap();
        assert_eq!(hashlib_edge.reference_count, 0);
        let dumps_edge = model
            .imports
            .iter()
            .find(|i| i.symbol.as_deref() == Some("dumps"))
            .unwrap();
        assert!(dumps_edge.reference_count >= 1);
    }

    #[test]
    fn wildcard_import_is_side_effectful() {
        let model = parse("from settings import *\n");
        assert!(model.imports[0].has_side_effects);
    }

    #[test]
    fn nested_loops_tracked() {
        let source = "def scan(items):\n    for a in items:\n        for b in items:\n            compare(a, b)\n";
        let model = parse(source);
        assert_eq!(model.functions[0].max_loop_depth, 2);
        let call = model.call_sites.iter().find(|c| c.callee == "compare").unwrap();
        assert_eq!(call.loop_depth, 2);
    }
}
