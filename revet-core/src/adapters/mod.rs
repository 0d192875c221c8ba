//! Language adapter layer.
//!
//! One adapter per supported language; each wraps a tree-sitter grammar and
//! populates the shared [`StructuralModel`]. Adapters record facts only:
//! no adapter decides whether something is an issue; that is the rule
//! engine's job. Adding a language means implementing [`LanguageAdapter`]
//! and nothing else.

pub mod go;
pub mod javascript;
pub mod python;
pub mod rust;

use std::collections::HashMap;

use tree_sitter::Node;

use crate::error::AdapterError;
use crate::language::{grammar, Language};
use crate::loader::SourceFile;
use crate::model::{Span, StructuralModel};

/// Contract: given a loaded file, produce a structural model or a typed
/// failure. A best-effort partial model is preferred over total failure.
pub trait LanguageAdapter: Send + Sync {
    fn language(&self) -> Language;
    fn parse(&self, file: &SourceFile) -> Result<StructuralModel, AdapterError>;
}

/// The default adapter set, read-only and safely shared across workers.
pub fn default_adapters() -> Vec<Box<dyn LanguageAdapter>> {
    vec![
        Box::new(rust::RustAdapter),
        Box::new(python::PythonAdapter),
        Box::new(javascript::JavaScriptAdapter),
        Box::new(go::GoAdapter),
    ]
}

// ---------------------------------------------------------------------------
// Shared tree-sitter helpers
// ---------------------------------------------------------------------------

/// Node kind tables driving the generic metric helpers. Each adapter owns
/// one table for its grammar.
pub(crate) struct KindTables {
    /// Kinds that introduce a new function scope (nested ones are excluded
    /// from the enclosing function's metrics).
    pub functions: &'static [&'static str],
    /// Kinds counted as decision points for cyclomatic complexity.
    pub decisions: &'static [&'static str],
    /// Loop kinds, for loop-depth tracking.
    pub loops: &'static [&'static str],
    /// Kinds that deepen block nesting.
    pub nesting: &'static [&'static str],
}

pub(crate) fn span_of(node: Node<'_>) -> Span {
    Span::new(node.start_position().row + 1, node.end_position().row + 1)
}

pub(crate) fn node_text<'s>(node: Node<'_>, src: &'s [u8]) -> &'s str {
    node.utf8_text(src).unwrap_or("")
}

/// Cyclomatic complexity of a function body: 1 + decision points, not
/// descending into nested functions.
pub(crate) fn cyclomatic(body: Node<'_>, tables: &KindTables) -> usize {
    let mut count = 1;
    let mut stack = vec![body];
    while let Some(node) = stack.pop() {
        if tables.decisions.contains(&node.kind()) {
            count += 1;
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if tables.functions.contains(&child.kind()) {
                continue;
            }
            stack.push(child);
        }
    }
    count
}

/// Cognitive complexity: decision points weighted by how deeply they nest.
pub(crate) fn cognitive(body: Node<'_>, tables: &KindTables) -> usize {
    let mut total = 0;
    let mut stack = vec![(body, 0usize)];
    while let Some((node, depth)) = stack.pop() {
        let mut next_depth = depth;
        if tables.decisions.contains(&node.kind()) {
            total += 1 + depth;
            next_depth += 1;
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if tables.functions.contains(&child.kind()) {
                continue;
            }
            stack.push((child, next_depth));
        }
    }
    total
}

/// Maximum block nesting depth inside a function body.
pub(crate) fn max_nesting(body: Node<'_>, tables: &KindTables) -> usize {
    let mut max_depth = 0;
    let mut stack = vec![(body, 0usize)];
    while let Some((node, depth)) = stack.pop() {
        let next = if tables.nesting.contains(&node.kind()) {
            depth + 1
        } else {
            depth
        };
        max_depth = max_depth.max(next);
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if tables.functions.contains(&child.kind()) {
                continue;
            }
            stack.push((child, next));
        }
    }
    max_depth
}

/// Maximum loop nesting depth inside a function body (loops only).
pub(crate) fn max_loop_depth(body: Node<'_>, tables: &KindTables) -> usize {
    let mut max_depth = 0;
    let mut stack = vec![(body, 0usize)];
    while let Some((node, depth)) = stack.pop() {
        let next = if tables.loops.contains(&node.kind()) {
            depth + 1
        } else {
            depth
        };
        max_depth = max_depth.max(next);
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if tables.functions.contains(&child.kind()) {
                continue;
            }
            stack.push((child, next));
        }
    }
    max_depth
}

/// Count occurrences of each identifier-like node's text, skipping subtrees
/// of the given import kinds, so the import statement itself does not count
/// as a use of the imported symbol.
pub(crate) fn reference_counts(
    root: Node<'_>,
    src: &[u8],
    import_kinds: &[&str],
    identifier_kinds: &[&str],
) -> HashMap<String, usize> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if import_kinds.contains(&node.kind()) {
            continue;
        }
        if identifier_kinds.contains(&node.kind()) {
            *counts.entry(node_text(node, src).to_string()).or_insert(0) += 1;
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            stack.push(child);
        }
    }
    counts
}

/// Parse the file with the grammar for `lang` and hand the tree to
/// `build`. A tree with syntax errors still yields the best-effort model,
/// wrapped in `ParseFailure { partial }`.
pub(crate) fn parse_with<F>(
    lang: Language,
    file: &SourceFile,
    build: F,
) -> Result<StructuralModel, AdapterError>
where
    F: FnOnce(Node<'_>, &[u8]) -> StructuralModel,
{
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&grammar(lang))
        .map_err(|e| AdapterError::ParseFailure {
            reason: format!("grammar load: {e}"),
            partial: None,
        })?;

    let tree = parser
        .parse(file.content.as_bytes(), None)
        .ok_or_else(|| AdapterError::ParseFailure {
            reason: "tree-sitter produced no tree".to_string(),
            partial: None,
        })?;

    let model = build(tree.root_node(), file.content.as_bytes());

    if tree.root_node().has_error() {
        tracing::debug!(file = %file.path.display(), "syntax errors; returning partial model");
        return Err(AdapterError::ParseFailure {
            reason: "syntax errors in source".to_string(),
            partial: Some(Box::new(model)),
        });
    }
    Ok(model)
}
