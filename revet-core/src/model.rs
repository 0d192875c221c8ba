//! The language-agnostic structural model.
//!
//! Adapters populate these types; rules consume them. The node set is
//! closed: language-specific facts that do not fit are dropped at the
//! adapter boundary (with a debug log), never smuggled through untyped.

use serde::{Deserialize, Serialize};

use crate::language::Language;

/// 1-based inclusive line range inside one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start_line: usize,
    pub end_line: usize,
}

impl Span {
    pub fn new(start_line: usize, end_line: usize) -> Span {
        Span { start_line, end_line }
    }

    pub fn len(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    pub fn contains(&self, other: &Span) -> bool {
        self.start_line <= other.start_line && other.end_line <= self.end_line
    }

    /// Fraction of the shorter of the two spans covered by their overlap.
    /// 0.0 when disjoint, 1.0 when one contains the other.
    pub fn overlap_fraction(&self, other: &Span) -> f64 {
        let lo = self.start_line.max(other.start_line);
        let hi = self.end_line.min(other.end_line);
        if lo > hi {
            return 0.0;
        }
        let overlap = hi - lo + 1;
        overlap as f64 / self.len().min(other.len()) as f64
    }
}

/// Literal/identifier facts about the arguments of one call, captured so
/// rules can reason about string construction without re-parsing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArgFacts {
    /// Any argument is built by string concatenation (`"a" + x`).
    pub has_concatenation: bool,
    /// Any argument is built by template/f-string interpolation.
    pub has_interpolation: bool,
    /// Identifiers appearing anywhere in the argument list.
    pub identifiers: Vec<String>,
    /// String literal fragments appearing in the argument list.
    pub string_literals: Vec<String>,
}

/// One call site, with enough surrounding context for flow-level rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSite {
    /// Callee as written, e.g. `db.query` or `hashlib::md5`.
    pub callee: String,
    pub span: Span,
    /// Number of enclosing loops at the call site (0 = not in a loop).
    pub loop_depth: usize,
    /// Name of the innermost enclosing function, when any.
    pub enclosing_function: Option<String>,
    /// Heuristic: this call constructs a concrete type (`new Foo()`,
    /// `Foo::new`, capitalized Python callee, Go `NewFoo`).
    pub is_constructor: bool,
    pub args: ArgFacts,
}

impl CallSite {
    /// Last dot/path segment of the callee, lowercased. Rules match on this
    /// rather than on raw substrings.
    pub fn callee_segment(&self) -> String {
        self.callee
            .rsplit(|c| c == '.' || c == ':')
            .next()
            .unwrap_or(&self.callee)
            .to_lowercase()
    }
}

/// A function or method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionNode {
    pub name: String,
    pub span: Span,
    pub params: Vec<String>,
    pub line_count: usize,
    pub cyclomatic: usize,
    pub cognitive: usize,
    /// Maximum block nesting depth inside the body.
    pub nesting_depth: usize,
    /// Maximum loop nesting depth inside the body (loops only).
    pub max_loop_depth: usize,
    pub is_async: bool,
}

/// A class (or the closest per-language equivalent: Rust impl target,
/// Go receiver type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassNode {
    pub name: String,
    pub span: Span,
    pub method_names: Vec<String>,
    pub line_count: usize,
    /// Explicitly listed base classes / implemented interfaces.
    pub bases: Vec<String>,
    /// Locally visible inheritance depth: 0 with no bases, 1 otherwise.
    pub inheritance_depth: usize,
}

impl ClassNode {
    pub fn method_count(&self) -> usize {
        self.method_names.len()
    }
}

/// An import/dependency edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportEdge {
    pub module: String,
    /// Imported symbol, `None` for whole-module or side-effect imports.
    pub symbol: Option<String>,
    pub span: Span,
    /// Side-effect-only import (e.g. `import "./polyfill"`, Go `_` import).
    /// Dead-code analysis must not flag these.
    pub has_side_effects: bool,
    /// References to the imported symbol elsewhere in the file.
    pub reference_count: usize,
}

/// The parsed, normalized view of one source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuralModel {
    pub language: Language,
    pub functions: Vec<FunctionNode>,
    pub classes: Vec<ClassNode>,
    pub call_sites: Vec<CallSite>,
    pub imports: Vec<ImportEdge>,
}

impl StructuralModel {
    pub fn empty(language: Language) -> StructuralModel {
        StructuralModel {
            language,
            functions: Vec::new(),
            classes: Vec::new(),
            call_sites: Vec::new(),
            imports: Vec::new(),
        }
    }

    /// Find the function whose span encloses `span`, innermost first.
    pub fn enclosing_function(&self, span: &Span) -> Option<&FunctionNode> {
        self.functions
            .iter()
            .filter(|f| f.span.contains(span))
            .min_by_key(|f| f.span.len())
    }
}
