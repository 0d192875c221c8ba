use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Source languages with a structural adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    Go,
}

impl Language {
    /// Parse an explicit language hint (as passed on the engine input),
    /// accepting the common aliases.
    pub fn from_hint(hint: &str) -> Option<Language> {
        match hint.to_lowercase().as_str() {
            "rust" | "rs" => Some(Language::Rust),
            "python" | "py" => Some(Language::Python),
            "javascript" | "js" | "typescript" | "ts" | "jsx" | "tsx" => {
                Some(Language::JavaScript)
            }
            "go" | "golang" => Some(Language::Go),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Language::Rust => "rust",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::Go => "go",
        })
    }
}

/// Detect the language of a file from its extension.
pub fn detect_language(path: &Path) -> Option<Language> {
    match path.extension()?.to_str()? {
        "rs" => Some(Language::Rust),
        "py" => Some(Language::Python),
        "js" | "ts" | "jsx" | "tsx" | "mjs" => Some(Language::JavaScript),
        "go" => Some(Language::Go),
        _ => None,
    }
}

/// Get the tree-sitter grammar for a given language.
pub fn grammar(lang: Language) -> tree_sitter::Language {
    match lang {
        Language::Rust => tree_sitter_rust::LANGUAGE.into(),
        Language::Python => tree_sitter_python::LANGUAGE.into(),
        Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        Language::Go => tree_sitter_go::LANGUAGE.into(),
    }
}
