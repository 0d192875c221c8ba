//! Source file loading and normalization.
//!
//! A [`SourceFile`] is created once, normalized (line endings, BOM) at load
//! time, and consumed read-only by every later stage.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::language::{detect_language, Language};

/// Line-ending convention observed in the raw input, recorded before
/// normalization to LF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEndings {
    Lf,
    CrLf,
    Mixed,
}

/// One loaded source file. Content is normalized to LF with no BOM; the
/// original encoding facts are kept as metadata.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub language: Option<Language>,
    pub content: String,
    pub line_endings: LineEndings,
    pub had_bom: bool,
}

impl SourceFile {
    /// Read a file from disk. The language is taken from the hint when one
    /// is given, otherwise from the file extension.
    pub fn load(path: &Path, hint: Option<Language>) -> io::Result<SourceFile> {
        let bytes = std::fs::read(path)?;
        let raw = String::from_utf8_lossy(&bytes);
        Ok(Self::from_content(path, hint, &raw))
    }

    /// Build a source file from in-memory content, normalizing CRLF to LF
    /// and stripping a UTF-8 BOM.
    pub fn from_content(path: &Path, hint: Option<Language>, raw: &str) -> SourceFile {
        let had_bom = raw.starts_with('\u{feff}');
        let without_bom = raw.trim_start_matches('\u{feff}');

        let crlf = without_bom.matches("\r\n").count();
        let lf_total = without_bom.matches('\n').count();
        let line_endings = if crlf == 0 {
            LineEndings::Lf
        } else if crlf == lf_total {
            LineEndings::CrLf
        } else {
            LineEndings::Mixed
        };

        let content = without_bom.replace("\r\n", "\n").replace('\r', "\n");
        let language = hint.or_else(|| detect_language(path));

        SourceFile {
            path: path.to_path_buf(),
            language,
            content,
            line_endings,
            had_bom,
        }
    }

    pub fn line_count(&self) -> usize {
        self.content.lines().count()
    }

    /// 1-based line number of a byte offset into `content`. Used to map
    /// raw-text regex matches to report locations.
    pub fn line_of_offset(&self, offset: usize) -> usize {
        let upto = &self.content.as_bytes()[..offset.min(self.content.len())];
        upto.iter().filter(|&&b| b == b'\n').count() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn normalizes_crlf_and_bom() {
        let raw = "\u{feff}line one\r\nline two\r\n";
        let sf = SourceFile::from_content(&PathBuf::from("a.py"), None, raw);
        assert!(sf.had_bom);
        assert_eq!(sf.line_endings, LineEndings::CrLf);
        assert_eq!(sf.content, "line one\nline two\n");
        assert_eq!(sf.language, Some(Language::Python));
    }

    #[test]
    fn mixed_endings_detected() {
        let raw = "a\r\nb\nc\n";
        let sf = SourceFile::from_content(&PathBuf::from("a.txt"), None, raw);
        assert_eq!(sf.line_endings, LineEndings::Mixed);
        assert_eq!(sf.language, None);
    }

    #[test]
    fn hint_wins_over_extension() {
        let sf = SourceFile::from_content(&PathBuf::from("script.txt"), Some(Language::Python), "x = 1\n");
        assert_eq!(sf.language, Some(Language::Python));
    }

    #[test]
    fn line_of_offset_is_one_based() {
        let sf = SourceFile::from_content(&PathBuf::from("a.txt"), None, "ab\ncd\nef\n");
        assert_eq!(sf.line_of_offset(0), 1);
        assert_eq!(sf.line_of_offset(3), 2);
        assert_eq!(sf.line_of_offset(7), 3);
    }
}
