//! Source parser collaborator: walks a repository and produces the
//! language-agnostic artifact model consumed by the graph builder.
//!
//! Each supported language has a tree-sitter extractor. A file that fails to
//! parse is kept in the result set with an `error` tag so downstream stages
//! can account for it without aborting.

pub mod java;
pub mod javascript;
pub mod python;

use crate::model::{Language, ParseResult, ParseResults};
use crate::util;
use anyhow::Result;
use ignore::WalkBuilder;
use std::path::Path;

/// Directories that never contain first-party sources.
const SKIPPED_DIRS: &[&str] = &[".git", "__pycache__", "node_modules", ".venv", "venv"];

pub struct ArtifactParser {
    python: python::PythonExtractor,
    javascript: javascript::JsExtractor,
    typescript: javascript::JsExtractor,
    tsx: javascript::JsExtractor,
    java: java::JavaExtractor,
}

impl ArtifactParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            python: python::PythonExtractor::new()?,
            javascript: javascript::JsExtractor::new_javascript()?,
            typescript: javascript::JsExtractor::new_typescript()?,
            tsx: javascript::JsExtractor::new_tsx()?,
            java: java::JavaExtractor::new()?,
        })
    }

    pub fn language_for_path(path: &str) -> Option<Language> {
        let ext = Path::new(path).extension()?.to_str()?;
        match ext {
            "py" | "pyi" => Some(Language::Python),
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::Javascript),
            "ts" | "tsx" | "mts" | "cts" => Some(Language::Typescript),
            "java" => Some(Language::Java),
            _ => None,
        }
    }

    /// Parse one file's source, dispatching on its extension. Returns `None`
    /// for unsupported extensions.
    pub fn parse_source(&mut self, rel_path: &str, source: &str) -> Option<ParseResult> {
        let language = Self::language_for_path(rel_path)?;
        let result = match language {
            Language::Python => self.python.extract(source),
            Language::Javascript => self.javascript.extract(source),
            Language::Typescript => {
                if rel_path.ends_with(".tsx") {
                    self.tsx.extract(source)
                } else {
                    self.typescript.extract(source)
                }
            }
            Language::Java => self.java.extract(source),
            Language::Unknown => return None,
        };
        Some(result)
    }

    /// Walk a directory tree and parse every supported file.
    ///
    /// Respects gitignore semantics and skips vendored directories. Paths in
    /// the result are repo-relative with forward slashes.
    pub fn parse_directory(&mut self, root: &Path) -> Result<ParseResults> {
        let mut results = ParseResults::new();
        let walker = WalkBuilder::new(root)
            .filter_entry(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_none_or(|name| !SKIPPED_DIRS.contains(&name))
            })
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(%err, "walk error");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let rel_path = util::normalize_rel_path(root, entry.path())?;
            let Some(language) = Self::language_for_path(&rel_path) else {
                continue;
            };

            let result = match util::read_to_string(entry.path()) {
                Ok(source) => self
                    .parse_source(&rel_path, &source)
                    .unwrap_or_else(|| ParseResult::failed(language, "parse_error")),
                Err(err) => {
                    tracing::warn!(path = %rel_path, %err, "failed to read file");
                    ParseResult::failed(language, "read_error")
                }
            };
            if let Some(error) = &result.error {
                tracing::warn!(path = %rel_path, %error, "parse skipped");
            }
            results.insert(rel_path, result);
        }

        tracing::info!(
            files = results.len(),
            root = %root.display(),
            "parsed directory"
        );
        Ok(results)
    }
}
