use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Language tag attached to each parsed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Javascript,
    Typescript,
    Java,
    Unknown,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Javascript => "javascript",
            Language::Typescript => "typescript",
            Language::Java => "java",
            Language::Unknown => "unknown",
        }
    }
}

/// How an import was written in the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    Plain,
    From,
}

/// One import statement target as extracted from a source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    pub kind: ImportKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuncDef {
    pub name: String,
    pub line: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decorators: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,
    pub line: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bases: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,
}

/// Language-agnostic digest of one source file.
///
/// A file whose parse failed carries an `error` tag and contributes nothing
/// to the dependency graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseResult {
    pub language: Language,
    #[serde(default)]
    pub imports: Vec<ImportRef>,
    #[serde(default)]
    pub functions: Vec<FuncDef>,
    #[serde(default)]
    pub classes: Vec<ClassDef>,
    #[serde(default)]
    pub async_functions: Vec<FuncDef>,
    #[serde(default)]
    pub lines_of_code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ParseResult {
    pub fn empty(language: Language) -> Self {
        Self {
            language,
            imports: Vec::new(),
            functions: Vec::new(),
            classes: Vec::new(),
            async_functions: Vec::new(),
            lines_of_code: 0,
            error: None,
        }
    }

    pub fn failed(language: Language, error: &str) -> Self {
        let mut result = Self::empty(language);
        result.error = Some(error.to_string());
        result
    }
}

/// Parse results keyed by repo-relative path with forward slashes.
///
/// A `BTreeMap` keeps iteration in lexicographic path order, which the graph
/// builder relies on for deterministic node and edge sets.
pub type ParseResults = BTreeMap<String, ParseResult>;

// Impact analysis types (re-exported from impact module)
pub use crate::impact::types::{ImpactAnalysis, ImpactSet, RiskLevel, TestPlan};

/// Validation error for a single request field.
#[derive(Debug, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub code: String,
    pub message: String,
}

/// Collection of validation errors for one request.
#[derive(Debug, Serialize)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn add(&mut self, field: &str, code: &str, message: &str) {
        self.errors.push(ValidationError {
            field: field.to_string(),
            code: code.to_string(),
            message: message.to_string(),
        });
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}
