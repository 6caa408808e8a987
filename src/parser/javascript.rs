use crate::model::{ClassDef, FuncDef, ImportKind, ImportRef, Language, ParseResult};
use anyhow::Result;
use tree_sitter::{Node, Parser};

/// Extractor for JavaScript and TypeScript sources. The two languages share
/// one walker; only the grammar differs.
pub struct JsExtractor {
    parser: Parser,
    language: Language,
}

impl JsExtractor {
    pub fn new_javascript() -> Result<Self> {
        let mut parser = Parser::new();
        let language = tree_sitter_javascript::LANGUAGE;
        parser.set_language(&language.into())?;
        Ok(Self {
            parser,
            language: Language::Javascript,
        })
    }

    pub fn new_typescript() -> Result<Self> {
        let mut parser = Parser::new();
        let language = tree_sitter_typescript::LANGUAGE_TYPESCRIPT;
        parser.set_language(&language.into())?;
        Ok(Self {
            parser,
            language: Language::Typescript,
        })
    }

    pub fn new_tsx() -> Result<Self> {
        let mut parser = Parser::new();
        let language = tree_sitter_typescript::LANGUAGE_TSX;
        parser.set_language(&language.into())?;
        Ok(Self {
            parser,
            language: Language::Typescript,
        })
    }

    /// Lenient extraction: partial trees still contribute whatever parsed.
    pub fn extract(&mut self, source: &str) -> ParseResult {
        let Some(tree) = self.parser.parse(source, None) else {
            return ParseResult::failed(self.language, "parse_error");
        };
        let mut result = ParseResult::empty(self.language);
        result.lines_of_code = source.split('\n').count() as i64;
        walk(tree.root_node(), source, &mut result);
        result
    }
}

fn walk(node: Node<'_>, source: &str, out: &mut ParseResult) {
    match node.kind() {
        "import_statement" => {
            collect_import(node, source, out);
            return;
        }
        "lexical_declaration" | "variable_declaration" => {
            collect_requires(node, source, out);
            // fall through: initializers may hold classes or functions
        }
        "function_declaration" | "generator_function_declaration" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let func = FuncDef {
                    name: node_text(name_node, source),
                    line: line_of(node),
                    decorators: Vec::new(),
                    args: parameter_names(node, source),
                };
                if is_async(node) {
                    out.async_functions.push(func);
                } else {
                    out.functions.push(func);
                }
            }
        }
        "class_declaration" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                out.classes.push(ClassDef {
                    name: node_text(name_node, source),
                    line: line_of(node),
                    bases: heritage_names(node, source),
                    methods: method_names(node, source),
                });
            }
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        walk(child, source, out);
    }
}

fn collect_import(node: Node<'_>, source: &str, out: &mut ParseResult) {
    let Some(source_node) = node.child_by_field_name("source") else {
        return;
    };
    let raw = unquote(&node_text(source_node, source));
    if raw.is_empty() {
        return;
    }

    let mut alias = None;
    let mut named = false;
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "import_clause" {
            let mut clause_cursor = child.walk();
            for part in child.named_children(&mut clause_cursor) {
                match part.kind() {
                    "identifier" => alias = Some(node_text(part, source)),
                    "named_imports" | "namespace_import" => named = true,
                    _ => {}
                }
            }
        }
    }

    out.imports.push(ImportRef {
        name: normalize_specifier(&raw),
        alias,
        module: Some(raw),
        kind: if named {
            ImportKind::From
        } else {
            ImportKind::Plain
        },
    });
}

/// `const x = require('mod')` style imports.
fn collect_requires(node: Node<'_>, source: &str, out: &mut ParseResult) {
    let mut cursor = node.walk();
    for declarator in node.named_children(&mut cursor) {
        if declarator.kind() != "variable_declarator" {
            continue;
        }
        let Some(value) = declarator.child_by_field_name("value") else {
            continue;
        };
        if value.kind() != "call_expression" {
            continue;
        }
        let callee = value
            .child_by_field_name("function")
            .map(|n| node_text(n, source))
            .unwrap_or_default();
        if callee != "require" {
            continue;
        }
        let Some(arguments) = value.child_by_field_name("arguments") else {
            continue;
        };
        let Some(argument) = arguments.named_child(0) else {
            continue;
        };
        let raw = unquote(&node_text(argument, source));
        if raw.is_empty() {
            continue;
        }
        out.imports.push(ImportRef {
            name: normalize_specifier(&raw),
            alias: declarator
                .child_by_field_name("name")
                .map(|n| node_text(n, source)),
            module: Some(raw),
            kind: ImportKind::Plain,
        });
    }
}

/// Strip relative prefixes and known extensions so the specifier lines up
/// with repository paths during import resolution.
fn normalize_specifier(raw: &str) -> String {
    let mut spec = raw.trim();
    while let Some(rest) = spec.strip_prefix("./") {
        spec = rest;
    }
    for ext in [".js", ".jsx", ".mjs", ".cjs", ".ts", ".tsx", ".mts", ".cts"] {
        if let Some(rest) = spec.strip_suffix(ext) {
            return rest.to_string();
        }
    }
    spec.to_string()
}

fn unquote(raw: &str) -> String {
    raw.trim_matches(|c| c == '"' || c == '\'' || c == '`').to_string()
}

fn is_async(node: Node<'_>) -> bool {
    node.child(0).is_some_and(|c| c.kind() == "async")
}

fn parameter_names(node: Node<'_>, source: &str) -> Vec<String> {
    let Some(parameters) = node.child_by_field_name("parameters") else {
        return Vec::new();
    };
    let mut names = Vec::new();
    let mut cursor = parameters.walk();
    for child in parameters.named_children(&mut cursor) {
        match child.kind() {
            "identifier" => names.push(node_text(child, source)),
            "required_parameter" | "optional_parameter" => {
                // TypeScript parameter wrappers
                if let Some(pattern) = child.child_by_field_name("pattern") {
                    if pattern.kind() == "identifier" {
                        names.push(node_text(pattern, source));
                    }
                }
            }
            _ => {}
        }
    }
    names
}

fn heritage_names(node: Node<'_>, source: &str) -> Vec<String> {
    let mut bases = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() != "class_heritage" {
            continue;
        }
        // TypeScript nests an extends_clause; JavaScript puts the expression
        // directly under class_heritage.
        let mut heritage_cursor = child.walk();
        for part in child.named_children(&mut heritage_cursor) {
            if matches!(part.kind(), "extends_clause" | "implements_clause") {
                let mut clause_cursor = part.walk();
                for base in part.named_children(&mut clause_cursor) {
                    let text = node_text(base, source);
                    if !text.is_empty() {
                        bases.push(text);
                    }
                }
            } else {
                let text = node_text(part, source);
                if !text.is_empty() {
                    bases.push(text);
                }
            }
        }
    }
    bases
}

fn method_names(node: Node<'_>, source: &str) -> Vec<String> {
    let Some(body) = node.child_by_field_name("body") else {
        return Vec::new();
    };
    let mut methods = Vec::new();
    let mut cursor = body.walk();
    for child in body.named_children(&mut cursor) {
        if child.kind() == "method_definition" {
            if let Some(name_node) = child.child_by_field_name("name") {
                methods.push(node_text(name_node, source));
            }
        }
    }
    methods
}

fn line_of(node: Node<'_>) -> i64 {
    node.start_position().row as i64 + 1
}

fn node_text(node: Node<'_>, source: &str) -> String {
    source
        .get(node.start_byte()..node.end_byte())
        .unwrap_or("")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ImportKind;

    #[test]
    fn extracts_es_imports() {
        let source = r#"
import React from 'react';
import { render } from './utils/dom.js';
"#;
        let result = JsExtractor::new_javascript().unwrap().extract(source);
        assert_eq!(result.imports.len(), 2);
        assert_eq!(result.imports[0].name, "react");
        assert_eq!(result.imports[0].alias.as_deref(), Some("React"));
        assert_eq!(result.imports[0].kind, ImportKind::Plain);
        assert_eq!(result.imports[1].name, "utils/dom");
        assert_eq!(result.imports[1].kind, ImportKind::From);
        assert_eq!(result.imports[1].module.as_deref(), Some("./utils/dom.js"));
    }

    #[test]
    fn extracts_require_imports() {
        let source = "const fs = require('fs');\n";
        let result = JsExtractor::new_javascript().unwrap().extract(source);
        assert_eq!(result.imports.len(), 1);
        assert_eq!(result.imports[0].name, "fs");
        assert_eq!(result.imports[0].alias.as_deref(), Some("fs"));
    }

    #[test]
    fn extracts_functions_and_classes() {
        let source = r#"
function greet(name) { return name; }
async function load() {}
class Button extends Component {
  render() {}
}
"#;
        let result = JsExtractor::new_javascript().unwrap().extract(source);
        assert_eq!(result.functions.len(), 1);
        assert_eq!(result.functions[0].name, "greet");
        assert_eq!(result.functions[0].args, vec!["name"]);
        assert_eq!(result.async_functions.len(), 1);
        assert_eq!(result.async_functions[0].name, "load");
        assert_eq!(result.classes.len(), 1);
        assert_eq!(result.classes[0].name, "Button");
        assert_eq!(result.classes[0].bases, vec!["Component"]);
        assert_eq!(result.classes[0].methods, vec!["render"]);
    }

    #[test]
    fn typescript_parameters_unwrap() {
        let source = "function add(a: number, b: number): number { return a + b; }\n";
        let result = JsExtractor::new_typescript().unwrap().extract(source);
        assert_eq!(result.functions[0].args, vec!["a", "b"]);
        assert_eq!(result.language, Language::Typescript);
    }
}
