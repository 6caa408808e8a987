use crate::model::{ClassDef, FuncDef, ImportKind, ImportRef, Language, ParseResult};
use anyhow::Result;
use tree_sitter::{Node, Parser};

pub struct PythonExtractor {
    parser: Parser,
}

impl PythonExtractor {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let language = tree_sitter_python::LANGUAGE;
        parser.set_language(&language.into())?;
        Ok(Self { parser })
    }

    /// Extract the artifact digest from Python source.
    ///
    /// The whole tree is walked, so methods and nested functions land in the
    /// function lists alongside top-level definitions. A tree containing
    /// syntax errors marks the file as failed; the graph builder will skip it.
    pub fn extract(&mut self, source: &str) -> ParseResult {
        let Some(tree) = self.parser.parse(source, None) else {
            return ParseResult::failed(Language::Python, "parse_error");
        };
        let root = tree.root_node();
        if root.has_error() {
            return ParseResult::failed(Language::Python, "syntax_error");
        }
        let mut result = ParseResult::empty(Language::Python);
        result.lines_of_code = source.split('\n').count() as i64;
        walk(root, source, &mut result, &[]);
        result
    }
}

fn walk(node: Node<'_>, source: &str, out: &mut ParseResult, decorators: &[String]) {
    match node.kind() {
        "import_statement" => {
            collect_plain_imports(node, source, out);
            return;
        }
        "import_from_statement" => {
            collect_from_imports(node, source, out);
            return;
        }
        "decorated_definition" => {
            let mut names = Vec::new();
            let mut definition = None;
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                if child.kind() == "decorator" {
                    names.push(
                        node_text(child, source)
                            .trim_start_matches('@')
                            .to_string(),
                    );
                } else if matches!(child.kind(), "function_definition" | "class_definition") {
                    definition = Some(child);
                }
            }
            if let Some(definition) = definition {
                walk(definition, source, out, &names);
            }
            return;
        }
        "function_definition" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let func = FuncDef {
                    name: node_text(name_node, source),
                    line: line_of(node),
                    decorators: decorators.to_vec(),
                    args: parameter_names(node, source),
                };
                if is_async(node) {
                    out.async_functions.push(func);
                } else {
                    out.functions.push(func);
                }
            }
            if let Some(body) = node.child_by_field_name("body") {
                walk_children(body, source, out);
            }
            return;
        }
        "class_definition" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                out.classes.push(ClassDef {
                    name: node_text(name_node, source),
                    line: line_of(node),
                    bases: base_names(node, source),
                    methods: method_names(node, source),
                });
            }
            if let Some(body) = node.child_by_field_name("body") {
                walk_children(body, source, out);
            }
            return;
        }
        _ => {}
    }
    walk_children(node, source, out);
}

fn walk_children(node: Node<'_>, source: &str, out: &mut ParseResult) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        walk(child, source, out, &[]);
    }
}

fn collect_plain_imports(node: Node<'_>, source: &str, out: &mut ParseResult) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "dotted_name" => out.imports.push(ImportRef {
                name: node_text(child, source),
                alias: None,
                module: None,
                kind: ImportKind::Plain,
            }),
            "aliased_import" => {
                let name = child
                    .child_by_field_name("name")
                    .map(|n| node_text(n, source))
                    .unwrap_or_default();
                let alias = child
                    .child_by_field_name("alias")
                    .map(|n| node_text(n, source));
                if !name.is_empty() {
                    out.imports.push(ImportRef {
                        name,
                        alias,
                        module: None,
                        kind: ImportKind::Plain,
                    });
                }
            }
            _ => {}
        }
    }
}

fn collect_from_imports(node: Node<'_>, source: &str, out: &mut ParseResult) {
    let module = node
        .child_by_field_name("module_name")
        .map(|n| node_text(n, source))
        .unwrap_or_default();

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if node
            .child_by_field_name("module_name")
            .is_some_and(|m| m.id() == child.id())
        {
            continue;
        }
        let (item, alias) = match child.kind() {
            "dotted_name" => (node_text(child, source), None),
            "wildcard_import" => ("*".to_string(), None),
            "aliased_import" => {
                let name = child
                    .child_by_field_name("name")
                    .map(|n| node_text(n, source))
                    .unwrap_or_default();
                let alias = child
                    .child_by_field_name("alias")
                    .map(|n| node_text(n, source));
                (name, alias)
            }
            _ => continue,
        };
        if item.is_empty() {
            continue;
        }
        out.imports.push(ImportRef {
            name: qualify(&module, &item),
            alias,
            module: Some(module.clone()),
            kind: ImportKind::From,
        });
    }
}

fn qualify(module: &str, item: &str) -> String {
    if module.is_empty() {
        item.to_string()
    } else if module == "." || module.ends_with('.') {
        format!("{module}{item}")
    } else {
        format!("{module}.{item}")
    }
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
            "typed_parameter" => {
                if let Some(inner) = child.named_child(0) {
                    if inner.kind() == "identifier" {
                        names.push(node_text(inner, source));
                    }
                }
            }
            "default_parameter" | "typed_default_parameter" => {
                if let Some(name_node) = child.child_by_field_name("name") {
                    names.push(node_text(name_node, source));
                }
            }
            _ => {}
        }
    }
    names
}

fn base_names(node: Node<'_>, source: &str) -> Vec<String> {
    let Some(superclasses) = node.child_by_field_name("superclasses") else {
        return Vec::new();
    };
    let mut bases = Vec::new();
    let mut cursor = superclasses.walk();
    for child in superclasses.named_children(&mut cursor) {
        let base = node_text(child, source);
        if !base.is_empty() {
            bases.push(base);
        }
    }
    bases
}

/// Direct non-async methods of a class body, decorated or not.
fn method_names(node: Node<'_>, source: &str) -> Vec<String> {
    let Some(body) = node.child_by_field_name("body") else {
        return Vec::new();
    };
    let mut methods = Vec::new();
    let mut cursor = body.walk();
    for child in body.named_children(&mut cursor) {
        let definition = if child.kind() == "decorated_definition" {
            let mut inner_cursor = child.walk();
            child
                .named_children(&mut inner_cursor)
                .find(|c| c.kind() == "function_definition")
        } else if child.kind() == "function_definition" {
            Some(child)
        } else {
            None
        };
        if let Some(definition) = definition {
            if !is_async(definition) {
                if let Some(name_node) = definition.child_by_field_name("name") {
                    methods.push(node_text(name_node, source));
                }
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

    fn extract(source: &str) -> ParseResult {
        PythonExtractor::new().unwrap().extract(source)
    }

    #[test]
    fn extracts_imports_functions_and_classes() {
        let source = r#"
import os
import json as j
from pathlib import Path

def top(a, b):
    pass

class Greeter(Base):
    def greet(self):
        pass

async def fetch():
    pass
"#;
        let result = extract(source);
        assert_eq!(result.error, None);

        let names: Vec<&str> = result.imports.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["os", "json", "pathlib.Path"]);
        assert_eq!(result.imports[1].alias.as_deref(), Some("j"));
        assert_eq!(result.imports[2].kind, ImportKind::From);
        assert_eq!(result.imports[2].module.as_deref(), Some("pathlib"));

        let funcs: Vec<&str> = result.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(funcs, vec!["top", "greet"]);
        assert_eq!(result.functions[0].args, vec!["a", "b"]);

        assert_eq!(result.classes.len(), 1);
        assert_eq!(result.classes[0].name, "Greeter");
        assert_eq!(result.classes[0].bases, vec!["Base"]);
        assert_eq!(result.classes[0].methods, vec!["greet"]);

        assert_eq!(result.async_functions.len(), 1);
        assert_eq!(result.async_functions[0].name, "fetch");
    }

    #[test]
    fn decorators_attach_to_functions() {
        let source = r#"
@app.get("/health")
def health():
    pass
"#;
        let result = extract(source);
        assert_eq!(result.functions[0].decorators, vec!["app.get(\"/health\")"]);
    }

    #[test]
    fn relative_from_import() {
        let result = extract("from . import util\n");
        assert_eq!(result.imports[0].name, ".util");
        assert_eq!(result.imports[0].kind, ImportKind::From);
    }

    #[test]
    fn wildcard_import_kept_with_star() {
        let result = extract("from helpers import *\n");
        assert_eq!(result.imports[0].name, "helpers.*");
    }

    #[test]
    fn syntax_error_marks_file_failed() {
        let result = extract("def broken(:\n");
        assert_eq!(result.error.as_deref(), Some("syntax_error"));
        assert!(result.functions.is_empty());
    }

    #[test]
    fn nested_functions_are_collected() {
        let source = r#"
def outer():
    def inner():
        pass
"#;
        let result = extract(source);
        let names: Vec<&str> = result.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["outer", "inner"]);
    }

    #[test]
    fn counts_lines_like_newline_split() {
        let result = extract("import os\n");
        assert_eq!(result.lines_of_code, 2);
    }
}
