use crate::model::{ClassDef, ImportKind, ImportRef, Language, ParseResult};
use anyhow::Result;
use tree_sitter::{Node, Parser};

pub struct JavaExtractor {
    parser: Parser,
}

impl JavaExtractor {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let language = tree_sitter_java::LANGUAGE;
        parser.set_language(&language.into())?;
        Ok(Self { parser })
    }

    /// Java digest: imports plus classes. Interfaces are recorded as classes
    /// since the artifact model has no separate interface list.
    pub fn extract(&mut self, source: &str) -> ParseResult {
        let Some(tree) = self.parser.parse(source, None) else {
            return ParseResult::failed(Language::Java, "parse_error");
        };
        let mut result = ParseResult::empty(Language::Java);
        result.lines_of_code = source.split('\n').count() as i64;
        walk(tree.root_node(), source, &mut result);
        result
    }
}

fn walk(node: Node<'_>, source: &str, out: &mut ParseResult) {
    match node.kind() {
        "import_declaration" => {
            let name = node_text(node, source)
                .trim_start_matches("import")
                .trim()
                .trim_start_matches("static")
                .trim()
                .trim_end_matches(';')
                .trim()
                .to_string();
            if !name.is_empty() {
                out.imports.push(ImportRef {
                    name,
                    alias: None,
                    module: None,
                    kind: ImportKind::Plain,
                });
            }
        }
        "class_declaration" | "interface_declaration" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                out.classes.push(ClassDef {
                    name: node_text(name_node, source),
                    line: node.start_position().row as i64 + 1,
                    bases: base_names(node, source),
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

fn base_names(node: Node<'_>, source: &str) -> Vec<String> {
    let mut bases = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "superclass" | "super_interfaces" | "extends_interfaces" => {
                let text = node_text(child, source);
                let list = text
                    .trim_start_matches("extends")
                    .trim_start_matches("implements")
                    .trim();
                for base in list.split(',') {
                    let base = base.trim();
                    if !base.is_empty() {
                        bases.push(base.to_string());
                    }
                }
            }
            _ => {}
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
        if child.kind() == "method_declaration" {
            if let Some(name_node) = child.child_by_field_name("name") {
                methods.push(node_text(name_node, source));
            }
        }
    }
    methods
}

fn node_text(node: Node<'_>, source: &str) -> String {
    source
        .get(node.start_byte()..node.end_byte())
        .unwrap_or("")
        .trim()
        .to_string()
}
