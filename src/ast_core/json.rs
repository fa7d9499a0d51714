//! JSON tree interchange.
//!
//! Формат узла: `{ kind, span?: [start, len], name?, type?, modifiers?: [..],
//! text?, interface?, children?: [...] }`. Узлы без `span` получают синтетический
//! span от построителя.
//!
//! Входное дерево проверяется при загрузке: инструкции не стоят среди
//! объявлений, объявления членов не стоят внутри тел, явные span'ы не
//! переполняются и вложены в span'ы предков.

use super::{AstPayload, DeclInfo, Modifiers, NodeId, SyntaxKind, SyntaxTree, TreeBuilder};
use crate::matching::label::{fits_body, fits_declarations, top_label};
use crate::core::errors::{AnalysisError, Result};
use crate::core::fs_utils::read_text_file;
use crate::core::position::PackedSpan;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonNode {
    pub kind: SyntaxKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<[u32; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, rename = "interface", skip_serializing_if = "Option::is_none")]
    pub explicit_interface: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<JsonNode>,
}

impl JsonNode {
    fn is_declaration(&self) -> bool {
        self.name.is_some() || self.type_ref.is_some() || !self.modifiers.is_empty() || self.explicit_interface.is_some()
    }
}

pub fn tree_from_node(root: &JsonNode) -> Result<SyntaxTree> {
    let mut b = TreeBuilder::new();
    let region = if fits_declarations(root.kind) { Region::Declarations } else { Region::Body };
    push_node(&mut b, root, region, None)?;
    b.build()
}

pub fn tree_from_str(text: &str) -> Result<SyntaxTree> {
    let root: JsonNode = serde_json::from_str(text)?;
    tree_from_node(&root)
}

pub fn load_tree(path: &Path) -> Result<SyntaxTree> {
    tree_from_str(&read_text_file(path)?)
}

/// Где стоит узел: среди объявлений или внутри тела члена.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    Declarations,
    Body,
}

fn push_node(b: &mut TreeBuilder, node: &JsonNode, region: Region, parent_span: Option<PackedSpan>) -> Result<()> {
    let placed = match region {
        Region::Declarations => fits_declarations(node.kind),
        Region::Body => fits_body(node.kind),
    };
    if !placed {
        let place = if region == Region::Body { "inside a body" } else { "among declarations" };
        return Err(AnalysisError::InvalidTree(format!("{:?} cannot appear {place}", node.kind)));
    }
    // тела, инициализаторы и выражения открывают область инструкций
    let child_region = match region {
        Region::Declarations if top_label(node.kind).is_some() => Region::Declarations,
        _ => Region::Body,
    };

    let payload = if node.is_declaration() {
        let info = DeclInfo {
            name: node.name.clone(),
            type_ref: node.type_ref.clone(),
            modifiers: Modifiers::from_keywords(&node.modifiers)?,
            explicit_interface: node.explicit_interface.clone(),
        };
        b.decl_payload(info)
    } else if let Some(text) = &node.text {
        let sym = b.intern(text);
        match node.kind {
            SyntaxKind::IdentifierName => AstPayload::Ident { sym },
            SyntaxKind::LiteralExpression => AstPayload::Literal { sym },
            _ => AstPayload::Token { sym },
        }
    } else {
        AstPayload::None
    };
    let span = node.span.map(|[start, len]| checked_span(node.kind, start, len, parent_span)).transpose()?;
    b.start_with_payload(node.kind, span, payload);
    for child in &node.children {
        if child.kind == SyntaxKind::CompilationUnit {
            return Err(AnalysisError::InvalidTree(format!("CompilationUnit nested in {:?}", node.kind)));
        }
        push_node(b, child, child_region, span.or(parent_span))?;
    }
    b.finish_node();
    Ok(())
}

/// Явный span не переполняется и лежит внутри ближайшего явного span'а предка.
fn checked_span(kind: SyntaxKind, start: u32, len: u32, parent: Option<PackedSpan>) -> Result<PackedSpan> {
    if start.checked_add(len).is_none() {
        return Err(AnalysisError::InvalidTree(format!("span [{start}, {len}] of {kind:?} overflows")));
    }
    let span = PackedSpan::new(start, len);
    match parent {
        Some(parent) if !parent.contains_span(span) => {
            Err(AnalysisError::InvalidTree(format!("span {span} of {kind:?} lies outside its parent {parent}")))
        }
        _ => Ok(span),
    }
}

/// Обратное преобразование (span'ы всегда явные).
pub fn tree_to_json(tree: &SyntaxTree, id: NodeId) -> JsonNode {
    let decl = tree.decl(id);
    let span = tree.span(id);
    JsonNode {
        kind: tree.kind(id),
        span: Some([span.start, span.len]),
        name: tree.name(id).map(str::to_string),
        type_ref: tree.type_text(id).map(str::to_string),
        modifiers: decl.map(|d| d.modifiers.keywords().into_iter().map(str::to_string).collect()).unwrap_or_default(),
        text: tree.text(id).map(str::to_string),
        explicit_interface: tree.explicit_interface(id).map(str::to_string),
        children: tree.children(id).map(|c| tree_to_json(tree, c)).collect(),
    }
}

/// Описание активной инструкции во входном файле.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveStatementSpec {
    pub offset: u32,
    /// Числовой дискриминатор части инструкции (0 = вся инструкция).
    #[serde(default)]
    pub part: u8,
    #[serde(default = "default_leaf")]
    pub leaf: bool,
    #[serde(default)]
    pub partially_executed: bool,
}

fn default_leaf() -> bool { true }

pub fn active_statements_from_str(text: &str) -> Result<Vec<ActiveStatementSpec>> {
    Ok(serde_json::from_str(text)?)
}

pub fn load_active_statements(path: &Path) -> Result<Vec<ActiveStatementSpec>> {
    active_statements_from_str(&read_text_file(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const METHOD: &str = r#"{
        "kind": "CompilationUnit",
        "children": [
            { "kind": "MethodDeclaration", "name": "M", "type": "int", "modifiers": ["public", "static"],
              "children": [
                { "kind": "ParameterList" },
                { "kind": "Block", "children": [
                    { "kind": "ReturnStatement", "children": [ { "kind": "LiteralExpression", "text": "1" } ] }
                ] }
              ] }
        ]
    }"#;

    #[test]
    fn parses_declarations_and_text() {
        let tree = tree_from_str(METHOD).unwrap();
        let method = tree.children(tree.root()).next().unwrap();
        assert_eq!(tree.kind(method), SyntaxKind::MethodDeclaration);
        assert_eq!(tree.name(method), Some("M"));
        assert_eq!(tree.modifiers(method), Modifiers::PUBLIC | Modifiers::STATIC);
        let lit = tree.preorder(tree.root()).find(|id| tree.kind(*id) == SyntaxKind::LiteralExpression).unwrap();
        assert_eq!(tree.text(lit), Some("1"));
    }

    #[test]
    fn exported_tree_reloads_identically() {
        let tree = tree_from_str(METHOD).unwrap();
        let exported = tree_to_json(&tree, tree.root());
        let again = tree_from_node(&exported).unwrap();
        assert_eq!(tree.fingerprint(tree.root()), again.fingerprint(again.root()));
        assert_eq!(tree_to_json(&again, again.root()), exported);
    }

    #[test]
    fn unknown_modifier_fails() {
        let err = tree_from_str(r#"{ "kind": "FieldDeclaration", "modifiers": ["volatile"] }"#).unwrap_err();
        assert!(err.to_string().contains("volatile"));
    }

    #[test]
    fn misplaced_statement_is_rejected() {
        let text = r#"{ "kind": "CompilationUnit", "children": [
            { "kind": "ClassDeclaration", "name": "C", "children": [ { "kind": "ReturnStatement" } ] }
        ] }"#;
        let err = tree_from_str(text).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidTree(_)), "{err}");
        assert!(err.to_string().contains("ReturnStatement"));

        let text = r#"{ "kind": "Block", "children": [ { "kind": "MethodDeclaration", "name": "M" } ] }"#;
        assert!(matches!(tree_from_str(text).unwrap_err(), AnalysisError::InvalidTree(_)));

        let text = r#"{ "kind": "ClassDeclaration", "name": "C", "children": [ { "kind": "CompilationUnit" } ] }"#;
        assert!(matches!(tree_from_str(text).unwrap_err(), AnalysisError::InvalidTree(_)));

        // фрагмент тела загружается как есть
        assert!(tree_from_str(r#"{ "kind": "ReturnStatement", "children": [ { "kind": "LiteralExpression", "text": "1" } ] }"#).is_ok());
    }

    #[test]
    fn bad_spans_are_rejected() {
        let err = tree_from_str(r#"{ "kind": "Block", "span": [4294967295, 5] }"#).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidTree(_)), "{err}");

        let text = r#"{ "kind": "Block", "span": [0, 10], "children": [ { "kind": "EmptyStatement", "span": [8, 5] } ] }"#;
        let err = tree_from_str(text).unwrap_err();
        assert!(err.to_string().contains("outside"), "{err}");

        // дети без span'а не мешают проверять внуков по ближайшему явному предку
        let text = r#"{ "kind": "Block", "span": [0, 10], "children": [
            { "kind": "ExpressionStatement", "children": [ { "kind": "IdentifierName", "text": "x", "span": [20, 1] } ] }
        ] }"#;
        assert!(tree_from_str(text).is_err());
    }

    #[test]
    fn active_statement_defaults() {
        let specs = active_statements_from_str(r#"[{ "offset": 12 }, { "offset": 3, "part": 2, "leaf": false }]"#).unwrap();
        assert_eq!(specs[0], ActiveStatementSpec { offset: 12, part: 0, leaf: true, partially_executed: false });
        assert!(!specs[1].leaf);
        assert_eq!(specs[1].part, 2);
    }
}
