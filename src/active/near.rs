//! Statements near a deleted active statement.
//!
//! Сначала следующие соседи, затем предыдущие, затем родитель, и так наружу.
//! Блок-родитель отдаёт закрывающую скобку при движении вперёд и открывающую
//! при движении назад; блок-сосед наоборот. Для поля или свойства, у которого
//! не нашлось соседей той же static-ности, перед подъёмом выдаётся оно само.

use super::StatementPart;
use crate::ast_core::body::is_field_declarator;
use crate::ast_core::{Modifiers, NodeId, SyntaxKind, SyntaxTree};
use std::collections::VecDeque;

pub struct NearStatements<'t> {
    tree: &'t SyntaxTree,
    statement: NodeId,
    cursor: NodeId,
    forward: bool,
    /// static-ность исходного поля или свойства; соседи с другой пропускаются
    static_member: Option<bool>,
    pending: VecDeque<(NodeId, StatementPart)>,
    done: bool,
}

impl<'t> NearStatements<'t> {
    pub fn new(tree: &'t SyntaxTree, statement: NodeId) -> Self {
        Self {
            tree,
            statement,
            cursor: statement,
            forward: true,
            static_member: field_or_property_static(tree, statement),
            pending: VecDeque::new(),
            done: false,
        }
    }

    fn step(&mut self) {
        let tree = self.tree;
        let sibling = if self.forward { tree.next_sibling(self.cursor) } else { tree.prev_sibling(self.cursor) };
        let Some(node) = sibling else {
            let Some(parent) = tree.parent(self.statement) else {
                self.done = true;
                return;
            };
            match tree.kind(parent) {
                SyntaxKind::Block => {
                    let brace = if self.forward { StatementPart::CloseBrace } else { StatementPart::OpenBrace };
                    self.pending.push_back((parent, brace));
                }
                SyntaxKind::ForEachStatement => self.pending.push_back((parent, StatementPart::ForEach)),
                _ => {}
            }
            if self.forward {
                self.cursor = self.statement;
                self.forward = false;
                return;
            }
            // среди полей той же static-ности ничего не нашлось: остаётся само поле
            if self.static_member.is_some() {
                self.pending.push_back((self.statement, StatementPart::None));
            }
            self.statement = parent;
            self.cursor = parent;
            self.forward = true;
            self.static_member = field_or_property_static(tree, parent);
            self.pending.push_back((parent, StatementPart::None));
            return;
        };

        self.cursor = node;
        if let Some(is_static) = self.static_member {
            if field_or_property_static(tree, node) != Some(is_static) {
                return;
            }
        }
        match tree.kind(node) {
            SyntaxKind::Block => {
                let brace = if self.forward { StatementPart::OpenBrace } else { StatementPart::CloseBrace };
                self.pending.push_back((node, brace));
            }
            SyntaxKind::ForEachStatement => self.pending.push_back((node, StatementPart::ForEach)),
            _ => {}
        }
        self.pending.push_back((node, StatementPart::None));
    }
}

impl Iterator for NearStatements<'_> {
    type Item = (NodeId, StatementPart);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(item);
            }
            if self.done {
                return None;
            }
            self.step();
        }
    }
}

fn field_or_property_static(tree: &SyntaxTree, node: NodeId) -> Option<bool> {
    let holder = match tree.kind(node) {
        SyntaxKind::FieldDeclaration | SyntaxKind::EventFieldDeclaration | SyntaxKind::PropertyDeclaration => node,
        SyntaxKind::VariableDeclarator if is_field_declarator(tree, node) => tree.parent(node).and_then(|d| tree.parent(d))?,
        _ => return None,
    };
    Some(tree.modifiers(holder).contains(Modifiers::STATIC))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast_core::{DeclInfo, TreeBuilder};
    use pretty_assertions::assert_eq;

    /// `{ a; { b; } c; foreach (x) { d; } }`
    fn body() -> SyntaxTree {
        let stmt = |b: &mut TreeBuilder, name: &str| {
            b.start_node(SyntaxKind::ExpressionStatement);
            b.ident(name);
            b.finish_node();
        };
        let mut b = TreeBuilder::new();
        b.start_node(SyntaxKind::Block);
        stmt(&mut b, "a");
        b.start_node(SyntaxKind::Block);
        stmt(&mut b, "b");
        b.finish_node();
        stmt(&mut b, "c");
        b.start_decl(SyntaxKind::ForEachStatement, DeclInfo::named("x").with_type("var"));
        b.ident("xs");
        b.start_node(SyntaxKind::Block);
        stmt(&mut b, "d");
        b.finish_node();
        b.finish_node();
        b.finish_node();
        b.build().unwrap()
    }

    fn statement(tree: &SyntaxTree, name: &str) -> NodeId {
        tree.preorder(tree.root())
            .find(|id| tree.kind(*id) == SyntaxKind::ExpressionStatement && tree.children(*id).any(|c| tree.text(c) == Some(name)))
            .unwrap()
    }

    fn describe(tree: &SyntaxTree, items: impl Iterator<Item = (NodeId, StatementPart)>) -> Vec<String> {
        items
            .map(|(id, part)| {
                let what = match tree.kind(id) {
                    SyntaxKind::ExpressionStatement => tree.children(id).next().and_then(|c| tree.text(c)).unwrap_or("?").to_string(),
                    kind => format!("{kind:?}"),
                };
                format!("{what}:{part:?}")
            })
            .collect()
    }

    #[test]
    fn enumerates_siblings_then_parents() {
        let tree = body();
        let c = statement(&tree, "c");
        let near = describe(&tree, NearStatements::new(&tree, c));
        assert_eq!(
            near,
            vec![
                "ForEachStatement:ForEach",
                "ForEachStatement:None",
                "Block:CloseBrace",
                "Block:CloseBrace",
                "Block:None",
                "a:None",
                "Block:OpenBrace",
                "Block:None",
            ]
        );
    }

    #[test]
    fn nested_statement_climbs_through_foreach() {
        let tree = body();
        let d = statement(&tree, "d");
        let near: Vec<String> = describe(&tree, NearStatements::new(&tree, d)).into_iter().take(5).collect();
        assert_eq!(near, vec!["Block:CloseBrace", "Block:OpenBrace", "Block:None", "ForEachStatement:ForEach", "IdentifierName:None"]);
    }

    #[test]
    fn lone_static_field_falls_back_to_itself() {
        let mut b = TreeBuilder::new();
        b.start_decl(SyntaxKind::ClassDeclaration, DeclInfo::named("C"));
        b.leaf_decl(SyntaxKind::FieldDeclaration, DeclInfo::new().with_modifiers(Modifiers::STATIC));
        b.leaf_decl(SyntaxKind::FieldDeclaration, DeclInfo::new());
        b.finish_node();
        let tree = b.build().unwrap();
        let a = tree.children(tree.root()).next().unwrap();
        let near = describe(&tree, NearStatements::new(&tree, a));
        assert_eq!(near, vec!["FieldDeclaration:None", "ClassDeclaration:None"]);
    }
}
