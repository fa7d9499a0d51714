//! Structural equivalence of subtrees across two trees.
//!
//! Сравнение идёт по виду узла, тексту payload'а и данным объявления; span'ы
//! и id символов не участвуют. Режим определяет, какие дети входят в
//! "значение" узла.

use super::{AstPayload, NodeId, SyntaxKind, SyntaxTree};
use crate::matching::label::{statement_label, top_label};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquivalenceMode {
    /// Всё поддерево.
    Full,
    /// Непосредственные дети с меткой объявления пропускаются (они сравниваются отдельно).
    IgnoreTopLevelChildren,
    /// Потомки с меткой инструкции пропускаются на любой глубине.
    IgnoreStatementDescendants,
}

pub fn are_equivalent(old: &SyntaxTree, o: NodeId, new: &SyntaxTree, n: NodeId, mode: EquivalenceMode) -> bool {
    if mode == EquivalenceMode::Full && old.fingerprint(o) != new.fingerprint(n) {
        return false;
    }
    if !same_value(old, o, new, n) {
        return false;
    }
    let old_children = value_children(old, o, mode);
    let new_children = value_children(new, n, mode);
    if old_children.len() != new_children.len() {
        return false;
    }
    let child_mode = match mode {
        EquivalenceMode::IgnoreTopLevelChildren => EquivalenceMode::Full,
        m => m,
    };
    old_children.iter().zip(&new_children).all(|(a, b)| are_equivalent(old, *a, new, *b, child_mode))
}

/// Оба узла отсутствуют или эквивалентны полностью.
pub fn are_equivalent_opt(old: &SyntaxTree, o: Option<NodeId>, new: &SyntaxTree, n: Option<NodeId>) -> bool {
    match (o, n) {
        (None, None) => true,
        (Some(a), Some(b)) => are_equivalent(old, a, new, b, EquivalenceMode::Full),
        _ => false,
    }
}

fn value_children(tree: &SyntaxTree, id: NodeId, mode: EquivalenceMode) -> Vec<NodeId> {
    match mode {
        EquivalenceMode::Full => tree.child_vec(id),
        EquivalenceMode::IgnoreTopLevelChildren => tree.children(id).filter(|c| top_label(tree.kind(*c)).is_none()).collect(),
        // заголовок конструктора сравнивается на верхнем уровне
        EquivalenceMode::IgnoreStatementDescendants if tree.kind(id) == SyntaxKind::ConstructorDeclaration => Vec::new(),
        EquivalenceMode::IgnoreStatementDescendants => {
            tree.children(id).filter(|c| statement_label(tree.kind(*c)).is_none()).collect()
        }
    }
}

/// Вид и payload совпадают (без учёта детей).
pub fn same_value(old: &SyntaxTree, o: NodeId, new: &SyntaxTree, n: NodeId) -> bool {
    if old.kind(o) != new.kind(n) {
        return false;
    }
    match (old.node(o).payload, new.node(n).payload) {
        (AstPayload::None, AstPayload::None) => true,
        (AstPayload::Ident { .. }, AstPayload::Ident { .. })
        | (AstPayload::Literal { .. }, AstPayload::Literal { .. })
        | (AstPayload::Token { .. }, AstPayload::Token { .. }) => old.text(o) == new.text(n),
        (AstPayload::Decl { .. }, AstPayload::Decl { .. }) => {
            old.name(o) == new.name(n)
                && old.type_text(o) == new.type_text(n)
                && old.modifiers(o) == new.modifiers(n)
                && old.explicit_interface(o) == new.explicit_interface(n)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast_core::{DeclInfo, TreeBuilder};

    fn ret(value: &str) -> SyntaxTree {
        let mut b = TreeBuilder::new();
        b.start_node(SyntaxKind::Block);
        b.start_node(SyntaxKind::ReturnStatement);
        b.start_token(SyntaxKind::BinaryExpression, "+");
        b.ident("a");
        b.literal(value);
        b.finish_node();
        b.finish_node();
        b.finish_node();
        b.build().unwrap()
    }

    #[test]
    fn full_and_shallow_modes() {
        let a = ret("1");
        let b = ret("2");
        let ra = a.root();
        let rb = b.root();
        assert!(!are_equivalent(&a, ra, &b, rb, EquivalenceMode::Full));
        // return-инструкция без операндов одинакова
        let sa = a.children(ra).next().unwrap();
        let sb = b.children(rb).next().unwrap();
        assert!(are_equivalent(&a, sa, &b, sb, EquivalenceMode::IgnoreStatementDescendants));
        assert!(are_equivalent(&a, ra, &ret("1"), ra, EquivalenceMode::Full));
    }

    #[test]
    fn top_level_children_are_ignored() {
        let build = |param: &str| {
            let mut b = TreeBuilder::new();
            b.start_decl(SyntaxKind::MethodDeclaration, DeclInfo::named("M").with_type("void"));
            b.start_node(SyntaxKind::ParameterList);
            b.leaf_decl(SyntaxKind::Parameter, DeclInfo::named(param).with_type("int"));
            b.finish_node();
            b.start_node(SyntaxKind::Block);
            b.finish_node();
            b.finish_node();
            b.build().unwrap()
        };
        let a = build("x");
        let b = build("y");
        assert!(are_equivalent(&a, a.root(), &b, b.root(), EquivalenceMode::IgnoreTopLevelChildren));
        assert!(!are_equivalent(&a, a.root(), &b, b.root(), EquivalenceMode::Full));
    }
}
