/*!
# Exception regions and constructs around active statements

Активная инструкция внутри `catch` делает catch неизменяемым; внутри `finally`
неизменяем весь try/catch/finally; нелистовая активная инструкция внутри `try`
замораживает его catch и finally. Кроме того, вокруг активной инструкции нельзя
добавлять или менять lock/fixed/using/foreach (они держат временные переменные),
а вокруг нелистовой нельзя менять checked-контекст.
*/

use crate::ast_core::body::{catch_clauses, declared_identifiers, finally_clause};
use crate::ast_core::equivalence::{are_equivalent, are_equivalent_opt, EquivalenceMode};
use crate::ast_core::{NodeId, SyntaxKind, SyntaxTree};
use crate::core::position::PackedSpan;
use crate::diagnostics::{diagnostic_span, display_name, NodeRef, RudeEditDiagnostic, RudeEditKind};
use crate::matching::{sequence_edits, EditKind, Match, SequenceEdit};
use serde::Serialize;

use super::are_equivalent_active_statements;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExceptionRegion {
    pub span: PackedSpan,
    pub covers_all_children: bool,
}

/// Регион, который становится неизменяемым из-за активной инструкции.
pub fn get_exception_region(tree: &SyntaxTree, node: NodeId) -> ExceptionRegion {
    match tree.kind(node) {
        SyntaxKind::TryStatement => {
            let catches = catch_clauses(tree, node);
            let finally = finally_clause(tree, node).map(|f| tree.span(f));
            let span = match (catches.first(), catches.last()) {
                (Some(first), Some(last)) => {
                    let end = finally.map_or_else(|| tree.span(*last).end(), |f| f.end());
                    PackedSpan::from_bounds(tree.span(*first).start, end)
                }
                _ => finally.unwrap_or_else(|| tree.span(node)),
            };
            ExceptionRegion { span, covers_all_children: false }
        }
        SyntaxKind::CatchClause => ExceptionRegion { span: tree.span(node), covers_all_children: true },
        SyntaxKind::FinallyClause => {
            let span = tree.parent(node).map_or_else(|| tree.span(node), |t| tree.span(t));
            ExceptionRegion { span, covers_all_children: true }
        }
        k => unreachable!("{k:?} is not an exception handling node"),
    }
}

/// try/catch/finally вокруг инструкции, изнутри наружу. `try` учитывается
/// только для нелистовой инструкции; у catch/finally сам try пропускается.
pub fn get_exception_handling_ancestors(tree: &SyntaxTree, node: NodeId, is_leaf: bool) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut cur = Some(node);
    while let Some(n) = cur {
        let kind = tree.kind(n);
        match kind {
            SyntaxKind::TryStatement if !is_leaf => result.push(n),
            SyntaxKind::CatchClause | SyntaxKind::FinallyClause => {
                result.push(n);
                cur = tree.parent(n);
            }
            SyntaxKind::ClassDeclaration | SyntaxKind::StructDeclaration => return result,
            _ => {}
        }
        if kind.is_lambda() {
            return result;
        }
        cur = cur.and_then(|c| tree.parent(c));
    }
    result
}

/// Сравнивает обработчики исключений вокруг старой и новой инструкции и
/// возвращает регионы обеих сторон.
#[allow(clippy::too_many_arguments)]
pub fn report_exception_region_edits(
    old: &SyntaxTree,
    new: &SyntaxTree,
    body_match: &Match,
    old_statement: NodeId,
    new_statement: NodeId,
    new_active_span: PackedSpan,
    is_leaf: bool,
    diagnostics: &mut Vec<RudeEditDiagnostic>,
) -> (Vec<ExceptionRegion>, Vec<ExceptionRegion>) {
    let old_ancestors = get_exception_handling_ancestors(old, old_statement, is_leaf);
    let new_ancestors = get_exception_handling_ancestors(new, new_statement, is_leaf);
    let mut around = Around { old, new, new_active_span, diagnostics };

    for edit in sequence_edits(&old_ancestors, &new_ancestors, |o, n| body_match.contains(*o, *n)) {
        match edit {
            SequenceEdit::Delete { old: i } => around.report(Some(old_ancestors[i]), None),
            SequenceEdit::Insert { new: j } => around.report(None, Some(new_ancestors[j])),
            SequenceEdit::Match { old: i, new: j } => {
                let (o, n) = (old_ancestors[i], new_ancestors[j]);
                if old.kind(o) == SyntaxKind::TryStatement {
                    around.report_try_clauses(body_match, o, n);
                } else if !are_equivalent(old, o, new, n, EquivalenceMode::Full) {
                    around.report(Some(o), Some(n));
                }
            }
        }
    }

    let regions = |tree: &SyntaxTree, nodes: &[NodeId]| nodes.iter().map(|n| get_exception_region(tree, *n)).collect();
    (regions(old, &old_ancestors), regions(new, &new_ancestors))
}

/// checked/unchecked вокруг нелистовой инструкции: наличие и вид сохраняются.
pub fn report_checked_context_edits(
    old: &SyntaxTree,
    new: &SyntaxTree,
    old_statement: NodeId,
    new_statement: NodeId,
    new_active_span: PackedSpan,
    diagnostics: &mut Vec<RudeEditDiagnostic>,
) {
    // контекст проходит через границы лямбд
    let checked = |tree: &SyntaxTree, node: NodeId| {
        std::iter::once(node).chain(tree.ancestors(node)).find(|a| tree.kind(*a).is_checked())
    };
    let old_checked = checked(old, old_statement);
    let new_checked = checked(new, new_statement);
    let is_rude = match (old_checked, new_checked) {
        (Some(o), Some(n)) => old.kind(o) != new.kind(n),
        (None, None) => false,
        _ => true,
    };
    if is_rude {
        Around { old, new, new_active_span, diagnostics }.report(old_checked, new_checked);
    }
}

/// lock/fixed/using/foreach над новой инструкцией должны иметь эквивалентного
/// старого предка. Перестановки допустимы.
#[allow(clippy::too_many_arguments)]
pub fn report_inter_statement_temp_edits(
    old: &SyntaxTree,
    new: &SyntaxTree,
    body_match: &Match,
    old_statement: NodeId,
    new_statement: NodeId,
    new_active_span: PackedSpan,
    diagnostics: &mut Vec<RudeEditDiagnostic>,
) {
    let mut around = Around { old, new, new_active_span, diagnostics };
    for kind in [SyntaxKind::LockStatement, SyntaxKind::FixedStatement, SyntaxKind::UsingStatement, SyntaxKind::ForEachStatement] {
        let mut new_nodes: Vec<Option<NodeId>> =
            ancestors_of_kind(new, new_statement, body_match.new_root(), kind).into_iter().map(Some).collect();
        if new_nodes.is_empty() {
            continue;
        }
        let mut old_nodes: Vec<Option<NodeId>> =
            ancestors_of_kind(old, old_statement, body_match.old_root(), kind).into_iter().map(Some).collect();

        let equivalent = |o: NodeId, n: NodeId| are_equivalent_active_statements(old, o, new, n);
        let mut matched = pair_nodes(&mut old_nodes, &mut new_nodes, equivalent, |_, _| {});
        if matched < old_nodes.len().min(new_nodes.len()) {
            let similar = |o: NodeId, n: NodeId| body_match.contains(o, n) || are_similar_temps(old, o, new, n);
            matched += pair_nodes(&mut old_nodes, &mut new_nodes, similar, |o, n| around.report(Some(o), Some(n)));
        }
        if matched < new_nodes.len() {
            for n in new_nodes.into_iter().flatten() {
                around.report(None, Some(n));
            }
        }
    }
}

/// Узлы заданного вида среди предков инструкции ниже корня тела.
fn ancestors_of_kind(tree: &SyntaxTree, statement: NodeId, root: NodeId, kind: SyntaxKind) -> Vec<NodeId> {
    tree.ancestors(statement).take_while(|a| *a != root).filter(|a| tree.kind(*a) == kind).collect()
}

/// Жадное попарное сопоставление; сопоставленные элементы вычёркиваются.
fn pair_nodes(
    old_nodes: &mut [Option<NodeId>],
    new_nodes: &mut [Option<NodeId>],
    matches: impl Fn(NodeId, NodeId) -> bool,
    mut on_match: impl FnMut(NodeId, NodeId),
) -> usize {
    let mut count = 0;
    for slot in new_nodes.iter_mut() {
        let Some(n) = *slot else { continue };
        let Some(i) = old_nodes.iter().position(|o| o.is_some_and(|o| matches(o, n))) else { continue };
        if let Some(o) = old_nodes[i].take() {
            on_match(o, n);
            *slot = None;
            count += 1;
        }
    }
    count
}

fn are_similar_temps(old: &SyntaxTree, o: NodeId, new: &SyntaxTree, n: NodeId) -> bool {
    match old.kind(o) {
        SyntaxKind::FixedStatement | SyntaxKind::UsingStatement => {
            let declaration = |tree: &SyntaxTree, s: NodeId| tree.first_child_of_kind(s, SyntaxKind::VariableDeclaration);
            match (declaration(old, o), declaration(new, n)) {
                (Some(od), Some(nd)) => declared_identifiers(old, od) == declared_identifiers(new, nd),
                _ => false,
            }
        }
        SyntaxKind::ForEachStatement => old.name(o) == new.name(n),
        _ => false,
    }
}

/// Отчёт об изменении узла вокруг активной инструкции.
struct Around<'a> {
    old: &'a SyntaxTree,
    new: &'a SyntaxTree,
    new_active_span: PackedSpan,
    diagnostics: &'a mut Vec<RudeEditDiagnostic>,
}

impl Around<'_> {
    fn report(&mut self, old_node: Option<NodeId>, new_node: Option<NodeId>) {
        let diagnostic = match (old_node, new_node) {
            (_, Some(n)) => {
                let (kind, edit) = if old_node.is_none() {
                    (RudeEditKind::InsertAroundActiveStatement, EditKind::Insert)
                } else {
                    (RudeEditKind::UpdateAroundActiveStatement, EditKind::Update)
                };
                RudeEditDiagnostic::new(
                    kind,
                    diagnostic_span(self.new, n, edit),
                    NodeRef::new(n),
                    vec![display_name(self.new, n, edit).to_string()],
                )
            }
            (Some(o), None) => RudeEditDiagnostic::new(
                RudeEditKind::DeleteAroundActiveStatement,
                self.new_active_span,
                NodeRef::old(o),
                vec![display_name(self.old, o, EditKind::Delete).to_string()],
            ),
            (None, None) => return,
        };
        self.diagnostics.push(diagnostic);
    }

    /// Для сопоставленного try сравниваются отдельные catch и finally.
    fn report_try_clauses(&mut self, body_match: &Match, o: NodeId, n: NodeId) {
        let (old, new) = (self.old, self.new);
        let old_catches = catch_clauses(old, o);
        let new_catches = catch_clauses(new, n);
        for edit in sequence_edits(&old_catches, &new_catches, |a, b| body_match.contains(*a, *b)) {
            match edit {
                SequenceEdit::Delete { old: i } => self.report(Some(old_catches[i]), None),
                SequenceEdit::Insert { new: j } => self.report(None, Some(new_catches[j])),
                SequenceEdit::Match { old: i, new: j } => {
                    if !are_equivalent(old, old_catches[i], new, new_catches[j], EquivalenceMode::Full) {
                        self.report(Some(old_catches[i]), Some(new_catches[j]));
                    }
                }
            }
        }
        let (old_finally, new_finally) = (finally_clause(old, o), finally_clause(new, n));
        if !are_equivalent_opt(old, old_finally, new, new_finally) {
            self.report(old_finally, new_finally);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast_core::{DeclInfo, TreeBuilder};
    use pretty_assertions::assert_eq;

    /// `try { s; } catch (E) { t; } finally { u; }` внутри блока.
    fn try_tree(with_catch: bool, with_finally: bool) -> SyntaxTree {
        let stmt = |b: &mut TreeBuilder, name: &str| {
            b.start_node(SyntaxKind::ExpressionStatement);
            b.ident(name);
            b.finish_node();
        };
        let mut b = TreeBuilder::new();
        b.start_node(SyntaxKind::Block);
        b.start_node(SyntaxKind::TryStatement);
        b.start_node(SyntaxKind::Block);
        stmt(&mut b, "s");
        b.finish_node();
        if with_catch {
            b.start_decl(SyntaxKind::CatchClause, DeclInfo::new().with_type("E"));
            b.start_node(SyntaxKind::Block);
            stmt(&mut b, "t");
            b.finish_node();
            b.finish_node();
        }
        if with_finally {
            b.start_node(SyntaxKind::FinallyClause);
            b.start_node(SyntaxKind::Block);
            stmt(&mut b, "u");
            b.finish_node();
            b.finish_node();
        }
        b.finish_node();
        b.finish_node();
        b.build().unwrap()
    }

    fn find(tree: &SyntaxTree, kind: SyntaxKind) -> NodeId {
        tree.preorder(tree.root()).find(|id| tree.kind(*id) == kind).unwrap()
    }

    fn statement(tree: &SyntaxTree, name: &str) -> NodeId {
        tree.preorder(tree.root())
            .find(|id| tree.kind(*id) == SyntaxKind::ExpressionStatement && tree.children(*id).any(|c| tree.text(c) == Some(name)))
            .unwrap()
    }

    #[test]
    fn regions_per_clause() {
        let tree = try_tree(true, true);
        let try_stmt = find(&tree, SyntaxKind::TryStatement);
        let catch = find(&tree, SyntaxKind::CatchClause);
        let finally = find(&tree, SyntaxKind::FinallyClause);

        let region = get_exception_region(&tree, try_stmt);
        assert_eq!(region.span, PackedSpan::from_bounds(tree.span(catch).start, tree.span(finally).end()));
        assert!(!region.covers_all_children);
        assert_eq!(get_exception_region(&tree, catch), ExceptionRegion { span: tree.span(catch), covers_all_children: true });
        assert_eq!(get_exception_region(&tree, finally).span, tree.span(try_stmt));

        let only_finally = try_tree(false, true);
        let region = get_exception_region(&only_finally, find(&only_finally, SyntaxKind::TryStatement));
        assert_eq!(region.span, only_finally.span(find(&only_finally, SyntaxKind::FinallyClause)));
    }

    #[test]
    fn try_is_an_ancestor_only_for_non_leaf_statements() {
        let tree = try_tree(true, true);
        let s = statement(&tree, "s");
        assert!(get_exception_handling_ancestors(&tree, s, true).is_empty());
        assert_eq!(get_exception_handling_ancestors(&tree, s, false), vec![find(&tree, SyntaxKind::TryStatement)]);

        // finally пропускает свой try
        let u = statement(&tree, "u");
        assert_eq!(get_exception_handling_ancestors(&tree, u, false), vec![find(&tree, SyntaxKind::FinallyClause)]);
    }
}
