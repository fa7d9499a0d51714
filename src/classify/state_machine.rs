//! Suspension point rules for iterator and async bodies.
//!
//! Состояние конечного автомата привязано к каждой точке приостановки, поэтому
//! `yield` нельзя превращать в другую форму, а инструкция с `await` не может
//! меняться, если при приостановке сохраняется промежуточное состояние.

use crate::ast_core::equivalence::{are_equivalent, EquivalenceMode};
use crate::ast_core::{NodeId, SyntaxKind, SyntaxTree};
use crate::diagnostics::{statement_display_name, NodeRef, RudeEditDiagnostic, RudeEditKind};
use crate::matching::Match;

/// Проверяет сопоставленные пары точек приостановки тела.
pub fn report_state_machine_edits(
    old: &SyntaxTree,
    new: &SyntaxTree,
    body_match: &Match,
    diagnostics: &mut Vec<RudeEditDiagnostic>,
) {
    for (o, n) in body_match.pairs() {
        let (old_kind, new_kind) = (old.kind(o), new.kind(n));
        if old_kind.is_yield() {
            if old_kind != new_kind {
                diagnostics.push(RudeEditDiagnostic::new(
                    RudeEditKind::Update,
                    new.span(n),
                    NodeRef::new(n),
                    vec![statement_display_name(new, n).to_string()],
                ));
            }
            continue;
        }
        if old_kind != SyntaxKind::AwaitExpression || new_kind != SyntaxKind::AwaitExpression {
            continue;
        }
        let old_part = containing_statement_part(old, o);
        let new_part = containing_statement_part(new, n);
        if !are_equivalent(old, old_part, new, new_part, EquivalenceMode::Full) && !has_no_spilled_state(new, n, new_part) {
            tracing::debug!("await in {:?} spills state across an updated statement", new.kind(new_part));
            diagnostics.push(RudeEditDiagnostic::new(
                RudeEditKind::AwaitStatementUpdate,
                new.span(new_part),
                NodeRef::new(new_part),
                Vec::new(),
            ));
        }
    }
}

/// Часть инструкции, в которой находится узел: сама инструкция, заголовок
/// составной инструкции или тело лямбды.
pub fn containing_statement_part(tree: &SyntaxTree, node: NodeId) -> NodeId {
    use SyntaxKind::*;
    let mut cur = node;
    loop {
        if tree.kind(cur).is_statement() {
            return cur;
        }
        let Some(parent) = tree.parent(cur) else { return cur };
        let parent_kind = tree.kind(parent);
        if matches!(
            parent_kind,
            ForStatement | ForEachStatement | IfStatement | WhileStatement | DoStatement | SwitchStatement
                | LockStatement | UsingStatement | ArrowExpressionClause
        ) {
            return cur;
        }
        if parent_kind.is_lambda() && !matches!(tree.kind(cur), Parameter | ParameterList) {
            return cur;
        }
        cur = parent;
    }
}

/// Ожидание не сохраняет промежуточных значений: `await x;`, `return await x;`,
/// `v = await x;` или `var v = await x;`.
pub fn has_no_spilled_state(tree: &SyntaxTree, await_expr: NodeId, part: NodeId) -> bool {
    use SyntaxKind::*;
    if part == await_expr {
        return true;
    }
    match tree.kind(part) {
        ExpressionStatement | ReturnStatement => match tree.children(part).next() {
            Some(expr) if tree.kind(expr) == AwaitExpression => expr == await_expr,
            Some(expr) => is_simple_await_assignment(tree, expr, await_expr),
            None => false,
        },
        // await -> EqualsValueClause -> VariableDeclarator -> VariableDeclaration
        VariableDeclaration => tree.ancestors(await_expr).nth(2) == Some(part),
        LocalDeclarationStatement => tree.ancestors(await_expr).nth(3) == Some(part),
        _ => is_simple_await_assignment(tree, part, await_expr),
    }
}

fn is_simple_await_assignment(tree: &SyntaxTree, node: NodeId, await_expr: NodeId) -> bool {
    if tree.kind(node) != SyntaxKind::AssignmentExpression {
        return false;
    }
    let mut children = tree.children(node);
    let left = children.next();
    let right = children.next();
    left.is_some_and(|l| tree.kind(l) == SyntaxKind::IdentifierName) && right == Some(await_expr)
}
