/*!
# Active statement tracking

Maps statements that are executing (or suspended) in the old body onto the
new body and reports what an edit does to them:

- a mapped statement whose executable part changed is an update, unless it
  is a leaf that has not been partially executed;
- a statement that disappeared is placed on the nearest surviving statement
  and is rude when it is non-leaf or partially executed;
- exception handlers, checked contexts and temp-holding statements around the
  statement are compared in `regions`.

Порядок поиска партнёра: сопоставление тела, перемещения, запасные правила
конструктора, корень-выражение, затем узел над корнем на той же высоте.
*/

use crate::ast_core::body::{governing_expression, is_field_declarator};
use crate::ast_core::equivalence::{are_equivalent, are_equivalent_opt, EquivalenceMode};
use crate::ast_core::json::ActiveStatementSpec;
use crate::ast_core::{NodeId, SyntaxKind, SyntaxTree};
use crate::core::errors::{AnalysisError, Result};
use crate::core::position::PackedSpan;
use crate::diagnostics::{diagnostic_span, NodeRef, RudeEditDiagnostic, RudeEditKind};
use crate::matching::{EditKind, EditScript, Match};
use serde::Serialize;

pub mod near;
pub mod regions;

pub use near::NearStatements;
pub use regions::{
    get_exception_handling_ancestors, get_exception_region, report_checked_context_edits,
    report_exception_region_edits, report_inter_statement_temp_edits, ExceptionRegion,
};

/// Часть инструкции, на которой стоит активная точка.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StatementPart {
    None,
    OpenBrace,
    CloseBrace,
    ForEach,
    VariableDeclaration,
    In,
    Expression,
    DefaultBaseConstructorCall,
}

impl StatementPart {
    /// Числовой дискриминатор зависит от вида узла; неизвестные значения дают `None`.
    pub fn from_discriminator(kind: SyntaxKind, value: u8) -> Self {
        use StatementPart::*;
        match (kind, value) {
            (SyntaxKind::Block, 1) => OpenBrace,
            (SyntaxKind::Block, 2) => CloseBrace,
            (SyntaxKind::ForEachStatement, 1) => ForEach,
            (SyntaxKind::ForEachStatement, 2) => VariableDeclaration,
            (SyntaxKind::ForEachStatement, 3) => In,
            (SyntaxKind::ForEachStatement, 4) => Expression,
            (SyntaxKind::ConstructorDeclaration, 1) => DefaultBaseConstructorCall,
            _ => None,
        }
    }

    pub fn discriminator(self) -> u8 {
        use StatementPart::*;
        match self {
            None => 0,
            OpenBrace | ForEach | DefaultBaseConstructorCall => 1,
            CloseBrace | VariableDeclaration => 2,
            In => 3,
            Expression => 4,
        }
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ActiveStatementFlags: u8 {
        /// Инструкция на вершине стека вызовов.
        const LEAF = 1 << 0;
        const PARTIALLY_EXECUTED = 1 << 1;
    }
}

/// Активная инструкция старого дерева.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveStatement {
    pub statement: NodeId,
    pub part: StatementPart,
    pub flags: ActiveStatementFlags,
}

impl ActiveStatement {
    pub fn new(statement: NodeId, part: StatementPart, flags: ActiveStatementFlags) -> Self {
        Self { statement, part, flags }
    }

    /// Самый вложенный узел-инструкция по смещению.
    pub fn resolve(tree: &SyntaxTree, spec: &ActiveStatementSpec) -> Result<Self> {
        let statement = tree
            .innermost_at(spec.offset, |id| can_be_active(tree, id))
            .ok_or(AnalysisError::UnknownActiveStatement(spec.offset))?;
        let kind = tree.kind(statement);
        let part = match (kind, spec.part) {
            // часть блока определяется по позиции
            (SyntaxKind::Block, 0) if spec.offset < tree.span(statement).start + 1 => StatementPart::OpenBrace,
            (SyntaxKind::Block, 0) => StatementPart::CloseBrace,
            (SyntaxKind::ForEachStatement, 0) => StatementPart::ForEach,
            (kind, value) => StatementPart::from_discriminator(kind, value),
        };
        let mut flags = ActiveStatementFlags::empty();
        flags.set(ActiveStatementFlags::LEAF, spec.leaf);
        flags.set(ActiveStatementFlags::PARTIALLY_EXECUTED, spec.partially_executed);
        Ok(Self { statement, part, flags })
    }

    pub fn is_leaf(&self) -> bool { self.flags.contains(ActiveStatementFlags::LEAF) }
    pub fn is_partially_executed(&self) -> bool { self.flags.contains(ActiveStatementFlags::PARTIALLY_EXECUTED) }
}

fn can_be_active(tree: &SyntaxTree, id: NodeId) -> bool {
    use SyntaxKind::*;
    match tree.kind(id) {
        ElseClause | CatchClause | CatchFilterClause | FinallyClause | SwitchSection | CaseSwitchLabel
        | DefaultSwitchLabel => false,
        ArrowExpressionClause | ConstructorDeclaration | BaseConstructorInitializer | ThisConstructorInitializer => true,
        VariableDeclarator => is_field_declarator(tree, id),
        kind => kind.is_statement(),
    }
}

/// Span активной части инструкции.
pub fn active_span(tree: &SyntaxTree, node: NodeId, part: StatementPart) -> PackedSpan {
    let span = tree.span(node);
    match tree.kind(node) {
        SyntaxKind::Block if part == StatementPart::CloseBrace => span.suffix(1),
        SyntaxKind::Block => span.prefix(1),
        SyntaxKind::ForEachStatement => {
            let expr = governing_expression(tree, node).map(|e| tree.span(e));
            let keyword = span.prefix(SyntaxKind::ForEachStatement.keyword_len().unwrap_or(0));
            match (part, expr) {
                (StatementPart::VariableDeclaration, Some(e)) => PackedSpan::from_bounds(keyword.end(), e.start),
                // `in ` перед выражением
                (StatementPart::In, Some(e)) => PackedSpan::from_bounds(e.start.saturating_sub(3).max(keyword.end()), e.start),
                (StatementPart::Expression, Some(e)) => e,
                _ => keyword,
            }
        }
        // do { ... } while (condition);
        SyntaxKind::DoStatement => governing_expression(tree, node).map_or(span, |c| tree.span(c)),
        SyntaxKind::ConstructorDeclaration => diagnostic_span(tree, node, EditKind::Update),
        SyntaxKind::PropertyDeclaration => tree
            .first_child_of_kind(node, SyntaxKind::EqualsValueClause)
            .map_or(span, |init| tree.span(init)),
        _ => span,
    }
}

/// Меняется ли исполняемая часть активной инструкции.
pub fn are_equivalent_active_statements(old: &SyntaxTree, o: NodeId, new: &SyntaxTree, n: NodeId) -> bool {
    use SyntaxKind::*;
    if old.kind(o) != new.kind(n) {
        return false;
    }
    match old.kind(o) {
        Block | ConstructorDeclaration => true,
        ForEachStatement => {
            old.type_text(o) == new.type_text(n)
                && are_equivalent_opt(old, governing_expression(old, o), new, governing_expression(new, n))
        }
        IfStatement | WhileStatement | DoStatement | SwitchStatement | LockStatement | UsingStatement
        | FixedStatement => are_equivalent_opt(old, governing_expression(old, o), new, governing_expression(new, n)),
        _ => are_equivalent(old, o, new, n, EquivalenceMode::Full),
    }
}

/// Партнёр активной инструкции в новом теле.
#[allow(clippy::too_many_arguments)]
pub fn map_active_statement(
    old: &SyntaxTree,
    new: &SyntaxTree,
    body_match: &Match,
    script: &EditScript,
    old_statement: NodeId,
    part: StatementPart,
    old_root: NodeId,
    new_root: NodeId,
) -> Option<(NodeId, StatementPart)> {
    if let Some(n) = body_match.new_partner(old_statement).or_else(|| script.moved_partner(old_statement)) {
        return Some((n, part));
    }

    let old_kind = old.kind(old_statement);
    if old_kind.is_constructor_initializer() && new.kind(new_root) == SyntaxKind::ConstructorDeclaration {
        return Some(match new.children(new_root).find(|c| new.kind(*c).is_constructor_initializer()) {
            Some(init) => (init, StatementPart::None),
            None => (new_root, StatementPart::DefaultBaseConstructorCall),
        });
    }

    let expression_root = matches!(old.kind(old_root), SyntaxKind::ArrowExpressionClause | SyntaxKind::EqualsValueClause);
    if expression_root && old.is_ancestor_of(old_root, old_statement) {
        return Some((new_root, StatementPart::None));
    }

    // узел над корнем тела (декларатор поля над инициализатором)
    if old.is_ancestor_of(old_statement, old_root) {
        let depth = old.ancestors(old_root).position(|a| a == old_statement)?;
        let candidate = new.ancestors(new_root).nth(depth)?;
        return (new.kind(candidate) == old_kind).then_some((candidate, part));
    }
    None
}

/// Результат отображения одной активной инструкции.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveStatementMapping {
    pub old_statement: NodeId,
    pub old_part: StatementPart,
    pub old_span: PackedSpan,
    /// Партнёр в новом дереве; `None`, если инструкция удалена.
    pub new_statement: Option<NodeId>,
    pub new_part: StatementPart,
    /// Для удалённой инструкции это span ближайшей сохранившейся.
    pub new_span: PackedSpan,
    pub old_regions: Vec<ExceptionRegion>,
    pub new_regions: Vec<ExceptionRegion>,
}

/// Тело члена в обеих версиях вместе с его сопоставлением.
pub struct BodyContext<'a> {
    pub old: &'a SyntaxTree,
    pub new: &'a SyntaxTree,
    pub body_match: &'a Match,
    pub script: &'a EditScript,
}

impl BodyContext<'_> {
    fn map(&self, statement: NodeId, part: StatementPart) -> Option<(NodeId, StatementPart)> {
        let m = self.body_match;
        map_active_statement(self.old, self.new, m, self.script, statement, part, m.old_root(), m.new_root())
    }

    /// Отображает активную инструкцию и собирает связанные с ней недопустимые изменения.
    pub fn track(&self, active: &ActiveStatement, diagnostics: &mut Vec<RudeEditDiagnostic>) -> ActiveStatementMapping {
        let (old, new) = (self.old, self.new);
        let old_statement = active.statement;
        let old_span = active_span(old, old_statement, active.part);
        let is_leaf = active.is_leaf();

        let Some((new_statement, new_part)) = self.map(old_statement, active.part) else {
            let new_span = NearStatements::new(old, old_statement)
                .find_map(|(near, part)| self.map(near, part))
                .map_or_else(|| diagnostic_span(new, self.body_match.new_root(), EditKind::Delete), |(n, p)| active_span(new, n, p));
            if !is_leaf || active.is_partially_executed() {
                tracing::debug!("active statement {:?} deleted", old_statement);
                diagnostics.push(RudeEditDiagnostic::new(
                    RudeEditKind::DeleteActiveStatement,
                    new_span,
                    NodeRef::old(old_statement),
                    Vec::new(),
                ));
            }
            let old_regions = get_exception_handling_ancestors(old, old_statement, is_leaf)
                .into_iter()
                .map(|n| get_exception_region(old, n))
                .collect();
            return ActiveStatementMapping {
                old_statement,
                old_part: active.part,
                old_span,
                new_statement: None,
                new_part: StatementPart::None,
                new_span,
                old_regions,
                new_regions: Vec::new(),
            };
        };

        let new_span = active_span(new, new_statement, new_part);
        if !are_equivalent_active_statements(old, old_statement, new, new_statement) {
            let kind = if !is_leaf {
                Some(RudeEditKind::ActiveStatementUpdate)
            } else if active.is_partially_executed() {
                Some(RudeEditKind::PartiallyExecutedActiveStatementUpdate)
            } else {
                None
            };
            if let Some(kind) = kind {
                diagnostics.push(RudeEditDiagnostic::new(kind, new_span, NodeRef::new(new_statement), Vec::new()));
            }
        }

        let (old_regions, new_regions) = report_exception_region_edits(
            old,
            new,
            self.body_match,
            old_statement,
            new_statement,
            new_span,
            is_leaf,
            diagnostics,
        );
        report_inter_statement_temp_edits(old, new, self.body_match, old_statement, new_statement, new_span, diagnostics);
        if !is_leaf {
            report_checked_context_edits(old, new, old_statement, new_statement, new_span, diagnostics);
        }

        ActiveStatementMapping {
            old_statement,
            old_part: active.part,
            old_span,
            new_statement: Some(new_statement),
            new_part,
            new_span,
            old_regions,
            new_regions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast_core::{DeclInfo, TreeBuilder};
    use crate::core::cancel::CancellationToken;
    use crate::matching::{compute_body_match, MatchOptions};
    use pretty_assertions::assert_eq;

    /// `{ while (cond) { F(); } G(); }`
    fn body(cond: &str, with_g: bool) -> SyntaxTree {
        let mut b = TreeBuilder::new();
        b.start_node(SyntaxKind::Block);
        b.start_node(SyntaxKind::WhileStatement);
        b.ident(cond);
        b.start_node(SyntaxKind::Block);
        b.start_node(SyntaxKind::ExpressionStatement);
        b.start_node(SyntaxKind::InvocationExpression);
        b.ident("F");
        b.finish_node();
        b.finish_node();
        b.finish_node();
        b.finish_node();
        if with_g {
            b.start_node(SyntaxKind::ExpressionStatement);
            b.start_node(SyntaxKind::InvocationExpression);
            b.ident("G");
            b.finish_node();
            b.finish_node();
        }
        b.finish_node();
        b.build().unwrap()
    }

    fn find(tree: &SyntaxTree, kind: SyntaxKind) -> NodeId {
        tree.preorder(tree.root()).find(|id| tree.kind(*id) == kind).unwrap()
    }

    fn track(old: &SyntaxTree, new: &SyntaxTree, statement: NodeId, flags: ActiveStatementFlags) -> (ActiveStatementMapping, Vec<RudeEditKind>) {
        let opts = MatchOptions::default();
        let m = compute_body_match(old, old.root(), new, new.root(), &opts, &CancellationToken::new()).unwrap();
        let script = EditScript::compute(old, new, &m, &opts);
        let ctx = BodyContext { old, new, body_match: &m, script: &script };
        let mut diagnostics = Vec::new();
        let mapping = ctx.track(&ActiveStatement::new(statement, StatementPart::None, flags), &mut diagnostics);
        (mapping, diagnostics.into_iter().map(|d| d.kind).collect())
    }

    #[test]
    fn condition_change_is_rude_only_for_non_leaf() {
        let old = body("a", true);
        let new = body("b", true);
        let w = find(&old, SyntaxKind::WhileStatement);

        let (mapping, kinds) = track(&old, &new, w, ActiveStatementFlags::LEAF);
        assert!(kinds.is_empty());
        assert_eq!(mapping.new_statement, Some(find(&new, SyntaxKind::WhileStatement)));

        let (_, kinds) = track(&old, &new, w, ActiveStatementFlags::empty());
        assert_eq!(kinds, vec![RudeEditKind::ActiveStatementUpdate]);

        let (_, kinds) = track(&old, &new, w, ActiveStatementFlags::LEAF | ActiveStatementFlags::PARTIALLY_EXECUTED);
        assert_eq!(kinds, vec![RudeEditKind::PartiallyExecutedActiveStatementUpdate]);
    }

    #[test]
    fn deleted_statement_lands_on_a_near_statement() {
        let old = body("a", true);
        let new = body("a", false);
        let g = old.preorder(old.root()).filter(|id| old.kind(*id) == SyntaxKind::ExpressionStatement).last().unwrap();

        let (mapping, kinds) = track(&old, &new, g, ActiveStatementFlags::LEAF);
        assert!(kinds.is_empty());
        assert_eq!(mapping.new_statement, None);
        // следующего соседа нет: закрывающая скобка внешнего блока
        assert_eq!(mapping.new_span, new.span(new.root()).suffix(1));

        let (_, kinds) = track(&old, &new, g, ActiveStatementFlags::empty());
        assert_eq!(kinds, vec![RudeEditKind::DeleteActiveStatement]);
    }

    #[test]
    fn resolves_innermost_statement() {
        let tree = body("a", true);
        let f = tree
            .preorder(tree.root())
            .find(|id| tree.kind(*id) == SyntaxKind::InvocationExpression)
            .unwrap();
        let spec = ActiveStatementSpec { offset: tree.span(f).start, part: 0, leaf: false, partially_executed: false };
        let active = ActiveStatement::resolve(&tree, &spec).unwrap();
        assert_eq!(tree.kind(active.statement), SyntaxKind::ExpressionStatement);
        assert!(!active.is_leaf());

        let root = ActiveStatementSpec { offset: tree.span(tree.root()).start, part: 0, leaf: true, partially_executed: false };
        assert_eq!(ActiveStatement::resolve(&tree, &root).unwrap().part, StatementPart::OpenBrace);

        let missing = ActiveStatementSpec { offset: 10_000, part: 0, leaf: true, partially_executed: false };
        assert!(matches!(ActiveStatement::resolve(&tree, &missing), Err(AnalysisError::UnknownActiveStatement(10_000))));
    }

    #[test]
    fn discriminators_depend_on_kind() {
        assert_eq!(StatementPart::from_discriminator(SyntaxKind::Block, 2), StatementPart::CloseBrace);
        assert_eq!(StatementPart::from_discriminator(SyntaxKind::ForEachStatement, 3), StatementPart::In);
        assert_eq!(StatementPart::from_discriminator(SyntaxKind::IfStatement, 1), StatementPart::None);
        assert_eq!(StatementPart::DefaultBaseConstructorCall.discriminator(), 1);
    }

    #[test]
    fn foreach_parts() {
        let mut b = TreeBuilder::new();
        b.start_decl(SyntaxKind::ForEachStatement, DeclInfo::named("x").with_type("int"));
        b.ident("xs");
        b.start_node(SyntaxKind::Block);
        b.finish_node();
        b.finish_node();
        let tree = b.build().unwrap();
        let f = tree.root();
        let expr = tree.span(tree.children(f).next().unwrap());
        assert_eq!(active_span(&tree, f, StatementPart::Expression), expr);
        assert_eq!(active_span(&tree, f, StatementPart::ForEach).start, tree.span(f).start);
        assert!(are_equivalent_active_statements(&tree, f, &tree, f));
    }
}
