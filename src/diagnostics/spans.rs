//! Diagnostic spans and display names per syntax kind.
//!
//! Деревья не хранят токены, поэтому span'ы заголовков приближаются: от начала
//! узла до начала первого ребёнка, с которого начинается тело, а span ключевого
//! слова берётся как префикс узла длиной `SyntaxKind::keyword_len`.

use crate::ast_core::body::has_backing_field;
use crate::ast_core::{NodeId, SyntaxKind, SyntaxTree};
use crate::core::position::PackedSpan;
use crate::matching::{EditKind, Match};

/// Span, на котором показывается диагностика для узла.
pub fn diagnostic_span(tree: &SyntaxTree, node: NodeId, edit: EditKind) -> PackedSpan {
    use SyntaxKind::*;
    let span = tree.span(node);
    match tree.kind(node) {
        CompilationUnit => PackedSpan::empty(),

        ExternAliasDirective | UsingDirective | VariableDeclarator | EnumMemberDeclaration | Attribute
        | ArrowExpressionClause | EqualsValueClause | CatchFilterClause | TypeParameter | Parameter
        | TypeParameterConstraintClause | FieldDeclaration | EventFieldDeclaration | AttributeList
        | BaseList | BracketedArgumentList => span,

        VariableDeclaration => match tree.parent(node) {
            Some(parent) if !tree.kind(parent).is_statement() => diagnostic_span(tree, parent, edit),
            _ => span,
        },

        AccessorList | TypeParameterList | ParameterList | BracketedParameterList => match tree.parent(node) {
            Some(parent) if edit == EditKind::Delete => diagnostic_span(tree, parent, edit),
            _ => span,
        },

        ClassDeclaration | StructDeclaration | InterfaceDeclaration => {
            match tree.first_child_of_kind(node, TypeParameterList) {
                Some(list) => PackedSpan::from_bounds(span.start, tree.span(list).end()),
                None => header(tree, node, |_| true),
            }
        }
        NamespaceDeclaration | EnumDeclaration | PropertyDeclaration | EventDeclaration => header(tree, node, |_| true),

        DelegateDeclaration | MethodDeclaration | ConversionOperatorDeclaration | OperatorDeclaration
        | ConstructorDeclaration | DestructorDeclaration | IndexerDeclaration => {
            match tree.children(node).find(|c| matches!(tree.kind(*c), ParameterList | BracketedParameterList)) {
                Some(list) => PackedSpan::from_bounds(span.start, tree.span(list).end()),
                None => header(tree, node, |k| matches!(k, Block | ArrowExpressionClause)),
            }
        }

        GetAccessorDeclaration | SetAccessorDeclaration | AddAccessorDeclaration | RemoveAccessorDeclaration => {
            header(tree, node, |k| matches!(k, Block | ArrowExpressionClause))
        }

        // открывающая скобка
        Block => span.prefix(1),

        IfStatement | WhileStatement | ForStatement | ForEachStatement | SwitchStatement | UsingStatement
        | FixedStatement | LockStatement | LabeledStatement => {
            header(tree, node, |k| k.is_statement() && k != ElseClause)
        }

        SwitchSection => tree
            .children(node)
            .filter(|c| matches!(tree.kind(*c), CaseSwitchLabel | DefaultSwitchLabel))
            .last()
            .map_or(span, |label| tree.span(label)),

        ParenthesizedLambdaExpression => tree.first_child_of_kind(node, ParameterList).map_or(span, |p| tree.span(p)),
        SimpleLambdaExpression => tree.first_child_of_kind(node, Parameter).map_or(span, |p| tree.span(p)),

        kind => match kind.keyword_len() {
            Some(len) => span.prefix(len),
            None => span,
        },
    }
}

/// Span удалённого узла: диагностический span партнёра ближайшего
/// сопоставленного предка в новом дереве.
pub fn deleted_node_span(old: &SyntaxTree, new: &SyntaxTree, m: &Match, node: NodeId) -> PackedSpan {
    old.ancestors(node)
        .find_map(|a| m.new_partner(a))
        .map_or_else(PackedSpan::empty, |partner| diagnostic_span(new, partner, EditKind::Delete))
}

/// От начала узла до начала первого ребёнка, удовлетворяющего предикату.
/// Без такого ребёнка берётся весь узел.
fn header(tree: &SyntaxTree, node: NodeId, starts_body: impl Fn(SyntaxKind) -> bool) -> PackedSpan {
    let span = tree.span(node);
    match tree.children(node).find(|c| starts_body(tree.kind(*c))) {
        Some(child) => PackedSpan::from_bounds(span.start, tree.span(child).start),
        None => span,
    }
}

/// Отображаемое имя объявления.
pub fn top_level_display_name(tree: &SyntaxTree, node: NodeId, edit: EditKind) -> &'static str {
    use SyntaxKind::*;
    match tree.kind(node) {
        CompilationUnit => "compilation unit",
        ExternAliasDirective => "using namespace",
        UsingDirective => "using directive",
        NamespaceDeclaration => "namespace",
        ClassDeclaration => "class",
        StructDeclaration => "struct",
        InterfaceDeclaration => "interface",
        EnumDeclaration => "enum",
        DelegateDeclaration => "delegate",
        FieldDeclaration => "field",
        EventFieldDeclaration => "event field",
        VariableDeclaration | VariableDeclarator | AccessorList => {
            tree.parent(node).map_or("field", |p| display_name(tree, p, edit))
        }
        MethodDeclaration => "method",
        ConversionOperatorDeclaration => "conversion operator",
        OperatorDeclaration => "operator",
        ConstructorDeclaration => "constructor",
        DestructorDeclaration => "destructor",
        PropertyDeclaration if has_backing_field(tree, node) => "auto-property",
        PropertyDeclaration => "property",
        IndexerDeclaration => "indexer",
        EventDeclaration => "event",
        EnumMemberDeclaration => "enum value",
        GetAccessorDeclaration if owner_is_indexer(tree, node) => "indexer getter",
        GetAccessorDeclaration => "property getter",
        SetAccessorDeclaration if owner_is_indexer(tree, node) => "indexer setter",
        SetAccessorDeclaration => "property setter",
        AddAccessorDeclaration | RemoveAccessorDeclaration => "event accessor",
        TypeParameterConstraintClause => "type constraint",
        TypeParameterList | TypeParameter => "type parameter",
        ParameterList | BracketedParameterList | Parameter => "parameter",
        AttributeList if edit == EditKind::Update => "attribute target",
        AttributeList | Attribute => "attribute",
        BaseConstructorInitializer | ThisConstructorInitializer => "constructor",
        _ => "declaration",
    }
}

fn owner_is_indexer(tree: &SyntaxTree, accessor: NodeId) -> bool {
    tree.parent(accessor)
        .and_then(|list| tree.parent(list))
        .is_some_and(|owner| tree.kind(owner) == SyntaxKind::IndexerDeclaration)
}

/// Отображаемое имя инструкции или выражения внутри тела.
pub fn statement_display_name(tree: &SyntaxTree, node: NodeId) -> &'static str {
    use SyntaxKind::*;
    match tree.kind(node) {
        TryStatement => "try block",
        CatchClause => "catch clause",
        CatchFilterClause => "filter clause",
        FinallyClause => "finally clause",
        FixedStatement => "fixed statement",
        UsingStatement => "using statement",
        LockStatement => "lock statement",
        ForEachStatement => "foreach statement",
        CheckedStatement => "checked statement",
        UncheckedStatement => "unchecked statement",
        YieldReturnStatement | YieldBreakStatement => "yield statement",
        AwaitExpression => "await expression",
        ParenthesizedLambdaExpression | SimpleLambdaExpression => "lambda",
        AnonymousMethodExpression => "anonymous method",
        FromClause => "from clause",
        JoinClause => "join clause",
        LetClause => "let clause",
        WhereClause => "where clause",
        SelectClause => "select clause",
        GroupClause => "groupby clause",
        _ => "statement",
    }
}

/// Имя по категории вида: объявления берутся из таблицы верхнего уровня.
pub fn display_name(tree: &SyntaxTree, node: NodeId, edit: EditKind) -> &'static str {
    let kind = tree.kind(node);
    let in_body = kind.is_statement()
        || kind.is_expression()
        || (matches!(kind, SyntaxKind::VariableDeclarator | SyntaxKind::VariableDeclaration)
            && tree.ancestors(node).any(|a| tree.kind(a).is_statement()));
    if in_body {
        statement_display_name(tree, node)
    } else {
        top_level_display_name(tree, node, edit)
    }
}
