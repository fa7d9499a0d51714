//! Node labels: the coarse equality classes used by the matcher.
//!
//! Два узла с разными метками никогда не сопоставляются. Узлы без метки не
//! попадают в последовательности детей: в режиме тел они "распрямляются"
//! (их помеченные потомки встают на их место), на верхнем уровне они
//! считаются частью значения родителя и не обходятся вовсе.

use crate::ast_core::{KindCategory, NodeId, SyntaxKind, SyntaxTree};
use serde::Serialize;

/// Метки объявлений.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TopLabel {
    CompilationUnit,
    Namespace,
    ExternAlias,
    UsingDirective,
    /// class, struct и interface делят одну метку.
    TypeDeclaration,
    EnumDeclaration,
    DelegateDeclaration,
    FieldDeclaration,
    EventFieldDeclaration,
    FieldVariableDeclaration,
    FieldVariableDeclarator,
    Method,
    Operator,
    ConversionOperator,
    Constructor,
    Destructor,
    Property,
    Indexer,
    Event,
    EnumMember,
    AccessorList,
    Accessor,
    TypeParameterList,
    TypeParameter,
    ConstraintClause,
    ParameterList,
    Parameter,
    AttributeList,
    Attribute,
}

/// Метки инструкций внутри тел.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum StatementLabel {
    ConstructorDeclaration,
    ConstructorInitializer,
    Block,
    CheckedStatement,
    UnsafeStatement,
    TryStatement,
    CatchClause,
    CatchFilterClause,
    FinallyClause,
    ForStatement,
    ForEachStatement,
    UsingStatement,
    FixedStatement,
    LockStatement,
    WhileStatement,
    DoStatement,
    IfStatement,
    ElseClause,
    SwitchStatement,
    SwitchSection,
    YieldStatement,
    LabeledStatement,
    LocalDeclarationStatement,
    LocalVariableDeclaration,
    LocalVariableDeclarator,
    AwaitExpression,
    Lambda,
    FromClause,
    LetClause,
    WhereClause,
    JoinClause,
    SelectClause,
    GroupClause,
    OtherStatement,
    /// Листья-операнды (идентификаторы и литералы).
    Operand,
}

/// Режим сопоставления: объявления или тело члена.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchMode {
    TopLevel,
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Label {
    Top(TopLabel),
    Statement(StatementLabel),
}

/// Может ли узел этого вида стоять среди объявлений. Блок допустим как тело члена.
pub fn fits_declarations(kind: SyntaxKind) -> bool {
    kind == SyntaxKind::Block || !kind.is_statement()
}

/// Может ли узел этого вида стоять внутри тела.
pub fn fits_body(kind: SyntaxKind) -> bool {
    use SyntaxKind::*;
    match kind.category() {
        KindCategory::Statement | KindCategory::Expression => true,
        KindCategory::Declaration => matches!(
            kind,
            VariableDeclaration | VariableDeclarator | EqualsValueClause | ArrowExpressionClause | BracketedArgumentList
                | ParameterList | BracketedParameterList | Parameter
        ),
    }
}

/// Метка объявления. Инструкции сюда попадать не должны: тела на верхнем уровне не обходятся.
pub fn top_label(kind: SyntaxKind) -> Option<TopLabel> {
    use SyntaxKind::*;
    let label = match kind {
        CompilationUnit => TopLabel::CompilationUnit,
        NamespaceDeclaration => TopLabel::Namespace,
        ExternAliasDirective => TopLabel::ExternAlias,
        UsingDirective => TopLabel::UsingDirective,
        ClassDeclaration | StructDeclaration | InterfaceDeclaration => TopLabel::TypeDeclaration,
        EnumDeclaration => TopLabel::EnumDeclaration,
        DelegateDeclaration => TopLabel::DelegateDeclaration,
        FieldDeclaration => TopLabel::FieldDeclaration,
        EventFieldDeclaration => TopLabel::EventFieldDeclaration,
        VariableDeclaration => TopLabel::FieldVariableDeclaration,
        VariableDeclarator => TopLabel::FieldVariableDeclarator,
        MethodDeclaration => TopLabel::Method,
        OperatorDeclaration => TopLabel::Operator,
        ConversionOperatorDeclaration => TopLabel::ConversionOperator,
        ConstructorDeclaration => TopLabel::Constructor,
        DestructorDeclaration => TopLabel::Destructor,
        PropertyDeclaration => TopLabel::Property,
        IndexerDeclaration => TopLabel::Indexer,
        EventDeclaration => TopLabel::Event,
        EnumMemberDeclaration => TopLabel::EnumMember,
        AccessorList => TopLabel::AccessorList,
        GetAccessorDeclaration | SetAccessorDeclaration | AddAccessorDeclaration | RemoveAccessorDeclaration => {
            TopLabel::Accessor
        }
        TypeParameterList => TopLabel::TypeParameterList,
        TypeParameter => TopLabel::TypeParameter,
        TypeParameterConstraintClause => TopLabel::ConstraintClause,
        ParameterList | BracketedParameterList => TopLabel::ParameterList,
        Parameter => TopLabel::Parameter,
        AttributeList => TopLabel::AttributeList,
        Attribute => TopLabel::Attribute,

        // Тела, инициализаторы и прочее входят в значение родителя.
        Block | ArrowExpressionClause | EqualsValueClause | BaseList | BracketedArgumentList
        | BaseConstructorInitializer | ThisConstructorInitializer => return None,
        k if k.is_expression() => return None,
        k => unreachable!("statement kind {k:?} reached the declaration labeler"),
    };
    Some(label)
}

/// Метка инструкции. Объявления членов внутри тел недопустимы.
pub fn statement_label(kind: SyntaxKind) -> Option<StatementLabel> {
    use SyntaxKind::*;
    let label = match kind {
        ConstructorDeclaration => StatementLabel::ConstructorDeclaration,
        BaseConstructorInitializer | ThisConstructorInitializer => StatementLabel::ConstructorInitializer,
        Block => StatementLabel::Block,
        CheckedStatement | UncheckedStatement => StatementLabel::CheckedStatement,
        UnsafeStatement => StatementLabel::UnsafeStatement,
        TryStatement => StatementLabel::TryStatement,
        CatchClause => StatementLabel::CatchClause,
        CatchFilterClause => StatementLabel::CatchFilterClause,
        FinallyClause => StatementLabel::FinallyClause,
        ForStatement => StatementLabel::ForStatement,
        ForEachStatement => StatementLabel::ForEachStatement,
        UsingStatement => StatementLabel::UsingStatement,
        FixedStatement => StatementLabel::FixedStatement,
        LockStatement => StatementLabel::LockStatement,
        WhileStatement => StatementLabel::WhileStatement,
        DoStatement => StatementLabel::DoStatement,
        IfStatement => StatementLabel::IfStatement,
        ElseClause => StatementLabel::ElseClause,
        SwitchStatement => StatementLabel::SwitchStatement,
        SwitchSection => StatementLabel::SwitchSection,
        YieldReturnStatement | YieldBreakStatement => StatementLabel::YieldStatement,
        LabeledStatement => StatementLabel::LabeledStatement,
        LocalDeclarationStatement => StatementLabel::LocalDeclarationStatement,
        VariableDeclaration => StatementLabel::LocalVariableDeclaration,
        VariableDeclarator => StatementLabel::LocalVariableDeclarator,
        AwaitExpression => StatementLabel::AwaitExpression,
        ParenthesizedLambdaExpression | SimpleLambdaExpression | AnonymousMethodExpression => StatementLabel::Lambda,
        FromClause => StatementLabel::FromClause,
        LetClause => StatementLabel::LetClause,
        WhereClause => StatementLabel::WhereClause,
        JoinClause => StatementLabel::JoinClause,
        SelectClause => StatementLabel::SelectClause,
        GroupClause => StatementLabel::GroupClause,
        ExpressionStatement | ReturnStatement | ThrowStatement | EmptyStatement | GotoStatement | BreakStatement
        | ContinueStatement => StatementLabel::OtherStatement,
        IdentifierName | LiteralExpression => StatementLabel::Operand,

        CaseSwitchLabel | DefaultSwitchLabel | EqualsValueClause | ArrowExpressionClause | BracketedArgumentList
        | ParameterList | BracketedParameterList | Parameter => return None,
        k if k.is_expression() => return None,
        k => unreachable!("member declaration {k:?} inside a body"),
    };
    Some(label)
}

pub fn label(tree: &SyntaxTree, id: NodeId, mode: MatchMode) -> Option<Label> {
    let kind = tree.kind(id);
    match mode {
        MatchMode::TopLevel => top_label(kind).map(Label::Top),
        MatchMode::Body => statement_label(kind).map(Label::Statement),
    }
}

/// Непосредственные "структурные" дети узла с учётом режима.
/// У конструктора в режиме тел учитываются только инициализатор и блок.
fn structural_children(tree: &SyntaxTree, id: NodeId, mode: MatchMode) -> Vec<NodeId> {
    if mode == MatchMode::Body && tree.kind(id) == SyntaxKind::ConstructorDeclaration {
        return tree
            .children(id)
            .filter(|c| tree.kind(*c).is_constructor_initializer() || tree.kind(*c) == SyntaxKind::Block)
            .collect();
    }
    tree.child_vec(id)
}

/// Помеченные дети узла в порядке следования.
pub fn labeled_children(tree: &SyntaxTree, id: NodeId, mode: MatchMode) -> Vec<NodeId> {
    let mut out = Vec::new();
    collect_labeled(tree, id, mode, &mut out);
    out
}

fn collect_labeled(tree: &SyntaxTree, id: NodeId, mode: MatchMode, out: &mut Vec<NodeId>) {
    for child in structural_children(tree, id, mode) {
        if label(tree, child, mode).is_some() {
            out.push(child);
        } else if mode == MatchMode::Body {
            collect_labeled(tree, child, mode, out);
        }
    }
}

/// Все помеченные потомки корня в прямом порядке (корень не входит).
pub fn labeled_descendants(tree: &SyntaxTree, root: NodeId, mode: MatchMode) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = labeled_children(tree, root, mode).into_iter().rev().collect();
    while let Some(id) = stack.pop() {
        out.push(id);
        stack.extend(labeled_children(tree, id, mode).into_iter().rev());
    }
    out
}

/// Ближайший помеченный предок в пределах корня сопоставления (или сам корень).
pub fn labeled_parent(tree: &SyntaxTree, id: NodeId, root: NodeId, mode: MatchMode) -> Option<NodeId> {
    if id == root { return None; }
    tree.ancestors(id).find(|a| *a == root || label(tree, *a, mode).is_some())
}
