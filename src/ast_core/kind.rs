//! Syntax kinds understood by the analyzer.
//!
//! Один плоский enum вместо иерархии классов узлов: все таблицы (метки,
//! классификатор, диагностические span'ы) сопоставляются с ним исчерпывающим
//! `match`, поэтому добавление нового вида ломает сборку, а не поведение.

use serde::{Deserialize, Serialize};

/// Вид синтаксического узла.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SyntaxKind {
    // --- Declarations ---
    CompilationUnit,
    ExternAliasDirective,
    UsingDirective,
    NamespaceDeclaration,
    ClassDeclaration,
    StructDeclaration,
    InterfaceDeclaration,
    EnumDeclaration,
    DelegateDeclaration,
    BaseList,
    FieldDeclaration,
    EventFieldDeclaration,
    VariableDeclaration,
    VariableDeclarator,
    BracketedArgumentList,
    MethodDeclaration,
    ConversionOperatorDeclaration,
    OperatorDeclaration,
    ConstructorDeclaration,
    BaseConstructorInitializer,
    ThisConstructorInitializer,
    DestructorDeclaration,
    PropertyDeclaration,
    IndexerDeclaration,
    EventDeclaration,
    EnumMemberDeclaration,
    AccessorList,
    GetAccessorDeclaration,
    SetAccessorDeclaration,
    AddAccessorDeclaration,
    RemoveAccessorDeclaration,
    TypeParameterList,
    TypeParameter,
    TypeParameterConstraintClause,
    ParameterList,
    BracketedParameterList,
    Parameter,
    AttributeList,
    Attribute,
    ArrowExpressionClause,
    EqualsValueClause,

    // --- Statements ---
    Block,
    LocalDeclarationStatement,
    ExpressionStatement,
    ReturnStatement,
    ThrowStatement,
    EmptyStatement,
    IfStatement,
    ElseClause,
    WhileStatement,
    DoStatement,
    ForStatement,
    ForEachStatement,
    SwitchStatement,
    SwitchSection,
    CaseSwitchLabel,
    DefaultSwitchLabel,
    TryStatement,
    CatchClause,
    CatchFilterClause,
    FinallyClause,
    UsingStatement,
    FixedStatement,
    LockStatement,
    CheckedStatement,
    UncheckedStatement,
    UnsafeStatement,
    LabeledStatement,
    GotoStatement,
    BreakStatement,
    ContinueStatement,
    YieldReturnStatement,
    YieldBreakStatement,

    // --- Expressions ---
    IdentifierName,
    LiteralExpression,
    BinaryExpression,
    PrefixUnaryExpression,
    AssignmentExpression,
    InvocationExpression,
    MemberAccessExpression,
    ElementAccessExpression,
    ObjectCreationExpression,
    ConditionalExpression,
    ParenthesizedExpression,
    AwaitExpression,
    ParenthesizedLambdaExpression,
    SimpleLambdaExpression,
    AnonymousMethodExpression,
    QueryExpression,
    FromClause,
    LetClause,
    JoinClause,
    WhereClause,
    SelectClause,
    GroupClause,
    AnonymousObjectCreationExpression,
    StackAllocArrayCreationExpression,
}

/// Грубая категория вида: на ней держатся проверки инвариантов в лейблерах.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindCategory {
    /// Объявления и их вспомогательные узлы (списки параметров, атрибуты и т.п.)
    Declaration,
    /// Инструкции и их клаузы (catch, else, switch section)
    Statement,
    Expression,
}

impl SyntaxKind {
    pub fn category(self) -> KindCategory {
        use SyntaxKind::*;
        match self {
            CompilationUnit | ExternAliasDirective | UsingDirective | NamespaceDeclaration
            | ClassDeclaration | StructDeclaration | InterfaceDeclaration | EnumDeclaration
            | DelegateDeclaration | BaseList | FieldDeclaration | EventFieldDeclaration
            | VariableDeclaration | VariableDeclarator | BracketedArgumentList | MethodDeclaration
            | ConversionOperatorDeclaration | OperatorDeclaration | ConstructorDeclaration
            | BaseConstructorInitializer | ThisConstructorInitializer | DestructorDeclaration
            | PropertyDeclaration | IndexerDeclaration | EventDeclaration | EnumMemberDeclaration
            | AccessorList | GetAccessorDeclaration | SetAccessorDeclaration
            | AddAccessorDeclaration | RemoveAccessorDeclaration | TypeParameterList
            | TypeParameter | TypeParameterConstraintClause | ParameterList
            | BracketedParameterList | Parameter | AttributeList | Attribute
            | ArrowExpressionClause | EqualsValueClause => KindCategory::Declaration,

            Block | LocalDeclarationStatement | ExpressionStatement | ReturnStatement
            | ThrowStatement | EmptyStatement | IfStatement | ElseClause | WhileStatement
            | DoStatement | ForStatement | ForEachStatement | SwitchStatement | SwitchSection
            | CaseSwitchLabel | DefaultSwitchLabel | TryStatement | CatchClause
            | CatchFilterClause | FinallyClause | UsingStatement | FixedStatement
            | LockStatement | CheckedStatement | UncheckedStatement | UnsafeStatement
            | LabeledStatement | GotoStatement | BreakStatement | ContinueStatement
            | YieldReturnStatement | YieldBreakStatement => KindCategory::Statement,

            IdentifierName | LiteralExpression | BinaryExpression | PrefixUnaryExpression
            | AssignmentExpression | InvocationExpression | MemberAccessExpression
            | ElementAccessExpression | ObjectCreationExpression | ConditionalExpression
            | ParenthesizedExpression | AwaitExpression | ParenthesizedLambdaExpression
            | SimpleLambdaExpression | AnonymousMethodExpression | QueryExpression | FromClause
            | LetClause | JoinClause | WhereClause | SelectClause | GroupClause
            | AnonymousObjectCreationExpression | StackAllocArrayCreationExpression => {
                KindCategory::Expression
            }
        }
    }

    pub fn is_statement(self) -> bool { self.category() == KindCategory::Statement }
    pub fn is_expression(self) -> bool { self.category() == KindCategory::Expression }

    pub fn is_type_declaration(self) -> bool {
        matches!(self, SyntaxKind::ClassDeclaration | SyntaxKind::StructDeclaration | SyntaxKind::InterfaceDeclaration)
    }

    pub fn is_accessor(self) -> bool {
        matches!(
            self,
            SyntaxKind::GetAccessorDeclaration
                | SyntaxKind::SetAccessorDeclaration
                | SyntaxKind::AddAccessorDeclaration
                | SyntaxKind::RemoveAccessorDeclaration
        )
    }

    pub fn is_lambda(self) -> bool {
        matches!(
            self,
            SyntaxKind::ParenthesizedLambdaExpression
                | SyntaxKind::SimpleLambdaExpression
                | SyntaxKind::AnonymousMethodExpression
        )
    }

    pub fn is_constructor_initializer(self) -> bool {
        matches!(self, SyntaxKind::BaseConstructorInitializer | SyntaxKind::ThisConstructorInitializer)
    }

    pub fn is_yield(self) -> bool {
        matches!(self, SyntaxKind::YieldReturnStatement | SyntaxKind::YieldBreakStatement)
    }

    pub fn is_checked(self) -> bool {
        matches!(self, SyntaxKind::CheckedStatement | SyntaxKind::UncheckedStatement)
    }

    /// Методоподобные члены с телом-блоком или телом-выражением.
    pub fn is_method_like(self) -> bool {
        matches!(
            self,
            SyntaxKind::MethodDeclaration
                | SyntaxKind::ConversionOperatorDeclaration
                | SyntaxKind::OperatorDeclaration
                | SyntaxKind::ConstructorDeclaration
                | SyntaxKind::DestructorDeclaration
        ) || self.is_accessor()
    }

    /// Длина ведущего ключевого слова (для диагностических span'ов по ключевому слову).
    pub fn keyword_len(self) -> Option<u32> {
        use SyntaxKind::*;
        let kw = match self {
            TryStatement => "try",
            CatchClause => "catch",
            FinallyClause => "finally",
            ElseClause => "else",
            DoStatement => "do",
            CheckedStatement => "checked",
            UncheckedStatement => "unchecked",
            UnsafeStatement => "unsafe",
            ForEachStatement => "foreach",
            AwaitExpression => "await",
            AnonymousObjectCreationExpression => "new",
            AnonymousMethodExpression => "delegate",
            StackAllocArrayCreationExpression => "stackalloc",
            QueryExpression | FromClause => "from",
            JoinClause => "join",
            LetClause => "let",
            WhereClause => "where",
            SelectClause => "select",
            GroupClause => "group",
            GetAccessorDeclaration => "get",
            SetAccessorDeclaration => "set",
            AddAccessorDeclaration => "add",
            RemoveAccessorDeclaration => "remove",
            _ => return None,
        };
        Some(kw.len() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories() {
        assert_eq!(SyntaxKind::MethodDeclaration.category(), KindCategory::Declaration);
        assert!(SyntaxKind::CatchClause.is_statement());
        assert!(SyntaxKind::AwaitExpression.is_expression());
        assert!(SyntaxKind::SetAccessorDeclaration.is_method_like());
        assert!(!SyntaxKind::PropertyDeclaration.is_method_like());
        assert_eq!(SyntaxKind::FinallyClause.keyword_len(), Some(7));
        assert_eq!(SyntaxKind::Block.keyword_len(), None);
    }
}
