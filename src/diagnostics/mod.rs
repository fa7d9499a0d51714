/*!
# Rude edit diagnostics

`RudeEditDiagnostic` is what the classifier and the active statement tracker
accumulate: a kind, a span, the node it was reported for and its message
arguments. `Diagnostic` is the rendered form handed to the CLI and to callers
that serialize results.

Коды `ENC0001`… стабильны: они выводятся из порядка вариантов `RudeEditKind`,
поэтому новые виды добавляются только в конец.
*/

use crate::ast_core::NodeId;
use crate::core::errors::ErrorLevel;
use crate::core::position::PackedSpan;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub mod spans;

pub use spans::{deleted_node_span, diagnostic_span, display_name, statement_display_name, top_level_display_name};

/// Вид недопустимого изменения.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RudeEditKind {
    Insert,
    Delete,
    Update,
    Move,
    Renamed,
    ModifiersUpdate,
    TypeUpdate,
    TypeKindUpdate,
    AccessorKindUpdate,
    BaseTypeOrInterfaceUpdate,
    EnumUnderlyingTypeUpdate,
    FieldKindUpdate,
    FixedSizeFieldUpdate,
    GenericTypeInitializerUpdate,
    InitializerUpdate,
    VarianceUpdate,
    MethodBodyAdd,
    MethodBodyDelete,
    InsertExtern,
    InsertVirtual,
    InsertOperator,
    InsertGenericMethod,
    StackAllocUpdate,
    AwaitStatementUpdate,
    ActiveStatementUpdate,
    PartiallyExecutedActiveStatementUpdate,
    DeleteActiveStatement,
    InsertAroundActiveStatement,
    DeleteAroundActiveStatement,
    UpdateAroundActiveStatement,
    LambdaExpression,
    QueryExpression,
    AnonymousType,
    AnonymousMethod,
    GenericMethodUpdate,
    GenericTypeUpdate,
}

const SUFFIX: &str = "will prevent the debug session from continuing.";

/// Шаблоны сообщений; `{0}`, `{1}` заменяются аргументами диагностики.
pub static MESSAGE_TEMPLATES: Lazy<HashMap<RudeEditKind, String>> = Lazy::new(|| {
    use RudeEditKind::*;
    let table: &[(RudeEditKind, &str)] = &[
        (Insert, "Adding '{0}'"),
        (Delete, "Deleting '{0}'"),
        (Update, "Updating '{0}'"),
        (Move, "Moving '{0}'"),
        (Renamed, "Renaming '{0}'"),
        (ModifiersUpdate, "Updating the modifiers of '{0}'"),
        (TypeUpdate, "Updating the type of '{0}'"),
        (TypeKindUpdate, "Updating the kind of a type"),
        (AccessorKindUpdate, "Updating the kind of an accessor"),
        (BaseTypeOrInterfaceUpdate, "Updating the base class and/or base interface(s) of '{0}'"),
        (EnumUnderlyingTypeUpdate, "Updating the underlying type of '{0}'"),
        (FieldKindUpdate, "Updating a field to an event or vice versa"),
        (FixedSizeFieldUpdate, "Updating the size of a '{0}'"),
        (GenericTypeInitializerUpdate, "Modifying the initializer of '{0}' in a generic type"),
        (InitializerUpdate, "Updating the initializer of '{0}'"),
        (VarianceUpdate, "Updating the variance of '{0}'"),
        (MethodBodyAdd, "Adding a method body"),
        (MethodBodyDelete, "Deleting a method body"),
        (InsertExtern, "Adding an extern '{0}'"),
        (InsertVirtual, "Adding an abstract '{0}' or overriding an inherited '{0}'"),
        (InsertOperator, "Adding a user defined '{0}'"),
        (InsertGenericMethod, "Adding a generic '{0}'"),
        (StackAllocUpdate, "Modifying '{0}' which contains the 'stackalloc' operator"),
        (AwaitStatementUpdate, "Updating a complex statement containing an await expression"),
        (ActiveStatementUpdate, "Updating an active statement"),
        (PartiallyExecutedActiveStatementUpdate, "Updating an active statement that was partially executed"),
        (DeleteActiveStatement, "Removing an active statement from its method"),
        (InsertAroundActiveStatement, "Adding a '{0}' around an active statement"),
        (DeleteAroundActiveStatement, "Deleting a '{0}' around an active statement"),
        (UpdateAroundActiveStatement, "Updating a '{0}' around an active statement"),
        (LambdaExpression, "Modifying '{0}' which contains a lambda expression"),
        (QueryExpression, "Modifying '{0}' which contains a query expression"),
        (AnonymousType, "Modifying '{0}' which contains an anonymous type"),
        (AnonymousMethod, "Modifying '{0}' which contains an anonymous method"),
        (GenericMethodUpdate, "Modifying a generic method"),
        (GenericTypeUpdate, "Modifying a method inside the context of a generic type"),
    ];
    table.iter().map(|(kind, text)| (*kind, format!("{text} {SUFFIX}"))).collect()
});

impl RudeEditKind {
    /// Стабильный код вида `ENC0001`.
    pub fn code(self) -> String {
        format!("ENC{:04}", self as u16 + 1)
    }

    pub fn template(self) -> &'static str {
        MESSAGE_TEMPLATES.get(&self).map(String::as_str).unwrap_or(SUFFIX)
    }

    /// Сообщение с подставленными аргументами. Недостающие аргументы заменяются пустой строкой.
    pub fn format_message(self, arguments: &[String]) -> String {
        let mut message = self.template().to_string();
        for i in 0..2 {
            let placeholder = format!("{{{i}}}");
            if message.contains(&placeholder) {
                message = message.replace(&placeholder, arguments.get(i).map_or("", String::as_str));
            }
        }
        message
    }
}

impl fmt::Display for RudeEditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Сторона дерева, к которой относится узел.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeSide {
    Old,
    New,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    pub side: TreeSide,
    pub id: NodeId,
}

impl NodeRef {
    pub fn old(id: NodeId) -> Self { Self { side: TreeSide::Old, id } }
    pub fn new(id: NodeId) -> Self { Self { side: TreeSide::New, id } }
}

/// Недопустимое изменение, найденное анализом.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RudeEditDiagnostic {
    pub kind: RudeEditKind,
    pub span: PackedSpan,
    pub node: NodeRef,
    /// Первый аргумент, если есть, это отображаемое имя узла.
    pub arguments: Vec<String>,
}

impl RudeEditDiagnostic {
    pub fn new(kind: RudeEditKind, span: PackedSpan, node: NodeRef, arguments: Vec<String>) -> Self {
        Self { kind, span, node, arguments }
    }

    pub fn display_name(&self) -> Option<&str> {
        self.arguments.first().map(String::as_str)
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic {
            code: self.kind.code(),
            kind: self.kind,
            level: ErrorLevel::Error,
            span: (self.span.start, self.span.len),
            display_name: self.display_name().map(str::to_string),
            arguments: self.arguments.clone(),
            message: self.kind.format_message(&self.arguments),
        }
    }
}

/// Диагностика в виде для вывода.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: String,
    pub kind: RudeEditKind,
    pub level: ErrorLevel,
    /// (начало, длина)
    pub span: (u32, u32),
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub arguments: Vec<String>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (start, len) = self.span;
        write!(f, "{} {} [{}..{}): {}", self.code, self.level, start, start + len, self.message)
    }
}
