/*!
# Edit classification

Turns an `EditScript` into rude edit diagnostics and member-level semantic edits.

Top-level scripts are classified per edit kind and syntax kind: inserts,
deletes, updates, moves and reorders each have their own table. Body scripts
carry no syntactic rude edits of their own; only the suspension point rules of
`state_machine` apply to them.

An insert or delete whose nearest labeled parent carries an edit of the same
kind is skipped: the parent's diagnostic already covers it.
*/

use crate::ast_core::body::{
    arity, constructor_initializer, containing_type, declaration_body, effective_getter_body, is_field_declarator,
    is_generic_context, is_parameterless_constructor, is_static_member,
};
use crate::ast_core::equivalence::are_equivalent_opt;
use crate::ast_core::{walk, Modifiers, NodeId, SyntaxKind, SyntaxTree, VisitControl, Visitor};
use crate::core::cancel::CancellationToken;
use crate::core::errors::Result;
use crate::diagnostics::{deleted_node_span, diagnostic_span, display_name, NodeRef, RudeEditDiagnostic, RudeEditKind};
use crate::matching::label::{labeled_parent, top_label, MatchMode};
use crate::matching::{Edit, EditKind, EditScript, Match};
use serde::Serialize;

pub mod state_machine;

pub use state_machine::{containing_statement_part, has_no_spilled_state, report_state_machine_edits};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SemanticEditKind {
    Insert,
    Update,
    Delete,
}

/// Изменение на уровне члена, передаваемое компилятору.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SemanticEdit {
    pub kind: SemanticEditKind,
    pub old: Option<NodeId>,
    pub new: Option<NodeId>,
}

impl SemanticEdit {
    fn insert(new: NodeId) -> Self { Self { kind: SemanticEditKind::Insert, old: None, new: Some(new) } }
    fn update(old: Option<NodeId>, new: Option<NodeId>) -> Self { Self { kind: SemanticEditKind::Update, old, new } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifyOptions {
    /// Сообщать о лямбдах, запросах, анонимных типах и методах в изменённых телах.
    pub report_unsupported_constructs: bool,
}

impl Default for ClassifyOptions {
    fn default() -> Self { Self { report_unsupported_constructs: true } }
}

#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub diagnostics: Vec<RudeEditDiagnostic>,
    pub semantic_edits: Vec<SemanticEdit>,
}

/// Недопустимые изменения скрипта с настройками по умолчанию.
pub fn classify_edits(
    old: &SyntaxTree,
    new: &SyntaxTree,
    m: &Match,
    script: &EditScript,
    cancel: &CancellationToken,
) -> Result<Vec<RudeEditDiagnostic>> {
    Ok(classify(old, new, m, script, &ClassifyOptions::default(), cancel)?.diagnostics)
}

pub fn classify(
    old: &SyntaxTree,
    new: &SyntaxTree,
    m: &Match,
    script: &EditScript,
    options: &ClassifyOptions,
    cancel: &CancellationToken,
) -> Result<Classification> {
    cancel.check()?;
    if m.mode() == MatchMode::Body {
        let mut out = Classification::default();
        report_state_machine_edits(old, new, m, &mut out.diagnostics);
        return Ok(out);
    }

    let mut classifier = EditClassifier { old, new, m, script, options, out: Classification::default() };
    for edit in script.edits() {
        cancel.check()?;
        if has_parent_edit(old, new, m, script, edit) {
            continue;
        }
        let before = classifier.out.diagnostics.len();
        classifier.classify_edit(*edit);
        if classifier.out.diagnostics.len() == before {
            classifier.record_semantic_edit(*edit);
        }
    }
    tracing::debug!(
        "classified {} edits: {} rude, {} semantic",
        script.len(),
        classifier.out.diagnostics.len(),
        classifier.out.semantic_edits.len()
    );
    Ok(classifier.out)
}

fn has_parent_edit(old: &SyntaxTree, new: &SyntaxTree, m: &Match, script: &EditScript, edit: &Edit) -> bool {
    let mode = m.mode();
    match *edit {
        Edit::Insert(n) => labeled_parent(new, n, m.new_root(), mode).is_some_and(|p| script.has_new_edit(p, EditKind::Insert)),
        Edit::Delete(o) => labeled_parent(old, o, m.old_root(), mode).is_some_and(|p| script.has_old_edit(p, EditKind::Delete)),
        _ => false,
    }
}

struct EditClassifier<'a> {
    old: &'a SyntaxTree,
    new: &'a SyntaxTree,
    m: &'a Match,
    script: &'a EditScript,
    options: &'a ClassifyOptions,
    out: Classification,
}

impl EditClassifier<'_> {
    fn classify_edit(&mut self, edit: Edit) {
        match edit {
            Edit::Insert(n) => self.classify_insert(n),
            Edit::Delete(o) => self.classify_delete(o),
            Edit::Update(o, n) => self.classify_update(o, n),
            Edit::Move(_, n) => self.report_new(RudeEditKind::Move, EditKind::Move, n, n),
            Edit::Reorder(_, n) => self.classify_reorder(n),
        }
    }

    // --- reporting ---

    fn report_new(&mut self, kind: RudeEditKind, edit: EditKind, span_node: NodeId, display_node: NodeId) {
        let span = diagnostic_span(self.new, span_node, edit);
        let name = display_name(self.new, display_node, edit);
        self.out.diagnostics.push(RudeEditDiagnostic::new(kind, span, NodeRef::new(span_node), vec![name.to_string()]));
    }

    fn report_update(&mut self, kind: RudeEditKind, n: NodeId) {
        self.report_new(kind, EditKind::Update, n, n);
    }

    fn report_deleted(&mut self, kind: RudeEditKind, node: NodeId, display_node: NodeId) {
        let span = deleted_node_span(self.old, self.new, self.m, node);
        let name = display_name(self.old, display_node, EditKind::Delete);
        self.out.diagnostics.push(RudeEditDiagnostic::new(kind, span, NodeRef::old(node), vec![name.to_string()]));
    }

    // --- insert ---

    fn classify_insert(&mut self, n: NodeId) {
        use SyntaxKind::*;
        let new = self.new;
        match new.kind(n) {
            ExternAliasDirective | UsingDirective | NamespaceDeclaration | DestructorDeclaration => {
                self.report_new(RudeEditKind::Insert, EditKind::Insert, n, n)
            }
            ClassDeclaration | StructDeclaration => self.report_extern_members(n),
            InterfaceDeclaration | EnumDeclaration | DelegateDeclaration | AccessorList => {}
            PropertyDeclaration | IndexerDeclaration | EventDeclaration => {
                self.check_inserted_modifiers(n, new.modifiers(n));
            }
            k if k.is_accessor() => {
                // модификаторы берутся у владельца списка аксессоров
                let owner = new.parent(n).and_then(|list| new.parent(list));
                self.check_inserted_modifiers(n, owner.map(|o| new.modifiers(o)).unwrap_or_default());
            }
            OperatorDeclaration | ConversionOperatorDeclaration => {
                self.report_new(RudeEditKind::InsertOperator, EditKind::Insert, n, n)
            }
            MethodDeclaration => {
                if self.check_inserted_modifiers(n, new.modifiers(n)) && arity(new, n) > 0 {
                    self.report_new(RudeEditKind::InsertGenericMethod, EditKind::Insert, n, n);
                }
            }
            ConstructorDeclaration if is_parameterless_instance_constructor(new, n) => {}
            ConstructorDeclaration | FieldDeclaration | EventFieldDeclaration => {
                self.check_inserted_modifiers(n, new.modifiers(n));
            }
            VariableDeclaration | VariableDeclarator => {
                let field = new.ancestors(n).find(|a| matches!(new.kind(*a), FieldDeclaration | EventFieldDeclaration));
                self.check_inserted_modifiers(n, field.map(|f| new.modifiers(f)).unwrap_or_default());
            }
            EnumMemberDeclaration | TypeParameterList | TypeParameter | TypeParameterConstraintClause | ParameterList
            | BracketedParameterList | Parameter | AttributeList | Attribute => {
                self.report_new(RudeEditKind::Insert, EditKind::Insert, n, n)
            }
            k => unreachable!("unexpected inserted node {k:?}"),
        }
    }

    /// Возвращает true, если модификаторы допускают вставку.
    fn check_inserted_modifiers(&mut self, n: NodeId, modifiers: Modifiers) -> bool {
        if modifiers.contains(Modifiers::EXTERN) {
            self.report_new(RudeEditKind::InsertExtern, EditKind::Insert, n, n);
            return false;
        }
        if modifiers.is_virtual_like() {
            self.report_new(RudeEditKind::InsertVirtual, EditKind::Insert, n, n);
            return false;
        }
        true
    }

    fn report_extern_members(&mut self, type_decl: NodeId) {
        let new = self.new;
        let externs: Vec<NodeId> = new
            .children(type_decl)
            .filter(|c| {
                let kind = new.kind(*c);
                (kind.is_method_like() || matches!(kind, SyntaxKind::PropertyDeclaration | SyntaxKind::IndexerDeclaration | SyntaxKind::EventDeclaration))
                    && new.modifiers(*c).contains(Modifiers::EXTERN)
            })
            .collect();
        for member in externs {
            self.report_new(RudeEditKind::InsertExtern, EditKind::Insert, member, member);
        }
    }

    // --- delete ---

    fn classify_delete(&mut self, o: NodeId) {
        let old = self.old;
        match old.kind(o) {
            SyntaxKind::ConstructorDeclaration if is_parameterless_instance_constructor(old, o) => {}
            SyntaxKind::AccessorList => self.classify_accessor_list_delete(o),
            k if top_label(k).is_some() => self.report_deleted(RudeEditKind::Delete, o, o),
            k => unreachable!("unexpected deleted node {k:?}"),
        }
    }

    fn classify_accessor_list_delete(&mut self, list: NodeId) {
        let old = self.old;
        if let Some(setter) = old.first_child_of_kind(list, SyntaxKind::SetAccessorDeclaration) {
            self.report_deleted(RudeEditKind::Delete, list, setter);
            return;
        }
        // геттер, заменённый телом-выражением
        let owner_updated = old.parent(list).is_some_and(|p| self.script.has_old_edit(p, EditKind::Update));
        if !owner_updated {
            self.report_deleted(RudeEditKind::Delete, list, list);
        }
    }

    // --- update ---

    fn classify_update(&mut self, o: NodeId, n: NodeId) {
        use RudeEditKind::*;
        use SyntaxKind::*;
        let (old, new) = (self.old, self.new);
        let name_changed = old.name(o) != new.name(n);
        let modifiers_changed = old.modifiers(o) != new.modifiers(n);
        let type_changed = old.type_text(o) != new.type_text(n);
        let interface_changed = old.explicit_interface(o) != new.explicit_interface(n);

        match new.kind(n) {
            NamespaceDeclaration => {
                if name_changed { self.report_update(Renamed, n) }
            }
            ClassDeclaration | StructDeclaration | InterfaceDeclaration => {
                if old.kind(o) != new.kind(n) {
                    self.report_update(TypeKindUpdate, n)
                } else if modifiers_changed {
                    self.report_update(ModifiersUpdate, n)
                } else if name_changed {
                    self.report_update(Renamed, n)
                } else if !self.same_child(o, n, BaseList) {
                    self.report_update(BaseTypeOrInterfaceUpdate, n)
                }
            }
            EnumDeclaration => {
                if name_changed {
                    self.report_update(Renamed, n)
                } else if modifiers_changed {
                    self.report_update(ModifiersUpdate, n)
                } else if type_changed {
                    self.report_update(EnumUnderlyingTypeUpdate, n)
                }
            }
            DelegateDeclaration => {
                if modifiers_changed {
                    self.report_update(ModifiersUpdate, n)
                } else if type_changed {
                    self.report_update(TypeUpdate, n)
                } else if name_changed {
                    self.report_update(Renamed, n)
                }
            }
            FieldDeclaration | EventFieldDeclaration => {
                if old.kind(o) != new.kind(n) {
                    self.report_update(FieldKindUpdate, n)
                } else if modifiers_changed {
                    self.report_update(ModifiersUpdate, n)
                }
            }
            VariableDeclaration => {
                if type_changed { self.report_update(TypeUpdate, n) }
            }
            VariableDeclarator => self.classify_declarator_update(o, n, name_changed),
            MethodDeclaration => {
                let without_async = |m: Modifiers| m.difference(Modifiers::ASYNC);
                if name_changed {
                    self.report_update(Renamed, n)
                } else if without_async(old.modifiers(o)) != without_async(new.modifiers(n)) {
                    self.report_update(ModifiersUpdate, n)
                } else if type_changed {
                    self.report_update(TypeUpdate, n)
                } else if interface_changed {
                    self.report_update(Renamed, n)
                } else {
                    self.classify_body_update(n, declaration_body(old, o), declaration_body(new, n));
                }
            }
            ConversionOperatorDeclaration | OperatorDeclaration => {
                if modifiers_changed {
                    self.report_update(ModifiersUpdate, n)
                } else if name_changed {
                    self.report_update(Renamed, n)
                } else if type_changed {
                    self.report_update(TypeUpdate, n)
                } else {
                    self.classify_body_update(n, declaration_body(old, o), declaration_body(new, n));
                }
            }
            k if k.is_accessor() => {
                if modifiers_changed {
                    self.report_update(ModifiersUpdate, n)
                } else if old.kind(o) != new.kind(n) {
                    self.report_update(AccessorKindUpdate, n)
                } else {
                    self.classify_body_update(n, declaration_body(old, o), declaration_body(new, n));
                }
            }
            EnumMemberDeclaration => {
                if name_changed {
                    self.report_update(Renamed, n)
                } else if !self.same_child(o, n, EqualsValueClause) {
                    self.report_update(InitializerUpdate, n)
                }
            }
            ConstructorDeclaration => {
                if modifiers_changed {
                    self.report_update(ModifiersUpdate, n)
                } else {
                    self.classify_body_update(n, declaration_body(old, o), declaration_body(new, n));
                }
            }
            DestructorDeclaration => self.classify_body_update(n, declaration_body(old, o), declaration_body(new, n)),
            PropertyDeclaration => {
                if modifiers_changed {
                    self.report_update(ModifiersUpdate, n)
                } else if type_changed {
                    self.report_update(TypeUpdate, n)
                } else if name_changed || interface_changed {
                    self.report_update(Renamed, n)
                } else {
                    self.classify_property_body(o, n);
                }
            }
            IndexerDeclaration => {
                if modifiers_changed {
                    self.report_update(ModifiersUpdate, n)
                } else if type_changed {
                    self.report_update(TypeUpdate, n)
                } else if interface_changed {
                    self.report_update(Renamed, n)
                } else if !self.same_child(o, n, ArrowExpressionClause) {
                    self.classify_body_update(n, effective_getter_body(old, o), effective_getter_body(new, n));
                }
            }
            TypeParameter => {
                let variance = |m: Modifiers| m & (Modifiers::IN | Modifiers::OUT);
                if name_changed {
                    self.report_update(Renamed, n)
                } else if variance(old.modifiers(o)) != variance(new.modifiers(n)) {
                    self.report_update(VarianceUpdate, n)
                }
            }
            TypeParameterConstraintClause => {
                if name_changed {
                    self.report_update(Renamed, n)
                } else if type_changed {
                    self.report_update(TypeUpdate, n)
                }
            }
            Parameter => {
                if name_changed {
                    self.report_update(Renamed, n)
                } else if modifiers_changed {
                    self.report_update(ModifiersUpdate, n)
                } else if type_changed {
                    self.report_update(TypeUpdate, n)
                } else if !self.same_child(o, n, EqualsValueClause) {
                    self.report_update(InitializerUpdate, n)
                }
            }
            // у списка атрибутов имя хранит цель (`assembly:`, `return:`)
            AttributeList => {
                if name_changed { self.report_update(Update, n) }
            }
            Attribute | UsingDirective | ExternAliasDirective => self.report_update(Update, n),
            AccessorList | TypeParameterList | ParameterList | BracketedParameterList | EventDeclaration => {}
            k => unreachable!("unexpected updated node {k:?}"),
        }
    }

    fn same_child(&self, o: NodeId, n: NodeId, kind: SyntaxKind) -> bool {
        are_equivalent_opt(self.old, self.old.first_child_of_kind(o, kind), self.new, self.new.first_child_of_kind(n, kind))
    }

    fn classify_declarator_update(&mut self, o: NodeId, n: NodeId, name_changed: bool) {
        use SyntaxKind::*;
        if name_changed {
            self.report_update(RudeEditKind::Renamed, n);
        } else if !self.same_child(o, n, BracketedArgumentList) {
            self.report_update(RudeEditKind::FixedSizeFieldUpdate, n);
        } else if !self.same_child(o, n, EqualsValueClause) {
            if self.in_generic_type(n) {
                self.report_update(RudeEditKind::GenericTypeInitializerUpdate, n);
            } else if let Some(init) = self.new.first_child_of_kind(n, EqualsValueClause) {
                self.scan_body(init, n);
            }
        }
    }

    fn classify_property_body(&mut self, o: NodeId, n: NodeId) {
        let (old, new) = (self.old, self.new);
        if !self.same_child(o, n, SyntaxKind::ArrowExpressionClause) {
            self.classify_body_update(n, effective_getter_body(old, o), effective_getter_body(new, n));
            return;
        }
        if !self.same_child(o, n, SyntaxKind::EqualsValueClause) {
            if self.in_generic_type(n) {
                self.report_update(RudeEditKind::GenericTypeInitializerUpdate, n);
            } else if let Some(init) = new.first_child_of_kind(n, SyntaxKind::EqualsValueClause) {
                self.scan_body(init, n);
            }
        }
    }

    fn in_generic_type(&self, n: NodeId) -> bool {
        containing_type(self.new, n).is_some_and(|t| arity(self.new, t) > 0)
    }

    /// Появление или исчезновение тела, иначе проверка конструкций в новом теле.
    fn classify_body_update(&mut self, member: NodeId, old_body: Option<NodeId>, new_body: Option<NodeId>) {
        match (old_body, new_body) {
            (None, Some(_)) => self.report_update(RudeEditKind::MethodBodyAdd, member),
            (Some(_), None) => self.report_update(RudeEditKind::MethodBodyDelete, member),
            (Some(_), Some(body)) => {
                self.check_generic_body_update(member);
                if self.new.kind(member) == SyntaxKind::ConstructorDeclaration {
                    if let Some(init) = constructor_initializer(self.new, member) {
                        self.scan_body(init, member);
                    }
                }
                self.scan_body(body, member);
            }
            (None, None) => {}
        }
    }

    /// Тела обобщённых методов и членов обобщённых типов не перекомпилируются.
    fn check_generic_body_update(&mut self, member: NodeId) {
        let new = self.new;
        if new.kind(member) == SyntaxKind::MethodDeclaration && arity(new, member) > 0 {
            self.report_update(RudeEditKind::GenericMethodUpdate, member);
        } else if self.in_generic_type(member) {
            self.report_update(RudeEditKind::GenericTypeUpdate, member);
        }
    }

    fn scan_body(&mut self, body: NodeId, member: NodeId) {
        let mut scanner = ConstructScanner {
            generic: is_generic_context(self.new, member),
            report_unsupported: self.options.report_unsupported_constructs,
            found: Vec::new(),
        };
        walk(self.new, body, &mut scanner);
        for (node, kind) in scanner.found {
            self.report_new(kind, EditKind::Update, node, member);
        }
    }

    // --- reorder ---

    fn classify_reorder(&mut self, n: NodeId) {
        use SyntaxKind::*;
        match self.new.kind(n) {
            FieldDeclaration | EventFieldDeclaration | PropertyDeclaration | VariableDeclarator
            | EnumMemberDeclaration | Parameter | TypeParameter => {
                self.report_new(RudeEditKind::Move, EditKind::Reorder, n, n)
            }
            _ => {}
        }
    }

    // --- semantic edits ---

    fn record_semantic_edit(&mut self, edit: Edit) {
        let (old, new) = (self.old, self.new);
        match edit {
            Edit::Insert(n) if is_parameterless_instance_constructor(new, n) => {
                self.out.semantic_edits.push(SemanticEdit::update(None, Some(n)));
            }
            Edit::Insert(n) => {
                let members = inserted_members(new, n);
                self.out.semantic_edits.extend(members.into_iter().map(SemanticEdit::insert));
            }
            Edit::Delete(o) if is_parameterless_instance_constructor(old, o) => {
                self.out.semantic_edits.push(SemanticEdit::update(Some(o), None));
            }
            Edit::Update(o, n) if is_member(new, n) => {
                self.out.semantic_edits.push(SemanticEdit::update(Some(o), Some(n)));
            }
            _ => {}
        }
    }
}

fn is_parameterless_instance_constructor(tree: &SyntaxTree, node: NodeId) -> bool {
    is_parameterless_constructor(tree, node) && !is_static_member(tree, node)
}

/// Член, у которого может меняться тело или инициализатор.
fn is_member(tree: &SyntaxTree, node: NodeId) -> bool {
    let kind = tree.kind(node);
    kind.is_method_like()
        || matches!(kind, SyntaxKind::PropertyDeclaration | SyntaxKind::IndexerDeclaration | SyntaxKind::EventDeclaration)
        || is_field_declarator(tree, node)
}

/// Символы, появляющиеся при вставке узла.
fn inserted_members(tree: &SyntaxTree, node: NodeId) -> Vec<NodeId> {
    use SyntaxKind::*;
    match tree.kind(node) {
        ClassDeclaration | StructDeclaration | InterfaceDeclaration | EnumDeclaration | DelegateDeclaration
        | PropertyDeclaration | IndexerDeclaration | EventDeclaration | VariableDeclarator => vec![node],
        k if k.is_method_like() => vec![node],
        FieldDeclaration | EventFieldDeclaration | VariableDeclaration => tree
            .preorder(node)
            .filter(|d| tree.kind(*d) == VariableDeclarator)
            .collect(),
        _ => Vec::new(),
    }
}

/// Конструкции, которые нельзя менять в теле. Тела лямбд не обходятся.
struct ConstructScanner {
    generic: bool,
    report_unsupported: bool,
    found: Vec<(NodeId, RudeEditKind)>,
}

impl Visitor for ConstructScanner {
    fn enter(&mut self, id: NodeId, tree: &SyntaxTree) -> VisitControl {
        use SyntaxKind::*;
        let kind = match tree.kind(id) {
            StackAllocArrayCreationExpression if self.generic => Some(RudeEditKind::StackAllocUpdate),
            ParenthesizedLambdaExpression | SimpleLambdaExpression => {
                if self.report_unsupported {
                    self.found.push((id, RudeEditKind::LambdaExpression));
                }
                return VisitControl::SkipChildren;
            }
            AnonymousMethodExpression if self.generic => Some(RudeEditKind::AnonymousMethod),
            QueryExpression => Some(RudeEditKind::QueryExpression),
            AnonymousObjectCreationExpression => Some(RudeEditKind::AnonymousType),
            _ => None,
        };
        if let Some(kind) = kind {
            if kind == RudeEditKind::StackAllocUpdate || self.report_unsupported {
                self.found.push((id, kind));
            }
        }
        VisitControl::Continue
    }
}
