/*!
# Member bodies and statement shapes

Table-driven helpers over the fixed child layout that trees are expected to follow.
The layout is the contract between tree producers (the builder, JSON interchange)
and the analysis:

| Kind | Payload | Children |
|------|---------|----------|
| method, operator, conversion | decl (name, return type, modifiers, interface) | attribute lists, type parameter list?, parameter list, constraint clauses, block or arrow clause? |
| constructor | decl (name, modifiers) | attribute lists, parameter list, initializer?, block? |
| destructor | decl | parameter list, block |
| property | decl (name, type, modifiers, interface) | attribute lists, accessor list or arrow clause, equals-value initializer? |
| indexer | decl (type, modifiers, interface) | bracketed parameter list, accessor list or arrow clause |
| accessor | decl (modifiers) | attribute lists, block or arrow clause? |
| field, event field | decl (modifiers) | attribute lists, variable declaration |
| variable declaration | decl (type) | declarators |
| declarator | decl (name) | equals-value clause or bracketed argument list? |
| if | | condition, statement, else clause? |
| while | | condition, statement |
| do | | statement, condition |
| switch, lock | | expression, sections / statement |
| foreach | decl (type, variable name) | expression, statement |
| using | | variable declaration or expression, statement |
| fixed | | variable declaration, statement |
| try | | block, catch clauses, finally clause? |
| catch | decl (exception type, variable?) | filter clause?, block |
*/

use super::{NodeId, SyntaxKind, SyntaxTree};
use crate::ast_core::Modifiers;

/// Тело объявления: блок, стрелочное тело или инициализатор.
pub fn declaration_body(tree: &SyntaxTree, decl: NodeId) -> Option<NodeId> {
    use SyntaxKind::*;
    match tree.kind(decl) {
        VariableDeclarator => tree.first_child_of_kind(decl, EqualsValueClause),
        PropertyDeclaration => tree
            .first_child_of_kind(decl, ArrowExpressionClause)
            .or_else(|| tree.first_child_of_kind(decl, EqualsValueClause)),
        IndexerDeclaration => tree.first_child_of_kind(decl, ArrowExpressionClause),
        k if k.is_method_like() => tree.children(decl).find(|c| matches!(tree.kind(*c), Block | ArrowExpressionClause)),
        _ => None,
    }
}

/// Корень сопоставления тела. Конструктор сопоставляется целиком, чтобы
/// инициализатор и блок были отдельными узлами.
pub fn body_match_root(tree: &SyntaxTree, decl: NodeId) -> Option<NodeId> {
    if tree.kind(decl) == SyntaxKind::ConstructorDeclaration {
        let has_body = constructor_initializer(tree, decl).is_some() || declaration_body(tree, decl).is_some();
        return has_body.then_some(decl);
    }
    declaration_body(tree, decl)
}

pub fn constructor_initializer(tree: &SyntaxTree, ctor: NodeId) -> Option<NodeId> {
    tree.children(ctor).find(|c| tree.kind(*c).is_constructor_initializer())
}

/// Параметры типа объявления.
pub fn arity(tree: &SyntaxTree, decl: NodeId) -> usize {
    tree.first_child_of_kind(decl, SyntaxKind::TypeParameterList)
        .map_or(0, |list| tree.children_of_kind(list, SyntaxKind::TypeParameter).count())
}

fn parameter_list(tree: &SyntaxTree, decl: NodeId) -> Option<NodeId> {
    tree.children(decl)
        .find(|c| matches!(tree.kind(*c), SyntaxKind::ParameterList | SyntaxKind::BracketedParameterList))
}

pub fn parameters(tree: &SyntaxTree, decl: NodeId) -> Vec<NodeId> {
    parameter_list(tree, decl)
        .map(|list| tree.children_of_kind(list, SyntaxKind::Parameter).collect())
        .unwrap_or_default()
}

/// Типы параметров в порядке объявления (часть сигнатуры перегрузки).
pub fn parameter_types<'t>(tree: &'t SyntaxTree, decl: NodeId) -> Vec<&'t str> {
    parameters(tree, decl).into_iter().map(|p| tree.type_text(p).unwrap_or("")).collect()
}

pub fn is_parameterless_constructor(tree: &SyntaxTree, node: NodeId) -> bool {
    tree.kind(node) == SyntaxKind::ConstructorDeclaration && parameters(tree, node).is_empty()
}

/// Ближайший объемлющий class/struct/interface (сам узел не учитывается).
pub fn containing_type(tree: &SyntaxTree, node: NodeId) -> Option<NodeId> {
    tree.ancestors(node).find(|a| tree.kind(*a).is_type_declaration())
}

/// Член, которому принадлежит узел: методоподобное объявление, свойство или
/// декларатор поля. Для самого объявления поля берётся первый декларатор.
pub fn containing_member(tree: &SyntaxTree, node: NodeId) -> Option<NodeId> {
    use SyntaxKind::*;
    let mut cur = Some(node);
    while let Some(n) = cur {
        match tree.kind(n) {
            k if k.is_method_like() => return Some(n),
            PropertyDeclaration | IndexerDeclaration => return Some(n),
            FieldDeclaration | EventFieldDeclaration => {
                let decl = tree.first_child_of_kind(n, VariableDeclaration)?;
                return tree.first_child_of_kind(decl, VariableDeclarator);
            }
            VariableDeclarator if is_field_declarator(tree, n) => return Some(n),
            ClassDeclaration | StructDeclaration | InterfaceDeclaration | NamespaceDeclaration | CompilationUnit => return None,
            _ => {}
        }
        cur = tree.parent(n);
    }
    None
}

pub fn is_field_declarator(tree: &SyntaxTree, node: NodeId) -> bool {
    tree.kind(node) == SyntaxKind::VariableDeclarator
        && tree.parent(node).and_then(|p| tree.parent(p)).is_some_and(|f| {
            matches!(tree.kind(f), SyntaxKind::FieldDeclaration | SyntaxKind::EventFieldDeclaration)
        })
}

/// Модификаторы члена с учётом того, что у декларатора они хранятся в объявлении поля.
pub fn member_modifiers(tree: &SyntaxTree, member: NodeId) -> Modifiers {
    if tree.kind(member) == SyntaxKind::VariableDeclarator {
        return tree.parent(member).and_then(|p| tree.parent(p)).map(|f| tree.modifiers(f)).unwrap_or_default();
    }
    tree.modifiers(member)
}

pub fn is_static_member(tree: &SyntaxTree, member: NodeId) -> bool {
    member_modifiers(tree, member).contains(Modifiers::STATIC)
}

/// Член или любой объемлющий тип имеет параметры типа.
pub fn is_generic_context(tree: &SyntaxTree, member: NodeId) -> bool {
    arity(tree, member) > 0 || tree.ancestors(member).any(|a| tree.kind(a).is_type_declaration() && arity(tree, a) > 0)
}

/// Автосвойство: нет тела-выражения, у всех аксессоров нет тела.
pub fn has_backing_field(tree: &SyntaxTree, property: NodeId) -> bool {
    if tree.first_child_of_kind(property, SyntaxKind::ArrowExpressionClause).is_some() { return false; }
    let Some(list) = tree.first_child_of_kind(property, SyntaxKind::AccessorList) else { return false };
    tree.children(list).all(|acc| declaration_body(tree, acc).is_none())
}

/// Тело геттера свойства/индексатора: стрелочное тело или тело `get`.
pub fn effective_getter_body(tree: &SyntaxTree, property: NodeId) -> Option<NodeId> {
    if let Some(arrow) = tree.first_child_of_kind(property, SyntaxKind::ArrowExpressionClause) {
        return Some(arrow);
    }
    let list = tree.first_child_of_kind(property, SyntaxKind::AccessorList)?;
    let getter = tree.first_child_of_kind(list, SyntaxKind::GetAccessorDeclaration)?;
    declaration_body(tree, getter)
}

/// Выражение, определяющее поведение активной инструкции (условие, выражение switch/lock и т.п.).
pub fn governing_expression(tree: &SyntaxTree, statement: NodeId) -> Option<NodeId> {
    use SyntaxKind::*;
    match tree.kind(statement) {
        IfStatement | WhileStatement | SwitchStatement | LockStatement | ForEachStatement | FixedStatement => {
            tree.children(statement).next()
        }
        DoStatement => tree.children(statement).nth(1),
        UsingStatement => tree.children(statement).next().filter(|c| !tree.kind(*c).is_statement()),
        _ => None,
    }
}

/// Вложенная инструкция (последний ребёнок для циклов, lock, using, fixed).
pub fn embedded_statement(tree: &SyntaxTree, statement: NodeId) -> Option<NodeId> {
    use SyntaxKind::*;
    match tree.kind(statement) {
        DoStatement => tree.children(statement).next(),
        WhileStatement | ForStatement | ForEachStatement | LockStatement | UsingStatement | FixedStatement
        | LabeledStatement | CheckedStatement | UncheckedStatement | UnsafeStatement => {
            tree.children(statement).last().filter(|c| tree.kind(*c).is_statement())
        }
        IfStatement => tree.children(statement).nth(1),
        _ => None,
    }
}

pub fn catch_clauses(tree: &SyntaxTree, try_stmt: NodeId) -> Vec<NodeId> {
    tree.children_of_kind(try_stmt, SyntaxKind::CatchClause).collect()
}

pub fn finally_clause(tree: &SyntaxTree, try_stmt: NodeId) -> Option<NodeId> {
    tree.first_child_of_kind(try_stmt, SyntaxKind::FinallyClause)
}

/// Имена переменных, объявленных в `VariableDeclaration` (для using/fixed).
pub fn declared_identifiers<'t>(tree: &'t SyntaxTree, declaration: NodeId) -> Vec<&'t str> {
    tree.children_of_kind(declaration, SyntaxKind::VariableDeclarator)
        .map(|d| tree.name(d).unwrap_or(""))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast_core::{DeclInfo, TreeBuilder};

    fn class_with_members() -> SyntaxTree {
        let mut b = TreeBuilder::new();
        b.start_node(SyntaxKind::CompilationUnit);
        b.start_decl(SyntaxKind::ClassDeclaration, DeclInfo::named("C"));
        b.start_node(SyntaxKind::TypeParameterList);
        b.leaf_decl(SyntaxKind::TypeParameter, DeclInfo::named("T"));
        b.finish_node();
        // C(int x) : base() { }
        b.start_decl(SyntaxKind::ConstructorDeclaration, DeclInfo::named("C"));
        b.start_node(SyntaxKind::ParameterList);
        b.leaf_decl(SyntaxKind::Parameter, DeclInfo::named("x").with_type("int"));
        b.finish_node();
        b.start_node(SyntaxKind::BaseConstructorInitializer);
        b.finish_node();
        b.start_node(SyntaxKind::Block);
        b.finish_node();
        b.finish_node();
        // int P { get; set; }
        b.start_decl(SyntaxKind::PropertyDeclaration, DeclInfo::named("P").with_type("int"));
        b.start_node(SyntaxKind::AccessorList);
        b.leaf_decl(SyntaxKind::GetAccessorDeclaration, DeclInfo::new());
        b.leaf_decl(SyntaxKind::SetAccessorDeclaration, DeclInfo::new());
        b.finish_node();
        b.finish_node();
        // static int F = 1;
        b.start_decl(SyntaxKind::FieldDeclaration, DeclInfo::new().with_modifiers(Modifiers::STATIC));
        b.start_decl(SyntaxKind::VariableDeclaration, DeclInfo::new().with_type("int"));
        b.start_decl(SyntaxKind::VariableDeclarator, DeclInfo::named("F"));
        b.start_node(SyntaxKind::EqualsValueClause);
        b.literal("1");
        b.finish_node();
        b.finish_node();
        b.finish_node();
        b.finish_node();
        b.finish_node();
        b.finish_node();
        b.build().unwrap()
    }

    fn find(tree: &SyntaxTree, kind: SyntaxKind) -> NodeId {
        tree.preorder(tree.root()).find(|id| tree.kind(*id) == kind).unwrap()
    }

    #[test]
    fn constructor_is_its_own_match_root() {
        let tree = class_with_members();
        let ctor = find(&tree, SyntaxKind::ConstructorDeclaration);
        assert_eq!(body_match_root(&tree, ctor), Some(ctor));
        assert!(constructor_initializer(&tree, ctor).is_some());
        assert!(!is_parameterless_constructor(&tree, ctor));
        assert_eq!(parameter_types(&tree, ctor), vec!["int"]);
        assert!(is_generic_context(&tree, ctor));
    }

    #[test]
    fn field_and_property_helpers() {
        let tree = class_with_members();
        let prop = find(&tree, SyntaxKind::PropertyDeclaration);
        assert!(has_backing_field(&tree, prop));
        assert_eq!(declaration_body(&tree, prop), None);

        let declarator = find(&tree, SyntaxKind::VariableDeclarator);
        assert!(is_field_declarator(&tree, declarator));
        assert!(is_static_member(&tree, declarator));
        let lit = find(&tree, SyntaxKind::LiteralExpression);
        assert_eq!(containing_member(&tree, lit), Some(declarator));
        assert_eq!(declaration_body(&tree, declarator), Some(find(&tree, SyntaxKind::EqualsValueClause)));

        let class = find(&tree, SyntaxKind::ClassDeclaration);
        assert_eq!(containing_type(&tree, declarator), Some(class));
        assert_eq!(arity(&tree, class), 1);
    }
}
