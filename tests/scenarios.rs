//! End-to-end edit scenarios through the analysis engine.

mod common;

use common::*;
use enc_analyzer::analyzer::{AnalysisEngine, AnalyzerConfig};
use enc_analyzer::ast_core::json::ActiveStatementSpec;
use enc_analyzer::diagnostics::TreeSide;
use enc_analyzer::{
    ActiveStatement, ActiveStatementFlags, CancellationToken, DeclInfo, Modifiers, RudeEditKind, SemanticEditKind,
    StatementPart, SyntaxKind,
};
use pretty_assertions::assert_eq;

#[test]
fn literal_change_in_body_is_allowed() {
    let old = unit(vec![class("C", vec![method("int", "M", &[], block(vec![ret(lit("1"))]))])]).build();
    let new = unit(vec![class("C", vec![method("int", "M", &[], block(vec![ret(lit("2"))]))])]).build();
    let analysis = analyze(&old, &new);
    assert!(analysis.diagnostics.is_empty());
    assert_eq!(analysis.semantic_edits.len(), 1);
    assert_eq!(analysis.semantic_edits[0].kind, SemanticEditKind::Update);
}

#[test]
fn return_type_change_is_rude() {
    let old = unit(vec![class("C", vec![method("void", "M", &[], block(vec![]))])]).build();
    let new = unit(vec![class("C", vec![method("int", "M", &[], block(vec![]))])]).build();
    let analysis = analyze(&old, &new);
    assert_eq!(kinds(&analysis.diagnostics), vec![RudeEditKind::TypeUpdate]);
    let diagnostic = analysis.diagnostics[0].to_diagnostic();
    assert_eq!(diagnostic.code, RudeEditKind::TypeUpdate.code());
    assert_eq!(diagnostic.display_name.as_deref(), Some("method"));
}

#[test]
fn deleting_constructor_with_parameters_is_rude() {
    let old = unit(vec![class("C", vec![ctor("C", &[("x", "int")], block(vec![]))])]).build();
    let new = unit(vec![class("C", vec![])]).build();
    let analysis = analyze(&old, &new);
    assert_eq!(kinds(&analysis.diagnostics), vec![RudeEditKind::Delete]);
    assert_eq!(analysis.diagnostics[0].node.side, TreeSide::Old);
}

#[test]
fn inserting_private_field_is_allowed() {
    let old = unit(vec![class("C", vec![])]).build();
    let new = unit(vec![class("C", vec![field(Modifiers::PRIVATE, "int", "x", Some(lit("0")))])]).build();
    let analysis = analyze(&old, &new);
    assert!(analysis.diagnostics.is_empty());
    assert!(analysis.semantic_edits.iter().all(|e| e.kind == SemanticEditKind::Insert));
    assert!(!analysis.semantic_edits.is_empty());
}

#[test]
fn inserting_extern_method_is_rude() {
    let old = unit(vec![class("C", vec![])]).build();
    let info = DeclInfo::named("Native").with_type("void").with_modifiers(Modifiers::STATIC | Modifiers::EXTERN);
    let new = unit(vec![class("C", vec![method_with(info, &[], None)])]).build();
    assert_eq!(kinds(&analyze(&old, &new).diagnostics), vec![RudeEditKind::InsertExtern]);
}

/// `void M() { try { F(); } [catch (E) { H(); }] finally { G(); } }`
fn method_with_try(with_catch: bool) -> enc_analyzer::SyntaxTree {
    let catches = if with_catch { vec![catch("E", block(vec![call("H", vec![])]))] } else { vec![] };
    let body = block(vec![try_stmt(block(vec![call("F", vec![])]), catches, Some(block(vec![call("G", vec![])])))]);
    unit(vec![class("C", vec![method("void", "M", &[], body)])]).build()
}

#[test]
fn catch_added_around_non_leaf_statement_is_rude() {
    let old = method_with_try(false);
    let new = method_with_try(true);
    let f = call_statement(&old, "F");
    let engine = engine();
    let cancel = CancellationToken::new();

    let active = ActiveStatement::new(f, StatementPart::None, ActiveStatementFlags::empty());
    let analysis = engine.analyze_with_statements(&old, &new, &[active], &cancel).unwrap();
    assert_eq!(kinds(&analysis.diagnostics), vec![RudeEditKind::InsertAroundActiveStatement]);
    let new_catch = nth_of_kind(&new, SyntaxKind::CatchClause, 0);
    assert_eq!(analysis.diagnostics[0].node.id, new_catch);
    assert_eq!(analysis.diagnostics[0].display_name(), Some("catch clause"));
    assert_eq!(analysis.active_statements[0].new_statement, Some(call_statement(&new, "F")));
    assert_eq!(analysis.active_statements[0].old_regions.len(), 1);
    assert_eq!(analysis.active_statements[0].new_regions.len(), 1);

    // у листовой инструкции try не учитывается
    let leaf = ActiveStatement::new(f, StatementPart::None, ActiveStatementFlags::LEAF);
    let analysis = engine.analyze_with_statements(&old, &new, &[leaf], &cancel).unwrap();
    assert!(analysis.diagnostics.is_empty());
}

/// `void M() { while (cond) { Work(); } }`
fn method_with_loop(cond: &str) -> enc_analyzer::SyntaxTree {
    let body = block(vec![while_loop(ident(cond), block(vec![call("Work", vec![])]))]);
    unit(vec![class("C", vec![method("void", "M", &[], body)])]).build()
}

#[test]
fn loop_condition_change_is_rude_only_for_non_leaf_statement() {
    let old = method_with_loop("a");
    let new = method_with_loop("b");
    let offset = old.span(nth_of_kind(&old, SyntaxKind::WhileStatement, 0)).start;
    let engine = engine();
    let cancel = CancellationToken::new();

    let non_leaf = ActiveStatementSpec { offset, part: 0, leaf: false, partially_executed: false };
    let analysis = engine.analyze_document(&old, &new, &[non_leaf], &cancel).unwrap();
    assert_eq!(kinds(&analysis.diagnostics), vec![RudeEditKind::ActiveStatementUpdate]);

    let leaf = ActiveStatementSpec { offset, part: 0, leaf: true, partially_executed: false };
    let analysis = engine.analyze_document(&old, &new, &[leaf], &cancel).unwrap();
    assert!(analysis.diagnostics.is_empty());
    assert_eq!(analysis.active_statements[0].new_statement, Some(nth_of_kind(&new, SyntaxKind::WhileStatement, 0)));
}

#[test]
fn deleting_method_with_active_statement() {
    let old = method_with_loop("a");
    let new = unit(vec![class("C", vec![])]).build();
    let work = call_statement(&old, "Work");
    let active = ActiveStatement::new(work, StatementPart::None, ActiveStatementFlags::LEAF);
    let analysis = engine().analyze_with_statements(&old, &new, &[active], &CancellationToken::new()).unwrap();
    assert!(kinds(&analysis.diagnostics).contains(&RudeEditKind::DeleteActiveStatement));
    assert_eq!(analysis.active_statements[0].new_statement, None);
}

#[test]
fn lambda_in_updated_body_depends_on_configuration() {
    let old = unit(vec![class("C", vec![method("void", "M", &[], block(vec![call("Work", vec![])]))])]).build();
    let body = block(vec![call("Work", vec![lambda(block(vec![]))])]);
    let new = unit(vec![class("C", vec![method("void", "M", &[], body)])]).build();
    assert_eq!(kinds(&analyze(&old, &new).diagnostics), vec![RudeEditKind::LambdaExpression]);

    let quiet = AnalysisEngine::new(AnalyzerConfig {
        report_unsupported_constructs: false,
        workers: 1,
        ..AnalyzerConfig::default()
    })
    .unwrap();
    let analysis = quiet.analyze_with_statements(&old, &new, &[], &CancellationToken::new()).unwrap();
    assert!(analysis.diagnostics.is_empty());
}

#[test]
fn yield_kind_change_in_iterator_is_rude() {
    let yield_return = Syn::Node(SyntaxKind::YieldReturnStatement, vec![lit("1")]);
    let yield_break = Syn::Node(SyntaxKind::YieldBreakStatement, vec![]);
    let old = unit(vec![class("C", vec![method("IEnumerable", "M", &[], block(vec![yield_return]))])]).build();
    let new = unit(vec![class("C", vec![method("IEnumerable", "M", &[], block(vec![yield_break]))])]).build();
    assert_eq!(kinds(&analyze(&old, &new).diagnostics), vec![RudeEditKind::Update]);
}

fn private_field(name: &str) -> Syn { field(Modifiers::PRIVATE, "int", name, None) }

#[test]
fn field_inserted_before_existing_field_is_an_insert() {
    let old = unit(vec![class("C", vec![private_field("b")])]).build();
    let new = unit(vec![class("C", vec![private_field("a"), private_field("b")])]).build();
    let analysis = analyze(&old, &new);
    assert!(analysis.diagnostics.is_empty(), "{:?}", kinds(&analysis.diagnostics));

    let old_b = nth_of_kind(&old, SyntaxKind::FieldDeclaration, 0);
    let new_b = nth_of_kind(&new, SyntaxKind::FieldDeclaration, 1);
    assert_eq!(analysis.top_match.new_partner(old_b), Some(new_b));
    let new_a = nth_of_kind(&new, SyntaxKind::VariableDeclarator, 0);
    assert!(analysis.semantic_edits.iter().any(|e| e.kind == SemanticEditKind::Insert && e.new == Some(new_a)));
}

#[test]
fn swapped_fields_are_moves() {
    let old = unit(vec![class("C", vec![private_field("a"), private_field("b")])]).build();
    let new = unit(vec![class("C", vec![private_field("b"), private_field("a")])]).build();
    let analysis = analyze(&old, &new);
    assert_eq!(kinds(&analysis.diagnostics), vec![RudeEditKind::Move, RudeEditKind::Move]);
    assert!(analysis.diagnostics.iter().all(|d| d.display_name() == Some("field")));
}

#[test]
fn method_moved_to_another_class_is_rude() {
    let m = || method("void", "M", &[("x", "int")], block(vec![call("Work", vec![])]));
    let old = unit(vec![class("A", vec![m()]), class("B", vec![])]).build();
    let new = unit(vec![class("A", vec![]), class("B", vec![m()])]).build();
    let analysis = analyze(&old, &new);
    assert_eq!(kinds(&analysis.diagnostics), vec![RudeEditKind::Move]);
    assert_eq!(analysis.diagnostics[0].node.id, nth_of_kind(&new, SyntaxKind::MethodDeclaration, 0));
    assert_eq!(analysis.diagnostics[0].display_name(), Some("method"));
    // параметры переезжают вместе с методом
    assert_eq!(analysis.script.len(), 1);
}

/// `int P { get { return x; } [set { }] }` либо `int P => x;`
fn property(accessors: Option<bool>) -> enc_analyzer::SyntaxTree {
    let body = match accessors {
        Some(with_setter) => {
            let mut list = vec![Syn::Node(SyntaxKind::GetAccessorDeclaration, vec![block(vec![ret(ident("x"))])])];
            if with_setter {
                list.push(Syn::Node(SyntaxKind::SetAccessorDeclaration, vec![block(vec![])]));
            }
            Syn::Node(SyntaxKind::AccessorList, list)
        }
        None => Syn::Node(SyntaxKind::ArrowExpressionClause, vec![ident("x")]),
    };
    let prop = Syn::Decl(SyntaxKind::PropertyDeclaration, DeclInfo::named("P").with_type("int"), vec![body]);
    unit(vec![class("C", vec![prop])]).build()
}

#[test]
fn deleting_accessor_list_with_setter_is_rude() {
    let analysis = analyze(&property(Some(true)), &property(None));
    assert_eq!(kinds(&analysis.diagnostics), vec![RudeEditKind::Delete]);
    assert_eq!(analysis.diagnostics[0].display_name(), Some("property setter"));
    assert_eq!(analysis.diagnostics[0].node.side, TreeSide::Old);

    // геттер, ставший телом-выражением, допустим
    let analysis = analyze(&property(Some(false)), &property(None));
    assert!(analysis.diagnostics.is_empty(), "{:?}", kinds(&analysis.diagnostics));
}
