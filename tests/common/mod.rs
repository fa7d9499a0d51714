//! Tree DSL shared by the integration tests.
//!
//! Деревья описываются значениями `Syn` и строятся через `TreeBuilder`, поэтому
//! span'ы синтетические, но согласованные между версиями.
#![allow(dead_code)]

use enc_analyzer::analyzer::{AnalysisEngine, AnalyzerConfig, DocumentAnalysis};
use enc_analyzer::{
    compute_top_level_match, CancellationToken, DeclInfo, EditScript, Match, MatchOptions, Modifiers, NodeId,
    RudeEditDiagnostic, RudeEditKind, SyntaxKind, SyntaxTree, TreeBuilder,
};

#[derive(Debug, Clone)]
pub enum Syn {
    Node(SyntaxKind, Vec<Syn>),
    Decl(SyntaxKind, DeclInfo, Vec<Syn>),
    Ident(String),
    Lit(String),
}

impl Syn {
    pub fn build(&self) -> SyntaxTree {
        let mut b = TreeBuilder::new();
        push(&mut b, self);
        b.build().unwrap()
    }
}

fn push(b: &mut TreeBuilder, syn: &Syn) {
    match syn {
        Syn::Node(kind, children) => {
            b.start_node(*kind);
            children.iter().for_each(|c| push(b, c));
            b.finish_node();
        }
        Syn::Decl(kind, info, children) => {
            b.start_decl(*kind, info.clone());
            children.iter().for_each(|c| push(b, c));
            b.finish_node();
        }
        Syn::Ident(name) => {
            b.ident(name);
        }
        Syn::Lit(text) => {
            b.literal(text);
        }
    }
}

use SyntaxKind::*;

pub fn unit(items: Vec<Syn>) -> Syn { Syn::Node(CompilationUnit, items) }
pub fn class(name: &str, members: Vec<Syn>) -> Syn { Syn::Decl(ClassDeclaration, DeclInfo::named(name), members) }
pub fn enum_decl(name: &str, members: &[&str]) -> Syn {
    let members = members.iter().map(|m| Syn::Decl(EnumMemberDeclaration, DeclInfo::named(*m), vec![])).collect();
    Syn::Decl(EnumDeclaration, DeclInfo::named(name), members)
}

fn parameter_list(params: &[(&str, &str)]) -> Syn {
    let params = params.iter().map(|(name, ty)| Syn::Decl(Parameter, DeclInfo::named(*name).with_type(*ty), vec![])).collect();
    Syn::Node(ParameterList, params)
}

/// `ty name(params) body`
pub fn method(ty: &str, name: &str, params: &[(&str, &str)], body: Syn) -> Syn {
    method_with(DeclInfo::named(name).with_type(ty), params, Some(body))
}

pub fn method_with(info: DeclInfo, params: &[(&str, &str)], body: Option<Syn>) -> Syn {
    let mut children = vec![parameter_list(params)];
    children.extend(body);
    Syn::Decl(MethodDeclaration, info, children)
}

pub fn ctor(name: &str, params: &[(&str, &str)], body: Syn) -> Syn {
    Syn::Decl(ConstructorDeclaration, DeclInfo::named(name), vec![parameter_list(params), body])
}

/// `modifiers ty name [= init];`
pub fn field(modifiers: Modifiers, ty: &str, name: &str, init: Option<Syn>) -> Syn {
    let declarator_children = init.map(|e| vec![Syn::Node(EqualsValueClause, vec![e])]).unwrap_or_default();
    Syn::Decl(
        FieldDeclaration,
        DeclInfo::new().with_modifiers(modifiers),
        vec![Syn::Decl(
            VariableDeclaration,
            DeclInfo::new().with_type(ty),
            vec![Syn::Decl(VariableDeclarator, DeclInfo::named(name), declarator_children)],
        )],
    )
}

pub fn block(stmts: Vec<Syn>) -> Syn { Syn::Node(Block, stmts) }
pub fn ret(expr: Syn) -> Syn { Syn::Node(ReturnStatement, vec![expr]) }
pub fn lit(text: &str) -> Syn { Syn::Lit(text.to_string()) }
pub fn ident(name: &str) -> Syn { Syn::Ident(name.to_string()) }
pub fn expr(e: Syn) -> Syn { Syn::Node(ExpressionStatement, vec![e]) }

/// `name(args);`
pub fn call(name: &str, args: Vec<Syn>) -> Syn {
    let mut children = vec![ident(name)];
    children.extend(args);
    expr(Syn::Node(InvocationExpression, children))
}

pub fn while_loop(cond: Syn, body: Syn) -> Syn { Syn::Node(WhileStatement, vec![cond, body]) }
pub fn lock(target: Syn, body: Syn) -> Syn { Syn::Node(LockStatement, vec![target, body]) }
pub fn checked(body: Syn) -> Syn { Syn::Node(CheckedStatement, vec![body]) }

pub fn try_stmt(body: Syn, catches: Vec<Syn>, finally: Option<Syn>) -> Syn {
    let mut children = vec![body];
    children.extend(catches);
    children.extend(finally.map(|f| Syn::Node(FinallyClause, vec![f])));
    Syn::Node(TryStatement, children)
}

pub fn catch(ty: &str, body: Syn) -> Syn { Syn::Decl(CatchClause, DeclInfo::new().with_type(ty), vec![body]) }

pub fn lambda(body: Syn) -> Syn { Syn::Node(ParenthesizedLambdaExpression, vec![Syn::Node(ParameterList, vec![]), body]) }

pub fn nth_of_kind(tree: &SyntaxTree, kind: SyntaxKind, n: usize) -> NodeId {
    tree.preorder(tree.root()).filter(|id| tree.kind(*id) == kind).nth(n).unwrap()
}

/// Инструкция-вызов `name(...)`.
pub fn call_statement(tree: &SyntaxTree, name: &str) -> NodeId {
    tree.preorder(tree.root())
        .find(|id| {
            tree.kind(*id) == ExpressionStatement
                && tree.children(*id).next().is_some_and(|e| tree.children(e).next().and_then(|c| tree.text(c)) == Some(name))
        })
        .unwrap()
}

pub fn top_level(old: &SyntaxTree, new: &SyntaxTree) -> (Match, EditScript) {
    let opts = MatchOptions::default();
    let m = compute_top_level_match(old, new, &opts, &CancellationToken::new()).unwrap();
    let script = EditScript::compute(old, new, &m, &opts);
    (m, script)
}

pub fn engine() -> AnalysisEngine {
    AnalysisEngine::new(AnalyzerConfig { workers: 2, ..AnalyzerConfig::default() }).unwrap()
}

pub fn analyze(old: &SyntaxTree, new: &SyntaxTree) -> DocumentAnalysis {
    engine().analyze_with_statements(old, new, &[], &CancellationToken::new()).unwrap()
}

pub fn kinds(diagnostics: &[RudeEditDiagnostic]) -> Vec<RudeEditKind> {
    diagnostics.iter().map(|d| d.kind).collect()
}
