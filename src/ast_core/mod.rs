//! Syntax tree core: arena, builder, fingerprints.
//!
//! Деревья неизменяемы после `TreeBuilder::build`. Каждый узел хранит вид, span,
//! ссылку на родителя, цепочку детей (first_child / next_sibling) и payload.
//! Fingerprint'ы считаются по тексту, а не по id символов, поэтому их можно
//! сравнивать между двумя разными деревьями.

use crate::core::errors::{AnalysisError, Result};
use crate::core::position::PackedSpan;
use serde::{Deserialize, Serialize};

pub mod body;
pub mod equivalence;
pub mod interner;
pub mod json;
pub mod kind;
pub mod modifiers;

pub use interner::{StringInterner, SymbolId};
pub use kind::{KindCategory, SyntaxKind};
pub use modifiers::Modifiers;

/// Устойчивый идентификатор узла внутри одной арены.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize { self.0 as usize }
}

/// Дополнительные данные узла.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AstPayload {
    #[default]
    None,
    Ident { sym: SymbolId },
    Literal { sym: SymbolId },
    /// Оператор или ключевое слово, влияющее на значение узла.
    Token { sym: SymbolId },
    /// Индекс в таблице `DeclData`.
    Decl { data: u32 },
}

/// Данные объявления (хранятся отдельной таблицей, как и прочие "тяжёлые" payload'ы).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeclData {
    pub name: Option<SymbolId>,
    /// Тип: возвращаемый тип метода, тип поля/параметра, базовый тип enum, текст ограничений.
    pub type_ref: Option<SymbolId>,
    pub modifiers: Modifiers,
    pub explicit_interface: Option<SymbolId>,
}

/// Описание объявления для построителя (строки ещё не интернированы).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclInfo {
    pub name: Option<String>,
    pub type_ref: Option<String>,
    pub modifiers: Modifiers,
    pub explicit_interface: Option<String>,
}

impl DeclInfo {
    pub fn new() -> Self { Self::default() }
    pub fn named(name: impl Into<String>) -> Self { Self { name: Some(name.into()), ..Self::default() } }
    pub fn with_type(mut self, ty: impl Into<String>) -> Self { self.type_ref = Some(ty.into()); self }
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self { self.modifiers = modifiers; self }
    pub fn with_interface(mut self, iface: impl Into<String>) -> Self { self.explicit_interface = Some(iface.into()); self }
}

/// Узел в арене.
#[derive(Debug, Clone)]
pub struct AstNode {
    pub kind: SyntaxKind,
    pub span: PackedSpan,
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub payload: AstPayload,
}

impl AstNode {
    fn new(kind: SyntaxKind, span: PackedSpan, payload: AstPayload) -> Self {
        Self { kind, span, parent: None, first_child: None, next_sibling: None, payload }
    }
}

/// Агрегатор всех узлов.
#[derive(Default, Debug, Clone)]
pub struct Arena {
    nodes: Vec<AstNode>,
}

impl Arena {
    pub fn new() -> Self { Self { nodes: Vec::new() } }
    fn alloc(&mut self, node: AstNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }
    pub fn node(&self, id: NodeId) -> &AstNode { &self.nodes[id.index()] }
    fn node_mut(&mut self, id: NodeId) -> &mut AstNode { &mut self.nodes[id.index()] }
    pub fn len(&self) -> usize { self.nodes.len() }
    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &AstNode)> { self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i as u32), n)) }
    pub fn children(&self, id: NodeId) -> NodeChildren<'_> {
        NodeChildren { arena: self, next: self.node(id).first_child }
    }
}

/// Итератор детей конкретного узла.
pub struct NodeChildren<'a> {
    arena: &'a Arena,
    next: Option<NodeId>,
}

impl<'a> Iterator for NodeChildren<'a> {
    type Item = NodeId;
    fn next(&mut self) -> Option<Self::Item> {
        let cur = self.next?;
        self.next = self.arena.node(cur).next_sibling;
        Some(cur)
    }
}

/// Итератор предков (без самого узла).
pub struct Ancestors<'a> {
    arena: &'a Arena,
    next: Option<NodeId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = NodeId;
    fn next(&mut self) -> Option<Self::Item> {
        let cur = self.next?;
        self.next = self.arena.node(cur).parent;
        Some(cur)
    }
}

struct OpenNode {
    id: NodeId,
    explicit_span: bool,
    last_child: Option<NodeId>,
}

/// Построитель дерева (nested push/pop стеком).
///
/// Узлы без явного span получают синтетический: курсор сдвигается на ширину
/// ведущего ключевого слова при открытии узла, на ширину текста для листьев и
/// на один символ при закрытии. Так span'ы детей всегда вложены в span родителя,
/// а у блока последний символ соответствует закрывающей скобке.
#[derive(Default)]
pub struct TreeBuilder {
    arena: Arena,
    stack: Vec<OpenNode>,
    root: Option<NodeId>,
    extra_roots: usize,
    interner: StringInterner,
    decls: Vec<DeclData>,
    cursor: u32,
}

impl TreeBuilder {
    pub fn new() -> Self { Self::default() }

    pub fn start_node(&mut self, kind: SyntaxKind) { self.open(kind, None, AstPayload::None); }
    pub fn start_node_at(&mut self, kind: SyntaxKind, span: PackedSpan) { self.open(kind, Some(span), AstPayload::None); }

    pub fn start_decl(&mut self, kind: SyntaxKind, info: DeclInfo) {
        let payload = self.decl_payload(info);
        self.open(kind, None, payload);
    }

    pub fn start_decl_at(&mut self, kind: SyntaxKind, span: PackedSpan, info: DeclInfo) {
        let payload = self.decl_payload(info);
        self.open(kind, Some(span), payload);
    }

    /// Узел с токеном-оператором (`+`, `=`, `!`).
    pub fn start_token(&mut self, kind: SyntaxKind, token: &str) {
        let sym = self.interner.intern(token);
        self.open(kind, None, AstPayload::Token { sym });
    }

    pub fn start_with_payload(&mut self, kind: SyntaxKind, span: Option<PackedSpan>, payload: AstPayload) {
        self.open(kind, span, payload);
    }

    pub fn finish_node(&mut self) {
        if let Some(open) = self.stack.pop() {
            if !open.explicit_span {
                let start = self.arena.node(open.id).span.start;
                self.cursor += 1;
                self.arena.node_mut(open.id).span = PackedSpan::from_bounds(start, self.cursor);
                self.cursor += 1;
            }
        }
    }

    pub fn leaf(&mut self, kind: SyntaxKind) -> NodeId { self.leaf_with_payload(kind, None, AstPayload::None, 1) }

    pub fn ident(&mut self, name: &str) -> NodeId {
        let sym = self.interner.intern(name);
        self.leaf_with_payload(SyntaxKind::IdentifierName, None, AstPayload::Ident { sym }, name.len() as u32)
    }

    pub fn literal(&mut self, text: &str) -> NodeId {
        let sym = self.interner.intern(text);
        self.leaf_with_payload(SyntaxKind::LiteralExpression, None, AstPayload::Literal { sym }, text.len() as u32)
    }

    pub fn leaf_decl(&mut self, kind: SyntaxKind, info: DeclInfo) -> NodeId {
        let width = info.name.as_ref().map_or(1, |n| n.len() as u32);
        let payload = self.decl_payload(info);
        self.leaf_with_payload(kind, None, payload, width)
    }

    pub fn leaf_at(&mut self, kind: SyntaxKind, span: PackedSpan, payload: AstPayload) -> NodeId {
        self.leaf_with_payload(kind, Some(span), payload, span.len)
    }

    pub fn intern(&mut self, text: &str) -> SymbolId { self.interner.intern(text) }

    pub fn decl_payload(&mut self, info: DeclInfo) -> AstPayload {
        let data = DeclData {
            name: info.name.map(|s| self.interner.intern(s)),
            type_ref: info.type_ref.map(|s| self.interner.intern(s)),
            modifiers: info.modifiers,
            explicit_interface: info.explicit_interface.map(|s| self.interner.intern(s)),
        };
        let idx = self.decls.len() as u32;
        self.decls.push(data);
        AstPayload::Decl { data: idx }
    }

    fn open(&mut self, kind: SyntaxKind, span: Option<PackedSpan>, payload: AstPayload) {
        let explicit_span = span.is_some();
        let span = span.unwrap_or_else(|| {
            let start = self.cursor;
            self.cursor += kind.keyword_len().unwrap_or(1) + 1;
            PackedSpan::new(start, 0)
        });
        let id = self.arena.alloc(AstNode::new(kind, span, payload));
        self.attach(id);
        self.stack.push(OpenNode { id, explicit_span, last_child: None });
    }

    fn leaf_with_payload(&mut self, kind: SyntaxKind, span: Option<PackedSpan>, payload: AstPayload, width: u32) -> NodeId {
        let span = span.unwrap_or_else(|| {
            let s = PackedSpan::new(self.cursor, width.max(1));
            self.cursor = s.end() + 1;
            s
        });
        let id = self.arena.alloc(AstNode::new(kind, span, payload));
        self.attach(id);
        id
    }

    fn attach(&mut self, id: NodeId) {
        let Some(open) = self.stack.last_mut() else {
            if self.root.is_none() { self.root = Some(id); } else { self.extra_roots += 1; }
            return;
        };
        let parent = open.id;
        let prev = open.last_child.replace(id);
        match prev {
            None => self.arena.node_mut(parent).first_child = Some(id),
            Some(p) => self.arena.node_mut(p).next_sibling = Some(id),
        }
        self.arena.node_mut(id).parent = Some(parent);
    }

    pub fn build(self) -> Result<SyntaxTree> {
        if let Some(open) = self.stack.last() {
            return Err(AnalysisError::InvalidTree(format!("unclosed node {:?}", self.arena.node(open.id).kind)));
        }
        if self.extra_roots > 0 {
            return Err(AnalysisError::InvalidTree(format!("{} nodes outside of the root", self.extra_roots)));
        }
        let root = self.root.ok_or_else(|| AnalysisError::InvalidTree("tree has no root".into()))?;
        let mut tree = SyntaxTree { arena: self.arena, root, interner: self.interner, decls: self.decls, fingerprints: Vec::new() };
        tree.fingerprints = compute_fingerprints(&tree);
        Ok(tree)
    }
}

/// Неизменяемое дерево одной версии документа.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    arena: Arena,
    root: NodeId,
    interner: StringInterner,
    decls: Vec<DeclData>,
    /// Кэш fingerprint'ов (индекс = NodeId.0).
    fingerprints: Vec<u64>,
}

impl SyntaxTree {
    pub fn root(&self) -> NodeId { self.root }
    pub fn arena(&self) -> &Arena { &self.arena }
    pub fn len(&self) -> usize { self.arena.len() }
    pub fn is_empty(&self) -> bool { self.arena.is_empty() }
    pub fn node(&self, id: NodeId) -> &AstNode { self.arena.node(id) }
    pub fn kind(&self, id: NodeId) -> SyntaxKind { self.arena.node(id).kind }
    pub fn span(&self, id: NodeId) -> PackedSpan { self.arena.node(id).span }
    pub fn parent(&self, id: NodeId) -> Option<NodeId> { self.arena.node(id).parent }
    pub fn children(&self, id: NodeId) -> NodeChildren<'_> { self.arena.children(id) }
    pub fn child_vec(&self, id: NodeId) -> Vec<NodeId> { self.children(id).collect() }
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> { Ancestors { arena: &self.arena, next: self.parent(id) } }
    pub fn fingerprint(&self, id: NodeId) -> u64 { self.fingerprints[id.index()] }
    pub fn resolve(&self, sym: SymbolId) -> &str { self.interner.resolve(sym) }

    pub fn first_child_of_kind(&self, id: NodeId, kind: SyntaxKind) -> Option<NodeId> {
        self.children(id).find(|c| self.kind(*c) == kind)
    }

    pub fn children_of_kind(&self, id: NodeId, kind: SyntaxKind) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id).filter(move |c| self.kind(*c) == kind)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> { self.node(id).next_sibling }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let mut prev = None;
        for c in self.children(parent) {
            if c == id { return prev; }
            prev = Some(c);
        }
        None
    }

    pub fn is_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|a| a == ancestor)
    }

    /// Текст идентификатора, литерала или токена.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.node(id).payload {
            AstPayload::Ident { sym } | AstPayload::Literal { sym } | AstPayload::Token { sym } => Some(self.resolve(sym)),
            _ => None,
        }
    }

    pub fn decl(&self, id: NodeId) -> Option<&DeclData> {
        match self.node(id).payload { AstPayload::Decl { data } => self.decls.get(data as usize), _ => None }
    }

    pub fn name(&self, id: NodeId) -> Option<&str> { self.decl(id)?.name.map(|s| self.resolve(s)) }
    pub fn type_text(&self, id: NodeId) -> Option<&str> { self.decl(id)?.type_ref.map(|s| self.resolve(s)) }
    pub fn explicit_interface(&self, id: NodeId) -> Option<&str> { self.decl(id)?.explicit_interface.map(|s| self.resolve(s)) }
    pub fn modifiers(&self, id: NodeId) -> Modifiers { self.decl(id).map(|d| d.modifiers).unwrap_or_default() }

    /// Узлы поддерева в прямом порядке.
    pub fn preorder(&self, root: NodeId) -> impl Iterator<Item = NodeId> + '_ { preorder(&self.arena, root) }

    /// Объявления с заданным именем и арностью (числом параметров типа).
    pub fn find_declarations(&self, name: &str, arity: usize) -> Vec<NodeId> {
        let Some(sym) = self.interner.lookup(name) else { return Vec::new() };
        self.preorder(self.root)
            .filter(|id| self.decl(*id).is_some_and(|d| d.name == Some(sym)))
            .filter(|id| body::arity(self, *id) == arity)
            .collect()
    }

    /// Самый глубокий узел, содержащий позицию и удовлетворяющий предикату.
    pub fn innermost_at(&self, offset: u32, pred: impl Fn(NodeId) -> bool) -> Option<NodeId> {
        if !self.span(self.root).contains(offset) { return None; }
        let mut best = pred(self.root).then_some(self.root);
        let mut cur = self.root;
        while let Some(child) = self.children(cur).find(|c| self.span(*c).contains(offset)) {
            if pred(child) { best = Some(child); }
            cur = child;
        }
        best
    }

    pub fn node_at(&self, offset: u32) -> Option<NodeId> { self.innermost_at(offset, |_| true) }
}

fn fnv64(acc: u64, v: u64) -> u64 { let mut h = acc; h ^= v.wrapping_mul(0x100000001b3); h = h.wrapping_mul(0x100000001b3); h }

fn fnv_str(acc: u64, s: &str) -> u64 {
    let h = s.bytes().fold(acc, |h, b| fnv64(h, b as u64));
    fnv64(h, s.len() as u64)
}

/// Fingerprint'ы всех узлов (post-order, по тексту payload'а, без span'ов).
fn compute_fingerprints(tree: &SyntaxTree) -> Vec<u64> {
    let mut fp = vec![0u64; tree.len()];
    // Дети всегда аллоцируются после родителя, поэтому обратный порядок id является post-order.
    for i in (0..tree.len()).rev() {
        let id = NodeId(i as u32);
        let node = tree.node(id);
        let mut h: u64 = 0xcbf29ce484222325;
        h = fnv64(h, node.kind as u64);
        match node.payload {
            AstPayload::None => h = fnv64(h, 0),
            AstPayload::Ident { sym } => { h = fnv64(h, 1); h = fnv_str(h, tree.resolve(sym)); }
            AstPayload::Literal { sym } => { h = fnv64(h, 2); h = fnv_str(h, tree.resolve(sym)); }
            AstPayload::Token { sym } => { h = fnv64(h, 3); h = fnv_str(h, tree.resolve(sym)); }
            AstPayload::Decl { .. } => {
                h = fnv64(h, 4);
                h = fnv_str(h, tree.name(id).unwrap_or(""));
                h = fnv_str(h, tree.type_text(id).unwrap_or(""));
                h = fnv_str(h, tree.explicit_interface(id).unwrap_or(""));
                h = fnv64(h, tree.modifiers(id).bits() as u64);
            }
        }
        for c in tree.children(id) { h = fnv64(h, fp[c.index()]); }
        fp[i] = h;
    }
    fp
}

/// Утилита обхода (предварительный проход).
pub fn preorder(arena: &Arena, root: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    let mut stack = vec![root];
    std::iter::from_fn(move || {
        let id = stack.pop()?;
        let children: Vec<NodeId> = arena.children(id).collect();
        stack.extend(children.into_iter().rev());
        Some(id)
    })
}

/// Контроль обхода.
pub enum VisitControl { Continue, SkipChildren, Stop }

/// Visitor API (enter/leave). Возвращаем VisitControl из enter.
pub trait Visitor {
    fn enter(&mut self, _id: NodeId, _tree: &SyntaxTree) -> VisitControl { VisitControl::Continue }
    fn leave(&mut self, _id: NodeId, _tree: &SyntaxTree) {}
}

/// Обход поддерева с visitor. Возвращает true если не прерван.
pub fn walk<V: Visitor>(tree: &SyntaxTree, root: NodeId, visitor: &mut V) -> bool {
    fn inner<V: Visitor>(tree: &SyntaxTree, id: NodeId, vis: &mut V) -> Option<()> {
        match vis.enter(id, tree) {
            VisitControl::Continue => {
                for c in tree.children(id) { inner(tree, c, vis)?; }
            }
            VisitControl::SkipChildren => {}
            VisitControl::Stop => return None,
        }
        vis.leave(id, tree);
        Some(())
    }
    inner(tree, root, visitor).is_some()
}
