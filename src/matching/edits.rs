//! Edit script derived from a `Match`.
//!
//! Порядок: сначала удаления в прямом порядке старого дерева, затем вставки,
//! обновления, перемещения и перестановки в прямом порядке нового дерева.

use super::label::{label, labeled_children, labeled_descendants, labeled_parent, Label, MatchMode, StatementLabel};
use super::tree::{signature, Signature};
use super::{Match, MatchOptions};
use crate::ast_core::equivalence::{are_equivalent, EquivalenceMode};
use crate::ast_core::{NodeId, SyntaxTree};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum EditKind {
    Insert,
    Delete,
    Update,
    Move,
    Reorder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Edit {
    Insert(NodeId),
    Delete(NodeId),
    Update(NodeId, NodeId),
    Move(NodeId, NodeId),
    Reorder(NodeId, NodeId),
}

impl Edit {
    pub fn kind(&self) -> EditKind {
        match self {
            Edit::Insert(_) => EditKind::Insert,
            Edit::Delete(_) => EditKind::Delete,
            Edit::Update(..) => EditKind::Update,
            Edit::Move(..) => EditKind::Move,
            Edit::Reorder(..) => EditKind::Reorder,
        }
    }

    pub fn old(&self) -> Option<NodeId> {
        match *self {
            Edit::Insert(_) => None,
            Edit::Delete(o) | Edit::Update(o, _) | Edit::Move(o, _) | Edit::Reorder(o, _) => Some(o),
        }
    }

    pub fn new(&self) -> Option<NodeId> {
        match *self {
            Edit::Delete(_) => None,
            Edit::Insert(n) | Edit::Update(_, n) | Edit::Move(_, n) | Edit::Reorder(_, n) => Some(n),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EditScript {
    edits: Vec<Edit>,
    /// Корни перемещённых поддеревьев.
    moves: Vec<(NodeId, NodeId)>,
    /// Старый узел -> новый для всех узлов внутри перемещённых поддеревьев.
    moved: HashMap<NodeId, NodeId>,
    old_edits: HashSet<(NodeId, EditKind)>,
    new_edits: HashSet<(NodeId, EditKind)>,
}

impl EditScript {
    pub fn compute(old: &SyntaxTree, new: &SyntaxTree, m: &Match, options: &MatchOptions) -> Self {
        let mode = m.mode();
        let (old_root, new_root) = (m.old_root(), m.new_root());
        let old_nodes = labeled_descendants(old, old_root, mode);
        let new_nodes = labeled_descendants(new, new_root, mode);

        let mut script = EditScript::default();
        if options.detect_moves {
            script.detect_moves(old, new, m, &old_nodes, &new_nodes);
        }
        let moved_old: HashSet<NodeId> = script.moved.keys().copied().collect();
        let moved_new: HashSet<NodeId> = script.moved.values().copied().collect();
        let move_roots: HashMap<NodeId, NodeId> = script.moves.iter().map(|(o, n)| (*n, *o)).collect();
        let in_moved_old = |id: NodeId| moved_old.contains(&id) || script.inside_move_old(old, id, old_root);
        let in_moved_new = |id: NodeId| moved_new.contains(&id) || script.inside_move_new(new, id, new_root);

        let mut edits = Vec::new();
        for &o in &old_nodes {
            if m.new_partner(o).is_none() && !in_moved_old(o) {
                edits.push(Edit::Delete(o));
            }
        }

        let reordered = reordered_pairs(old, new, m);
        let value_mode = match mode {
            MatchMode::TopLevel => EquivalenceMode::IgnoreTopLevelChildren,
            MatchMode::Body => EquivalenceMode::IgnoreStatementDescendants,
        };
        for &n in &new_nodes {
            match m.old_partner(n) {
                Some(o) => {
                    if mode == MatchMode::Body && is_reparented(old, new, m, o, n) {
                        edits.push(Edit::Move(o, n));
                    }
                    if !are_equivalent(old, o, new, n, value_mode) {
                        edits.push(Edit::Update(o, n));
                    }
                    if reordered.contains(&n) {
                        edits.push(Edit::Reorder(o, n));
                    }
                }
                None => {
                    if let Some(&o) = move_roots.get(&n) {
                        edits.push(Edit::Move(o, n));
                    } else if !in_moved_new(n) {
                        edits.push(Edit::Insert(n));
                    }
                }
            }
        }

        for e in &edits {
            if let Some(o) = e.old() { script.old_edits.insert((o, e.kind())); }
            if let Some(n) = e.new() { script.new_edits.insert((n, e.kind())); }
        }
        script.edits = edits;
        tracing::debug!("edit script ({:?}): {} edits, {} moves", mode, script.edits.len(), script.moves.len());
        script
    }

    pub fn edits(&self) -> &[Edit] { &self.edits }
    pub fn is_empty(&self) -> bool { self.edits.is_empty() }
    pub fn len(&self) -> usize { self.edits.len() }
    pub fn moves(&self) -> &[(NodeId, NodeId)] { &self.moves }

    /// Новая позиция узла, находящегося внутри перемещённого поддерева.
    pub fn moved_partner(&self, old: NodeId) -> Option<NodeId> { self.moved.get(&old).copied() }

    pub fn has_old_edit(&self, old: NodeId, kind: EditKind) -> bool { self.old_edits.contains(&(old, kind)) }
    pub fn has_new_edit(&self, new: NodeId, kind: EditKind) -> bool { self.new_edits.contains(&(new, kind)) }

    fn inside_move_old(&self, tree: &SyntaxTree, id: NodeId, root: NodeId) -> bool {
        !self.moves.is_empty() && tree.ancestors(id).take_while(|a| *a != root).any(|a| self.moves.iter().any(|(o, _)| *o == a))
    }

    fn inside_move_new(&self, tree: &SyntaxTree, id: NodeId, root: NodeId) -> bool {
        !self.moves.is_empty() && tree.ancestors(id).take_while(|a| *a != root).any(|a| self.moves.iter().any(|(_, n)| *n == a))
    }

    /// Перемещения: несопоставленные поддеревья с одинаковой сигнатурой под разными родителями.
    fn detect_moves(&mut self, old: &SyntaxTree, new: &SyntaxTree, m: &Match, old_nodes: &[NodeId], new_nodes: &[NodeId]) {
        let mode = m.mode();
        let (old_root, new_root) = (m.old_root(), m.new_root());
        let candidate = |tree: &SyntaxTree, id: NodeId, matched_parent: bool| -> Option<Signature> {
            if !matched_parent || label(tree, id, mode) == Some(Label::Statement(StatementLabel::Operand)) {
                return None;
            }
            if mode == MatchMode::TopLevel && tree.name(id).map_or(true, str::is_empty) {
                return None;
            }
            signature(tree, id, mode)
        };

        let mut pool: HashMap<Signature, VecDeque<NodeId>> = HashMap::new();
        for &n in new_nodes {
            let parent_matched = labeled_parent(new, n, new_root, mode).is_some_and(|p| m.old_partner(p).is_some());
            if m.old_partner(n).is_some() { continue; }
            if let Some(sig) = candidate(new, n, parent_matched) {
                pool.entry(sig).or_default().push_back(n);
            }
        }
        if pool.is_empty() { return; }

        for &o in old_nodes {
            if m.new_partner(o).is_some() { continue; }
            let Some(old_parent) = labeled_parent(old, o, old_root, mode) else { continue };
            let Some(parent_partner) = m.new_partner(old_parent) else { continue };
            let Some(sig) = candidate(old, o, true) else { continue };
            let Some(queue) = pool.get_mut(&sig) else { continue };
            let Some(pos) = queue.iter().position(|n| labeled_parent(new, *n, new_root, mode) != Some(parent_partner)) else {
                continue;
            };
            if let Some(n) = queue.remove(pos) {
                self.moves.push((o, n));
                self.record_moved_subtree(old, o, new, n, mode);
            }
        }
    }

    fn record_moved_subtree(&mut self, old: &SyntaxTree, o: NodeId, new: &SyntaxTree, n: NodeId, mode: MatchMode) {
        self.moved.insert(o, n);
        // потомки переносятся позиционно только при идентичных поддеревьях
        if old.fingerprint(o) != new.fingerprint(n) { return; }
        let oc = labeled_descendants(old, o, mode);
        let nc = labeled_descendants(new, n, mode);
        if oc.len() == nc.len() {
            self.moved.extend(oc.into_iter().zip(nc));
        }
    }
}

/// Пара, чьи помеченные родители не являются партнёрами.
fn is_reparented(old: &SyntaxTree, new: &SyntaxTree, m: &Match, o: NodeId, n: NodeId) -> bool {
    let old_parent = labeled_parent(old, o, m.old_root(), m.mode());
    let new_parent = labeled_parent(new, n, m.new_root(), m.mode());
    old_parent.and_then(|p| m.new_partner(p)) != new_parent
}

/// Новые узлы сопоставленных пар, чей ранг среди сопоставленных соседей изменился.
fn reordered_pairs(old: &SyntaxTree, new: &SyntaxTree, m: &Match) -> HashSet<NodeId> {
    let mode = m.mode();
    let mut out = HashSet::new();
    for (op, np) in m.pairs() {
        let old_seq: Vec<NodeId> = labeled_children(old, op, mode).into_iter().filter(|c| m.new_partner(*c).is_some()).collect();
        if old_seq.len() < 2 { continue; }
        let new_seq: Vec<NodeId> = labeled_children(new, np, mode).into_iter().filter(|c| m.old_partner(*c).is_some()).collect();
        let rank: HashMap<NodeId, usize> = old_seq.iter().enumerate().map(|(i, o)| (*o, i)).collect();
        for (j, n) in new_seq.iter().enumerate() {
            let moved_rank = m.old_partner(*n).and_then(|o| rank.get(&o)).is_some_and(|i| *i != j);
            if moved_rank { out.insert(*n); }
        }
    }
    out
}
