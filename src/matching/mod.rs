/*!
# Tree matching

Computes the correspondence between two revisions of a syntax tree and derives
an edit script from it.

- `label` assigns the coarse equality classes (declarations vs. statements);
- `sequence` aligns child lists (LCS);
- `similarity` scores subtrees for best-effort pairing;
- `tree` runs the per-level matching passes;
- `edits` turns a `Match` into inserts, deletes, updates, moves and reorders.

`Match` is a partial bijection stored as two arena-indexed arrays. Declarations
are only paired as children of matched pairs. Statements may additionally pair
across levels when an ancestor stayed unmatched (a block wrapped in a new
`lock`); the nearest matched ancestors of such a pair are always partners, and
the edit script reports the pair as a move. Moves between matched parents that
are not partners are found by the `EditScript` itself.
*/

use crate::ast_core::{NodeId, SyntaxTree};

pub mod edits;
pub mod label;
pub mod sequence;
pub mod similarity;
pub mod tree;

pub use edits::{Edit, EditKind, EditScript};
pub use label::{Label, MatchMode, StatementLabel, TopLabel};
pub use sequence::{lcs_length, sequence_edits, SequenceEdit};
pub use tree::{compute_body_match, compute_top_level_match};

/// Параметры сопоставления.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOptions {
    /// Минимальное сходство (Dice) для best-effort пары.
    pub similarity_threshold: f64,
    /// Искать перемещения между разными родителями.
    pub detect_moves: bool,
}

impl Default for MatchOptions {
    fn default() -> Self { Self { similarity_threshold: 0.5, detect_moves: true } }
}

/// Соответствие узлов старого и нового дерева.
#[derive(Debug, Clone)]
pub struct Match {
    mode: MatchMode,
    old_root: NodeId,
    new_root: NodeId,
    old_to_new: Vec<Option<NodeId>>,
    new_to_old: Vec<Option<NodeId>>,
}

impl Match {
    /// Пустое соответствие с уже сопоставленными корнями.
    pub fn new(old: &SyntaxTree, old_root: NodeId, new: &SyntaxTree, new_root: NodeId, mode: MatchMode) -> Self {
        let mut m = Self {
            mode,
            old_root,
            new_root,
            old_to_new: vec![None; old.len()],
            new_to_old: vec![None; new.len()],
        };
        m.add(old_root, new_root);
        m
    }

    /// Добавить пару. Повторное использование узла с любой стороны - нарушение инварианта.
    pub fn add(&mut self, old: NodeId, new: NodeId) {
        assert!(
            self.old_to_new[old.index()].is_none() && self.new_to_old[new.index()].is_none(),
            "match is not injective: {old:?} -> {new:?}"
        );
        self.old_to_new[old.index()] = Some(new);
        self.new_to_old[new.index()] = Some(old);
    }

    pub fn mode(&self) -> MatchMode { self.mode }
    pub fn old_root(&self) -> NodeId { self.old_root }
    pub fn new_root(&self) -> NodeId { self.new_root }
    pub fn new_partner(&self, old: NodeId) -> Option<NodeId> { self.old_to_new.get(old.index()).copied().flatten() }
    pub fn old_partner(&self, new: NodeId) -> Option<NodeId> { self.new_to_old.get(new.index()).copied().flatten() }
    pub fn contains(&self, old: NodeId, new: NodeId) -> bool { self.new_partner(old) == Some(new) }

    /// Пары в порядке возрастания id старого узла.
    pub fn pairs(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.old_to_new.iter().enumerate().filter_map(|(i, n)| n.map(|n| (NodeId(i as u32), n)))
    }

    pub fn len(&self) -> usize { self.pairs().count() }
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}
