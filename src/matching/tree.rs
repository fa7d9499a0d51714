//! Level-by-level tree matching.
//!
//! Для каждой сопоставленной пары контейнеров:
//! 1. якоря - дети с одинаковой сигнатурой идентичности, в порядке появления;
//! 2. LCS по оставшимся детям с равенством меток;
//! 3. best effort - для каждого несопоставленного старого ребёнка самый похожий
//!    новый с той же меткой, если сходство не ниже порога;
//! 4. рекурсия в сопоставленные пары.
//!
//! В телах после этого сопоставляются узлы, оставшиеся без пары из-за
//! несопоставленного предка (инструкция обёрнута в новый `lock` или вынута
//! из `checked`).

use super::label::{
    fits_declarations, label, labeled_children, labeled_descendants, labeled_parent, top_label, Label, MatchMode, StatementLabel,
};
use super::sequence::{sequence_edits, SequenceEdit};
use super::similarity::FeatureBag;
use super::{Match, MatchOptions};
use crate::ast_core::body::{arity, declared_identifiers, parameter_types};
use crate::ast_core::{NodeId, SyntaxKind, SyntaxTree};
use crate::core::cancel::CancellationToken;
use crate::core::errors::{AnalysisError, Result};
use std::collections::{HashMap, VecDeque};

/// Сигнатура идентичности узла.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Signature {
    /// Метка, вид, модификаторы, имя, арность и типы параметров.
    Declaration(String),
    /// Метка и fingerprint поддерева.
    Statement(Label, u64),
}

pub(crate) fn signature(tree: &SyntaxTree, id: NodeId, mode: MatchMode) -> Option<Signature> {
    let label = label(tree, id, mode)?;
    let sig = match mode {
        MatchMode::TopLevel => Signature::Declaration(format!(
            "{:?}|{:?}|{}|{}|{}|{}|{}",
            label,
            tree.kind(id),
            tree.modifiers(id).bits(),
            identity_name(tree, id),
            tree.explicit_interface(id).unwrap_or(""),
            arity(tree, id),
            parameter_types(tree, id).join(","),
        )),
        MatchMode::Body => Signature::Statement(label, tree.fingerprint(id)),
    };
    Some(sig)
}

/// Имя для сигнатуры: у полей и объявлений переменных собственного имени нет,
/// их идентифицируют имена деклараторов.
fn identity_name(tree: &SyntaxTree, id: NodeId) -> String {
    match tree.kind(id) {
        SyntaxKind::FieldDeclaration | SyntaxKind::EventFieldDeclaration => tree
            .children_of_kind(id, SyntaxKind::VariableDeclaration)
            .flat_map(|v| declared_identifiers(tree, v))
            .collect::<Vec<_>>()
            .join(","),
        SyntaxKind::VariableDeclaration => declared_identifiers(tree, id).join(","),
        _ => tree.name(id).unwrap_or("").to_string(),
    }
}

struct Matcher<'a> {
    old: &'a SyntaxTree,
    new: &'a SyntaxTree,
    mode: MatchMode,
    options: &'a MatchOptions,
    cancel: &'a CancellationToken,
}

/// Сопоставление объявлений двух единиц компиляции.
pub fn compute_top_level_match(
    old: &SyntaxTree,
    new: &SyntaxTree,
    options: &MatchOptions,
    cancel: &CancellationToken,
) -> Result<Match> {
    for tree in [old, new] {
        let kind = tree.kind(tree.root());
        if !fits_declarations(kind) || top_label(kind).is_none() {
            return Err(AnalysisError::InvalidTree(format!("{kind:?} cannot be the root of a compilation unit")));
        }
    }
    let mut m = Match::new(old, old.root(), new, new.root(), MatchMode::TopLevel);
    let matcher = Matcher { old, new, mode: MatchMode::TopLevel, options, cancel };
    matcher.match_level(old.root(), new.root(), &mut m)?;
    tracing::debug!("top-level match: {} pairs ({} old nodes, {} new nodes)", m.len(), old.len(), new.len());
    Ok(m)
}

/// Сопоставление тел: корни задаются явно (блок, стрелочное тело, инициализатор или конструктор).
pub fn compute_body_match(
    old: &SyntaxTree,
    old_root: NodeId,
    new: &SyntaxTree,
    new_root: NodeId,
    options: &MatchOptions,
    cancel: &CancellationToken,
) -> Result<Match> {
    let mut m = Match::new(old, old_root, new, new_root, MatchMode::Body);
    let matcher = Matcher { old, new, mode: MatchMode::Body, options, cancel };
    matcher.match_level(old_root, new_root, &mut m)?;
    matcher.match_detached(&mut m)?;
    tracing::debug!("body match {:?} -> {:?}: {} pairs", old_root, new_root, m.len());
    Ok(m)
}

impl Matcher<'_> {
    fn match_level(&self, old_parent: NodeId, new_parent: NodeId, m: &mut Match) -> Result<()> {
        self.cancel.check()?;
        let old_children: Vec<NodeId> =
            labeled_children(self.old, old_parent, self.mode).into_iter().filter(|c| m.new_partner(*c).is_none()).collect();
        let new_children: Vec<NodeId> =
            labeled_children(self.new, new_parent, self.mode).into_iter().filter(|c| m.old_partner(*c).is_none()).collect();
        if old_children.is_empty() || new_children.is_empty() {
            return Ok(());
        }
        // partner[i] = индекс нового ребёнка для старого i
        let mut partner: Vec<Option<usize>> = vec![None; old_children.len()];
        let mut new_taken = vec![false; new_children.len()];

        // 1. якоря
        let mut by_signature: HashMap<Signature, VecDeque<usize>> = HashMap::new();
        for (j, &c) in new_children.iter().enumerate() {
            if let Some(sig) = signature(self.new, c, self.mode) {
                by_signature.entry(sig).or_default().push_back(j);
            }
        }
        for (i, &c) in old_children.iter().enumerate() {
            let Some(sig) = signature(self.old, c, self.mode) else { continue };
            if let Some(j) = by_signature.get_mut(&sig).and_then(|q| q.pop_front()) {
                partner[i] = Some(j);
                new_taken[j] = true;
            }
        }

        // 2. LCS по меткам среди оставшихся
        let rest_old: Vec<usize> = (0..old_children.len()).filter(|i| partner[*i].is_none()).collect();
        let rest_new: Vec<usize> = (0..new_children.len()).filter(|j| !new_taken[*j]).collect();
        let label_eq = |i: &usize, j: &usize| {
            label(self.old, old_children[*i], self.mode) == label(self.new, new_children[*j], self.mode)
        };
        for edit in sequence_edits(&rest_old, &rest_new, label_eq) {
            if let SequenceEdit::Match { old, new } = edit {
                partner[rest_old[old]] = Some(rest_new[new]);
                new_taken[rest_new[new]] = true;
            }
        }

        // 3. best effort по сходству
        if partner.iter().any(Option::is_none) && new_taken.iter().any(|t| !t) {
            self.match_by_similarity(&old_children, &new_children, &mut partner, &mut new_taken);
        }

        // 4. рекурсия
        for (i, j) in partner.iter().enumerate() {
            if let Some(j) = j {
                m.add(old_children[i], new_children[*j]);
            }
        }
        for (i, j) in partner.iter().enumerate() {
            if let Some(j) = j {
                self.match_level(old_children[i], new_children[*j], m)?;
            }
        }
        Ok(())
    }

    /// Несопоставленные помеченные потомки тела в прямом порядке: сначала пары
    /// с равным fingerprint, затем по сходству. Ближайшие сопоставленные предки
    /// обоих узлов должны быть партнёрами.
    fn match_detached(&self, m: &mut Match) -> Result<()> {
        let (old_root, new_root) = (m.old_root(), m.new_root());
        for by_similarity in [false, true] {
            let old_nodes: Vec<NodeId> = labeled_descendants(self.old, old_root, self.mode)
                .into_iter()
                .filter(|o| m.new_partner(*o).is_none() && !self.is_operand(self.old, *o))
                .collect();
            let new_nodes: Vec<NodeId> = labeled_descendants(self.new, new_root, self.mode)
                .into_iter()
                .filter(|n| m.old_partner(*n).is_none() && !self.is_operand(self.new, *n))
                .collect();
            if old_nodes.is_empty() || new_nodes.is_empty() {
                return Ok(());
            }
            let new_bags: Vec<Option<FeatureBag<'_>>> =
                new_nodes.iter().map(|&n| by_similarity.then(|| FeatureBag::of(self.new, n))).collect();

            for o in old_nodes {
                self.cancel.check()?;
                if m.new_partner(o).is_some() {
                    continue;
                }
                let old_label = label(self.old, o, self.mode);
                let old_anchor = matched_ancestor(self.old, o, old_root, self.mode, |a| m.new_partner(a).is_some());
                let expected_anchor = m.new_partner(old_anchor);
                let old_bag = by_similarity.then(|| FeatureBag::of(self.old, o));
                let mut best: Option<(NodeId, f64)> = None;
                for (j, &n) in new_nodes.iter().enumerate() {
                    if m.old_partner(n).is_some() || label(self.new, n, self.mode) != old_label {
                        continue;
                    }
                    let score = match (&old_bag, &new_bags[j]) {
                        (Some(old_bag), Some(bag)) => old_bag.dice(bag),
                        _ if self.old.fingerprint(o) == self.new.fingerprint(n) => 1.0,
                        _ => continue,
                    };
                    if score < self.options.similarity_threshold || best.is_some_and(|(_, s)| score <= s) {
                        continue;
                    }
                    let new_anchor = matched_ancestor(self.new, n, new_root, self.mode, |a| m.old_partner(a).is_some());
                    if expected_anchor == Some(new_anchor) && self.descendants_agree(m, o, n) {
                        best = Some((n, score));
                    }
                }
                if let Some((n, _)) = best {
                    tracing::trace!("detached pair {:?} -> {:?}", o, n);
                    let untouched = !self.has_matched_descendants(m, o, n);
                    m.add(o, n);
                    // затронутые поддеревья досопоставляются этим же проходом
                    if untouched {
                        self.match_level(o, n, m)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Уже сопоставленные потомки `o` и `n` имеют партнёров внутри другого поддерева.
    fn descendants_agree(&self, m: &Match, o: NodeId, n: NodeId) -> bool {
        let old_inside = self.old.preorder(o).skip(1).all(|d| m.new_partner(d).map_or(true, |p| self.new.is_ancestor_of(n, p)));
        old_inside && self.new.preorder(n).skip(1).all(|d| m.old_partner(d).map_or(true, |p| self.old.is_ancestor_of(o, p)))
    }

    fn has_matched_descendants(&self, m: &Match, o: NodeId, n: NodeId) -> bool {
        self.old.preorder(o).skip(1).any(|d| m.new_partner(d).is_some())
            || self.new.preorder(n).skip(1).any(|d| m.old_partner(d).is_some())
    }

    fn is_operand(&self, tree: &SyntaxTree, id: NodeId) -> bool {
        label(tree, id, self.mode) == Some(Label::Statement(StatementLabel::Operand))
    }

    fn match_by_similarity(
        &self,
        old_children: &[NodeId],
        new_children: &[NodeId],
        partner: &mut [Option<usize>],
        new_taken: &mut [bool],
    ) {
        let new_bags: Vec<Option<FeatureBag<'_>>> = new_children
            .iter()
            .enumerate()
            .map(|(j, &c)| (!new_taken[j]).then(|| FeatureBag::of(self.new, c)))
            .collect();
        for (i, &oc) in old_children.iter().enumerate() {
            if partner[i].is_some() {
                continue;
            }
            let old_label = label(self.old, oc, self.mode);
            let old_bag = FeatureBag::of(self.old, oc);
            let mut best: Option<(usize, f64)> = None;
            for (j, &nc) in new_children.iter().enumerate() {
                if new_taken[j] || label(self.new, nc, self.mode) != old_label {
                    continue;
                }
                let Some(bag) = &new_bags[j] else { continue };
                let score = old_bag.dice(bag);
                // при равенстве остаётся более ранний кандидат
                if score >= self.options.similarity_threshold && best.map_or(true, |(_, s)| score > s) {
                    best = Some((j, score));
                }
            }
            if let Some((j, _)) = best {
                partner[i] = Some(j);
                new_taken[j] = true;
            }
        }
    }
}

/// Ближайший помеченный предок, удовлетворяющий `is_matched`; корень всегда сопоставлен.
fn matched_ancestor(
    tree: &SyntaxTree,
    id: NodeId,
    root: NodeId,
    mode: MatchMode,
    is_matched: impl Fn(NodeId) -> bool,
) -> NodeId {
    let mut cur = id;
    while let Some(parent) = labeled_parent(tree, cur, root, mode) {
        if parent == root || is_matched(parent) {
            return parent;
        }
        cur = parent;
    }
    root
}
