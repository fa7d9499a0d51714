//! Subtree similarity for best-effort matching.
//!
//! Dice coefficient over feature multisets:
//!
//! D(A, B) = 2·|A ∩ B| / (|A| + |B|)
//!
//! Признаки поддерева: вид каждого узла плюс текст идентификаторов, литералов,
//! токенов и имена объявлений. Значение лежит в [0.0, 1.0], 1.0 означает
//! совпадение мультимножеств.

use crate::ast_core::{NodeId, SyntaxTree};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Feature<'t> {
    Kind(u16),
    Text(&'t str),
}

/// Мультимножество признаков поддерева.
#[derive(Debug, Clone, Default)]
pub struct FeatureBag<'t> {
    counts: HashMap<Feature<'t>, u32>,
    total: u32,
}

impl<'t> FeatureBag<'t> {
    pub fn of(tree: &'t SyntaxTree, root: NodeId) -> Self {
        let mut bag = FeatureBag::default();
        for id in tree.preorder(root) {
            bag.add(Feature::Kind(tree.kind(id) as u16));
            if let Some(text) = tree.text(id).or_else(|| tree.name(id)) {
                bag.add(Feature::Text(text));
            }
        }
        bag
    }

    fn add(&mut self, f: Feature<'t>) {
        *self.counts.entry(f).or_insert(0) += 1;
        self.total += 1;
    }

    pub fn len(&self) -> u32 { self.total }
    pub fn is_empty(&self) -> bool { self.total == 0 }

    pub fn dice(&self, other: &FeatureBag<'t>) -> f64 {
        if self.total + other.total == 0 {
            return 1.0;
        }
        let common: u32 = self
            .counts
            .iter()
            .map(|(f, c)| other.counts.get(f).map_or(0, |oc| (*c).min(*oc)))
            .sum();
        2.0 * common as f64 / (self.total + other.total) as f64
    }
}

/// Сходство двух поддеревьев из разных деревьев.
pub fn subtree_similarity(old: &SyntaxTree, o: NodeId, new: &SyntaxTree, n: NodeId) -> f64 {
    FeatureBag::of(old, o).dice(&FeatureBag::of(new, n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast_core::{SyntaxKind, TreeBuilder};

    fn call(name: &str, args: &[&str]) -> SyntaxTree {
        let mut b = TreeBuilder::new();
        b.start_node(SyntaxKind::ExpressionStatement);
        b.start_node(SyntaxKind::InvocationExpression);
        b.ident(name);
        for a in args {
            b.literal(a);
        }
        b.finish_node();
        b.finish_node();
        b.build().unwrap()
    }

    #[test]
    fn identical_and_disjoint() {
        let a = call("Print", &["1", "2"]);
        let b = call("Print", &["1", "2"]);
        assert_eq!(subtree_similarity(&a, a.root(), &b, b.root()), 1.0);

        let c = call("Print", &["1", "3"]);
        let s = subtree_similarity(&a, a.root(), &c, c.root());
        assert!(s > 0.5 && s < 1.0, "similarity {s}");
    }
}
