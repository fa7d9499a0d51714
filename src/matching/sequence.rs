//! Minimal edit-distance alignment of two sequences (LCS).
//!
//! Общие префикс и суффикс сопоставляются сразу, середина выравнивается
//! динамическим программированием O(n·m). При восстановлении пути
//! предпочитается совпадение, затем удаление перед вставкой, поэтому результат
//! детерминирован.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum SequenceEdit {
    Match { old: usize, new: usize },
    Insert { new: usize },
    Delete { old: usize },
}

/// Выравнивание `old` и `new` по предикату равенства. Индексы в результате
/// возрастают по обеим последовательностям.
pub fn sequence_edits<T, U>(old: &[T], new: &[U], eq: impl Fn(&T, &U) -> bool) -> Vec<SequenceEdit> {
    let mut prefix = 0;
    while prefix < old.len() && prefix < new.len() && eq(&old[prefix], &new[prefix]) {
        prefix += 1;
    }
    let mut suffix = 0;
    while suffix < old.len() - prefix
        && suffix < new.len() - prefix
        && eq(&old[old.len() - 1 - suffix], &new[new.len() - 1 - suffix])
    {
        suffix += 1;
    }

    let mut edits: Vec<SequenceEdit> = (0..prefix).map(|i| SequenceEdit::Match { old: i, new: i }).collect();

    let a = &old[prefix..old.len() - suffix];
    let b = &new[prefix..new.len() - suffix];
    let table = suffix_lcs_table(a, b, &eq);
    let (mut i, mut j) = (0, 0);
    while i < a.len() || j < b.len() {
        if i < a.len() && j < b.len() && eq(&a[i], &b[j]) && table[i][j] == table[i + 1][j + 1] + 1 {
            edits.push(SequenceEdit::Match { old: prefix + i, new: prefix + j });
            i += 1;
            j += 1;
        } else if i < a.len() && (j == b.len() || table[i + 1][j] >= table[i][j + 1]) {
            edits.push(SequenceEdit::Delete { old: prefix + i });
            i += 1;
        } else {
            edits.push(SequenceEdit::Insert { new: prefix + j });
            j += 1;
        }
    }

    let (old_tail, new_tail) = (old.len() - suffix, new.len() - suffix);
    edits.extend((0..suffix).map(|k| SequenceEdit::Match { old: old_tail + k, new: new_tail + k }));
    edits
}

/// Длина наибольшей общей подпоследовательности.
pub fn lcs_length<T, U>(old: &[T], new: &[U], eq: impl Fn(&T, &U) -> bool) -> usize {
    suffix_lcs_table(old, new, &eq)[0][0]
}

/// table[i][j] = LCS(a[i..], b[j..]).
fn suffix_lcs_table<T, U>(a: &[T], b: &[U], eq: &impl Fn(&T, &U) -> bool) -> Vec<Vec<usize>> {
    let mut table = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for i in (0..a.len()).rev() {
        for j in (0..b.len()).rev() {
            table[i][j] = if eq(&a[i], &b[j]) {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use SequenceEdit::*;

    fn chars(s: &str) -> Vec<char> { s.chars().collect() }

    #[test]
    fn aligns_with_prefix_and_suffix() {
        let edits = sequence_edits(&chars("abcd"), &chars("axcd"), |a, b| a == b);
        assert_eq!(edits, vec![
            Match { old: 0, new: 0 },
            Delete { old: 1 },
            Insert { new: 1 },
            Match { old: 2, new: 2 },
            Match { old: 3, new: 3 },
        ]);
    }

    #[test]
    fn empty_sides() {
        assert_eq!(sequence_edits(&chars(""), &chars("ab"), |a, b| a == b), vec![Insert { new: 0 }, Insert { new: 1 }]);
        assert_eq!(sequence_edits(&chars("ab"), &chars(""), |a, b| a == b), vec![Delete { old: 0 }, Delete { old: 1 }]);
        assert!(sequence_edits(&chars(""), &chars(""), |a: &char, b: &char| a == b).is_empty());
    }

    #[test]
    fn reorder_keeps_longest_run() {
        let edits = sequence_edits(&chars("abc"), &chars("acb"), |a, b| a == b);
        let matched = edits.iter().filter(|e| matches!(e, Match { .. })).count();
        assert_eq!(matched, 2);
        assert_eq!(lcs_length(&chars("abc"), &chars("acb"), |a, b| a == b), 2);
        assert_eq!(edits.len(), 4);
    }
}
