// src/common/sync.rs
//
// Sincronização de conjuntos (habilidades de um membro, membros de um grupo)
// por diferença: só grava o que entrou e apaga o que saiu.

use std::collections::HashSet;
use std::hash::Hash;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDiff<T> {
    pub added: Vec<T>,
    pub removed: Vec<T>,
}

impl<T> SetDiff<T>
where
    T: Eq + Hash + Clone,
{
    /// `added` segue a ordem de `desired`, `removed` a ordem de `current`.
    /// Duplicatas são descartadas nos dois lados.
    pub fn between(current: &[T], desired: &[T]) -> Self {
        let current_set: HashSet<&T> = current.iter().collect();
        let desired_set: HashSet<&T> = desired.iter().collect();

        let mut seen = HashSet::new();
        let added = desired
            .iter()
            .filter(|item| !current_set.contains(item) && seen.insert(*item))
            .cloned()
            .collect();

        let mut seen = HashSet::new();
        let removed = current
            .iter()
            .filter(|item| !desired_set.contains(item) && seen.insert(*item))
            .cloned()
            .collect();

        Self { added, removed }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Remove duplicatas mantendo a primeira ocorrência.
pub fn dedup_preserving_order<T>(items: &[T]) -> Vec<T>
where
    T: Eq + Hash + Clone,
{
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|item| seen.insert(*item))
        .cloned()
        .collect()
}

/// Aplica a diferença a uma lista em memória, como o banco ficará depois.
pub fn apply_diff<T>(current: &[T], diff: &SetDiff<T>) -> Vec<T>
where
    T: Eq + Hash + Clone,
{
    let removed: HashSet<&T> = diff.removed.iter().collect();
    let mut result: Vec<T> = current
        .iter()
        .filter(|item| !removed.contains(item))
        .cloned()
        .collect();
    result.extend(diff.added.iter().cloned());
    dedup_preserving_order(&result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_resync_keeps_common_members() {
        let diff = SetDiff::between(&["m1", "m2"], &["m2", "m3"]);
        assert_eq!(diff.added, vec!["m3"]);
        assert_eq!(diff.removed, vec!["m1"]);
        assert_eq!(apply_diff(&["m1", "m2"], &diff), vec!["m2", "m3"]);
    }

    #[test]
    fn empty_desired_set_removes_everything() {
        let diff = SetDiff::between(&["violão", "louvor"], &[]);
        assert!(diff.added.is_empty());
        assert_eq!(diff.removed, vec!["violão", "louvor"]);
        assert!(apply_diff(&["violão", "louvor"], &diff).is_empty());
    }

    #[test]
    fn identical_sets_produce_no_writes() {
        let diff = SetDiff::between(&[1, 2, 3], &[3, 2, 1]);
        assert!(diff.is_empty());
    }

    #[test]
    fn duplicates_are_ignored() {
        let diff = SetDiff::between(&[1, 1], &[2, 2, 3]);
        assert_eq!(diff.added, vec![2, 3]);
        assert_eq!(diff.removed, vec![1]);
        assert_eq!(dedup_preserving_order(&[3, 1, 3, 2, 1]), vec![3, 1, 2]);
    }
}
