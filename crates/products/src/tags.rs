//! Tag reconciliation.
//!
//! Updating a listing never replaces its tag rows wholesale. Instead the
//! current rows are diffed against the desired texts and only the difference
//! is written, so untouched tags keep their row ids.

use std::collections::HashSet;

use crate::ProductTag;

/// Minimal set of writes turning the current tag rows into the desired set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDiff {
    /// Desired texts with no current row.
    pub insert: Vec<String>,
    /// Current rows whose text is not desired (or duplicates a kept row).
    pub delete: Vec<ProductTag>,
}

impl TagDiff {
    pub fn is_empty(&self) -> bool {
        self.insert.is_empty() && self.delete.is_empty()
    }

    /// Row ids to delete.
    pub fn delete_ids(&self) -> Vec<i64> {
        self.delete.iter().map(|t| t.id).collect()
    }
}

/// Diff `current` rows against `desired` texts by exact text equality.
///
/// The two output lists are disjoint. Inserts follow `desired` order, deletes
/// follow `current` order.
pub fn reconcile(current: &[ProductTag], desired: &[String]) -> TagDiff {
    let wanted: HashSet<&str> = desired.iter().map(String::as_str).collect();

    let mut kept: HashSet<&str> = HashSet::with_capacity(current.len());
    let mut delete = Vec::new();
    for row in current {
        if wanted.contains(row.tag.as_str()) && kept.insert(row.tag.as_str()) {
            continue;
        }
        delete.push(row.clone());
    }

    let mut queued: HashSet<&str> = HashSet::new();
    let insert = desired
        .iter()
        .filter(|tag| !kept.contains(tag.as_str()) && queued.insert(tag.as_str()))
        .cloned()
        .collect();

    TagDiff { insert, delete }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_core::ProductId;

    fn rows(product_id: ProductId, tags: &[&str]) -> Vec<ProductTag> {
        tags.iter()
            .enumerate()
            .map(|(i, t)| ProductTag {
                id: i as i64 + 1,
                product_id,
                tag: t.to_string(),
            })
            .collect()
    }

    fn texts(tags: &[&str]) -> Vec<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn computes_inserts_and_deletes() {
        let pid = ProductId::new();
        let current = rows(pid, &["red", "blue", "green"]);

        let diff = reconcile(&current, &texts(&["blue", "yellow"]));

        assert_eq!(diff.insert, vec!["yellow"]);
        assert_eq!(diff.delete_ids(), vec![1, 3]);
    }

    #[test]
    fn identical_sets_yield_empty_diff() {
        let pid = ProductId::new();
        let current = rows(pid, &["a", "b"]);

        let diff = reconcile(&current, &texts(&["b", "a"]));
        assert!(diff.is_empty());
    }

    #[test]
    fn empty_inputs_are_valid() {
        assert!(reconcile(&[], &[]).is_empty());

        let pid = ProductId::new();
        let diff = reconcile(&rows(pid, &["a"]), &[]);
        assert_eq!(diff.delete_ids(), vec![1]);
        assert!(diff.insert.is_empty());

        let diff = reconcile(&[], &texts(&["a"]));
        assert_eq!(diff.insert, vec!["a"]);
        assert!(diff.delete.is_empty());
    }

    #[test]
    fn comparison_is_exact_text() {
        let pid = ProductId::new();
        let diff = reconcile(&rows(pid, &["Shoes"]), &texts(&["shoes"]));

        assert_eq!(diff.insert, vec!["shoes"]);
        assert_eq!(diff.delete_ids(), vec![1]);
    }

    #[test]
    fn duplicate_desired_tags_insert_once() {
        let diff = reconcile(&[], &texts(&["x", "x", "y"]));
        assert_eq!(diff.insert, vec!["x", "y"]);
    }

    #[test]
    fn duplicate_current_rows_are_collapsed() {
        let pid = ProductId::new();
        let diff = reconcile(&rows(pid, &["x", "x", "y"]), &texts(&["x", "y"]));

        assert!(diff.insert.is_empty());
        assert_eq!(diff.delete_ids(), vec![2]);
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::BTreeSet;

        /// Apply a diff to a row set the way the lifecycle manager does.
        fn apply(current: &[ProductTag], diff: &TagDiff, pid: ProductId) -> Vec<ProductTag> {
            let deleted: HashSet<i64> = diff.delete_ids().into_iter().collect();
            let mut next_id = current.iter().map(|t| t.id).max().unwrap_or(0);
            let mut out: Vec<ProductTag> = current.iter().filter(|t| !deleted.contains(&t.id)).cloned().collect();
            for tag in &diff.insert {
                next_id += 1;
                out.push(ProductTag { id: next_id, product_id: pid, tag: tag.clone() });
            }
            out
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: after applying the diff the tag texts equal the desired set, without duplicates.
            #[test]
            fn applying_diff_reaches_desired_set(
                current in proptest::collection::vec("[a-d]{1,2}", 0..8),
                desired in proptest::collection::vec("[a-d]{1,2}", 0..8),
            ) {
                let pid = ProductId::new();
                let current_rows: Vec<ProductTag> = current.iter().enumerate()
                    .map(|(i, t)| ProductTag { id: i as i64 + 1, product_id: pid, tag: t.clone() })
                    .collect();

                let diff = reconcile(&current_rows, &desired);
                let after = apply(&current_rows, &diff, pid);

                let after_texts: Vec<&str> = after.iter().map(|t| t.tag.as_str()).collect();
                let after_set: BTreeSet<&str> = after_texts.iter().copied().collect();
                let desired_set: BTreeSet<&str> = desired.iter().map(String::as_str).collect();

                prop_assert_eq!(after_texts.len(), after_set.len());
                prop_assert_eq!(after_set, desired_set);
            }

            /// Property: reconciling twice against the same desired set is a no-op the second time.
            #[test]
            fn reconcile_is_idempotent(
                current in proptest::collection::vec("[a-d]{1,2}", 0..8),
                desired in proptest::collection::vec("[a-d]{1,2}", 0..8),
            ) {
                let pid = ProductId::new();
                let current_rows: Vec<ProductTag> = current.iter().enumerate()
                    .map(|(i, t)| ProductTag { id: i as i64 + 1, product_id: pid, tag: t.clone() })
                    .collect();

                let first = reconcile(&current_rows, &desired);
                let after = apply(&current_rows, &first, pid);
                let second = reconcile(&after, &desired);

                prop_assert!(second.is_empty());
            }

            /// Property: inserts and deletes never share a text that is kept.
            #[test]
            fn insert_and_delete_are_disjoint(
                current in proptest::collection::vec("[a-c]", 0..6),
                desired in proptest::collection::vec("[a-c]", 0..6),
            ) {
                let pid = ProductId::new();
                let current_rows: Vec<ProductTag> = current.iter().enumerate()
                    .map(|(i, t)| ProductTag { id: i as i64 + 1, product_id: pid, tag: t.clone() })
                    .collect();

                let diff = reconcile(&current_rows, &desired);
                for tag in &diff.insert {
                    prop_assert!(!current.contains(tag));
                }
            }
        }
    }
}
