//! Relation splicing helpers behind generated `load_*` methods.
//!
//! Generated clients load related rows in two shapes: a single load that
//! filters the related table by one parent's key, and a batched load that
//! collects the distinct keys of many parents, issues exactly one related
//! query, and splices the children back onto their parents in memory. The
//! helpers here cover the batched shape; the single shape is plain condition
//! injection and lives in the generated code (see `tests_cfg`).

use std::collections::HashMap;
use std::hash::Hash;

/// Distinct foreign keys of `parents`, in first-seen order.
///
/// Order matters: the related query's IN-list, and therefore its SQL text,
/// must be deterministic for a given parent slice.
pub fn distinct_keys<P, K, F>(parents: &[P], key_of: F) -> Vec<K>
where
    K: Eq + Hash + Clone,
    F: Fn(&P) -> K,
{
    let mut seen = HashMap::with_capacity(parents.len());
    let mut keys = Vec::with_capacity(parents.len());
    for parent in parents {
        let key = key_of(parent);
        if seen.insert(key.clone(), ()).is_none() {
            keys.push(key);
        }
    }
    keys
}

/// Splice single children onto their parents by key lookup.
///
/// Children are indexed by their key; each parent receives at most one child
/// via `assign`. The lookup is non-destructive: when several parents share a
/// foreign key (a many-to-one relation), every one of them receives a clone
/// of the shared child. Parents with no matching child are left untouched.
pub fn assign_one<P, C, K, PK, CK, A>(
    parents: &mut [P],
    children: Vec<C>,
    parent_key: PK,
    child_key: CK,
    mut assign: A,
) where
    C: Clone,
    K: Eq + Hash,
    PK: Fn(&P) -> K,
    CK: Fn(&C) -> K,
    A: FnMut(&mut P, C),
{
    let by_key: HashMap<K, C> = children
        .into_iter()
        .map(|child| (child_key(&child), child))
        .collect();
    for parent in parents {
        if let Some(child) = by_key.get(&parent_key(parent)) {
            assign(parent, child.clone());
        }
    }
}

/// Splice one-to-many children onto their parents.
///
/// Children accumulate per key in query return order, and parents sharing a
/// key each receive the full group. Parents with no matching children are
/// left untouched: the relation field stays unset rather than becoming an
/// empty collection, so "not loaded" and "loaded, none found" stay
/// distinguishable.
pub fn assign_many<P, C, K, PK, CK, A>(
    parents: &mut [P],
    children: Vec<C>,
    parent_key: PK,
    child_key: CK,
    mut assign: A,
) where
    C: Clone,
    K: Eq + Hash,
    PK: Fn(&P) -> K,
    CK: Fn(&C) -> K,
    A: FnMut(&mut P, Vec<C>),
{
    let mut by_key: HashMap<K, Vec<C>> = HashMap::new();
    for child in children {
        by_key.entry(child_key(&child)).or_default().push(child);
    }
    for parent in parents {
        if let Some(group) = by_key.get(&parent_key(parent)) {
            assign(parent, group.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Parent {
        id: i64,
        one: Option<&'static str>,
        many: Option<Vec<i64>>,
    }

    fn parent(id: i64) -> Parent {
        Parent {
            id,
            one: None,
            many: None,
        }
    }

    #[test]
    fn distinct_keys_preserve_first_seen_order() {
        let parents = [parent(3), parent(1), parent(3), parent(2), parent(1)];
        let keys = distinct_keys(&parents, |p| p.id);
        assert_eq!(keys, vec![3, 1, 2]);
    }

    #[test]
    fn one_to_one_splice_leaves_unmatched_parents_alone() {
        let mut parents = [parent(1), parent(2)];
        let children = vec![(1i64, "phone")];
        assign_one(
            &mut parents,
            children,
            |p| p.id,
            |c| c.0,
            |p, c| p.one = Some(c.1),
        );
        assert_eq!(parents[0].one, Some("phone"));
        assert_eq!(parents[1].one, None);
    }

    #[test]
    fn parents_sharing_a_key_each_receive_the_child() {
        // Many-to-one: several parents reference the same related row.
        let mut parents = [parent(7), parent(7), parent(8)];
        let children = vec![(7i64, "shared-user")];
        assign_one(
            &mut parents,
            children,
            |p| p.id,
            |c| c.0,
            |p, c| p.one = Some(c.1),
        );
        assert_eq!(parents[0].one, Some("shared-user"));
        assert_eq!(parents[1].one, Some("shared-user"));
        assert_eq!(parents[2].one, None);
    }

    #[test]
    fn parents_sharing_a_key_each_receive_the_group() {
        let mut parents = [parent(7), parent(7)];
        let children = vec![(7i64, 70), (7i64, 71)];
        assign_many(
            &mut parents,
            children,
            |p| p.id,
            |c| c.0,
            |p, group| p.many = Some(group.into_iter().map(|c| c.1).collect()),
        );
        assert_eq!(parents[0].many, Some(vec![70, 71]));
        assert_eq!(parents[1].many, Some(vec![70, 71]));
    }

    #[test]
    fn one_to_many_splice_groups_in_return_order() {
        let mut parents = [parent(1), parent(2), parent(3)];
        let children = vec![(2i64, 20), (1i64, 10), (2i64, 21)];
        assign_many(
            &mut parents,
            children,
            |p| p.id,
            |c| c.0,
            |p, group| p.many = Some(group.into_iter().map(|c| c.1).collect()),
        );
        assert_eq!(parents[0].many, Some(vec![10]));
        assert_eq!(parents[1].many, Some(vec![20, 21]));
        // No match means the field stays None, not Some(vec![]).
        assert_eq!(parents[2].many, None);
    }
}
