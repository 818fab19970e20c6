// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Construction of the marked interpolation tree.
//!
//! Tree interpolation takes an ordered forest of partitions and a
//! subtree-start array and hands the backend a single root formula in which
//! every internal node below the root is wrapped in an interpolation marker.
//! The tree is rebuilt from the flat array with an explicit stack; tree depth
//! is caller-controlled, so recursing on the native call stack is not an
//! option.

use crate::error::{Error, Result};
use crate::formula::{Backend, TermGuard};

/// Build the marked root formula for a tree interpolation query.
///
/// Every handle created along the way is held by `guard`, including the
/// returned root. The subtree array is validated as it is walked; a
/// descriptor that does not describe a single rooted tree is an
/// [`Error::InterpolationPrecondition`].
pub(crate) fn build_marked_tree<B: Backend>(
    backend: &B,
    guard: &mut TermGuard<'_, B>,
    partitions: &[Vec<B::Term>],
    start_of_subtree: &[usize],
) -> Result<B::Term> {
    let n = partitions.len();
    if n < 2 {
        return Err(Error::InterpolationPrecondition(
            "at least 2 partitions are needed for interpolation".to_string(),
        ));
    }
    if start_of_subtree.len() != n {
        return Err(Error::InterpolationPrecondition(format!(
            "{} partitions but {} subtree starts",
            n,
            start_of_subtree.len()
        )));
    }

    // the node formula of each partition is the conjunction of its members
    let mut nodes = Vec::with_capacity(n);
    for (i, partition) in partitions.iter().enumerate() {
        if partition.is_empty() {
            return Err(Error::InterpolationPrecondition(format!(
                "partition {i} is empty"
            )));
        }
        nodes.push(guard.hold(backend.and(partition)));
    }

    // Walk the nodes left to right. The stack holds completed subtrees that
    // have not been attached to a parent yet, as (subtree start,
    // interpolation point) pairs.
    let mut stack: Vec<(usize, B::Term)> = vec![];
    let mut last_subtree: Option<usize> = None;
    for (i, &current) in start_of_subtree.iter().enumerate() {
        if current > i {
            return Err(Error::InterpolationPrecondition(format!(
                "subtree of node {i} starts at {current}, after the node itself"
            )));
        }
        let conjunction = if last_subtree.map_or(true, |last| current > last) {
            // first node of a fresh subtree: a leaf with no children
            nodes[i].clone()
        } else {
            // merge point: this node's children are every completed subtree
            // at or right of `current`, in left-to-right order
            let mut children = vec![];
            while stack.last().map_or(false, |(start, _)| *start >= current) {
                children.push(stack.pop().unwrap().1);
            }
            children.reverse();
            children.push(nodes[i].clone());
            guard.hold(backend.and(&children))
        };
        // every node except the root is a genuine interpolation point
        let point = if i == n - 1 {
            conjunction
        } else {
            guard.hold(backend.mark_interpolant(&conjunction))
        };
        stack.push((current, point));
        last_subtree = Some(current);
    }

    match stack.as_slice() {
        [(0, root)] => Ok(root.clone()),
        _ => Err(Error::InterpolationPrecondition(format!(
            "subtree starts {start_of_subtree:?} do not describe a single rooted tree"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::TermGuard;
    use crate::testutil::ScriptedBackend;
    use smtlib::sexp::{parse, Sexp};

    fn terms(names: &[&str]) -> Vec<Vec<Sexp>> {
        names.iter().map(|n| vec![parse(n).unwrap()]).collect()
    }

    fn build(partitions: &[Vec<Sexp>], start: &[usize]) -> Result<String> {
        let backend = ScriptedBackend::new();
        let mut guard = TermGuard::new(&backend);
        let root = build_marked_tree(&backend, &mut guard, partitions, start)?;
        Ok(root.to_string())
    }

    #[test]
    fn test_chain_tree_shape() {
        // a sequence is a chain: each node's only child is its predecessor
        let root = build(&terms(&["A", "B", "C"]), &[0, 0, 0]).unwrap();
        insta::assert_snapshot!(root, @"(and (interp (and (interp A) B)) C)");
    }

    #[test]
    fn test_binary_tree_shape() {
        // two sibling leaves merged at the root
        let root = build(&terms(&["A", "B", "C"]), &[0, 1, 0]).unwrap();
        insta::assert_snapshot!(root, @"(and (interp A) (interp B) C)");
    }

    #[test]
    fn test_nested_tree_shape() {
        // right subtree has internal structure of its own
        let root = build(&terms(&["A", "B", "C", "D", "E"]), &[0, 1, 2, 1, 0]).unwrap();
        insta::assert_snapshot!(
            root,
            @"(and (interp A) (interp (and (interp B) (interp C) D)) E)"
        );
    }

    #[test]
    fn test_partition_conjunction() {
        let partitions = vec![
            vec![parse("P").unwrap(), parse("Q").unwrap()],
            vec![parse("R").unwrap()],
        ];
        let root = build(&partitions, &[0, 0]).unwrap();
        insta::assert_snapshot!(root, @"(and (interp (and P Q)) R)");
    }

    #[test]
    fn test_malformed_subtree_markers() {
        let cases: &[&[usize]] = &[
            &[0, 1],       // root's subtree does not start at 0
            &[0, 0, 1],    // same, with a longer chain
            &[0, 2, 0],    // subtree starting after its own node
            &[0, 1, 1, 2], // root not covering the whole forest
        ];
        for start in cases {
            let partitions = terms(&vec!["A"; start.len()]);
            let err = build(&partitions, start).unwrap_err();
            assert!(
                matches!(err, Error::InterpolationPrecondition(_)),
                "expected precondition error for {start:?}, got {err}"
            );
        }
    }

    #[test]
    fn test_too_few_partitions() {
        let err = build(&terms(&["A"]), &[0]).unwrap_err();
        assert!(matches!(err, Error::InterpolationPrecondition(_)));
        let err = build(&[vec![parse("A").unwrap()], vec![]], &[0, 0]).unwrap_err();
        assert!(matches!(err, Error::InterpolationPrecondition(_)));
    }

    #[test]
    fn test_intermediate_handles_released() {
        let backend = ScriptedBackend::new();
        {
            let mut guard = TermGuard::new(&backend);
            let partitions = terms(&["A", "B", "C"]);
            build_marked_tree(&backend, &mut guard, &partitions, &[0, 0, 0]).unwrap();
            assert!(backend.live_handles() > 0);
        }
        assert_eq!(backend.live_handles(), 0, "guard leaked handles");
        {
            // error paths release as well
            let mut guard = TermGuard::new(&backend);
            let partitions = terms(&["A", "B"]);
            build_marked_tree(&backend, &mut guard, &partitions, &[0, 1]).unwrap_err();
        }
        assert_eq!(backend.live_handles(), 0, "guard leaked handles on error");
    }
}
