//! Build-order planning by iterative zero-dependency removal

use crate::{GraphError, GraphResult};
use prism_store::PackageName;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Compute parallel build stages for a package dependency map,
/// yielding the residual package set on a cycle.
///
/// Each round takes every remaining package whose dependency set
/// (restricted to the remaining packages) is empty, sorts the round
/// lexicographically for reproducibility, and removes it from the pool.
/// Dependencies pointing outside the map are pruned up front, so the
/// caller decides what "outside the build set" means.
///
/// A round that removes nothing while packages remain is an
/// unresolvable declared-dependency cycle; the residual set is returned
/// so a human can fix the metadata. Callers that cache the outcome as a
/// plain value use this directly; [`plan_stages`] wraps the residual
/// into the error type.
pub fn reduce_stages(
    graph: &BTreeMap<PackageName, BTreeSet<PackageName>>,
) -> Result<Vec<Vec<PackageName>>, Vec<PackageName>> {
    // restrict every dependency set to packages actually in the plan
    let mut remaining: BTreeMap<PackageName, BTreeSet<PackageName>> = graph
        .iter()
        .map(|(package, deps)| {
            let deps = deps
                .iter()
                .filter(|d| graph.contains_key(*d) && *d != package)
                .cloned()
                .collect();
            (package.clone(), deps)
        })
        .collect();

    let mut stages = Vec::new();
    while !remaining.is_empty() {
        // BTreeMap iteration keeps each stage lexicographically sorted
        let ready: Vec<PackageName> = remaining
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(package, _)| package.clone())
            .collect();

        if ready.is_empty() {
            return Err(remaining.keys().cloned().collect());
        }

        for package in &ready {
            remaining.remove(package);
        }
        for deps in remaining.values_mut() {
            for package in &ready {
                deps.remove(package);
            }
        }
        stages.push(ready);
    }

    debug!(stages = stages.len(), "planned build stages");
    Ok(stages)
}

/// Parallel build stages, with the cycle residual as an error
pub fn plan_stages(
    graph: &BTreeMap<PackageName, BTreeSet<PackageName>>,
) -> GraphResult<Vec<Vec<PackageName>>> {
    reduce_stages(graph).map_err(|remaining| GraphError::CyclicDependency { remaining })
}

/// Linear build order: the concatenation of [`plan_stages`]
pub fn plan_order(
    graph: &BTreeMap<PackageName, BTreeSet<PackageName>>,
) -> GraphResult<Vec<PackageName>> {
    Ok(plan_stages(graph)?.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn graph(edges: &[(&str, &[&str])]) -> BTreeMap<PackageName, BTreeSet<PackageName>> {
        edges
            .iter()
            .map(|(package, deps)| {
                (
                    package.to_string(),
                    deps.iter().map(|d| d.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_empty_plan() {
        assert!(plan_order(&graph(&[])).unwrap().is_empty());
        assert!(plan_stages(&graph(&[])).unwrap().is_empty());
    }

    #[test]
    fn test_linear_chain() {
        let order = plan_order(&graph(&[("a", &["b"]), ("b", &["c"]), ("c", &[])])).unwrap();
        assert_eq!(order, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_independent_packages_in_lexical_order() {
        let order = plan_order(&graph(&[("b", &[]), ("a", &[])])).unwrap();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn test_diamond_stages() {
        let stages = plan_stages(&graph(&[
            ("root", &["left", "right"]),
            ("left", &["bottom"]),
            ("right", &["bottom"]),
            ("bottom", &[]),
        ]))
        .unwrap();

        assert_eq!(
            stages,
            vec![
                vec!["bottom".to_string()],
                vec!["left".to_string(), "right".to_string()],
                vec!["root".to_string()],
            ]
        );
    }

    #[test]
    fn test_deps_outside_plan_are_pruned() {
        // "zlib" is not in the plan; "a" must still be buildable
        let order = plan_order(&graph(&[("a", &["zlib"]), ("b", &["a"])])).unwrap();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn test_self_dependency_is_pruned() {
        let order = plan_order(&graph(&[("a", &["a"])])).unwrap();
        assert_eq!(order, vec!["a"]);
    }

    #[test]
    fn test_reduce_stages_residual_is_plain_value() {
        let result = reduce_stages(&graph(&[("a", &["b"]), ("b", &["a"])]));
        assert_eq!(result, Err(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_cycle_fails_with_residual_set() {
        let result = plan_order(&graph(&[("a", &["b"]), ("b", &["a"]), ("c", &[])]));
        match result {
            Err(GraphError::CyclicDependency { remaining }) => {
                assert_eq!(remaining, vec!["a", "b"]);
            }
            other => panic!("expected cyclic dependency, got {other:?}"),
        }
    }

    #[test]
    fn test_determinism_across_runs() {
        let input = graph(&[
            ("pkg-e", &[]),
            ("pkg-a", &[]),
            ("pkg-c", &["pkg-a"]),
            ("pkg-b", &["pkg-a"]),
            ("pkg-d", &["pkg-b", "pkg-c"]),
        ]);
        let first = plan_order(&input).unwrap();
        for _ in 0..10 {
            assert_eq!(plan_order(&input).unwrap(), first);
        }
        assert_eq!(first, vec!["pkg-a", "pkg-e", "pkg-b", "pkg-c", "pkg-d"]);
    }
}
