//! Cycle-safe transitive closure computation

use prism_store::ModuleName;
use std::collections::BTreeSet;

/// Flat transitive closure of `deps` starting from `seed`.
///
/// Every discovered name is expanded at most once, so the walk
/// terminates on cyclic graphs in O(edges). The seed itself is excluded
/// from the result even when a cycle leads back to it.
pub fn closure_keys<F>(seed: &str, mut deps: F) -> BTreeSet<ModuleName>
where
    F: FnMut(&str) -> BTreeSet<ModuleName>,
{
    let mut seen: BTreeSet<ModuleName> = BTreeSet::new();
    seen.insert(seed.to_string());
    let mut result = BTreeSet::new();
    let mut pending: Vec<ModuleName> = deps(seed).into_iter().collect();

    while let Some(name) = pending.pop() {
        if !seen.insert(name.clone()) {
            continue;
        }
        pending.extend(deps(&name));
        result.insert(name);
    }
    result
}

/// A node in a dependency display tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepNode {
    pub name: ModuleName,
    /// Arena indices of this node's children
    pub children: Vec<usize>,
}

/// Dependency tree mirroring first-discovery parentage.
///
/// Nodes are arena-allocated and expansion uses an explicit pending
/// stack, so depth is bounded by heap, not call stack. A name already
/// discovered elsewhere still appears as a leaf under each later parent
/// but is never expanded twice; this is a presentation view, not a
/// correctness-bearing structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepTree {
    nodes: Vec<DepNode>,
    root: usize,
}

impl DepTree {
    /// The seed node
    pub fn root(&self) -> &DepNode {
        &self.nodes[self.root]
    }

    /// Node by arena index
    pub fn get(&self, index: usize) -> Option<&DepNode> {
        self.nodes.get(index)
    }

    /// Total node count, duplicates included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Render as an indented listing, children in discovery order
    pub fn to_display(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![(self.root, 0usize)];
        while let Some((index, depth)) = stack.pop() {
            let node = &self.nodes[index];
            out.push_str(&"  ".repeat(depth));
            out.push_str(&node.name);
            out.push('\n');
            for &child in node.children.iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        out
    }
}

/// Dependency tree of `deps` starting from `seed`.
///
/// Same traversal as [`closure_keys`] but preserving who discovered
/// whom.
pub fn closure_tree<F>(seed: &str, mut deps: F) -> DepTree
where
    F: FnMut(&str) -> BTreeSet<ModuleName>,
{
    let mut nodes = vec![DepNode {
        name: seed.to_string(),
        children: Vec::new(),
    }];
    let mut seen: BTreeSet<ModuleName> = BTreeSet::new();
    seen.insert(seed.to_string());

    // indices of nodes whose children are not materialized yet
    let mut pending = vec![0usize];
    while let Some(parent) = pending.pop() {
        let parent_name = nodes[parent].name.clone();
        for dep in deps(&parent_name) {
            let index = nodes.len();
            let expand = seen.insert(dep.clone());
            nodes.push(DepNode {
                name: dep,
                children: Vec::new(),
            });
            nodes[parent].children.push(index);
            if expand {
                pending.push(index);
            }
        }
    }

    DepTree { nodes, root: 0 }
}
