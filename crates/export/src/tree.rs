//! Nested-set (MPTT) indices for the exported tree.
//!
//! Indices are computed once, after every node has been written, instead of
//! being maintained on each insert.

use crate::models::TreeIndex;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Minimal view of a node needed to place it in the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub id: String,
    pub parent_id: Option<String>,
    pub sort_order: f64,
}

/// Compute `lft`/`rght`/`level`/`tree_id` for every node.
///
/// Siblings are visited by `sort_order`, ties broken by id. Each parentless
/// node starts its own tree, numbered from 1 in input order. A node whose
/// parent is not in `nodes` is treated as a root.
pub fn compute_tree_indices(nodes: &[TreeNode]) -> HashMap<String, TreeIndex> {
    let known: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let mut children: HashMap<&str, Vec<&TreeNode>> = HashMap::new();
    let mut roots = Vec::new();
    for node in nodes {
        match node.parent_id.as_deref() {
            Some(parent) if known.contains(parent) && parent != node.id => {
                children.entry(parent).or_default().push(node);
            },
            _ => roots.push(node),
        }
    }
    for siblings in children.values_mut() {
        siblings.sort_by(|a, b| {
            a.sort_order.partial_cmp(&b.sort_order).unwrap_or(Ordering::Equal).then_with(|| a.id.cmp(&b.id))
        });
    }

    let mut indices = HashMap::with_capacity(nodes.len());
    for (position, root) in roots.into_iter().enumerate() {
        let tree_id = position as i64 + 1;
        let mut counter = 1;
        // Explicit stack; channel trees can be deep enough to make recursion uncomfortable.
        let mut stack: Vec<(&TreeNode, i64, usize)> = vec![(root, 0, 0)];
        let mut lefts: HashMap<&str, i64> = HashMap::new();
        while let Some((node, level, next_child)) = stack.pop() {
            if next_child == 0 {
                lefts.insert(node.id.as_str(), counter);
                counter += 1;
            }
            let kids = children.get(node.id.as_str()).map(Vec::as_slice).unwrap_or_default();
            if let Some(child) = kids.get(next_child) {
                stack.push((node, level, next_child + 1));
                stack.push((child, level + 1, 0));
                continue;
            }
            let lft = lefts.get(node.id.as_str()).copied().unwrap_or_default();
            indices.insert(node.id.clone(), TreeIndex { lft, rght: counter, tree_id, level });
            counter += 1;
        }
    }
    indices
}
