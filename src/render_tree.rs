use std::collections::HashMap;

use indextree::NodeId;

use crate::expand_state::ExpansionState;
use crate::tree::BucketTree;

/// One visible row of the folder tree, ready for either frontend to paint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub id: NodeId,
    /// Backend folder id, stable within one snapshot. 0 is the synthetic root.
    pub folder_id: u64,
    /// Nesting depth, 0 for the bucket's top-level folders.
    pub depth: u16,
    pub name: String,
    pub size: u64,
    pub has_children: bool,
    pub expanded: bool,
}

/// Per-level display order, size descending, computed at most once per
/// tree snapshot.
///
/// The stored tree keeps its wire order (it is never reordered in
/// place); this cache holds the sorted view of each parent's children.
/// Repeated render passes over the same snapshot reuse the cached
/// orders, so toggling one node never re-sorts its siblings' subtrees.
/// A cache indexes exactly one tree and must be replaced together with
/// it; NodeIds are only meaningful for the arena they came from.
#[derive(Debug, Default)]
pub struct SortCache {
    orders: HashMap<NodeId, Vec<NodeId>>,
    levels_computed: usize,
}

impl SortCache {
    /// Sorted children of `parent`, from the cache when already computed.
    ///
    /// Stable sort: equal sizes keep the backend's relative order.
    pub fn level(&mut self, tree: &BucketTree, parent: NodeId) -> Vec<NodeId> {
        if let Some(order) = self.orders.get(&parent) {
            return order.clone();
        }

        let mut order: Vec<NodeId> = tree.children(parent).collect();
        order.sort_by(|&a, &b| tree.size_of(b).cmp(&tree.size_of(a)));

        self.levels_computed += 1;
        self.orders.insert(parent, order.clone());
        order
    }

    /// How many levels have actually been sorted so far.
    pub fn levels_computed(&self) -> usize {
        self.levels_computed
    }
}

/// Flatten the currently visible part of the tree into rows.
///
/// Emits each level in its cached sorted order and recurses only under
/// expanded non-leaf nodes, so a collapsed branch costs nothing. The
/// synthetic root itself is not emitted; rows start at the bucket's
/// top-level folders.
pub fn build_tree_rows(
    tree: &BucketTree,
    expansion: &ExpansionState,
    cache: &mut SortCache,
) -> Vec<TreeRow> {
    let mut rows = Vec::new();
    push_level(tree, tree.root(), 0, expansion, cache, &mut rows);
    rows
}

fn push_level(
    tree: &BucketTree,
    parent: NodeId,
    depth: u16,
    expansion: &ExpansionState,
    cache: &mut SortCache,
    rows: &mut Vec<TreeRow>,
) {
    for id in cache.level(tree, parent) {
        if let Some(node) = tree.node(id) {
            let has_children = !tree.is_leaf(id);
            let expanded = has_children && expansion.is_expanded(id);

            rows.push(TreeRow {
                id,
                folder_id: node.folder_id,
                depth,
                name: node.name.clone(),
                size: node.size,
                has_children,
                expanded,
            });

            if expanded {
                push_level(tree, id, depth + 1, expansion, cache, rows);
            }
        }
    }
}
