use std::collections::HashSet;

use indextree::NodeId;

use crate::tree::BucketTree;

/// Tracks which folder nodes are currently expanded.
///
/// State is per node and UI-only: it starts empty for every freshly
/// mounted bucket and is dropped with it. Collapsing a node also forgets
/// the recorded state of its whole subtree, so a branch always reopens
/// collapsed.
#[derive(Debug, Default)]
pub struct ExpansionState {
    expanded: HashSet<NodeId>,
}

impl ExpansionState {
    /// Expand one node. Leaves are refused so they can never render expanded.
    pub fn expand(&mut self, id: NodeId, tree: &BucketTree) -> bool {
        if tree.is_leaf(id) {
            return false;
        }
        self.expanded.insert(id);
        true
    }

    /// Collapse a node and clear the state of every node underneath it.
    pub fn collapse(&mut self, id: NodeId, tree: &BucketTree) {
        // descendants() yields the node itself first.
        for descendant in id.descendants(tree.arena()) {
            self.expanded.remove(&descendant);
        }
    }

    /// Flip one node, returning the state it ends up in.
    pub fn toggle(&mut self, id: NodeId, tree: &BucketTree) -> bool {
        if self.is_expanded(id) {
            self.collapse(id, tree);
            false
        } else {
            self.expand(id, tree)
        }
    }

    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.expanded.contains(&id)
    }

    /// Reset every node to collapsed.
    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BucketDetail, Folder};

    fn folder(id: u64, name: &str, size: u64, children: Vec<Folder>) -> Folder {
        Folder {
            id,
            name: name.to_string(),
            size,
            children,
        }
    }

    // assets
    // ├── media
    // │   ├── raw
    // │   │   └── 2024
    // │   └── thumbs
    // └── docs
    //     └── reports
    fn sample_tree() -> BucketTree {
        let detail = BucketDetail {
            size: 300,
            datetime: String::new(),
            manual: false,
            folders: vec![
                folder(
                    1,
                    "media",
                    200,
                    vec![
                        folder(2, "raw", 150, vec![folder(3, "2024", 150, vec![])]),
                        folder(4, "thumbs", 50, vec![]),
                    ],
                ),
                folder(5, "docs", 100, vec![folder(6, "reports", 80, vec![])]),
            ],
        };
        BucketTree::from_detail("assets", &detail)
    }

    fn by_name(tree: &BucketTree, name: &str) -> NodeId {
        tree.root()
            .descendants(tree.arena())
            .find(|&id| tree.node(id).unwrap().name == name)
            .unwrap()
    }

    #[test]
    fn test_toggle_expand_collapse() {
        let tree = sample_tree();
        let mut state = ExpansionState::default();
        let media = by_name(&tree, "media");

        assert!(!state.is_expanded(media));
        assert!(state.toggle(media, &tree));
        assert!(state.is_expanded(media));
        assert!(!state.toggle(media, &tree));
        assert!(!state.is_expanded(media));
    }

    #[test]
    fn test_collapse_clears_subtree() {
        let tree = sample_tree();
        let mut state = ExpansionState::default();
        let media = by_name(&tree, "media");
        let raw = by_name(&tree, "raw");

        state.expand(media, &tree);
        state.expand(raw, &tree);

        state.collapse(media, &tree);

        assert!(!state.is_expanded(media));
        // Re-expanding must show the branch collapsed again.
        assert!(!state.is_expanded(raw));
    }

    #[test]
    fn test_toggle_leaves_siblings_alone() {
        let tree = sample_tree();
        let mut state = ExpansionState::default();
        let media = by_name(&tree, "media");
        let docs = by_name(&tree, "docs");

        state.expand(media, &tree);
        state.expand(docs, &tree);

        state.toggle(media, &tree);
        state.toggle(media, &tree);

        assert!(state.is_expanded(media));
        assert!(state.is_expanded(docs));
    }

    #[test]
    fn test_leaf_never_expands() {
        let tree = sample_tree();
        let mut state = ExpansionState::default();
        let thumbs = by_name(&tree, "thumbs");

        assert!(!state.expand(thumbs, &tree));
        assert!(!state.toggle(thumbs, &tree));
        assert!(!state.is_expanded(thumbs));
    }

    #[test]
    fn test_collapse_all() {
        let tree = sample_tree();
        let mut state = ExpansionState::default();
        let media = by_name(&tree, "media");
        let raw = by_name(&tree, "raw");

        state.expand(media, &tree);
        state.expand(raw, &tree);

        state.collapse_all();

        assert!(!state.is_expanded(media));
        assert!(!state.is_expanded(raw));
    }
}
