use indextree::{Arena, NodeId};

use crate::model::{BucketDetail, Folder};

/// One folder entry held in the arena.
#[derive(Debug, Clone)]
pub struct FolderNode {
    /// Backend-assigned id, unique among siblings. 0 marks the synthetic root.
    pub folder_id: u64,
    pub name: String,
    pub size: u64,
}

/// A bucket's folder hierarchy in an arena, rooted at a synthetic node
/// carrying the bucket's name and total size.
///
/// Built once per fetched snapshot and never mutated afterwards: sizes
/// come from the backend already aggregated, and display ordering is
/// produced separately so the stored structure keeps its wire order.
pub struct BucketTree {
    arena: Arena<FolderNode>,
    root: NodeId,
}

impl BucketTree {
    /// Build the tree for one bucket from its fetched snapshot.
    pub fn from_detail(bucket_name: &str, detail: &BucketDetail) -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(FolderNode {
            folder_id: 0,
            name: bucket_name.to_string(),
            size: detail.size,
        });

        for folder in &detail.folders {
            append_folder(&mut arena, root, folder);
        }

        Self { arena, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn arena(&self) -> &Arena<FolderNode> {
        &self.arena
    }

    pub fn node(&self, id: NodeId) -> Option<&FolderNode> {
        self.arena.get(id).map(|n| n.get())
    }

    /// Size of one node, 0 for ids that are not in this arena.
    pub fn size_of(&self, id: NodeId) -> u64 {
        self.node(id).map(|n| n.size).unwrap_or(0)
    }

    /// Children in wire order (the order the backend sent them).
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.arena)
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        id.children(&self.arena).next().is_none()
    }

    /// The bucket's total as reported by the backend.
    pub fn total_size(&self) -> u64 {
        self.size_of(self.root)
    }

    /// Number of folders in the snapshot, the synthetic root excluded.
    pub fn folder_count(&self) -> usize {
        self.root.descendants(&self.arena).count().saturating_sub(1)
    }
}

fn append_folder(arena: &mut Arena<FolderNode>, parent: NodeId, folder: &Folder) {
    let node = arena.new_node(FolderNode {
        folder_id: folder.id,
        name: folder.name.clone(),
        size: folder.size,
    });
    parent.append(node, arena);

    for child in &folder.children {
        append_folder(arena, node, child);
    }
}
