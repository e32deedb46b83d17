//! The revision history tree.
//!
//! Nodes live in an arena; parent and child links are indices into it, and
//! an id index gives constant-time lookup. Revision trees hold hundreds of
//! nodes, not millions.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{VcsError, VcsResult};
use crate::item::RevisionItem;
use crate::revision::{Revision, RevisionBuilder, RevisionId};

#[derive(Debug, Clone)]
struct Node {
    revision: Arc<Revision>,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// Totals over a whole history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistoryStats {
    pub revisions: usize,
    pub deltas: usize,
}

/// A rooted tree of revisions. The root sits at arena index 0.
#[derive(Debug, Clone)]
pub struct RevisionTree {
    nodes: Vec<Node>,
    index: HashMap<RevisionId, usize>,
}

impl RevisionTree {
    pub fn new(root: Revision) -> Self {
        let id = root.id();
        Self {
            nodes: vec![Node {
                revision: Arc::new(root),
                parent: None,
                children: Vec::new(),
            }],
            index: HashMap::from([(id, 0)]),
        }
    }

    /// A fresh history with an empty root revision.
    pub fn with_root_message(message: impl Into<String>) -> Self {
        Self::new(RevisionBuilder::new(message).build())
    }

    pub fn root(&self) -> &Arc<Revision> {
        &self.nodes[0].revision
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: RevisionId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn get(&self, id: RevisionId) -> Option<&Arc<Revision>> {
        self.index.get(&id).map(|&i| &self.nodes[i].revision)
    }

    pub fn parent(&self, id: RevisionId) -> Option<&Arc<Revision>> {
        let node = &self.nodes[*self.index.get(&id)?];
        node.parent.map(|p| &self.nodes[p].revision)
    }

    /// Children in commit order.
    pub fn children(&self, id: RevisionId) -> Vec<&Arc<Revision>> {
        self.index
            .get(&id)
            .map(|&i| {
                self.nodes[i]
                    .children
                    .iter()
                    .map(|&c| &self.nodes[c].revision)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// A revision with no items and no children, like the root of a new
    /// project. Unknown ids count as empty.
    pub fn is_empty_revision(&self, id: RevisionId) -> bool {
        match self.index.get(&id) {
            Some(&i) => !self.nodes[i].revision.has_items() && self.nodes[i].children.is_empty(),
            None => true,
        }
    }

    /// Attach a new revision as the last child of `parent`.
    pub fn add_child(&mut self, parent: RevisionId, revision: Revision) -> VcsResult<Arc<Revision>> {
        let parent_index = *self
            .index
            .get(&parent)
            .ok_or(VcsError::RevisionNotFound(parent))?;
        if self.index.contains_key(&revision.id()) {
            return Err(VcsError::DuplicateRevision(revision.id()));
        }

        let revision = Arc::new(revision);
        let index = self.nodes.len();
        self.nodes.push(Node {
            revision: Arc::clone(&revision),
            parent: Some(parent_index),
            children: Vec::new(),
        });
        self.nodes[parent_index].children.push(index);
        self.index.insert(revision.id(), index);
        Ok(revision)
    }

    /// Graft another tree, root included, under `parent`.
    pub fn append_subtree(&mut self, parent: RevisionId, subtree: &RevisionTree) -> VcsResult<()> {
        if !self.contains(parent) {
            return Err(VcsError::RevisionNotFound(parent));
        }
        if let Some(duplicate) = subtree.index.keys().find(|id| self.contains(**id)) {
            return Err(VcsError::DuplicateRevision(*duplicate));
        }

        let mut pending = vec![(parent, subtree.root().id())];
        while let Some((attach_to, id)) = pending.pop() {
            let revision = subtree
                .get(id)
                .map(|r| r.as_ref().clone())
                .ok_or(VcsError::RevisionNotFound(id))?;
            self.add_child(attach_to, revision)?;
            // Reverse so children keep their order when popped
            for child in subtree.children(id).into_iter().rev() {
                pending.push((id, child.id()));
            }
        }
        Ok(())
    }

    /// Revisions from the root down to `id`, inclusive.
    pub fn path_to(&self, id: RevisionId) -> Option<Vec<Arc<Revision>>> {
        let mut path = Vec::new();
        let mut current = Some(*self.index.get(&id)?);
        while let Some(i) = current {
            path.push(Arc::clone(&self.nodes[i].revision));
            current = self.nodes[i].parent;
        }
        path.reverse();
        Some(path)
    }

    /// Ids from `id` up to the root, leaf first.
    pub fn ancestry(&self, id: RevisionId) -> Vec<RevisionId> {
        self.path_to(id)
            .map(|path| path.iter().rev().map(|r| r.id()).collect())
            .unwrap_or_default()
    }

    /// Swap a revision for a new value with the same id.
    pub(crate) fn replace_revision(&mut self, revision: Revision) -> VcsResult<Arc<Revision>> {
        let i = *self
            .index
            .get(&revision.id())
            .ok_or(VcsError::RevisionNotFound(revision.id()))?;
        let revision = Arc::new(revision);
        self.nodes[i].revision = Arc::clone(&revision);
        Ok(revision)
    }

    /// Append an item to a committed revision.
    pub(crate) fn amend(&mut self, id: RevisionId, item: RevisionItem) -> VcsResult<Arc<Revision>> {
        let amended = self.get(id).ok_or(VcsError::RevisionNotFound(id))?.amended(item);
        self.replace_revision(amended)
    }

    /// Pre-order walk yielding `(depth, revision)`, children in commit order.
    pub fn walk(&self) -> Vec<(usize, &Arc<Revision>)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(0usize, 0usize)];
        while let Some((depth, i)) = stack.pop() {
            out.push((depth, &self.nodes[i].revision));
            for &child in self.nodes[i].children.iter().rev() {
                stack.push((depth + 1, child));
            }
        }
        out
    }

    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            revisions: self.nodes.len(),
            deltas: self.nodes.iter().map(|n| n.revision.num_deltas()).sum(),
        }
    }
}
