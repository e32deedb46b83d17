//! Persisted shape of a project's version control.
//!
//! The history is stored flat, in pre-order, with each node naming its
//! parent. Sibling order is list order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{VcsError, VcsResult};
use crate::item::RevisionItem;
use crate::remote_cache::{RemoteCache, RemoteRevision};
use crate::revision::{Revision, RevisionId};
use crate::snapshot::Snapshot;
use crate::stash::StashesRepository;
use crate::tree::RevisionTree;

/// Version of the delta format. A persisted snapshot written under another
/// version is not trusted and gets rebuilt by replay.
pub const DIFF_FORMAT_VERSION: u32 = 1;

/// Everything version control persists for one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VcsDocument {
    #[serde(default)]
    pub diff_format_version: u32,
    pub head_revision_id: RevisionId,
    pub revisions: Vec<RevisionDocument>,
    #[serde(default)]
    pub stashes: StashesDocument,
    #[serde(default)]
    pub head: HeadDocument,
    #[serde(default)]
    pub remote_cache: RemoteCacheDocument,
}

impl VcsDocument {
    pub fn is_current_format(&self) -> bool {
        self.diff_format_version == DIFF_FORMAT_VERSION
    }
}

/// One revision, as a tree node or a stash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionDocument {
    pub id: RevisionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<RevisionId>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub shallow: bool,
    #[serde(default)]
    pub items: Vec<RevisionItem>,
}

impl RevisionDocument {
    pub fn from_revision(revision: &Revision, parent: Option<RevisionId>) -> Self {
        Self {
            id: revision.id(),
            parent,
            message: revision.message().to_string(),
            timestamp: revision.timestamp(),
            shallow: revision.is_shallow_copy(),
            items: revision.items().to_vec(),
        }
    }

    pub fn into_revision(self) -> Revision {
        if self.shallow {
            Revision::shallow(self.id, self.message, self.timestamp)
        } else {
            Revision::from_parts(self.id, self.message, self.timestamp, self.items)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StashesDocument {
    #[serde(default)]
    pub user: Vec<RevisionDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick: Option<RevisionDocument>,
}

impl StashesDocument {
    pub fn from_repository(stashes: &StashesRepository) -> Self {
        Self {
            user: stashes
                .user_stashes()
                .iter()
                .map(|s| RevisionDocument::from_revision(s, None))
                .collect(),
            quick: stashes
                .quick_stash()
                .map(|s| RevisionDocument::from_revision(s, None)),
        }
    }

    pub fn into_repository(self) -> StashesRepository {
        let mut stashes = StashesRepository::new();
        for stash in self.user {
            stashes.add_stash(stash.into_revision().into());
        }
        if let Some(quick) = self.quick {
            stashes.store_quick_stash(quick.into_revision().into());
        }
        stashes
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadDocument {
    #[serde(default)]
    pub snapshot: Vec<RevisionItem>,
}

impl HeadDocument {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            snapshot: snapshot.iter().cloned().collect(),
        }
    }

    pub fn into_snapshot(self) -> Snapshot {
        Snapshot::from_items(self.snapshot)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteCacheDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(default)]
    pub revisions: Vec<RemoteRevision>,
}

impl RemoteCacheDocument {
    pub fn from_cache(cache: &RemoteCache) -> Self {
        Self {
            last_sync: cache.last_sync(),
            revisions: cache.revisions(),
        }
    }

    pub fn into_cache(self) -> RemoteCache {
        RemoteCache::from_parts(self.revisions, self.last_sync)
    }
}

/// Flatten a tree in pre-order.
pub fn tree_to_documents(tree: &RevisionTree) -> Vec<RevisionDocument> {
    tree.walk()
        .into_iter()
        .map(|(_, revision)| {
            let parent = tree.parent(revision.id()).map(|p| p.id());
            RevisionDocument::from_revision(revision, parent)
        })
        .collect()
}

/// Rebuild a tree from its flat form. Parents must precede their children.
pub fn tree_from_documents(documents: Vec<RevisionDocument>) -> VcsResult<RevisionTree> {
    let mut documents = documents.into_iter();
    let root = documents
        .next()
        .ok_or_else(|| VcsError::InvalidDocument("history has no revisions".to_string()))?;
    if let Some(parent) = root.parent {
        return Err(VcsError::InvalidDocument(format!(
            "first revision {} has parent {parent}",
            root.id
        )));
    }

    let mut tree = RevisionTree::new(root.into_revision());
    for document in documents {
        let id = document.id;
        let parent = document.parent.ok_or_else(|| {
            VcsError::InvalidDocument(format!("revision {id} has no parent"))
        })?;
        tree.add_child(parent, document.into_revision())
            .map_err(|e| match e {
                VcsError::RevisionNotFound(_) => VcsError::InvalidDocument(format!(
                    "revision {id} listed before its parent {parent}"
                )),
                other => other,
            })?;
    }
    Ok(tree)
}
