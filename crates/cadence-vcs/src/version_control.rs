//! The version-control façade.
//!
//! Owns the history tree, the head, the stashes and the remote cache, and
//! orchestrates commit, stash, cherry-pick and checkout on top of them. All
//! operations run on the calling thread; only working-diff recomputation
//! happens in the background.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bus::{EventBus, VcsEvent};
use crate::config::VcsConfig;
use crate::document::{
    tree_from_documents, tree_to_documents, HeadDocument, RemoteCacheDocument, StashesDocument,
    VcsDocument, DIFF_FORMAT_VERSION,
};
use crate::error::{VcsError, VcsResult};
use crate::head::{DiffSelection, Head, WorkingDiff};
use crate::item::{ChangeKind, RevisionItem};
use crate::remote_cache::{RemoteCache, RemoteRevision, SyncState};
use crate::revision::{Revision, RevisionBuilder, RevisionId};
use crate::stash::StashesRepository;
use crate::tracked::{TrackedItem, TrackedItemsSource};
use crate::tree::{HistoryStats, RevisionTree};

/// Version control for one project.
#[derive(Debug)]
pub struct VersionControl {
    config: VcsConfig,
    tree: RevisionTree,
    head: Head,
    stashes: StashesRepository,
    remote_cache: RemoteCache,
    bus: EventBus,
}

impl VersionControl {
    /// A fresh history: a single empty root revision with the head on it.
    pub fn new(source: Arc<dyn TrackedItemsSource>, config: VcsConfig) -> Self {
        let tree = RevisionTree::with_root_message(config.root_message.clone());
        let mut vcs = Self::with_tree(source, config, tree);
        let root = Arc::clone(vcs.tree.root());
        vcs.head.move_to(&[root]);
        vcs
    }

    fn with_tree(
        source: Arc<dyn TrackedItemsSource>,
        config: VcsConfig,
        tree: RevisionTree,
    ) -> Self {
        let bus = EventBus::new(config.event_capacity);
        let head = Head::new(source, bus.clone(), &config);
        Self {
            config,
            tree,
            head,
            stashes: StashesRepository::new(),
            remote_cache: RemoteCache::new(),
            bus,
        }
    }

    /// Restore version control from its persisted form.
    ///
    /// A snapshot written under the current diff format is trusted as is;
    /// otherwise the head is rebuilt by replaying history.
    pub fn from_document(
        document: VcsDocument,
        source: Arc<dyn TrackedItemsSource>,
        config: VcsConfig,
    ) -> VcsResult<Self> {
        let current_format = document.is_current_format();
        let tree = tree_from_documents(document.revisions)?;

        let head_id = if tree.contains(document.head_revision_id) {
            document.head_revision_id
        } else {
            warn!(
                revision_id = %document.head_revision_id,
                "persisted head not in history, using root"
            );
            tree.root().id()
        };

        let mut vcs = Self::with_tree(source, config, tree);
        vcs.stashes = document.stashes.into_repository();
        vcs.remote_cache = document.remote_cache.into_cache();

        if current_format {
            vcs.head.restore_snapshot(document.head.into_snapshot());
            let heading = vcs.revision(head_id)?;
            vcs.head.point_to(heading);
        } else {
            info!(
                found = document.diff_format_version,
                expected = DIFF_FORMAT_VERSION,
                "diff format changed, replaying history"
            );
            let path = vcs.path_to(head_id)?;
            vcs.head.move_to(&path);
        }

        debug!(
            revisions = vcs.tree.len(),
            stashes = vcs.stashes.num_user_stashes(),
            "version control loaded"
        );
        Ok(vcs)
    }

    pub fn to_document(&self) -> VcsDocument {
        VcsDocument {
            diff_format_version: DIFF_FORMAT_VERSION,
            head_revision_id: self.heading_revision().id(),
            revisions: tree_to_documents(&self.tree),
            stashes: StashesDocument::from_repository(&self.stashes),
            head: self.head.with_snapshot(HeadDocument::from_snapshot),
            remote_cache: RemoteCacheDocument::from_cache(&self.remote_cache),
        }
    }

    pub fn config(&self) -> &VcsConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<VcsEvent> {
        self.bus.subscribe()
    }

    pub fn head(&self) -> &Head {
        &self.head
    }

    pub fn head_mut(&mut self) -> &mut Head {
        &mut self.head
    }

    pub fn tree(&self) -> &RevisionTree {
        &self.tree
    }

    pub fn root(&self) -> &Arc<Revision> {
        self.tree.root()
    }

    pub fn revision_by_id(&self, id: RevisionId) -> Option<&Arc<Revision>> {
        self.tree.get(id)
    }

    pub fn heading_revision(&self) -> Arc<Revision> {
        self.head
            .heading_revision()
            .cloned()
            .unwrap_or_else(|| Arc::clone(self.tree.root()))
    }

    pub fn diff(&self) -> WorkingDiff {
        self.head.diff()
    }

    pub fn has_anything_on_the_stage(&self) -> bool {
        self.head.has_anything_on_the_stage()
    }

    pub fn has_tracked_items_on_the_stage(&self) -> bool {
        self.head.has_tracked_items_on_the_stage()
    }

    pub fn stashes(&self) -> &StashesRepository {
        &self.stashes
    }

    pub fn stats(&self) -> HistoryStats {
        self.tree.stats()
    }

    /// The live project changed.
    pub fn mark_changed(&self) {
        self.head.set_diff_outdated(true);
    }

    pub fn rebuild_diff_if_needed(&mut self) {
        self.head.rebuild_diff_if_needed();
    }

    pub fn rebuild_diff_now(&mut self) {
        self.head.rebuild_diff_now();
    }

    pub fn rebuild_diff_synchronously(&mut self) {
        self.head.rebuild_diff_synchronously();
    }

    fn revision(&self, id: RevisionId) -> VcsResult<Arc<Revision>> {
        self.tree
            .get(id)
            .cloned()
            .ok_or(VcsError::RevisionNotFound(id))
    }

    fn path_to(&self, id: RevisionId) -> VcsResult<Vec<Arc<Revision>>> {
        self.tree.path_to(id).ok_or(VcsError::RevisionNotFound(id))
    }

    fn non_empty_path(&self, id: RevisionId) -> VcsResult<Vec<Arc<Revision>>> {
        let path = self.path_to(id)?;
        if self.tree.is_empty_revision(id) {
            return Err(VcsError::EmptyRevision(id));
        }
        Ok(path)
    }

    // History

    /// Move the head without touching the live project.
    pub fn move_head(&mut self, id: RevisionId) -> VcsResult<()> {
        let path = self.non_empty_path(id)?;
        self.head.move_to(&path);
        Ok(())
    }

    /// Move the head and push its state onto the live project.
    pub fn checkout(&mut self, id: RevisionId) -> VcsResult<()> {
        let path = self.non_empty_path(id)?;
        self.head.move_to(&path);
        self.head.checkout();
        info!(revision_id = %id, items = self.head.with_snapshot(|s| s.len()), "checked out");
        Ok(())
    }

    /// Pull the state of some items as of another revision, keeping the
    /// head where it is.
    pub fn cherry_pick(&mut self, id: RevisionId, uuids: &[Uuid]) -> VcsResult<()> {
        let path = self.non_empty_path(id)?;
        let back = self.path_to(self.heading_revision().id())?;

        self.head.move_to(&path);
        self.head.cherry_pick(uuids);
        self.head.move_to(&back);

        info!(revision_id = %id, items = uuids.len(), "cherry-picked");
        self.bus.emit(VcsEvent::CherryPicked);
        Ok(())
    }

    /// Commit the selected working-diff records as a child of the heading
    /// revision and move the head onto it.
    pub fn commit(
        &mut self,
        selection: &DiffSelection,
        message: impl Into<String>,
    ) -> VcsResult<Arc<Revision>> {
        let items = self.head.diff().resolve(selection)?;
        let parent = self.heading_revision().id();

        let mut builder = RevisionBuilder::new(message);
        for item in items {
            builder.add_item(item);
        }
        let revision = self.tree.add_child(parent, builder.build())?;

        let path = self.path_to(revision.id())?;
        self.head.move_to(&path);

        info!(
            revision_id = %revision.id(),
            parent_id = %parent,
            items = revision.items().len(),
            "committed"
        );
        self.bus.emit(VcsEvent::Committed {
            revision_id: revision.id(),
        });
        Ok(revision)
    }

    /// Replace the whole history, e.g. with a cloned remote one. The head
    /// moves to the new root.
    pub fn replace_history(&mut self, tree: RevisionTree) {
        self.tree = tree;
        let root = Arc::clone(self.tree.root());
        self.head.move_to(&[root]);
        info!(revisions = self.tree.len(), "history replaced");
        self.bus.emit(VcsEvent::HistoryChanged);
    }

    /// Graft a fetched subtree under an existing revision.
    pub fn append_subtree(&mut self, subtree: &RevisionTree, parent: RevisionId) -> VcsResult<()> {
        self.tree.append_subtree(parent, subtree)?;
        debug!(parent_id = %parent, revisions = subtree.len(), "subtree appended");
        self.bus.emit(VcsEvent::HistoryChanged);
        Ok(())
    }

    /// Fill in the deltas of a shallow revision. A revision that is not
    /// shallow is returned unchanged.
    pub fn update_shallow_revision_data(
        &mut self,
        id: RevisionId,
        items: Vec<RevisionItem>,
    ) -> VcsResult<Arc<Revision>> {
        let revision = self.revision(id)?;
        if !revision.is_shallow_copy() {
            return Ok(revision);
        }

        let hydrated = self.tree.replace_revision(revision.hydrated(items))?;
        debug!(revision_id = %id, items = hydrated.items().len(), "shallow revision hydrated");
        self.bus.emit(VcsEvent::HistoryChanged);
        Ok(hydrated)
    }

    /// Record a newly tracked item in the heading revision itself.
    ///
    /// Only additions can be amended; changes to committed items go through
    /// regular commits.
    pub fn quick_amend_item(&mut self, item: &dyn TrackedItem) -> VcsResult<Arc<Revision>> {
        let id = self.heading_revision().id();
        let amended = self.tree.amend(id, RevisionItem::added_from(item))?;
        let path = self.path_to(id)?;
        self.head.move_to(&path);

        debug!(revision_id = %id, uuid = %item.uuid(), "amended");
        self.bus.emit(VcsEvent::HistoryChanged);
        Ok(amended)
    }

    // Changes

    /// Discard the selected uncommitted changes.
    pub fn reset_changes(&mut self, selection: &DiffSelection) -> VcsResult<()> {
        let items = self.head.diff().resolve(selection)?;
        self.head.reset_changes(&items);
        info!(items = items.len(), "changes reset");
        self.bus.emit(VcsEvent::ChangesReset);
        Ok(())
    }

    /// Discard every uncommitted change. A clean stage is a no-op.
    pub fn reset_all_changes(&mut self) -> VcsResult<()> {
        let diff = self.head.diff();
        if diff.is_empty() {
            return Ok(());
        }
        self.reset_changes(&diff.select_all())
    }

    // Stashes

    /// Move the selected changes into a new named stash, discarding them
    /// from the live project unless `keep_changes` is set.
    pub fn stash(
        &mut self,
        selection: &DiffSelection,
        message: impl Into<String>,
        keep_changes: bool,
    ) -> VcsResult<Arc<Revision>> {
        let items = self.head.diff().resolve(selection)?;

        let mut builder = RevisionBuilder::new(message);
        for item in &items {
            builder.add_item(item.clone());
        }
        let stash = Arc::new(builder.build());
        self.stashes.add_stash(Arc::clone(&stash));

        if !keep_changes {
            self.head.reset_changes(&items);
        }

        info!(stash_id = %stash.id(), items = items.len(), keep_changes, "stashed");
        self.bus.emit(VcsEvent::Stashed);
        Ok(stash)
    }

    /// Apply a user stash onto the live project, removing it from the list
    /// unless `keep_stash` is set.
    pub fn apply_stash(&mut self, id: RevisionId, keep_stash: bool) -> VcsResult<()> {
        let stash = self
            .stashes
            .user_stash_by_id(id)
            .cloned()
            .ok_or_else(|| VcsError::StashNotFound(id.to_string()))?;
        self.apply_user_stash(stash, keep_stash)
    }

    pub fn apply_stash_with_name(&mut self, name: &str, keep_stash: bool) -> VcsResult<()> {
        let stash = self
            .stashes
            .user_stash_with_name(name)
            .cloned()
            .ok_or_else(|| VcsError::StashNotFound(name.to_string()))?;
        self.apply_user_stash(stash, keep_stash)
    }

    /// Discard a user stash without applying it.
    pub fn drop_stash(&mut self, id: RevisionId) -> VcsResult<Arc<Revision>> {
        let stash = self
            .stashes
            .remove_stash(id)
            .ok_or_else(|| VcsError::StashNotFound(id.to_string()))?;
        info!(stash_id = %id, "stash dropped");
        Ok(stash)
    }

    fn apply_user_stash(&mut self, stash: Arc<Revision>, keep_stash: bool) -> VcsResult<()> {
        if !stash.has_items() {
            return Err(VcsError::EmptyRevision(stash.id()));
        }

        self.head.apply_items(stash.items());
        if !keep_stash {
            self.stashes.remove_stash(stash.id());
        }

        info!(stash_id = %stash.id(), items = stash.items().len(), keep_stash, "stash applied");
        self.bus.emit(VcsEvent::StashApplied);
        Ok(())
    }

    pub fn has_quick_stash(&self) -> bool {
        self.stashes.has_quick_stash()
    }

    /// Stash every uncommitted change into the quick-stash slot and discard
    /// them from the live project.
    pub fn quick_stash_all(&mut self) -> VcsResult<()> {
        if self.stashes.has_quick_stash() {
            return Err(VcsError::QuickStashOccupied);
        }
        let diff = self.head.diff();
        if !diff.is_complete() {
            return Err(VcsError::IncompleteDiff {
                generation: diff.generation(),
            });
        }
        if diff.is_empty() {
            return Err(VcsError::NothingToStash);
        }

        let mut builder = RevisionBuilder::new("Quick stash");
        for item in diff.items() {
            builder.add_item(item.clone());
        }
        self.stashes.store_quick_stash(Arc::new(builder.build()));
        self.head.reset_changes(diff.items());

        info!(items = diff.len(), "quick stash stored");
        self.bus.emit(VcsEvent::Stashed);
        Ok(())
    }

    /// Bring the quick stash back onto the live project and empty the slot.
    ///
    /// The stash is merged into a detached copy of the head, so the shared
    /// snapshot used for diffing is never touched.
    pub fn restore_quick_stash(&mut self) -> VcsResult<()> {
        let stash = self
            .stashes
            .quick_stash()
            .cloned()
            .ok_or(VcsError::NoQuickStash)?;

        let scratch = self.head.detached_clone();
        scratch.merge_state_with(&stash);
        scratch.cherry_pick_all();

        // Removed records left the merged snapshot, apply them directly
        let removals: Vec<RevisionItem> = stash
            .items()
            .iter()
            .filter(|item| item.kind() == ChangeKind::Removed)
            .cloned()
            .collect();
        if !removals.is_empty() {
            scratch.apply_items(&removals);
        }

        self.stashes.reset_quick_stash();
        self.head.set_diff_outdated(true);

        info!(items = stash.items().len(), "quick stash restored");
        self.bus.emit(VcsEvent::StashApplied);
        Ok(())
    }

    /// Stash everything when the stage is dirty and the slot is free;
    /// restore when the slot is taken and the stage is clean.
    pub fn toggle_quick_stash(&mut self) -> VcsResult<()> {
        match (self.has_quick_stash(), self.has_anything_on_the_stage()) {
            (false, true) => self.quick_stash_all(),
            (true, false) => self.restore_quick_stash(),
            (true, true) => Err(VcsError::QuickStashOccupied),
            (false, false) => Err(VcsError::NothingToStash),
        }
    }

    // Sync

    /// Ids to push for `leaf`: the leaf and all its ancestors, leaf first.
    pub fn branch_to_push(&self, leaf: RevisionId) -> VcsResult<Vec<RevisionId>> {
        let path = self.path_to(leaf)?;
        Ok(path.iter().rev().map(|r| r.id()).collect())
    }

    /// Ids to pull for `leaf`: the leaf and its shallow ancestors, leaf first.
    pub fn branch_to_pull(&self, leaf: RevisionId) -> VcsResult<Vec<RevisionId>> {
        let path = self.path_to(leaf)?;
        Ok(path
            .iter()
            .rev()
            .enumerate()
            .filter(|(i, r)| *i == 0 || r.is_shallow_copy())
            .map(|(_, r)| r.id())
            .collect())
    }

    pub fn revision_sync_state(&self, revision: &Revision) -> SyncState {
        if revision.is_shallow_copy() {
            SyncState::ShallowCopy
        } else if self.remote_cache.has_revision_tracked(revision.id()) {
            SyncState::FullSync
        } else {
            SyncState::NoSync
        }
    }

    /// Record a revision as pushed.
    pub fn update_local_sync_cache(&mut self, id: RevisionId) -> VcsResult<()> {
        let revision = self.revision(id)?;
        self.remote_cache.update_for_local_revision(&revision);
        self.bus.emit(VcsEvent::SyncCacheUpdated);
        Ok(())
    }

    /// Replace the cache with a fresh remote listing.
    pub fn update_remote_sync_cache(&mut self, revisions: &[RemoteRevision]) {
        self.remote_cache.update_for_remote_revisions(revisions);
        self.bus.emit(VcsEvent::SyncCacheUpdated);
    }

    pub fn remote_cache(&self) -> &RemoteCache {
        &self.remote_cache
    }

    pub fn remote_cache_outdated(&self) -> bool {
        self.remote_cache.is_outdated(self.config.remote_cache_ttl())
    }

    /// Drop all history, stashes and sync state and start over from a new
    /// root.
    pub fn reset(&mut self) {
        self.tree = RevisionTree::with_root_message(self.config.root_message.clone());
        self.stashes.reset();
        self.remote_cache.reset();
        let root = Arc::clone(self.tree.root());
        self.head.move_to(&[root]);
        info!("version control reset");
        self.bus.emit(VcsEvent::HistoryChanged);
    }
}
