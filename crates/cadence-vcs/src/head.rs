//! Head: the reconstructed state at the current revision plus the working
//! diff of the live project against it.
//!
//! The working diff is recomputed on a dedicated worker thread. Every pass
//! claims a new generation from an atomic epoch; a pass only writes into the
//! diff while the epoch still equals its generation, so a worker that was
//! detached after a stop timeout can never corrupt newer state.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use cadence_util::TimingGuard;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::bus::{EventBus, VcsEvent};
use crate::config::VcsConfig;
use crate::error::{VcsError, VcsResult};
use crate::item::{ChangeKind, RevisionItem};
use crate::revision::Revision;
use crate::snapshot::Snapshot;
use crate::tracked::TrackedItemsSource;

/// The uncommitted changes of the live project, as computed by one pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkingDiff {
    generation: u64,
    items: Vec<RevisionItem>,
    complete: bool,
}

impl WorkingDiff {
    fn new(generation: u64) -> Self {
        Self {
            generation,
            items: Vec::new(),
            complete: false,
        }
    }

    /// Generation of the pass that produced this diff.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn items(&self) -> &[RevisionItem] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&RevisionItem> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether the pass that produced this diff ran to the end.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn position(&self, uuid: Uuid) -> Option<usize> {
        self.items.iter().position(|item| item.uuid() == uuid)
    }

    pub fn select(&self, indices: impl IntoIterator<Item = usize>) -> DiffSelection {
        DiffSelection::new(self.generation, indices)
    }

    pub fn select_all(&self) -> DiffSelection {
        self.select(0..self.items.len())
    }

    /// Resolve a selection against this diff.
    ///
    /// Fails without side effects when the selection belongs to another
    /// generation, the diff is only partially computed, or the selection is
    /// empty or points past the end.
    pub fn resolve(&self, selection: &DiffSelection) -> VcsResult<Vec<RevisionItem>> {
        if selection.generation != self.generation {
            return Err(VcsError::StaleSelection {
                expected: self.generation,
                actual: selection.generation,
            });
        }
        if !self.complete {
            return Err(VcsError::IncompleteDiff {
                generation: self.generation,
            });
        }
        if selection.indices.is_empty() {
            return Err(VcsError::EmptySelection);
        }

        selection
            .indices
            .iter()
            .map(|&index| {
                self.items
                    .get(index)
                    .cloned()
                    .ok_or(VcsError::IndexOutOfRange {
                        index,
                        len: self.items.len(),
                    })
            })
            .collect()
    }
}

/// Positions into a working diff, tagged with the generation they were
/// taken from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSelection {
    generation: u64,
    indices: Vec<usize>,
}

impl DiffSelection {
    pub fn new(generation: u64, indices: impl IntoIterator<Item = usize>) -> Self {
        let mut indices: Vec<usize> = indices.into_iter().collect();
        indices.sort_unstable();
        indices.dedup();
        Self {
            generation,
            indices,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

enum PassOutcome {
    Finished,
    Cancelled,
    Superseded,
}

/// State shared between a head and its diff worker.
struct HeadShared {
    source: Arc<dyn TrackedItemsSource>,
    snapshot: RwLock<Snapshot>,
    diff: RwLock<WorkingDiff>,
    outdated: AtomicBool,
    rebuilding: AtomicBool,
    epoch: AtomicU64,
    bus: EventBus,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl HeadShared {
    fn is_current(&self, generation: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == generation
    }

    /// Throw the current diff away and return the generation that replaces it.
    fn invalidate_diff(&self) -> u64 {
        let mut diff = write(&self.diff);
        let generation = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        *diff = WorkingDiff::new(generation);
        generation
    }

    fn begin_pass(&self, generation: u64) -> bool {
        {
            let mut diff = write(&self.diff);
            if !self.is_current(generation) {
                return false;
            }
            *diff = WorkingDiff::new(generation);
        }
        self.outdated.store(false, Ordering::SeqCst);
        self.bus.emit(VcsEvent::DiffRebuildStarted);
        true
    }

    /// Append one record; the write lock is held only for the append.
    fn append(&self, generation: u64, item: RevisionItem) -> bool {
        let mut diff = write(&self.diff);
        if diff.generation != generation || !self.is_current(generation) {
            return false;
        }
        diff.items.push(item);
        true
    }

    fn complete(&self, generation: u64) -> bool {
        let mut diff = write(&self.diff);
        if diff.generation != generation || !self.is_current(generation) {
            return false;
        }
        diff.complete = true;
        true
    }

    fn run_pass(&self, generation: u64, cancel: &CancellationToken) -> PassOutcome {
        if !self.begin_pass(generation) {
            return PassOutcome::Superseded;
        }

        let _timing = TimingGuard::diff_pass(generation);
        let snapshot = read(&self.snapshot);
        let live = self.source.tracked_items();
        let mut seen: HashSet<Uuid> = HashSet::with_capacity(snapshot.len() + live.len());

        for state in snapshot.iter() {
            if cancel.is_cancelled() {
                return PassOutcome::Cancelled;
            }
            // Removed entries never match a live item
            if state.kind() == ChangeKind::Removed {
                continue;
            }

            let mut found = None;
            for item in &live {
                if cancel.is_cancelled() {
                    return PassOutcome::Cancelled;
                }
                if item.uuid() == state.uuid() {
                    found = Some(item);
                    break;
                }
            }

            seen.insert(state.uuid());
            let record = match found {
                Some(item) => {
                    let diff = item.create_diff(state);
                    if !diff.has_any_changes() {
                        continue;
                    }
                    RevisionItem::from_diff(ChangeKind::Changed, state.uuid(), diff)
                }
                None => RevisionItem::removed(state),
            };

            if !self.append(generation, record) {
                return PassOutcome::Superseded;
            }
        }

        for item in &live {
            if cancel.is_cancelled() {
                return PassOutcome::Cancelled;
            }
            if !seen.insert(item.uuid()) {
                continue;
            }
            if !self.append(generation, RevisionItem::added_from(item.as_ref())) {
                return PassOutcome::Superseded;
            }
        }

        if !self.complete(generation) {
            return PassOutcome::Superseded;
        }

        debug!(
            generation,
            snapshot_items = snapshot.len(),
            live_items = live.len(),
            "working diff rebuilt"
        );
        PassOutcome::Finished
    }

    /// Run passes until the diff is no longer outdated, starting from an
    /// already claimed generation.
    fn run_worker(&self, mut generation: u64, cancel: &CancellationToken) {
        loop {
            match self.run_pass(generation, cancel) {
                PassOutcome::Superseded => {
                    debug!(generation, "diff pass superseded");
                    return;
                }
                PassOutcome::Cancelled => {
                    debug!(generation, "diff pass cancelled");
                    if self.is_current(generation) {
                        self.outdated.store(true, Ordering::SeqCst);
                        self.rebuilding.store(false, Ordering::SeqCst);
                        self.bus.emit(VcsEvent::DiffRebuildCancelled);
                    }
                    return;
                }
                PassOutcome::Finished => {
                    let follow_up = self.outdated.load(Ordering::SeqCst)
                        && !cancel.is_cancelled()
                        && self
                            .epoch
                            .compare_exchange(
                                generation,
                                generation + 1,
                                Ordering::SeqCst,
                                Ordering::SeqCst,
                            )
                            .is_ok();

                    if follow_up {
                        self.bus.emit(VcsEvent::DiffRebuildFinished { generation });
                        generation += 1;
                        continue;
                    }

                    if self.is_current(generation) {
                        self.rebuilding.store(false, Ordering::SeqCst);
                    }
                    self.bus.emit(VcsEvent::DiffRebuildFinished { generation });
                    return;
                }
            }
        }
    }
}

struct DiffWorker {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

/// The current position in history and the working diff against it.
pub struct Head {
    shared: Arc<HeadShared>,
    heading: Option<Arc<Revision>>,
    worker: Option<DiffWorker>,
    stop_timeout: Duration,
    thread_name: String,
}

impl std::fmt::Debug for Head {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Head")
            .field("heading", &self.heading.as_ref().map(|r| r.id()))
            .field("outdated", &self.is_diff_outdated())
            .field("rebuilding", &self.is_rebuilding_diff())
            .field("worker", &self.worker.is_some())
            .finish()
    }
}

impl Head {
    /// Create a head with an empty snapshot, pointing nowhere.
    pub fn new(source: Arc<dyn TrackedItemsSource>, bus: EventBus, config: &VcsConfig) -> Self {
        Self::from_parts(
            source,
            bus,
            Snapshot::new(),
            WorkingDiff::default(),
            None,
            config.diff_stop_timeout(),
            config.worker_thread_name.clone(),
        )
    }

    fn from_parts(
        source: Arc<dyn TrackedItemsSource>,
        bus: EventBus,
        snapshot: Snapshot,
        diff: WorkingDiff,
        heading: Option<Arc<Revision>>,
        stop_timeout: Duration,
        thread_name: String,
    ) -> Self {
        let epoch = diff.generation;
        Self {
            shared: Arc::new(HeadShared {
                source,
                snapshot: RwLock::new(snapshot),
                diff: RwLock::new(diff),
                outdated: AtomicBool::new(false),
                rebuilding: AtomicBool::new(false),
                epoch: AtomicU64::new(epoch),
                bus,
            }),
            heading,
            worker: None,
            stop_timeout,
            thread_name,
        }
    }

    /// An independent copy of this head with its own snapshot and no worker.
    /// Its notifications go nowhere.
    pub fn detached_clone(&self) -> Head {
        let head = Self::from_parts(
            Arc::clone(&self.shared.source),
            EventBus::new(1),
            self.snapshot(),
            self.diff(),
            self.heading.clone(),
            self.stop_timeout,
            self.thread_name.clone(),
        );
        head.shared
            .outdated
            .store(self.is_diff_outdated(), Ordering::SeqCst);
        head
    }

    pub fn source(&self) -> &Arc<dyn TrackedItemsSource> {
        &self.shared.source
    }

    pub fn heading_revision(&self) -> Option<&Arc<Revision>> {
        self.heading.as_ref()
    }

    /// A copy of the current working diff.
    pub fn diff(&self) -> WorkingDiff {
        read(&self.shared.diff).clone()
    }

    pub fn diff_generation(&self) -> u64 {
        read(&self.shared.diff).generation
    }

    pub fn has_anything_on_the_stage(&self) -> bool {
        !read(&self.shared.diff).is_empty()
    }

    /// Whether the diff touches anything already in history, i.e. holds a
    /// record other than `Added`.
    pub fn has_tracked_items_on_the_stage(&self) -> bool {
        read(&self.shared.diff)
            .items
            .iter()
            .any(|item| item.kind() != ChangeKind::Added)
    }

    pub fn is_diff_outdated(&self) -> bool {
        self.shared.outdated.load(Ordering::SeqCst)
    }

    pub fn set_diff_outdated(&self, outdated: bool) {
        let was = self.shared.outdated.swap(outdated, Ordering::SeqCst);
        if outdated && !was {
            self.shared.bus.emit(VcsEvent::DiffOutdated);
        }
    }

    pub fn is_rebuilding_diff(&self) -> bool {
        self.shared.rebuilding.load(Ordering::SeqCst)
    }

    /// A copy of the reconstructed state.
    pub fn snapshot(&self) -> Snapshot {
        read(&self.shared.snapshot).clone()
    }

    /// Inspect the snapshot without copying it.
    pub fn with_snapshot<R>(&self, f: impl FnOnce(&Snapshot) -> R) -> R {
        f(&read(&self.shared.snapshot))
    }

    /// Rebuild the snapshot by replaying `path` (root first) and head at its
    /// last revision.
    pub fn move_to(&mut self, path: &[Arc<Revision>]) {
        self.stop_worker();

        {
            let _timing = TimingGuard::replay(path.len());
            let replayed = Snapshot::replay(path);
            *write(&self.shared.snapshot) = replayed;
        }

        self.heading = path.last().cloned();
        self.shared.invalidate_diff();
        self.set_diff_outdated(true);
        debug!(
            revision_id = ?self.heading.as_ref().map(|r| r.id()),
            path_len = path.len(),
            "head moved"
        );
        self.shared.bus.emit(VcsEvent::SnapshotReplaced);
    }

    /// Repoint without replay; the current snapshot is trusted.
    pub fn point_to(&mut self, revision: Arc<Revision>) {
        self.heading = Some(revision);
        self.set_diff_outdated(true);
    }

    /// Apply a revision's records on top of the current snapshot.
    pub fn merge_state_with(&self, changes: &Revision) {
        debug!(revision_id = %changes.id(), "merging state");
        write(&self.shared.snapshot).apply_revision(changes);
        self.set_diff_outdated(true);
    }

    /// Clear the snapshot.
    pub fn reset(&mut self) {
        self.restore_snapshot(Snapshot::new());
    }

    /// Replace the snapshot wholesale, e.g. with a persisted one.
    pub fn restore_snapshot(&mut self, snapshot: Snapshot) {
        self.stop_worker();
        *write(&self.shared.snapshot) = snapshot;
        self.shared.invalidate_diff();
        self.set_diff_outdated(true);
        self.shared.bus.emit(VcsEvent::SnapshotReplaced);
    }

    /// Push the whole snapshot onto the live project.
    ///
    /// Live items known to the snapshot are deleted and re-created from it;
    /// live items the snapshot doesn't know are left alone.
    pub fn checkout(&self) {
        let states: Vec<RevisionItem> = self.with_snapshot(|s| s.iter().cloned().collect());
        let source = &self.shared.source;

        source.on_before_reset_state();

        let stale: Vec<Uuid> = source
            .tracked_items()
            .iter()
            .map(|item| item.uuid())
            .filter(|uuid| states.iter().any(|s| s.uuid() == *uuid))
            .collect();
        for uuid in stale {
            source.delete_tracked_item(uuid);
        }

        for state in &states {
            self.checkout_item(state);
        }

        source.on_reset_state();
        self.set_diff_outdated(true);
    }

    /// Check out only the snapshot entries with the given ids.
    pub fn cherry_pick(&self, uuids: &[Uuid]) {
        let states: Vec<RevisionItem> = self.with_snapshot(|s| {
            s.iter()
                .filter(|state| uuids.contains(&state.uuid()))
                .cloned()
                .collect()
        });
        self.apply_items(&states);
    }

    pub fn cherry_pick_all(&self) {
        let states: Vec<RevisionItem> = self.with_snapshot(|s| s.iter().cloned().collect());
        self.apply_items(&states);
    }

    /// Apply records to the live project inside one reset bracket.
    pub fn apply_items(&self, items: &[RevisionItem]) {
        let source = &self.shared.source;
        source.on_before_reset_state();
        for item in items {
            self.checkout_item(item);
        }
        source.on_reset_state();
        self.set_diff_outdated(true);
    }

    /// Apply one recorded state to the live project.
    pub fn checkout_item(&self, state: &RevisionItem) {
        let source = &self.shared.source;
        let target = source.find_tracked_item(state.uuid());

        match (state.kind(), target) {
            (ChangeKind::Changed, Some(target)) | (ChangeKind::Added, Some(target)) => {
                target.reset_state_to(state);
            }
            (ChangeKind::Added, None) => {
                source.init_tracked_item(state.logic_type(), state.uuid(), state);
            }
            (ChangeKind::Removed, Some(_)) => {
                source.delete_tracked_item(state.uuid());
            }
            (ChangeKind::Changed, None) | (ChangeKind::Removed, None) => {
                debug!(uuid = %state.uuid(), kind = state.kind().as_str(), "no live counterpart, skipped");
            }
        }
    }

    /// Revert the live item behind one working-diff record to its snapshot
    /// state. Returns whether anything was done.
    pub fn reset_changed_item_to_state(&self, diff_item: &RevisionItem) -> bool {
        let source = &self.shared.source;
        let state = self.with_snapshot(|s| s.get(diff_item.uuid()).cloned());

        match diff_item.kind() {
            ChangeKind::Changed => match (source.find_tracked_item(diff_item.uuid()), state) {
                (Some(target), Some(state)) => {
                    target.reset_state_to(&state);
                    true
                }
                _ => {
                    debug!(uuid = %diff_item.uuid(), "changed item has no counterpart, skipped");
                    false
                }
            },
            ChangeKind::Added => source.delete_tracked_item(diff_item.uuid()),
            ChangeKind::Removed => match state {
                Some(state) => {
                    source.init_tracked_item(state.logic_type(), state.uuid(), &state);
                    true
                }
                None => {
                    warn!(uuid = %diff_item.uuid(), "removed item missing from snapshot, skipped");
                    false
                }
            },
        }
    }

    /// Revert several working-diff records inside one reset bracket.
    pub fn reset_changes(&self, changes: &[RevisionItem]) {
        let source = &self.shared.source;
        source.on_before_reset_state();
        for change in changes {
            self.reset_changed_item_to_state(change);
        }
        source.on_reset_state();
        self.set_diff_outdated(true);
    }

    /// Start a background pass if the diff is outdated and none is running.
    pub fn rebuild_diff_if_needed(&mut self) {
        self.reap_worker();
        if self.is_diff_outdated() && !self.is_rebuilding_diff() {
            self.start_worker();
        }
    }

    /// Stop any running pass and start a fresh one in the background.
    pub fn rebuild_diff_now(&mut self) {
        self.stop_worker();
        self.start_worker();
    }

    /// Stop any running pass and rebuild on the calling thread.
    pub fn rebuild_diff_synchronously(&mut self) {
        self.stop_worker();
        let generation = self.shared.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.rebuilding.store(true, Ordering::SeqCst);
        self.shared.run_worker(generation, &CancellationToken::new());
    }

    fn start_worker(&mut self) {
        let generation = self.shared.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.rebuilding.store(true, Ordering::SeqCst);

        let cancel = CancellationToken::new();
        let shared = Arc::clone(&self.shared);
        let token = cancel.clone();
        let spawned = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || shared.run_worker(generation, &token));

        match spawned {
            Ok(handle) => self.worker = Some(DiffWorker { handle, cancel }),
            Err(e) => {
                warn!(error = %e, "failed to spawn diff worker, rebuilding inline");
                self.shared.run_worker(generation, &cancel);
            }
        }
    }

    fn reap_worker(&mut self) {
        if self
            .worker
            .as_ref()
            .is_some_and(|worker| worker.handle.is_finished())
        {
            self.stop_worker();
        }
    }

    /// Cancel the running pass and wait for it, up to the stop timeout.
    /// A worker that doesn't stop in time is detached and its results
    /// discarded.
    pub fn stop_worker(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        worker.cancel.cancel();

        let deadline = Instant::now() + self.stop_timeout;
        while !worker.handle.is_finished() {
            if Instant::now() >= deadline {
                warn!(
                    timeout_ms = self.stop_timeout.as_millis() as u64,
                    "diff worker did not stop in time, detaching"
                );
                self.shared.epoch.fetch_add(1, Ordering::SeqCst);
                self.abandon_pass();
                return;
            }
            thread::sleep(Duration::from_millis(1));
        }

        if worker.handle.join().is_err() {
            warn!("diff worker panicked");
            self.shared.epoch.fetch_add(1, Ordering::SeqCst);
            self.abandon_pass();
        }
    }

    fn abandon_pass(&self) {
        self.shared.outdated.store(true, Ordering::SeqCst);
        self.shared.rebuilding.store(false, Ordering::SeqCst);
        self.shared.bus.emit(VcsEvent::DiffRebuildCancelled);
    }
}

impl Drop for Head {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Delta, DiffLogicType};
    use crate::revision::RevisionBuilder;
    use crate::tracked::TrackedItem;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    struct Item {
        uuid: Uuid,
        notes: Mutex<Value>,
    }

    impl TrackedItem for Item {
        fn uuid(&self) -> Uuid {
            self.uuid
        }

        fn logic_type(&self) -> DiffLogicType {
            DiffLogicType::PianoTrack
        }

        fn deltas(&self) -> Vec<Delta> {
            vec![Delta::new("notes", self.notes.lock().unwrap().clone())]
        }

        fn reset_state_to(&self, state: &RevisionItem) {
            if let Some(delta) = state.delta("notes") {
                *self.notes.lock().unwrap() = delta.data.clone();
            }
        }
    }

    #[derive(Default)]
    struct Project {
        items: Mutex<Vec<Arc<Item>>>,
    }

    impl Project {
        fn add(&self, n: u128, notes: Value) {
            self.items.lock().unwrap().push(Arc::new(Item {
                uuid: Uuid::from_u128(n),
                notes: Mutex::new(notes),
            }));
        }
    }

    impl TrackedItemsSource for Project {
        fn num_tracked_items(&self) -> usize {
            self.items.lock().unwrap().len()
        }

        fn tracked_item(&self, index: usize) -> Option<Arc<dyn TrackedItem>> {
            let item = self.items.lock().unwrap().get(index).cloned()?;
            Some(item as Arc<dyn TrackedItem>)
        }

        fn init_tracked_item(&self, _: DiffLogicType, uuid: Uuid, state: &RevisionItem) {
            let notes = state.delta("notes").map(|d| d.data.clone()).unwrap_or(Value::Null);
            self.add(uuid.as_u128(), notes);
        }

        fn delete_tracked_item(&self, uuid: Uuid) -> bool {
            let mut items = self.items.lock().unwrap();
            let before = items.len();
            items.retain(|item| item.uuid != uuid);
            items.len() != before
        }
    }

    fn head_with(project: &Arc<Project>) -> Head {
        Head::new(project.clone(), EventBus::default(), &VcsConfig::default())
    }

    fn added(n: u128, notes: Value) -> RevisionItem {
        RevisionItem::new(
            ChangeKind::Added,
            DiffLogicType::PianoTrack,
            Uuid::from_u128(n),
            vec![Delta::new("notes", notes)],
        )
    }

    #[test]
    fn test_selection_is_sorted_and_deduplicated() {
        let selection = DiffSelection::new(3, [4, 1, 4, 2]);
        assert_eq!(selection.indices(), &[1, 2, 4]);
        assert_eq!(selection.generation(), 3);
    }

    #[test]
    fn test_resolve_rejects_stale_empty_and_out_of_range() {
        let mut diff = WorkingDiff::new(2);
        diff.items.push(added(1, json!([])));
        diff.complete = true;

        assert!(matches!(
            diff.resolve(&DiffSelection::new(1, [0])),
            Err(VcsError::StaleSelection { expected: 2, actual: 1 })
        ));
        assert!(matches!(
            diff.resolve(&DiffSelection::new(2, Vec::new())),
            Err(VcsError::EmptySelection)
        ));
        assert!(matches!(
            diff.resolve(&DiffSelection::new(2, [0, 1])),
            Err(VcsError::IndexOutOfRange { index: 1, len: 1 })
        ));
        assert_eq!(diff.resolve(&diff.select_all()).unwrap().len(), 1);
    }

    #[test]
    fn test_resolve_rejects_partial_diff() {
        let mut diff = WorkingDiff::new(4);
        diff.items.push(added(1, json!([])));
        diff.items.push(added(2, json!([])));

        assert!(matches!(
            diff.resolve(&diff.select([0])),
            Err(VcsError::IncompleteDiff { generation: 4 })
        ));
        assert!(matches!(
            diff.resolve(&DiffSelection::new(3, [0])),
            Err(VcsError::StaleSelection { .. })
        ));

        diff.complete = true;
        assert_eq!(diff.resolve(&diff.select([0])).unwrap().len(), 1);
    }

    #[test]
    fn test_synchronous_rebuild_classifies_items() {
        let project = Arc::new(Project::default());
        let mut head = head_with(&project);

        let base = Arc::new(
            RevisionBuilder::new("base")
                .with_item(added(1, json!([60])))
                .with_item(added(2, json!([62])))
                .build(),
        );
        head.move_to(&[base]);
        assert!(head.is_diff_outdated());

        project.add(1, json!([60]));
        project.add(3, json!([64]));
        head.rebuild_diff_synchronously();

        let diff = head.diff();
        assert!(diff.is_complete());
        assert!(!head.is_diff_outdated());
        assert!(!head.is_rebuilding_diff());

        let kinds: Vec<(u128, ChangeKind)> = diff
            .items()
            .iter()
            .map(|item| (item.uuid().as_u128(), item.kind()))
            .collect();
        assert_eq!(kinds, vec![(2, ChangeKind::Removed), (3, ChangeKind::Added)]);
        assert!(head.has_tracked_items_on_the_stage());
    }

    #[test]
    fn test_move_to_invalidates_diff_generation() {
        let project = Arc::new(Project::default());
        let mut head = head_with(&project);
        project.add(1, json!([]));
        head.rebuild_diff_synchronously();
        let before = head.diff();
        assert_eq!(before.len(), 1);

        let root = Arc::new(RevisionBuilder::new("root").build());
        head.move_to(&[root]);
        let after = head.diff();
        assert!(after.is_empty());
        assert!(after.generation() > before.generation());
        assert!(matches!(
            after.resolve(&before.select_all()),
            Err(VcsError::StaleSelection { .. })
        ));
    }

    #[test]
    fn test_reset_changed_item_reverts_each_kind() {
        let project = Arc::new(Project::default());
        let mut head = head_with(&project);
        let base = Arc::new(
            RevisionBuilder::new("base")
                .with_item(added(1, json!([60])))
                .with_item(added(2, json!([62])))
                .build(),
        );
        head.move_to(&[base]);

        project.add(1, json!([61]));
        project.add(9, json!([]));
        head.rebuild_diff_synchronously();
        let changes = head.diff().items().to_vec();
        assert_eq!(changes.len(), 3);

        head.reset_changes(&changes);
        head.rebuild_diff_synchronously();
        assert!(!head.has_anything_on_the_stage());
        assert_eq!(project.num_tracked_items(), 2);
    }

    #[test]
    fn test_detached_clone_does_not_share_snapshot() {
        let project = Arc::new(Project::default());
        let mut head = head_with(&project);
        head.move_to(&[Arc::new(
            RevisionBuilder::new("base").with_item(added(1, json!([]))).build(),
        )]);

        let clone = head.detached_clone();
        clone.merge_state_with(
            &RevisionBuilder::new("more").with_item(added(2, json!([]))).build(),
        );

        assert_eq!(head.snapshot().len(), 1);
        assert_eq!(clone.snapshot().len(), 2);
    }
}
