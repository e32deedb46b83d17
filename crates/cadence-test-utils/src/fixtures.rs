//! Test fixtures: an in-memory project of tracked items and a temporary
//! on-disk history store.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use cadence_storage::JsonDocumentStore;
use cadence_vcs::{
    ChangeKind, Delta, DiffLogicType, MergePolicy, RevisionItem, TrackedItem, TrackedItemsSource,
};
use serde_json::Value;
use tempfile::TempDir;
use uuid::Uuid;

/// Observable content of one item: its kind and aspect values.
pub type ItemContent = (DiffLogicType, BTreeMap<String, Value>);

/// A tracked item whose state is a map of named aspects.
#[derive(Debug)]
pub struct TestItem {
    uuid: Uuid,
    logic_type: DiffLogicType,
    aspects: RwLock<BTreeMap<String, Value>>,
}

impl TestItem {
    pub fn new(uuid: Uuid, logic_type: DiffLogicType) -> Self {
        Self {
            uuid,
            logic_type,
            aspects: RwLock::new(BTreeMap::new()),
        }
    }

    /// An item carrying the full state recorded in `state`.
    pub fn from_state(logic_type: DiffLogicType, uuid: Uuid, state: &RevisionItem) -> Self {
        let item = Self::new(uuid, logic_type);
        for delta in state.deltas().iter().filter(|d| !d.is_removal()) {
            item.set(&delta.kind, delta.data.clone());
        }
        item
    }

    pub fn set(&self, aspect: &str, value: Value) {
        self.aspects
            .write()
            .unwrap()
            .insert(aspect.to_string(), value);
    }

    pub fn get(&self, aspect: &str) -> Option<Value> {
        self.aspects.read().unwrap().get(aspect).cloned()
    }

    pub fn remove(&self, aspect: &str) -> Option<Value> {
        self.aspects.write().unwrap().remove(aspect)
    }

    pub fn content(&self) -> ItemContent {
        (self.logic_type, self.aspects.read().unwrap().clone())
    }
}

impl TrackedItem for TestItem {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn logic_type(&self) -> DiffLogicType {
        self.logic_type
    }

    fn deltas(&self) -> Vec<Delta> {
        self.aspects
            .read()
            .unwrap()
            .iter()
            .map(|(kind, data)| Delta::new(kind.clone(), data.clone()))
            .collect()
    }

    fn reset_state_to(&self, state: &RevisionItem) {
        let mut aspects = self.aspects.write().unwrap();
        if state.kind() == ChangeKind::Added
            || self.logic_type.merge_policy() == MergePolicy::Replace
        {
            aspects.clear();
        }
        for delta in state.deltas() {
            if delta.is_removal() {
                aspects.remove(&delta.kind);
            } else {
                aspects.insert(delta.kind.clone(), delta.data.clone());
            }
        }
    }
}

/// An in-memory project exposing its items to version control.
///
/// Counts the reset brackets version control opens and closes around bulk
/// mutations.
#[derive(Debug, Default)]
pub struct TestProject {
    items: RwLock<Vec<Arc<TestItem>>>,
    resets_started: AtomicUsize,
    resets_finished: AtomicUsize,
}

impl TestProject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn add(&self, item: TestItem) -> Arc<TestItem> {
        let item = Arc::new(item);
        self.items.write().unwrap().push(Arc::clone(&item));
        item
    }

    pub fn item(&self, uuid: Uuid) -> Option<Arc<TestItem>> {
        self.items
            .read()
            .unwrap()
            .iter()
            .find(|item| item.uuid == uuid)
            .cloned()
    }

    pub fn remove(&self, uuid: Uuid) -> bool {
        let mut items = self.items.write().unwrap();
        let before = items.len();
        items.retain(|item| item.uuid != uuid);
        items.len() != before
    }

    pub fn len(&self) -> usize {
        self.items.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn uuids(&self) -> Vec<Uuid> {
        self.items.read().unwrap().iter().map(|item| item.uuid).collect()
    }

    /// Everything observable about the project, keyed by uuid.
    pub fn content(&self) -> BTreeMap<Uuid, ItemContent> {
        self.items
            .read()
            .unwrap()
            .iter()
            .map(|item| (item.uuid, item.content()))
            .collect()
    }

    pub fn resets_started(&self) -> usize {
        self.resets_started.load(Ordering::SeqCst)
    }

    pub fn resets_finished(&self) -> usize {
        self.resets_finished.load(Ordering::SeqCst)
    }
}

impl TrackedItemsSource for TestProject {
    fn num_tracked_items(&self) -> usize {
        self.len()
    }

    fn tracked_item(&self, index: usize) -> Option<Arc<dyn TrackedItem>> {
        let item = self.items.read().unwrap().get(index).cloned()?;
        Some(item as Arc<dyn TrackedItem>)
    }

    fn init_tracked_item(&self, logic_type: DiffLogicType, uuid: Uuid, state: &RevisionItem) {
        self.add(TestItem::from_state(logic_type, uuid, state));
    }

    fn delete_tracked_item(&self, uuid: Uuid) -> bool {
        self.remove(uuid)
    }

    fn on_before_reset_state(&self) {
        self.resets_started.fetch_add(1, Ordering::SeqCst);
    }

    fn on_reset_state(&self) {
        self.resets_finished.fetch_add(1, Ordering::SeqCst);
    }
}

/// A JSON history store in a temporary directory, removed on drop.
pub struct TempHistoryStore {
    temp_dir: TempDir,
    store: JsonDocumentStore,
}

impl TempHistoryStore {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = JsonDocumentStore::for_project_dir(temp_dir.path());
        Self { temp_dir, store }
    }

    pub fn store(&self) -> &JsonDocumentStore {
        &self.store
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }
}

impl Default for TempHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}
