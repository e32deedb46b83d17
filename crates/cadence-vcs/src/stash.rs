//! Named stashes and the single quick-stash slot.

use std::sync::Arc;

use crate::revision::{Revision, RevisionId};

/// Side storage for changes set aside from the working diff.
///
/// Stash names are revision messages; uniqueness is up to the caller.
#[derive(Debug, Clone, Default)]
pub struct StashesRepository {
    stashes: Vec<Arc<Revision>>,
    quick: Option<Arc<Revision>>,
}

impl StashesRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_stash(&mut self, stash: Arc<Revision>) {
        self.stashes.push(stash);
    }

    /// Remove a stash by id, returning it if it was present.
    pub fn remove_stash(&mut self, id: RevisionId) -> Option<Arc<Revision>> {
        let index = self.stashes.iter().position(|s| s.id() == id)?;
        Some(self.stashes.remove(index))
    }

    pub fn num_user_stashes(&self) -> usize {
        self.stashes.len()
    }

    pub fn user_stash(&self, index: usize) -> Option<&Arc<Revision>> {
        self.stashes.get(index)
    }

    pub fn user_stash_by_id(&self, id: RevisionId) -> Option<&Arc<Revision>> {
        self.stashes.iter().find(|s| s.id() == id)
    }

    /// First stash whose message equals `name`.
    pub fn user_stash_with_name(&self, name: &str) -> Option<&Arc<Revision>> {
        self.stashes.iter().find(|s| s.message() == name)
    }

    pub fn user_stashes(&self) -> &[Arc<Revision>] {
        &self.stashes
    }

    pub fn has_quick_stash(&self) -> bool {
        self.quick.is_some()
    }

    pub fn quick_stash(&self) -> Option<&Arc<Revision>> {
        self.quick.as_ref()
    }

    /// Fill the quick-stash slot, replacing whatever it held.
    pub fn store_quick_stash(&mut self, stash: Arc<Revision>) {
        self.quick = Some(stash);
    }

    pub fn reset_quick_stash(&mut self) -> Option<Arc<Revision>> {
        self.quick.take()
    }

    pub fn reset(&mut self) {
        self.stashes.clear();
        self.quick = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revision::RevisionBuilder;

    fn stash(message: &str) -> Arc<Revision> {
        Arc::new(RevisionBuilder::new(message).build())
    }

    #[test]
    fn test_named_stashes_keep_insertion_order() {
        let mut repo = StashesRepository::new();
        repo.add_stash(stash("drums"));
        repo.add_stash(stash("bass"));
        repo.add_stash(stash("drums"));

        assert_eq!(repo.num_user_stashes(), 3);
        assert_eq!(repo.user_stash(1).unwrap().message(), "bass");

        let first = repo.user_stash_with_name("drums").unwrap().id();
        assert_eq!(repo.user_stash(0).unwrap().id(), first);
    }

    #[test]
    fn test_remove_by_id() {
        let mut repo = StashesRepository::new();
        let keep = stash("keep");
        let drop = stash("drop");
        repo.add_stash(keep.clone());
        repo.add_stash(drop.clone());

        assert!(repo.remove_stash(drop.id()).is_some());
        assert!(repo.remove_stash(drop.id()).is_none());
        assert!(repo.user_stash_by_id(keep.id()).is_some());
        assert_eq!(repo.num_user_stashes(), 1);
    }

    #[test]
    fn test_quick_slot_holds_one() {
        let mut repo = StashesRepository::new();
        assert!(!repo.has_quick_stash());

        repo.store_quick_stash(stash("first"));
        repo.store_quick_stash(stash("second"));
        assert_eq!(repo.quick_stash().unwrap().message(), "second");

        assert!(repo.reset_quick_stash().is_some());
        assert!(!repo.has_quick_stash());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut repo = StashesRepository::new();
        repo.add_stash(stash("a"));
        repo.store_quick_stash(stash("q"));
        repo.reset();
        assert_eq!(repo.num_user_stashes(), 0);
        assert!(repo.quick_stash().is_none());
    }
}
