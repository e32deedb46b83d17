//! Saving and loading version control through a [`DocumentStore`].

use std::sync::Arc;

use cadence_storage::{DocumentStore, HISTORY_DOCUMENT};
use tracing::debug;

use crate::config::VcsConfig;
use crate::document::VcsDocument;
use crate::error::VcsResult;
use crate::tracked::TrackedItemsSource;
use crate::version_control::VersionControl;

/// Persist a project's version control as its history document.
pub async fn save<S: DocumentStore>(
    store: &S,
    project_id: &str,
    vcs: &VersionControl,
) -> VcsResult<()> {
    let document = vcs.to_document();
    store.save(project_id, HISTORY_DOCUMENT, &document).await?;
    debug!(project_id, revisions = document.revisions.len(), "history saved");
    Ok(())
}

/// Load the raw history document, if the project has one.
pub async fn load_document<S: DocumentStore>(
    store: &S,
    project_id: &str,
) -> VcsResult<Option<VcsDocument>> {
    Ok(store.load(project_id, HISTORY_DOCUMENT).await?)
}

/// Restore a project's version control. Returns `None` when nothing was
/// saved for it.
pub async fn load<S: DocumentStore>(
    store: &S,
    project_id: &str,
    source: Arc<dyn TrackedItemsSource>,
    config: VcsConfig,
) -> VcsResult<Option<VersionControl>> {
    match load_document(store, project_id).await? {
        Some(document) => VersionControl::from_document(document, source, config).map(Some),
        None => Ok(None),
    }
}

/// Restore a project's version control, or start a fresh history.
pub async fn load_or_new<S: DocumentStore>(
    store: &S,
    project_id: &str,
    source: Arc<dyn TrackedItemsSource>,
    config: VcsConfig,
) -> VcsResult<VersionControl> {
    match load_document(store, project_id).await? {
        Some(document) => VersionControl::from_document(document, source, config),
        None => {
            debug!(project_id, "no saved history, starting fresh");
            Ok(VersionControl::new(source, config))
        }
    }
}
