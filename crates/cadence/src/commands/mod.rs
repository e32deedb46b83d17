//! Command handlers for the cadence CLI.
//!
//! Every handler opens the saved history against an [`OfflineProject`],
//! so commands read and rewrite the history document only.

pub mod history;
pub mod stash;
pub mod sync;

pub use history::*;
pub use stash::*;
pub use sync::*;

use anyhow::{anyhow, bail};
use cadence_storage::JsonDocumentStore;
use cadence_vcs::{persist, Revision, RevisionId, RevisionTree, VcsConfig, VersionControl};
use tracing::info;

use crate::offline::OfflineProject;

/// Shared state for one CLI invocation.
pub struct Context {
    pub store: JsonDocumentStore,
    pub project_id: String,
    pub config: VcsConfig,
    pub json: bool,
}

impl Context {
    /// Open the saved history, failing if the project has none.
    pub async fn open(&self) -> anyhow::Result<VersionControl> {
        persist::load(
            &self.store,
            &self.project_id,
            OfflineProject::shared(),
            self.config.clone(),
        )
        .await?
        .ok_or_else(|| {
            anyhow!(
                "no history for project '{}' in {} (run `cadence init`)",
                self.project_id,
                self.store.base_path().display()
            )
        })
    }

    pub async fn save(&self, vcs: &VersionControl) -> anyhow::Result<()> {
        persist::save(&self.store, &self.project_id, vcs).await?;
        Ok(())
    }

    /// Print a value as pretty JSON.
    pub fn print_json<T: serde::Serialize>(&self, value: &T) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

/// Handle `cadence init`.
pub async fn handle_init(ctx: &Context) -> anyhow::Result<()> {
    if persist::load_document(&ctx.store, &ctx.project_id).await?.is_some() {
        println!("History already exists for project '{}'.", ctx.project_id);
        return Ok(());
    }

    let vcs = VersionControl::new(OfflineProject::shared(), ctx.config.clone());
    ctx.save(&vcs).await?;
    info!(project_id = %ctx.project_id, "history created");
    println!(
        "Started history for project '{}' at {}",
        ctx.project_id,
        short(vcs.root())
    );
    Ok(())
}

/// Resolve a full revision id or a unique prefix of one.
pub fn resolve_revision(tree: &RevisionTree, query: &str) -> anyhow::Result<RevisionId> {
    if let Some(id) = RevisionId::parse(query) {
        if tree.contains(id) {
            return Ok(id);
        }
        bail!("revision {query} not found");
    }

    let needle = query.to_lowercase().replace('-', "");
    if needle.is_empty() {
        bail!("empty revision id");
    }
    let matches: Vec<RevisionId> = tree
        .walk()
        .into_iter()
        .map(|(_, r)| r.id())
        .filter(|id| id.as_uuid().simple().to_string().starts_with(&needle))
        .collect();

    match matches.as_slice() {
        [id] => Ok(*id),
        [] => bail!("revision {query} not found"),
        _ => bail!("revision prefix {query} is ambiguous ({} matches)", matches.len()),
    }
}

pub(crate) fn short(revision: &Revision) -> String {
    revision.id().short()
}

pub(crate) fn format_time(revision: &Revision) -> String {
    revision
        .timestamp()
        .with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_vcs::RevisionBuilder;

    /// Test that revisions resolve by full id and by unique prefix.
    #[test]
    fn test_resolve_revision() {
        let mut tree = RevisionTree::with_root_message("Project started");
        let root = tree.root().id();
        let child = tree
            .add_child(
                root,
                RevisionBuilder::new("child")
                    .with_id(RevisionId::from_uuid(uuid::Uuid::from_u128(0xabcd << 112)))
                    .build(),
            )
            .unwrap();

        assert_eq!(resolve_revision(&tree, &child.id().to_string()).unwrap(), child.id());
        assert_eq!(resolve_revision(&tree, "abcd0000").unwrap(), child.id());
        assert!(resolve_revision(&tree, "").is_err());
        assert!(resolve_revision(&tree, &RevisionId::new().to_string()).is_err());
    }
}
