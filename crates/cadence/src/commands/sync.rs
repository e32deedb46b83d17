//! Remote sync command handlers.
//!
//! The sync service itself lives outside cadence; these commands inspect the
//! local sync cache and record what the service reported.

use std::path::PathBuf;

use cadence_vcs::{RemoteRevision, RevisionId, SyncState, VersionControl};
use clap::Subcommand;
use serde_json::json;

use super::{resolve_revision, short, Context};

/// Sync subcommands.
#[derive(Subcommand)]
pub enum SyncCommands {
    /// Show the remote cache and per-revision sync state
    Status,
    /// List revisions to upload for a branch, leaf first
    Push {
        /// Leaf revision id or prefix (defaults to the head)
        revision: Option<String>,
    },
    /// List revisions to download for a branch, leaf first
    Pull {
        /// Leaf revision id or prefix
        revision: String,
    },
    /// Record a revision as uploaded
    MarkPushed {
        /// Revision id or prefix
        revision: String,
    },
    /// Replace the cache with a remote listing read from a JSON file
    Record {
        /// File holding `[{"id": .., "timestamp": ..}]`
        file: PathBuf,
    },
}

/// Handle sync commands.
pub async fn handle_sync(command: SyncCommands, ctx: &Context) -> anyhow::Result<()> {
    let mut vcs = ctx.open().await?;

    match command {
        SyncCommands::Status => {
            let counts = count_states(&vcs);
            let cache = vcs.remote_cache();
            if ctx.json {
                return ctx.print_json(&json!({
                    "last_sync": cache.last_sync(),
                    "cached_revisions": cache.len(),
                    "outdated": vcs.remote_cache_outdated(),
                    "no_sync": counts.0,
                    "shallow_copy": counts.1,
                    "full_sync": counts.2,
                }));
            }

            match cache.last_sync() {
                Some(at) => println!(
                    "Last sync:        {}",
                    at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S")
                ),
                None => println!("Last sync:        never"),
            }
            println!("Cached revisions: {}", cache.len());
            println!(
                "Cache outdated:   {}",
                if vcs.remote_cache_outdated() { "yes" } else { "no" }
            );
            println!("Local only:       {}", counts.0);
            println!("Shallow:          {}", counts.1);
            println!("Synced:           {}", counts.2);
        }
        SyncCommands::Push { revision } => {
            let leaf = match revision {
                Some(query) => resolve_revision(vcs.tree(), &query)?,
                None => vcs.heading_revision().id(),
            };
            let pending: Vec<_> = vcs
                .branch_to_push(leaf)?
                .into_iter()
                .filter_map(|id| vcs.revision_by_id(id))
                .filter(|r| vcs.revision_sync_state(r) == SyncState::NoSync)
                .map(|r| r.id())
                .collect();
            print_ids(ctx, &vcs, &pending, "Nothing to push.")?;
        }
        SyncCommands::Pull { revision } => {
            let leaf = resolve_revision(vcs.tree(), &revision)?;
            let ids = vcs.branch_to_pull(leaf)?;
            print_ids(ctx, &vcs, &ids, "Nothing to pull.")?;
        }
        SyncCommands::MarkPushed { revision } => {
            let id = resolve_revision(vcs.tree(), &revision)?;
            vcs.update_local_sync_cache(id)?;
            ctx.save(&vcs).await?;
            println!("Marked {} as pushed", id.short());
        }
        SyncCommands::Record { file } => {
            let content = tokio::fs::read_to_string(&file).await?;
            let revisions: Vec<RemoteRevision> = serde_json::from_str(&content)?;
            vcs.update_remote_sync_cache(&revisions);
            ctx.save(&vcs).await?;
            println!("Recorded {} remote revisions", revisions.len());
        }
    }

    Ok(())
}

/// Counts of (local only, shallow, synced) revisions.
fn count_states(vcs: &VersionControl) -> (usize, usize, usize) {
    vcs.tree()
        .walk()
        .into_iter()
        .fold((0, 0, 0), |(local, shallow, synced), (_, r)| {
            match vcs.revision_sync_state(r) {
                SyncState::NoSync => (local + 1, shallow, synced),
                SyncState::ShallowCopy => (local, shallow + 1, synced),
                SyncState::FullSync => (local, shallow, synced + 1),
            }
        })
}

fn print_ids(
    ctx: &Context,
    vcs: &VersionControl,
    ids: &[RevisionId],
    empty: &str,
) -> anyhow::Result<()> {
    if ctx.json {
        return ctx.print_json(&ids);
    }
    if ids.is_empty() {
        println!("{empty}");
        return Ok(());
    }
    for revision in ids.iter().filter_map(|id| vcs.revision_by_id(*id)) {
        println!("{}  {}", short(revision), revision.message());
    }
    Ok(())
}
