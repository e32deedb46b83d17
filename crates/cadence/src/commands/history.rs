//! History command handlers.
//!
//! Handles browsing revisions, the head snapshot and moving the head.

use anyhow::bail;
use cadence_vcs::document::{HeadDocument, RevisionDocument};
use cadence_vcs::{Revision, RevisionItem};
use clap::Subcommand;
use serde_json::json;

use super::{format_time, resolve_revision, short, Context};

/// History subcommands.
#[derive(Subcommand)]
pub enum HistoryCommands {
    /// List the branch leading to a revision, newest first
    Log {
        /// Revision id or prefix (defaults to the head)
        revision: Option<String>,
    },
    /// Print the whole revision tree
    Tree,
    /// Show the records of one revision
    Show {
        /// Revision id or prefix
        revision: String,
    },
    /// Show history totals
    Stats,
    /// List the item states recorded at the head
    Snapshot,
    /// Move the head to a revision
    Head {
        /// Revision id or prefix
        revision: String,
    },
    /// Drop all history, stashes and sync state
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

/// Handle history commands.
pub async fn handle_history(command: HistoryCommands, ctx: &Context) -> anyhow::Result<()> {
    let mut vcs = ctx.open().await?;

    match command {
        HistoryCommands::Log { revision } => {
            let leaf = match revision {
                Some(query) => resolve_revision(vcs.tree(), &query)?,
                None => vcs.heading_revision().id(),
            };
            let branch = vcs.branch_to_push(leaf)?;
            let revisions: Vec<_> = branch
                .into_iter()
                .filter_map(|id| vcs.revision_by_id(id).cloned())
                .collect();

            if ctx.json {
                let documents: Vec<_> = revisions
                    .iter()
                    .map(|r| RevisionDocument::from_revision(r, None))
                    .collect();
                return ctx.print_json(&documents);
            }

            let head = vcs.heading_revision().id();
            for revision in &revisions {
                let marker = if revision.id() == head { "*" } else { " " };
                println!(
                    "{marker} {}  {}  {}{}",
                    short(revision),
                    format_time(revision),
                    revision.message(),
                    annotation(revision)
                );
            }
        }
        HistoryCommands::Tree => {
            let head = vcs.heading_revision().id();
            if ctx.json {
                let nodes: Vec<_> = vcs
                    .tree()
                    .walk()
                    .into_iter()
                    .map(|(depth, r)| {
                        json!({
                            "id": r.id(),
                            "depth": depth,
                            "message": r.message(),
                            "head": r.id() == head,
                            "sync": vcs.revision_sync_state(r),
                        })
                    })
                    .collect();
                return ctx.print_json(&nodes);
            }

            for (depth, revision) in vcs.tree().walk() {
                let marker = if revision.id() == head { "*" } else { " " };
                println!(
                    "{marker} {}{}  {}{}",
                    "  ".repeat(depth),
                    short(revision),
                    revision.message(),
                    annotation(revision)
                );
            }
        }
        HistoryCommands::Show { revision } => {
            let id = resolve_revision(vcs.tree(), &revision)?;
            let Some(revision) = vcs.revision_by_id(id).cloned() else {
                bail!("revision {id} not found");
            };
            let parent = vcs.tree().parent(id).map(|p| p.id());

            if ctx.json {
                return ctx.print_json(&RevisionDocument::from_revision(&revision, parent));
            }

            println!("Revision: {}", revision.id());
            if let Some(parent) = parent {
                println!("Parent: {parent}");
            }
            println!("Date: {}", format_time(&revision));
            println!("Message: {}", revision.message());
            println!("Sync: {:?}", vcs.revision_sync_state(&revision));
            if revision.is_shallow_copy() {
                println!();
                println!("Records not pulled from remote yet.");
            } else {
                println!();
                print_items(revision.items());
            }
        }
        HistoryCommands::Stats => {
            let stats = vcs.stats();
            let snapshot_items = vcs.head().with_snapshot(|s| s.len());
            if ctx.json {
                return ctx.print_json(&json!({
                    "revisions": stats.revisions,
                    "deltas": stats.deltas,
                    "user_stashes": vcs.stashes().num_user_stashes(),
                    "quick_stash": vcs.has_quick_stash(),
                    "snapshot_items": snapshot_items,
                }));
            }

            println!("Revisions:      {}", stats.revisions);
            println!("Deltas:         {}", stats.deltas);
            println!("Stashes:        {}", vcs.stashes().num_user_stashes());
            println!(
                "Quick stash:    {}",
                if vcs.has_quick_stash() { "yes" } else { "no" }
            );
            println!("Snapshot items: {snapshot_items}");
        }
        HistoryCommands::Snapshot => {
            let snapshot = vcs.head().with_snapshot(HeadDocument::from_snapshot);
            if ctx.json {
                return ctx.print_json(&snapshot);
            }
            println!("Head: {}", describe(&vcs.heading_revision()));
            println!();
            print_items(&snapshot.snapshot);
        }
        HistoryCommands::Head { revision } => {
            let id = resolve_revision(vcs.tree(), &revision)?;
            vcs.move_head(id)?;
            ctx.save(&vcs).await?;
            println!("Head is now at {}", describe(&vcs.heading_revision()));
        }
        HistoryCommands::Reset { yes } => {
            if !yes {
                bail!("reset drops the whole history; pass --yes to confirm");
            }
            vcs.reset();
            ctx.save(&vcs).await?;
            println!("History reset to {}", describe(vcs.root()));
        }
    }

    Ok(())
}

fn annotation(revision: &Revision) -> &'static str {
    if revision.is_shallow_copy() {
        " (shallow)"
    } else {
        ""
    }
}

fn describe(revision: &Revision) -> String {
    format!("{} {}", short(revision), revision.message())
}

fn print_items(items: &[RevisionItem]) {
    if items.is_empty() {
        println!("No items.");
        return;
    }

    println!("{:<9} {:<16} {:<36} {:<8}", "CHANGE", "TYPE", "ITEM", "DELTAS");
    println!("{}", "-".repeat(72));
    for item in items {
        println!(
            "{:<9} {:<16} {:<36} {:<8}",
            item.kind().as_str(),
            item.logic_type().as_str(),
            item.uuid(),
            item.num_deltas()
        );
        for delta in item.deltas() {
            if delta.description.is_empty() {
                println!("    {}", delta.kind);
            } else {
                println!("    {}: {}", delta.kind, delta.description);
            }
        }
    }
}
