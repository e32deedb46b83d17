//! Stash command handlers.

use std::sync::Arc;

use anyhow::bail;
use cadence_vcs::document::RevisionDocument;
use cadence_vcs::{Revision, RevisionId, StashesRepository};
use clap::Subcommand;

use super::{format_time, short, Context};

/// Stash subcommands.
#[derive(Subcommand)]
pub enum StashCommands {
    /// List user stashes and the quick stash
    List,
    /// Show the records of a stash
    Show {
        /// Stash id, id prefix or message
        stash: String,
    },
    /// Discard a user stash
    Drop {
        /// Stash id, id prefix or message
        stash: String,
    },
}

/// Handle stash commands.
pub async fn handle_stash(command: StashCommands, ctx: &Context) -> anyhow::Result<()> {
    let mut vcs = ctx.open().await?;

    match command {
        StashCommands::List => {
            let stashes = vcs.stashes();
            if ctx.json {
                let documents: Vec<_> = stashes
                    .user_stashes()
                    .iter()
                    .map(|s| RevisionDocument::from_revision(s, None))
                    .collect();
                return ctx.print_json(&serde_json::json!({
                    "user": documents,
                    "quick": stashes.quick_stash().map(|s| RevisionDocument::from_revision(s, None)),
                }));
            }

            if stashes.num_user_stashes() == 0 && !stashes.has_quick_stash() {
                println!("No stashes.");
                return Ok(());
            }

            println!("{:<10} {:<20} {:<7} {:<30}", "ID", "CREATED", "ITEMS", "MESSAGE");
            println!("{}", "-".repeat(70));
            for stash in stashes.user_stashes() {
                print_row(stash, stash.message());
            }
            if let Some(quick) = stashes.quick_stash() {
                print_row(quick, "(quick stash)");
            }
        }
        StashCommands::Show { stash } => {
            let stash = find_stash(vcs.stashes(), &stash)?;
            if ctx.json {
                return ctx.print_json(&RevisionDocument::from_revision(&stash, None));
            }

            println!("Stash: {}", stash.id());
            println!("Created: {}", format_time(&stash));
            println!("Message: {}", stash.message());
            println!();
            for item in stash.items() {
                println!(
                    "{:<9} {:<16} {}",
                    item.kind().as_str(),
                    item.logic_type().as_str(),
                    item.uuid()
                );
            }
        }
        StashCommands::Drop { stash } => {
            let stash = find_stash(vcs.stashes(), &stash)?;
            if vcs
                .stashes()
                .quick_stash()
                .is_some_and(|q| q.id() == stash.id())
            {
                bail!("the quick stash can only be restored from the project");
            }
            vcs.drop_stash(stash.id())?;
            ctx.save(&vcs).await?;
            println!("Dropped stash {} ({})", short(&stash), stash.message());
        }
    }

    Ok(())
}

fn print_row(stash: &Revision, label: &str) {
    println!(
        "{:<10} {:<20} {:<7} {:<30}",
        short(stash),
        format_time(stash),
        stash.items().len(),
        label
    );
}

/// Find a stash by full id, id prefix or message.
fn find_stash(stashes: &StashesRepository, query: &str) -> anyhow::Result<Arc<Revision>> {
    if let Some(stash) = RevisionId::parse(query).and_then(|id| stashes.user_stash_by_id(id)) {
        return Ok(Arc::clone(stash));
    }
    if let Some(stash) = stashes.user_stash_with_name(query) {
        return Ok(Arc::clone(stash));
    }

    let needle = query.to_lowercase().replace('-', "");
    let candidates = stashes.user_stashes().iter().chain(stashes.quick_stash());
    let matches: Vec<&Arc<Revision>> = candidates
        .filter(|s| !needle.is_empty() && s.id().as_uuid().simple().to_string().starts_with(&needle))
        .collect();

    match matches.as_slice() {
        [stash] => Ok(Arc::clone(stash)),
        [] => bail!("stash {query} not found"),
        _ => bail!("stash prefix {query} is ambiguous ({} matches)", matches.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_vcs::RevisionBuilder;

    fn stash(message: &str, n: u128) -> Arc<Revision> {
        Arc::new(
            RevisionBuilder::new(message)
                .with_id(RevisionId::from_uuid(uuid::Uuid::from_u128(n << 96)))
                .build(),
        )
    }

    /// Test that stashes resolve by id, message and id prefix.
    #[test]
    fn test_find_stash() {
        let mut stashes = StashesRepository::new();
        let drums = stash("Drums", 0x1111_1111);
        let bass = stash("Bass", 0x2222_2222);
        stashes.add_stash(drums.clone());
        stashes.add_stash(bass.clone());

        let by_id = find_stash(&stashes, &drums.id().to_string()).unwrap();
        assert_eq!(by_id.id(), drums.id());
        assert_eq!(find_stash(&stashes, "Bass").unwrap().id(), bass.id());
        assert_eq!(find_stash(&stashes, "22222222").unwrap().id(), bass.id());
        assert!(find_stash(&stashes, "Keys").is_err());
        assert!(find_stash(&stashes, "").is_err());
    }
}
