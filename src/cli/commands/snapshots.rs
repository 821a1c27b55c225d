//! Snapshot listing and inspection commands.

use console::style;

use crate::config::Settings;
use crate::datastore::Datastore;
use crate::transform::Transformed;

use super::corpus::truncate;

/// List saved snapshots, oldest first.
pub fn cmd_list(settings: &Settings) -> anyhow::Result<()> {
    let store = Datastore::open(&settings.data_dir)?;
    let names = store.list_snapshots()?;
    if names.is_empty() {
        println!("no snapshots found");
        return Ok(());
    }
    for name in &names {
        println!("{}", name);
    }
    println!("{} {} snapshots", style("✓").green(), names.len());
    Ok(())
}

/// Print the first `limit` snippets of a snapshot, in key order.
pub fn cmd_show(settings: &Settings, snapshot: Option<String>, limit: usize) -> anyhow::Result<()> {
    let store = Datastore::open(&settings.data_dir)?;
    let (name, transformed) = match snapshot {
        Some(name) => (name.clone(), store.load_snapshot(&name)?),
        None => store.load_most_recent_snapshot()?,
    };
    println!(
        "{} ({} snippets)",
        style(&name).bold(),
        transformed.snippet_count()
    );

    match transformed {
        Transformed::Flat(map) => {
            for (id, snippet) in map.iter().take(limit) {
                let mut extras = Vec::new();
                if !snippet.html_tags.is_empty() {
                    extras.push(format!("tags: {}", snippet.html_tags.join(",")));
                }
                if let Some(tokens) = &snippet.tokens {
                    extras.push(format!("{} tokens", tokens.len()));
                }
                if let Some(concepts) = &snippet.concepts {
                    extras.push(format!("{} concepts", concepts.len()));
                }
                if let Some(entities) = &snippet.entities {
                    extras.push(format!("{} entities", entities.len()));
                }
                if let Some(citations) = &snippet.citations {
                    extras.push(format!("{} citations", citations.len()));
                }
                println!(
                    "  {:>10}  {}  {}",
                    style(id.to_string()).cyan(),
                    truncate(&snippet.content, 60),
                    style(extras.join(", ")).dim()
                );
            }
        }
        Transformed::PerEntity(map) => {
            for (entity_id, snippets) in map.iter().take(limit) {
                println!(
                    "  {:>10}  {} segments",
                    style(entity_id.to_string()).cyan(),
                    snippets.len()
                );
            }
        }
    }
    Ok(())
}
