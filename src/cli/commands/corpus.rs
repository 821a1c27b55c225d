//! Raw-corpus summary command.

use console::style;

use crate::config::Settings;
use crate::datastore::Datastore;

/// Load the raw corpus and print what was joined.
pub fn cmd_corpus(settings: &Settings) -> anyhow::Result<()> {
    let store = Datastore::open(&settings.data_dir)?;
    let corpus = store.build_corpus()?;

    println!(
        "{} {} entities loaded from {}",
        style("✓").green(),
        corpus.len(),
        store.root().display()
    );
    for entity in corpus.values() {
        let questions = entity.responses.len();
        println!(
            "  {:>6}  {:<50}  {} rated questions",
            entity.entity_id,
            truncate(&entity.url, 50),
            questions
        );
    }
    Ok(())
}

/// Truncate a string for column display.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
