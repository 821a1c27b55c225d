//! Transform command: raw corpus in, snapshot out.

use console::style;

use crate::config::Settings;
use crate::datastore::Datastore;
use crate::transform::{SegmentUnit, TransformConfig, Transformer};

pub struct TransformArgs {
    pub segment_into: Option<String>,
    pub leave_some_html: bool,
    pub html_to_plain_text: bool,
    pub keep_newlines: bool,
    pub flatten: bool,
    pub annotate_html: bool,
    pub parallel: bool,
    pub workers: usize,
    pub tag: Option<String>,
}

pub async fn cmd_transform(settings: &Settings, args: TransformArgs) -> anyhow::Result<()> {
    let segment_into = args
        .segment_into
        .as_deref()
        .map(|unit| unit.parse::<SegmentUnit>())
        .transpose()
        .map_err(|e| anyhow::anyhow!(e))?;

    let store = Datastore::open(&settings.data_dir)?;
    let entities = store.build_corpus()?;
    println!(
        "{} transforming {} entities",
        style("→").cyan(),
        entities.len()
    );

    let config = TransformConfig {
        leave_some_html: args.leave_some_html,
        html_to_plain_text: args.html_to_plain_text,
        segment_into,
        remove_newlines: !args.keep_newlines,
        flatten: args.flatten,
        annotate_html: args.annotate_html,
        parallelism: args.parallel,
        num_workers: args.workers,
    };
    let transformer = Transformer::new(config);
    let transformed = transformer.apply(&entities).await?;

    println!(
        "{} {} snippets produced",
        style("✓").green(),
        transformed.snippet_count()
    );
    let path = store.save_snapshot(&transformed, args.tag.as_deref())?;
    println!("{} saved {}", style("✓").green(), path.display());
    Ok(())
}
