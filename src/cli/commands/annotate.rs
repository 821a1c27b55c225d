//! Annotation command: runs the selected passes over a snapshot.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::annotators::{
    Annotator, CitationAnnotator, ConceptAnnotator, MetaMapClient, NerAnnotator, NerClient,
    TokenAnnotator,
};
use crate::config::Settings;
use crate::datastore::Datastore;
use crate::transform::Transformed;

pub struct AnnotateArgs {
    pub snapshot: Option<String>,
    pub tokens: bool,
    pub citations: bool,
    pub concepts: bool,
    pub ner: bool,
    pub limit: usize,
    pub metamap_endpoint: Option<String>,
    pub ner_endpoint: Option<String>,
    pub tag: Option<String>,
}

pub async fn cmd_annotate(settings: &Settings, args: AnnotateArgs) -> anyhow::Result<()> {
    if !(args.tokens || args.citations || args.concepts || args.ner) {
        anyhow::bail!(
            "no annotators selected; pass at least one of --tokens, --citations, --concepts, --ner"
        );
    }

    let store = Datastore::open(&settings.data_dir)?;
    let (name, transformed) = match args.snapshot {
        Some(name) => (name.clone(), store.load_snapshot(&name)?),
        None => store.load_most_recent_snapshot()?,
    };
    println!("{} annotating {}", style("→").cyan(), name);

    let mut corpus = transformed
        .into_flat()
        .ok_or_else(|| anyhow::anyhow!("{} is not flattened; re-run transform with --flatten", name))?;

    // Local passes first, then the service-backed ones: tokens and
    // citations never fail, so a dead service cannot waste their work.
    let mut annotators: Vec<Box<dyn Annotator>> = Vec::new();
    if args.tokens {
        annotators.push(Box::new(TokenAnnotator));
    }
    if args.citations {
        annotators.push(Box::new(CitationAnnotator));
    }
    if args.concepts {
        let mut config = settings.metamap.clone();
        if let Some(endpoint) = &args.metamap_endpoint {
            config.endpoint = endpoint.clone();
        }
        annotators.push(Box::new(ConceptAnnotator::new(MetaMapClient::new(config)?)));
    }
    if args.ner {
        let mut config = settings.ner.clone();
        if let Some(endpoint) = &args.ner_endpoint {
            config.endpoint = endpoint.clone();
        }
        let annotator = NerAnnotator::new(NerClient::new(config)?).with_limit(args.limit);
        annotators.push(Box::new(annotator));
    }

    for annotator in &annotators {
        if !annotator.is_available().await {
            anyhow::bail!(
                "{} unavailable: {}",
                annotator.display_name(),
                annotator.availability_hint()
            );
        }
    }

    for annotator in &annotators {
        let bar = ProgressBar::new_spinner();
        bar.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
        bar.set_message(format!(
            "{} ({} snippets)",
            annotator.display_name(),
            corpus.len()
        ));
        bar.enable_steady_tick(std::time::Duration::from_millis(120));

        let stats = annotator.annotate(&mut corpus).await?;

        bar.finish_and_clear();
        let marker = if stats.failed > 0 {
            style("!").yellow()
        } else {
            style("✓").green()
        };
        println!(
            "{} {}: {} annotated, {} skipped, {} failed",
            marker,
            annotator.display_name(),
            stats.annotated,
            stats.skipped,
            stats.failed
        );
    }

    let tag = args.tag.as_deref().unwrap_or("annotated");
    let path = store.save_snapshot(&Transformed::Flat(corpus), Some(tag))?;
    println!("{} saved {}", style("✓").green(), path.display());
    Ok(())
}
