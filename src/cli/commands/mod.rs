//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to
//! command-specific modules.

mod annotate;
mod corpus;
mod snapshots;
mod transform;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Settings;

#[derive(Parser)]
#[command(name = "discernprep")]
#[command(about = "Health-article corpus preparation for DISCERN quality-rating research")]
#[command(version)]
pub struct Cli {
    /// Data directory (overrides config file)
    #[arg(long, short = 'd', global = true)]
    data_dir: Option<String>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Load the raw corpus and print a summary
    Corpus,

    /// Clean, segment, and annotate article HTML into a new snapshot
    Transform {
        /// Segment into words, sentences, or paragraphs
        #[arg(long, short = 's')]
        segment_into: Option<String>,
        /// Keep the header/link allow-list of HTML tags verbatim
        #[arg(long)]
        leave_some_html: bool,
        /// Convert HTML structure into segmentation-safe sentinel words
        #[arg(long)]
        html_to_plain_text: bool,
        /// Keep newlines instead of collapsing them after cleaning
        #[arg(long)]
        keep_newlines: bool,
        /// Flatten per-document segments into one map keyed by entity_id-sub_id
        #[arg(long)]
        flatten: bool,
        /// Record HTML tags, link domains, and link types per segment
        #[arg(long)]
        annotate_html: bool,
        /// Fan documents out across worker tasks
        #[arg(long)]
        parallel: bool,
        /// Worker batch size when --parallel is set
        #[arg(long, default_value = "8")]
        workers: usize,
        /// Free-text tag embedded in the snapshot filename
        #[arg(long, short = 't')]
        tag: Option<String>,
    },

    /// Run annotation passes over a snapshot and save the result
    Annotate {
        /// Snapshot name to annotate (defaults to the most recent)
        #[arg(long)]
        snapshot: Option<String>,
        /// Tokenize snippet content
        #[arg(long)]
        tokens: bool,
        /// Detect inline citations
        #[arg(long)]
        citations: bool,
        /// Extract medical concepts via the MetaMap service
        #[arg(long)]
        concepts: bool,
        /// Tag named entities via the hosted model (high latency)
        #[arg(long)]
        ner: bool,
        /// Annotate at most this many snippets with NER (0 = no limit)
        #[arg(long, default_value = "0")]
        limit: usize,
        /// Concept service endpoint (overrides config)
        #[arg(long)]
        metamap_endpoint: Option<String>,
        /// NER model endpoint (overrides config)
        #[arg(long)]
        ner_endpoint: Option<String>,
        /// Free-text tag embedded in the output snapshot filename
        #[arg(long, short = 't')]
        tag: Option<String>,
    },

    /// List saved snapshots, oldest first
    Snapshots,

    /// Print the first snippets of a snapshot
    Show {
        /// Snapshot name (defaults to the most recent)
        #[arg(long)]
        snapshot: Option<String>,
        /// Number of snippets to print
        #[arg(long, short = 'n', default_value = "10")]
        limit: usize,
    },
}

/// Parse arguments and run the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir {
        settings.data_dir = data_dir;
    }

    match cli.command {
        Commands::Corpus => corpus::cmd_corpus(&settings),
        Commands::Transform {
            segment_into,
            leave_some_html,
            html_to_plain_text,
            keep_newlines,
            flatten,
            annotate_html,
            parallel,
            workers,
            tag,
        } => {
            transform::cmd_transform(
                &settings,
                transform::TransformArgs {
                    segment_into,
                    leave_some_html,
                    html_to_plain_text,
                    keep_newlines,
                    flatten,
                    annotate_html,
                    parallel,
                    workers,
                    tag,
                },
            )
            .await
        }
        Commands::Annotate {
            snapshot,
            tokens,
            citations,
            concepts,
            ner,
            limit,
            metamap_endpoint,
            ner_endpoint,
            tag,
        } => {
            annotate::cmd_annotate(
                &settings,
                annotate::AnnotateArgs {
                    snapshot,
                    tokens,
                    citations,
                    concepts,
                    ner,
                    limit,
                    metamap_endpoint,
                    ner_endpoint,
                    tag,
                },
            )
            .await
        }
        Commands::Snapshots => snapshots::cmd_list(&settings),
        Commands::Show { snapshot, limit } => snapshots::cmd_show(&settings, snapshot, limit),
    }
}
