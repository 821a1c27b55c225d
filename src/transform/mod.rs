//! The transformation pipeline: HTML cleaning, segmentation into
//! snippets, flattening, and HTML-structure annotation.
//!
//! Per-document work is stateless, so the only concurrency here is an
//! optional fan-out of documents across blocking worker tasks. Output
//! ordering and content are identical either way.

pub mod html;
pub mod segment;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::models::{Entity, EntityMap, LinkType, Snippet, SnippetMap};
use crate::utils::registered_domain;

pub use html::{condense_line_breaks, finalize_text, render, TagPolicy, SENTINEL_TAGS};
pub use segment::SegmentUnit;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("transform worker failed: {0}")]
    Worker(String),
}

/// Configuration for a transformer run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Keep the header/link allow-list of HTML tags verbatim.
    #[serde(default)]
    pub leave_some_html: bool,
    /// Convert remaining HTML into segmentation-safe plain text with
    /// sentinel words standing in for structural tags.
    #[serde(default)]
    pub html_to_plain_text: bool,
    /// Unit of division; `None` leaves each document as one snippet.
    #[serde(default)]
    pub segment_into: Option<SegmentUnit>,
    /// Collapse newlines and re-normalize whitespace after cleaning.
    #[serde(default = "default_true")]
    pub remove_newlines: bool,
    /// Collapse per-document segment lists into one flat map keyed by
    /// `entity_id-sub_id`.
    #[serde(default)]
    pub flatten: bool,
    /// Consume sentinel words into `html_tags`/`domains`/`link_type`.
    #[serde(default)]
    pub annotate_html: bool,
    /// Fan documents out across blocking worker tasks.
    #[serde(default)]
    pub parallelism: bool,
    /// Worker batch size when `parallelism` is set.
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,
}

fn default_true() -> bool {
    true
}

fn default_num_workers() -> usize {
    8
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            leave_some_html: false,
            html_to_plain_text: false,
            segment_into: None,
            remove_newlines: true,
            flatten: false,
            annotate_html: false,
            parallelism: false,
            num_workers: default_num_workers(),
        }
    }
}

/// Output of a transformer run: per-entity segment lists, or the flat
/// snippet map when `flatten` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Transformed {
    Flat(SnippetMap),
    PerEntity(BTreeMap<i64, Vec<Snippet>>),
}

impl Transformed {
    pub fn as_flat(&self) -> Option<&SnippetMap> {
        match self {
            Self::Flat(map) => Some(map),
            Self::PerEntity(_) => None,
        }
    }

    pub fn into_flat(self) -> Option<SnippetMap> {
        match self {
            Self::Flat(map) => Some(map),
            Self::PerEntity(_) => None,
        }
    }

    /// Total number of snippets across all entities.
    pub fn snippet_count(&self) -> usize {
        match self {
            Self::Flat(map) => map.len(),
            Self::PerEntity(map) => map.values().map(Vec::len).sum(),
        }
    }
}

/// Applies the configured cleaning, segmentation, and annotation steps
/// to each document.
pub struct Transformer {
    config: TransformConfig,
}

impl Transformer {
    pub fn new(config: TransformConfig) -> Self {
        if config.leave_some_html && config.segment_into.is_some() && !config.html_to_plain_text {
            warn!(
                "segmentation does not work well with html remaining in the text; \
                 consider enabling html_to_plain_text"
            );
        }
        if config.annotate_html && !config.html_to_plain_text {
            warn!(
                "annotate_html has nothing to consume without html_to_plain_text; \
                 no tags or domains will be recorded"
            );
        }
        if config.flatten && config.segment_into.is_none() {
            warn!("flatten without segmentation produces one snippet per entity");
        }
        Self { config }
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Run the pipeline over the entity corpus.
    pub async fn apply(&self, entities: &EntityMap) -> Result<Transformed, TransformError> {
        let per_entity = if self.config.parallelism {
            self.apply_parallel(entities).await?
        } else {
            entities
                .values()
                .map(|entity| (entity.entity_id, transform_entity(&self.config, entity)))
                .collect()
        };

        if self.config.flatten {
            let mut flat = SnippetMap::new();
            for snippets in per_entity.into_values() {
                for snippet in snippets {
                    flat.insert(snippet.id(), snippet);
                }
            }
            Ok(Transformed::Flat(flat))
        } else {
            Ok(Transformed::PerEntity(per_entity))
        }
    }

    /// Fan documents out across blocking tasks, `num_workers` at a time.
    /// Results are collected per entity id, so ordering matches the
    /// serial path.
    async fn apply_parallel(
        &self,
        entities: &EntityMap,
    ) -> Result<BTreeMap<i64, Vec<Snippet>>, TransformError> {
        let mut per_entity = BTreeMap::new();
        let batch = self.config.num_workers.max(1);
        let all: Vec<Entity> = entities.values().cloned().collect();

        for chunk in all.chunks(batch) {
            let handles: Vec<_> = chunk
                .iter()
                .cloned()
                .map(|entity| {
                    let config = self.config.clone();
                    tokio::task::spawn_blocking(move || {
                        (entity.entity_id, transform_entity(&config, &entity))
                    })
                })
                .collect();
            for handle in handles {
                let (id, snippets) = handle
                    .await
                    .map_err(|e| TransformError::Worker(e.to_string()))?;
                per_entity.insert(id, snippets);
            }
        }
        Ok(per_entity)
    }
}

/// Transform one entity into its ordered snippet list.
fn transform_entity(config: &TransformConfig, entity: &Entity) -> Vec<Snippet> {
    let cleaned = clean_content(config, &entity.content);

    let segments = match config.segment_into {
        Some(unit) => unit.segment(&cleaned),
        None => vec![cleaned],
    };

    let mut snippets: Vec<Snippet> = segments
        .into_iter()
        .map(|content| {
            let content = if config.remove_newlines {
                html::normalize_punctuation_and_whitespace(&content.replace('\n', " "))
            } else {
                content
            };
            content
        })
        .enumerate()
        .map(|(sub_id, content)| {
            Snippet::new(entity.entity_id, sub_id as u32, entity.url.clone(), content)
        })
        .collect();

    if config.annotate_html {
        for snippet in &mut snippets {
            consume_sentinels(snippet);
            classify_links(snippet);
        }
    }

    snippets
}

/// Apply the configured cleaning policy to raw article HTML.
fn clean_content(config: &TransformConfig, raw: &str) -> String {
    match (config.leave_some_html, config.html_to_plain_text) {
        (true, false) => finalize_text(&render(raw, &TagPolicy::limited_html())),
        (_, true) => {
            let cleared = html::clear_non_rendered_newlines(raw);
            finalize_text(&render(&cleared, &TagPolicy::limited_html_plain_text()))
        }
        (false, false) => {
            let cleared = html::clear_non_rendered_newlines(raw);
            finalize_text(&render(&cleared, &TagPolicy::plain_text()))
        }
    }
}

/// Consume sentinel words from snippet content, recording which tags
/// wrapped the segment and which domains its links pointed at.
fn consume_sentinels(snippet: &mut Snippet) {
    let mut found_tags = Vec::new();
    let mut domains = Vec::new();

    for (sentinel, tag) in SENTINEL_TAGS {
        if !snippet.content.contains(sentinel) {
            continue;
        }
        if *tag == "a" {
            // Link sentinels carry the domain as a suffix of the word.
            let mut rebuilt = String::new();
            for word in snippet.content.split(' ') {
                if let Some(pos) = word.find(sentinel) {
                    domains.push(word[pos + sentinel.len()..].to_string());
                    let prefix = &word[..pos];
                    if !prefix.is_empty() {
                        rebuilt.push_str(prefix);
                        rebuilt.push(' ');
                    }
                } else if !word.is_empty() {
                    rebuilt.push_str(word);
                    rebuilt.push(' ');
                }
            }
            snippet.content = rebuilt.trim_end().to_string();
        } else {
            snippet.content = snippet.content.replace(sentinel, " ").trim().to_string();
        }
        found_tags.push(tag.to_string());
    }

    snippet.html_tags = found_tags;
    snippet.domains = domains;
}

/// Classify each linked domain as internal or external against the
/// parent entity's URL. Links without a resolvable domain are assumed to
/// be internal filepaths.
fn classify_links(snippet: &mut Snippet) {
    let source_domain = registered_domain(&snippet.url);
    if source_domain.is_none() && !snippet.domains.is_empty() {
        warn!(
            entity_id = snippet.entity_id,
            "entity url has no resolvable domain; links classified as external"
        );
    }
    snippet.link_type = snippet
        .domains
        .iter()
        .map(|domain| {
            if domain == "NA" || Some(domain.as_str()) == source_domain.as_deref() {
                LinkType::Internal
            } else {
                LinkType::External
            }
        })
        .collect();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: i64, url: &str, content: &str) -> Entity {
        Entity::new(id, url.to_string(), content.to_string())
    }

    fn corpus(entities: Vec<Entity>) -> EntityMap {
        entities.into_iter().map(|e| (e.entity_id, e)).collect()
    }

    fn plain_sentence_config() -> TransformConfig {
        TransformConfig {
            html_to_plain_text: true,
            segment_into: Some(SegmentUnit::Sentences),
            flatten: true,
            annotate_html: true,
            ..TransformConfig::default()
        }
    }

    #[tokio::test]
    async fn test_sub_ids_contiguous_per_entity() {
        let entities = corpus(vec![entity(
            1,
            "https://example.org/a",
            "<p>One sentence here. Another sentence there. A third one now.</p>",
        )]);
        let transformer = Transformer::new(plain_sentence_config());
        let flat = transformer.apply(&entities).await.unwrap().into_flat().unwrap();

        let sub_ids: Vec<u32> = flat.keys().map(|k| k.sub_id).collect();
        assert_eq!(sub_ids, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_apply_is_deterministic() {
        let entities = corpus(vec![
            entity(1, "https://example.org", "<p>Alpha beta. Gamma delta.</p>"),
            entity(2, "https://example.net", "<h2>Header</h2><p>Body text.</p>"),
        ]);
        let transformer = Transformer::new(plain_sentence_config());
        let first = transformer.apply(&entities).await.unwrap().into_flat().unwrap();
        let second = transformer.apply(&entities).await.unwrap().into_flat().unwrap();

        assert_eq!(
            first.keys().collect::<Vec<_>>(),
            second.keys().collect::<Vec<_>>()
        );
        for (id, snippet) in &first {
            assert_eq!(snippet.content, second[id].content);
        }
    }

    #[tokio::test]
    async fn test_parallel_matches_serial() {
        let entities = corpus(
            (1..=10)
                .map(|id| {
                    entity(
                        id,
                        "https://example.org",
                        "<h1>Title</h1><p>First point made. Second point made.</p>",
                    )
                })
                .collect(),
        );
        let serial = Transformer::new(plain_sentence_config())
            .apply(&entities)
            .await
            .unwrap()
            .into_flat()
            .unwrap();
        let parallel_config = TransformConfig {
            parallelism: true,
            num_workers: 3,
            ..plain_sentence_config()
        };
        let parallel = Transformer::new(parallel_config)
            .apply(&entities)
            .await
            .unwrap()
            .into_flat()
            .unwrap();

        assert_eq!(serial.len(), parallel.len());
        for (id, snippet) in &serial {
            assert_eq!(snippet.content, parallel[id].content);
            assert_eq!(snippet.html_tags, parallel[id].html_tags);
        }
    }

    #[tokio::test]
    async fn test_html_annotation_records_tags_and_cleans_content() {
        let entities = corpus(vec![entity(
            7,
            "https://example.org/page",
            "<h1>Depression</h1>",
        )]);
        let config = TransformConfig {
            html_to_plain_text: true,
            flatten: true,
            annotate_html: true,
            ..TransformConfig::default()
        };
        let flat = Transformer::new(config)
            .apply(&entities)
            .await
            .unwrap()
            .into_flat()
            .unwrap();

        let snippet = flat.values().next().unwrap();
        assert_eq!(snippet.html_tags, vec!["h1"]);
        assert!(!snippet.content.contains("thisisah1tag"));
        assert!(snippet.content.contains("Depression"));
    }

    #[tokio::test]
    async fn test_link_classification_internal_external() {
        let entities = corpus(vec![entity(
            3,
            "https://www.rcpsych.ac.uk/depression",
            "<p>See <a href=\"https://drugs.rcpsych.co.uk/x\">our drug guide</a> and \
             <a href=\"https://www.nhs.uk/conditions\">the NHS</a> and \
             <a href=\"/local/page\">this page</a>.</p>",
        )]);
        let config = TransformConfig {
            html_to_plain_text: true,
            flatten: true,
            annotate_html: true,
            ..TransformConfig::default()
        };
        let flat = Transformer::new(config)
            .apply(&entities)
            .await
            .unwrap()
            .into_flat()
            .unwrap();

        let snippet = flat.values().next().unwrap();
        assert_eq!(snippet.domains, vec!["rcpsych", "nhs", "NA"]);
        assert_eq!(
            snippet.link_type,
            vec![LinkType::Internal, LinkType::External, LinkType::Internal]
        );
    }

    #[tokio::test]
    async fn test_plain_text_input_degrades_gracefully() {
        let entities = corpus(vec![entity(
            9,
            "https://example.org",
            "No markup at all. Just two sentences.",
        )]);
        let flat = Transformer::new(plain_sentence_config())
            .apply(&entities)
            .await
            .unwrap()
            .into_flat()
            .unwrap();
        assert_eq!(flat.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_document_yields_no_snippets() {
        let entities = corpus(vec![entity(4, "https://example.org", "")]);
        let flat = Transformer::new(plain_sentence_config())
            .apply(&entities)
            .await
            .unwrap()
            .into_flat()
            .unwrap();
        assert!(flat.is_empty());
    }

    #[tokio::test]
    async fn test_unflattened_output_keyed_by_entity() {
        let entities = corpus(vec![entity(
            2,
            "https://example.org",
            "<p>One here. Two there.</p>",
        )]);
        let config = TransformConfig {
            html_to_plain_text: true,
            segment_into: Some(SegmentUnit::Sentences),
            ..TransformConfig::default()
        };
        let result = Transformer::new(config).apply(&entities).await.unwrap();
        match result {
            Transformed::PerEntity(map) => {
                assert_eq!(map[&2].len(), 2);
                assert_eq!(map[&2][0].sub_id, 0);
                assert_eq!(map[&2][1].sub_id, 1);
            }
            Transformed::Flat(_) => panic!("expected per-entity output"),
        }
    }
}
