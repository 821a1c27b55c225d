//! Named-entity annotation via a hosted model endpoint.
//!
//! The model answers sentence-level queries with BIO-tagged tokens,
//! which are merged into labeled spans here. Calls are high-latency, so
//! the annotator supports a per-run limit for smaller-scale passes.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{NerSpan, SnippetMap};

use super::{AnnotationError, AnnotationStats, Annotator};

/// Configuration for the hosted NER model client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NerConfig {
    /// Model endpoint (default: http://localhost:8000).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "http://localhost:8000".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for NerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NerError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("service error: {0}")]
    Api(String),
    #[error("parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    sentence: &'a str,
}

/// BIO-tagged tokens, one tag per word.
#[derive(Debug, Deserialize)]
struct PredictResponse {
    words: Vec<String>,
    tags: Vec<String>,
}

/// HTTP client for the hosted NER model.
pub struct NerClient {
    config: NerConfig,
    client: Client,
}

impl NerClient {
    pub fn new(config: NerConfig) -> Result<Self, NerError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NerError::Connection(e.to_string()))?;
        Ok(Self { config, client })
    }

    /// Check if the model endpoint is reachable.
    pub async fn is_available(&self) -> bool {
        match self.client.get(&self.config.endpoint).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// Tag one sentence, returning merged entity spans.
    pub async fn tag_sentence(&self, sentence: &str) -> Result<Vec<NerSpan>, NerError> {
        if sentence.trim().is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/predict", self.config.endpoint);
        debug!("tagging sentence ({} chars)", sentence.len());
        let resp = self
            .client
            .post(&url)
            .json(&PredictRequest { sentence })
            .send()
            .await
            .map_err(|e| NerError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(NerError::Api(format!("HTTP {}", resp.status())));
        }

        let body: PredictResponse = resp
            .json()
            .await
            .map_err(|e| NerError::Parse(e.to_string()))?;
        Ok(merge_bio_spans(&body.words, &body.tags))
    }
}

/// Merge BIO-tagged tokens into labeled spans. `O` tokens are dropped;
/// a `B-` tag opens a span and `I-` tags of the same label extend it.
fn merge_bio_spans(words: &[String], tags: &[String]) -> Vec<NerSpan> {
    let mut spans: Vec<NerSpan> = Vec::new();
    let mut current: Option<NerSpan> = None;

    for (word, tag) in words.iter().zip(tags.iter()) {
        let (prefix, label) = match tag.split_once('-') {
            Some((p, l)) => (p, l),
            None => ("O", ""),
        };
        match prefix {
            "B" | "U" => {
                if let Some(span) = current.take() {
                    spans.push(span);
                }
                current = Some(NerSpan {
                    text: word.clone(),
                    label: label.to_string(),
                });
            }
            "I" | "L" => match current.as_mut() {
                Some(span) if span.label == label => {
                    span.text.push(' ');
                    span.text.push_str(word);
                }
                // Dangling continuation tag: treat as a span start.
                _ => {
                    if let Some(span) = current.take() {
                        spans.push(span);
                    }
                    current = Some(NerSpan {
                        text: word.clone(),
                        label: label.to_string(),
                    });
                }
            },
            _ => {
                if let Some(span) = current.take() {
                    spans.push(span);
                }
            }
        }
    }
    if let Some(span) = current {
        spans.push(span);
    }
    spans
}

/// Fills `Snippet::entities` with spans from the hosted NER model.
pub struct NerAnnotator {
    client: NerClient,
    /// Annotate at most this many snippets per run; 0 means no limit.
    limit: usize,
}

impl NerAnnotator {
    pub fn new(client: NerClient) -> Self {
        Self { client, limit: 0 }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

#[async_trait]
impl Annotator for NerAnnotator {
    fn annotation_type(&self) -> &str {
        "ner"
    }

    fn display_name(&self) -> &str {
        "Named entity recognition"
    }

    async fn is_available(&self) -> bool {
        self.client.is_available().await
    }

    fn availability_hint(&self) -> String {
        format!("no NER model at {}", self.client.config.endpoint)
    }

    async fn annotate(&self, corpus: &mut SnippetMap) -> Result<AnnotationStats, AnnotationError> {
        let mut stats = AnnotationStats::default();
        for (id, snippet) in corpus.iter_mut() {
            if snippet.entities.is_some() {
                stats.skipped += 1;
                continue;
            }
            if self.limit > 0 && stats.annotated + stats.failed >= self.limit {
                stats.skipped += 1;
                continue;
            }
            match self.client.tag_sentence(&snippet.content).await {
                Ok(spans) => {
                    snippet.entities = Some(spans);
                    stats.annotated += 1;
                }
                Err(e) => {
                    warn!("ner tagging failed for {}: {}", id, e);
                    stats.failed += 1;
                }
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_merge_bio_spans_basic() {
        let words = strings(&["John", "Smith", "visited", "London", "."]);
        let tags = strings(&["B-PER", "I-PER", "O", "B-LOC", "O"]);
        assert_eq!(
            merge_bio_spans(&words, &tags),
            vec![
                NerSpan {
                    text: "John Smith".into(),
                    label: "PER".into()
                },
                NerSpan {
                    text: "London".into(),
                    label: "LOC".into()
                },
            ]
        );
    }

    #[test]
    fn test_merge_bio_spans_adjacent_entities() {
        let words = strings(&["NICE", "London"]);
        let tags = strings(&["B-ORG", "B-LOC"]);
        let spans = merge_bio_spans(&words, &tags);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].label, "ORG");
        assert_eq!(spans[1].label, "LOC");
    }

    #[test]
    fn test_merge_bio_spans_dangling_continuation() {
        let words = strings(&["Smith"]);
        let tags = strings(&["I-PER"]);
        assert_eq!(
            merge_bio_spans(&words, &tags),
            vec![NerSpan {
                text: "Smith".into(),
                label: "PER".into()
            }]
        );
    }

    #[test]
    fn test_merge_bio_spans_all_outside() {
        let words = strings(&["nothing", "here"]);
        let tags = strings(&["O", "O"]);
        assert!(merge_bio_spans(&words, &tags).is_empty());
    }

    #[test]
    fn test_predict_wire_format_parses() {
        let body = r#"{"words": ["aspirin", "helps"], "tags": ["B-DRUG", "O"]}"#;
        let parsed: PredictResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.words.len(), 2);
        assert_eq!(parsed.tags[0], "B-DRUG");
    }
}
