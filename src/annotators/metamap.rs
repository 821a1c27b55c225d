//! Medical-concept annotation via a local MetaMap-style service.
//!
//! The service is a separately installed, license-gated process exposed
//! over HTTP. The client is caller-owned and injected into the
//! annotator; the service itself is not safe for concurrent use, so
//! snippets are sent in sequential batches.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{Concept, SnippetMap};

use super::{AnnotationError, AnnotationStats, Annotator};

/// Configuration for the concept-extraction service client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaMapConfig {
    /// Service endpoint (default: http://localhost:8765).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Snippets per request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "http://localhost:8765".to_string()
}
fn default_batch_size() -> usize {
    50
}
fn default_timeout_secs() -> u64 {
    300
}

impl Default for MetaMapConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            batch_size: default_batch_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MetaMapError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("service error: {0}")]
    Api(String),
    #[error("parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Serialize)]
struct ExtractRequest<'a> {
    texts: Vec<TextItem<'a>>,
}

#[derive(Debug, Serialize)]
struct TextItem<'a> {
    index: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    concepts: Vec<Concept>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client for the concept-extraction service.
pub struct MetaMapClient {
    config: MetaMapConfig,
    client: Client,
}

impl MetaMapClient {
    pub fn new(config: MetaMapConfig) -> Result<Self, MetaMapError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MetaMapError::Connection(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &MetaMapConfig {
        &self.config
    }

    /// Check if the concept service is reachable.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/status", self.config.endpoint);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// Extract concepts for a batch of `(index, text)` pairs. The
    /// returned concepts carry the index they were extracted from.
    pub async fn extract(&self, batch: &[(String, String)]) -> Result<Vec<Concept>, MetaMapError> {
        let texts: Vec<TextItem<'_>> = batch
            .iter()
            .map(|(index, text)| TextItem {
                index: index.as_str(),
                text: text.as_str(),
            })
            .collect();
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/extract", self.config.endpoint);
        debug!("sending {} texts to concept service", texts.len());
        let resp = self
            .client
            .post(&url)
            .json(&ExtractRequest { texts })
            .send()
            .await
            .map_err(|e| MetaMapError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(MetaMapError::Api(format!("HTTP {}", resp.status())));
        }

        let body: ExtractResponse = resp
            .json()
            .await
            .map_err(|e| MetaMapError::Parse(e.to_string()))?;
        if let Some(error) = body.error {
            return Err(MetaMapError::Api(error));
        }
        Ok(body.concepts)
    }
}

/// Fills `Snippet::concepts` with matches from the concept service.
///
/// A snippet the service reports nothing for gets `Some(vec![])` — an
/// empty sequence, not an absent field. Empty snippet text is resolved
/// locally to an empty sequence without a service call.
pub struct ConceptAnnotator {
    client: MetaMapClient,
}

impl ConceptAnnotator {
    pub fn new(client: MetaMapClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Annotator for ConceptAnnotator {
    fn annotation_type(&self) -> &str {
        "concepts"
    }

    fn display_name(&self) -> &str {
        "Medical concept extraction"
    }

    async fn is_available(&self) -> bool {
        self.client.is_available().await
    }

    fn availability_hint(&self) -> String {
        format!(
            "no concept service at {} (is MetaMap running?)",
            self.client.config.endpoint
        )
    }

    async fn annotate(&self, corpus: &mut SnippetMap) -> Result<AnnotationStats, AnnotationError> {
        let mut stats = AnnotationStats::default();

        // Pending work in key order. Empty text never reaches the
        // service; it resolves to an empty concept list immediately.
        let mut pending: Vec<(String, String)> = Vec::new();
        for (id, snippet) in corpus.iter_mut() {
            if snippet.concepts.is_some() {
                stats.skipped += 1;
            } else if snippet.content.trim().is_empty() {
                snippet.concepts = Some(Vec::new());
                stats.annotated += 1;
            } else {
                pending.push((id.to_string(), snippet.content.clone()));
            }
        }

        // The service handle is single-use; batches go out sequentially.
        let mut by_index: BTreeMap<String, Vec<Concept>> = BTreeMap::new();
        let mut failed_indexes: Vec<String> = Vec::new();
        for batch in pending.chunks(self.client.config.batch_size.max(1)) {
            match self.client.extract(batch).await {
                Ok(concepts) => {
                    for (index, _) in batch {
                        by_index.entry(index.clone()).or_default();
                    }
                    for concept in concepts {
                        by_index.entry(concept.index.clone()).or_default().push(concept);
                    }
                }
                Err(e) => {
                    warn!("concept extraction failed for batch of {}: {}", batch.len(), e);
                    failed_indexes.extend(batch.iter().map(|(index, _)| index.clone()));
                }
            }
        }

        for (index, concepts) in by_index {
            if let Ok(id) = index.parse() {
                if let Some(snippet) = corpus.get_mut(&id) {
                    snippet.concepts = Some(concepts);
                    stats.annotated += 1;
                }
            }
        }
        stats.failed = failed_indexes.len();
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Snippet, SnippetId};

    #[test]
    fn test_concept_wire_format_parses() {
        let body = r#"{
            "concepts": [{
                "index": "101-0",
                "score": 3.61,
                "preferred_name": "Depressive disorder",
                "cui": "C0011581",
                "semtypes": ["mobd"],
                "trigger": "depression",
                "pos_info": "12:10",
                "tree_codes": ["F03.600.300"]
            }]
        }"#;
        let parsed: ExtractResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.concepts.len(), 1);
        let concept = &parsed.concepts[0];
        assert_eq!(concept.cui, "C0011581");
        assert_eq!(concept.semtypes, vec!["mobd"]);
        assert!(parsed.error.is_none());
    }

    #[test]
    fn test_error_wire_format_parses() {
        let parsed: ExtractResponse =
            serde_json::from_str(r#"{"error": "metamap process died"}"#).unwrap();
        assert_eq!(parsed.error.as_deref(), Some("metamap process died"));
        assert!(parsed.concepts.is_empty());
    }

    #[test]
    fn test_tree_codes_optional_in_wire_format() {
        let body = r#"{
            "concepts": [{
                "index": "1-0",
                "score": 2.0,
                "preferred_name": "x",
                "cui": "C0000001",
                "semtypes": [],
                "trigger": "x",
                "pos_info": "0:1"
            }]
        }"#;
        let parsed: ExtractResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.concepts[0].tree_codes.is_empty());
    }

    #[tokio::test]
    async fn test_empty_content_resolved_without_service() {
        // Endpoint points nowhere; empty snippets must still annotate.
        let client = MetaMapClient::new(MetaMapConfig {
            endpoint: "http://127.0.0.1:9".into(),
            ..MetaMapConfig::default()
        })
        .unwrap();
        let annotator = ConceptAnnotator::new(client);

        let snippet = Snippet::new(1, 0, "https://example.org".into(), "   ".into());
        let mut corpus = SnippetMap::new();
        corpus.insert(snippet.id(), snippet);

        let stats = annotator.annotate(&mut corpus).await.unwrap();
        assert_eq!(stats.annotated, 1);
        assert_eq!(stats.failed, 0);
        assert_eq!(
            corpus[&SnippetId::new(1, 0)].concepts.as_deref().unwrap().len(),
            0
        );
    }

    #[tokio::test]
    async fn test_service_failure_leaves_field_unset() {
        let client = MetaMapClient::new(MetaMapConfig {
            endpoint: "http://127.0.0.1:9".into(),
            timeout_secs: 1,
            ..MetaMapConfig::default()
        })
        .unwrap();
        let annotator = ConceptAnnotator::new(client);

        let snippet = Snippet::new(1, 0, "https://example.org".into(), "depression".into());
        let mut corpus = SnippetMap::new();
        corpus.insert(snippet.id(), snippet);

        let stats = annotator.annotate(&mut corpus).await.unwrap();
        assert_eq!(stats.failed, 1);
        // failed snippet is distinguishable from "ran, found nothing"
        assert!(corpus[&SnippetId::new(1, 0)].concepts.is_none());
    }
}
