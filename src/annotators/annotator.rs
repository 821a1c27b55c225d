//! Annotator trait — shared abstraction for annotation passes.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::SnippetMap;

#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("{service} is not available: {hint}")]
    Unavailable { service: String, hint: String },
    #[error("annotation failed: {0}")]
    Failed(String),
}

/// Outcome counts for one annotation pass.
///
/// Per-snippet external-service failures are skip-and-continue: the
/// snippet's field stays unset, the failure is logged and counted here,
/// and the pass keeps going. Only up-front unavailability aborts a run.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnnotationStats {
    /// Snippets whose field was filled by this pass.
    pub annotated: usize,
    /// Snippets left alone (already annotated, or past the run limit).
    pub skipped: usize,
    /// Snippets the external service failed on.
    pub failed: usize,
}

/// A pass that enriches snippets with one kind of annotation.
///
/// Implementations wrap a specific analysis (tokenization, concept
/// extraction, NER, citation detection) and expose it through a uniform
/// interface so the CLI can orchestrate them identically.
#[async_trait]
pub trait Annotator: Send + Sync {
    /// Stable identifier for logs and stats output.
    fn annotation_type(&self) -> &str;

    /// Human-readable name for CLI progress output.
    fn display_name(&self) -> &str;

    /// Whether the backend is ready to run.
    /// Service-backed annotators probe their endpoint; local ones
    /// always return true.
    async fn is_available(&self) -> bool {
        true
    }

    /// Human-readable reason when `is_available` returns false.
    fn availability_hint(&self) -> String {
        String::new()
    }

    /// Annotate the corpus in place, filling this annotator's field on
    /// each snippet that does not have it yet.
    async fn annotate(&self, corpus: &mut SnippetMap) -> Result<AnnotationStats, AnnotationError>;
}
