//! Token annotation: orders each snippet's content into token strings.

use async_trait::async_trait;

use crate::models::SnippetMap;
use crate::transform::segment::tokenize_words;

use super::{AnnotationError, AnnotationStats, Annotator};

/// Fills `Snippet::tokens` with the rule-based word tokenization of the
/// snippet's content.
pub struct TokenAnnotator;

#[async_trait]
impl Annotator for TokenAnnotator {
    fn annotation_type(&self) -> &str {
        "tokens"
    }

    fn display_name(&self) -> &str {
        "Token annotation"
    }

    async fn annotate(&self, corpus: &mut SnippetMap) -> Result<AnnotationStats, AnnotationError> {
        let mut stats = AnnotationStats::default();
        for snippet in corpus.values_mut() {
            if snippet.tokens.is_some() {
                stats.skipped += 1;
                continue;
            }
            snippet.tokens = Some(tokenize_words(&snippet.content));
            stats.annotated += 1;
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Snippet, SnippetId};

    fn corpus_of(contents: &[&str]) -> SnippetMap {
        contents
            .iter()
            .enumerate()
            .map(|(i, content)| {
                let snippet =
                    Snippet::new(1, i as u32, "https://example.org".into(), (*content).into());
                (snippet.id(), snippet)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_tokens_filled_in_order() {
        let mut corpus = corpus_of(&["Hello, world.", ""]);
        let stats = TokenAnnotator.annotate(&mut corpus).await.unwrap();
        assert_eq!(stats.annotated, 2);
        assert_eq!(
            corpus[&SnippetId::new(1, 0)].tokens.as_deref().unwrap(),
            ["Hello", ",", "world", "."]
        );
        // empty content still gets an (empty) token list, not an absent field
        assert_eq!(corpus[&SnippetId::new(1, 1)].tokens.as_deref().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_rerun_skips_and_preserves() {
        let mut corpus = corpus_of(&["Some text."]);
        TokenAnnotator.annotate(&mut corpus).await.unwrap();
        let before = corpus[&SnippetId::new(1, 0)].tokens.clone();
        let stats = TokenAnnotator.annotate(&mut corpus).await.unwrap();
        assert_eq!(stats.skipped, 1);
        assert_eq!(corpus[&SnippetId::new(1, 0)].tokens, before);
    }

    #[tokio::test]
    async fn test_does_not_touch_other_annotations() {
        let mut corpus = corpus_of(&["Some text."]);
        corpus
            .get_mut(&SnippetId::new(1, 0))
            .unwrap()
            .citations = Some(vec!["[1]".to_string()]);
        TokenAnnotator.annotate(&mut corpus).await.unwrap();
        let snippet = &corpus[&SnippetId::new(1, 0)];
        assert!(snippet.tokens.is_some());
        assert_eq!(snippet.citations.as_deref().unwrap(), ["[1]"]);
        assert!(snippet.concepts.is_none());
    }
}
