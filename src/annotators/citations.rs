//! Inline citation detection.
//!
//! Finds author-year citations (`(Frood, 1942)`, `(Frood et al., 1942)`,
//! `(Frood, 1942; Dent, 1944)`), lone years in parens or brackets, and
//! numeric bracket references (`[1]`, `[1,2]`, `[1-3]`). Pure regex, no
//! external service.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::models::SnippetMap;

use super::{AnnotationError, AnnotationStats, Annotator};

// Author-year: opens with a letter, has a comma before a 19xx/20xx year.
static PAREN_AUTHOR_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([A-Za-z][^()]*,\s*(?:19|20)\d{2}[^()]*\)").unwrap());
static BRACKET_AUTHOR_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[A-Za-z][^\[\]]*,\s*(?:19|20)\d{2}[^\[\]]*\]").unwrap());
// Lone year: exactly one 19xx/20xx year. Other four-digit numbers are
// data, not citations.
static PAREN_YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\((?:19|20)\d{2}\)").unwrap());
static BRACKET_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(?:19|20)\d{2}\]").unwrap());
// Numeric references: 1-3 digit numbers, commas and ranges. Bare
// parenthesized numbers do not count.
static BRACKET_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\d{1,3}(?:\s*[,-]\s*\d{1,3})*\]").unwrap());

/// Find inline citations in document order.
pub fn find_inline_citations(text: &str) -> Vec<String> {
    let mut matches: Vec<(usize, &str)> = Vec::new();
    for regex in [
        &*PAREN_AUTHOR_YEAR,
        &*BRACKET_AUTHOR_YEAR,
        &*PAREN_YEAR,
        &*BRACKET_YEAR,
        &*BRACKET_NUMERIC,
    ] {
        for m in regex.find_iter(text) {
            matches.push((m.start(), m.as_str()));
        }
    }
    matches.sort_by_key(|(start, _)| *start);
    matches.dedup();
    matches.into_iter().map(|(_, s)| s.to_string()).collect()
}

/// Fills `Snippet::citations` with the inline citations found in each
/// snippet's content.
pub struct CitationAnnotator;

#[async_trait]
impl Annotator for CitationAnnotator {
    fn annotation_type(&self) -> &str {
        "citations"
    }

    fn display_name(&self) -> &str {
        "Inline citation detection"
    }

    async fn annotate(&self, corpus: &mut SnippetMap) -> Result<AnnotationStats, AnnotationError> {
        let mut stats = AnnotationStats::default();
        for snippet in corpus.values_mut() {
            if snippet.citations.is_some() {
                stats.skipped += 1;
                continue;
            }
            snippet.citations = Some(find_inline_citations(&snippet.content));
            stats.annotated += 1;
        }
        Ok(stats)
    }
}
