//! Annotation passes over a transformed snippet corpus.
//!
//! Each annotator fills exactly one typed field on `Snippet` and never
//! touches fields belonging to other annotators, so passes compose in
//! any order and re-running one is harmless. Snippets are visited in
//! key order (entity id, then sub id).

mod annotator;
mod citations;
mod metamap;
mod ner;
mod tokens;

pub use annotator::{AnnotationError, AnnotationStats, Annotator};
pub use citations::{find_inline_citations, CitationAnnotator};
pub use metamap::{ConceptAnnotator, MetaMapClient, MetaMapConfig};
pub use ner::{NerAnnotator, NerClient, NerConfig};
pub use tokens::TokenAnnotator;
