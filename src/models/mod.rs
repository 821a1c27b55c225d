//! Data models for the DISCERN corpus.

mod entity;
mod response;
mod snippet;

pub use entity::{Entity, EntityMap};
pub use response::{pivot_responses, ResponseRecord, Responses};
pub use snippet::{Concept, LinkType, NerSpan, Snippet, SnippetId, SnippetMap};
