//! Entity model — one source health article with its survey responses.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Responses;

/// Corpus of raw entities, keyed by entity id.
///
/// A `BTreeMap` keeps iteration (and therefore sampling and snapshot
/// output) ordered by id.
pub type EntityMap = BTreeMap<i64, Entity>;

/// One source article, as loaded from the raw data directory.
///
/// Entities are read-only inputs: the transformer derives snippets from
/// them but never mutates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Numeric id, taken from the article's filename stem.
    pub entity_id: i64,
    /// URL the article was originally retrieved from.
    pub url: String,
    /// Raw HTML content of the article.
    pub content: String,
    /// Survey responses pivoted to questionID x rater, median-aggregated.
    #[serde(default)]
    pub responses: Responses,
}

impl Entity {
    pub fn new(entity_id: i64, url: String, content: String) -> Self {
        Self {
            entity_id,
            url,
            content,
            responses: Responses::new(),
        }
    }
}
