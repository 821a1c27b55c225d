//! Snippet model — one segmented unit of an entity's text.
//!
//! Snippets carry named optional annotation fields rather than an
//! open-ended map, so a missing annotation is a `None` at compile time
//! instead of a runtime missing-key error. Each annotator fills exactly
//! one field and never touches the others.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Composite snippet key: `entity_id-sub_id`.
///
/// Orders by entity id then sub id, which makes snippet map iteration
/// follow document order within each entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnippetId {
    pub entity_id: i64,
    pub sub_id: u32,
}

impl SnippetId {
    pub fn new(entity_id: i64, sub_id: u32) -> Self {
        Self { entity_id, sub_id }
    }
}

impl fmt::Display for SnippetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.entity_id, self.sub_id)
    }
}

impl FromStr for SnippetId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (entity, sub) = s
            .rsplit_once('-')
            .ok_or_else(|| format!("invalid snippet id: {}", s))?;
        let entity_id = entity
            .parse()
            .map_err(|_| format!("invalid entity id in snippet id: {}", s))?;
        let sub_id = sub
            .parse()
            .map_err(|_| format!("invalid sub id in snippet id: {}", s))?;
        Ok(Self { entity_id, sub_id })
    }
}

// Snapshots are JSON objects keyed by snippet id, so the key serializes
// as its string form.
impl Serialize for SnippetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SnippetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Flat snippet corpus, keyed by composite id.
pub type SnippetMap = BTreeMap<SnippetId, Snippet>;

/// Whether a link's domain matches the parent article's domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    Internal,
    External,
}

/// A medical concept matched by the external concept-extraction service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    /// Identifier of the snippet the match came from, as echoed by the service.
    pub index: String,
    /// Match confidence score.
    pub score: f64,
    /// Preferred concept name in the source vocabulary.
    pub preferred_name: String,
    /// Concept unique identifier.
    pub cui: String,
    /// Semantic type abbreviations.
    pub semtypes: Vec<String>,
    /// The text span that triggered the match.
    pub trigger: String,
    /// Character positions of the trigger within the snippet.
    pub pos_info: String,
    /// Taxonomy tree codes, when the vocabulary provides them.
    #[serde(default)]
    pub tree_codes: Vec<String>,
}

/// A named-entity span tagged by the external NER model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NerSpan {
    pub text: String,
    pub label: String,
}

/// One segmented unit (word, sentence, or paragraph) of an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snippet {
    pub entity_id: i64,
    /// 0-based segment index within the entity, in document order.
    pub sub_id: u32,
    /// Parent entity's URL, carried along for link classification.
    pub url: String,
    /// Segment text, cleaned of HTML.
    pub content: String,
    /// Names of the HTML tags that wrapped this segment before stripping.
    #[serde(default)]
    pub html_tags: Vec<String>,
    /// Domains of links found in this segment.
    #[serde(default)]
    pub domains: Vec<String>,
    /// Classification of each entry in `domains` against the parent URL.
    #[serde(default)]
    pub link_type: Vec<LinkType>,
    /// Ordered token strings, set by the token annotator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Vec<String>>,
    /// Concept matches, set by the concept annotator. `Some(vec![])`
    /// means the service ran and found nothing; `None` means it has not
    /// run (or failed) for this snippet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concepts: Option<Vec<Concept>>,
    /// Named-entity spans, set by the NER annotator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<NerSpan>>,
    /// Inline citation strings, set by the citation annotator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<String>>,
}

impl Snippet {
    pub fn new(entity_id: i64, sub_id: u32, url: String, content: String) -> Self {
        Self {
            entity_id,
            sub_id,
            url,
            content,
            html_tags: Vec::new(),
            domains: Vec::new(),
            link_type: Vec::new(),
            tokens: None,
            concepts: None,
            entities: None,
            citations: None,
        }
    }

    pub fn id(&self) -> SnippetId {
        SnippetId::new(self.entity_id, self.sub_id)
    }
}
