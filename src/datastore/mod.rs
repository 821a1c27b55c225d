//! Flat-file datastore for the DISCERN corpus.
//!
//! Raw inputs live under a fixed layout relative to the data root:
//!
//! ```text
//! data/html_articles/*.html   one article per file, id = filename stem
//! data/target_ids.csv         entity ids in scope
//! data/urls.csv               entity_id,url
//! data/responses.csv          survey rows (entity_id, uid, questionID, answer)
//! data/transformed_data/      timestamped snapshot output
//! ```
//!
//! Snapshots are JSON, named `{timestamp}[_{tag}].json`; the timestamp
//! prefix makes lexicographic filename order temporal, so most-recent
//! lookup is a sort.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{pivot_responses, Entity, EntityMap, ResponseRecord};
use crate::transform::Transformed;

const ARTICLES_DIR: &str = "data/html_articles";
const TARGET_IDS_FILE: &str = "data/target_ids.csv";
const URLS_FILE: &str = "data/urls.csv";
const RESPONSES_FILE: &str = "data/responses.csv";
const SNAPSHOT_DIR: &str = "data/transformed_data";

#[derive(Debug, Error)]
pub enum DatastoreError {
    #[error("data path does not exist: {0}")]
    MissingRoot(PathBuf),
    #[error("no snapshots found in {0}")]
    NoSnapshots(PathBuf),
    #[error("article filename is not a numeric entity id: {0}")]
    BadArticleFilename(PathBuf),
    #[error("malformed csv {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

type Result<T> = std::result::Result<T, DatastoreError>;

/// Loads raw tables and manages transformed-data snapshots.
#[derive(Debug)]
pub struct Datastore {
    root: PathBuf,
}

#[derive(Debug, Deserialize)]
struct TargetIdRow {
    entity_id: i64,
}

#[derive(Debug, Deserialize)]
struct UrlRow {
    entity_id: i64,
    url: String,
}

impl Datastore {
    /// Open a datastore rooted at `data_path` (with `~` expansion).
    /// Errors when the directory does not exist; this is a one-shot
    /// offline tool and never creates its own input layout.
    pub fn open(data_path: &str) -> Result<Self> {
        let expanded = shellexpand::tilde(data_path);
        let root = PathBuf::from(expanded.as_ref());
        if !root.is_dir() {
            return Err(DatastoreError::MissingRoot(root));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load raw articles, join urls and survey responses, and build the
    /// initial snippet-less entity corpus keyed by entity id.
    pub fn build_corpus(&self) -> Result<EntityMap> {
        let mut entities = self.load_articles()?;
        let responses = self.load_responses()?;

        info!("building data dicts for {} entities", entities.len());
        let mut by_entity: BTreeMap<i64, Vec<&ResponseRecord>> = BTreeMap::new();
        for record in &responses {
            by_entity.entry(record.entity_id).or_default().push(record);
        }
        for (id, entity) in entities.iter_mut() {
            if let Some(records) = by_entity.get(id) {
                entity.responses = pivot_responses(records.iter().copied());
            }
        }
        Ok(entities)
    }

    /// Load articles from `data/html_articles`, keeping only those
    /// listed in `target_ids.csv`, with urls joined from `urls.csv`.
    pub fn load_articles(&self) -> Result<EntityMap> {
        info!("loading articles");
        let articles_dir = self.root.join(ARTICLES_DIR);

        let mut contents: BTreeMap<i64, String> = BTreeMap::new();
        if articles_dir.is_dir() {
            for entry in fs::read_dir(&articles_dir)? {
                let path = entry?.path();
                if !path.is_file() {
                    continue;
                }
                let entity_id = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .and_then(|stem| stem.split('.').next())
                    .and_then(|stem| stem.parse::<i64>().ok())
                    .ok_or_else(|| DatastoreError::BadArticleFilename(path.clone()))?;
                contents.insert(entity_id, fs::read_to_string(&path)?);
            }
        }
        if contents.is_empty() {
            warn!("no article files found at {}", articles_dir.display());
        }

        let target_ids: HashSet<i64> = self
            .read_csv::<TargetIdRow>(&self.root.join(TARGET_IDS_FILE))?
            .into_iter()
            .map(|row| row.entity_id)
            .collect();
        let urls: BTreeMap<i64, String> = self
            .read_csv::<UrlRow>(&self.root.join(URLS_FILE))?
            .into_iter()
            .map(|row| (row.entity_id, row.url))
            .collect();

        // Inner join: articles must be targeted and have a known url.
        let entities: EntityMap = contents
            .into_iter()
            .filter(|(id, _)| target_ids.contains(id))
            .filter_map(|(id, content)| {
                let url = urls.get(&id)?.clone();
                Some((id, Entity::new(id, url, content)))
            })
            .collect();

        info!("{} articles loaded", entities.len());
        Ok(entities)
    }

    /// Load survey rows from `responses.csv`.
    pub fn load_responses(&self) -> Result<Vec<ResponseRecord>> {
        info!("loading responses");
        let records = self.read_csv::<ResponseRecord>(&self.root.join(RESPONSES_FILE))?;
        info!("{} responses loaded", records.len());
        Ok(records)
    }

    fn read_csv<T: for<'de> Deserialize<'de>>(&self, path: &Path) -> Result<Vec<T>> {
        let mut reader = csv::Reader::from_path(path).map_err(|source| DatastoreError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        reader
            .deserialize()
            .collect::<std::result::Result<Vec<T>, _>>()
            .map_err(|source| DatastoreError::Csv {
                path: path.to_path_buf(),
                source,
            })
    }

    // -----------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------

    /// Filename for a new snapshot: timestamp plus optional tag.
    pub fn snapshot_filename(tag: Option<&str>) -> String {
        let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
        match tag {
            Some(tag) => format!("{}_{}", timestamp, tag),
            None => timestamp.to_string(),
        }
    }

    /// Write a transformed corpus as a new timestamped snapshot.
    /// Returns the path written. Snapshots are immutable; every run
    /// produces a new file.
    pub fn save_snapshot(&self, data: &Transformed, tag: Option<&str>) -> Result<PathBuf> {
        let dir = self.root.join(SNAPSHOT_DIR);
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.json", Self::snapshot_filename(tag)));
        fs::write(&path, serde_json::to_vec_pretty(data)?)?;
        info!("saved snapshot to {}", path.display());
        Ok(path)
    }

    /// Load a snapshot by name, with or without the `.json` extension.
    pub fn load_snapshot(&self, name: &str) -> Result<Transformed> {
        let filename = if name.ends_with(".json") {
            name.to_string()
        } else {
            format!("{}.json", name)
        };
        let path = self.root.join(SNAPSHOT_DIR).join(filename);
        let bytes = fs::read(&path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Names of all snapshots, in ascending filename (= temporal) order.
    pub fn list_snapshots(&self) -> Result<Vec<String>> {
        let dir = self.root.join(SNAPSHOT_DIR);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names: Vec<String> = fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.ends_with(".json"))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Load the snapshot with the latest timestamp.
    pub fn load_most_recent_snapshot(&self) -> Result<(String, Transformed)> {
        let names = self.list_snapshots()?;
        let chosen = names
            .into_iter()
            .next_back()
            .ok_or_else(|| DatastoreError::NoSnapshots(self.root.join(SNAPSHOT_DIR)))?;
        info!("loading {}", chosen);
        let data = self.load_snapshot(&chosen)?;
        Ok((chosen, data))
    }
}
