//! Configuration for discernprep.
//!
//! Settings come from an optional `discernprep.toml`, with the data
//! directory and service endpoints overridable from the command line.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::annotators::{MetaMapConfig, NerConfig};

const CONFIG_FILENAME: &str = "discernprep.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Root of the corpus data directory layout.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Concept-extraction service.
    #[serde(default)]
    pub metamap: MetaMapConfig,
    /// Hosted NER model.
    #[serde(default)]
    pub ner: NerConfig,
}

fn default_data_dir() -> String {
    ".".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            metamap: MetaMapConfig::default(),
            ner: NerConfig::default(),
        }
    }
}

impl Settings {
    /// Load settings from an explicit config path, from
    /// `discernprep.toml` in the working directory, or defaults.
    pub fn load(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match config_path {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let local = PathBuf::from(CONFIG_FILENAME);
                local.is_file().then_some(local)
            }
        };

        match path {
            Some(path) => {
                debug!("loading config from {}", path.display());
                let raw = std::fs::read_to_string(&path)?;
                Ok(toml::from_str(&raw)?)
            }
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.data_dir, ".");
        assert!(settings.metamap.endpoint.starts_with("http://localhost"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            data_dir = "~/discern"

            [metamap]
            endpoint = "http://mm-host:9999"
            "#,
        )
        .unwrap();
        assert_eq!(settings.data_dir, "~/discern");
        assert_eq!(settings.metamap.endpoint, "http://mm-host:9999");
        // unspecified sections and fields keep their defaults
        assert_eq!(settings.metamap.batch_size, 50);
        assert!(settings.ner.endpoint.starts_with("http://localhost"));
    }
}
