#[cfg(feature = "serde")]
use std::path::Path;

#[cfg(feature = "serde")]
use anyhow::{Context as _, Result};
use log::debug;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_ELIDE_DOCUMENT_NAMES, DEFAULT_EVENT_CHANNEL_CAPACITY, DEFAULT_HISTORY_RETENTION,
};

/// Tunables of a session and the documents it opens.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// How many acknowledged operations each document keeps for rebasing
    /// stale submissions. `None` keeps all of them.
    #[cfg_attr(feature = "serde", serde(default = "default_history_retention"))]
    pub history_retention: Option<usize>,

    /// Number of events buffered per document before slow subscribers start
    /// missing them.
    #[cfg_attr(feature = "serde", serde(default = "default_event_channel_capacity"))]
    pub event_channel_capacity: usize,

    /// Omit the document name from consecutive messages about the same
    /// document. Both ends of the transport have to agree on this.
    #[cfg_attr(feature = "serde", serde(default = "default_elide_document_names"))]
    pub elide_document_names: bool,
}

#[allow(clippy::unnecessary_wraps)]
fn default_history_retention() -> Option<usize> {
    debug!("Using default history retention: {DEFAULT_HISTORY_RETENTION}");
    Some(DEFAULT_HISTORY_RETENTION)
}

fn default_event_channel_capacity() -> usize {
    debug!("Using default event channel capacity: {DEFAULT_EVENT_CHANNEL_CAPACITY}");
    DEFAULT_EVENT_CHANNEL_CAPACITY
}

fn default_elide_document_names() -> bool {
    debug!("Using default document name elision: {DEFAULT_ELIDE_DOCUMENT_NAMES}");
    DEFAULT_ELIDE_DOCUMENT_NAMES
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            history_retention: default_history_retention(),
            event_channel_capacity: default_event_channel_capacity(),
            elide_document_names: default_elide_document_names(),
        }
    }
}

#[cfg(feature = "serde")]
impl SyncConfig {
    /// # Errors
    ///
    /// Returns an error if the YAML cannot be parsed.
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents).context("Failed to parse configuration")
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).with_context(|| {
            format!(
                "Cannot load configuration from disk from {}",
                path.display()
            )
        })?;

        Self::from_yaml_str(&contents)
    }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = SyncConfig::from_yaml_str("elide_document_names: true\n").unwrap();

        assert_eq!(
            config,
            SyncConfig {
                history_retention: Some(DEFAULT_HISTORY_RETENTION),
                event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
                elide_document_names: true,
            }
        );
    }

    #[test]
    fn test_unbounded_history() {
        let config = SyncConfig::from_yaml_str("history_retention: null\n").unwrap();
        assert_eq!(config.history_retention, None);
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(SyncConfig::from_yaml_str("event_channel_capacity: lots\n").is_err());
    }

    #[test]
    fn test_missing_file() {
        let error = SyncConfig::load_from_file(Path::new("does/not/exist.yml")).unwrap_err();
        assert!(error.to_string().contains("Cannot load configuration"));
    }
}
