//! Display-name overrides

use std::collections::HashMap;
use std::path::Path;

use crate::{Error, Result};

/// Labels shipped with the node pack (lowest precedence)
const BUNDLED_DISPLAY_NAMES: &str = include_str!("../../assets/display_names.toml");

/// Preferred display labels keyed by node name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayNameOverrides {
    labels: HashMap<String, String>,
}

impl DisplayNameOverrides {
    /// Create an empty override set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Labels bundled with the node pack
    #[must_use]
    pub fn bundled() -> Self {
        match toml::from_str::<HashMap<String, String>>(BUNDLED_DISPLAY_NAMES) {
            Ok(labels) => Self { labels },
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse bundled display names");
                Self::default()
            }
        }
    }

    /// Load overrides from a flat key/value file
    ///
    /// `.json` files are read as a JSON object, anything else as a TOML table.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let labels = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") | None => toml::from_str(&content)?,
            Some(other) => {
                return Err(Error::Config(format!(
                    "unsupported display-name file format `.{other}`: {}",
                    path.display()
                )));
            }
        };

        tracing::debug!(path = %path.display(), "loaded display-name overrides");
        Ok(Self { labels })
    }

    /// Layer `other` on top of these overrides
    pub fn merge(&mut self, other: Self) {
        self.labels.extend(other.labels);
    }

    /// Override for `name`, if any
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }

    /// Label for `name`: the override, else `prefix` + `name`
    #[must_use]
    pub fn label_for(&self, name: &str, prefix: &str) -> String {
        self.get(name)
            .map_or_else(|| format!("{prefix}{name}"), ToString::to_string)
    }

    /// Number of overrides
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether there are no overrides
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl From<HashMap<String, String>> for DisplayNameOverrides {
    fn from(labels: HashMap<String, String>) -> Self {
        Self { labels }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DisplayNameOverrides {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            labels: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
