//! TOML configuration file loading
//!
//! Supports `~/.config/luy/nodes/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodesConfigFile {
    /// Discovery scan configuration
    #[serde(default)]
    pub scan: ScanFileConfig,

    /// Display-name configuration
    #[serde(default)]
    pub display_names: DisplayNamesFileConfig,

    /// Host export configuration
    #[serde(default)]
    pub host: HostFileConfig,
}

/// Discovery scan configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanFileConfig {
    /// Package root to scan
    pub root: Option<PathBuf>,

    /// Node module file extension (e.g. "json")
    pub extension: Option<String>,

    /// Prefix for module identifiers
    pub scan_tag: Option<String>,

    /// Package name relative imports resolve against
    pub package: Option<String>,

    /// Prefix for generated display labels (e.g. "Luy-")
    pub label_prefix: Option<String>,

    /// Per-file size limit in bytes
    pub max_file_bytes: Option<u64>,
}

/// Display-name configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DisplayNamesFileConfig {
    /// Overrides file (TOML table or JSON object)
    pub file: Option<PathBuf>,

    /// Use the labels bundled with the node pack
    pub bundled: Option<bool>,
}

/// Host export configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostFileConfig {
    /// Front-end assets directory exported as `WEB_DIRECTORY`
    pub web_dir: Option<PathBuf>,
}

/// Load the TOML config file from the standard path
///
/// Returns `NodesConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> NodesConfigFile {
    let Some(path) = config_file_path() else {
        return NodesConfigFile::default();
    };

    if !path.exists() {
        return NodesConfigFile::default();
    }

    match load_config_file_from(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            NodesConfigFile::default()
        }
    }
}

/// Load a config file from an explicit path
///
/// # Errors
///
/// Returns error if the file cannot be read or parsed
pub fn load_config_file_from(path: &Path) -> Result<NodesConfigFile> {
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    tracing::info!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Return the config file path: `~/.config/luy/nodes/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("luy").join("nodes").join("config.toml"))
}
