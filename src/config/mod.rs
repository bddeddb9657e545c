//! Configuration management for the node loader

pub mod file;

use std::path::{Path, PathBuf};

use crate::nodes::{DisplayNameOverrides, ScanOptions};
use crate::Result;

use file::NodesConfigFile;

/// Default package root, relative to the working directory
const DEFAULT_ROOT: &str = "service";

/// Node loader configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Package root to scan
    pub root_dir: PathBuf,

    /// User display-name overrides file
    pub overrides_file: Option<PathBuf>,

    /// Layer user overrides on top of the bundled labels
    pub bundled_overrides: bool,

    /// Front-end assets directory exported as `WEB_DIRECTORY`
    pub web_dir: Option<PathBuf>,

    /// Scan options
    pub scan: ScanOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from(DEFAULT_ROOT),
            overrides_file: None,
            bundled_overrides: true,
            web_dir: None,
            scan: ScanOptions::default(),
        }
    }
}

impl Config {
    /// Load configuration: defaults, then config file, then environment
    ///
    /// An explicit `path` must exist and parse; the standard location is
    /// optional.
    ///
    /// # Errors
    ///
    /// Returns error if an explicit config file cannot be loaded
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => file::load_config_file_from(path)?,
            None => file::load_config_file(),
        };
        Ok(Self::from_sources(file, |key| std::env::var(key).ok()))
    }

    /// Build configuration from a parsed file and an environment lookup
    ///
    /// Environment variables:
    /// - `LUY_NODES_ROOT` - package root
    /// - `LUY_NODES_OVERRIDES` - display-name overrides file
    /// - `LUY_NODES_WEB_DIR` - front-end assets directory
    /// - `LUY_NODES_LABEL_PREFIX` - generated label prefix
    #[must_use]
    pub fn from_sources(file: NodesConfigFile, env: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let scan_file = file.scan;

        let scan = ScanOptions {
            scan_tag: scan_file.scan_tag.unwrap_or(defaults.scan.scan_tag),
            package: scan_file.package.unwrap_or(defaults.scan.package),
            extension: scan_file
                .extension
                .map(|e| e.trim_start_matches('.').to_string())
                .unwrap_or(defaults.scan.extension),
            label_prefix: env("LUY_NODES_LABEL_PREFIX")
                .or(scan_file.label_prefix)
                .unwrap_or(defaults.scan.label_prefix),
            max_file_bytes: scan_file.max_file_bytes.unwrap_or(defaults.scan.max_file_bytes),
        };

        Self {
            root_dir: env("LUY_NODES_ROOT")
                .map(PathBuf::from)
                .or(scan_file.root)
                .unwrap_or(defaults.root_dir),
            overrides_file: env("LUY_NODES_OVERRIDES")
                .map(PathBuf::from)
                .or(file.display_names.file),
            bundled_overrides: file.display_names.bundled.unwrap_or(defaults.bundled_overrides),
            web_dir: env("LUY_NODES_WEB_DIR")
                .map(PathBuf::from)
                .or(file.host.web_dir),
            scan,
        }
    }

    /// Build the display-name overrides this configuration asks for
    ///
    /// # Errors
    ///
    /// Returns error if the overrides file cannot be read or parsed
    pub fn overrides(&self) -> Result<DisplayNameOverrides> {
        let mut overrides = if self.bundled_overrides {
            DisplayNameOverrides::bundled()
        } else {
            DisplayNameOverrides::new()
        };

        if let Some(path) = &self.overrides_file {
            overrides.merge(DisplayNameOverrides::from_file(path)?);
        }

        tracing::debug!(count = overrides.len(), "display-name overrides ready");
        Ok(overrides)
    }
}
