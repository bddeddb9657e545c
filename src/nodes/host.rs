//! Host-facing exports
//!
//! The host reads `NODE_CLASS_MAPPINGS`, `NODE_DISPLAY_NAME_MAPPINGS` and
//! `WEB_DIRECTORY`. The registry is installed into process-wide state once,
//! at startup, and is read-only from then on.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use super::class::{self, NodeClass, NodeShape};
use super::registry::NodeRegistry;
use crate::{Error, Result};

/// Registry exposed to the host
static HOST_REGISTRY: OnceLock<NodeRegistry> = OnceLock::new();

/// Install the process-wide registry
///
/// # Errors
///
/// Returns [`Error::RegistryInstalled`] if a registry was already installed
pub fn install(registry: NodeRegistry) -> Result<&'static NodeRegistry> {
    HOST_REGISTRY
        .set(registry)
        .map_err(|_| Error::RegistryInstalled)?;
    tracing::debug!("node registry installed");
    HOST_REGISTRY.get().ok_or(Error::RegistryInstalled)
}

/// The installed registry, if any
#[must_use]
pub fn installed() -> Option<&'static NodeRegistry> {
    HOST_REGISTRY.get()
}

/// `NODE_CLASS_MAPPINGS` of the installed registry
#[must_use]
pub fn node_class_mappings() -> Option<&'static IndexMap<String, Arc<NodeClass>>> {
    installed().map(NodeRegistry::class_mappings)
}

/// `NODE_DISPLAY_NAME_MAPPINGS` of the installed registry
#[must_use]
pub fn node_display_name_mappings() -> Option<&'static IndexMap<String, String>> {
    installed().map(NodeRegistry::display_name_mappings)
}

/// Serializable view of a registry for the host
#[derive(Debug, Serialize)]
pub struct HostManifest<'a> {
    #[serde(rename = "NODE_CLASS_MAPPINGS")]
    classes: IndexMap<&'a str, ClassEntry<'a>>,

    #[serde(rename = "NODE_DISPLAY_NAME_MAPPINGS")]
    display_names: &'a IndexMap<String, String>,

    #[serde(rename = "WEB_DIRECTORY", skip_serializing_if = "Option::is_none")]
    web_directory: Option<&'a Path>,

    generated_at: DateTime<Utc>,
}

/// Per-node entry in [`HostManifest`]
#[derive(Debug, Serialize)]
struct ClassEntry<'a> {
    module: Option<&'a str>,
    source: &'a Path,
    #[serde(rename = "INPUT_TYPES")]
    input_types: Option<&'a Value>,
    #[serde(rename = "RETURN_TYPES")]
    return_types: Option<&'a Value>,
    #[serde(rename = "RETURN_NAMES", skip_serializing_if = "Option::is_none")]
    return_names: Option<&'a Value>,
    #[serde(rename = "FUNCTION")]
    function: Option<&'a Value>,
    #[serde(rename = "CATEGORY", skip_serializing_if = "Option::is_none")]
    category: Option<&'a str>,
    #[serde(rename = "OUTPUT_NODE")]
    output_node: bool,
}

impl<'a> HostManifest<'a> {
    /// Build a manifest for `registry`
    #[must_use]
    pub fn new(registry: &'a NodeRegistry, web_directory: Option<&'a Path>) -> Self {
        let classes = registry
            .class_mappings()
            .iter()
            .map(|(name, class)| {
                let entry = ClassEntry {
                    module: class.module_tag(),
                    source: class.source(),
                    input_types: class.input_types(),
                    return_types: class.return_types(),
                    return_names: class.attribute(class::RETURN_NAMES),
                    function: class.entry_point(),
                    category: class.category(),
                    output_node: class.is_output_node(),
                };
                (name.as_str(), entry)
            })
            .collect();

        Self {
            classes,
            display_names: registry.display_name_mappings(),
            web_directory,
            generated_at: Utc::now(),
        }
    }

    /// Pretty-printed JSON
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails (e.g. a non UTF-8 path)
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the manifest to `path`, creating parent directories
    ///
    /// # Errors
    ///
    /// Returns error if serialization or writing fails
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json_pretty()?)?;
        tracing::info!(path = %path.display(), nodes = self.classes.len(), "wrote host manifest");
        Ok(())
    }
}
