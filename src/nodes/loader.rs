//! Node discovery and registration
//!
//! Walks a package root, loads every candidate module in its own error
//! boundary and registers each class that satisfies [`NodeShape`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::class::{NodeClass, NodeShape};
use super::module::{ModuleError, ModuleLoader};
use super::overrides::DisplayNameOverrides;
use super::registry::NodeRegistry;
use super::source::{PluginSource, discover_sources};
use crate::{Error, Result};

/// Prefix for generated display labels
pub const DEFAULT_LABEL_PREFIX: &str = "Luy-";

/// Tag prefixed to every module identifier
pub const DEFAULT_SCAN_TAG: &str = "luy_scan";

/// Package relative imports resolve against
pub const DEFAULT_PACKAGE: &str = "luy_nodes";

/// Node module file extension
pub const DEFAULT_EXTENSION: &str = "json";

/// Largest module file the loader will read
pub const DEFAULT_MAX_FILE_BYTES: u64 = 1024 * 1024;

/// Knobs for a discovery scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Prefix for module identifiers
    pub scan_tag: String,
    /// Package name stamped on loaded modules
    pub package: String,
    /// Candidate file extension, without the dot
    pub extension: String,
    /// Prefix for generated display labels
    pub label_prefix: String,
    /// Per-file size limit
    pub max_file_bytes: u64,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            scan_tag: DEFAULT_SCAN_TAG.to_string(),
            package: DEFAULT_PACKAGE.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            label_prefix: DEFAULT_LABEL_PREFIX.to_string(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

/// A candidate file that failed to load
#[derive(Debug)]
pub struct LoadError {
    /// The file that failed
    pub source: PluginSource,
    /// Why it failed
    pub error: ModuleError,
}

/// Two different classes registered under the same name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationCollision {
    /// Registry key
    pub name: String,
    /// Module tag of the displaced class
    pub displaced_module: Option<String>,
    /// File of the displaced class
    pub displaced_source: PathBuf,
    /// Module that now owns the key
    pub module: String,
}

/// Diagnostics gathered during a scan
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Root that was scanned
    pub root: PathBuf,
    /// Whether the root did not exist
    pub root_missing: bool,
    /// Candidate files found
    pub candidates: usize,
    /// Candidate files that loaded
    pub loaded: usize,
    /// Candidate files that failed
    pub load_errors: Vec<LoadError>,
    /// Names claimed by more than one class
    pub collisions: Vec<RegistrationCollision>,
}

impl ScanReport {
    /// Number of candidate files that failed
    #[must_use]
    pub fn failed(&self) -> usize {
        self.load_errors.len()
    }
}

/// Result of a discovery scan
#[derive(Debug, Default)]
pub struct Discovery {
    /// Registered nodes
    pub registry: NodeRegistry,
    /// What happened along the way
    pub report: ScanReport,
}

/// Scan `root` with default options and register every node found
///
/// Per-file problems never fail the scan; they are logged and recorded on
/// the returned report. A missing root yields an empty registry.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if `root` is empty or is not a directory
pub fn discover_and_register(root: &Path, overrides: &DisplayNameOverrides) -> Result<Discovery> {
    NodeLoader::new(ScanOptions::default(), overrides.clone()).scan(root)
}

/// Discovers node modules and builds registries
#[derive(Debug, Clone, Default)]
pub struct NodeLoader {
    options: ScanOptions,
    overrides: DisplayNameOverrides,
}

impl NodeLoader {
    /// Create a loader
    #[must_use]
    pub const fn new(options: ScanOptions, overrides: DisplayNameOverrides) -> Self {
        Self { options, overrides }
    }

    /// Scan options in use
    #[must_use]
    pub const fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Run a full scan of `root`
    ///
    /// Every call starts from an empty registry and module cache, so calling
    /// it again re-scans from scratch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `root` is empty or is not a directory
    pub fn scan(&self, root: &Path) -> Result<Discovery> {
        if root.as_os_str().is_empty() {
            return Err(Error::InvalidArgument("scan root is empty".to_string()));
        }

        let mut discovery = Discovery::default();
        discovery.report.root = root.to_path_buf();

        if !root.exists() {
            tracing::warn!(path = %root.display(), "node directory does not exist, no nodes registered");
            discovery.report.root_missing = true;
            return Ok(discovery);
        }

        if !root.is_dir() {
            return Err(Error::InvalidArgument(format!(
                "scan root is not a directory: {}",
                root.display()
            )));
        }

        let root = root.canonicalize()?;
        let paths = discover_sources(&root, &self.options.extension);
        discovery.report.candidates = paths.len();

        let mut modules = ModuleLoader::new(&root, &self.options);

        for path in paths {
            let source = PluginSource {
                module_id: modules.module_id(&path),
                package: modules.package().to_string(),
                path,
            };

            match modules.load(&source.path) {
                Ok(module) => {
                    discovery.report.loaded += 1;
                    let mut registered = 0;
                    for class in module.classes().filter(|class| class.is_node()) {
                        self.promote(class, &source, &mut discovery);
                        registered += 1;
                    }

                    tracing::info!(
                        path = %source.path.display(),
                        module = %source.module_id,
                        nodes = registered,
                        "loaded node module"
                    );
                }
                Err(error) => {
                    tracing::warn!(
                        path = %source.path.display(),
                        module = %source.module_id,
                        error = %error,
                        "failed to load node module"
                    );
                    discovery.report.load_errors.push(LoadError { source, error });
                }
            }
        }

        let report = &discovery.report;
        tracing::info!(
            root = %report.root.display(),
            candidates = report.candidates,
            loaded = report.loaded,
            failed = report.failed(),
            collisions = report.collisions.len(),
            nodes = discovery.registry.len(),
            "node discovery finished"
        );
        tracing::info!(
            nodes = ?discovery.registry.names().collect::<Vec<_>>(),
            "registered nodes"
        );

        Ok(discovery)
    }

    fn promote(&self, class: &Arc<NodeClass>, source: &PluginSource, discovery: &mut Discovery) {
        let name = class.name();
        class.stamp_module_tag(&source.module_id);

        let label = self.overrides.label_for(name, &self.options.label_prefix);
        let Some(displaced) = discovery.registry.register(Arc::clone(class), label) else {
            tracing::debug!(node = %name, module = %source.module_id, "registered node");
            return;
        };

        if displaced.id() == class.id() {
            return;
        }

        let collision = RegistrationCollision {
            name: name.to_string(),
            displaced_module: displaced.module_tag().map(ToString::to_string),
            displaced_source: displaced.source().to_path_buf(),
            module: source.module_id.clone(),
        };
        tracing::warn!(
            node = %name,
            displaced = collision.displaced_module.as_deref().unwrap_or("<untagged>"),
            module = %collision.module,
            "node name already registered, later module wins"
        );
        discovery.report.collisions.push(collision);
    }
}
