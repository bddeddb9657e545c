//! Node module discovery - walk a package root for candidate module files

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Prefix that marks a file as private to the package
const RESERVED_PREFIX: &str = "__";

/// A candidate node module file found during a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginSource {
    /// Path to the module file
    pub path: PathBuf,
    /// Unique module identifier for this scan (e.g. `luy_scan.imagetools.ImageEditNode`)
    pub module_id: String,
    /// Package the module's relative imports resolve against
    pub package: String,
}

/// Recursively collect candidate module files under `root`
///
/// Depth-first; entries of each directory are visited in file-name order.
/// Files whose name starts with `__` or that do not carry `extension` are
/// skipped. Symlinked directories are not followed.
#[must_use]
pub fn discover_sources(root: &Path, extension: &str) -> Vec<PathBuf> {
    let mut found = Vec::new();
    walk(root, extension, &mut found);
    found
}

fn walk(dir: &Path, extension: &str, found: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(path = %dir.display(), error = %e, "failed to read node directory");
            return;
        }
    };

    let mut entries: Vec<_> = entries.flatten().collect();
    entries.sort_by_key(std::fs::DirEntry::file_name);

    for entry in entries {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            walk(&path, extension, found);
        } else if file_type.is_file() && is_candidate(&path, extension) {
            tracing::debug!(path = %path.display(), "discovered node module");
            found.push(path);
        }
    }
}

fn is_candidate(path: &Path, extension: &str) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    !name.starts_with(RESERVED_PREFIX)
        && path.extension().and_then(|e| e.to_str()) == Some(extension)
}

/// Allocates module identifiers that stay unique for the lifetime of a scan
///
/// The same path always maps to the same identifier. Two paths that sanitise
/// to the same dotted name get numeric suffixes in allocation order.
#[derive(Debug)]
pub struct ModuleIds {
    scan_tag: String,
    by_path: HashMap<PathBuf, String>,
    taken: HashSet<String>,
}

impl ModuleIds {
    /// Create an allocator for identifiers prefixed with `scan_tag`
    #[must_use]
    pub fn new(scan_tag: &str) -> Self {
        Self {
            scan_tag: scan_tag.to_string(),
            by_path: HashMap::new(),
            taken: HashSet::new(),
        }
    }

    /// Identifier for the module file at `path` under `root`
    pub fn assign(&mut self, root: &Path, path: &Path) -> String {
        if let Some(id) = self.by_path.get(path) {
            return id.clone();
        }

        let base = self.dotted_name(root, path);
        let mut id = base.clone();
        let mut suffix = 2;
        while self.taken.contains(&id) {
            id = format!("{base}_{suffix}");
            suffix += 1;
        }

        if id != base {
            tracing::debug!(
                path = %path.display(),
                module = %id,
                "module identifier already taken, renamed"
            );
        }

        self.taken.insert(id.clone());
        self.by_path.insert(path.to_path_buf(), id.clone());
        id
    }

    fn dotted_name(&self, root: &Path, path: &Path) -> String {
        let relative = path.strip_prefix(root).unwrap_or(path);
        let mut parts = vec![self.scan_tag.clone()];

        if let Some(parent) = relative.parent() {
            parts.extend(
                parent
                    .components()
                    .map(|c| sanitize(&c.as_os_str().to_string_lossy())),
            );
        }

        let stem = relative
            .file_stem()
            .map_or_else(|| "module".to_string(), |s| sanitize(&s.to_string_lossy()));
        parts.push(stem);

        parts.retain(|p| !p.is_empty());
        parts.join(".")
    }
}

/// Replace anything that is not an identifier character with `_`
fn sanitize(component: &str) -> String {
    let mut out: String = component
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}
