//! Node module files and the per-scan module loader
//!
//! A node module is a JSON document with three optional sections:
//! `requires` (runtime prerequisites), `imports` (relative imports resolved
//! against the package root) and `attributes` (the module's top level:
//! classes, functions and constants).

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::class::NodeClass;
use super::loader::ScanOptions;
use super::source::ModuleIds;

/// On-disk node module schema
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleFile {
    /// Prerequisites checked before anything else is evaluated
    #[serde(default)]
    pub requires: Requirements,

    /// Imports, evaluated in order
    #[serde(default)]
    pub imports: Vec<ImportDef>,

    /// Top-level attributes keyed by name
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeDef>,
}

/// A single import statement
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportDef {
    /// Module path, e.g. `.common` or `.imagetools.base`
    pub from: String,

    /// Names to bind; empty binds the module itself
    #[serde(default)]
    pub names: Vec<String>,

    /// Bind empty placeholder classes instead of failing
    #[serde(default)]
    pub optional: bool,
}

/// A top-level attribute
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AttributeDef {
    /// Class definition
    Class(ClassDef),
    /// Function definition
    Function(FunctionDef),
    /// Plain value
    Constant(ConstantDef),
}

/// Class definition body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassDef {
    /// Base class name visible in the module namespace
    #[serde(default)]
    pub extends: Option<String>,

    /// Class-level attributes
    #[serde(default)]
    pub attrs: Map<String, Value>,
}

/// Function definition body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionDef {
    /// Parameter names
    #[serde(default)]
    pub params: Vec<String>,
}

/// Constant definition body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConstantDef {
    #[serde(default)]
    pub value: Value,
}

/// Runtime prerequisites of a module
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Requirements {
    /// Allowed operating systems (empty = any)
    #[serde(default)]
    pub os: Vec<String>,

    /// Binaries that must be on `PATH`
    #[serde(default)]
    pub bins: Vec<String>,

    /// Environment variables that must be set
    #[serde(default)]
    pub env: Vec<String>,
}

impl Requirements {
    /// Describe the first unmet requirement, if any
    #[must_use]
    pub fn unmet(&self) -> Option<String> {
        let current_os = std::env::consts::OS;
        if !self.os.is_empty() && !self.os.iter().any(|os| os == current_os) {
            return Some(format!("os `{current_os}` not in {:?}", self.os));
        }

        if let Some(bin) = self.bins.iter().find(|bin| which::which(bin).is_err()) {
            return Some(format!("binary `{bin}` not found on PATH"));
        }

        self.env
            .iter()
            .find(|var| std::env::var(var).is_err())
            .map(|var| format!("environment variable `{var}` not set"))
    }
}

/// Why a module failed to load
#[derive(Debug, Error)]
pub enum ModuleError {
    /// File could not be read
    #[error("failed to read module: {0}")]
    Read(#[from] std::io::Error),

    /// File exceeds the configured size limit
    #[error("module is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },

    /// File is not a valid node module
    #[error("failed to parse module: {0}")]
    Parse(#[from] serde_json::Error),

    /// A declared prerequisite is missing
    #[error("requirement not met: {0}")]
    Unmet(String),

    /// Import target does not exist or is not a relative import
    #[error("no module named `{0}`")]
    UnresolvedImport(String),

    /// Relative import climbs above the package root
    #[error("relative import `{0}` goes beyond the package root")]
    BeyondPackageRoot(String),

    /// Module imports itself, directly or transitively
    #[error("import cycle through `{0}`")]
    ImportCycle(String),

    /// Import target exists but failed to load
    #[error("import of `{module}` failed: {reason}")]
    ImportFailed { module: String, reason: String },

    /// Imported module does not define a requested name
    #[error("cannot import name `{name}` from `{module}`")]
    MissingName { name: String, module: String },

    /// Base class is not in the module namespace
    #[error("class `{class}` extends unknown base `{base}`")]
    UnknownBase { class: String, base: String },

    /// Base name is bound to something other than a class
    #[error("class `{class}` extends `{base}`, which is not a class")]
    NotAClass { class: String, base: String },

    /// Classes extend each other in a loop
    #[error("inheritance cycle through class `{0}`")]
    InheritanceCycle(String),

    /// Module already failed earlier in this scan (as an import)
    #[error("{0} (reported earlier)")]
    AlreadyFailed(String),
}

/// A name bound in a module namespace
#[derive(Debug, Clone)]
pub enum Binding {
    /// Class object
    Class(Arc<NodeClass>),
    /// Function
    Function { params: Vec<String> },
    /// Constant value
    Constant(Value),
    /// Imported module, by identifier
    Module(String),
}

/// A successfully loaded module
#[derive(Debug)]
pub struct LoadedModule {
    /// Module identifier
    pub id: String,
    /// Package relative imports resolved against
    pub package: String,
    /// Source file
    pub path: PathBuf,
    namespace: BTreeMap<String, Binding>,
}

impl LoadedModule {
    /// Look up a top-level name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.namespace.get(name)
    }

    /// Every top-level class binding, in name order, including re-exports
    pub fn classes(&self) -> impl Iterator<Item = &Arc<NodeClass>> {
        self.namespace.values().filter_map(|binding| match binding {
            Binding::Class(class) => Some(class),
            _ => None,
        })
    }

    /// Number of top-level names
    #[must_use]
    pub fn len(&self) -> usize {
        self.namespace.len()
    }

    /// Whether the module defines nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.namespace.is_empty()
    }
}

enum CacheEntry {
    Loading,
    Loaded(Arc<LoadedModule>),
    Failed(String),
}

/// Loads node modules for one scan
///
/// Holds the module cache: every file is evaluated at most once, and imports
/// of an already loaded file share its class objects.
pub struct ModuleLoader {
    root: PathBuf,
    package: String,
    extension: String,
    max_file_bytes: u64,
    ids: ModuleIds,
    cache: HashMap<PathBuf, CacheEntry>,
}

impl std::fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleLoader")
            .field("root", &self.root)
            .field("package", &self.package)
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl ModuleLoader {
    /// Create a loader for the package rooted at `root`
    #[must_use]
    pub fn new(root: &Path, options: &ScanOptions) -> Self {
        Self {
            root: root.to_path_buf(),
            package: options.package.clone(),
            extension: options.extension.clone(),
            max_file_bytes: options.max_file_bytes,
            ids: ModuleIds::new(&options.scan_tag),
            cache: HashMap::new(),
        }
    }

    /// Module identifier for a file under the package root
    pub fn module_id(&mut self, path: &Path) -> String {
        self.ids.assign(&self.root, path)
    }

    /// Package name stamped on every loaded module
    #[must_use]
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Load the module at `path`, reusing the cached result if present
    ///
    /// # Errors
    ///
    /// Returns the reason the module could not be loaded
    pub fn load(&mut self, path: &Path) -> Result<Arc<LoadedModule>, ModuleError> {
        match self.cache.get(path) {
            Some(CacheEntry::Loaded(module)) => return Ok(Arc::clone(module)),
            Some(CacheEntry::Loading) => {
                return Err(ModuleError::ImportCycle(self.ids.assign(&self.root, path)));
            }
            Some(CacheEntry::Failed(reason)) => {
                return Err(ModuleError::AlreadyFailed(reason.clone()));
            }
            None => {}
        }

        let id = self.ids.assign(&self.root, path);
        self.cache.insert(path.to_path_buf(), CacheEntry::Loading);

        let result = self.evaluate(path, &id);
        let entry = match &result {
            Ok(module) => CacheEntry::Loaded(Arc::clone(module)),
            Err(e) => CacheEntry::Failed(e.to_string()),
        };
        self.cache.insert(path.to_path_buf(), entry);

        result
    }

    fn evaluate(&mut self, path: &Path, id: &str) -> Result<Arc<LoadedModule>, ModuleError> {
        let size = std::fs::metadata(path)?.len();
        if size > self.max_file_bytes {
            return Err(ModuleError::TooLarge {
                size,
                limit: self.max_file_bytes,
            });
        }

        let content = std::fs::read_to_string(path)?;
        let file: ModuleFile = serde_json::from_str(&content)?;

        if let Some(unmet) = file.requires.unmet() {
            return Err(ModuleError::Unmet(unmet));
        }

        let mut namespace = BTreeMap::new();
        for import in &file.imports {
            self.bind_import(import, path, id, &mut namespace)?;
        }

        let mut class_defs = BTreeMap::new();
        for (name, attribute) in file.attributes {
            match attribute {
                AttributeDef::Class(def) => {
                    class_defs.insert(name, def);
                }
                AttributeDef::Function(def) => {
                    namespace.insert(name, Binding::Function { params: def.params });
                }
                AttributeDef::Constant(def) => {
                    namespace.insert(name, Binding::Constant(def.value));
                }
            }
        }

        let mut resolver = ClassResolver {
            defs: &class_defs,
            namespace: &namespace,
            module: id,
            source: path,
            done: BTreeMap::new(),
            visiting: HashSet::new(),
        };
        for name in class_defs.keys() {
            resolver.resolve(name)?;
        }
        let classes = resolver.done;

        namespace.extend(
            classes
                .into_iter()
                .map(|(name, class)| (name, Binding::Class(class))),
        );

        Ok(Arc::new(LoadedModule {
            id: id.to_string(),
            package: self.package.clone(),
            path: path.to_path_buf(),
            namespace,
        }))
    }

    fn bind_import(
        &mut self,
        import: &ImportDef,
        importer: &Path,
        importer_id: &str,
        namespace: &mut BTreeMap<String, Binding>,
    ) -> Result<(), ModuleError> {
        let bindings = self.import_bindings(import);

        match bindings {
            Ok(bindings) => namespace.extend(bindings),
            Err(e) if import.optional => {
                tracing::debug!(
                    module = %importer_id,
                    import = %import.from,
                    error = %e,
                    "optional import unavailable, binding placeholders"
                );
                for name in &import.names {
                    let placeholder = NodeClass::placeholder(name, importer_id, importer);
                    namespace.insert(name.clone(), Binding::Class(Arc::new(placeholder)));
                }
            }
            Err(e) => return Err(e),
        }

        Ok(())
    }

    fn import_bindings(&mut self, import: &ImportDef) -> Result<Vec<(String, Binding)>, ModuleError> {
        let target = self.resolve_import(&import.from)?;
        let module = self.load(&target).map_err(|e| match e {
            ModuleError::ImportCycle(_) => e,
            other => ModuleError::ImportFailed {
                module: import.from.clone(),
                reason: other.to_string(),
            },
        })?;

        if import.names.is_empty() {
            let alias = import.from.rsplit('.').next().unwrap_or(&import.from);
            return Ok(vec![(alias.to_string(), Binding::Module(module.id.clone()))]);
        }

        import
            .names
            .iter()
            .map(|name| {
                module
                    .get(name)
                    .cloned()
                    .map(|binding| (name.clone(), binding))
                    .ok_or_else(|| ModuleError::MissingName {
                        name: name.clone(),
                        module: import.from.clone(),
                    })
            })
            .collect()
    }

    /// Map an import path onto a file under the package root
    ///
    /// `.a.b` resolves to `<root>/a/b.<ext>`, or to `<root>/a/b/__init__.<ext>`
    /// when `a/b` is a package directory. Every dotted component must be a
    /// plain file name; anything that could leave the root is rejected.
    fn resolve_import(&self, target: &str) -> Result<PathBuf, ModuleError> {
        let dots = target.chars().take_while(|c| *c == '.').count();
        match dots {
            0 => return Err(ModuleError::UnresolvedImport(target.to_string())),
            1 => {}
            _ => return Err(ModuleError::BeyondPackageRoot(target.to_string())),
        }

        let rest = &target[dots..];
        if rest.is_empty() || rest.split('.').any(str::is_empty) {
            return Err(ModuleError::UnresolvedImport(target.to_string()));
        }
        if !rest.split('.').all(is_plain_component) {
            return Err(ModuleError::BeyondPackageRoot(target.to_string()));
        }

        let mut base = self.root.clone();
        base.extend(rest.split('.'));
        if !base.starts_with(&self.root) {
            return Err(ModuleError::BeyondPackageRoot(target.to_string()));
        }

        let mut file = base.clone();
        file.set_extension(&self.extension);
        if file.is_file() {
            return Ok(file);
        }

        let init = base.join(format!("__init__.{}", self.extension));
        if base.is_dir() && init.is_file() {
            return Ok(init);
        }

        Err(ModuleError::UnresolvedImport(target.to_string()))
    }
}

/// Whether `component` names a single entry directly inside its parent
fn is_plain_component(component: &str) -> bool {
    !component.contains(['/', '\\'])
        && matches!(
            Path::new(component).components().collect::<Vec<_>>().as_slice(),
            [Component::Normal(_)]
        )
}

/// Resolves a module's class definitions, following `extends` chains
struct ClassResolver<'a> {
    defs: &'a BTreeMap<String, ClassDef>,
    namespace: &'a BTreeMap<String, Binding>,
    module: &'a str,
    source: &'a Path,
    done: BTreeMap<String, Arc<NodeClass>>,
    visiting: HashSet<String>,
}

impl ClassResolver<'_> {
    fn resolve(&mut self, name: &str) -> Result<Arc<NodeClass>, ModuleError> {
        if let Some(class) = self.done.get(name) {
            return Ok(Arc::clone(class));
        }

        let defs = self.defs;
        let Some(def) = defs.get(name) else {
            return Err(ModuleError::UnknownBase {
                class: name.to_string(),
                base: name.to_string(),
            });
        };

        if !self.visiting.insert(name.to_string()) {
            return Err(ModuleError::InheritanceCycle(name.to_string()));
        }

        let mut attributes = match &def.extends {
            Some(base) => self.base_attributes(name, base)?,
            None => Map::new(),
        };
        attributes.extend(def.attrs.clone());

        let class = Arc::new(NodeClass::new(name, self.module, self.source, attributes));
        self.visiting.remove(name);
        self.done.insert(name.to_string(), Arc::clone(&class));
        Ok(class)
    }

    fn base_attributes(&mut self, class: &str, base: &str) -> Result<Map<String, Value>, ModuleError> {
        // `Base extends Base` refers to the name bound before the definition
        if base != class && self.defs.contains_key(base) {
            return Ok(self.resolve(base)?.attributes().clone());
        }

        match self.namespace.get(base) {
            Some(Binding::Class(parent)) => Ok(parent.attributes().clone()),
            Some(_) => Err(ModuleError::NotAClass {
                class: class.to_string(),
                base: base.to_string(),
            }),
            None => Err(ModuleError::UnknownBase {
                class: class.to_string(),
                base: base.to_string(),
            }),
        }
    }
}
