//! Candidate classes and the node capability contract

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde_json::{Map, Value};

/// Describes the inputs a node accepts
pub const INPUT_TYPES: &str = "INPUT_TYPES";
/// Describes the outputs a node produces
pub const RETURN_TYPES: &str = "RETURN_TYPES";
/// Names the method the host calls to run the node
pub const FUNCTION: &str = "FUNCTION";
/// Module tag the host inspects for provenance
pub const MODULE_TAG: &str = "RELATIVE_MODULE";
/// Output slot names
pub const RETURN_NAMES: &str = "RETURN_NAMES";
/// Menu category
pub const CATEGORY: &str = "CATEGORY";
/// Marks terminal nodes
pub const OUTPUT_NODE: &str = "OUTPUT_NODE";

/// Identity of a class: the module that defines it plus its name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassId {
    /// Defining module identifier
    pub module: String,
    /// Class name
    pub name: String,
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.name)
    }
}

/// A class found in a loaded node module
///
/// `attributes` already includes everything inherited from base classes.
#[derive(Debug)]
pub struct NodeClass {
    name: String,
    id: ClassId,
    source: PathBuf,
    attributes: Map<String, Value>,
    module_tag: OnceLock<String>,
}

impl NodeClass {
    /// Build a class from its effective attributes
    ///
    /// A declared `RELATIVE_MODULE` attribute presets the module tag, whatever
    /// its value; non-string values are kept in their JSON form.
    #[must_use]
    pub fn new(name: &str, module: &str, source: &Path, attributes: Map<String, Value>) -> Self {
        let module_tag = OnceLock::new();
        if let Some(tag) = attributes.get(MODULE_TAG) {
            let tag = tag.as_str().map_or_else(|| tag.to_string(), ToString::to_string);
            let _ = module_tag.set(tag);
        }

        Self {
            name: name.to_string(),
            id: ClassId {
                module: module.to_string(),
                name: name.to_string(),
            },
            source: source.to_path_buf(),
            attributes,
            module_tag,
        }
    }

    /// Empty stand-in bound when an optional import cannot be resolved
    #[must_use]
    pub fn placeholder(name: &str, module: &str, source: &Path) -> Self {
        Self::new(name, module, source, Map::new())
    }

    /// Simple class name, used as the registry key
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Class identity
    #[must_use]
    pub const fn id(&self) -> &ClassId {
        &self.id
    }

    /// File the class was defined in
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Look up an effective attribute
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// All effective attributes
    #[must_use]
    pub const fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Provenance tag, if declared or stamped
    #[must_use]
    pub fn module_tag(&self) -> Option<&str> {
        self.module_tag.get().map(String::as_str)
    }

    /// Stamp the module tag unless the class already carries one
    ///
    /// Returns `true` if this call set the tag.
    pub fn stamp_module_tag(&self, tag: &str) -> bool {
        self.module_tag.set(tag.to_string()).is_ok()
    }

    /// Menu category
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.attribute(CATEGORY).and_then(Value::as_str)
    }

    /// Whether the node is a terminal output node
    #[must_use]
    pub fn is_output_node(&self) -> bool {
        self.attribute(OUTPUT_NODE)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// The capability set a class must expose to be registered as a node
///
/// Checked by presence only: there is no shared base type across node
/// modules, so any class that declares all three members qualifies. A helper
/// base class that happens to declare them is registered too.
pub trait NodeShape {
    /// Accepted inputs descriptor
    fn input_types(&self) -> Option<&Value>;

    /// Produced outputs descriptor
    fn return_types(&self) -> Option<&Value>;

    /// Name of the entry-point method
    fn entry_point(&self) -> Option<&Value>;

    /// Whether all three capability markers are present
    fn is_node(&self) -> bool {
        self.input_types().is_some() && self.return_types().is_some() && self.entry_point().is_some()
    }
}

impl NodeShape for NodeClass {
    fn input_types(&self) -> Option<&Value> {
        self.attribute(INPUT_TYPES)
    }

    fn return_types(&self) -> Option<&Value> {
        self.attribute(RETURN_TYPES)
    }

    fn entry_point(&self) -> Option<&Value> {
        self.attribute(FUNCTION)
    }
}
