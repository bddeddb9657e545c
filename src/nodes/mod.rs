//! Node discovery and registration
//!
//! Node modules are declarative files found under a package root. Each one
//! is loaded in isolation; every top-level class that exposes `INPUT_TYPES`,
//! `RETURN_TYPES` and `FUNCTION` is registered under its class name, with a
//! display label taken from the overrides or generated from a prefix.

mod class;
pub mod host;
mod loader;
mod module;
mod overrides;
mod registry;
mod source;

pub use class::{
    CATEGORY, ClassId, FUNCTION, INPUT_TYPES, MODULE_TAG, NodeClass, NodeShape, OUTPUT_NODE,
    RETURN_NAMES, RETURN_TYPES,
};
pub use host::HostManifest;
pub use loader::{
    DEFAULT_EXTENSION, DEFAULT_LABEL_PREFIX, DEFAULT_MAX_FILE_BYTES, DEFAULT_PACKAGE,
    DEFAULT_SCAN_TAG, Discovery, LoadError, NodeLoader, RegistrationCollision, ScanOptions,
    ScanReport, discover_and_register,
};
pub use module::{
    AttributeDef, Binding, ClassDef, ConstantDef, FunctionDef, ImportDef, LoadedModule,
    ModuleError, ModuleFile, ModuleLoader, Requirements,
};
pub use overrides::DisplayNameOverrides;
pub use registry::NodeRegistry;
pub use source::{ModuleIds, PluginSource, discover_sources};
