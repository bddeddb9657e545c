//! Luy Nodes - node discovery and registration for graph-based media hosts
//!
//! This library builds the registries a node-graph host consumes when it
//! loads the Luy node pack:
//! - Discovery of node module files under a package root
//! - Isolated loading with per-file error reporting
//! - Capability checks (`INPUT_TYPES`, `RETURN_TYPES`, `FUNCTION`)
//! - Class and display-name mappings, exported for the host
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  Host graph executor                │
//! │  NODE_CLASS_MAPPINGS │ NODE_DISPLAY_NAME_MAPPINGS   │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                    Node loader                      │
//! │  Discovery  │  Module loader  │  Registry  │  Export│
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Node module files                   │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use luy_nodes::nodes::{DisplayNameOverrides, discover_and_register};
//!
//! let discovery = discover_and_register(Path::new("service"), &DisplayNameOverrides::bundled())?;
//! for name in discovery.registry.names() {
//!     println!("{name}: {:?}", discovery.registry.display_name(name));
//! }
//! # Ok::<(), luy_nodes::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod nodes;

pub use config::Config;
pub use error::{Error, Result};
pub use nodes::{
    Discovery, DisplayNameOverrides, HostManifest, NodeClass, NodeLoader, NodeRegistry, NodeShape,
    ScanOptions, ScanReport, discover_and_register,
};
