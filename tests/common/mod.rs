//! Shared test utilities

use std::path::{Path, PathBuf};

/// Write a node module file under `root`, creating parent directories
pub fn write_module(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().expect("module path has a parent"))
        .expect("failed to create module directory");
    std::fs::write(&path, content).expect("failed to write module");
    path
}

/// Module defining one class with all three capability markers
#[must_use]
pub fn node_module(class: &str, function: &str) -> String {
    format!(
        r#"{{
            "attributes": {{
                "{class}": {{
                    "kind": "class",
                    "attrs": {{
                        "INPUT_TYPES": {{"required": {{}}}},
                        "RETURN_TYPES": ["STRING"],
                        "FUNCTION": "{function}"
                    }}
                }}
            }}
        }}"#
    )
}

/// Path to the demo node pack shipped with the crate
#[must_use]
pub fn demo_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("demos").join("service")
}
