//! Template directory path resolution.

use std::path::PathBuf;

/// Environment variable for overriding the template directory.
pub const TEMPLATES_ENV_VAR: &str = "STGEN_TEMPLATES_DIR";

/// Directory holding the templates shipped with this crate, the same files
/// the built-in store embeds.
pub fn bundled_templates_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("templates")
}

/// Template root: `STGEN_TEMPLATES_DIR` when set, else the bundled
/// directory. Templates live at `<root>/<TYPE>/<version>.tera`.
pub fn templates_root() -> PathBuf {
    match std::env::var_os(TEMPLATES_ENV_VAR) {
        Some(root) if !root.is_empty() => PathBuf::from(root),
        _ => bundled_templates_dir(),
    }
}
