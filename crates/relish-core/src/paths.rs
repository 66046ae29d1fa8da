use crate::error::{RelishError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const RELISH_DIR: &str = ".relish";
pub const CONFIG_FILE: &str = ".relish/config.yaml";

pub const RECORD_EXT: &str = "yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn relish_dir(root: &Path) -> PathBuf {
    root.join(RELISH_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn collection_dir(root: &Path, collection: &str) -> PathBuf {
    relish_dir(root).join(collection)
}

pub fn record_path(root: &Path, collection: &str, id: &str) -> PathBuf {
    collection_dir(root, collection).join(format!("{id}.{RECORD_EXT}"))
}

// ---------------------------------------------------------------------------
// Id validation
// ---------------------------------------------------------------------------

static ID_RE: OnceLock<Regex> = OnceLock::new();

fn id_re() -> &'static Regex {
    ID_RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9\-]*[a-z0-9]$|^[a-z0-9]$").unwrap())
}

/// Record ids double as file names, so they are restricted to slugs.
pub fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || id.len() > 64 || !id_re().is_match(id) {
        return Err(RelishError::InvalidId(id.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
