pub mod config;
pub mod domains;
pub mod evaluate;
pub mod init;
pub mod manual;
pub mod next;
pub mod progress;

use anyhow::Context;
use relish_core::{config::Config, store::FileStore};
use std::path::Path;

/// Config and store for an initialized root.
pub fn open(root: &Path) -> anyhow::Result<(Config, FileStore)> {
    let config = Config::load(root).context("failed to load config")?;
    Ok((config, FileStore::new(root)))
}
