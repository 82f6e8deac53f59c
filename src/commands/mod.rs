//! Command implementations for Packsmith CLI

pub mod completions;
pub mod generate;
pub mod history;
pub mod install;
pub mod list;
pub mod version;
pub mod versions;

use std::path::PathBuf;

use crate::error::{PacksmithError, Result};
use crate::store::PackStore;

/// Open the pack store from the CLI argument or the default location.
fn open_store(packs_root: Option<PathBuf>) -> Result<PackStore> {
    let root = match packs_root {
        Some(path) => path,
        None => PackStore::default_root()?,
    };
    Ok(PackStore::open(root))
}

/// Target directory from the CLI argument or the current directory.
fn get_target_path(dest: Option<PathBuf>) -> Result<PathBuf> {
    match dest {
        Some(path) => Ok(path),
        None => std::env::current_dir().map_err(|e| PacksmithError::IoError {
            message: format!("Failed to get current directory: {}", e),
        }),
    }
}
