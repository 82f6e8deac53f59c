//! Common file system operations with unified error handling

use std::fs;
use std::path::Path;

/// Directory and file names never copied into the pack store.
///
/// VCS metadata, dependency caches, and OS artifacts would change the
/// on-disk content without changing the pack, breaking content addressing.
pub const NOISE_ENTRIES: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "target",
    "__pycache__",
    ".DS_Store",
    "Thumbs.db",
];

#[derive(Default, Clone)]
pub struct CopyOptions {
    pub exclude: Vec<String>,
}

impl CopyOptions {
    /// Exclusions for copying pack sources into the store.
    pub fn exclude_noise() -> Self {
        Self {
            exclude: NOISE_ENTRIES.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

/// Copy a directory recursively with options
pub fn copy_dir_recursive<P1, P2>(src: P1, dst: P2, options: CopyOptions) -> std::io::Result<()>
where
    P1: AsRef<Path>,
    P2: AsRef<Path>,
{
    let src_ref = src.as_ref();
    let dst_ref = dst.as_ref();

    if !dst_ref.exists() {
        fs::create_dir_all(dst_ref)?;
    }

    for entry in fs::read_dir(src_ref)? {
        let entry = entry?;
        let entry_path = entry.path();
        let file_name = entry.file_name();

        if options
            .exclude
            .iter()
            .any(|excluded| file_name.to_str() == Some(excluded.as_str()))
        {
            continue;
        }

        let dst_path = dst_ref.join(&file_name);

        if entry_path.is_dir() {
            fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&entry_path, &dst_path, options.clone())?;
        } else {
            fs::copy(&entry_path, &dst_path)?;
        }
    }

    Ok(())
}

/// Count files under a directory, honoring the same exclusion options as
/// [`copy_dir_recursive`]. Used to size progress bars before copying.
pub fn count_files<P: AsRef<Path>>(src: P, options: &CopyOptions) -> std::io::Result<u64> {
    let mut count = 0;
    for entry in fs::read_dir(src.as_ref())? {
        let entry = entry?;
        let file_name = entry.file_name();

        if options
            .exclude
            .iter()
            .any(|excluded| file_name.to_str() == Some(excluded.as_str()))
        {
            continue;
        }

        if entry.path().is_dir() {
            count += count_files(entry.path(), options)?;
        } else {
            count += 1;
        }
    }
    Ok(count)
}
