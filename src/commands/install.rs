//! Install command implementation
//!
//! Installs a pack from a local directory into the content-addressed store:
//! 1. Load and validate the manifest
//! 2. Hash the manifest bytes to derive the store key
//! 3. Copy into a staging directory, rename into place
//! 4. Record the install in the registry
//!
//! Re-installing identical content is a reported no-op.

use std::path::PathBuf;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::InstallArgs;
use crate::common::fs::{CopyOptions, count_files};
use crate::error::{PacksmithError, Result};
use crate::store::InstallStatus;

/// Run install command
pub fn run(packs_root: Option<PathBuf>, args: InstallArgs) -> Result<()> {
    if !args.source.is_dir() {
        return Err(PacksmithError::FileReadFailed {
            path: args.source.display().to_string(),
            reason: "not a directory".to_string(),
        });
    }

    let store = super::open_store(packs_root)?;
    let file_count = count_files(&args.source, &CopyOptions::exclude_noise())?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Installing {}", args.source.display()));
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));

    let outcome = store.install(&args.source);
    spinner.finish_and_clear();
    let outcome = outcome?;

    match outcome.status {
        InstallStatus::Installed => {
            println!(
                "{} {} {}",
                Style::new().green().bold().apply_to("Installed"),
                Style::new().bold().yellow().apply_to(&outcome.pack_id),
                outcome.version
            );
            println!(
                "  {} {}",
                Style::new().bold().apply_to("Hash:"),
                &outcome.hash[..16.min(outcome.hash.len())]
            );
            println!(
                "  {} {}",
                Style::new().bold().apply_to("Files:"),
                file_count
            );
            println!(
                "  {} {}",
                Style::new().bold().apply_to("Store:"),
                outcome.dest_dir.display()
            );
        }
        InstallStatus::AlreadyInstalled => {
            println!(
                "{} {} {} is already installed (identical content)",
                Style::new().cyan().bold().apply_to("Unchanged"),
                Style::new().bold().yellow().apply_to(&outcome.pack_id),
                outcome.version
            );
        }
    }

    Ok(())
}
