//! List command implementation
//!
//! Lists installed packs with their current version, origin, and
//! install history.

use console::Style;

use std::path::PathBuf;

use crate::cli::ListArgs;
use crate::error::Result;
use crate::store::registry::PackRegistryEntry;

/// Run list command
pub fn run(packs_root: Option<PathBuf>, args: ListArgs) -> Result<()> {
    let store = super::open_store(packs_root)?;
    let registry = store.registry()?;

    if registry.packs.is_empty() {
        println!("No packs installed.");
        return Ok(());
    }

    println!("Installed packs ({}):", registry.packs.len());
    println!();

    for entry in registry.packs.values() {
        if args.detailed {
            display_pack_detailed(entry);
        } else {
            display_pack_simple(entry);
        }
        println!();
    }

    Ok(())
}

/// Display pack in simple format
fn display_pack_simple(entry: &PackRegistryEntry) {
    println!("  {}", Style::new().bold().yellow().apply_to(&entry.id));
    println!(
        "    {} {}",
        Style::new().bold().apply_to("Current:"),
        entry.current_version
    );
    println!(
        "    {} {}",
        Style::new().bold().apply_to("Origin:"),
        entry.origin
    );
}

/// Display pack with full install history
fn display_pack_detailed(entry: &PackRegistryEntry) {
    display_pack_simple(entry);
    println!(
        "    {} {}",
        Style::new().bold().apply_to("Hash:"),
        &entry.current_hash[..16.min(entry.current_hash.len())]
    );
    println!("    {}", Style::new().bold().apply_to("Installs:"));
    for install in &entry.installs {
        println!(
            "      {} ({}) installed {}",
            install.version,
            &install.hash[..16.min(install.hash.len())],
            install.installed_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
}
