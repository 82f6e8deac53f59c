//! Versions command implementation

use console::Style;

use std::path::PathBuf;

use crate::cli::VersionsArgs;
use crate::error::Result;
use crate::resolver;

/// Run versions command
pub fn run(packs_root: Option<PathBuf>, args: VersionsArgs) -> Result<()> {
    let store = super::open_store(packs_root)?;
    let registry = store.registry()?;

    let versions = resolver::list_versions(&registry, &args.pack)?;

    println!(
        "Installed versions of {}:",
        Style::new().bold().yellow().apply_to(&args.pack)
    );
    for (i, version) in versions.iter().enumerate() {
        if i == 0 {
            println!(
                "  {} {}",
                version,
                Style::new().green().apply_to("(latest)")
            );
        } else {
            println!("  {}", version);
        }
    }

    Ok(())
}
