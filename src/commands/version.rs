//! Version command implementation

use crate::error::Result;

const PROFILE: &str = if cfg!(debug_assertions) {
    "debug"
} else {
    "release"
};

/// Run version command
pub fn run() -> Result<()> {
    println!(
        "packsmith {} ({} build, rust {}+)",
        env!("CARGO_PKG_VERSION"),
        PROFILE,
        env!("CARGO_PKG_RUST_VERSION")
    );
    Ok(())
}
