//! CLI definitions using clap derive API

use clap::builder::{Styles, styling::AnsiColor};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Packsmith - project scaffolding from versioned packs
///
/// Generate new project files from installed packs and evolve existing
/// projects by re-applying idempotent patches.
#[derive(Parser, Debug)]
#[command(
    name = "packsmith",
    author,
    version,
    color = clap::ColorChoice::Always,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Project scaffolding from versioned packs",
    long_about = "Packsmith installs versioned packs (bundles of templates, file patches, and \
                  lifecycle commands) into a content-addressed store, then scaffolds project \
                  files from them. Generations stage everything in isolation, detect conflicts \
                  before any write, and commit atomically with a durable per-target history.",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n    \
                  packsmith install ./my-pack\n    \
                  packsmith generate @scope/web default --data name=my-service\n    \
                  packsmith generate @scope/web default --dry-run\n    \
                  packsmith list\n    \
                  packsmith versions @scope/web\n    \
                  packsmith history"
)]
pub struct Cli {
    /// Pack store root (defaults to PACKSMITH_HOME or the user data directory)
    #[arg(long, global = true, env = "PACKSMITH_HOME")]
    pub packs_root: Option<PathBuf>,

    /// Enable verbose output (includes phase timings after a generation)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install a pack from a local directory into the store
    Install(InstallArgs),

    /// Generate project files from an installed pack
    Generate(GenerateArgs),

    /// List installed packs
    List(ListArgs),

    /// List installed versions of a pack
    Versions(VersionsArgs),

    /// Show the generation history of a target directory
    History(HistoryArgs),

    /// Show version information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the install command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Install a local pack:\n    packsmith install ./my-pack\n\n\
                  Install into an explicit store:\n    packsmith install ./my-pack --packs-root /srv/packs")]
pub struct InstallArgs {
    /// Pack source directory (must contain pack.yaml)
    pub source: PathBuf,
}

/// Arguments for the generate command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Generate with the highest installed version:\n    packsmith generate @scope/web default\n\n\
                  Pin an exact version:\n    packsmith generate @scope/web default --version 1.2.0\n\n\
                  Pass template data:\n    packsmith generate @scope/web default --data name=billing --data port=8080\n\n\
                  Preview without writing:\n    packsmith generate @scope/web default --dry-run\n\n\
                  Overwrite conflicting files:\n    packsmith generate @scope/web default --force")]
pub struct GenerateArgs {
    /// Pack identifier
    pub pack: String,

    /// Archetype id within the pack
    pub archetype: String,

    /// Exact pack version (defaults to the highest installed)
    #[arg(long = "version", short = 'V', value_name = "VERSION")]
    pub pack_version: Option<String>,

    /// Template data as key=value (repeatable)
    #[arg(long = "data", value_name = "KEY=VALUE")]
    pub data: Vec<String>,

    /// Target directory (defaults to the current directory)
    #[arg(long, short = 'd')]
    pub dest: Option<PathBuf>,

    /// Overwrite files that already exist in the target
    #[arg(long)]
    pub force: bool,

    /// Show the plan and conflicts without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Timeout in seconds for each lifecycle command (unbounded if unset)
    #[arg(long, value_name = "SECS")]
    pub hook_timeout: Option<u64>,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  List installed packs:\n    packsmith list\n\n\
                  Include per-version install history:\n    packsmith list --detailed")]
pub struct ListArgs {
    /// Show detailed output
    #[arg(long)]
    pub detailed: bool,
}

/// Arguments for the versions command
#[derive(Parser, Debug)]
pub struct VersionsArgs {
    /// Pack identifier
    pub pack: String,
}

/// Arguments for the history command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  History of the current directory:\n    packsmith history\n\n\
                  History of another target:\n    packsmith history --dest ./services/billing")]
pub struct HistoryArgs {
    /// Target directory (defaults to the current directory)
    #[arg(long, short = 'd')]
    pub dest: Option<PathBuf>,
}

/// Arguments for completions command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Generate bash completions:\n    packsmith completions --shell bash > ~/.bash_completion.d/packsmith\n\n\
                  Generate zsh completions:\n    packsmith completions --shell zsh > ~/.zfunc/_packsmith")]
pub struct CompletionsArgs {
    /// Shell type (bash, elvish, fish, powershell, zsh)
    #[arg(long)]
    pub shell: String,
}
