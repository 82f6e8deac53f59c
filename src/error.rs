//! Error types and handling for Packsmith
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.
//!
//! Every operational (user-actionable) error carries a machine-readable
//! diagnostic code and a help hint with enough context to act without
//! re-running with extra verbosity. Programming errors (bad arguments from
//! callers, unexpected I/O) are distinguished via [`PacksmithError::is_operational`].

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for Packsmith operations
#[derive(Error, Diagnostic, Debug)]
pub enum PacksmithError {
    // Pack store errors
    #[error("Pack '{id}' not found")]
    #[diagnostic(
        code(packsmith::store::pack_not_found),
        help("Run 'packsmith list' to see installed packs, or 'packsmith install <dir>' to install one")
    )]
    PackNotFound { id: String },

    #[error("Pack store not found at: {path}")]
    #[diagnostic(
        code(packsmith::store::missing),
        help("Run 'packsmith install <dir>' to create the pack store")
    )]
    PackStoreMissing { path: String },

    // Version resolution errors
    #[error("Version '{version}' of pack '{id}' is not installed")]
    #[diagnostic(
        code(packsmith::resolver::version_not_found),
        help("Available versions: {available}")
    )]
    VersionNotFound {
        id: String,
        version: String,
        available: String,
    },

    // Manifest errors
    #[error("Pack manifest not found: {path}")]
    #[diagnostic(
        code(packsmith::manifest::not_found),
        help("Every pack needs a pack.yaml at its root")
    )]
    ManifestNotFound { path: String },

    #[error("Failed to parse pack manifest: {path}")]
    #[diagnostic(code(packsmith::manifest::yaml_error))]
    ManifestYamlError { path: String, reason: String },

    #[error("Invalid pack manifest: {path}: {reason}")]
    #[diagnostic(code(packsmith::manifest::schema_error))]
    ManifestSchemaError { path: String, reason: String },

    #[error("Archetype '{archetype}' not found in pack '{pack}'")]
    #[diagnostic(
        code(packsmith::manifest::archetype_not_found),
        help("Available archetypes: {available}")
    )]
    ArchetypeNotFound {
        pack: String,
        archetype: String,
        available: String,
    },

    #[error("Template directory not found: {path}")]
    #[diagnostic(
        code(packsmith::manifest::template_dir_not_found),
        help("The archetype's templateRoot must exist inside the stored pack")
    )]
    TemplateDirNotFound { path: String },

    #[error("Pack '{pack}' requires packsmith >= {required} (this is {current})")]
    #[diagnostic(code(packsmith::generate::incompatible_pack))]
    PackIncompatible {
        pack: String,
        required: String,
        current: String,
    },

    // Generation errors
    #[error("Generation would overwrite {count} existing file(s)")]
    #[diagnostic(
        code(packsmith::generate::conflict),
        help("Conflicting files:\n{paths}\nRe-run with --force to overwrite, or --dry-run to preview")
    )]
    GenerateConflict { count: usize, paths: String },

    #[error("Another generation is already running for this target")]
    #[diagnostic(
        code(packsmith::generate::in_progress),
        help("If no other packsmith process is running, delete the stale lock file: {lock_path}")
    )]
    GenerationInProgress { lock_path: String },

    // Patch errors
    #[error("Patch marker '{marker}' not found in {file}")]
    #[diagnostic(
        code(packsmith::patch::marker_not_found),
        help("The target file must contain both markers, or mark the patch non-strict to skip")
    )]
    PatchMarkerNotFound { file: String, marker: String },

    #[error("Patch markers out of order in {file}: '{marker_end}' appears before '{marker_start}'")]
    #[diagnostic(code(packsmith::patch::marker_order))]
    PatchMarkerOrder {
        file: String,
        marker_start: String,
        marker_end: String,
    },

    #[error("Patch target file not found: {path}")]
    #[diagnostic(
        code(packsmith::patch::file_not_found),
        help("append_if_missing creates missing files only in non-strict mode")
    )]
    PatchFileNotFound { path: String },

    #[error("Failed to apply patch to {path}: {reason}")]
    #[diagnostic(code(packsmith::patch::application_failed))]
    PatchApplicationFailed { path: String, reason: String },

    // Lifecycle command errors
    #[error("Post-generate command failed: '{command}' exited with {exit_code}")]
    #[diagnostic(
        code(packsmith::hooks::execution_failed),
        help("stdout:\n{stdout}\nstderr:\n{stderr}")
    )]
    HookExecutionFailed {
        command: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("Check command failed: '{command}' exited with {exit_code}")]
    #[diagnostic(
        code(packsmith::hooks::check_failed),
        help("stdout:\n{stdout}\nstderr:\n{stderr}")
    )]
    CheckFailed {
        command: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("Command timed out after {secs}s: '{command}'")]
    #[diagnostic(
        code(packsmith::hooks::timed_out),
        help("Raise the limit with --hook-timeout or fix the hanging command")
    )]
    HookTimedOut { command: String, secs: u64 },

    // Registry errors
    #[error("Pack registry is not valid JSON: {path}")]
    #[diagnostic(code(packsmith::registry::invalid_json))]
    RegistryInvalidJson { path: String, reason: String },

    #[error("Pack registry has an invalid schema: {path}: {reason}")]
    #[diagnostic(code(packsmith::registry::invalid_schema))]
    RegistryInvalidSchema { path: String, reason: String },

    // Project state errors
    #[error("Project state file is not valid JSON: {path}")]
    #[diagnostic(code(packsmith::state::invalid_json))]
    StateInvalidJson { path: String, reason: String },

    #[error("Project state schema version {found} is newer than supported version {current}")]
    #[diagnostic(
        code(packsmith::state::version_unsupported),
        help("This project was generated by a newer packsmith; upgrade to read its state")
    )]
    StateVersionUnsupported { found: u32, current: u32 },

    // File system errors
    #[error("Failed to read file: {path}")]
    #[diagnostic(code(packsmith::fs::read_failed))]
    FileReadFailed { path: String, reason: String },

    #[error("Failed to write file: {path}")]
    #[diagnostic(code(packsmith::fs::write_failed))]
    FileWriteFailed { path: String, reason: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(packsmith::fs::io_error))]
    IoError { message: String },

    // CLI argument errors
    #[error("Invalid --data argument: '{arg}'")]
    #[diagnostic(
        code(packsmith::cli::invalid_data_arg),
        help("Data values are passed as key=value, e.g. --data name=my-service")
    )]
    InvalidDataArg { arg: String },
}

impl PacksmithError {
    /// Whether this error is operational (user-actionable) rather than a
    /// programming or environment fault.
    pub fn is_operational(&self) -> bool {
        !matches!(self, PacksmithError::IoError { .. })
    }
}

impl From<std::io::Error> for PacksmithError {
    fn from(err: std::io::Error) -> Self {
        PacksmithError::IoError {
            message: err.to_string(),
        }
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, PacksmithError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PacksmithError::PackNotFound {
            id: "web-service".to_string(),
        };
        assert_eq!(err.to_string(), "Pack 'web-service' not found");
    }

    #[test]
    fn test_error_code() {
        let err = PacksmithError::PackNotFound {
            id: "web-service".to_string(),
        };
        assert_eq!(
            err.code().map(|c| c.to_string()),
            Some("packsmith::store::pack_not_found".to_string())
        );
    }

    #[test]
    fn test_version_not_found_lists_available() {
        let err = PacksmithError::VersionNotFound {
            id: "pkg".to_string(),
            version: "9.9.9".to_string(),
            available: "1.0.0".to_string(),
        };
        let help = err.help().map(|h| h.to_string()).unwrap_or_default();
        assert!(help.contains("1.0.0"), "help should list versions: {help}");
    }

    #[test]
    fn test_hook_failure_carries_output() {
        let err = PacksmithError::HookExecutionFailed {
            command: "npm install".to_string(),
            exit_code: 1,
            stdout: "installing...".to_string(),
            stderr: "ENOENT".to_string(),
        };
        assert!(err.to_string().contains("npm install"));
        let help = err.help().map(|h| h.to_string()).unwrap_or_default();
        assert!(help.contains("ENOENT"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PacksmithError = io_err.into();
        assert!(matches!(err, PacksmithError::IoError { .. }));
        assert!(!err.is_operational());
    }

    #[test]
    fn test_operational_flag() {
        let err = PacksmithError::GenerateConflict {
            count: 2,
            paths: "a\nb".to_string(),
        };
        assert!(err.is_operational());
    }
}
