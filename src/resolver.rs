//! Version parsing and resolution for installed packs
//!
//! Comparison is a deliberately simplified SemVer: a numeric
//! (major, minor, patch) triple plus an optional prerelease tag. A
//! prerelease always sorts below its release counterpart at the same triple.
//! There is no build-metadata handling and no range matching — resolution is
//! "exact string match" or "highest parsed version", nothing in between.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{PacksmithError, Result};
use crate::store::registry::Registry;

/// A parsed pack version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
}

impl Version {
    /// Parse a version string of the form `MAJOR.MINOR.PATCH[-PRERELEASE]`.
    ///
    /// A leading `v` is tolerated. Missing minor/patch components default
    /// to zero, so "2" parses as 2.0.0.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim().strip_prefix('v').unwrap_or(input.trim());

        let (triple, prerelease) = match input.split_once('-') {
            Some((t, p)) if !p.is_empty() => (t, Some(p.to_string())),
            Some((t, _)) => (t, None),
            None => (input, None),
        };

        let mut parts = triple.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = match parts.next() {
            Some(p) => p.parse().ok()?,
            None => 0,
        };
        let patch = match parts.next() {
            Some(p) => p.parse().ok()?,
            None => 0,
        };
        if parts.next().is_some() {
            return None;
        }

        Some(Self {
            major,
            minor,
            patch,
            prerelease,
        })
    }

    /// Parse, treating an unparsable string as the lowest possible version
    /// carrying the raw string as its prerelease tag. Registries edited by
    /// hand still resolve this way instead of erroring.
    pub fn parse_lossy(input: &str) -> Self {
        Self::parse(input).unwrap_or(Self {
            major: 0,
            minor: 0,
            patch: 0,
            prerelease: Some(input.to_string()),
        })
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.prerelease, &other.prerelease) {
                // A release outranks any prerelease at the same triple
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.prerelease {
            write!(f, "-{pre}")?;
        }
        Ok(())
    }
}

/// The concrete stored pack instance a generation will use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPack {
    pub pack_id: String,
    pub version: String,
    pub hash: String,
}

/// Pick the stored pack instance for `pack_id`.
///
/// With a requested version the match is exact on the version string; the
/// most recently installed hash wins if the same version was installed more
/// than once. Without one, the install with the highest parsed version is
/// chosen — installation order and version order are independent.
pub fn resolve(registry: &Registry, pack_id: &str, want: Option<&str>) -> Result<ResolvedPack> {
    let entry = registry
        .packs
        .get(pack_id)
        .ok_or_else(|| PacksmithError::PackNotFound {
            id: pack_id.to_string(),
        })?;

    match want {
        Some(version) => {
            let install = entry
                .installs
                .iter()
                .rev()
                .find(|i| i.version == version)
                .ok_or_else(|| PacksmithError::VersionNotFound {
                    id: pack_id.to_string(),
                    version: version.to_string(),
                    available: list_versions(registry, pack_id)
                        .unwrap_or_default()
                        .join(", "),
                })?;

            Ok(ResolvedPack {
                pack_id: pack_id.to_string(),
                version: install.version.clone(),
                hash: install.hash.clone(),
            })
        }
        None => {
            let install = entry
                .installs
                .iter()
                .max_by_key(|i| Version::parse_lossy(&i.version))
                .ok_or_else(|| PacksmithError::PackNotFound {
                    id: pack_id.to_string(),
                })?;

            Ok(ResolvedPack {
                pack_id: pack_id.to_string(),
                version: install.version.clone(),
                hash: install.hash.clone(),
            })
        }
    }
}

/// All installed versions of a pack, sorted descending by parsed version.
pub fn list_versions(registry: &Registry, pack_id: &str) -> Result<Vec<String>> {
    let entry = registry
        .packs
        .get(pack_id)
        .ok_or_else(|| PacksmithError::PackNotFound {
            id: pack_id.to_string(),
        })?;

    let mut versions: Vec<String> = entry.installs.iter().map(|i| i.version.clone()).collect();
    versions.sort_by(|a, b| Version::parse_lossy(b).cmp(&Version::parse_lossy(a)));
    versions.dedup();
    Ok(versions)
}
