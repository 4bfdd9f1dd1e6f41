use crate::error::{Result, SemrelError};
use semver::{BuildMetadata, Prerelease};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Semantic version representation
///
/// Equality and ordering follow semver precedence: a pre-release sorts below
/// the same `major.minor.patch` without one, and build metadata is ignored by
/// both. Use [`Version::to_string`] when the metadata has to be compared too.
#[derive(Debug, Clone)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Prerelease,
    pub build: BuildMetadata,
}

impl Version {
    /// Create a new stable version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Version {
            major,
            minor,
            patch,
            pre: Prerelease::EMPTY,
            build: BuildMetadata::EMPTY,
        }
    }

    /// First version every release sequence starts from
    pub fn zero() -> Self {
        Version::new(0, 0, 0)
    }

    /// Parse a version, tolerating a leading `v` or `V`
    /// (e.g., "v1.2.3-rc.1+build.5")
    pub fn parse(text: &str) -> Result<Self> {
        let clean = text
            .strip_prefix('v')
            .or_else(|| text.strip_prefix('V'))
            .unwrap_or(text);

        let parsed = semver::Version::parse(clean)
            .map_err(|e| SemrelError::version(format!("Invalid version '{}': {}", text, e)))?;

        Ok(Version {
            major: parsed.major,
            minor: parsed.minor,
            patch: parsed.patch,
            pre: parsed.pre,
            build: parsed.build,
        })
    }

    /// Parse the version out of a canonical tag name with the given prefix.
    ///
    /// Returns `None` for tags that don't carry the prefix or aren't a full
    /// `major.minor.patch` version, which includes convenience tags like `v1`.
    pub fn from_tag(tag: &str, prefix: &str) -> Option<Self> {
        let rest = tag.strip_prefix(prefix)?;
        semver::Version::parse(rest).ok().map(|parsed| Version {
            major: parsed.major,
            minor: parsed.minor,
            patch: parsed.patch,
            pre: parsed.pre,
            build: parsed.build,
        })
    }

    /// Render the canonical tag name, e.g. `v1.2.3-rc.1`
    pub fn tag_name(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self)
    }

    /// True when the version carries neither a pre-release nor build metadata
    pub fn is_stable(&self) -> bool {
        self.pre.is_empty() && self.build.is_empty()
    }

    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }

    /// Same version with the pre-release replaced
    pub fn with_prerelease(mut self, pre: Prerelease) -> Self {
        self.pre = pre;
        self
    }

    /// Same version with the build metadata replaced
    pub fn with_build(mut self, build: BuildMetadata) -> Self {
        self.build = build;
        self
    }

    /// Numeric part only, dropping pre-release and build metadata
    pub fn numeric(&self) -> Self {
        Version::new(self.major, self.minor, self.patch)
    }

    fn same_numbers(&self, other: &Version) -> bool {
        (self.major, self.minor, self.patch) == (other.major, other.minor, other.patch)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.same_numbers(other) && self.pre == other.pre
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            // semver::Prerelease already sorts the empty pre-release last
            .then_with(|| self.pre.cmp(&other.pre))
    }
}

impl FromStr for Version {
    type Err = SemrelError;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.pre.is_empty() {
            write!(f, "-{}", self.pre)?;
        }
        if !self.build.is_empty() {
            write!(f, "+{}", self.build)?;
        }
        Ok(())
    }
}
