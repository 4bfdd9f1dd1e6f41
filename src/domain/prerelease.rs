//! Pre-release identifiers for semantic versioning
//!
//! A pre-release produced by a release run always has the shape
//! `{token}.{iteration}` (`rc.1`, `beta.4`). See https://semver.org/#spec-item-9

use crate::error::{Result, SemrelError};
use semver::Prerelease;
use std::fmt;

/// Pre-release with a token and an iteration number
///
/// # Examples
/// - "rc.1" -> PreRelease { token: "rc", iteration: 1 }
/// - "alpha.12" -> PreRelease { token: "alpha", iteration: 12 }
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreRelease {
    pub token: String,
    pub iteration: u64,
}

impl PreRelease {
    /// Create the first pre-release for a token (`{token}.1`)
    ///
    /// The token must be a single non-empty semver identifier made of ASCII
    /// alphanumerics and hyphens.
    pub fn first(token: &str) -> Result<Self> {
        validate_token(token)?;
        Ok(PreRelease {
            token: token.to_string(),
            iteration: 1,
        })
    }

    /// Parse a `{token}.{iteration}` pre-release
    ///
    /// Returns `None` for pre-releases of any other shape, e.g. "alpha" or
    /// "rc.1.2", which this tool never produces.
    pub fn parse(pre: &Prerelease) -> Option<Self> {
        let (token, iteration) = pre.as_str().split_once('.')?;
        if validate_token(token).is_err() {
            return None;
        }
        let iteration = iteration.parse::<u64>().ok()?;
        Some(PreRelease {
            token: token.to_string(),
            iteration,
        })
    }

    /// Next iteration of the same token
    pub fn next(&self) -> Self {
        PreRelease {
            token: self.token.clone(),
            iteration: self.iteration + 1,
        }
    }

    /// Convert into the semver pre-release representation
    pub fn to_semver(&self) -> Result<Prerelease> {
        Prerelease::new(&self.to_string())
            .map_err(|e| SemrelError::version(format!("Invalid pre-release '{}': {}", self, e)))
    }
}

impl fmt::Display for PreRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.token, self.iteration)
    }
}

fn validate_token(token: &str) -> Result<()> {
    if token.is_empty() {
        return Err(SemrelError::version("Empty pre-release token"));
    }
    if !token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(SemrelError::version(format!(
            "Invalid pre-release token: '{}'",
            token
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pre(s: &str) -> Prerelease {
        Prerelease::new(s).unwrap()
    }

    #[test]
    fn test_first_starts_at_one() {
        let pr = PreRelease::first("rc").unwrap();
        assert_eq!(pr.to_string(), "rc.1");
    }

    #[test]
    fn test_first_rejects_invalid_token() {
        assert!(PreRelease::first("").is_err());
        assert!(PreRelease::first("invalid!name").is_err());
        assert!(PreRelease::first("rc.1").is_err());
    }

    #[test]
    fn test_first_accepts_custom_token() {
        let pr = PreRelease::first("custom-name").unwrap();
        assert_eq!(pr.token, "custom-name");
    }

    #[test]
    fn test_parse_token_and_iteration() {
        let pr = PreRelease::parse(&pre("beta.4")).unwrap();
        assert_eq!(pr.token, "beta");
        assert_eq!(pr.iteration, 4);
    }

    #[test]
    fn test_parse_rejects_other_shapes() {
        assert_eq!(PreRelease::parse(&pre("alpha")), None);
        assert_eq!(PreRelease::parse(&pre("rc.x")), None);
        assert_eq!(PreRelease::parse(&pre("rc.1.2")), None);
        assert_eq!(PreRelease::parse(&Prerelease::EMPTY), None);
    }

    #[test]
    fn test_next_increments_iteration() {
        let pr = PreRelease::parse(&pre("rc.99")).unwrap();
        assert_eq!(pr.next().to_string(), "rc.100");
    }

    #[test]
    fn test_to_semver() {
        let pr = PreRelease::first("alpha").unwrap();
        assert_eq!(pr.to_semver().unwrap().as_str(), "alpha.1");
    }
}
