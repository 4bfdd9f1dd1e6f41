//! Next-version resolution
//!
//! [`resolve`] is a pure function of the current version and a
//! [`ReleaseRequest`]. Forced bumps beat history-derived ones by variant,
//! never by magnitude, see [`BumpInstruction::prioritize`].

use crate::domain::prerelease::PreRelease;
use crate::domain::version::Version;
use crate::error::{Result, SemrelError};
use semver::{BuildMetadata, Prerelease};
use std::fmt;

/// Granularity of a version increment, ordered `Patch < Minor < Major`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BumpLevel {
    Patch,
    Minor,
    Major,
}

impl fmt::Display for BumpLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BumpLevel::Patch => write!(f, "patch"),
            BumpLevel::Minor => write!(f, "minor"),
            BumpLevel::Major => write!(f, "major"),
        }
    }
}

/// Where the numeric bump comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpInstruction {
    /// Requested explicitly by the caller; commit history is never consulted
    Forced(BumpLevel),
    /// Derived from commit history; `None` means no qualifying change
    Historical(Option<BumpLevel>),
}

impl BumpInstruction {
    /// Combine an explicit request with the history-derived signal.
    ///
    /// Any forced level wins, whatever the historical level is. The
    /// historical signal only matters when nothing was forced.
    pub fn prioritize(forced: Option<BumpLevel>, historical: Option<BumpLevel>) -> Self {
        match forced {
            Some(level) => BumpInstruction::Forced(level),
            None => BumpInstruction::Historical(historical),
        }
    }
}

/// Everything the resolver needs besides the current version
///
/// `prerelease` and `build_metadata` are annotations composed with the
/// numeric bump. With `instruction: None` they are applied to the current
/// numbers without incrementing anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseRequest {
    pub instruction: Option<BumpInstruction>,
    /// Pre-release token, e.g. "rc"
    pub prerelease: Option<String>,
    pub build_metadata: Option<String>,
}

impl ReleaseRequest {
    pub fn forced(level: BumpLevel) -> Self {
        ReleaseRequest {
            instruction: Some(BumpInstruction::Forced(level)),
            ..Default::default()
        }
    }

    pub fn historical(level: Option<BumpLevel>) -> Self {
        ReleaseRequest {
            instruction: Some(BumpInstruction::Historical(level)),
            ..Default::default()
        }
    }

    /// Annotation-only request: no numeric bump
    pub fn annotate() -> Self {
        ReleaseRequest::default()
    }

    pub fn with_prerelease(mut self, token: impl Into<String>) -> Self {
        self.prerelease = Some(token.into());
        self
    }

    pub fn with_build_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.build_metadata = Some(metadata.into());
        self
    }

    fn has_annotation(&self) -> bool {
        self.prerelease.is_some() || self.build_metadata.is_some()
    }
}

/// Increment the component named by `level` and reset the lower ones.
///
/// Pre-release and build metadata are dropped.
///
/// # Errors
/// `InvalidInstruction` when the component is already at `u64::MAX`.
pub fn bump(version: &Version, level: BumpLevel) -> Result<Version> {
    let overflow = || {
        SemrelError::invalid_instruction(format!(
            "cannot apply a {} bump to {}: component overflow",
            level, version
        ))
    };
    let next = match level {
        BumpLevel::Major => Version::new(version.major.checked_add(1).ok_or_else(overflow)?, 0, 0),
        BumpLevel::Minor => Version::new(
            version.major,
            version.minor.checked_add(1).ok_or_else(overflow)?,
            0,
        ),
        BumpLevel::Patch => Version::new(
            version.major,
            version.minor,
            version.patch.checked_add(1).ok_or_else(overflow)?,
        ),
    };
    Ok(next)
}

/// Resolve the next version.
///
/// A missing `current` is treated as `0.0.0` (first release). A pre-release
/// without a numeric bump continues the iteration of a pre-release
/// `current`; after a released version it starts on the next patch, so the
/// result always sorts above `current`.
///
/// # Errors
/// * `NothingToRelease` - historical instruction without a qualifying change
/// * `InvalidInstruction` - neither a bump nor an annotation was requested,
///   an annotation is not a valid semver identifier, or a component would
///   overflow
pub fn resolve(current: Option<&Version>, request: &ReleaseRequest) -> Result<Version> {
    let base = current.cloned().unwrap_or_else(Version::zero);

    let numeric = match request.instruction {
        Some(BumpInstruction::Forced(level)) => bump(&base, level)?,
        Some(BumpInstruction::Historical(Some(level))) => bump(&base, level)?,
        Some(BumpInstruction::Historical(None)) => {
            return Err(SemrelError::nothing_to_release(format!(
                "no qualifying changes since {}",
                current
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "the beginning of history".to_string())
            )));
        }
        None if request.prerelease.is_some() => match current {
            Some(released) if released.pre.is_empty() => bump(&base, BumpLevel::Patch)?,
            _ => base.numeric(),
        },
        None if request.has_annotation() => base.numeric(),
        None => {
            return Err(SemrelError::invalid_instruction(
                "no forced bump, no history signal and no pre-release or build metadata requested",
            ));
        }
    };

    let pre = match &request.prerelease {
        Some(token) => next_prerelease(current, &numeric, token)?,
        None => Prerelease::EMPTY,
    };

    let build = match &request.build_metadata {
        Some(metadata) => BuildMetadata::new(metadata).map_err(|e| {
            SemrelError::invalid_instruction(format!("Invalid build metadata '{}': {}", metadata, e))
        })?,
        None => BuildMetadata::EMPTY,
    };

    Ok(numeric.with_prerelease(pre).with_build(build))
}

/// `{token}.{n+1}` when `current` is already a `{token}.{n}` pre-release of
/// the same numbers, `{token}.1` otherwise.
fn next_prerelease(current: Option<&Version>, numeric: &Version, token: &str) -> Result<Prerelease> {
    let first = PreRelease::first(token)
        .map_err(|e| SemrelError::invalid_instruction(e.to_string()))?;

    let next = current
        .filter(|cur| cur.numeric() == *numeric)
        .and_then(|cur| PreRelease::parse(&cur.pre))
        .filter(|pre| pre.token == first.token)
        .map(|pre| pre.next())
        .unwrap_or(first);

    next.to_semver()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_bump_levels() {
        let base = v("1.2.3");
        assert_eq!(bump(&base, BumpLevel::Major).unwrap(), v("2.0.0"));
        assert_eq!(bump(&base, BumpLevel::Minor).unwrap(), v("1.3.0"));
        assert_eq!(bump(&base, BumpLevel::Patch).unwrap(), v("1.2.4"));
    }

    #[test]
    fn test_bump_overflow_is_invalid_instruction() {
        let max = Version::new(u64::MAX, u64::MAX, u64::MAX);
        for level in [BumpLevel::Major, BumpLevel::Minor, BumpLevel::Patch] {
            let err = bump(&max, level).unwrap_err();
            assert!(matches!(err, SemrelError::InvalidInstruction(_)), "{}", level);
        }
        let err = resolve(Some(&max), &ReleaseRequest::forced(BumpLevel::Patch)).unwrap_err();
        assert!(matches!(err, SemrelError::InvalidInstruction(_)));
    }

    #[test]
    fn test_bump_level_order() {
        assert!(BumpLevel::Patch < BumpLevel::Minor);
        assert!(BumpLevel::Minor < BumpLevel::Major);
        assert_eq!(
            [BumpLevel::Minor, BumpLevel::Major, BumpLevel::Patch].iter().max(),
            Some(&BumpLevel::Major)
        );
    }

    #[test]
    fn test_first_release_starts_from_zero() {
        let next = resolve(None, &ReleaseRequest::forced(BumpLevel::Patch)).unwrap();
        assert_eq!(next.to_string(), "0.0.1");
        let next = resolve(None, &ReleaseRequest::forced(BumpLevel::Major)).unwrap();
        assert_eq!(next.to_string(), "1.0.0");
    }

    #[test]
    fn test_prioritize_forced_beats_any_history() {
        for historical in [None, Some(BumpLevel::Patch), Some(BumpLevel::Minor), Some(BumpLevel::Major)] {
            let instruction = BumpInstruction::prioritize(Some(BumpLevel::Patch), historical);
            assert_eq!(instruction, BumpInstruction::Forced(BumpLevel::Patch));

            let request = ReleaseRequest {
                instruction: Some(instruction),
                ..Default::default()
            };
            assert_eq!(resolve(Some(&v("1.4.2")), &request).unwrap().to_string(), "1.4.3");
        }
    }

    #[test]
    fn test_prioritize_falls_back_to_history() {
        assert_eq!(
            BumpInstruction::prioritize(None, Some(BumpLevel::Minor)),
            BumpInstruction::Historical(Some(BumpLevel::Minor))
        );
        assert_eq!(
            BumpInstruction::prioritize(None, None),
            BumpInstruction::Historical(None)
        );
    }

    #[test]
    fn test_historical_none_signals_nothing_to_release() {
        let err = resolve(Some(&v("1.0.0")), &ReleaseRequest::historical(None)).unwrap_err();
        assert!(matches!(err, SemrelError::NothingToRelease(_)));
    }

    #[test]
    fn test_historical_none_with_metadata_still_nothing_to_release() {
        let request = ReleaseRequest::historical(None).with_build_metadata("build.1");
        let err = resolve(Some(&v("1.0.0")), &request).unwrap_err();
        assert!(matches!(err, SemrelError::NothingToRelease(_)));
    }

    #[test]
    fn test_empty_request_is_invalid() {
        let err = resolve(None, &ReleaseRequest::annotate()).unwrap_err();
        assert!(matches!(err, SemrelError::InvalidInstruction(_)));
    }

    #[test]
    fn test_forced_prerelease_without_history_keeps_zero() {
        let request = ReleaseRequest::annotate().with_prerelease("rc");
        assert_eq!(resolve(None, &request).unwrap().to_string(), "0.0.0-rc.1");
    }

    #[test]
    fn test_forced_prerelease_after_stable_moves_to_next_patch() {
        let request = ReleaseRequest::annotate().with_prerelease("rc");
        let current = v("1.2.3");
        let first = resolve(Some(&current), &request).unwrap();
        assert_eq!(first.to_string(), "1.2.4-rc.1");
        assert!(first > current);

        // The new pre-release is now the latest version
        let second = resolve(Some(&first), &request).unwrap();
        assert_eq!(second.to_string(), "1.2.4-rc.2");

        let after_metadata_release = resolve(Some(&v("1.2.3+build.9")), &request).unwrap();
        assert_eq!(after_metadata_release.to_string(), "1.2.4-rc.1");
    }

    #[test]
    fn test_prerelease_iteration_continues() {
        let request = ReleaseRequest::annotate().with_prerelease("rc");
        assert_eq!(
            resolve(Some(&v("1.2.3-rc.4")), &request).unwrap().to_string(),
            "1.2.3-rc.5"
        );
    }

    #[test]
    fn test_prerelease_token_change_restarts_iteration() {
        let request = ReleaseRequest::annotate().with_prerelease("beta");
        assert_eq!(
            resolve(Some(&v("1.2.3-rc.4")), &request).unwrap().to_string(),
            "1.2.3-beta.1"
        );
    }

    #[test]
    fn test_bump_with_prerelease_restarts_iteration() {
        let request = ReleaseRequest::forced(BumpLevel::Minor).with_prerelease("rc");
        assert_eq!(
            resolve(Some(&v("1.2.3-rc.4")), &request).unwrap().to_string(),
            "1.3.0-rc.1"
        );
    }

    #[test]
    fn test_bump_composes_with_build_metadata() {
        let request = ReleaseRequest::forced(BumpLevel::Patch).with_build_metadata("build.12345");
        assert_eq!(
            resolve(Some(&v("0.1.0")), &request).unwrap().to_string(),
            "0.1.1+build.12345"
        );
    }

    #[test]
    fn test_historical_composes_with_build_metadata() {
        let request =
            ReleaseRequest::historical(Some(BumpLevel::Minor)).with_build_metadata("build.12345");
        assert_eq!(resolve(None, &request).unwrap().to_string(), "0.1.0+build.12345");
    }

    #[test]
    fn test_invalid_build_metadata_rejected() {
        let request = ReleaseRequest::forced(BumpLevel::Patch).with_build_metadata("bad metadata!");
        let err = resolve(None, &request).unwrap_err();
        assert!(matches!(err, SemrelError::InvalidInstruction(_)));
    }

    #[test]
    fn test_invalid_prerelease_token_rejected() {
        let request = ReleaseRequest::annotate().with_prerelease("r c");
        let err = resolve(None, &request).unwrap_err();
        assert!(matches!(err, SemrelError::InvalidInstruction(_)));
    }

    #[test]
    fn test_bump_drops_existing_annotations() {
        let next = resolve(
            Some(&v("1.0.0-rc.2+build.7")),
            &ReleaseRequest::forced(BumpLevel::Patch),
        )
        .unwrap();
        assert_eq!(next.to_string(), "1.0.1");
    }
}
