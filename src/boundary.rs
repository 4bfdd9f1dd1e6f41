use crate::domain::{CommitId, Version};
use crate::reconcile::TagSnapshot;
use regex::Regex;
use std::fmt;

/// Non-fatal conditions met while planning a release.
/// These are reported to the user; the run continues.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryWarning {
    /// Tag carries the version prefix but is neither a version nor a convenience tag
    UnparsableTag { tag: String, reason: String },
    /// Commits since the latest release contain nothing that calls for a bump
    NoQualifyingCommits {
        latest_tag: Option<String>,
        current_commit_hash: String,
    },
    /// Convenience tags are enabled but this release is a pre-release or carries build metadata
    ConvenienceTagsSuppressed { version: String },
    /// The canonical tag already points at the release commit
    CanonicalTagExists { tag: String },
}

impl fmt::Display for BoundaryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryWarning::UnparsableTag { tag, reason } => {
                write!(f, "Cannot parse tag '{}': {}", tag, reason)
            }
            BoundaryWarning::NoQualifyingCommits {
                latest_tag,
                current_commit_hash,
            } => {
                let short_hash = CommitId::new(current_commit_hash.as_str()).short().to_string();
                match latest_tag {
                    Some(tag) => write!(
                        f,
                        "No releasable commits since tag '{}' (current: {})",
                        tag, short_hash
                    ),
                    None => write!(f, "No releasable commits (current: {})", short_hash),
                }
            }
            BoundaryWarning::ConvenienceTagsSuppressed { version } => write!(
                f,
                "Convenience tags are not updated for {}, which is not a stable release",
                version
            ),
            BoundaryWarning::CanonicalTagExists { tag } => {
                write!(f, "Tag '{}' already exists at the release commit", tag)
            }
        }
    }
}

/// Warnings for tags that look like versions under `prefix` but do not parse
///
/// Convenience tags (`{prefix}1`, `{prefix}1.2`) are recognised and skipped.
pub fn unparsable_tags(tags: &TagSnapshot, prefix: &str) -> Vec<BoundaryWarning> {
    let convenience = match Regex::new(r"^\d+(\.\d+)?$") {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };

    tags.keys()
        .filter_map(|name| {
            let rest = name.strip_prefix(prefix)?;
            if !rest.starts_with(|c: char| c.is_ascii_digit()) || convenience.is_match(rest) {
                return None;
            }
            Version::parse(rest).err().map(|e| BoundaryWarning::UnparsableTag {
                tag: name.clone(),
                reason: e.to_string(),
            })
        })
        .collect()
}
