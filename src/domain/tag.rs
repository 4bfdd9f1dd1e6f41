use crate::domain::version::Version;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque content hash identifying a commit
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommitId(String);

impl CommitId {
    pub fn new(id: impl Into<String>) -> Self {
        CommitId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for display (first 7 characters)
    pub fn short(&self) -> &str {
        self.0.get(..7).unwrap_or(&self.0)
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A tag name and the commit it references
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRef {
    pub name: String,
    pub commit: CommitId,
}

impl TagRef {
    pub fn new(name: impl Into<String>, commit: CommitId) -> Self {
        TagRef {
            name: name.into(),
            commit,
        }
    }
}

/// Complete target tag state for one release
///
/// Convenience tags are ordered narrowest scope first (`v1.2` before `v1`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPlan {
    pub canonical: TagRef,
    pub convenience: Vec<TagRef>,
}

impl TagPlan {
    /// Every tag in the plan, canonical first
    pub fn tags(&self) -> impl Iterator<Item = &TagRef> {
        std::iter::once(&self.canonical).chain(self.convenience.iter())
    }
}

fn default_tag_prefix() -> String {
    "v".to_string()
}

/// Tag naming options (the `[tags]` configuration section)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TagNamingConfig {
    /// Rolling `v{major}` / `v{major}.{minor}` tags on stable releases
    #[serde(default)]
    pub enable_convenience_tags: bool,

    #[serde(default = "default_tag_prefix")]
    pub tag_prefix: String,
}

impl Default for TagNamingConfig {
    fn default() -> Self {
        TagNamingConfig {
            enable_convenience_tags: false,
            tag_prefix: default_tag_prefix(),
        }
    }
}

/// Compute the tags that must reference `target` after releasing `version`.
///
/// The canonical tag is always produced. Convenience tags are produced only
/// when enabled and the version has neither pre-release nor build metadata,
/// and then they cover exactly the version's own major and major.minor
/// series.
pub fn plan_tags(version: &Version, target: &CommitId, config: &TagNamingConfig) -> TagPlan {
    let prefix = &config.tag_prefix;
    let canonical = TagRef::new(version.tag_name(prefix), target.clone());

    let convenience = if config.enable_convenience_tags && version.is_stable() {
        vec![
            TagRef::new(
                format!("{}{}.{}", prefix, version.major, version.minor),
                target.clone(),
            ),
            TagRef::new(format!("{}{}", prefix, version.major), target.clone()),
        ]
    } else {
        Vec::new()
    };

    TagPlan {
        canonical,
        convenience,
    }
}
