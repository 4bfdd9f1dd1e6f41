//! Git operations abstraction layer
//!
//! This module provides trait-based abstractions over the local repository
//! and its remote, allowing for multiple implementations including real Git
//! repositories and an in-memory mock for testing.
//!
//! # Overview
//!
//! - [RepositoryHandle]: local history, tag storage and commits
//! - [RemoteHandle]: listing the published refs, pushing the branch head and
//!   individual tags
//!
//! The concrete implementations are:
//!
//! - [repository::Git2Repository] / [repository::Git2Remote]: backed by the `git2` crate
//! - [mock::MockRepository] / [mock::MockRemote]: in-memory, recording every call
//!
//! # Usage
//!
//! Release logic depends on the traits only:
//!
//! ```rust
//! # use git_semrel::git::RepositoryHandle;
//! # fn example<R: RepositoryHandle>(repo: &R) -> git_semrel::Result<()> {
//! let head = repo.head()?;
//! let current = repo.current_version()?;
//! println!("HEAD {} is on top of {:?}", head.short(), current.map(|v| v.to_string()));
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod repository;

pub use mock::{MockRemote, MockRepository, PushCall};
pub use repository::{Git2Remote, Git2Repository};

use crate::domain::{CommitId, Version};
use crate::error::Result;
use crate::reconcile::TagSnapshot;
use std::path::PathBuf;

/// Local repository operations needed by a release run
///
/// ## Error Handling
///
/// All methods return [crate::error::Result<T>]. Implementations map
/// underlying errors (like `git2::Error`) to [crate::error::SemrelError]
/// variants.
pub trait RepositoryHandle {
    /// Latest released version found among the canonical tags
    ///
    /// Tags that do not parse as `{prefix}major.minor.patch[-pre][+build]`,
    /// including convenience tags, are ignored.
    ///
    /// # Returns
    /// * `Ok(Some(Version))` - Highest version by semver precedence
    /// * `Ok(None)` - No canonical tag exists yet
    fn current_version(&self) -> Result<Option<Version>>;

    /// Commit currently checked out
    fn head(&self) -> Result<CommitId>;

    /// Every tag in the repository, peeled to the commit it references
    fn tags(&self) -> Result<TagSnapshot>;

    /// Whether any of `paths` (relative to the working directory) differs
    /// from HEAD
    fn has_pending_changes(&self, paths: &[PathBuf]) -> Result<bool>;

    /// Commit the modifications to `paths` on top of HEAD
    ///
    /// Changes to any other file stay in the working tree.
    ///
    /// # Returns
    /// * `Ok(CommitId)` - The new HEAD
    fn commit(&self, message: &str, paths: &[PathBuf]) -> Result<CommitId>;

    /// Point `name` at `commit`, creating the tag or force re-pointing it
    fn create_or_move_tag(&self, name: &str, commit: &CommitId) -> Result<()>;

    /// Messages of commits reachable from HEAD but not from `since`
    ///
    /// With `since = None` every commit reachable from HEAD is returned.
    /// Messages are in chronological order (oldest first).
    fn commit_messages_since(&self, since: Option<&CommitId>) -> Result<Vec<String>>;
}

/// Refs currently published on a remote
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteState {
    /// Commit of the release branch on the remote, `None` if it does not exist
    pub head: Option<CommitId>,
    /// Tags on the remote, peeled to commits
    pub tags: TagSnapshot,
}

impl RemoteState {
    /// Whether the remote has tag `name` pointing at `commit`
    pub fn has_tag_at(&self, name: &str, commit: &CommitId) -> bool {
        self.tags.get(name) == Some(commit)
    }
}

/// Remote publishing operations
///
/// Every call is a single network round trip and fails with
/// [crate::error::SemrelError::Transport] on network or auth failure.
pub trait RemoteHandle {
    /// List the branch head and tags the remote currently has
    fn state(&self) -> Result<RemoteState>;

    /// Push the current branch head
    fn push_commits(&self) -> Result<()>;

    /// Push one tag, overwriting the remote tag if it moved
    fn push_tag(&self, name: &str) -> Result<()>;
}
