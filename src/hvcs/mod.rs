//! Hosted VCS release publishing
//!
//! - [gitlab::GitLab]: GitLab REST v4 releases API
//! - [NullPublisher]: no hosted VCS configured, release creation is only logged
//! - [mock::MockPublisher]: records calls for tests

pub mod gitlab;
pub mod mock;

pub use gitlab::{GitLab, GitLabOptions};
pub use mock::MockPublisher;

use crate::error::Result;

/// Creates the hosted release for a pushed tag
pub trait ReleasePublisher {
    /// Create (or update, if it already exists) the release for `tag`
    ///
    /// # Returns
    /// * `Ok(String)` - Identifier of the release on the host
    fn create_release(&self, tag: &str, notes: &str) -> Result<String>;

    /// Web URL comparing two revisions, if the host has one
    fn compare_url(&self, _from: &str, _to: &str) -> Option<String> {
        None
    }

    /// Web URL of the release page for `tag`, if the host has one
    fn release_url(&self, _tag: &str) -> Option<String> {
        None
    }

    fn issue_url(&self, _issue: &str) -> Option<String> {
        None
    }

    fn merge_request_url(&self, _merge_request: &str) -> Option<String> {
        None
    }
}

/// Publisher used when no hosted VCS is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPublisher;

impl ReleasePublisher for NullPublisher {
    fn create_release(&self, tag: &str, _notes: &str) -> Result<String> {
        log::info!("No hosted VCS configured, not creating a release for {}", tag);
        Ok(tag.to_string())
    }
}
