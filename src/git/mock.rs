use crate::domain::{CommitId, Version};
use crate::error::{Result, SemrelError};
use crate::git::{RemoteHandle, RemoteState, RepositoryHandle};
use crate::reconcile::TagSnapshot;
use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::rc::Rc;

#[derive(Debug, Default)]
struct MockState {
    history: Vec<(CommitId, String)>,
    head: Option<CommitId>,
    tags: TagSnapshot,
    modified: BTreeSet<PathBuf>,
    tag_writes: Vec<(String, CommitId)>,
    commits_made: Vec<String>,
    committed_files: Vec<PathBuf>,
}

/// In-memory repository for testing without actual git operations
///
/// Every mutation is recorded so tests can assert on what a release run did.
pub struct MockRepository {
    tag_prefix: String,
    state: Rc<RefCell<MockState>>,
}

impl MockRepository {
    /// Create a new empty mock repository using the `v` tag prefix
    pub fn new() -> Self {
        MockRepository {
            tag_prefix: "v".to_string(),
            state: Rc::new(RefCell::new(MockState::default())),
        }
    }

    pub fn with_tag_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.tag_prefix = prefix.into();
        self
    }

    /// Append a commit to history and move HEAD onto it
    pub fn add_commit(&self, id: impl Into<String>, message: impl Into<String>) -> CommitId {
        let id = CommitId::new(id);
        let mut state = self.state.borrow_mut();
        state.history.push((id.clone(), message.into()));
        state.head = Some(id.clone());
        id
    }

    /// Add a tag pointing to a commit, without recording it as a write
    pub fn add_tag(&self, name: impl Into<String>, commit: &CommitId) {
        self.state
            .borrow_mut()
            .tags
            .insert(name.into(), commit.clone());
    }

    /// Simulate an uncommitted modification of a tracked file
    pub fn modify_file(&self, path: impl Into<PathBuf>) {
        self.state.borrow_mut().modified.insert(path.into());
    }

    /// Files still modified in the working tree
    pub fn modified_files(&self) -> Vec<PathBuf> {
        self.state.borrow().modified.iter().cloned().collect()
    }

    /// Tag writes in the order they happened
    pub fn tag_writes(&self) -> Vec<(String, CommitId)> {
        self.state.borrow().tag_writes.clone()
    }

    /// Messages of commits created through [RepositoryHandle::commit]
    pub fn commits_made(&self) -> Vec<String> {
        self.state.borrow().commits_made.clone()
    }

    /// Files included in commits created through [RepositoryHandle::commit]
    pub fn committed_files(&self) -> Vec<PathBuf> {
        self.state.borrow().committed_files.clone()
    }

    /// Remote that receives this repository's refs as they are pushed
    pub fn remote(&self) -> MockRemote {
        MockRemote {
            local: Some(Rc::clone(&self.state)),
            ..MockRemote::default()
        }
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositoryHandle for MockRepository {
    fn current_version(&self) -> Result<Option<Version>> {
        Ok(self
            .state
            .borrow()
            .tags
            .keys()
            .filter_map(|name| Version::from_tag(name, &self.tag_prefix))
            .max())
    }

    fn head(&self) -> Result<CommitId> {
        self.state
            .borrow()
            .head
            .clone()
            .ok_or_else(|| SemrelError::Git(git2::Error::from_str("mock repository has no commits")))
    }

    fn tags(&self) -> Result<TagSnapshot> {
        Ok(self.state.borrow().tags.clone())
    }

    fn has_pending_changes(&self, paths: &[PathBuf]) -> Result<bool> {
        let state = self.state.borrow();
        Ok(paths.iter().any(|path| state.modified.contains(path)))
    }

    fn commit(&self, message: &str, paths: &[PathBuf]) -> Result<CommitId> {
        let id = {
            let mut state = self.state.borrow_mut();
            for path in paths {
                if state.modified.remove(path) {
                    state.committed_files.push(path.clone());
                }
            }
            state.commits_made.push(message.to_string());
            format!("release-commit-{}", state.commits_made.len())
        };
        Ok(self.add_commit(id, message))
    }

    fn create_or_move_tag(&self, name: &str, commit: &CommitId) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.tags.insert(name.to_string(), commit.clone());
        state.tag_writes.push((name.to_string(), commit.clone()));
        Ok(())
    }

    fn commit_messages_since(&self, since: Option<&CommitId>) -> Result<Vec<String>> {
        let state = self.state.borrow();
        let start = match since {
            Some(since) => state
                .history
                .iter()
                .position(|(id, _)| id == since)
                .map(|i| i + 1)
                .unwrap_or(0),
            None => 0,
        };
        Ok(state.history[start..]
            .iter()
            .map(|(_, message)| message.clone())
            .collect())
    }
}

/// One push made against a [MockRemote]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushCall {
    Commits,
    Tag(String),
}

/// Remote recording push calls, optionally failing one of them
///
/// A remote from [MockRepository::remote] publishes the repository's refs
/// when a push succeeds. A standalone one only knows the state it was
/// seeded with.
#[derive(Default)]
pub struct MockRemote {
    calls: RefCell<Vec<PushCall>>,
    fail_at: Cell<Option<usize>>,
    published: RefCell<RemoteState>,
    local: Option<Rc<RefCell<MockState>>>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from refs that are already published
    pub fn with_state(self, state: RemoteState) -> Self {
        self.published.replace(state);
        self
    }

    /// Make the push call with this zero-based index fail with a transport error
    pub fn fail_at(&self, index: usize) {
        self.fail_at.set(Some(index));
    }

    /// Calls attempted so far, including a failed one
    pub fn calls(&self) -> Vec<PushCall> {
        self.calls.borrow().clone()
    }

    /// Refs published so far
    pub fn published(&self) -> RemoteState {
        self.published.borrow().clone()
    }

    fn record(&self, call: PushCall) -> Result<()> {
        let mut calls = self.calls.borrow_mut();
        let index = calls.len();
        calls.push(call.clone());
        if self.fail_at.get() == Some(index) {
            return Err(SemrelError::transport(format!("mock push {:?} failed", call)));
        }
        Ok(())
    }
}

impl RemoteHandle for MockRemote {
    fn state(&self) -> Result<RemoteState> {
        Ok(self.published())
    }

    fn push_commits(&self) -> Result<()> {
        self.record(PushCall::Commits)?;
        if let Some(local) = &self.local {
            self.published.borrow_mut().head = local.borrow().head.clone();
        }
        Ok(())
    }

    fn push_tag(&self, name: &str) -> Result<()> {
        self.record(PushCall::Tag(name.to_string()))?;
        if let Some(commit) = self
            .local
            .as_ref()
            .and_then(|local| local.borrow().tags.get(name).cloned())
        {
            self.published
                .borrow_mut()
                .tags
                .insert(name.to_string(), commit);
        }
        Ok(())
    }
}
