//! Sequential release publishing
//!
//! [publish] applies a [ReconciliationPlan] in six blocking steps:
//!
//! 1. Commit the files changed by the version bump (skipped when clean)
//! 2. Apply `Create`/`Move` entries to local tag storage
//! 3. Push the commit advance, if step 1 produced one
//! 4. Push the canonical tag
//! 5. Push each created or moved convenience tag, in plan order
//! 6. Create exactly one hosted release for the canonical tag
//!
//! A failing step aborts the rest. Nothing is rolled back; once any step has
//! changed state the failure is reported as [SemrelError::PartialPublish].
//!
//! Running the same plan again finishes an interrupted run. `Unchanged`
//! entries are checked against what the remote actually has, and tags it
//! lacks are pushed, as is the branch when the release commit never
//! reached it.

use crate::domain::CommitId;
use crate::error::{Result, SemrelError};
use crate::git::{RemoteHandle, RemoteState, RepositoryHandle};
use crate::hvcs::ReleasePublisher;
use crate::reconcile::{ReconciliationEntry, ReconciliationPlan};
use std::fmt;
use std::path::PathBuf;

/// One observable step of a publish run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishStep {
    Commit,
    ApplyTags,
    ReadRemote,
    PushCommits,
    PushCanonicalTag(String),
    PushConvenienceTag(String),
    CreateRelease,
}

impl fmt::Display for PublishStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishStep::Commit => write!(f, "commit"),
            PublishStep::ApplyTags => write!(f, "apply tags"),
            PublishStep::ReadRemote => write!(f, "read remote refs"),
            PublishStep::PushCommits => write!(f, "push commits"),
            PublishStep::PushCanonicalTag(name) => write!(f, "push tag {}", name),
            PublishStep::PushConvenienceTag(name) => write!(f, "push tag {}", name),
            PublishStep::CreateRelease => write!(f, "create release"),
        }
    }
}

/// Which outward-facing steps to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishOptions {
    /// Run steps 3 to 6; when false the run stops after tagging locally
    pub push: bool,
    /// Run step 6
    pub vcs_release: bool,
}

impl Default for PublishOptions {
    fn default() -> Self {
        PublishOptions {
            push: true,
            vcs_release: true,
        }
    }
}

/// What goes into the release commit and the hosted release
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReleaseDetails {
    pub commit_message: String,
    pub notes: String,
    /// Files rewritten for the new version, relative to the working
    /// directory; the release commit contains these and nothing else
    pub files: Vec<PathBuf>,
}

/// What a successful publish run did
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PublishResult {
    /// Release commit created in step 1
    pub commit: Option<CommitId>,
    /// Entries written to local tag storage, in plan order
    pub tags_applied: Vec<ReconciliationEntry>,
    /// Refs pushed, in push order (`HEAD` stands for the branch)
    pub pushed: Vec<String>,
    /// Hosted release identifier
    pub release: Option<String>,
    /// Steps that changed state, in order
    pub completed: Vec<PublishStep>,
}

impl PublishResult {
    fn run<T>(&mut self, step: PublishStep, action: impl FnOnce() -> Result<T>) -> Result<T> {
        log::debug!("Publish step: {}", step);
        match action() {
            Ok(value) => {
                self.completed.push(step);
                Ok(value)
            }
            Err(e) => Err(self.failure(step, e)),
        }
    }

    fn failure(&self, step: PublishStep, error: SemrelError) -> SemrelError {
        if self.completed.is_empty() {
            return error;
        }
        SemrelError::PartialPublish {
            failed_step: step,
            completed: self.completed.clone(),
            source: Box::new(error),
        }
    }
}

/// Apply `plan` locally, push it and create the hosted release
///
/// # Errors
/// * `InvalidInstruction` - release files changed although the canonical tag
///   already marks HEAD
/// * The underlying error when nothing had changed yet
/// * `PartialPublish` once any earlier step took effect
pub fn publish<R, M, P>(
    plan: &ReconciliationPlan,
    details: &ReleaseDetails,
    repo: &R,
    remote: &M,
    publisher: &P,
    options: PublishOptions,
) -> Result<PublishResult>
where
    R: RepositoryHandle + ?Sized,
    M: RemoteHandle + ?Sized,
    P: ReleasePublisher + ?Sized,
{
    let mut result = PublishResult::default();

    // Step 1
    let mut plan = plan.clone();
    if repo.has_pending_changes(&details.files)? {
        if let ReconciliationEntry::Unchanged(tag) = &plan.canonical {
            // A new commit would need the released tag to move
            return Err(SemrelError::invalid_instruction(format!(
                "{} is already tagged at {}, but release files changed since",
                tag.name,
                tag.commit.short()
            )));
        }
        let commit = result.run(PublishStep::Commit, || {
            repo.commit(&details.commit_message, &details.files)
        })?;
        log::info!("Created release commit {}", commit.short());
        plan = plan
            .retarget(&commit)
            .map_err(|e| result.failure(PublishStep::ApplyTags, e))?;
        result.commit = Some(commit);
    }

    // Step 2
    let changes: Vec<ReconciliationEntry> = plan.changes().cloned().collect();
    if !changes.is_empty() {
        result.run(PublishStep::ApplyTags, || {
            for entry in &changes {
                let tag = entry.tag();
                if let ReconciliationEntry::Move { from, .. } = entry {
                    log::info!("Moving tag {} from {} to {}", tag.name, from.short(), tag.commit.short());
                } else {
                    log::info!("Creating tag {} at {}", tag.name, tag.commit.short());
                }
                repo.create_or_move_tag(&tag.name, &tag.commit)?;
            }
            Ok(())
        })?;
        result.tags_applied = changes;
    }

    if !options.push {
        log::info!("Push disabled, leaving tags local");
        return Ok(result);
    }

    // Only consulted when some entry is already in place locally
    let published = if plan.entries().any(|entry| !entry.is_change()) {
        Some(remote.state().map_err(|e| result.failure(PublishStep::ReadRemote, e))?)
    } else {
        None
    };
    let needs_push = |entry: &ReconciliationEntry| {
        let tag = entry.tag();
        entry.is_change()
            || !published
                .as_ref()
                .is_some_and(|state: &RemoteState| state.has_tag_at(&tag.name, &tag.commit))
    };

    // Step 3
    let release_commit = &plan.canonical.tag().commit;
    let branch_behind = !plan.canonical.is_change()
        && published
            .as_ref()
            .is_some_and(|state| state.head.as_ref() != Some(release_commit));
    if result.commit.is_some() || branch_behind {
        result.run(PublishStep::PushCommits, || remote.push_commits())?;
        result.pushed.push("HEAD".to_string());
    }

    // Step 4
    let canonical = plan.canonical.tag();
    if needs_push(&plan.canonical) {
        result.run(PublishStep::PushCanonicalTag(canonical.name.clone()), || {
            remote.push_tag(&canonical.name)
        })?;
        result.pushed.push(canonical.name.clone());
    } else {
        log::info!("Tag {} already published", canonical.name);
    }

    // Step 5
    for entry in plan.convenience.iter().filter(|e| needs_push(e)) {
        let name = &entry.tag().name;
        result.run(PublishStep::PushConvenienceTag(name.clone()), || {
            remote.push_tag(name)
        })?;
        result.pushed.push(name.clone());
    }

    // Step 6
    if options.vcs_release {
        let release = result.run(PublishStep::CreateRelease, || {
            publisher.create_release(&canonical.name, &details.notes)
        })?;
        result.release = Some(release);
    }

    Ok(result)
}
