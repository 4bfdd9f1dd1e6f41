//! Main workflow orchestration logic
//!
//! Separates CLI argument parsing from the release pipeline:
//! resolve -> plan tags -> reconcile -> stamp -> publish.
//!
//! [plan_release] and [publish_release] only depend on the repository,
//! remote and publisher traits; [run_release_workflow] wires them to the
//! real git repository in the current directory.

use anyhow::{Context, Result};

use crate::analyzer::{release_notes, CommitClassifier, ConventionalClassifier};
use crate::boundary::{self, BoundaryWarning};
use crate::config::{Config, HvcsKind};
use crate::domain::{
    plan_tags, resolve, BumpInstruction, BumpLevel, ReleaseRequest, TagPlan, Version,
};
use crate::error::{self, SemrelError};
use crate::git::{Git2Repository, RemoteHandle, RepositoryHandle};
use crate::hvcs::{GitLab, GitLabOptions, NullPublisher, ReleasePublisher};
use crate::publish::{publish, PublishOptions, PublishResult, ReleaseDetails};
use crate::reconcile::{reconcile, ReconciliationEntry, ReconciliationPlan, TagSnapshot};
use crate::stamp::stamp_version;
use std::path::PathBuf;

/// Arguments for the release workflow
///
/// Mirrors the CLI Args but in a format suitable for orchestration logic.
/// This decoupling allows the workflow to be called programmatically
/// without depending on clap.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReleaseWorkflowArgs {
    /// Bump forced on the command line, overriding commit history
    pub forced: Option<BumpLevel>,

    /// Release the current numbers as the next pre-release
    pub prerelease: bool,

    /// Turn the resolved bump into a pre-release
    pub as_prerelease: bool,

    /// Pre-release token overriding the configured one
    pub prerelease_token: Option<String>,

    pub build_metadata: Option<String>,

    pub no_push: bool,

    pub no_vcs_release: bool,

    /// Stop after planning, change nothing
    pub noop: bool,

    /// Only compute the next version
    pub print_only: bool,
}

/// Everything decided before any state is changed
#[derive(Debug, Clone, PartialEq)]
pub struct ReleasePlan {
    pub current: Option<Version>,
    pub version: Version,
    pub previous_tag: Option<String>,
    pub tags: TagPlan,
    pub reconciliation: ReconciliationPlan,
    pub notes: String,
    pub warnings: Vec<BoundaryWarning>,
}

/// How a workflow run ended
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowOutcome {
    /// No qualifying changes; nothing was done
    NothingToRelease {
        reason: String,
        warnings: Vec<BoundaryWarning>,
    },
    /// `print_only`: the next version
    Printed(Version),
    /// `noop`: the plan that would have been published
    Planned(ReleasePlan),
    Published {
        plan: ReleasePlan,
        result: PublishResult,
        /// Web page of the hosted release, when one was created
        release_url: Option<String>,
    },
}

/// Build the release request from the command line and the history signal
///
/// `--prerelease` without a forced bump annotates the current numbers and
/// ignores history. Otherwise a forced bump wins over history, and
/// `--as-prerelease` (or `--prerelease` next to a forced bump) turns the
/// bumped version into a pre-release.
pub fn build_request(
    args: &ReleaseWorkflowArgs,
    historical: Option<BumpLevel>,
    token: &str,
) -> ReleaseRequest {
    let mut request = match args.forced {
        None if args.prerelease => ReleaseRequest::annotate().with_prerelease(token),
        forced => {
            let request = ReleaseRequest {
                instruction: Some(BumpInstruction::prioritize(forced, historical)),
                prerelease: None,
                build_metadata: None,
            };
            if args.as_prerelease || args.prerelease {
                request.with_prerelease(token)
            } else {
                request
            }
        }
    };

    if let Some(metadata) = &args.build_metadata {
        request = request.with_build_metadata(metadata.clone());
    }

    request
}

/// Highest release tagged below `version`
fn previous_release(existing: &TagSnapshot, prefix: &str, version: &Version) -> Option<Version> {
    existing
        .keys()
        .filter_map(|name| Version::from_tag(name, prefix))
        .filter(|candidate| candidate < version)
        .max()
}

/// Resolve the next version and reconcile its tags against the repository
///
/// When HEAD already carries the canonical tag of the latest release and no
/// bump or pre-release is forced, that release is planned again so an
/// interrupted publish can be finished.
///
/// # Errors
/// * `NothingToRelease` - no forced bump and no qualifying commits
/// * `InvalidInstruction` - bad pre-release token or build metadata
/// * `TagConflict` - the canonical tag exists at another commit
pub fn plan_release<R, P>(
    args: &ReleaseWorkflowArgs,
    config: &Config,
    repo: &R,
    publisher: &P,
) -> error::Result<ReleasePlan>
where
    R: RepositoryHandle + ?Sized,
    P: ReleasePublisher + ?Sized,
{
    let prefix = &config.tags.tag_prefix;
    let existing = repo.tags()?;
    let mut warnings = boundary::unparsable_tags(&existing, prefix);

    let current = repo.current_version()?;
    let head = repo.head()?;
    log::debug!(
        "Current version: {}",
        current
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "none".to_string())
    );

    let resumed = current
        .as_ref()
        .filter(|_| args.forced.is_none() && !args.prerelease)
        .filter(|released| existing.get(&released.tag_name(prefix)) == Some(&head))
        .cloned();

    let baseline = match &resumed {
        Some(released) => previous_release(&existing, prefix, released),
        None => current.clone(),
    };
    let previous_tag = baseline.as_ref().map(|v| v.tag_name(prefix));
    let since = previous_tag.as_ref().and_then(|tag| existing.get(tag));

    let classifier = ConventionalClassifier::new(config.commit_parser.clone());
    let messages = repo.commit_messages_since(since)?;
    log::debug!("Classifying {} commit(s)", messages.len());

    let version = match resumed {
        Some(released) => {
            log::info!("{} already marks HEAD, publishing it again", released);
            released
        }
        None => {
            let historical = classifier.classify(&messages);
            if historical.is_none() {
                warnings.push(BoundaryWarning::NoQualifyingCommits {
                    latest_tag: previous_tag.clone(),
                    current_commit_hash: head.to_string(),
                });
            }

            let token = args
                .prerelease_token
                .as_deref()
                .unwrap_or(&config.publish.prerelease_token);
            let request = build_request(args, historical, token);
            resolve(current.as_ref(), &request)?
        }
    };
    log::info!("Next version: {}", version);

    if config.tags.enable_convenience_tags && !version.is_stable() {
        warnings.push(BoundaryWarning::ConvenienceTagsSuppressed {
            version: version.to_string(),
        });
    }

    let tags = plan_tags(&version, &head, &config.tags);
    let reconciliation = reconcile(&tags, &existing)?;
    if let ReconciliationEntry::Unchanged(tag) = &reconciliation.canonical {
        warnings.push(BoundaryWarning::CanonicalTagExists {
            tag: tag.name.clone(),
        });
    }

    let compare = previous_tag
        .as_deref()
        .and_then(|previous| publisher.compare_url(previous, &tags.canonical.name));
    let notes = release_notes(&classifier, &messages, compare.as_deref(), publisher);

    Ok(ReleasePlan {
        current,
        version,
        previous_tag,
        tags,
        reconciliation,
        notes,
        warnings,
    })
}

/// Publish a plan produced by [plan_release]
///
/// `files` are the paths rewritten for the new version; only they go into
/// the release commit.
pub fn publish_release<R, M, P>(
    plan: &ReleasePlan,
    config: &Config,
    options: PublishOptions,
    files: &[PathBuf],
    repo: &R,
    remote: &M,
    publisher: &P,
) -> error::Result<PublishResult>
where
    R: RepositoryHandle + ?Sized,
    M: RemoteHandle + ?Sized,
    P: ReleasePublisher + ?Sized,
{
    let details = ReleaseDetails {
        commit_message: config
            .publish
            .commit_message_for(&plan.version.to_string()),
        notes: plan.notes.clone(),
        files: files.to_vec(),
    };
    publish(&plan.reconciliation, &details, repo, remote, publisher, options)
}

fn publish_options(args: &ReleaseWorkflowArgs, config: &Config) -> PublishOptions {
    PublishOptions {
        push: config.publish.push && !args.no_push,
        vcs_release: config.publish.vcs_release && !args.no_vcs_release,
    }
}

fn gitlab_client(config: &Config, remote_url: &str) -> error::Result<GitLab> {
    let options = GitLabOptions {
        domain: config.hvcs.domain.clone(),
        project: config.hvcs.project.clone(),
        token: config.hvcs.token(),
        allow_insecure: config.hvcs.allow_insecure,
    }
    .with_ci_env();
    GitLab::new(remote_url, options)
}

/// Main release workflow against the repository in the current directory
///
/// # Returns
///
/// How the run ended; `NothingToRelease` is not an error.
pub fn run_release_workflow(args: ReleaseWorkflowArgs, config: Config) -> Result<WorkflowOutcome> {
    let repo = Git2Repository::open(".", config.tags.tag_prefix.clone())
        .context("Failed to open git repository")?;

    let gitlab = match config.hvcs.kind {
        HvcsKind::Gitlab => {
            let remote_url = repo
                .remote_url(&config.publish.remote)
                .context("Failed to read remote URL")?;
            Some(gitlab_client(&config, &remote_url).context("Failed to configure GitLab")?)
        }
        HvcsKind::None => None,
    };
    let publisher: &dyn ReleasePublisher = match &gitlab {
        Some(gitlab) => gitlab,
        None => &NullPublisher,
    };

    let plan = match plan_release(&args, &config, &repo, publisher) {
        Ok(plan) => plan,
        Err(SemrelError::NothingToRelease(reason)) => {
            let warnings = repo
                .tags()
                .map(|tags| boundary::unparsable_tags(&tags, &config.tags.tag_prefix))
                .unwrap_or_default();
            return Ok(WorkflowOutcome::NothingToRelease { reason, warnings });
        }
        Err(e) => return Err(e).context("Failed to plan release"),
    };

    if args.print_only {
        return Ok(WorkflowOutcome::Printed(plan.version));
    }
    if args.noop {
        return Ok(WorkflowOutcome::Planned(plan));
    }

    let stamped = match repo.workdir() {
        Some(workdir) => stamp_version(workdir, &config.publish.version_variables, &plan.version)
            .context("Failed to stamp version variables")?,
        None => Vec::new(),
    };
    log::debug!("Stamped {} file(s)", stamped.len());

    let mut remote = repo
        .remote(&config.publish.remote)
        .context("Failed to prepare remote")?;
    if let Some(gitlab) = &gitlab {
        if let Some(token) = config.hvcs.token() {
            let push_url = gitlab
                .remote_url(true)
                .context("Failed to build authenticated remote URL")?;
            remote = remote.with_push_url(push_url).with_token(token);
        }
    }

    let result = publish_release(
        &plan,
        &config,
        publish_options(&args, &config),
        &stamped,
        &repo,
        &remote,
        publisher,
    )
    .with_context(|| format!("Failed to publish {}", plan.tags.canonical.name))?;

    let release_url = result
        .release
        .as_ref()
        .and_then(|_| publisher.release_url(&plan.tags.canonical.name));

    Ok(WorkflowOutcome::Published {
        plan,
        result,
        release_url,
    })
}
