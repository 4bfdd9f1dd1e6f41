use crate::domain::{CommitId, Version};
use crate::error::{Result, SemrelError};
use crate::git::{RemoteHandle, RemoteState, RepositoryHandle};
use crate::reconcile::TagSnapshot;
use git2::{Oid, Repository as Git2Repo};
use std::fs;
use std::path::{Path, PathBuf};

/// Upper bound on credential callback invocations per push; libgit2 keeps
/// asking as long as the callback hands out credentials.
const MAX_CREDENTIAL_ATTEMPTS: u32 = 4;

impl From<Oid> for CommitId {
    fn from(oid: Oid) -> Self {
        CommitId::new(oid.to_string())
    }
}

fn to_oid(commit: &CommitId) -> Result<Oid> {
    Ok(Oid::from_str(commit.as_str())?)
}

/// Wrapper around git2::Repository with our trait interface
pub struct Git2Repository {
    repo: Git2Repo,
    tag_prefix: String,
}

impl Git2Repository {
    /// Open or discover a git repository
    ///
    /// `tag_prefix` selects which tags count as canonical release tags.
    pub fn open<P: AsRef<Path>>(path: P, tag_prefix: impl Into<String>) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;
        Ok(Self::from_git2(repo, tag_prefix))
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo, tag_prefix: impl Into<String>) -> Self {
        Git2Repository {
            repo,
            tag_prefix: tag_prefix.into(),
        }
    }

    /// Working directory, `None` for bare repositories
    pub fn workdir(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    /// Name of the checked out branch
    ///
    /// # Returns
    /// * `Err` - If HEAD is detached or unborn
    pub fn current_branch(&self) -> Result<String> {
        let head = self.repo.head()?;
        if !head.is_branch() {
            return Err(SemrelError::Git(git2::Error::from_str(
                "HEAD is detached; check out a branch to release from",
            )));
        }
        head.shorthand()
            .map(str::to_string)
            .ok_or_else(|| SemrelError::Git(git2::Error::from_str("Branch name is not valid UTF-8")))
    }

    /// Configured URL of a named remote
    pub fn remote_url(&self, remote_name: &str) -> Result<String> {
        let remote = self.repo.find_remote(remote_name)?;
        remote.url().map(str::to_string).ok_or_else(|| {
            SemrelError::config(format!("Remote '{}' has no valid URL", remote_name))
        })
    }

    /// Remote handle pushing the current branch to `remote_name`
    pub fn remote(&self, remote_name: &str) -> Result<Git2Remote<'_>> {
        Ok(Git2Remote {
            repo: &self.repo,
            remote: remote_name.to_string(),
            branch: self.current_branch()?,
            push_url: None,
            token: None,
        })
    }
}

impl RepositoryHandle for Git2Repository {
    fn current_version(&self) -> Result<Option<Version>> {
        let names = self.repo.tag_names(None)?;

        let latest = names
            .iter()
            .flatten()
            .filter_map(|name| {
                let version = Version::from_tag(name, &self.tag_prefix);
                if version.is_none() {
                    log::debug!("Ignoring tag '{}': not a release tag", name);
                }
                version
            })
            .max();

        Ok(latest)
    }

    fn head(&self) -> Result<CommitId> {
        let commit = self.repo.head()?.peel_to_commit()?;
        Ok(commit.id().into())
    }

    fn tags(&self) -> Result<TagSnapshot> {
        let mut snapshot = TagSnapshot::new();

        for name in self.repo.tag_names(None)?.iter().flatten() {
            let reference = self.repo.find_reference(&format!("refs/tags/{}", name))?;
            // Handles both lightweight and annotated tags
            match reference.peel_to_commit() {
                Ok(commit) => {
                    snapshot.insert(name.to_string(), commit.id().into());
                }
                Err(e) => log::debug!("Skipping tag '{}' not pointing at a commit: {}", name, e),
            }
        }

        Ok(snapshot)
    }

    fn has_pending_changes(&self, paths: &[PathBuf]) -> Result<bool> {
        if paths.is_empty() {
            return Ok(false);
        }

        let mut options = git2::StatusOptions::new();
        options
            .include_untracked(true)
            .include_ignored(false)
            .disable_pathspec_match(true);
        for path in paths {
            options.pathspec(path.as_path());
        }

        let statuses = self.repo.statuses(Some(&mut options))?;
        Ok(statuses
            .iter()
            .any(|entry| entry.status() != git2::Status::CURRENT))
    }

    fn commit(&self, message: &str, paths: &[PathBuf]) -> Result<CommitId> {
        let workdir = self.repo.workdir().ok_or_else(|| {
            SemrelError::Git(git2::Error::from_str("cannot commit in a bare repository"))
        })?;
        let parent = self.repo.head()?.peel_to_commit()?;
        let parent_tree = parent.tree()?;

        // Build the release tree from HEAD plus `paths` only; whatever else
        // is staged or modified stays out of the commit.
        let mut index = git2::Index::new()?;
        index.read_tree(&parent_tree)?;
        for path in paths {
            let content = fs::read(workdir.join(path))?;
            let mode = parent_tree
                .get_path(path)
                .map(|entry| entry.filemode() as u32)
                .unwrap_or(0o100644);
            let entry = git2::IndexEntry {
                ctime: git2::IndexTime::new(0, 0),
                mtime: git2::IndexTime::new(0, 0),
                dev: 0,
                ino: 0,
                mode,
                uid: 0,
                gid: 0,
                file_size: content.len() as u32,
                id: Oid::zero(),
                flags: 0,
                flags_extended: 0,
                path: path.to_string_lossy().replace('\\', "/").into_bytes(),
            };
            index.add_frombuffer(&entry, &content)?;
        }

        let tree_id = index.write_tree_to(&self.repo)?;
        let tree = self.repo.find_tree(tree_id)?;
        let signature = self.repo.signature()?;

        let oid = self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &[&parent],
        )?;

        // Keep the on-disk index in line with the new HEAD for these paths
        let mut staged = self.repo.index()?;
        for path in paths {
            staged.add_path(path)?;
        }
        staged.write()?;

        log::debug!("Committed {} '{}' ({} file(s))", oid, message, paths.len());
        Ok(oid.into())
    }

    fn create_or_move_tag(&self, name: &str, commit: &CommitId) -> Result<()> {
        let object = self.repo.find_object(to_oid(commit)?, None)?;

        // force = true re-points an existing ref in place
        self.repo.tag_lightweight(name, &object, true)?;

        Ok(())
    }

    fn commit_messages_since(&self, since: Option<&CommitId>) -> Result<Vec<String>> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::REVERSE)?;
        revwalk.push_head()?;

        if let Some(since) = since {
            revwalk.hide(to_oid(since)?)?;
        }

        let mut messages = Vec::new();
        for oid in revwalk {
            let commit = self.repo.find_commit(oid?)?;
            messages.push(commit.message().unwrap_or_default().to_string());
        }

        Ok(messages)
    }
}

/// Pushes refs of a [Git2Repository] to one remote
pub struct Git2Remote<'repo> {
    repo: &'repo Git2Repo,
    remote: String,
    branch: String,
    push_url: Option<String>,
    token: Option<String>,
}

impl<'repo> Git2Remote<'repo> {
    /// Push to an explicit URL instead of the remote's configured one
    pub fn with_push_url(mut self, url: impl Into<String>) -> Self {
        self.push_url = Some(url.into());
        self
    }

    /// Token offered when the server asks for username/password
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn open(&self) -> Result<git2::Remote<'repo>> {
        match &self.push_url {
            Some(url) => self.repo.remote_anonymous(url),
            None => self.repo.find_remote(&self.remote),
        }
        .map_err(|e| SemrelError::transport(format!("Cannot find remote '{}': {}", self.remote, e)))
    }

    fn callbacks(&self) -> git2::RemoteCallbacks<'static> {
        let token = self.token.clone();
        let mut attempts = 0;
        let mut callbacks = git2::RemoteCallbacks::new();
        callbacks.credentials(move |_url, username_from_url, allowed_types| {
            attempts += 1;
            if attempts > MAX_CREDENTIAL_ATTEMPTS {
                return Err(git2::Error::from_str("Authentication failed"));
            }

            if allowed_types.contains(git2::CredentialType::USER_PASS_PLAINTEXT) {
                if let Some(token) = &token {
                    return git2::Cred::userpass_plaintext(
                        username_from_url.unwrap_or("oauth2"),
                        token,
                    );
                }
            }

            if allowed_types.contains(git2::CredentialType::SSH_KEY) {
                let user = username_from_url.unwrap_or("git");
                if let Some(home) = dirs::home_dir() {
                    for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                        let path = home.join(".ssh").join(key);
                        if path.exists() {
                            if let Ok(cred) = git2::Cred::ssh_key(user, None, &path, None) {
                                return Ok(cred);
                            }
                        }
                    }
                }
                if let Ok(cred) = git2::Cred::ssh_key_from_agent(user) {
                    return Ok(cred);
                }
            }

            git2::Cred::default()
        });
        callbacks
    }

    fn transport_error(&self, action: &str, e: git2::Error) -> SemrelError {
        let kind = match e.class() {
            git2::ErrorClass::Net => "network error",
            git2::ErrorClass::Ssh | git2::ErrorClass::Http => "authentication/transport error",
            git2::ErrorClass::Reference => "reference error",
            _ => "remote operation failed",
        };
        SemrelError::transport(format!("{} {} '{}': {}", kind, action, self.remote, e))
    }

    fn push(&self, refspec: &str) -> Result<()> {
        let mut remote = self.open()?;

        let mut callbacks = self.callbacks();
        // A rejected ref update is reported here, not as a push error
        callbacks.push_update_reference(|refname, status| match status {
            Some(status) => Err(git2::Error::from_str(&format!(
                "remote rejected {}: {}",
                refname, status
            ))),
            None => Ok(()),
        });

        let mut push_options = git2::PushOptions::new();
        push_options.remote_callbacks(callbacks);

        remote
            .push(&[refspec], Some(&mut push_options))
            .map_err(|e| self.transport_error(&format!("pushing '{}' to", refspec), e))?;

        log::debug!("Pushed {} to {}", refspec, self.remote);
        Ok(())
    }
}

impl RemoteHandle for Git2Remote<'_> {
    fn state(&self) -> Result<RemoteState> {
        let mut remote = self.open()?;
        let connection = remote
            .connect_auth(git2::Direction::Fetch, Some(self.callbacks()), None)
            .map_err(|e| self.transport_error("connecting to", e))?;
        let heads = connection
            .list()
            .map_err(|e| self.transport_error("listing refs of", e))?;

        let branch_ref = format!("refs/heads/{}", self.branch);
        let mut state = RemoteState::default();
        let mut peeled = TagSnapshot::new();
        for head in heads {
            let name = head.name();
            if name == branch_ref {
                state.head = Some(head.oid().into());
            } else if let Some(tag) = name.strip_prefix("refs/tags/") {
                match tag.strip_suffix("^{}") {
                    Some(annotated) => peeled.insert(annotated.to_string(), head.oid().into()),
                    None => state.tags.insert(tag.to_string(), head.oid().into()),
                };
            }
        }
        // Annotated tags: the peeled entry names the commit
        state.tags.extend(peeled);

        log::debug!("Remote {} has {} tag(s)", self.remote, state.tags.len());
        Ok(state)
    }

    fn push_commits(&self) -> Result<()> {
        self.push(&format!("refs/heads/{0}:refs/heads/{0}", self.branch))
    }

    fn push_tag(&self, name: &str) -> Result<()> {
        // Forced so moved convenience tags update on the remote too
        self.push(&format!("+refs/tags/{0}:refs/tags/{0}", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn init_repo() -> (TempDir, Git2Repository) {
        let dir = TempDir::new().unwrap();
        let repo = Git2Repo::init(dir.path()).unwrap();
        {
            let mut config = repo.config().unwrap();
            config.set_str("user.name", "Test User").unwrap();
            config.set_str("user.email", "test@example.com").unwrap();
        }
        let repo = Git2Repository::from_git2(repo, "v");
        (dir, repo)
    }

    fn commit_file(dir: &TempDir, repo: &Git2Repository, content: &str, message: &str) -> CommitId {
        fs::write(dir.path().join("README.md"), content).unwrap();
        let mut index = repo.repo.index().unwrap();
        index.add_path(Path::new("README.md")).unwrap();
        index.write().unwrap();
        let tree = repo.repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = repo.repo.signature().unwrap();
        let parents = match repo.repo.head() {
            Ok(head) => vec![head.peel_to_commit().unwrap()],
            Err(_) => vec![],
        };
        let parent_refs: Vec<_> = parents.iter().collect();
        repo.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .unwrap()
            .into()
    }

    #[test]
    fn test_current_version_ignores_convenience_and_foreign_tags() {
        let (dir, repo) = init_repo();
        let c1 = commit_file(&dir, &repo, "one\n", "feat: one");
        for name in ["v0.1.0", "v0.2.0-rc.1", "v0", "v0.2", "nightly", "v0.1.5"] {
            repo.create_or_move_tag(name, &c1).unwrap();
        }
        assert_eq!(
            repo.current_version().unwrap().map(|v| v.to_string()),
            Some("0.2.0-rc.1".to_string())
        );
    }

    #[test]
    fn test_current_version_none_without_tags() {
        let (dir, repo) = init_repo();
        commit_file(&dir, &repo, "one\n", "feat: one");
        assert_eq!(repo.current_version().unwrap(), None);
    }

    #[test]
    fn test_create_or_move_tag_repoints() {
        let (dir, repo) = init_repo();
        let c1 = commit_file(&dir, &repo, "one\n", "feat: one");
        let c2 = commit_file(&dir, &repo, "two\n", "fix: two");

        repo.create_or_move_tag("v0", &c1).unwrap();
        assert_eq!(repo.tags().unwrap().get("v0"), Some(&c1));

        repo.create_or_move_tag("v0", &c2).unwrap();
        assert_eq!(repo.tags().unwrap().get("v0"), Some(&c2));
        assert_eq!(repo.head().unwrap(), c2);
    }

    #[test]
    fn test_pending_changes_and_commit() {
        let (dir, repo) = init_repo();
        let c1 = commit_file(&dir, &repo, "one\n", "feat: one");
        let stamped = vec![PathBuf::from("README.md")];
        assert!(!repo.has_pending_changes(&stamped).unwrap());
        assert!(!repo.has_pending_changes(&[]).unwrap());

        fs::write(dir.path().join("README.md"), "changed\n").unwrap();
        assert!(repo.has_pending_changes(&stamped).unwrap());

        let c2 = repo.commit("chore(release): 0.1.0", &stamped).unwrap();
        assert_ne!(c1, c2);
        assert_eq!(repo.head().unwrap(), c2);
        assert!(!repo.has_pending_changes(&stamped).unwrap());
    }

    #[test]
    fn test_release_commit_leaves_unrelated_changes_alone() {
        let (dir, repo) = init_repo();
        fs::write(dir.path().join("secret.rs"), "fn main() {}\n").unwrap();
        {
            let mut index = repo.repo.index().unwrap();
            index.add_path(Path::new("secret.rs")).unwrap();
            index.write().unwrap();
        }
        commit_file(&dir, &repo, "version = \"0.0.0\"\n", "feat: one");

        fs::write(dir.path().join("README.md"), "version = \"0.1.0\"\n").unwrap();
        fs::write(dir.path().join("secret.rs"), "WIP do not commit\n").unwrap();

        let stamped = vec![PathBuf::from("README.md")];
        let release = repo.commit("chore(release): 0.1.0", &stamped).unwrap();

        let tree = repo
            .repo
            .find_commit(to_oid(&release).unwrap())
            .unwrap()
            .tree()
            .unwrap();
        let blob_text = |name: &str| {
            let entry = tree.get_path(Path::new(name)).unwrap();
            let blob = repo.repo.find_blob(entry.id()).unwrap();
            String::from_utf8(blob.content().to_vec()).unwrap()
        };
        assert_eq!(blob_text("README.md"), "version = \"0.1.0\"\n");
        assert_eq!(blob_text("secret.rs"), "fn main() {}\n");

        assert!(!repo.has_pending_changes(&stamped).unwrap());
        assert!(repo
            .has_pending_changes(&[PathBuf::from("secret.rs")])
            .unwrap());
        assert_eq!(
            fs::read_to_string(dir.path().join("secret.rs")).unwrap(),
            "WIP do not commit\n"
        );
    }

    #[test]
    fn test_remote_state_lists_branch_and_tags() {
        let (dir, repo) = init_repo();
        let c1 = commit_file(&dir, &repo, "one\n", "feat: one");
        let origin = TempDir::new().unwrap();
        Git2Repo::init_bare(origin.path()).unwrap();
        repo.repo
            .remote("origin", origin.path().to_str().unwrap())
            .unwrap();

        let remote = repo.remote("origin").unwrap();
        assert_eq!(remote.state().unwrap(), RemoteState::default());

        repo.create_or_move_tag("v0.1.0", &c1).unwrap();
        remote.push_commits().unwrap();
        remote.push_tag("v0.1.0").unwrap();

        let state = remote.state().unwrap();
        assert_eq!(state.head, Some(c1.clone()));
        assert!(state.has_tag_at("v0.1.0", &c1));
    }

    #[test]
    fn test_commit_messages_since() {
        let (dir, repo) = init_repo();
        let c1 = commit_file(&dir, &repo, "one\n", "feat: one");
        commit_file(&dir, &repo, "two\n", "fix: two");
        commit_file(&dir, &repo, "three\n", "docs: three");

        let all = repo.commit_messages_since(None).unwrap();
        assert_eq!(all.len(), 3);
        assert!(all[0].starts_with("feat: one"));

        let since = repo.commit_messages_since(Some(&c1)).unwrap();
        assert_eq!(since.len(), 2);
        assert!(since[0].starts_with("fix: two"));
        assert!(since[1].starts_with("docs: three"));
    }

    #[test]
    fn test_current_branch() {
        let (dir, repo) = init_repo();
        commit_file(&dir, &repo, "one\n", "feat: one");
        let branch = repo.current_branch().unwrap();
        assert!(!branch.is_empty());
        assert_ne!(branch, "HEAD");
    }
}
