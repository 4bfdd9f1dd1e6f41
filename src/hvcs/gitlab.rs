use crate::error::{Result, SemrelError};
use crate::hvcs::ReleasePublisher;
use regex::Regex;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{Method, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const DEFAULT_DOMAIN: &str = "https://gitlab.com";
const USER_AGENT: &str = concat!("git-semrel/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default environment variable holding the API token
pub const DEFAULT_ENV_TOKEN_NAME: &str = "GITLAB_TOKEN";

/// Connection options for [GitLab]
#[derive(Debug, Clone, Default)]
pub struct GitLabOptions {
    /// Server URL, e.g. "https://gitlab.example.com"; gitlab.com when unset
    pub domain: Option<String>,
    /// Project path "group/name"; parsed from the remote URL when unset
    pub project: Option<String>,
    pub token: Option<String>,
    /// Accept a plain `http://` domain
    pub allow_insecure: bool,
}

impl GitLabOptions {
    /// Fill unset fields from GitLab CI variables
    ///
    /// `CI_SERVER_URL` provides the domain, `CI_PROJECT_NAMESPACE` and
    /// `CI_PROJECT_NAME` together provide the project.
    pub fn with_ci_env(mut self) -> Self {
        if self.domain.is_none() {
            self.domain = std::env::var("CI_SERVER_URL").ok().filter(|s| !s.is_empty());
        }
        if self.project.is_none() {
            if let (Ok(namespace), Ok(name)) = (
                std::env::var("CI_PROJECT_NAMESPACE"),
                std::env::var("CI_PROJECT_NAME"),
            ) {
                log::debug!("Using project from GitLab CI environment variables");
                self.project = Some(format!("{}/{}", namespace, name));
            }
        }
        self
    }
}

/// A release as returned by the releases API
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Release {
    pub name: Option<String>,
    pub tag_name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// GitLab releases client
pub struct GitLab {
    client: Client,
    base: Url,
    domain: String,
    project: String,
    token: Option<String>,
    remote_url: String,
}

impl GitLab {
    /// Create a client for the project behind `remote_url`
    ///
    /// # Errors
    /// * `Config` - insecure or unparsable domain, or no project could be determined
    /// * `Hvcs` - the HTTP client could not be built
    pub fn new(remote_url: &str, options: GitLabOptions) -> Result<Self> {
        let base = normalize_domain(
            options.domain.as_deref().unwrap_or(DEFAULT_DOMAIN),
            options.allow_insecure,
        )?;
        let domain = base.as_str().trim_end_matches('/').to_string();

        let project = match options.project {
            Some(project) => project.trim_matches('/').to_string(),
            None => project_path_from_remote(remote_url).ok_or_else(|| {
                SemrelError::config(format!(
                    "Cannot determine GitLab project from remote URL '{}'",
                    remote_url
                ))
            })?,
        };

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| SemrelError::hvcs(format!("Failed to create HTTP client: {}", e)))?;

        Ok(GitLab {
            client,
            base,
            domain,
            project,
            token: options.token,
            remote_url: remote_url.to_string(),
        })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Remote URL to push to, carrying the token when requested and available
    ///
    /// # Errors
    /// `Config` when the token cannot be placed in the server URL
    pub fn remote_url(&self, use_token: bool) -> Result<String> {
        let token = match (&self.token, use_token) {
            (Some(token), true) => token,
            _ => return Ok(self.remote_url.clone()),
        };

        let mut url = self.project_url(&[])?;
        let path = format!("{}.git", url.path());
        url.set_path(&path);
        let rejected = |_: ()| SemrelError::config("GitLab domain cannot carry credentials");
        url.set_username("gitlab-ci-token").map_err(rejected)?;
        url.set_password(Some(token)).map_err(rejected)?;
        Ok(url.into())
    }

    pub fn commit_hash_url(&self, commit_hash: &str) -> Option<String> {
        self.web_url(&["-", "commit", commit_hash])
    }

    /// Web URL of an issue; any prefix before the trailing number (`#`,
    /// `GL-`) is ignored
    pub fn issue_url(&self, issue: &str) -> Option<String> {
        self.web_url(&["-", "issues", trailing_number(issue)?])
    }

    /// Web URL of a merge request; `!12` and `12` are both accepted
    pub fn merge_request_url(&self, merge_request: &str) -> Option<String> {
        self.web_url(&["-", "merge_requests", trailing_number(merge_request)?])
    }

    /// Server URL extended by the project path and `tail`
    fn project_url(&self, tail: &[&str]) -> Result<Url> {
        with_segments(&self.base, self.project.split('/').chain(tail.iter().copied()))
    }

    fn web_url(&self, tail: &[&str]) -> Option<String> {
        self.project_url(tail).ok().map(String::from)
    }

    /// Releases endpoint of the project; the project path and tag are each
    /// a single encoded segment
    fn releases_api(&self, tag: Option<&str>) -> Result<Url> {
        let segments = ["api", "v4", "projects", self.project.as_str(), "releases"];
        with_segments(&self.base, segments.into_iter().chain(tag))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut request = self.client.request(method, url);
        if let Some(token) = &self.token {
            request = request.header("PRIVATE-TOKEN", token);
        }
        request
    }

    fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        request
            .send()
            .map_err(|e| SemrelError::transport(format!("{} failed: {}", what, e)))
    }

    /// Create a release for an existing tag
    ///
    /// # Errors
    /// * `Transport` - the request could not be sent
    /// * `Hvcs` - the server rejected the request
    pub fn create_release(&self, tag: &str, notes: &str) -> Result<String> {
        log::info!("Creating release for {}", tag);

        let body = json!({
            "name": tag,
            "tag_name": tag,
            "tag_message": tag,
            "description": notes,
        });
        let response = self.send(
            self.request(Method::POST, self.releases_api(None)?).json(&body),
            "Release creation",
        )?;

        let status = response.status();
        if !status.is_success() {
            return Err(rejected("create release", tag, status));
        }

        log::info!("Successfully created release for {}", tag);
        Ok(tag.to_string())
    }

    /// Look up the release for a tag; `None` when there is none
    pub fn get_release_by_tag(&self, tag: &str) -> Result<Option<Release>> {
        let url = self.releases_api(Some(tag))?;
        let response = self.send(self.request(Method::GET, url), "Release lookup")?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                log::debug!("Release {} not found", tag);
                Ok(None)
            }
            status if status.is_success() => response
                .json::<Release>()
                .map(Some)
                .map_err(|e| SemrelError::hvcs(format!("Unexpected release response: {}", e))),
            status => Err(rejected("get release", tag, status)),
        }
    }

    /// Replace the notes of the release for a tag
    pub fn edit_release_notes(&self, tag: &str, notes: &str) -> Result<String> {
        log::info!("Updating release {}", tag);

        let url = self.releases_api(Some(tag))?;
        let response = self.send(
            self.request(Method::PUT, url)
                .json(&json!({ "description": notes })),
            "Release update",
        )?;

        let status = response.status();
        if !status.is_success() {
            return Err(rejected("update release", tag, status));
        }
        Ok(tag.to_string())
    }

    /// Create the release, or update its notes if it already exists
    ///
    /// Transport failures are returned as-is; only a server-side rejection
    /// of the creation falls back to updating.
    pub fn create_or_update_release(&self, tag: &str, notes: &str) -> Result<String> {
        match self.create_release(tag, notes) {
            Ok(id) => return Ok(id),
            Err(SemrelError::Hvcs(reason)) => {
                log::info!(
                    "New release {} could not be created for project {}: {}",
                    tag,
                    self.project,
                    reason
                );
            }
            Err(e) => return Err(e),
        }

        match self.get_release_by_tag(tag)? {
            Some(release) => {
                log::debug!("Found existing release {}, updating", release.tag_name);
                self.edit_release_notes(&release.tag_name, notes)
            }
            None => Err(SemrelError::hvcs(format!(
                "release for tag {} could not be found, and could not be created",
                tag
            ))),
        }
    }
}

impl ReleasePublisher for GitLab {
    fn create_release(&self, tag: &str, notes: &str) -> Result<String> {
        self.create_or_update_release(tag, notes)
    }

    fn compare_url(&self, from: &str, to: &str) -> Option<String> {
        self.web_url(&["-", "compare", &format!("{}...{}", from, to)])
    }

    /// Release page for `tag`; an empty tag gives the project's release list
    fn release_url(&self, tag: &str) -> Option<String> {
        self.web_url(&["-", "releases", tag.trim()])
    }

    fn issue_url(&self, issue: &str) -> Option<String> {
        GitLab::issue_url(self, issue)
    }

    fn merge_request_url(&self, merge_request: &str) -> Option<String> {
        GitLab::merge_request_url(self, merge_request)
    }
}

fn rejected(action: &str, tag: &str, status: StatusCode) -> SemrelError {
    let hint = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => " (check the API token)",
        _ => "",
    };
    SemrelError::hvcs(format!(
        "GitLab refused to {} for {}: HTTP {}{}",
        action, tag, status, hint
    ))
}

/// Append percent-encoded path segments to `base`
fn with_segments<'a>(base: &Url, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| SemrelError::config(format!("GitLab domain '{}' cannot carry a path", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn trailing_number(reference: &str) -> Option<&str> {
    let re = Regex::new(r"(\d+)$").ok()?;
    Some(re.captures(reference.trim())?.get(1)?.as_str())
}

/// Reduce a server URL to `scheme://host[:port][/path]`, dropping user
/// info, query, fragment and trailing slashes.
fn normalize_domain(domain: &str, allow_insecure: bool) -> Result<Url> {
    let with_scheme = if domain.contains("://") {
        domain.to_string()
    } else {
        format!("https://{}", domain)
    };

    let mut url = Url::parse(&with_scheme)
        .map_err(|e| SemrelError::config(format!("Invalid GitLab domain '{}': {}", domain, e)))?;

    match url.scheme() {
        "https" => {}
        "http" if allow_insecure => {
            log::warn!("Using insecure connection to {}", domain);
        }
        "http" => {
            return Err(SemrelError::config(format!(
                "Insecure GitLab domain '{}' requires allow_insecure",
                domain
            )));
        }
        other => {
            return Err(SemrelError::config(format!(
                "Unsupported scheme '{}' in GitLab domain '{}'",
                other, domain
            )));
        }
    }

    let invalid = |_: ()| SemrelError::config(format!("Invalid GitLab domain '{}'", domain));
    url.set_username("").map_err(invalid)?;
    url.set_password(None).map_err(invalid)?;
    url.set_query(None);
    url.set_fragment(None);
    let path = url.path().trim_end_matches('/').to_string();
    url.set_path(&path);

    Ok(url)
}

/// Extract "group/[subgroup/]name" from an HTTPS, SSH or scp-like remote URL
fn project_path_from_remote(remote_url: &str) -> Option<String> {
    let parsed = Url::parse(remote_url)
        .ok()
        .filter(|url| url.host_str().is_some_and(|host| !host.is_empty()));
    let path = match parsed {
        Some(url) => url.path().to_string(),
        None => {
            let scp_form = Regex::new(r"^(?:[^@/]+@)?[^:/]+:(?P<path>[^/].*)$").ok()?;
            scp_form.captures(remote_url)?.name("path")?.as_str().to_string()
        }
    };

    let path = path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);

    path.contains('/').then(|| path.to_string())
}
