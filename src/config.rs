use crate::domain::TagNamingConfig;
use crate::error::{Result, SemrelError};
use crate::hvcs::gitlab::DEFAULT_ENV_TOKEN_NAME;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Represents the complete configuration for git-semrel.
///
/// Contains tag naming, commit parsing, publishing and hosted VCS settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub tags: TagNamingConfig,

    #[serde(default)]
    pub commit_parser: CommitParserConfig,

    #[serde(default)]
    pub publish: PublishConfig,

    #[serde(default)]
    pub hvcs: HvcsConfig,
}

fn default_minor_types() -> Vec<String> {
    vec!["feat".to_string()]
}

fn default_patch_types() -> Vec<String> {
    vec!["fix".to_string(), "perf".to_string()]
}

/// Returns the default list of breaking change indicators.
fn default_breaking_change_indicators() -> Vec<String> {
    vec![
        "BREAKING CHANGE:".to_string(),
        "BREAKING-CHANGE:".to_string(),
    ]
}

/// Configuration for conventional commit classification.
///
/// Commit types not listed in either set never trigger a release.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CommitParserConfig {
    #[serde(default = "default_minor_types")]
    pub minor_types: Vec<String>,

    #[serde(default = "default_patch_types")]
    pub patch_types: Vec<String>,

    /// Footer prefixes marking a breaking change
    #[serde(default = "default_breaking_change_indicators")]
    pub breaking_change_indicators: Vec<String>,
}

impl Default for CommitParserConfig {
    fn default() -> Self {
        CommitParserConfig {
            minor_types: default_minor_types(),
            patch_types: default_patch_types(),
            breaking_change_indicators: default_breaking_change_indicators(),
        }
    }
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_commit_message() -> String {
    "chore(release): {version}".to_string()
}

fn default_true() -> bool {
    true
}

fn default_prerelease_token() -> String {
    "rc".to_string()
}

/// Configuration for the publish steps.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PublishConfig {
    #[serde(default = "default_remote")]
    pub remote: String,

    /// Release commit message; `{version}` is replaced by the new version
    #[serde(default = "default_commit_message")]
    pub commit_message: String,

    #[serde(default = "default_true")]
    pub push: bool,

    #[serde(default = "default_true")]
    pub vcs_release: bool,

    /// `path:variable` entries stamped with the new version
    #[serde(default)]
    pub version_variables: Vec<String>,

    #[serde(default = "default_prerelease_token")]
    pub prerelease_token: String,
}

impl PublishConfig {
    pub fn commit_message_for(&self, version: &str) -> String {
        self.commit_message.replace("{version}", version)
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        PublishConfig {
            remote: default_remote(),
            commit_message: default_commit_message(),
            push: true,
            vcs_release: true,
            version_variables: Vec::new(),
            prerelease_token: default_prerelease_token(),
        }
    }
}

/// Hosted VCS flavour
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum HvcsKind {
    #[default]
    None,
    Gitlab,
}

fn default_token_env() -> String {
    DEFAULT_ENV_TOKEN_NAME.to_string()
}

/// Configuration for hosted release creation.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct HvcsConfig {
    #[serde(default)]
    pub kind: HvcsKind,

    #[serde(default)]
    pub domain: Option<String>,

    /// `owner/name`; derived from CI variables or the remote URL when unset
    #[serde(default)]
    pub project: Option<String>,

    /// Name of the environment variable holding the API token
    #[serde(default = "default_token_env")]
    pub token_env: String,

    #[serde(default)]
    pub allow_insecure: bool,
}

impl HvcsConfig {
    /// Token from the configured environment variable, if set and non-empty
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env).ok().filter(|t| !t.is_empty())
    }
}

impl Default for HvcsConfig {
    fn default() -> Self {
        HvcsConfig {
            kind: HvcsKind::None,
            domain: None,
            project: None,
            token_env: default_token_env(),
            allow_insecure: false,
        }
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `semrel.toml` in current directory
/// 3. `.semrel.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Arguments
/// * `config_path` - Optional path to custom configuration file
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let config_str = if let Some(path) = config_path {
        fs::read_to_string(path)
            .map_err(|e| SemrelError::config(format!("Cannot read {}: {}", path, e)))?
    } else if Path::new("./semrel.toml").exists() {
        fs::read_to_string("./semrel.toml")?
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(".semrel.toml");
        if config_path.exists() {
            log::debug!("Using config {}", config_path.display());
            fs::read_to_string(config_path)?
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    parse_config(&config_str)
}

/// Parse configuration from TOML text
pub fn parse_config(text: &str) -> Result<Config> {
    toml::from_str(text).map_err(|e| SemrelError::config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.tags.tag_prefix, "v");
        assert!(!config.tags.enable_convenience_tags);
        assert_eq!(config.commit_parser.minor_types, vec!["feat"]);
        assert_eq!(config.commit_parser.patch_types, vec!["fix", "perf"]);
        assert_eq!(config.publish.remote, "origin");
        assert!(config.publish.push);
        assert!(config.publish.vcs_release);
        assert_eq!(config.publish.prerelease_token, "rc");
        assert_eq!(config.hvcs.kind, HvcsKind::None);
        assert_eq!(config.hvcs.token_env, "GITLAB_TOKEN");
    }

    #[test]
    fn test_empty_text_is_default() {
        assert_eq!(parse_config("").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config = parse_config(
            r#"
[tags]
enable_convenience_tags = true

[hvcs]
kind = "gitlab"
domain = "https://gitlab.example.com"
"#,
        )
        .unwrap();
        assert!(config.tags.enable_convenience_tags);
        assert_eq!(config.tags.tag_prefix, "v");
        assert_eq!(config.hvcs.kind, HvcsKind::Gitlab);
        assert_eq!(config.hvcs.domain.as_deref(), Some("https://gitlab.example.com"));
        assert_eq!(config.hvcs.token_env, "GITLAB_TOKEN");
    }

    #[test]
    fn test_unknown_hvcs_kind_is_error() {
        let err = parse_config("[hvcs]\nkind = \"svn\"\n").unwrap_err();
        assert!(matches!(err, SemrelError::Config(_)));
    }

    #[test]
    fn test_commit_message_placeholder() {
        let publish = PublishConfig::default();
        assert_eq!(publish.commit_message_for("1.2.3"), "chore(release): 1.2.3");
    }

    #[test]
    #[serial]
    fn test_token_from_configured_env() {
        let hvcs = HvcsConfig {
            token_env: "SEMREL_TEST_TOKEN".to_string(),
            ..Default::default()
        };
        std::env::set_var("SEMREL_TEST_TOKEN", "abc");
        assert_eq!(hvcs.token().as_deref(), Some("abc"));
        std::env::set_var("SEMREL_TEST_TOKEN", "");
        assert_eq!(hvcs.token(), None);
        std::env::remove_var("SEMREL_TEST_TOKEN");
    }
}
