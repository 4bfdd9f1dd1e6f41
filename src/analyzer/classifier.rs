use crate::config::CommitParserConfig;
use crate::domain::{BumpLevel, ParsedCommit};

/// Derives the historical bump signal from a range of commit messages
pub trait CommitClassifier {
    /// Highest bump level the commits call for
    ///
    /// # Returns
    /// * `Some(BumpLevel)` - At least one qualifying commit
    /// * `None` - No commit calls for a release
    fn classify(&self, messages: &[String]) -> Option<BumpLevel>;
}

/// Conventional-commits classifier driven by `[commit_parser]` configuration
pub struct ConventionalClassifier {
    config: CommitParserConfig,
}

impl ConventionalClassifier {
    pub fn new(config: CommitParserConfig) -> Self {
        ConventionalClassifier { config }
    }

    /// Bump level for a single commit message
    pub fn classify_message(&self, message: &str) -> Option<BumpLevel> {
        let parsed = ParsedCommit::parse(message)?;

        let breaking_footer = message.lines().skip(1).any(|line| {
            let line = line.trim_start();
            self.config
                .breaking_change_indicators
                .iter()
                .any(|indicator| line.starts_with(indicator.as_str()))
        });
        if parsed.breaking_marker || breaking_footer {
            return Some(BumpLevel::Major);
        }

        if self.config.minor_types.contains(&parsed.r#type) {
            Some(BumpLevel::Minor)
        } else if self.config.patch_types.contains(&parsed.r#type) {
            Some(BumpLevel::Patch)
        } else {
            None
        }
    }

}

impl CommitClassifier for ConventionalClassifier {
    fn classify(&self, messages: &[String]) -> Option<BumpLevel> {
        messages
            .iter()
            .filter_map(|message| self.classify_message(message))
            .max()
    }
}
