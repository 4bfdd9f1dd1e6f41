use crate::analyzer::ConventionalClassifier;
use crate::domain::ParsedCommit;
use crate::hvcs::ReleasePublisher;
use regex::{Captures, Regex};

/// Minimal release notes: one bullet per commit that qualifies for a bump,
/// followed by a compare link when one is available.
///
/// Issue (`#12`) and merge request (`!34`) references are linked when
/// `publisher` knows their web URL.
pub fn release_notes<P: ReleasePublisher + ?Sized>(
    classifier: &ConventionalClassifier,
    messages: &[String],
    compare_url: Option<&str>,
    publisher: &P,
) -> String {
    let mut notes: Vec<String> = messages
        .iter()
        .filter(|message| classifier.classify_message(message).is_some())
        .filter_map(|message| ParsedCommit::parse(message))
        .map(|commit| {
            let description = link_references(&commit.description, publisher);
            match commit.scope {
                Some(scope) => format!("- **{}**: {}", scope, description),
                None => format!("- {}", description),
            }
        })
        .collect();

    if let Some(url) = compare_url {
        if !notes.is_empty() {
            notes.push(String::new());
        }
        notes.push(format!("**Full Changelog**: {}", url));
    }

    notes.join("\n")
}

fn link_references<P: ReleasePublisher + ?Sized>(text: &str, publisher: &P) -> String {
    let re = match Regex::new(r"(^|[^\w\[/])([#!])(\d+)\b") {
        Ok(re) => re,
        Err(_) => return text.to_string(),
    };

    re.replace_all(text, |caps: &Captures| {
        let reference = format!("{}{}", &caps[2], &caps[3]);
        let url = match &caps[2] {
            "#" => publisher.issue_url(&reference),
            _ => publisher.merge_request_url(&reference),
        };
        match url {
            Some(url) => format!("{}[{}]({})", &caps[1], reference, url),
            None => caps[0].to_string(),
        }
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CommitParserConfig;
    use crate::hvcs::{GitLab, GitLabOptions, NullPublisher};

    #[test]
    fn test_notes_list_qualifying_commits() {
        let classifier = ConventionalClassifier::new(CommitParserConfig::default());
        let messages = vec![
            "feat(cli): add --noop".to_string(),
            "docs: typo".to_string(),
            "fix: handle detached HEAD".to_string(),
        ];
        assert_eq!(
            release_notes(&classifier, &messages, None, &NullPublisher),
            "- **cli**: add --noop\n- handle detached HEAD"
        );
    }

    #[test]
    fn test_notes_with_compare_link() {
        let classifier = ConventionalClassifier::new(CommitParserConfig::default());
        let messages = vec!["fix: one".to_string()];
        let notes = release_notes(
            &classifier,
            &messages,
            Some("https://host/p/-/compare/v1...v2"),
            &NullPublisher,
        );
        assert_eq!(
            notes,
            "- one\n\n**Full Changelog**: https://host/p/-/compare/v1...v2"
        );
    }

    #[test]
    fn test_notes_empty_history() {
        let classifier = ConventionalClassifier::new(CommitParserConfig::default());
        assert_eq!(release_notes(&classifier, &[], None, &NullPublisher), "");
    }

    #[test]
    fn test_notes_link_issue_and_merge_request_references() {
        let classifier = ConventionalClassifier::new(CommitParserConfig::default());
        let gitlab = GitLab::new("git@gitlab.com:acme/widget.git", GitLabOptions::default()).unwrap();
        let messages = vec![
            "fix: crash on empty tag (#12)".to_string(),
            "feat: prune old tags !34".to_string(),
            "fix: see [#5](https://elsewhere) and a/#6".to_string(),
        ];
        assert_eq!(
            release_notes(&classifier, &messages, None, &gitlab),
            "- crash on empty tag ([#12](https://gitlab.com/acme/widget/-/issues/12))\n\
             - prune old tags [!34](https://gitlab.com/acme/widget/-/merge_requests/34)\n\
             - see [#5](https://elsewhere) and a/#6"
        );
    }

    #[test]
    fn test_notes_keep_references_without_host() {
        let classifier = ConventionalClassifier::new(CommitParserConfig::default());
        let messages = vec!["fix: crash (#12)".to_string()];
        assert_eq!(
            release_notes(&classifier, &messages, None, &NullPublisher),
            "- crash (#12)"
        );
    }
}
