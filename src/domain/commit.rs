use regex::Regex;

/// Parsed representation of a conventional commit message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommit {
    pub r#type: String,
    pub scope: Option<String>,
    pub description: String,
    /// `!` marker on the header
    pub breaking_marker: bool,
}

const HEADER_PATTERN: &str = r"^(?P<type>[a-z]+)(?:\((?P<scope>[^)]+)\))?(?P<bang>!?):\s*(?P<desc>.*)";

impl ParsedCommit {
    /// Parse the header of a commit message according to conventional commits
    ///
    /// Supports formats:
    /// - type(scope)!: description
    /// - type(scope): description
    /// - type!: description
    /// - type: description
    ///
    /// Anything else yields `None`. Breaking-change footers are a matter of
    /// configuration and are checked by the classifier, not here.
    pub fn parse(message: &str) -> Option<Self> {
        let header = message.lines().next().unwrap_or_default();
        let captures = Regex::new(HEADER_PATTERN).ok()?.captures(header)?;

        let r#type = captures.name("type")?.as_str().to_string();
        let scope = captures.name("scope").map(|m| m.as_str().to_string());
        let breaking_marker = captures.name("bang").map(|m| m.as_str()) == Some("!");
        let description = captures
            .name("desc")
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();

        Some(ParsedCommit {
            r#type,
            scope,
            description,
            breaking_marker,
        })
    }
}
