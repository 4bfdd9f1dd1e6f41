//! Writing the new version into tracked files
//!
//! Each `path:variable` entry rewrites lines of the form
//! `variable = "x"` or `variable: "x"` (quotes optional) in `path`.

use crate::domain::Version;
use crate::error::{Result, SemrelError};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// One `path:variable` declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionVariable {
    pub path: PathBuf,
    pub variable: String,
}

impl VersionVariable {
    /// Parse a `path:variable` declaration
    pub fn parse(declaration: &str) -> Result<Self> {
        let (path, variable) = declaration
            .rsplit_once(':')
            .filter(|(path, variable)| !path.is_empty() && !variable.trim().is_empty())
            .ok_or_else(|| {
                SemrelError::config(format!(
                    "Invalid version variable '{}', expected 'path:variable'",
                    declaration
                ))
            })?;
        Ok(VersionVariable {
            path: PathBuf::from(path),
            variable: variable.trim().to_string(),
        })
    }

    fn pattern(&self) -> Result<Regex> {
        let expr = format!(
            r#"(?m)^(?P<lead>[ \t]*{}[ \t]*[:=][ \t]*)(?P<quote>["']?)[^"'\s,]*(?P<end>["']?)"#,
            regex::escape(&self.variable)
        );
        Regex::new(&expr).map_err(|e| SemrelError::config(e.to_string()))
    }

    /// Rewrite the variable in `content`; `None` when nothing matched
    pub fn apply(&self, content: &str, version: &Version) -> Result<Option<String>> {
        let re = self.pattern()?;
        if !re.is_match(content) {
            return Ok(None);
        }
        let replacement = format!("${{lead}}${{quote}}{}${{end}}", version);
        Ok(Some(re.replace_all(content, replacement.as_str()).into_owned()))
    }
}

/// Stamp `version` into every declared variable under `root`
///
/// # Returns
/// * `Ok(Vec<PathBuf>)` - Files whose content changed
///
/// # Errors
/// `Config` when a declaration is malformed or its file does not exist.
pub fn stamp_version(root: &Path, declarations: &[String], version: &Version) -> Result<Vec<PathBuf>> {
    let mut changed = Vec::new();

    for declaration in declarations {
        let variable = VersionVariable::parse(declaration)?;
        let path = root.join(&variable.path);
        if !path.is_file() {
            return Err(SemrelError::config(format!(
                "Version variable file {} does not exist",
                variable.path.display()
            )));
        }

        let content = fs::read_to_string(&path)?;
        match variable.apply(&content, version)? {
            Some(updated) if updated != content => {
                log::info!("Setting {} in {} to {}", variable.variable, variable.path.display(), version);
                fs::write(&path, updated)?;
                if !changed.contains(&variable.path) {
                    changed.push(variable.path.clone());
                }
            }
            Some(_) => log::debug!("{} already at {}", variable.path.display(), version),
            None => log::warn!(
                "Variable {} not found in {}",
                variable.variable,
                variable.path.display()
            ),
        }
    }

    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_parse_declaration() {
        let var = VersionVariable::parse("src/pkg/__init__.py:__version__").unwrap();
        assert_eq!(var.path, PathBuf::from("src/pkg/__init__.py"));
        assert_eq!(var.variable, "__version__");
        assert!(VersionVariable::parse("no-separator").is_err());
        assert!(VersionVariable::parse(":version").is_err());
    }

    #[test]
    fn test_apply_equals_and_colon_forms() {
        let var = VersionVariable::parse("Cargo.toml:version").unwrap();
        let toml_text = "[package]\nname = \"demo\"\nversion = \"0.1.0\"\n";
        assert_eq!(
            var.apply(toml_text, &v("0.2.0")).unwrap().unwrap(),
            "[package]\nname = \"demo\"\nversion = \"0.2.0\"\n"
        );

        let yaml_text = "name: demo\nversion: 0.1.0\n";
        assert_eq!(
            var.apply(yaml_text, &v("1.0.0-rc.1")).unwrap().unwrap(),
            "name: demo\nversion: 1.0.0-rc.1\n"
        );
    }

    #[test]
    fn test_apply_no_match() {
        let var = VersionVariable::parse("f:version").unwrap();
        assert_eq!(var.apply("name = \"x\"\n", &v("1.0.0")).unwrap(), None);
    }

    #[test]
    fn test_apply_does_not_touch_similar_names() {
        let var = VersionVariable::parse("f:version").unwrap();
        let text = "rust_version = \"1.70\"\nversion = '0.1.0'\n";
        assert_eq!(
            var.apply(text, &v("0.1.1")).unwrap().unwrap(),
            "rust_version = \"1.70\"\nversion = '0.1.1'\n"
        );
    }

    #[test]
    fn test_stamp_version_writes_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("version.py"), "__version__ = \"0.0.0\"\n").unwrap();

        let changed = stamp_version(
            dir.path(),
            &["version.py:__version__".to_string()],
            &v("0.1.0"),
        )
        .unwrap();

        assert_eq!(changed, vec![PathBuf::from("version.py")]);
        assert_eq!(
            fs::read_to_string(dir.path().join("version.py")).unwrap(),
            "__version__ = \"0.1.0\"\n"
        );

        // Second run is a no-op
        let changed = stamp_version(
            dir.path(),
            &["version.py:__version__".to_string()],
            &v("0.1.0"),
        )
        .unwrap();
        assert!(changed.is_empty());
    }

    #[test]
    fn test_stamp_version_missing_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let err = stamp_version(dir.path(), &["missing.txt:version".to_string()], &v("1.0.0"))
            .unwrap_err();
        assert!(matches!(err, SemrelError::Config(_)));
    }
}
