use crate::types::Severity;
use anyhow::{Context, bail};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Documented config written by `mrnote init`
pub const DEFAULT_CONFIG: &str = include_str!("templates/mrnote.toml");

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub project: ProjectConfig,
    pub revision: RevisionConfig,
    pub comment: CommentConfig,
    pub template: TemplateConfig,
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the analysis server, used to build rule links
    pub base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:9000".into()
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct ProjectConfig {
    pub key: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct RevisionConfig {
    #[serde(deserialize_with = "string_or_number")]
    pub commit_sha: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub merge_request_iid: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub pull_request_key: Option<String>,
}

/// Identifiers are often numeric (`merge_request_iid = 42`); keep them as text
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(Option::<Id>::deserialize(deserializer)?.map(|id| match id {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    }))
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct CommentConfig {
    pub status_name: Option<String>,
    pub ping_user: bool,
    /// Report every issue, not only new ones
    pub all_issues: bool,
    /// One inline comment per issue instead of one per line
    pub unique_issue_per_inline: bool,
    pub merge_request_discussion: bool,
    pub disable_inline: bool,
    pub disable_global: bool,
    /// Minimum severity to report
    pub issue_filter: Severity,
    /// Prepended to component paths to get repository paths
    pub prefix_directory: String,
    /// Issues listed in the global comment before truncating
    pub max_global_issues: usize,
    /// Inline comments rendered concurrently, unlimited when unset
    pub max_parallel: Option<usize>,
}

impl Default for CommentConfig {
    fn default() -> Self {
        Self {
            status_name: None,
            ping_user: false,
            all_issues: false,
            unique_issue_per_inline: false,
            merge_request_discussion: false,
            disable_inline: false,
            disable_global: false,
            issue_filter: Severity::Info,
            prefix_directory: String::new(),
            max_global_issues: default_max_global_issues(),
            max_parallel: None,
        }
    }
}

fn default_max_global_issues() -> usize {
    10
}

/// Template sources; inline text wins over a file reference
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct TemplateConfig {
    pub inline: Option<String>,
    pub global: Option<String>,
    pub inline_file: Option<PathBuf>,
    pub global_file: Option<PathBuf>,
}

impl TemplateConfig {
    /// Read referenced template files so rendering never touches the disk
    fn resolve(&mut self, base_dir: &Path) -> anyhow::Result<()> {
        if self.inline.is_none() {
            self.inline = read_template(base_dir, self.inline_file.as_deref())?;
        }
        if self.global.is_none() {
            self.global = read_template(base_dir, self.global_file.as_deref())?;
        }
        Ok(())
    }
}

fn read_template(base_dir: &Path, file: Option<&Path>) -> anyhow::Result<Option<String>> {
    let Some(file) = file else {
        return Ok(None);
    };
    let path = base_dir.join(file);
    debug!("Reading template {}", path.display());
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read template {}", path.display()))?;
    Ok(Some(content))
}

impl Config {
    /// Load config from a TOML file, applying `key.path=value` overrides
    pub fn load(path: &str, overrides: &[String]) -> anyhow::Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path))?;
        let base_dir = Path::new(path).parent().unwrap_or(Path::new("."));
        Self::parse(&content, overrides, base_dir)
            .with_context(|| format!("Invalid config {}", path))
    }

    pub fn parse(content: &str, overrides: &[String], base_dir: &Path) -> anyhow::Result<Self> {
        let mut table: toml::Table = toml::from_str(content)?;
        for entry in overrides {
            apply_override(&mut table, entry)?;
        }
        let mut config: Config = toml::Value::Table(table).try_into()?;
        config.template.resolve(base_dir)?;
        Ok(config)
    }

    /// Revision comments are posted against
    pub fn commit_sha(&self) -> &str {
        self.revision.commit_sha.as_deref().unwrap_or_default()
    }
}

/// Apply a single `a.b.c=value` override; the value is read as TOML, falling
/// back to a plain string
fn apply_override(table: &mut toml::Table, entry: &str) -> anyhow::Result<()> {
    let Some((key, raw)) = entry.split_once('=') else {
        bail!("Override '{}' must look like key.path=value", entry);
    };
    let value = toml::from_str::<toml::Table>(&format!("value = {}", raw.trim()))
        .ok()
        .and_then(|mut parsed| parsed.remove("value"))
        .unwrap_or_else(|| toml::Value::String(raw.trim().to_string()));

    let mut parts: Vec<&str> = key.trim().split('.').collect();
    let Some(last) = parts.pop().filter(|last| !last.is_empty()) else {
        bail!("Override '{}' has an empty key", entry);
    };
    let mut current = table;
    for part in parts {
        let next = current
            .entry(part.to_string())
            .or_insert(toml::Value::Table(toml::Table::new()));
        current = match next {
            toml::Value::Table(inner) => inner,
            _ => bail!("Override '{}': '{}' is not a table", entry, part),
        };
    }
    debug!("Config override {} = {}", key.trim(), value);
    current.insert(last.to_string(), value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("", &[], Path::new(".")).unwrap();
        assert_eq!(config.server.base_url, "http://localhost:9000");
        assert_eq!(config.comment.max_global_issues, 10);
        assert_eq!(config.comment.issue_filter, Severity::Info);
        assert!(!config.comment.ping_user);
        assert_eq!(config.commit_sha(), "");
    }

    #[test]
    fn test_default_config_parses() {
        let config = Config::parse(DEFAULT_CONFIG, &[], Path::new(".")).unwrap();
        assert_eq!(config.server.base_url, "http://localhost:9000");
        assert!(config.template.inline.is_none());
    }

    #[test]
    fn test_overrides() {
        let overrides = vec![
            "revision.merge_request_iid=42".to_string(),
            "comment.ping_user=true".to_string(),
            "comment.issue_filter=MAJOR".to_string(),
            "project.key = my-project".to_string(),
        ];
        let config = Config::parse("[comment]\nping_user = false\n", &overrides, Path::new("."))
            .unwrap();
        assert_eq!(config.revision.merge_request_iid.as_deref(), Some("42"));
        assert!(config.comment.ping_user);
        assert_eq!(config.comment.issue_filter, Severity::Major);
        assert_eq!(config.project.key.as_deref(), Some("my-project"));
    }

    #[test]
    fn test_override_requires_equals() {
        let err = Config::parse("", &["comment.ping_user".to_string()], Path::new("."));
        assert!(err.is_err());
    }

    #[test]
    fn test_template_file_is_read_relative_to_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("inline.md"), "${ revision }\n").unwrap();
        let config_path = dir.path().join("mrnote.toml");
        fs::write(
            &config_path,
            "[template]\ninline_file = \"inline.md\"\nglobal = \"summary\"\n",
        )
        .unwrap();

        let config = Config::load(config_path.to_str().unwrap(), &[]).unwrap();
        assert_eq!(config.template.inline.as_deref(), Some("${ revision }\n"));
        assert_eq!(config.template.global.as_deref(), Some("summary"));
    }

    #[test]
    fn test_missing_template_file_fails() {
        let err = Config::parse(
            "[template]\ninline_file = \"does-not-exist.md\"\n",
            &[],
            Path::new("."),
        );
        assert!(err.is_err());
    }
}
