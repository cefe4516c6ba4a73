use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use toml::Value;

pub const DEFAULT_ENDPOINT: &str = "https://api.indexnow.org/indexnow";
pub const DEFAULT_USER_AGENT: &str = "indexnow-notifier/0.1";
pub const DEFAULT_ARTICLE_PATH: &str = "/wiki/$1";
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 3_000;
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct NotifierConfig {
    #[serde(default)]
    pub wiki: WikiSection,
    #[serde(default)]
    pub indexnow: IndexNowSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct WikiSection {
    pub url: Option<String>,
    pub article_path: Option<String>,
    #[serde(default)]
    pub custom_namespaces: Vec<CustomNamespace>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct IndexNowSection {
    pub key: Option<String>,
    pub endpoint: Option<String>,
    pub connect_timeout_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CustomNamespace {
    pub name: String,
    pub id: i32,
}

/// Read access to the IndexNow API key.
pub trait KeySource {
    fn index_now_key(&self) -> Option<String>;
}

/// Settings after applying env > config file > default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSettings {
    pub key: Option<String>,
    pub endpoint: String,
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub user_agent: String,
    pub wiki_url: Option<String>,
    pub article_path: String,
    pub custom_namespaces: Vec<CustomNamespace>,
}

impl KeySource for ResolvedSettings {
    fn index_now_key(&self) -> Option<String> {
        self.key.clone()
    }
}

impl NotifierConfig {
    pub fn resolve(&self) -> ResolvedSettings {
        self.resolve_with(|name| env::var(name).ok())
    }

    pub fn resolve_with<F>(&self, lookup: F) -> ResolvedSettings
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_text = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let env_millis = |name: &str| env_text(name).and_then(|value| value.parse::<u64>().ok());

        let key = env_text("INDEXNOW_KEY")
            .or_else(|| self.indexnow.key.clone())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        ResolvedSettings {
            key,
            endpoint: env_text("INDEXNOW_ENDPOINT")
                .or_else(|| self.indexnow.endpoint.clone())
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            connect_timeout: Duration::from_millis(
                env_millis("INDEXNOW_CONNECT_TIMEOUT_MS")
                    .or(self.indexnow.connect_timeout_ms)
                    .unwrap_or(DEFAULT_CONNECT_TIMEOUT_MS),
            ),
            timeout: Duration::from_millis(
                env_millis("INDEXNOW_TIMEOUT_MS")
                    .or(self.indexnow.timeout_ms)
                    .unwrap_or(DEFAULT_TIMEOUT_MS),
            ),
            user_agent: env_text("INDEXNOW_USER_AGENT")
                .or_else(|| self.indexnow.user_agent.clone())
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            wiki_url: env_text("WIKI_URL")
                .or_else(|| self.wiki.url.clone())
                .map(|url| url.trim_end_matches('/').to_string()),
            article_path: env_text("WIKI_ARTICLE_PATH")
                .or_else(|| self.wiki.article_path.clone())
                .unwrap_or_else(|| DEFAULT_ARTICLE_PATH.to_string()),
            custom_namespaces: self.wiki.custom_namespaces.clone(),
        }
    }
}

/// Load and parse a NotifierConfig from a TOML file. Returns default if file doesn't exist.
pub fn load_config(config_path: &Path) -> Result<NotifierConfig> {
    if !config_path.exists() {
        return Ok(NotifierConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: NotifierConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

pub fn config_template() -> String {
    format!(
        "[wiki]\n\
         # url = \"https://wiki.example.com\"\n\
         article_path = \"{DEFAULT_ARTICLE_PATH}\"\n\
         \n\
         [indexnow]\n\
         # key = \"<your-indexnow-key>\"\n\
         endpoint = \"{DEFAULT_ENDPOINT}\"\n\
         connect_timeout_ms = {DEFAULT_CONNECT_TIMEOUT_MS}\n\
         timeout_ms = {DEFAULT_TIMEOUT_MS}\n"
    )
}

/// Set `[indexnow].key` while preserving all other config sections.
/// Returns `true` when a write occurred.
pub fn patch_index_now_key(config_path: &Path, key: &str) -> Result<bool> {
    let key = key.trim();
    if key.is_empty() {
        bail!("IndexNow key cannot be empty");
    }

    let mut root = if config_path.exists() {
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        toml::from_str::<Value>(&content)
            .with_context(|| format!("failed to parse {}", config_path.display()))?
    } else {
        Value::Table(Default::default())
    };
    let original = root.clone();

    let root_table = root.as_table_mut().ok_or_else(|| {
        anyhow::anyhow!(
            "top-level TOML must be a table in {}",
            config_path.display()
        )
    })?;
    let section = root_table
        .entry("indexnow".to_string())
        .or_insert_with(|| Value::Table(Default::default()));
    let section = section.as_table_mut().ok_or_else(|| {
        anyhow::anyhow!("[indexnow] must be a table in {}", config_path.display())
    })?;
    section.insert("key".to_string(), Value::String(key.to_string()));

    if root == original {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let rendered = toml::to_string_pretty(&root).context("failed to serialize config TOML")?;
    fs::write(config_path, rendered)
        .with_context(|| format!("failed to write {}", config_path.display()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use tempfile::tempdir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn load_config_returns_default_for_missing_file() {
        let config = load_config(Path::new("/nonexistent/config.toml")).expect("load config");
        assert_eq!(config, NotifierConfig::default());
    }

    #[test]
    fn load_config_parses_sections() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
[wiki]
url = "https://wiki.example.com/"
article_path = "/w/$1"

[[wiki.custom_namespaces]]
name = "Lore"
id = 3000

[indexnow]
key = "abc123"
timeout_ms = 2500
"#,
        )
        .expect("write config");

        let config = load_config(&config_path).expect("load config");
        assert_eq!(config.indexnow.key.as_deref(), Some("abc123"));
        assert_eq!(config.wiki.custom_namespaces[0].name, "Lore");

        let settings = config.resolve_with(no_env);
        assert_eq!(settings.wiki_url.as_deref(), Some("https://wiki.example.com"));
        assert_eq!(settings.article_path, "/w/$1");
        assert_eq!(settings.timeout, Duration::from_millis(2500));
        assert_eq!(settings.connect_timeout, Duration::from_millis(3000));
        assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn load_config_returns_error_for_invalid_toml() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("config.toml");
        fs::write(&config_path, "[indexnow\nkey = \"oops\"").expect("write config");
        let error = load_config(&config_path).expect_err("must fail");
        assert!(error.to_string().contains("failed to parse"));
    }

    #[test]
    fn env_overrides_config_values() {
        let mut config = NotifierConfig::default();
        config.indexnow.key = Some("from-file".to_string());
        config.indexnow.timeout_ms = Some(9_000);

        let env = BTreeMap::from([
            ("INDEXNOW_KEY", "from-env"),
            ("INDEXNOW_TIMEOUT_MS", "1200"),
            ("WIKI_URL", "https://env.example.org"),
        ]);
        let settings =
            config.resolve_with(|name| env.get(name).map(|value| value.to_string()));

        assert_eq!(settings.index_now_key().as_deref(), Some("from-env"));
        assert_eq!(settings.timeout, Duration::from_millis(1200));
        assert_eq!(settings.wiki_url.as_deref(), Some("https://env.example.org"));
    }

    #[test]
    fn blank_key_resolves_to_none() {
        let mut config = NotifierConfig::default();
        config.indexnow.key = Some("   ".to_string());
        let settings = config.resolve_with(|name| {
            (name == "INDEXNOW_KEY").then(String::new)
        });
        assert!(settings.index_now_key().is_none());
    }

    #[test]
    fn unparseable_env_timeout_falls_back() {
        let settings = NotifierConfig::default().resolve_with(|name| {
            (name == "INDEXNOW_CONNECT_TIMEOUT_MS").then(|| "soon".to_string())
        });
        assert_eq!(
            settings.connect_timeout,
            Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS)
        );
    }

    #[test]
    fn template_parses_back() {
        let parsed: NotifierConfig = toml::from_str(&config_template()).expect("parse template");
        assert!(parsed.indexnow.key.is_none());
        assert_eq!(parsed.indexnow.endpoint.as_deref(), Some(DEFAULT_ENDPOINT));
        assert_eq!(parsed.indexnow.timeout_ms, Some(DEFAULT_TIMEOUT_MS));
    }

    #[test]
    fn patch_key_preserves_other_sections() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("nested").join("config.toml");
        fs::create_dir_all(config_path.parent().expect("parent")).expect("mkdir");
        fs::write(&config_path, "[wiki]\nurl = \"https://wiki.example.org\"\n")
            .expect("write config");

        assert!(patch_index_now_key(&config_path, "abc123").expect("patch"));
        assert!(!patch_index_now_key(&config_path, "abc123").expect("repatch"));

        let config = load_config(&config_path).expect("load config");
        assert_eq!(config.wiki.url.as_deref(), Some("https://wiki.example.org"));
        assert_eq!(config.indexnow.key.as_deref(), Some("abc123"));
    }

    #[test]
    fn patch_key_rejects_empty_key() {
        let temp = tempdir().expect("tempdir");
        let error = patch_index_now_key(&temp.path().join("config.toml"), " ")
            .expect_err("must fail");
        assert!(error.to_string().contains("cannot be empty"));
    }
}
