use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::{NotifierConfig, ResolvedSettings, load_config};
use crate::hooks::Hooks;
use crate::log::TracingLog;
use crate::notifier::Notifier;
use crate::title::Permalinks;
use crate::transport::{HttpTransport, HttpTransportConfig};

pub const STATE_DIR_NAME: &str = ".indexnow";
pub const CONFIG_FILENAME: &str = "config.toml";

pub type LiveNotifier = Notifier<ResolvedSettings, TracingLog, HttpTransport>;
pub type LiveHooks = Hooks<Permalinks, ResolvedSettings, TracingLog, HttpTransport>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Flag,
    Env,
    Default,
}

impl ValueSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Env => "env",
            Self::Default => "default",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Runtime {
    pub config_path: PathBuf,
    pub config_source: ValueSource,
    pub config: NotifierConfig,
    pub settings: ResolvedSettings,
}

impl Runtime {
    /// Resolve the config path (flag > INDEXNOW_CONFIG > `<cwd>/.indexnow/config.toml`) and load it.
    pub fn load(config_flag: Option<&Path>) -> Result<Self> {
        let cwd = env::current_dir().context("failed to read current directory")?;
        let env_path = env::var("INDEXNOW_CONFIG").ok();
        let (config_path, config_source) =
            resolve_config_path(&cwd, config_flag, env_path.as_deref());
        let config = load_config(&config_path)?;
        let settings = config.resolve();
        Ok(Self {
            config_path,
            config_source,
            config,
            settings,
        })
    }

    pub fn notifier(&self) -> Result<LiveNotifier> {
        let transport = HttpTransport::new(&HttpTransportConfig::from_settings(&self.settings))?;
        Ok(Notifier::with_endpoint(
            self.settings.clone(),
            TracingLog,
            transport,
            &self.settings.endpoint,
        ))
    }

    pub fn hooks(&self) -> Result<LiveHooks> {
        let permalinks = Permalinks::from_settings(&self.settings)?;
        Ok(Hooks::new(permalinks, self.notifier()?))
    }

    pub fn diagnostics(&self) -> String {
        let settings = &self.settings;
        [
            format!(
                "config_path: {} ({})",
                normalize_path(&self.config_path),
                self.config_source.as_str()
            ),
            format!("config_exists: {}", self.config_path.exists()),
            format!(
                "key: {}",
                if settings.key.is_some() { "configured" } else { "missing" }
            ),
            format!("endpoint: {}", settings.endpoint),
            format!("connect_timeout_ms: {}", settings.connect_timeout.as_millis()),
            format!("timeout_ms: {}", settings.timeout.as_millis()),
            format!("user_agent: {}", settings.user_agent),
            format!(
                "wiki_url: {}",
                settings.wiki_url.as_deref().unwrap_or("<unset>")
            ),
            format!("article_path: {}", settings.article_path),
            format!("custom_namespaces: {}", settings.custom_namespaces.len()),
        ]
        .join("\n")
    }
}

pub fn resolve_config_path(
    cwd: &Path,
    flag: Option<&Path>,
    env_value: Option<&str>,
) -> (PathBuf, ValueSource) {
    if let Some(path) = flag {
        return (absolutize(cwd, path), ValueSource::Flag);
    }
    if let Some(value) = env_value.map(str::trim).filter(|value| !value.is_empty()) {
        return (absolutize(cwd, Path::new(value)), ValueSource::Env);
    }
    (
        cwd.join(STATE_DIR_NAME).join(CONFIG_FILENAME),
        ValueSource::Default,
    )
}

fn absolutize(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
