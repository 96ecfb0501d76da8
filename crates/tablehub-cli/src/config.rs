// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tablehub_app::{DEFAULT_PERSIST_DEBOUNCE, Endpoint, ViewId};

const CONFIG_VERSION: i64 = 1;
const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_START_VIEW: &str = "gta";
const DEFAULT_TIMEOUT: &str = "10s";
const DEFAULT_LOG_LEVEL: &str = "info";
const LOG_FILE_NAME: &str = "tablehub.log";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub logging: Logging,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            server: Server::default(),
            storage: Storage::default(),
            ui: Ui::default(),
            logging: Logging::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub base_url: Option<String>,
    pub endpoint: Option<String>,
    pub timeout: Option<String>,
    pub start_view: Option<String>,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            base_url: Some(DEFAULT_BASE_URL.to_owned()),
            endpoint: Some(Endpoint::Sheets.as_str().to_owned()),
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
            start_view: Some(DEFAULT_START_VIEW.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ui {
    pub persist_debounce: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Logging {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("TABLEHUB_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set TABLEHUB_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(tablehub_store::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version; add `version = 1` and put values under [server], [storage], [ui], and [logging]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(db_path) = &self.storage.db_path {
            tablehub_store::validate_db_path(db_path)?;
        }

        if let Some(endpoint) = &self.server.endpoint
            && Endpoint::parse(endpoint).is_none()
        {
            bail!(
                "server.endpoint in {} must be \"sheets\" or \"tables\", got {:?}",
                path.display(),
                endpoint
            );
        }

        if let Some(start) = &self.server.start_view
            && start.trim().is_empty()
        {
            bail!("server.start_view in {} must not be empty", path.display());
        }

        if let Some(timeout) = &self.server.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "server.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(debounce) = &self.ui.persist_debounce {
            parse_duration(debounce)
                .with_context(|| format!("ui.persist_debounce in {}", path.display()))?;
        }

        if let Some(level) = &self.logging.level {
            tracing_subscriber::EnvFilter::try_new(level).with_context(|| {
                format!(
                    "logging.level in {} is not a valid filter (try \"info\" or \"tablehub_app=debug\")",
                    path.display()
                )
            })?;
        }

        Ok(())
    }

    pub fn base_url(&self) -> &str {
        self.server
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn endpoint(&self) -> Endpoint {
        self.server
            .endpoint
            .as_deref()
            .and_then(Endpoint::parse)
            .unwrap_or(Endpoint::Sheets)
    }

    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(self.server.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn start_view(&self) -> ViewId {
        ViewId::new(
            self.server
                .start_view
                .as_deref()
                .unwrap_or(DEFAULT_START_VIEW)
                .trim(),
        )
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => tablehub_store::default_db_path(),
        }
    }

    pub fn persist_debounce(&self) -> Result<Duration> {
        match &self.ui.persist_debounce {
            Some(raw) => parse_duration(raw),
            None => Ok(DEFAULT_PERSIST_DEBOUNCE),
        }
    }

    /// `TABLEHUB_LOG` wins over the configured level.
    pub fn log_filter(&self) -> String {
        env::var("TABLEHUB_LOG")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .or_else(|| self.logging.level.clone())
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_owned())
    }

    pub fn log_file(&self) -> Result<PathBuf> {
        if let Some(path) = &self.logging.file {
            return Ok(PathBuf::from(path));
        }
        let db_path = self.db_path()?;
        let dir = db_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Ok(dir.join(LOG_FILE_NAME))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# tablehub config\n# Place this file at: {}\n\nversion = 1\n\n[server]\nbase_url = \"{}\"\n# \"sheets\" or \"tables\"\nendpoint = \"sheets\"\ntimeout = \"{}\"\nstart_view = \"{}\"\n\n[storage]\n# Optional. Default is platform data dir (for example ~/.local/share/tablehub/session.db)\n# db_path = \"/absolute/path/to/session.db\"\n\n[ui]\npersist_debounce = \"250ms\"\n\n[logging]\n# Overridden by TABLEHUB_LOG.\nlevel = \"{}\"\n# file = \"/absolute/path/to/tablehub.log\"\n",
            path.display(),
            DEFAULT_BASE_URL,
            DEFAULT_TIMEOUT,
            DEFAULT_START_VIEW,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 250ms or 10s)")
}
