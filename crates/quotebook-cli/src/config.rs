// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use quotebook_app::FilterBucket;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "quotebook";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT: &str = "5s";
const DEFAULT_NOTIFICATION_DURATION: &str = "3s";
const DEFAULT_LOG_LEVEL: &str = "info";
const MAX_DURATION: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            server: Server::default(),
            ui: Ui::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Server {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ui {
    pub default_filter: Option<String>,
    pub notification_duration: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("QUOTEBOOK_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!(
                "cannot resolve config directory; set QUOTEBOOK_CONFIG_PATH to the config file"
            )
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
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
                    "config file {} has no version; add `version = 1` and put values under [server], [ui], and [log]",
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
        if let Some(base_url) = &self.server.base_url {
            validate_base_url(base_url)
                .with_context(|| format!("server.base_url in {}", path.display()))?;
        }

        for (key, value) in [
            ("server.timeout", &self.server.timeout),
            ("ui.notification_duration", &self.ui.notification_duration),
        ] {
            if let Some(raw) = value {
                let parsed = parse_duration(raw)?;
                if parsed.is_zero() {
                    bail!("{key} in {} must be positive, got {raw}", path.display());
                }
                if parsed > MAX_DURATION {
                    bail!("{key} in {} must be at most 1h, got {raw}", path.display());
                }
            }
        }

        if let Some(filter) = &self.ui.default_filter
            && FilterBucket::parse(filter).is_none()
        {
            bail!(
                "ui.default_filter in {} must be one of all, year, month, week; got {filter:?}",
                path.display()
            );
        }

        Ok(())
    }

    /// Resolved server base URL: `QUOTEBOOK_SERVER_URL` wins over the file.
    pub fn base_url(&self) -> String {
        if let Ok(value) = env::var("QUOTEBOOK_SERVER_URL")
            && !value.trim().is_empty()
        {
            return value.trim().trim_end_matches('/').to_owned();
        }
        self.server
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_owned()
    }

    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(self.server.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn default_filter(&self) -> FilterBucket {
        self.ui
            .default_filter
            .as_deref()
            .and_then(FilterBucket::parse)
            .unwrap_or_default()
    }

    pub fn notification_duration(&self) -> Result<Duration> {
        parse_duration(
            self.ui
                .notification_duration
                .as_deref()
                .unwrap_or(DEFAULT_NOTIFICATION_DURATION),
        )
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_file(&self) -> Result<PathBuf> {
        if let Some(file) = &self.log.file {
            return Ok(PathBuf::from(file));
        }
        let data_root = dirs::data_dir().ok_or_else(|| {
            anyhow!("cannot resolve data directory; set [log].file in the config")
        })?;
        Ok(data_root.join(APP_NAME).join("quotebook.log"))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# quotebook config\n# Place this file at: {}\n\nversion = 1\n\n[server]\nbase_url = \"{}\"\ntimeout = \"{}\"\n\n[ui]\n# one of: all, year, month, week\ndefault_filter = \"all\"\nnotification_duration = \"{}\"\n\n[log]\nlevel = \"{}\"\n# file = \"/absolute/path/to/quotebook.log\"\n",
            path.display(),
            DEFAULT_BASE_URL,
            DEFAULT_TIMEOUT,
            DEFAULT_NOTIFICATION_DURATION,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn validate_base_url(raw: &str) -> Result<()> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("base URL is empty");
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        bail!("base URL {trimmed:?} must start with http:// or https://");
    }
    Ok(())
}

fn parse_duration(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
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
        let secs = mins
            .checked_mul(60)
            .ok_or_else(|| anyhow!("duration {raw:?} is too large"))?;
        return Ok(Duration::from_secs(secs));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 3s)")
}
