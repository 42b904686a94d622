//! Server configuration: optional TOML file plus environment overrides.

use std::{collections::BTreeMap, path::PathBuf};

use anyhow::{Context, bail};
use serde::Deserialize;
use wager_relay_core::{ActionProfile, WagerPayload};
use wager_relay_session::RunnerSettings;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "WAGER_RELAY_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "wager-relay.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logs: LogConfig,
    pub runner: RunnerConfig,
    pub action: ActionConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// One JSON response per line.
    pub raw_path: PathBuf,
    /// One `[timestamp] Balance: X | Win: bool` line per action.
    pub summary_path: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            raw_path: PathBuf::from("responses.log"),
            summary_path: PathBuf::from("analysis.log"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub progress_every: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            progress_every: RunnerSettings::default().progress_every,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ActionConfig {
    pub url: String,
    /// Sent as `authorization: Bearer <token>` when set.
    pub auth_token: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub payloads: Vec<WagerPayload>,
}

impl Default for ActionConfig {
    fn default() -> Self {
        let headers = [
            ("accept", "application/json, text/plain, */*"),
            ("content-type", "application/json"),
            ("origin", "https://dev.goatsbot.xyz"),
            ("referer", "https://dev.goatsbot.xyz/"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            url: "https://api-dice.goatsbot.xyz/dice/action".to_string(),
            auth_token: None,
            headers,
            payloads: vec![WagerPayload::default()],
        }
    }
}

impl Config {
    /// Load from the config file (if present), then apply environment overrides.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed, or an override or
    /// the resulting config is invalid.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            Self::from_toml_str(&content).with_context(|| format!("parsing {}", path.display()))?
        } else {
            tracing::info!(path = %path.display(), "No config file, using defaults");
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document; missing sections keep their defaults.
    ///
    /// # Errors
    /// Returns error on malformed TOML or mistyped fields.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `PORT`, `HOST`, `ACTION_URL`, `ACTION_AUTH_TOKEN`, `RAW_LOG_PATH`,
    /// `SUMMARY_LOG_PATH` and `PROGRESS_EVERY`.
    ///
    /// # Errors
    /// Returns error if a numeric override does not parse.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(port) = lookup("PORT") {
            self.server.port = port.parse().with_context(|| format!("invalid PORT {port:?}"))?;
        }
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(url) = lookup("ACTION_URL") {
            self.action.url = url;
        }
        if let Some(token) = lookup("ACTION_AUTH_TOKEN") {
            self.action.auth_token = Some(token);
        }
        if let Some(path) = lookup("RAW_LOG_PATH") {
            self.logs.raw_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("SUMMARY_LOG_PATH") {
            self.logs.summary_path = PathBuf::from(path);
        }
        if let Some(every) = lookup("PROGRESS_EVERY") {
            self.runner.progress_every = every
                .parse()
                .with_context(|| format!("invalid PROGRESS_EVERY {every:?}"))?;
        }
        Ok(())
    }

    /// Reject settings the runtime cannot honor.
    ///
    /// # Errors
    /// Returns error if `progress_every` is zero or the action profile is invalid.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.runner.progress_every == 0 {
            bail!("runner.progress_every must be at least 1");
        }
        self.action_profile()?;
        Ok(())
    }

    /// Request profile for the action client.
    ///
    /// # Errors
    /// Returns error if the url is blank or there are no payloads.
    pub fn action_profile(&self) -> anyhow::Result<ActionProfile> {
        let mut profile = ActionProfile::new(self.action.url.clone(), self.action.payloads.clone())?;
        profile.headers.extend(self.action.headers.clone());
        if let Some(token) = &self.action.auth_token {
            profile = profile.with_header("authorization", format!("Bearer {token}"));
        }
        Ok(profile)
    }

    #[must_use]
    pub const fn runner_settings(&self) -> RunnerSettings {
        RunnerSettings {
            progress_every: self.runner.progress_every,
        }
    }
}
