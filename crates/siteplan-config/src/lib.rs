//! Shared configuration for siteplan tools.
//!
//! TOML profiles (service URL, TLS, polling budget, default simulation
//! parameters) and translation to `siteplan_core::PlannerConfig`. The CLI
//! layers its flag overrides on top of what this crate resolves.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use siteplan_core::{PlannerConfig, PollPolicy, SimulationParameters, TlsVerification};

/// Environment variable that points at an alternative config file.
pub const CONFIG_PATH_ENV: &str = "SITEPLAN_CONFIG";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found (available: {available})")]
    ProfileNotFound { name: String, available: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named service profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// Per-request timeout, seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Status checks before giving up. Unbounded when absent.
    pub max_attempts: Option<u32>,

    /// Seconds to wait for a job before giving up. Unbounded when absent.
    pub deadline_secs: Option<u64>,

    /// Where `predict` writes overlay rasters.
    pub out_dir: Option<PathBuf>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
            poll_interval_ms: default_poll_interval_ms(),
            max_attempts: None,
            deadline_secs: None,
            out_dir: None,
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_poll_interval_ms() -> u64 {
    1000
}

/// A named prediction service profile.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// Service base URL (e.g., "http://localhost:8080").
    pub service: String,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout.
    pub timeout: Option<u64>,

    /// Override poll interval.
    pub poll_interval_ms: Option<u64>,

    /// Override poll attempt budget.
    pub max_attempts: Option<u32>,

    /// Override poll deadline.
    pub deadline_secs: Option<u64>,

    /// Default simulation parameters for this profile. Missing fields
    /// take the built-in defaults.
    pub parameters: Option<SimulationParameters>,
}

impl Profile {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            ..Self::default()
        }
    }

    /// The profile's parameters, or the built-in defaults.
    pub fn parameters_or_default(&self) -> SimulationParameters {
        self.parameters.clone().unwrap_or_default()
    }
}

impl Config {
    /// The profile named `name`, or the default profile when `None`.
    pub fn profile(&self, name: Option<&str>) -> Result<(&str, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.into(),
                available: self.profile_names(),
            })
    }

    /// Comma-separated profile names, or `(none)`.
    pub fn profile_names(&self) -> String {
        if self.profiles.is_empty() {
            "(none)".into()
        } else {
            self.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `$SITEPLAN_CONFIG`, else platform
/// conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("org", "siteplan", "siteplan").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("siteplan");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file, then `SITEPLAN_`-prefixed environment
/// variables (`SITEPLAN_DEFAULTS__TIMEOUT=60`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(
            Env::prefixed("SITEPLAN_")
                .filter(|key| is_config_key(key.as_str()))
                .split("__"),
        );

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Only `SITEPLAN_DEFAULT_PROFILE` and `SITEPLAN_DEFAULTS__*` reach the
/// config; the rest of the namespace belongs to CLI flags.
fn is_config_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key == "default_profile" || key.starts_with("defaults__")
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `PlannerConfig` from a profile and the global defaults.
///
/// Profile values win over `[defaults]`.
pub fn profile_to_planner_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<PlannerConfig, ConfigError> {
    let service_url: url::Url = profile
        .service
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "service".into(),
            reason: format!("invalid URL: {}", profile.service),
        })?;

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let interval_ms = profile.poll_interval_ms.unwrap_or(defaults.poll_interval_ms);
    if interval_ms == 0 {
        return Err(ConfigError::Validation {
            field: "poll_interval_ms".into(),
            reason: "must be greater than 0".into(),
        });
    }

    let mut poll = PollPolicy::default().with_interval(Duration::from_millis(interval_ms));
    if let Some(max) = profile.max_attempts.or(defaults.max_attempts) {
        poll = poll.with_max_attempts(max);
    }
    if let Some(secs) = profile.deadline_secs.or(defaults.deadline_secs) {
        poll = poll.with_deadline(Duration::from_secs(secs));
    }

    Ok(PlannerConfig {
        service_url,
        tls,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        poll,
    })
}
