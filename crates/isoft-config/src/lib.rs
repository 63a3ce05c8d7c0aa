//! Shared configuration for i-soft tools.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `isoft_core::DeviceConfig`. The CLI adds
//! flag-aware wrappers on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use isoft_core::{DeviceConfig, TlsVerification};

/// Keyring service every secret is stored under.
pub const KEYRING_SERVICE: &str = "isoft";

/// Environment variable consulted for the password when a profile has
/// no `password_env` of its own.
pub const PASSWORD_ENV: &str = "ISOFT_PASSWORD";

/// Environment variable consulted for the user name.
pub const USERNAME_ENV: &str = "ISOFT_USERNAME";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

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
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named device profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Per-attempt timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout: default_timeout(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_max_attempts() -> u32 {
    4
}

/// A named softener profile.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Device IP address or host name.
    #[serde(default)]
    pub host: String,

    /// Control port; 8124 when unset.
    pub port: Option<u16>,

    pub username: Option<String>,

    /// Password (plaintext, prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Override the per-attempt timeout (seconds).
    pub timeout: Option<u64>,

    /// Accept the unit's self-signed certificate and legacy ciphers.
    /// Defaults to `true`; only a TLS-terminating proxy allows `false`.
    pub insecure_tls: Option<bool>,

    /// Custom CA certificate, used when `insecure_tls = false`.
    pub ca_cert: Option<PathBuf>,

    /// Use rustls instead of OpenSSL for the relaxed connection. Only
    /// newer firmware offers suites rustls accepts.
    pub rustls: Option<bool>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "isoft", "isoft").map_or_else(
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
    p.push("isoft");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from `path`, layering `ISOFT_`-prefixed environment on top.
///
/// Nested keys use a double underscore: `ISOFT_DEFAULTS__TIMEOUT=10`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ISOFT_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Keyring entry name holding a profile's password.
pub fn keyring_entry(profile_name: &str) -> String {
    format!("{profile_name}/password")
}

/// Store a profile's password in the system keyring.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_entry(profile_name))?;
    entry.set_password(password)?;
    Ok(())
}

fn keyring_password(entry_name: &str) -> Option<String> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, entry_name).ok()?;
    entry.get_password().ok()
}

/// Resolve `(username, password)` for a profile from the process
/// environment and the system keyring.
pub fn resolve_credentials(
    profile: &Profile,
    profile_name: &str,
) -> Result<(String, SecretString), ConfigError> {
    resolve_credentials_with(
        profile,
        profile_name,
        |name| std::env::var(name).ok(),
        keyring_password,
    )
}

/// Credential chain with pluggable lookups.
///
/// Password order: the profile's `password_env`, then `ISOFT_PASSWORD`,
/// then the keyring entry `<profile>/password`, then the plaintext field.
pub fn resolve_credentials_with(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> Result<(String, SecretString), ConfigError> {
    let no_credentials = || ConfigError::NoCredentials {
        profile: profile_name.into(),
    };

    let username = profile
        .username
        .clone()
        .or_else(|| env(USERNAME_ENV))
        .ok_or_else(no_credentials)?;

    if let Some(pw) = profile.password_env.as_deref().and_then(&env) {
        debug!(profile = profile_name, "password from profile env var");
        return Ok((username, SecretString::from(pw)));
    }

    if let Some(pw) = env(PASSWORD_ENV) {
        debug!(profile = profile_name, "password from {PASSWORD_ENV}");
        return Ok((username, SecretString::from(pw)));
    }

    if let Some(pw) = keyring(&keyring_entry(profile_name)) {
        debug!(profile = profile_name, "password from keyring");
        return Ok((username, SecretString::from(pw)));
    }

    if let Some(ref pw) = profile.password {
        return Ok((username, SecretString::from(pw.clone())));
    }

    Err(no_credentials())
}

/// TLS strategy for a profile.
pub fn profile_tls(profile: &Profile) -> TlsVerification {
    if profile.insecure_tls.unwrap_or(true) {
        if profile.rustls.unwrap_or(false) {
            TlsVerification::RelaxedRustls
        } else {
            TlsVerification::LegacyDevice
        }
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    }
}

/// Build a `DeviceConfig` from a profile with no CLI flag overrides.
pub fn profile_to_device_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<DeviceConfig, ConfigError> {
    if profile.host.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "host".into(),
            reason: format!("profile '{profile_name}' has no host"),
        });
    }

    let (username, password) = resolve_credentials(profile, profile_name)?;

    let mut config = DeviceConfig::new(profile.host.trim(), username, password);
    if let Some(port) = profile.port {
        config.port = port;
    }
    config.tls = profile_tls(profile);
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.max_attempts = defaults.max_attempts.max(1);
    Ok(config)
}
