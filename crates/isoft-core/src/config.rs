// ── Runtime connection configuration ──
//
// These types describe *how* to reach one softener. They carry
// credential data and connection tuning, but never touch disk.
// The CLI constructs a `DeviceConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use isoft_api::{DEFAULT_PORT, IsoftClient, RetryPolicy, TlsMode, TransportConfig};
use secrecy::SecretString;
use url::Url;

use crate::error::CoreError;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// Relaxed OpenSSL profile the appliance requires (self-signed
    /// certificate, legacy ciphers, no hostname check).
    #[default]
    LegacyDevice,
    /// Relaxed checks over rustls, for units that offer modern suites.
    RelaxedRustls,
    /// System CA store (strict). Only useful behind a TLS proxy.
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
}

impl From<&TlsVerification> for TlsMode {
    fn from(tls: &TlsVerification) -> Self {
        match tls {
            TlsVerification::LegacyDevice => Self::LegacyDevice,
            TlsVerification::RelaxedRustls => Self::RelaxedRustls,
            TlsVerification::SystemDefaults => Self::System,
            TlsVerification::CustomCa(path) => Self::CustomCa(path.clone()),
        }
    }
}

/// Configuration for talking to a single softener.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Device IP address or host name.
    pub host: String,
    /// Control port (8124 on every known firmware).
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub tls: TlsVerification,
    /// Bound for a single request attempt.
    pub timeout: Duration,
    /// Total attempts per request, first one included.
    pub max_attempts: u32,
    /// Full endpoint override, e.g. a reverse proxy in front of the unit.
    pub base_url: Option<Url>,
}

impl DeviceConfig {
    pub fn new(host: impl Into<String>, username: impl Into<String>, password: SecretString) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            username: username.into(),
            password,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            max_attempts: RetryPolicy::default().max_attempts,
            base_url: None,
        }
    }

    /// The endpoint every command is sent to.
    pub fn endpoint(&self) -> Result<Url, CoreError> {
        if let Some(url) = &self.base_url {
            return Ok(url.clone());
        }
        if self.host.trim().is_empty() {
            return Err(CoreError::Config {
                message: "device host is empty".into(),
            });
        }
        Ok(IsoftClient::device_url(self.host.trim(), self.port)?)
    }

    /// Transport settings derived from this config.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: TlsMode::from(&self.tls),
            timeout: self.timeout,
            retry: RetryPolicy::default(),
        }
        .with_max_attempts(self.max_attempts)
    }
}
