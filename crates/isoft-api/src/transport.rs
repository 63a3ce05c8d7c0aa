// Shared transport for the appliance protocol.
//
// Owns the `reqwest::Client`, the per-attempt timeout and the retry
// loop. Every request is a single GET whose JSON body is decoded here;
// callers above never see HTTP status codes or raw bodies.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use http_body_util::BodyExt;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{trace, warn};
use url::Url;

use crate::error::{BoxError, Error};
use crate::tls::{self, LegacyConnector, UnexpectedStatus};

pub(crate) const USER_AGENT: &str = concat!("isoft/", env!("CARGO_PKG_VERSION"));

/// TLS verification mode for the HTTP client.
#[derive(Debug, Clone, Default)]
pub enum TlsMode {
    /// Relaxed OpenSSL profile the appliance needs: cipher policy
    /// `DEFAULT:@SECLEVEL=0`, TLS 1.0 and up, no certificate or
    /// hostname checks.
    #[default]
    LegacyDevice,
    /// No certificate or hostname checks over rustls. Only reaches units
    /// that offer a TLS 1.2+ suite with forward secrecy.
    RelaxedRustls,
    /// Use the system certificate store.
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
}

/// Bounded immediate retry. No delay is inserted between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per request, including the first one.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 4 }
    }
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    /// Upper bound for one attempt (send, body read and decode).
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::LegacyDevice,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    ///
    /// [`TlsMode::LegacyDevice`] is served by OpenSSL, not reqwest, and
    /// is rejected here; [`Transport::new`] handles it.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT);

        match &self.tls {
            TlsMode::LegacyDevice => {
                return Err(Error::Tls(
                    "the legacy device profile uses the OpenSSL connector".into(),
                ));
            }
            TlsMode::RelaxedRustls => {
                builder = builder.use_preconfigured_tls(tls::relaxed_rustls_config()?);
            }
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.retry = RetryPolicy {
            max_attempts: max_attempts.max(1),
        };
        self
    }
}

// ── Failure classes ─────────────────────────────────────────────────

/// Why a single attempt failed. Each class maps to its own error kind
/// once the retry budget is spent.
enum Failure {
    Timeout(BoxError),
    Network(BoxError),
    Unexpected(BoxError),
}

impl Failure {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(Box::new(err))
        } else {
            Self::Network(Box::new(err))
        }
    }

    /// A body that arrived but could not be read counts as unexpected.
    fn from_body(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(Box::new(err))
        } else {
            Self::Unexpected(Box::new(err))
        }
    }

    fn into_error(self, attempts: u32) -> Error {
        match self {
            Self::Timeout(source) => Error::Communication {
                message: format!("timeout fetching information - {source}"),
                attempts,
                source,
            },
            Self::Network(source) => Error::Communication {
                message: format!("error fetching information - {source}"),
                attempts,
                source,
            },
            Self::Unexpected(source) => Error::Protocol {
                message: format!("unexpected failure after {attempts} attempt(s) - {source}"),
                source: Some(source),
            },
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(e) => write!(f, "timeout: {e}"),
            Self::Network(e) => write!(f, "network: {e}"),
            Self::Unexpected(e) => write!(f, "unexpected: {e}"),
        }
    }
}

/// Outcome of one attempt that is not retried.
enum Attempt<T> {
    Done(T),
    Rejected(StatusCode),
}

// ── Transport ───────────────────────────────────────────────────────

/// HTTP stack a transport sends through.
#[derive(Debug, Clone)]
enum Backend {
    Reqwest(reqwest::Client),
    OpenSsl(LegacyConnector),
}

/// Issues GET requests to the appliance with timeout and retry.
#[derive(Debug, Clone)]
pub struct Transport {
    backend: Backend,
    timeout: Duration,
    retry: RetryPolicy,
}

impl Transport {
    /// Build a transport (and its HTTP client) from a config.
    pub fn new(config: &TransportConfig) -> Result<Self, Error> {
        let backend = match config.tls {
            TlsMode::LegacyDevice => Backend::OpenSsl(LegacyConnector::new(USER_AGENT)?),
            _ => Backend::Reqwest(config.build_client()?),
        };
        Ok(Self {
            backend,
            timeout: config.timeout,
            retry: config.retry,
        })
    }

    /// Wrap an HTTP client owned by the caller.
    ///
    /// The client's own TLS settings are used as-is; the caller is
    /// responsible for building it with [`TransportConfig::build_client`]
    /// or an equivalent relaxed profile.
    pub fn with_client(http: reqwest::Client, timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            backend: Backend::Reqwest(http),
            timeout,
            retry,
        }
    }

    /// `true` when requests go through the OpenSSL device profile.
    pub fn uses_legacy_tls(&self) -> bool {
        matches!(self.backend, Backend::OpenSsl(_))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// GET `url` and decode the JSON body.
    ///
    /// Timeouts, network failures and undecodable bodies are retried
    /// immediately until `max_attempts` is reached. HTTP 401/403 fails
    /// at once with [`Error::Authentication`].
    pub async fn submit<T: DeserializeOwned>(&self, url: &Url) -> Result<T, Error> {
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            trace!(attempt = attempts, "submitting request");

            let failure = match tokio::time::timeout(self.timeout, self.attempt(url)).await {
                Ok(Ok(Attempt::Done(body))) => return Ok(body),
                Ok(Ok(Attempt::Rejected(status))) => {
                    return Err(Error::Authentication {
                        message: format!("invalid credentials (HTTP {status})"),
                        status: Some(status.as_u16()),
                    });
                }
                Ok(Err(failure)) => failure,
                Err(elapsed) => Failure::Timeout(Box::new(elapsed)),
            };

            warn!(attempt = attempts, "request failed: {failure}");
            if attempts >= self.retry.max_attempts {
                return Err(failure.into_error(attempts));
            }
        }
    }

    async fn attempt<T: DeserializeOwned>(&self, url: &Url) -> Result<Attempt<T>, Failure> {
        let fetched = match &self.backend {
            Backend::Reqwest(http) => fetch_reqwest(http, url).await?,
            Backend::OpenSsl(connector) => fetch_openssl(connector, url).await?,
        };
        let body = match fetched {
            Attempt::Done(body) => body,
            Attempt::Rejected(status) => return Ok(Attempt::Rejected(status)),
        };
        trace!(body = %body, "response body");

        // The device does not reliably label its JSON, so decode the text.
        serde_json::from_str(&body)
            .map(Attempt::Done)
            .map_err(|e| Failure::Unexpected(Box::new(e)))
    }
}

fn is_rejection(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

async fn fetch_reqwest(http: &reqwest::Client, url: &Url) -> Result<Attempt<String>, Failure> {
    let resp = http
        .get(url.clone())
        .send()
        .await
        .map_err(Failure::from_reqwest)?;

    let status = resp.status();
    if is_rejection(status) {
        return Ok(Attempt::Rejected(status));
    }

    let resp = resp.error_for_status().map_err(Failure::from_reqwest)?;
    resp.text()
        .await
        .map(Attempt::Done)
        .map_err(Failure::from_body)
}

async fn fetch_openssl(connector: &LegacyConnector, url: &Url) -> Result<Attempt<String>, Failure> {
    let resp = connector.send(url).await.map_err(Failure::Network)?;

    let status = resp.status();
    if is_rejection(status) {
        return Ok(Attempt::Rejected(status));
    }
    if !status.is_success() {
        return Err(Failure::Network(Box::new(UnexpectedStatus(status))));
    }

    let body = resp
        .into_body()
        .collect()
        .await
        .map_err(|e| Failure::Unexpected(Box::new(e)))?
        .to_bytes();
    Ok(Attempt::Done(String::from_utf8_lossy(&body).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_device_expectations() {
        let config = TransportConfig::default();
        assert!(matches!(config.tls, TlsMode::LegacyDevice));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.retry.max_attempts, 4);
    }

    #[test]
    fn max_attempts_never_drops_below_one() {
        let config = TransportConfig::default().with_max_attempts(0);
        assert_eq!(config.retry.max_attempts, 1);
    }

    #[test]
    fn exhausted_classes_map_to_kinds() {
        use crate::error::ErrorKind;

        let io = || Box::new(std::io::Error::other("boom")) as BoxError;
        assert_eq!(
            Failure::Timeout(io()).into_error(4).kind(),
            ErrorKind::Communication
        );
        assert_eq!(
            Failure::Network(io()).into_error(4).kind(),
            ErrorKind::Communication
        );
        assert_eq!(
            Failure::Unexpected(io()).into_error(4).kind(),
            ErrorKind::Protocol
        );
    }

    #[test]
    fn legacy_profile_goes_through_openssl() {
        let transport =
            Transport::new(&TransportConfig::default()).unwrap_or_else(|e| panic!("{e}"));
        assert!(transport.uses_legacy_tls());
        assert!(matches!(
            TransportConfig::default().build_client(),
            Err(Error::Tls(_))
        ));

        let rustls = TransportConfig {
            tls: TlsMode::RelaxedRustls,
            ..TransportConfig::default()
        };
        let transport = Transport::new(&rustls).unwrap_or_else(|e| panic!("{e}"));
        assert!(!transport.uses_legacy_tls());
    }

    #[test]
    fn custom_ca_missing_file_is_tls_error() {
        let config = TransportConfig {
            tls: TlsMode::CustomCa(PathBuf::from("/nonexistent/isoft-ca.pem")),
            ..TransportConfig::default()
        };
        let err = config.build_client().err();
        assert!(matches!(err, Some(Error::Tls(_))));
    }
}
