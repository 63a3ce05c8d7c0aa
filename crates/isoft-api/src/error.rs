use thiserror::Error;

/// Boxed underlying cause carried by transport and protocol errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The three failure families callers branch on.
///
/// Every [`Error`] maps to exactly one kind via [`Error::kind`], so
/// consumers can catch "bad credentials" or "device unreachable" without
/// matching individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Credentials rejected (HTTP 401/403 or a refused login command).
    Authentication,
    /// The device could not be reached or kept failing after retries.
    Communication,
    /// Anything else unexpected: malformed payloads, broken invariants.
    Protocol,
}

/// Top-level error type for the `isoft-api` crate.
///
/// The original cause is always preserved through `#[source]`, so a
/// report walks the full chain down to the `reqwest` or `serde_json`
/// error that started it.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// HTTP 401/403, or the device refused the login command.
    #[error("Authentication failed: {message}")]
    Authentication {
        message: String,
        /// HTTP status, when the rejection came from the HTTP layer.
        status: Option<u16>,
    },

    // ── Transport ───────────────────────────────────────────────────
    /// Timeouts, connect/DNS failures and non-2xx statuses that survived
    /// every retry attempt.
    #[error("Communication error after {attempts} attempt(s): {message}")]
    Communication {
        message: String,
        attempts: u32,
        #[source]
        source: BoxError,
    },

    /// URL construction failed (bad host or port).
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS configuration or HTTP client construction failed.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Protocol ────────────────────────────────────────────────────
    /// Unexpected device behaviour or an undecodable response.
    #[error("Protocol error: {message}")]
    Protocol {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl Error {
    /// The failure family this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::Communication { .. } => ErrorKind::Communication,
            Self::InvalidUrl(_) | Self::Tls(_) | Self::Protocol { .. } => ErrorKind::Protocol,
        }
    }

    /// Shorthand for a protocol error without an underlying cause.
    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
            source: None,
        }
    }

    /// Returns `true` if the device rejected the credentials.
    pub fn is_auth(&self) -> bool {
        self.kind() == ErrorKind::Authentication
    }

    /// Returns `true` if the failure was a timeout at the transport layer.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Communication { source, .. } => {
                source.is::<tokio::time::error::Elapsed>()
                    || source
                        .downcast_ref::<reqwest::Error>()
                        .is_some_and(reqwest::Error::is_timeout)
            }
            _ => false,
        }
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { status, .. } => *status,
            Self::Communication { source, .. } => source
                .downcast_ref::<reqwest::Error>()
                .and_then(reqwest::Error::status)
                .or_else(|| {
                    source
                        .downcast_ref::<crate::tls::UnexpectedStatus>()
                        .map(|s| s.0)
                })
                .map(|s| s.as_u16()),
            _ => None,
        }
    }
}
