//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use isoft_config::ConfigError;
use isoft_core::{CoreError, ErrorKind};

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the softener")]
    #[diagnostic(
        code(isoft::connection_failed),
        help(
            "Check that the unit is powered and reachable on port 8124.\n\
             Try: isoft check -v"
        )
    )]
    ConnectionFailed {
        #[source]
        source: CoreError,
    },

    #[error("Request timed out")]
    #[diagnostic(
        code(isoft::timeout),
        help("Increase timeout with --timeout or check the unit's network link.")
    )]
    Timeout {
        #[source]
        source: CoreError,
    },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed")]
    #[diagnostic(
        code(isoft::auth_failed),
        help(
            "Verify the user name and password configured for this unit.\n\
             Run: isoft config set-password"
        )
    )]
    AuthFailed {
        #[source]
        source: CoreError,
    },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(isoft::no_credentials),
        help(
            "Configure credentials with: isoft config init\n\
             Or set ISOFT_USERNAME and ISOFT_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    // ── Device ───────────────────────────────────────────────────────

    #[error("The softener sent an unexpected reply")]
    #[diagnostic(
        code(isoft::protocol),
        help("Run with -vv to see the request sequence.")
    )]
    Protocol {
        #[source]
        source: CoreError,
    },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(isoft::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(isoft::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: isoft config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No device configured")]
    #[diagnostic(
        code(isoft::no_config),
        help(
            "Create a profile with: isoft config init\n\
             Or pass --host. Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(isoft::config))]
    Config(ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to render TOML: {0}")]
    Toml(#[from] toml::ser::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── Library error mapping ────────────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err.kind() {
            ErrorKind::Authentication => Self::AuthFailed { source: err },
            ErrorKind::Communication if is_timeout(&err) => Self::Timeout { source: err },
            ErrorKind::Communication => Self::ConnectionFailed { source: err },
            ErrorKind::Protocol => Self::Protocol { source: err },
        }
    }
}

fn is_timeout(err: &CoreError) -> bool {
    matches!(err, CoreError::Api(api) if api.is_timeout())
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(other),
        }
    }
}
