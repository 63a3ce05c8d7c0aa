// ── Core error types ──
//
// Protocol-level failures pass through unchanged so callers keep the
// full cause chain. Core only adds the ways a well-formed reply can
// still be unusable.

use isoft_api::ErrorKind;
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Anything the client or transport raised.
    #[error(transparent)]
    Api(#[from] isoft_api::Error),

    /// A command answered with data of the wrong shape.
    #[error("Unexpected '{command}' payload: {payload}")]
    Payload { command: String, payload: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Failure family, mirroring [`isoft_api::Error::kind`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Api(e) => e.kind(),
            Self::Payload { .. } | Self::Config { .. } => ErrorKind::Protocol,
        }
    }

    pub(crate) fn payload(command: &str, payload: impl std::fmt::Display) -> Self {
        Self::Payload {
            command: command.into(),
            payload: payload.to_string(),
        }
    }
}
