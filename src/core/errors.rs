use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification used by callers to decide how to react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// Malformed address, seed, asset, amount or offer id. Detected before any I/O.
    InvalidInput,
    /// Pipeline misuse: build/sign/submit out of order or repeated.
    StateError,
    /// Serialization or signing failure.
    EncodingError,
    /// Network or HTTP failure.
    TransportError,
    /// The ledger accepted the request but rejected the transaction.
    LedgerRejected,
    /// A stream ended unexpectedly. Recovered by the reconnect loop.
    StreamDisconnected,
}

/// Result codes attached to a rejected transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultCodes {
    #[serde(default)]
    pub transaction: String,
    #[serde(default)]
    pub operations: Vec<String>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid seed: {0}")]
    InvalidSeed(String),

    #[error("invalid asset: {0}")]
    InvalidAsset(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid offer id: {0}")]
    InvalidOfferId(String),

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("transaction already built")]
    AlreadyBuilt,

    #[error("transaction is empty")]
    EmptyTransaction,

    #[error("transaction already signed")]
    AlreadySigned,

    #[error("transaction not signed")]
    NotSigned,

    #[error("transaction already submitted")]
    AlreadySubmitted,

    #[error("not a multi-op transaction")]
    NotMultiOp,

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("signing error: {0}")]
    SigningError(String),

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("API error: {code} - {message}")]
    ApiError { code: i32, message: String },

    #[error("deserialization error: {0}")]
    DeserializationError(String),

    #[error("submit failed: {0}")]
    SubmitError(Box<LedgerError>),

    #[error("{status}: {title}")]
    LedgerRejected {
        status: u16,
        title: String,
        detail: String,
        result_codes: Option<ResultCodes>,
    },

    #[error("stream disconnected: {0}")]
    StreamDisconnected(String),

    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAddress(_)
            | Self::InvalidSeed(_)
            | Self::InvalidAsset(_)
            | Self::InvalidAmount(_)
            | Self::InvalidOfferId(_)
            | Self::InvalidParameters(_)
            | Self::ConfigError(_) => ErrorKind::InvalidInput,
            Self::AlreadyBuilt
            | Self::EmptyTransaction
            | Self::AlreadySigned
            | Self::NotSigned
            | Self::AlreadySubmitted
            | Self::NotMultiOp => ErrorKind::StateError,
            Self::EncodingError(_) | Self::SigningError(_) | Self::DeserializationError(_) => {
                ErrorKind::EncodingError
            }
            Self::NetworkError(_) | Self::ApiError { .. } => ErrorKind::TransportError,
            Self::LedgerRejected { .. } => ErrorKind::LedgerRejected,
            Self::StreamDisconnected(_) => ErrorKind::StreamDisconnected,
            Self::SubmitError(inner) => match inner.kind() {
                ErrorKind::LedgerRejected => ErrorKind::LedgerRejected,
                _ => ErrorKind::TransportError,
            },
        }
    }

    /// Structured ledger result codes, when the remote ledger supplied them.
    pub fn result_codes(&self) -> Option<&ResultCodes> {
        match self {
            Self::LedgerRejected { result_codes, .. } => result_codes.as_ref(),
            Self::SubmitError(inner) => inner.result_codes(),
            _ => None,
        }
    }

    /// One-line rendering for human-facing layers.
    ///
    /// Rejections read `"<status>: <title> (<tx code>, <op code>...)"`; every
    /// other error falls back to its `Display` form.
    pub fn summary(&self) -> String {
        match self {
            Self::LedgerRejected {
                status,
                title,
                result_codes,
                ..
            } => match result_codes {
                Some(codes) => {
                    let mut parts = vec![codes.transaction.clone()];
                    parts.extend(codes.operations.iter().cloned());
                    let parts: Vec<_> = parts.into_iter().filter(|p| !p.is_empty()).collect();
                    if parts.is_empty() {
                        format!("{}: {}", status, title)
                    } else {
                        format!("{}: {} ({})", status, title, parts.join(", "))
                    }
                }
                None => format!("{}: {}", status, title),
            },
            Self::SubmitError(inner) => inner.summary(),
            other => other.to_string(),
        }
    }

    pub fn is_state_error(&self) -> bool {
        self.kind() == ErrorKind::StateError
    }
}

impl From<reqwest::Error> for LedgerError {
    fn from(err: reqwest::Error) -> Self {
        Self::NetworkError(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::DeserializationError(err.to_string())
    }
}

impl From<crate::core::config::ConfigError> for LedgerError {
    fn from(err: crate::core::config::ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}
