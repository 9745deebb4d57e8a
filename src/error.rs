//! Errors surfaced by the signing core.

use thiserror::Error;

/// Errors raised while signing a request.
///
/// All variants are raised synchronously before any mutation of the request
/// becomes observable externally — a signer prefers to fail before injecting
/// partial state. None of these are retryable at this layer.
#[derive(Debug, Error)]
pub enum SignerError {
    #[error("no credentials available for signing")]
    NoCredentials,

    #[error("no authorization token available for signing")]
    NoAuthToken,

    #[error("unknown signature version: {0}")]
    UnknownSignatureVersion(String),

    #[error("unsupported signature version, tried: {0:?}")]
    UnsupportedSignatureVersion(Vec<String>),

    #[error("{0} is not implemented by this signing core")]
    Unimplemented(&'static str),

    #[error("failed to read or seek the request body: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize presigned POST policy: {0}")]
    Policy(#[from] serde_json::Error),
}
