//! The per-request signing context.
//!
//! The context is the side-channel between the request-serialization layer
//! and the signer: a small, mostly-closed set of recognized keys, with an
//! escape hatch for anything a collaborator stashes that this crate doesn't
//! know about. Unknown keys are preserved opaquely rather than dropped.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Where an in-flight checksum lives on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumLocation {
    Header,
    Trailer,
}

/// Describes a checksum the request serializer attached, named by
/// `context.checksum.request_algorithm` in the spec.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumAlgorithm {
    #[serde(rename = "in")]
    pub location: ChecksumLocation,
    /// Header name carrying the checksum, when `location` is `Header`.
    /// Defaults to `Content-MD5` when absent, per the S3 payload-signing
    /// policy overlay.
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChecksumContext {
    pub request_algorithm: Option<ChecksumAlgorithm>,
}

/// S3-specific client configuration consulted by the S3 payload-signing
/// policy overlay (`context.client_config.s3.payload_signing_enabled`).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct S3ClientConfig {
    pub payload_signing_enabled: Option<bool>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    pub s3: Option<S3ClientConfig>,
}

/// Fields and conditions threaded through the presigned-POST signers across
/// repeated calls (so outer collaborators may add their own conditions
/// before the signer appends its own and signs the final policy).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PresignPostPolicy {
    #[serde(default)]
    pub conditions: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The per-request context map described in spec §3.
#[derive(Clone, Debug, Default)]
pub struct SigningContext {
    /// Fixed once at the start of `add_auth`, in `%Y%m%dT%H%M%SZ` form.
    pub timestamp: Option<String>,
    pub payload_signing_enabled: Option<bool>,
    pub has_streaming_input: bool,
    pub checksum: Option<ChecksumContext>,
    pub client_config: Option<ClientConfig>,
    pub s3_presign_post_fields: Option<Map<String, Value>>,
    pub s3_presign_post_policy: Option<PresignPostPolicy>,
    /// Unrecognized keys, preserved opaquely for other collaborators.
    pub extra: Map<String, Value>,
}

impl SigningContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The 8-digit date prefix of `timestamp` (`YYYYMMDD`), used in the
    /// credential scope and key-derivation chain.
    pub fn date_stamp(&self) -> Option<&str> {
        self.timestamp.as_deref().map(|t| &t[0..8])
    }

    pub fn is_streaming_trailer_checksum(&self) -> bool {
        matches!(
            self.checksum.as_ref().and_then(|c| c.request_algorithm.as_ref()),
            Some(ChecksumAlgorithm {
                location: ChecksumLocation::Trailer,
                ..
            })
        )
    }
}
