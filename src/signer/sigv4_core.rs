//! Shared plumbing for every SigV4-family signer (generic header/query, and
//! the S3 overlays in [`super::s3`]). Keeping this in one leaf module is how
//! this crate avoids the import-cycle concern spec §9 raises for the
//! CRT-backed asymmetric signers: both families depend downward on this
//! module, and it depends on neither.

use sha2::{Digest, Sha256};

use crate::canonical::{self, STREAMING_UNSIGNED_PAYLOAD_TRAILER, UNSIGNED_PAYLOAD};
use crate::credentials::Credentials;
use crate::derive;
use crate::error::SignerError;
use crate::request::SignableRequest;

pub(crate) struct SigningOutcome {
    pub canonical_request: String,
    pub string_to_sign: String,
    pub signature: String,
    pub credential_scope: String,
    pub signed_headers: String,
}

/// The generic (non-S3) payload-signing policy: always sign over plain
/// HTTP, otherwise defer to `context.payload_signing_enabled` (default true).
pub(crate) fn should_sign_payload_generic(request: &SignableRequest) -> bool {
    if request.url.scheme() != "https" {
        return true;
    }
    request.context.payload_signing_enabled.unwrap_or(true)
}

/// Resolves the payload hash per spec §4.1's decision table, honoring an
/// already-present `X-Amz-Content-SHA256` header first (set either by the
/// S3 overlay's pre-signing step or by the caller for a streaming upload),
/// then the streaming-trailer marker, then the `should_sign` policy, then
/// the actual body hash. `forced` lets presigned-URL signers short-circuit
/// straight to a constant (they don't know the eventual body).
pub(crate) fn resolve_payload_hash(
    request: &mut SignableRequest,
    should_sign: bool,
    forced: Option<&str>,
) -> Result<String, SignerError> {
    if let Some(header_val) = request.header("x-amz-content-sha256") {
        return Ok(header_val.to_string());
    }
    if let Some(forced) = forced {
        return Ok(forced.to_string());
    }
    if request.context.is_streaming_trailer_checksum() {
        return Ok(STREAMING_UNSIGNED_PAYLOAD_TRAILER.to_string());
    }
    if !should_sign {
        return Ok(UNSIGNED_PAYLOAD.to_string());
    }
    Ok(canonical::hash_payload(&mut request.body)?)
}

/// Builds the canonical request, string-to-sign, and signature for a given
/// (already-resolved) payload hash and path-normalization policy. Does not
/// touch headers or the URL — callers inject/relocate params before or
/// after calling this, per their own `_modify_request_before_signing`.
pub(crate) fn compute_signature(
    credentials: &Credentials,
    service: &str,
    region: &str,
    request: &SignableRequest,
    normalize_path: bool,
    payload_hash: &str,
) -> Result<SigningOutcome, SignerError> {
    let timestamp = request
        .context
        .timestamp
        .clone()
        .expect("context.timestamp must be set before computing a signature");
    let date_stamp = timestamp[0..8].to_string();

    let headers_map = canonical::headers_to_sign(request);
    let path = canonical::canonical_path(request, normalize_path);
    let query = canonical::canonical_query_string(request);
    let signed_headers = canonical::signed_headers_list(&headers_map);

    let canonical_request =
        canonical::build_canonical_request(request.method.as_str(), &path, &query, &headers_map, payload_hash);
    let canonical_request_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));

    let credential_scope = derive::credential_scope(&date_stamp, region, service);
    let string_to_sign = derive::string_to_sign(&timestamp, &credential_scope, &canonical_request_hash);
    let signature = derive::derive_and_sign(&credentials.secret_key, &date_stamp, region, service, &string_to_sign);

    tracing::debug!(%canonical_request, "sigv4 canonical request");
    tracing::debug!(%string_to_sign, "sigv4 string to sign");
    tracing::debug!(%signature, "sigv4 signature");

    Ok(SigningOutcome {
        canonical_request,
        string_to_sign,
        signature,
        credential_scope,
        signed_headers,
    })
}

pub(crate) fn full_scope(credentials: &Credentials, date_stamp: &str, region: &str, service: &str) -> String {
    derive::full_scope(&credentials.access_key, date_stamp, region, service)
}

/// Drop-then-reset pattern used throughout: a retried request must not carry
/// a stale `Authorization`/date/token/content-sha256 header forward.
pub(crate) fn reset_header(request: &mut SignableRequest, name: &str, value: Option<&str>) {
    request.remove_header(name);
    if let Some(value) = value {
        request.set_header(name, value);
    }
}
