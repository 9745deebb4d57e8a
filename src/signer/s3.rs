//! S3's deviations from the generic SigV4 family (spec §4.9–§4.12):
//! unnormalized paths, S3-specific payload-signing policy, presigned POST
//! policy signing, and the S3 Express session-token overlay.

use std::sync::Arc;

use crate::canonical::UNSIGNED_PAYLOAD;
use crate::clock::{Clock, SystemClock};
use crate::context::SigningContext;
use crate::credentials::Credentials;
use crate::error::SignerError;
use crate::request::SignableRequest;
use crate::timestamp;

use super::sigv4::{relocate_params_for_presign, SigV4HeaderSigner};
use super::sigv4_core::{
    compute_signature, full_scope, reset_header, resolve_payload_hash, should_sign_payload_generic,
};
use super::{Signer, SignerCapabilities};

pub const CAPABILITIES: SignerCapabilities = SignerCapabilities {
    requires_region: true,
    requires_token: false,
    requires_identity_cache: false,
};

/// S3's payload-signing policy (spec §4.9): the explicit S3 config override
/// wins; otherwise plain-HTTP or a missing checksum header forces signing
/// (S3 needs *some* tamper detection); with HTTPS and a checksum present,
/// a streaming body skips signing outright and everything else falls
/// through to the generic SigV4 policy.
pub(crate) fn should_sign_payload_s3(request: &SignableRequest) -> bool {
    if let Some(explicit) = s3_payload_signing_enabled(&request.context) {
        return explicit;
    }
    if request.url.scheme() != "https" || !has_checksum_header(request) {
        return true;
    }
    if request.context.has_streaming_input {
        return false;
    }
    should_sign_payload_generic(request)
}

fn s3_payload_signing_enabled(context: &SigningContext) -> Option<bool> {
    context.client_config.as_ref()?.s3.as_ref()?.payload_signing_enabled
}

/// True when the request already carries the checksum header S3 treats as
/// adequate tamper detection without a signed body: `Content-MD5` by
/// default, or whatever header name an in-header checksum algorithm names.
fn has_checksum_header(request: &SignableRequest) -> bool {
    let header_name = request
        .context
        .checksum
        .as_ref()
        .and_then(|c| c.request_algorithm.as_ref())
        .filter(|checksum| matches!(checksum.location, crate::context::ChecksumLocation::Header))
        .and_then(|checksum| checksum.name.as_deref())
        .unwrap_or("content-md5");
    request.header(header_name).is_some()
}

/// Signs an S3 request with SigV4, injecting an `Authorization` header.
/// The path is never normalized and `X-Amz-Content-SHA256` is always
/// (re)computed and set as a visible header, per spec §4.9.
pub struct S3SigV4HeaderSigner {
    credentials: Credentials,
    region_name: String,
    clock: Arc<dyn Clock>,
}

impl S3SigV4HeaderSigner {
    pub fn new(credentials: Credentials, region_name: impl Into<String>) -> Self {
        Self {
            credentials,
            region_name: region_name.into(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl Signer for S3SigV4HeaderSigner {
    fn add_auth(&self, request: &mut SignableRequest) -> Result<(), SignerError> {
        let now = self.clock.now();
        SigV4HeaderSigner::modify_request_before_signing(request, &self.credentials, now);
        // A retried request must not carry a stale `X-Amz-Content-SHA256`
        // forward into `resolve_payload_hash`, which would otherwise read it
        // back verbatim instead of recomputing against a possibly-changed
        // body (mirrors `S3SigV4Auth._modify_request_before_signing` in
        // botocore, which deletes the header before every recompute).
        request.remove_header("X-Amz-Content-SHA256");

        let should_sign = should_sign_payload_s3(request);
        let payload_hash = resolve_payload_hash(request, should_sign, None)?;
        // S3 always surfaces the resolved hash as a visible header, even
        // when it resolves to `UNSIGNED-PAYLOAD`.
        reset_header(request, "X-Amz-Content-SHA256", Some(&payload_hash));

        let outcome = compute_signature(&self.credentials, "s3", &self.region_name, request, false, &payload_hash)?;

        SigV4HeaderSigner::inject_authorization(
            request,
            &self.credentials,
            "s3",
            &self.region_name,
            &outcome.signed_headers,
            &outcome.signature,
        );
        Ok(())
    }
}

/// S3's presigned-URL signer: like [`super::sigv4::SigV4QuerySigner`], but
/// never normalizes the path and always signs `UNSIGNED-PAYLOAD` (presigned
/// URLs commit to a signature before the eventual body is known).
pub struct S3SigV4QuerySigner {
    credentials: Credentials,
    region_name: String,
    expires: u64,
    clock: Arc<dyn Clock>,
}

impl S3SigV4QuerySigner {
    pub fn new(credentials: Credentials, region_name: impl Into<String>) -> Self {
        Self {
            credentials,
            region_name: region_name.into(),
            expires: super::sigv4::DEFAULT_EXPIRES,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_expires(mut self, expires: u64) -> Self {
        self.expires = expires;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl Signer for S3SigV4QuerySigner {
    fn add_auth(&self, request: &mut SignableRequest) -> Result<(), SignerError> {
        let now = self.clock.now();
        request.context.timestamp = Some(timestamp::sigv4_timestamp(now));
        let ts = request.context.timestamp.clone().unwrap();
        let date_stamp = ts[0..8].to_string();
        let scope = full_scope(&self.credentials, &date_stamp, &self.region_name, "s3");

        relocate_params_for_presign(request, &self.credentials, &scope, &ts, self.expires, "X-Amz-Security-Token");

        let payload_hash = resolve_payload_hash(request, false, Some(UNSIGNED_PAYLOAD))?;
        let outcome = compute_signature(&self.credentials, "s3", &self.region_name, request, false, &payload_hash)?;

        let appended = format!(
            "{}&X-Amz-Signature={}",
            request.url.query().unwrap_or(""),
            outcome.signature
        );
        request.url.set_query(Some(&appended));
        Ok(())
    }
}

/// Appends the standard auth fields/conditions to a presigned-POST policy
/// document (spec §4.11), base64-encodes it, and signs that base64 string
/// as the string-to-sign — the policy stands in for the canonical-request
/// hash. `session_token` is `(field name, value)`, since S3 Express names
/// the field differently from the generic scheme.
fn sign_post_policy(
    credentials: &Credentials,
    region_name: &str,
    session_token: Option<(&str, &str)>,
    policy: &mut crate::context::PresignPostPolicy,
    fields: &mut serde_json::Map<String, serde_json::Value>,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<(), SignerError> {
    let timestamp = timestamp::sigv4_timestamp(now);
    let date_stamp = timestamp[0..8].to_string();
    let scope = full_scope(credentials, &date_stamp, region_name, "s3");

    let mut auth_fields = serde_json::Map::new();
    auth_fields.insert("x-amz-algorithm".into(), "AWS4-HMAC-SHA256".into());
    auth_fields.insert("x-amz-credential".into(), scope.into());
    auth_fields.insert("x-amz-date".into(), timestamp.clone().into());
    if let Some((field, token)) = session_token {
        auth_fields.insert(field.into(), token.into());
    }

    for (key, value) in &auth_fields {
        let mut condition = serde_json::Map::new();
        condition.insert(key.clone(), value.clone());
        policy.conditions.push(serde_json::Value::Object(condition));
    }
    fields.extend(auth_fields);

    let mut document = policy.extra.clone();
    document.insert(
        "conditions".into(),
        serde_json::Value::Array(policy.conditions.clone()),
    );
    let policy_json = serde_json::to_vec(&serde_json::Value::Object(document))?;
    use base64::Engine;
    let policy_b64 = base64::engine::general_purpose::STANDARD.encode(&policy_json);

    let signature =
        crate::derive::derive_and_sign(&credentials.secret_key, &date_stamp, region_name, "s3", &policy_b64);

    fields.insert("policy".into(), policy_b64.into());
    fields.insert("x-amz-signature".into(), signature.into());
    Ok(())
}

pub const POST_CAPABILITIES: SignerCapabilities = SignerCapabilities {
    requires_region: true,
    requires_token: false,
    requires_identity_cache: false,
};

/// Signs a presigned-POST policy document (spec §4.11). Unlike the header
/// and query signers, this never touches `request.headers`/`request.url` —
/// it reads `request.context.s3-presign-post-policy` (initializing an empty
/// one if absent), appends the standard auth conditions, signs, and writes
/// the complete field map (`policy`, `x-amz-*` metadata, `x-amz-signature`)
/// back to `request.context.s3-presign-post-fields` for the caller to embed
/// in the multipart form.
pub struct S3SigV4PostSigner {
    credentials: Credentials,
    region_name: String,
    clock: Arc<dyn Clock>,
}

impl S3SigV4PostSigner {
    pub fn new(credentials: Credentials, region_name: impl Into<String>) -> Self {
        Self {
            credentials,
            region_name: region_name.into(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl Signer for S3SigV4PostSigner {
    fn add_auth(&self, request: &mut SignableRequest) -> Result<(), SignerError> {
        let now = self.clock.now();
        request.context.timestamp = Some(timestamp::sigv4_timestamp(now));

        let mut policy = request.context.s3_presign_post_policy.take().unwrap_or_default();
        let mut fields = request.context.s3_presign_post_fields.take().unwrap_or_default();

        let session_token = self
            .credentials
            .session_token
            .as_ref()
            .map(|t| ("x-amz-security-token", t.expose()));
        sign_post_policy(
            &self.credentials,
            &self.region_name,
            session_token,
            &mut policy,
            &mut fields,
            now,
        )?;

        request.context.s3_presign_post_policy = Some(policy);
        request.context.s3_presign_post_fields = Some(fields);
        Ok(())
    }
}

/// S3 Express uses `X-Amz-S3session-Token`/`x-amz-s3session-token` in place
/// of the generic security-token header, and its credentials never carry a
/// separate `session_token` — the directory-bucket session token travels
/// as its own identity-cache-sourced value (spec §4.12's "S3 Express"
/// overlay). `requires_identity_cache` is set so callers know to supply one,
/// even though this crate only passes it through opaquely.
pub struct S3ExpressHeaderSigner {
    inner: S3SigV4HeaderSigner,
    session_token: crate::credentials::SecretString,
    _identity_cache: Arc<dyn crate::identity_cache::IdentityCache>,
}

pub const EXPRESS_CAPABILITIES: SignerCapabilities = SignerCapabilities {
    requires_region: true,
    requires_token: false,
    requires_identity_cache: true,
};

impl S3ExpressHeaderSigner {
    pub fn new(
        credentials: Credentials,
        region_name: impl Into<String>,
        session_token: impl Into<crate::credentials::SecretString>,
        identity_cache: Arc<dyn crate::identity_cache::IdentityCache>,
    ) -> Self {
        Self {
            inner: S3SigV4HeaderSigner::new(credentials, region_name),
            session_token: session_token.into(),
            _identity_cache: identity_cache,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.inner = self.inner.with_clock(clock);
        self
    }
}

impl Signer for S3ExpressHeaderSigner {
    fn add_auth(&self, request: &mut SignableRequest) -> Result<(), SignerError> {
        reset_header(request, "X-Amz-S3session-Token", Some(self.session_token.expose()));
        self.inner.add_auth(request)?;
        // S3 Express does not support STS' `X-Amz-Security-Token`; the inner
        // signer may have set it from `credentials.session_token`, so strip
        // it after delegating rather than teach the inner signer about the
        // S3 Express session-token scheme.
        request.remove_header("X-Amz-Security-Token");
        Ok(())
    }
}

/// S3 Express overlay for the presigned-URL signer: same as
/// [`S3SigV4QuerySigner`], but the session token is carried as
/// `X-Amz-S3session-Token` in the query string instead of
/// `X-Amz-Security-Token`.
pub struct S3ExpressQuerySigner {
    credentials: Credentials,
    region_name: String,
    expires: u64,
    session_token: crate::credentials::SecretString,
    clock: Arc<dyn Clock>,
    _identity_cache: Arc<dyn crate::identity_cache::IdentityCache>,
}

impl S3ExpressQuerySigner {
    pub fn new(
        credentials: Credentials,
        region_name: impl Into<String>,
        session_token: impl Into<crate::credentials::SecretString>,
        identity_cache: Arc<dyn crate::identity_cache::IdentityCache>,
    ) -> Self {
        Self {
            credentials,
            region_name: region_name.into(),
            expires: super::sigv4::DEFAULT_EXPIRES,
            session_token: session_token.into(),
            clock: Arc::new(SystemClock),
            _identity_cache: identity_cache,
        }
    }

    pub fn with_expires(mut self, expires: u64) -> Self {
        self.expires = expires;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl Signer for S3ExpressQuerySigner {
    fn add_auth(&self, request: &mut SignableRequest) -> Result<(), SignerError> {
        let now = self.clock.now();
        request.context.timestamp = Some(timestamp::sigv4_timestamp(now));
        let ts = request.context.timestamp.clone().unwrap();
        let date_stamp = ts[0..8].to_string();
        let scope = full_scope(&self.credentials, &date_stamp, &self.region_name, "s3");

        // Borrow the generic relocation helper with a throwaway credentials
        // clone carrying the session token as its `session_token`, so the
        // query param lands under the S3 Express header name below — the
        // generic helper has no knowledge of S3 Express's distinct header.
        let mut creds_with_session = self.credentials.clone();
        creds_with_session.session_token = Some(self.session_token.clone());

        relocate_params_for_presign(
            request,
            &creds_with_session,
            &scope,
            &ts,
            self.expires,
            "X-Amz-S3session-Token",
        );

        let payload_hash = resolve_payload_hash(request, false, Some(UNSIGNED_PAYLOAD))?;
        let outcome = compute_signature(&self.credentials, "s3", &self.region_name, request, false, &payload_hash)?;

        let appended = format!(
            "{}&X-Amz-Signature={}",
            request.url.query().unwrap_or(""),
            outcome.signature
        );
        request.url.set_query(Some(&appended));
        Ok(())
    }
}

/// S3 Express overlay for presigned POST: identical to
/// [`S3SigV4PostSigner`] except the session-token field is named
/// `x-amz-s3session-token` and the generic token never appears.
pub struct S3ExpressPostSigner {
    inner: S3SigV4PostSigner,
    session_token: crate::credentials::SecretString,
    _identity_cache: Arc<dyn crate::identity_cache::IdentityCache>,
}

impl S3ExpressPostSigner {
    pub fn new(
        credentials: Credentials,
        region_name: impl Into<String>,
        session_token: impl Into<crate::credentials::SecretString>,
        identity_cache: Arc<dyn crate::identity_cache::IdentityCache>,
    ) -> Self {
        Self {
            inner: S3SigV4PostSigner::new(credentials, region_name),
            session_token: session_token.into(),
            _identity_cache: identity_cache,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.inner = self.inner.with_clock(clock);
        self
    }
}

impl Signer for S3ExpressPostSigner {
    fn add_auth(&self, request: &mut SignableRequest) -> Result<(), SignerError> {
        let now = self.inner.clock.now();
        request.context.timestamp = Some(timestamp::sigv4_timestamp(now));

        let mut policy = request.context.s3_presign_post_policy.take().unwrap_or_default();
        let mut fields = request.context.s3_presign_post_fields.take().unwrap_or_default();

        sign_post_policy(
            &self.inner.credentials,
            &self.inner.region_name,
            Some(("x-amz-s3session-token", self.session_token.expose())),
            &mut policy,
            &mut fields,
            now,
        )?;

        request.context.s3_presign_post_policy = Some(policy);
        request.context.s3_presign_post_fields = Some(fields);
        Ok(())
    }
}
