//! The generic SigV4 header signer and its presigned-URL (query) sibling.
//! S3's deviations from both live in [`super::s3`].

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::credentials::Credentials;
use crate::error::SignerError;
use crate::request::SignableRequest;
use crate::timestamp;

use super::sigv4_core::{
    compute_signature, full_scope, reset_header, resolve_payload_hash, should_sign_payload_generic,
};
use super::{Signer, SignerCapabilities};

pub const CAPABILITIES: SignerCapabilities = SignerCapabilities {
    requires_region: true,
    requires_token: false,
    requires_identity_cache: false,
};

/// Sign a request with SigV4, injecting an `Authorization` header.
pub struct SigV4HeaderSigner {
    credentials: Credentials,
    service_name: String,
    region_name: String,
    clock: Arc<dyn Clock>,
}

impl SigV4HeaderSigner {
    pub fn new(credentials: Credentials, service_name: impl Into<String>, region_name: impl Into<String>) -> Self {
        Self {
            credentials,
            service_name: service_name.into(),
            region_name: region_name.into(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets `context.timestamp`, drops stale auth-adjacent headers, and sets
    /// the date/token/content-sha256 headers the signature will cover.
    /// Shared verbatim by the S3 header overlay, which calls this first and
    /// then additionally forces `X-Amz-Content-SHA256`.
    pub(crate) fn modify_request_before_signing(request: &mut SignableRequest, credentials: &Credentials, now: chrono::DateTime<chrono::Utc>) {
        request.context.timestamp = Some(timestamp::sigv4_timestamp(now));
        let ts = request.context.timestamp.clone().unwrap();

        request.remove_header("authorization");
        set_necessary_date_headers(request, &ts);

        if let Some(token) = &credentials.session_token {
            reset_header(request, "X-Amz-Security-Token", Some(token.expose()));
        }

        if request.context.payload_signing_enabled == Some(false) {
            reset_header(request, "X-Amz-Content-SHA256", Some(crate::canonical::UNSIGNED_PAYLOAD));
        }
    }

    pub(crate) fn inject_authorization(
        request: &mut SignableRequest,
        credentials: &Credentials,
        service: &str,
        region: &str,
        signed_headers: &str,
        signature: &str,
    ) {
        let date_stamp = request.context.date_stamp().unwrap().to_string();
        let scope = full_scope(credentials, &date_stamp, region, service);
        let value = format!(
            "AWS4-HMAC-SHA256 Credential={scope}, SignedHeaders={signed_headers}, Signature={signature}"
        );
        request.set_header("Authorization", value);
    }
}

impl Signer for SigV4HeaderSigner {
    fn add_auth(&self, request: &mut SignableRequest) -> Result<(), SignerError> {
        let now = self.clock.now();
        Self::modify_request_before_signing(request, &self.credentials, now);

        let should_sign = should_sign_payload_generic(request);
        let payload_hash = resolve_payload_hash(request, should_sign, None)?;
        let outcome = compute_signature(
            &self.credentials,
            &self.service_name,
            &self.region_name,
            request,
            true,
            &payload_hash,
        )?;

        Self::inject_authorization(
            request,
            &self.credentials,
            &self.service_name,
            &self.region_name,
            &outcome.signed_headers,
            &outcome.signature,
        );
        Ok(())
    }
}

/// `Date`/`X-Amz-Date` exclusivity rule (spec §4.3): whichever was present
/// wins, the other is removed.
pub(crate) fn set_necessary_date_headers(request: &mut SignableRequest, ts: &str) {
    if request.header("date").is_some() {
        request.remove_header("date");
        let parsed = chrono::NaiveDateTime::parse_from_str(ts, timestamp::SIGV4_TIMESTAMP_FMT)
            .expect("context.timestamp is always in SigV4 basic form")
            .and_utc();
        request.remove_header("x-amz-date");
        request.set_header("Date", timestamp::http_date_dash_offset(parsed));
    } else {
        request.remove_header("x-amz-date");
        request.set_header("X-Amz-Date", ts);
    }
}

pub const QUERY_CAPABILITIES: SignerCapabilities = CAPABILITIES;

/// Sign a request with SigV4 as a presigned URL: the authentication
/// material is encoded as query parameters instead of a header, and the
/// signature itself is appended last as `X-Amz-Signature`.
pub struct SigV4QuerySigner {
    credentials: Credentials,
    service_name: String,
    region_name: String,
    expires: u64,
    clock: Arc<dyn Clock>,
}

pub const DEFAULT_EXPIRES: u64 = 3600;

impl SigV4QuerySigner {
    pub fn new(credentials: Credentials, service_name: impl Into<String>, region_name: impl Into<String>) -> Self {
        Self {
            credentials,
            service_name: service_name.into(),
            region_name: region_name.into(),
            expires: DEFAULT_EXPIRES,
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

/// Shared by the generic and S3 presign-query signers: strips the
/// auto-filled form content-type, computes `SignedHeaders`, relocates body
/// params into the query string, and appends the auth params — everything
/// except `X-Amz-Signature`, which the caller appends after signing.
pub(crate) fn relocate_params_for_presign(
    request: &mut SignableRequest,
    credentials: &Credentials,
    scope: &str,
    timestamp: &str,
    expires: u64,
    security_token_header: &str,
) -> String {
    const BLOCKED_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";
    if request.header("content-type") == Some(BLOCKED_CONTENT_TYPE) {
        request.remove_header("content-type");
    }

    let headers_map = crate::canonical::headers_to_sign(request);
    let signed_headers = crate::canonical::signed_headers_list(&headers_map);

    let mut auth_params = crate::request::ParamList::new();
    auth_params.push("X-Amz-Algorithm", "AWS4-HMAC-SHA256");
    auth_params.push("X-Amz-Credential", scope);
    auth_params.push("X-Amz-Date", timestamp);
    auth_params.push("X-Amz-Expires", expires.to_string());
    auth_params.push("X-Amz-SignedHeaders", &signed_headers);
    if let Some(token) = &credentials.session_token {
        auth_params.push(security_token_header, token.expose());
    }

    let mut query_dict = crate::request::ParamList::new();
    for (k, v) in url::form_urlencoded::parse(request.url.query().unwrap_or("").as_bytes()) {
        query_dict.upsert(k.into_owned(), v.into_owned());
    }

    if !request.params.is_empty() {
        for (k, v) in request.params.iter() {
            query_dict.upsert(k.clone(), v.clone());
        }
        request.params = crate::request::ParamList::new();
    }

    if !request.data.is_empty() {
        if let Some(map) = request.data.as_map() {
            for (k, v) in map {
                let value = match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                query_dict.upsert(k, value);
            }
        }
        request.data = crate::request::RequestData::Empty;
    }

    let operation_params = if query_dict.is_empty() {
        String::new()
    } else {
        format!("{}&", encode_param_list(&query_dict))
    };
    let new_query = format!("{operation_params}{}", encode_param_list(&auth_params));

    request.url.set_query(Some(&new_query));
    signed_headers
}

fn encode_param_list(params: &crate::request::ParamList) -> String {
    params
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                crate::util::uri_encode_query_component(k),
                crate::util::uri_encode_query_component(v)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

impl Signer for SigV4QuerySigner {
    fn add_auth(&self, request: &mut SignableRequest) -> Result<(), SignerError> {
        let now = self.clock.now();
        request.context.timestamp = Some(timestamp::sigv4_timestamp(now));
        let ts = request.context.timestamp.clone().unwrap();
        let date_stamp = ts[0..8].to_string();
        let scope = full_scope(&self.credentials, &date_stamp, &self.region_name, &self.service_name);

        relocate_params_for_presign(
            request,
            &self.credentials,
            &scope,
            &ts,
            self.expires,
            "X-Amz-Security-Token",
        );

        let should_sign = should_sign_payload_generic(request);
        let payload_hash = resolve_payload_hash(request, should_sign, None)?;
        let outcome = compute_signature(
            &self.credentials,
            &self.service_name,
            &self.region_name,
            request,
            true,
            &payload_hash,
        )?;

        // `X-Amz-Signature` is appended last, after every other query param,
        // per spec §4.5's injection rule.
        let appended = format!(
            "{}&X-Amz-Signature={}",
            request.url.query().unwrap_or(""),
            outcome.signature
        );
        request.url.set_query(Some(&appended));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::Credentials;
    use chrono::TimeZone;
    use chrono::Utc;

    fn fixed_clock() -> Arc<dyn Clock> {
        Arc::new(crate::clock::FixedClock(
            Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap(),
        ))
    }

    #[test]
    fn header_signer_produces_aws_published_vector() {
        let creds = Credentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY");
        let signer = SigV4HeaderSigner::new(creds, "iam", "us-east-1").with_clock(fixed_clock());
        let url = url::Url::parse("https://iam.amazonaws.com/?Action=ListUsers&Version=2010-05-08").unwrap();
        let mut request = SignableRequest::new(http::Method::GET, url);
        request.set_header("Host", "iam.amazonaws.com");

        signer.add_auth(&mut request).unwrap();

        let auth = request.header("authorization").unwrap();
        assert!(auth.contains(
            "Signature=5d672d79c15b13162d9279b0855cfba6789a8edb4c82c400e06b5924a6f2b5d7"
        ));
    }

    #[test]
    fn idempotent_resigning_with_fixed_clock() {
        let creds = Credentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY");
        let signer = SigV4HeaderSigner::new(creds, "iam", "us-east-1").with_clock(fixed_clock());
        let url = url::Url::parse("https://iam.amazonaws.com/?Action=ListUsers&Version=2010-05-08").unwrap();
        let mut request = SignableRequest::new(http::Method::GET, url);
        request.set_header("Host", "iam.amazonaws.com");

        signer.add_auth(&mut request).unwrap();
        let first = request.header("authorization").unwrap().to_string();
        signer.add_auth(&mut request).unwrap();
        let second = request.header("authorization").unwrap().to_string();
        assert_eq!(first, second);
    }

    #[test]
    fn presigned_query_excludes_signature_from_signed_query() {
        let creds = Credentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY");
        let signer = SigV4QuerySigner::new(creds, "iam", "us-east-1")
            .with_expires(86400)
            .with_clock(fixed_clock());
        let url = url::Url::parse("https://iam.amazonaws.com/?Action=ListUsers&Version=2010-05-08").unwrap();
        let mut request = SignableRequest::new(http::Method::GET, url);
        request.set_header("Host", "iam.amazonaws.com");

        signer.add_auth(&mut request).unwrap();

        let query = request.url.query().unwrap();
        assert!(query.contains("X-Amz-Expires=86400"));
        assert!(query.ends_with_signature_param());
    }

    trait EndsWithSignature {
        fn ends_with_signature_param(&self) -> bool;
    }
    impl EndsWithSignature for str {
        fn ends_with_signature_param(&self) -> bool {
            self.rsplit('&').next().map(|p| p.starts_with("X-Amz-Signature=")).unwrap_or(false)
        }
    }
}
