//! SigV2: the legacy query-string signing scheme still used by a handful of
//! AWS services (spec §4.2). String-to-sign is `METHOD\nHOST\nPATH\n<sorted
//! params>`, signed with plain HMAC-SHA256 and base64-encoded.

use std::sync::Arc;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::clock::{Clock, SystemClock};
use crate::credentials::Credentials;
use crate::error::SignerError;
use crate::request::{ParamList, RequestData, SignableRequest};
use crate::timestamp;
use crate::util;

use super::{Signer, SignerCapabilities};

pub const CAPABILITIES: SignerCapabilities = SignerCapabilities {
    requires_region: false,
    requires_token: false,
    requires_identity_cache: false,
};

type HmacSha256 = Hmac<Sha256>;

/// Signs a request with SigV2, injecting the auth material as params on
/// `request.data` (POST bodies) or `request.params` (everything else),
/// matching botocore's `SigV2Auth.add_auth`.
pub struct SigV2Signer {
    credentials: Credentials,
    clock: Arc<dyn Clock>,
}

impl SigV2Signer {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// The mutable param carrier SigV2 signs over: `request.data` when it's
/// already a form body, else `request.params`. Mirrors botocore checking
/// `data` first — botocore's `request.data` is always a param mapping for
/// SigV2 services, so a non-form body (`Bytes`/`Text`) is never a valid
/// param carrier and must not be clobbered into an empty `Form`.
fn param_carrier(request: &mut SignableRequest) -> ParamCarrier<'_> {
    if let RequestData::Form(_) = &request.data {
        ParamCarrier::Data(&mut request.data)
    } else {
        ParamCarrier::Params(&mut request.params)
    }
}

enum ParamCarrier<'a> {
    Data(&'a mut RequestData),
    Params(&'a mut ParamList),
}

impl ParamCarrier<'_> {
    fn push(&mut self, key: &str, value: &str) {
        match self {
            ParamCarrier::Data(data) => {
                if let RequestData::Form(list) = data {
                    list.push(key, value);
                }
            }
            ParamCarrier::Params(list) => list.push(key, value),
        }
    }

    fn pairs(&self) -> Vec<(String, String)> {
        match self {
            ParamCarrier::Data(data) => match data {
                RequestData::Form(list) => list.0.clone(),
                _ => Vec::new(),
            },
            ParamCarrier::Params(list) => list.0.clone(),
        }
    }
}

impl Signer for SigV2Signer {
    fn add_auth(&self, request: &mut SignableRequest) -> Result<(), SignerError> {
        let now = self.clock.now();
        let timestamp = timestamp::iso8601(now);

        {
            let mut carrier = param_carrier(request);
            carrier.push("AWSAccessKeyId", &self.credentials.access_key);
            carrier.push("SignatureVersion", "2");
            carrier.push("SignatureMethod", "HmacSHA256");
            carrier.push("Timestamp", &timestamp);
            if let Some(token) = &self.credentials.session_token {
                carrier.push("SecurityToken", token.expose());
            }
        }

        let host = util::host_from_url(&request.url);
        let path = {
            let p = request.url.path();
            if p.is_empty() {
                "/".to_string()
            } else {
                p.to_string()
            }
        };

        let pairs = param_carrier(request).pairs();
        let mut sorted: Vec<(String, String)> = pairs.into_iter().filter(|(k, _)| k != "Signature").collect();
        sorted.sort();
        let encoded = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", util::sigv2_encode_key(k), util::sigv2_encode_value(v)))
            .collect::<Vec<_>>()
            .join("&");

        let string_to_sign = format!("{}\n{host}\n{path}\n{encoded}", request.method.as_str());

        let mut mac = HmacSha256::new_from_slice(self.credentials.secret_key.expose().as_bytes())
            .expect("HMAC accepts a key of any length");
        mac.update(string_to_sign.as_bytes());
        use base64::Engine;
        let signature = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());

        param_carrier(request).push("Signature", &signature);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::Credentials;
    use chrono::TimeZone;
    use chrono::Utc;

    #[test]
    fn signs_query_request_and_sorts_params() {
        let creds = Credentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY");
        let signer = SigV2Signer::new(creds).with_clock(Arc::new(crate::clock::FixedClock(
            Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap(),
        )));
        let url = url::Url::parse("https://sqs.us-east-1.amazonaws.com/?Action=ListQueues").unwrap();
        let mut request = SignableRequest::new(http::Method::GET, url);
        request.params.push("Action", "ListQueues");

        signer.add_auth(&mut request).unwrap();

        let pairs = request.params.0.clone();
        assert!(pairs.iter().any(|(k, _)| k == "Signature"));
        assert!(pairs.iter().any(|(k, v)| k == "SignatureVersion" && v == "2"));
    }

    #[test]
    fn value_encoding_preserves_dash_underscore_tilde_only() {
        assert_eq!(util::sigv2_encode_value("hello world/+"), "hello%20world%2F%2B");
    }
}
