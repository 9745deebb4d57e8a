//! SigV3: signs only the `Date` header, base64-encoded HMAC-SHA256,
//! carried in `X-Amzn-Authorization` (spec §4.2). Legacy scheme retained by
//! a handful of older AWS services (e.g. SimpleDB-family, Route 53).

use std::sync::Arc;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::clock::{Clock, SystemClock};
use crate::credentials::Credentials;
use crate::error::SignerError;
use crate::request::SignableRequest;
use crate::timestamp;

use super::{Signer, SignerCapabilities};

pub const CAPABILITIES: SignerCapabilities = SignerCapabilities {
    requires_region: false,
    requires_token: false,
    requires_identity_cache: false,
};

type HmacSha256 = Hmac<Sha256>;

/// Signs a request with SigV3, matching botocore's `SigV3Auth.add_auth`.
pub struct SigV3Signer {
    credentials: Credentials,
    clock: Arc<dyn Clock>,
}

impl SigV3Signer {
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

impl Signer for SigV3Signer {
    fn add_auth(&self, request: &mut SignableRequest) -> Result<(), SignerError> {
        if request.header("date").is_some() {
            request.remove_header("date");
        }
        let now = self.clock.now();
        let date_header = timestamp::http_date_gmt(now);
        request.set_header("Date", &date_header);

        if let Some(token) = &self.credentials.session_token {
            request.remove_header("x-amz-security-token");
            request.set_header("X-Amz-Security-Token", token.expose());
        }

        let mut mac = HmacSha256::new_from_slice(self.credentials.secret_key.expose().as_bytes())
            .expect("HMAC accepts a key of any length");
        mac.update(date_header.as_bytes());
        use base64::Engine;
        let signature = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());

        let auth = format!(
            "AWS3-HTTPS AWSAccessKeyId={},Algorithm=HmacSHA256,Signature={}",
            self.credentials.access_key, signature
        );
        request.remove_header("x-amzn-authorization");
        request.set_header("X-Amzn-Authorization", &auth);
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
    fn signature_covers_only_the_date_header() {
        let creds = Credentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY");
        let signer = SigV3Signer::new(creds).with_clock(Arc::new(crate::clock::FixedClock(
            Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap(),
        )));
        let url = url::Url::parse("https://route53.amazonaws.com/2013-04-01/hostedzone").unwrap();
        let mut request = SignableRequest::new(http::Method::GET, url);

        signer.add_auth(&mut request).unwrap();

        assert_eq!(request.header("date"), Some("Sun, 30 Aug 2015 12:36:00 GMT"));
        let auth = request.header("x-amzn-authorization").unwrap();
        assert!(auth.starts_with("AWS3-HTTPS AWSAccessKeyId=AKIDEXAMPLE"));
        assert!(auth.contains("Algorithm=HmacSHA256"));
    }

    #[test]
    fn idempotent_resigning_replaces_prior_auth_header() {
        let creds = Credentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY");
        let signer = SigV3Signer::new(creds).with_clock(Arc::new(crate::clock::FixedClock(
            Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap(),
        )));
        let url = url::Url::parse("https://route53.amazonaws.com/2013-04-01/hostedzone").unwrap();
        let mut request = SignableRequest::new(http::Method::GET, url);

        signer.add_auth(&mut request).unwrap();
        let first = request.header("x-amzn-authorization").unwrap().to_string();
        signer.add_auth(&mut request).unwrap();
        let second = request.header("x-amzn-authorization").unwrap().to_string();
        assert_eq!(first, second);
    }
}
