//! The signature-scheme registry and auth-trait resolver (spec §4.14,
//! mirroring botocore's `AUTH_TYPE_MAPS` / `AUTH_TYPE_TO_SIGNATURE_VERSION`
//! / `resolve_auth_type`).
//!
//! A client knows the *traits* a service declares support for
//! (`aws.auth#sigv4`, `smithy.api#httpBearerAuth`, ...) in preference
//! order; this module turns that list into the one scheme tag (`v4`,
//! `bearer`, ...) this crate actually knows how to build a signer for.

use std::sync::Arc;

use crate::clock::Clock;
use crate::credentials::{AuthToken, Credentials, SecretString};
use crate::error::SignerError;
use crate::identity_cache::IdentityCache;
use crate::signer::bearer::BearerSigner;
use crate::signer::s3::{
    S3ExpressHeaderSigner, S3ExpressPostSigner, S3ExpressQuerySigner, S3SigV4HeaderSigner, S3SigV4PostSigner,
    S3SigV4QuerySigner,
};
use crate::signer::sigv2::SigV2Signer;
use crate::signer::sigv3::SigV3Signer;
use crate::signer::sigv4::{SigV4HeaderSigner, SigV4QuerySigner};
use crate::signer::Signer;

/// All scheme tags this crate recognizes, including the SigV4a family,
/// which resolves successfully but whose signer construction always fails
/// with [`SignerError::Unimplemented`] (spec §4.12 — CRT-backed asymmetric
/// signing is explicitly out of scope here).
pub const KNOWN_SIGNATURE_VERSIONS: &[&str] = &[
    "v2",
    "v3",
    "v3https",
    "v4",
    "v4-query",
    "s3v4",
    "s3v4-query",
    "s3v4-presign-post",
    "v4-s3express",
    "v4-s3express-query",
    "v4-s3express-presign-post",
    "v4a",
    "s3v4a",
    "s3v4a-query",
    "bearer",
    "none",
];

/// Smithy/botocore auth-trait shape name to the scheme tag this crate uses
/// internally. Order doesn't matter here; the caller's preference order
/// drives [`resolve_auth_type`].
fn trait_to_scheme(auth_trait: &str) -> Option<&'static str> {
    Some(match auth_trait {
        "aws.auth#sigv4" => "v4",
        "aws.auth#sigv4a" => "v4a",
        "smithy.api#httpBearerAuth" => "bearer",
        "smithy.api#noAuth" => "none",
        _ => return None,
    })
}

/// Walks `auth_trait_preference` in order, returning the scheme tag for the
/// first trait whose scheme this build actually registers.
///
/// Matches botocore's `resolve_auth_type` exactly: a trait name that isn't a
/// recognized Smithy/botocore auth trait *at all* is an immediate
/// [`SignerError::UnknownSignatureVersion`] — it doesn't keep scanning. A
/// trait name that *is* recognized but whose scheme tag isn't registered in
/// this build is skipped, scanning continues; if every trait in the list is
/// like that (or the list is empty), the result is
/// [`SignerError::UnsupportedSignatureVersion`].
pub fn resolve_auth_type(auth_trait_preference: &[&str]) -> Result<&'static str, SignerError> {
    for auth_trait in auth_trait_preference {
        match trait_to_scheme(auth_trait) {
            Some(scheme) if is_known_signature_version(scheme) => return Ok(scheme),
            Some(_unregistered) => continue,
            None => return Err(SignerError::UnknownSignatureVersion(auth_trait.to_string())),
        }
    }
    Err(SignerError::UnsupportedSignatureVersion(
        auth_trait_preference.iter().map(|s| s.to_string()).collect(),
    ))
}

/// Whether a scheme tag is recognized at all. Used to fail fast with
/// [`SignerError::UnknownSignatureVersion`] before attempting to build a
/// signer for an arbitrary caller-supplied tag (as opposed to one that went
/// through [`resolve_auth_type`]).
pub fn is_known_signature_version(tag: &str) -> bool {
    KNOWN_SIGNATURE_VERSIONS.contains(&tag)
}

/// Validates a scheme tag, producing the right error for an unrecognized
/// one versus one this build simply hasn't implemented yet.
pub fn check_signature_version(tag: &str) -> Result<(), SignerError> {
    if !is_known_signature_version(tag) {
        return Err(SignerError::UnknownSignatureVersion(tag.to_string()));
    }
    if matches!(tag, "v4a" | "s3v4a" | "s3v4a-query") {
        return Err(SignerError::Unimplemented(
            "SigV4a (CRT-backed asymmetric signing) is not implemented by this signing core",
        ));
    }
    Ok(())
}

/// Everything any registered scheme's constructor might need. Which fields a
/// given scheme actually reads mirrors the corresponding botocore `Auth`
/// subclass's own `__init__` signature — see [`construct_signer`]'s match
/// arms for exactly which.
#[derive(Default)]
pub struct SignerParams {
    pub credentials: Option<Credentials>,
    pub auth_token: Option<AuthToken>,
    pub service_name: String,
    pub region_name: String,
    /// `X-Amz-Expires` for the query-string (presigned-URL) variants.
    /// Defaults to each signer's own default (3600s) when unset.
    pub expires: Option<u64>,
    /// The S3 Express directory-bucket session token, required by the
    /// `v4-s3express*` schemes.
    pub s3express_session_token: Option<SecretString>,
    pub identity_cache: Option<Arc<dyn IdentityCache>>,
    pub clock: Option<Arc<dyn Clock>>,
}

fn require_credentials(credentials: Option<Credentials>) -> Result<Credentials, SignerError> {
    credentials.ok_or(SignerError::NoCredentials)
}

fn require_identity_cache(cache: Option<Arc<dyn IdentityCache>>) -> Result<Arc<dyn IdentityCache>, SignerError> {
    cache.ok_or(SignerError::Unimplemented(
        "this scheme declares requires_identity_cache; construct_signer was not given one",
    ))
}

fn require_session_token(token: Option<SecretString>) -> Result<SecretString, SignerError> {
    token.ok_or(SignerError::Unimplemented(
        "this scheme requires an S3 Express session token; construct_signer was not given one",
    ))
}

/// Builds the signer for a registered scheme tag (spec §4.11's "static
/// mapping from scheme tag to signer constructor"), failing with
/// [`SignerError::NoCredentials`]/[`SignerError::NoAuthToken`] when the
/// caller-supplied params are missing what the scheme requires, mirroring
/// spec §4.3 step 1 and §4.10's up-front checks. `smithy.api#noAuth`
/// resolves to the `"none"` tag but has no signer of its own — callers that
/// resolve to it should skip calling `add_auth` entirely, as botocore's own
/// `AUTH_TYPE_MAPS` has no entry for it either.
pub fn construct_signer(scheme: &str, params: SignerParams) -> Result<Box<dyn Signer>, SignerError> {
    check_signature_version(scheme)?;
    let SignerParams {
        credentials,
        auth_token,
        service_name,
        region_name,
        expires,
        s3express_session_token,
        identity_cache,
        clock,
    } = params;

    macro_rules! with_clock {
        ($signer:expr) => {
            match clock {
                Some(clock) => $signer.with_clock(clock),
                None => $signer,
            }
        };
    }

    Ok(match scheme {
        "v2" => Box::new(with_clock!(SigV2Signer::new(require_credentials(credentials)?))),
        "v3" | "v3https" => Box::new(with_clock!(SigV3Signer::new(require_credentials(credentials)?))),
        "v4" => {
            let signer = SigV4HeaderSigner::new(require_credentials(credentials)?, service_name, region_name);
            Box::new(with_clock!(signer))
        }
        "v4-query" => {
            let mut signer = SigV4QuerySigner::new(require_credentials(credentials)?, service_name, region_name);
            if let Some(expires) = expires {
                signer = signer.with_expires(expires);
            }
            Box::new(with_clock!(signer))
        }
        "s3v4" => {
            let signer = S3SigV4HeaderSigner::new(require_credentials(credentials)?, region_name);
            Box::new(with_clock!(signer))
        }
        "s3v4-query" => {
            let mut signer = S3SigV4QuerySigner::new(require_credentials(credentials)?, region_name);
            if let Some(expires) = expires {
                signer = signer.with_expires(expires);
            }
            Box::new(with_clock!(signer))
        }
        "s3v4-presign-post" => {
            let signer = S3SigV4PostSigner::new(require_credentials(credentials)?, region_name);
            Box::new(with_clock!(signer))
        }
        "v4-s3express" => {
            let identity_cache = require_identity_cache(identity_cache)?;
            let session_token = require_session_token(s3express_session_token)?;
            let signer = S3ExpressHeaderSigner::new(
                require_credentials(credentials)?,
                region_name,
                session_token,
                identity_cache,
            );
            Box::new(with_clock!(signer))
        }
        "v4-s3express-query" => {
            let identity_cache = require_identity_cache(identity_cache)?;
            let session_token = require_session_token(s3express_session_token)?;
            let mut signer = S3ExpressQuerySigner::new(
                require_credentials(credentials)?,
                region_name,
                session_token,
                identity_cache,
            );
            if let Some(expires) = expires {
                signer = signer.with_expires(expires);
            }
            Box::new(with_clock!(signer))
        }
        "v4-s3express-presign-post" => {
            let identity_cache = require_identity_cache(identity_cache)?;
            let session_token = require_session_token(s3express_session_token)?;
            let signer = S3ExpressPostSigner::new(
                require_credentials(credentials)?,
                region_name,
                session_token,
                identity_cache,
            );
            Box::new(with_clock!(signer))
        }
        "bearer" => Box::new(BearerSigner::new(auth_token.ok_or(SignerError::NoAuthToken)?)),
        "none" => {
            return Err(SignerError::Unimplemented(
                "smithy.api#noAuth has no registered signer; the caller should skip add_auth",
            ))
        }
        // `check_signature_version` above already rejected v4a/s3v4a/s3v4a-query
        // and every tag outside KNOWN_SIGNATURE_VERSIONS.
        _ => unreachable!("scheme tag {scheme:?} passed validation but has no constructor arm"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_sigv4_trait_preference() {
        assert_eq!(resolve_auth_type(&["aws.auth#sigv4"]).unwrap(), "v4");
    }

    #[test]
    fn resolves_bearer_over_later_preferences() {
        assert_eq!(
            resolve_auth_type(&["smithy.api#httpBearerAuth", "aws.auth#sigv4"]).unwrap(),
            "bearer"
        );
    }

    #[test]
    fn entirely_unrecognized_trait_name_fails_fast_as_unknown() {
        let err = resolve_auth_type(&["smithy.api#customAuth"]).unwrap_err();
        assert!(matches!(err, SignerError::UnknownSignatureVersion(_)));
    }

    #[test]
    fn unrecognized_trait_does_not_keep_scanning_past_it() {
        // Even though a later entry is resolvable, an entirely unknown trait
        // earlier in the preference list must fail immediately rather than
        // fall through to it.
        let err = resolve_auth_type(&["smithy.api#customAuth", "aws.auth#sigv4"]).unwrap_err();
        assert!(matches!(err, SignerError::UnknownSignatureVersion(_)));
    }

    #[test]
    fn empty_preference_is_unsupported() {
        let err = resolve_auth_type(&[]).unwrap_err();
        assert!(matches!(err, SignerError::UnsupportedSignatureVersion(_)));
    }

    #[test]
    fn sigv4a_is_known_but_unimplemented() {
        assert!(is_known_signature_version("v4a"));
        let err = check_signature_version("v4a").unwrap_err();
        assert!(matches!(err, SignerError::Unimplemented(_)));
    }

    #[test]
    fn unrecognized_tag_is_unknown() {
        let err = check_signature_version("totally-made-up").unwrap_err();
        assert!(matches!(err, SignerError::UnknownSignatureVersion(_)));
    }

    fn creds() -> Credentials {
        Credentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY")
    }

    #[test]
    fn construct_signer_without_credentials_fails() {
        let params = SignerParams {
            service_name: "iam".into(),
            region_name: "us-east-1".into(),
            ..Default::default()
        };
        let err = construct_signer("v4", params).unwrap_err();
        assert!(matches!(err, SignerError::NoCredentials));
    }

    #[test]
    fn construct_signer_bearer_without_token_fails() {
        let err = construct_signer("bearer", SignerParams::default()).unwrap_err();
        assert!(matches!(err, SignerError::NoAuthToken));
    }

    #[test]
    fn construct_signer_builds_a_working_v4_header_signer() {
        let params = SignerParams {
            credentials: Some(creds()),
            service_name: "iam".into(),
            region_name: "us-east-1".into(),
            ..Default::default()
        };
        let signer = construct_signer("v4", params).unwrap();
        let url = url::Url::parse("https://iam.amazonaws.com/?Action=ListUsers&Version=2010-05-08").unwrap();
        let mut request = crate::request::SignableRequest::new(http::Method::GET, url);
        request.set_header("Host", "iam.amazonaws.com");
        signer.add_auth(&mut request).unwrap();
        assert!(request.header("authorization").is_some());
    }

    #[test]
    fn construct_signer_s3express_without_identity_cache_fails() {
        let params = SignerParams {
            credentials: Some(creds()),
            region_name: "us-east-1".into(),
            s3express_session_token: Some(SecretString::new("sess-token")),
            ..Default::default()
        };
        let err = construct_signer("v4-s3express", params).unwrap_err();
        assert!(matches!(err, SignerError::Unimplemented(_)));
    }

    #[test]
    fn construct_signer_rejects_v4a_even_with_credentials() {
        let params = SignerParams {
            credentials: Some(creds()),
            service_name: "s3".into(),
            region_name: "us-east-1".into(),
            ..Default::default()
        };
        let err = construct_signer("v4a", params).unwrap_err();
        assert!(matches!(err, SignerError::Unimplemented(_)));
    }

    #[test]
    fn construct_signer_none_scheme_has_no_signer() {
        let err = construct_signer("none", SignerParams::default()).unwrap_err();
        assert!(matches!(err, SignerError::Unimplemented(_)));
    }
}
