//! Bearer-token auth (spec §4.13), used by `smithy.api#httpBearerAuth`
//! schemes — no canonicalization, just an `Authorization: Bearer <token>`
//! header.

use crate::credentials::AuthToken;
use crate::error::SignerError;
use crate::request::SignableRequest;

use super::{Signer, SignerCapabilities};

pub const CAPABILITIES: SignerCapabilities = SignerCapabilities {
    requires_region: false,
    requires_token: true,
    requires_identity_cache: false,
};

/// Signs a request with a static bearer token, matching botocore's
/// `BearerAuth.add_auth`.
pub struct BearerSigner {
    token: AuthToken,
}

impl BearerSigner {
    pub fn new(token: AuthToken) -> Self {
        Self { token }
    }
}

impl Signer for BearerSigner {
    fn add_auth(&self, request: &mut SignableRequest) -> Result<(), SignerError> {
        request.remove_header("authorization");
        request.set_header("Authorization", format!("Bearer {}", self.token.token.expose()));
        Ok(())
    }
}
