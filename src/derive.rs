//! SigV4 string-to-sign assembly and the four-step HMAC key-derivation
//! chain (date → region → service → `aws4_request`).

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::credentials::SecretString;

type HmacSha256 = Hmac<Sha256>;

/// `HMAC-SHA256(key, msg)`, binary output.
fn hmac_sha256(key: &[u8], msg: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts a key of any length");
    mac.update(msg);
    mac.finalize().into_bytes().to_vec()
}

/// `YYYYMMDD/region/service/aws4_request`.
pub fn credential_scope(date_stamp: &str, region: &str, service: &str) -> String {
    format!("{date_stamp}/{region}/{service}/aws4_request")
}

/// The `Credential=` value: the access key prefixed onto the credential
/// scope. Used in the `Authorization` header, `X-Amz-Credential`, and the
/// presigned-POST policy's `x-amz-credential` field.
pub fn full_scope(access_key: &str, date_stamp: &str, region: &str, service: &str) -> String {
    format!("{access_key}/{}", credential_scope(date_stamp, region, service))
}

/// `AWS4-HMAC-SHA256\n<timestamp>\n<credential scope>\n<hex sha256 of canonical request>`.
pub fn string_to_sign(timestamp: &str, scope: &str, canonical_request_hash: &str) -> String {
    format!("AWS4-HMAC-SHA256\n{timestamp}\n{scope}\n{canonical_request_hash}")
}

/// Derives `k_signing` from the secret key, date, region and service.
pub fn derive_signing_key(
    secret_key: &SecretString,
    date_stamp: &str,
    region: &str,
    service: &str,
) -> Vec<u8> {
    let k0 = format!("AWS4{}", secret_key.expose());
    let k_date = hmac_sha256(k0.as_bytes(), date_stamp.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// Signs `string_to_sign` with an already-derived signing key, returning the
/// hex signature.
pub fn sign_hex(signing_key: &[u8], string_to_sign: &str) -> String {
    hex::encode(hmac_sha256(signing_key, string_to_sign.as_bytes()))
}

/// Convenience: derive the key and sign in one step, as used both by the
/// canonical-request signers and the presigned-POST policy signer (which
/// signs the base64 policy document itself in place of a canonical request
/// hash).
pub fn derive_and_sign(
    secret_key: &SecretString,
    date_stamp: &str,
    region: &str,
    service: &str,
    string_to_sign: &str,
) -> String {
    let key = derive_signing_key(secret_key, date_stamp, region, service);
    sign_hex(&key, string_to_sign)
}
