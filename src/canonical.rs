//! SigV4 canonicalization: the pure, stateless fragments that go into the
//! canonical request (path, query string, header block, signed-header list,
//! payload hash) and their assembly into the final canonical request text.
//!
//! Everything here is shared by the generic SigV4 signers and the S3
//! overlays; the two families differ only in policy (path normalization,
//! payload-signing eligibility), passed in by the caller.

use std::collections::BTreeMap;
use std::io::{self, Read, Seek, SeekFrom};

use sha2::{Digest, Sha256};

use crate::request::{Payload, SignableRequest};
use crate::util;

pub const EMPTY_SHA256_HASH: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";
pub const STREAMING_UNSIGNED_PAYLOAD_TRAILER: &str = "STREAMING-UNSIGNED-PAYLOAD-TRAILER";

/// Buffer size for streaming the payload through SHA-256.
const PAYLOAD_BUFFER: usize = 1024 * 1024;

const SIGNED_HEADERS_BLACKLIST: &[&str] = &["expect", "user-agent", "x-amzn-trace-id"];

/// Selects the headers that go into the signature, lowercased, synthesizing
/// `host` from the URL if the request doesn't carry one. Returned as a
/// sorted map so canonical-headers and signed-headers derive from the same
/// structure.
pub fn headers_to_sign(request: &SignableRequest) -> BTreeMap<String, Vec<String>> {
    let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in request.headers.iter() {
        let lname = name.as_str().to_ascii_lowercase();
        if SIGNED_HEADERS_BLACKLIST.contains(&lname.as_str()) {
            continue;
        }
        map.entry(lname)
            .or_default()
            .push(value.to_str().unwrap_or_default().to_string());
    }
    map.entry("host".to_string())
        .or_insert_with(|| vec![util::host_from_url(&request.url)]);
    map
}

/// `name:value\n` per distinct header name, each value trimalled then
/// comma-joined for repeated headers, sorted lexicographically by name.
pub fn canonical_headers_block(headers_to_sign: &BTreeMap<String, Vec<String>>) -> String {
    headers_to_sign
        .iter()
        .map(|(name, values)| {
            let joined = values
                .iter()
                .map(|v| util::trimall(v))
                .collect::<Vec<_>>()
                .join(",");
            format!("{name}:{joined}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The sorted, lowercased header names joined with `;`.
pub fn signed_headers_list(headers_to_sign: &BTreeMap<String, Vec<String>>) -> String {
    headers_to_sign.keys().cloned().collect::<Vec<_>>().join(";")
}

/// Normalizes then percent-encodes the request path, preserving `/` and
/// `~`. Prefers `request.raw_path` over `request.url.path()` when set,
/// since `url::Url` has already resolved dot segments by parse time (see
/// [`crate::request::SignableRequest::raw_path`]). S3 signers pass
/// `normalize = false` to sign the path literally.
pub fn canonical_path(request: &SignableRequest, normalize: bool) -> String {
    let path = request
        .raw_path
        .as_deref()
        .unwrap_or_else(|| request.url.path());
    let path = if path.is_empty() { "/" } else { path };
    let path = if normalize {
        util::normalize_url_path(path)
    } else {
        path.to_string()
    };
    util::uri_encode_path(&path)
}

/// The canonical query string, sourced from `request.params` when present
/// (percent-encoded here) or else the URL's raw query (already encoded,
/// split without further decoding) — never both.
pub fn canonical_query_string(request: &SignableRequest) -> String {
    if !request.params.is_empty() {
        query_string_from_params(request.params.iter())
    } else {
        query_string_from_raw(request.url.query())
    }
}

fn query_string_from_params<'a>(params: impl Iterator<Item = &'a (String, String)>) -> String {
    let mut pairs: Vec<(String, String)> = params
        .map(|(k, v)| {
            (
                util::uri_encode_query_component(k),
                util::uri_encode_query_component(v),
            )
        })
        .collect();
    pairs.sort();
    join_pairs(&pairs)
}

fn query_string_from_raw(query: Option<&str>) -> String {
    let query = match query {
        Some(q) if !q.is_empty() => q,
        _ => return String::new(),
    };
    let mut pairs: Vec<(String, String)> = query
        .split('&')
        .map(|fragment| match fragment.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (fragment.to_string(), String::new()),
        })
        .collect();
    pairs.sort();
    join_pairs(&pairs)
}

fn join_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Hashes the request body (or restores a constant), per spec's payload
/// decision table steps 3–5. The trailer/unsigned-payload short-circuits
/// (steps 1–2) are the caller's responsibility since they depend on signer
/// policy, not just the body shape.
pub fn hash_payload(body: &mut Payload) -> io::Result<String> {
    match body {
        Payload::Empty => Ok(EMPTY_SHA256_HASH.to_string()),
        Payload::Bytes(bytes) => Ok(hex::encode(Sha256::digest(bytes))),
        Payload::Reader(reader) => hash_seekable(reader.as_mut()),
    }
}

fn hash_seekable(reader: &mut (impl Read + Seek + ?Sized)) -> io::Result<String> {
    let position = reader.stream_position()?;
    let result = (|| -> io::Result<String> {
        let mut hasher = Sha256::new();
        let mut buf = [0u8; PAYLOAD_BUFFER];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(hex::encode(hasher.finalize()))
    })();
    // Restore position on every exit path, including a failed read.
    reader.seek(SeekFrom::Start(position))?;
    result
}

/// Assembles the five-line (really six, once the header block's own
/// newline is counted) canonical request.
pub fn build_canonical_request(
    method: &str,
    path: &str,
    query: &str,
    headers_to_sign: &BTreeMap<String, Vec<String>>,
    payload_hash: &str,
) -> String {
    let headers_block = canonical_headers_block(headers_to_sign);
    let signed_headers = signed_headers_list(headers_to_sign);
    [
        method,
        path,
        query,
        &format!("{headers_block}\n"),
        &signed_headers,
        payload_hash,
    ]
    .join("\n")
}
