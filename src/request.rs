//! The mutable request view the signers operate on.
//!
//! This mirrors the data model in spec §3: a request carries a method, a
//! URL, headers, an alternative query-parameter carrier, a body in one of a
//! few shapes, and a side-channel context map. Signers read and write these
//! fields in place; no other side effects are permitted.

use std::io::{Read, Seek};

use http::{HeaderMap, HeaderValue, Method};
use url::Url;

use crate::context::SigningContext;

/// Any reader a caller can hand the signer for payload hashing — it must be
/// seekable so the signer can restore the read position afterward.
pub trait SeekableRead: Read + Seek + Send {}
impl<T: Read + Seek + Send> SeekableRead for T {}

/// The request body used for payload hashing.
pub enum Payload {
    Empty,
    Bytes(Vec<u8>),
    Reader(Box<dyn SeekableRead>),
}

impl std::fmt::Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Payload::Empty => write!(f, "Payload::Empty"),
            Payload::Bytes(b) => write!(f, "Payload::Bytes({} bytes)", b.len()),
            Payload::Reader(_) => write!(f, "Payload::Reader(..)"),
        }
    }
}

/// An ordered, append-preserving name/value list — used for `request.params`
/// and for form-encoded `request.data`. Plain `Vec`-backed rather than a map
/// type, since SigV2/SigV4 both need to walk every pair (including repeats)
/// rather than do key lookups.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParamList(pub Vec<(String, String)>);

impl ParamList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    pub fn extend(&mut self, other: ParamList) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, String)> {
        self.0.iter()
    }

    /// Insert-or-replace by key, preserving the existing position if the key
    /// is already present (used when merging the relocated body/URL query
    /// into the presigned-URL operation params).
    pub fn upsert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.0.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.0.push((key, value));
        }
    }
}

/// The request body in its pre-serialization shape, as carried by
/// `request.data`.
#[derive(Clone, Debug)]
pub enum RequestData {
    Empty,
    Form(ParamList),
    Bytes(Vec<u8>),
    Text(String),
}

impl RequestData {
    pub fn is_empty(&self) -> bool {
        matches!(self, RequestData::Empty)
            || matches!(self, RequestData::Form(p) if p.is_empty())
            || matches!(self, RequestData::Bytes(b) if b.is_empty())
            || matches!(self, RequestData::Text(s) if s.is_empty())
    }

    /// Coerce the body into a flat map, the way `_get_body_as_dict` does for
    /// non-form bodies that are actually JSON text/bytes.
    pub fn as_map(&self) -> Option<serde_json::Map<String, serde_json::Value>> {
        match self {
            RequestData::Empty => None,
            RequestData::Form(params) => {
                let mut map = serde_json::Map::new();
                for (k, v) in &params.0 {
                    map.insert(k.clone(), serde_json::Value::String(v.clone()));
                }
                Some(map)
            }
            RequestData::Bytes(bytes) => {
                serde_json::from_slice::<serde_json::Value>(bytes)
                    .ok()
                    .and_then(|v| v.as_object().cloned())
            }
            RequestData::Text(text) => serde_json::from_str::<serde_json::Value>(text)
                .ok()
                .and_then(|v| v.as_object().cloned()),
        }
    }
}

/// A request about to be signed.
pub struct SignableRequest {
    pub method: Method,
    pub url: Url,
    /// The literal, as-sent request-target path, when it differs from
    /// `url.path()`. `url::Url` resolves `.`/`..` segments at parse time per
    /// the WHATWG URL Standard (it treats even percent-encoded `%2e%2e` as a
    /// dot segment), so an S3 key containing a literal `..` component
    /// cannot survive a round trip through `Url::parse` — the caller that
    /// knows the true wire path (e.g. an HTTP request builder working from
    /// the unparsed request-line) sets this to preserve it. S3's signers
    /// read this in preference to `url.path()`; the generic SigV4 signers
    /// never need it, since they normalize either way.
    pub raw_path: Option<String>,
    pub headers: HeaderMap<HeaderValue>,
    pub params: ParamList,
    pub data: RequestData,
    pub body: Payload,
    pub context: SigningContext,
}

impl SignableRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            raw_path: None,
            headers: HeaderMap::new(),
            params: ParamList::new(),
            data: RequestData::Empty,
            body: Payload::Empty,
            context: SigningContext::new(),
        }
    }

    /// Overrides the path used for canonicalization with the literal,
    /// unparsed wire path (see [`Self::raw_path`]).
    pub fn with_raw_path(mut self, raw_path: impl Into<String>) -> Self {
        self.raw_path = Some(raw_path.into());
        self
    }

    pub fn set_header(&mut self, name: &str, value: impl AsRef<str>) {
        let name: http::HeaderName = name.parse().expect("valid header name");
        let value = HeaderValue::from_str(value.as_ref()).expect("valid header value");
        self.headers.remove(&name);
        self.headers.insert(name, value);
    }

    pub fn remove_header(&mut self, name: &str) {
        self.headers.remove(name);
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn header_values_joined(&self, name: &str) -> Option<String> {
        let mut values = self.headers.get_all(name).iter().peekable();
        values.peek()?;
        Some(
            values
                .map(|v| v.to_str().unwrap_or_default())
                .collect::<Vec<_>>()
                .join(","),
        )
    }
}
