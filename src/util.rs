//! Canonicalization support utilities: host extraction, percent-encoding,
//! and path normalization shared by every SigV4-family signer.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::{Host, Url};

/// RFC 3986 unreserved characters beyond alphanumerics.
const UNRESERVED_EXTRA: &[u8] = b"-_.~";

/// Encodes everything outside the unreserved set (`A-Z a-z 0-9 - _ . ~`).
/// Used for query keys/values sourced from `request.params`, and for SigV2.
const QUERY_COMPONENT: AsciiSet = build_ascii_set(UNRESERVED_EXTRA, false);

/// Same as `QUERY_COMPONENT` but also leaves `/` unescaped, for canonical
/// path segments.
const PATH_COMPONENT: AsciiSet = build_ascii_set(UNRESERVED_EXTRA, true);

const fn build_ascii_set(extra_safe: &[u8], preserve_slash: bool) -> AsciiSet {
    // AsciiSet has no const-friendly builder API for a byte slice, so this
    // mirrors NON_ALPHANUMERIC.remove(..) by hand for the fixed inputs we use.
    let mut set = *NON_ALPHANUMERIC;
    let mut i = 0;
    while i < extra_safe.len() {
        set = set.remove(extra_safe[i]);
        i += 1;
    }
    if preserve_slash {
        set = set.remove(b'/');
    }
    set
}

/// Percent-encode a single path segment or whole path, preserving `/`.
pub fn uri_encode_path(decoded: &str) -> String {
    utf8_percent_encode(decoded, &PATH_COMPONENT).to_string()
}

/// Percent-encode a query key or value, preserving `-_.~` only.
pub fn uri_encode_query_component(decoded: &str) -> String {
    utf8_percent_encode(decoded, &QUERY_COMPONENT).to_string()
}

/// SigV2 key encoding: `quote(key, safe='')`. Functionally identical to
/// [`sigv2_encode_value`] once encoded (both reduce to the unreserved set
/// plus `-_.~`), but kept as a separate name because botocore spells them
/// differently — see spec note on SigV2's asymmetric `safe` sets.
pub fn sigv2_encode_key(decoded: &str) -> String {
    uri_encode_query_component(decoded)
}

/// SigV2 value encoding: `quote(value, safe='-_~')`.
pub fn sigv2_encode_value(decoded: &str) -> String {
    uri_encode_query_component(decoded)
}

/// Lowercase hostname for the `Host` header, bracketing IPv6 literals per
/// RFC 3986 §3.2.2 and omitting the port when it matches the scheme default.
pub fn host_from_url(url: &Url) -> String {
    let host = match url.host() {
        Some(Host::Domain(d)) => d.to_ascii_lowercase(),
        Some(Host::Ipv4(ip)) => ip.to_string(),
        Some(Host::Ipv6(ip)) => format!("[{ip}]"),
        None => String::new(),
    };
    // `url` normalizes away a port that matches the scheme's known default,
    // so an explicit `url.port()` here is already "only if non-default".
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host,
    }
}

/// RFC 3986 §5.2.4 remove_dot_segments, applied to a URL path. Mirrors
/// botocore's `normalize_url_path`: collapses `.`/`..` segments and
/// duplicate slashes while preserving a leading/trailing `/`.
pub fn normalize_url_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    let mut output: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        if segment.is_empty() || segment == "." {
            continue;
        }
        if segment == ".." {
            output.pop();
        } else {
            output.push(segment);
        }
    }
    let leading = if path.starts_with('/') { "/" } else { "" };
    let trailing = if path.ends_with('/') && !output.is_empty() {
        "/"
    } else {
        ""
    };
    format!("{leading}{}{trailing}", output.join("/"))
}

/// "Trimall": strip leading/trailing whitespace and collapse internal
/// whitespace runs to a single space — used for canonical header values.
pub fn trimall(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_preserves_slash_and_tilde() {
        assert_eq!(uri_encode_path("/a/b~c"), "/a/b~c");
        assert_eq!(uri_encode_path("/a b"), "/a%20b");
    }

    #[test]
    fn query_component_encodes_slash() {
        assert_eq!(uri_encode_query_component("a/b"), "a%2Fb");
        assert_eq!(uri_encode_query_component("a-b_c.d~e"), "a-b_c.d~e");
    }

    #[test]
    fn sigv2_value_encoding_scenario() {
        assert_eq!(sigv2_encode_value("hello world/+"), "hello%20world%2F%2B");
        assert_eq!(sigv2_encode_key("Foo Bar"), "Foo%20Bar");
    }

    #[test]
    fn ipv6_host_with_and_without_port() {
        let with_port = Url::parse("https://[2001:db8::1]:8443/").unwrap();
        assert_eq!(host_from_url(&with_port), "[2001:db8::1]:8443");
        let without_port = Url::parse("https://[2001:db8::1]/").unwrap();
        assert_eq!(host_from_url(&without_port), "[2001:db8::1]");
    }

    #[test]
    fn default_port_omitted() {
        let url = Url::parse("https://iam.amazonaws.com:443/").unwrap();
        assert_eq!(host_from_url(&url), "iam.amazonaws.com");
    }

    #[test]
    fn normalize_resolves_dot_segments_but_keeps_literal_when_asked() {
        assert_eq!(normalize_url_path(""), "/");
        assert_eq!(normalize_url_path("/a/../c/key"), "/c/key");
        assert_eq!(normalize_url_path("/a/./b/"), "/a/b/");
        assert_eq!(normalize_url_path("/a//b"), "/a/b");
    }

    #[test]
    fn trimall_collapses_internal_whitespace() {
        assert_eq!(trimall("  a   b  c "), "a b c");
    }
}
