//! Timestamp formats used across the signing schemes (spec §6).

use chrono::{DateTime, Utc};

/// SigV4's basic format: `YYYYMMDD'T'HHMMSS'Z'`.
pub const SIGV4_TIMESTAMP_FMT: &str = "%Y%m%dT%H%M%SZ";
/// SigV2's extended ISO-8601 format.
pub const ISO8601_FMT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub fn sigv4_timestamp(now: DateTime<Utc>) -> String {
    now.format(SIGV4_TIMESTAMP_FMT).to_string()
}

pub fn iso8601(now: DateTime<Utc>) -> String {
    now.format(ISO8601_FMT).to_string()
}

/// `email.utils.formatdate(epoch, usegmt=False)` equivalent — the `Date`
/// header rewrite SigV4 performs keeps this `-0000` offset rather than
/// `GMT`, an observed botocore quirk preserved here for wire fidelity.
pub fn http_date_dash_offset(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S -0000").to_string()
}

/// `email.utils.formatdate(usegmt=True)` equivalent, used by SigV3's `Date`
/// header.
pub fn http_date_gmt(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
