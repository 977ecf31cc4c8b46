//! Case selection for the feature-limited alternate reference implementation.
//!
//! The alternate client and server only speak gRPC and gRPC-Web, the binary
//! codec, and identity or gzip compression, and never use TLS. Cases that
//! survive are renamed with a marker segment so they stay distinct from the
//! primary cases they were cloned from.

use std::collections::BTreeMap;

use crosscheck_model::{
    Codec, Compression, HttpVersion, Protocol, TestCase, messages::has_raw_response,
};

pub const BOTH_MARKER: &str = "(grpc impls)";
pub const CLIENT_MARKER: &str = "(grpc client impl)";
pub const SERVER_MARKER: &str = "(grpc server impl)";

/// Marker segment for a combination of alternate roles, if any.
#[must_use]
pub const fn marker(alt_client: bool, alt_server: bool) -> Option<&'static str> {
    match (alt_client, alt_server) {
        (true, true) => Some(BOTH_MARKER),
        (true, false) => Some(CLIENT_MARKER),
        (false, true) => Some(SERVER_MARKER),
        (false, false) => None,
    }
}

/// Whether the alternate implementation(s) can take part in `case`.
#[must_use]
pub fn supports(case: &TestCase, alt_client: bool, alt_server: bool) -> bool {
    let request = &case.request;
    let transport_ok = match request.protocol {
        Protocol::Grpc => request.http_version == HttpVersion::Http2,
        Protocol::GrpcWeb if !alt_client => matches!(
            request.http_version,
            HttpVersion::Http1 | HttpVersion::Http2
        ),
        _ => false,
    };
    transport_ok
        && request.codec == Codec::Proto
        && matches!(request.compression, Compression::Identity | Compression::Gzip)
        && request.server_tls_cert.is_empty()
        && !(alt_client && request.raw_request.is_some())
        && !(alt_server && has_raw_response(&request.request_messages))
}

/// Insert `marker` as the segment right before the simple name.
#[must_use]
pub fn add_marker_to_name(full_name: &str, simple_name: &str, marker: &str) -> String {
    let prefix = full_name.strip_suffix(simple_name).unwrap_or(full_name);
    format!("{prefix}{marker}/{simple_name}")
}

/// Clone and rename the cases the alternate roles support.
///
/// With neither role alternate this is the identity. `names` maps full names
/// to simple names; a case missing from it is treated as having a one-segment
/// simple name.
#[must_use]
pub fn filter_alt_impl_cases<'a>(
    cases: impl IntoIterator<Item = &'a TestCase>,
    names: &BTreeMap<String, String>,
    alt_client: bool,
    alt_server: bool,
) -> Vec<TestCase> {
    let Some(marker) = marker(alt_client, alt_server) else {
        return cases.into_iter().cloned().collect();
    };
    cases
        .into_iter()
        .filter(|case| supports(case, alt_client, alt_server))
        .map(|case| {
            let full_name = &case.request.test_name;
            let simple_name = names.get(full_name).map_or_else(
                || full_name.rsplit('/').next().unwrap_or(full_name),
                String::as_str,
            );
            let mut renamed = case.clone();
            renamed.request.test_name = add_marker_to_name(full_name, simple_name, marker);
            renamed
        })
        .collect()
}
