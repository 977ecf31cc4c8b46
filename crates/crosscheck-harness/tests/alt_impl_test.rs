//! Integration test: alternate-implementation case selection.
//!
//! Validates:
//! 1. Only transports, codecs, and compressions the alternate roles speak survive.
//! 2. TLS cases never survive.
//! 3. The role marker is inserted right before the simple name.
//! 4. `all_permutations` appends one renamed subset per enabled role combination.

use std::collections::HashSet;
use std::path::PathBuf;

use crosscheck_harness::TestCaseLibrary;
use crosscheck_harness::alt_impl::{BOTH_MARKER, CLIENT_MARKER, SERVER_MARKER};
use crosscheck_model::{
    Codec, Compression, ConfigCase, HttpVersion, Protocol, StreamType, TestMode, TestSuite,
};

fn load_suite(name: &str) -> TestSuite {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    TestSuite::from_file(&path)
        .unwrap_or_else(|e| panic!("failed to load {}: {e}", path.display()))
}

fn library() -> TestCaseLibrary {
    let suites = vec![
        load_suite("basic_suite.json"),
        load_suite("limits_suite.json"),
        load_suite("tls_suite.json"),
    ];
    let mut allowed = Vec::new();
    for &protocol in Protocol::ALL {
        for &version in HttpVersion::ALL {
            for &compression in Compression::ALL {
                for &stream_type in StreamType::ALL {
                    for use_tls in [false, true] {
                        for use_tls_client_certs in [false, true] {
                            for use_message_receive_limit in [false, true] {
                                allowed.push(ConfigCase {
                                    version,
                                    protocol,
                                    codec: Codec::Proto,
                                    compression,
                                    stream_type,
                                    use_tls,
                                    use_tls_client_certs,
                                    use_message_receive_limit,
                                    ..Default::default()
                                });
                            }
                        }
                    }
                }
            }
        }
    }
    TestCaseLibrary::new(&suites, &allowed, TestMode::Client).expect("library should build")
}

#[test]
fn alternate_client_only_speaks_grpc_over_http2() {
    let lib = library();
    let cases = lib.filter_alt_impl(true, false);
    // Basic: 2 compressions x 6 templates; Limits: both templates.
    assert_eq!(cases.len(), 14);
    for case in &cases {
        assert_eq!(case.request.protocol, Protocol::Grpc);
        assert_eq!(case.request.http_version, HttpVersion::Http2);
        assert!(!case.request.uses_tls());
        assert!(case.request.test_name.contains(CLIENT_MARKER));
    }
}

#[test]
fn alternate_server_also_hosts_grpc_web() {
    let lib = library();
    let cases = lib.filter_alt_impl(false, true);
    // gRPC/2 plus gRPC-Web/1 and /2 from Basic, and both Limits templates.
    assert_eq!(cases.len(), 12 + 24 + 2);
    assert!(cases.iter().all(|case| case.request.protocol != Protocol::Connect));
    assert!(cases
        .iter()
        .all(|case| case.request.http_version != HttpVersion::Http3));
    assert!(cases
        .iter()
        .any(|case| case.request.protocol == Protocol::GrpcWeb));

    let both = lib.filter_alt_impl(true, true);
    assert_eq!(both.len(), 14);
    assert!(both.iter().all(|case| case.request.test_name.contains(BOTH_MARKER)));
}

#[test]
fn marker_precedes_the_simple_name() {
    let lib = library();
    let cases = lib.filter_alt_impl(false, true);
    let name = "Basic/HTTPVersion:1/Protocol:PROTOCOL_GRPC_WEB/Compression:COMPRESSION_GZIP/TLS:false/(grpc server impl)/unary/success";
    assert!(
        cases.iter().any(|case| case.request.test_name == name),
        "missing {name}"
    );
    for case in &cases {
        let (prefix, _) = case
            .request
            .test_name
            .split_once(SERVER_MARKER)
            .expect("marker present");
        assert!(prefix.ends_with("TLS:false/"));
    }
}

#[test]
fn without_alternate_roles_selection_is_the_identity() {
    let lib = library();
    let cases = lib.filter_alt_impl(false, false);
    assert_eq!(cases.len(), lib.len());
    assert!(cases
        .iter()
        .all(|case| lib.get(&case.request.test_name).is_some()));
}

#[test]
fn all_permutations_counts_every_role_combination() {
    let lib = library();
    assert_eq!(lib.all_permutations(false, false).len(), lib.len());
    assert_eq!(lib.all_permutations(true, false).len(), lib.len() + 14);
    assert_eq!(lib.all_permutations(false, true).len(), lib.len() + 38);

    let all = lib.all_permutations(true, true);
    assert_eq!(all.len(), lib.len() + 14 + 38 + 14);
    let names: HashSet<&str> = all.iter().map(|case| case.request.test_name.as_str()).collect();
    assert_eq!(names.len(), all.len(), "permutation names collide");
}
