//! Integration test: test case library construction from fixture suites.
//!
//! Validates:
//! 1. Fixture suites expand across every allowed configuration point.
//! 2. Full names are unique and carry a qualifier per unpinned axis.
//! 3. Cases are grouped by the server instance that must host them.
//! 4. Expected responses follow each stream shape.
//! 5. Padded requests encode to the receive limit plus their delta.
//! 6. Construction is deterministic and fails as a whole on bad input.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crosscheck_harness::structured_log::{LogEmitter, validate_log_line};
use crosscheck_harness::{
    CaseDefinitionError, ConfigurationError, LibraryError, SERVER_RECEIVE_LIMIT, ServerInstance,
    TestCaseLibrary,
};
use crosscheck_model::{
    Code, Codec, Compression, ConfigCase, EncodedLen, ErrorDetail, ExpandedSize, HttpVersion,
    Protocol, StreamType, TestMode, TestSuite,
};
use proptest::prelude::*;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn load_suite(name: &str) -> TestSuite {
    let path = fixture_path(name);
    TestSuite::from_file(&path)
        .unwrap_or_else(|e| panic!("failed to load {}: {e}", path.display()))
}

fn fixture_suites() -> Vec<TestSuite> {
    vec![
        load_suite("basic_suite.json"),
        load_suite("limits_suite.json"),
        load_suite("tls_suite.json"),
    ]
}

/// Every point an implementation supporting everything would declare.
fn everything_allowed() -> Vec<ConfigCase> {
    let mut cases = Vec::new();
    for &protocol in Protocol::ALL {
        for &version in HttpVersion::ALL {
            for &codec in Codec::ALL {
                for &compression in Compression::ALL {
                    for &stream_type in StreamType::ALL {
                        for use_tls in [false, true] {
                            for use_tls_client_certs in [false, true] {
                                for use_message_receive_limit in [false, true] {
                                    cases.push(ConfigCase {
                                        version,
                                        protocol,
                                        codec,
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
    }
    cases
}

fn build_client_library() -> TestCaseLibrary {
    TestCaseLibrary::new(&fixture_suites(), &everything_allowed(), TestMode::Client)
        .expect("fixture library should build")
}

const FULL_DUPLEX: &str =
    "Basic/HTTPVersion:2/Protocol:PROTOCOL_GRPC/Compression:COMPRESSION_GZIP/TLS:true/full-duplex";

#[test]
fn fixture_suites_expand_to_expected_counts() {
    let lib = build_client_library();
    // Basic: 3 protocols x 2 versions x 2 TLS x 2 compressions x 6 templates.
    // Limits: 2 TLS x 2 templates. TLS suite: 2 protocols x 1 template.
    assert_eq!(lib.len(), 144 + 4 + 2);
    assert_eq!(lib.test_cases.len(), lib.test_case_names.len());

    let server_mode =
        TestCaseLibrary::new(&fixture_suites(), &everything_allowed(), TestMode::Server)
            .expect("server library should build");
    assert_eq!(server_mode.len(), 144 + 2, "client-only suite is skipped");
}

#[test]
fn full_names_qualify_unpinned_axes() {
    let lib = build_client_library();
    let case = lib.get(FULL_DUPLEX).expect("full duplex case present");
    assert_eq!(case.request.test_name, FULL_DUPLEX);
    assert_eq!(lib.test_case_names[FULL_DUPLEX], "full-duplex");
    assert_eq!(case.request.protocol, Protocol::Grpc);
    assert_eq!(case.request.http_version, HttpVersion::Http2);
    assert_eq!(case.request.compression, Compression::Gzip);
    assert!(case.request.uses_tls());
    assert!(case.request.client_tls_creds.is_none());
    assert_eq!(case.request.method_name(), "BidiStream");

    assert!(lib.get("Message Limits/TLS:false/unary/over-limit").is_some());
    let certs = lib
        .get("TLS Client Certs/Protocol:PROTOCOL_CONNECT/unary")
        .expect("tls case present");
    assert!(certs.request.client_tls_creds.is_some());

    for (name, case) in &lib.test_cases {
        assert_eq!(name, &case.request.test_name);
        assert!(!name.contains("//"), "empty segment in {name}");
    }
}

#[test]
fn cases_are_grouped_by_server_instance() {
    let lib = build_client_library();
    // 3 protocols x 2 versions x 2 TLS from Basic, plus the two client-cert servers.
    assert_eq!(lib.cases_by_server.len(), 14);
    let grouped: usize = lib.cases_by_server.values().map(Vec::len).sum();
    assert_eq!(grouped, lib.len());

    let certs = ServerInstance {
        protocol: Protocol::Grpc,
        http_version: HttpVersion::Http2,
        use_tls: true,
        use_tls_client_certs: true,
    };
    assert_eq!(certs.to_string(), "PROTOCOL_GRPC/HTTPVersion:2/TLS:true/ClientCerts");
    let hosted: Vec<&str> = lib
        .cases_for_server(&certs)
        .map(|case| case.request.test_name.as_str())
        .collect();
    assert_eq!(hosted, vec!["TLS Client Certs/Protocol:PROTOCOL_GRPC/unary"]);

    let plain_grpc = ServerInstance {
        protocol: Protocol::Grpc,
        http_version: HttpVersion::Http2,
        use_tls: false,
        use_tls_client_certs: false,
    };
    // 2 compressions x 6 Basic templates plus both Limits templates.
    assert_eq!(lib.cases_for_server(&plain_grpc).count(), 14);
}

#[test]
fn expected_responses_follow_stream_shapes() {
    let lib = build_client_library();
    let prefix = "Basic/HTTPVersion:1/Protocol:PROTOCOL_CONNECT/Compression:COMPRESSION_IDENTITY/TLS:false";
    let expected = |simple: &str| {
        let name = format!("{prefix}/{simple}");
        lib.get(&name)
            .and_then(|case| case.expected_response.clone())
            .unwrap_or_else(|| panic!("no expectation for {name}"))
    };

    let unary = expected("unary/success");
    assert_eq!(unary.payloads.len(), 1);
    assert_eq!(unary.payloads[0].data, b"X");
    assert_eq!(unary.response_headers[0].name, "x-custom-header");
    assert_eq!(unary.response_trailers[0].name, "x-custom-trailer");
    let info = unary.payloads[0].request_info.as_ref().expect("request info");
    assert_eq!(info.timeout_ms, Some(5000));
    assert_eq!(info.request_headers[0].name, "x-conformance-test");

    let error = expected("unary/error");
    assert!(error.payloads.is_empty());
    let error = error.error.expect("error expectation");
    assert_eq!(error.code, Code::ResourceExhausted);
    assert!(matches!(error.details.last(), Some(ErrorDetail::RequestInfo(_))));

    let client_stream = expected("client-stream");
    assert_eq!(client_stream.payloads[0].data, b"X");
    let info = client_stream.payloads[0].request_info.as_ref().expect("request info");
    assert_eq!(info.requests.len(), 2);

    let server_stream = expected("server-stream");
    assert_eq!(server_stream.payloads.len(), 2);
    assert_eq!(server_stream.payloads[0].data, b"X");
    assert_eq!(server_stream.payloads[1].data, b"Y");
    assert!(server_stream.payloads[0].request_info.is_some());
    assert!(server_stream.payloads[1].request_info.is_none());

    let half_duplex = expected("half-duplex");
    assert_eq!(half_duplex.payloads.len(), 1);
    assert_eq!(half_duplex.payloads[0].data, b"X");
    let info = half_duplex.payloads[0].request_info.as_ref().expect("request info");
    assert_eq!(info.requests.len(), 2);
}

#[test]
fn full_duplex_payloads_echo_their_own_request() {
    let lib = build_client_library();
    let case = lib.get(FULL_DUPLEX).expect("full duplex case present");
    let expected = case.expected_response.as_ref().expect("expectation");
    assert_eq!(expected.payloads.len(), 3);
    let data: Vec<&[u8]> = expected.payloads.iter().map(|p| p.data.as_slice()).collect();
    assert_eq!(data, vec![&b"X"[..], &b"Y"[..], &b"Z"[..]]);
    for (i, payload) in expected.payloads.iter().enumerate() {
        let info = payload.request_info.as_ref().expect("request info");
        assert_eq!(info.requests, vec![case.request.request_messages[i].clone()]);
        if i == 0 {
            assert_eq!(info.timeout_ms, Some(2000));
            assert_eq!(info.request_headers.len(), 1);
        } else {
            assert_eq!(info.timeout_ms, None);
            assert!(info.request_headers.is_empty());
        }
    }
}

#[test]
fn padded_requests_hit_exact_sizes() {
    let lib = build_client_library();
    let limit = SERVER_RECEIVE_LIMIT as usize;
    for tls in [false, true] {
        let over = lib
            .get(&format!("Message Limits/TLS:{tls}/unary/over-limit"))
            .expect("over-limit case present");
        assert_eq!(over.request.request_messages[0].encoded_len(), limit + 1);

        let at = lib
            .get(&format!("Message Limits/TLS:{tls}/server-stream/at-limit"))
            .expect("at-limit case present");
        assert_eq!(at.request.request_messages[0].encoded_len(), limit);

        // The echo inside the expectation reflects the padded request.
        let echoed = &over.expected_response.as_ref().expect("expectation").payloads[0]
            .request_info
            .as_ref()
            .expect("request info")
            .requests[0];
        assert_eq!(echoed.encoded_len(), limit + 1);
    }
}

#[test]
fn construction_is_deterministic() {
    let a = build_client_library();
    let b = build_client_library();
    assert_eq!(a, b);
    assert_eq!(a.fingerprint(), b.fingerprint());

    let mut reversed = everything_allowed();
    reversed.reverse();
    let c = TestCaseLibrary::new(&fixture_suites(), &reversed, TestMode::Client)
        .expect("library should build");
    assert_eq!(a.fingerprint(), c.fingerprint());

    let names: BTreeSet<&String> = a.test_cases.keys().collect();
    assert_eq!(names.len(), a.len());
}

#[test]
fn bad_inputs_fail_the_whole_build() {
    let mut suites = fixture_suites();
    suites.push(load_suite("basic_suite.json"));
    let err = TestCaseLibrary::new(&suites, &everything_allowed(), TestMode::Client).unwrap_err();
    assert_eq!(
        err,
        LibraryError::Configuration(ConfigurationError::DuplicateSuite {
            suite: "Basic".into()
        })
    );

    let err = TestCaseLibrary::new(&fixture_suites(), &[], TestMode::Client).unwrap_err();
    assert_eq!(
        err,
        LibraryError::Configuration(ConfigurationError::NoApplicableCases)
    );

    let mut limits = load_suite("limits_suite.json");
    limits.relevant_codecs = vec![Codec::Proto, Codec::Json];
    let err = TestCaseLibrary::new(&[limits], &everything_allowed(), TestMode::Client).unwrap_err();
    assert!(
        matches!(err, LibraryError::CaseDefinition { ref suite, .. } if suite == "Message Limits"),
        "unexpected error: {err}"
    );

    // The limits suite is client-only, so a server build skips it, but its
    // directives are still checked.
    let mut limits = load_suite("limits_suite.json");
    limits.test_cases[0].expand_requests.push(ExpandedSize {
        size_relative_to_limit: Some(2),
    });
    let suites = vec![load_suite("basic_suite.json"), limits];
    let err = TestCaseLibrary::new(&suites, &everything_allowed(), TestMode::Server).unwrap_err();
    assert!(
        matches!(
            err,
            LibraryError::CaseDefinition {
                ref suite,
                source: CaseDefinitionError::TooManyExpandDirectives {
                    directives: 2,
                    requests: 1,
                    ..
                },
            } if suite == "Message Limits"
        ),
        "unexpected error: {err}"
    );
}

#[test]
fn build_log_lines_validate() {
    let mut log = LogEmitter::to_buffer("crosscheck", "library-test");
    TestCaseLibrary::new_with_log(
        &fixture_suites(),
        &everything_allowed(),
        TestMode::Server,
        &mut log,
    )
    .expect("library should build");
    let lines = log.buffered_lines();
    // Two expanded suites, one skipped, one summary.
    assert_eq!(lines.len(), 4);
    for (i, line) in lines.iter().enumerate() {
        let entry = validate_log_line(line, i + 1)
            .unwrap_or_else(|errs| panic!("line {} invalid: {errs:?}", i + 1));
        assert_eq!(entry.mode.as_deref(), Some("server"));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn any_allow_subset_builds_reproducibly(seed in any::<u64>()) {
        // Keep roughly half of the points, chosen by a cheap hash of the seed.
        let subset: Vec<ConfigCase> = everything_allowed()
            .into_iter()
            .enumerate()
            .filter(|(i, _)| (seed.rotate_left((*i % 64) as u32) ^ (*i as u64)) & 1 == 0)
            .map(|(_, case)| case)
            .collect();
        let first = TestCaseLibrary::new(&fixture_suites(), &subset, TestMode::Client);
        let second = TestCaseLibrary::new(&fixture_suites(), &subset, TestMode::Client);
        match (first, second) {
            (Ok(a), Ok(b)) => {
                prop_assert_eq!(a.fingerprint(), b.fingerprint());
                let grouped: usize = a.cases_by_server.values().map(Vec::len).sum();
                prop_assert_eq!(grouped, a.len());
            }
            (Err(a), Err(b)) => prop_assert_eq!(a, b),
            _ => prop_assert!(false, "builds disagree"),
        }
    }
}
