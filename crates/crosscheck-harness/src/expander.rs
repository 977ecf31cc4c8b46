//! Suite validation and expansion across the conformance dimension space.

use std::collections::{BTreeSet, HashSet};

use crosscheck_model::{
    Codec, Compression, ConfigCase, ConnectVersionMode, HttpVersion, Protocol, StreamType,
    TestCase, TestMode, TestSuite, messages::has_raw_response,
};

use crate::error::{CaseDefinitionError, ConfigurationError};

/// A configuration point a suite applies to, with the name qualifiers that
/// tell its cases apart from the same templates at other points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionPoint {
    pub config: ConfigCase,
    pub name_prefix: Vec<String>,
}

/// Check names and case lists across all suites before any is expanded.
pub fn validate_identities(suites: &[TestSuite]) -> Result<(), ConfigurationError> {
    let mut seen = BTreeSet::new();
    for (i, suite) in suites.iter().enumerate() {
        if suite.name.is_empty() {
            return Err(ConfigurationError::UnnamedSuite { index: i + 1 });
        }
        if suite.test_cases.is_empty() {
            return Err(ConfigurationError::EmptySuite {
                suite: suite.name.clone(),
            });
        }
        if !seen.insert(suite.name.as_str()) {
            return Err(ConfigurationError::DuplicateSuite {
                suite: suite.name.clone(),
            });
        }
    }
    Ok(())
}

/// Reject templates whose features conflict with their suite's declared mode or codecs.
pub fn preflight_cases(suite: &TestSuite) -> Result<(), CaseDefinitionError> {
    for case in &suite.test_cases {
        let name = &case.request.test_name;
        if case.request.raw_request.is_some() && suite.mode != TestMode::Server {
            return Err(CaseDefinitionError::RawRequestOutsideServerMode { name: name.clone() });
        }
        if has_raw_response(&case.request.request_messages) {
            if suite.mode != TestMode::Client {
                return Err(CaseDefinitionError::RawResponseOutsideClientMode {
                    name: name.clone(),
                });
            }
            if case.expected_response.is_none() {
                return Err(CaseDefinitionError::RawResponseWithoutExpectation {
                    name: name.clone(),
                });
            }
        }
        if !case.expand_requests.is_empty() && suite.relevant_codecs != [Codec::Proto] {
            return Err(CaseDefinitionError::ExpansionWithNonProtoCodec { name: name.clone() });
        }
        preflight_expand_directives(case)?;
    }
    Ok(())
}

/// Directives pair with request messages by position; each sized one needs a
/// message with a padding field, whatever mode the suite runs in.
fn preflight_expand_directives(case: &TestCase) -> Result<(), CaseDefinitionError> {
    let name = &case.request.test_name;
    let messages = &case.request.request_messages;
    if case.expand_requests.len() > messages.len() {
        return Err(CaseDefinitionError::TooManyExpandDirectives {
            name: name.clone(),
            directives: case.expand_requests.len(),
            requests: messages.len(),
        });
    }
    for (i, (directive, message)) in case.expand_requests.iter().zip(messages).enumerate() {
        if directive.size_relative_to_limit.is_some() && !message.has_padding_field() {
            return Err(CaseDefinitionError::ExpandDirectiveWithoutPaddingField {
                name: name.clone(),
                index: i + 1,
                type_url: message.type_url(),
            });
        }
    }
    Ok(())
}

fn only_connect(protocols: &[Protocol]) -> bool {
    protocols == [Protocol::Connect]
}

/// Check that a suite's reliance flags are consistent with its restrictions.
pub fn validate_reliance(suite: &TestSuite) -> Result<(), ConfigurationError> {
    if suite.relies_on_tls_client_certs && !suite.relies_on_tls {
        return Err(ConfigurationError::ClientCertsWithoutTls {
            suite: suite.name.clone(),
        });
    }
    if suite.relies_on_connect_get && !only_connect(&suite.relevant_protocols) {
        return Err(ConfigurationError::ConnectGetWithOtherProtocols {
            suite: suite.name.clone(),
            protocols: suite.relevant_protocols.clone(),
        });
    }
    if !suite.connect_version_mode.is_unspecified() && !only_connect(&suite.relevant_protocols) {
        return Err(ConfigurationError::VersionModeWithOtherProtocols {
            suite: suite.name.clone(),
            mode: suite.connect_version_mode,
            protocols: suite.relevant_protocols.clone(),
        });
    }
    Ok(())
}

/// An empty restriction means every known value.
fn axis<'a, T>(relevant: &'a [T], all: &'static [T]) -> &'a [T] {
    if relevant.is_empty() { all } else { relevant }
}

/// Enumerate the points of `suite` that appear in `allowed`, in a fixed order.
pub fn expand_suite(
    suite: &TestSuite,
    allowed: &HashSet<ConfigCase>,
) -> Result<Vec<ExpansionPoint>, ConfigurationError> {
    validate_reliance(suite)?;

    let tls_modes: &[bool] = if suite.relies_on_tls {
        &[true]
    } else {
        &[true, false]
    };
    let mut points = Vec::new();
    for &protocol in axis(&suite.relevant_protocols, Protocol::ALL) {
        for &version in axis(&suite.relevant_http_versions, HttpVersion::ALL) {
            for &use_tls in tls_modes {
                for &codec in axis(&suite.relevant_codecs, Codec::ALL) {
                    for &compression in axis(&suite.relevant_compressions, Compression::ALL) {
                        for &stream_type in StreamType::ALL {
                            let config = ConfigCase {
                                version,
                                protocol,
                                codec,
                                compression,
                                stream_type,
                                use_tls,
                                use_tls_client_certs: suite.relies_on_tls_client_certs,
                                use_connect_get: suite.relies_on_connect_get,
                                connect_version_mode: suite.connect_version_mode,
                                use_message_receive_limit: suite.relies_on_message_receive_limit,
                            };
                            if allowed.contains(&config) {
                                points.push(ExpansionPoint {
                                    config,
                                    name_prefix: name_prefix(suite, &config),
                                });
                            }
                        }
                    }
                }
            }
        }
    }
    Ok(points)
}

/// Suite name plus a qualifier for every axis the suite did not pin down.
#[must_use]
pub fn name_prefix(suite: &TestSuite, config: &ConfigCase) -> Vec<String> {
    let mut prefix = vec![suite.name.clone()];
    if suite.relevant_http_versions.len() != 1 {
        prefix.push(format!("HTTPVersion:{}", config.version.number()));
    }
    if suite.relevant_protocols.len() != 1 {
        prefix.push(format!("Protocol:{}", config.protocol));
    }
    if suite.relevant_codecs.len() != 1 {
        prefix.push(format!("Codec:{}", config.codec));
    }
    if suite.relevant_compressions.len() != 1 {
        prefix.push(format!("Compression:{}", config.compression));
    }
    if !suite.relies_on_tls {
        prefix.push(format!("TLS:{}", config.use_tls));
    }
    prefix
}
