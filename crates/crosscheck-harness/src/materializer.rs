//! Turning case templates into concrete, named cases for one configuration point.

use crosscheck_model::{CONFORMANCE_SERVICE_NAME, StreamType, TestCase, TlsCreds};

use crate::config::{CLIENT_RECEIVE_LIMIT, PLACEHOLDER};
use crate::error::CaseDefinitionError;
use crate::expander::ExpansionPoint;

/// A template instantiated at one configuration point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedCase {
    pub full_name: String,
    pub simple_name: String,
    pub case: TestCase,
}

/// Join name segments with '/', skipping empty ones.
#[must_use]
pub fn join_name<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    segments
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Instantiate every template whose stream type matches the point.
///
/// Each template is checked before the stream-type test, so a broken
/// template fails the whole suite regardless of which points are allowed.
pub fn materialize(
    point: &ExpansionPoint,
    templates: &[TestCase],
) -> Result<Vec<MaterializedCase>, CaseDefinitionError> {
    let mut out = Vec::new();
    for (i, template) in templates.iter().enumerate() {
        let index = i + 1;
        let name = &template.request.test_name;
        if name.is_empty() {
            return Err(CaseDefinitionError::MissingName { index });
        }
        let stream_type = template.request.stream_type;
        if stream_type == StreamType::Unspecified {
            return Err(CaseDefinitionError::MissingStreamType {
                index,
                name: name.clone(),
            });
        }
        if stream_type != point.config.stream_type {
            continue;
        }

        let mut case = template.clone();
        resolve_method(&mut case, index)?;
        stamp(&mut case, point);

        let full_name = join_name(
            point
                .name_prefix
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(name.as_str())),
        );
        case.request.test_name = full_name.clone();
        out.push(MaterializedCase {
            full_name,
            simple_name: name.clone(),
            case,
        });
    }
    Ok(out)
}

fn resolve_method(case: &mut TestCase, index: usize) -> Result<(), CaseDefinitionError> {
    let request = &mut case.request;
    match (request.service.is_some(), request.method.is_some()) {
        (false, true) => Err(CaseDefinitionError::MethodWithoutService {
            index,
            name: request.test_name.clone(),
        }),
        (true, false) => Err(CaseDefinitionError::ServiceWithoutMethod {
            index,
            name: request.test_name.clone(),
        }),
        (true, true) => Ok(()),
        (false, false) => {
            request.service = Some(CONFORMANCE_SERVICE_NAME.to_string());
            request.method = request.stream_type.method_name().map(str::to_string);
            Ok(())
        }
    }
}

fn stamp(case: &mut TestCase, point: &ExpansionPoint) {
    let config = &point.config;
    let request = &mut case.request;
    if config.use_tls {
        request.server_tls_cert = PLACEHOLDER.to_vec();
        request.client_tls_creds = config.use_tls_client_certs.then(|| TlsCreds {
            cert: PLACEHOLDER.to_vec(),
            key: PLACEHOLDER.to_vec(),
        });
    } else {
        request.server_tls_cert.clear();
        request.client_tls_creds = None;
    }
    request.http_version = config.version;
    request.protocol = config.protocol;
    request.codec = config.codec;
    request.compression = config.compression;
    request.message_receive_limit = CLIENT_RECEIVE_LIMIT;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosscheck_model::{ClientCompatRequest, Codec, Compression, ConfigCase, HttpVersion, Protocol};

    fn template(name: &str, stream_type: StreamType) -> TestCase {
        TestCase {
            request: ClientCompatRequest {
                test_name: name.into(),
                stream_type,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn point(stream_type: StreamType, use_tls: bool, certs: bool) -> ExpansionPoint {
        ExpansionPoint {
            config: ConfigCase {
                version: HttpVersion::Http2,
                protocol: Protocol::Grpc,
                codec: Codec::Proto,
                compression: Compression::Gzip,
                stream_type,
                use_tls,
                use_tls_client_certs: certs,
                ..Default::default()
            },
            name_prefix: vec!["Suite".into(), "TLS:true".into()],
        }
    }

    #[test]
    fn matching_templates_are_named_and_stamped() {
        let templates = [
            template("unary", StreamType::Unary),
            template("stream", StreamType::ServerStream),
        ];
        let cases = materialize(&point(StreamType::Unary, true, true), &templates).unwrap();
        assert_eq!(cases.len(), 1);
        let m = &cases[0];
        assert_eq!(m.full_name, "Suite/TLS:true/unary");
        assert_eq!(m.simple_name, "unary");
        let req = &m.case.request;
        assert_eq!(req.test_name, m.full_name);
        assert_eq!(req.service_name(), CONFORMANCE_SERVICE_NAME);
        assert_eq!(req.method_name(), "Unary");
        assert_eq!(req.protocol, Protocol::Grpc);
        assert_eq!(req.compression, Compression::Gzip);
        assert_eq!(req.server_tls_cert, PLACEHOLDER);
        assert_eq!(req.client_tls_creds.as_ref().unwrap().key, PLACEHOLDER);
        assert_eq!(req.message_receive_limit, CLIENT_RECEIVE_LIMIT);
    }

    #[test]
    fn plaintext_clears_tls_material() {
        let mut t = template("bidi", StreamType::FullDuplexBidiStream);
        t.request.server_tls_cert = b"cert".to_vec();
        t.request.client_tls_creds = Some(TlsCreds::default());
        let cases =
            materialize(&point(StreamType::FullDuplexBidiStream, false, false), &[t]).unwrap();
        let req = &cases[0].case.request;
        assert!(req.server_tls_cert.is_empty());
        assert!(req.client_tls_creds.is_none());
        assert_eq!(req.method_name(), "BidiStream");
    }

    #[test]
    fn broken_templates_fail_even_for_other_stream_types() {
        let at = point(StreamType::Unary, false, false);
        assert_eq!(
            materialize(&at, &[template("", StreamType::Unary)]),
            Err(CaseDefinitionError::MissingName { index: 1 })
        );
        assert!(matches!(
            materialize(
                &at,
                &[
                    template("ok", StreamType::Unary),
                    template("bad", StreamType::Unspecified)
                ]
            ),
            Err(CaseDefinitionError::MissingStreamType { index: 2, .. })
        ));
    }

    #[test]
    fn service_and_method_come_in_pairs() {
        let mut t = template("custom", StreamType::Unary);
        t.request.method = Some("Unary".into());
        assert!(matches!(
            materialize(&point(StreamType::Unary, false, false), &[t.clone()]),
            Err(CaseDefinitionError::MethodWithoutService { .. })
        ));
        t.request.service = Some("other.Service".into());
        let cases = materialize(&point(StreamType::Unary, false, false), &[t]).unwrap();
        assert_eq!(cases[0].case.request.service_name(), "other.Service");
    }
}
