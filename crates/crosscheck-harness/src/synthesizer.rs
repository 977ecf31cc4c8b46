//! Expected-response synthesis.
//!
//! Reference servers echo what they received: every response carries a
//! `RequestInfo` describing the request headers, timeout, and messages. The
//! functions here predict that echo from the request alone, following the
//! response definition embedded in the first request message.

use crosscheck_model::{
    ClientCompatRequest, ClientResponseResult, Codec, ConformancePayload, ConnectGetInfo,
    ErrorDetail, Header, RequestInfo, ResponseDefinition, StreamResponseDefinition, StreamType,
    TestCase, UnaryResponse, UnaryResponseDefinition,
};

use crate::error::SynthesisError;

/// Fill in `case.expected_response` unless the case already declares one.
pub fn populate_expected_response(case: &mut TestCase) -> Result<(), SynthesisError> {
    if case.expected_response.is_none() {
        case.expected_response = Some(expected_response(&case.request)?);
    }
    Ok(())
}

/// Predict the result a conforming server produces for `request`.
pub fn expected_response(
    request: &ClientCompatRequest,
) -> Result<ClientResponseResult, SynthesisError> {
    // TODO: the stream shapes need a RequestInfo even without any request
    // messages; until then such cases expect nothing.
    let Some(first) = request.request_messages.first() else {
        return Ok(ClientResponseResult::default());
    };
    match request.stream_type {
        StreamType::Unary | StreamType::ClientStream => match first.response_definition() {
            Some(ResponseDefinition::Unary(definition)) => Ok(unary_result(request, definition)),
            _ => Err(SynthesisError::NotUnaryRequest {
                type_url: first.type_url(),
            }),
        },
        StreamType::ServerStream
        | StreamType::HalfDuplexBidiStream
        | StreamType::FullDuplexBidiStream => match first.response_definition() {
            Some(ResponseDefinition::Stream(definition)) => Ok(stream_result(request, definition)),
            _ => Err(SynthesisError::NotStreamRequest {
                test_name: request.test_name.clone(),
                type_url: first.type_url(),
            }),
        },
        StreamType::Unspecified => Err(SynthesisError::MissingStreamType),
    }
}

fn full_request_info(request: &ClientCompatRequest) -> RequestInfo {
    RequestInfo {
        request_headers: request.request_headers.clone(),
        timeout_ms: request.timeout_ms.map(i64::from),
        requests: request.request_messages.clone(),
        connect_get_info: None,
    }
}

fn connect_get_info(codec: Codec) -> ConnectGetInfo {
    let encoding = if codec == Codec::Json { "json" } else { "proto" };
    ConnectGetInfo {
        query_params: vec![
            Header::new("encoding", &[encoding]),
            Header::new("connect", &["v1"]),
        ],
    }
}

fn unary_result(
    request: &ClientCompatRequest,
    definition: Option<&UnaryResponseDefinition>,
) -> ClientResponseResult {
    let mut info = full_request_info(request);
    if request.use_get_http_method {
        info.connect_get_info = Some(connect_get_info(request.codec));
    }

    let Some(definition) = definition else {
        return ClientResponseResult {
            payloads: vec![ConformancePayload {
                data: Vec::new(),
                request_info: Some(info),
            }],
            ..Default::default()
        };
    };

    let mut expected = ClientResponseResult {
        response_headers: definition.response_headers.clone(),
        response_trailers: definition.response_trailers.clone(),
        ..Default::default()
    };
    match &definition.response {
        Some(UnaryResponse::Error(error)) => {
            let mut error = error.clone();
            error.details.push(ErrorDetail::RequestInfo(info));
            expected.error = Some(error);
        }
        Some(UnaryResponse::ResponseData(data)) => expected.payloads.push(ConformancePayload {
            data: data.clone(),
            request_info: Some(info),
        }),
        None => expected.payloads.push(ConformancePayload {
            data: Vec::new(),
            request_info: Some(info),
        }),
    }
    expected
}

fn stream_result(
    request: &ClientCompatRequest,
    definition: Option<&StreamResponseDefinition>,
) -> ClientResponseResult {
    let Some(definition) = definition else {
        return ClientResponseResult::default();
    };

    let mut expected = ClientResponseResult {
        response_headers: definition.response_headers.clone(),
        payloads: Vec::with_capacity(definition.response_data.len()),
        error: definition.error.clone(),
        response_trailers: definition.response_trailers.clone(),
    };

    // No responses at all: the echo travels in the error instead.
    if definition.response_data.is_empty()
        && let Some(error) = expected.error.as_mut()
    {
        error
            .details
            .push(ErrorDetail::RequestInfo(full_request_info(request)));
    }

    for (idx, data) in definition.response_data.iter().enumerate() {
        let request_info = match request.stream_type {
            StreamType::FullDuplexBidiStream => {
                let mut info = RequestInfo {
                    requests: request.request_messages.get(idx).cloned().into_iter().collect(),
                    ..Default::default()
                };
                if idx == 0 {
                    info.request_headers = request.request_headers.clone();
                    info.timeout_ms = request.timeout_ms.map(i64::from);
                }
                Some(info)
            }
            _ => (idx == 0).then(|| full_request_info(request)),
        };
        expected.payloads.push(ConformancePayload {
            data: data.clone(),
            request_info,
        });
    }
    expected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosscheck_model::{BidiStreamRequest, Code, Error, ServerStreamRequest, UnaryRequest};

    fn unary_request(response: Option<UnaryResponse>) -> ClientCompatRequest {
        ClientCompatRequest {
            test_name: "unary".into(),
            stream_type: StreamType::Unary,
            request_headers: vec![Header::new("x-test", &["1"])],
            timeout_ms: Some(250),
            request_messages: vec![crosscheck_model::RequestMessage::Unary(UnaryRequest {
                response_definition: response.map(|response| UnaryResponseDefinition {
                    response_headers: vec![Header::new("h", &["v"])],
                    response: Some(response),
                    response_trailers: vec![Header::new("t", &["v"])],
                    ..Default::default()
                }),
                request_data: b"req".to_vec(),
            })],
            ..Default::default()
        }
    }

    #[test]
    fn unary_without_definition_echoes_request() {
        let req = unary_request(None);
        let expected = expected_response(&req).unwrap();
        assert_eq!(expected.payloads.len(), 1);
        let info = expected.payloads[0].request_info.as_ref().unwrap();
        assert_eq!(info.timeout_ms, Some(250));
        assert_eq!(info.requests, req.request_messages);
        assert!(info.connect_get_info.is_none());
    }

    #[test]
    fn unary_error_carries_request_info_detail() {
        let req = unary_request(Some(UnaryResponse::Error(Error::new(
            Code::ResourceExhausted,
            "too big",
        ))));
        let expected = expected_response(&req).unwrap();
        assert!(expected.payloads.is_empty());
        assert_eq!(expected.response_headers, vec![Header::new("h", &["v"])]);
        let error = expected.error.unwrap();
        assert_eq!(error.code, Code::ResourceExhausted);
        assert!(matches!(
            error.details.as_slice(),
            [ErrorDetail::RequestInfo(info)] if info.requests.len() == 1
        ));
    }

    #[test]
    fn connect_get_adds_query_params() {
        let mut req = unary_request(Some(UnaryResponse::ResponseData(b"X".to_vec())));
        req.use_get_http_method = true;
        req.codec = Codec::Json;
        let expected = expected_response(&req).unwrap();
        let info = expected.payloads[0].request_info.as_ref().unwrap();
        let params = &info.connect_get_info.as_ref().unwrap().query_params;
        assert_eq!(params[0], Header::new("encoding", &["json"]));
        assert_eq!(params[1], Header::new("connect", &["v1"]));
    }

    #[test]
    fn stream_error_without_data_gets_request_info() {
        let req = ClientCompatRequest {
            stream_type: StreamType::ServerStream,
            request_messages: vec![crosscheck_model::RequestMessage::ServerStream(
                ServerStreamRequest {
                    response_definition: Some(StreamResponseDefinition {
                        error: Some(Error::new(Code::Aborted, "no")),
                        ..Default::default()
                    }),
                    request_data: Vec::new(),
                },
            )],
            ..Default::default()
        };
        let expected = expected_response(&req).unwrap();
        assert!(expected.payloads.is_empty());
        assert_eq!(expected.error.unwrap().details.len(), 1);
    }

    #[test]
    fn stream_payloads_carry_declared_data() {
        let definition = Some(StreamResponseDefinition {
            response_data: vec![b"X".to_vec(), b"Y".to_vec()],
            ..Default::default()
        });
        let shapes = [
            (
                StreamType::ServerStream,
                crosscheck_model::RequestMessage::ServerStream(ServerStreamRequest {
                    response_definition: definition.clone(),
                    request_data: Vec::new(),
                }),
            ),
            (
                StreamType::HalfDuplexBidiStream,
                crosscheck_model::RequestMessage::BidiStream(BidiStreamRequest {
                    response_definition: definition.clone(),
                    ..Default::default()
                }),
            ),
            (
                StreamType::FullDuplexBidiStream,
                crosscheck_model::RequestMessage::BidiStream(BidiStreamRequest {
                    response_definition: definition.clone(),
                    full_duplex: true,
                    ..Default::default()
                }),
            ),
        ];
        for (stream_type, message) in shapes {
            let req = ClientCompatRequest {
                stream_type,
                request_messages: vec![message],
                ..Default::default()
            };
            let expected = expected_response(&req).unwrap();
            let data: Vec<&[u8]> = expected.payloads.iter().map(|p| p.data.as_slice()).collect();
            assert_eq!(data, vec![&b"X"[..], &b"Y"[..]], "{stream_type:?}");
        }
    }

    #[test]
    fn stream_without_definition_expects_nothing() {
        let req = ClientCompatRequest {
            stream_type: StreamType::HalfDuplexBidiStream,
            request_messages: vec![crosscheck_model::RequestMessage::BidiStream(
                BidiStreamRequest::default(),
            )],
            ..Default::default()
        };
        assert!(expected_response(&req).unwrap().is_empty());
    }

    #[test]
    fn mismatched_definition_shapes_fail() {
        let mut req = unary_request(None);
        req.stream_type = StreamType::ServerStream;
        assert!(matches!(
            expected_response(&req),
            Err(SynthesisError::NotStreamRequest { .. })
        ));

        req.stream_type = StreamType::Unspecified;
        assert_eq!(
            expected_response(&req),
            Err(SynthesisError::MissingStreamType)
        );
    }

    #[test]
    fn explicit_expectation_is_kept() {
        let mut case = TestCase {
            request: unary_request(None),
            expected_response: Some(ClientResponseResult::default()),
            ..Default::default()
        };
        populate_expected_response(&mut case).unwrap();
        assert_eq!(case.expected_response, Some(ClientResponseResult::default()));
    }
}
