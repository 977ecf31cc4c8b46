//! Client compatibility request/response records.
//!
//! A `ClientCompatRequest` is everything a client under test needs to issue
//! one RPC; a `ClientCompatResponse` is what it reports back.

use serde::{Deserialize, Serialize};

use crate::enums::{Codec, Compression, HttpVersion, Protocol, StreamType};
use crate::messages::{Header, RequestMessage};
use crate::result::ClientResponseResult;

/// Name of the service every conformance implementation serves.
pub const CONFORMANCE_SERVICE_NAME: &str = "connectrpc.conformance.v1.ConformanceService";

/// Client certificate and key used for mutual TLS.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsCreds {
    pub cert: Vec<u8>,
    pub key: Vec<u8>,
}

/// A hand-built HTTP request sent verbatim instead of an RPC.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawHttpRequest {
    pub verb: String,
    pub uri: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientCompatRequest {
    pub test_name: String,
    pub http_version: HttpVersion,
    pub protocol: Protocol,
    pub codec: Codec,
    pub compression: Compression,
    pub host: String,
    pub port: u32,
    pub server_tls_cert: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_tls_creds: Option<TlsCreds>,
    pub message_receive_limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    pub stream_type: StreamType,
    pub use_get_http_method: bool,
    pub request_headers: Vec<Header>,
    pub request_messages: Vec<RequestMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_request: Option<RawHttpRequest>,
}

impl ClientCompatRequest {
    /// Service name, or the empty string when unset.
    #[must_use]
    pub fn service_name(&self) -> &str {
        self.service.as_deref().unwrap_or_default()
    }

    /// Method name, or the empty string when unset.
    #[must_use]
    pub fn method_name(&self) -> &str {
        self.method.as_deref().unwrap_or_default()
    }

    /// Whether the client must connect over TLS.
    #[must_use]
    pub fn uses_tls(&self) -> bool {
        !self.server_tls_cert.is_empty()
    }
}

/// Failure of the client itself, as opposed to an RPC error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientErrorResult {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompatResult {
    Response(ClientResponseResult),
    Error(ClientErrorResult),
}

/// Outcome of one `ClientCompatRequest`, keyed by its test name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCompatResponse {
    pub test_name: String,
    pub result: CompatResult,
}

impl ClientCompatResponse {
    #[must_use]
    pub fn response(test_name: impl Into<String>, result: ClientResponseResult) -> Self {
        Self {
            test_name: test_name.into(),
            result: CompatResult::Response(result),
        }
    }

    #[must_use]
    pub fn error(test_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            test_name: test_name.into(),
            result: CompatResult::Error(ClientErrorResult {
                message: message.into(),
            }),
        }
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.result, CompatResult::Error(_))
    }
}
