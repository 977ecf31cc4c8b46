//! Conformance service request messages and the response definitions they embed.

use serde::{Deserialize, Serialize};

use crate::encoded_len::{
    EncodedLen, any_len, bool_len, bytes_len, delimited_len, enum_len, message_len,
    optional_bytes_len, optional_uint_len, repeated_bytes_len, repeated_message_len, uint_len,
};
use crate::enums::{Code, Compression};
use crate::result::RequestInfo;

pub const TYPE_URL_PREFIX: &str = "type.googleapis.com/";
pub const PACKAGE: &str = "connectrpc.conformance.v1";

/// A header or trailer with all of its values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    #[serde(default)]
    pub value: Vec<String>,
}

impl Header {
    #[must_use]
    pub fn new(name: impl Into<String>, values: &[&str]) -> Self {
        Self {
            name: name.into(),
            value: values.iter().map(|v| (*v).to_string()).collect(),
        }
    }
}

impl EncodedLen for Header {
    fn encoded_len(&self) -> usize {
        bytes_len(1, self.name.as_bytes()) + repeated_bytes_len(2, &self.value)
    }
}

/// A message of a type this model does not know, kept as raw bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpaqueMessage {
    pub type_url: String,
    #[serde(default)]
    pub value: Vec<u8>,
}

impl EncodedLen for OpaqueMessage {
    fn encoded_len(&self) -> usize {
        any_len(&self.type_url, self.value.len())
    }
}

/// Structured error detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorDetail {
    RequestInfo(RequestInfo),
    Opaque(OpaqueMessage),
}

impl ErrorDetail {
    #[must_use]
    pub fn type_url(&self) -> String {
        match self {
            Self::RequestInfo(_) => format!("{TYPE_URL_PREFIX}{PACKAGE}.ConformancePayload.RequestInfo"),
            Self::Opaque(msg) => msg.type_url.clone(),
        }
    }
}

impl EncodedLen for ErrorDetail {
    fn encoded_len(&self) -> usize {
        match self {
            Self::RequestInfo(info) => any_len(&self.type_url(), info.encoded_len()),
            Self::Opaque(msg) => msg.encoded_len(),
        }
    }
}

/// RPC error as declared by a response definition or observed by a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Error {
    pub code: Code,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Vec<ErrorDetail>,
}

impl Error {
    #[must_use]
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
            details: Vec::new(),
        }
    }
}

impl EncodedLen for Error {
    fn encoded_len(&self) -> usize {
        enum_len(1, self.code.number())
            + optional_bytes_len(2, self.message.as_deref().map(str::as_bytes))
            + repeated_message_len(3, &self.details)
    }
}

/// Payload of a raw message, in one of its literal representations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageData {
    Binary(Vec<u8>),
    Text(String),
    BinaryMessage(OpaqueMessage),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContents {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<MessageData>,
    #[serde(default)]
    pub compression: Compression,
}

impl EncodedLen for MessageContents {
    fn encoded_len(&self) -> usize {
        let data = match &self.data {
            Some(MessageData::Binary(bytes)) => delimited_len(1, bytes.len()),
            Some(MessageData::Text(text)) => delimited_len(2, text.len()),
            Some(MessageData::BinaryMessage(msg)) => delimited_len(3, msg.encoded_len()),
            None => 0,
        };
        data + enum_len(4, self.compression.number())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamItem {
    #[serde(default)]
    pub flags: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<MessageContents>,
}

impl EncodedLen for StreamItem {
    fn encoded_len(&self) -> usize {
        uint_len(1, u64::from(self.flags))
            + optional_uint_len(2, self.length.map(u64::from))
            + message_len(3, self.payload.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawBody {
    Unary(MessageContents),
    Stream(Vec<StreamItem>),
}

/// A literal HTTP response a server under test must emit byte-for-byte.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawHttpResponse {
    #[serde(default)]
    pub status_code: u32,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<RawBody>,
    #[serde(default)]
    pub trailers: Vec<Header>,
}

impl EncodedLen for RawHttpResponse {
    fn encoded_len(&self) -> usize {
        let body = match &self.body {
            Some(RawBody::Unary(contents)) => delimited_len(3, contents.encoded_len()),
            Some(RawBody::Stream(items)) => delimited_len(4, repeated_message_len(1, items)),
            None => 0,
        };
        uint_len(1, u64::from(self.status_code))
            + repeated_message_len(2, &self.headers)
            + body
            + repeated_message_len(5, &self.trailers)
    }
}

/// The single outcome a unary-shaped response definition asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryResponse {
    ResponseData(Vec<u8>),
    Error(Error),
}

/// What a server should send back for a unary or client-stream RPC.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnaryResponseDefinition {
    #[serde(default)]
    pub response_headers: Vec<Header>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<UnaryResponse>,
    #[serde(default)]
    pub response_trailers: Vec<Header>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<RawHttpResponse>,
    #[serde(default)]
    pub response_delay_ms: u32,
}

impl EncodedLen for UnaryResponseDefinition {
    fn encoded_len(&self) -> usize {
        let response = match &self.response {
            Some(UnaryResponse::ResponseData(data)) => delimited_len(2, data.len()),
            Some(UnaryResponse::Error(err)) => delimited_len(3, err.encoded_len()),
            None => 0,
        };
        repeated_message_len(1, &self.response_headers)
            + response
            + repeated_message_len(4, &self.response_trailers)
            + message_len(5, self.raw_response.as_ref())
            + uint_len(6, u64::from(self.response_delay_ms))
    }
}

/// What a server should send back for a server-stream or bidi RPC.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamResponseDefinition {
    #[serde(default)]
    pub response_headers: Vec<Header>,
    #[serde(default)]
    pub response_data: Vec<Vec<u8>>,
    #[serde(default)]
    pub response_delay_ms: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Error>,
    #[serde(default)]
    pub response_trailers: Vec<Header>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<RawHttpResponse>,
}

impl EncodedLen for StreamResponseDefinition {
    fn encoded_len(&self) -> usize {
        repeated_message_len(1, &self.response_headers)
            + repeated_bytes_len(2, &self.response_data)
            + uint_len(3, u64::from(self.response_delay_ms))
            + message_len(4, self.error.as_ref())
            + repeated_message_len(5, &self.response_trailers)
            + message_len(6, self.raw_response.as_ref())
    }
}

/// Typed access to the byte payload every conformance request carries.
///
/// Request padding grows and shrinks this field to hit exact message sizes.
pub trait PaddedRequest {
    fn request_data_mut(&mut self) -> &mut Vec<u8>;
}

macro_rules! unary_shaped_request {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub response_definition: Option<UnaryResponseDefinition>,
            #[serde(default)]
            pub request_data: Vec<u8>,
        }

        impl EncodedLen for $name {
            fn encoded_len(&self) -> usize {
                message_len(1, self.response_definition.as_ref()) + bytes_len(2, &self.request_data)
            }
        }

        impl PaddedRequest for $name {
            fn request_data_mut(&mut self) -> &mut Vec<u8> {
                &mut self.request_data
            }
        }
    };
}

unary_shaped_request! {
    /// Request message of the `Unary` method.
    UnaryRequest
}

unary_shaped_request! {
    /// Request message of the `IdempotentUnary` method (Connect GET capable).
    IdempotentUnaryRequest
}

unary_shaped_request! {
    /// Request message of the `ClientStream` method.
    ClientStreamRequest
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStreamRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_definition: Option<StreamResponseDefinition>,
    #[serde(default)]
    pub request_data: Vec<u8>,
}

impl EncodedLen for ServerStreamRequest {
    fn encoded_len(&self) -> usize {
        message_len(1, self.response_definition.as_ref()) + bytes_len(2, &self.request_data)
    }
}

impl PaddedRequest for ServerStreamRequest {
    fn request_data_mut(&mut self) -> &mut Vec<u8> {
        &mut self.request_data
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidiStreamRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_definition: Option<StreamResponseDefinition>,
    #[serde(default)]
    pub full_duplex: bool,
    #[serde(default)]
    pub request_data: Vec<u8>,
}

impl EncodedLen for BidiStreamRequest {
    fn encoded_len(&self) -> usize {
        message_len(1, self.response_definition.as_ref())
            + bool_len(2, self.full_duplex)
            + bytes_len(3, &self.request_data)
    }
}

impl PaddedRequest for BidiStreamRequest {
    fn request_data_mut(&mut self) -> &mut Vec<u8> {
        &mut self.request_data
    }
}

/// Borrowed view of the response definition embedded in a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseDefinition<'a> {
    Unary(Option<&'a UnaryResponseDefinition>),
    Stream(Option<&'a StreamResponseDefinition>),
}

impl ResponseDefinition<'_> {
    #[must_use]
    pub fn raw_response(&self) -> Option<&RawHttpResponse> {
        match self {
            Self::Unary(def) => def.and_then(|d| d.raw_response.as_ref()),
            Self::Stream(def) => def.and_then(|d| d.raw_response.as_ref()),
        }
    }
}

/// One request message of a test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum RequestMessage {
    #[serde(rename = "connectrpc.conformance.v1.UnaryRequest")]
    Unary(UnaryRequest),
    #[serde(rename = "connectrpc.conformance.v1.IdempotentUnaryRequest")]
    IdempotentUnary(IdempotentUnaryRequest),
    #[serde(rename = "connectrpc.conformance.v1.ClientStreamRequest")]
    ClientStream(ClientStreamRequest),
    #[serde(rename = "connectrpc.conformance.v1.ServerStreamRequest")]
    ServerStream(ServerStreamRequest),
    #[serde(rename = "connectrpc.conformance.v1.BidiStreamRequest")]
    BidiStream(BidiStreamRequest),
    #[serde(rename = "opaque")]
    Opaque(OpaqueMessage),
}

impl RequestMessage {
    /// Fully-qualified message name, or the opaque message's type URL.
    #[must_use]
    pub fn type_url(&self) -> String {
        let short = match self {
            Self::Unary(_) => "UnaryRequest",
            Self::IdempotentUnary(_) => "IdempotentUnaryRequest",
            Self::ClientStream(_) => "ClientStreamRequest",
            Self::ServerStream(_) => "ServerStreamRequest",
            Self::BidiStream(_) => "BidiStreamRequest",
            Self::Opaque(msg) => return msg.type_url.clone(),
        };
        format!("{TYPE_URL_PREFIX}{PACKAGE}.{short}")
    }

    /// The embedded response definition, or `None` for messages that cannot carry one.
    #[must_use]
    pub fn response_definition(&self) -> Option<ResponseDefinition<'_>> {
        match self {
            Self::Unary(req) => Some(ResponseDefinition::Unary(req.response_definition.as_ref())),
            Self::IdempotentUnary(req) => {
                Some(ResponseDefinition::Unary(req.response_definition.as_ref()))
            }
            Self::ClientStream(req) => {
                Some(ResponseDefinition::Unary(req.response_definition.as_ref()))
            }
            Self::ServerStream(req) => {
                Some(ResponseDefinition::Stream(req.response_definition.as_ref()))
            }
            Self::BidiStream(req) => {
                Some(ResponseDefinition::Stream(req.response_definition.as_ref()))
            }
            Self::Opaque(_) => None,
        }
    }

    /// Whether this message asks the server for a literal raw HTTP response.
    #[must_use]
    pub fn has_raw_response(&self) -> bool {
        self.response_definition()
            .is_some_and(|def| def.raw_response().is_some())
    }

    /// Whether this message has a `request_data` field that padding can resize.
    #[must_use]
    pub const fn has_padding_field(&self) -> bool {
        !matches!(self, Self::Opaque(_))
    }

    /// Mutable payload accessor; `None` for messages without a padding field.
    pub fn padded_mut(&mut self) -> Option<&mut dyn PaddedRequest> {
        match self {
            Self::Unary(req) => Some(req),
            Self::IdempotentUnary(req) => Some(req),
            Self::ClientStream(req) => Some(req),
            Self::ServerStream(req) => Some(req),
            Self::BidiStream(req) => Some(req),
            Self::Opaque(_) => None,
        }
    }

    /// Length of this message wrapped in a `google.protobuf.Any`.
    #[must_use]
    pub fn any_encoded_len(&self) -> usize {
        match self {
            Self::Opaque(msg) => msg.encoded_len(),
            _ => any_len(&self.type_url(), self.encoded_len()),
        }
    }
}

impl EncodedLen for RequestMessage {
    fn encoded_len(&self) -> usize {
        match self {
            Self::Unary(req) => req.encoded_len(),
            Self::IdempotentUnary(req) => req.encoded_len(),
            Self::ClientStream(req) => req.encoded_len(),
            Self::ServerStream(req) => req.encoded_len(),
            Self::BidiStream(req) => req.encoded_len(),
            Self::Opaque(msg) => msg.value.len(),
        }
    }
}

/// Returns true if the first request of a case asks for a raw response.
#[must_use]
pub fn has_raw_response(requests: &[RequestMessage]) -> bool {
    requests.first().is_some_and(RequestMessage::has_raw_response)
}
