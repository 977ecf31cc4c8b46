//! Data model shared by crosscheck tooling.
//!
//! This crate provides:
//! - Dimension enums (protocol, HTTP version, codec, compression, stream type)
//!   with their tables of known values
//! - Test suites, case templates, and configuration points
//! - Conformance request messages with typed response-definition and payload accessors
//! - Expected-result records (`ClientResponseResult`, `RequestInfo`)
//! - The binary encoded-length model used to size padded requests

pub mod encoded_len;
pub mod enums;
pub mod messages;
pub mod request;
pub mod result;
pub mod suite;

pub use encoded_len::EncodedLen;
pub use enums::{
    Code, Codec, Compression, ConnectVersionMode, HttpVersion, Protocol, StreamType, TestMode,
};
pub use messages::{
    BidiStreamRequest, ClientStreamRequest, Error, ErrorDetail, Header, IdempotentUnaryRequest,
    OpaqueMessage, PaddedRequest, RawHttpResponse, RequestMessage, ResponseDefinition,
    ServerStreamRequest, StreamResponseDefinition, UnaryRequest, UnaryResponse,
    UnaryResponseDefinition,
};
pub use request::{
    CONFORMANCE_SERVICE_NAME, ClientCompatRequest, ClientCompatResponse, ClientErrorResult,
    CompatResult, RawHttpRequest, TlsCreds,
};
pub use result::{ClientResponseResult, ConformancePayload, ConnectGetInfo, RequestInfo};
pub use suite::{ConfigCase, ExpandedSize, TestCase, TestSuite};
