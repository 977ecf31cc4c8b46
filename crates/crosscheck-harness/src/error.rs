//! Error types for library construction and invocation.

use std::sync::Arc;

use crosscheck_model::{ConnectVersionMode, Protocol};
use thiserror::Error;

/// A suite is missing, duplicated, or contradicts itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("suite #{index} has no name")]
    UnnamedSuite { index: usize },
    #[error("suite {suite} has no test cases")]
    EmptySuite { suite: String },
    #[error("more than one suite is named {suite}")]
    DuplicateSuite { suite: String },
    #[error("suite {suite:?} is misconfigured: it relies on TLS client certs but not TLS")]
    ClientCertsWithoutTls { suite: String },
    #[error(
        "suite {suite:?} is misconfigured: it relies on Connect GET support, but has unexpected relevant protocols: {protocols:?}"
    )]
    ConnectGetWithOtherProtocols {
        suite: String,
        protocols: Vec<Protocol>,
    },
    #[error(
        "suite {suite:?} is misconfigured: connect version mode {mode} needs relevant protocols to be exactly PROTOCOL_CONNECT, got {protocols:?}"
    )]
    VersionModeWithOtherProtocols {
        suite: String,
        mode: ConnectVersionMode,
        protocols: Vec<Protocol>,
    },
    #[error("no test cases apply to current configuration")]
    NoApplicableCases,
}

/// A case template cannot be turned into a concrete case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaseDefinitionError {
    #[error("test case #{index}: test case has no name")]
    MissingName { index: usize },
    #[error("test case #{index}: test {name} has no stream type specified")]
    MissingStreamType { index: usize, name: String },
    #[error("test case #{index}: test name {name} has a method specified but no service")]
    MethodWithoutService { index: usize, name: String },
    #[error("test case #{index}: test name {name} has a service specified but no method")]
    ServiceWithoutMethod { index: usize, name: String },
    #[error("test case library includes duplicate definition for {full_name}")]
    DuplicateName { full_name: String },
    #[error("test case {name:?} has raw request, but that is only allowed when mode is TEST_MODE_SERVER")]
    RawRequestOutsideServerMode { name: String },
    #[error("test case {name:?} has raw response, but that is only allowed when mode is TEST_MODE_CLIENT")]
    RawResponseOutsideClientMode { name: String },
    #[error("test case {name:?} has raw response, but does not specify an explicit expected response")]
    RawResponseWithoutExpectation { name: String },
    #[error("test case {name:?} specifies expand requests directive, but includes codecs other than CODEC_PROTO")]
    ExpansionWithNonProtoCodec { name: String },
    #[error("test case {name:?} has {directives} expand requests directives, but only {requests} request messages")]
    TooManyExpandDirectives {
        name: String,
        directives: usize,
        requests: usize,
    },
    #[error("test case {name:?} expand directive #{index} targets message type {type_url}, which has no request_data field")]
    ExpandDirectiveWithoutPaddingField {
        name: String,
        index: usize,
        type_url: String,
    },
}

/// A request message cannot be padded to its target size.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaddingError {
    #[error("expand directives indicate {directives} messages, but there are only {requests} requests")]
    TooManyDirectives { directives: usize, requests: usize },
    #[error("expand directive #{index} ({delta}) results in an invalid request size: {target}")]
    InvalidTarget { index: usize, delta: i32, target: i64 },
    #[error("request message #{index}: message type {type_url} has no request_data field for padding")]
    NoPaddingField { index: usize, type_url: String },
    #[error("request message #{index}: can't pad to exactly {target} bytes; closest we can get is {closest}")]
    Unreachable {
        index: usize,
        target: i64,
        closest: usize,
    },
}

/// The expected response of a case cannot be derived from its requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisError {
    #[error("test case has no stream type specified")]
    MissingStreamType,
    #[error("{type_url} is not a unary test case")]
    NotUnaryRequest { type_url: String },
    #[error("test case {test_name} contains a request message of type {type_url}, which is not a streaming request")]
    NotStreamRequest { test_name: String, type_url: String },
}

/// Library construction failure, with the suite or case it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LibraryError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("failed to expand test cases for suite {suite}: {source}")]
    CaseDefinition {
        suite: String,
        source: CaseDefinitionError,
    },
    #[error("suite {suite}: failed to expand request sizes as directed for test case {case:?}: {source}")]
    Padding {
        suite: String,
        case: String,
        source: PaddingError,
    },
    #[error("failed to compute expected response for test case {case:?}: {source}")]
    Synthesis { case: String, source: SynthesisError },
}

/// Failure of one outbound call.
///
/// These never abort an invocation run; they become per-case error results.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvocationError {
    #[error("service name {service} is not a valid service")]
    UnknownService { service: String },
    #[error("call failed: {0}")]
    Call(String),
    #[error("timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("invocation canceled")]
    Canceled,
}

/// Failure of the invocation plumbing (input stream, output sink, admission gate).
#[derive(Debug, Clone, Error)]
pub enum InvokeError {
    #[error("malformed input stream: {reason}")]
    StreamTermination { reason: String },
    #[error("io: {0}")]
    Io(Arc<std::io::Error>),
    #[error("failed to encode result: {0}")]
    Encode(String),
    #[error("admission gate closed")]
    GateClosed,
    #[error("invocation run canceled")]
    Canceled,
    #[error("worker failed: {0}")]
    Worker(String),
    #[error("invalid invoker configuration: {0}")]
    InvalidConfig(String),
}

impl From<std::io::Error> for InvokeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}
