//! Expected and observed RPC results.

use serde::{Deserialize, Serialize};

use crate::encoded_len::{
    EncodedLen, delimited_len, message_len, optional_uint_len, repeated_message_len,
};
use crate::messages::{Error, Header, RequestMessage};

/// Query parameters a Connect GET request must have carried.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectGetInfo {
    #[serde(default)]
    pub query_params: Vec<Header>,
}

impl EncodedLen for ConnectGetInfo {
    fn encoded_len(&self) -> usize {
        repeated_message_len(1, &self.query_params)
    }
}

/// Echo record a conforming server returns to describe what it received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestInfo {
    #[serde(default)]
    pub request_headers: Vec<Header>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<i64>,
    #[serde(default)]
    pub requests: Vec<RequestMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_get_info: Option<ConnectGetInfo>,
}

impl EncodedLen for RequestInfo {
    fn encoded_len(&self) -> usize {
        let requests: usize = self
            .requests
            .iter()
            .map(|req| delimited_len(3, req.any_encoded_len()))
            .sum();
        repeated_message_len(1, &self.request_headers)
            + optional_uint_len(2, self.timeout_ms.and_then(|t| u64::try_from(t).ok()))
            + requests
            + message_len(4, self.connect_get_info.as_ref())
    }
}

/// One response message of an RPC.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConformancePayload {
    #[serde(default)]
    pub data: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_info: Option<RequestInfo>,
}

/// Everything a client observed (or is expected to observe) for one RPC.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientResponseResult {
    #[serde(default)]
    pub response_headers: Vec<Header>,
    #[serde(default)]
    pub payloads: Vec<ConformancePayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Error>,
    #[serde(default)]
    pub response_trailers: Vec<Header>,
}

impl ClientResponseResult {
    /// True for the result of an RPC that produced nothing at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.response_headers.is_empty()
            && self.payloads.is_empty()
            && self.error.is_none()
            && self.response_trailers.is_empty()
    }
}
