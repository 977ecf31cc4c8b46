//! Test suites, their case templates, and configuration points.

use serde::{Deserialize, Serialize};

use crate::enums::{
    Codec, Compression, ConnectVersionMode, HttpVersion, Protocol, StreamType, TestMode,
};
use crate::request::ClientCompatRequest;
use crate::result::ClientResponseResult;

/// Size directive for one request message, relative to the server receive limit.
///
/// An absent delta leaves the corresponding message untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandedSize {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_relative_to_limit: Option<i32>,
}

/// A protocol-agnostic case template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub request: ClientCompatRequest,
    #[serde(default)]
    pub expand_requests: Vec<ExpandedSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_response: Option<ClientResponseResult>,
}

/// A named collection of case templates plus the constraints that decide
/// which configurations they apply to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestSuite {
    pub name: String,
    pub mode: TestMode,
    pub test_cases: Vec<TestCase>,
    pub relevant_protocols: Vec<Protocol>,
    pub relevant_http_versions: Vec<HttpVersion>,
    pub relevant_codecs: Vec<Codec>,
    pub relevant_compressions: Vec<Compression>,
    pub connect_version_mode: ConnectVersionMode,
    pub relies_on_tls: bool,
    pub relies_on_tls_client_certs: bool,
    pub relies_on_connect_get: bool,
    pub relies_on_message_receive_limit: bool,
}

impl TestSuite {
    /// Load a suite from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the suite to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load a suite from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    /// Whether the suite can run in the given harness mode.
    #[must_use]
    pub fn applies_to(&self, mode: TestMode) -> bool {
        self.mode.is_unspecified() || self.mode == mode
    }
}

/// One point in the conformance dimension space.
///
/// The harness only materializes cases for points the implementation under
/// test declares support for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigCase {
    pub version: HttpVersion,
    pub protocol: Protocol,
    pub codec: Codec,
    pub compression: Compression,
    pub stream_type: StreamType,
    pub use_tls: bool,
    pub use_tls_client_certs: bool,
    pub use_connect_get: bool,
    pub connect_version_mode: ConnectVersionMode,
    pub use_message_receive_limit: bool,
}
