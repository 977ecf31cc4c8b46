//! Conformance test case library construction and invocation.
//!
//! This crate provides:
//! - Suite validation and expansion across the protocol/transport/codec matrix
//! - Case materialization and exact-size request padding
//! - Expected-response synthesis from embedded response definitions
//! - Alternate-implementation selection, name-pattern filtering, and server grouping
//! - A bounded-concurrency invoker that drives requests through a caller
//! - Structured JSONL logging shared by all of the above

pub mod alt_impl;
pub mod codec;
pub mod config;
pub mod error;
pub mod expander;
pub mod grouping;
pub mod invoker;
pub mod library;
pub mod materializer;
pub mod name_filter;
pub mod padding;
pub mod structured_log;
pub mod synthesizer;

pub use config::{CLIENT_RECEIVE_LIMIT, InvokerConfig, PLACEHOLDER, SERVER_RECEIVE_LIMIT, WireCodec};
pub use error::{
    CaseDefinitionError, ConfigurationError, InvocationError, InvokeError, LibraryError,
    PaddingError, SynthesisError,
};
pub use grouping::ServerInstance;
pub use invoker::{CancelSignal, Caller, InvokeSummary, Invoker};
pub use library::TestCaseLibrary;
pub use name_filter::{TestCaseFilter, TestTrie};
