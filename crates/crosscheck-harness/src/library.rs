//! The resolved test case library.
//!
//! Construction runs every stage in order: suite validation, expansion against
//! the allow-set, materialization, padding, and expected-response synthesis.
//! It either yields a complete library or fails; there is no partial result.

use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;
use std::time::Instant;

use crosscheck_model::{ConfigCase, TestCase, TestMode, TestSuite};
use sha2::{Digest, Sha256};

use crate::alt_impl::filter_alt_impl_cases;
use crate::error::{CaseDefinitionError, ConfigurationError, LibraryError};
use crate::expander::{expand_suite, preflight_cases, validate_identities};
use crate::grouping::{ServerInstance, group_by_server};
use crate::materializer::materialize;
use crate::padding::expand_request_data;
use crate::structured_log::{LogEmitter, LogLevel, Outcome};
use crate::synthesizer::populate_expected_response;

/// Every concrete case of a run, keyed by full name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestCaseLibrary {
    /// Full name to case.
    pub test_cases: BTreeMap<String, TestCase>,
    /// Full name to the simple name the case template declared.
    pub test_case_names: BTreeMap<String, String>,
    /// Full names of the cases each server instance must host.
    pub cases_by_server: BTreeMap<ServerInstance, Vec<String>>,
}

impl TestCaseLibrary {
    /// Build the library for `mode` from `suites`, keeping only the
    /// configuration points listed in `config_cases`.
    pub fn new(
        suites: &[TestSuite],
        config_cases: &[ConfigCase],
        mode: TestMode,
    ) -> Result<Self, LibraryError> {
        Self::build(suites, config_cases, mode, None)
    }

    /// Like [`TestCaseLibrary::new`], reporting progress to `log`.
    pub fn new_with_log(
        suites: &[TestSuite],
        config_cases: &[ConfigCase],
        mode: TestMode,
        log: &mut LogEmitter,
    ) -> Result<Self, LibraryError> {
        Self::build(suites, config_cases, mode, Some(log))
    }

    fn build(
        suites: &[TestSuite],
        config_cases: &[ConfigCase],
        mode: TestMode,
        mut log: Option<&mut LogEmitter>,
    ) -> Result<Self, LibraryError> {
        let started = Instant::now();
        let allowed: HashSet<ConfigCase> = config_cases.iter().copied().collect();
        let mode_name = log_mode(mode);

        validate_identities(suites)?;
        for suite in suites {
            preflight_cases(suite).map_err(|source| LibraryError::CaseDefinition {
                suite: suite.name.clone(),
                source,
            })?;
        }

        let mut lib = Self::default();
        for suite in suites {
            if !suite.applies_to(mode) {
                if let Some(log) = log.as_deref_mut() {
                    let entry = log
                        .entry(LogLevel::Debug, "suite_skipped")
                        .with_suite(&suite.name)
                        .with_mode(mode_name)
                        .with_outcome(Outcome::Skip);
                    let _ = log.emit_entry(entry);
                }
                continue;
            }

            let before = lib.test_cases.len();
            for point in expand_suite(suite, &allowed)? {
                let materialized =
                    materialize(&point, &suite.test_cases).map_err(|source| {
                        LibraryError::CaseDefinition {
                            suite: suite.name.clone(),
                            source,
                        }
                    })?;
                for mut m in materialized {
                    if lib.test_cases.contains_key(&m.full_name) {
                        return Err(LibraryError::CaseDefinition {
                            suite: suite.name.clone(),
                            source: CaseDefinitionError::DuplicateName {
                                full_name: m.full_name,
                            },
                        });
                    }
                    expand_request_data(&mut m.case).map_err(|source| LibraryError::Padding {
                        suite: suite.name.clone(),
                        case: m.full_name.clone(),
                        source,
                    })?;
                    lib.test_case_names
                        .insert(m.full_name.clone(), m.simple_name);
                    lib.test_cases.insert(m.full_name, m.case);
                }
            }

            if let Some(log) = log.as_deref_mut() {
                let entry = log
                    .entry(LogLevel::Info, "suite_expanded")
                    .with_suite(&suite.name)
                    .with_mode(mode_name)
                    .with_case_count(lib.test_cases.len() - before);
                let _ = log.emit_entry(entry);
            }
        }

        if lib.test_cases.is_empty() {
            return Err(ConfigurationError::NoApplicableCases.into());
        }

        for (name, case) in &mut lib.test_cases {
            populate_expected_response(case).map_err(|source| LibraryError::Synthesis {
                case: name.clone(),
                source,
            })?;
        }
        lib.cases_by_server = group_by_server(lib.test_cases.values());

        if let Some(log) = log {
            let entry = log
                .entry(LogLevel::Info, "library_built")
                .with_mode(mode_name)
                .with_outcome(Outcome::Pass)
                .with_case_count(lib.test_cases.len())
                .with_duration_ms(started.elapsed().as_millis() as u64)
                .with_details(serde_json::json!({
                    "suites": suites.len(),
                    "server_instances": lib.cases_by_server.len(),
                }));
            let _ = log.emit_entry(entry);
        }
        Ok(lib)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.test_cases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.test_cases.is_empty()
    }

    #[must_use]
    pub fn get(&self, full_name: &str) -> Option<&TestCase> {
        self.test_cases.get(full_name)
    }

    /// Cases hosted by `server`, in name order.
    pub fn cases_for_server(&self, server: &ServerInstance) -> impl Iterator<Item = &TestCase> {
        self.cases_by_server
            .get(server)
            .into_iter()
            .flatten()
            .filter_map(|name| self.test_cases.get(name))
    }

    /// The cases the alternate roles support, renamed with their marker.
    #[must_use]
    pub fn filter_alt_impl(&self, alt_client: bool, alt_server: bool) -> Vec<TestCase> {
        filter_alt_impl_cases(
            self.test_cases.values(),
            &self.test_case_names,
            alt_client,
            alt_server,
        )
    }

    /// The primary cases followed by one renamed subset per alternate role
    /// combination the flags enable.
    #[must_use]
    pub fn all_permutations(&self, alt_client: bool, alt_server: bool) -> Vec<TestCase> {
        let mut cases: Vec<TestCase> = self.test_cases.values().cloned().collect();
        if alt_client {
            cases.extend(self.filter_alt_impl(true, false));
        }
        if alt_server {
            cases.extend(self.filter_alt_impl(false, true));
        }
        if alt_client && alt_server {
            cases.extend(self.filter_alt_impl(true, true));
        }
        cases
    }

    /// SHA-256 over every case in name order, as lowercase hex.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (name, case) in &self.test_cases {
            hasher.update(name.as_bytes());
            hasher.update([0]);
            hasher.update(serde_json::to_vec(case).unwrap_or_default());
            hasher.update(b"\n");
        }
        hex_encode(&hasher.finalize())
    }
}

/// Mode name in the log vocabulary.
const fn log_mode(mode: TestMode) -> &'static str {
    match mode {
        TestMode::Server => "server",
        _ => "client",
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}
