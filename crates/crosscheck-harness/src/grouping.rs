//! Grouping of resolved cases by the server process that must host them.

use std::collections::BTreeMap;

use crosscheck_model::{HttpVersion, Protocol, TestCase};
use serde::{Deserialize, Serialize};

/// The server-side properties a case pins down. Cases with equal keys can
/// share one server process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ServerInstance {
    pub protocol: Protocol,
    pub http_version: HttpVersion,
    pub use_tls: bool,
    pub use_tls_client_certs: bool,
}

impl ServerInstance {
    #[must_use]
    pub fn for_case(case: &TestCase) -> Self {
        let request = &case.request;
        Self {
            protocol: request.protocol,
            http_version: request.http_version,
            use_tls: request.uses_tls(),
            use_tls_client_certs: request.client_tls_creds.is_some(),
        }
    }
}

impl std::fmt::Display for ServerInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/HTTPVersion:{}/TLS:{}",
            self.protocol,
            self.http_version.number(),
            self.use_tls
        )?;
        if self.use_tls_client_certs {
            f.write_str("/ClientCerts")?;
        }
        Ok(())
    }
}

/// Full case names per server instance; names keep the iteration order of `cases`.
#[must_use]
pub fn group_by_server<'a>(
    cases: impl IntoIterator<Item = &'a TestCase>,
) -> BTreeMap<ServerInstance, Vec<String>> {
    let mut groups: BTreeMap<ServerInstance, Vec<String>> = BTreeMap::new();
    for case in cases {
        groups
            .entry(ServerInstance::for_case(case))
            .or_default()
            .push(case.request.test_name.clone());
    }
    groups
}
