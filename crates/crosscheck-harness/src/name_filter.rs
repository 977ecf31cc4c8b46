//! Name-pattern filtering of resolved cases.
//!
//! Patterns are '/'-separated like case names. A `*` segment matches any one
//! segment and a `**` segment matches any run of segments, including none.
//! Patterns match by prefix: `Basic/HTTPVersion:2` selects every case whose
//! name starts with those two segments.

use std::collections::BTreeMap;

use crosscheck_model::TestCase;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct TrieNode {
    terminal: bool,
    children: BTreeMap<String, TrieNode>,
}

impl TrieNode {
    fn matches(&self, segments: &[&str]) -> bool {
        if self.terminal {
            return true;
        }
        if let Some(deep) = self.children.get("**")
            && (0..=segments.len()).any(|skip| deep.matches(&segments[skip..]))
        {
            return true;
        }
        let Some((head, rest)) = segments.split_first() else {
            return false;
        };
        self.children
            .get(*head)
            .is_some_and(|child| child.matches(rest))
            || self.children.get("*").is_some_and(|any| any.matches(rest))
    }
}

/// Set of name patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestTrie {
    root: TrieNode,
    len: usize,
}

impl TestTrie {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a trie from a list of patterns.
    pub fn from_patterns<'a>(patterns: impl IntoIterator<Item = &'a str>) -> Self {
        let mut trie = Self::new();
        for pattern in patterns {
            trie.add_pattern(pattern);
        }
        trie
    }

    pub fn add_pattern(&mut self, pattern: &str) {
        let mut node = &mut self.root;
        for segment in pattern.trim_matches('/').split('/') {
            node = node.children.entry(segment.to_string()).or_default();
        }
        node.terminal = true;
        self.len += 1;
    }

    /// Number of patterns added.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether any pattern matches the full case name `name`.
    #[must_use]
    pub fn match_pattern(&self, name: &str) -> bool {
        let segments: Vec<&str> = name.split('/').collect();
        self.root.matches(&segments)
    }
}

/// Run/skip selection of cases by name.
///
/// A case is accepted when the run set (if any) matches it and the skip set
/// (if any) does not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCaseFilter {
    run: Option<TestTrie>,
    no_run: Option<TestTrie>,
}

impl TestCaseFilter {
    /// `None` when neither set is given: every case is accepted.
    #[must_use]
    pub fn new(run: Option<TestTrie>, no_run: Option<TestTrie>) -> Option<Self> {
        if run.is_none() && no_run.is_none() {
            return None;
        }
        Some(Self { run, no_run })
    }

    /// Filter from command-line style pattern lists; empty lists mean "not given".
    #[must_use]
    pub fn from_patterns(run: &[String], no_run: &[String]) -> Option<Self> {
        let trie = |patterns: &[String]| {
            (!patterns.is_empty()).then(|| TestTrie::from_patterns(patterns.iter().map(String::as_str)))
        };
        Self::new(trie(run), trie(no_run))
    }

    #[must_use]
    pub fn accept_name(&self, name: &str) -> bool {
        if let Some(run) = &self.run
            && !run.match_pattern(name)
        {
            return false;
        }
        !self
            .no_run
            .as_ref()
            .is_some_and(|no_run| no_run.match_pattern(name))
    }

    #[must_use]
    pub fn accept(&self, case: &TestCase) -> bool {
        self.accept_name(&case.request.test_name)
    }

    /// Keep the accepted cases, preserving order.
    #[must_use]
    pub fn apply(&self, cases: Vec<TestCase>) -> Vec<TestCase> {
        cases.into_iter().filter(|case| self.accept(case)).collect()
    }
}

/// Apply an optional filter; `None` accepts everything.
#[must_use]
pub fn apply_filter(filter: Option<&TestCaseFilter>, cases: Vec<TestCase>) -> Vec<TestCase> {
    match filter {
        Some(filter) => filter.apply(cases),
        None => cases,
    }
}
