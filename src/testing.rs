//! In-memory collaborators for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{GatewayError, Result};
use crate::generator::TestCaseGenerator;
use crate::tracker::{
    Issue, IssueFields, IssueTracker, SessionHandle, TrackerSession, UserProfile,
};

/// Tracker that accepts a single secret and serves a fixed set of issues.
pub(crate) struct StubTracker {
    pub secret: String,
    pub issues: HashMap<String, Issue>,
    pub search_results: Vec<Issue>,
    pub connects: AtomicUsize,
}

impl StubTracker {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
            issues: HashMap::new(),
            search_results: Vec::new(),
            connects: AtomicUsize::new(0),
        }
    }

    /// Add an epic and the stories a search should return for it.
    pub fn with_epic(mut self, key: &str, summary: &str, stories: &[(&str, &str)]) -> Self {
        self.issues.insert(key.to_string(), issue(key, summary));
        self.search_results = stories.iter().map(|(k, s)| issue(k, s)).collect();
        self
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

pub(crate) fn issue(key: &str, summary: &str) -> Issue {
    Issue {
        key: key.to_string(),
        fields: IssueFields {
            summary: Some(summary.to_string()),
            ..Default::default()
        },
    }
}

struct StubSession {
    profile: UserProfile,
    issues: HashMap<String, Issue>,
    search_results: Vec<Issue>,
}

#[async_trait]
impl IssueTracker for StubTracker {
    async fn connect(
        &self,
        _endpoint: &str,
        principal: &str,
        secret: &str,
    ) -> Result<SessionHandle> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if secret != self.secret {
            return Err(GatewayError::Auth);
        }
        Ok(Arc::new(StubSession {
            profile: UserProfile {
                display_name: Some(format!("User {principal}")),
                ..Default::default()
            },
            issues: self.issues.clone(),
            search_results: self.search_results.clone(),
        }))
    }
}

#[async_trait]
impl TrackerSession for StubSession {
    fn profile(&self) -> &UserProfile {
        &self.profile
    }

    async fn issue(&self, key: &str) -> Result<Issue> {
        self.issues
            .get(key)
            .cloned()
            .ok_or_else(|| GatewayError::Upstream {
                status: Some(404),
                message: format!("JIRA Error 404: Issue {key} does not exist"),
            })
    }

    async fn search_issues(&self, _jql: &str, max_results: u32) -> Result<Vec<Issue>> {
        Ok(self
            .search_results
            .iter()
            .take(max_results as usize)
            .cloned()
            .collect())
    }
}

/// Generator that returns a numbered answer and counts its calls.
#[derive(Default)]
pub(crate) struct CountingGenerator {
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl CountingGenerator {
    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TestCaseGenerator for CountingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail {
            return Err(GatewayError::Generation("model unavailable".into()));
        }
        Ok(format!("TC-{n}: verify the story end to end"))
    }
}
