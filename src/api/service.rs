//! Request orchestration.
//!
//! Each operation validates its input, consults the relevant cache, calls the
//! collaborator on a miss, stores the result and shapes the response.
//! Failures are returned immediately; nothing is retried and a failed
//! collaborator call never writes to a cache.

use std::sync::Arc;

use tracing::{debug, info};

use crate::cache::{GeneratedCases, ResponseCache, SessionCache};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::generator::{format_test_case_prompt, TestCaseGenerator};
use crate::health::UsageMetrics;
use crate::tracker::stories::{fetch_epic_stories, validate_issue_ref};
use crate::tracker::{EpicStories, IssueTracker};

use super::models::{AuthenticateResponse, IssueFetchRequest, TestCaseRequest};

/// The gateway core: two caches in front of two collaborators.
pub struct Gateway {
    tracker: Arc<dyn IssueTracker>,
    generator: Arc<dyn TestCaseGenerator>,
    sessions: SessionCache,
    responses: ResponseCache,
    metrics: Arc<UsageMetrics>,
}

impl Gateway {
    pub fn new(
        tracker: Arc<dyn IssueTracker>,
        generator: Arc<dyn TestCaseGenerator>,
        cache: &CacheConfig,
    ) -> Self {
        Self {
            tracker,
            generator,
            sessions: SessionCache::new(cache.sessions),
            responses: ResponseCache::new(cache.responses),
            metrics: Arc::new(UsageMetrics::new()),
        }
    }

    pub fn sessions(&self) -> &SessionCache {
        &self.sessions
    }

    pub fn responses(&self) -> &ResponseCache {
        &self.responses
    }

    pub fn metrics(&self) -> &Arc<UsageMetrics> {
        &self.metrics
    }

    /// Verify credentials with a fresh handshake and remember the session.
    pub async fn authenticate(&self, request: &IssueFetchRequest) -> Result<AuthenticateResponse> {
        self.observe(async {
            request.validate_credentials()?;
            let handle = self
                .sessions
                .authenticate(
                    self.tracker.as_ref(),
                    &request.domain,
                    &request.email,
                    &request.jira_token,
                )
                .await?;
            info!(domain = %request.domain, email = %request.email, "Tracker user authenticated");
            Ok(AuthenticateResponse::authenticated(
                handle.profile().display_name.clone(),
            ))
        })
        .await
    }

    /// Fetch an epic and its stories, reusing a cached session when one exists.
    pub async fn fetch_stories(&self, request: &IssueFetchRequest) -> Result<EpicStories> {
        self.observe(async {
            request.validate_credentials()?;
            let epic_id = request.epic_id()?;
            validate_issue_ref(epic_id)?;
            let session = self
                .sessions
                .get_or_create(
                    self.tracker.as_ref(),
                    &request.domain,
                    &request.email,
                    &request.jira_token,
                )
                .await?;
            let result = fetch_epic_stories(session.as_ref(), epic_id).await?;
            debug!(epic = %result.epic_key, stories = result.stories.len(), "Fetched epic stories");
            Ok(result)
        })
        .await
    }

    /// Generate test cases, answering repeated inputs from the response cache.
    pub async fn generate_test_cases(&self, request: &TestCaseRequest) -> Result<GeneratedCases> {
        self.observe(async {
            request.validate()?;
            let criteria = request.acceptance_criteria.as_deref();
            let key = ResponseCache::fingerprint(&request.user_story, &request.jira_id, criteria);

            if let Some(cached) = self.responses.get(&key) {
                return Ok(cached);
            }

            let prompt = format_test_case_prompt(&request.user_story, &request.jira_id, criteria);
            let content = self.generator.generate(&prompt).await?;
            let result = GeneratedCases::from_content(content);
            self.metrics.record_generation(result.token_count as u64);
            info!(
                jira_id = %request.jira_id,
                tokens = result.token_count,
                "Generated test cases"
            );

            self.responses.put(key, result.clone());
            Ok(result)
        })
        .await
    }

    async fn observe<T>(&self, op: impl std::future::Future<Output = Result<T>>) -> Result<T> {
        self.metrics.record_request();
        let result = op.await;
        if result.is_err() {
            self.metrics.record_error();
        }
        result
    }
}
