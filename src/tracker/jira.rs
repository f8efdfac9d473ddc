//! Jira REST v2 implementation of the tracker collaborator.
//!
//! Auth is HTTP basic with `(email, api_token)`. [`JiraTracker::connect`]
//! verifies the credential with `GET /rest/api/2/myself` before handing out
//! a session.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{GatewayError, Result};

use super::{Issue, IssueTracker, SessionHandle, TrackerSession, UserProfile};

/// REST API prefix relative to the server endpoint.
const API_PREFIX: &str = "rest/api/2/";

/// JQL search resource. Jira Cloud also serves `search/jql`.
pub const DEFAULT_SEARCH_PATH: &str = "search";

/// Connector that opens basic-auth sessions against Jira servers.
///
/// One [`Client`] (and its connection pool) is shared by every session.
#[derive(Clone)]
pub struct JiraTracker {
    client: Client,
    search_path: String,
}

impl JiraTracker {
    /// Build a connector. `timeout` of `None` lets requests wait indefinitely.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build().map_err(|e| {
            GatewayError::Config(format!("Failed to build tracker HTTP client: {e}"))
        })?;
        Ok(Self {
            client,
            search_path: DEFAULT_SEARCH_PATH.to_string(),
        })
    }

    /// Search resource relative to `rest/api/2/`, e.g. `search/jql`.
    pub fn with_search_path(mut self, path: &str) -> Self {
        self.search_path = path.trim_matches('/').to_string();
        self
    }
}

impl std::fmt::Debug for JiraTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraTracker")
            .field("search_path", &self.search_path)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl IssueTracker for JiraTracker {
    async fn connect(
        &self,
        endpoint: &str,
        principal: &str,
        secret: &str,
    ) -> Result<SessionHandle> {
        let base = api_base(endpoint)?;
        let mut session = JiraSession {
            client: self.client.clone(),
            base,
            principal: principal.to_string(),
            secret: secret.to_string(),
            search_path: self.search_path.clone(),
            profile: UserProfile::default(),
        };
        session.profile = session.get_json("myself", &[]).await?;
        debug!(
            endpoint,
            display_name = session.profile.display_name.as_deref().unwrap_or(""),
            "Jira credentials verified"
        );
        Ok(Arc::new(session))
    }
}

/// An authenticated Jira session.
pub struct JiraSession {
    client: Client,
    base: Url,
    principal: String,
    secret: String,
    search_path: String,
    profile: UserProfile,
}

impl std::fmt::Debug for JiraSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraSession")
            .field("base", &self.base.as_str())
            .field("principal", &self.principal)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

#[derive(Deserialize)]
struct SearchResults {
    #[serde(default)]
    issues: Vec<Issue>,
}

impl JiraSession {
    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = self
            .base
            .join(path)
            .map_err(|e| GatewayError::Validation(format!("Invalid tracker path {path:?}: {e}")))?;

        let response = self
            .client
            .get(url)
            .basic_auth(&self.principal, Some(&self.secret))
            .header("Accept", "application/json")
            .query(query)
            .send()
            .await
            .map_err(|e| GatewayError::upstream(format!("Error connecting with Jira: {e}")))?;

        decode(response).await
    }
}

#[async_trait]
impl TrackerSession for JiraSession {
    fn profile(&self) -> &UserProfile {
        &self.profile
    }

    async fn issue(&self, key: &str) -> Result<Issue> {
        let path = format!("issue/{}", encode_segment(key));
        self.get_json(&path, &[]).await
    }

    async fn search_issues(&self, jql: &str, max_results: u32) -> Result<Vec<Issue>> {
        let max = max_results.to_string();
        let results: SearchResults = self
            .get_json(
                &self.search_path,
                &[("jql", jql), ("maxResults", max.as_str())],
            )
            .await?;
        Ok(results.issues)
    }
}

/// Parse the server endpoint and point it at the REST API root.
fn api_base(endpoint: &str) -> Result<Url> {
    let mut url = Url::parse(endpoint).map_err(|e| {
        GatewayError::Validation(format!("Invalid tracker endpoint {endpoint:?}: {e}"))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(GatewayError::Validation(format!(
            "Tracker endpoint must be http(s), got {endpoint:?}"
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.join(API_PREFIX).map_err(|e| {
        GatewayError::Validation(format!("Invalid tracker endpoint {endpoint:?}: {e}"))
    })
}

/// Keep issue keys from escaping their path segment.
fn encode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return response.json().await.map_err(|e| GatewayError::Upstream {
            status: Some(status.as_u16()),
            message: format!("Failed to parse Jira response: {e}"),
        });
    }

    let body = response.text().await.unwrap_or_default();
    Err(classify_failure(status.as_u16(), &body))
}

/// Map a non-success Jira response onto the gateway taxonomy.
pub(crate) fn classify_failure(status: u16, body: &str) -> GatewayError {
    if status == 401 {
        return GatewayError::Auth;
    }

    // Jira error bodies look like {"errorMessages": [...], "errors": {...}}.
    let detail = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        v["errorMessages"]
            .as_array()
            .and_then(|msgs| msgs.iter().find_map(|m| m.as_str()).map(String::from))
            .or_else(|| {
                v["errors"]
                    .as_object()
                    .and_then(|errs| errs.values().find_map(|m| m.as_str()).map(String::from))
            })
    });

    let message = match detail {
        Some(msg) => format!("JIRA Error {status}: {msg}"),
        None if body.trim().is_empty() => format!("JIRA Error {status}"),
        None => format!("JIRA Error {status}: {}", body.trim()),
    };

    GatewayError::Upstream {
        status: Some(status),
        message,
    }
}
