//! Request and response bodies for the gateway routes.

use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, Result};

/// Body of `POST /authenticate` and `POST /fetch-stories`.
#[derive(Clone, Deserialize)]
pub struct IssueFetchRequest {
    /// Tracker server endpoint, e.g. `https://acme.atlassian.net`.
    pub domain: String,
    /// Principal (account email).
    pub email: String,
    /// API token for the principal.
    pub jira_token: String,
    /// Epic key. Required by `fetch-stories`, ignored by `authenticate`.
    #[serde(default)]
    pub jira_id: Option<String>,
}

impl std::fmt::Debug for IssueFetchRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssueFetchRequest")
            .field("domain", &self.domain)
            .field("email", &self.email)
            .field("jira_token", &"[REDACTED]")
            .field("jira_id", &self.jira_id)
            .finish()
    }
}

impl IssueFetchRequest {
    /// Check the credential fields every tracker operation needs.
    pub fn validate_credentials(&self) -> Result<()> {
        require("domain", &self.domain)?;
        require("email", &self.email)?;
        require("jira_token", &self.jira_token)?;
        Ok(())
    }

    /// The epic id, which must be present and non-empty.
    pub fn epic_id(&self) -> Result<&str> {
        require("jira_id", self.jira_id.as_deref().unwrap_or(""))
    }
}

/// Body of `POST /generate-test-cases`.
#[derive(Debug, Clone, Deserialize)]
pub struct TestCaseRequest {
    pub user_story: String,
    pub jira_id: String,
    #[serde(default)]
    pub acceptance_criteria: Option<String>,
}

impl TestCaseRequest {
    pub fn validate(&self) -> Result<()> {
        require("user_story", &self.user_story)?;
        require("jira_id", &self.jira_id)?;
        Ok(())
    }
}

/// Response of `POST /authenticate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticateResponse {
    pub status: String,
    /// Display name reported by the tracker, when it has one.
    pub username: Option<String>,
}

impl AuthenticateResponse {
    pub fn authenticated(username: Option<String>) -> Self {
        Self {
            status: "authenticated".to_string(),
            username,
        }
    }
}

fn require<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    if value.trim().is_empty() {
        Err(GatewayError::Validation(format!("{field} is required")))
    } else {
        Ok(value)
    }
}
