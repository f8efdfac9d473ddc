//! Issue-tracker collaborator.
//!
//! [`IssueTracker`] performs the credential handshake and hands back an
//! opaque [`SessionHandle`]; the handle then serves single-issue reads and
//! JQL searches. The Jira REST implementation lives in [`jira`].

pub mod jira;
pub mod stories;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use jira::JiraTracker;
pub use stories::{EpicStories, StoryItem};

/// Authenticated session handle, shared between the session cache and the
/// requests that use it.
pub type SessionHandle = Arc<dyn TrackerSession>;

/// Opens authenticated sessions against a tracker server.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Verify `(principal, secret)` against `endpoint` and return a session.
    ///
    /// Invalid credentials must surface as
    /// [`GatewayError::Auth`](crate::error::GatewayError::Auth).
    async fn connect(
        &self,
        endpoint: &str,
        principal: &str,
        secret: &str,
    ) -> Result<SessionHandle>;
}

/// Operations available on an authenticated session.
#[async_trait]
pub trait TrackerSession: Send + Sync {
    /// Profile of the authenticated user, captured during the handshake.
    fn profile(&self) -> &UserProfile;

    /// Fetch a single issue by key or id.
    async fn issue(&self, key: &str) -> Result<Issue>;

    /// Run a JQL search, returning at most `max_results` issues in the
    /// order the server produced them.
    async fn search_issues(&self, jql: &str, max_results: u32) -> Result<Vec<Issue>>;
}

/// The authenticated user as reported by the tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
}

/// A tracker work item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Issue {
    pub key: String,
    #[serde(default)]
    pub fields: IssueFields,
}

/// The subset of issue fields the gateway reads.
///
/// Every field is optional on the wire; absence means the tracker did not
/// provide it, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IssueFields {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<NamedField>,
    #[serde(default)]
    pub status: Option<NamedField>,
    #[serde(default)]
    pub assignee: Option<UserRef>,
    #[serde(default)]
    pub duedate: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub labels: Vec<String>,
}

/// A field whose value is an object with a `name` (priority, status).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NamedField {
    #[serde(default)]
    pub name: Option<String>,
}

/// A user reference embedded in an issue (assignee, reporter).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    #[serde(default)]
    pub display_name: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
