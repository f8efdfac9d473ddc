//! Epic → child stories retrieval and response shaping.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::{GatewayError, Result};

use super::{Issue, TrackerSession};

/// Upper bound on stories returned for one epic.
pub const MAX_STORY_RESULTS: u32 = 100;

/// Issue keys (`PROJ-10`) and numeric ids (`10042`).
static ISSUE_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// One child story of an epic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoryItem {
    pub key: String,
    pub summary: String,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub assignee: Option<String>,
    pub due_date: Option<String>,
    pub epic_link: Option<String>,
    pub tags: Vec<String>,
}

impl StoryItem {
    /// Map a tracker issue onto the story shape. `epic_link` is the epic the
    /// story was fetched for.
    pub fn from_issue(issue: Issue, epic_link: &str) -> Self {
        let fields = issue.fields;
        Self {
            key: issue.key,
            summary: fields.summary.unwrap_or_default(),
            description: fields.description,
            priority: fields.priority.and_then(|p| p.name),
            status: fields.status.and_then(|s| s.name),
            assignee: fields.assignee.and_then(|a| a.display_name),
            due_date: fields.duedate,
            epic_link: Some(epic_link.to_string()),
            tags: fields.labels,
        }
    }
}

/// An epic together with its child stories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpicStories {
    pub epic_key: String,
    pub epic_summary: String,
    pub epic_description: Option<String>,
    pub stories: Vec<StoryItem>,
}

/// Reject epic ids that could alter the JQL they are spliced into.
pub fn validate_issue_ref(epic_id: &str) -> Result<()> {
    if ISSUE_REF.is_match(epic_id) {
        Ok(())
    } else {
        Err(GatewayError::Validation(format!(
            "jira_id must be an issue key or id, got {epic_id:?}"
        )))
    }
}

/// JQL selecting the stories linked to `epic_id`, ordered by key.
pub fn epic_stories_jql(epic_id: &str) -> String {
    format!("\"Epic Link\" = {epic_id} AND issuetype = Story ORDER BY key ASC")
}

/// Fetch `epic_id` and its stories through an authenticated session.
///
/// Story order is whatever the search returned.
pub async fn fetch_epic_stories(
    session: &dyn TrackerSession,
    epic_id: &str,
) -> Result<EpicStories> {
    validate_issue_ref(epic_id)?;

    let epic = session.issue(epic_id).await?;
    let issues = session
        .search_issues(&epic_stories_jql(epic_id), MAX_STORY_RESULTS)
        .await?;

    let stories = issues
        .into_iter()
        .map(|issue| StoryItem::from_issue(issue, epic_id))
        .collect();

    Ok(EpicStories {
        epic_key: epic.key,
        epic_summary: epic.fields.summary.unwrap_or_default(),
        epic_description: epic.fields.description,
        stories,
    })
}
