//! JIRA API request and response types.
//!
//! Response types model the JIRA REST API v3 payloads for users, projects
//! and issues. Request types carry a `to_jira_format` method producing the
//! exact JSON shape the API expects, including Atlassian Document Format
//! for rich text fields.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

fn default_true() -> bool {
    true
}

/// A JIRA user.
///
/// Returned by `GET /rest/api/3/myself` and the user search endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// The user's account ID.
    pub account_id: String,
    /// The user's display name.
    pub display_name: String,
    /// The user's email address (may be hidden by privacy settings).
    #[serde(default)]
    pub email_address: Option<String>,
    /// Whether the user account is active.
    #[serde(default = "default_true")]
    pub active: bool,
    /// URLs for the user's avatar images.
    #[serde(default)]
    pub avatar_urls: Option<AvatarUrls>,
    /// The user's time zone.
    #[serde(default)]
    pub time_zone: Option<String>,
    /// The user's locale.
    #[serde(default)]
    pub locale: Option<String>,
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name)
    }
}

/// Avatar URLs by pixel size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarUrls {
    #[serde(rename = "48x48")]
    pub size_48: Option<String>,
    #[serde(rename = "32x32")]
    pub size_32: Option<String>,
    #[serde(rename = "24x24")]
    pub size_24: Option<String>,
    #[serde(rename = "16x16")]
    pub size_16: Option<String>,
}

/// Project lead summary embedded in a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectLead {
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub avatar_urls: Option<AvatarUrls>,
}

/// A JIRA project.
///
/// Returned by `GET /rest/api/3/project/{key}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// The project ID.
    pub id: String,
    /// The project key (e.g., "PROJ").
    pub key: String,
    /// The project name.
    pub name: String,
    /// The project description.
    #[serde(default)]
    pub description: Option<String>,
    /// The project lead.
    #[serde(default)]
    pub lead: Option<ProjectLead>,
    /// The project type (software, business, ...).
    #[serde(default)]
    pub project_type_key: Option<String>,
    /// URLs for project avatar images.
    #[serde(default)]
    pub avatar_urls: Option<AvatarUrls>,
    /// URL to the project.
    #[serde(default)]
    pub url: Option<String>,
    /// Issue types available in the project, when expanded.
    #[serde(default)]
    pub issue_types: Option<Vec<IssueType>>,
    /// Project versions, when expanded.
    #[serde(default)]
    pub versions: Option<Vec<ProjectVersion>>,
}

/// A project version (release).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectVersion {
    /// The version ID.
    pub id: String,
    /// The version name.
    pub name: String,
    /// The version description.
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the version is archived.
    #[serde(default)]
    pub archived: bool,
    /// Whether the version is released.
    #[serde(default)]
    pub released: bool,
    /// Start date of the version.
    #[serde(default)]
    pub start_date: Option<String>,
    /// Release date of the version.
    #[serde(default)]
    pub release_date: Option<String>,
    /// Whether the version is overdue.
    #[serde(default)]
    pub overdue: Option<bool>,
    /// User-friendly start date.
    #[serde(default)]
    pub user_start_date: Option<String>,
    /// User-friendly release date.
    #[serde(default)]
    pub user_release_date: Option<String>,
    /// ID of the project this version belongs to.
    #[serde(default)]
    pub project_id: Option<i64>,
}

/// Payload for creating a project version.
///
/// Sent to `POST /rest/api/3/version`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectVersionCreate {
    /// The name of the new version.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// ID of the project the version belongs to.
    pub project_id: i64,
    pub archived: bool,
    pub released: bool,
    /// Start date in `YYYY-MM-DD` format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    /// Release date in `YYYY-MM-DD` format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
}

impl ProjectVersionCreate {
    pub fn new(name: &str, project_id: i64) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            project_id,
            archived: false,
            released: false,
            start_date: None,
            release_date: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_released(mut self, released: bool) -> Self {
        self.released = released;
        self
    }

    pub fn with_start_date(mut self, date: &str) -> Self {
        self.start_date = Some(date.to_string());
        self
    }

    pub fn with_release_date(mut self, date: &str) -> Self {
        self.release_date = Some(date.to_string());
        self
    }
}

/// Issue type (Bug, Story, Task, Epic, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueType {
    /// The issue type ID.
    pub id: String,
    /// The issue type name.
    pub name: String,
    /// The issue type description.
    #[serde(default)]
    pub description: String,
    /// URL to the issue type icon.
    #[serde(default)]
    pub icon_url: Option<String>,
    /// Whether this is a subtask type.
    #[serde(default)]
    pub subtask: bool,
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Issue status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueStatus {
    /// The status ID.
    pub id: String,
    /// The status name (e.g., "To Do", "In Progress", "Done").
    pub name: String,
    /// The status description.
    #[serde(default)]
    pub description: String,
    /// Status category, left untyped.
    #[serde(default)]
    pub category: Option<Value>,
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Issue priority.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuePriority {
    /// The priority ID.
    pub id: String,
    /// The priority name (e.g., "Highest", "High", "Medium").
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon_url: Option<String>,
}

/// A workflow transition available on an issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTransition {
    /// The transition ID.
    pub id: String,
    /// The transition name.
    pub name: String,
    /// The status this transition leads to.
    pub to: IssueStatus,
    /// Whether this transition pops up a screen.
    #[serde(default)]
    pub has_screen: bool,
}

/// Response wrapper of `GET /rest/api/3/issue/{key}/transitions`.
#[derive(Debug, Clone, Deserialize)]
pub struct TransitionsResponse {
    #[serde(default)]
    pub transitions: Vec<IssueTransition>,
}

/// Issue fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueFields {
    /// The issue summary/title.
    pub summary: String,
    /// The issue description, in Atlassian Document Format.
    #[serde(default)]
    pub description: Option<Value>,
    /// The issue type.
    #[serde(rename = "issuetype")]
    pub issue_type: IssueType,
    /// The project this issue belongs to.
    pub project: Project,
    /// The current status.
    pub status: IssueStatus,
    /// The issue priority.
    #[serde(default)]
    pub priority: Option<IssuePriority>,
    /// The assignee.
    #[serde(default)]
    pub assignee: Option<User>,
    /// The reporter.
    #[serde(default)]
    pub reporter: Option<User>,
    /// Labels attached to the issue.
    #[serde(default)]
    pub labels: Vec<String>,
    /// When the issue was created.
    #[serde(default)]
    pub created: Option<String>,
    /// When the issue was last updated.
    #[serde(default)]
    pub updated: Option<String>,
    /// Resolution, left untyped.
    #[serde(default)]
    pub resolution: Option<Value>,
    /// When the issue was resolved.
    #[serde(default, rename = "resolutiondate")]
    pub resolution_date: Option<String>,
}

/// A JIRA issue.
///
/// Returned by `GET /rest/api/3/issue/{issueKey}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// The issue ID.
    pub id: String,
    /// The issue key (e.g., "PROJ-123").
    pub key: String,
    /// URL to the issue resource.
    #[serde(rename = "self")]
    pub self_url: String,
    /// The issue fields.
    pub fields: IssueFields,
    /// Changelog, when requested via expand.
    #[serde(default)]
    pub changelog: Option<Value>,
}

impl Issue {
    /// Get the issue summary.
    pub fn summary(&self) -> &str {
        &self.fields.summary
    }

    /// Get the issue status name.
    pub fn status_name(&self) -> &str {
        &self.fields.status.name
    }

    /// Get the issue type name.
    pub fn issue_type_name(&self) -> &str {
        &self.fields.issue_type.name
    }

    /// Get the assignee display name, or "Unassigned" if not set.
    pub fn assignee_name(&self) -> &str {
        self.fields
            .assignee
            .as_ref()
            .map(|user| user.display_name.as_str())
            .unwrap_or("Unassigned")
    }

    /// Get the description as plain text, or an empty string if not set.
    pub fn description_text(&self) -> String {
        self.fields
            .description
            .as_ref()
            .map(|doc| {
                if let Ok(doc) = serde_json::from_value::<AtlassianDoc>(doc.clone()) {
                    doc.to_plain_text()
                } else if let Some(text) = doc.as_str() {
                    text.to_string()
                } else {
                    String::new()
                }
            })
            .unwrap_or_default()
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.fields.summary)
    }
}

/// Response of `POST /rest/api/3/issue`.
///
/// JIRA answers issue creation with a bare id/key pair, not a full issue.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedIssue {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default, rename = "self")]
    pub self_url: Option<String>,
}

/// Atlassian Document Format (ADF) content.
///
/// JIRA uses ADF for rich text fields like descriptions and comments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtlassianDoc {
    /// The document type (always "doc" for root documents).
    #[serde(rename = "type")]
    pub doc_type: String,
    /// The document version (typically 1).
    #[serde(default)]
    pub version: Option<u32>,
    /// The content nodes within the document.
    #[serde(default)]
    pub content: Vec<Value>,
}

impl AtlassianDoc {
    /// Extract the plain text out of the document.
    ///
    /// Walks the node tree collecting text nodes; block-level nodes are
    /// separated by newlines and mentions keep their `@name` form. Unknown
    /// nodes are recursed into, so nothing readable is lost.
    pub fn to_plain_text(&self) -> String {
        let mut text = String::new();
        for node in &self.content {
            Self::collect_text(node, &mut text);
        }
        text.trim().to_string()
    }

    fn collect_text(node: &Value, out: &mut String) {
        let Some(obj) = node.as_object() else {
            if let Some(items) = node.as_array() {
                for item in items {
                    Self::collect_text(item, out);
                }
            }
            return;
        };

        match obj.get("type").and_then(Value::as_str) {
            Some("text") => {
                if let Some(text) = obj.get("text").and_then(Value::as_str) {
                    out.push_str(text);
                }
            }
            Some("hardBreak") => out.push('\n'),
            Some("mention") => {
                if let Some(name) = obj
                    .get("attrs")
                    .and_then(|attrs| attrs.get("text"))
                    .and_then(Value::as_str)
                {
                    out.push('@');
                    out.push_str(name);
                }
            }
            node_type => {
                if let Some(items) = obj.get("content").and_then(Value::as_array) {
                    for item in items {
                        Self::collect_text(item, out);
                    }
                }
                let is_block = matches!(node_type, Some("paragraph" | "heading" | "codeBlock"));
                if is_block && !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
            }
        }
    }
}

impl Default for AtlassianDoc {
    fn default() -> Self {
        Self {
            doc_type: "doc".to_string(),
            version: Some(1),
            content: vec![],
        }
    }
}

/// Single-paragraph ADF document wrapping `text`.
fn adf_document(text: &str) -> Value {
    json!({
        "type": "doc",
        "version": 1,
        "content": [
            {
                "type": "paragraph",
                "content": [{"type": "text", "text": text}],
            }
        ],
    })
}

/// Payload for creating a new issue.
#[derive(Debug, Clone)]
pub struct IssueCreate {
    /// ID of the project.
    pub project_id: String,
    /// ID of the issue type.
    pub issue_type_id: String,
    /// Summary of the issue.
    pub summary: String,
    /// Plain text description, wrapped into ADF on the wire.
    pub description: Option<String>,
    /// ID of the priority.
    pub priority_id: Option<String>,
    /// Account ID of the assignee.
    pub assignee_account_id: Option<String>,
    /// Account ID of the reporter.
    pub reporter_account_id: Option<String>,
    /// Labels to attach to the issue.
    pub labels: Vec<String>,
}

impl IssueCreate {
    pub fn new(project_id: &str, issue_type_id: &str, summary: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            issue_type_id: issue_type_id.to_string(),
            summary: summary.to_string(),
            description: None,
            priority_id: None,
            assignee_account_id: None,
            reporter_account_id: None,
            labels: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_priority(mut self, priority_id: &str) -> Self {
        self.priority_id = Some(priority_id.to_string());
        self
    }

    pub fn with_assignee(mut self, account_id: &str) -> Self {
        self.assignee_account_id = Some(account_id.to_string());
        self
    }

    pub fn with_reporter(mut self, account_id: &str) -> Self {
        self.reporter_account_id = Some(account_id.to_string());
        self
    }

    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    /// Convert to the JIRA create-issue format.
    pub fn to_jira_format(&self) -> Value {
        let mut fields = json!({
            "project": {"id": self.project_id},
            "summary": self.summary,
            "issuetype": {"id": self.issue_type_id},
        });

        if let Some(description) = &self.description {
            fields["description"] = adf_document(description);
        }
        if let Some(priority_id) = &self.priority_id {
            fields["priority"] = json!({"id": priority_id});
        }
        if let Some(account_id) = &self.assignee_account_id {
            fields["assignee"] = json!({"accountId": account_id});
        }
        if let Some(account_id) = &self.reporter_account_id {
            fields["reporter"] = json!({"accountId": account_id});
        }
        if !self.labels.is_empty() {
            fields["labels"] = json!(self.labels);
        }

        json!({"fields": fields})
    }
}

/// Payload for updating an existing issue.
///
/// Uses the `update` verb format: each field carries a list of operations
/// instead of a flat value, which is what lets labels be added and removed
/// without sending the full list.
#[derive(Debug, Clone, Default)]
pub struct IssueUpdate {
    /// New summary.
    pub summary: Option<String>,
    /// New plain text description, wrapped into ADF on the wire.
    pub description: Option<String>,
    /// Labels to add.
    pub labels_add: Vec<String>,
    /// Labels to remove.
    pub labels_remove: Vec<String>,
    /// New priority ID.
    pub priority_id: Option<String>,
}

impl IssueUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_summary(mut self, summary: &str) -> Self {
        self.summary = Some(summary.to_string());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn add_label(mut self, label: &str) -> Self {
        self.labels_add.push(label.to_string());
        self
    }

    pub fn remove_label(mut self, label: &str) -> Self {
        self.labels_remove.push(label.to_string());
        self
    }

    pub fn with_priority(mut self, priority_id: &str) -> Self {
        self.priority_id = Some(priority_id.to_string());
        self
    }

    /// Convert to the JIRA update-issue format.
    pub fn to_jira_format(&self) -> Value {
        let mut update = json!({});

        if let Some(summary) = &self.summary {
            update["summary"] = json!([{"set": summary}]);
        }
        if let Some(description) = &self.description {
            update["description"] = json!([{"set": adf_document(description)}]);
        }

        let mut label_operations = Vec::new();
        for label in &self.labels_add {
            label_operations.push(json!({"add": label}));
        }
        for label in &self.labels_remove {
            label_operations.push(json!({"remove": label}));
        }
        if !label_operations.is_empty() {
            update["labels"] = json!(label_operations);
        }

        if let Some(priority_id) = &self.priority_id {
            update["priority"] = json!([{"set": {"id": priority_id}}]);
        }

        json!({"update": update})
    }
}

/// Payload for transitioning an issue through its workflow.
#[derive(Debug, Clone)]
pub struct IssueTransitionRequest {
    /// ID of the transition to perform.
    pub transition_id: String,
    /// Comment added alongside the transition.
    pub comment: Option<String>,
    /// Resolution name, for transitions that resolve the issue.
    pub resolution_name: Option<String>,
}

impl IssueTransitionRequest {
    pub fn new(transition_id: &str) -> Self {
        Self {
            transition_id: transition_id.to_string(),
            comment: None,
            resolution_name: None,
        }
    }

    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    pub fn with_resolution(mut self, resolution_name: &str) -> Self {
        self.resolution_name = Some(resolution_name.to_string());
        self
    }

    /// Convert to the JIRA transition format.
    pub fn to_jira_format(&self) -> Value {
        let mut data = json!({
            "transition": {"id": self.transition_id},
        });

        if let Some(resolution) = &self.resolution_name {
            data["fields"] = json!({"resolution": {"name": resolution}});
        }
        if let Some(comment) = &self.comment {
            data["update"] = json!({
                "comment": [{"add": {"body": adf_document(comment)}}],
            });
        }

        data
    }
}

/// Payload for assigning an issue.
#[derive(Debug, Clone)]
pub struct IssueAssignment {
    /// Account ID of the assignee; `None` unassigns.
    pub account_id: Option<String>,
}

impl IssueAssignment {
    /// Assign to the given account.
    pub fn to(account_id: &str) -> Self {
        Self {
            account_id: Some(account_id.to_string()),
        }
    }

    /// Clear the assignee.
    pub fn unassign() -> Self {
        Self { account_id: None }
    }

    /// Convert to the JIRA assignment format. An explicit null account ID
    /// is what unassigns on the wire.
    pub fn to_jira_format(&self) -> Value {
        match &self.account_id {
            Some(account_id) => json!({"accountId": account_id}),
            None => json!({"accountId": null}),
        }
    }
}
