//! JIRA API client and types.
//!
//! This module provides the interface for communicating with the JIRA REST API.

mod auth;
mod client;
mod error;
mod types;

pub use auth::Auth;
pub use client::JiraClient;
pub use error::{ApiError, Result};
pub use types::{
    AtlassianDoc, AvatarUrls, CreatedIssue, Issue, IssueAssignment, IssueCreate, IssueFields,
    IssuePriority, IssueStatus, IssueTransition, IssueTransitionRequest, IssueType, IssueUpdate,
    Project, ProjectLead, ProjectVersion, ProjectVersionCreate, TransitionsResponse, User,
};
