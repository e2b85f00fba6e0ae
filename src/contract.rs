//! # contract: boundaries of a harvest run
//!
//! This module defines the two external collaborators of the pipeline as traits,
//! plus the plain data types that cross those boundaries:
//!
//! - [`TrackerClient`]: read-only access to the issue tracker (projects, issues and
//!   their sub-resources). Implemented over HTTP by [`crate::tracker::JiraClient`].
//! - [`ObjectStore`]: blob upload for the cloud sink. Implemented over HTTP by
//!   [`crate::sink::azure::AzureBlobStore`].
//!
//! ## Mocking & Testing
//! Both traits are annotated for `mockall`, so `MockTrackerClient` and
//! `MockObjectStore` are available to unit tests and, with the default
//! `test-export-mocks` feature, to integration tests as well.
//!
//! ## Wire types
//! Types here deserialize straight from tracker JSON. Objects the harvester does
//! not interpret (versions, boards, dashboards, fields, project categories) travel
//! as [`DomainObject`]s that keep their raw payload.

use std::collections::BTreeMap;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, PersistenceError, StoreError, TrackerError};

/// A project as listed by the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub id: String,
    pub key: String,
    pub name: String,
}

/// An issue as returned by a search; only identifiers are kept.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IssueRef {
    pub id: String,
    pub key: String,
}

/// A tracker account. Doubles as the user record written into project bundles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraUser {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email_address: Option<String>,
}

/// Named tracker entity such as a status or a priority.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NamedField {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueFields {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub status: Option<NamedField>,
    #[serde(default)]
    pub priority: Option<NamedField>,
    #[serde(default)]
    pub reporter: Option<JiraUser>,
    #[serde(default)]
    pub assignee: Option<JiraUser>,
    #[serde(default)]
    pub attachment: Vec<JiraAttachment>,
}

/// Full issue payload, optionally with its expanded changelog.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueDetail {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub fields: IssueFields,
    #[serde(default)]
    pub changelog: Option<Changelog>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Changelog {
    #[serde(default)]
    pub histories: Vec<ChangeHistory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeHistory {
    #[serde(default)]
    pub author: Option<JiraUser>,
    #[serde(default)]
    pub items: Vec<ChangeHistoryItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeHistoryItem {
    pub field: String,
    #[serde(rename = "fromString", default)]
    pub from_value: Option<String>,
    #[serde(rename = "toString", default)]
    pub to_value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JiraComment {
    #[serde(default)]
    pub author: Option<JiraUser>,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JiraWorklog {
    #[serde(default)]
    pub author: Option<JiraUser>,
    #[serde(rename = "timeSpent", default)]
    pub time_spent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JiraAttachment {
    pub filename: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub author: Option<JiraUser>,
}

/// Expansions understood by [`TrackerClient::get_issue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueExpand {
    Changelog,
}

impl IssueExpand {
    pub fn as_query_value(self) -> &'static str {
        match self {
            IssueExpand::Changelog => "changelog",
        }
    }
}

/// A tracker object kept opaque by the harvester.
///
/// `raw` holds the object's payload as received. Objects built without one (for
/// instance by a client that only knows an object's identity) cannot be written
/// to the local sink.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainObject {
    pub kind: String,
    pub raw: Option<serde_json::Value>,
}

impl DomainObject {
    pub fn from_raw(kind: impl Into<String>, raw: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            raw: Some(raw),
        }
    }

    pub fn without_raw(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            raw: None,
        }
    }

    /// Plain JSON form of the object, or a tagged error if it has none.
    pub fn to_plain_record(&self) -> Result<serde_json::Value, PersistenceError> {
        self.raw
            .clone()
            .ok_or_else(|| PersistenceError::NotPlainRecord {
                kind: self.kind.clone(),
            })
    }
}

/// Read access to the issue tracker.
///
/// Every call is independently failable; callers decide how far a failure reaches.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait TrackerClient: Send + Sync {
    /// Verify the configured credentials, returning the authenticated account.
    async fn authenticate(&self) -> Result<JiraUser, AuthError>;

    async fn list_projects(&self) -> Result<Vec<ProjectRef>, TrackerError>;

    /// Run a JQL search. `max_results = None` leaves the page size to the tracker.
    async fn search_issues(
        &self,
        jql: &str,
        max_results: Option<u32>,
    ) -> Result<Vec<IssueRef>, TrackerError>;

    /// Role name to role resource URL.
    async fn project_roles(
        &self,
        project_id: &str,
    ) -> Result<BTreeMap<String, String>, TrackerError>;

    async fn project_versions(&self, project_id: &str)
        -> Result<Vec<DomainObject>, TrackerError>;

    /// The project's category, if it has one.
    async fn project_policies(
        &self,
        project_id: &str,
    ) -> Result<Option<DomainObject>, TrackerError>;

    async fn boards(&self, project_id: &str) -> Result<Vec<DomainObject>, TrackerError>;

    async fn dashboards(&self) -> Result<Vec<DomainObject>, TrackerError>;

    async fn fields(&self) -> Result<Vec<DomainObject>, TrackerError>;

    async fn users(&self) -> Result<Vec<JiraUser>, TrackerError>;

    async fn get_issue(
        &self,
        issue_id: &str,
        expand: Option<IssueExpand>,
    ) -> Result<IssueDetail, TrackerError>;

    async fn comments(&self, issue_id: &str) -> Result<Vec<JiraComment>, TrackerError>;

    async fn worklogs(&self, issue_id: &str) -> Result<Vec<JiraWorklog>, TrackerError>;

    async fn attachments(&self, issue_id: &str) -> Result<Vec<JiraAttachment>, TrackerError>;
}

/// Blob storage used by the cloud sink.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create or overwrite the blob at `path` with `content`.
    async fn put_blob(&self, path: &str, content: String) -> Result<(), StoreError>;
}
