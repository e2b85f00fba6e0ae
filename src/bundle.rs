//! In-memory bundles: everything collected for one project and its modified issues.
//!
//! A bundle always carries every key. A sub-resource that could not be fetched
//! is present with an empty or null value, never missing, so both sinks can rely
//! on a fixed shape.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::contract::{DomainObject, JiraUser, ProjectRef};
use crate::error::PersistenceError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueInfo {
    pub id: String,
    pub key: String,
    pub summary: String,
    pub status: String,
    pub priority: Option<String>,
    pub reporter: Option<String>,
    pub assignee: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentRecord {
    pub author: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorklogRecord {
    pub author: Option<String>,
    #[serde(rename = "timeSpent")]
    pub time_spent: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeItem {
    pub field: String,
    #[serde(rename = "fromString")]
    pub from_value: Option<String>,
    #[serde(rename = "toString")]
    pub to_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangelogEntry {
    pub author: Option<String>,
    pub items: Vec<ChangeItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentRecord {
    pub filename: String,
    pub size: u64,
    pub author: Option<String>,
}

/// Everything collected for one modified issue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IssueBundle {
    pub issue_info: Option<IssueInfo>,
    pub comments: Vec<CommentRecord>,
    pub worklogs: Vec<WorklogRecord>,
    pub changelog: Vec<ChangelogEntry>,
    pub attachments: Vec<AttachmentRecord>,
}

impl IssueBundle {
    pub fn to_plain_record(&self) -> Result<Value, PersistenceError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Everything collected for one project in a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectBundle {
    pub project_info: ProjectRef,
    pub roles: BTreeMap<String, String>,
    pub versions: Vec<DomainObject>,
    pub issues: Vec<IssueBundle>,
    pub boards: Vec<DomainObject>,
    pub policies: Option<DomainObject>,
    pub dashboards: Vec<DomainObject>,
    pub custom_fields: Vec<DomainObject>,
    pub users: Vec<JiraUser>,
}

impl ProjectBundle {
    /// A bundle for `project_info` with every other field empty.
    pub fn empty(project_info: ProjectRef) -> Self {
        Self {
            project_info,
            roles: BTreeMap::new(),
            versions: Vec::new(),
            issues: Vec::new(),
            boards: Vec::new(),
            policies: None,
            dashboards: Vec::new(),
            custom_fields: Vec::new(),
            users: Vec::new(),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_info.id
    }

    /// Nested JSON form of the whole bundle, as written by the local sink.
    ///
    /// Fails with [`PersistenceError::NotPlainRecord`] if any opaque tracker
    /// object lacks a raw representation.
    pub fn to_plain_record(&self) -> Result<Value, PersistenceError> {
        let mut record = Map::new();
        record.insert(
            "project_info".to_owned(),
            serde_json::to_value(&self.project_info)?,
        );
        record.insert("roles".to_owned(), serde_json::to_value(&self.roles)?);
        record.insert("versions".to_owned(), plain_list(&self.versions)?);
        record.insert(
            "issues".to_owned(),
            Value::Array(
                self.issues
                    .iter()
                    .map(IssueBundle::to_plain_record)
                    .collect::<Result<_, _>>()?,
            ),
        );
        // Audit logs are not collected; the key is kept for consumers of the file layout.
        record.insert("audit_logs".to_owned(), Value::Null);
        record.insert("boards".to_owned(), plain_list(&self.boards)?);
        record.insert(
            "policies".to_owned(),
            match &self.policies {
                Some(policy) => policy.to_plain_record()?,
                None => Value::Null,
            },
        );
        record.insert("dashboards".to_owned(), plain_list(&self.dashboards)?);
        record.insert("custom_fields".to_owned(), plain_list(&self.custom_fields)?);
        record.insert("users".to_owned(), serde_json::to_value(&self.users)?);
        Ok(Value::Object(record))
    }
}

fn plain_list(objects: &[DomainObject]) -> Result<Value, PersistenceError> {
    objects
        .iter()
        .map(DomainObject::to_plain_record)
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn project() -> ProjectRef {
        ProjectRef {
            id: "10000".into(),
            key: "ABC".into(),
            name: "Alpha".into(),
        }
    }

    #[test]
    fn empty_bundle_keeps_every_key() {
        let record = ProjectBundle::empty(project()).to_plain_record().unwrap();
        let keys: Vec<&str> = record
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(
            keys,
            vec![
                "project_info",
                "roles",
                "versions",
                "issues",
                "audit_logs",
                "boards",
                "policies",
                "dashboards",
                "custom_fields",
                "users"
            ]
        );
        assert_eq!(record["policies"], Value::Null);
        assert_eq!(record["versions"], json!([]));
    }

    #[test]
    fn empty_issue_bundle_keeps_every_key() {
        let record = IssueBundle::default().to_plain_record().unwrap();
        assert_eq!(
            record,
            json!({
                "issue_info": null,
                "comments": [],
                "worklogs": [],
                "changelog": [],
                "attachments": []
            })
        );
    }

    #[test]
    fn opaque_object_without_raw_fails_the_bundle() {
        let mut bundle = ProjectBundle::empty(project());
        bundle.boards.push(DomainObject::without_raw("board"));
        let err = bundle.to_plain_record().unwrap_err();
        assert!(matches!(err, PersistenceError::NotPlainRecord { ref kind } if kind == "board"));
    }

    #[test]
    fn raw_objects_are_written_as_received() {
        let mut bundle = ProjectBundle::empty(project());
        bundle.policies = Some(DomainObject::from_raw(
            "project_category",
            json!({"id": "7", "name": "Internal"}),
        ));
        let record = bundle.to_plain_record().unwrap();
        assert_eq!(record["policies"]["name"], "Internal");
    }
}
