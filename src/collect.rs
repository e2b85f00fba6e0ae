//! Collector: decides which tracker calls to make, and in what order, to build
//! one [`ProjectBundle`] per changed project.
//!
//! Every sub-fetch returns a tagged `Result<_, FetchError>`; the bundle builders
//! compose those results field by field, so one failed call only empties the
//! field it was meant to fill. Calls are awaited one at a time in program order.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, error, info, warn};

use crate::bundle::{
    AttachmentRecord, ChangeItem, ChangelogEntry, CommentRecord, IssueBundle, IssueInfo,
    ProjectBundle, WorklogRecord,
};
use crate::contract::{
    DomainObject, IssueExpand, IssueRef, JiraUser, ProjectRef, TrackerClient,
};
use crate::error::{AuthError, FetchError};

/// JQL clause selecting issues created or updated in the trailing 24 hours,
/// evaluated against the tracker's clock.
pub const TRAILING_DAY_CLAUSE: &str = "(created >= -1d OR updated >= -1d)";

/// Query used to decide whether a project changed, keyed by project key.
pub fn changed_project_jql(project_key: &str) -> String {
    format!("project=\"{project_key}\" AND {TRAILING_DAY_CLAUSE}")
}

/// Query selecting a project's modified issues, keyed by project id.
pub fn modified_issues_jql(project_id: &str) -> String {
    format!("project={project_id} AND {TRAILING_DAY_CLAUSE}")
}

pub struct Collector<T> {
    tracker: T,
}

impl<T: TrackerClient> Collector<T> {
    pub fn new(tracker: T) -> Self {
        Self { tracker }
    }

    pub async fn authenticate(&self) -> Result<JiraUser, AuthError> {
        let account = self.tracker.authenticate().await?;
        info!(account = %account.display_name, "Authenticated against the tracker");
        Ok(account)
    }

    /// Projects with at least one issue created or updated in the trailing day.
    ///
    /// A failure to list projects yields an empty list; a failed existence check
    /// skips only that project.
    pub async fn discover_changed_projects(&self) -> Vec<ProjectRef> {
        let projects = match self.tracker.list_projects().await {
            Ok(projects) => projects,
            Err(e) => {
                error!(error = %e, "Failed to list projects; nothing to collect");
                return Vec::new();
            }
        };
        info!(
            projects = ?projects.iter().map(|p| p.key.as_str()).collect::<Vec<_>>(),
            "Projects listed"
        );

        let mut changed = Vec::new();
        for project in projects {
            let jql = changed_project_jql(&project.key);
            debug!(project_key = %project.key, jql = %jql, "Checking project for recent changes");
            match self.tracker.search_issues(&jql, Some(1)).await {
                Ok(hits) if !hits.is_empty() => changed.push(project),
                Ok(_) => {}
                Err(e) => {
                    error!(project_key = %project.key, error = %e, "Change check failed; skipping project");
                }
            }
        }
        info!(count = changed.len(), "Projects changed in the last 24 hours");
        changed
    }

    /// Build the bundle for one project. Never fails: each field degrades on its own.
    pub async fn collect_project_bundle(&self, project: &ProjectRef) -> ProjectBundle {
        let id = project.id.as_str();
        let mut bundle = ProjectBundle::empty(project.clone());

        bundle.roles = degrade(self.collect_project_roles(id).await, BTreeMap::new());
        bundle.versions = degrade(self.collect_project_versions(id).await, Vec::new());
        bundle.boards = degrade(self.collect_boards(id).await, Vec::new());
        bundle.policies = degrade(self.collect_policies(id).await, None);
        bundle.dashboards = degrade(self.collect_dashboards().await, Vec::new());
        bundle.custom_fields = degrade(self.collect_custom_fields().await, Vec::new());
        bundle.users = degrade(self.collect_users().await, Vec::new());

        let issues = degrade(self.collect_modified_issues(id).await, Vec::new());
        for issue in &issues {
            bundle.issues.push(self.collect_issue_bundle(&issue.id).await);
        }
        info!(
            project_id = %id,
            issues = bundle.issues.len(),
            "Project bundle collected"
        );
        bundle
    }

    /// Build the bundle for one issue from five independent sub-fetches.
    pub async fn collect_issue_bundle(&self, issue_id: &str) -> IssueBundle {
        IssueBundle {
            issue_info: degrade(self.collect_issue_details(issue_id).await.map(Some), None),
            comments: degrade(self.collect_issue_comments(issue_id).await, Vec::new()),
            worklogs: degrade(self.collect_issue_worklogs(issue_id).await, Vec::new()),
            changelog: degrade(self.collect_issue_changelog(issue_id).await, Vec::new()),
            attachments: degrade(self.collect_issue_attachments(issue_id).await, Vec::new()),
        }
    }

    /// Issues of a project modified in the trailing day, without duplicates.
    pub async fn collect_modified_issues(
        &self,
        project_id: &str,
    ) -> Result<Vec<IssueRef>, FetchError> {
        let issues = self
            .tracker
            .search_issues(&modified_issues_jql(project_id), None)
            .await
            .map_err(|e| FetchError::new("modified issues", project_id, e))?;
        let mut seen = HashSet::new();
        let issues: Vec<IssueRef> = issues
            .into_iter()
            .filter(|issue| seen.insert(issue.id.clone()))
            .collect();
        debug!(project_id, count = issues.len(), "Modified issues collected");
        Ok(issues)
    }

    pub async fn collect_project_roles(
        &self,
        project_id: &str,
    ) -> Result<BTreeMap<String, String>, FetchError> {
        let roles = self
            .tracker
            .project_roles(project_id)
            .await
            .map_err(|e| FetchError::new("roles", project_id, e))?;
        debug!(project_id, "Project roles collected");
        Ok(roles)
    }

    pub async fn collect_project_versions(
        &self,
        project_id: &str,
    ) -> Result<Vec<DomainObject>, FetchError> {
        let versions = self
            .tracker
            .project_versions(project_id)
            .await
            .map_err(|e| FetchError::new("versions", project_id, e))?;
        debug!(project_id, count = versions.len(), "Project versions collected");
        Ok(versions)
    }

    pub async fn collect_policies(
        &self,
        project_id: &str,
    ) -> Result<Option<DomainObject>, FetchError> {
        let policies = self
            .tracker
            .project_policies(project_id)
            .await
            .map_err(|e| FetchError::new("policies", project_id, e))?;
        debug!(project_id, present = policies.is_some(), "Project policies collected");
        Ok(policies)
    }

    pub async fn collect_boards(&self, project_id: &str) -> Result<Vec<DomainObject>, FetchError> {
        let boards = self
            .tracker
            .boards(project_id)
            .await
            .map_err(|e| FetchError::new("boards", project_id, e))?;
        debug!(project_id, count = boards.len(), "Boards collected");
        Ok(boards)
    }

    pub async fn collect_dashboards(&self) -> Result<Vec<DomainObject>, FetchError> {
        let dashboards = self
            .tracker
            .dashboards()
            .await
            .map_err(|e| FetchError::new("dashboards", "site", e))?;
        debug!(count = dashboards.len(), "Dashboards collected");
        Ok(dashboards)
    }

    pub async fn collect_custom_fields(&self) -> Result<Vec<DomainObject>, FetchError> {
        let fields = self
            .tracker
            .fields()
            .await
            .map_err(|e| FetchError::new("custom fields", "site", e))?;
        debug!(count = fields.len(), "Custom fields collected");
        Ok(fields)
    }

    pub async fn collect_users(&self) -> Result<Vec<JiraUser>, FetchError> {
        let users = self
            .tracker
            .users()
            .await
            .map_err(|e| FetchError::new("users", "site", e))?;
        debug!(count = users.len(), "Users collected");
        Ok(users)
    }

    pub async fn collect_issue_details(&self, issue_id: &str) -> Result<IssueInfo, FetchError> {
        let issue = self
            .tracker
            .get_issue(issue_id, None)
            .await
            .map_err(|e| FetchError::new("details", issue_id, e))?;
        debug!(issue_id, key = %issue.key, "Issue details collected");
        let fields = issue.fields;
        Ok(IssueInfo {
            id: issue.id,
            key: issue.key,
            summary: fields.summary.unwrap_or_default(),
            status: fields.status.map(|s| s.name).unwrap_or_default(),
            priority: fields.priority.map(|p| p.name),
            reporter: fields.reporter.map(|u| u.display_name),
            assignee: fields.assignee.map(|u| u.display_name),
        })
    }

    pub async fn collect_issue_comments(
        &self,
        issue_id: &str,
    ) -> Result<Vec<CommentRecord>, FetchError> {
        let comments = self
            .tracker
            .comments(issue_id)
            .await
            .map_err(|e| FetchError::new("comments", issue_id, e))?;
        debug!(issue_id, count = comments.len(), "Issue comments collected");
        Ok(comments
            .into_iter()
            .map(|c| CommentRecord {
                author: c.author.map(|u| u.display_name),
                body: c.body,
            })
            .collect())
    }

    pub async fn collect_issue_worklogs(
        &self,
        issue_id: &str,
    ) -> Result<Vec<WorklogRecord>, FetchError> {
        let worklogs = self
            .tracker
            .worklogs(issue_id)
            .await
            .map_err(|e| FetchError::new("worklogs", issue_id, e))?;
        debug!(issue_id, count = worklogs.len(), "Issue worklogs collected");
        Ok(worklogs
            .into_iter()
            .map(|w| WorklogRecord {
                author: w.author.map(|u| u.display_name),
                time_spent: w.time_spent,
            })
            .collect())
    }

    pub async fn collect_issue_changelog(
        &self,
        issue_id: &str,
    ) -> Result<Vec<ChangelogEntry>, FetchError> {
        let issue = self
            .tracker
            .get_issue(issue_id, Some(IssueExpand::Changelog))
            .await
            .map_err(|e| FetchError::new("changelog", issue_id, e))?;
        let histories = issue.changelog.unwrap_or_default().histories;
        debug!(issue_id, count = histories.len(), "Issue changelog collected");
        Ok(histories
            .into_iter()
            .map(|history| ChangelogEntry {
                author: history.author.map(|u| u.display_name),
                items: history
                    .items
                    .into_iter()
                    .map(|item| ChangeItem {
                        field: item.field,
                        from_value: item.from_value,
                        to_value: item.to_value,
                    })
                    .collect(),
            })
            .collect())
    }

    pub async fn collect_issue_attachments(
        &self,
        issue_id: &str,
    ) -> Result<Vec<AttachmentRecord>, FetchError> {
        let attachments = self
            .tracker
            .attachments(issue_id)
            .await
            .map_err(|e| FetchError::new("attachments", issue_id, e))?;
        debug!(issue_id, count = attachments.len(), "Issue attachments collected");
        Ok(attachments
            .into_iter()
            .map(|a| AttachmentRecord {
                filename: a.filename,
                size: a.size,
                author: a.author.map(|u| u.display_name),
            })
            .collect())
    }
}

/// Absorb a failed sub-fetch: log it and fall back to the empty value for the field.
fn degrade<V>(result: Result<V, FetchError>, fallback: V) -> V {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(
                resource = e.resource,
                target = %e.target,
                error = %e.source,
                "Sub-fetch failed; field left empty"
            );
            fallback
        }
    }
}
