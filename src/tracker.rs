//! `JiraClient`: [`TrackerClient`] over the Jira Cloud REST API (v2, plus Agile v1 for boards).

use std::collections::BTreeMap;

use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::TrackerConfig;
use crate::contract::{
    DomainObject, IssueDetail, IssueExpand, IssueRef, JiraAttachment, JiraComment, JiraUser,
    JiraWorklog, ProjectRef, TrackerClient,
};
use crate::error::{AuthError, TrackerError};

const USER_AGENT: &str = concat!("jira-harvest/", env!("CARGO_PKG_VERSION"));

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<IssueRef>,
}

#[derive(Deserialize)]
struct BoardPage {
    #[serde(default)]
    values: Vec<Value>,
}

#[derive(Deserialize)]
struct DashboardPage {
    #[serde(default)]
    dashboards: Vec<Value>,
}

#[derive(Deserialize)]
struct CommentPage {
    #[serde(default)]
    comments: Vec<JiraComment>,
}

#[derive(Deserialize)]
struct WorklogPage {
    #[serde(default)]
    worklogs: Vec<JiraWorklog>,
}

pub struct JiraClient {
    base_url: String,
    auth_header: String,
    client: reqwest::Client,
}

impl JiraClient {
    /// Build a client for the configured site. Performs no I/O.
    pub fn new(config: &TrackerConfig) -> Result<Self, TrackerError> {
        let creds = format!("{}:{}", config.email, config.api_token);
        let encoded = base64::engine::general_purpose::STANDARD.encode(creds);
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            auth_header: format!("Basic {encoded}"),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, TrackerError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "GET tracker resource");

        let response = self
            .client
            .get(&url)
            .query(query)
            .header(AUTHORIZATION, &self.auth_header)
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(TrackerError::Status {
                status: status.as_u16(),
                url,
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

fn segment(id: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(id)
}

fn opaque(kind: &str, values: Vec<Value>) -> Vec<DomainObject> {
    values
        .into_iter()
        .map(|raw| DomainObject::from_raw(kind, raw))
        .collect()
}

#[async_trait]
impl TrackerClient for JiraClient {
    async fn authenticate(&self) -> Result<JiraUser, AuthError> {
        self.get_json("/rest/api/2/myself", &[])
            .await
            .map_err(|source| AuthError {
                base_url: self.base_url.clone(),
                source,
            })
    }

    async fn list_projects(&self) -> Result<Vec<ProjectRef>, TrackerError> {
        self.get_json("/rest/api/2/project", &[]).await
    }

    async fn search_issues(
        &self,
        jql: &str,
        max_results: Option<u32>,
    ) -> Result<Vec<IssueRef>, TrackerError> {
        let mut query = vec![("jql", jql.to_owned())];
        if let Some(max) = max_results {
            query.push(("maxResults", max.to_string()));
        }
        let page: SearchResponse = self.get_json("/rest/api/2/search", &query).await?;
        Ok(page.issues)
    }

    async fn project_roles(
        &self,
        project_id: &str,
    ) -> Result<BTreeMap<String, String>, TrackerError> {
        let path = format!("/rest/api/2/project/{}/role", segment(project_id));
        self.get_json(&path, &[]).await
    }

    async fn project_versions(
        &self,
        project_id: &str,
    ) -> Result<Vec<DomainObject>, TrackerError> {
        let path = format!("/rest/api/2/project/{}/versions", segment(project_id));
        let versions: Vec<Value> = self.get_json(&path, &[]).await?;
        Ok(opaque("version", versions))
    }

    async fn project_policies(
        &self,
        project_id: &str,
    ) -> Result<Option<DomainObject>, TrackerError> {
        let path = format!("/rest/api/2/project/{}", segment(project_id));
        let project: Value = self.get_json(&path, &[]).await?;
        Ok(project
            .get("projectCategory")
            .filter(|category| !category.is_null())
            .map(|category| DomainObject::from_raw("project_category", category.clone())))
    }

    async fn boards(&self, project_id: &str) -> Result<Vec<DomainObject>, TrackerError> {
        let page: BoardPage = self
            .get_json(
                "/rest/agile/1.0/board",
                &[("projectKeyOrId", project_id.to_owned())],
            )
            .await?;
        Ok(opaque("board", page.values))
    }

    async fn dashboards(&self) -> Result<Vec<DomainObject>, TrackerError> {
        let page: DashboardPage = self.get_json("/rest/api/2/dashboard", &[]).await?;
        Ok(opaque("dashboard", page.dashboards))
    }

    async fn fields(&self) -> Result<Vec<DomainObject>, TrackerError> {
        let fields: Vec<Value> = self.get_json("/rest/api/2/field", &[]).await?;
        Ok(opaque("field", fields))
    }

    async fn users(&self) -> Result<Vec<JiraUser>, TrackerError> {
        self.get_json("/rest/api/2/users/search", &[]).await
    }

    async fn get_issue(
        &self,
        issue_id: &str,
        expand: Option<IssueExpand>,
    ) -> Result<IssueDetail, TrackerError> {
        let path = format!("/rest/api/2/issue/{}", segment(issue_id));
        let query: Vec<(&str, String)> = expand
            .map(|e| ("expand", e.as_query_value().to_owned()))
            .into_iter()
            .collect();
        self.get_json(&path, &query).await
    }

    async fn comments(&self, issue_id: &str) -> Result<Vec<JiraComment>, TrackerError> {
        let path = format!("/rest/api/2/issue/{}/comment", segment(issue_id));
        let page: CommentPage = self.get_json(&path, &[]).await?;
        Ok(page.comments)
    }

    async fn worklogs(&self, issue_id: &str) -> Result<Vec<JiraWorklog>, TrackerError> {
        let path = format!("/rest/api/2/issue/{}/worklog", segment(issue_id));
        let page: WorklogPage = self.get_json(&path, &[]).await?;
        Ok(page.worklogs)
    }

    async fn attachments(&self, issue_id: &str) -> Result<Vec<JiraAttachment>, TrackerError> {
        let path = format!("/rest/api/2/issue/{}", segment(issue_id));
        let issue: IssueDetail = self
            .get_json(&path, &[("fields", "attachment".to_owned())])
            .await?;
        Ok(issue.fields.attachment)
    }
}
