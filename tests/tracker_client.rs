use mockito::{Matcher, Server};

use jira_harvest::config::TrackerConfig;
use jira_harvest::contract::{IssueExpand, TrackerClient};
use jira_harvest::error::TrackerError;
use jira_harvest::tracker::JiraClient;

// base64("harvest@acme.test:tracker-token")
const BASIC_AUTH: &str = "Basic aGFydmVzdEBhY21lLnRlc3Q6dHJhY2tlci10b2tlbg==";

fn client(server: &Server) -> JiraClient {
    JiraClient::new(&TrackerConfig {
        base_url: format!("{}/", server.url()),
        email: "harvest@acme.test".into(),
        api_token: "tracker-token".into(),
    })
    .expect("client builds")
}

#[tokio::test]
async fn test_authenticate_sends_basic_auth_and_user_agent() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/rest/api/2/myself")
        .match_header("authorization", BASIC_AUTH)
        .match_header("user-agent", Matcher::Regex("^jira-harvest/".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"accountId":"abc","displayName":"Harvest Bot","emailAddress":"harvest@acme.test"}"#)
        .create_async()
        .await;

    let account = client(&server).authenticate().await.unwrap();
    assert_eq!(account.display_name, "Harvest Bot");
    assert_eq!(account.email_address.as_deref(), Some("harvest@acme.test"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_authenticate_rejection_is_an_auth_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/rest/api/2/myself")
        .with_status(401)
        .with_body("Unauthorized")
        .create_async()
        .await;

    let err = client(&server).authenticate().await.unwrap_err();
    assert_eq!(err.base_url, server.url());
    match err.source {
        TrackerError::Status { status, body, .. } => {
            assert_eq!(status, 401);
            assert_eq!(body, "Unauthorized");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_search_issues_passes_jql_and_page_size() {
    let mut server = Server::new_async().await;
    let jql = r#"project="ABC" AND (created >= -1d OR updated >= -1d)"#;
    let mock = server
        .mock("GET", "/rest/api/2/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("jql".into(), jql.into()),
            Matcher::UrlEncoded("maxResults".into(), "1".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"startAt":0,"total":7,"issues":[{"id":"101","key":"ABC-101","fields":{}}]}"#)
        .create_async()
        .await;

    let issues = client(&server).search_issues(jql, Some(1)).await.unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].key, "ABC-101");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_project_resources_are_decoded() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/rest/api/2/project/10000/role")
        .with_status(200)
        .with_body(r#"{"Developers":"https://acme.atlassian.net/rest/api/2/project/10000/role/10002"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/rest/api/2/project/10000/versions")
        .with_status(200)
        .with_body(r#"[{"id":"2001","name":"1.0","released":true}]"#)
        .create_async()
        .await;
    server
        .mock("GET", "/rest/api/2/project/10000")
        .with_status(200)
        .with_body(r#"{"id":"10000","key":"ABC","projectCategory":{"id":"1","name":"Internal"}}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/rest/agile/1.0/board")
        .match_query(Matcher::UrlEncoded("projectKeyOrId".into(), "10000".into()))
        .with_status(200)
        .with_body(r#"{"maxResults":50,"values":[{"id":7,"name":"ABC board"}]}"#)
        .create_async()
        .await;

    let client = client(&server);
    let roles = client.project_roles("10000").await.unwrap();
    assert!(roles["Developers"].ends_with("/role/10002"));

    let versions = client.project_versions("10000").await.unwrap();
    assert_eq!(versions[0].kind, "version");
    assert_eq!(versions[0].raw.as_ref().unwrap()["name"], "1.0");

    let policies = client.project_policies("10000").await.unwrap().unwrap();
    assert_eq!(policies.raw.unwrap()["name"], "Internal");

    let boards = client.boards("10000").await.unwrap();
    assert_eq!(boards.len(), 1);
    assert_eq!(boards[0].kind, "board");
}

#[tokio::test]
async fn test_project_without_category_has_no_policies() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/rest/api/2/project/10000")
        .with_status(200)
        .with_body(r#"{"id":"10000","key":"ABC"}"#)
        .create_async()
        .await;

    assert!(client(&server)
        .project_policies("10000")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_site_resources_are_decoded() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/rest/api/2/dashboard")
        .with_status(200)
        .with_body(r#"{"startAt":0,"dashboards":[{"id":"10","name":"Default dashboard"}]}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/rest/api/2/field")
        .with_status(200)
        .with_body(r#"[{"id":"summary","custom":false},{"id":"customfield_10020","custom":true}]"#)
        .create_async()
        .await;
    server
        .mock("GET", "/rest/api/2/users/search")
        .with_status(200)
        .with_body(r#"[{"accountId":"a","displayName":"Ana"},{"accountId":"b","displayName":"Rui","emailAddress":"rui@acme.test"}]"#)
        .create_async()
        .await;

    let client = client(&server);
    assert_eq!(client.dashboards().await.unwrap().len(), 1);
    assert_eq!(client.fields().await.unwrap().len(), 2);
    let users = client.users().await.unwrap();
    assert_eq!(users[0].display_name, "Ana");
    assert_eq!(users[0].email_address, None);
    assert_eq!(users[1].email_address.as_deref(), Some("rui@acme.test"));
}

#[tokio::test]
async fn test_issue_resources_are_decoded() {
    let mut server = Server::new_async().await;
    let expanded = server
        .mock("GET", "/rest/api/2/issue/101")
        .match_query(Matcher::UrlEncoded("expand".into(), "changelog".into()))
        .with_status(200)
        .with_body(
            r#"{"id":"101","key":"ABC-101","fields":{"summary":"Crash"},
                "changelog":{"histories":[{"author":{"displayName":"Rui"},
                "items":[{"field":"status","fromString":"Open","toString":"Done"}]}]}}"#,
        )
        .create_async()
        .await;
    server
        .mock("GET", "/rest/api/2/issue/101")
        .match_query(Matcher::UrlEncoded("fields".into(), "attachment".into()))
        .with_status(200)
        .with_body(r#"{"id":"101","key":"ABC-101","fields":{"attachment":[{"filename":"trace.log","size":2048}]}}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/rest/api/2/issue/101/comment")
        .with_status(200)
        .with_body(r#"{"startAt":0,"total":1,"comments":[{"author":{"displayName":"Ana"},"body":"Seen it"}]}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/rest/api/2/issue/101/worklog")
        .with_status(200)
        .with_body(r#"{"worklogs":[{"author":{"displayName":"Rui"},"timeSpent":"3h 20m"}]}"#)
        .create_async()
        .await;

    let client = client(&server);
    let issue = client
        .get_issue("101", Some(IssueExpand::Changelog))
        .await
        .unwrap();
    assert_eq!(issue.changelog.unwrap().histories[0].items[0].to_value.as_deref(), Some("Done"));
    expanded.assert_async().await;

    let attachments = client.attachments("101").await.unwrap();
    assert_eq!(attachments[0].filename, "trace.log");
    assert_eq!(attachments[0].size, 2048);

    let comments = client.comments("101").await.unwrap();
    assert_eq!(comments[0].body, "Seen it");

    let worklogs = client.worklogs("101").await.unwrap();
    assert_eq!(worklogs[0].time_spent, "3h 20m");
}

#[tokio::test]
async fn test_error_status_and_bad_body_are_distinguished() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/rest/api/2/project")
        .with_status(503)
        .with_body("maintenance")
        .create_async()
        .await;
    server
        .mock("GET", "/rest/api/2/field")
        .with_status(200)
        .with_body("<html>not json</html>")
        .create_async()
        .await;

    let client = client(&server);
    match client.list_projects().await.unwrap_err() {
        TrackerError::Status { status, url, .. } => {
            assert_eq!(status, 503);
            assert!(url.ends_with("/rest/api/2/project"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
    assert!(matches!(
        client.fields().await.unwrap_err(),
        TrackerError::Decode(_)
    ));
}
