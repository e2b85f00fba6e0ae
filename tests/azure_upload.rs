use chrono::NaiveDate;
use mockito::{Matcher, Server};

use jira_harvest::aggregate::flatten;
use jira_harvest::bundle::ProjectBundle;
use jira_harvest::config::StorageConfig;
use jira_harvest::contract::{ObjectStore, ProjectRef};
use jira_harvest::error::{PersistenceError, StoreError};
use jira_harvest::sink::{AzureBlobStore, CloudSink};

fn store(server: &Server) -> AzureBlobStore {
    AzureBlobStore::new(&StorageConfig {
        account_name: "acme".into(),
        account_key: "c2VjcmV0LWtleQ==".into(),
        container: "jira-raw".into(),
        endpoint: Some(server.url()),
    })
    .expect("store builds")
}

#[tokio::test]
async fn test_put_blob_sends_a_signed_block_blob() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PUT", "/jira-raw/jira/2024/03/07/10000/data.json")
        .match_header("x-ms-blob-type", "BlockBlob")
        .match_header("x-ms-version", "2021-08-06")
        .match_header("content-type", "application/json")
        .match_header("x-ms-date", Matcher::Regex(r"^\w{3}, \d{2} \w{3} \d{4} \d{2}:\d{2}:\d{2} GMT$".into()))
        .match_header("authorization", Matcher::Regex(r"^SharedKey acme:[A-Za-z0-9+/]{43}=$".into()))
        .match_body(r#"[{"id":"10000"}]"#)
        .with_status(201)
        .create_async()
        .await;

    store(&server)
        .put_blob("jira/2024/03/07/10000/data.json", r#"[{"id":"10000"}]"#.to_owned())
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_rejected_upload_reports_status_and_body() {
    let mut server = Server::new_async().await;
    server
        .mock("PUT", Matcher::Any)
        .with_status(403)
        .with_body("<Error><Code>AuthenticationFailed</Code></Error>")
        .create_async()
        .await;

    let err = store(&server)
        .put_blob("jira/2024/03/07/10000/data.json", "[]".to_owned())
        .await
        .unwrap_err();
    match err {
        StoreError::Status { status, body } => {
            assert_eq!(status, 403);
            assert!(body.contains("AuthenticationFailed"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cloud_sink_uploads_flattened_rows_to_dated_path() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PUT", "/jira-raw/jira/2025/01/02/10000/data.json")
        .match_body(
            r#"[{"id":"10000","key":"ABC","name":"Alpha","issue_info":null,"comments":null,"worklogs":null,"changelog":null,"attachments":null}]"#,
        )
        .with_status(201)
        .expect(2)
        .create_async()
        .await;

    let bundle = ProjectBundle::empty(ProjectRef {
        id: "10000".into(),
        key: "ABC".into(),
        name: "Alpha".into(),
    });
    let sink = CloudSink::new(store(&server));
    let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();

    // Same day twice: the same blob is overwritten.
    for _ in 0..2 {
        let path = sink
            .write_cloud_on(&flatten(&bundle), "10000", date)
            .await
            .unwrap();
        assert_eq!(path, "jira/2025/01/02/10000/data.json");
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unreachable_store_is_an_upload_error() {
    let store = AzureBlobStore::new(&StorageConfig {
        account_name: "acme".into(),
        account_key: "c2VjcmV0LWtleQ==".into(),
        container: "jira-raw".into(),
        endpoint: Some("http://127.0.0.1:9".into()),
    })
    .unwrap();
    let bundle = ProjectBundle::empty(ProjectRef {
        id: "10000".into(),
        key: "ABC".into(),
        name: "Alpha".into(),
    });

    let err = CloudSink::new(store)
        .write_cloud(&flatten(&bundle), "10000")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PersistenceError::Upload {
            source: StoreError::Http(_),
            ..
        }
    ));
}
