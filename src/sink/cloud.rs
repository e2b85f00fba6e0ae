use chrono::{NaiveDate, Utc};
use tracing::info;

use crate::aggregate::FlattenedRecord;
use crate::contract::ObjectStore;
use crate::error::PersistenceError;

/// Blob path for a project's table on `date`: `jira/YYYY/MM/DD/<project id>/data.json`.
pub fn blob_path(project_id: &str, date: NaiveDate) -> String {
    format!("jira/{}/{}/data.json", date.format("%Y/%m/%d"), project_id)
}

/// Uploads flattened tables to an [`ObjectStore`], one blob per project per day.
pub struct CloudSink<S> {
    store: S,
}

impl<S: ObjectStore> CloudSink<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Upload under today's (UTC) date. Returns the blob path written.
    pub async fn write_cloud(
        &self,
        record: &FlattenedRecord,
        project_id: &str,
    ) -> Result<String, PersistenceError> {
        self.write_cloud_on(record, project_id, Utc::now().date_naive())
            .await
    }

    /// Upload under an explicit date. A blob already at that path is replaced.
    pub async fn write_cloud_on(
        &self,
        record: &FlattenedRecord,
        project_id: &str,
        date: NaiveDate,
    ) -> Result<String, PersistenceError> {
        let path = blob_path(project_id, date);
        let content = record.to_json()?;
        let bytes = content.len();
        self.store
            .put_blob(&path, content)
            .await
            .map_err(|source| PersistenceError::Upload {
                path: path.clone(),
                source,
            })?;
        info!(
            project_id = %project_id,
            path = %path,
            rows = record.row_count,
            bytes,
            "Uploaded flattened project table"
        );
        Ok(path)
    }
}
