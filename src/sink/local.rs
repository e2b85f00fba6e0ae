use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::info;

use crate::bundle::ProjectBundle;
use crate::config::OutputConfig;
use crate::error::PersistenceError;

/// Subdirectory of the save root holding one file per project.
const JIRA_DIR: &str = "jira";

/// Writes each project bundle to `<save_path>/jira/<project id>.json`.
pub struct LocalSink {
    root: PathBuf,
}

impl LocalSink {
    pub fn new(config: &OutputConfig) -> Self {
        Self {
            root: config.save_path.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn target_path(&self, project_id: &str) -> PathBuf {
        self.root.join(JIRA_DIR).join(format!("{project_id}.json"))
    }

    /// Serialize the bundle and write it, replacing any earlier file for the project.
    ///
    /// Nothing is written unless the whole bundle converts to plain data.
    pub fn write_local(
        &self,
        bundle: &ProjectBundle,
        project_id: &str,
    ) -> Result<PathBuf, PersistenceError> {
        let record = bundle.to_plain_record()?;
        let document = render_pretty(&record)?;

        let dir = self.root.join(JIRA_DIR);
        fs::create_dir_all(&dir).map_err(|source| PersistenceError::Io {
            path: dir.clone(),
            source,
        })?;
        let path = self.target_path(project_id);
        fs::write(&path, document).map_err(|source| PersistenceError::Io {
            path: path.clone(),
            source,
        })?;

        info!(
            project_id = %project_id,
            path = %path.display(),
            issues = bundle.issues.len(),
            "Wrote project bundle to local file"
        );
        Ok(path)
    }
}

/// Four-space indented JSON; non-ASCII characters are written as-is.
fn render_pretty(value: &serde_json::Value) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)?;
    Ok(buf)
}
