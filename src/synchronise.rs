//! Run driver: authenticate, discover changed projects, then collect and persist
//! each project in turn.
//!
//! Projects are handled one at a time in discovery order. Nothing that goes wrong
//! inside a project leaves that project: collection failures degrade fields, and
//! each sink's outcome is recorded in the [`SynchroniseReport`] independently of
//! the other sink. Only an authentication failure ends the run.

use std::fmt;

use tracing::{error, info, warn};

use crate::aggregate::flatten;
use crate::collect::Collector;
use crate::config::Config;
use crate::contract::{ObjectStore, ProjectRef, TrackerClient};
use crate::error::RunError;
use crate::sink::{AzureBlobStore, CloudSink, LocalSink};
use crate::tracker::JiraClient;

/// What happened to one project in one sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkOutcome {
    /// File path or blob path written.
    Written { location: String },
    /// The sink is disabled for this run.
    Skipped,
    Failed { reason: String },
}

impl SinkOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, SinkOutcome::Failed { .. })
    }
}

impl fmt::Display for SinkOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkOutcome::Written { location } => write!(f, "written to {location}"),
            SinkOutcome::Skipped => f.write_str("skipped"),
            SinkOutcome::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectReport {
    pub project_id: String,
    pub project_key: String,
    /// Number of issue bundles collected.
    pub issues: usize,
    pub local: SinkOutcome,
    pub cloud: SinkOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynchroniseReport {
    pub projects: Vec<ProjectReport>,
}

impl SynchroniseReport {
    /// Projects for which at least one enabled sink failed.
    pub fn failed_projects(&self) -> usize {
        self.projects
            .iter()
            .filter(|p| p.local.is_failed() || p.cloud.is_failed())
            .count()
    }

    pub fn issues(&self) -> usize {
        self.projects.iter().map(|p| p.issues).sum()
    }
}

pub struct RunDriver<T, S> {
    collector: Collector<T>,
    local: Option<LocalSink>,
    cloud: Option<CloudSink<S>>,
}

impl<T: TrackerClient, S: ObjectStore> RunDriver<T, S> {
    pub fn new(
        collector: Collector<T>,
        local: Option<LocalSink>,
        cloud: Option<CloudSink<S>>,
    ) -> Self {
        Self {
            collector,
            local,
            cloud,
        }
    }

    /// Wire the driver from configuration. The sinks are enabled by the
    /// `local_save` and `cloud_save` flags; `store` is only used for the cloud sink.
    pub fn from_config(config: &Config, tracker: T, store: Option<S>) -> Self {
        let local = config
            .output
            .local_save
            .then(|| LocalSink::new(&config.output));
        let cloud = if config.output.cloud_save {
            if store.is_none() {
                warn!("Cloud saving is enabled but no object store was provided; cloud sink disabled");
            }
            store.map(CloudSink::new)
        } else {
            None
        };
        Self::new(Collector::new(tracker), local, cloud)
    }

    pub async fn run(&self) -> Result<SynchroniseReport, RunError> {
        info!(
            local_save = self.local.is_some(),
            cloud_save = self.cloud.is_some(),
            "Starting harvest run"
        );
        if let Err(e) = self.collector.authenticate().await {
            error!(error = %e, "Authentication failed; aborting run");
            return Err(e.into());
        }

        let projects = self.collector.discover_changed_projects().await;
        info!(count = projects.len(), "Discovered projects changed in the last day");

        let mut report = SynchroniseReport::default();
        for project in &projects {
            report.projects.push(self.harvest_project(project).await);
        }

        info!(
            projects = report.projects.len(),
            issues = report.issues(),
            failed = report.failed_projects(),
            "Harvest run complete"
        );
        Ok(report)
    }

    async fn harvest_project(&self, project: &ProjectRef) -> ProjectReport {
        info!(project_id = %project.id, project_key = %project.key, "Harvesting project");
        let bundle = self.collector.collect_project_bundle(project).await;

        let local = match &self.local {
            None => SinkOutcome::Skipped,
            Some(sink) => match sink.write_local(&bundle, &project.id) {
                Ok(path) => SinkOutcome::Written {
                    location: path.display().to_string(),
                },
                Err(e) => {
                    error!(project_id = %project.id, error = %e, "Local write failed");
                    SinkOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            },
        };

        let cloud = match &self.cloud {
            None => SinkOutcome::Skipped,
            Some(sink) => {
                let record = flatten(&bundle);
                match sink.write_cloud(&record, &project.id).await {
                    Ok(path) => SinkOutcome::Written { location: path },
                    Err(e) => {
                        error!(project_id = %project.id, error = %e, "Cloud upload failed");
                        SinkOutcome::Failed {
                            reason: e.to_string(),
                        }
                    }
                }
            }
        };

        ProjectReport {
            project_id: project.id.clone(),
            project_key: project.key.clone(),
            issues: bundle.issues.len(),
            local,
            cloud,
        }
    }
}

/// Build the HTTP clients from `config` and run one harvest.
pub async fn synchronise(config: &Config) -> Result<SynchroniseReport, RunError> {
    let tracker = JiraClient::new(&config.tracker).map_err(RunError::TrackerSetup)?;
    let store = match (&config.storage, config.output.cloud_save) {
        (Some(storage), true) => Some(AzureBlobStore::new(storage).map_err(RunError::StoreSetup)?),
        _ => None,
    };
    RunDriver::from_config(config, tracker, store).run().await
}
