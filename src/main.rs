use std::process::ExitCode;

use jira_harvest::error::RunError;
use jira_harvest::load_config::load_config;
use jira_harvest::logging;
use jira_harvest::synchronise::synchronise;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[ERROR] Failed to load configuration: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    // Dropped on return so the file writer flushes.
    let _log_guard = match logging::init(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("[ERROR] Failed to initialise logging: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    config.trace_loaded();

    match synchronise(&config).await {
        Ok(report) => {
            for project in &report.projects {
                tracing::info!(
                    project_id = %project.project_id,
                    project_key = %project.project_key,
                    issues = project.issues,
                    local = %project.local,
                    cloud = %project.cloud,
                    "Project summary"
                );
            }
            ExitCode::SUCCESS
        }
        Err(e @ RunError::Auth(_)) => {
            tracing::error!(error = %e, "Harvest aborted");
            eprintln!("[ERROR] {e}");
            ExitCode::from(2)
        }
        Err(e) => {
            tracing::error!(error = %e, "Harvest could not start");
            eprintln!("[ERROR] {e}");
            ExitCode::FAILURE
        }
    }
}
