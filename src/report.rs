use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use anyhow::{Result, Context as AnyhowContext};
use chrono::{SecondsFormat, Utc};
use serde::{Serialize, Deserialize};
use serde_json::json;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failure,
}

/// One line of the run log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
    pub workspace: String,
    pub dataflow: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataflow_uuid: Option<String>,
    pub status: RunStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Append-only JSONL log of one migration run, plus the end-of-run summary.
pub struct RunLog {
    dir: PathBuf,
    file: PathBuf,
    succeeded: Vec<RunRecord>,
    failed: Vec<RunRecord>,
}

impl RunLog {
    /// Creates `dir` if needed; the log file is `nifi-migration-<epoch ms>.jsonl` inside it.
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create log dir {}", dir.display()))?;
        let file = dir.join(format!("nifi-migration-{}.jsonl", Utc::now().timestamp_millis()));
        Ok(Self {
            dir: dir.to_path_buf(),
            file,
            succeeded: Vec::new(),
            failed: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.file
    }

    pub fn succeeded(&self) -> &[RunRecord] {
        &self.succeeded
    }

    pub fn failed(&self) -> &[RunRecord] {
        &self.failed
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn log_success(&mut self, workspace: &str, dataflow: Option<&str>, dataflow_uuid: Option<&str>, message: &str) {
        let record = record(workspace, dataflow, dataflow_uuid, RunStatus::Success, message, None);
        self.append(&record);
        self.succeeded.push(RunRecord { ts: None, ..record });
    }

    pub fn log_failure(
        &mut self,
        workspace: &str,
        dataflow: Option<&str>,
        dataflow_uuid: Option<&str>,
        message: &str,
        cause: Option<&anyhow::Error>,
    ) {
        let cause = cause.map(|e| format!("{:#}", e));
        let record = record(workspace, dataflow, dataflow_uuid, RunStatus::Failure, message, cause);
        self.append(&record);
        self.failed.push(RunRecord { ts: None, ..record });
    }

    fn append(&self, record: &RunRecord) {
        let written = serde_json::to_string(record)
            .map_err(anyhow::Error::from)
            .and_then(|line| {
                let mut file = OpenOptions::new().create(true).append(true).open(&self.file)?;
                writeln!(file, "{}", line)?;
                Ok(())
            });
        if let Err(e) = written {
            error!(path = %self.file.display(), error = %e, "Unable to persist run record");
        }
    }

    /// Writes `nifi-migration-summary-<epoch ms>.json` next to the log and returns its path.
    pub fn write_summary(&self) -> Result<PathBuf> {
        let summary = json!({
            "succeeded": self.succeeded,
            "failed": self.failed,
            "logFile": self.file.display().to_string(),
            "summary": {
                "totalSucceeded": self.succeeded.len(),
                "totalFailed": self.failed.len(),
            },
        });
        let path = self
            .dir
            .join(format!("nifi-migration-summary-{}.json", Utc::now().timestamp_millis()));
        let content = serde_json::to_string_pretty(&summary)?;
        fs::write(&path, content).with_context(|| format!("Failed to write summary {}", path.display()))?;
        info!(path = %path.display(), "Migration summary written");
        Ok(path)
    }
}

fn record(
    workspace: &str,
    dataflow: Option<&str>,
    dataflow_uuid: Option<&str>,
    status: RunStatus,
    message: &str,
    error: Option<String>,
) -> RunRecord {
    RunRecord {
        ts: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        workspace: workspace.to_string(),
        dataflow: dataflow.map(str::to_string),
        dataflow_uuid: dataflow_uuid.map(str::to_string),
        status,
        message: message.to_string(),
        error,
    }
}
