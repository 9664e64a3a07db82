//! JSON shapes of the BigQuery REST resources this crate touches.
//!
//! Requests are built here and converted into the client's model types with
//! `serde_json`, so only the fields we set travel on the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::models::{JobState, LoadJobConfig, SourceFormat, TableRef};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadJobRequest {
    pub job_reference: JobReference,
    pub configuration: JobConfiguration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReference {
    pub project_id: Option<String>,
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JobConfiguration {
    pub load: LoadConfiguration,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadConfiguration {
    pub source_uris: Vec<String>,
    pub source_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_leading_rows: Option<u32>,
    pub destination_table: TableReference,
    pub write_disposition: String,
    pub autodetect: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableReference {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
}

impl LoadJobRequest {
    pub fn new(
        project_id: &str,
        job_id: &str,
        location: Option<&str>,
        source_uri: &str,
        destination: &TableRef,
        config: &LoadJobConfig,
    ) -> Self {
        // The warehouse rejects skipLeadingRows for non-CSV sources.
        let skip_leading_rows =
            (config.source_format == SourceFormat::Csv).then_some(config.skip_leading_rows);
        Self {
            job_reference: JobReference {
                project_id: Some(project_id.to_string()),
                job_id: Some(job_id.to_string()),
                location: location.map(str::to_string),
            },
            configuration: JobConfiguration {
                load: LoadConfiguration {
                    source_uris: vec![source_uri.to_string()],
                    source_format: config.source_format.as_wire().to_string(),
                    skip_leading_rows,
                    destination_table: TableReference {
                        project_id: destination.project_id.clone(),
                        dataset_id: destination.dataset_id.clone(),
                        table_id: destination.table_id.clone(),
                    },
                    write_disposition: config.write_disposition.as_wire().to_string(),
                    autodetect: config.autodetect,
                },
            },
        }
    }
}

/// The parts of a `Job` resource we read back.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub job_reference: Option<JobReference>,
    pub status: Option<JobStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub state: Option<String>,
    pub error_result: Option<ErrorProto>,
    #[serde(default)]
    pub errors: Vec<ErrorProto>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ErrorProto {
    pub reason: Option<String>,
    pub message: Option<String>,
    pub location: Option<String>,
}

impl ErrorProto {
    fn describe(&self) -> String {
        let mut out = self.message.clone().unwrap_or_else(|| "unknown error".to_string());
        if let Some(reason) = &self.reason {
            out = format!("{} ({})", out, reason);
        }
        if let Some(location) = &self.location {
            out = format!("{} at {}", out, location);
        }
        out
    }
}

impl JobSnapshot {
    /// `errorResult` is set only when the job failed; `errors` alone on a
    /// DONE job are row-level warnings.
    pub fn state(&self) -> JobState {
        let Some(status) = &self.status else {
            return JobState::Pending;
        };
        if let Some(error) = &status.error_result {
            let mut reason = error.describe();
            let extra = status.errors.len().saturating_sub(1);
            if extra > 0 {
                reason = format!("{}; {} more error(s)", reason, extra);
            }
            return JobState::Failed(reason);
        }
        match status.state.as_deref() {
            Some("DONE") => JobState::Done,
            Some("RUNNING") => JobState::Running,
            _ => JobState::Pending,
        }
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job_reference.as_ref()?.job_id.as_deref()
    }

    pub fn location(&self) -> Option<&str> {
        self.job_reference.as_ref()?.location.as_deref()
    }
}

/// `numRows` is an int64 encoded as a string on the wire.
pub fn row_count(table: &Value) -> Option<u64> {
    match table.get("numRows")? {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}
