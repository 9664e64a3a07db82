use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of the object that triggered an invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionEvent {
    pub bucket: String,
    pub name: String,
    pub generation: Option<String>,
    pub size: Option<u64>,
    pub content_type: Option<String>,
}

impl IngestionEvent {
    pub fn new(bucket: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            name: name.into(),
            generation: None,
            size: None,
            content_type: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceFormat {
    #[serde(rename = "CSV")]
    Csv,
    #[serde(rename = "NEWLINE_DELIMITED_JSON", alias = "JSON")]
    Json,
    #[serde(rename = "AVRO")]
    Avro,
    #[serde(rename = "PARQUET")]
    Parquet,
}

impl SourceFormat {
    /// Name the warehouse API expects in `sourceFormat`.
    pub fn as_wire(&self) -> &'static str {
        match self {
            SourceFormat::Csv => "CSV",
            SourceFormat::Json => "NEWLINE_DELIMITED_JSON",
            SourceFormat::Avro => "AVRO",
            SourceFormat::Parquet => "PARQUET",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteDisposition {
    #[serde(rename = "WRITE_APPEND")]
    Append,
    #[serde(rename = "WRITE_TRUNCATE")]
    Truncate,
    #[serde(rename = "WRITE_EMPTY")]
    Empty,
}

impl WriteDisposition {
    pub fn as_wire(&self) -> &'static str {
        match self {
            WriteDisposition::Append => "WRITE_APPEND",
            WriteDisposition::Truncate => "WRITE_TRUNCATE",
            WriteDisposition::Empty => "WRITE_EMPTY",
        }
    }
}

/// Per-invocation load settings. `skip_leading_rows` only applies to CSV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadJobConfig {
    pub source_format: SourceFormat,
    pub skip_leading_rows: u32,
    pub write_disposition: WriteDisposition,
    pub autodetect: bool,
}

impl Default for LoadJobConfig {
    fn default() -> Self {
        Self {
            source_format: SourceFormat::Csv,
            skip_leading_rows: 1,
            write_disposition: WriteDisposition::Append,
            autodetect: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
}

impl TableRef {
    pub fn new(
        project_id: impl Into<String>,
        dataset_id: impl Into<String>,
        table_id: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            dataset_id: dataset_id.into(),
            table_id: table_id.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project_id, self.dataset_id, self.table_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Done,
    /// Terminal failure carrying the service's error detail.
    Failed(String),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed(_))
    }
}

/// A job submitted to the warehouse. The warehouse owns it; we only poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadJobHandle {
    pub job_id: String,
    pub location: Option<String>,
    pub state: JobState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationTable {
    pub table: TableRef,
    pub row_count: u64,
}

/// What a successful invocation reports back to the runtime.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub job_id: String,
    pub source_uri: String,
    pub destination: String,
    pub row_count: u64,
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
    pub finished_at: DateTime<Utc>,
}

mod duration_millis {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_ref_displays_dotted() {
        let table = TableRef::new("proj", "ds", "tbl");
        assert_eq!(table.to_string(), "proj.ds.tbl");
    }

    #[test]
    fn default_job_config_is_csv_with_one_header_row() {
        let config = LoadJobConfig::default();
        assert_eq!(config.source_format, SourceFormat::Csv);
        assert_eq!(config.skip_leading_rows, 1);
        assert_eq!(config.write_disposition, WriteDisposition::Append);
        assert!(!config.autodetect);
    }

    #[test]
    fn only_done_and_failed_are_terminal() {
        assert!(!JobState::Pending.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::Done.is_terminal());
        assert!(JobState::Failed("boom".into()).is_terminal());
    }

    #[test]
    fn source_format_accepts_short_json_alias() {
        let format: SourceFormat = serde_yaml::from_str("JSON").unwrap();
        assert_eq!(format, SourceFormat::Json);
        assert_eq!(format.as_wire(), "NEWLINE_DELIMITED_JSON");
    }
}
