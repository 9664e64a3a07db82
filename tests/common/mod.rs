#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use gcs_bq_loader::{
    application::ingestion_service::IngestionService,
    config::LoaderConfig,
    domain::{
        error::IngestionError,
        models::{DestinationTable, JobState, LoadJobConfig, LoadJobHandle, TableRef},
        ports::Warehouse,
    },
};

#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedJob {
    pub job_id: String,
    pub source_uri: String,
    pub destination: TableRef,
    pub config: LoadJobConfig,
}

/// Scripted warehouse that records every call made against it.
#[derive(Default)]
pub struct RecordingWarehouse {
    pub submitted: Mutex<Vec<SubmittedJob>>,
    pub polls: Mutex<u32>,
    pub table_reads: Mutex<Vec<TableRef>>,
    submit_error: Mutex<Option<String>>,
    states: Mutex<VecDeque<JobState>>,
    stall: Mutex<bool>,
    table_error: Mutex<Option<String>>,
    row_count: Mutex<u64>,
}

impl RecordingWarehouse {
    /// Jobs start `Running` and report each state in `states` on successive polls.
    pub fn with_states(states: Vec<JobState>) -> Arc<Self> {
        let warehouse = Self::default();
        *warehouse.states.lock().unwrap() = states.into();
        Arc::new(warehouse)
    }

    /// Jobs never leave `Running`.
    pub fn stalled() -> Arc<Self> {
        let warehouse = Self::default();
        *warehouse.stall.lock().unwrap() = true;
        Arc::new(warehouse)
    }

    pub fn rejecting(reason: &str) -> Arc<Self> {
        let warehouse = Self::default();
        *warehouse.submit_error.lock().unwrap() = Some(reason.to_string());
        Arc::new(warehouse)
    }

    pub fn set_row_count(&self, rows: u64) {
        *self.row_count.lock().unwrap() = rows;
    }

    pub fn fail_table_read(&self, reason: &str) {
        *self.table_error.lock().unwrap() = Some(reason.to_string());
    }

    pub fn submitted(&self) -> Vec<SubmittedJob> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn table_reads(&self) -> usize {
        self.table_reads.lock().unwrap().len()
    }

    pub fn polls(&self) -> u32 {
        *self.polls.lock().unwrap()
    }
}

#[async_trait]
impl Warehouse for RecordingWarehouse {
    async fn submit_load_job(
        &self,
        job_id: &str,
        source_uri: &str,
        destination: &TableRef,
        config: &LoadJobConfig,
    ) -> Result<LoadJobHandle, IngestionError> {
        self.submitted.lock().unwrap().push(SubmittedJob {
            job_id: job_id.to_string(),
            source_uri: source_uri.to_string(),
            destination: destination.clone(),
            config: config.clone(),
        });
        if let Some(reason) = self.submit_error.lock().unwrap().clone() {
            return Err(IngestionError::Submission(reason));
        }
        Ok(LoadJobHandle {
            job_id: job_id.to_string(),
            location: Some("US".to_string()),
            state: JobState::Running,
        })
    }

    async fn get_job(&self, handle: &LoadJobHandle) -> Result<LoadJobHandle, IngestionError> {
        *self.polls.lock().unwrap() += 1;
        let state = if *self.stall.lock().unwrap() {
            JobState::Running
        } else {
            self.states.lock().unwrap().pop_front().unwrap_or(JobState::Done)
        };
        Ok(LoadJobHandle {
            state,
            ..handle.clone()
        })
    }

    async fn get_table(&self, table: &TableRef) -> Result<DestinationTable, IngestionError> {
        self.table_reads.lock().unwrap().push(table.clone());
        if let Some(reason) = self.table_error.lock().unwrap().clone() {
            return Err(IngestionError::ReadBack(reason));
        }
        Ok(DestinationTable {
            table: table.clone(),
            row_count: *self.row_count.lock().unwrap(),
        })
    }
}

pub fn test_config() -> LoaderConfig {
    LoaderConfig {
        destination: TableRef::new("my-project", "portfolio_dataset", "user_data"),
        poll_interval_ms: 5,
        job_timeout_secs: 5,
        ..LoaderConfig::default()
    }
}

pub fn service(warehouse: Arc<RecordingWarehouse>, config: LoaderConfig) -> IngestionService {
    IngestionService::new(warehouse, config)
}
