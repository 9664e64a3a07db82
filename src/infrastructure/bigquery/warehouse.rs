use async_trait::async_trait;
use gcp_bigquery_client::{model::job::Job, Client};
use tracing::{debug, error, info, warn};

use crate::domain::{
    error::IngestionError,
    models::{DestinationTable, JobState, LoadJobConfig, LoadJobHandle, TableRef},
    ports::Warehouse,
};
use crate::infrastructure::bigquery::wire::{self, JobSnapshot, LoadJobRequest};

pub struct BigQueryWarehouse {
    client: Client,
    project_id: String,
    location: Option<String>,
}

impl BigQueryWarehouse {
    pub fn new(client: Client, project_id: String, location: Option<String>) -> Self {
        debug!("Initializing BigQuery warehouse for project: {}", project_id);
        Self {
            client,
            project_id,
            location,
        }
    }

    /// Uses application default credentials: `GOOGLE_APPLICATION_CREDENTIALS`,
    /// gcloud user credentials, or the metadata server.
    pub async fn from_application_default_credentials(
        project_id: String,
        location: Option<String>,
    ) -> Result<Self, IngestionError> {
        let client = Client::from_application_default_credentials()
            .await
            .map_err(|e| IngestionError::Config(format!("BigQuery credentials: {}", e)))?;
        Ok(Self::new(client, project_id, location))
    }

    pub async fn from_service_account_key_file(
        key_file: &str,
        project_id: String,
        location: Option<String>,
    ) -> Result<Self, IngestionError> {
        info!("Using service account key file: {}", key_file);
        let client = Client::from_service_account_key_file(key_file)
            .await
            .map_err(|e| IngestionError::Config(format!("BigQuery credentials: {}", e)))?;
        Ok(Self::new(client, project_id, location))
    }

    fn snapshot(job: &Job) -> Result<JobSnapshot, IngestionError> {
        serde_json::to_value(job)
            .and_then(serde_json::from_value)
            .map_err(|e| IngestionError::Warehouse(format!("unreadable job resource: {}", e)))
    }

    fn handle_from(job: &Job, fallback: &LoadJobHandle) -> Result<LoadJobHandle, IngestionError> {
        let snapshot = Self::snapshot(job)?;
        Ok(LoadJobHandle {
            job_id: snapshot.job_id().unwrap_or(&fallback.job_id).to_string(),
            location: snapshot
                .location()
                .map(str::to_string)
                .or_else(|| fallback.location.clone()),
            state: snapshot.state(),
        })
    }
}

#[async_trait]
impl Warehouse for BigQueryWarehouse {
    async fn submit_load_job(
        &self,
        job_id: &str,
        source_uri: &str,
        destination: &TableRef,
        config: &LoadJobConfig,
    ) -> Result<LoadJobHandle, IngestionError> {
        let request = LoadJobRequest::new(
            &self.project_id,
            job_id,
            self.location.as_deref(),
            source_uri,
            destination,
            config,
        );
        debug!("Load job request: {:?}", request);

        let job: Job = serde_json::to_value(&request)
            .and_then(serde_json::from_value)
            .map_err(|e| IngestionError::Submission(format!("cannot build job resource: {}", e)))?;

        let inserted = self
            .client
            .job()
            .insert(&self.project_id, job)
            .await
            .map_err(|e| {
                error!("jobs.insert failed for {}: {}", job_id, e);
                IngestionError::Submission(e.to_string())
            })?;

        let requested = LoadJobHandle {
            job_id: job_id.to_string(),
            location: self.location.clone(),
            state: JobState::Pending,
        };
        let handle = Self::handle_from(&inserted, &requested)?;
        debug!("Inserted job {} in state {:?}", handle.job_id, handle.state);
        Ok(handle)
    }

    async fn get_job(&self, handle: &LoadJobHandle) -> Result<LoadJobHandle, IngestionError> {
        let job = self
            .client
            .job()
            .get_job(&self.project_id, &handle.job_id, handle.location.as_deref())
            .await
            .map_err(|e| {
                error!("jobs.get failed for {}: {}", handle.job_id, e);
                IngestionError::Warehouse(e.to_string())
            })?;
        Self::handle_from(&job, handle)
    }

    async fn get_table(&self, table: &TableRef) -> Result<DestinationTable, IngestionError> {
        debug!("Fetching table metadata: {}", table);
        let metadata = self
            .client
            .table()
            .get(&table.project_id, &table.dataset_id, &table.table_id, None)
            .await
            .map_err(|e| IngestionError::ReadBack(e.to_string()))?;

        let value = serde_json::to_value(&metadata)
            .map_err(|e| IngestionError::ReadBack(format!("unreadable table resource: {}", e)))?;
        let row_count = wire::row_count(&value).unwrap_or_else(|| {
            warn!("Table {} reported no numRows; reporting 0", table);
            0
        });

        Ok(DestinationTable {
            table: table.clone(),
            row_count,
        })
    }
}
