use async_trait::async_trait;
use crate::domain::{
    error::IngestionError,
    models::{DestinationTable, LoadJobConfig, LoadJobHandle, TableRef},
};

#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Submits one load job. Errors here are `IngestionError::Submission`.
    async fn submit_load_job(
        &self,
        job_id: &str,
        source_uri: &str,
        destination: &TableRef,
        config: &LoadJobConfig,
    ) -> Result<LoadJobHandle, IngestionError>;

    /// Fetches the current state of a previously submitted job.
    async fn get_job(&self, handle: &LoadJobHandle) -> Result<LoadJobHandle, IngestionError>;

    /// Reads table metadata. Errors here are `IngestionError::ReadBack`.
    async fn get_table(&self, table: &TableRef) -> Result<DestinationTable, IngestionError>;
}
