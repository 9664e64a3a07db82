use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::LoaderConfig;
use crate::domain::{
    error::IngestionError,
    models::{IngestionEvent, JobState, LoadJobHandle, LoadReport},
    ports::Warehouse,
};

/// Loads one landed object into the configured destination table per call.
///
/// Every call submits a fresh job: redelivered events load their rows again.
pub struct IngestionService {
    warehouse: Arc<dyn Warehouse>,
    config: LoaderConfig,
}

impl IngestionService {
    pub fn new(warehouse: Arc<dyn Warehouse>, config: LoaderConfig) -> Self {
        Self { warehouse, config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub async fn handle(&self, event: IngestionEvent) -> Result<LoadReport, IngestionError> {
        let started = Instant::now();
        debug!("Handling event for bucket: {}, object: {}", event.bucket, event.name);
        if let Some(size) = event.size {
            debug!("Object size: {} bytes, generation: {:?}", size, event.generation);
        }

        // Step 1: Validate the event
        validate_event(&event)?;

        // Step 2: Build the source location
        let source_uri = self.source_uri(&event);
        debug!("Step 2: Source URI: {}", source_uri);

        // Step 3: Build the job configuration
        let job_config = self.config.load_job_config();
        debug!(
            "Step 3: Job config - format: {}, skip_leading_rows: {}, write_disposition: {}",
            job_config.source_format.as_wire(),
            job_config.skip_leading_rows,
            job_config.write_disposition.as_wire()
        );

        // Step 4: Submit the load job
        let destination = &self.config.destination;
        let job_id = self.next_job_id();
        let handle = self
            .warehouse
            .submit_load_job(&job_id, &source_uri, destination, &job_config)
            .await
            .map_err(|e| {
                error!("Failed to submit load job for {}: {}", source_uri, e);
                e
            })?;
        info!(
            job_id = %handle.job_id,
            source_uri = %source_uri,
            destination = %destination,
            "Starting job {}", handle.job_id
        );

        // Step 5: Wait for a terminal state
        let finished = self.wait_for_completion(handle).await.map_err(|e| {
            error!("Load job for {} did not complete: {}", source_uri, e);
            e
        })?;
        debug!("Step 5: Job {} finished", finished.job_id);

        // Step 6: Read back the row count
        let table = self.warehouse.get_table(destination).await.map_err(|e| {
            error!("Failed to read destination table {}: {}", destination, e);
            e
        })?;

        let elapsed = started.elapsed();
        info!(
            job_id = %finished.job_id,
            row_count = table.row_count,
            elapsed_ms = elapsed.as_millis() as u64,
            "Loaded {} rows into {}", table.row_count, table.table
        );

        Ok(LoadReport {
            job_id: finished.job_id,
            source_uri,
            destination: table.table.to_string(),
            row_count: table.row_count,
            elapsed,
            finished_at: Utc::now(),
        })
    }

    /// `scheme://bucket/name`, taken verbatim from the event.
    pub fn source_uri(&self, event: &IngestionEvent) -> String {
        format!("{}://{}/{}", self.config.source_scheme, event.bucket, event.name)
    }

    fn next_job_id(&self) -> String {
        format!("{}{}", self.config.job_id_prefix, Uuid::new_v4().simple())
    }

    async fn wait_for_completion(&self, handle: LoadJobHandle) -> Result<LoadJobHandle, IngestionError> {
        let job_id = handle.job_id.clone();
        let finished = match self.config.job_timeout() {
            Some(limit) => tokio::time::timeout(limit, self.poll_until_terminal(handle))
                .await
                .map_err(|_| {
                    warn!("Job {} exceeded {:?}; it keeps running in the warehouse", job_id, limit);
                    IngestionError::Timeout {
                        job_id: job_id.clone(),
                        waited: limit,
                    }
                })??,
            None => self.poll_until_terminal(handle).await?,
        };

        match finished.state {
            JobState::Done => Ok(finished),
            JobState::Failed(reason) => Err(IngestionError::JobFailed { job_id, reason }),
            state => Err(IngestionError::Warehouse(format!(
                "job {} left polling in non-terminal state {:?}",
                job_id, state
            ))),
        }
    }

    async fn poll_until_terminal(&self, mut handle: LoadJobHandle) -> Result<LoadJobHandle, IngestionError> {
        let interval = self.config.poll_interval();
        let mut polls = 0u32;
        while !handle.state.is_terminal() {
            tokio::time::sleep(interval).await;
            handle = self.warehouse.get_job(&handle).await?;
            polls += 1;
            debug!("Poll {} for job {}: {:?}", polls, handle.job_id, handle.state);
        }
        Ok(handle)
    }
}

fn validate_event(event: &IngestionEvent) -> Result<(), IngestionError> {
    if event.bucket.trim().is_empty() {
        warn!("Event is missing a bucket name");
        return Err(IngestionError::InvalidEvent("bucket is empty".to_string()));
    }
    if event.name.is_empty() {
        warn!("Event for bucket {} is missing an object name", event.bucket);
        return Err(IngestionError::InvalidEvent("name is empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::TableRef;

    fn service_with_scheme(scheme: &str) -> IngestionService {
        struct Unreachable;

        #[async_trait::async_trait]
        impl Warehouse for Unreachable {
            async fn submit_load_job(
                &self,
                _: &str,
                _: &str,
                _: &TableRef,
                _: &crate::domain::models::LoadJobConfig,
            ) -> Result<LoadJobHandle, IngestionError> {
                unreachable!()
            }
            async fn get_job(&self, _: &LoadJobHandle) -> Result<LoadJobHandle, IngestionError> {
                unreachable!()
            }
            async fn get_table(
                &self,
                _: &TableRef,
            ) -> Result<crate::domain::models::DestinationTable, IngestionError> {
                unreachable!()
            }
        }

        let config = LoaderConfig {
            source_scheme: scheme.to_string(),
            ..LoaderConfig::default()
        };
        IngestionService::new(Arc::new(Unreachable), config)
    }

    #[test]
    fn source_uri_keeps_object_name_verbatim() {
        let service = service_with_scheme("gs");
        let event = IngestionEvent::new("b1", "incoming/2024 report%20.csv");
        assert_eq!(service.source_uri(&event), "gs://b1/incoming/2024 report%20.csv");
    }

    #[test]
    fn source_uri_uses_configured_scheme() {
        let service = service_with_scheme("s3");
        assert_eq!(service.source_uri(&IngestionEvent::new("b", "f.csv")), "s3://b/f.csv");
    }

    #[test]
    fn job_ids_carry_prefix_and_differ() {
        let service = service_with_scheme("gs");
        let first = service.next_job_id();
        let second = service.next_job_id();
        assert!(first.starts_with("gcs_load_"));
        assert_ne!(first, second);
    }

    #[test]
    fn empty_fields_are_rejected() {
        assert!(validate_event(&IngestionEvent::new("", "f.csv")).unwrap_err().is_input_error());
        assert!(validate_event(&IngestionEvent::new("b", "")).unwrap_err().is_input_error());
        assert!(validate_event(&IngestionEvent::new("b", "f.csv")).is_ok());
    }
}
