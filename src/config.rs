use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::{
    error::IngestionError,
    models::{LoadJobConfig, SourceFormat, TableRef, WriteDisposition},
};

/// Everything the handler needs that used to be hard-coded next to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub destination: TableRef,
    pub location: Option<String>,
    pub source_scheme: String,
    pub source_format: SourceFormat,
    pub skip_leading_rows: u32,
    pub write_disposition: WriteDisposition,
    pub autodetect: bool,
    pub job_id_prefix: String,
    pub poll_interval_ms: u64,
    /// `0` waits for as long as the warehouse keeps the job running.
    pub job_timeout_secs: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        let job = LoadJobConfig::default();
        Self {
            destination: TableRef::new("", "", ""),
            location: None,
            source_scheme: "gs".to_string(),
            source_format: job.source_format,
            skip_leading_rows: job.skip_leading_rows,
            write_disposition: job.write_disposition,
            autodetect: job.autodetect,
            job_id_prefix: "gcs_load_".to_string(),
            poll_interval_ms: 1000,
            job_timeout_secs: 3600,
        }
    }
}

impl LoaderConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, IngestionError> {
        serde_yaml::from_str(yaml).map_err(|e| IngestionError::Config(e.to_string()))
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, IngestionError> {
        let path = path.as_ref();
        debug!("Reading loader config from {}", path.display());
        let contents = std::fs::read_to_string(path)
            .map_err(|e| IngestionError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&contents)
    }

    /// Defaults, then the YAML file named by `LOADER_CONFIG`, then single-value
    /// environment overrides.
    pub fn from_env() -> Result<Self, IngestionError> {
        let base = match std::env::var("LOADER_CONFIG") {
            Ok(path) => {
                info!("Loading configuration file: {}", path);
                Self::from_yaml_file(path)?
            }
            Err(_) => Self::default(),
        };
        let config = base.with_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from `lookup`, which maps a variable name to a value.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, IngestionError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(project) = lookup("BQ_PROJECT_ID") {
            self.destination.project_id = project;
        }
        if let Some(dataset) = lookup("BQ_DATASET_ID") {
            self.destination.dataset_id = dataset;
        }
        if let Some(table) = lookup("BQ_TABLE_ID") {
            self.destination.table_id = table;
        }
        if let Some(location) = lookup("BQ_LOCATION") {
            self.location = Some(location).filter(|l| !l.is_empty());
        }
        if let Some(timeout) = lookup("LOADER_JOB_TIMEOUT_SECS") {
            self.job_timeout_secs = timeout.parse().map_err(|_| {
                IngestionError::Config(format!("LOADER_JOB_TIMEOUT_SECS is not a number: {}", timeout))
            })?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), IngestionError> {
        let table = &self.destination;
        for (field, value) in [
            ("project_id", &table.project_id),
            ("dataset_id", &table.dataset_id),
            ("table_id", &table.table_id),
        ] {
            if value.trim().is_empty() {
                return Err(IngestionError::Config(format!("destination.{} is not set", field)));
            }
        }
        if self.source_scheme.is_empty() {
            return Err(IngestionError::Config("source_scheme is empty".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(IngestionError::Config("poll_interval_ms must be positive".to_string()));
        }
        Ok(())
    }

    pub fn load_job_config(&self) -> LoadJobConfig {
        LoadJobConfig {
            source_format: self.source_format,
            skip_leading_rows: self.skip_leading_rows,
            write_disposition: self.write_disposition,
            autodetect: self.autodetect,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn job_timeout(&self) -> Option<Duration> {
        (self.job_timeout_secs > 0).then(|| Duration::from_secs(self.job_timeout_secs))
    }
}
