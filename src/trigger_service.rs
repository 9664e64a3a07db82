use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::{
    application::ingestion_service::IngestionService,
    config::LoaderConfig,
    domain::{error::IngestionError, models::LoadReport},
    infrastructure::{bigquery::warehouse::BigQueryWarehouse, event_decoder::decode_event},
};

/// HTTP face of the handler: the invocation runtime POSTs one storage
/// notification per request and reads retry intent from the status code.
pub struct TriggerService {
    service: Arc<IngestionService>,
}

impl TriggerService {
    pub fn new(service: Arc<IngestionService>) -> Self {
        Self { service }
    }

    /// Builds the service from the environment and application default credentials.
    pub async fn from_env() -> Result<Self, IngestionError> {
        debug!("Initializing trigger service");
        let config = LoaderConfig::from_env()?;
        info!(
            "Destination table: {}, job location: {:?}, timeout: {:?}",
            config.destination,
            config.location,
            config.job_timeout()
        );

        let project_id = config.destination.project_id.clone();
        let location = config.location.clone();
        let warehouse = match std::env::var("BQ_SERVICE_ACCOUNT_KEY") {
            Ok(key_file) => {
                BigQueryWarehouse::from_service_account_key_file(&key_file, project_id, location).await?
            }
            Err(_) => {
                debug!("Using application default credentials");
                BigQueryWarehouse::from_application_default_credentials(project_id, location).await?
            }
        };
        debug!("BigQuery client initialized");

        let service = IngestionService::new(Arc::new(warehouse), config);
        Ok(Self::new(Arc::new(service)))
    }

    pub fn router(&self) -> Router {
        router(self.service.clone())
    }

    pub async fn run(&self, addr: SocketAddr) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            error!("Failed to bind {}: {}", addr, e);
            e
        })?;
        info!("Listening for storage events on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("Trigger service stopped");
        Ok(())
    }
}

pub fn router(service: Arc<IngestionService>) -> Router {
    Router::new()
        .route("/", post(receive_event))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(service)
}

async fn receive_event(State(service): State<Arc<IngestionService>>, body: Bytes) -> Response {
    match process_message(&service, &body).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) if e.is_input_error() => {
            // Redelivering a malformed event cannot succeed.
            warn!("Rejecting event: {}", e);
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn process_message(service: &IngestionService, body: &[u8]) -> Result<LoadReport, IngestionError> {
    debug!("Received event body of {} bytes", body.len());
    let event = decode_event(body)?;
    info!("Processing file: {}://{}/{}", service.config().source_scheme, event.bucket, event.name);

    let report = service.handle(event).await.map_err(|e| {
        error!("Failed to load file: {}", e);
        e
    })?;
    info!("Successfully processed file: {}", report.source_uri);
    Ok(report)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
