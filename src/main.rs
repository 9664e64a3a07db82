use std::net::SocketAddr;

use gcs_bq_loader::trigger_service::TriggerService;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("gcs_bq_loader=debug".parse()?)
                .add_directive("hyper=warn".parse()?),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    info!("Starting storage-to-warehouse loader");
    debug!(
        "Environment variables: LOADER_CONFIG={}, BQ_PROJECT_ID={}, PORT={}",
        std::env::var("LOADER_CONFIG").unwrap_or_else(|_| "not set".to_string()),
        std::env::var("BQ_PROJECT_ID").unwrap_or_else(|_| "not set".to_string()),
        std::env::var("PORT").unwrap_or_else(|_| "not set".to_string())
    );

    let port: u16 = std::env::var("PORT")
        .ok()
        .map(|p| p.parse())
        .transpose()?
        .unwrap_or(8080);

    let service = TriggerService::from_env().await?;
    info!("Trigger service initialized successfully");

    service.run(SocketAddr::from(([0, 0, 0, 0], port))).await
}
