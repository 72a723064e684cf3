mod analysis;
mod config;
mod db;
mod errors;
mod ingestion;
mod jobs;
mod llm_client;
mod models;
mod routes;
mod state;
mod storage;

#[cfg(test)]
mod testing;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::StructuredAnalysisClient;
use crate::config::Config;
use crate::db::create_pool;
use crate::jobs::orchestrator::Orchestrator;
use crate::jobs::store::{JobStore, PgJobStore};
use crate::jobs::sweeper::spawn_sweeper;
use crate::llm_client::GeminiClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{ObjectStore, S3ObjectStore};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CV analysis API v{}", env!("CARGO_PKG_VERSION"));

    // PostgreSQL (migrations run inside create_pool)
    let db = create_pool(&config.database_url).await?;
    let jobs: Arc<dyn JobStore> = Arc::new(PgJobStore::new(db));

    // S3 / MinIO
    let s3 = build_s3_client(&config).await;
    let storage: Arc<dyn ObjectStore> = Arc::new(S3ObjectStore::new(s3, config.s3_bucket.clone()));
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    let llm = GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        Duration::from_secs(config.llm_timeout_secs),
    )?;
    info!("LLM client initialized (model: {})", llm.model());

    let orchestrator = Orchestrator::new(
        storage.clone(),
        jobs.clone(),
        StructuredAnalysisClient::new(Arc::new(llm)),
    );

    spawn_sweeper(
        jobs.clone(),
        chrono::Duration::minutes(config.stale_job_minutes),
        Duration::from_secs(config.sweep_interval_secs),
    );

    let state = AppState {
        config: config.clone(),
        storage,
        jobs,
        orchestrator,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "cv-analysis-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    // MinIO serves buckets by path, not by virtual host.
    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(s3_config)
}
