mod auth;
mod chat;
mod config;
mod db;
mod errors;
mod expenses;
mod extraction;
mod llm_client;
mod messages;
mod models;
mod routes;
mod state;
#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use axum::extract::DefaultBodyLimit;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::JwtVerifier;
use crate::chat::image::S3ImageStore;
use crate::chat::{ChatService, Deadlines};
use crate::config::Config;
use crate::db::create_pool;
use crate::expenses::repository::PgExpenseRepository;
use crate::extraction::LlmExtractionGateway;
use crate::llm_client::LlmClient;
use crate::messages::ledger::PgMessageLedger;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting MoneyTalks API v{}", env!("CARGO_PKG_VERSION"));

    let db = create_pool(&config.database_url, config.repository_timeout).await?;

    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    let llm = LlmClient::new(&config.llm)?;
    info!("LLM client initialized (model: {})", llm.model());

    let expenses = Arc::new(PgExpenseRepository::new(db.clone()));
    let ledger = Arc::new(PgMessageLedger::new(db));
    let images = Arc::new(S3ImageStore::new(
        s3,
        config.s3_bucket.clone(),
        config.s3_public_url.clone(),
    ));

    let chat = ChatService::new(
        Arc::new(LlmExtractionGateway::new(llm)),
        expenses.clone(),
        ledger.clone(),
        images,
        Deadlines {
            gateway: config.extraction_timeout,
            repository: config.repository_timeout,
        },
    )
    .with_image_policy(config.image_amount_policy);

    let state = AppState {
        chat,
        expenses,
        ledger,
        jwt: JwtVerifier::new(&config.jwt_secret),
    };

    let app = build_router(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_upload_bytes))
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
        "moneytalks-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
