//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, PdfInvoiceRenderer},
    config::Config,
    error::ApiError,
    web::{self, state::AppState},
};
use dashboard_core::Dashboard;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DOCUMENT_HEADING: &str = "INVOICE";

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Build the Dashboard & Shared AppState ---
    let renderer = Arc::new(PdfInvoiceRenderer::new(
        DOCUMENT_HEADING,
        config.document_page_lines,
    ));
    let dashboard = Dashboard::new(db_adapter.clone(), renderer)
        .with_currency_suffix(config.currency_suffix.clone());

    let app_state = Arc::new(AppState {
        db: db_adapter,
        dashboard: Arc::new(dashboard),
        config: config.clone(),
    });

    // --- 4. Create the Web Router ---
    let app = web::router(app_state);

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
