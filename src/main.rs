use quartile_api::{
    AppState,
    config::AppConfig,
    create_router,
    repository::{self, DatabaseState, PostgresDatabase},
    shutdown::shutdown_signal,
    telemetry,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// main
///
/// Entry point of the layered CRUD API: configuration, logging, database,
/// then the HTTP server with graceful shutdown.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Configuration (fail fast on missing or invalid values)
    dotenv::dotenv().ok();
    let config = AppConfig::load()?;

    // 2. Logging
    telemetry::init_tracing(config.env);
    tracing::info!("API starting in {:?} mode", config.env);

    // 3. Database
    let pool = repository::connect(&config).await.inspect_err(|err| {
        tracing::error!(error = %err, "failed to initialise Postgres, check DATABASE_URL");
    })?;
    let db = Arc::new(PostgresDatabase::new(pool)) as DatabaseState;

    // 4. State and router
    let shutdown = CancellationToken::new();
    let addr = config.api_addr;
    let app = create_router(AppState::new(db, config, shutdown.clone()));

    // 5. Server
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on {addr}");
    tracing::info!("API Documentation (Swagger UI) available at: http://{addr}/swagger-ui");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    tracing::info!("API stopped");
    Ok(())
}
