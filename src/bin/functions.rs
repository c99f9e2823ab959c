use quartile_api::{
    FunctionsState,
    config::AppConfig,
    create_functions_router,
    product_store::{PgProductStore, ProductStoreState},
    repository,
    shutdown::shutdown_signal,
    telemetry,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// main
///
/// Entry point of the product function app. Shares configuration, logging and
/// schema with the API server but talks to the `products` table directly.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let config = AppConfig::load()?;

    telemetry::init_tracing(config.env);
    tracing::info!("Function app starting in {:?} mode", config.env);

    let pool = repository::connect(&config).await.inspect_err(|err| {
        tracing::error!(error = %err, "failed to initialise Postgres, check DATABASE_URL");
    })?;
    let products = Arc::new(PgProductStore::new(pool)) as ProductStoreState;

    let shutdown = CancellationToken::new();
    let addr = config.functions_addr;
    let app = create_functions_router(FunctionsState::new(products, config, shutdown.clone()));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Function app listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    tracing::info!("Function app stopped");
    Ok(())
}
