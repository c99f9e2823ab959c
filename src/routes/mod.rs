/// Router Module Index
///
/// One router per resource. The API server merges `health`, `company` and
/// `store`; the function app serves `products` on its own listener.

/// `/api/v1/company` CRUD.
pub mod company;

/// `/api/v1/store` CRUD.
pub mod store;

/// `/api/products` endpoints of the function app.
pub mod products;

use axum::{Router, routing::get};

/// health_routes
///
/// Unauthenticated liveness probe shared by both servers.
pub fn health_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    // GET /health
    // Returns "ok" without touching the database.
    Router::new().route("/health", get(|| async { "ok" }))
}
