use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Store Router Module
pub fn store_routes() -> Router<AppState> {
    Router::new()
        // GET /api/v1/store
        // POST /api/v1/store
        // Creation requires the referenced company to exist (404 otherwise).
        .route(
            "/api/v1/store",
            get(handlers::list_stores).post(handlers::create_store),
        )
        // GET | PUT | DELETE /api/v1/store/{id}
        .route(
            "/api/v1/store/{id}",
            get(handlers::get_store)
                .put(handlers::update_store)
                .delete(handlers::delete_store),
        )
}
