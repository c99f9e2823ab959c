use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Company Router Module
///
/// Every route runs through the company validation pipelines before reaching
/// the business handlers in `crate::companies`.
pub fn company_routes() -> Router<AppState> {
    Router::new()
        // GET /api/v1/company
        // POST /api/v1/company
        // Listing never fails; creation answers 409 on a duplicate document number.
        .route(
            "/api/v1/company",
            get(handlers::list_companies).post(handlers::create_company),
        )
        // GET | PUT | DELETE /api/v1/company/{id}
        // A path id that is not a UUID is answered with 400 by the extractor.
        .route(
            "/api/v1/company/{id}",
            get(handlers::get_company)
                .put(handlers::update_company)
                .delete(handlers::delete_company),
        )
}
