use crate::{FunctionsState, functions};
use axum::{Router, routing::get};

/// Products Router Module
///
/// The function app surface. Static segments (`json`, `list`) take precedence
/// over the `{id}` capture.
pub fn product_routes() -> Router<FunctionsState> {
    Router::new()
        // GET /api/products?companyId=&storeId=
        // POST /api/products (201 on success)
        .route(
            "/api/products",
            get(functions::get_products).post(functions::create_product),
        )
        // GET /api/products/json
        // The array is rendered by `get_products_json` in the database.
        .route("/api/products/json", get(functions::get_products_json))
        // GET /api/products/list
        // text/plain, one line per product.
        .route("/api/products/list", get(functions::get_products_list))
        // GET | PUT | DELETE /api/products/{id}
        .route(
            "/api/products/{id}",
            get(functions::get_product)
                .put(functions::update_product)
                .delete(functions::delete_product),
        )
}
