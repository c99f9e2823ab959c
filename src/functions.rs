use crate::{
    error::AppError,
    extract::{ApiJson, ApiPath, ApiQuery},
    models::{
        DeleteProductCommand, GetProductByIdQuery, Product, ProductFilter, ProductRequest,
        ProductScope, UpdateProductCommand,
    },
    product_store::ProductStoreState,
    products::{self, ProductPipelines},
    result::{ApiResult, NotificationBody},
};
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

// --- Function App Handlers ---

/// get_products
///
/// Lists products, optionally narrowed by `companyId` and/or `storeId`.
/// Filter values that are not UUIDs are ignored.
#[utoipa::path(
    get,
    path = "/api/products",
    tag = "products",
    params(ProductFilter),
    responses((status = 200, description = "Products", body = [Product]))
)]
pub async fn get_products(
    State(store): State<ProductStoreState>,
    ApiQuery(filter): ApiQuery<ProductFilter>,
) -> Result<ApiResult<Vec<Product>>, AppError> {
    tracing::info!(?filter, "get products");
    products::get_all(store.as_ref(), ProductScope::from(&filter)).await
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    tag = "products",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product", body = Product),
        (status = 400, description = "Malformed id", body = NotificationBody),
        (status = 404, description = "Not found", body = NotificationBody)
    )
)]
pub async fn get_product(
    State(store): State<ProductStoreState>,
    State(pipelines): State<Arc<ProductPipelines>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiResult<Product>, AppError> {
    pipelines
        .get_by_id
        .dispatch(GetProductByIdQuery { id }, |q| {
            products::get_by_id(store.as_ref(), q)
        })
        .await
}

/// create_product
///
/// Answers 201 with the stored product. `companyId` may be omitted; it is then
/// taken from the store.
#[utoipa::path(
    post,
    path = "/api/products",
    tag = "products",
    request_body = ProductRequest,
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 400, description = "Validation failed", body = NotificationBody),
        (status = 404, description = "Store not found", body = NotificationBody),
        (status = 409, description = "SKU already used in the company", body = NotificationBody)
    )
)]
pub async fn create_product(
    State(store): State<ProductStoreState>,
    State(pipelines): State<Arc<ProductPipelines>>,
    State(shutdown): State<CancellationToken>,
    ApiJson(request): ApiJson<ProductRequest>,
) -> Result<ApiResult<Product>, AppError> {
    let cancel = shutdown.child_token();
    pipelines
        .create
        .dispatch(request, |r| products::create(store.as_ref(), &cancel, r))
        .await
}

#[utoipa::path(
    put,
    path = "/api/products/{id}",
    tag = "products",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = ProductRequest,
    responses(
        (status = 200, description = "Product updated", body = Product),
        (status = 400, description = "Validation failed", body = NotificationBody),
        (status = 404, description = "Product or store not found", body = NotificationBody),
        (status = 409, description = "SKU held by another product", body = NotificationBody)
    )
)]
pub async fn update_product(
    State(store): State<ProductStoreState>,
    State(pipelines): State<Arc<ProductPipelines>>,
    State(shutdown): State<CancellationToken>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(product): ApiJson<ProductRequest>,
) -> Result<ApiResult<Product>, AppError> {
    let cancel = shutdown.child_token();
    pipelines
        .update
        .dispatch(UpdateProductCommand { id, product }, |c| {
            products::update(store.as_ref(), &cancel, c)
        })
        .await
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    tag = "products",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Deleted", body = bool),
        (status = 404, description = "Not found", body = NotificationBody)
    )
)]
pub async fn delete_product(
    State(store): State<ProductStoreState>,
    State(pipelines): State<Arc<ProductPipelines>>,
    State(shutdown): State<CancellationToken>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiResult<bool>, AppError> {
    let cancel = shutdown.child_token();
    pipelines
        .delete
        .dispatch(DeleteProductCommand { id }, |c| {
            products::delete(store.as_ref(), &cancel, c)
        })
        .await
}

/// get_products_json
///
/// The JSON array is produced by the database and passed through untouched.
#[utoipa::path(
    get,
    path = "/api/products/json",
    tag = "products",
    params(ProductFilter),
    responses((status = 200, description = "Products rendered as JSON by the database", body = [Product], content_type = "application/json"))
)]
pub async fn get_products_json(
    State(store): State<ProductStoreState>,
    ApiQuery(filter): ApiQuery<ProductFilter>,
) -> Result<impl IntoResponse, AppError> {
    let body = products::products_json(store.as_ref(), ProductScope::from(&filter)).await?;
    Ok(([(header::CONTENT_TYPE, "application/json; charset=utf-8")], body))
}

/// get_products_list
///
/// One product per line, or `No products found.` when nothing matches.
#[utoipa::path(
    get,
    path = "/api/products/list",
    tag = "products",
    params(ProductFilter),
    responses((status = 200, description = "Plain-text product list", body = String, content_type = "text/plain"))
)]
pub async fn get_products_list(
    State(store): State<ProductStoreState>,
    ApiQuery(filter): ApiQuery<ProductFilter>,
) -> Result<impl IntoResponse, AppError> {
    let body = products::products_list(store.as_ref(), ProductScope::from(&filter)).await?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body))
}
