use axum::{Router, extract::FromRef, http::HeaderName};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Foundation: configuration, logging, errors and the result envelope.
pub mod config;
pub mod error;
pub mod result;
pub mod shutdown;
pub mod telemetry;
pub mod validation;

// Domain and persistence.
pub mod models;
pub mod product_store;
pub mod repository;

// Business handlers, one module per resource.
pub mod companies;
pub mod products;
pub mod stores;

// HTTP surface.
pub mod extract;
pub mod functions;
pub mod handlers;
pub mod routes;

// --- Public Re-exports ---

pub use config::AppConfig;
pub use product_store::{InMemoryProductStore, PgProductStore, ProductStoreState};
pub use repository::{DatabaseState, InMemoryDatabase, PostgresDatabase};

use companies::CompanyPipelines;
use products::ProductPipelines;
use stores::StorePipelines;

/// ApiDoc
///
/// OpenAPI document of the API server, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::create_company, handlers::get_company, handlers::list_companies,
        handlers::update_company, handlers::delete_company,
        handlers::create_store, handlers::get_store, handlers::list_stores,
        handlers::update_store, handlers::delete_store
    ),
    components(
        schemas(
            models::CompanyDto, models::StoreDto, models::CreateCompanyCommand,
            models::UpdateCompanyCommand, models::StoreRequest, models::DocumentType,
            result::NotificationBody,
        )
    ),
    tags(
        (name = "company", description = "Company management"),
        (name = "store", description = "Store management")
    )
)]
pub struct ApiDoc;

/// FunctionsDoc
///
/// OpenAPI document of the product function app.
#[derive(OpenApi)]
#[openapi(
    paths(
        functions::get_products, functions::get_product, functions::create_product,
        functions::update_product, functions::delete_product,
        functions::get_products_json, functions::get_products_list
    ),
    components(schemas(models::Product, models::ProductRequest, result::NotificationBody)),
    tags((name = "products", description = "Product function app"))
)]
pub struct FunctionsDoc;

/// Pipelines
///
/// Validation stages of the API server, built once at startup.
#[derive(Clone, Default)]
pub struct Pipelines {
    pub companies: CompanyPipelines,
    pub stores: StorePipelines,
}

/// AppState
///
/// Shared state of the API server. Handlers pull the parts they need through
/// the `FromRef` projections below.
#[derive(Clone)]
pub struct AppState {
    /// Hands out one `Scope` (repositories + unit of work) per request.
    pub db: DatabaseState,
    pub pipelines: Arc<Pipelines>,
    pub config: AppConfig,
    /// Fired when the shutdown drain grace elapses; every request works on a
    /// child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(db: DatabaseState, config: AppConfig, shutdown: CancellationToken) -> Self {
        Self {
            db,
            pipelines: Arc::new(Pipelines::default()),
            config,
            shutdown,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for DatabaseState {
    fn from_ref(app_state: &AppState) -> DatabaseState {
        app_state.db.clone()
    }
}

impl FromRef<AppState> for Arc<Pipelines> {
    fn from_ref(app_state: &AppState) -> Arc<Pipelines> {
        app_state.pipelines.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for CancellationToken {
    fn from_ref(app_state: &AppState) -> CancellationToken {
        app_state.shutdown.clone()
    }
}

/// FunctionsState
///
/// Shared state of the product function app.
#[derive(Clone)]
pub struct FunctionsState {
    pub products: ProductStoreState,
    pub pipelines: Arc<ProductPipelines>,
    pub config: AppConfig,
    pub shutdown: CancellationToken,
}

impl FunctionsState {
    pub fn new(products: ProductStoreState, config: AppConfig, shutdown: CancellationToken) -> Self {
        Self {
            products,
            pipelines: Arc::new(ProductPipelines::default()),
            config,
            shutdown,
        }
    }
}

impl FromRef<FunctionsState> for ProductStoreState {
    fn from_ref(state: &FunctionsState) -> ProductStoreState {
        state.products.clone()
    }
}

impl FromRef<FunctionsState> for Arc<ProductPipelines> {
    fn from_ref(state: &FunctionsState) -> Arc<ProductPipelines> {
        state.pipelines.clone()
    }
}

impl FromRef<FunctionsState> for AppConfig {
    fn from_ref(state: &FunctionsState) -> AppConfig {
        state.config.clone()
    }
}

impl FromRef<FunctionsState> for CancellationToken {
    fn from_ref(state: &FunctionsState) -> CancellationToken {
        state.shutdown.clone()
    }
}

/// create_router
///
/// The API server: health probe, Swagger UI, company and store routes, wrapped
/// in the shared observability stack.
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(routes::health_routes())
        .merge(routes::company::company_routes())
        .merge(routes::store::store_routes())
        .with_state(state);

    with_observability(router)
}

/// create_functions_router
///
/// The product function app, with the same layers as the API server.
pub fn create_functions_router(state: FunctionsState) -> Router {
    let router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", FunctionsDoc::openapi()))
        .merge(routes::health_routes())
        .merge(routes::products::product_routes())
        .with_state(state);

    with_observability(router)
}

/// with_observability
///
/// Request correlation, tracing, the panic boundary and CORS. A panic inside a
/// handler becomes the generic 500 notification body and is still traced.
fn with_observability(router: Router) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id))
                .layer(CatchPanicLayer::custom(error::panic_response)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for `TraceLayer`: method, uri and the `x-request-id` set by the layer
/// above, so every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
