use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Request, StatusCode},
};
use quartile_api::{
    AppConfig, AppState, create_router,
    error::PersistenceError,
    models::{Company, CompanyDto, StoreDto},
    repository::{CompanyRepository, Database, DatabaseState, InMemoryDatabase, Scope},
    result::{NotificationBody, messages},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use uuid::Uuid;

// --- MOCK DATABASE ---

// Company reads fail as if the database were unreachable; everything else is
// served by a regular in-memory scope.
struct BrokenCompanies;

#[async_trait]
impl CompanyRepository for BrokenCompanies {
    async fn get_by_id(&self, _id: Uuid) -> Result<Option<Company>, PersistenceError> {
        Err(PersistenceError::Unavailable("connection refused".to_string()))
    }
    async fn get_by_document_number(
        &self,
        _document_number: &str,
    ) -> Result<Option<Company>, PersistenceError> {
        Err(PersistenceError::Unavailable("connection refused".to_string()))
    }
    async fn get_all(&self) -> Result<Vec<Company>, PersistenceError> {
        Err(PersistenceError::Unavailable("connection refused".to_string()))
    }
    async fn add(&self, _company: Company) -> Result<(), PersistenceError> {
        unreachable!("reads fail first")
    }
    async fn update(&self, _company: Company) -> Result<(), PersistenceError> {
        unreachable!("reads fail first")
    }
    async fn remove(&self, _company: &Company) -> Result<(), PersistenceError> {
        unreachable!("reads fail first")
    }
}

struct BrokenDatabase(InMemoryDatabase);

impl Database for BrokenDatabase {
    fn scope(&self) -> Scope {
        let mut scope = self.0.scope();
        scope.companies = Arc::new(BrokenCompanies);
        scope
    }
}

// --- Helpers ---

fn app_with(db: DatabaseState, shutdown: CancellationToken) -> Router {
    create_router(AppState::new(db, AppConfig::default(), shutdown))
}

fn app() -> Router {
    app_with(Arc::new(InMemoryDatabase::new()), CancellationToken::new())
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, HeaderMap, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, bytes.to_vec())
}

fn notifications(body: &[u8]) -> Vec<String> {
    serde_json::from_slice::<NotificationBody>(body)
        .expect("notification body")
        .notifications
}

fn acme() -> Value {
    json!({
        "name": "Acme",
        "documentNumber": "12345678901234",
        "documentType": "CNPJ"
    })
}

fn store_body(company_id: Uuid) -> Value {
    json!({
        "name": "Downtown",
        "email": "downtown@acme.com",
        "phone": "555-0101",
        "address": "10 Market St",
        "city": "Springfield",
        "state": "IL",
        "zipCode": "62701",
        "companyId": company_id
    })
}

// --- Router Tests ---

#[tokio::test]
async fn test_health_check() {
    let (status, headers, body) = send(&app(), "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_create_company_returns_camel_case_dto() {
    let (status, _, body) = send(&app(), "POST", "/api/v1/company", Some(acme())).await;

    assert_eq!(status, StatusCode::OK);
    let raw: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(raw["documentNumber"], "12345678901234");
    assert_eq!(raw["documentType"], "CNPJ");
    assert!(raw.get("createdAt").is_some());
}

#[tokio::test]
async fn test_duplicate_company_is_409() {
    let app = app();
    send(&app, "POST", "/api/v1/company", Some(acme())).await;
    let (status, _, body) = send(&app, "POST", "/api/v1/company", Some(acme())).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        notifications(&body),
        vec!["Company with this document number already exists"]
    );
}

#[tokio::test]
async fn test_validation_failures_are_400_with_every_message() {
    let body = json!({ "name": "", "documentNumber": "", "documentType": "EIN" });
    let (status, _, body) = send(&app(), "POST", "/api/v1/company", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        notifications(&body),
        vec!["Name is required", "Document number is required"]
    );
}

#[tokio::test]
async fn test_malformed_bodies_are_400() {
    let app = app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/company")
        .header("content-type", "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(notifications(&body).len(), 1);

    // Unknown document type.
    let bad_type = json!({ "name": "Acme", "documentNumber": "1", "documentType": "PASSPORT" });
    let (status, _, body) = send(&app, "POST", "/api/v1/company", Some(bad_type)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(notifications(&body).len(), 1);
}

#[tokio::test]
async fn test_path_ids_are_checked() {
    let app = app();

    let (status, _, body) = send(&app, "GET", "/api/v1/company/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(notifications(&body).len(), 1);

    let nil = format!("/api/v1/company/{}", Uuid::nil());
    let (status, _, body) = send(&app, "GET", &nil, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(notifications(&body), vec!["Id is required"]);

    let unknown = format!("/api/v1/company/{}", Uuid::new_v4());
    let (status, _, body) = send(&app, "DELETE", &unknown, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(notifications(&body), vec!["Company not found"]);
}

#[tokio::test]
async fn test_update_with_mismatched_ids_is_400() {
    let body = json!({
        "id": Uuid::new_v4(),
        "name": "Acme",
        "documentNumber": "1",
        "documentType": "EIN"
    });
    let uri = format!("/api/v1/company/{}", Uuid::new_v4());
    let (status, _, body) = send(&app(), "PUT", &uri, Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(notifications(&body), vec!["Id in URL does not match Id in body"]);
}

#[tokio::test]
async fn test_company_and_store_lifecycle() {
    let app = app();

    // Create company
    let (_, _, body) = send(&app, "POST", "/api/v1/company", Some(acme())).await;
    let company: CompanyDto = serde_json::from_slice(&body).unwrap();

    // Update company
    let update = json!({
        "id": company.id,
        "name": "Acme Corp",
        "documentNumber": company.document_number,
        "documentType": "CNPJ"
    });
    let uri = format!("/api/v1/company/{}", company.id);
    let (status, _, body) = send(&app, "PUT", &uri, Some(update)).await;
    assert_eq!(status, StatusCode::OK);
    let updated: CompanyDto = serde_json::from_slice(&body).unwrap();
    assert_eq!(updated.name, "Acme Corp");
    assert_eq!(updated.created_at, company.created_at);

    // Create store
    let (status, _, body) = send(&app, "POST", "/api/v1/store", Some(store_body(company.id))).await;
    assert_eq!(status, StatusCode::OK);
    let store: StoreDto = serde_json::from_slice(&body).unwrap();
    assert_eq!(store.company_id, company.id);

    // List and fetch
    let (_, _, body) = send(&app, "GET", "/api/v1/store", None).await;
    let listed: Vec<StoreDto> = serde_json::from_slice(&body).unwrap();
    assert_eq!(listed, vec![store.clone()]);

    let store_uri = format!("/api/v1/store/{}", store.id);
    let (status, _, body) = send(&app, "GET", &store_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_slice::<StoreDto>(&body).unwrap(), store);

    // Update store
    let mut changed = store_body(company.id);
    changed["city"] = json!("Chicago");
    let (status, _, body) = send(&app, "PUT", &store_uri, Some(changed)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_slice::<StoreDto>(&body).unwrap().city, "Chicago");

    // Delete store, then company
    let (status, _, body) = send(&app, "DELETE", &store_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"true");

    let (status, _, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, _, body) = send(&app, "GET", "/api/v1/company", None).await;
    assert_eq!(body, b"[]");
}

#[tokio::test]
async fn test_store_for_unknown_company_is_404() {
    let (status, _, body) = send(
        &app(),
        "POST",
        "/api/v1/store",
        Some(store_body(Uuid::new_v4())),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(notifications(&body), vec!["Company not found"]);
}

// --- Error Boundary ---

#[tokio::test]
async fn test_commit_failure_is_a_generic_500() {
    let app = app_with(Arc::new(InMemoryDatabase::failing()), CancellationToken::new());
    let (status, _, body) = send(&app, "POST", "/api/v1/company", Some(acme())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(notifications(&body), vec![messages::INTERNAL_ERROR]);
}

#[tokio::test]
async fn test_read_failure_does_not_leak_details() {
    let db = Arc::new(BrokenDatabase(InMemoryDatabase::new()));
    let app = app_with(db, CancellationToken::new());
    let (status, _, body) = send(&app, "GET", "/api/v1/company", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let text = String::from_utf8(body.clone()).unwrap();
    assert!(!text.contains("connection refused"));
    assert_eq!(notifications(&body), vec![messages::INTERNAL_ERROR]);
}

#[tokio::test]
async fn test_shutdown_cancels_writes() {
    let shutdown = CancellationToken::new();
    let db = InMemoryDatabase::new();
    let app = app_with(Arc::new(db.clone()), shutdown.clone());
    shutdown.cancel();

    let (status, _, body) = send(&app, "POST", "/api/v1/company", Some(acme())).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(notifications(&body), vec![messages::REQUEST_CANCELLED]);
    assert_eq!(db.calls().adds, 0);

    // Reads still work.
    let (status, _, _) = send(&app, "GET", "/api/v1/company", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let (status, _, body) = send(&app(), "GET", "/api-docs/openapi.json", None).await;

    assert_eq!(status, StatusCode::OK);
    let doc: Value = serde_json::from_slice(&body).unwrap();
    assert!(doc["paths"].get("/api/v1/company/{id}").is_some());
    assert!(doc["paths"].get("/api/v1/store").is_some());
}

// --- Spawned Server ---

async fn spawn_app() -> String {
    let router = app();
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn test_served_create_and_fetch() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/health", address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());

    let created: CompanyDto = client
        .post(format!("{}/api/v1/company", address))
        .json(&acme())
        .send()
        .await
        .expect("req fail")
        .json()
        .await
        .expect("company dto");

    let fetched = client
        .get(format!("{}/api/v1/company/{}", address, created.id))
        .send()
        .await
        .expect("req fail");
    assert_eq!(fetched.status(), reqwest::StatusCode::OK);
    assert!(fetched.headers().contains_key("x-request-id"));
    assert_eq!(fetched.json::<CompanyDto>().await.unwrap(), created);
}
