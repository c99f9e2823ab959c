use axum::http::StatusCode;
use chrono::{Duration, Utc};
use quartile_api::{
    models::{
        Company, DeleteStoreCommand, DocumentType, GetAllStoresQuery, GetStoreByIdQuery, Store,
        StoreRequest, UpdateStoreCommand,
    },
    repository::{CallCounts, Database, InMemoryDatabase},
    stores::{self, StorePipelines},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

// --- Fixtures ---

fn company() -> Company {
    let now = Utc::now();
    Company {
        id: Uuid::new_v4(),
        name: "Acme".to_string(),
        document_number: "12345678901234".to_string(),
        document_type: DocumentType::Cnpj,
        created_at: now,
        updated_at: now,
    }
}

fn store_request(company_id: Uuid) -> StoreRequest {
    StoreRequest {
        name: "Downtown".to_string(),
        email: "downtown@acme.com".to_string(),
        phone: "555-0101".to_string(),
        address: "10 Market St".to_string(),
        city: "Springfield".to_string(),
        state: "IL".to_string(),
        zip_code: "62701".to_string(),
        company_id,
    }
}

fn existing_store(company_id: Uuid) -> Store {
    let created = Utc::now() - Duration::hours(6);
    Store {
        id: Uuid::new_v4(),
        name: "Uptown".to_string(),
        email: "uptown@acme.com".to_string(),
        phone: "555-0102".to_string(),
        address: "99 Hill Rd".to_string(),
        city: "Springfield".to_string(),
        state: "IL".to_string(),
        zip_code: "62702".to_string(),
        company_id,
        created_at: created,
        updated_at: created,
    }
}

async fn db_with_company() -> (InMemoryDatabase, Company) {
    let db = InMemoryDatabase::new();
    let company = company();
    db.seed_company(company.clone()).await;
    (db, company)
}

// --- Validation ---

#[tokio::test]
async fn test_empty_store_request_reports_every_field() {
    let failures = StorePipelines::default()
        .create
        .validate(&StoreRequest::default())
        .await;
    let messages: Vec<&str> = failures.iter().map(|f| f.message.as_str()).collect();

    assert_eq!(
        messages,
        vec![
            "Name is required",
            "Email is required",
            "Email must be a valid email address",
            "Phone is required",
            "Address is required",
            "City is required",
            "State is required",
            "ZipCode is required",
            "CompanyId is required",
        ]
    );
}

#[tokio::test]
async fn test_invalid_email_and_long_state_are_reported() {
    let mut request = store_request(Uuid::new_v4());
    request.email = "not-an-email".to_string();
    request.state = "S".repeat(51);

    let failures = StorePipelines::default().create.validate(&request).await;
    let messages: Vec<&str> = failures.iter().map(|f| f.message.as_str()).collect();

    assert_eq!(
        messages,
        vec![
            "Email must be a valid email address",
            "State cannot exceed 50 characters"
        ]
    );
}

#[tokio::test]
async fn test_email_rules_run_in_declared_order() {
    let mut request = store_request(Uuid::new_v4());
    request.email = "e".repeat(101);
    request.zip_code = "9".repeat(21);

    let failures = StorePipelines::default().create.validate(&request).await;
    let messages: Vec<&str> = failures.iter().map(|f| f.message.as_str()).collect();

    assert_eq!(
        messages,
        vec![
            "Email must be a valid email address",
            "Email cannot exceed 100 characters",
            "ZipCode cannot exceed 20 characters",
        ]
    );
}

#[tokio::test]
async fn test_update_pipeline_checks_id_before_body() {
    let command = UpdateStoreCommand {
        id: Uuid::nil(),
        store: StoreRequest {
            name: String::new(),
            ..store_request(Uuid::new_v4())
        },
    };
    let failures = StorePipelines::default().update.validate(&command).await;
    let messages: Vec<&str> = failures.iter().map(|f| f.message.as_str()).collect();

    assert_eq!(messages, vec!["Id is required", "Name is required"]);
}

// --- Handlers ---

#[tokio::test]
async fn test_create_store_for_existing_company() {
    let (db, company) = db_with_company().await;
    let cancel = CancellationToken::new();

    let result = stores::create(&db.scope(), &cancel, store_request(company.id))
        .await
        .unwrap();

    assert_eq!(result.status_code(), StatusCode::OK);
    assert_eq!(result.message(), "Store created successfully");
    let dto = result.into_data().unwrap();
    assert_eq!(dto.company_id, company.id);
    assert_eq!(dto.zip_code, "62701");
    assert!(db.store(dto.id).await.is_some());
    assert_eq!(
        db.calls(),
        CallCounts {
            adds: 1,
            commits: 1,
            ..Default::default()
        }
    );
}

#[tokio::test]
async fn test_create_store_for_unknown_company_is_not_found() {
    let db = InMemoryDatabase::new();
    let cancel = CancellationToken::new();

    let result = stores::create(&db.scope(), &cancel, store_request(Uuid::new_v4()))
        .await
        .unwrap();

    assert_eq!(result.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(result.notifications(), ["Company not found".to_string()]);
    assert_eq!(db.calls(), CallCounts::default());
}

#[tokio::test]
async fn test_create_then_get_store() {
    let (db, company) = db_with_company().await;
    let cancel = CancellationToken::new();

    let created = stores::create(&db.scope(), &cancel, store_request(company.id))
        .await
        .unwrap()
        .into_data()
        .unwrap();
    let fetched = stores::get_by_id(&db.scope(), GetStoreByIdQuery { id: created.id })
        .await
        .unwrap();

    assert_eq!(fetched.message(), "Store retrieved successfully");
    assert_eq!(fetched.into_data(), Some(created));
}

#[tokio::test]
async fn test_get_unknown_store_is_not_found() {
    let db = InMemoryDatabase::new();

    let result = stores::get_by_id(&db.scope(), GetStoreByIdQuery { id: Uuid::new_v4() })
        .await
        .unwrap();

    assert_eq!(result.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(result.notifications(), ["Store not found".to_string()]);
}

#[tokio::test]
async fn test_list_stores() {
    let (db, company) = db_with_company().await;
    db.seed_store(existing_store(company.id)).await;

    let result = stores::get_all(&db.scope(), GetAllStoresQuery).await.unwrap();

    assert_eq!(result.message(), "Stores retrieved successfully");
    assert_eq!(result.into_data().map(|s| s.len()), Some(1));
}

#[tokio::test]
async fn test_update_store_preserves_identity() {
    let (db, company) = db_with_company().await;
    let cancel = CancellationToken::new();
    let original = existing_store(company.id);
    db.seed_store(original.clone()).await;

    let mut request = store_request(company.id);
    request.city = "Chicago".to_string();
    let result = stores::update(
        &db.scope(),
        &cancel,
        UpdateStoreCommand {
            id: original.id,
            store: request,
        },
    )
    .await
    .unwrap();

    let dto = result.into_data().unwrap();
    assert_eq!(dto.id, original.id);
    assert_eq!(dto.created_at, original.created_at);
    assert!(dto.updated_at > original.updated_at);
    assert_eq!(dto.city, "Chicago");
    assert_eq!(dto.name, "Downtown");
    assert_eq!(db.store(original.id).await.unwrap().city, "Chicago");
    assert_eq!(db.calls().updates, 1);
}

#[tokio::test]
async fn test_update_store_to_unknown_company_is_not_found() {
    let (db, company) = db_with_company().await;
    let cancel = CancellationToken::new();
    let original = existing_store(company.id);
    db.seed_store(original.clone()).await;

    let result = stores::update(
        &db.scope(),
        &cancel,
        UpdateStoreCommand {
            id: original.id,
            store: store_request(Uuid::new_v4()),
        },
    )
    .await
    .unwrap();

    assert_eq!(result.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(result.notifications(), ["Company not found".to_string()]);
    assert_eq!(db.calls(), CallCounts::default());
}

#[tokio::test]
async fn test_delete_store() {
    let (db, company) = db_with_company().await;
    let cancel = CancellationToken::new();
    let store = existing_store(company.id);
    db.seed_store(store.clone()).await;

    let result = stores::delete(&db.scope(), &cancel, DeleteStoreCommand { id: store.id })
        .await
        .unwrap();
    assert_eq!(result.into_data(), Some(true));
    assert!(db.store(store.id).await.is_none());

    let again = stores::delete(&db.scope(), &cancel, DeleteStoreCommand { id: store.id })
        .await
        .unwrap();
    assert_eq!(again.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(
        db.calls(),
        CallCounts {
            removes: 1,
            commits: 1,
            ..Default::default()
        }
    );
}
