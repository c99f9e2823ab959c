use crate::{
    Pipelines, companies,
    error::AppError,
    extract::{ApiJson, ApiPath},
    models::{
        CompanyDto, CreateCompanyCommand, DeleteCompanyCommand, DeleteStoreCommand,
        GetAllCompaniesQuery, GetAllStoresQuery, GetCompanyByIdQuery, GetStoreByIdQuery,
        StoreDto, StoreRequest, UpdateCompanyCommand, UpdateStoreCommand,
    },
    repository::DatabaseState,
    result::{ApiResult, NotificationBody},
    stores,
};
use axum::extract::State;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub const ID_MISMATCH: &str = "Id in URL does not match Id in body";

// --- Company Handlers ---

/// create_company
///
/// Registers a company. The document number must not be in use.
#[utoipa::path(
    post,
    path = "/api/v1/company",
    tag = "company",
    request_body = CreateCompanyCommand,
    responses(
        (status = 200, description = "Company created", body = CompanyDto),
        (status = 400, description = "Validation failed", body = NotificationBody),
        (status = 409, description = "Document number already registered", body = NotificationBody)
    )
)]
pub async fn create_company(
    State(db): State<DatabaseState>,
    State(pipelines): State<Arc<Pipelines>>,
    State(shutdown): State<CancellationToken>,
    ApiJson(command): ApiJson<CreateCompanyCommand>,
) -> Result<ApiResult<CompanyDto>, AppError> {
    let scope = db.scope();
    let cancel = shutdown.child_token();
    pipelines
        .companies
        .create
        .dispatch(command, |c| companies::create(&scope, &cancel, c))
        .await
}

/// get_company
#[utoipa::path(
    get,
    path = "/api/v1/company/{id}",
    tag = "company",
    params(("id" = Uuid, Path, description = "Company id")),
    responses(
        (status = 200, description = "Company", body = CompanyDto),
        (status = 400, description = "Malformed or nil id", body = NotificationBody),
        (status = 404, description = "Not found", body = NotificationBody)
    )
)]
pub async fn get_company(
    State(db): State<DatabaseState>,
    State(pipelines): State<Arc<Pipelines>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiResult<CompanyDto>, AppError> {
    let scope = db.scope();
    pipelines
        .companies
        .get_by_id
        .dispatch(GetCompanyByIdQuery { id }, |q| {
            companies::get_by_id(&scope, q)
        })
        .await
}

/// list_companies
///
/// All companies ordered by name. Never fails on an empty table.
#[utoipa::path(
    get,
    path = "/api/v1/company",
    tag = "company",
    responses((status = 200, description = "Companies", body = [CompanyDto]))
)]
pub async fn list_companies(
    State(db): State<DatabaseState>,
    State(pipelines): State<Arc<Pipelines>>,
) -> Result<ApiResult<Vec<CompanyDto>>, AppError> {
    let scope = db.scope();
    pipelines
        .companies
        .get_all
        .dispatch(GetAllCompaniesQuery, |q| companies::get_all(&scope, q))
        .await
}

/// update_company
///
/// The id in the path and the id in the body must agree, otherwise the
/// request is refused before validation runs.
#[utoipa::path(
    put,
    path = "/api/v1/company/{id}",
    tag = "company",
    params(("id" = Uuid, Path, description = "Company id")),
    request_body = UpdateCompanyCommand,
    responses(
        (status = 200, description = "Company updated", body = CompanyDto),
        (status = 400, description = "Validation failed or id mismatch", body = NotificationBody),
        (status = 404, description = "Not found", body = NotificationBody),
        (status = 409, description = "Document number held by another company", body = NotificationBody)
    )
)]
pub async fn update_company(
    State(db): State<DatabaseState>,
    State(pipelines): State<Arc<Pipelines>>,
    State(shutdown): State<CancellationToken>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(command): ApiJson<UpdateCompanyCommand>,
) -> Result<ApiResult<CompanyDto>, AppError> {
    if id != command.id {
        return Ok(ApiResult::fail(ID_MISMATCH));
    }

    let scope = db.scope();
    let cancel = shutdown.child_token();
    pipelines
        .companies
        .update
        .dispatch(command, |c| companies::update(&scope, &cancel, c))
        .await
}

/// delete_company
///
/// Deletes the company together with its stores.
#[utoipa::path(
    delete,
    path = "/api/v1/company/{id}",
    tag = "company",
    params(("id" = Uuid, Path, description = "Company id")),
    responses(
        (status = 200, description = "Deleted", body = bool),
        (status = 404, description = "Not found", body = NotificationBody)
    )
)]
pub async fn delete_company(
    State(db): State<DatabaseState>,
    State(pipelines): State<Arc<Pipelines>>,
    State(shutdown): State<CancellationToken>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiResult<bool>, AppError> {
    let scope = db.scope();
    let cancel = shutdown.child_token();
    pipelines
        .companies
        .delete
        .dispatch(DeleteCompanyCommand { id }, |c| {
            companies::delete(&scope, &cancel, c)
        })
        .await
}

// --- Store Handlers ---

/// create_store
///
/// The owning company must already exist.
#[utoipa::path(
    post,
    path = "/api/v1/store",
    tag = "store",
    request_body = StoreRequest,
    responses(
        (status = 200, description = "Store created", body = StoreDto),
        (status = 400, description = "Validation failed", body = NotificationBody),
        (status = 404, description = "Company not found", body = NotificationBody)
    )
)]
pub async fn create_store(
    State(db): State<DatabaseState>,
    State(pipelines): State<Arc<Pipelines>>,
    State(shutdown): State<CancellationToken>,
    ApiJson(request): ApiJson<StoreRequest>,
) -> Result<ApiResult<StoreDto>, AppError> {
    let scope = db.scope();
    let cancel = shutdown.child_token();
    pipelines
        .stores
        .create
        .dispatch(request, |r| stores::create(&scope, &cancel, r))
        .await
}

#[utoipa::path(
    get,
    path = "/api/v1/store/{id}",
    tag = "store",
    params(("id" = Uuid, Path, description = "Store id")),
    responses(
        (status = 200, description = "Store", body = StoreDto),
        (status = 404, description = "Not found", body = NotificationBody)
    )
)]
pub async fn get_store(
    State(db): State<DatabaseState>,
    State(pipelines): State<Arc<Pipelines>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiResult<StoreDto>, AppError> {
    let scope = db.scope();
    pipelines
        .stores
        .get_by_id
        .dispatch(GetStoreByIdQuery { id }, |q| stores::get_by_id(&scope, q))
        .await
}

#[utoipa::path(
    get,
    path = "/api/v1/store",
    tag = "store",
    responses((status = 200, description = "Stores", body = [StoreDto]))
)]
pub async fn list_stores(
    State(db): State<DatabaseState>,
    State(pipelines): State<Arc<Pipelines>>,
) -> Result<ApiResult<Vec<StoreDto>>, AppError> {
    let scope = db.scope();
    pipelines
        .stores
        .get_all
        .dispatch(GetAllStoresQuery, |q| stores::get_all(&scope, q))
        .await
}

/// update_store
///
/// The body carries no id; the path id identifies the store.
#[utoipa::path(
    put,
    path = "/api/v1/store/{id}",
    tag = "store",
    params(("id" = Uuid, Path, description = "Store id")),
    request_body = StoreRequest,
    responses(
        (status = 200, description = "Store updated", body = StoreDto),
        (status = 400, description = "Validation failed", body = NotificationBody),
        (status = 404, description = "Store or company not found", body = NotificationBody)
    )
)]
pub async fn update_store(
    State(db): State<DatabaseState>,
    State(pipelines): State<Arc<Pipelines>>,
    State(shutdown): State<CancellationToken>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(store): ApiJson<StoreRequest>,
) -> Result<ApiResult<StoreDto>, AppError> {
    let scope = db.scope();
    let cancel = shutdown.child_token();
    pipelines
        .stores
        .update
        .dispatch(UpdateStoreCommand { id, store }, |c| {
            stores::update(&scope, &cancel, c)
        })
        .await
}

#[utoipa::path(
    delete,
    path = "/api/v1/store/{id}",
    tag = "store",
    params(("id" = Uuid, Path, description = "Store id")),
    responses(
        (status = 200, description = "Deleted", body = bool),
        (status = 404, description = "Not found", body = NotificationBody)
    )
)]
pub async fn delete_store(
    State(db): State<DatabaseState>,
    State(pipelines): State<Arc<Pipelines>>,
    State(shutdown): State<CancellationToken>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiResult<bool>, AppError> {
    let scope = db.scope();
    let cancel = shutdown.child_token();
    pipelines
        .stores
        .delete
        .dispatch(DeleteStoreCommand { id }, |c| {
            stores::delete(&scope, &cancel, c)
        })
        .await
}
