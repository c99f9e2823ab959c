use axum::http::StatusCode;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{AppError, PersistenceError, ensure_active};
use crate::models::{
    Company, CompanyDto, CreateCompanyCommand, DeleteCompanyCommand, GetAllCompaniesQuery,
    GetCompanyByIdQuery, UpdateCompanyCommand,
};
use crate::repository::Scope;
use crate::result::ApiResult;
use crate::validation::{RuleSet, ValidationPipeline, not_blank, not_nil, within};

pub mod messages {
    pub const ALREADY_EXISTS: &str = "Company with this document number already exists";
    pub const ANOTHER_EXISTS: &str = "Another company with this document number already exists";
    pub const NOT_FOUND: &str = "Company not found";

    pub const CREATED: &str = "Company created successfully";
    pub const RETRIEVED: &str = "Company retrieved successfully";
    pub const LISTED: &str = "Companies retrieved successfully";
    pub const UPDATED: &str = "Company updated successfully";
    pub const DELETED: &str = "Company deleted successfully";
}

pub const NAME_MAX: usize = 100;
pub const DOCUMENT_NUMBER_MAX: usize = 14;

// --- Rules ---

pub fn create_rules() -> RuleSet<CreateCompanyCommand> {
    RuleSet::new()
        .rule("name", |c: &CreateCompanyCommand| not_blank(&c.name), "Name is required")
        .rule(
            "name",
            |c: &CreateCompanyCommand| within(&c.name, NAME_MAX),
            "Name cannot exceed 100 characters",
        )
        .rule(
            "document_number",
            |c: &CreateCompanyCommand| not_blank(&c.document_number),
            "Document number is required",
        )
        .rule(
            "document_number",
            |c: &CreateCompanyCommand| within(&c.document_number, DOCUMENT_NUMBER_MAX),
            "Document number cannot exceed 14 characters",
        )
}

pub fn update_rules() -> RuleSet<UpdateCompanyCommand> {
    RuleSet::new()
        .rule("id", |c: &UpdateCompanyCommand| not_nil(&c.id), "Id is required")
        .rule("name", |c: &UpdateCompanyCommand| not_blank(&c.name), "Name is required")
        .rule(
            "name",
            |c: &UpdateCompanyCommand| within(&c.name, NAME_MAX),
            "Name cannot exceed 100 characters",
        )
        .rule(
            "document_number",
            |c: &UpdateCompanyCommand| not_blank(&c.document_number),
            "Document number is required",
        )
        .rule(
            "document_number",
            |c: &UpdateCompanyCommand| within(&c.document_number, DOCUMENT_NUMBER_MAX),
            "Document number cannot exceed 14 characters",
        )
}

pub fn get_by_id_rules() -> RuleSet<GetCompanyByIdQuery> {
    RuleSet::new().rule("id", |q: &GetCompanyByIdQuery| not_nil(&q.id), "Id is required")
}

pub fn delete_rules() -> RuleSet<DeleteCompanyCommand> {
    RuleSet::new().rule("id", |c: &DeleteCompanyCommand| not_nil(&c.id), "Id is required")
}

/// CompanyPipelines
///
/// The validation stage registered for each company request type.
/// `GetAllCompaniesQuery` has no rules.
#[derive(Clone)]
pub struct CompanyPipelines {
    pub create: ValidationPipeline<CreateCompanyCommand>,
    pub update: ValidationPipeline<UpdateCompanyCommand>,
    pub get_by_id: ValidationPipeline<GetCompanyByIdQuery>,
    pub get_all: ValidationPipeline<GetAllCompaniesQuery>,
    pub delete: ValidationPipeline<DeleteCompanyCommand>,
}

impl Default for CompanyPipelines {
    fn default() -> Self {
        Self {
            create: ValidationPipeline::new().with(create_rules()),
            update: ValidationPipeline::new().with(update_rules()),
            get_by_id: ValidationPipeline::new().with(get_by_id_rules()),
            get_all: ValidationPipeline::new(),
            delete: ValidationPipeline::new().with(delete_rules()),
        }
    }
}

// --- Handlers ---

/// create
///
/// Rejects a document number that is already registered (409), otherwise
/// persists a new company with a fresh id and a single timestamp for both
/// `created_at` and `updated_at`.
pub async fn create(
    scope: &Scope,
    cancel: &CancellationToken,
    command: CreateCompanyCommand,
) -> Result<ApiResult<CompanyDto>, AppError> {
    if scope
        .companies
        .get_by_document_number(&command.document_number)
        .await?
        .is_some()
    {
        tracing::info!(document_number = %command.document_number, "duplicate company document number");
        return Ok(ApiResult::fail_with(messages::ALREADY_EXISTS, StatusCode::CONFLICT));
    }

    ensure_active(cancel)?;
    let now = Utc::now();
    let company = Company {
        id: Uuid::new_v4(),
        name: command.name,
        document_number: command.document_number,
        document_type: command.document_type,
        created_at: now,
        updated_at: now,
    };
    let dto = CompanyDto::from(&company);

    scope.companies.add(company).await?;
    if let Err(err) = scope.commit(cancel).await {
        return match err {
            // Another request registered the number after the lookup above.
            PersistenceError::Conflict(index) => {
                tracing::info!(%index, "company document number taken concurrently");
                Ok(ApiResult::fail_with(messages::ALREADY_EXISTS, StatusCode::CONFLICT))
            }
            err => Err(err.into()),
        };
    }

    tracing::info!(company_id = %dto.id, "company created");
    Ok(ApiResult::successful_with(dto, messages::CREATED, StatusCode::OK))
}

pub async fn get_by_id(
    scope: &Scope,
    query: GetCompanyByIdQuery,
) -> Result<ApiResult<CompanyDto>, AppError> {
    match scope.companies.get_by_id(query.id).await? {
        Some(company) => Ok(ApiResult::successful_with(
            CompanyDto::from(&company),
            messages::RETRIEVED,
            StatusCode::OK,
        )),
        None => Ok(ApiResult::fail_with(messages::NOT_FOUND, StatusCode::NOT_FOUND)),
    }
}

pub async fn get_all(
    scope: &Scope,
    _query: GetAllCompaniesQuery,
) -> Result<ApiResult<Vec<CompanyDto>>, AppError> {
    let companies = scope.companies.get_all().await?;
    let dtos = companies.iter().map(CompanyDto::from).collect();
    Ok(ApiResult::successful_with(dtos, messages::LISTED, StatusCode::OK))
}

/// update
///
/// 404 when the company is unknown, 409 when a *different* company already
/// holds the requested document number. `id` and `created_at` are preserved.
pub async fn update(
    scope: &Scope,
    cancel: &CancellationToken,
    command: UpdateCompanyCommand,
) -> Result<ApiResult<CompanyDto>, AppError> {
    let Some(mut company) = scope.companies.get_by_id(command.id).await? else {
        return Ok(ApiResult::fail_with(messages::NOT_FOUND, StatusCode::NOT_FOUND));
    };

    if let Some(holder) = scope
        .companies
        .get_by_document_number(&command.document_number)
        .await?
        && holder.id != company.id
    {
        return Ok(ApiResult::fail_with(messages::ANOTHER_EXISTS, StatusCode::CONFLICT));
    }

    ensure_active(cancel)?;
    company.name = command.name;
    company.document_number = command.document_number;
    company.document_type = command.document_type;
    company.updated_at = Utc::now();
    let dto = CompanyDto::from(&company);

    scope.companies.update(company).await?;
    if let Err(err) = scope.commit(cancel).await {
        return match err {
            PersistenceError::Conflict(index) => {
                tracing::info!(%index, "company document number taken concurrently");
                Ok(ApiResult::fail_with(messages::ANOTHER_EXISTS, StatusCode::CONFLICT))
            }
            err => Err(err.into()),
        };
    }

    tracing::info!(company_id = %dto.id, "company updated");
    Ok(ApiResult::successful_with(dto, messages::UPDATED, StatusCode::OK))
}

pub async fn delete(
    scope: &Scope,
    cancel: &CancellationToken,
    command: DeleteCompanyCommand,
) -> Result<ApiResult<bool>, AppError> {
    let Some(company) = scope.companies.get_by_id(command.id).await? else {
        return Ok(ApiResult::fail_with(messages::NOT_FOUND, StatusCode::NOT_FOUND));
    };

    ensure_active(cancel)?;
    scope.companies.remove(&company).await?;
    scope.commit(cancel).await?;

    tracing::info!(company_id = %company.id, "company deleted");
    Ok(ApiResult::successful_with(true, messages::DELETED, StatusCode::OK))
}
