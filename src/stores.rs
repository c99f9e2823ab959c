use async_trait::async_trait;
use axum::http::StatusCode;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{AppError, ensure_active};
use crate::models::{
    DeleteStoreCommand, GetAllStoresQuery, GetStoreByIdQuery, Store, StoreDto, StoreRequest,
    UpdateStoreCommand,
};
use crate::repository::Scope;
use crate::result::ApiResult;
use crate::validation::{
    RuleSet, ValidationFailure, ValidationPipeline, Validator, is_email, not_blank, not_nil, within,
};

pub mod messages {
    pub const NOT_FOUND: &str = "Store not found";
    pub const COMPANY_NOT_FOUND: &str = "Company not found";

    pub const CREATED: &str = "Store created successfully";
    pub const RETRIEVED: &str = "Store retrieved successfully";
    pub const LISTED: &str = "Stores retrieved successfully";
    pub const UPDATED: &str = "Store updated successfully";
    pub const DELETED: &str = "Store deleted successfully";
}

/// Required-and-bounded text rules for one store field.
fn text_field(
    rules: RuleSet<StoreRequest>,
    property: &'static str,
    get: fn(&StoreRequest) -> &str,
    max: usize,
    required: &'static str,
    too_long: &'static str,
) -> RuleSet<StoreRequest> {
    rules
        .rule(property, move |s: &StoreRequest| not_blank(get(s)), required)
        .rule(property, move |s: &StoreRequest| within(get(s), max), too_long)
}

/// store_rules
///
/// Shared by create and update: both carry the full store body.
pub fn store_rules() -> RuleSet<StoreRequest> {
    let rules = RuleSet::new();
    let rules = text_field(
        rules,
        "name",
        |s| s.name.as_str(),
        100,
        "Name is required",
        "Name cannot exceed 100 characters",
    );
    // A blank email fails both the required and the format rule.
    let rules = rules
        .rule("email", |s: &StoreRequest| not_blank(&s.email), "Email is required")
        .rule(
            "email",
            |s: &StoreRequest| is_email(s.email.trim()),
            "Email must be a valid email address",
        )
        .rule(
            "email",
            |s: &StoreRequest| within(&s.email, 100),
            "Email cannot exceed 100 characters",
        );
    let rules = text_field(
        rules,
        "phone",
        |s| s.phone.as_str(),
        20,
        "Phone is required",
        "Phone cannot exceed 20 characters",
    );
    let rules = text_field(
        rules,
        "address",
        |s| s.address.as_str(),
        200,
        "Address is required",
        "Address cannot exceed 200 characters",
    );
    let rules = text_field(
        rules,
        "city",
        |s| s.city.as_str(),
        100,
        "City is required",
        "City cannot exceed 100 characters",
    );
    let rules = text_field(
        rules,
        "state",
        |s| s.state.as_str(),
        50,
        "State is required",
        "State cannot exceed 50 characters",
    );
    let rules = text_field(
        rules,
        "zip_code",
        |s| s.zip_code.as_str(),
        20,
        "ZipCode is required",
        "ZipCode cannot exceed 20 characters",
    );
    rules.rule(
        "company_id",
        |s: &StoreRequest| not_nil(&s.company_id),
        "CompanyId is required",
    )
}

/// UpdateStoreRules
///
/// Runs `store_rules` against the body of an update command.
struct UpdateStoreRules(RuleSet<StoreRequest>);

#[async_trait]
impl Validator<UpdateStoreCommand> for UpdateStoreRules {
    async fn validate(&self, command: &UpdateStoreCommand) -> Vec<ValidationFailure> {
        self.0.check(&command.store)
    }
}

pub fn update_id_rules() -> RuleSet<UpdateStoreCommand> {
    RuleSet::new().rule("id", |c: &UpdateStoreCommand| not_nil(&c.id), "Id is required")
}

pub fn get_by_id_rules() -> RuleSet<GetStoreByIdQuery> {
    RuleSet::new().rule("id", |q: &GetStoreByIdQuery| not_nil(&q.id), "Id is required")
}

pub fn delete_rules() -> RuleSet<DeleteStoreCommand> {
    RuleSet::new().rule("id", |c: &DeleteStoreCommand| not_nil(&c.id), "Id is required")
}

/// StorePipelines
///
/// Update registers two validators: the id check, then the body rules.
#[derive(Clone)]
pub struct StorePipelines {
    pub create: ValidationPipeline<StoreRequest>,
    pub update: ValidationPipeline<UpdateStoreCommand>,
    pub get_by_id: ValidationPipeline<GetStoreByIdQuery>,
    pub get_all: ValidationPipeline<GetAllStoresQuery>,
    pub delete: ValidationPipeline<DeleteStoreCommand>,
}

impl Default for StorePipelines {
    fn default() -> Self {
        Self {
            create: ValidationPipeline::new().with(store_rules()),
            update: ValidationPipeline::new()
                .with(update_id_rules())
                .with(UpdateStoreRules(store_rules())),
            get_by_id: ValidationPipeline::new().with(get_by_id_rules()),
            get_all: ValidationPipeline::new(),
            delete: ValidationPipeline::new().with(delete_rules()),
        }
    }
}

// --- Handlers ---

/// create
///
/// The referenced company must exist (404 otherwise).
pub async fn create(
    scope: &Scope,
    cancel: &CancellationToken,
    request: StoreRequest,
) -> Result<ApiResult<StoreDto>, AppError> {
    if scope.companies.get_by_id(request.company_id).await?.is_none() {
        return Ok(ApiResult::fail_with(
            messages::COMPANY_NOT_FOUND,
            StatusCode::NOT_FOUND,
        ));
    }

    ensure_active(cancel)?;
    let now = Utc::now();
    let store = Store {
        id: Uuid::new_v4(),
        name: request.name,
        email: request.email,
        phone: request.phone,
        address: request.address,
        city: request.city,
        state: request.state,
        zip_code: request.zip_code,
        company_id: request.company_id,
        created_at: now,
        updated_at: now,
    };
    let dto = StoreDto::from(&store);

    scope.stores.add(store).await?;
    scope.commit(cancel).await?;

    tracing::info!(store_id = %dto.id, company_id = %dto.company_id, "store created");
    Ok(ApiResult::successful_with(dto, messages::CREATED, StatusCode::OK))
}

pub async fn get_by_id(
    scope: &Scope,
    query: GetStoreByIdQuery,
) -> Result<ApiResult<StoreDto>, AppError> {
    match scope.stores.get_by_id(query.id).await? {
        Some(store) => Ok(ApiResult::successful_with(
            StoreDto::from(&store),
            messages::RETRIEVED,
            StatusCode::OK,
        )),
        None => Ok(ApiResult::fail_with(messages::NOT_FOUND, StatusCode::NOT_FOUND)),
    }
}

pub async fn get_all(
    scope: &Scope,
    _query: GetAllStoresQuery,
) -> Result<ApiResult<Vec<StoreDto>>, AppError> {
    let stores = scope.stores.get_all().await?;
    let dtos = stores.iter().map(StoreDto::from).collect();
    Ok(ApiResult::successful_with(dtos, messages::LISTED, StatusCode::OK))
}

/// update
///
/// 404 for an unknown store, then 404 for an unknown target company.
/// `id` and `created_at` are preserved.
pub async fn update(
    scope: &Scope,
    cancel: &CancellationToken,
    command: UpdateStoreCommand,
) -> Result<ApiResult<StoreDto>, AppError> {
    let Some(mut store) = scope.stores.get_by_id(command.id).await? else {
        return Ok(ApiResult::fail_with(messages::NOT_FOUND, StatusCode::NOT_FOUND));
    };

    let request = command.store;
    if request.company_id != store.company_id
        && scope.companies.get_by_id(request.company_id).await?.is_none()
    {
        return Ok(ApiResult::fail_with(
            messages::COMPANY_NOT_FOUND,
            StatusCode::NOT_FOUND,
        ));
    }

    ensure_active(cancel)?;
    store.name = request.name;
    store.email = request.email;
    store.phone = request.phone;
    store.address = request.address;
    store.city = request.city;
    store.state = request.state;
    store.zip_code = request.zip_code;
    store.company_id = request.company_id;
    store.updated_at = Utc::now();
    let dto = StoreDto::from(&store);

    scope.stores.update(store).await?;
    scope.commit(cancel).await?;

    tracing::info!(store_id = %dto.id, "store updated");
    Ok(ApiResult::successful_with(dto, messages::UPDATED, StatusCode::OK))
}

pub async fn delete(
    scope: &Scope,
    cancel: &CancellationToken,
    command: DeleteStoreCommand,
) -> Result<ApiResult<bool>, AppError> {
    let Some(store) = scope.stores.get_by_id(command.id).await? else {
        return Ok(ApiResult::fail_with(messages::NOT_FOUND, StatusCode::NOT_FOUND));
    };

    ensure_active(cancel)?;
    scope.stores.remove(&store).await?;
    scope.commit(cancel).await?;

    tracing::info!(store_id = %store.id, "store deleted");
    Ok(ApiResult::successful_with(true, messages::DELETED, StatusCode::OK))
}
