use async_trait::async_trait;
use axum::http::StatusCode;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{AppError, PersistenceError, ensure_active};
use crate::models::{
    DeleteProductCommand, GetProductByIdQuery, Product, ProductRequest, ProductScope,
    UpdateProductCommand,
};
use crate::product_store::ProductStore;
use crate::result::ApiResult;
use crate::validation::{
    RuleSet, ValidationFailure, ValidationPipeline, Validator, not_blank, not_nil, within,
};

pub mod messages {
    pub const NOT_FOUND: &str = "Product not found";
    pub const STORE_NOT_FOUND: &str = "Store not found";
    pub const ALREADY_EXISTS: &str = "Product with this SKU already exists for this company";
    pub const ANOTHER_EXISTS: &str = "Another product with this SKU already exists for this company";
    pub const FOREIGN_STORE: &str = "Store does not belong to the informed company";

    pub const CREATED: &str = "Product created successfully";
    pub const RETRIEVED: &str = "Product retrieved successfully";
    pub const LISTED: &str = "Products retrieved successfully";
    pub const UPDATED: &str = "Product updated successfully";
    pub const DELETED: &str = "Product deleted successfully";

    pub const EMPTY_LIST: &str = "No products found.";
}

/// Digits after the decimal point kept by the `price` column.
pub const PRICE_SCALE: u32 = 2;

/// Exclusive upper bound of `NUMERIC(18, 2)`.
pub fn price_limit() -> Decimal {
    Decimal::from(10_000_000_000_000_000_i64)
}

/// The price as the `price` column stores it.
fn column_price(mut price: Decimal) -> Decimal {
    price.rescale(PRICE_SCALE);
    price
}

pub fn product_rules() -> RuleSet<ProductRequest> {
    RuleSet::new()
        .rule("name", |p: &ProductRequest| not_blank(&p.name), "Name is required")
        .rule(
            "name",
            |p: &ProductRequest| within(&p.name, 100),
            "Name cannot exceed 100 characters",
        )
        .rule("sku", |p: &ProductRequest| not_blank(&p.sku), "Sku is required")
        .rule(
            "sku",
            |p: &ProductRequest| within(&p.sku, 50),
            "Sku cannot exceed 50 characters",
        )
        .rule(
            "price",
            |p: &ProductRequest| p.price >= Decimal::ZERO,
            "Price cannot be negative",
        )
        .rule(
            "price",
            |p: &ProductRequest| p.price.round_dp(PRICE_SCALE) == p.price,
            "Price cannot have more than 2 decimal places",
        )
        .rule(
            "price",
            |p: &ProductRequest| p.price < price_limit(),
            "Price cannot exceed 9999999999999999.99",
        )
        .rule("stock", |p: &ProductRequest| p.stock >= 0, "Stock cannot be negative")
        .rule(
            "store_id",
            |p: &ProductRequest| not_nil(&p.store_id),
            "StoreId is required",
        )
}

struct UpdateProductRules(RuleSet<ProductRequest>);

#[async_trait]
impl Validator<UpdateProductCommand> for UpdateProductRules {
    async fn validate(&self, command: &UpdateProductCommand) -> Vec<ValidationFailure> {
        self.0.check(&command.product)
    }
}

/// ProductPipelines
///
/// The function app's validation stage. Listings take no rules.
#[derive(Clone)]
pub struct ProductPipelines {
    pub create: ValidationPipeline<ProductRequest>,
    pub update: ValidationPipeline<UpdateProductCommand>,
    pub get_by_id: ValidationPipeline<GetProductByIdQuery>,
    pub delete: ValidationPipeline<DeleteProductCommand>,
}

impl Default for ProductPipelines {
    fn default() -> Self {
        Self {
            create: ValidationPipeline::new().with(product_rules()),
            update: ValidationPipeline::new()
                .with(RuleSet::new().rule(
                    "id",
                    |c: &UpdateProductCommand| not_nil(&c.id),
                    "Id is required",
                ))
                .with(UpdateProductRules(product_rules())),
            get_by_id: ValidationPipeline::new().with(RuleSet::new().rule(
                "id",
                |q: &GetProductByIdQuery| not_nil(&q.id),
                "Id is required",
            )),
            delete: ValidationPipeline::new().with(RuleSet::new().rule(
                "id",
                |c: &DeleteProductCommand| not_nil(&c.id),
                "Id is required",
            )),
        }
    }
}

/// resolve_company
///
/// The company a product belongs to, derived from its store. A company id
/// given in the request must agree with the store's owner.
async fn resolve_company(
    store: &dyn ProductStore,
    request: &ProductRequest,
) -> Result<Result<Uuid, ApiResult<Product>>, AppError> {
    let Some(owner) = store.store_company(request.store_id).await? else {
        return Ok(Err(ApiResult::fail_with(
            messages::STORE_NOT_FOUND,
            StatusCode::NOT_FOUND,
        )));
    };
    match request.company_id {
        Some(company_id) if company_id != owner => {
            Ok(Err(ApiResult::fail(messages::FOREIGN_STORE)))
        }
        _ => Ok(Ok(owner)),
    }
}

// --- Handlers ---

pub async fn get_all(
    store: &dyn ProductStore,
    scope: ProductScope,
) -> Result<ApiResult<Vec<Product>>, AppError> {
    let products = store.get_all(scope).await?;
    Ok(ApiResult::successful_with(products, messages::LISTED, StatusCode::OK))
}

pub async fn get_by_id(
    store: &dyn ProductStore,
    query: GetProductByIdQuery,
) -> Result<ApiResult<Product>, AppError> {
    match store.get_by_id(query.id).await? {
        Some(product) => Ok(ApiResult::successful_with(
            product,
            messages::RETRIEVED,
            StatusCode::OK,
        )),
        None => Ok(ApiResult::fail_with(messages::NOT_FOUND, StatusCode::NOT_FOUND)),
    }
}

/// create
///
/// Store must exist, the SKU must be free within the company. Answers 201.
pub async fn create(
    store: &dyn ProductStore,
    cancel: &CancellationToken,
    request: ProductRequest,
) -> Result<ApiResult<Product>, AppError> {
    let company_id = match resolve_company(store, &request).await? {
        Ok(company_id) => company_id,
        Err(failure) => return Ok(failure),
    };

    if store.find_by_sku(company_id, &request.sku).await?.is_some() {
        return Ok(ApiResult::fail_with(messages::ALREADY_EXISTS, StatusCode::CONFLICT));
    }

    ensure_active(cancel)?;
    let now = Utc::now();
    let product = Product {
        id: Uuid::new_v4(),
        name: request.name,
        sku: request.sku,
        price: column_price(request.price),
        stock: request.stock,
        company_id,
        store_id: request.store_id,
        created_at: now,
        updated_at: now,
    };
    if let Err(err) = store.insert(&product).await {
        return match err {
            // The SKU was taken after the lookup above.
            PersistenceError::Conflict(index) => {
                tracing::info!(%index, sku = %product.sku, "product sku taken concurrently");
                Ok(ApiResult::fail_with(messages::ALREADY_EXISTS, StatusCode::CONFLICT))
            }
            err => Err(err.into()),
        };
    }

    tracing::info!(product_id = %product.id, sku = %product.sku, "product created");
    Ok(ApiResult::successful_with(product, messages::CREATED, StatusCode::CREATED))
}

/// update
///
/// 404 for an unknown product or store, 409 when another product of the same
/// company holds the SKU.
pub async fn update(
    store: &dyn ProductStore,
    cancel: &CancellationToken,
    command: UpdateProductCommand,
) -> Result<ApiResult<Product>, AppError> {
    let Some(mut product) = store.get_by_id(command.id).await? else {
        return Ok(ApiResult::fail_with(messages::NOT_FOUND, StatusCode::NOT_FOUND));
    };

    let request = command.product;
    let company_id = match resolve_company(store, &request).await? {
        Ok(company_id) => company_id,
        Err(failure) => return Ok(failure),
    };

    if let Some(holder) = store.find_by_sku(company_id, &request.sku).await?
        && holder.id != product.id
    {
        return Ok(ApiResult::fail_with(messages::ANOTHER_EXISTS, StatusCode::CONFLICT));
    }

    ensure_active(cancel)?;
    product.name = request.name;
    product.sku = request.sku;
    product.price = column_price(request.price);
    product.stock = request.stock;
    product.company_id = company_id;
    product.store_id = request.store_id;
    product.updated_at = Utc::now();

    // The row can disappear between the read and the write.
    let updated = match store.update(&product).await {
        Ok(updated) => updated,
        Err(PersistenceError::Conflict(index)) => {
            tracing::info!(%index, sku = %product.sku, "product sku taken concurrently");
            return Ok(ApiResult::fail_with(messages::ANOTHER_EXISTS, StatusCode::CONFLICT));
        }
        Err(err) => return Err(err.into()),
    };
    if !updated {
        return Ok(ApiResult::fail_with(messages::NOT_FOUND, StatusCode::NOT_FOUND));
    }

    tracing::info!(product_id = %product.id, "product updated");
    Ok(ApiResult::successful_with(product, messages::UPDATED, StatusCode::OK))
}

pub async fn delete(
    store: &dyn ProductStore,
    cancel: &CancellationToken,
    command: DeleteProductCommand,
) -> Result<ApiResult<bool>, AppError> {
    ensure_active(cancel)?;
    if !store.delete(command.id).await? {
        return Ok(ApiResult::fail_with(messages::NOT_FOUND, StatusCode::NOT_FOUND));
    }

    tracing::info!(product_id = %command.id, "product deleted");
    Ok(ApiResult::successful_with(true, messages::DELETED, StatusCode::OK))
}

pub async fn products_json(
    store: &dyn ProductStore,
    scope: ProductScope,
) -> Result<String, AppError> {
    Ok(store.products_json(scope).await?)
}

pub async fn products_list(
    store: &dyn ProductStore,
    scope: ProductScope,
) -> Result<String, AppError> {
    let list = store.products_list(scope).await?;
    Ok(list.unwrap_or_else(|| messages::EMPTY_LIST.to_string()))
}
