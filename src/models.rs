use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// --- Persisted Entities ---

/// DocumentType
///
/// The kind of registration number a company is identified by. Stored as an
/// integer column; serialized by name on the wire.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[serde(rename_all = "UPPERCASE")]
#[repr(i32)]
#[ts(export)]
pub enum DocumentType {
    Ein = 1,
    Ssn = 2,
    Cnpj = 3,
}

/// Company
///
/// Row of the `companies` table. `document_number` carries a unique index.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub document_number: String,
    pub document_type: DocumentType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Store
///
/// Row of the `stores` table. `company_id` references `companies.id`.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Store {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub company_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product
///
/// Row of the `products` table, served as-is by the function app.
/// `(sku, company_id)` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    #[ts(type = "string")]
    #[schema(value_type = String, example = "19.90")]
    pub price: Decimal,
    pub stock: i32,
    pub company_id: Uuid,
    pub store_id: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Output Schemas (DTOs) ---

/// CompanyDto
///
/// External projection of a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CompanyDto {
    pub id: Uuid,
    pub name: String,
    pub document_number: String,
    pub document_type: DocumentType,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl From<&Company> for CompanyDto {
    fn from(company: &Company) -> Self {
        Self {
            id: company.id,
            name: company.name.clone(),
            document_number: company.document_number.clone(),
            document_type: company.document_type,
            created_at: company.created_at,
            updated_at: company.updated_at,
        }
    }
}

/// StoreDto
///
/// External projection of a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StoreDto {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub company_id: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl From<&Store> for StoreDto {
    fn from(store: &Store) -> Self {
        Self {
            id: store.id,
            name: store.name.clone(),
            email: store.email.clone(),
            phone: store.phone.clone(),
            address: store.address.clone(),
            city: store.city.clone(),
            state: store.state.clone(),
            zip_code: store.zip_code.clone(),
            company_id: store.company_id,
            created_at: store.created_at,
            updated_at: store.updated_at,
        }
    }
}

// --- Company Commands & Queries ---

/// CreateCompanyCommand
///
/// Body of `POST /api/v1/company`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateCompanyCommand {
    #[schema(example = "Acme")]
    pub name: String,
    #[schema(example = "12345678901234")]
    pub document_number: String,
    pub document_type: DocumentType,
}

/// UpdateCompanyCommand
///
/// Body of `PUT /api/v1/company/{id}`. The body id must match the path id.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateCompanyCommand {
    pub id: Uuid,
    pub name: String,
    pub document_number: String,
    pub document_type: DocumentType,
}

#[derive(Debug, Clone, Copy)]
pub struct GetCompanyByIdQuery {
    pub id: Uuid,
}

#[derive(Debug, Clone, Copy)]
pub struct GetAllCompaniesQuery;

#[derive(Debug, Clone, Copy)]
pub struct DeleteCompanyCommand {
    pub id: Uuid,
}

// --- Store Requests ---

/// StoreRequest
///
/// Body of both `POST /api/v1/store` and `PUT /api/v1/store/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StoreRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub company_id: Uuid,
}

/// UpdateStoreCommand
///
/// A store request bound to the id taken from the path.
#[derive(Debug, Clone)]
pub struct UpdateStoreCommand {
    pub id: Uuid,
    pub store: StoreRequest,
}

#[derive(Debug, Clone, Copy)]
pub struct GetStoreByIdQuery {
    pub id: Uuid,
}

#[derive(Debug, Clone, Copy)]
pub struct GetAllStoresQuery;

#[derive(Debug, Clone, Copy)]
pub struct DeleteStoreCommand {
    pub id: Uuid,
}

// --- Product Requests (function app) ---

/// ProductRequest
///
/// Body of `POST /api/products` and `PUT /api/products/{id}`. When `companyId`
/// is omitted it is taken from the store.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductRequest {
    pub name: String,
    pub sku: String,
    #[ts(type = "string")]
    #[schema(value_type = String, example = "19.90")]
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
    pub store_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<Uuid>,
}

/// UpdateProductCommand
///
/// A product request bound to the id taken from the path.
#[derive(Debug, Clone)]
pub struct UpdateProductCommand {
    pub id: Uuid,
    pub product: ProductRequest,
}

/// ProductFilter
///
/// Query parameters accepted by the product listings. Values that are not
/// valid UUIDs are ignored rather than rejected.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ProductFilter {
    pub company_id: Option<String>,
    pub store_id: Option<String>,
}

/// ProductScope
///
/// The parsed form of `ProductFilter` handed to the product store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProductScope {
    pub company_id: Option<Uuid>,
    pub store_id: Option<Uuid>,
}

impl From<&ProductFilter> for ProductScope {
    fn from(filter: &ProductFilter) -> Self {
        let parse = |raw: &Option<String>| {
            raw.as_deref()
                .filter(|s| !s.is_empty())
                .and_then(|s| Uuid::parse_str(s).ok())
        };
        Self {
            company_id: parse(&filter.company_id),
            store_id: parse(&filter.store_id),
        }
    }
}

impl ProductScope {
    pub fn matches(&self, product: &Product) -> bool {
        self.company_id.is_none_or(|id| product.company_id == id)
            && self.store_id.is_none_or(|id| product.store_id == id)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GetProductByIdQuery {
    pub id: Uuid,
}

#[derive(Debug, Clone, Copy)]
pub struct DeleteProductCommand {
    pub id: Uuid,
}
