use crate::error::PersistenceError;
use crate::models::{Product, ProductScope};
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// ProductStore
///
/// Direct data access for the product function app. Unlike the company and
/// store repositories there is no unit of work: every write is a single
/// statement that commits on its own.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Products matching the scope, ordered by name.
    async fn get_all(&self, scope: ProductScope) -> Result<Vec<Product>, PersistenceError>;
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Product>, PersistenceError>;
    async fn find_by_sku(
        &self,
        company_id: Uuid,
        sku: &str,
    ) -> Result<Option<Product>, PersistenceError>;

    /// The owning company of a store, `None` when the store does not exist.
    async fn store_company(&self, store_id: Uuid) -> Result<Option<Uuid>, PersistenceError>;

    async fn insert(&self, product: &Product) -> Result<(), PersistenceError>;
    /// Returns false when no row carries `product.id`.
    async fn update(&self, product: &Product) -> Result<bool, PersistenceError>;
    /// Returns false when no row carries `id`.
    async fn delete(&self, id: Uuid) -> Result<bool, PersistenceError>;

    /// A JSON array of the scoped products, rendered by the database.
    async fn products_json(&self, scope: ProductScope) -> Result<String, PersistenceError>;
    /// One line per scoped product, rendered by the database. `None` when the
    /// scope is empty.
    async fn products_list(&self, scope: ProductScope)
    -> Result<Option<String>, PersistenceError>;
}

/// ProductStoreState
///
/// The concrete type shared through the function app's state.
pub type ProductStoreState = Arc<dyn ProductStore>;

/// Text rendering of a single product used by the plain-text listing.
pub fn list_line(product: &Product) -> String {
    format!(
        "{} - SKU: {} - Price: {:.2} - Stock: {}",
        product.name, product.sku, product.price, product.stock
    )
}

// --- Postgres Implementation ---

const PRODUCT_COLUMNS: &str =
    "id, name, sku, price, stock, company_id, store_id, created_at, updated_at";

/// PgProductStore
///
/// `ProductStore` over the shared Postgres pool.
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn get_all(&self, scope: ProductScope) -> Result<Vec<Product>, PersistenceError> {
        // NULL parameters disable their filter.
        let query = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE ($1::uuid IS NULL OR company_id = $1) AND ($2::uuid IS NULL OR store_id = $2) \
             ORDER BY name"
        );
        let products = sqlx::query_as::<_, Product>(&query)
            .bind(scope.company_id)
            .bind(scope.store_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Product>, PersistenceError> {
        let query = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let product = sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    async fn find_by_sku(
        &self,
        company_id: Uuid,
        sku: &str,
    ) -> Result<Option<Product>, PersistenceError> {
        let query =
            format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE company_id = $1 AND sku = $2");
        let product = sqlx::query_as::<_, Product>(&query)
            .bind(company_id)
            .bind(sku)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    async fn store_company(&self, store_id: Uuid) -> Result<Option<Uuid>, PersistenceError> {
        let company_id = sqlx::query_scalar::<_, Uuid>("SELECT company_id FROM stores WHERE id = $1")
            .bind(store_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(company_id)
    }

    async fn insert(&self, product: &Product) -> Result<(), PersistenceError> {
        sqlx::query(
            "INSERT INTO products (id, name, sku, price, stock, company_id, store_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.sku)
        .bind(product.price)
        .bind(product.stock)
        .bind(product.company_id)
        .bind(product.store_id)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, product: &Product) -> Result<bool, PersistenceError> {
        let result = sqlx::query(
            "UPDATE products SET name = $2, sku = $3, price = $4, stock = $5, \
             company_id = $6, store_id = $7, updated_at = $8 WHERE id = $1",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.sku)
        .bind(product.price)
        .bind(product.stock)
        .bind(product.company_id)
        .bind(product.store_id)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, PersistenceError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn products_json(&self, scope: ProductScope) -> Result<String, PersistenceError> {
        let json = sqlx::query_scalar::<_, Option<String>>("SELECT get_products_json($1, $2)")
            .bind(scope.company_id)
            .bind(scope.store_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(json.unwrap_or_else(|| "[]".to_string()))
    }

    async fn products_list(
        &self,
        scope: ProductScope,
    ) -> Result<Option<String>, PersistenceError> {
        let list = sqlx::query_scalar::<_, Option<String>>("SELECT get_products_list($1, $2)")
            .bind(scope.company_id)
            .bind(scope.store_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(list)
    }
}

// --- In-Memory Implementation (For Tests) ---

/// InMemoryProductStore
///
/// Products and the store-to-company map kept in process. Renders the JSON and
/// text listings the same way the SQL functions do.
#[derive(Clone, Default)]
pub struct InMemoryProductStore {
    products: Arc<Mutex<HashMap<Uuid, Product>>>,
    stores: Arc<Mutex<HashMap<Uuid, Uuid>>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a store owned by `company_id`.
    pub async fn seed_store(&self, store_id: Uuid, company_id: Uuid) {
        self.stores.lock().await.insert(store_id, company_id);
    }

    pub async fn seed_product(&self, product: Product) {
        self.products.lock().await.insert(product.id, product);
    }

    pub async fn len(&self) -> usize {
        self.products.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.products.lock().await.is_empty()
    }

    async fn scoped(&self, scope: ProductScope) -> Vec<Product> {
        let products = self.products.lock().await;
        let mut matching: Vec<Product> = products
            .values()
            .filter(|p| scope.matches(p))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name));
        matching
    }
}

/// Mirrors `ix_products_sku_company_id`.
fn check_sku(products: &HashMap<Uuid, Product>, product: &Product) -> Result<(), PersistenceError> {
    let taken = products.values().any(|p| {
        p.id != product.id && p.company_id == product.company_id && p.sku == product.sku
    });
    if taken {
        return Err(PersistenceError::Conflict(
            "ix_products_sku_company_id".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn get_all(&self, scope: ProductScope) -> Result<Vec<Product>, PersistenceError> {
        Ok(self.scoped(scope).await)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Product>, PersistenceError> {
        Ok(self.products.lock().await.get(&id).cloned())
    }

    async fn find_by_sku(
        &self,
        company_id: Uuid,
        sku: &str,
    ) -> Result<Option<Product>, PersistenceError> {
        let products = self.products.lock().await;
        Ok(products
            .values()
            .find(|p| p.company_id == company_id && p.sku == sku)
            .cloned())
    }

    async fn store_company(&self, store_id: Uuid) -> Result<Option<Uuid>, PersistenceError> {
        Ok(self.stores.lock().await.get(&store_id).copied())
    }

    async fn insert(&self, product: &Product) -> Result<(), PersistenceError> {
        let mut products = self.products.lock().await;
        check_sku(&products, product)?;
        products.insert(product.id, product.clone());
        Ok(())
    }

    async fn update(&self, product: &Product) -> Result<bool, PersistenceError> {
        let mut products = self.products.lock().await;
        check_sku(&products, product)?;
        match products.get_mut(&product.id) {
            Some(existing) => {
                *existing = product.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, PersistenceError> {
        Ok(self.products.lock().await.remove(&id).is_some())
    }

    async fn products_json(&self, scope: ProductScope) -> Result<String, PersistenceError> {
        let products = self.scoped(scope).await;
        serde_json::to_string(&products)
            .map_err(|e| PersistenceError::Unavailable(format!("json rendering failed: {e}")))
    }

    async fn products_list(
        &self,
        scope: ProductScope,
    ) -> Result<Option<String>, PersistenceError> {
        let products = self.scoped(scope).await;
        if products.is_empty() {
            return Ok(None);
        }
        let lines: Vec<String> = products.iter().map(list_line).collect();
        Ok(Some(lines.join("\n")))
    }
}
