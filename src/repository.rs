use crate::config::AppConfig;
use crate::error::PersistenceError;
use crate::models::{Company, Store};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// CompanyRepository
///
/// Read access goes straight to the store. Writes (`add`, `update`, `remove`)
/// are only recorded against the scope's unit of work and become visible after
/// `UnitOfWork::commit`.
///
/// **Send + Sync + async_trait** let the trait object travel across Axum's
/// task boundaries inside a `Scope`.
#[async_trait]
pub trait CompanyRepository: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Company>, PersistenceError>;
    async fn get_by_document_number(
        &self,
        document_number: &str,
    ) -> Result<Option<Company>, PersistenceError>;
    // Ordered by name.
    async fn get_all(&self) -> Result<Vec<Company>, PersistenceError>;

    async fn add(&self, company: Company) -> Result<(), PersistenceError>;
    async fn update(&self, company: Company) -> Result<(), PersistenceError>;
    async fn remove(&self, company: &Company) -> Result<(), PersistenceError>;
}

/// StoreRepository
///
/// Same write semantics as `CompanyRepository`.
#[async_trait]
pub trait StoreRepository: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Store>, PersistenceError>;
    // Ordered by name.
    async fn get_all(&self) -> Result<Vec<Store>, PersistenceError>;

    async fn add(&self, store: Store) -> Result<(), PersistenceError>;
    async fn update(&self, store: Store) -> Result<(), PersistenceError>;
    async fn remove(&self, store: &Store) -> Result<(), PersistenceError>;
}

/// UnitOfWork
///
/// The single transactional boundary of a request.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Applies every pending change atomically and returns the number of rows
    /// written. Refuses to start once `cancel` has fired; the pending changes
    /// stay tracked until `rollback`.
    async fn commit(&self, cancel: &CancellationToken) -> Result<u64, PersistenceError>;

    /// Discards pending changes without touching the store.
    async fn rollback(&self);
}

/// Scope
///
/// The per-request bundle of collaborators. All three share one change
/// tracker; nothing in a scope outlives the request that created it.
#[derive(Clone)]
pub struct Scope {
    pub companies: Arc<dyn CompanyRepository>,
    pub stores: Arc<dyn StoreRepository>,
    pub unit_of_work: Arc<dyn UnitOfWork>,
}

impl Scope {
    /// Commits the unit of work, rolling it back when the commit fails so no
    /// change of this scope survives the error.
    pub async fn commit(&self, cancel: &CancellationToken) -> Result<u64, PersistenceError> {
        match self.unit_of_work.commit(cancel).await {
            Ok(written) => Ok(written),
            Err(err) => {
                self.unit_of_work.rollback().await;
                Err(err)
            }
        }
    }
}

/// Database
///
/// Process-wide handle that hands out fresh scopes.
pub trait Database: Send + Sync {
    fn scope(&self) -> Scope;
}

/// DatabaseState
///
/// The concrete type used to share the persistence layer across the application state.
pub type DatabaseState = Arc<dyn Database>;

// --- Change Tracking ---

/// Change
///
/// A write recorded by a repository and waiting for commit.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    AddCompany(Company),
    UpdateCompany(Company),
    RemoveCompany(Uuid),
    AddStore(Store),
    UpdateStore(Store),
    RemoveStore(Uuid),
}

/// ChangeTracker
///
/// Ordered buffer of pending changes shared by the repositories and the unit
/// of work of one scope.
#[derive(Clone, Default)]
pub struct ChangeTracker {
    pending: Arc<Mutex<Vec<Change>>>,
}

impl ChangeTracker {
    pub async fn track(&self, change: Change) {
        self.pending.lock().await.push(change);
    }

    pub async fn take(&self) -> Vec<Change> {
        std::mem::take(&mut *self.pending.lock().await)
    }
}

// --- Postgres Implementation ---

const COMPANY_COLUMNS: &str =
    "id, name, document_number, document_type, created_at, updated_at";
const STORE_COLUMNS: &str =
    "id, name, email, phone, address, city, state, zip_code, company_id, created_at, updated_at";

/// connect
///
/// Opens the Postgres pool described by the configuration and, when
/// `run_migrations` is set, brings the schema up to date.
pub async fn connect(config: &AppConfig) -> Result<PgPool, PersistenceError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.db_url)
        .await?;

    if config.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("database migrations applied");
    }
    Ok(pool)
}

/// PostgresDatabase
///
/// The concrete implementation of `Database`, backed by the Postgres pool.
pub struct PostgresDatabase {
    pool: PgPool,
}

impl PostgresDatabase {
    /// Creates a new database handle using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl Database for PostgresDatabase {
    fn scope(&self) -> Scope {
        let tracker = ChangeTracker::default();
        Scope {
            companies: Arc::new(PgCompanyRepository {
                pool: self.pool.clone(),
                tracker: tracker.clone(),
            }),
            stores: Arc::new(PgStoreRepository {
                pool: self.pool.clone(),
                tracker: tracker.clone(),
            }),
            unit_of_work: Arc::new(PgUnitOfWork {
                pool: self.pool.clone(),
                tracker,
            }),
        }
    }
}

struct PgCompanyRepository {
    pool: PgPool,
    tracker: ChangeTracker,
}

#[async_trait]
impl CompanyRepository for PgCompanyRepository {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Company>, PersistenceError> {
        let query = format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE id = $1");
        let company = sqlx::query_as::<_, Company>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(company)
    }

    async fn get_by_document_number(
        &self,
        document_number: &str,
    ) -> Result<Option<Company>, PersistenceError> {
        let query = format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE document_number = $1");
        let company = sqlx::query_as::<_, Company>(&query)
            .bind(document_number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(company)
    }

    async fn get_all(&self) -> Result<Vec<Company>, PersistenceError> {
        let query = format!("SELECT {COMPANY_COLUMNS} FROM companies ORDER BY name");
        let companies = sqlx::query_as::<_, Company>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(companies)
    }

    async fn add(&self, company: Company) -> Result<(), PersistenceError> {
        self.tracker.track(Change::AddCompany(company)).await;
        Ok(())
    }

    async fn update(&self, company: Company) -> Result<(), PersistenceError> {
        self.tracker.track(Change::UpdateCompany(company)).await;
        Ok(())
    }

    async fn remove(&self, company: &Company) -> Result<(), PersistenceError> {
        self.tracker.track(Change::RemoveCompany(company.id)).await;
        Ok(())
    }
}

struct PgStoreRepository {
    pool: PgPool,
    tracker: ChangeTracker,
}

#[async_trait]
impl StoreRepository for PgStoreRepository {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Store>, PersistenceError> {
        let query = format!("SELECT {STORE_COLUMNS} FROM stores WHERE id = $1");
        let store = sqlx::query_as::<_, Store>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(store)
    }

    async fn get_all(&self) -> Result<Vec<Store>, PersistenceError> {
        let query = format!("SELECT {STORE_COLUMNS} FROM stores ORDER BY name");
        let stores = sqlx::query_as::<_, Store>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(stores)
    }

    async fn add(&self, store: Store) -> Result<(), PersistenceError> {
        self.tracker.track(Change::AddStore(store)).await;
        Ok(())
    }

    async fn update(&self, store: Store) -> Result<(), PersistenceError> {
        self.tracker.track(Change::UpdateStore(store)).await;
        Ok(())
    }

    async fn remove(&self, store: &Store) -> Result<(), PersistenceError> {
        self.tracker.track(Change::RemoveStore(store.id)).await;
        Ok(())
    }
}

struct PgUnitOfWork {
    pool: PgPool,
    tracker: ChangeTracker,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    /// commit
    ///
    /// Opens one transaction, replays the tracked changes in order and commits.
    /// Any statement failure drops the transaction, which rolls it back.
    async fn commit(&self, cancel: &CancellationToken) -> Result<u64, PersistenceError> {
        if cancel.is_cancelled() {
            return Err(PersistenceError::Cancelled);
        }
        let changes = self.tracker.take().await;
        if changes.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut written = 0;
        for change in &changes {
            written += apply(&mut tx, change).await?;
        }
        tx.commit().await?;

        tracing::debug!(changes = changes.len(), rows = written, "unit of work committed");
        Ok(written)
    }

    async fn rollback(&self) {
        let discarded = self.tracker.take().await;
        tracing::debug!(discarded = discarded.len(), "unit of work rolled back");
    }
}

async fn apply(tx: &mut Transaction<'_, Postgres>, change: &Change) -> Result<u64, sqlx::Error> {
    let result = match change {
        Change::AddCompany(c) => {
            sqlx::query(
                "INSERT INTO companies (id, name, document_number, document_type, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(c.id)
            .bind(&c.name)
            .bind(&c.document_number)
            .bind(c.document_type)
            .bind(c.created_at)
            .bind(c.updated_at)
            .execute(&mut **tx)
            .await?
        }
        Change::UpdateCompany(c) => {
            sqlx::query(
                "UPDATE companies SET name = $2, document_number = $3, document_type = $4, updated_at = $5 \
                 WHERE id = $1",
            )
            .bind(c.id)
            .bind(&c.name)
            .bind(&c.document_number)
            .bind(c.document_type)
            .bind(c.updated_at)
            .execute(&mut **tx)
            .await?
        }
        Change::RemoveCompany(id) => {
            sqlx::query("DELETE FROM companies WHERE id = $1")
                .bind(id)
                .execute(&mut **tx)
                .await?
        }
        Change::AddStore(s) => {
            sqlx::query(
                "INSERT INTO stores (id, name, email, phone, address, city, state, zip_code, company_id, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            )
            .bind(s.id)
            .bind(&s.name)
            .bind(&s.email)
            .bind(&s.phone)
            .bind(&s.address)
            .bind(&s.city)
            .bind(&s.state)
            .bind(&s.zip_code)
            .bind(s.company_id)
            .bind(s.created_at)
            .bind(s.updated_at)
            .execute(&mut **tx)
            .await?
        }
        Change::UpdateStore(s) => {
            sqlx::query(
                "UPDATE stores SET name = $2, email = $3, phone = $4, address = $5, city = $6, \
                 state = $7, zip_code = $8, company_id = $9, updated_at = $10 WHERE id = $1",
            )
            .bind(s.id)
            .bind(&s.name)
            .bind(&s.email)
            .bind(&s.phone)
            .bind(&s.address)
            .bind(&s.city)
            .bind(&s.state)
            .bind(&s.zip_code)
            .bind(s.company_id)
            .bind(s.updated_at)
            .execute(&mut **tx)
            .await?
        }
        Change::RemoveStore(id) => {
            sqlx::query("DELETE FROM stores WHERE id = $1")
                .bind(id)
                .execute(&mut **tx)
                .await?
        }
    };
    Ok(result.rows_affected())
}

// --- In-Memory Implementation (For Tests) ---

/// CallCounts
///
/// How many times each persistence entry point was hit on an `InMemoryDatabase`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub adds: usize,
    pub updates: usize,
    pub removes: usize,
    pub commits: usize,
    pub rollbacks: usize,
}

#[derive(Default)]
struct Counters {
    adds: AtomicUsize,
    updates: AtomicUsize,
    removes: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

#[derive(Clone, Default)]
struct Tables {
    companies: HashMap<Uuid, Company>,
    stores: HashMap<Uuid, Store>,
}

impl Tables {
    /// Mirrors `ix_companies_document_number`.
    fn check_document_number(&self, company: &Company) -> Result<(), PersistenceError> {
        let taken = self
            .companies
            .values()
            .any(|c| c.id != company.id && c.document_number == company.document_number);
        if taken {
            return Err(PersistenceError::Conflict(
                "ix_companies_document_number".to_string(),
            ));
        }
        Ok(())
    }
}

/// InMemoryDatabase
///
/// A `Database` with the same change-tracking semantics as Postgres, used to
/// exercise handlers and routers without a server. It counts write and commit
/// calls and can be told to fail every commit.
#[derive(Clone, Default)]
pub struct InMemoryDatabase {
    tables: Arc<Mutex<Tables>>,
    counters: Arc<Counters>,
    fail_commits: Arc<AtomicBool>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subsequent commit fails with `PersistenceError::Unavailable`.
    pub fn failing() -> Self {
        let db = Self::default();
        db.fail_commits.store(true, Ordering::SeqCst);
        db
    }

    pub fn calls(&self) -> CallCounts {
        CallCounts {
            adds: self.counters.adds.load(Ordering::SeqCst),
            updates: self.counters.updates.load(Ordering::SeqCst),
            removes: self.counters.removes.load(Ordering::SeqCst),
            commits: self.counters.commits.load(Ordering::SeqCst),
            rollbacks: self.counters.rollbacks.load(Ordering::SeqCst),
        }
    }

    /// Seeds a committed company without touching the counters.
    pub async fn seed_company(&self, company: Company) {
        self.tables.lock().await.companies.insert(company.id, company);
    }

    /// Seeds a committed store without touching the counters.
    pub async fn seed_store(&self, store: Store) {
        self.tables.lock().await.stores.insert(store.id, store);
    }

    pub async fn company(&self, id: Uuid) -> Option<Company> {
        self.tables.lock().await.companies.get(&id).cloned()
    }

    pub async fn store(&self, id: Uuid) -> Option<Store> {
        self.tables.lock().await.stores.get(&id).cloned()
    }
}

impl Database for InMemoryDatabase {
    fn scope(&self) -> Scope {
        let tracker = ChangeTracker::default();
        let handle = MemoryHandle {
            db: self.clone(),
            tracker,
        };
        Scope {
            companies: Arc::new(handle.clone()),
            stores: Arc::new(handle.clone()),
            unit_of_work: Arc::new(handle),
        }
    }
}

#[derive(Clone)]
struct MemoryHandle {
    db: InMemoryDatabase,
    tracker: ChangeTracker,
}

impl MemoryHandle {
    async fn record(&self, counter: &AtomicUsize, change: Change) {
        counter.fetch_add(1, Ordering::SeqCst);
        self.tracker.track(change).await;
    }
}

#[async_trait]
impl CompanyRepository for MemoryHandle {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Company>, PersistenceError> {
        Ok(self.db.company(id).await)
    }

    async fn get_by_document_number(
        &self,
        document_number: &str,
    ) -> Result<Option<Company>, PersistenceError> {
        let tables = self.db.tables.lock().await;
        Ok(tables
            .companies
            .values()
            .find(|c| c.document_number == document_number)
            .cloned())
    }

    async fn get_all(&self) -> Result<Vec<Company>, PersistenceError> {
        let tables = self.db.tables.lock().await;
        let mut companies: Vec<Company> = tables.companies.values().cloned().collect();
        companies.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(companies)
    }

    async fn add(&self, company: Company) -> Result<(), PersistenceError> {
        self.record(&self.db.counters.adds, Change::AddCompany(company)).await;
        Ok(())
    }

    async fn update(&self, company: Company) -> Result<(), PersistenceError> {
        self.record(&self.db.counters.updates, Change::UpdateCompany(company)).await;
        Ok(())
    }

    async fn remove(&self, company: &Company) -> Result<(), PersistenceError> {
        self.record(&self.db.counters.removes, Change::RemoveCompany(company.id)).await;
        Ok(())
    }
}

#[async_trait]
impl StoreRepository for MemoryHandle {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Store>, PersistenceError> {
        Ok(self.db.store(id).await)
    }

    async fn get_all(&self) -> Result<Vec<Store>, PersistenceError> {
        let tables = self.db.tables.lock().await;
        let mut stores: Vec<Store> = tables.stores.values().cloned().collect();
        stores.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(stores)
    }

    async fn add(&self, store: Store) -> Result<(), PersistenceError> {
        self.record(&self.db.counters.adds, Change::AddStore(store)).await;
        Ok(())
    }

    async fn update(&self, store: Store) -> Result<(), PersistenceError> {
        self.record(&self.db.counters.updates, Change::UpdateStore(store)).await;
        Ok(())
    }

    async fn remove(&self, store: &Store) -> Result<(), PersistenceError> {
        self.record(&self.db.counters.removes, Change::RemoveStore(store.id)).await;
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for MemoryHandle {
    async fn commit(&self, cancel: &CancellationToken) -> Result<u64, PersistenceError> {
        self.db.counters.commits.fetch_add(1, Ordering::SeqCst);
        if cancel.is_cancelled() {
            return Err(PersistenceError::Cancelled);
        }
        if self.db.fail_commits.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable("commit refused".to_string()));
        }
        let changes = self.tracker.take().await;

        let mut tables = self.db.tables.lock().await;
        // Applied to a copy and swapped in only when every change fits.
        let mut staged = tables.clone();
        let mut written = 0;
        for change in changes {
            let hit = match change {
                Change::AddCompany(c) => {
                    staged.check_document_number(&c)?;
                    staged.companies.insert(c.id, c).is_none()
                }
                Change::UpdateCompany(c) => {
                    staged.check_document_number(&c)?;
                    staged.companies.insert(c.id, c).is_some()
                }
                Change::RemoveCompany(id) => {
                    // Mirrors the cascading foreign key on stores.company_id.
                    staged.stores.retain(|_, s| s.company_id != id);
                    staged.companies.remove(&id).is_some()
                }
                Change::AddStore(s) => staged.stores.insert(s.id, s).is_none(),
                Change::UpdateStore(s) => staged.stores.insert(s.id, s).is_some(),
                Change::RemoveStore(id) => staged.stores.remove(&id).is_some(),
            };
            written += u64::from(hit);
        }
        *tables = staged;
        Ok(written)
    }

    async fn rollback(&self) {
        self.db.counters.rollbacks.fetch_add(1, Ordering::SeqCst);
        self.tracker.take().await;
    }
}
