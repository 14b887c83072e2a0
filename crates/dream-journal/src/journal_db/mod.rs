//! Journal database module - SQLite-based storage for dreams, theme analyses and the global analysis
pub mod schema;
pub mod migration;
pub mod dream_store;
pub mod theme_store;
pub mod global_store;
pub use schema::*;
pub use migration::MigrationManager;
pub use dream_store::DreamStore;
pub use theme_store::ThemeStore;
pub use global_store::GlobalAnalysisStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tokio::sync::OnceCell;
use tracing::{error, info};
use crate::error::{StoreError, StoreResult};

/// Pool slot shared by the stores; empty until `initialize()` succeeds.
pub(crate) type SharedPool = Arc<OnceCell<Pool<SqliteConnectionManager>>>;

pub(crate) fn connection(
    pool: &SharedPool,
) -> StoreResult<PooledConnection<SqliteConnectionManager>> {
    let pool = pool.get().ok_or(StoreError::Unavailable)?;
    Ok(pool.get()?)
}

/// Log a failed store operation at the call site and hand the error back.
pub(crate) fn logged<T>(operation: &str, result: StoreResult<T>) -> StoreResult<T> {
    if let Err(e) = &result {
        error!("Failed to {}: {}", operation, e);
    }
    result
}

#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    Memory,
}

/// Handle over the three journal collections.
///
/// Construct one per process and share it (`Arc<JournalDatabase>`). Nothing
/// touches the medium until [`JournalDatabase::initialize`] runs; every store
/// operation before that fails with [`StoreError::Unavailable`].
///
/// Writes go through one statement per record, so two concurrent updates of
/// the same dream resolve as last-write-wins; there are no cross-record
/// transactions.
pub struct JournalDatabase {
    pub dreams: DreamStore,
    pub themes: ThemeStore,
    pub global: GlobalAnalysisStore,
    location: Location,
    pool: SharedPool,
}

impl JournalDatabase {
    pub fn open(db_path: impl Into<PathBuf>) -> Self {
        Self::with_location(Location::File(db_path.into()))
    }

    /// Private in-memory database, mostly for tests. It lives on one pooled
    /// connection that is never reaped, so contents last as long as the handle.
    pub fn in_memory() -> Self {
        Self::with_location(Location::Memory)
    }

    fn with_location(location: Location) -> Self {
        let pool: SharedPool = Arc::new(OnceCell::new());
        Self {
            dreams: DreamStore::new(Arc::clone(&pool)),
            themes: ThemeStore::new(Arc::clone(&pool)),
            global: GlobalAnalysisStore::new(Arc::clone(&pool)),
            location,
            pool,
        }
    }

    /// Idempotent setup. Concurrent callers share a single underlying
    /// initialization; after a failure the next call tries again.
    pub async fn initialize(&self) -> StoreResult<()> {
        self.pool
            .get_or_try_init(|| async {
                let location = self.location.clone();
                tokio::task::spawn_blocking(move || build_pool(&location))
                    .await
                    .map_err(|e| StoreError::Init(format!("initialization task failed: {}", e)))?
            })
            .await
            .map_err(|e| {
                error!("Failed to initialize journal database: {}", e);
                e
            })?;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.pool.initialized()
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            Location::File(path) => Some(path),
            Location::Memory => None,
        }
    }
}

fn build_pool(location: &Location) -> StoreResult<Pool<SqliteConnectionManager>> {
    let (manager, persistent) = match location {
        Location::File(db_path) => {
            info!("Opening journal database at: {}", db_path.display());
            if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(init_err)?;
            }
            let manager = SqliteConnectionManager::file(db_path).with_flags(
                rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                    | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                    | rusqlite::OpenFlags::SQLITE_OPEN_FULL_MUTEX,
            );
            (manager, true)
        }
        Location::Memory => (SqliteConnectionManager::memory(), false),
    };

    let manager = manager.with_init(|conn| {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "synchronous", "NORMAL")
    });

    let builder = if persistent {
        Pool::builder().max_size(10)
    } else {
        // Each in-memory connection is its own database: keep exactly one
        // and never let the reaper close it.
        Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
    };
    let pool = builder.build(manager).map_err(init_err)?;

    {
        let mut conn = pool.get().map_err(init_err)?;
        if persistent {
            let mode: String = conn
                .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
                .map_err(init_err)?;
            info!("Journal mode: {}", mode);
        }
        MigrationManager::new(&mut conn)
            .initialize_database()
            .map_err(init_err)?;
    }

    info!("Journal database initialized successfully");
    Ok(pool)
}

fn init_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Init(e.to_string())
}
