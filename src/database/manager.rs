use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::SqlitePool;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// Schema definition co-located with the manager; every statement is
/// idempotent so it can be replayed at startup and at every path switch.
const SCHEMA: &str = include_str!("schema.sql");

/// Errors from the connection manager
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database initialization failed: {0}")]
    Initialization(String),

    #[error("Schema migration failed: {0}")]
    Schema(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Backup failed: {0}")]
    Backup(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

struct Inner {
    path: PathBuf,
    pool: Option<SqlitePool>,
}

/// Owner of the single live SQLite handle for the process.
///
/// Constructed once at startup and injected into handlers through axum
/// state. All reinitialization paths (lazy reopen, retry-driven reopen,
/// `switch_path`) funnel through one write lock so an in-flight request
/// never observes a half-closed handle.
pub struct Database {
    inner: RwLock<Inner>,
    generation: AtomicU64,
}

impl Database {
    const MAX_RETRIES: u32 = 3;
    const BACKOFF_BASE: Duration = Duration::from_secs(1);
    const BACKOFF_CAP: Duration = Duration::from_secs(5);

    /// Open the store at `path`, creating missing parent directories.
    /// Fatal at startup; at runtime the same path is retried through
    /// `reinitialize`.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, DatabaseError> {
        let path = resolve_path(path.into());
        let pool = Self::connect(&path).await?;
        info!("Opened database at {}", path.display());

        Ok(Self {
            inner: RwLock::new(Inner {
                path,
                pool: Some(pool),
            }),
            generation: AtomicU64::new(1),
        })
    }

    async fn connect(path: &Path) -> Result<SqlitePool, DatabaseError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::Initialization(e.to_string()))?;
            }
        }

        let busy_timeout = crate::config::config().database.busy_timeout_secs;

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(busy_timeout))
            // 64 MiB page cache, temp tables in memory, 256 MiB mmap ceiling
            .pragma("cache_size", "-64000")
            .pragma("temp_store", "MEMORY")
            .pragma("mmap_size", "268435456");

        // A single connection keeps one live handle for the process; WAL
        // still permits concurrent readers at the engine level.
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::Initialization(e.to_string()))
    }

    /// Apply the embedded schema as one batch. Failure is fatal at boot:
    /// the process cannot serve correctly against an unmigrated store.
    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        let pool = self.pool().await?;
        Self::apply_schema(&pool).await
    }

    async fn apply_schema(pool: &SqlitePool) -> Result<(), DatabaseError> {
        sqlx::raw_sql(SCHEMA)
            .execute(pool)
            .await
            .map_err(|e| DatabaseError::Schema(e.to_string()))?;
        Ok(())
    }

    /// Return the live pool. If the manager believes itself uninitialized,
    /// one transparent re-initialization is attempted, so callers either
    /// get a usable handle or the re-initialization error.
    pub async fn pool(&self) -> Result<SqlitePool, DatabaseError> {
        {
            let inner = self.inner.read().await;
            if let Some(pool) = &inner.pool {
                return Ok(pool.clone());
            }
        }
        self.reinitialize(false).await
    }

    /// Close and reopen the handle at the current path, replaying the
    /// schema. With `force` false this is a no-op when a pool is already
    /// live (another caller may have won the race for the write lock).
    async fn reinitialize(&self, force: bool) -> Result<SqlitePool, DatabaseError> {
        let mut inner = self.inner.write().await;

        if !force {
            if let Some(pool) = &inner.pool {
                return Ok(pool.clone());
            }
        }

        if let Some(old) = inner.pool.take() {
            old.close().await;
        }

        let pool = Self::connect(&inner.path).await?;
        Self::apply_schema(&pool).await?;
        inner.pool = Some(pool.clone());
        self.generation.fetch_add(1, Ordering::SeqCst);
        info!("Reinitialized database at {}", inner.path.display());
        Ok(pool)
    }

    /// Trivial probe against the live handle. On any failure, exactly one
    /// full re-initialization and re-probe; never errors, never retries
    /// more than once (this backs a health endpoint).
    pub async fn health_check(&self) -> bool {
        match self.probe().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Health probe failed, attempting re-initialization: {}", e);
                match self.reinitialize(true).await {
                    Ok(_) => self.probe().await.is_ok(),
                    Err(e) => {
                        error!("Re-initialization failed during health check: {}", e);
                        false
                    }
                }
            }
        }
    }

    async fn probe(&self) -> Result<(), DatabaseError> {
        let pool = {
            let inner = self.inner.read().await;
            inner
                .pool
                .clone()
                .ok_or_else(|| DatabaseError::Initialization("not initialized".to_string()))?
        };
        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(())
    }

    /// Run `op` with the live pool, retrying up to the default bound.
    pub async fn execute_with_retry<T, F, Fut>(&self, op: F) -> Result<T, DatabaseError>
    where
        F: Fn(SqlitePool) -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        self.execute_with_retries(op, Self::MAX_RETRIES).await
    }

    /// Run `op` with the live pool. On failure, sleep an exponential
    /// backoff (1s base, doubling, capped at 5s) and re-initialize the
    /// connection before the next attempt. After exhausting the bound the
    /// last observed error is surfaced to the caller.
    pub async fn execute_with_retries<T, F, Fut>(
        &self,
        op: F,
        max_retries: u32,
    ) -> Result<T, DatabaseError>
    where
        F: Fn(SqlitePool) -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        let mut last_error = DatabaseError::Query("no attempts made".to_string());

        for attempt in 0..max_retries.max(1) {
            match self.pool().await {
                Ok(pool) => match op(pool).await {
                    Ok(value) => return Ok(value),
                    Err(e) => {
                        warn!("Database operation failed (attempt {}): {}", attempt + 1, e);
                        last_error = DatabaseError::Query(e.to_string());
                    }
                },
                Err(e) => {
                    warn!(
                        "Could not acquire database handle (attempt {}): {}",
                        attempt + 1,
                        e
                    );
                    last_error = e;
                }
            }

            if attempt + 1 < max_retries.max(1) {
                tokio::time::sleep(Self::backoff_delay(attempt)).await;
                if let Err(e) = self.reinitialize(true).await {
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    fn backoff_delay(attempt: u32) -> Duration {
        let doubled = Self::BACKOFF_BASE * 2u32.saturating_pow(attempt);
        doubled.min(Self::BACKOFF_CAP)
    }

    /// Stream a consistent snapshot of the store into a new file.
    pub async fn backup(&self, destination: impl Into<PathBuf>) -> Result<PathBuf, DatabaseError> {
        let destination = resolve_path(destination.into());
        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::Backup(e.to_string()))?;
            }
        }

        let dest_str = destination
            .to_str()
            .ok_or_else(|| DatabaseError::Backup("destination path is not valid UTF-8".into()))?
            .to_string();

        let pool = self.pool().await?;
        sqlx::query("VACUUM INTO ?1")
            .bind(dest_str)
            .execute(&pool)
            .await
            .map_err(|e| DatabaseError::Backup(e.to_string()))?;

        info!("Database backed up to {}", destination.display());
        Ok(destination)
    }

    /// Point the live service at a different data file without a restart.
    /// No-op when the resolved target equals the current path and the
    /// manager is initialized; otherwise close, reopen and re-migrate.
    pub async fn switch_path(&self, new_path: impl Into<PathBuf>) -> Result<(), DatabaseError> {
        let new_path = resolve_path(new_path.into());
        let mut inner = self.inner.write().await;

        if inner.path == new_path && inner.pool.is_some() {
            info!(
                "Database already active at {}, nothing to do",
                new_path.display()
            );
            return Ok(());
        }

        if let Some(old) = inner.pool.take() {
            old.close().await;
        }

        let pool = Self::connect(&new_path).await?;
        Self::apply_schema(&pool).await?;
        inner.path = new_path;
        inner.pool = Some(pool);
        self.generation.fetch_add(1, Ordering::SeqCst);
        info!("Switched database to {}", inner.path.display());
        Ok(())
    }

    /// Close the handle if open; idempotent.
    pub async fn close(&self) {
        let mut inner = self.inner.write().await;
        if let Some(pool) = inner.pool.take() {
            pool.close().await;
            info!("Closed database at {}", inner.path.display());
        }
    }

    /// Current resolved data-file path.
    pub async fn path(&self) -> PathBuf {
        self.inner.read().await.path.clone()
    }

    /// Monotonic handle identity; bumps on every successful (re)open.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

fn resolve_path(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(&path))
            .unwrap_or(path)
    }
}
