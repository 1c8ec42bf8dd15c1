//! Database Layer with Connection Pooling and Safe Transactions
//!
//! SQLite persistence for projects and their generated contents:
//! - Connection pooling via r2d2; every operation leases one connection
//!   and returns it when the call ends
//! - Leases are health-checked on checkout, idle and aged connections are
//!   recycled
//! - Panic-safe transactions with automatic rollback
//! - Guarded status transitions (`pending` is the only non-terminal state)

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};

use crate::constants::storage as storage_constants;
use crate::types::{
    Content, HookError, IdeaItem, Project, ProjectStatus, Result, ResultExt,
};

const SCHEMA: &str = include_str!("schema.sql");

/// Current schema version for migration tracking
const SCHEMA_VERSION: u32 = 1;

/// Connection pool configuration
///
/// Pool size is dynamically calculated based on CPU cores for optimal performance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool
    pub max_size: u32,
    /// Minimum idle connections to keep ready
    pub min_idle: u32,
    /// Timeout for acquiring a connection (seconds)
    pub connection_timeout_secs: u64,
    /// Idle connections are closed after this long (seconds)
    pub idle_timeout_secs: u64,
    /// Connections are replaced after this long (seconds)
    pub max_lifetime_secs: u64,
}

impl PoolConfig {
    /// Minimum pool size regardless of CPU count
    const MIN_POOL_SIZE: u32 = 4;
    /// Maximum pool size regardless of CPU count
    const MAX_POOL_SIZE: u32 = 16;

    /// Calculate pool size based on available CPU cores
    ///
    /// Formula: clamp(cores * 2, MIN, MAX)
    pub fn optimal_pool_size() -> u32 {
        let cores = std::thread::available_parallelism()
            .map(|p| p.get() as u32)
            .unwrap_or(4);

        (cores * 2).clamp(Self::MIN_POOL_SIZE, Self::MAX_POOL_SIZE)
    }

    /// Create config with automatic pool sizing based on CPU cores
    pub fn auto() -> Self {
        let max_size = Self::optimal_pool_size();
        Self {
            max_size,
            min_idle: (max_size / 4).max(1),
            connection_timeout_secs: 30,
            idle_timeout_secs: storage_constants::IDLE_TIMEOUT_SECS,
            max_lifetime_secs: storage_constants::MAX_LIFETIME_SECS,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::auto()
    }
}

/// Thread-safe database with connection pooling.
///
/// Cloning is cheap and shares the underlying pool.
#[derive(Clone)]
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.pool.state();
        f.debug_struct("Database")
            .field("connections", &state.connections)
            .field("idle_connections", &state.idle_connections)
            .finish()
    }
}

impl Database {
    /// Open database with connection pooling at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, PoolConfig::default())
    }

    /// Open database with custom pool configuration.
    ///
    /// Fails if the minimum idle connections cannot be established.
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: PoolConfig) -> Result<Self> {
        let pool = Self::pool_builder(&config)
            .build(Self::manager(path.as_ref()))
            .map_err(|e| HookError::Storage(format!("Failed to create connection pool: {}", e)))?;

        Ok(Self { pool })
    }

    /// Open without connecting up front.
    ///
    /// Connections are established on first lease, so an unreachable file
    /// surfaces as a `Storage` error from each operation instead of here.
    pub fn open_deferred<P: AsRef<Path>>(path: P, config: PoolConfig) -> Self {
        let pool = Self::pool_builder(&config).build_unchecked(Self::manager(path.as_ref()));
        Self { pool }
    }

    fn manager(path: &Path) -> SqliteConnectionManager {
        SqliteConnectionManager::file(path).with_init(Self::configure_connection)
    }

    fn pool_builder(config: &PoolConfig) -> r2d2::Builder<SqliteConnectionManager> {
        Pool::builder()
            .max_size(config.max_size)
            .min_idle(Some(config.min_idle))
            .test_on_check_out(true)
            .connection_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_secs)))
            .max_lifetime(Some(Duration::from_secs(config.max_lifetime_secs)))
    }

    /// Open an in-memory database for testing or temporary use.
    ///
    /// A single connection is kept alive for the life of the pool since
    /// every new in-memory connection is a fresh, empty database.
    pub fn open_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory().with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)
            .map_err(|e| HookError::Storage(format!("Failed to create in-memory pool: {}", e)))?;

        Ok(Self { pool })
    }

    /// Configure a new connection with production-ready settings.
    fn configure_connection(conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            "#,
        )?;
        Ok(())
    }

    /// Lease a connection from the pool.
    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| {
            HookError::Storage(format!("Failed to acquire database connection: {}", e))
        })
    }

    /// Create tables if absent.
    pub fn initialize(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA)
            .with_context("Failed to initialize database schema")?;

        let current_version: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap_or(0);
        if current_version < SCHEMA_VERSION {
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)
                .with_context("Failed to set schema version")?;
            tracing::info!("Database schema initialized (version {})", SCHEMA_VERSION);
        }

        Ok(())
    }

    /// Execute a function within a panic-safe database transaction.
    ///
    /// All operations within the closure are atomic. If the closure panics,
    /// the transaction is rolled back and an error is returned instead of
    /// poisoning the connection pool.
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + std::panic::UnwindSafe,
    {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .with_context("Failed to start transaction")?;

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(&tx)));

        match result {
            Ok(Ok(value)) => {
                tx.commit().with_context("Failed to commit transaction")?;
                Ok(value)
            }
            // Rolled back on drop
            Ok(Err(e)) => Err(e),
            Err(panic_payload) => {
                let panic_msg = panic_payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic_payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "Unknown panic".to_string());

                tracing::error!("Transaction panicked: {}", panic_msg);
                Err(HookError::Storage(format!(
                    "Transaction panicked: {}",
                    panic_msg
                )))
            }
        }
    }

    // =========================================================================
    // Projects
    // =========================================================================

    /// Insert a new `pending` project and return its id.
    pub fn create_project(&self, url: &str) -> Result<i64> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO projects (url, status, created_at) VALUES (?1, ?2, ?3)",
            params![url, ProjectStatus::Pending.as_str(), now],
        )
        .with_context("Failed to create project")?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_project(&self, id: i64) -> Result<Project> {
        self.conn()?
            .query_row(
                "SELECT id, url, status, created_at FROM projects WHERE id = ?1",
                params![id],
                map_project_row,
            )
            .optional()?
            .ok_or_else(|| HookError::not_found("project", id))
    }

    /// Move a project out of `pending`.
    ///
    /// The update only matches pending rows, so a terminal status is never
    /// overwritten and a finished project never reverts.
    pub fn set_project_status(&self, id: i64, status: ProjectStatus) -> Result<()> {
        if !status.is_terminal() {
            return Err(HookError::InvalidTransition {
                id,
                from: "any".to_string(),
                to: status.to_string(),
            });
        }

        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE projects SET status = ?1 WHERE id = ?2 AND status = ?3",
                params![status.as_str(), id, ProjectStatus::Pending.as_str()],
            )
            .with_context_fn(|| format!("Failed to update status of project {}", id))?;

        if changed == 1 {
            return Ok(());
        }

        let current: Option<String> = conn
            .query_row(
                "SELECT status FROM projects WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        match current {
            None => Err(HookError::not_found("project", id)),
            Some(from) => Err(HookError::InvalidTransition {
                id,
                from,
                to: status.to_string(),
            }),
        }
    }

    /// Newest projects first.
    pub fn list_projects(&self, limit: usize) -> Result<Vec<Project>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, url, status, created_at FROM projects ORDER BY id DESC LIMIT ?1",
        )?;
        let projects = stmt
            .query_map(params![limit as i64], map_project_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(projects)
    }

    /// Delete a project; its contents go with it through the cascade.
    pub fn delete_project(&self, id: i64) -> Result<()> {
        let changed = self
            .conn()?
            .execute("DELETE FROM projects WHERE id = ?1", params![id])
            .with_context_fn(|| format!("Failed to delete project {}", id))?;
        if changed == 0 {
            return Err(HookError::not_found("project", id));
        }
        Ok(())
    }

    // =========================================================================
    // Contents
    // =========================================================================

    pub fn insert_content(
        &self,
        project_id: i64,
        agent_name: &str,
        hook: &str,
        idea: &str,
        source: &str,
    ) -> Result<i64> {
        let conn = self.conn()?;
        insert_content_row(&conn, project_id, agent_name, hook, idea, source)?;
        Ok(conn.last_insert_rowid())
    }

    /// Write all ideas of one agent under a single lease and transaction.
    pub fn insert_ideas(
        &self,
        project_id: i64,
        agent_name: &str,
        ideas: &[IdeaItem],
    ) -> Result<usize> {
        self.transaction(|conn| {
            for item in ideas {
                insert_content_row(
                    conn,
                    project_id,
                    agent_name,
                    &item.hook,
                    &item.content,
                    &item.source,
                )?;
            }
            Ok(ideas.len())
        })
    }

    pub fn list_contents(&self, project_id: i64) -> Result<Vec<Content>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, project_id, agent_name, hook, idea, source
             FROM contents WHERE project_id = ?1 ORDER BY id",
        )?;
        let contents = stmt
            .query_map(params![project_id], |row| {
                Ok(Content {
                    id: row.get(0)?,
                    project_id: row.get(1)?,
                    agent_name: row.get(2)?,
                    hook: row.get(3)?,
                    idea: row.get(4)?,
                    source: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(contents)
    }

    pub fn count_contents(&self, project_id: i64) -> Result<usize> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM contents WHERE project_id = ?1",
            params![project_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

fn insert_content_row(
    conn: &Connection,
    project_id: i64,
    agent_name: &str,
    hook: &str,
    idea: &str,
    source: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO contents (project_id, agent_name, hook, idea, source)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![project_id, agent_name, hook, idea, source],
    )
    .with_context_fn(|| {
        format!(
            "Failed to insert content for project {} (agent {})",
            project_id, agent_name
        )
    })?;
    Ok(())
}

fn map_project_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    let status: String = row.get(2)?;
    let created_at: String = row.get(3)?;
    Ok(Project {
        id: row.get(0)?,
        url: row.get(1)?,
        status: status
            .parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?,
    })
}
