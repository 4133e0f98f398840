//! Database layer for the forecast datastore.
//!
//! This module owns everything the API needs from PostgreSQL: the process-wide connection pool,
//! the two schema groups, row models and repositories.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │      Handlers        │  (API request handlers, holding a request Session)
//! └──────────┬───────────┘
//!            │
//!            ↓
//! ┌──────────────────────┐
//! │     Repositories     │  (db::handlers - queries over one PgConnection)
//! └──────────┬───────────┘
//!            │
//!            ↓
//! ┌──────────────────────┐
//! │ DatabaseConnection   │  (pool + schema groups)
//! └──────────┬───────────┘
//!            │
//!            ↓
//! ┌──────────────────────┐
//! │      PostgreSQL      │
//! └──────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`handlers`]: Repository implementations
//! - [`models`]: Database record structures matching table schemas
//! - [`schema`]: The primary and PV schema groups
//! - [`errors`]: Database-specific error types
//! - [`fake`]: Fake forecast generator for tests (`test-utils` feature)

pub mod errors;
#[cfg(any(test, feature = "test-utils"))]
pub mod fake;
pub mod handlers;
pub mod models;
pub mod schema;

use std::time::Duration;

use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::{info, instrument};

use crate::config::PoolSettings;
use crate::db::errors::Result;
use crate::db::schema::ALL_GROUPS;

/// The process-wide pool, together with schema create/drop for both schema groups.
///
/// Cloning is cheap and shares the same pool.
#[derive(Clone, Debug)]
pub struct DatabaseConnection {
    pool: PgPool,
}

impl DatabaseConnection {
    /// Open a pool against `url` using the given pool settings.
    #[instrument(skip_all, err)]
    pub async fn connect(url: &str, settings: &PoolSettings) -> Result<Self> {
        let mut options = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs));

        if settings.idle_timeout_secs > 0 {
            options = options.idle_timeout(Duration::from_secs(settings.idle_timeout_secs));
        }
        if settings.max_lifetime_secs > 0 {
            options = options.max_lifetime(Duration::from_secs(settings.max_lifetime_secs));
        }

        let pool = options.connect(url).await?;
        info!("Connected to database (max connections: {})", settings.max_connections);
        Ok(Self { pool })
    }

    /// Wrap an existing pool, e.g. the one `#[sqlx::test]` hands to a test.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the tables of every schema group.
    pub async fn create_all(&self) -> Result<()> {
        for group in ALL_GROUPS {
            group.create_tables(&self.pool).await?;
        }
        Ok(())
    }

    /// Drop the tables of every schema group, last group first.
    pub async fn drop_all(&self) -> Result<()> {
        for group in ALL_GROUPS.iter().rev() {
            group.drop_tables(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
