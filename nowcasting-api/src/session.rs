//! Request-scoped database sessions.
//!
//! Handlers never touch the pool directly. They extract a [`DbSession`], which asks the
//! application's [`SessionProvider`] for a [`Session`]:
//!
//! - In production, [`PoolSessionProvider`] begins a fresh transaction per request. The session
//!   is dropped when the request finishes (including on handler errors or client disconnects),
//!   which rolls back anything not committed and returns the connection to the pool.
//! - In tests, `test_utils::SharedSessionProvider` hands every request a clone of the same
//!   scoped session, which lives inside a savepoint of an outer transaction and is rolled back
//!   when the test ends.
//!
//! A [`Session`] is a cheap handle; clones refer to the same underlying connection and access is
//! serialised through an async mutex.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tracing::{instrument, warn};

use crate::{
    AppState,
    db::errors::{DbError, Result as DbResult},
    errors::Error,
};

/// Name of the savepoint a scoped session lives in.
pub(crate) const SCOPED_SAVEPOINT: &str = "scoped_session";

enum Handle {
    /// A transaction begun from the pool, rolled back on drop unless committed
    Transaction(Transaction<'static, Postgres>),
    /// A detached connection inside `BEGIN` + `SAVEPOINT scoped_session`
    Savepoint(PgConnection),
}

fn connection_of(handle: &mut Option<Handle>) -> Option<&mut PgConnection> {
    match handle {
        Some(Handle::Transaction(tx)) => Some(&mut **tx),
        Some(Handle::Savepoint(conn)) => Some(conn),
        None => None,
    }
}

/// A unit of work against the datastore.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Mutex<Option<Handle>>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("id", &Arc::as_ptr(&self.inner)).finish()
    }
}

impl Session {
    fn new(handle: Handle) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(handle))),
        }
    }

    pub fn from_transaction(tx: Transaction<'static, Postgres>) -> Self {
        Self::new(Handle::Transaction(tx))
    }

    /// Wrap a connection on which `BEGIN` and `SAVEPOINT scoped_session` have already run.
    #[cfg(any(test, feature = "test-utils"))]
    pub(crate) fn scoped(conn: PgConnection) -> Self {
        Self::new(Handle::Savepoint(conn))
    }

    /// Take the scoped connection back out, closing this session and all of its clones.
    #[cfg(any(test, feature = "test-utils"))]
    pub(crate) async fn take_scoped(&self) -> Option<PgConnection> {
        let mut guard = self.inner.lock().await;
        match guard.take() {
            Some(Handle::Savepoint(conn)) => Some(conn),
            other => {
                *guard = other;
                None
            }
        }
    }

    /// Exclusive access to the underlying connection until the guard is dropped.
    pub async fn connection(&self) -> DbResult<MappedMutexGuard<'_, PgConnection>> {
        let guard = self.inner.lock().await;
        MutexGuard::try_map(guard, connection_of).map_err(|_| DbError::SessionClosed)
    }

    /// Make the work done so far durable.
    ///
    /// A request session commits its transaction and is closed afterwards. A scoped session
    /// releases its savepoint and opens a new one, so the outer transaction is never committed.
    #[instrument(skip(self), err)]
    pub async fn commit(&self) -> DbResult<()> {
        let mut guard = self.inner.lock().await;
        match guard.take() {
            Some(Handle::Transaction(tx)) => {
                tx.commit().await?;
                Ok(())
            }
            Some(Handle::Savepoint(mut conn)) => {
                let result = sqlx::raw_sql(&format!("RELEASE SAVEPOINT {SCOPED_SAVEPOINT}; SAVEPOINT {SCOPED_SAVEPOINT}"))
                    .execute(&mut conn)
                    .await;
                *guard = Some(Handle::Savepoint(conn));
                result?;
                Ok(())
            }
            None => Err(DbError::SessionClosed),
        }
    }

    /// Discard the work done so far.
    ///
    /// A request session is closed afterwards; a scoped session returns to its savepoint and
    /// stays usable.
    #[instrument(skip(self), err)]
    pub async fn rollback(&self) -> DbResult<()> {
        let mut guard = self.inner.lock().await;
        match guard.take() {
            Some(Handle::Transaction(tx)) => {
                tx.rollback().await?;
                Ok(())
            }
            Some(Handle::Savepoint(mut conn)) => {
                let result = sqlx::raw_sql(&format!("ROLLBACK TO SAVEPOINT {SCOPED_SAVEPOINT}"))
                    .execute(&mut conn)
                    .await;
                *guard = Some(Handle::Savepoint(conn));
                result?;
                Ok(())
            }
            None => Err(DbError::SessionClosed),
        }
    }

    /// Whether both handles refer to the same session.
    pub fn same_as(&self, other: &Session) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Supplies sessions to request handlers.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn acquire(&self) -> Result<Session, Error>;
}

/// Begins one transaction per request from the shared pool.
#[derive(Debug, Clone)]
pub struct PoolSessionProvider {
    pool: PgPool,
}

impl PoolSessionProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionProvider for PoolSessionProvider {
    async fn acquire(&self) -> Result<Session, Error> {
        match self.pool.begin().await {
            Ok(tx) => Ok(Session::from_transaction(tx)),
            Err(e) => {
                warn!("Failed to begin database session: {}", e);
                Err(Error::ServiceUnavailable { message: e.to_string() })
            }
        }
    }
}

/// Extractor for the request's database session.
pub struct DbSession(pub Session);

impl FromRequestParts<AppState> for DbSession {
    type Rejection = Error;

    async fn from_request_parts(_parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        state.providers.sessions.acquire().await.map(DbSession)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::Statuses;
    use crate::db::models::status::StatusCreateDBRequest;
    use crate::db::DatabaseConnection;

    async fn status_count(pool: &PgPool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM status").fetch_one(pool).await.unwrap()
    }

    fn status() -> StatusCreateDBRequest {
        StatusCreateDBRequest {
            status: "ok".to_string(),
            message: "all good".to_string(),
        }
    }

    #[sqlx::test]
    async fn test_request_session_rolls_back_on_drop(pool: PgPool) {
        DatabaseConnection::from_pool(pool.clone()).create_all().await.unwrap();
        let provider = PoolSessionProvider::new(pool.clone());

        let session = provider.acquire().await.unwrap();
        {
            let mut conn = session.connection().await.unwrap();
            Statuses::new(&mut conn).create(&status()).await.unwrap();
        }
        drop(session);

        assert_eq!(status_count(&pool).await, 0);
    }

    #[sqlx::test]
    async fn test_request_session_commit_is_durable_and_closes(pool: PgPool) {
        DatabaseConnection::from_pool(pool.clone()).create_all().await.unwrap();
        let provider = PoolSessionProvider::new(pool.clone());

        let session = provider.acquire().await.unwrap();
        {
            let mut conn = session.connection().await.unwrap();
            Statuses::new(&mut conn).create(&status()).await.unwrap();
        }
        session.commit().await.unwrap();

        assert_eq!(status_count(&pool).await, 1);
        assert!(matches!(session.connection().await, Err(DbError::SessionClosed)));
        assert!(matches!(session.commit().await, Err(DbError::SessionClosed)));
    }

    #[sqlx::test]
    async fn test_clones_are_the_same_session(pool: PgPool) {
        let provider = PoolSessionProvider::new(pool);
        let a = provider.acquire().await.unwrap();
        let b = provider.acquire().await.unwrap();

        assert!(a.same_as(&a.clone()));
        assert!(!a.same_as(&b));
    }

    #[sqlx::test]
    async fn test_closed_pool_is_unavailable(pool: PgPool) {
        pool.close().await;
        let provider = PoolSessionProvider::new(pool);

        let err = provider.acquire().await.unwrap_err();
        assert!(matches!(err, Error::ServiceUnavailable { .. }));
    }
}
