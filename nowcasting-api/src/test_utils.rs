//! Test utilities for integration testing (available with `test-utils` feature).
//!
//! Every database test runs against real PostgreSQL and leaves no rows behind:
//!
//! 1. [`TestDatabase::connect`] creates both schema groups on the pool `#[sqlx::test]` provides.
//! 2. [`TestDatabase::begin`] detaches one connection from the pool, runs `BEGIN`, and opens a
//!    savepoint on it. That savepoint is the [`ScopedSession`].
//! 3. The test body, its fixtures and every request made through [`api_client`] or
//!    [`service_client`] share that one session.
//! 4. [`ScopedSession::rollback`] rolls back to the savepoint, rolls back the outer transaction
//!    and closes the connection.
//! 5. [`TestDatabase::teardown`] drops the schema groups and closes the pool.
//!
//! If a test panics before step 4, the detached connection is dropped and the server discards
//! its open transaction.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, StatusCode},
};
use axum_test::TestServer;
use chrono::Utc;
use serde::de::DeserializeOwned;
use sqlx::PgPool;
use tower::ServiceExt;

use crate::{
    Providers, build_router,
    auth::StandInAuthProvider,
    config::{Config, PoolSettings},
    db::{DatabaseConnection, fake::make_fake_forecasts, models::forecasts::ForecastDBResponse},
    errors::Error,
    session::{SCOPED_SAVEPOINT, Session, SessionProvider},
};

pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.host = "127.0.0.1".to_string();
    config.port = 0;
    config.database.pool = PoolSettings {
        max_connections: 2,
        min_connections: 0,
        ..Default::default()
    };
    config
}

/// A test database with both schema groups created.
pub struct TestDatabase {
    db: DatabaseConnection,
}

impl TestDatabase {
    pub async fn connect(pool: PgPool) -> Self {
        let db = DatabaseConnection::from_pool(pool);
        db.create_all().await.expect("Failed to create schema groups");
        Self { db }
    }

    pub fn pool(&self) -> &PgPool {
        self.db.pool()
    }

    /// Open the outer transaction and the scoped session inside it.
    pub async fn begin(&self) -> ScopedSession {
        let mut conn = self
            .db
            .pool()
            .acquire()
            .await
            .expect("Failed to acquire test connection")
            .detach();

        sqlx::raw_sql(&format!("BEGIN; SAVEPOINT {SCOPED_SAVEPOINT}"))
            .execute(&mut conn)
            .await
            .expect("Failed to begin scoped session");

        ScopedSession {
            session: Session::scoped(conn),
        }
    }

    pub async fn teardown(self) {
        self.db.drop_all().await.expect("Failed to drop schema groups");
        self.db.close().await;
    }
}

/// A session nested inside an outer transaction that is never committed.
pub struct ScopedSession {
    session: Session,
}

impl ScopedSession {
    pub fn session(&self) -> Session {
        self.session.clone()
    }

    /// Roll back the session, then the outer transaction, then close the connection.
    pub async fn rollback(self) {
        let Some(mut conn) = self.session.take_scoped().await else {
            panic!("Scoped session was already closed");
        };

        sqlx::raw_sql(&format!("ROLLBACK TO SAVEPOINT {SCOPED_SAVEPOINT}"))
            .execute(&mut conn)
            .await
            .expect("Failed to roll back scoped session");
        sqlx::raw_sql("ROLLBACK")
            .execute(&mut conn)
            .await
            .expect("Failed to roll back outer transaction");

        sqlx::Connection::close(conn).await.expect("Failed to close test connection");
    }
}

/// Hands every request the same scoped session.
pub struct SharedSessionProvider {
    session: Session,
}

impl SharedSessionProvider {
    pub fn new(scoped: &ScopedSession) -> Self {
        Self { session: scoped.session() }
    }
}

#[async_trait]
impl SessionProvider for SharedSessionProvider {
    async fn acquire(&self) -> Result<Session, Error> {
        Ok(self.session.clone())
    }
}

/// Fails every acquisition, as a pool that cannot reach the database would.
pub struct UnavailableSessionProvider;

#[async_trait]
impl SessionProvider for UnavailableSessionProvider {
    async fn acquire(&self) -> Result<Session, Error> {
        Err(Error::ServiceUnavailable {
            message: "database unreachable".to_string(),
        })
    }
}

/// The given session provider together with a stand-in user.
pub fn stand_in_providers(sessions: Arc<dyn SessionProvider>) -> Providers {
    Providers::new(sessions, Arc::new(StandInAuthProvider::default()))
}

/// Providers for a test: the shared scoped session and a stand-in user.
pub fn test_providers(scoped: &ScopedSession) -> Providers {
    stand_in_providers(Arc::new(SharedSessionProvider::new(scoped)))
}

pub fn test_server(providers: Providers, config: &Config) -> TestServer {
    let router = build_router(Arc::new(config.clone()), providers).expect("Failed to build router");
    TestServer::new(router).expect("Failed to create test server")
}

/// An in-process HTTP client bound to the scoped session.
pub fn api_client(scoped: &ScopedSession, config: &Config) -> TestServer {
    test_server(test_providers(scoped), config)
}

/// A client that drives the router as a `tower::Service`, bound to the scoped session.
pub fn service_client(scoped: &ScopedSession, config: &Config) -> InProcessClient {
    let router = build_router(Arc::new(config.clone()), test_providers(scoped)).expect("Failed to build router");
    InProcessClient { router }
}

/// Sends requests straight into the router without a server or socket.
#[derive(Clone)]
pub struct InProcessClient {
    router: Router,
}

impl InProcessClient {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        match self.router.clone().oneshot(request).await {
            Ok(response) => response,
            Err(infallible) => match infallible {},
        }
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        let request = Request::get(uri).body(Body::empty()).expect("Failed to build request");
        self.send(request).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, uri: &str) -> (StatusCode, T) {
        let response = self.get(uri).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("Failed to read body");
        let body = serde_json::from_slice(&bytes).expect("Response body was not the expected JSON");
        (status, body)
    }
}

/// Insert fake forecasts for `gsp_ids` through the scoped session and commit them.
///
/// The commit only releases the session savepoint, so the rows still vanish on rollback.
pub async fn seed_forecasts(scoped: &ScopedSession, gsp_ids: &[i32]) -> Vec<ForecastDBResponse> {
    let session = scoped.session();
    let forecasts = {
        let mut conn = session.connection().await.expect("Scoped session is closed");
        make_fake_forecasts(&mut conn, gsp_ids, Utc::now())
            .await
            .expect("Failed to insert fake forecasts")
    };
    session.commit().await.expect("Failed to commit scoped session");
    forecasts
}
