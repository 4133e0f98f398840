//! Service status route.

use axum::{Json, Router, routing::get};
use tracing::instrument;

use crate::{
    AppState,
    api::models::status::Status,
    db::handlers::Statuses,
    errors::{Error, Result},
    session::DbSession,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/status", get(get_status))
}

/// Get the latest status of the forecasting service
#[utoipa::path(
    get,
    path = "/v0/GB/solar/status",
    tag = "status",
    summary = "Service status",
    responses(
        (status = 200, description = "The most recent status record", body = Status),
        (status = 404, description = "No status has been recorded"),
        (status = 503, description = "Database unavailable")
    )
)]
#[instrument(skip_all)]
pub async fn get_status(DbSession(session): DbSession) -> Result<Json<Status>> {
    let mut conn = session.connection().await?;
    let status = Statuses::new(&mut conn)
        .latest()
        .await?
        .ok_or_else(|| Error::not_found("Status", "latest"))?;

    Ok(Json(status.into()))
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::status::Status,
        db::{handlers::Statuses, models::status::StatusCreateDBRequest},
        test_utils::{TestDatabase, api_client, create_test_config},
    };
    use axum::http::StatusCode;
    use sqlx::PgPool;

    #[sqlx::test]
    async fn test_latest_status_is_returned(pool: PgPool) {
        let db = TestDatabase::connect(pool).await;
        let scoped = db.begin().await;

        {
            let session = scoped.session();
            let mut conn = session.connection().await.unwrap();
            let mut repo = Statuses::new(&mut conn);
            for (status, message) in [("warning", "late satellite data"), ("ok", "")] {
                repo.create(&StatusCreateDBRequest {
                    status: status.to_string(),
                    message: message.to_string(),
                })
                .await
                .unwrap();
            }
        }

        let response = api_client(&scoped, &create_test_config()).get("/v0/GB/solar/status").await;
        response.assert_status_ok();
        let status: Status = response.json();
        assert_eq!(status.status, "ok");

        scoped.rollback().await;
        db.teardown().await;
    }

    #[sqlx::test]
    async fn test_missing_status_is_404(pool: PgPool) {
        let db = TestDatabase::connect(pool).await;
        let scoped = db.begin().await;

        let response = api_client(&scoped, &create_test_config()).get("/v0/GB/solar/status").await;
        response.assert_status(StatusCode::NOT_FOUND);

        scoped.rollback().await;
        db.teardown().await;
    }
}
