//! PV yield routes. Mounted only when the `pv` route group is enabled.

use axum::{Json, Router, routing::get};
use tracing::instrument;

use crate::{
    AppState,
    api::models::pv::PvYield,
    auth::AuthenticatedUser,
    db::handlers::PvYields,
    errors::Result,
    session::DbSession,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/pv_latest", get(get_latest_pv_yields))
}

/// Get the latest yield of every PV system
#[utoipa::path(
    get,
    path = "/v0/GB/solar/pv/pv_latest",
    tag = "pv",
    summary = "Latest PV yields",
    responses(
        (status = 200, description = "Latest yield per PV system", body = Vec<PvYield>),
        (status = 401, description = "Not authenticated"),
        (status = 503, description = "Database unavailable")
    ),
    security(("BearerAuth" = []))
)]
#[instrument(skip_all)]
pub async fn get_latest_pv_yields(_user: AuthenticatedUser, DbSession(session): DbSession) -> Result<Json<Vec<PvYield>>> {
    let mut conn = session.connection().await?;
    let yields = PvYields::new(&mut conn).latest().await?;
    Ok(Json(yields.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::pv::PvYield,
        config::RouteGroup,
        db::fake::make_fake_pv_yields,
        test_utils::{TestDatabase, api_client, create_test_config},
    };
    use chrono::Utc;
    use sqlx::PgPool;

    #[sqlx::test]
    async fn test_latest_yields_when_enabled(pool: PgPool) {
        let db = TestDatabase::connect(pool).await;
        let scoped = db.begin().await;

        {
            let session = scoped.session();
            let mut conn = session.connection().await.unwrap();
            make_fake_pv_yields(&mut conn, 3, Utc::now()).await.unwrap();
        }

        let mut config = create_test_config();
        config.route_groups.push(RouteGroup::Pv);

        let response = api_client(&scoped, &config).get("/v0/GB/solar/pv/pv_latest").await;
        response.assert_status_ok();
        let yields: Vec<PvYield> = response.json();
        let mut ids: Vec<i32> = yields.iter().map(|y| y.pv_system_id).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2, 3]);

        scoped.rollback().await;
        db.teardown().await;
    }
}
