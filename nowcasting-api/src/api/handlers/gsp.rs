//! Forecast and location routes per grid supply point. Every route requires authentication.

use axum::{Json, Router, routing::get};
use tracing::instrument;

use crate::{
    AppState,
    api::{
        extract::{ValidatedPath, ValidatedQuery},
        models::{
            forecasts::{AllForecastsQuery, ForecastValue, GspForecastQuery, GspPath, ManyForecasts},
            locations::{GspSystemsQuery, Location},
        },
    },
    auth::AuthenticatedUser,
    db::handlers::{ForecastFilter, Forecasts, LocationFilter, Locations, Repository},
    errors::{Error, Result},
    session::DbSession,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/forecast/all", get(get_all_forecasts))
        .route("/forecast/{gsp_id}", get(get_forecast_for_gsp))
        .route("/gsp_systems", get(get_gsp_systems))
}

/// Get the latest forecast for every GSP
///
/// Returns one forecast per GSP, including the national total (GSP 0). Use
/// `start_datetime_utc` to drop values targeting earlier times.
#[utoipa::path(
    get,
    path = "/v0/GB/solar/gsp/forecast/all",
    tag = "gsp",
    summary = "Latest forecast for all GSPs",
    params(AllForecastsQuery),
    responses(
        (status = 200, description = "Latest forecast per GSP, ordered by GSP id", body = ManyForecasts),
        (status = 401, description = "Not authenticated"),
        (status = 422, description = "Invalid query parameters"),
        (status = 503, description = "Database unavailable")
    ),
    security(("BearerAuth" = []))
)]
#[instrument(skip_all)]
pub async fn get_all_forecasts(
    _user: AuthenticatedUser,
    ValidatedQuery(query): ValidatedQuery<AllForecastsQuery>,
    DbSession(session): DbSession,
) -> Result<Json<ManyForecasts>> {
    let filter = ForecastFilter {
        gsp_ids: None,
        historic: query.historic,
        start_datetime: query.start_datetime_utc,
    };

    let mut conn = session.connection().await?;
    let forecasts = Forecasts::new(&mut conn).list(&filter).await?;

    Ok(Json(forecasts.into_iter().collect()))
}

/// Get the latest forecast values for one GSP
#[utoipa::path(
    get,
    path = "/v0/GB/solar/gsp/forecast/{gsp_id}",
    tag = "gsp",
    summary = "Latest forecast values for a GSP",
    params(GspPath, GspForecastQuery),
    responses(
        (status = 200, description = "Forecast values ordered by target time", body = Vec<ForecastValue>),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No forecast for this GSP"),
        (status = 422, description = "Invalid GSP id or query parameters"),
        (status = 503, description = "Database unavailable")
    ),
    security(("BearerAuth" = []))
)]
#[instrument(skip_all)]
pub async fn get_forecast_for_gsp(
    _user: AuthenticatedUser,
    ValidatedPath(path): ValidatedPath<GspPath>,
    ValidatedQuery(query): ValidatedQuery<GspForecastQuery>,
    DbSession(session): DbSession,
) -> Result<Json<Vec<ForecastValue>>> {
    // Bounded by MAX_GSP_ID, so the cast cannot wrap
    let gsp_id = path.gsp_id as i32;

    let mut conn = session.connection().await?;
    let forecast = Forecasts::new(&mut conn)
        .latest_for_gsp(gsp_id, query.start_datetime_utc)
        .await?
        .ok_or_else(|| Error::not_found("Forecast for GSP", gsp_id))?;

    Ok(Json(forecast.values.into_iter().map(Into::into).collect()))
}

/// Get GSP locations
#[utoipa::path(
    get,
    path = "/v0/GB/solar/gsp/gsp_systems",
    tag = "gsp",
    summary = "GSP locations",
    params(GspSystemsQuery),
    responses(
        (status = 200, description = "Locations ordered by GSP id", body = Vec<Location>),
        (status = 401, description = "Not authenticated"),
        (status = 422, description = "Invalid GSP id"),
        (status = 503, description = "Database unavailable")
    ),
    security(("BearerAuth" = []))
)]
#[instrument(skip_all)]
pub async fn get_gsp_systems(
    _user: AuthenticatedUser,
    ValidatedQuery(query): ValidatedQuery<GspSystemsQuery>,
    DbSession(session): DbSession,
) -> Result<Json<Vec<Location>>> {
    let filter = LocationFilter {
        gsp_ids: query.gsp_id.map(|id| vec![id as i32]),
    };

    let mut conn = session.connection().await?;
    let locations = Locations::new(&mut conn).list(&filter).await?;

    Ok(Json(locations.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::{
            forecasts::{ForecastValue, ManyForecasts},
            locations::Location,
        },
        db::fake::FAKE_FORECAST_STEPS,
        test_utils::{TestDatabase, api_client, create_test_config, seed_forecasts, service_client},
    };
    use axum::http::StatusCode;
    use chrono::{Duration, Utc};
    use sqlx::PgPool;

    const GSP_IDS: [i32; 10] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9];

    #[sqlx::test]
    async fn test_all_forecasts_returns_seeded_gsps(pool: PgPool) {
        let db = TestDatabase::connect(pool).await;
        let scoped = db.begin().await;
        seed_forecasts(&scoped, &GSP_IDS).await;

        let response = api_client(&scoped, &create_test_config())
            .get("/v0/GB/solar/gsp/forecast/all")
            .await;
        response.assert_status_ok();

        let many: ManyForecasts = response.json();
        let gsp_ids: Vec<i32> = many.forecasts.iter().map(|f| f.location.gsp_id).collect();
        assert_eq!(gsp_ids, GSP_IDS.to_vec());
        for forecast in &many.forecasts {
            assert_eq!(forecast.forecast_values.len(), FAKE_FORECAST_STEPS);
            assert!(!forecast.historic);
        }

        scoped.rollback().await;
        db.teardown().await;
    }

    #[sqlx::test]
    async fn test_historic_forecasts_are_separate(pool: PgPool) {
        let db = TestDatabase::connect(pool).await;
        let scoped = db.begin().await;
        seed_forecasts(&scoped, &GSP_IDS).await;

        let response = api_client(&scoped, &create_test_config())
            .get("/v0/GB/solar/gsp/forecast/all")
            .add_query_param("historic", true)
            .await;
        response.assert_status_ok();
        let many: ManyForecasts = response.json();
        assert!(many.forecasts.is_empty());

        scoped.rollback().await;
        db.teardown().await;
    }

    #[sqlx::test]
    async fn test_forecast_for_one_gsp(pool: PgPool) {
        let db = TestDatabase::connect(pool).await;
        let scoped = db.begin().await;
        let seeded = seed_forecasts(&scoped, &GSP_IDS).await;
        let client = api_client(&scoped, &create_test_config());

        let response = client.get("/v0/GB/solar/gsp/forecast/3").await;
        response.assert_status_ok();
        let values: Vec<ForecastValue> = response.json();

        let expected: Vec<ForecastValue> = seeded[3].values.iter().cloned().map(Into::into).collect();
        assert_eq!(values.len(), expected.len());
        for (got, want) in values.iter().zip(&expected) {
            assert_eq!(got.target_time, want.target_time);
            // JSON text round trips may differ in the last bit
            assert!(
                (got.expected_power_generation_megawatts - want.expected_power_generation_megawatts).abs() < 1e-9,
                "{got:?} != {want:?}"
            );
        }

        // Later start drops the earlier values
        let start = expected[4].target_time;
        let response = client
            .get("/v0/GB/solar/gsp/forecast/3")
            .add_query_param("start_datetime_utc", start.to_rfc3339())
            .await;
        let values: Vec<ForecastValue> = response.json();
        assert_eq!(values.len(), FAKE_FORECAST_STEPS - 4);
        assert!(values.iter().all(|v| v.target_time >= start));

        // Ids outside the seeded set have no forecast
        client.get("/v0/GB/solar/gsp/forecast/10").await.assert_status(StatusCode::NOT_FOUND);

        scoped.rollback().await;
        db.teardown().await;
    }

    #[sqlx::test]
    async fn test_start_datetime_filters_all_forecasts(pool: PgPool) {
        let db = TestDatabase::connect(pool).await;
        let scoped = db.begin().await;
        seed_forecasts(&scoped, &GSP_IDS).await;

        let start = Utc::now() + Duration::days(1);
        let response = api_client(&scoped, &create_test_config())
            .get("/v0/GB/solar/gsp/forecast/all")
            .add_query_param("start_datetime_utc", start.to_rfc3339())
            .await;
        let many: ManyForecasts = response.json();

        assert_eq!(many.forecasts.len(), GSP_IDS.len());
        assert!(many.forecasts.iter().all(|f| f.forecast_values.is_empty()));

        scoped.rollback().await;
        db.teardown().await;
    }

    #[sqlx::test]
    async fn test_gsp_systems(pool: PgPool) {
        let db = TestDatabase::connect(pool).await;
        let scoped = db.begin().await;
        seed_forecasts(&scoped, &GSP_IDS).await;
        let client = api_client(&scoped, &create_test_config());

        let locations: Vec<Location> = client.get("/v0/GB/solar/gsp/gsp_systems").await.json();
        assert_eq!(locations.len(), GSP_IDS.len());

        let locations: Vec<Location> = client.get("/v0/GB/solar/gsp/gsp_systems").add_query_param("gsp_id", 7).await.json();
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].label, "GSP_7");

        scoped.rollback().await;
        db.teardown().await;
    }

    #[sqlx::test]
    async fn test_service_client_sees_the_same_data(pool: PgPool) {
        let db = TestDatabase::connect(pool).await;
        let scoped = db.begin().await;
        seed_forecasts(&scoped, &GSP_IDS).await;

        let client = service_client(&scoped, &create_test_config());
        let (status, many): (StatusCode, ManyForecasts) = client.get_json("/v0/GB/solar/gsp/forecast/all").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(many.forecasts.len(), GSP_IDS.len());
        assert!(many.forecasts.iter().all(|f| GSP_IDS.contains(&f.location.gsp_id)));

        scoped.rollback().await;
        db.teardown().await;
    }
}
