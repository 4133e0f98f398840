//! Fake rows for seeding test databases.

use chrono::{DateTime, Duration, DurationRound, Utc};
use rand::prelude::RngExt;
use rand::rng;
use sqlx::PgConnection;

use crate::db::{
    errors::Result,
    handlers::{Forecasts, Locations, PvYields, Repository},
    models::{
        forecasts::{ForecastCreateDBRequest, ForecastDBResponse, ForecastValueCreateDBRequest},
        locations::LocationCreateDBRequest,
        pv::{PvSystemCreateDBRequest, PvYieldCreateDBRequest},
    },
};

/// Number of half-hourly values in a fake forecast (eight hours ahead)
pub const FAKE_FORECAST_STEPS: usize = 16;

pub const FAKE_MODEL_NAME: &str = "fake_model";

/// Insert a location and one live forecast for every GSP id, returning the forecasts.
///
/// Values start at `now` floored to the half hour and step forward every 30 minutes.
pub async fn make_fake_forecasts(conn: &mut PgConnection, gsp_ids: &[i32], now: DateTime<Utc>) -> Result<Vec<ForecastDBResponse>> {
    let start = now.duration_trunc(Duration::minutes(30)).unwrap_or(now);
    let mut forecasts = Vec::with_capacity(gsp_ids.len());

    for &gsp_id in gsp_ids {
        let capacity_mw = rng().random_range(10.0..500.0);

        let location = Locations::new(conn)
            .create(&LocationCreateDBRequest {
                gsp_id,
                label: format!("GSP_{gsp_id}"),
                region_name: Some(format!("Region {gsp_id}")),
                gsp_group: Some(format!("_{}", (gsp_id % 14) + 1)),
                installed_capacity_mw: Some(capacity_mw),
            })
            .await?;

        let values = (0..FAKE_FORECAST_STEPS)
            .map(|step| ForecastValueCreateDBRequest {
                target_time: start + Duration::minutes(30 * step as i64),
                expected_power_generation_megawatts: rng().random_range(0.0..capacity_mw),
            })
            .collect();

        let forecast = Forecasts::new(conn)
            .create(&ForecastCreateDBRequest {
                location_id: location.id,
                model_name: FAKE_MODEL_NAME.to_string(),
                forecast_creation_time: now,
                historic: false,
                input_data_last_updated: now,
                values,
            })
            .await?;

        forecasts.push(forecast);
    }

    Ok(forecasts)
}

/// Insert PV systems `1..=count`, each with a single yield at `now`.
pub async fn make_fake_pv_yields(conn: &mut PgConnection, count: i32, now: DateTime<Utc>) -> Result<()> {
    let mut repo = PvYields::new(conn);
    for pv_system_id in 1..=count {
        let system = repo
            .create_system(&PvSystemCreateDBRequest {
                pv_system_id,
                provider: "pvoutput.org".to_string(),
                latitude: Some(rng().random_range(50.0..58.0)),
                longitude: Some(rng().random_range(-5.0..1.5)),
                installed_capacity_kw: Some(4.0),
            })
            .await?;
        repo.create_yield(&PvYieldCreateDBRequest {
            pv_system_id: system.id,
            datetime_utc: now,
            solar_generation_kw: rng().random_range(0.0..4.0),
        })
        .await?;
    }
    Ok(())
}
