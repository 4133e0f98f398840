//! Database repository for forecasts and their values.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use tracing::instrument;

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::{
        forecasts::{ForecastCreateDBRequest, ForecastDBResponse, ForecastValueDBResponse},
        locations::LocationDBResponse,
    },
};

/// Filter for listing forecasts. Listing always returns the latest forecast per location.
#[derive(Debug, Clone, Default)]
pub struct ForecastFilter {
    /// Only return forecasts for these GSP ids; `None` returns every location
    pub gsp_ids: Option<Vec<i32>>,
    /// Select historic (blended, kept) forecasts instead of live ones
    pub historic: bool,
    /// Drop values targeting times before this instant
    pub start_datetime: Option<DateTime<Utc>>,
}

impl ForecastFilter {
    pub fn for_gsp(gsp_id: i32) -> Self {
        Self {
            gsp_ids: Some(vec![gsp_id]),
            ..Default::default()
        }
    }

    pub fn with_start(mut self, start_datetime: Option<DateTime<Utc>>) -> Self {
        self.start_datetime = start_datetime;
        self
    }
}

// Forecast joined with its location
#[derive(Debug, FromRow)]
struct ForecastRow {
    id: i64,
    location_id: i32,
    model_name: String,
    forecast_creation_time: DateTime<Utc>,
    historic: bool,
    input_data_last_updated: DateTime<Utc>,
    gsp_id: i32,
    label: String,
    region_name: Option<String>,
    gsp_group: Option<String>,
    installed_capacity_mw: Option<f64>,
}

impl ForecastRow {
    fn into_response(self, values: Vec<ForecastValueDBResponse>) -> ForecastDBResponse {
        ForecastDBResponse {
            id: self.id,
            location: LocationDBResponse {
                id: self.location_id,
                gsp_id: self.gsp_id,
                label: self.label,
                region_name: self.region_name,
                gsp_group: self.gsp_group,
                installed_capacity_mw: self.installed_capacity_mw,
            },
            model_name: self.model_name,
            forecast_creation_time: self.forecast_creation_time,
            historic: self.historic,
            input_data_last_updated: self.input_data_last_updated,
            values,
        }
    }
}

const FORECAST_COLUMNS: &str = r#"
    f.id, f.location_id, f.model_name, f.forecast_creation_time, f.historic, f.input_data_last_updated,
    l.gsp_id, l.label, l.region_name, l.gsp_group, l.installed_capacity_mw
"#;

pub struct Forecasts<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Forecasts<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Values for the given forecasts, grouped by forecast id and ordered by target time.
    async fn values_for(
        &mut self,
        forecast_ids: &[i64],
        start_datetime: Option<DateTime<Utc>>,
    ) -> Result<HashMap<i64, Vec<ForecastValueDBResponse>>> {
        let values = sqlx::query_as::<_, ForecastValueDBResponse>(
            r#"
            SELECT id, forecast_id, target_time, expected_power_generation_megawatts
            FROM forecast_value
            WHERE forecast_id = ANY($1)
              AND ($2::timestamptz IS NULL OR target_time >= $2)
            ORDER BY forecast_id, target_time
            "#,
        )
        .bind(forecast_ids)
        .bind(start_datetime)
        .fetch_all(&mut *self.db)
        .await?;

        let mut grouped: HashMap<i64, Vec<ForecastValueDBResponse>> = HashMap::new();
        for value in values {
            grouped.entry(value.forecast_id).or_default().push(value);
        }
        Ok(grouped)
    }

    /// Latest forecast for a single GSP, if one exists.
    #[instrument(skip(self), err)]
    pub async fn latest_for_gsp(&mut self, gsp_id: i32, start_datetime: Option<DateTime<Utc>>) -> Result<Option<ForecastDBResponse>> {
        let mut forecasts = self.list(&ForecastFilter::for_gsp(gsp_id).with_start(start_datetime)).await?;
        Ok(forecasts.pop())
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Forecasts<'c> {
    type CreateRequest = ForecastCreateDBRequest;
    type Response = ForecastDBResponse;
    type Id = i64;
    type Filter = ForecastFilter;

    #[instrument(skip(self, request), fields(location_id = request.location_id, values = request.values.len()), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let forecast_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO forecast (location_id, model_name, forecast_creation_time, historic, input_data_last_updated)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(request.location_id)
        .bind(&request.model_name)
        .bind(request.forecast_creation_time)
        .bind(request.historic)
        .bind(request.input_data_last_updated)
        .fetch_one(&mut *self.db)
        .await?;

        let target_times: Vec<DateTime<Utc>> = request.values.iter().map(|v| v.target_time).collect();
        let powers: Vec<f64> = request.values.iter().map(|v| v.expected_power_generation_megawatts).collect();

        sqlx::query(
            r#"
            INSERT INTO forecast_value (forecast_id, target_time, expected_power_generation_megawatts)
            SELECT $1, t.target_time, t.power
            FROM UNNEST($2::timestamptz[], $3::float8[]) AS t (target_time, power)
            "#,
        )
        .bind(forecast_id)
        .bind(&target_times)
        .bind(&powers)
        .execute(&mut *self.db)
        .await?;

        self.get_by_id(forecast_id).await?.ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let row = sqlx::query_as::<_, ForecastRow>(&format!(
            "SELECT {FORECAST_COLUMNS} FROM forecast f JOIN location l ON l.id = f.location_id WHERE f.id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut values = self.values_for(&[row.id], None).await?;
        let values = values.remove(&row.id).unwrap_or_default();
        Ok(Some(row.into_response(values)))
    }

    #[instrument(skip(self), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let rows = sqlx::query_as::<_, ForecastRow>(&format!(
            r#"
            SELECT DISTINCT ON (f.location_id) {FORECAST_COLUMNS}
            FROM forecast f
            JOIN location l ON l.id = f.location_id
            WHERE ($1::int4[] IS NULL OR l.gsp_id = ANY($1))
              AND f.historic = $2
            ORDER BY f.location_id, f.forecast_creation_time DESC, f.id DESC
            "#
        ))
        .bind(&filter.gsp_ids)
        .bind(filter.historic)
        .fetch_all(&mut *self.db)
        .await?;

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut values = self.values_for(&ids, filter.start_datetime).await?;

        let mut forecasts: Vec<ForecastDBResponse> = rows
            .into_iter()
            .map(|row| {
                let forecast_values = values.remove(&row.id).unwrap_or_default();
                row.into_response(forecast_values)
            })
            .collect();
        forecasts.sort_by_key(|f| f.location.gsp_id);

        Ok(forecasts)
    }
}
