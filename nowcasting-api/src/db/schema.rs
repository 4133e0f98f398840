//! Table definitions for the two schema groups the API reads from.
//!
//! The **primary** group holds GSP locations, forecasts and their values, and service status
//! records. The **pv** group holds PV systems and their yields. Each group can be created and
//! dropped independently; creation is idempotent and drop order respects foreign keys.

use sqlx::{Executor, PgPool};
use tracing::{debug, instrument};

use crate::db::errors::Result;

/// A named set of tables that are created and dropped together.
#[derive(Debug, Clone, Copy)]
pub struct SchemaGroup {
    pub name: &'static str,
    /// `CREATE` statements in dependency order
    create: &'static [&'static str],
    /// `DROP` statements in reverse dependency order
    drop: &'static [&'static str],
}

pub const PRIMARY: SchemaGroup = SchemaGroup {
    name: "primary",
    create: &[
        r#"
        CREATE TABLE IF NOT EXISTS location (
            id SERIAL PRIMARY KEY,
            gsp_id INTEGER NOT NULL UNIQUE,
            label TEXT NOT NULL,
            region_name TEXT,
            gsp_group TEXT,
            installed_capacity_mw DOUBLE PRECISION
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS forecast (
            id BIGSERIAL PRIMARY KEY,
            location_id INTEGER NOT NULL REFERENCES location (id) ON DELETE CASCADE,
            model_name TEXT NOT NULL,
            forecast_creation_time TIMESTAMPTZ NOT NULL,
            historic BOOLEAN NOT NULL DEFAULT FALSE,
            input_data_last_updated TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
        "CREATE INDEX IF NOT EXISTS forecast_location_created_idx ON forecast (location_id, forecast_creation_time DESC)",
        r#"
        CREATE TABLE IF NOT EXISTS forecast_value (
            id BIGSERIAL PRIMARY KEY,
            forecast_id BIGINT NOT NULL REFERENCES forecast (id) ON DELETE CASCADE,
            target_time TIMESTAMPTZ NOT NULL,
            expected_power_generation_megawatts DOUBLE PRECISION NOT NULL
        )
        "#,
        "CREATE INDEX IF NOT EXISTS forecast_value_forecast_target_idx ON forecast_value (forecast_id, target_time)",
        r#"
        CREATE TABLE IF NOT EXISTS status (
            id SERIAL PRIMARY KEY,
            status TEXT NOT NULL,
            message TEXT NOT NULL DEFAULT '',
            created_utc TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ],
    drop: &[
        "DROP TABLE IF EXISTS status",
        "DROP TABLE IF EXISTS forecast_value",
        "DROP TABLE IF EXISTS forecast",
        "DROP TABLE IF EXISTS location",
    ],
};

pub const PV: SchemaGroup = SchemaGroup {
    name: "pv",
    create: &[
        r#"
        CREATE TABLE IF NOT EXISTS pv_system (
            id SERIAL PRIMARY KEY,
            pv_system_id INTEGER NOT NULL,
            provider TEXT NOT NULL,
            latitude DOUBLE PRECISION,
            longitude DOUBLE PRECISION,
            installed_capacity_kw DOUBLE PRECISION,
            UNIQUE (pv_system_id, provider)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS pv_yield (
            id BIGSERIAL PRIMARY KEY,
            pv_system_id INTEGER NOT NULL REFERENCES pv_system (id) ON DELETE CASCADE,
            datetime_utc TIMESTAMPTZ NOT NULL,
            solar_generation_kw DOUBLE PRECISION NOT NULL
        )
        "#,
    ],
    drop: &["DROP TABLE IF EXISTS pv_yield", "DROP TABLE IF EXISTS pv_system"],
};

/// Every group, in creation order.
pub const ALL_GROUPS: [SchemaGroup; 2] = [PRIMARY, PV];

impl SchemaGroup {
    #[instrument(skip(pool), fields(group = self.name), err)]
    pub async fn create_tables(&self, pool: &PgPool) -> Result<()> {
        for statement in self.create {
            pool.execute(*statement).await?;
        }
        debug!("Created schema group {}", self.name);
        Ok(())
    }

    #[instrument(skip(pool), fields(group = self.name), err)]
    pub async fn drop_tables(&self, pool: &PgPool) -> Result<()> {
        for statement in self.drop {
            pool.execute(*statement).await?;
        }
        debug!("Dropped schema group {}", self.name);
        Ok(())
    }
}
