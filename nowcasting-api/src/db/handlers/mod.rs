//! Repository implementations, one per table family.
//!
//! Repositories borrow a `PgConnection` for their lifetime, so they work the same over a request
//! session, a scoped test session, or a plain pooled connection.

pub mod forecasts;
pub mod locations;
pub mod pv;
pub mod repository;
pub mod status;

pub use forecasts::{ForecastFilter, Forecasts};
pub use locations::{LocationFilter, Locations};
pub use pv::PvYields;
pub use repository::Repository;
pub use status::Statuses;
