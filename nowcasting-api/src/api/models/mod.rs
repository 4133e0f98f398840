//! API response and query models.
//!
//! API models are distinct from the database records in [`crate::db::models`]; each one has a
//! `From` conversion from the record it is built from. JSON field names are camelCase.

pub mod forecasts;
pub mod info;
pub mod locations;
pub mod pv;
pub mod status;
