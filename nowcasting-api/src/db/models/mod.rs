//! Database record structures, one module per table family.

pub mod forecasts;
pub mod locations;
pub mod pv;
pub mod status;
