//! HTTP API: route handlers and the JSON models they exchange.
//!
//! - **[`handlers`]**: Axum route handlers, grouped the way they are mounted
//! - **[`models`]**: Response and query structures, serialized in camelCase
//! - **[`extract`]**: Path and query extractors that reject with field-level 422 errors
//!
//! # API Structure
//!
//! Everything except the root document lives under the configured prefix (`/v0/GB/solar`):
//!
//! - **GSP** (`{prefix}/gsp/*`): forecasts and locations per grid supply point
//! - **Status** (`{prefix}/status`): the latest service status
//! - **PV** (`{prefix}/pv/*`): latest PV yields, mounted only when configured
//!
//! The OpenAPI document is served at `/openapi.json` and rendered at `/docs`.

pub mod extract;
pub mod handlers;
pub mod models;
