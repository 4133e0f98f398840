//! HTTP request handlers, one module per route group.
//!
//! Each group module exposes a `router()` that [`crate::build_router`] mounts under the API
//! prefix when the group is enabled. [`root`] is always mounted at `/`.

pub mod gsp;
pub mod pv;
pub mod root;
pub mod status;
