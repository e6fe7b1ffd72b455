//! HTTP endpoints.

pub mod execution;
pub mod fix;
pub mod routes;

pub(crate) mod monitoring;
