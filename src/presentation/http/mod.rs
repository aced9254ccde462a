//! HTTP Surface
//!
//! Routing for the gateway upgrade endpoint and operational endpoints.

pub mod health;
pub mod routes;
