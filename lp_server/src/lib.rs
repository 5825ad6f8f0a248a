//! HTTP server exposing the league pairing engine.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
