//! HTTP server for fiat on/off-ramp webhooks.
//!
//! Receives signed transaction status notifications from the payment
//! provider and hands them to the [`fiat_ramp`] pipeline, which records them
//! on the ledger and keeps each user's verification state in step. This
//! crate owns the HTTP surface, configuration and metrics.
//!
//! # Modules
//!
//! - [`routes`]: webhook, health and metrics endpoints
//! - [`state`]: shared [`AppState`](state::AppState)
//! - [`config`]: environment configuration
//! - [`error`]: mapping of pipeline errors to HTTP responses
//! - [`metrics`]: Prometheus counters and histograms

pub mod config;
pub mod cors;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod state;
