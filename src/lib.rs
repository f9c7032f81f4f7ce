//! Riskgate — web-facing authentication and session-risk feature service.
//!
//! Modular structure:
//! - [`auth`] — Registration, credential verification, login orchestration
//! - [`features`] — Risk-feature aggregation battery (one vector per login)
//! - [`store`] — SQLite event ledger, user records, feature sink
//! - [`http`] — Axum surface (`GET /`, `POST /auth`)
//! - [`logging`] — Structured JSON logging

pub mod config;
pub mod error;
pub mod store;
pub mod features;
pub mod auth;
pub mod http;
pub mod logging;

pub use config::ServiceConfig;
pub use error::ServiceError;
pub use store::{EventStore, EventType};
pub use features::{FeatureAggregator, FeatureVector};
pub use auth::AuthOrchestrator;
pub use logging::StructuredLogger;
