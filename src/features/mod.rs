//! Risk-feature aggregation over the session event ledger.

mod aggregator;
mod geo;

pub use aggregator::FeatureAggregator;
pub use geo::haversine_km;

use serde::{Deserialize, Serialize};

/// The eight risk statistics computed for one successful login, plus the
/// wall-clock anchor they were computed at (ms).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Distinct device identifiers ever seen for the user
    pub device_count: i64,
    /// (max − min) event time of the current session, seconds
    pub session_duration: f64,
    /// Mean per-session span across all sessions in the ledger, seconds
    pub avg_session_duration: f64,
    /// Successful + failed logins in the trailing 24 hours
    pub last_24h_logins: i64,
    /// failed / (failed + succeeded) logins in the trailing hour; 0 when none
    pub failed_login_ratio: f64,
    /// Great-circle km between the user's two most recent geolocated events
    pub geo_jump_km: f64,
    /// api_call events in the trailing minute
    pub api_rate_1min: i64,
    /// api_call events in the trailing 7 days, averaged per day
    pub api_rate_7d_avg: f64,
    pub calculated_at: i64,
}
