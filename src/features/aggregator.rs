//! Aggregation battery: eight independent statistics per (user, session),
//! each tolerant of missing data, combined into one [`FeatureVector`].
//!
//! Callers must have durably appended the current login event before
//! computing: device_count, last_24h_logins, failed_login_ratio, and
//! geo_jump_km are defined to include the just-recorded event.

use super::{geo, FeatureVector};
use crate::store::EventStore;

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;
const WEEK_MS: i64 = 7 * DAY_MS;

pub struct FeatureAggregator<'a> {
    store: &'a EventStore,
}

impl<'a> FeatureAggregator<'a> {
    pub fn new(store: &'a EventStore) -> Self {
        Self { store }
    }

    /// Run the full battery for one (user, session) pair. All trailing
    /// windows are anchored at the single wall-clock instant `now_ms`, the
    /// same receipt-time domain events are stamped with.
    pub fn compute(
        &self,
        user_id: &str,
        session_id: &str,
        now_ms: i64,
    ) -> Result<FeatureVector, rusqlite::Error> {
        let device_count = self.store.distinct_device_count(user_id)?;
        let session_duration = self.store.session_span_seconds(user_id, session_id)?;
        let avg_session_duration = self.store.avg_session_span_seconds()?;
        let last_24h_logins = self.store.login_count_since(user_id, now_ms - DAY_MS)?;

        let (failed, succeeded) = self.store.login_outcomes_since(user_id, now_ms - HOUR_MS)?;
        let attempts = failed + succeeded;
        let failed_login_ratio = if attempts > 0 {
            failed as f64 / attempts as f64
        } else {
            0.0
        };

        let geo_points = self.store.recent_geo_points(user_id, 2)?;
        let geo_jump_km = match geo_points.as_slice() {
            [(lat1, lon1), (lat2, lon2)] => geo::haversine_km(*lat1, *lon1, *lat2, *lon2),
            _ => 0.0,
        };

        let api_rate_1min = self.store.api_call_count_since(user_id, now_ms - MINUTE_MS)?;
        let api_calls_7d = self.store.api_call_count_since(user_id, now_ms - WEEK_MS)?;
        let api_rate_7d_avg = api_calls_7d as f64 / 7.0;

        Ok(FeatureVector {
            device_count,
            session_duration,
            avg_session_duration,
            last_24h_logins,
            failed_login_ratio,
            geo_jump_km,
            api_rate_1min,
            api_rate_7d_avg,
            calculated_at: now_ms,
        })
    }
}
