//! Integration tests: registration, login, and the aggregation battery
//! against a real SQLite store.

use riskgate::auth::{format_display_id, hash_credential, verify_credential, AuthOrchestrator};
use riskgate::config::AuthConfig;
use riskgate::features::{haversine_km, FeatureAggregator};
use riskgate::store::{EventStore, EventType};
use riskgate::ServiceError;
use chrono::Utc;
use std::sync::Arc;

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

fn test_auth_config() -> AuthConfig {
    AuthConfig {
        pbkdf2_iterations: 1_000,
        ..AuthConfig::default()
    }
}

fn open_store(dir: &tempfile::TempDir) -> Arc<EventStore> {
    Arc::new(EventStore::open(&dir.path().join("store.db")).unwrap())
}

#[test]
fn display_id_format() {
    assert_eq!(format_display_id("P-U", 4, 7), "P-U0007");
    assert_eq!(format_display_id("P-U", 4, 1), "P-U0001");
    assert_eq!(format_display_id("P-U", 4, 12345), "P-U12345");
}

#[test]
fn credential_hash_and_verify() {
    let stored = hash_credential("hunter2", 1_000);
    assert!(verify_credential("hunter2", &stored));
    assert!(!verify_credential("hunter3", &stored));
    assert!(!verify_credential("hunter2", "not-a-credential-record"));
}

#[test]
fn haversine_identities() {
    assert_eq!(haversine_km(52.52, 13.405, 52.52, 13.405), 0.0);
    let one_degree = haversine_km(0.0, 0.0, 0.0, 1.0);
    assert!((one_degree - 111.19).abs() < 0.05, "got {}", one_degree);
    let there = haversine_km(48.8566, 2.3522, 51.5074, -0.1278);
    let back = haversine_km(51.5074, -0.1278, 48.8566, 2.3522);
    assert!((there - back).abs() < 1e-9);
}

#[test]
fn register_and_login_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let auth = AuthOrchestrator::new(store.clone(), test_auth_config());

    let reg = auth.register("a@x.com", "secret").unwrap();
    assert!(reg.success);
    assert_eq!(reg.user_id.as_deref(), Some("P-U0001"));

    let login = auth.login("P-U0001", "secret", None, None).unwrap();
    assert!(login.success);
    let features = login.features.expect("features on success");
    assert!(features.device_count >= 1);

    // Read-after-write: the just-used device and the sunk vector are both
    // visible immediately after the success response.
    assert_eq!(store.distinct_device_count("P-U0001").unwrap(), 1);
    let sunk = store.latest_features("P-U0001").unwrap().expect("sunk row");
    assert_eq!(sunk.device_count, features.device_count);
}

#[test]
fn register_requires_email_before_any_write() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let auth = AuthOrchestrator::new(store, test_auth_config());

    let err = auth.register("", "secret").unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    // The failed attempt consumed no sequence number.
    let reg = auth.register("first@x.com", "secret").unwrap();
    assert_eq!(reg.user_id.as_deref(), Some("P-U0001"));
}

#[test]
fn duplicate_email_fails_soft() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let auth = AuthOrchestrator::new(store, test_auth_config());

    assert!(auth.register("a@x.com", "one").unwrap().success);
    let second = auth.register("a@x.com", "two").unwrap();
    assert!(!second.success);
    assert!(second.user_id.is_none());
}

#[test]
fn failed_login_has_no_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let auth = AuthOrchestrator::new(store.clone(), test_auth_config());

    auth.register("a@x.com", "secret").unwrap();

    let bad = auth.login("P-U0001", "wrong", None, None).unwrap();
    assert!(!bad.success);
    assert!(bad.features.is_none());
    assert_eq!(store.distinct_device_count("P-U0001").unwrap(), 0);
    assert!(store.latest_features("P-U0001").unwrap().is_none());

    let unknown = auth.login("P-U9999", "secret", None, None).unwrap();
    assert!(!unknown.success);
}

#[test]
fn login_rejects_empty_user_id() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let auth = AuthOrchestrator::new(store, test_auth_config());

    let err = auth.login("", "secret", None, None).unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[test]
fn empty_store_yields_all_zero_features() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let fv = FeatureAggregator::new(&store)
        .compute("P-U0001", "no-such-session", Utc::now().timestamp_millis())
        .unwrap();
    assert_eq!(fv.device_count, 0);
    assert_eq!(fv.session_duration, 0.0);
    assert_eq!(fv.avg_session_duration, 0.0);
    assert_eq!(fv.last_24h_logins, 0);
    assert_eq!(fv.failed_login_ratio, 0.0);
    assert_eq!(fv.geo_jump_km, 0.0);
    assert_eq!(fv.api_rate_1min, 0);
    assert_eq!(fv.api_rate_7d_avg, 0.0);
}

#[test]
fn session_duration_spans_event_timestamps() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let now = Utc::now().timestamp_millis();

    store
        .append_event("u1", "s1", "d1", EventType::LoginSuccess.as_str(), now, now, None, None)
        .unwrap();
    assert_eq!(store.session_span_seconds("u1", "s1").unwrap(), 0.0);

    store
        .append_event(
            "u1",
            "s1",
            "d1",
            EventType::ApiCall.as_str(),
            now + 10_000,
            now + 10_000,
            None,
            None,
        )
        .unwrap();
    assert_eq!(store.session_span_seconds("u1", "s1").unwrap(), 10.0);
    assert_eq!(store.session_span_seconds("u1", "other").unwrap(), 0.0);
}

#[test]
fn avg_session_duration_is_global_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let now = Utc::now().timestamp_millis();

    for (session, user, span_ms) in [("s1", "u1", 10_000), ("s2", "u2", 20_000)] {
        store
            .append_event(user, session, "d1", EventType::LoginSuccess.as_str(), now, now, None, None)
            .unwrap();
        store
            .append_event(
                user,
                session,
                "d1",
                EventType::ApiCall.as_str(),
                now + span_ms,
                now + span_ms,
                None,
                None,
            )
            .unwrap();
    }

    let fv = FeatureAggregator::new(&store).compute("u1", "s1", now).unwrap();
    assert_eq!(fv.avg_session_duration, 15.0);
}

#[test]
fn failed_login_ratio_over_trailing_hour() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let now = Utc::now().timestamp_millis();

    store
        .append_event("u1", "s1", "d1", EventType::LoginFailed.as_str(), now - MINUTE_MS, now - MINUTE_MS, None, None)
        .unwrap();
    store
        .append_event("u1", "s2", "d1", EventType::LoginSuccess.as_str(), now, now, None, None)
        .unwrap();
    // Outside the one-hour window: ignored by the ratio.
    store
        .append_event("u1", "s0", "d1", EventType::LoginFailed.as_str(), now - 2 * HOUR_MS, now - 2 * HOUR_MS, None, None)
        .unwrap();

    let fv = FeatureAggregator::new(&store).compute("u1", "s2", now).unwrap();
    assert_eq!(fv.failed_login_ratio, 0.5);
    // All three still land inside the 24-hour login count.
    assert_eq!(fv.last_24h_logins, 3);
}

#[test]
fn last_24h_logins_excludes_older_events() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let now = Utc::now().timestamp_millis();

    store
        .append_event("u1", "s1", "d1", EventType::LoginSuccess.as_str(), now, now, None, None)
        .unwrap();
    store
        .append_event("u1", "s2", "d1", EventType::LoginSuccess.as_str(), now - 2 * DAY_MS, now - 2 * DAY_MS, None, None)
        .unwrap();
    // api_call events are not logins.
    store
        .append_event("u1", "s1", "d1", EventType::ApiCall.as_str(), now, now, None, None)
        .unwrap();

    assert_eq!(store.login_count_since("u1", now - DAY_MS).unwrap(), 1);
}

#[test]
fn geo_jump_uses_two_most_recent_points() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let now = Utc::now().timestamp_millis();

    // Oldest: Paris. Then London, then Berlin.
    let points = [
        (48.8566, 2.3522, now - 3 * HOUR_MS),
        (51.5074, -0.1278, now - 2 * HOUR_MS),
        (52.52, 13.405, now - HOUR_MS),
    ];
    for (lat, lon, ts) in points {
        store
            .append_event("u1", "s1", "d1", EventType::ApiCall.as_str(), ts, ts, Some(lat), Some(lon))
            .unwrap();
    }

    let fv = FeatureAggregator::new(&store).compute("u1", "s1", now).unwrap();
    let berlin_london = haversine_km(52.52, 13.405, 51.5074, -0.1278);
    assert!((fv.geo_jump_km - berlin_london).abs() < 1e-9);

    // A single geolocated point is not a jump.
    let dir2 = tempfile::tempdir().unwrap();
    let store2 = open_store(&dir2);
    store2
        .append_event("u1", "s1", "d1", EventType::ApiCall.as_str(), now, now, Some(48.85), Some(2.35))
        .unwrap();
    let fv2 = FeatureAggregator::new(&store2).compute("u1", "s1", now).unwrap();
    assert_eq!(fv2.geo_jump_km, 0.0);
}

#[test]
fn api_rates_over_minute_and_week() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let now = Utc::now().timestamp_millis();

    for i in 0..3i64 {
        let ts = now - i * 1000;
        store
            .append_event("u1", "s1", "d1", EventType::ApiCall.as_str(), ts, ts, None, None)
            .unwrap();
    }
    // Within the week but not the minute.
    store
        .append_event("u1", "s1", "d1", EventType::ApiCall.as_str(), now - DAY_MS, now - DAY_MS, None, None)
        .unwrap();
    // Older than the week: excluded entirely.
    store
        .append_event("u1", "s1", "d1", EventType::ApiCall.as_str(), now - 8 * DAY_MS, now - 8 * DAY_MS, None, None)
        .unwrap();

    let fv = FeatureAggregator::new(&store).compute("u1", "s1", now).unwrap();
    assert_eq!(fv.api_rate_1min, 3);
    assert!((fv.api_rate_7d_avg - 4.0 / 7.0).abs() < 1e-9);
}

#[test]
fn device_count_spans_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let now = Utc::now().timestamp_millis();

    for (session, device) in [("s1", "laptop"), ("s2", "phone"), ("s3", "laptop")] {
        store
            .append_event("u1", session, device, EventType::LoginSuccess.as_str(), now, now, None, None)
            .unwrap();
    }
    store
        .append_event("u2", "s9", "tablet", EventType::LoginSuccess.as_str(), now, now, None, None)
        .unwrap();

    assert_eq!(store.distinct_device_count("u1").unwrap(), 2);
    assert_eq!(store.distinct_device_count("u2").unwrap(), 1);
}

#[tokio::test]
async fn health_is_idempotent() {
    let first = riskgate::http::health().await;
    let second = riskgate::http::health().await;
    assert_eq!(first.0.status, "running");
    assert_eq!(second.0.status, "running");
}
