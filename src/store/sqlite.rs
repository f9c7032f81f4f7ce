//! SQLite-backed store. Users, session events, and risk features live in one
//! database file behind a mutex-guarded connection. Every statement commits
//! independently; there are no multi-statement transactions, so a crash
//! mid-sequence can leave a user row without its display id. Callers
//! tolerate that.

use crate::features::FeatureVector;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

/// Known session event types. The ledger column is free-form text, so other
/// producers may append types this enum does not name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    LoginSuccess,
    LoginFailed,
    ApiCall,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::LoginSuccess => "login_success",
            EventType::LoginFailed => "login_failed",
            EventType::ApiCall => "api_call",
        }
    }
}

pub struct EventStore {
    conn: Mutex<Connection>,
}

impl EventStore {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                credential TEXT NOT NULL,
                display_id TEXT UNIQUE,
                created_at TEXT NOT NULL,
                email_sent INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE IF NOT EXISTS session_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                session_id TEXT NOT NULL,
                device_id TEXT NOT NULL,
                event_type TEXT NOT NULL,
                event_ts INTEGER NOT NULL,
                received_at INTEGER NOT NULL,
                latitude REAL,
                longitude REAL
            );
            CREATE INDEX IF NOT EXISTS idx_events_user_received
                ON session_events(user_id, received_at);
            CREATE INDEX IF NOT EXISTS idx_events_session
                ON session_events(session_id);
            CREATE TABLE IF NOT EXISTS risk_features (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                device_count INTEGER NOT NULL,
                session_duration REAL NOT NULL,
                avg_session_duration REAL NOT NULL,
                last_24h_logins INTEGER NOT NULL,
                failed_login_ratio REAL NOT NULL,
                geo_jump_km REAL NOT NULL,
                api_rate_1min INTEGER NOT NULL,
                api_rate_7d_avg REAL NOT NULL,
                calculated_at INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // ── users ────────────────────────────────────────────────────────────

    /// Insert a user row and return the store-assigned sequential id.
    /// The email column is UNIQUE; duplicate registrations fail here.
    pub fn create_user(&self, email: &str, credential: &str) -> Result<i64, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO users (email, credential, created_at, email_sent)
             VALUES (?1, ?2, datetime('now'), 0)",
            params![email, credential],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn set_display_id(&self, seq_id: i64, display_id: &str) -> Result<(), rusqlite::Error> {
        self.conn.lock().unwrap().execute(
            "UPDATE users SET display_id = ?1 WHERE id = ?2",
            params![display_id, seq_id],
        )?;
        Ok(())
    }

    /// Stored credential record for a display id, or None for unknown users.
    pub fn credential_by_display_id(
        &self,
        display_id: &str,
    ) -> Result<Option<String>, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT credential FROM users WHERE display_id = ?1")?;
        let mut rows = stmt.query(params![display_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(row.get(0)?));
        }
        Ok(None)
    }

    // ── session events ───────────────────────────────────────────────────

    /// Append one event to the ledger. `received_at_ms` is the server wall
    /// clock that anchors all trailing-window queries; `event_ts_ms` is the
    /// client-supplied logical time used for session spans.
    #[allow(clippy::too_many_arguments)]
    pub fn append_event(
        &self,
        user_id: &str,
        session_id: &str,
        device_id: &str,
        event_type: &str,
        event_ts_ms: i64,
        received_at_ms: i64,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<(), rusqlite::Error> {
        self.conn.lock().unwrap().execute(
            "INSERT INTO session_events
                (user_id, session_id, device_id, event_type, event_ts, received_at, latitude, longitude)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                user_id,
                session_id,
                device_id,
                event_type,
                event_ts_ms,
                received_at_ms,
                latitude,
                longitude
            ],
        )?;
        Ok(())
    }

    // ── aggregation queries ──────────────────────────────────────────────

    /// Distinct device identifiers ever seen for this user.
    pub fn distinct_device_count(&self, user_id: &str) -> Result<i64, rusqlite::Error> {
        self.conn.lock().unwrap().query_row(
            "SELECT COUNT(DISTINCT device_id) FROM session_events WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
    }

    /// (max − min) event time within one session, in seconds. 0 when the
    /// session has fewer than two distinct timestamps or no rows at all.
    pub fn session_span_seconds(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<f64, rusqlite::Error> {
        self.conn.lock().unwrap().query_row(
            "SELECT COALESCE((MAX(event_ts) - MIN(event_ts)) / 1000.0, 0.0)
             FROM session_events
             WHERE user_id = ?1 AND session_id = ?2",
            params![user_id, session_id],
            |row| row.get(0),
        )
    }

    /// Mean per-session (max − min) span in seconds, across every session in
    /// the ledger regardless of user. 0 when no sessions exist.
    pub fn avg_session_span_seconds(&self) -> Result<f64, rusqlite::Error> {
        self.conn.lock().unwrap().query_row(
            "SELECT COALESCE(AVG(span), 0.0) FROM (
                 SELECT (MAX(event_ts) - MIN(event_ts)) / 1000.0 AS span
                 FROM session_events
                 GROUP BY session_id
             )",
            [],
            |row| row.get(0),
        )
    }

    /// login_success + login_failed events for this user received at or after
    /// `since_ms`.
    pub fn login_count_since(&self, user_id: &str, since_ms: i64) -> Result<i64, rusqlite::Error> {
        self.conn.lock().unwrap().query_row(
            "SELECT COUNT(*) FROM session_events
             WHERE user_id = ?1
               AND event_type IN ('login_success', 'login_failed')
               AND received_at >= ?2",
            params![user_id, since_ms],
            |row| row.get(0),
        )
    }

    /// (failed, succeeded) login counts for this user received at or after
    /// `since_ms`.
    pub fn login_outcomes_since(
        &self,
        user_id: &str,
        since_ms: i64,
    ) -> Result<(i64, i64), rusqlite::Error> {
        self.conn.lock().unwrap().query_row(
            "SELECT
                 COALESCE(SUM(CASE WHEN event_type = 'login_failed' THEN 1 ELSE 0 END), 0),
                 COALESCE(SUM(CASE WHEN event_type = 'login_success' THEN 1 ELSE 0 END), 0)
             FROM session_events
             WHERE user_id = ?1 AND received_at >= ?2",
            params![user_id, since_ms],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
    }

    /// Most-recent-first geolocated events for this user, up to `limit`.
    pub fn recent_geo_points(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<(f64, f64)>, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT latitude, longitude FROM session_events
             WHERE user_id = ?1 AND latitude IS NOT NULL AND longitude IS NOT NULL
             ORDER BY received_at DESC, id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user_id, limit as i64], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?;
        rows.collect()
    }

    /// api_call events for this user received at or after `since_ms`.
    pub fn api_call_count_since(
        &self,
        user_id: &str,
        since_ms: i64,
    ) -> Result<i64, rusqlite::Error> {
        self.conn.lock().unwrap().query_row(
            "SELECT COUNT(*) FROM session_events
             WHERE user_id = ?1 AND event_type = 'api_call' AND received_at >= ?2",
            params![user_id, since_ms],
            |row| row.get(0),
        )
    }

    // ── risk feature sink ────────────────────────────────────────────────

    /// Persist one computed feature vector; durable on return.
    pub fn sink_features(
        &self,
        user_id: &str,
        features: &FeatureVector,
    ) -> Result<(), rusqlite::Error> {
        self.conn.lock().unwrap().execute(
            "INSERT INTO risk_features
                (user_id, device_count, session_duration, avg_session_duration,
                 last_24h_logins, failed_login_ratio, geo_jump_km,
                 api_rate_1min, api_rate_7d_avg, calculated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                user_id,
                features.device_count,
                features.session_duration,
                features.avg_session_duration,
                features.last_24h_logins,
                features.failed_login_ratio,
                features.geo_jump_km,
                features.api_rate_1min,
                features.api_rate_7d_avg,
                features.calculated_at
            ],
        )?;
        Ok(())
    }

    /// Most recently sunk feature vector for a user, if any.
    pub fn latest_features(
        &self,
        user_id: &str,
    ) -> Result<Option<FeatureVector>, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT device_count, session_duration, avg_session_duration,
                    last_24h_logins, failed_login_ratio, geo_jump_km,
                    api_rate_1min, api_rate_7d_avg, calculated_at
             FROM risk_features
             WHERE user_id = ?1
             ORDER BY id DESC
             LIMIT 1",
        )?;
        let mut rows = stmt.query(params![user_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(FeatureVector {
                device_count: row.get(0)?,
                session_duration: row.get(1)?,
                avg_session_duration: row.get(2)?,
                last_24h_logins: row.get(3)?,
                failed_login_ratio: row.get(4)?,
                geo_jump_km: row.get(5)?,
                api_rate_1min: row.get(6)?,
                api_rate_7d_avg: row.get(7)?,
                calculated_at: row.get(8)?,
            }));
        }
        Ok(None)
    }
}
