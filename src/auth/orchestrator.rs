//! Sequences credential verification → event write → feature aggregation →
//! sink write, and decides the response.

use super::credentials;
use crate::config::AuthConfig;
use crate::error::ServiceError;
use crate::features::{FeatureAggregator, FeatureVector};
use crate::store::{EventStore, EventType};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Result of a registration attempt. Storage failures collapse into
/// `success: false` with no cause attached; the cause is logged instead.
#[derive(Debug, Clone)]
pub struct RegisterOutcome {
    pub success: bool,
    pub user_id: Option<String>,
}

/// Result of a login attempt. An unknown user and a wrong credential are
/// deliberately indistinguishable here.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub success: bool,
    pub features: Option<FeatureVector>,
}

/// Display id = fixed prefix + zero-padded decimal sequence number. Padding
/// widens short ids only; longer ids pass through untruncated.
pub fn format_display_id(prefix: &str, pad_width: usize, seq_id: i64) -> String {
    format!("{}{:0width$}", prefix, seq_id, width = pad_width)
}

pub struct AuthOrchestrator {
    store: Arc<EventStore>,
    config: AuthConfig,
}

impl AuthOrchestrator {
    pub fn new(store: Arc<EventStore>, config: AuthConfig) -> Self {
        Self { store, config }
    }

    /// Create a user and return its generated display identifier.
    ///
    /// Validation failures surface as errors; storage failures are absorbed
    /// into a `success: false` outcome so the caller only ever sees a
    /// boolean. The write sequence (insert row, then persist display id) is
    /// not transactional; a crash between the two statements leaves a user
    /// row without its display id.
    pub fn register(&self, email: &str, password: &str) -> Result<RegisterOutcome, ServiceError> {
        if email.trim().is_empty() {
            return Err(ServiceError::validation("Email required"));
        }
        match self.try_register(email, password) {
            Ok(user_id) => {
                info!(%user_id, "user registered");
                Ok(RegisterOutcome {
                    success: true,
                    user_id: Some(user_id),
                })
            }
            Err(e) => {
                warn!(error = %e, "registration failed");
                Ok(RegisterOutcome {
                    success: false,
                    user_id: None,
                })
            }
        }
    }

    fn try_register(&self, email: &str, password: &str) -> Result<String, rusqlite::Error> {
        let credential = credentials::hash_credential(password, self.config.pbkdf2_iterations);
        let seq_id = self.store.create_user(email, &credential)?;
        let user_id = format_display_id(&self.config.id_prefix, self.config.id_pad_width, seq_id);
        self.store.set_display_id(seq_id, &user_id)?;
        Ok(user_id)
    }

    /// Authenticate and, on success, record the login event, run the
    /// aggregation battery, and sink the feature vector, in that order. The
    /// event write precedes every aggregation query so the battery sees the
    /// login it is scoring. Aggregation and sink failures propagate and fail
    /// the request; a failed credential check has no side effects at all.
    pub fn login(
        &self,
        user_id: &str,
        password: &str,
        session_id: Option<String>,
        device_id: Option<String>,
    ) -> Result<LoginOutcome, ServiceError> {
        if user_id.trim().is_empty() {
            return Err(ServiceError::validation("User ID required"));
        }

        let Some(stored) = self.store.credential_by_display_id(user_id)? else {
            return Ok(LoginOutcome {
                success: false,
                features: None,
            });
        };
        if !credentials::verify_credential(password, &stored) {
            return Ok(LoginOutcome {
                success: false,
                features: None,
            });
        }

        let session_id = session_id
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let device_id = device_id
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| self.config.default_device_id.clone());
        let now_ms = Utc::now().timestamp_millis();

        self.store.append_event(
            user_id,
            &session_id,
            &device_id,
            EventType::LoginSuccess.as_str(),
            now_ms,
            now_ms,
            None,
            None,
        )?;

        let features = FeatureAggregator::new(&self.store).compute(user_id, &session_id, now_ms)?;
        self.store.sink_features(user_id, &features)?;

        info!(
            %user_id,
            %session_id,
            device_count = features.device_count,
            "login succeeded"
        );
        Ok(LoginOutcome {
            success: true,
            features: Some(features),
        })
    }
}
