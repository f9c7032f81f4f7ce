//! Axum surface: liveness probe and the single `/auth` action endpoint.

use crate::auth::AuthOrchestrator;
use crate::error::ServiceError;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub struct AppState {
    pub auth: AuthOrchestrator,
}

#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    pub action: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "userId")]
    pub user_id: Option<String>,
    pub password: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<crate::features::FeatureVector>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/auth", post(auth))
        .with_state(state)
}

/// Liveness only; always the same payload.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "running" })
}

async fn auth(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AuthRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, Json<ErrorBody>)> {
    let result = match req.action.as_str() {
        "register" => {
            let email = req.email.as_deref().unwrap_or("");
            state.auth.register(email, &req.password).map(|outcome| {
                Json(AuthResponse {
                    success: outcome.success,
                    user_id: outcome.user_id,
                    features: None,
                })
            })
        }
        "login" => {
            let user_id = req.user_id.as_deref().unwrap_or("");
            state
                .auth
                .login(user_id, &req.password, req.session_id, req.device_id)
                .map(|outcome| {
                    Json(AuthResponse {
                        success: outcome.success,
                        user_id: None,
                        features: outcome.features,
                    })
                })
        }
        other => Err(ServiceError::InvalidAction(other.to_string())),
    };
    result.map_err(into_error_response)
}

fn into_error_response(err: ServiceError) -> (StatusCode, Json<ErrorBody>) {
    match err {
        ServiceError::Validation(detail) => (StatusCode::BAD_REQUEST, Json(ErrorBody { detail })),
        ServiceError::InvalidAction(_) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                detail: "Invalid action".to_string(),
            }),
        ),
        ServiceError::Store(e) => {
            tracing::error!(error = %e, "request failed on store error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    detail: "Internal error".to_string(),
                }),
            )
        }
    }
}
