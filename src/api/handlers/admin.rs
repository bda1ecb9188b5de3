use axum::{Extension, Json};
use serde::Serialize;

use crate::api::response::JSend;
use crate::identity::Identity;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ServiceInfoResponse {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub subject_id: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn service_info() -> Json<JSend<ServiceInfoResponse>> {
    JSend::success(ServiceInfoResponse {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn health() -> Json<JSend<HealthResponse>> {
    JSend::success(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// The verified caller, as seen by the gateway.
pub async fn current_session(
    Extension(identity): Extension<Identity>,
) -> Json<JSend<SessionResponse>> {
    JSend::success(SessionResponse {
        subject_id: identity.subject_id,
    })
}
