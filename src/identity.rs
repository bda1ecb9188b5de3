//! Bearer credential verification
//!
//! The gateway does not issue credentials. It hands the bearer token to the
//! identity service's verify endpoint and trusts the subject it returns.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::response::JSend;
use crate::config::IdentityConfig;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Identity service unreachable: {0}")]
    Unreachable(String),
    #[error("Unexpected identity service response: {0}")]
    UnexpectedResponse(String),
}

/// A caller whose credential has been verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub subject_id: String,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Resolve a bearer token. `Ok(None)` when the token is unknown,
    /// expired or revoked.
    async fn verify(&self, token: &str) -> Result<Option<Identity>, VerifyError>;
}

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    token: &'a str,
}

#[derive(Debug, Deserialize)]
struct VerifiedSession {
    subject_id: String,
}

/// Verifies tokens against a remote `POST {token}` endpoint returning a
/// JSend envelope with `subject_id` in its data.
pub struct RemoteVerifier {
    client: reqwest::Client,
    url: String,
}

impl RemoteVerifier {
    pub fn new(config: &IdentityConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self::with_client(client, config.verify_url.clone()))
    }

    pub fn with_client(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl IdentityVerifier for RemoteVerifier {
    async fn verify(&self, token: &str) -> Result<Option<Identity>, VerifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(&VerifyRequest { token })
            .send()
            .await
            .map_err(|e| VerifyError::Unreachable(e.to_string()))?;

        let status = response.status();
        if matches!(
            status,
            StatusCode::NOT_FOUND | StatusCode::UNAUTHORIZED | StatusCode::BAD_REQUEST
        ) {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(VerifyError::UnexpectedResponse(format!("status {status}")));
        }

        let envelope = response
            .json::<JSend<VerifiedSession>>()
            .await
            .map_err(|e| VerifyError::UnexpectedResponse(e.to_string()))?;

        if envelope.data.subject_id.is_empty() {
            return Err(VerifyError::UnexpectedResponse(
                "empty subject_id".to_string(),
            ));
        }

        Ok(Some(Identity {
            subject_id: envelope.data.subject_id,
        }))
    }
}
