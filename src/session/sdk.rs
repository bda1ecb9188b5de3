//! Identity SDK capabilities consumed by the session manager.
//!
//! The hosting application supplies an [`SdkLoader`] (script injection in a
//! browser, a plain constructor elsewhere). Tests supply fakes.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SdkError {
    #[error("Failed to load identity SDK: {0}")]
    Load(String),
    #[error("Identity SDK network error: {0}")]
    Network(String),
    #[error("Identity SDK rejected the request: {0}")]
    Rejected(String),
}

/// The signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub id: String,
}

/// Options handed to the loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkOptions {
    pub frontend_api: String,
    pub publishable_key: String,
}

/// Loads the identity SDK (script injection in a browser host).
#[async_trait]
pub trait SdkLoader: Send + Sync {
    async fn load(&self, options: &SdkOptions) -> Result<Arc<dyn IdentitySdk>, SdkError>;
}

/// A loaded identity SDK instance.
#[async_trait]
pub trait IdentitySdk: Send + Sync {
    /// Resolves once the SDK reports ready.
    async fn load(&self) -> Result<(), SdkError>;

    /// The current user, if a session exists.
    fn user(&self) -> Option<UserIdentity>;

    /// Fetch a bearer token for the active session. `Ok(None)` when there is
    /// no session.
    async fn get_token(&self) -> Result<Option<String>, SdkError>;

    async fn sign_out(&self) -> Result<(), SdkError>;

    /// Open the provider's sign-in flow.
    fn open_sign_in(&self);

    /// Register a listener for identity changes. Each message carries the
    /// user after the change.
    fn add_listener(&self) -> mpsc::UnboundedReceiver<Option<UserIdentity>>;
}
