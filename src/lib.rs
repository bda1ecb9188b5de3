//! notes-gateway - the access control gateway of the notes demo
//!
//! This crate provides the trust boundary shared by every notes front end:
//! - Route classification (public vs. protected paths, private overrides)
//! - A normalized CORS origin allowlist built from environment configuration
//! - Bearer credential verification against the identity service
//! - A client-side session manager that loads the identity SDK, caches the
//!   bearer credential and broadcasts auth state to subscribers
//! - A small redb-backed notes REST API behind the gateway

pub mod access;
pub mod api;
pub mod config;
pub mod identity;
pub mod session;
pub mod storage;
#[cfg(test)]
pub mod testutil;

use std::sync::Arc;

use config::Config;
use identity::IdentityVerifier;
use storage::Database;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub verifier: Arc<dyn IdentityVerifier>,
}
