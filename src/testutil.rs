//! Shared test helpers — available to all `#[cfg(test)]` modules in the crate.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tempfile::TempDir;

use crate::config::{AccessConfig, Config, IdentityConfig, ServerConfig};
use crate::identity::{Identity, IdentityVerifier, VerifyError};
use crate::storage::models::Note;
use crate::storage::Database;
use crate::AppState;

/// Open a fresh database in a temporary directory.
///
/// Returns both the `Database` and the `TempDir` guard — the caller must
/// keep the `TempDir` alive for the duration of the test.
pub fn setup_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::open(temp_dir.path()).unwrap();
    (db, temp_dir)
}

/// A minimal `Config` suitable for unit tests (default public paths, dev origins only).
pub fn test_config() -> Config {
    Config {
        access: AccessConfig::default(),
        identity: IdentityConfig {
            timeout_seconds: 1,
            verify_url: "http://127.0.0.1:9/sessions/verify".to_string(),
        },
        server: ServerConfig {
            bind_address: "127.0.0.1:8080".to_string(),
            data_dir: "/tmp/test".to_string(),
        },
    }
}

/// Verifier backed by a fixed token -> subject map.
#[derive(Default)]
pub struct StaticVerifier {
    tokens: HashMap<String, String>,
}

impl StaticVerifier {
    pub fn with_token(mut self, token: &str, subject_id: &str) -> Self {
        self.tokens.insert(token.to_string(), subject_id.to_string());
        self
    }
}

#[async_trait]
impl IdentityVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> Result<Option<Identity>, VerifyError> {
        Ok(self.tokens.get(token).map(|subject_id| Identity {
            subject_id: subject_id.clone(),
        }))
    }
}

/// Build a full `Arc<AppState>` around the given database and verifier.
pub fn test_state(db: Database, verifier: StaticVerifier) -> Arc<AppState> {
    Arc::new(AppState {
        config: test_config(),
        db,
        verifier: Arc::new(verifier),
    })
}

/// Create a `Note` with the given id and owner.
pub fn make_note(id: &str, owner: &str, is_public: bool) -> Note {
    let now = Utc::now();
    Note {
        body: format!("body of {id}"),
        created_at: now,
        id: id.to_string(),
        is_public,
        owner_id: owner.to_string(),
        title: format!("note-{id}"),
        updated_at: now,
    }
}
