use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A note owned by a single subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub body: String,
    pub created_at: DateTime<Utc>,
    /// Non-secret UUID identifier
    pub id: String,
    /// Visible on the public listing when set
    pub is_public: bool,
    /// Subject that created the note
    pub owner_id: String,
    pub title: String,
    pub updated_at: DateTime<Utc>,
}

/// Partial update applied by the owner
#[derive(Debug, Clone, Default)]
pub struct NotePatch {
    pub body: Option<String>,
    pub is_public: Option<bool>,
    pub title: Option<String>,
}
