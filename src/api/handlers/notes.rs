use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::PaginationParams;
use crate::api::response::{ApiError, AppJson, JSend, JSendPaginated};
use crate::identity::Identity;
use crate::storage::models::{Note, NotePatch};
use crate::AppState;

const MAX_TITLE_LEN: usize = 200;
const MAX_BODY_LEN: usize = 64 * 1024;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateNoteRequest {
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub is_public: bool,
    pub title: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateNoteRequest {
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_public: Option<bool>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NoteResponse {
    pub body: String,
    pub created_at: String,
    pub id: String,
    pub is_public: bool,
    pub owner_id: String,
    pub title: String,
    pub updated_at: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn list_public_notes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<JSendPaginated<NoteResponse>>, ApiError> {
    params.validate()?;

    let notes = state
        .db
        .get_public_notes()
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let (items, pagination) = params.page(notes);
    Ok(JSendPaginated::success(
        items.iter().map(note_to_response).collect(),
        pagination,
    ))
}

pub async fn list_notes(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<JSendPaginated<NoteResponse>>, ApiError> {
    params.validate()?;

    let notes = state
        .db
        .get_notes_by_owner(&identity.subject_id)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let (items, pagination) = params.page(notes);
    Ok(JSendPaginated::success(
        items.iter().map(note_to_response).collect(),
        pagination,
    ))
}

pub async fn create_note(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    AppJson(req): AppJson<CreateNoteRequest>,
) -> Result<Json<JSend<NoteResponse>>, ApiError> {
    validate_title(&req.title)?;
    validate_body(&req.body)?;

    let now = Utc::now();
    let note = Note {
        body: req.body,
        created_at: now,
        id: uuid::Uuid::new_v4().to_string(),
        is_public: req.is_public,
        owner_id: identity.subject_id,
        title: req.title.trim().to_string(),
        updated_at: now,
    };

    state
        .db
        .put_note(&note)
        .map_err(|e| ApiError::internal(format!("Failed to store note: {e}")))?;

    tracing::debug!(id = %note.id, owner_id = %note.owner_id, "Created note");
    Ok(JSend::success(note_to_response(&note)))
}

pub async fn get_note(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<JSend<NoteResponse>>, ApiError> {
    let note = state
        .db
        .get_note(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .filter(|n| n.owner_id == identity.subject_id)
        .ok_or_else(|| ApiError::not_found("Note not found"))?;

    Ok(JSend::success(note_to_response(&note)))
}

pub async fn update_note(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateNoteRequest>,
) -> Result<Json<JSend<NoteResponse>>, ApiError> {
    if let Some(title) = &req.title {
        validate_title(title)?;
    }
    if let Some(body) = &req.body {
        validate_body(body)?;
    }

    let patch = NotePatch {
        body: req.body,
        is_public: req.is_public,
        title: req.title.map(|t| t.trim().to_string()),
    };

    let note = state
        .db
        .update_note(&id, &identity.subject_id, patch)
        .map_err(|e| ApiError::internal(format!("Failed to update note: {e}")))?
        .ok_or_else(|| ApiError::not_found("Note not found"))?;

    tracing::debug!(id = %id, "Updated note");
    Ok(JSend::success(note_to_response(&note)))
}

pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    let deleted = state
        .db
        .delete_note(&id, &identity.subject_id)
        .map_err(|e| ApiError::internal(format!("Failed to delete note: {e}")))?;

    if !deleted {
        return Err(ApiError::not_found("Note not found"));
    }

    tracing::debug!(id = %id, "Deleted note");
    Ok(JSend::success(()))
}

// ============================================================================
// Helpers
// ============================================================================

fn validate_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::bad_request("title is required"));
    }
    if title.len() > MAX_TITLE_LEN {
        return Err(ApiError::bad_request(format!(
            "title must not exceed {MAX_TITLE_LEN} bytes"
        )));
    }
    Ok(())
}

fn validate_body(body: &str) -> Result<(), ApiError> {
    if body.len() > MAX_BODY_LEN {
        return Err(ApiError::bad_request(format!(
            "body must not exceed {MAX_BODY_LEN} bytes"
        )));
    }
    Ok(())
}

fn note_to_response(note: &Note) -> NoteResponse {
    NoteResponse {
        body: note.body.clone(),
        created_at: note.created_at.to_rfc3339(),
        id: note.id.clone(),
        is_public: note.is_public,
        owner_id: note.owner_id.clone(),
        title: note.title.clone(),
        updated_at: note.updated_at.to_rfc3339(),
    }
}
