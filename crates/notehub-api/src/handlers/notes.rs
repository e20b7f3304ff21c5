//! Note and content block endpoints.
//!
//! Every write carries the version the client last saw. A stale version is
//! answered with 409; the client re-reads the note and retries.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use notehub_core::{defaults::APPEND_INDEX, Content, Error, Note};

use super::{version, VersionResponse};
use crate::error::{required, ApiError};
use crate::AppState;

// =============================================================================
// REQUEST/RESPONSE TYPES
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    /// Client-chosen id; generated when absent
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    pub owner_id: String,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTitleRequest {
    pub title: String,
    pub note_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct NoteVersionRequest {
    pub note_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateContentRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub content_type: String,
    pub data: String,
    /// Insert position; `-1` or absent appends
    #[serde(default)]
    pub index: Option<i64>,
    pub note_version: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct CreatedContentResponse {
    pub id: String,
    pub note_version: u64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateContentRequest {
    pub data: String,
    pub content_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteContentRequest {
    pub note_version: Option<u64>,
    pub content_version: Option<u64>,
}

// =============================================================================
// NOTES
// =============================================================================

pub async fn create_note(
    State(state): State<AppState>,
    Json(body): Json<CreateNoteRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let id = state
        .services
        .notes
        .create_note(body.id.as_deref().unwrap_or(""), &body.title, &body.owner_id)
        .await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

pub async fn get_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Note>, ApiError> {
    Ok(Json(state.services.notes.get_note_by_id(&id).await?))
}

pub async fn update_title(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateTitleRequest>,
) -> Result<Json<VersionResponse>, ApiError> {
    let note_version = required(body.note_version, "note_version")?;
    let v = state
        .services
        .notes
        .update_title(&id, &body.title, note_version)
        .await?;
    Ok(version(v))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<NoteVersionRequest>,
) -> Result<StatusCode, ApiError> {
    let note_version = required(body.note_version, "note_version")?;
    state.services.notes.delete_note(&id, note_version).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// CONTENT BLOCKS
// =============================================================================

pub async fn create_content(
    State(state): State<AppState>,
    Path(note_id): Path<String>,
    Json(body): Json<CreateContentRequest>,
) -> Result<(StatusCode, Json<CreatedContentResponse>), ApiError> {
    let note_version = required(body.note_version, "note_version")?;
    let (id, note_version) = state
        .services
        .notes
        .create_content_in_note(
            &note_id,
            body.id.as_deref().unwrap_or(""),
            &body.content_type,
            &body.data,
            body.index.unwrap_or(APPEND_INDEX),
            note_version,
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedContentResponse { id, note_version }),
    ))
}

pub async fn list_contents(
    State(state): State<AppState>,
    Path(note_id): Path<String>,
) -> Result<Json<Vec<Content>>, ApiError> {
    Ok(Json(state.services.notes.get_note_contents(&note_id).await?))
}

pub async fn update_content(
    State(state): State<AppState>,
    Path((note_id, content_id)): Path<(String, String)>,
    Json(body): Json<UpdateContentRequest>,
) -> Result<Json<VersionResponse>, ApiError> {
    let content_version = required(body.content_version, "content_version")?;
    let content = state
        .services
        .contents
        .get_content_by_id(&content_id)
        .await?;
    if content.note_id != note_id {
        return Err(Error::ContentNotFound(content_id).into());
    }
    let v = state
        .services
        .contents
        .update_content(&content_id, &body.data, content_version)
        .await?;
    Ok(version(v))
}

pub async fn delete_content(
    State(state): State<AppState>,
    Path((note_id, content_id)): Path<(String, String)>,
    Json(body): Json<DeleteContentRequest>,
) -> Result<StatusCode, ApiError> {
    let note_version = required(body.note_version, "note_version")?;
    let content_version = required(body.content_version, "content_version")?;
    state
        .services
        .notes
        .delete_content_from_note(&note_id, &content_id, note_version, content_version)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
