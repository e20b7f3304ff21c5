//! Per-user endpoints: private keywords, sharing and note discovery.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use notehub_core::Note;

use super::{version, VersionResponse};
use crate::error::{required, ApiError};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TagRequest {
    pub keyword: String,
    pub note_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct UntagRequest {
    pub note_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct KeywordQuery {
    #[serde(default)]
    pub keyword: String,
}

#[derive(Debug, Deserialize)]
pub struct ShareRequest {
    pub user_id: String,
    /// `read` or `read-write`
    pub permission: String,
    pub note_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct RevokeRequest {
    pub user_id: String,
    pub note_version: Option<u64>,
}

pub async fn tag_note(
    State(state): State<AppState>,
    Path((user_id, note_id)): Path<(String, String)>,
    Json(body): Json<TagRequest>,
) -> Result<Json<VersionResponse>, ApiError> {
    let note_version = required(body.note_version, "note_version")?;
    let v = state
        .services
        .notes
        .tag_note(&note_id, &user_id, &body.keyword, note_version)
        .await?;
    Ok(version(v))
}

pub async fn untag_note(
    State(state): State<AppState>,
    Path((user_id, note_id, keyword)): Path<(String, String, String)>,
    Json(body): Json<UntagRequest>,
) -> Result<Json<VersionResponse>, ApiError> {
    let note_version = required(body.note_version, "note_version")?;
    let v = state
        .services
        .notes
        .untag_note(&note_id, &user_id, &keyword, note_version)
        .await?;
    Ok(version(v))
}

/// Notes the user tagged with `?keyword=`. A blank keyword matches nothing.
pub async fn find_by_keyword(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<KeywordQuery>,
) -> Result<Json<Vec<Note>>, ApiError> {
    let notes = state
        .services
        .notes
        .find_notes_by_keyword(&user_id, &query.keyword)
        .await?;
    tracing::debug!(user_id = %user_id, result_count = notes.len(), "Keyword lookup");
    Ok(Json(notes))
}

pub async fn share_note(
    State(state): State<AppState>,
    Path((owner_id, note_id)): Path<(String, String)>,
    Json(body): Json<ShareRequest>,
) -> Result<Json<VersionResponse>, ApiError> {
    let note_version = required(body.note_version, "note_version")?;
    let v = state
        .services
        .notes
        .share_note(
            &note_id,
            &owner_id,
            &body.user_id,
            &body.permission,
            note_version,
        )
        .await?;
    Ok(version(v))
}

pub async fn revoke_access(
    State(state): State<AppState>,
    Path((owner_id, note_id)): Path<(String, String)>,
    Json(body): Json<RevokeRequest>,
) -> Result<Json<VersionResponse>, ApiError> {
    let note_version = required(body.note_version, "note_version")?;
    let v = state
        .services
        .notes
        .revoke_access(&note_id, &owner_id, &body.user_id, note_version)
        .await?;
    Ok(version(v))
}

pub async fn accessible_notes(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Note>>, ApiError> {
    Ok(Json(
        state.services.notes.get_accessible_notes(&user_id).await?,
    ))
}
