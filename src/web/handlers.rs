//! HTTP request handlers.

use super::AppState;
use crate::db::{Channel, DbError};
use crate::status::{StatusCheckRequest, StatusError};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;

// ============================================================================
// API: Channels
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListChannelsQuery {
    #[serde(default)]
    pub active_only: Option<bool>,
    #[serde(default)]
    pub limit: Option<i64>,
}

pub async fn handle_get_channels(
    State(state): State<AppState>,
    Query(query): Query<ListChannelsQuery>,
) -> impl IntoResponse {
    let active_only = query.active_only.unwrap_or(false);
    let limit = query.limit.unwrap_or(100);

    match state.store.get_channels(active_only, limit) {
        Ok(channels) => Json(channels).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateChannelRequest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_active: Option<bool>,
}

pub async fn handle_create_channel(
    State(state): State<AppState>,
    Json(req): Json<CreateChannelRequest>,
) -> impl IntoResponse {
    if req.id.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "Channel id cannot be empty").into_response();
    }

    let channel = Channel {
        id: req.id,
        name: req.name,
        is_active: req.is_active.unwrap_or(true),
        ..Default::default()
    };

    match state.store.add_channel(&channel) {
        Ok(()) => (StatusCode::CREATED, Json(channel)).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

pub async fn handle_delete_channel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.delete_channel(&id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(DbError::NotFound) => (StatusCode::NOT_FOUND, "Channel not found").into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

// ============================================================================
// API: Status checking
// ============================================================================

pub async fn handle_status_summary(State(state): State<AppState>) -> impl IntoResponse {
    match state.status.summary() {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckStatusQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

pub async fn handle_check_status_all(
    State(state): State<AppState>,
    Query(query): Query<CheckStatusQuery>,
    body: String,
) -> impl IntoResponse {
    // The request body is optional; an empty body means "check everything
    // with the defaults".
    let request: StatusCheckRequest = if body.trim().is_empty() {
        StatusCheckRequest::default()
    } else {
        match serde_json::from_str(&body) {
            Ok(r) => r,
            Err(e) => {
                return (StatusCode::BAD_REQUEST, format!("Invalid request body: {}", e))
                    .into_response()
            }
        }
    };

    match state.status.check_many(&request, query.limit).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => status_error_response(e),
    }
}

pub async fn handle_check_status_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.status.check_one(&id).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => status_error_response(e),
    }
}

fn status_error_response(e: StatusError) -> axum::response::Response {
    match e {
        StatusError::ChannelNotFound(_) => {
            (StatusCode::NOT_FOUND, "Channel not found").into_response()
        }
        StatusError::NoChannels => {
            (StatusCode::NOT_FOUND, "No channels found to check").into_response()
        }
        StatusError::Db(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}
