//! Task endpoints (ordinary fields; moves live in the board endpoints).

use super::AppState;
use crate::error::ApiError;
use crate::types::{Task, TaskUpdate};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CreateTask {
    pub project_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_task_id: Option<String>,
    #[serde(default)]
    pub planned_start: Option<i64>,
    #[serde(default)]
    pub planned_end: Option<i64>,
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateTask>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = state
        .db()
        .create_task(
            &body.project_id,
            &body.title,
            body.description.as_deref(),
            body.parent_task_id.as_deref(),
            body.planned_start,
            body.planned_end,
        )
        .map_err(ApiError::from)?;

    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let task = state
        .db()
        .get_task(&id)
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::task_not_found(&id))?;

    Ok(Json(task))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<TaskUpdate>,
) -> Result<Json<Task>, ApiError> {
    let task = state.db().update_task(&id, body).map_err(ApiError::from)?;
    Ok(Json(task))
}
