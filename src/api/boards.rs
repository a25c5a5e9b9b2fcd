//! Board endpoints: board read, task moves, column reorder, Gantt read.

use super::AppState;
use crate::error::ApiError;
use crate::types::{Board, GanttNode, Task, TaskStatus};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

pub async fn get_board(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Board>, ApiError> {
    let board = state.db().get_board(&id).map_err(ApiError::from)?;
    Ok(Json(board))
}

pub async fn get_gantt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<GanttNode>>, ApiError> {
    let forest = state.db().get_gantt(&id).map_err(ApiError::from)?;
    Ok(Json(forest))
}

#[derive(Debug, Deserialize)]
pub struct MoveTask {
    pub target_status: TaskStatus,
    pub target_position: u32,
}

pub async fn move_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<MoveTask>,
) -> Result<Json<Task>, ApiError> {
    let task = state
        .db()
        .move_task(&id, body.target_status, i64::from(body.target_position))
        .map_err(ApiError::from)?;

    Ok(Json(task))
}

#[derive(Debug, Deserialize)]
pub struct ReorderColumn {
    pub ordered_task_ids: Vec<String>,
}

pub async fn reorder_column(
    State(state): State<AppState>,
    Path((id, status)): Path<(String, String)>,
    Json(body): Json<ReorderColumn>,
) -> Result<StatusCode, ApiError> {
    let status = TaskStatus::parse(&status).ok_or_else(|| {
        ApiError::validation(format!("unknown status: {}", status)).with_field("status")
    })?;

    state
        .db()
        .reorder_column(&id, status, &body.ordered_task_ids)
        .map_err(ApiError::from)?;

    Ok(StatusCode::NO_CONTENT)
}
