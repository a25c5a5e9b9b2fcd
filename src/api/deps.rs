//! Dependency endpoints.

use super::AppState;
use crate::error::ApiError;
use crate::types::{DependencyDetail, DependencyType, TaskDependency};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CreateDependency {
    pub depends_on_task_id: String,
    #[serde(default, rename = "type")]
    pub dep_type: DependencyType,
    #[serde(default)]
    pub lag_minutes: i64,
}

pub async fn create(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<CreateDependency>,
) -> Result<(StatusCode, Json<TaskDependency>), ApiError> {
    let dependency = state
        .db()
        .add_dependency(
            &id,
            &body.depends_on_task_id,
            body.dep_type,
            body.lag_minutes,
        )
        .map_err(ApiError::from)?;

    Ok((StatusCode::CREATED, Json(dependency)))
}

pub async fn list(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<DependencyDetail>>, ApiError> {
    let deps = state.db().list_dependencies(&id).map_err(ApiError::from)?;
    Ok(Json(deps))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.db().remove_dependency(&id).map_err(ApiError::from)?;
    Ok(StatusCode::NO_CONTENT)
}
