//! Project endpoints.

use super::AppState;
use crate::error::ApiError;
use crate::types::Project;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CreateProject {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateProject>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    let project = state
        .db()
        .create_project(&body.name, body.description.as_deref())
        .map_err(ApiError::from)?;

    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Project>>, ApiError> {
    let projects = state.db().list_projects().map_err(ApiError::from)?;
    Ok(Json(projects))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Project>, ApiError> {
    let project = state
        .db()
        .get_project(&id)
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::project_not_found(&id))?;

    Ok(Json(project))
}
