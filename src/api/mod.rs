//! HTTP surface over the task board database.
//!
//! Thin axum handlers: each one delegates to a `Database` operation and
//! maps the typed error onto a status code. All invariant enforcement
//! lives in the db layer.

pub mod boards;
pub mod deps;
pub mod projects;
pub mod tasks;

use crate::db::Database;
use crate::error::{ApiError, ErrorCode};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    db: Arc<Database>,
}

impl AppState {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/projects", post(projects::create).get(projects::list))
        .route("/api/projects/{id}", get(projects::get))
        .route("/api/projects/{id}/board", get(boards::get_board))
        .route("/api/projects/{id}/gantt", get(boards::get_gantt))
        .route(
            "/api/projects/{id}/columns/{status}/reorder",
            post(boards::reorder_column),
        )
        .route("/api/tasks", post(tasks::create))
        .route("/api/tasks/{id}", get(tasks::get).patch(tasks::update))
        .route("/api/tasks/{id}/move", post(boards::move_task))
        .route(
            "/api/tasks/{id}/dependencies",
            get(deps::list).post(deps::create),
        )
        .route("/api/dependencies/{id}", delete(deps::remove))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve the API until the process is stopped.
pub async fn serve(db: Arc<Database>, addr: SocketAddr) -> anyhow::Result<()> {
    let app = router(AppState::new(db));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP API listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::ProjectNotFound | ErrorCode::TaskNotFound | ErrorCode::DependencyNotFound => {
            StatusCode::NOT_FOUND
        }
        ErrorCode::TaskDependencyCycle | ErrorCode::ResourceConflict => StatusCode::CONFLICT,
        ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
        ErrorCode::DatabaseError | ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.code);
        (status, Json(self)).into_response()
    }
}
