//! Structured error types shared by the database and HTTP layers.

use serde::Serialize;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Not found errors
    ProjectNotFound,
    TaskNotFound,
    DependencyNotFound,

    // Invariant violations
    TaskDependencyCycle,

    // Malformed or mismatched input
    ValidationError,

    // Conflict errors
    ResourceConflict,

    // Internal errors
    DatabaseError,
    InternalError,
}

/// Structured error carried through service results and API responses.
#[derive(Debug, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors

    pub fn project_not_found(project_id: &str) -> Self {
        Self::new(
            ErrorCode::ProjectNotFound,
            format!("Project not found: {}", project_id),
        )
    }

    pub fn task_not_found(task_id: &str) -> Self {
        Self::new(
            ErrorCode::TaskNotFound,
            format!("Task not found: {}", task_id),
        )
    }

    pub fn dependency_not_found(dependency_id: &str) -> Self {
        Self::new(
            ErrorCode::DependencyNotFound,
            format!("Dependency not found: {}", dependency_id),
        )
    }

    pub fn dependency_cycle(task_id: &str, depends_on_task_id: &str) -> Self {
        Self::new(
            ErrorCode::TaskDependencyCycle,
            format!(
                "Adding dependency {} -> {} would create a cycle",
                task_id, depends_on_task_id
            ),
        )
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ResourceConflict, message)
    }

    pub fn database(err: impl std::fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, err.to_string())
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        // Try to downcast to ApiError first
        match err.downcast::<ApiError>() {
            Ok(api_err) => api_err,
            Err(err) => {
                // A raw store error that escaped the db layer untyped
                if err
                    .chain()
                    .any(|cause| cause.downcast_ref::<rusqlite::Error>().is_some())
                {
                    ApiError::database(err)
                } else {
                    ApiError::internal(err)
                }
            }
        }
    }
}

/// Result type for service operations surfaced to callers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
