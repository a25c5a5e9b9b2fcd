//! Task CRUD. Status and kanban position are owned by the board operations.

use super::{now_ms, Database};
use crate::error::ApiError;
use crate::types::{Task, TaskStatus, TaskUpdate};
use anyhow::Result;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

pub(crate) fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let status: String = row.get("status")?;

    Ok(Task {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        status: TaskStatus::parse(&status).unwrap_or(TaskStatus::Draft),
        kanban_position: row.get("kanban_position")?,
        parent_task_id: row.get("parent_task_id")?,
        planned_start: row.get("planned_start")?,
        planned_end: row.get("planned_end")?,
        actual_start: row.get("actual_start")?,
        actual_end: row.get("actual_end")?,
        progress_pct: row.get("progress_pct")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Internal helper to get a task using an existing connection.
pub(crate) fn get_task_internal(conn: &Connection, task_id: &str) -> Result<Option<Task>> {
    let mut stmt = conn.prepare("SELECT * FROM tasks WHERE id = ?1")?;

    let result = stmt.query_row(params![task_id], parse_task_row);

    match result {
        Ok(task) => Ok(Some(task)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn task_exists(conn: &Connection, task_id: &str) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM tasks WHERE id = ?1)",
        params![task_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Number of tasks in one (project, status) bucket.
pub(crate) fn bucket_size(conn: &Connection, project_id: &str, status: TaskStatus) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM tasks WHERE project_id = ?1 AND status = ?2",
        params![project_id, status.as_str()],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn validate_progress(progress_pct: i64) -> Result<()> {
    if !(0..=100).contains(&progress_pct) {
        return Err(ApiError::validation(format!(
            "progress_pct must be between 0 and 100, got {}",
            progress_pct
        ))
        .with_field("progress_pct")
        .into());
    }
    Ok(())
}

impl Database {
    /// Create a new task at the end of its project's DRAFT column.
    ///
    /// The position is derived from the bucket size inside the insert
    /// transaction, never from in-process state.
    #[allow(clippy::too_many_arguments)]
    pub fn create_task(
        &self,
        project_id: &str,
        title: &str,
        description: Option<&str>,
        parent_task_id: Option<&str>,
        planned_start: Option<i64>,
        planned_end: Option<i64>,
    ) -> Result<Task> {
        if title.trim().is_empty() {
            return Err(ApiError::validation("title must not be empty")
                .with_field("title")
                .into());
        }

        let task_id = Uuid::now_v7().to_string();
        let now = now_ms();
        let status = TaskStatus::Draft;

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if !super::projects::project_exists(&tx, project_id)? {
                return Err(ApiError::project_not_found(project_id).into());
            }

            if let Some(parent_id) = parent_task_id {
                let parent = get_task_internal(&tx, parent_id)?
                    .ok_or_else(|| ApiError::task_not_found(parent_id))?;
                if parent.project_id != project_id {
                    return Err(ApiError::validation(
                        "parent task belongs to a different project",
                    )
                    .with_field("parent_task_id")
                    .into());
                }
            }

            let position = bucket_size(&tx, project_id, status)?;

            tx.execute(
                "INSERT INTO tasks (
                    id, project_id, title, description, status, kanban_position,
                    parent_task_id, planned_start, planned_end, progress_pct,
                    created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?10, ?11)",
                params![
                    &task_id,
                    project_id,
                    title,
                    description,
                    status.as_str(),
                    position,
                    parent_task_id,
                    planned_start,
                    planned_end,
                    now,
                    now,
                ],
            )?;

            tx.commit()?;

            Ok(Task {
                id: task_id,
                project_id: project_id.to_string(),
                title: title.to_string(),
                description: description.map(String::from),
                status,
                kanban_position: position,
                parent_task_id: parent_task_id.map(String::from),
                planned_start,
                planned_end,
                actual_start: None,
                actual_end: None,
                progress_pct: 0,
                created_at: now,
                updated_at: now,
            })
        })
    }

    /// Get a task by ID.
    pub fn get_task(&self, task_id: &str) -> Result<Option<Task>> {
        self.with_conn(|conn| get_task_internal(conn, task_id))
    }

    /// Update ordinary task fields. Status and position are rejected here by
    /// construction: they only change through `move_task` / `reorder_column`.
    pub fn update_task(&self, task_id: &str, update: TaskUpdate) -> Result<Task> {
        let now = now_ms();

        if let Some(progress) = update.progress_pct {
            validate_progress(progress)?;
        }

        self.with_conn(|conn| {
            let task = get_task_internal(conn, task_id)?
                .ok_or_else(|| ApiError::task_not_found(task_id))?;

            if let Some(ref parent_id) = update.parent_task_id {
                if parent_id == task_id {
                    return Err(ApiError::validation("a task cannot be its own parent")
                        .with_field("parent_task_id")
                        .into());
                }
                let parent = get_task_internal(conn, parent_id)?
                    .ok_or_else(|| ApiError::task_not_found(parent_id))?;
                if parent.project_id != task.project_id {
                    return Err(ApiError::validation(
                        "parent task belongs to a different project",
                    )
                    .with_field("parent_task_id")
                    .into());
                }
            }

            let new_title = update.title.unwrap_or(task.title.clone());
            if new_title.trim().is_empty() {
                return Err(ApiError::validation("title must not be empty")
                    .with_field("title")
                    .into());
            }
            let new_description = update.description.or(task.description.clone());
            let new_parent = update.parent_task_id.or(task.parent_task_id.clone());
            let new_planned_start = update.planned_start.or(task.planned_start);
            let new_planned_end = update.planned_end.or(task.planned_end);
            let new_progress = update.progress_pct.unwrap_or(task.progress_pct);

            conn.execute(
                "UPDATE tasks SET
                    title = ?1, description = ?2, parent_task_id = ?3,
                    planned_start = ?4, planned_end = ?5, progress_pct = ?6,
                    updated_at = ?7
                WHERE id = ?8",
                params![
                    new_title,
                    new_description,
                    new_parent,
                    new_planned_start,
                    new_planned_end,
                    new_progress,
                    now,
                    task_id,
                ],
            )?;

            Ok(Task {
                title: new_title,
                description: new_description,
                parent_task_id: new_parent,
                planned_start: new_planned_start,
                planned_end: new_planned_end,
                progress_pct: new_progress,
                updated_at: now,
                ..task
            })
        })
    }

    /// List all tasks of a project in creation order.
    pub fn list_tasks(&self, project_id: &str) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            if !super::projects::project_exists(conn, project_id)? {
                return Err(ApiError::project_not_found(project_id).into());
            }

            let mut stmt = conn
                .prepare("SELECT * FROM tasks WHERE project_id = ?1 ORDER BY created_at, id")?;
            let tasks = stmt
                .query_map(params![project_id], parse_task_row)?
                .filter_map(|r| r.ok())
                .collect();

            Ok(tasks)
        })
    }
}
