//! Board reads and position-preserving task moves.
//!
//! Every (project, status) bucket keeps kanban positions as a gapless
//! 0..n-1 permutation. Moves write only the shifted window of rows, and
//! each operation commits or rolls back as one transaction.

use super::lifecycle::status_change_effects;
use super::projects::project_exists;
use super::tasks::{bucket_size, get_task_internal, parse_task_row};
use super::{now_ms, Database};
use crate::error::ApiError;
use crate::types::{Board, BoardColumn, GanttNode, Task, TaskStatus};
use anyhow::Result;
use rusqlite::{params, Connection};
use std::collections::{HashMap, HashSet};

impl Database {
    /// Get the board for a project: one column per status in the fixed
    /// order, each sorted by kanban position (created_at breaks ties).
    pub fn get_board(&self, project_id: &str) -> Result<Board> {
        self.with_conn(|conn| {
            if !project_exists(conn, project_id)? {
                return Err(ApiError::project_not_found(project_id).into());
            }

            let mut stmt = conn.prepare(
                "SELECT * FROM tasks WHERE project_id = ?1
                 ORDER BY kanban_position, created_at",
            )?;
            let tasks: Vec<Task> = stmt
                .query_map(params![project_id], parse_task_row)?
                .filter_map(|r| r.ok())
                .collect();

            let mut buckets: HashMap<TaskStatus, Vec<Task>> = HashMap::new();
            for task in tasks {
                buckets.entry(task.status).or_default().push(task);
            }

            let columns = TaskStatus::ORDER
                .iter()
                .map(|&status| {
                    let tasks = buckets.remove(&status).unwrap_or_default();
                    BoardColumn {
                        status,
                        count: tasks.len(),
                        tasks,
                    }
                })
                .collect();

            Ok(Board {
                project_id: project_id.to_string(),
                columns,
            })
        })
    }

    /// Move a task to `target_position` in `target_status`, shifting only
    /// the affected rows. Applies status lifecycle effects in the same
    /// transaction when the column changes.
    pub fn move_task(
        &self,
        task_id: &str,
        target_status: TaskStatus,
        target_position: i64,
    ) -> Result<Task> {
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let task = get_task_internal(&tx, task_id)?
                .ok_or_else(|| ApiError::task_not_found(task_id))?;

            let moved = if task.status == target_status {
                reorder_within_column(&tx, &task, target_position, now)?
            } else {
                move_across_columns(&tx, &task, target_status, target_position, now)?
            };

            tx.commit()?;

            Ok(moved)
        })
    }

    /// Replace the ordering of one column with an explicit id list.
    ///
    /// The list must be exactly the column's current membership; on any
    /// mismatch nothing is written.
    pub fn reorder_column(
        &self,
        project_id: &str,
        status: TaskStatus,
        ordered_task_ids: &[String],
    ) -> Result<()> {
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if !project_exists(&tx, project_id)? {
                return Err(ApiError::project_not_found(project_id).into());
            }

            let current: HashSet<String> = {
                let mut stmt =
                    tx.prepare("SELECT id FROM tasks WHERE project_id = ?1 AND status = ?2")?;
                stmt.query_map(params![project_id, status.as_str()], |row| row.get(0))?
                    .filter_map(|r| r.ok())
                    .collect()
            };

            let requested: HashSet<&str> = ordered_task_ids.iter().map(String::as_str).collect();
            let matches = requested.len() == ordered_task_ids.len()
                && current.len() == ordered_task_ids.len()
                && current.iter().all(|id| requested.contains(id.as_str()));
            if !matches {
                return Err(ApiError::validation(format!(
                    "ordered_task_ids must contain exactly the tasks of the {} column",
                    status
                ))
                .with_field("ordered_task_ids")
                .into());
            }

            for (index, id) in ordered_task_ids.iter().enumerate() {
                tx.execute(
                    "UPDATE tasks SET kanban_position = ?1, updated_at = ?2 WHERE id = ?3",
                    params![index as i64, now, id],
                )?;
            }

            tx.commit()?;

            Ok(())
        })
    }

    /// Get the task forest of a project for Gantt rendering.
    pub fn get_gantt(&self, project_id: &str) -> Result<Vec<GanttNode>> {
        self.with_conn(|conn| {
            if !project_exists(conn, project_id)? {
                return Err(ApiError::project_not_found(project_id).into());
            }

            let mut stmt = conn
                .prepare("SELECT * FROM tasks WHERE project_id = ?1 ORDER BY created_at, id")?;
            let tasks: Vec<Task> = stmt
                .query_map(params![project_id], parse_task_row)?
                .filter_map(|r| r.ok())
                .collect();

            Ok(build_forest(tasks))
        })
    }
}

/// Move within one column by shifting the window between the old and new
/// slots, then dropping the task into the freed slot.
fn reorder_within_column(
    conn: &Connection,
    task: &Task,
    target_position: i64,
    now: i64,
) -> Result<Task> {
    let size = bucket_size(conn, &task.project_id, task.status)?;
    let target = target_position.clamp(0, size - 1);
    let current = task.kanban_position;

    if target == current {
        return Ok(task.clone());
    }

    if target > current {
        conn.execute(
            "UPDATE tasks SET kanban_position = kanban_position - 1, updated_at = ?1
             WHERE project_id = ?2 AND status = ?3
               AND kanban_position > ?4 AND kanban_position <= ?5",
            params![now, task.project_id, task.status.as_str(), current, target],
        )?;
    } else {
        conn.execute(
            "UPDATE tasks SET kanban_position = kanban_position + 1, updated_at = ?1
             WHERE project_id = ?2 AND status = ?3
               AND kanban_position >= ?4 AND kanban_position < ?5",
            params![now, task.project_id, task.status.as_str(), target, current],
        )?;
    }

    conn.execute(
        "UPDATE tasks SET kanban_position = ?1, updated_at = ?2 WHERE id = ?3",
        params![target, now, task.id],
    )?;

    Ok(Task {
        kanban_position: target,
        updated_at: now,
        ..task.clone()
    })
}

/// Move into another column: make room in the target bucket, place the task
/// with its lifecycle effects, then close the gap in the source bucket.
fn move_across_columns(
    conn: &Connection,
    task: &Task,
    target_status: TaskStatus,
    target_position: i64,
    now: i64,
) -> Result<Task> {
    let size = bucket_size(conn, &task.project_id, target_status)?;
    let target = target_position.clamp(0, size);

    conn.execute(
        "UPDATE tasks SET kanban_position = kanban_position + 1, updated_at = ?1
         WHERE project_id = ?2 AND status = ?3 AND kanban_position >= ?4",
        params![now, task.project_id, target_status.as_str(), target],
    )?;

    let effects = status_change_effects(task, target_status, now);
    let actual_start = effects.actual_start.or(task.actual_start);
    let actual_end = effects.actual_end.or(task.actual_end);
    let progress_pct = effects.progress_pct.unwrap_or(task.progress_pct);

    conn.execute(
        "UPDATE tasks SET status = ?1, kanban_position = ?2, actual_start = ?3,
                actual_end = ?4, progress_pct = ?5, updated_at = ?6
         WHERE id = ?7",
        params![
            target_status.as_str(),
            target,
            actual_start,
            actual_end,
            progress_pct,
            now,
            task.id,
        ],
    )?;

    conn.execute(
        "UPDATE tasks SET kanban_position = kanban_position - 1, updated_at = ?1
         WHERE project_id = ?2 AND status = ?3 AND kanban_position > ?4",
        params![now, task.project_id, task.status.as_str(), task.kanban_position],
    )?;

    Ok(Task {
        status: target_status,
        kanban_position: target,
        actual_start,
        actual_end,
        progress_pct,
        updated_at: now,
        ..task.clone()
    })
}

/// Assemble a forest from parent links. Tasks whose parent is missing from
/// the set are treated as roots.
fn build_forest(tasks: Vec<Task>) -> Vec<GanttNode> {
    let ids: HashSet<String> = tasks.iter().map(|t| t.id.clone()).collect();

    let mut children_of: HashMap<String, Vec<Task>> = HashMap::new();
    let mut roots: Vec<Task> = Vec::new();
    for task in tasks {
        match task.parent_task_id.clone() {
            Some(parent_id) if ids.contains(&parent_id) => {
                children_of.entry(parent_id).or_default().push(task);
            }
            _ => roots.push(task),
        }
    }

    roots
        .into_iter()
        .map(|task| attach_children(task, &mut children_of))
        .collect()
}

fn attach_children(task: Task, children_of: &mut HashMap<String, Vec<Task>>) -> GanttNode {
    let children = children_of
        .remove(&task.id)
        .unwrap_or_default()
        .into_iter()
        .map(|child| attach_children(child, children_of))
        .collect();

    GanttNode { task, children }
}
