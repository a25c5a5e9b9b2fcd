//! Dependency edge operations and cycle prevention.

use super::tasks::task_exists;
use super::{now_ms, Database};
use crate::error::ApiError;
use crate::types::{DependencyDetail, DependencyType, TaskDependency, TaskStatus};
use anyhow::Result;
use rusqlite::{params, Connection};
use std::collections::{HashSet, VecDeque};
use uuid::Uuid;

impl Database {
    /// Add a dependency: `task_id` depends on `depends_on_task_id`.
    ///
    /// The reachability check and the insert share one transaction, so two
    /// concurrent adds serialize on the store and cannot each pass
    /// validation and jointly close a cycle.
    pub fn add_dependency(
        &self,
        task_id: &str,
        depends_on_task_id: &str,
        dep_type: DependencyType,
        lag_minutes: i64,
    ) -> Result<TaskDependency> {
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if !task_exists(&tx, task_id)? {
                return Err(ApiError::task_not_found(task_id).into());
            }
            if !task_exists(&tx, depends_on_task_id)? {
                return Err(ApiError::task_not_found(depends_on_task_id).into());
            }

            // A self-edge is the length-one cycle.
            if task_id == depends_on_task_id {
                return Err(ApiError::dependency_cycle(task_id, depends_on_task_id).into());
            }

            let duplicate: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM task_dependencies
                 WHERE task_id = ?1 AND depends_on_task_id = ?2)",
                params![task_id, depends_on_task_id],
                |row| row.get(0),
            )?;
            if duplicate {
                return Err(ApiError::conflict(format!(
                    "Dependency {} -> {} already exists",
                    task_id, depends_on_task_id
                ))
                .into());
            }

            // If task_id is already reachable from depends_on_task_id along
            // existing depends_on edges, the new edge would close a cycle.
            if reachable(&tx, depends_on_task_id, task_id)? {
                return Err(ApiError::dependency_cycle(task_id, depends_on_task_id).into());
            }

            let dependency = TaskDependency {
                id: Uuid::now_v7().to_string(),
                task_id: task_id.to_string(),
                depends_on_task_id: depends_on_task_id.to_string(),
                dep_type,
                lag_minutes,
                created_at: now,
            };

            tx.execute(
                "INSERT INTO task_dependencies
                    (id, task_id, depends_on_task_id, dep_type, lag_minutes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    &dependency.id,
                    task_id,
                    depends_on_task_id,
                    dep_type.as_str(),
                    lag_minutes,
                    now,
                ],
            )?;

            tx.commit()?;

            Ok(dependency)
        })
    }

    /// Remove a dependency. Removal can never create a cycle, so no
    /// re-validation is needed.
    pub fn remove_dependency(&self, dependency_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM task_dependencies WHERE id = ?1",
                params![dependency_id],
            )?;

            if deleted == 0 {
                return Err(ApiError::dependency_not_found(dependency_id).into());
            }

            Ok(())
        })
    }

    /// List a task's dependencies in creation order, with the depended-on
    /// task's display attributes.
    pub fn list_dependencies(&self, task_id: &str) -> Result<Vec<DependencyDetail>> {
        self.with_conn(|conn| {
            if !task_exists(conn, task_id)? {
                return Err(ApiError::task_not_found(task_id).into());
            }

            let mut stmt = conn.prepare(
                "SELECT d.id, d.task_id, d.depends_on_task_id, d.dep_type,
                        d.lag_minutes, d.created_at, t.title, t.status
                 FROM task_dependencies d
                 INNER JOIN tasks t ON t.id = d.depends_on_task_id
                 WHERE d.task_id = ?1
                 ORDER BY d.created_at, d.id",
            )?;

            let deps = stmt
                .query_map(params![task_id], |row| {
                    let dep_type: String = row.get("dep_type")?;
                    let status: String = row.get("status")?;

                    Ok(DependencyDetail {
                        dependency: TaskDependency {
                            id: row.get("id")?,
                            task_id: row.get("task_id")?,
                            depends_on_task_id: row.get("depends_on_task_id")?,
                            dep_type: DependencyType::parse(&dep_type).unwrap_or_default(),
                            lag_minutes: row.get("lag_minutes")?,
                            created_at: row.get("created_at")?,
                        },
                        depends_on_title: row.get("title")?,
                        depends_on_status: TaskStatus::parse(&status)
                            .unwrap_or(TaskStatus::Draft),
                    })
                })?
                .filter_map(|r| r.ok())
                .collect();

            Ok(deps)
        })
    }
}

/// Breadth-first search along depends_on edges from `start` toward `target`.
fn reachable(conn: &Connection, start: &str, target: &str) -> Result<bool> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = VecDeque::new();
    queue.push_back(start.to_string());

    let mut stmt =
        conn.prepare("SELECT depends_on_task_id FROM task_dependencies WHERE task_id = ?1")?;

    while let Some(current) = queue.pop_front() {
        if current == target {
            return Ok(true);
        }

        if !visited.insert(current.clone()) {
            continue;
        }

        let next: Vec<String> = stmt
            .query_map(params![&current], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        for id in next {
            if !visited.contains(&id) {
                queue.push_back(id);
            }
        }
    }

    Ok(false)
}
