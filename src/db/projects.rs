//! Project CRUD and code stamping.

use super::{now_ms, sequence, Database};
use crate::error::ApiError;
use crate::types::Project;
use anyhow::Result;
use chrono::Datelike;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

fn parse_project_row(row: &Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get("id")?,
        code: row.get("code")?,
        name: row.get("name")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) fn project_exists(conn: &Connection, project_id: &str) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM projects WHERE id = ?1)",
        params![project_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

impl Database {
    /// Create a project, stamping it with the next code for the current year.
    ///
    /// The allocation and the insert commit together; a failed insert rolls
    /// the counter back with it, so a retry reuses the same sequence number.
    pub fn create_project(&self, name: &str, description: Option<&str>) -> Result<Project> {
        if name.trim().is_empty() {
            return Err(ApiError::validation("name must not be empty")
                .with_field("name")
                .into());
        }

        let project_id = Uuid::now_v7().to_string();
        let now = now_ms();
        let year = chrono::Utc::now().year();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let code = sequence::allocate_code(&tx, year)?;

            tx.execute(
                "INSERT INTO projects (id, code, name, description, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![&project_id, &code, name, description, now, now],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(f, _)
                    if f.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    anyhow::Error::from(ApiError::conflict(format!(
                        "Project code {} already taken",
                        code
                    )))
                }
                e => e.into(),
            })?;

            tx.commit()?;

            Ok(Project {
                id: project_id,
                code,
                name: name.to_string(),
                description: description.map(String::from),
                created_at: now,
                updated_at: now,
            })
        })
    }

    /// Get a project by ID.
    pub fn get_project(&self, project_id: &str) -> Result<Option<Project>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM projects WHERE id = ?1")?;

            let result = stmt.query_row(params![project_id], parse_project_row);

            match result {
                Ok(project) => Ok(Some(project)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// List all projects in creation order.
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM projects ORDER BY created_at, id")?;
            let projects = stmt
                .query_map([], parse_project_row)?
                .filter_map(|r| r.ok())
                .collect();

            Ok(projects)
        })
    }
}
