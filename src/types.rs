//! Core domain types for the task board service.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Task status. `ORDER` below is the canonical board column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Draft,
    Planned,
    InProgress,
    Blocked,
    OnHold,
    Completed,
    Cancelled,
}

impl TaskStatus {
    /// Fixed status order used to render board columns.
    pub const ORDER: [TaskStatus; 7] = [
        TaskStatus::Draft,
        TaskStatus::Planned,
        TaskStatus::InProgress,
        TaskStatus::Blocked,
        TaskStatus::OnHold,
        TaskStatus::Completed,
        TaskStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Draft => "draft",
            TaskStatus::Planned => "planned",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Blocked => "blocked",
            TaskStatus::OnHold => "on_hold",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(TaskStatus::Draft),
            "planned" => Some(TaskStatus::Planned),
            "in_progress" => Some(TaskStatus::InProgress),
            "blocked" => Some(TaskStatus::Blocked),
            "on_hold" => Some(TaskStatus::OnHold),
            "completed" => Some(TaskStatus::Completed),
            "cancelled" => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dependency type between two tasks (finish-to-start etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DependencyType {
    /// Finish-to-start (default)
    #[default]
    Fs,
    /// Start-to-start
    Ss,
    /// Finish-to-finish
    Ff,
    /// Start-to-finish
    Sf,
}

impl DependencyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyType::Fs => "FS",
            DependencyType::Ss => "SS",
            DependencyType::Ff => "FF",
            DependencyType::Sf => "SF",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "FS" => Some(DependencyType::Fs),
            "SS" => Some(DependencyType::Ss),
            "FF" => Some(DependencyType::Ff),
            "SF" => Some(DependencyType::Sf),
            _ => None,
        }
    }
}

/// A project grouping tasks under a unique yearly code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A task on a project board.
///
/// `kanban_position` is maintained by the board operations so that every
/// (project, status) bucket holds positions 0..n-1 with no gaps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub kanban_position: i64,
    pub parent_task_id: Option<String>,

    // Scheduling (epoch millis)
    pub planned_start: Option<i64>,
    pub planned_end: Option<i64>,
    pub actual_start: Option<i64>,
    pub actual_end: Option<i64>,
    pub progress_pct: i64,

    pub created_at: i64,
    pub updated_at: i64,
}

/// Ordinary field updates; status and position go through the board moves.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub parent_task_id: Option<String>,
    pub planned_start: Option<i64>,
    pub planned_end: Option<i64>,
    pub progress_pct: Option<i64>,
}

/// A directed dependency edge: `task_id` depends on `depends_on_task_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDependency {
    pub id: String,
    pub task_id: String,
    pub depends_on_task_id: String,
    pub dep_type: DependencyType,
    pub lag_minutes: i64,
    pub created_at: i64,
}

/// A dependency edge with the depended-on task's display attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyDetail {
    #[serde(flatten)]
    pub dependency: TaskDependency,
    pub depends_on_title: String,
    pub depends_on_status: TaskStatus,
}

/// One board column: all tasks of a project in one status, position order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardColumn {
    pub status: TaskStatus,
    pub count: usize,
    pub tasks: Vec<Task>,
}

/// A project board: one column per status, in the fixed status order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub project_id: String,
    pub columns: Vec<BoardColumn>,
}

/// A task with its subtasks for Gantt rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GanttNode {
    #[serde(flatten)]
    pub task: Task,
    pub children: Vec<GanttNode>,
}
