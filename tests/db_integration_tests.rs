//! Integration tests for the database layer.
//!
//! These tests verify the board-position, acyclicity, and code-sequence
//! invariants using an in-memory SQLite database.

use taskboard::db::Database;
use taskboard::error::{ApiError, ErrorCode};
use taskboard::types::{DependencyType, Task, TaskStatus, TaskUpdate};

/// Helper to create a fresh in-memory database for testing.
fn setup_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

/// Helper to create a project and return its id.
fn setup_project(db: &Database) -> String {
    db.create_project("Test Project", None)
        .expect("Failed to create project")
        .id
}

/// Helper to create a task with just a title.
fn add_task(db: &Database, project_id: &str, title: &str) -> Task {
    db.create_task(project_id, title, None, None, None, None)
        .expect("Failed to create task")
}

/// Extract the typed error code from a failed operation.
fn error_code(err: &anyhow::Error) -> ErrorCode {
    err.downcast_ref::<ApiError>()
        .expect("expected a typed ApiError")
        .code
}

/// Assert that every column of the project's board holds positions 0..n-1.
fn assert_gapless(db: &Database, project_id: &str) {
    let board = db.get_board(project_id).unwrap();
    for column in board.columns {
        let mut positions: Vec<i64> = column.tasks.iter().map(|t| t.kanban_position).collect();
        positions.sort_unstable();
        let expected: Vec<i64> = (0..column.tasks.len() as i64).collect();
        assert_eq!(
            positions, expected,
            "column {} must hold a gapless permutation",
            column.status
        );
    }
}

mod project_tests {
    use super::*;

    #[test]
    fn create_project_stamps_sequential_codes() {
        let db = setup_db();
        let year = chrono::Utc::now().format("%Y").to_string();

        let first = db.create_project("Alpha", None).unwrap();
        let second = db.create_project("Beta", Some("second project")).unwrap();

        assert_eq!(first.code, format!("PRJ-{}-0001", year));
        assert_eq!(second.code, format!("PRJ-{}-0002", year));
        assert_eq!(second.description.as_deref(), Some("second project"));
    }

    #[test]
    fn create_project_rejects_empty_name() {
        let db = setup_db();

        let err = db.create_project("  ", None).unwrap_err();

        assert_eq!(error_code(&err), ErrorCode::ValidationError);
    }

    #[test]
    fn get_project_returns_none_for_unknown_id() {
        let db = setup_db();

        assert!(db.get_project("nope").unwrap().is_none());
    }

    #[test]
    fn list_projects_returns_creation_order() {
        let db = setup_db();
        db.create_project("Alpha", None).unwrap();
        db.create_project("Beta", None).unwrap();

        let projects = db.list_projects().unwrap();

        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].name, "Alpha");
        assert_eq!(projects[1].name, "Beta");
    }
}

mod sequence_tests {
    use super::*;

    #[test]
    fn first_allocation_for_a_year_yields_one() {
        let db = setup_db();

        assert_eq!(db.next_project_code(2025).unwrap(), "PRJ-2025-0001");
    }

    #[test]
    fn allocations_strictly_increase() {
        let db = setup_db();

        let codes: Vec<String> = (0..10).map(|_| db.next_project_code(2025).unwrap()).collect();

        let expected: Vec<String> = (1..=10).map(|n| format!("PRJ-2025-{:04}", n)).collect();
        assert_eq!(codes, expected);
    }

    #[test]
    fn years_have_independent_counters() {
        let db = setup_db();

        assert_eq!(db.next_project_code(2024).unwrap(), "PRJ-2024-0001");
        assert_eq!(db.next_project_code(2025).unwrap(), "PRJ-2025-0001");
        assert_eq!(db.next_project_code(2024).unwrap(), "PRJ-2024-0002");
    }
}

mod task_tests {
    use super::*;

    #[test]
    fn create_task_appends_to_draft_column() {
        let db = setup_db();
        let project_id = setup_project(&db);

        let t1 = add_task(&db, &project_id, "first");
        let t2 = add_task(&db, &project_id, "second");
        let t3 = add_task(&db, &project_id, "third");

        assert_eq!(t1.status, TaskStatus::Draft);
        assert_eq!(
            (t1.kanban_position, t2.kanban_position, t3.kanban_position),
            (0, 1, 2)
        );
        assert_gapless(&db, &project_id);
    }

    #[test]
    fn create_task_fails_for_unknown_project() {
        let db = setup_db();

        let err = db
            .create_task("missing", "task", None, None, None, None)
            .unwrap_err();

        assert_eq!(error_code(&err), ErrorCode::ProjectNotFound);
    }

    #[test]
    fn create_task_rejects_parent_from_other_project() {
        let db = setup_db();
        let project_a = setup_project(&db);
        let project_b = setup_project(&db);
        let parent = add_task(&db, &project_a, "parent");

        let err = db
            .create_task(&project_b, "child", None, Some(&parent.id), None, None)
            .unwrap_err();

        assert_eq!(error_code(&err), ErrorCode::ValidationError);
    }

    #[test]
    fn update_task_changes_ordinary_fields_only() {
        let db = setup_db();
        let project_id = setup_project(&db);
        let task = add_task(&db, &project_id, "draft me");

        let updated = db
            .update_task(
                &task.id,
                TaskUpdate {
                    title: Some("renamed".to_string()),
                    progress_pct: Some(40),
                    planned_start: Some(1_000),
                    ..TaskUpdate::default()
                },
            )
            .unwrap();

        assert_eq!(updated.title, "renamed");
        assert_eq!(updated.progress_pct, 40);
        assert_eq!(updated.planned_start, Some(1_000));
        assert_eq!(updated.status, TaskStatus::Draft);
        assert_eq!(updated.kanban_position, task.kanban_position);
    }

    #[test]
    fn update_task_rejects_out_of_range_progress() {
        let db = setup_db();
        let project_id = setup_project(&db);
        let task = add_task(&db, &project_id, "task");

        let err = db
            .update_task(
                &task.id,
                TaskUpdate {
                    progress_pct: Some(101),
                    ..TaskUpdate::default()
                },
            )
            .unwrap_err();

        assert_eq!(error_code(&err), ErrorCode::ValidationError);
    }

    #[test]
    fn update_task_rejects_self_parent() {
        let db = setup_db();
        let project_id = setup_project(&db);
        let task = add_task(&db, &project_id, "task");

        let err = db
            .update_task(
                &task.id,
                TaskUpdate {
                    parent_task_id: Some(task.id.clone()),
                    ..TaskUpdate::default()
                },
            )
            .unwrap_err();

        assert_eq!(error_code(&err), ErrorCode::ValidationError);
    }
}

mod board_tests {
    use super::*;

    #[test]
    fn get_board_fails_for_unknown_project() {
        let db = setup_db();

        let err = db.get_board("missing").unwrap_err();

        assert_eq!(error_code(&err), ErrorCode::ProjectNotFound);
    }

    #[test]
    fn board_has_one_column_per_status_even_when_empty() {
        let db = setup_db();
        let project_id = setup_project(&db);
        add_task(&db, &project_id, "only task");

        let board = db.get_board(&project_id).unwrap();

        assert_eq!(board.columns.len(), TaskStatus::ORDER.len());
        for (column, &status) in board.columns.iter().zip(TaskStatus::ORDER.iter()) {
            assert_eq!(column.status, status);
            assert_eq!(column.count, column.tasks.len());
        }
        assert_eq!(board.columns[0].count, 1);
        assert_eq!(board.columns[1].count, 0);
    }

    #[test]
    fn move_to_same_position_is_a_noop() {
        let db = setup_db();
        let project_id = setup_project(&db);
        let t1 = add_task(&db, &project_id, "t1");
        add_task(&db, &project_id, "t2");

        let moved = db.move_task(&t1.id, TaskStatus::Draft, 0).unwrap();

        assert_eq!(moved.kanban_position, 0);
        assert_gapless(&db, &project_id);
    }

    #[test]
    fn move_down_within_column_shifts_the_window() {
        let db = setup_db();
        let project_id = setup_project(&db);
        let t1 = add_task(&db, &project_id, "t1");
        let t2 = add_task(&db, &project_id, "t2");
        let t3 = add_task(&db, &project_id, "t3");

        // t1 from position 0 to position 2
        db.move_task(&t1.id, TaskStatus::Draft, 2).unwrap();

        let board = db.get_board(&project_id).unwrap();
        let draft: Vec<&str> = board.columns[0].tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(draft, vec![t2.id.as_str(), t3.id.as_str(), t1.id.as_str()]);
        assert_gapless(&db, &project_id);
    }

    #[test]
    fn move_up_within_column_shifts_the_window() {
        let db = setup_db();
        let project_id = setup_project(&db);
        let t1 = add_task(&db, &project_id, "t1");
        let t2 = add_task(&db, &project_id, "t2");
        let t3 = add_task(&db, &project_id, "t3");

        // Stage all three into IN_PROGRESS, preserving order.
        db.move_task(&t1.id, TaskStatus::InProgress, 0).unwrap();
        db.move_task(&t2.id, TaskStatus::InProgress, 1).unwrap();
        db.move_task(&t3.id, TaskStatus::InProgress, 2).unwrap();

        // t3 from position 2 to position 0: order becomes t3, t1, t2
        db.move_task(&t3.id, TaskStatus::InProgress, 0).unwrap();

        let board = db.get_board(&project_id).unwrap();
        let in_progress = &board.columns[2];
        assert_eq!(in_progress.status, TaskStatus::InProgress);
        let order: Vec<&str> = in_progress.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(order, vec![t3.id.as_str(), t1.id.as_str(), t2.id.as_str()]);
        let positions: Vec<i64> = in_progress.tasks.iter().map(|t| t.kanban_position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn move_across_columns_makes_room_and_closes_the_gap() {
        let db = setup_db();
        let project_id = setup_project(&db);
        let t1 = add_task(&db, &project_id, "t1");
        let t2 = add_task(&db, &project_id, "t2");
        db.move_task(&t2.id, TaskStatus::Planned, 0).unwrap();

        // t1 lands at PLANNED/0, t2 shifts to PLANNED/1, DRAFT empties.
        let moved = db.move_task(&t1.id, TaskStatus::Planned, 0).unwrap();

        assert_eq!(moved.status, TaskStatus::Planned);
        assert_eq!(moved.kanban_position, 0);

        let board = db.get_board(&project_id).unwrap();
        assert_eq!(board.columns[0].count, 0);
        let planned: Vec<&str> = board.columns[1].tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(planned, vec![t1.id.as_str(), t2.id.as_str()]);
        assert_gapless(&db, &project_id);
    }

    #[test]
    fn move_target_position_is_clamped_to_the_bucket() {
        let db = setup_db();
        let project_id = setup_project(&db);
        let t1 = add_task(&db, &project_id, "t1");
        add_task(&db, &project_id, "t2");

        let moved = db.move_task(&t1.id, TaskStatus::Planned, 99).unwrap();

        assert_eq!(moved.kanban_position, 0);
        assert_gapless(&db, &project_id);
    }

    #[test]
    fn move_fails_for_unknown_task() {
        let db = setup_db();

        let err = db.move_task("missing", TaskStatus::Planned, 0).unwrap_err();

        assert_eq!(error_code(&err), ErrorCode::TaskNotFound);
    }

    #[test]
    fn moves_do_not_leak_across_projects() {
        let db = setup_db();
        let project_a = setup_project(&db);
        let project_b = setup_project(&db);
        let a1 = add_task(&db, &project_a, "a1");
        add_task(&db, &project_a, "a2");
        let b1 = add_task(&db, &project_b, "b1");

        db.move_task(&a1.id, TaskStatus::Planned, 0).unwrap();

        let untouched = db.get_task(&b1.id).unwrap().unwrap();
        assert_eq!(untouched.status, TaskStatus::Draft);
        assert_eq!(untouched.kanban_position, 0);
        assert_gapless(&db, &project_a);
        assert_gapless(&db, &project_b);
    }

    #[test]
    fn reorder_column_applies_the_given_order() {
        let db = setup_db();
        let project_id = setup_project(&db);
        let t1 = add_task(&db, &project_id, "t1");
        let t2 = add_task(&db, &project_id, "t2");
        let t3 = add_task(&db, &project_id, "t3");

        db.reorder_column(
            &project_id,
            TaskStatus::Draft,
            &[t3.id.clone(), t1.id.clone(), t2.id.clone()],
        )
        .unwrap();

        let board = db.get_board(&project_id).unwrap();
        let order: Vec<&str> = board.columns[0].tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(order, vec![t3.id.as_str(), t1.id.as_str(), t2.id.as_str()]);
        assert_gapless(&db, &project_id);
    }

    #[test]
    fn reorder_rejection_mutates_nothing() {
        let db = setup_db();
        let project_id = setup_project(&db);
        let t1 = add_task(&db, &project_id, "t1");
        let t2 = add_task(&db, &project_id, "t2");

        // t2's slot handed to a foreign id: set mismatch, atomic reject.
        let err = db
            .reorder_column(
                &project_id,
                TaskStatus::Draft,
                &[t1.id.clone(), "stranger".to_string()],
            )
            .unwrap_err();

        assert_eq!(error_code(&err), ErrorCode::ValidationError);
        let board = db.get_board(&project_id).unwrap();
        let order: Vec<&str> = board.columns[0].tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(order, vec![t1.id.as_str(), t2.id.as_str()]);
    }

    #[test]
    fn reorder_rejects_wrong_cardinality() {
        let db = setup_db();
        let project_id = setup_project(&db);
        let t1 = add_task(&db, &project_id, "t1");
        add_task(&db, &project_id, "t2");

        let err = db
            .reorder_column(&project_id, TaskStatus::Draft, &[t1.id.clone()])
            .unwrap_err();

        assert_eq!(error_code(&err), ErrorCode::ValidationError);
    }

    #[test]
    fn positions_stay_gapless_through_a_mixed_sequence() {
        let db = setup_db();
        let project_id = setup_project(&db);
        let tasks: Vec<Task> = (0..6)
            .map(|i| add_task(&db, &project_id, &format!("task {}", i)))
            .collect();

        db.move_task(&tasks[0].id, TaskStatus::Planned, 0).unwrap();
        db.move_task(&tasks[3].id, TaskStatus::Planned, 0).unwrap();
        db.move_task(&tasks[1].id, TaskStatus::InProgress, 5).unwrap();
        db.move_task(&tasks[3].id, TaskStatus::Completed, 0).unwrap();
        db.move_task(&tasks[4].id, TaskStatus::Draft, 0).unwrap();
        db.move_task(&tasks[0].id, TaskStatus::Planned, 0).unwrap();

        assert_gapless(&db, &project_id);
    }
}

mod gantt_tests {
    use super::*;

    #[test]
    fn gantt_builds_a_forest_from_parent_links() {
        let db = setup_db();
        let project_id = setup_project(&db);
        let root = add_task(&db, &project_id, "epic");
        let child = db
            .create_task(&project_id, "story", None, Some(&root.id), None, None)
            .unwrap();
        db.create_task(&project_id, "subtask", None, Some(&child.id), None, None)
            .unwrap();
        add_task(&db, &project_id, "loose end");

        let forest = db.get_gantt(&project_id).unwrap();

        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].task.id, root.id);
        assert_eq!(forest[0].children.len(), 1);
        assert_eq!(forest[0].children[0].children.len(), 1);
        assert!(forest[1].children.is_empty());
    }

    #[test]
    fn gantt_fails_for_unknown_project() {
        let db = setup_db();

        let err = db.get_gantt("missing").unwrap_err();

        assert_eq!(error_code(&err), ErrorCode::ProjectNotFound);
    }
}

mod graph_tests {
    use super::*;

    #[test]
    fn add_dependency_returns_the_created_edge() {
        let db = setup_db();
        let project_id = setup_project(&db);
        let a = add_task(&db, &project_id, "a");
        let b = add_task(&db, &project_id, "b");

        let edge = db
            .add_dependency(&a.id, &b.id, DependencyType::Ss, 30)
            .unwrap();

        assert_eq!(edge.task_id, a.id);
        assert_eq!(edge.depends_on_task_id, b.id);
        assert_eq!(edge.dep_type, DependencyType::Ss);
        assert_eq!(edge.lag_minutes, 30);
    }

    #[test]
    fn direct_cycle_is_rejected() {
        let db = setup_db();
        let project_id = setup_project(&db);
        let a = add_task(&db, &project_id, "a");
        let b = add_task(&db, &project_id, "b");

        db.add_dependency(&a.id, &b.id, DependencyType::Fs, 0)
            .unwrap();
        let err = db
            .add_dependency(&b.id, &a.id, DependencyType::Fs, 0)
            .unwrap_err();

        assert_eq!(error_code(&err), ErrorCode::TaskDependencyCycle);
    }

    #[test]
    fn transitive_cycle_is_rejected() {
        let db = setup_db();
        let project_id = setup_project(&db);
        let a = add_task(&db, &project_id, "a");
        let b = add_task(&db, &project_id, "b");
        let c = add_task(&db, &project_id, "c");

        db.add_dependency(&b.id, &a.id, DependencyType::Fs, 0)
            .unwrap();
        db.add_dependency(&c.id, &b.id, DependencyType::Fs, 0)
            .unwrap();
        let err = db
            .add_dependency(&a.id, &c.id, DependencyType::Fs, 0)
            .unwrap_err();

        assert_eq!(error_code(&err), ErrorCode::TaskDependencyCycle);
        // The rejected edge left the graph untouched.
        assert_eq!(db.list_dependencies(&a.id).unwrap().len(), 0);
    }

    #[test]
    fn self_dependency_is_rejected() {
        let db = setup_db();
        let project_id = setup_project(&db);
        let a = add_task(&db, &project_id, "a");

        let err = db
            .add_dependency(&a.id, &a.id, DependencyType::Fs, 0)
            .unwrap_err();

        assert_eq!(error_code(&err), ErrorCode::TaskDependencyCycle);
    }

    #[test]
    fn duplicate_edge_is_a_conflict() {
        let db = setup_db();
        let project_id = setup_project(&db);
        let a = add_task(&db, &project_id, "a");
        let b = add_task(&db, &project_id, "b");

        db.add_dependency(&a.id, &b.id, DependencyType::Fs, 0)
            .unwrap();
        let err = db
            .add_dependency(&a.id, &b.id, DependencyType::Ss, 0)
            .unwrap_err();

        assert_eq!(error_code(&err), ErrorCode::ResourceConflict);
    }

    #[test]
    fn dependency_on_missing_task_is_rejected() {
        let db = setup_db();
        let project_id = setup_project(&db);
        let a = add_task(&db, &project_id, "a");

        let err = db
            .add_dependency(&a.id, "missing", DependencyType::Fs, 0)
            .unwrap_err();

        assert_eq!(error_code(&err), ErrorCode::TaskNotFound);
    }

    #[test]
    fn removing_an_edge_allows_the_reverse_edge() {
        let db = setup_db();
        let project_id = setup_project(&db);
        let a = add_task(&db, &project_id, "a");
        let b = add_task(&db, &project_id, "b");

        let edge = db
            .add_dependency(&a.id, &b.id, DependencyType::Fs, 0)
            .unwrap();
        db.remove_dependency(&edge.id).unwrap();

        db.add_dependency(&b.id, &a.id, DependencyType::Fs, 0)
            .unwrap();
    }

    #[test]
    fn remove_unknown_dependency_is_not_found() {
        let db = setup_db();

        let err = db.remove_dependency("missing").unwrap_err();

        assert_eq!(error_code(&err), ErrorCode::DependencyNotFound);
    }

    #[test]
    fn list_dependencies_returns_creation_order_with_display_attributes() {
        let db = setup_db();
        let project_id = setup_project(&db);
        let a = add_task(&db, &project_id, "a");
        let b = add_task(&db, &project_id, "blocker one");
        let c = add_task(&db, &project_id, "blocker two");

        db.add_dependency(&a.id, &b.id, DependencyType::Fs, 0)
            .unwrap();
        db.add_dependency(&a.id, &c.id, DependencyType::Ff, 15)
            .unwrap();

        let deps = db.list_dependencies(&a.id).unwrap();

        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].depends_on_title, "blocker one");
        assert_eq!(deps[0].depends_on_status, TaskStatus::Draft);
        assert_eq!(deps[1].depends_on_title, "blocker two");
        assert_eq!(deps[1].dependency.lag_minutes, 15);
    }

    #[test]
    fn list_dependencies_fails_for_unknown_task() {
        let db = setup_db();

        let err = db.list_dependencies("missing").unwrap_err();

        assert_eq!(error_code(&err), ErrorCode::TaskNotFound);
    }
}

mod lifecycle_tests {
    use super::*;

    #[test]
    fn entering_in_progress_sets_actual_start_once() {
        let db = setup_db();
        let project_id = setup_project(&db);
        let task = add_task(&db, &project_id, "task");

        let first = db.move_task(&task.id, TaskStatus::InProgress, 0).unwrap();
        let started = first.actual_start.expect("actual_start should be set");

        // Leave and re-enter; the original timestamp must survive.
        db.move_task(&task.id, TaskStatus::OnHold, 0).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = db.move_task(&task.id, TaskStatus::InProgress, 0).unwrap();

        assert_eq!(second.actual_start, Some(started));
    }

    #[test]
    fn completing_sets_actual_end_and_progress() {
        let db = setup_db();
        let project_id = setup_project(&db);
        let task = add_task(&db, &project_id, "task");

        let done = db.move_task(&task.id, TaskStatus::Completed, 0).unwrap();

        assert!(done.actual_end.is_some());
        assert_eq!(done.progress_pct, 100);
    }

    #[test]
    fn completed_to_draft_is_permitted_and_keeps_timestamps() {
        let db = setup_db();
        let project_id = setup_project(&db);
        let task = add_task(&db, &project_id, "task");

        let done = db.move_task(&task.id, TaskStatus::Completed, 0).unwrap();
        let reopened = db.move_task(&task.id, TaskStatus::Draft, 0).unwrap();

        assert_eq!(reopened.status, TaskStatus::Draft);
        assert_eq!(reopened.actual_end, done.actual_end);
    }

    #[test]
    fn other_transitions_have_no_side_effects() {
        let db = setup_db();
        let project_id = setup_project(&db);
        let task = add_task(&db, &project_id, "task");

        let moved = db.move_task(&task.id, TaskStatus::Blocked, 0).unwrap();

        assert_eq!(moved.actual_start, None);
        assert_eq!(moved.actual_end, None);
        assert_eq!(moved.progress_pct, 0);
    }
}

mod persistence_tests {
    use super::*;

    #[test]
    fn data_survives_a_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taskboard.db");

        let project_id = {
            let db = Database::open(&path).unwrap();
            let project_id = setup_project(&db);
            add_task(&db, &project_id, "persisted");
            project_id
        };

        let db = Database::open(&path).unwrap();
        let board = db.get_board(&project_id).unwrap();
        assert_eq!(board.columns[0].count, 1);
        assert_eq!(board.columns[0].tasks[0].title, "persisted");
    }
}
