//! Side effects applied when a task changes status.

use crate::types::{Task, TaskStatus};

/// Field changes produced by a status transition. `None` means unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusEffects {
    pub actual_start: Option<i64>,
    pub actual_end: Option<i64>,
    pub progress_pct: Option<i64>,
}

/// Compute the timestamp/progress effects of moving `task` to `new_status`.
///
/// Entering IN_PROGRESS stamps `actual_start` once; entering COMPLETED
/// stamps `actual_end` once and sets progress to 100. Already-set
/// timestamps are never overwritten, so repeated moves are idempotent.
/// No other transition has effects, and no transition is forbidden.
pub fn status_change_effects(task: &Task, new_status: TaskStatus, now: i64) -> StatusEffects {
    let mut effects = StatusEffects::default();

    match new_status {
        TaskStatus::InProgress if task.actual_start.is_none() => {
            effects.actual_start = Some(now);
        }
        TaskStatus::Completed if task.actual_end.is_none() => {
            effects.actual_end = Some(now);
            effects.progress_pct = Some(100);
        }
        _ => {}
    }

    effects
}
