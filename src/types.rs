//! Shared identifiers and the task/round model used across the system.

use serde::{Deserialize, Serialize};

/// Unique identifier for a task, stable for the task's lifetime.
pub type TaskId = String;
/// 1-based position of a round within a session.
pub type RoundIndex = usize;

/// Unit of work brain-dumped by the user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Stable task identifier for placement tracking and validation.
    pub id: TaskId,
    /// Human-readable description for output.
    pub title: String,
    /// Expected duration; must be positive to be packable.
    pub estimated_minutes: u32,
    #[serde(default)]
    pub completed: bool,
}

impl Task {
    /// Construct a pending task.
    pub fn new(id: impl Into<TaskId>, title: impl Into<String>, estimated_minutes: u32) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            estimated_minutes,
            completed: false,
        }
    }

    /// Same task, marked completed.
    pub fn done(mut self) -> Self {
        self.completed = true;
        self
    }
}

/// Derived fill state of a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    Empty,
    Optimal,
    Overfilled,
}

impl RoundStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RoundStatus::Empty => "empty",
            RoundStatus::Optimal => "optimal",
            RoundStatus::Overfilled => "overfilled",
        }
    }
}

impl std::fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fixed-capacity time bucket holding placement references to tasks.
///
/// The round never owns task data, and its total is always computed from the
/// referenced tasks so it cannot go stale.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Round<'a> {
    pub index: RoundIndex,
    pub capacity_minutes: u32,
    pub tasks: Vec<&'a Task>,
}

impl<'a> Round<'a> {
    pub fn new(index: RoundIndex, capacity_minutes: u32) -> Self {
        Self {
            index,
            capacity_minutes,
            tasks: Vec::new(),
        }
    }

    /// Sum of the assigned tasks' estimates.
    pub fn total_minutes(&self) -> u64 {
        self.tasks
            .iter()
            .map(|task| u64::from(task.estimated_minutes))
            .sum()
    }

    pub fn status(&self) -> RoundStatus {
        let total = self.total_minutes();
        if total == 0 {
            RoundStatus::Empty
        } else if total <= u64::from(self.capacity_minutes) {
            RoundStatus::Optimal
        } else {
            RoundStatus::Overfilled
        }
    }

    /// Minutes left before the round reaches capacity (0 once full or over).
    pub fn remaining_minutes(&self) -> u32 {
        let left = u64::from(self.capacity_minutes).saturating_sub(self.total_minutes());
        u32::try_from(left).unwrap_or(0)
    }

    /// Fill level for progress bars, clamped to 100.
    pub fn fill_percent(&self) -> u32 {
        if self.capacity_minutes == 0 {
            return 0;
        }
        let percent = self.total_minutes().saturating_mul(100) / u64::from(self.capacity_minutes);
        percent.min(100) as u32
    }

    pub fn is_full(&self) -> bool {
        self.total_minutes() == u64::from(self.capacity_minutes)
    }

    /// Owned, serializable snapshot of this round.
    pub fn summary(&self) -> RoundSummary {
        RoundSummary {
            index: self.index,
            capacity_minutes: self.capacity_minutes,
            total_minutes: self.total_minutes(),
            status: self.status(),
            remaining_minutes: self.remaining_minutes(),
            fill_percent: self.fill_percent(),
            full: self.is_full(),
            task_ids: self.tasks.iter().map(|task| task.id.clone()).collect(),
        }
    }
}

/// Report form of a round, used for JSON output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RoundSummary {
    pub index: RoundIndex,
    pub capacity_minutes: u32,
    pub total_minutes: u64,
    pub status: RoundStatus,
    pub remaining_minutes: u32,
    pub fill_percent: u32,
    pub full: bool,
    pub task_ids: Vec<TaskId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_total() {
        let small = Task::new("a", "small", 10);
        let fill = Task::new("b", "fill", 15);
        let extra = Task::new("c", "extra", 1);

        let mut round = Round::new(1, 25);
        assert_eq!(round.status(), RoundStatus::Empty);
        round.tasks.push(&small);
        assert_eq!(round.status(), RoundStatus::Optimal);
        round.tasks.push(&fill);
        assert_eq!(round.status(), RoundStatus::Optimal);
        assert!(round.is_full());
        round.tasks.push(&extra);
        assert_eq!(round.status(), RoundStatus::Overfilled);
        assert_eq!(round.total_minutes(), 26);
    }

    #[test]
    fn derived_views_saturate() {
        let big = Task::new("big", "huge", 60);
        let mut round = Round::new(2, 25);
        assert_eq!(round.remaining_minutes(), 25);
        assert_eq!(round.fill_percent(), 0);
        round.tasks.push(&big);
        assert_eq!(round.remaining_minutes(), 0);
        assert_eq!(round.fill_percent(), 100);
    }

    #[test]
    fn huge_estimates_overfill_without_wrapping() {
        let huge = Task::new("a", "huge", u32::MAX);
        let one = Task::new("b", "one", 1);
        let mut round = Round::new(1, 25);
        round.tasks.push(&huge);
        round.tasks.push(&one);
        assert_eq!(round.total_minutes(), u64::from(u32::MAX) + 1);
        assert_eq!(round.status(), RoundStatus::Overfilled);
        assert_eq!(round.remaining_minutes(), 0);
        assert_eq!(round.fill_percent(), 100);
        assert!(!round.is_full());
    }

    #[test]
    fn task_json_defaults_completed() {
        let task: Task =
            serde_json::from_str(r#"{"id":"t1","title":"write","estimated_minutes":15}"#)
                .expect("parse task");
        assert_eq!(task, Task::new("t1", "write", 15));
    }

    #[test]
    fn summary_lists_ids_in_order() {
        let a = Task::new("a", "first", 5);
        let b = Task::new("b", "second", 5);
        let mut round = Round::new(3, 25);
        round.tasks.push(&b);
        round.tasks.push(&a);
        let summary = round.summary();
        assert_eq!(summary.task_ids, vec!["b".to_string(), "a".to_string()]);
        assert_eq!(summary.total_minutes, 10);
        assert_eq!(summary.status, RoundStatus::Optimal);
    }
}
