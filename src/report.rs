//! Text and JSON rendering of packed rounds for the CLI.

use serde::Serialize;

use crate::readiness::{Readiness, ReadinessGate, completed_count};
use crate::types::{Round, RoundIndex, RoundStatus, RoundSummary, Task};

/// Everything a caller needs to render one packing result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PackReport {
    pub rounds: Vec<RoundSummary>,
    pub readiness: Readiness,
    pub tasks_total: usize,
    pub tasks_completed: usize,
}

impl PackReport {
    pub fn new(tasks: &[Task], rounds: &[Round<'_>], gate: &ReadinessGate) -> Self {
        Self {
            rounds: rounds.iter().map(Round::summary).collect(),
            readiness: gate.evaluate(rounds),
            tasks_total: tasks.len(),
            tasks_completed: completed_count(tasks),
        }
    }

    /// Indexes of rounds over capacity.
    pub fn overfilled(&self) -> Vec<RoundIndex> {
        self.rounds
            .iter()
            .filter(|round| round.status == RoundStatus::Overfilled)
            .map(|round| round.index)
            .collect()
    }

    pub fn round_lines(&self) -> Vec<String> {
        self.rounds.iter().map(round_line).collect()
    }

    pub fn text(&self) -> String {
        let mut out = self.round_lines();
        out.push(format!("overfilled_rounds={:?}", self.overfilled()));
        out.push(format!(
            "total_minutes={}/{}",
            self.readiness.total_minutes, self.readiness.target_minutes
        ));
        out.push(format!(
            "tasks_completed={}/{}",
            self.tasks_completed, self.tasks_total
        ));
        out.push(format!("startable={}", self.readiness.startable));
        out.push(format!("full={}", self.readiness.full));
        out.push(format!("headline={}", self.readiness.headline()));
        out.join("\n")
    }

    pub fn json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

pub fn round_line(round: &RoundSummary) -> String {
    format!(
        "round={} total={}/{} status={} tasks=[{}]",
        round.index,
        round.total_minutes,
        round.capacity_minutes,
        round.status,
        round.task_ids.join(",")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packer::{PackConfig, pack};

    #[test]
    fn text_report_lists_every_round() {
        let tasks = vec![
            Task::new("essay", "Essay", 40),
            Task::new("dishes", "Dishes", 10).done(),
        ];
        let rounds = pack(&tasks, &PackConfig::default()).expect("pack");
        let report = PackReport::new(&tasks, &rounds, &ReadinessGate::default());
        let text = report.text();
        assert!(text.contains("round=1 total=40/25 status=overfilled tasks=[essay]"));
        assert!(text.contains("round=2 total=10/25 status=optimal tasks=[dishes]"));
        assert!(text.contains("round=4 total=0/25 status=empty tasks=[]"));
        assert!(text.contains("overfilled_rounds=[1]"));
        assert!(text.contains("tasks_completed=1/2"));
        assert!(text.contains("headline=NEED 25MIN MORE"));
    }

    #[test]
    fn json_report_round_trips_fields() {
        let tasks = vec![Task::new("a", "A", 25)];
        let rounds = pack(&tasks, &PackConfig::new(1, 25)).expect("pack");
        let report = PackReport::new(&tasks, &rounds, &ReadinessGate::default());
        let value: serde_json::Value =
            serde_json::from_str(&report.json().expect("json")).expect("parse");
        assert_eq!(value["rounds"][0]["status"], "optimal");
        assert_eq!(value["readiness"]["full"], true);
        assert_eq!(value["tasks_total"], 1);
    }
}
