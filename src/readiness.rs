//! Aggregate readiness gate consumed by whatever starts a session.

use serde::Serialize;

use crate::types::{Round, Task};

/// Percent thresholds of the session's total capacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadinessGate {
    pub start_percent: u32,
    pub full_percent: u32,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        SessionMode::Tournament.gate()
    }
}

/// Session shapes offered to the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionMode {
    /// Several rounds; startable at three quarters of capacity.
    Tournament,
    /// One round; startable at 20 of 25 minutes, ideal from 23.
    QuickBattle,
}

impl SessionMode {
    pub fn gate(self) -> ReadinessGate {
        match self {
            SessionMode::Tournament => ReadinessGate {
                start_percent: 75,
                full_percent: 100,
            },
            SessionMode::QuickBattle => ReadinessGate {
                start_percent: 80,
                full_percent: 92,
            },
        }
    }

    pub fn round_count(self, tournament_rounds: usize) -> usize {
        match self {
            SessionMode::Tournament => tournament_rounds,
            SessionMode::QuickBattle => 1,
        }
    }
}

/// Ceiling of `percent`% of `target`, in whole minutes.
fn threshold(percent: u32, target: u64) -> u64 {
    (u64::from(percent) * target).div_ceil(100)
}

/// Snapshot of how close the packed rounds are to a playable session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Readiness {
    pub total_minutes: u64,
    pub target_minutes: u64,
    pub startable: bool,
    pub full: bool,
    pub over_limit: bool,
    pub minutes_to_start: u64,
}

impl ReadinessGate {
    /// Evaluate packed rounds against this gate.
    pub fn evaluate(&self, rounds: &[Round<'_>]) -> Readiness {
        let total: u64 = rounds.iter().map(Round::total_minutes).sum();
        let target: u64 = rounds.iter().map(|r| u64::from(r.capacity_minutes)).sum();
        self.evaluate_totals(total, target)
    }

    pub fn evaluate_totals(&self, total_minutes: u64, target_minutes: u64) -> Readiness {
        let start_at = threshold(self.start_percent, target_minutes);
        let full_at = threshold(self.full_percent, target_minutes);
        Readiness {
            total_minutes,
            target_minutes,
            startable: total_minutes >= start_at,
            full: total_minutes >= full_at,
            over_limit: total_minutes > target_minutes,
            minutes_to_start: start_at.saturating_sub(total_minutes),
        }
    }
}

impl Readiness {
    /// One-line status for the session screen.
    pub fn headline(&self) -> String {
        if self.total_minutes == 0 {
            "ADD TASKS TO BEGIN".to_string()
        } else if self.over_limit {
            "OVER LIMIT!".to_string()
        } else if !self.startable {
            format!("NEED {}MIN MORE", self.minutes_to_start)
        } else {
            "BATTLE READY!".to_string()
        }
    }
}

pub fn completed_count(tasks: &[Task]) -> usize {
    tasks.iter().filter(|task| task.completed).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packer::{PackConfig, pack};

    #[test]
    fn tournament_thresholds() {
        let gate = ReadinessGate::default();
        let at_75 = gate.evaluate_totals(75, 100);
        assert!(at_75.startable);
        assert!(!at_75.full);
        let at_100 = gate.evaluate_totals(100, 100);
        assert!(at_100.startable);
        assert!(at_100.full);
        let at_74 = gate.evaluate_totals(74, 100);
        assert!(!at_74.startable);
        assert_eq!(at_74.minutes_to_start, 1);
    }

    #[test]
    fn evaluates_packed_rounds() {
        let tasks = vec![
            Task::new("a", "draft", 25),
            Task::new("b", "review", 25),
            Task::new("c", "email", 25),
        ];
        let rounds = pack(&tasks, &PackConfig::default()).expect("pack");
        let readiness = ReadinessGate::default().evaluate(&rounds);
        assert_eq!(readiness.total_minutes, 75);
        assert_eq!(readiness.target_minutes, 100);
        assert!(readiness.startable);
        assert!(!readiness.full);
        assert_eq!(readiness.headline(), "BATTLE READY!");
    }

    #[test]
    fn quick_battle_thresholds() {
        let gate = SessionMode::QuickBattle.gate();
        assert!(!gate.evaluate_totals(19, 25).startable);
        assert!(gate.evaluate_totals(20, 25).startable);
        assert!(!gate.evaluate_totals(22, 25).full);
        assert!(gate.evaluate_totals(23, 25).full);
        assert_eq!(SessionMode::QuickBattle.round_count(4), 1);
    }

    #[test]
    fn headlines() {
        let gate = SessionMode::QuickBattle.gate();
        assert_eq!(gate.evaluate_totals(0, 25).headline(), "ADD TASKS TO BEGIN");
        assert_eq!(gate.evaluate_totals(15, 25).headline(), "NEED 5MIN MORE");
        assert_eq!(gate.evaluate_totals(30, 25).headline(), "OVER LIMIT!");
        assert_eq!(gate.evaluate_totals(25, 25).headline(), "BATTLE READY!");
    }

    #[test]
    fn counts_completed() {
        let tasks = vec![
            Task::new("a", "one", 5).done(),
            Task::new("b", "two", 5),
            Task::new("c", "three", 5).done(),
        ];
        assert_eq!(completed_count(&tasks), 2);
    }
}
