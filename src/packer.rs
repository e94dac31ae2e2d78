//! Greedy first-fit-decreasing packing of tasks into fixed-capacity rounds.
//!
//! Every call recomputes the whole round set from the task list. Nothing is
//! carried between calls except what the caller passes back in through an
//! [`Assignment`] when repacking.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::PackError;
use crate::types::{Round, RoundIndex, Task, TaskId};

pub const DEFAULT_ROUND_COUNT: usize = 4;
pub const DEFAULT_CAPACITY_MINUTES: u32 = 25;

/// How to choose among rounds that can still take a task without overflowing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitPolicy {
    /// Emptiest fitting round first; spreads load evenly.
    #[default]
    LeastLoaded,
    /// Fullest fitting round first; keeps other rounds free for large tasks.
    BestFit,
}

/// Order in which tasks are offered to the rounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackOrder {
    /// Longest estimate first; equal estimates keep their input order.
    #[default]
    LongestFirst,
    /// Input order, no re-sort. Appending a task never moves earlier placements.
    Arrival,
}

impl FromStr for FitPolicy {
    type Err = PackError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "least-loaded" | "least_loaded" | "balance" => Ok(FitPolicy::LeastLoaded),
            "best-fit" | "best_fit" | "tight" => Ok(FitPolicy::BestFit),
            other => Err(PackError::InvalidConfiguration(format!(
                "unknown fit policy: {other}"
            ))),
        }
    }
}

impl FromStr for PackOrder {
    type Err = PackError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "longest-first" | "longest_first" | "decreasing" => Ok(PackOrder::LongestFirst),
            "arrival" | "stable" => Ok(PackOrder::Arrival),
            other => Err(PackError::InvalidConfiguration(format!(
                "unknown pack order: {other}"
            ))),
        }
    }
}

/// Shape of a session and the packing strategy used to fill it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PackConfig {
    pub round_count: usize,
    pub capacity_minutes: u32,
    pub policy: FitPolicy,
    pub order: PackOrder,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ROUND_COUNT, DEFAULT_CAPACITY_MINUTES)
    }
}

impl PackConfig {
    pub fn new(round_count: usize, capacity_minutes: u32) -> Self {
        Self {
            round_count,
            capacity_minutes,
            policy: FitPolicy::default(),
            order: PackOrder::default(),
        }
    }

    pub fn with_policy(mut self, policy: FitPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_order(mut self, order: PackOrder) -> Self {
        self.order = order;
        self
    }

    /// Reject shapes where no round could ever hold work.
    pub fn validate(&self) -> Result<(), PackError> {
        if self.round_count == 0 {
            return Err(PackError::InvalidConfiguration(
                "round_count must be > 0".to_string(),
            ));
        }
        if self.capacity_minutes == 0 {
            return Err(PackError::InvalidConfiguration(
                "capacity_minutes must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Minutes available across every round of the session.
    pub fn session_minutes(&self) -> u64 {
        self.round_count as u64 * u64::from(self.capacity_minutes)
    }
}

fn validate_tasks(tasks: &[Task]) -> Result<(), PackError> {
    match tasks.iter().find(|task| task.estimated_minutes == 0) {
        Some(task) => Err(PackError::InvalidTask {
            id: task.id.clone(),
        }),
        None => Ok(()),
    }
}

fn empty_rounds<'a>(config: &PackConfig) -> Vec<Round<'a>> {
    (1..=config.round_count)
        .map(|index| Round::new(index, config.capacity_minutes))
        .collect()
}

/// Pick a round for a task of `minutes`, given the current per-round loads.
fn choose_round(loads: &[u64], minutes: u64, capacity: u64, policy: FitPolicy) -> usize {
    let fitting = loads
        .iter()
        .enumerate()
        .filter(|(_, load)| **load + minutes <= capacity);
    let chosen = match policy {
        FitPolicy::LeastLoaded => fitting.min_by_key(|(slot, load)| (**load, *slot)),
        FitPolicy::BestFit => fitting.max_by_key(|(slot, load)| (**load, Reverse(*slot))),
    };
    match chosen {
        Some((slot, _)) => slot,
        None => overflow_round(loads),
    }
}

/// Overflow target: the emptiest round, lowest index on ties.
fn overflow_round(loads: &[u64]) -> usize {
    loads
        .iter()
        .enumerate()
        .min_by_key(|(slot, load)| (**load, *slot))
        .map(|(slot, _)| slot)
        .unwrap_or(0)
}

/// Place `tasks` into `rounds`, whose current loads are mirrored in `loads`.
fn place_all<'a>(
    rounds: &mut [Round<'a>],
    loads: &mut [u64],
    mut tasks: Vec<&'a Task>,
    config: &PackConfig,
) {
    if config.order == PackOrder::LongestFirst {
        // sort_by is stable, so equal estimates keep their input order.
        tasks.sort_by(|a, b| b.estimated_minutes.cmp(&a.estimated_minutes));
    }
    let capacity = u64::from(config.capacity_minutes);
    for task in tasks {
        let minutes = u64::from(task.estimated_minutes);
        let slot = choose_round(loads, minutes, capacity, config.policy);
        loads[slot] += minutes;
        if loads[slot] > capacity {
            debug!(
                task = %task.id,
                round = rounds[slot].index,
                load = loads[slot],
                "round overfilled"
            );
        } else {
            trace!(task = %task.id, round = rounds[slot].index, load = loads[slot], "placed");
        }
        rounds[slot].tasks.push(task);
    }
}

/// Pack every task into exactly `config.round_count` rounds.
///
/// Never drops a task: when no round has room the task goes to the emptiest
/// round, which may then exceed capacity.
pub fn pack<'a>(tasks: &'a [Task], config: &PackConfig) -> Result<Vec<Round<'a>>, PackError> {
    config.validate()?;
    validate_tasks(tasks)?;
    let mut rounds = empty_rounds(config);
    let mut loads = vec![0u64; config.round_count];
    place_all(&mut rounds, &mut loads, tasks.iter().collect(), config);
    debug!(
        tasks = tasks.len(),
        rounds = config.round_count,
        policy = ?config.policy,
        order = ?config.order,
        "packed"
    );
    Ok(rounds)
}

/// Pack again, keeping completed tasks in the round they were already placed in.
///
/// Completed tasks absent from `prior` (or pinned to a round that no longer
/// exists) are packed like any other task.
pub fn repack<'a>(
    tasks: &'a [Task],
    config: &PackConfig,
    prior: &Assignment,
) -> Result<Vec<Round<'a>>, PackError> {
    config.validate()?;
    validate_tasks(tasks)?;
    let mut rounds = empty_rounds(config);
    let mut loads = vec![0u64; config.round_count];
    let mut free = Vec::with_capacity(tasks.len());
    let mut pinned = 0usize;
    for task in tasks {
        let pinned_slot = if task.completed {
            prior
                .round_of(&task.id)
                .filter(|index| (1..=config.round_count).contains(index))
                .map(|index| index - 1)
        } else {
            None
        };
        match pinned_slot {
            Some(slot) => {
                loads[slot] += u64::from(task.estimated_minutes);
                rounds[slot].tasks.push(task);
                pinned += 1;
            }
            None => free.push(task),
        }
    }
    place_all(&mut rounds, &mut loads, free, config);
    debug!(tasks = tasks.len(), pinned, "repacked");
    Ok(rounds)
}

/// Tasks not yet marked completed, in input order.
pub fn pending_only(tasks: &[Task]) -> Vec<Task> {
    tasks.iter().filter(|task| !task.completed).cloned().collect()
}

/// Owned snapshot of which round each task was placed in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Assignment {
    placements: HashMap<TaskId, RoundIndex>,
}

impl Assignment {
    pub fn from_rounds(rounds: &[Round<'_>]) -> Self {
        let placements = rounds
            .iter()
            .flat_map(|round| {
                round
                    .tasks
                    .iter()
                    .map(move |task| (task.id.clone(), round.index))
            })
            .collect();
        Self { placements }
    }

    pub fn round_of(&self, id: &str) -> Option<RoundIndex> {
        self.placements.get(id).copied()
    }

    /// Ids placed in both snapshots but in different rounds, sorted.
    pub fn moved_since(&self, earlier: &Assignment) -> Vec<TaskId> {
        let mut moved: Vec<TaskId> = self
            .placements
            .iter()
            .filter(|(id, index)| {
                earlier
                    .placements
                    .get(*id)
                    .is_some_and(|before| before != *index)
            })
            .map(|(id, _)| id.clone())
            .collect();
        moved.sort();
        moved
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.placements.len()
    }
}
