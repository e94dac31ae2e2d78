//! Demo, benchmark, and stress-test runners for the round packer.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

use anyhow::bail;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::packer::{Assignment, PackConfig, pack, repack};
use crate::readiness::ReadinessGate;
use crate::report::PackReport;
use crate::split::split_task;
use crate::types::{Round, Task};

// Estimates above the default capacity so benches exercise the overflow path.
const BENCH_MAX_MINUTES: u32 = 40;
const BENCH_DEFAULT_SEED: u64 = 0x5eed;

/// Best-effort CPU user/system time snapshot (seconds) on Unix platforms.
#[cfg(unix)]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    let mut usage = std::mem::MaybeUninit::<libc::rusage>::zeroed();
    let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) };
    if rc != 0 {
        return None;
    }
    let usage = unsafe { usage.assume_init() };
    let user = usage.ru_utime.tv_sec as f64 + (usage.ru_utime.tv_usec as f64 / 1_000_000.0);
    let sys = usage.ru_stime.tv_sec as f64 + (usage.ru_stime.tv_usec as f64 / 1_000_000.0);
    Some((user, sys))
}

/// Stub on non-Unix platforms.
#[cfg(not(unix))]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    None
}

fn demo_tasks() -> Vec<Task> {
    vec![
        Task::new("thesis", "Write thesis chapter", 50),
        Task::new("review", "Code review", 15),
        Task::new("inbox", "Clear inbox", 10),
        Task::new("standup", "Prep standup notes", 10),
        Task::new("expenses", "File expenses", 5),
        Task::new("gym", "Book gym slot", 5),
    ]
}

/// Run the default demo: pack, split the oversized task, then repack after progress.
pub fn run_demo(cfg: &AppConfig) -> anyhow::Result<()> {
    let config = cfg.pack_config();
    let gate = cfg.readiness_gate();
    info!(rounds = config.round_count, capacity = config.capacity_minutes, "demo start");

    let tasks = demo_tasks();
    let rounds = pack(&tasks, &config)?;
    let first = PackReport::new(&tasks, &rounds, &gate);

    println!("DEMO SUMMARY");
    println!(
        "tasks_total={} minutes_total={} policy={:?}",
        tasks.len(),
        tasks.iter().map(|t| u64::from(t.estimated_minutes)).sum::<u64>(),
        config.policy
    );
    for line in first.round_lines() {
        println!("{line}");
    }
    println!("overfilled_rounds={:?}", first.overfilled());

    // Replace every task longer than a round with round-sized steps. A task
    // the session cannot hold at all stays whole and overflows.
    let mut next = Vec::with_capacity(tasks.len());
    for task in &tasks {
        if task.estimated_minutes <= config.capacity_minutes {
            next.push(task.clone());
            continue;
        }
        let steps_needed = task.estimated_minutes.div_ceil(config.capacity_minutes) as usize;
        let steps = vec![String::new(); steps_needed];
        match split_task(&task.title, task.estimated_minutes, &steps, &config) {
            Ok(parts) => {
                println!("split_task={} steps={}", task.id, parts.len());
                next.extend(parts);
            }
            Err(err) => {
                warn!(task = %task.id, error = %err, "split rejected, keeping task whole");
                println!("split_skipped={}", task.id);
                next.push(task.clone());
            }
        }
    }

    let split_rounds = pack(&next, &config)?;
    let second = PackReport::new(&next, &split_rounds, &gate);
    for line in second.round_lines() {
        println!("{line}");
    }
    println!("overfilled_rounds_after_split={:?}", second.overfilled());
    println!("startable={}", second.readiness.startable);
    println!("full={}", second.readiness.full);
    println!("headline={}", second.readiness.headline());

    // Finish the first task of the first round, add a late task, and repack.
    let prior = Assignment::from_rounds(&split_rounds);
    let finished = split_rounds
        .first()
        .and_then(|r| r.tasks.first())
        .map(|t| t.id.clone());
    let mut progressed: Vec<Task> = next
        .iter()
        .map(|t| {
            if Some(&t.id) == finished.as_ref() {
                t.clone().done()
            } else {
                t.clone()
            }
        })
        .collect();
    progressed.push(Task::new("call", "Call the bank", 5));
    let repacked = repack(&progressed, &config, &prior)?;
    let after = Assignment::from_rounds(&repacked);
    let pinned = finished
        .as_deref()
        .is_some_and(|id| after.round_of(id) == prior.round_of(id));
    let third = PackReport::new(&progressed, &repacked, &gate);
    println!("tasks_completed={}", third.tasks_completed);
    println!("completed_pinned={pinned}");
    println!("moved_after_repack={:?}", after.moved_since(&prior));
    Ok(())
}

fn generate_tasks(rng: &mut StdRng, count: usize, batch: usize) -> Vec<Task> {
    (0..count)
        .map(|i| {
            let minutes = rng.gen_range(1..=BENCH_MAX_MINUTES);
            Task::new(format!("bench-{batch}-{i}"), format!("bench task {i}"), minutes)
        })
        .collect()
}

/// True when every task lands in exactly one round and minutes are conserved.
fn check_packing(tasks: &[Task], rounds: &[Round<'_>], config: &PackConfig) -> (bool, bool) {
    let mut seen = HashSet::with_capacity(tasks.len());
    let mut placed = 0usize;
    for round in rounds {
        for task in &round.tasks {
            placed += 1;
            seen.insert(task.id.as_str());
        }
    }
    let lossless = rounds.len() == config.round_count
        && placed == tasks.len()
        && tasks.iter().all(|t| seen.contains(t.id.as_str()));
    let packed: u64 = rounds.iter().map(Round::total_minutes).sum();
    let expected: u64 = tasks.iter().map(|t| u64::from(t.estimated_minutes)).sum();
    (lossless, packed == expected)
}

/// Aggregated metrics from a single benchmark run.
struct BenchResult {
    workers: usize,
    sets_per_worker: usize,
    tasks_per_set: usize,
    total_sets: usize,
    elapsed_ms: f64,
    throughput: f64,
    avg_pack_us: f64,
    cpu_user_s: Option<f64>,
    cpu_sys_s: Option<f64>,
    overfilled_rounds: usize,
    startable_sets: usize,
    lost_tasks: bool,
    minutes_mismatch: bool,
}

impl BenchResult {
    const CSV_HEADER: &'static str = "workers,sets_per_worker,tasks_per_set,total_sets,elapsed_ms,throughput_sets_per_s,avg_pack_us,cpu_user_s,cpu_sys_s,overfilled_rounds,startable_sets,lost_tasks,minutes_mismatch";

    fn csv_row(&self) -> String {
        let cpu_user = self
            .cpu_user_s
            .map(|v| format!("{v:.4}"))
            .unwrap_or_else(|| "NA".to_string());
        let cpu_sys = self
            .cpu_sys_s
            .map(|v| format!("{v:.4}"))
            .unwrap_or_else(|| "NA".to_string());
        format!(
            "{},{},{},{},{:.2},{:.2},{:.2},{},{},{},{},{},{}",
            self.workers,
            self.sets_per_worker,
            self.tasks_per_set,
            self.total_sets,
            self.elapsed_ms,
            self.throughput,
            self.avg_pack_us,
            cpu_user,
            cpu_sys,
            self.overfilled_rounds,
            self.startable_sets,
            self.lost_tasks,
            self.minutes_mismatch
        )
    }

    fn report_violations(&self, validate: bool) {
        if !validate {
            return;
        }
        if self.lost_tasks {
            eprintln!("# violation,lost_or_duplicated_tasks");
        }
        if self.minutes_mismatch {
            eprintln!("# violation,minutes_not_conserved");
        }
    }
}

/// Parameters shared by bench and stress runs.
#[derive(Clone, Copy, Debug)]
pub struct BenchParams {
    pub workers: usize,
    pub sets_per_worker: usize,
    pub tasks_per_set: usize,
    pub seed: u64,
    pub validate: bool,
}

impl Default for BenchParams {
    fn default() -> Self {
        Self {
            workers: 4,
            sets_per_worker: 250,
            tasks_per_set: 12,
            seed: BENCH_DEFAULT_SEED,
            validate: false,
        }
    }
}

fn benchmark_once(params: BenchParams, config: PackConfig, gate: ReadinessGate) -> BenchResult {
    debug_assert!(params.workers > 0, "workers must be > 0");
    debug_assert!(params.sets_per_worker > 0, "sets_per_worker must be > 0");

    let pack_us = Arc::new(AtomicU64::new(0));
    let overfilled = Arc::new(AtomicUsize::new(0));
    let startable = Arc::new(AtomicUsize::new(0));
    let lost_tasks = Arc::new(AtomicBool::new(false));
    let minutes_mismatch = Arc::new(AtomicBool::new(false));

    let cpu_start = cpu_times_seconds();
    let start = Instant::now();
    let mut handles = Vec::with_capacity(params.workers);
    for worker_id in 0..params.workers {
        let pack_us = Arc::clone(&pack_us);
        let overfilled = Arc::clone(&overfilled);
        let startable = Arc::clone(&startable);
        let lost_tasks = Arc::clone(&lost_tasks);
        let minutes_mismatch = Arc::clone(&minutes_mismatch);
        let spawned = thread::Builder::new()
            .name(format!("packer-{worker_id}"))
            .spawn(move || {
                // Each worker owns its generator and inputs; only counters are shared.
                let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(worker_id as u64));
                for batch in 0..params.sets_per_worker {
                    let tasks = generate_tasks(&mut rng, params.tasks_per_set, batch);
                    let pack_start = Instant::now();
                    let rounds = match pack(&tasks, &config) {
                        Ok(rounds) => rounds,
                        Err(err) => {
                            warn!(%err, "pack rejected generated tasks");
                            lost_tasks.store(true, Ordering::SeqCst);
                            continue;
                        }
                    };
                    pack_us.fetch_add(pack_start.elapsed().as_micros() as u64, Ordering::SeqCst);
                    let over = rounds
                        .iter()
                        .filter(|r| r.total_minutes() > u64::from(r.capacity_minutes))
                        .count();
                    overfilled.fetch_add(over, Ordering::SeqCst);
                    if gate.evaluate(&rounds).startable {
                        startable.fetch_add(1, Ordering::SeqCst);
                    }
                    if params.validate {
                        let (lossless, conserved) = check_packing(&tasks, &rounds, &config);
                        if !lossless {
                            lost_tasks.store(true, Ordering::SeqCst);
                        }
                        if !conserved {
                            minutes_mismatch.store(true, Ordering::SeqCst);
                        }
                    }
                }
                debug!(worker_id, "worker finished");
            });
        match spawned {
            Ok(handle) => handles.push(handle),
            Err(err) => warn!(worker_id, %err, "failed to spawn packer thread"),
        }
    }

    let spawned_workers = handles.len();
    for handle in handles {
        if handle.join().is_err() {
            warn!("packer thread panicked");
            lost_tasks.store(true, Ordering::SeqCst);
        }
    }

    let total_sets = spawned_workers * params.sets_per_worker;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    let throughput = if elapsed_ms > 0.0 {
        total_sets as f64 / (elapsed_ms / 1000.0)
    } else {
        0.0
    };
    let avg_pack_us = if total_sets > 0 {
        pack_us.load(Ordering::SeqCst) as f64 / total_sets as f64
    } else {
        0.0
    };
    let (cpu_user_s, cpu_sys_s) = match (cpu_start, cpu_times_seconds()) {
        (Some((user_start, sys_start)), Some((user_end, sys_end))) => {
            (Some(user_end - user_start), Some(sys_end - sys_start))
        }
        _ => (None, None),
    };

    BenchResult {
        workers: params.workers,
        sets_per_worker: params.sets_per_worker,
        tasks_per_set: params.tasks_per_set,
        total_sets,
        elapsed_ms,
        throughput,
        avg_pack_us,
        cpu_user_s,
        cpu_sys_s,
        overfilled_rounds: overfilled.load(Ordering::SeqCst),
        startable_sets: startable.load(Ordering::SeqCst),
        lost_tasks: lost_tasks.load(Ordering::SeqCst),
        minutes_mismatch: minutes_mismatch.load(Ordering::SeqCst),
    }
}

/// Run a single benchmark and print one CSV row.
pub fn run_benchmark(params: BenchParams, cfg: &AppConfig) -> anyhow::Result<()> {
    if params.workers == 0 {
        bail!("benchmark error: workers must be > 0");
    }
    if params.sets_per_worker == 0 {
        bail!("benchmark error: sets must be > 0");
    }
    let config = cfg.pack_config();
    config.validate()?;
    let result = benchmark_once(params, config, cfg.readiness_gate());
    println!("{}", BenchResult::CSV_HEADER);
    println!("{}", result.csv_row());
    result.report_violations(params.validate);
    Ok(())
}

/// Sweep worker and task-set sizes, printing one CSV row per combination.
pub fn run_stress(
    worker_sets: Option<Vec<usize>>,
    task_sets: Option<Vec<usize>>,
    base: BenchParams,
    cfg: &AppConfig,
) -> anyhow::Result<()> {
    let worker_sets = worker_sets.unwrap_or_else(|| vec![1, 2, 4, 8]);
    let mut task_sets = task_sets.unwrap_or_else(|| vec![0, 4, 12, 40]);
    if worker_sets.is_empty() || worker_sets.contains(&0) {
        bail!("stress error: worker sets must be > 0");
    }
    if base.sets_per_worker == 0 {
        bail!("stress error: sets must be > 0");
    }
    task_sets.sort_unstable();
    task_sets.dedup();
    let config = cfg.pack_config();
    config.validate()?;
    let gate = cfg.readiness_gate();

    println!("{}", BenchResult::CSV_HEADER);
    for workers in worker_sets {
        for tasks_per_set in task_sets.iter().copied() {
            let params = BenchParams {
                workers,
                tasks_per_set,
                ..base
            };
            let result = benchmark_once(params, config, gate);
            println!("{}", result.csv_row());
            result.report_violations(base.validate);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tasks_are_seeded() {
        let a = generate_tasks(&mut StdRng::seed_from_u64(3), 10, 0);
        let b = generate_tasks(&mut StdRng::seed_from_u64(3), 10, 0);
        assert_eq!(a, b);
        assert!(a.iter().all(|t| (1..=BENCH_MAX_MINUTES).contains(&t.estimated_minutes)));
    }

    #[test]
    fn check_packing_detects_loss() {
        let config = PackConfig::default();
        let tasks = vec![Task::new("a", "A", 10), Task::new("b", "B", 10)];
        let rounds = pack(&tasks, &config).expect("pack");
        assert_eq!(check_packing(&tasks, &rounds, &config), (true, true));

        let mut truncated = rounds.clone();
        truncated[1].tasks.clear();
        assert_eq!(check_packing(&tasks, &truncated, &config), (false, false));
    }

    #[test]
    fn benchmark_validates_every_set() {
        let params = BenchParams {
            workers: 3,
            sets_per_worker: 20,
            tasks_per_set: 9,
            seed: 11,
            validate: true,
        };
        let result = benchmark_once(params, PackConfig::default(), ReadinessGate::default());
        assert_eq!(result.total_sets, 60);
        assert!(!result.lost_tasks);
        assert!(!result.minutes_mismatch);
    }

    #[test]
    fn csv_row_matches_header_width() {
        let params = BenchParams {
            workers: 1,
            sets_per_worker: 1,
            tasks_per_set: 0,
            seed: 1,
            validate: true,
        };
        let result = benchmark_once(params, PackConfig::default(), ReadinessGate::default());
        let header_cols = BenchResult::CSV_HEADER.split(',').count();
        assert_eq!(result.csv_row().split(',').count(), header_cols);
        assert_eq!(result.startable_sets, 0);
    }
}
