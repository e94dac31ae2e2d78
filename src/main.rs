mod config;
mod error;
mod logging;
mod packer;
mod readiness;
mod report;
mod sim;
mod split;
mod types;

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};

use crate::config::AppConfig;
use crate::packer::{FitPolicy, PackOrder, pack, pending_only};
use crate::readiness::SessionMode;
use crate::report::PackReport;
use crate::sim::BenchParams;
use crate::types::Task;

#[derive(Parser, Debug)]
#[command(name = "roundpack", version, about = "Pack brain-dumped tasks into work rounds")]
struct Cli {
    /// TOML config file (defaults to ./roundpack.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pack tasks into rounds and report session readiness
    Pack(PackArgs),
    /// Split one large task into round-sized steps (prints JSON tasks)
    Split(SplitArgs),
    /// Benchmark packing throughput on generated task sets
    Bench(BenchArgs),
    /// Sweep worker and task-set sizes
    Stress(StressArgs),
}

#[derive(Args, Debug)]
struct PackArgs {
    /// JSON array of tasks; "-" reads stdin
    #[arg(long)]
    file: Option<String>,

    /// Inline task as "title:minutes"; repeatable
    #[arg(long = "task", value_name = "TITLE:MINUTES")]
    tasks: Vec<String>,

    #[arg(long)]
    rounds: Option<usize>,

    #[arg(long)]
    capacity: Option<u32>,

    #[arg(long)]
    policy: Option<FitPolicy>,

    #[arg(long)]
    order: Option<PackOrder>,

    /// Single-round quick battle instead of a full tournament
    #[arg(long)]
    quick: bool,

    /// Leave completed tasks out of the packing
    #[arg(long)]
    skip_completed: bool,

    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct SplitArgs {
    #[arg(long)]
    title: String,

    #[arg(long)]
    minutes: u32,

    /// Step description; repeat once per step
    #[arg(long = "step", required = true)]
    steps: Vec<String>,
}

#[derive(Args, Debug)]
struct BenchArgs {
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Task sets packed by each worker
    #[arg(long, default_value_t = 250)]
    sets: usize,

    /// Tasks per generated set
    #[arg(long, default_value_t = 12)]
    tasks: usize,

    #[arg(long, default_value_t = 0x5eed)]
    seed: u64,

    /// Check totality and conservation of every result
    #[arg(long)]
    validate: bool,
}

#[derive(Args, Debug)]
struct StressArgs {
    /// Comma-separated worker counts, e.g. 1,2,4
    #[arg(long, value_delimiter = ',')]
    workers: Option<Vec<usize>>,

    /// Comma-separated tasks-per-set sizes
    #[arg(long, value_delimiter = ',')]
    tasks: Option<Vec<usize>>,

    #[arg(long, default_value_t = 100)]
    sets: usize,

    #[arg(long, default_value_t = 0x5eed)]
    seed: u64,

    #[arg(long)]
    validate: bool,
}

/// Parse "title:minutes"; the last colon separates the estimate.
fn parse_task_arg(arg: &str, position: usize) -> anyhow::Result<Task> {
    let Some((title, minutes)) = arg.rsplit_once(':') else {
        bail!("task must look like TITLE:MINUTES, got {arg:?}");
    };
    let title = title.trim();
    if title.is_empty() {
        bail!("task title is empty in {arg:?}");
    }
    let minutes = minutes
        .trim()
        .parse::<u32>()
        .with_context(|| format!("invalid minutes in {arg:?}"))?;
    Ok(Task::new(format!("task-{position}"), title, minutes))
}

fn read_task_file(source: &str) -> anyhow::Result<Vec<Task>> {
    let raw = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading tasks from stdin")?;
        buf
    } else {
        std::fs::read_to_string(source).with_context(|| format!("reading {source}"))?
    };
    serde_json::from_str(&raw).with_context(|| format!("parsing tasks from {source}"))
}

fn run_pack(args: PackArgs, cfg: &AppConfig) -> anyhow::Result<()> {
    let mut tasks = match args.file.as_deref() {
        Some(source) => read_task_file(source)?,
        None => Vec::new(),
    };
    let offset = tasks.len();
    for (i, raw) in args.tasks.iter().enumerate() {
        tasks.push(parse_task_arg(raw, offset + i + 1)?);
    }
    if args.skip_completed {
        tasks = pending_only(&tasks);
    }

    let mode = if args.quick {
        SessionMode::QuickBattle
    } else {
        SessionMode::Tournament
    };
    let mut config = cfg.pack_config();
    config.round_count = mode.round_count(args.rounds.unwrap_or(config.round_count));
    if let Some(capacity) = args.capacity {
        config.capacity_minutes = capacity;
    }
    if let Some(policy) = args.policy {
        config.policy = policy;
    }
    if let Some(order) = args.order {
        config.order = order;
    }
    let gate = if args.quick {
        mode.gate()
    } else {
        cfg.readiness_gate()
    };

    let rounds = pack(&tasks, &config)?;
    let report = PackReport::new(&tasks, &rounds, &gate);
    if args.json {
        println!("{}", report.json()?);
    } else {
        println!("{}", report.text());
    }
    Ok(())
}

fn run_split(args: SplitArgs, cfg: &AppConfig) -> anyhow::Result<()> {
    let parts = split::split_task(&args.title, args.minutes, &args.steps, &cfg.pack_config())?;
    println!("{}", serde_json::to_string_pretty(&parts)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    logging::init(&cfg.log.level);

    match cli.command {
        Some(Command::Pack(args)) => run_pack(args, &cfg),
        Some(Command::Split(args)) => run_split(args, &cfg),
        Some(Command::Bench(args)) => sim::run_benchmark(
            BenchParams {
                workers: args.workers,
                sets_per_worker: args.sets,
                tasks_per_set: args.tasks,
                seed: args.seed,
                validate: args.validate,
            },
            &cfg,
        ),
        Some(Command::Stress(args)) => sim::run_stress(
            args.workers,
            args.tasks,
            BenchParams {
                sets_per_worker: args.sets,
                seed: args.seed,
                validate: args.validate,
                ..BenchParams::default()
            },
            &cfg,
        ),
        None => sim::run_demo(&cfg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_inline_task() {
        let task = parse_task_arg("Reply to Sam: urgent:15", 3).expect("parse");
        assert_eq!(task.id, "task-3");
        assert_eq!(task.title, "Reply to Sam: urgent");
        assert_eq!(task.estimated_minutes, 15);
    }

    #[test]
    fn rejects_malformed_inline_task() {
        assert!(parse_task_arg("no minutes", 1).is_err());
        assert!(parse_task_arg(":10", 1).is_err());
        assert!(parse_task_arg("thing:ten", 1).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
