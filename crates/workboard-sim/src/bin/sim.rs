#![forbid(unsafe_code)]

use std::env;

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};
use workboard_core::CyclePolicy;
use workboard_sim::campaign::{CampaignConfig, replay_seed, run_campaign};

#[derive(Parser, Debug)]
#[command(
    name = "wb-sim",
    version,
    about = "Deterministic simulation for work board link invariants",
    long_about = "Drive work boards through seeded random operation sequences \
                  and check link symmetry, orphan-on-delete and clean rejection \
                  after every step."
)]
struct Cli {
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputMode::Text, global = true)]
    format: OutputMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a simulation campaign across many seeds.
    #[command(after_help = "EXAMPLES:\n    \
        wb-sim run --seeds 500 --ops 300\n    \
        wb-sim run --cycles reject --format json")]
    Run(RunArgs),

    /// Replay a single seed and print its trace.
    #[command(after_help = "EXAMPLES:\n    \
        wb-sim replay --seed 42\n    \
        wb-sim replay --seed 42 --format json")]
    Replay(ReplayArgs),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputMode {
    Text,
    Json,
}

/// Board parameters shared by `run` and `replay`.
#[derive(Args, Debug)]
struct BoardArgs {
    /// Operations applied per seed.
    #[arg(long, default_value = "200")]
    ops: usize,

    /// Board item capacity.
    #[arg(long, default_value = "48")]
    max_items: usize,

    /// Per-parent child capacity.
    #[arg(long, default_value = "4")]
    max_children: usize,

    /// Cycle policy: allow, warn or reject.
    #[arg(long, default_value = "warn")]
    cycles: CyclePolicy,

    /// Percent of id slots filled with ids that never existed.
    #[arg(long, default_value = "10")]
    stale_percent: u8,

    /// Percent of titles that are blank or oversized.
    #[arg(long, default_value = "5")]
    invalid_percent: u8,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// First seed to run.
    #[arg(long, default_value = "0")]
    seed_start: u64,

    /// Number of seeds to run.
    #[arg(long, default_value = "100")]
    seeds: u64,

    #[command(flatten)]
    board: BoardArgs,
}

#[derive(Args, Debug)]
struct ReplayArgs {
    /// Seed to replay.
    #[arg(long)]
    seed: u64,

    #[command(flatten)]
    board: BoardArgs,
}

/// JSON output for `wb-sim replay`.
#[derive(Debug, Serialize)]
struct ReplayOutput<'a> {
    seed: u64,
    applied: usize,
    rejected: usize,
    final_items: usize,
    final_links: usize,
    oracle_passed: bool,
    violations: Vec<String>,
    trace: &'a [workboard_sim::TraceEntry],
}

fn build_campaign_config(seed_start: u64, seeds: u64, board: &BoardArgs) -> CampaignConfig {
    CampaignConfig {
        seed_range: seed_start..seed_start.saturating_add(seeds),
        ops_per_seed: board.ops,
        max_work_items: board.max_items,
        max_children: board.max_children,
        cycles: board.cycles,
        stale_id_percent: board.stale_percent,
        invalid_input_percent: board.invalid_percent,
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => run(&args, cli.format),
        Command::Replay(args) => replay(&args, cli.format),
    }
}

fn run(args: &RunArgs, output: OutputMode) -> Result<()> {
    let config = build_campaign_config(args.seed_start, args.seeds, &args.board);
    let report = run_campaign(&config)?;

    match output {
        OutputMode::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputMode::Text => {
            println!(
                "campaign seeds_run={} ops_per_seed={} max_items={} max_children={}",
                report.seeds_run, args.board.ops, args.board.max_items, args.board.max_children
            );
            println!(
                "results passed={} failed={} ops_applied={} ops_rejected={}",
                report.seeds_passed,
                report.failures.len(),
                report.ops_applied,
                report.ops_rejected
            );
            for failure in report.failures.iter().take(5) {
                println!("failure seed={} violations={}", failure.seed, failure.violations.len());
                for violation in &failure.violations {
                    println!("  - {violation}");
                }
            }
            if report.failures.len() > 5 {
                println!("failures_truncated count={}", report.failures.len() - 5);
            }
            if let Some(seed) = report.first_failure {
                println!("hint replay_seed={seed} ops={}", args.board.ops);
            }
        }
    }

    if !report.all_passed() {
        bail!("{} of {} seeds failed", report.failures.len(), report.seeds_run);
    }
    Ok(())
}

fn replay(args: &ReplayArgs, output: OutputMode) -> Result<()> {
    let config = build_campaign_config(args.seed, 1, &args.board);
    let result = replay_seed(args.seed, &config)?;
    let violations: Vec<String> = result
        .oracle
        .violations
        .iter()
        .map(ToString::to_string)
        .collect();

    match output {
        OutputMode::Json => {
            let out = ReplayOutput {
                seed: result.seed,
                applied: result.applied,
                rejected: result.rejected,
                final_items: result.final_items,
                final_links: result.final_links,
                oracle_passed: result.oracle.passed,
                violations,
                trace: &result.trace,
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputMode::Text => {
            for entry in &result.trace {
                println!(
                    "{:>5} {:<7} {}",
                    entry.step,
                    entry.op.name(),
                    serde_json::to_string(&entry.outcome)?
                );
            }
            println!(
                "replay seed={} applied={} rejected={} items={} links={} passed={}",
                result.seed,
                result.applied,
                result.rejected,
                result.final_items,
                result.final_links,
                result.oracle.passed
            );
            for violation in &violations {
                println!("  - {violation}");
            }
        }
    }

    if !result.oracle.passed {
        bail!("seed {} violated {} invariants", result.seed, result.oracle.violations.len());
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("WORKBOARD_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "workboard=debug,info"
        } else {
            "workboard=info,warn"
        })
    });

    let format = env::var("WORKBOARD_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}
