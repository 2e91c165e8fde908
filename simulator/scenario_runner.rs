// Scenario Runner - Load and execute simulation YAML files
//
// Usage:
//   cargo run --bin scenario_runner scenarios/two_talkers.yaml
//   cargo run --bin scenario_runner scenarios/  (runs all .yaml files in directory)
//   cargo run --bin scenario_runner scenarios/ --both --seed 42
//
// A scenario's `output` file receives its event log; with --both each mode
// writes its own file. Ctrl+C stops the running scenario and skips the rest.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::{error, info, warn, LevelFilter};
use simple_logger::SimpleLogger;

use tk_rust::{
    run_simulation, Config, ConfigError, Event, FanOutSink, FileEventSink, LoggingEventSink,
    MemoryEventSink, SimulationFile, SimulationReport, StopSignal, SyncMode,
};

#[derive(Parser, Debug)]
#[command(name = "scenario_runner", about = "Run talker pool scenarios from YAML files")]
struct Args {
    /// Scenario file or directory of scenario files
    path: PathBuf,

    /// Override the mode given in the scenario
    #[arg(long, value_enum, conflicts_with = "both")]
    mode: Option<SyncMode>,

    /// Run every scenario under both strategies and compare
    #[arg(long)]
    both: bool,

    /// Override the scenario seed
    #[arg(long)]
    seed: Option<u64>,

    /// Print every talker event
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = SimpleLogger::new().with_level(LevelFilter::Info).init() {
        eprintln!("failed to initialise logger: {}", e);
    }

    let scenarios = if args.path.is_dir() {
        find_scenarios(&args.path)
    } else if args.path.is_file() {
        vec![args.path.clone()]
    } else {
        eprintln!("Error: Path does not exist: {}", args.path.display());
        return ExitCode::from(1);
    };

    if scenarios.is_empty() {
        eprintln!("No .yaml files found in {}", args.path.display());
        return ExitCode::from(1);
    }

    let stop = StopSignal::new();
    let handler_stop = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_stop.set()) {
        warn!("cannot install Ctrl+C handler: {}", e);
    }

    println!("Found {} scenario(s) to run\n", scenarios.len());

    let mut failed = 0;
    for (i, path) in scenarios.iter().enumerate() {
        if stop.is_set() {
            info!("interrupted, skipping remaining scenarios");
            break;
        }
        println!("{}/{} Running: {}\n", i + 1, scenarios.len(), path.display());
        if let Err(e) = run_scenario_file(path, &args, &stop) {
            error!("{}", e);
            failed += 1;
        }
    }

    if failed > 0 {
        eprintln!("{} scenario(s) failed", failed);
        return ExitCode::from(1);
    }
    println!("All scenarios complete!");
    ExitCode::SUCCESS
}

fn find_scenarios(dir: &Path) -> Vec<PathBuf> {
    let mut scenarios = Vec::new();
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            let ext = path.extension().and_then(|s| s.to_str());
            if ext == Some("yaml") || ext == Some("yml") {
                scenarios.push(path);
            }
        }
    }
    scenarios.sort();
    scenarios
}

fn run_scenario_file(path: &Path, args: &Args, stop: &StopSignal) -> Result<(), ConfigError> {
    let scenario = SimulationFile::load(path)?;

    let mut config = scenario.config;
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    config.validate()?;

    match scenario.meta.name {
        Some(ref name) => println!("=== {} ===", name),
        None => println!("=== Scenario: {} ===", path.display()),
    }
    if let Some(ref desc) = scenario.meta.description {
        println!("{}\n", desc);
    }

    println!("Configuration:");
    println!("  Talkers: {}", config.talkers);
    println!("  Idle: {}-{} ms", config.min_idle_ms, config.max_idle_ms);
    println!("  Calls: {}-{} ms", config.min_call_ms, config.max_call_ms);
    println!("  Leave probability: {:.2}", config.leave_probability);
    match config.call_limit() {
        Some(limit) => println!("  Call limit: {}", limit),
        None => println!("  Call limit: none"),
    }
    match config.time_budget() {
        Some(budget) => println!("  Time budget: {} ms\n", budget.as_millis()),
        None => println!("  Time budget: none\n"),
    }

    let modes = if args.both {
        vec![SyncMode::Semaphore, SyncMode::Condition]
    } else {
        vec![args.mode.or(scenario.mode).unwrap_or_default()]
    };

    let both = modes.len() > 1;
    let mut reports = Vec::new();
    for mode in modes {
        if stop.is_set() {
            break;
        }
        let output = scenario
            .output
            .as_deref()
            .map(|path| if both { per_mode_path(path, mode) } else { path.to_path_buf() });
        let report = run_one(&config, mode, output.as_deref(), args.verbose, stop);
        report.print_summary();
        println!();
        reports.push(report);
    }

    if let [a, b] = reports.as_slice() {
        print_comparison(a, b);
    }
    Ok(())
}

fn run_one(
    config: &Config,
    mode: SyncMode,
    output: Option<&Path>,
    verbose: bool,
    stop: &StopSignal,
) -> SimulationReport {
    let memory = MemoryEventSink::new();
    let console = LoggingEventSink::new(verbose);
    let file = output.and_then(|path| match FileEventSink::create(path) {
        Ok(sink) => Some(sink.without_console()),
        Err(e) => {
            warn!("cannot open log file {}: {}, skipping it", path.display(), e);
            None
        }
    });

    let mut sink = FanOutSink::new().with(&memory).with(&console);
    if let Some(ref file) = file {
        sink = sink.with(file);
    }

    let report = run_simulation(config, mode, &sink, stop);

    let busy = memory.count(|e| matches!(e, Event::LineBusy { .. }));
    let gave_up = memory.count(|e| matches!(e, Event::AttemptsExhausted { .. }));
    println!("Line busy: {}, gave up dialing: {}", busy, gave_up);
    if let Some(path) = output.filter(|_| file.is_some()) {
        println!("Event log: {}", path.display());
    }
    report
}

/// `outputs/run.log` -> `outputs/run-condition.log`
fn per_mode_path(path: &Path, mode: SyncMode) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("events");
    let name = match path.extension().and_then(|s| s.to_str()) {
        Some(ext) => format!("{}-{}.{}", stem, mode, ext),
        None => format!("{}-{}", stem, mode),
    };
    path.with_file_name(name)
}

fn print_comparison(a: &SimulationReport, b: &SimulationReport) {
    let (x, y) = (a.completed_conversations(), b.completed_conversations());
    println!("=== {} vs {} ===", a.mode, b.mode);
    println!("  Conversations: {} vs {}", x, y);
    println!("  Still active: {} vs {}", a.active_count, b.active_count);
    let orphans = a.orphaned_claims().len() + b.orphaned_claims().len();
    if orphans > 0 {
        println!("  WARNING: {} talker(s) left with an open claim", orphans);
    }
    println!();
}
