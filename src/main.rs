// Talker pool command line
//
// Usage:
//   cargo run --bin talker-pool -- -n 8 --mode condition --duration 20
//   cargo run --bin talker-pool -- --config scenarios/crowded_line.yaml --output outputs/run.log

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info, warn, LevelFilter};
use simple_logger::SimpleLogger;

use tk_rust::{
    run_simulation, Config, EventSink, FileEventSink, LoggingEventSink, SimulationFile,
    StopSignal, SyncMode,
};

/// Simulate talkers calling each other
#[derive(Parser, Debug)]
#[command(name = "talker-pool", version, about)]
struct Cli {
    /// YAML simulation file; flags given here override its values
    #[arg(short, long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of talkers (1-64)
    #[arg(short = 'n', long)]
    talkers: Option<usize>,

    /// Minimum idle pause (ms)
    #[arg(long)]
    min_idle: Option<u64>,

    /// Maximum idle pause (ms)
    #[arg(long)]
    max_idle: Option<u64>,

    /// Minimum call duration (ms)
    #[arg(long)]
    min_call: Option<u64>,

    /// Maximum call duration (ms)
    #[arg(long)]
    max_call: Option<u64>,

    /// Leave after this many conversations (0 = no limit)
    #[arg(long)]
    stop_after_calls: Option<u32>,

    /// Chance of leaving on every loop iteration (0..1)
    #[arg(long)]
    leave_probability: Option<f64>,

    /// Time budget in seconds (0 = no limit)
    #[arg(long, value_name = "SECONDS")]
    duration: Option<u64>,

    /// Log file written next to the console output
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Synchronization strategy
    #[arg(long, value_enum)]
    mode: Option<SyncMode>,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Log protocol details (debug level)
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(v) = self.talkers {
            config.talkers = v;
        }
        if let Some(v) = self.min_idle {
            config.min_idle_ms = v;
        }
        if let Some(v) = self.max_idle {
            config.max_idle_ms = v;
        }
        if let Some(v) = self.min_call {
            config.min_call_ms = v;
        }
        if let Some(v) = self.max_call {
            config.max_call_ms = v;
        }
        if let Some(v) = self.stop_after_calls {
            config.stop_after_calls = v;
        }
        if let Some(v) = self.leave_probability {
            config.leave_probability = v;
        }
        if let Some(v) = self.duration {
            config.time_budget_ms = v.saturating_mul(1000);
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("failed to initialise logger: {}", e);
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let file = match &cli.config {
        Some(path) => SimulationFile::load(path)?,
        None => SimulationFile::default(),
    };

    let mut config = file.config;
    cli.apply(&mut config);
    config.validate()?;

    let mode = cli.mode.or(file.mode).unwrap_or_default();
    let output = cli.output.or(file.output);

    let sink: Box<dyn EventSink> = match output {
        Some(path) => match FileEventSink::create(&path) {
            Ok(sink) => Box::new(sink),
            Err(e) => {
                warn!("cannot open log file {}: {}, logging to console only", path.display(), e);
                Box::new(LoggingEventSink::new(true))
            }
        },
        None => Box::new(LoggingEventSink::new(true)),
    };

    let stop = StopSignal::new();
    let handler_stop = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_stop.set()) {
        warn!("cannot install Ctrl+C handler: {}", e);
    }

    info!("simulation started, mode: {}", mode);
    let report = run_simulation(&config, mode, sink.as_ref(), &stop);
    if stop.is_set() {
        info!("interrupted, talkers wound down");
    }
    report.print_summary();
    info!("simulation finished, code 0");

    Ok(())
}
