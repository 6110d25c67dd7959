use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use sched_sim::{
    Algorithm, Engine, SimConfig,
    core::{SimCore, SimEvent},
    scheduler::DispatchMode,
    sim::{FileSink, MetricsSnapshot, ProcessProducer, SyntheticProducer},
};
use std::{fs, path::PathBuf, thread, time::Duration};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sched-sim", version, about = "Multi-CPU scheduling simulator")]
struct Cli {
    #[command(flatten)]
    sim: SimArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct SimArgs {
    /// JSON file with a SimConfig; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    units: Option<usize>,
    #[arg(long)]
    tick: Option<f64>,
    #[arg(long)]
    threshold: Option<u8>,
    #[arg(long)]
    quantum: Option<f64>,
    /// Per-unit override, e.g. `2=sjf` or `3=rr:0.5`; may repeat
    #[arg(long = "unit", value_name = "ID=ALGO[:QUANTUM]")]
    unit_overrides: Vec<String>,
    /// Number of synthetic processes to generate
    #[arg(long, default_value_t = 12)]
    processes: usize,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Print the final metrics as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Step the clock on this thread until every process has completed
    Run {
        #[arg(long, default_value_t = 100_000)]
        max_ticks: u64,
        /// Print every event, not just completions
        #[arg(long)]
        verbose: bool,
    },
    /// Run the clock on its background thread for a wall-clock duration
    Live {
        #[arg(long, default_value_t = 5)]
        seconds: u64,
        /// Append completion records to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = load_config(&cli.sim)?;
    let overrides = cli
        .sim
        .unit_overrides
        .iter()
        .map(|raw| parse_unit_override(raw))
        .collect::<Result<Vec<_>>>()?;
    let mut producer = SyntheticProducer::new(cli.sim.seed, cli.sim.processes);

    let metrics = match cli.command {
        Command::Run { max_ticks, verbose } => {
            run_headless(&config, &overrides, &mut producer, max_ticks, verbose)?
        }
        Command::Live { seconds, output } => {
            run_live(config, &overrides, &mut producer, seconds, output)?
        }
    };

    if cli.sim.json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
    } else {
        println!("Completed processes: {}", metrics.completed);
        println!("Average waiting time: {:.2}s", metrics.average_waiting);
        println!("Average turnaround time: {:.2}s", metrics.average_turnaround);
    }
    Ok(())
}

fn load_config(args: &SimArgs) -> Result<SimConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => SimConfig::default(),
    };
    if let Some(units) = args.units {
        config.units = units;
    }
    if let Some(tick) = args.tick {
        config.tick_size = tick;
    }
    if let Some(threshold) = args.threshold {
        config.threshold = threshold;
    }
    if let Some(quantum) = args.quantum {
        config.default_quantum = quantum;
    }
    config.validate()?;
    Ok(config)
}

type UnitOverride = (usize, Algorithm, Option<f64>);

fn parse_unit_override(raw: &str) -> Result<UnitOverride> {
    let (id, rest) = raw
        .split_once('=')
        .with_context(|| format!("unit override {raw:?} must look like ID=ALGO[:QUANTUM]"))?;
    let (algo, quantum) = match rest.split_once(':') {
        Some((algo, q)) => (algo, Some(q.parse::<f64>().context("quantum must be a number")?)),
        None => (rest, None),
    };
    let algorithm = algo.parse::<Algorithm>().map_err(anyhow::Error::msg)?;
    Ok((id.parse().context("unit id must be a number")?, algorithm, quantum))
}

fn run_headless(
    config: &SimConfig,
    overrides: &[UnitOverride],
    producer: &mut dyn ProcessProducer,
    max_ticks: u64,
    verbose: bool,
) -> Result<MetricsSnapshot> {
    let mut core = SimCore::new(config)?;
    for descriptor in producer.produce(0.0) {
        core.admit(descriptor)?;
    }
    core.dispatch(DispatchMode::Notify);
    for &(unit, algorithm, quantum) in overrides {
        core.configure_unit(unit, algorithm, quantum)?;
    }

    while !core.is_drained() && core.ticks() < max_ticks {
        let events = core.tick();
        let now = core.now();
        for event in events {
            match &event {
                SimEvent::Completed(entry) => println!("t={now:.2} {entry}"),
                _ if verbose => println!("t={now:.2} {event:?}"),
                _ => {}
            }
        }
    }
    if !core.is_drained() {
        tracing::warn!(max_ticks, "tick limit reached before every process completed");
    }

    Ok(MetricsSnapshot::from(&core.metrics))
}

fn run_live(
    config: SimConfig,
    overrides: &[UnitOverride],
    producer: &mut dyn ProcessProducer,
    seconds: u64,
    output: Option<PathBuf>,
) -> Result<MetricsSnapshot> {
    let engine = match output {
        Some(path) => {
            let sink = FileSink::new(path);
            tracing::info!(path = %sink.path().display(), "appending completion records");
            Engine::with_sink(config, Box::new(sink))?
        }
        None => Engine::new(config)?,
    };
    engine.import(producer);
    engine.dispatch();
    for &(unit, algorithm, quantum) in overrides {
        engine.configure_unit(unit, algorithm, quantum)?;
    }
    engine.start()?;

    for _ in 0..seconds {
        thread::sleep(Duration::from_secs(1));
        let status = engine.status();
        let running: Vec<String> = engine
            .snapshot_units()
            .iter()
            .map(|u| match u.running {
                Some(pid) => format!("cpu{}:P{pid}({})", u.id, u.algorithm),
                None => format!("cpu{}:idle", u.id),
            })
            .collect();
        println!("t={:.2} live={} {}", status.now, status.live, running.join(" "));
    }

    engine.stop();
    Ok(engine.snapshot_metrics())
}
