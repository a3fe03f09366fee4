//! Signal Core - demo runner
//!
//! Builds a stock ship, boards a recording pilot, loads an autopilot program
//! into the core and lets the simulation and power loops run for a while.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

use signal_core::command::RecordingActor;
use signal_core::core::error::{Result, SignalError};
use signal_core::core::EngineConfig;
use signal_core::scheduler::Scheduler;
use signal_core::solver::{DatalogSolver, Solver};
use signal_core::space::SpaceSimulation;
use signal_core::vehicle::{Vehicle, VehicleStatus};

/// Push east until one unit of force is applied
const DEMO_PROGRAM: &str = "\
command(\"thrust e\") :- body(_, _, _, _, _, FX, _, _), FX < 1.
#show command/1.";

/// Run a stock ship with an autopilot program
#[derive(Parser, Debug)]
#[command(name = "signal-core")]
#[command(about = "Run a ship core's logic loop and power grid for a few seconds")]
struct Args {
    /// Engine configuration (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// How long to run before shutting down
    #[arg(long, default_value_t = 5)]
    seconds: u64,

    /// Autopilot program file; a built-in demo program is used if omitted
    #[arg(long)]
    program: Option<PathBuf>,

    /// Print the final report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Report {
    vehicle: VehicleStatus,
    core_logs: Vec<String>,
    pilot_messages: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("signal_core=info")),
        )
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    config.validate().map_err(SignalError::Config)?;

    let rt = Runtime::new()?;
    rt.block_on(run(args, config))
}

async fn run(args: Args, config: EngineConfig) -> Result<()> {
    tracing::info!("Signal Core starting...");

    let solver: Arc<dyn Solver> = Arc::new(DatalogSolver::new());
    let scheduler = Arc::new(Scheduler::new(solver, &config)?);

    let ship = Arc::new(Vehicle::stock("ship", &config)?.with_scheduler(Arc::clone(&scheduler)));
    let pilot = Arc::new(RecordingActor::new("pilot"));
    ship.board(pilot.clone());

    let program = match &args.program {
        Some(path) => std::fs::read_to_string(path)?,
        None => DEMO_PROGRAM.to_string(),
    };
    let core = ship.core();
    core.write_program("autopilot", &program)?;
    if !core.load("autopilot") || !core.run("autopilot") {
        return Err(SignalError::CommandRefused("autopilot failed to start".into()));
    }

    ship.power_on()?;
    let ticker = ship.start_power_ticker()?;

    let space = Arc::new(SpaceSimulation::new("sector"));
    space.add_body(Arc::clone(ship.body()));
    scheduler.track(space.clone());

    tokio::time::sleep(Duration::from_secs(args.seconds)).await;

    ticker.stop();
    scheduler.shutdown().await;

    let report = Report {
        vehicle: ship.status(),
        core_logs: core.logs(),
        pilot_messages: pilot.messages(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.vehicle.hud);
        if let Some(error) = &report.vehicle.core.last_error {
            println!("\n{}", error);
        }
        println!("\n--- core log ---");
        for line in &report.core_logs {
            println!("{}", line);
        }
        println!("\n--- pilot ---");
        for line in &report.pilot_messages {
            println!("{}", line);
        }
    }

    Ok(())
}
