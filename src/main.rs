//! # actuator-demos
//!
//! Command-line entry point: one subcommand per demo, each reading a TOML
//! parameter file.
//!
//! ```bash
//! actuator-demos position_control demos/position_control.toml
//! actuator-demos --yes -v leader_follower demos/leader_follower.toml
//! actuator-demos list
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use actuator_demos::{
    load_parameters, AutoConfirm, DemoKind, DemoReport, DemoRunner, Operator, SimulatedBus,
    StdDelay, StdinOperator,
};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Parameter-driven actuator control demos
#[derive(Parser, Debug)]
#[command(name = "actuator-demos")]
#[command(about = "Parameter-driven control-loop demos for motorized actuators", long_about = None)]
#[command(version)]
struct Cli {
    /// Skip the per-port confirmation prompt
    #[arg(short, long, global = true)]
    yes: bool,

    /// Log every tick
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read and print device data
    #[command(name = "read_only")]
    ReadOnly { param_file: PathBuf },

    /// Hold a current, then ramp it down
    #[command(name = "current_control")]
    CurrentControl { param_file: PathBuf },

    /// Ramp the motor voltage open-loop
    #[command(name = "open_control")]
    OpenControl { param_file: PathBuf },

    /// Hold the starting position
    #[command(name = "position_control")]
    PositionControl { param_file: PathBuf },

    /// Alternate impedance targets with a stiffness schedule
    #[command(name = "impedance_control")]
    ImpedanceControl { param_file: PathBuf },

    /// Alternate between two positions
    #[command(name = "two_position_control")]
    TwoPositionControl { param_file: PathBuf },

    /// Make one device follow another
    #[command(name = "leader_follower")]
    LeaderFollower { param_file: PathBuf },

    /// Hold position on two devices
    #[command(name = "two_devices_position_control")]
    TwoDevicesPositionControl { param_file: PathBuf },

    /// Stream a command table at a high rate
    #[command(name = "high_speed")]
    HighSpeed { param_file: PathBuf },

    /// Activate a microcontroller bootloader
    #[command(name = "bootloader")]
    Bootloader { param_file: PathBuf },

    /// Run the pole-finding routine
    #[command(name = "find_poles")]
    FindPoles { param_file: PathBuf },

    /// List demos and their required parameters
    List,
}

impl Commands {
    fn demo(self) -> Option<(DemoKind, PathBuf)> {
        let pair = match self {
            Commands::ReadOnly { param_file } => (DemoKind::ReadOnly, param_file),
            Commands::CurrentControl { param_file } => (DemoKind::CurrentControl, param_file),
            Commands::OpenControl { param_file } => (DemoKind::OpenControl, param_file),
            Commands::PositionControl { param_file } => (DemoKind::PositionControl, param_file),
            Commands::ImpedanceControl { param_file } => (DemoKind::ImpedanceControl, param_file),
            Commands::TwoPositionControl { param_file } => {
                (DemoKind::TwoPositionControl, param_file)
            }
            Commands::LeaderFollower { param_file } => (DemoKind::LeaderFollower, param_file),
            Commands::TwoDevicesPositionControl { param_file } => {
                (DemoKind::TwoDevicesPositionControl, param_file)
            }
            Commands::HighSpeed { param_file } => (DemoKind::HighSpeed, param_file),
            Commands::Bootloader { param_file } => (DemoKind::Bootloader, param_file),
            Commands::FindPoles { param_file } => (DemoKind::FindPoles, param_file),
            Commands::List => return None,
        };
        Some(pair)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let Some((kind, param_file)) = cli.command.demo() else {
        list_demos();
        return ExitCode::SUCCESS;
    };

    if let Err(e) = ctrlc::set_handler(|| INTERRUPTED.store(true, Ordering::Relaxed)) {
        error!(error = %e, "could not install the interrupt handler");
        return ExitCode::FAILURE;
    }

    match run_demo(kind, &param_file, cli.yes) {
        Ok(report) => {
            print_report(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_demo(
    kind: DemoKind,
    param_file: &std::path::Path,
    skip_prompt: bool,
) -> actuator_demos::Result<DemoReport> {
    let params = load_parameters(param_file)?;
    info!(demo = %kind, file = %param_file.display(), "parameters loaded");

    let mut bus = SimulatedBus::new();
    let mut delay = StdDelay;
    let mut auto = AutoConfirm;
    let mut stdin = StdinOperator;
    let operator: &mut dyn Operator = if skip_prompt { &mut auto } else { &mut stdin };

    DemoRunner::new(&mut bus, &mut delay, operator)
        .with_interrupt(&INTERRUPTED)
        .run(kind, params)
}

fn list_demos() {
    for kind in DemoKind::ALL {
        let params: Vec<String> = kind
            .schema()
            .entries()
            .iter()
            .map(|(name, ty)| format!("{}: {}", name, ty))
            .collect();
        println!("{:<30} {}", kind.name(), params.join(", "));
    }
}

fn print_report(report: &DemoReport) {
    println!("{}", report.demo);
    for session in &report.sessions {
        let error = session
            .telemetry
            .mean_abs_error()
            .map(|e| format!("{:.1}", e))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<20} {:<12} {:?} ticks={} skipped={} samples={} mean|error|={}",
            session.port.as_str(),
            session.final_state.name(),
            session.summary.outcome,
            session.summary.ticks,
            session.summary.skipped,
            session.telemetry.len(),
            error
        );
    }
}
