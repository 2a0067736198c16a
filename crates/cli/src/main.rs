//! usbrelease
//!
//! Lists attached USB devices and detaches or reattaches the kernel driver
//! bound to one interface of a chosen device, so the interface can be claimed
//! by user-space software and later handed back to the kernel.

mod config;

use anyhow::{Context as _, Result};
use binding::{
    AttachSpec, BackendDevice, Context, DeviceSnapshot, DriverAction, apply_driver_action,
    list_devices,
};
use clap::error::ErrorKind;
use clap::{Args as ClapArgs, CommandFactory, Parser, Subcommand};
use common::setup_logging;
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::{debug, info};

/// Bad invocation: unknown command, missing arguments, unusable config
const EXIT_USAGE: u8 = 1;
/// The requested operation failed
const EXIT_FAILURE: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "usbrelease")]
#[command(
    author,
    version,
    about = "Detach and reattach kernel drivers from USB device interfaces"
)]
#[command(long_about = "
Lists attached USB devices and toggles kernel driver binding for one
interface of a device, selected by bus number and device address.

EXAMPLES:
    # List devices as bus/port/address triples
    usbrelease list

    # Release interface 0 of the device at bus 1, address 3
    usbrelease detach 1 3 0

    # Give it back to the kernel
    usbrelease reattach 1 3 0

CONFIGURATION:
    The configuration file is looked up in the following order:
    1. Path specified with --config
    2. ~/.config/usbrelease/config.toml
    3. /etc/usbrelease/config.toml
    4. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Lists all USB devices
    List,
    /// Detaches a USB interface from the kernel driver
    Detach(Target),
    /// Reattaches a USB interface to the kernel driver
    Reattach(Target),
}

/// Raw bus/address/interface arguments, validated by `AttachSpec::parse`
#[derive(ClapArgs, Debug, Clone, PartialEq, Eq)]
struct Target {
    /// Bus number (0-255)
    #[arg(value_name = "BUS_ID", allow_hyphen_values = true)]
    bus: String,
    /// Device address on the bus (0-255)
    #[arg(value_name = "ADDR", allow_hyphen_values = true)]
    address: String,
    /// Interface number (0-255)
    #[arg(value_name = "INTERFACE_ID", allow_hyphen_values = true)]
    interface: String,
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(EXIT_USAGE),
            };
        }
    };

    if args.save_config {
        let path = config::Config::default_path();
        return match config::Config::default().save(&path) {
            Ok(()) => {
                println!("Configuration saved to: {}", path.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failure: {:#}", e);
                ExitCode::from(EXIT_FAILURE)
            }
        };
    }

    let Some(command) = args.command.clone() else {
        print_usage();
        return ExitCode::from(EXIT_USAGE);
    };

    if let Err(e) = init_logging(&args) {
        eprintln!("Failure: {:#}", e);
        return ExitCode::from(EXIT_USAGE);
    }

    match run(command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", failure_message(&e));
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

/// Load configuration and install the tracing subscriber
fn init_logging(args: &Args) -> Result<()> {
    let config = match args.config.as_deref() {
        Some(path) => config::Config::load_from(path).context("Failed to load configuration")?,
        None => config::Config::load_or_default(),
    };

    // CLI log level wins over the config file
    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.general.log_level);
    config::validate_log_level(log_level)?;

    setup_logging(log_level).context("Failed to setup logging")?;
    debug!("Log level: {}", log_level);
    Ok(())
}

/// Print usage to stdout
fn print_usage() {
    let mut cmd = Args::command();
    let _ = cmd.print_help();
}

/// Initialize libusb, take one snapshot, and run `command` against it
///
/// The snapshot and context are released when this returns, whichever way.
fn run(command: Command) -> Result<()> {
    info!("usbrelease v{}", env!("CARGO_PKG_VERSION"));

    let context = Context::initialize()?;
    let snapshot = context.list_devices()?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    execute(&snapshot, command, &mut out)
}

fn execute<D, W>(snapshot: &DeviceSnapshot<'_, D>, command: Command, out: &mut W) -> Result<()>
where
    D: BackendDevice,
    W: Write,
{
    match command {
        Command::List => {
            list_devices(snapshot, out).context("Failed to write device list")?;
        }
        Command::Detach(target) => {
            let spec = target.spec()?;
            apply_driver_action(snapshot, &spec, DriverAction::Detach)?;
        }
        Command::Reattach(target) => {
            let spec = target.spec()?;
            apply_driver_action(snapshot, &spec, DriverAction::Reattach)?;
        }
    }
    Ok(())
}

impl Target {
    fn spec(&self) -> binding::Result<AttachSpec> {
        AttachSpec::parse(&self.bus, &self.address, &self.interface)
    }
}

/// Operator-facing message for a failed command
///
/// A missing device gets its own wording, separate from subsystem failures.
fn failure_message(error: &anyhow::Error) -> String {
    match error.downcast_ref::<binding::Error>() {
        Some(e) if e.is_not_found() => e.to_string(),
        Some(e) => format!("Failure: {}", e),
        None => format!("Failure: {:#}", error),
    }
}
