use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod info;
pub mod send;
pub mod volume;
pub mod watch;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a raw command to a device.
    Send(SendArgs),
    /// Get or set the volume.
    Volume(VolumeArgs),
    /// Probe a device and print its identity.
    Info(InfoArgs),
    /// Subscribe to device notifications and print them until interrupted.
    Watch(WatchArgs),
}

pub async fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format).await,
        Command::Volume(args) => volume::run(args, format).await,
        Command::Info(args) => info::run(args, format).await,
        Command::Watch(args) => watch::run(args, format).await,
    }
}

/// The protocol variant to speak to the device.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FlavorArg {
    /// Binary-framed commands over TCP (`host:port`).
    Tcp,
    /// JSON messages over a websocket (`ws://host/...`).
    Ws,
}

#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Device address: `host:port` for tcp, a `ws://` URL for ws.
    pub target: String,
    /// Protocol variant.
    #[arg(long, value_enum, default_value = "tcp")]
    pub flavor: FlavorArg,
    /// Reply timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Raw command text, e.g. `MCU+PAS+RAKOIT:VOL&` or `#CMD:STATUS`.
    pub command: String,
    /// Wait for the reply and print it.
    #[arg(long)]
    pub wait: bool,
    /// Reply routing key for --wait on the ws flavor (the reply's `cmd`).
    #[arg(long, requires = "wait")]
    pub reply_key: Option<String>,
}

#[derive(Args, Debug)]
pub struct VolumeArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Set the volume to this fraction (0.0..=1.0) instead of reading it.
    #[arg(long)]
    pub set: Option<f32>,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Exit after printing this many events.
    #[arg(long)]
    pub count: Option<usize>,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}
