//! Command line interface
//!
//! Settings are layered: built-in defaults, then the config file, then
//! command line flags.

use anyhow::Context;
use clap::{ArgAction, Parser};
use gcodestream_communication::{
    list_ports, open_machine_connection, GcodeSource, GcodeStreamer, MachineLink,
    SerialPortInfo, StreamerConfig,
};
use gcodestream_core::{ErrorPolicy, SessionStats};
use gcodestream_settings::Config;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

const CONNECTION_HELP: &str = "\
Connection string is either a path to a tty device or host:port

 * Serial connection
   A path to the device name with an optional bit-rate
   separated with a comma.
   Examples of valid connection strings:
   	/dev/ttyACM0
   	/dev/ttyACM0,b115200
   notice the 'b' prefix for the bit-rate.
   Available bit-rates are one of [b9600, b19200, b38400, b57600, b115200, b230400, b460800]

 * TCP connection
   For devices that receive gcode via tcp (e.g. http://beagleg.org/)
   you specify the connection string as host:port. Example:
   	localhost:4444
   The port defaults to 8888.

A string that does not open as a tty is retried as host:port. Use a
'tty:' or 'tcp:' prefix to pick one explicitly. A prefix followed only
by a port number names a host: tcp:4444 is host 'tcp', port 4444.

Examples:
  gcodestream file.gcode /dev/ttyACM0,b115200
  gcodestream file.gcode localhost:4444
  gcodestream --on-error abort file.gcode tcp:beagleg.local";

/// GCodeStream - stream G-code to a machine one acknowledged line at a time
#[derive(Parser, Debug)]
#[command(name = "gcodestream")]
#[command(author, about, long_about = None)]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_DATE"), ")"))]
#[command(after_long_help = CONNECTION_HELP)]
pub struct Cli {
    /// G-code file to send
    #[arg(
        value_name = "GCODE_FILE",
        required_unless_present_any = ["list_ports", "save_config"]
    )]
    pub file: Option<PathBuf>,

    /// Device path with optional bit-rate, or host:port [default: /dev/ttyUSB0,b115200]
    #[arg(value_name = "CONNECTION")]
    pub connection: Option<String>,

    /// Configuration file (.toml or .json)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// What to do when the machine answers with an error
    #[arg(long = "on-error", value_name = "POLICY")]
    pub on_error: Option<ErrorPolicy>,

    /// Retransmissions per line with --on-error retry
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,

    /// Print everything the machine sends back
    #[arg(long)]
    pub echo: bool,

    /// Quiet period used to discard stale machine output before sending
    #[arg(long = "drain-ms", value_name = "MS")]
    pub drain_ms: Option<u64>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// List serial ports that look like machine controllers and exit
    #[arg(long)]
    pub list_ports: bool,

    /// Write the resolved settings to FILE (.toml or .json) and exit
    #[arg(long = "save-config", value_name = "FILE")]
    pub save_config: Option<PathBuf>,
}

impl Cli {
    /// Load the config file and apply command line overrides
    pub fn resolve_config(&self) -> anyhow::Result<Config> {
        let mut config = Config::load(self.config.as_deref()).with_context(|| {
            match &self.config {
                Some(path) => format!("Failed to load config {}", path.display()),
                None => "Failed to load default config".to_string(),
            }
        })?;

        if let Some(connection) = &self.connection {
            config.connection.descriptor = connection.clone();
        }
        if let Some(drain_ms) = self.drain_ms {
            config.connection.drain_timeout_ms = drain_ms;
        }
        if let Some(policy) = self.on_error {
            config.streaming.error_policy = policy;
        }
        if let Some(retries) = self.retries {
            config.streaming.retry_limit = retries;
        }
        if self.echo {
            config.streaming.echo_responses = true;
        }

        config.validate().context("Invalid settings")?;
        Ok(config)
    }
}

/// Session tunables from resolved settings
pub fn streamer_config(config: &Config) -> StreamerConfig {
    StreamerConfig {
        error_policy: config.streaming.error_policy,
        retry_limit: config.streaming.retry_limit,
        echo_responses: config.streaming.echo_responses,
        response_buffer_len: config.streaming.response_buffer_len,
        drain_window: Duration::from_millis(config.connection.drain_timeout_ms),
        thousands_separator: config.streaming.thousands_separator,
    }
}

/// Run the command
pub fn run(cli: &Cli) -> anyhow::Result<()> {
    if cli.list_ports {
        let ports = list_ports().context("Failed to enumerate serial ports")?;
        return print_ports(&ports, &mut std::io::stdout().lock());
    }

    let config = cli.resolve_config()?;
    if let Some(path) = &cli.save_config {
        config
            .save_to_file(path)
            .with_context(|| format!("Failed to save config {}", path.display()))?;
        println!("Saved settings to {}", path.display());
        return Ok(());
    }

    let stats = stream_file(cli, &config)?;
    println!("{}", stats);
    Ok(())
}

fn stream_file(cli: &Cli, config: &Config) -> anyhow::Result<SessionStats> {
    let file = cli.file.as_deref().context("No G-code file given")?;
    let mut source = GcodeSource::open(file)
        .with_context(|| format!("Failed to open {}", file.display()))?;

    let descriptor = &config.connection.descriptor;
    let link = open_machine_connection(descriptor)
        .with_context(|| format!("Failed to connect to machine {}", descriptor))?;
    tracing::info!("Connected to {}", link.describe());

    // the link is closed when the streamer drops, before totals are printed
    let mut streamer = GcodeStreamer::new(link, streamer_config(config));
    let stats = streamer.run(&mut source)?;
    Ok(stats)
}

/// Write one `descriptor  description` row per port
pub fn print_ports(ports: &[SerialPortInfo], out: &mut dyn Write) -> anyhow::Result<()> {
    if ports.is_empty() {
        writeln!(out, "No serial ports found")?;
        return Ok(());
    }
    for port in ports {
        writeln!(out, "{:<32} {}", port.descriptor(), port.description)?;
    }
    Ok(())
}
