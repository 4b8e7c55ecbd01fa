// tinysa test application -- CLI tool for exercising a tinySA analyzer
// through the validated command gateway, against real hardware or a mock
// console.
//
// Usage:
//   tinysa-cli list
//   tinysa-cli ports
//   tinysa-cli --model zs406 commands
//   tinysa-cli --port /dev/ttyACM0 version
//   tinysa-cli --model basic send attenuate 10
//   tinysa-cli --verbose send level -20
//   tinysa-cli raw sweep start 100M
//   tinysa-cli --mock data 2
//   tinysa-cli --mock scan 100M 350M 101

mod logging;

use std::io::{self, Write};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use tinysa::commands::{self, TraceSlot};
use tinysa::{ArgValue, CommandGateway, ConstraintTable, Outcome, TinySaBuilder, models};
use tinysa_core::DeviceProfile;
use tinysa_core::trace;
use tinysa_test_harness::MockTransport;

use crate::logging::LogLevel;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// tinysa test application -- drives a tinySA from the command line.
#[derive(Parser)]
#[command(name = "tinysa-cli", version, about)]
struct Cli {
    /// Serial port path (e.g. /dev/ttyACM0, COM4). Without it the first
    /// USB port with the tinySA VID/PID is used.
    #[arg(long, env = "TINYSA_PORT")]
    port: Option<String>,

    /// Device model: basic, ultra (zs405), zs406, zs407.
    #[arg(long, env = "TINYSA_MODEL", default_value = "ultra")]
    model: String,

    /// Override the baud rate (USB CDC ignores it).
    #[arg(long)]
    baud: Option<u32>,

    /// Talk to a simulated console instead of a serial port.
    #[arg(long)]
    mock: bool,

    /// Narrate every command sent and rejected.
    #[arg(long)]
    verbose: bool,

    /// Print the ERROR marker on stdout when a command fails.
    #[arg(long)]
    error_byte: bool,

    /// Response timeout in seconds (0 waits forever).
    #[arg(long, default_value_t = 10.0)]
    timeout: f64,

    /// Log level; `RUST_LOG` overrides it.
    #[arg(long, value_enum, default_value = "warn")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the built-in device profiles.
    List,

    /// List USB serial ports that look like a tinySA.
    Ports,

    /// Show every modeled command with its accepted arguments.
    Commands,

    /// Send a modeled command after validating its arguments.
    Send {
        /// Command name (see `commands`).
        name: String,
        /// Positional arguments.
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Send a line verbatim, without validation.
    Raw {
        #[arg(required = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },

    /// Dump a trace with its frequencies.
    Data {
        /// 0 = temp, 1 = stored, 2 = measured.
        #[arg(default_value_t = 2, value_parser = clap::value_parser!(u8).range(0..=2))]
        trace: u8,
    },

    /// Run a sweep and print frequency/level pairs.
    Scan {
        /// Start frequency (Hz, or with k/M/G suffix).
        #[arg(value_parser = parse_freq)]
        start: u64,
        /// Stop frequency (Hz, or with k/M/G suffix).
        #[arg(value_parser = parse_freq)]
        stop: u64,
        /// Number of points (default: the model's display points).
        points: Option<u16>,
    },

    /// Print the device profile and the instrument's `info` output.
    Info,

    /// Print the firmware version.
    Version,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a frequency like "433920000", "100k", "2.4G".
fn parse_freq(s: &str) -> std::result::Result<u64, String> {
    let (number, scale) = match s.char_indices().last() {
        Some((i, 'k' | 'K')) => (&s[..i], 1e3),
        Some((i, 'M')) => (&s[..i], 1e6),
        Some((i, 'G' | 'g')) => (&s[..i], 1e9),
        _ => (s, 1.0),
    };
    let value: f64 = number
        .parse()
        .map_err(|e| format!("invalid frequency {s:?}: {e}"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("invalid frequency {s:?}"));
    }
    Ok((value * scale).round() as u64)
}

/// Format a frequency in Hz as a human-readable MHz string.
fn format_freq(hz: f64) -> String {
    format!("{:.6} MHz", hz / 1_000_000.0)
}

fn effective_level(cli: &Cli) -> LogLevel {
    match (cli.verbose, cli.log_level) {
        (true, LogLevel::Error | LogLevel::Warn) => LogLevel::Info,
        (_, level) => level,
    }
}

/// Write a text payload to stdout with one trailing newline.
fn print_payload(payload: &[u8]) -> Result<()> {
    let text = String::from_utf8_lossy(payload);
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", text.trim_end())?;
    Ok(())
}

/// Turn an outcome into the payload or a CLI error, printing the error
/// marker first when it is enabled.
fn take_payload(gateway: &CommandGateway, what: &str, outcome: Outcome) -> Result<Vec<u8>> {
    if let Outcome::Disconnecting(_) = outcome {
        eprintln!("Note: the instrument is dropping the USB link; reconnect before sending more.");
    }
    let marker = gateway.error_marker();
    match outcome.into_result() {
        Ok(payload) => Ok(payload),
        Err(e) => {
            if !marker.is_empty() {
                println!("{}", String::from_utf8_lossy(marker));
            }
            Err(e).with_context(|| format!("{what} failed"))
        }
    }
}

// ---------------------------------------------------------------------------
// Simulated console
// ---------------------------------------------------------------------------

/// Payload lines the way the firmware prints them: CRLF separated, the last
/// line keeping its CR.
fn console_lines<I: IntoIterator<Item = String>>(lines: I) -> Vec<u8> {
    let mut out = lines.into_iter().collect::<Vec<_>>().join("\r\n");
    out.push('\r');
    out.into_bytes()
}

/// A noise floor with one carrier in the middle and one corrupted token, as
/// real firmware occasionally sends.
fn simulated_levels(points: usize) -> Vec<String> {
    (0..points)
        .map(|i| {
            if i == points / 2 {
                "-2.500000e+01".to_string()
            } else if i == points / 4 {
                "-:.000000e+01".to_string()
            } else {
                format!("{:.6e}", -92.0 + (i % 7) as f64)
            }
        })
        .collect()
}

fn mock_transport(cli: &Cli, profile: &DeviceProfile) -> MockTransport {
    let mut mock = MockTransport::console();
    let points = usize::from(profile.display_points);

    mock.console_reply(
        "version",
        format!("tinySA4_v1.4-mock\r\nHW Version:{}\r", profile.model_id).as_bytes(),
    );
    mock.console_reply(
        "info",
        format!(
            "{} (simulated)\r\nScreen: {}x{}\r\nSweep points: {}\r",
            profile.name, profile.screen.width, profile.screen.height, points
        )
        .as_bytes(),
    );

    let (low, high) = (profile.sa_low.low_hz, profile.sa_low.high_hz);
    let freqs = trace::linear_frequencies(low, high, points);
    mock.console_reply(
        "frequencies",
        &console_lines(freqs.iter().map(|f| format!("{f:.0}"))),
    );
    mock.console_reply("data", &console_lines(simulated_levels(points)));

    if let Command::Scan { points: Some(n), .. } = &cli.command {
        mock.console_reply("scan", &console_lines(simulated_levels(usize::from(*n))));
    } else {
        mock.console_reply("scan", &console_lines(simulated_levels(points)));
    }
    mock
}

// ---------------------------------------------------------------------------
// Gateway construction
// ---------------------------------------------------------------------------

async fn create_gateway(cli: &Cli, profile: DeviceProfile) -> Result<CommandGateway> {
    if cli.timeout < 0.0 || !cli.timeout.is_finite() {
        bail!("--timeout must be a non-negative number of seconds");
    }
    let response_timeout = (cli.timeout > 0.0).then(|| Duration::from_secs_f64(cli.timeout));

    let mut builder = TinySaBuilder::new(profile.clone())
        .response_timeout(response_timeout)
        .verbose(cli.verbose)
        .error_byte_return(cli.error_byte);
    if let Some(baud) = cli.baud {
        builder = builder.baud_rate(baud);
    }

    if cli.mock {
        let mock = mock_transport(cli, &profile);
        return builder
            .build_with_transport(Box::new(mock))
            .await
            .context("failed to build mock gateway");
    }

    match &cli.port {
        Some(port) => builder
            .serial_port(port)
            .build()
            .await
            .with_context(|| format!("failed to open {port}")),
        None => builder
            .autoconnect()
            .await
            .context("no --port given and autodetection failed"),
    }
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

fn cmd_list() -> Result<()> {
    println!(
        "{:<8} {:<20} {:<9} {:>6}  {:<24} {:>4} {:>3}",
        "ID", "Name", "Screen", "Points", "SA range", "LNA", "SD"
    );
    for p in models::all_profiles() {
        println!(
            "{:<8} {:<20} {:<9} {:>6}  {:<24} {:>4} {:>3}",
            p.model_id,
            p.name,
            format!("{}x{}", p.screen.width, p.screen.height),
            p.display_points,
            p.sa_range.to_string(),
            p.lna_stages.len(),
            if p.has_sd_card { "yes" } else { "no" },
        );
    }
    Ok(())
}

fn cmd_ports() -> Result<()> {
    let ports = tinysa_transport::find_ports().context("failed to enumerate serial ports")?;
    if ports.is_empty() {
        println!("No tinySA found.");
        return Ok(());
    }
    for port in ports {
        println!(
            "{}  {:04x}:{:04x}  {}  {}",
            port.port_name,
            port.vid,
            port.pid,
            port.product.as_deref().unwrap_or("-"),
            port.serial_number.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

async fn cmd_send(gateway: &CommandGateway, name: &str, args: &[String]) -> Result<()> {
    let values = args
        .iter()
        .map(|a| a.parse::<ArgValue>())
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let outcome = gateway.invoke_named(name, &values).await;
    let payload = take_payload(gateway, name, outcome)?;
    print_payload(&payload)
}

async fn cmd_raw(gateway: &CommandGateway, text: &[String]) -> Result<()> {
    let line = text.join(" ");
    let outcome = gateway.command(&line).await;
    let payload = take_payload(gateway, &line, outcome)?;
    print_payload(&payload)
}

async fn cmd_data(gateway: &CommandGateway, slot: u8) -> Result<()> {
    let slot = match slot {
        0 => TraceSlot::Temp,
        1 => TraceSlot::Stored,
        _ => TraceSlot::Measured,
    };

    let outcome = gateway.execute(&commands::cmd_frequencies()).await;
    let freqs = trace::parse_frequencies(&take_payload(gateway, "frequencies", outcome)?)?;

    let outcome = gateway.execute(&commands::cmd_data(slot)).await;
    let raw = take_payload(gateway, "data", outcome)?;
    let levels = trace::parse_values(&trace::repair_malformed_tokens(
        &raw,
        trace::DEFAULT_REPLACEMENT,
    ))?;

    if freqs.len() != levels.len() {
        eprintln!(
            "Warning: {} frequencies but {} levels",
            freqs.len(),
            levels.len()
        );
    }
    for (f, level) in freqs.iter().zip(&levels) {
        println!("{:>18}  {level:>8.2} dBm", format_freq(*f as f64));
    }
    Ok(())
}

async fn cmd_scan(
    gateway: &CommandGateway,
    start: u64,
    stop: u64,
    points: Option<u16>,
) -> Result<()> {
    if stop <= start {
        bail!("stop frequency must be above start frequency");
    }
    let points = points.unwrap_or(gateway.profile().display_points);

    // Outmask 2: measured levels only; frequencies are reconstructed.
    let outcome = gateway
        .execute(&commands::cmd_scan(start, stop, Some(points), Some(2)))
        .await;
    let raw = take_payload(gateway, "scan", outcome)?;
    let levels = trace::parse_values(&trace::repair_malformed_tokens(
        &raw,
        trace::DEFAULT_REPLACEMENT,
    ))?;
    let freqs = trace::linear_frequencies(start, stop, levels.len());

    let mut peak: Option<(f64, f64)> = None;
    for (f, level) in freqs.iter().zip(&levels) {
        println!("{:>18}  {level:>8.2} dBm", format_freq(*f));
        if peak.is_none_or(|(_, best)| *level > best) {
            peak = Some((*f, *level));
        }
    }
    if let Some((f, level)) = peak {
        println!("Peak: {level:.2} dBm at {}", format_freq(f));
    }
    Ok(())
}

async fn cmd_info(gateway: &CommandGateway) -> Result<()> {
    let p = gateway.profile();
    println!("Profile:");
    println!("  Name:           {}", p.name);
    println!("  Model ID:       {}", p.model_id);
    println!(
        "  Screen:         {}x{} ({}\")",
        p.screen.width, p.screen.height, p.screen.diagonal_in
    );
    println!("  Points:         {}", p.display_points);
    println!("  SA range:       {}", p.sa_range);
    println!("  Low input:      {}", p.sa_low);
    println!("  High input:     {}", p.sa_high);
    if let Some(r) = p.sa_ultra {
        println!("  Ultra mode:     {r}");
    }
    if let Some(r) = p.sa_harmonic {
        println!("  Harmonic mode:  {r}");
    }
    println!("  RBW:            {}", p.rbw);
    println!("  Attenuator:     {}..{} dB", p.attenuator_db.0, p.attenuator_db.1);
    println!("  LNA stages:     {}", p.lna_stages.len());
    println!("  SD card:        {}", p.has_sd_card);
    println!();

    let outcome = gateway.execute(&commands::cmd_info()).await;
    let payload = take_payload(gateway, "info", outcome)?;
    println!("Instrument:");
    print_payload(&payload)
}

async fn cmd_version(gateway: &CommandGateway) -> Result<()> {
    let outcome = gateway.execute(&commands::cmd_version()).await;
    let payload = take_payload(gateway, "version", outcome)?;
    print_payload(&payload)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(effective_level(&cli));

    let profile = models::by_name(&cli.model)
        .with_context(|| format!("unknown model `{}` (see `tinysa-cli list`)", cli.model))?;

    // These do not need an instrument.
    match &cli.command {
        Command::List => return cmd_list(),
        Command::Ports => return cmd_ports(),
        Command::Commands => {
            print!("{}", ConstraintTable::standard().help(Some(&profile)));
            return Ok(());
        }
        _ => {}
    }

    let gateway = create_gateway(&cli, profile).await?;

    let result = match &cli.command {
        Command::List | Command::Ports | Command::Commands => {
            unreachable!("handled before connecting")
        }
        Command::Send { name, args } => cmd_send(&gateway, name, args).await,
        Command::Raw { text } => cmd_raw(&gateway, text).await,
        Command::Data { trace } => cmd_data(&gateway, *trace).await,
        Command::Scan {
            start,
            stop,
            points,
        } => cmd_scan(&gateway, *start, *stop, *points).await,
        Command::Info => cmd_info(&gateway).await,
        Command::Version => cmd_version(&gateway).await,
    };

    if !gateway.requires_reconnect() {
        gateway.disconnect().await.ok();
    }
    result
}
