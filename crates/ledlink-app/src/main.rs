//! Ledlink host tool
//!
//! Drives the LED transceiver against a simulated diode bench so timing and
//! decoding can be explored without hardware.
//!
//! # Usage
//!
//! ```bash
//! # Show the pulse train for a message
//! ledlink send "Hi"
//!
//! # Ten ambient readings under a dim light with the long-window profile
//! ledlink --profile light read --count 10 --light 40
//!
//! # Transmit on one diode and decode on another
//! ledlink loopback "hello"
//!
//! # Dump a profile as JSON (edit and feed back with --profile-file)
//! ledlink --profile light profile
//! ```

mod config;
mod sim;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ledlink_core::{AmbientEstimator, SensorProfile, ThresholdDecoder};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::sim::SimClock;

/// Ledlink Application
#[derive(Parser, Debug)]
#[command(name = "ledlink")]
#[command(author, version, about = "Single-LED optical transceiver bench", long_about = None)]
struct Cli {
    /// Logging verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Predefined profile: comms or light
    #[arg(short, long, default_value = "comms")]
    profile: String,

    /// Load the profile from a JSON file instead
    #[arg(long)]
    profile_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Transmit text and print the emitted pulses
    Send {
        /// Text to send
        text: String,
    },

    /// Take readings under a steady simulated light
    Read {
        /// Number of readings
        #[arg(short, long, default_value = "8")]
        count: usize,

        /// Light level falling on the diode (0 is darkness)
        #[arg(long, default_value = "100")]
        light: u32,

        /// Time readings with the host clock instead of the virtual one
        #[arg(long)]
        wall_clock: bool,
    },

    /// Send text on one diode and decode it on a facing one
    Loopback {
        /// Text to send
        text: String,

        /// Background light on the receiver
        #[arg(long, default_value = "20")]
        ambient: u32,
    },

    /// Print the selected profile as JSON
    Profile,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Ledlink v{}", env!("CARGO_PKG_VERSION"));

    let profile = config::resolve_profile(&cli.profile, cli.profile_file.as_deref())?;
    info!(?profile, "profile selected");

    match cli.command {
        Commands::Send { text } => run_send(profile, &text)?,
        Commands::Read {
            count,
            light,
            wall_clock,
        } => run_read(profile, count, light, wall_clock)?,
        Commands::Loopback { text, ambient } => run_loopback(profile, &text, ambient)?,
        Commands::Profile => println!("{}", serde_json::to_string_pretty(&profile)?),
    }

    Ok(())
}

/// Transmit `text` and list the pulses of each byte.
fn run_send(profile: SensorProfile, text: &str) -> anyhow::Result<()> {
    let trace = sim::transmit(profile, text.as_bytes())?;
    let pulses = trace.pulses();
    info!(
        "sent {} bytes in {}us",
        text.len(),
        profile.send_duration_us(text.len())
    );

    for (byte, chunk) in text.bytes().zip(pulses.chunks(8)) {
        let widths: Vec<String> = chunk.iter().map(|(_, width)| width.to_string()).collect();
        let start = chunk.first().map_or(0, |(start, _)| *start);
        println!("0x{byte:02x} @{start:>8}us  [{}]", widths.join(" "));
    }
    Ok(())
}

/// Take `count` readings and show the running ambient estimate.
fn run_read(
    profile: SensorProfile,
    count: usize,
    light: u32,
    wall_clock: bool,
) -> anyhow::Result<()> {
    let clock = if wall_clock {
        SimClock::wall()
    } else {
        SimClock::virtual_at(0)
    };
    if wall_clock {
        warn!("wall clock readings depend on host scheduling");
    }

    let readings = sim::ambient_readings(profile, light, count, clock)?;
    let mut ambient: AmbientEstimator<8> = AmbientEstimator::new();
    for (i, reading) in readings.iter().enumerate() {
        let average = ambient.push(*reading);
        println!(
            "{i:>4}  {reading:>7}us  avg {average:>7}us  level {:>4}/1000",
            ambient.level_permille(profile.sample_us)
        );
    }
    Ok(())
}

/// Send `text` through a simulated link and report what came back.
fn run_loopback(profile: SensorProfile, text: &str, ambient: u32) -> anyhow::Result<()> {
    let decoder = ThresholdDecoder::for_profile(&profile);
    info!(
        bright_max_us = decoder.bright_max_us,
        dark_min_us = decoder.dark_min_us,
        "decoding"
    );

    let result = sim::loopback(profile, text.as_bytes(), ambient, decoder)?;
    let decoded = String::from_utf8_lossy(&result.decoded);
    info!(
        "{} pulses emitted, {} readings taken",
        result.sent.pulses().len(),
        result.readings.len()
    );
    println!("sent:     {text:?}");
    println!("received: {decoded:?}");

    if result.ambiguous > 0 {
        warn!("{} of {} bits were ambiguous", result.ambiguous, result.readings.len());
    }
    if result.decoded != text.as_bytes() {
        anyhow::bail!("loopback mismatch");
    }
    Ok(())
}
