//! inkwire-send
//!
//! Push an image to an Inkwire e-paper display over USB serial.
//!
//! # Usage
//!
//! ```bash
//! # Send with defaults (/dev/ttyACM0, 115200 baud)
//! inkwire-send calendar.png
//!
//! # Other port, settings file, debug logging
//! inkwire-send calendar.png -p /dev/ttyACM1 -c inkwire.toml -vv
//!
//! # Only check that the image packs into a frame
//! inkwire-send calendar.png --dry-run
//! ```

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use inkwire_host::link::SerialLink;
use inkwire_host::{raster, send_frame, HostConfig, Progress};
use log::{info, LevelFilter};

/// Send an image to an Inkwire e-paper display
#[derive(Parser)]
#[command(name = "inkwire-send")]
#[command(version)]
#[command(about = "Send an image to an Inkwire e-paper display")]
struct Cli {
    /// Image to display (PNG or JPEG); resized to 800x480
    image: PathBuf,

    /// Serial port path (e.g., /dev/ttyACM0)
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// More output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Pack the image and report, without opening the port
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => HostConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => HostConfig::default(),
    };
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(baud) = cli.baud {
        config.baud_rate = baud;
    }

    let frame = raster::load_frame(&cli.image)
        .with_context(|| format!("Failed to prepare image: {}", cli.image.display()))?;
    info!("{} packed into {} bytes", cli.image.display(), frame.len());

    if cli.dry_run {
        println!("{}: {} byte frame, not sent", cli.image.display(), frame.len());
        return Ok(());
    }

    let link = SerialLink::open(&config.port, config.baud_rate)
        .with_context(|| format!("Failed to open serial port: {}", config.port))?;

    let report = send_frame(link, &frame, &config.transfer, print_progress)
        .context("Transfer failed")?;

    println!(
        "Frame displayed: {} chunks in {:.1?} ({} handshake attempt(s))",
        report.chunks, report.elapsed, report.handshake_attempts
    );
    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn print_progress(progress: Progress) {
    let mut stderr = std::io::stderr();
    let _ = write!(stderr, "\rProgress: {:5.1}%", progress.fraction() * 100.0);
    if progress.is_complete() {
        let _ = writeln!(stderr);
    }
    let _ = stderr.flush();
}
