//! mip-ahrs - prints AHRS attitude and raw IMU readings
//!
//! ```text
//! mip-ahrs [config.toml]
//! mip-ahrs --config <path> [--port <device>]
//! ```

use mip_ahrs::config::{AppConfig, OutputFormat, ShowReading};
use mip_ahrs::error::{Error, Result};
use mip_ahrs::{Ahrs, RawImu, Rpy};
use serde::Serialize;
use std::env;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "mip-ahrs.toml";

/// Command line options
struct Args {
    config_path: Option<String>,
    port: Option<String>,
}

/// Parse command line arguments.
///
/// Supports:
/// - `mip-ahrs <path>` (positional)
/// - `mip-ahrs --config <path>` / `-c <path>`
/// - `--port <device>` / `-p <device>` to override the configured port
fn parse_args() -> Args {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut parsed = Args {
        config_path: None,
        port: None,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" if i + 1 < args.len() => {
                parsed.config_path = Some(args[i + 1].clone());
                i += 1;
            }
            "--port" | "-p" if i + 1 < args.len() => {
                parsed.port = Some(args[i + 1].clone());
                i += 1;
            }
            arg if !arg.starts_with('-') && parsed.config_path.is_none() => {
                parsed.config_path = Some(arg.to_string());
            }
            arg => eprintln!("Ignoring argument: {}", arg),
        }
        i += 1;
    }

    parsed
}

/// Explicit paths must exist; the default path is optional
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config_path {
        Some(path) => AppConfig::load(path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => AppConfig::load(DEFAULT_CONFIG_PATH)?,
        None => AppConfig::default(),
    };
    if let Some(port) = &args.port {
        config.device.port = port.clone();
    }
    Ok(config)
}

/// One JSON output line
#[derive(Serialize)]
struct Sample {
    #[serde(skip_serializing_if = "Option::is_none")]
    rpy: Option<Rpy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw: Option<RawImu>,
}

fn print_sample(config: &AppConfig, rpy: Rpy, raw: RawImu) -> Result<()> {
    let show = config.output.show;
    let rpy = matches!(show, ShowReading::Rpy | ShowReading::Both).then_some(rpy);
    let raw = matches!(show, ShowReading::Raw | ShowReading::Both).then_some(raw);

    let mut stdout = io::stdout().lock();
    match config.output.format {
        OutputFormat::Json => {
            writeln!(stdout, "{}", serde_json::to_string(&Sample { rpy, raw })?)?;
        }
        OutputFormat::Text => {
            // One line rewritten in place keeps the output legible
            let line = match (rpy, raw) {
                (Some(rpy), Some(raw)) => format!("{} | {}", rpy, raw),
                (Some(rpy), None) => rpy.to_string(),
                (None, Some(raw)) => raw.to_string(),
                (None, None) => String::new(),
            };
            write!(stdout, "{}\r", line)?;
        }
    }
    stdout.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = parse_args();
    let config = load_config(&args)?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("mip-ahrs v{} starting...", env!("CARGO_PKG_VERSION"));
    match &args.config_path {
        Some(path) => log::info!("Using config: {}", path),
        None => log::info!("Using default configuration"),
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let mut ahrs = Ahrs::open(&config)?;

    match ahrs.device_info() {
        Ok(info) => log::info!(
            "Device: {} ({}), serial {}, firmware {}",
            info.model_name,
            info.model_number,
            info.serial_number,
            info.firmware_version_string()
        ),
        Err(e) => log::warn!("Could not read device info: {}", e),
    }

    let interval = Duration::from_millis(config.output.interval_ms);
    while running.load(Ordering::Relaxed) {
        let (rpy, raw) = ahrs.update(config.output.degrees)?;
        print_sample(&config, rpy, raw)?;
        thread::sleep(interval);
    }

    println!();
    log::info!("Shutting down...");
    ahrs.shutdown()?;
    log::info!(
        "mip-ahrs stopped ({} checksum errors)",
        ahrs.node_mut().checksum_errors()
    );
    Ok(())
}
