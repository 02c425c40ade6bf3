// src/main.rs - Send the current second to the MCU, then echo its output
use clap::Parser;
use tokio::sync::broadcast;

use mcu_timesync::channel::{ChannelOpener, Serial2Opener};
use mcu_timesync::clock::SystemClock;
use mcu_timesync::config::{self, Config};
use mcu_timesync::sender::{TimeSyncSender, exit_policy, forward_shutdown};

#[derive(Debug, Parser)]
#[command(version, about = "Send a compensated time sync command to a microcontroller over serial")]
struct Args {
    /// TOML configuration file; built-in defaults apply when omitted
    #[arg(short, long)]
    config: Option<String>,

    /// Serial device, overrides the config file
    #[arg(short, long)]
    device: Option<String>,

    /// Baud rate, overrides the config file
    #[arg(short, long)]
    baud: Option<u32>,

    /// Delay compensation in seconds, overrides the config file
    #[arg(long, allow_negative_numbers = true)]
    compensation: Option<f64>,

    /// Print the serial ports the OS reports and exit
    #[arg(long)]
    list_ports: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn build_config(args: &Args) -> Result<Config, config::ConfigError> {
    let mut config = match &args.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path);
            config::load_config(path)?
        }
        None => Config::default(),
    };
    if let Some(device) = &args.device {
        config.serial.device = device.clone();
    }
    if let Some(baud) = args.baud {
        config.serial.baud = baud;
    }
    if let Some(compensation) = args.compensation {
        config.sync.compensation_secs = compensation;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let args = Args::parse();

    // Logs go to stderr; stdout carries only what the device sends.
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    let opener = Serial2Opener;
    if args.list_ports {
        for port in opener.available_ports() {
            println!("{}", port);
        }
        return Ok(());
    }

    let config = build_config(&args)?;
    tracing::info!("MCU: {} @ {} baud", config.serial.device, config.serial.baud);

    let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);
    forward_shutdown(tokio::signal::ctrl_c(), shutdown_tx);

    let mut sender = TimeSyncSender::new(config, SystemClock);
    let mut out = std::io::stdout();
    let result = sender.run(&opener, &mut out, &mut shutdown_rx).await;
    exit_policy(result, &opener)?;
    Ok(())
}
