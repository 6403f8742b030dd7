//! uul-config - read and write the logger configuration over serial

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::info;
use uul_core::cli::{init_logging, read_password, CliResult};
use uul_core::{
    find_device, AppSettings, CancelToken, DeviceConfig, SerialConfig, SerialTransport,
    TransportError,
};

/// UUL serial configuration tool
#[derive(Parser, Debug)]
#[command(name = "uul-config", version, about = "Read and write UUL device configuration")]
struct Cli {
    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Serial device (auto-detected if omitted)
    #[arg(short, long)]
    device: Option<String>,

    /// Configuration file (JSON) for `write`
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Give up waiting for a reply after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// `read`, `write`, `save`, or any raw device command
    command: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(u8::from(cli.verbose));

    let result = CliResult::from_outcome(run(&cli));
    result.report();
    result.to_exit_code()
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let settings = AppSettings::load()?;

    let port = match &cli.device {
        Some(port) => port.clone(),
        None => find_device().context("Device not found")?,
    };
    let timeout = cli
        .timeout
        .map(Duration::from_secs)
        .or_else(|| settings.serial_timeout());
    let serial = SerialConfig::new(&port)
        .baud_rate(settings.baud_rate)
        .response_timeout(timeout);

    let cancel = CancelToken::new();
    cancel.cancel_on_ctrlc()?;

    let mut dev = SerialTransport::open(&serial, cancel.clone())
        .with_context(|| format!("Opening {port}"))?;

    match cli.command.as_str() {
        "read" => {
            let cfg = dev.read_config()?;
            println!("{}", cfg.to_display_text());
        }
        "write" => {
            let path = cli.config.as_ref().context("Config file not specified")?;
            let cfg = DeviceConfig::load(path)?;
            let password = read_password("WiFi password: ")?;
            if cancel.is_cancelled() {
                return Err(TransportError::Cancelled.into());
            }
            let resp = dev.write_config(&cfg, &password)?;
            println!("{}", resp.trim_end());
        }
        "save" => {
            let resp = dev.save_config()?;
            info!("Response {}", resp.trim_end());
        }
        other => {
            let resp = dev.command(other)?;
            info!("Response {}", resp.trim_end());
        }
    }

    Ok(())
}
