//! uul-mon - find the logger on the LAN and print its telemetry

use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::process::ExitCode;
use tracing::{debug, info, warn};
use uul_core::cli::{init_logging, CliResult};
use uul_core::{
    AppSettings, CancelToken, DiscoveryClient, LineRenderer, StreamingSession, TerminalRenderer,
};

/// UUL telemetry monitor
#[derive(Parser, Debug)]
#[command(name = "uul-mon", version, about = "Discover a UUL device and stream its telemetry")]
struct Cli {
    /// Verbose output (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Device address; broadcast discovery if omitted
    #[arg(short = 'H', long)]
    host: Option<IpAddr>,

    /// Device UDP port
    #[arg(short, long)]
    port: Option<u16>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = CliResult::from_outcome(run(&cli));
    result.report();
    result.to_exit_code()
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut settings = AppSettings::load()?;
    if let Some(port) = cli.port {
        settings.udp_port = port;
    }

    let cancel = CancelToken::new();
    cancel.cancel_on_ctrlc()?;

    let mut discovery = DiscoveryClient::new(&settings.discovery(cli.host))?;
    debug!("Discovery candidates: {:?}", discovery.candidates());
    let host = discovery.discover(&cancel)?;

    let mut session =
        StreamingSession::start(SocketAddr::new(host, settings.udp_port), settings.stream())?;
    let mut out = LineRenderer::new(TerminalRenderer::stdout());
    let result = session.run(&mut out, &cancel);

    if let Err(e) = session.stop() {
        warn!("Failed to stop stream: {}", e);
    }
    let stats = session.stats();
    info!(
        "Session ended: {} datagrams, {} lines, {} timeouts",
        stats.datagrams, stats.display, stats.timeouts
    );

    result?;
    Ok(())
}
