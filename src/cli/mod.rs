//! CLI Module
//!
//! Shared pieces of the command-line tools:
//! - Exit codes for automation
//! - Password prompt
//! - Log setup

pub mod exit_codes;
pub mod prompt;

pub use exit_codes::{CliResult, ExitCodes};
pub use prompt::read_password;

use tracing_subscriber::EnvFilter;

/// Install the stderr log subscriber
///
/// `verbosity` 0 logs at info, anything above at debug. `RUST_LOG` overrides
/// both.
pub fn init_logging(verbosity: u8) {
    let level = if verbosity == 0 { "info" } else { "debug" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
