//! # UUL Core Library
//!
//! Host side of the UUL UART-over-UDP logger:
//! - Serial configuration console (`getconfig` / `setconfig` / `save`)
//! - Colon-delimited configuration codec with packed pin bytes
//! - UDP broadcast discovery (`UUL PING` / `UUL PONG`)
//! - Telemetry streaming with in-place rendering of power readings
//!
//! ## Example
//!
//! ```rust,no_run
//! use uul_core::{CancelToken, DiscoveryClient, DiscoveryConfig, LineRenderer,
//!                StreamConfig, StreamingSession, TerminalRenderer};
//! use std::net::SocketAddr;
//!
//! fn main() -> anyhow::Result<()> {
//!     let cancel = CancelToken::new();
//!     let config = DiscoveryConfig::default();
//!     let host = DiscoveryClient::new(&config)?.discover(&cancel)?;
//!
//!     let mut session = StreamingSession::start(
//!         SocketAddr::new(host, config.port),
//!         StreamConfig::default(),
//!     )?;
//!     let mut out = LineRenderer::new(TerminalRenderer::stdout());
//!     session.run(&mut out, &cancel)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod core;

// Re-exports for convenience
pub use crate::cli::{CliResult, ExitCodes};
pub use crate::config::{AppSettings, ConfigError};
pub use crate::core::cancel::{CancelToken, Deadline};
pub use crate::core::codec::{CodecError, DeviceConfig};
pub use crate::core::discovery::{
    Candidates, DatagramSocket, DiscoveryClient, DiscoveryConfig, DiscoveryError, DiscoveryState,
};
pub use crate::core::stream::{
    LineRenderer, RecordingRenderer, RenderCall, Renderer, StreamConfig, StreamError,
    StreamingSession, TelemetryLine, TerminalRenderer,
};
pub use crate::core::transport::{
    find_device, DeviceCommand, SerialConfig, SerialTransport, TransportError,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
