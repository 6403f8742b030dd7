//! Live telemetry session
//!
//! After discovery the client sends `UUL START` and the device streams every
//! captured UART chunk and power reading as one UDP datagram each. Datagrams
//! starting with `UUL` are protocol acknowledgements and are only logged;
//! everything else is decoded as text and rendered.

mod render;

pub use render::{
    is_repeating, LineRenderer, RecordingRenderer, RenderCall, Renderer, TerminalRenderer,
    REPEATING_PREFIX,
};

use crate::core::cancel::CancelToken;
use crate::core::discovery::DatagramSocket;
use std::io::{self, ErrorKind};
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Reserved prefix of control datagrams
pub const CONTROL_PREFIX: &[u8] = b"UUL";

/// Asks the device to stream to the sender
pub const START: &[u8] = b"UUL START";

/// Asks the device to stop streaming
pub const STOP: &[u8] = b"UUL STOP";

/// Default receive buffer, matching the device's datagram limit
pub const DEFAULT_MAX_DATAGRAM: usize = 512;

/// Default receive timeout
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(3);

/// Streaming errors
#[derive(Error, Debug)]
pub enum StreamError {
    /// Socket or output error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// One decoded datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryLine {
    /// Protocol traffic, never shown
    Control(Vec<u8>),
    /// Trimmed text for the terminal
    Display(String),
}

impl TelemetryLine {
    /// Classify and decode a raw payload
    ///
    /// Invalid UTF-8 sequences are dropped rather than failing the line.
    pub fn classify(payload: &[u8]) -> Self {
        if payload.starts_with(CONTROL_PREFIX) {
            return Self::Control(payload.to_vec());
        }
        let (text, dropped) = decode_utf8_ignore(payload);
        if dropped > 0 {
            debug!("Dropped {} undecodable byte(s)", dropped);
        }
        Self::Display(text.trim().to_string())
    }
}

/// Decode UTF-8, skipping invalid sequences; returns the number of bytes skipped
pub fn decode_utf8_ignore(mut bytes: &[u8]) -> (String, usize) {
    let mut out = String::with_capacity(bytes.len());
    let mut dropped = 0;

    loop {
        match std::str::from_utf8(bytes) {
            Ok(valid) => {
                out.push_str(valid);
                return (out, dropped);
            }
            Err(e) => {
                let (valid, rest) = bytes.split_at(e.valid_up_to());
                out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                let skip = e.error_len().unwrap_or(rest.len());
                dropped += skip;
                bytes = &rest[skip..];
            }
        }
    }
}

/// Counters for one session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Datagrams received
    pub datagrams: u64,
    /// Control datagrams among them
    pub control: u64,
    /// Display lines rendered
    pub display: u64,
    /// Receive timeouts
    pub timeouts: u64,
}

/// Streaming session settings
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Receive buffer size
    pub max_datagram: usize,
    /// Per-receive timeout; a timeout is logged and the loop continues
    pub receive_timeout: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_datagram: DEFAULT_MAX_DATAGRAM,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
        }
    }
}

/// Telemetry session with one device
pub struct StreamingSession<S = UdpSocket> {
    socket: S,
    device: SocketAddr,
    config: StreamConfig,
    stats: SessionStats,
}

impl StreamingSession {
    /// Bind an ephemeral socket and ask `device` to start streaming
    pub fn start(device: SocketAddr, config: StreamConfig) -> Result<Self, StreamError> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        Self::with_socket(socket, device, config)
    }
}

impl<S: DatagramSocket> StreamingSession<S> {
    /// Send the start command over an existing socket
    pub fn with_socket(socket: S, device: SocketAddr, config: StreamConfig) -> Result<Self, StreamError> {
        debug!("Send start to {}", device);
        socket.send_to(START, device)?;
        Ok(Self {
            socket,
            device,
            config,
            stats: SessionStats::default(),
        })
    }

    /// Device address
    pub fn device(&self) -> SocketAddr {
        self.device
    }

    /// Counters so far
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Ask the device to stop streaming
    pub fn stop(&self) -> Result<(), StreamError> {
        debug!("Send stop to {}", self.device);
        self.socket.send_to(STOP, self.device)?;
        Ok(())
    }

    /// Receive and render until `cancel` fires
    pub fn run<R: Renderer>(
        &mut self,
        out: &mut LineRenderer<R>,
        cancel: &CancelToken,
    ) -> Result<(), StreamError> {
        self.socket.set_read_timeout(Some(self.config.receive_timeout))?;
        let mut buf = vec![0u8; self.config.max_datagram];

        while !cancel.is_cancelled() {
            match self.socket.recv_from(&mut buf) {
                Ok((n, from)) => self.handle(&buf[..n], from, out)?,
                Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                    self.stats.timeouts += 1;
                    debug!("Timeout");
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Classify and render one datagram
    pub fn handle<R: Renderer>(
        &mut self,
        payload: &[u8],
        from: SocketAddr,
        out: &mut LineRenderer<R>,
    ) -> Result<(), StreamError> {
        self.stats.datagrams += 1;
        match TelemetryLine::classify(payload) {
            TelemetryLine::Control(data) => {
                self.stats.control += 1;
                debug!("Got response from {}: {:?}", from, String::from_utf8_lossy(&data));
                if data.starts_with(b"UUL ERR") {
                    warn!("Device error: {}", String::from_utf8_lossy(&data));
                }
            }
            TelemetryLine::Display(text) => {
                self.stats.display += 1;
                out.render(&text)?;
            }
        }
        Ok(())
    }
}
