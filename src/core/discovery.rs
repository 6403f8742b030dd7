//! UDP discovery of the logger on the local network
//!
//! The client broadcasts `UUL PING` on every local IPv4 broadcast address (or
//! unicasts it to one explicit host) and waits for `UUL PONG`:
//!
//! ```text
//! client                               device
//!   | -- "UUL PING" --> 192.168.1.255:60606 |
//!   | <-------------- "UUL PONG" ---------- |   => Found(192.168.1.42)
//! ```
//!
//! Candidates are probed one at a time, each with its own receive window.

use crate::core::cancel::{CancelToken, Deadline};
use std::fmt;
use std::io::{self, ErrorKind};
#[cfg(unix)]
use std::net::SocketAddrV4;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Default UDP service port of the device
pub const DEFAULT_PORT: u16 = 60606;

/// Default receive window per candidate
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Probe payload
pub const PING: &[u8] = b"UUL PING";

/// Expected probe reply
pub const PONG: &[u8] = b"UUL PONG";

/// Largest datagram read while probing
const MAX_REPLY: usize = 512;

/// Longest single receive; the cancel token is polled in between
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Discovery errors
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// No explicit host and no broadcast-capable interface
    #[error("Networks for broadcasts not found")]
    NoNetworksAvailable,

    /// No candidate answered within one sweep
    #[error("No device answered on {candidates} candidate address(es)")]
    Timeout {
        /// Number of candidates probed
        candidates: usize,
    },

    /// Discovery loop was cancelled
    #[error("Discovery cancelled")]
    Cancelled,

    /// Socket error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Where a sweep currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryState {
    /// No device located yet
    Searching,
    /// A device answered from this address
    Found(IpAddr),
}

impl fmt::Display for DiscoveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Searching => write!(f, "Searching"),
            Self::Found(addr) => write!(f, "Found({addr})"),
        }
    }
}

/// Connectionless socket used for probing
///
/// Implemented for [`UdpSocket`]; tests substitute simulated responders.
pub trait DatagramSocket {
    /// Send one datagram
    fn send_to(&self, buf: &[u8], addr: SocketAddr) -> io::Result<usize>;

    /// Receive one datagram
    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;

    /// Bound the next receive; `None` blocks
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;
}

impl DatagramSocket for UdpSocket {
    fn send_to(&self, buf: &[u8], addr: SocketAddr) -> io::Result<usize> {
        UdpSocket::send_to(self, buf, addr)
    }

    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        UdpSocket::recv_from(self, buf)
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        UdpSocket::set_read_timeout(self, timeout)
    }
}

/// Open a broadcast-enabled socket on an ephemeral port
pub fn broadcast_socket() -> io::Result<UdpSocket> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.set_broadcast(true)?;
    Ok(socket)
}

/// Broadcast addresses of all local IPv4 interfaces
#[cfg(unix)]
pub fn local_broadcasts() -> io::Result<Vec<IpAddr>> {
    let addrs = nix::ifaddrs::getifaddrs().map_err(io::Error::from)?;
    let mut out = Vec::new();
    for ifaddr in addrs {
        let Some(broadcast) = ifaddr.broadcast else {
            continue;
        };
        if let Some(sin) = broadcast.as_sockaddr_in() {
            let ip = IpAddr::V4(*SocketAddrV4::from(*sin).ip());
            if !out.contains(&ip) {
                out.push(ip);
            }
        }
    }
    debug!("Found broadcasts {:?}", out);
    Ok(out)
}

/// Broadcast addresses of all local IPv4 interfaces (unsupported platform)
#[cfg(not(unix))]
pub fn local_broadcasts() -> io::Result<Vec<IpAddr>> {
    Ok(Vec::new())
}

/// Source of the addresses probed by a sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidates {
    /// A fixed list, usually one explicit host
    Fixed(Vec<IpAddr>),
    /// Local broadcast addresses, re-enumerated on every sweep
    LocalBroadcasts,
}

impl Candidates {
    /// Current address list
    pub fn resolve(&self) -> io::Result<Vec<IpAddr>> {
        match self {
            Self::Fixed(addrs) => Ok(addrs.clone()),
            Self::LocalBroadcasts => local_broadcasts(),
        }
    }
}

impl From<Vec<IpAddr>> for Candidates {
    fn from(addrs: Vec<IpAddr>) -> Self {
        Self::Fixed(addrs)
    }
}

/// Discovery client configuration
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Probe this host only instead of broadcasting
    pub host: Option<IpAddr>,
    /// Device UDP port
    pub port: u16,
    /// Receive window per candidate
    pub timeout: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Locates the device by probing candidate addresses
pub struct DiscoveryClient<S = UdpSocket> {
    socket: S,
    candidates: Candidates,
    port: u16,
    timeout: Duration,
    state: DiscoveryState,
}

impl DiscoveryClient {
    /// Create a client over a fresh broadcast socket
    pub fn new(config: &DiscoveryConfig) -> Result<Self, DiscoveryError> {
        let candidates = match config.host {
            Some(host) => Candidates::Fixed(vec![host]),
            None => Candidates::LocalBroadcasts,
        };
        Ok(Self::with_socket(
            broadcast_socket()?,
            candidates,
            config.port,
            config.timeout,
        ))
    }
}

impl<S: DatagramSocket> DiscoveryClient<S> {
    /// Create a client over an arbitrary socket and candidate source
    pub fn with_socket(
        socket: S,
        candidates: impl Into<Candidates>,
        port: u16,
        timeout: Duration,
    ) -> Self {
        Self {
            socket,
            candidates: candidates.into(),
            port,
            timeout,
            state: DiscoveryState::Searching,
        }
    }

    /// Current state
    pub fn state(&self) -> DiscoveryState {
        self.state
    }

    /// Where sweep addresses come from
    pub fn candidates(&self) -> &Candidates {
        &self.candidates
    }

    /// Probe every candidate once
    ///
    /// Returns the first responder. The remaining candidates are skipped, as
    /// are all of them once `cancel` fires.
    pub fn sweep(&mut self, cancel: &CancelToken) -> Result<IpAddr, DiscoveryError> {
        let targets = self.candidates.resolve()?;
        if targets.is_empty() {
            return Err(DiscoveryError::NoNetworksAvailable);
        }
        let probed = targets.len();

        for candidate in targets {
            if cancel.is_cancelled() {
                return Err(DiscoveryError::Cancelled);
            }
            if let Some(found) = self.probe(candidate, cancel)? {
                debug!("Server discovered at {}", found);
                self.state = DiscoveryState::Found(found);
                return Ok(found);
            }
        }

        Err(DiscoveryError::Timeout { candidates: probed })
    }

    /// Repeat sweeps until a device answers or `cancel` fires
    pub fn discover(&mut self, cancel: &CancelToken) -> Result<IpAddr, DiscoveryError> {
        loop {
            if cancel.is_cancelled() {
                return Err(DiscoveryError::Cancelled);
            }
            match self.sweep(cancel) {
                Ok(addr) => {
                    info!("Found logger server at {}", addr);
                    return Ok(addr);
                }
                Err(DiscoveryError::Timeout { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Send one probe and wait out its window
    fn probe(
        &self,
        candidate: IpAddr,
        cancel: &CancelToken,
    ) -> Result<Option<IpAddr>, DiscoveryError> {
        let target = SocketAddr::new(candidate, self.port);
        debug!("Send ping broadcast to {}", target);
        self.socket.send_to(PING, target)?;

        let deadline = Deadline::after(self.timeout);
        let mut buf = [0u8; MAX_REPLY];

        while let Some(remaining) = deadline.remaining() {
            if cancel.is_cancelled() {
                return Err(DiscoveryError::Cancelled);
            }
            self.socket.set_read_timeout(Some(remaining.min(POLL_INTERVAL)))?;
            match self.socket.recv_from(&mut buf) {
                Ok((n, from)) => {
                    debug!("Got response from {}: {:?}", from, String::from_utf8_lossy(&buf[..n]));
                    if &buf[..n] == PONG {
                        return Ok(Some(from.ip()));
                    }
                }
                Err(e)
                    if e.kind() == ErrorKind::WouldBlock
                        || e.kind() == ErrorKind::TimedOut
                        || e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        debug!("No answer from {}", candidate);
        Ok(None)
    }
}
