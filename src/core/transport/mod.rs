//! Transport layer for talking to the device
//!
//! The configuration channel is a plain serial line carrying newline-framed
//! ASCII commands. See [`SerialTransport`].

mod serial;

pub use serial::{
    find_device, list_ports, select_device, DeviceCommand, SerialConfig, SerialTransport,
    DEFAULT_BAUD_RATE,
};

use crate::core::codec::CodecError;
use thiserror::Error;

/// Transport error types
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// No reply within the configured deadline
    #[error("No response after {0:?}")]
    Timeout(std::time::Duration),

    /// Wait aborted through a cancel token
    #[error("Cancelled")]
    Cancelled,

    /// Port not found
    #[error("Port not found: {0}")]
    PortNotFound(String),

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Peer closed the line
    #[error("Disconnected")]
    Disconnected,

    /// Reply could not be decoded
    #[error(transparent)]
    Codec(#[from] CodecError),
}
