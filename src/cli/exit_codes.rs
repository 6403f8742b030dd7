//! CLI Exit Codes
//!
//! Standard exit codes for CLI operations and automation.

use crate::config::ConfigError;
use crate::core::codec::CodecError;
use crate::core::discovery::DiscoveryError;
use crate::core::stream::StreamError;
use crate::core::transport::TransportError;
use std::process::ExitCode;

/// Exit code constants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCodes;

impl ExitCodes {
    /// Success
    pub const SUCCESS: u8 = 0;

    /// General error
    pub const ERROR: u8 = 1;

    /// Connection failed
    pub const CONNECTION_FAILED: u8 = 3;

    /// Connection timeout
    pub const TIMEOUT: u8 = 4;

    /// File not found
    pub const FILE_NOT_FOUND: u8 = 6;

    /// Permission denied
    pub const PERMISSION_DENIED: u8 = 7;

    /// Configuration error
    pub const CONFIG_ERROR: u8 = 8;

    /// Protocol error
    pub const PROTOCOL_ERROR: u8 = 9;

    /// User cancelled
    pub const CANCELLED: u8 = 11;

    /// Device not found
    pub const DEVICE_NOT_FOUND: u8 = 12;

    /// Port not found
    pub const PORT_NOT_FOUND: u8 = 14;
}

/// CLI operation result
#[derive(Debug)]
pub enum CliResult {
    /// Success
    Success,

    /// Error with code and message
    Error(u8, String),
}

impl CliResult {
    /// Plain success
    pub fn success() -> Self {
        Self::Success
    }

    /// Get exit code
    pub fn code(&self) -> u8 {
        match self {
            Self::Success => ExitCodes::SUCCESS,
            Self::Error(code, _) => *code,
        }
    }

    /// Get message
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Error(_, msg) => Some(msg),
            Self::Success => None,
        }
    }

    /// Convert to ExitCode
    pub fn to_exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }

    /// Is success?
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Outcome of a binary's `run`
    pub fn from_outcome(outcome: anyhow::Result<()>) -> Self {
        match outcome {
            Ok(()) => Self::success(),
            Err(e) => Self::from_error(&e),
        }
    }

    /// Report an error on stderr; success prints nothing
    pub fn report(&self) {
        if let Self::Error(code, msg) = self {
            eprintln!("Error: {msg} ({})", exit_code_description(*code));
        }
    }

    /// Map a top-level error to its exit code
    ///
    /// Walks the error chain and classifies the first library error found.
    pub fn from_error(err: &anyhow::Error) -> Self {
        let code = err
            .chain()
            .find_map(classify)
            .unwrap_or(ExitCodes::ERROR);
        Self::Error(code, format!("{err:#}"))
    }
}

fn classify(err: &(dyn std::error::Error + 'static)) -> Option<u8> {
    if let Some(e) = err.downcast_ref::<TransportError>() {
        return Some(match e {
            TransportError::ConnectionFailed(_)
            | TransportError::Disconnected
            | TransportError::IoError(_) => ExitCodes::CONNECTION_FAILED,
            TransportError::Timeout(_) => ExitCodes::TIMEOUT,
            TransportError::Cancelled => ExitCodes::CANCELLED,
            TransportError::PortNotFound(_) => ExitCodes::PORT_NOT_FOUND,
            TransportError::PermissionDenied(_) => ExitCodes::PERMISSION_DENIED,
            TransportError::Codec(_) => ExitCodes::PROTOCOL_ERROR,
        });
    }
    if err.downcast_ref::<CodecError>().is_some() {
        return Some(ExitCodes::PROTOCOL_ERROR);
    }
    if let Some(e) = err.downcast_ref::<DiscoveryError>() {
        return Some(match e {
            DiscoveryError::NoNetworksAvailable | DiscoveryError::Timeout { .. } => {
                ExitCodes::DEVICE_NOT_FOUND
            }
            DiscoveryError::Cancelled => ExitCodes::CANCELLED,
            DiscoveryError::Io(_) => ExitCodes::CONNECTION_FAILED,
        });
    }
    if err.downcast_ref::<StreamError>().is_some() {
        return Some(ExitCodes::CONNECTION_FAILED);
    }
    if let Some(e) = err.downcast_ref::<ConfigError>() {
        return Some(match e {
            ConfigError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                ExitCodes::FILE_NOT_FOUND
            }
            _ => ExitCodes::CONFIG_ERROR,
        });
    }
    None
}

/// Exit code description
pub fn exit_code_description(code: u8) -> &'static str {
    match code {
        0 => "Success",
        1 => "General error",
        3 => "Connection failed",
        4 => "Connection timeout",
        6 => "File not found",
        7 => "Permission denied",
        8 => "Configuration error",
        9 => "Protocol error",
        11 => "Operation cancelled",
        12 => "Device not found",
        14 => "Port not found",
        _ => "Unknown error",
    }
}
