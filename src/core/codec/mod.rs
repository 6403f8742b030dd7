//! Device configuration codec
//!
//! The device exchanges its settings over serial as a colon-delimited ASCII
//! frame. Pin assignments travel as single integers whose bytes are the
//! individual pins, low byte first:
//!
//! ```text
//! read:   config:<ssid>:<port>:<uarts>:<screen>:<ina>
//! write:  <ssid>:<password>:<port>:<uarts>:<screen>:<ina>
//! ```

mod wire;

pub use wire::{DeviceConfig, CONFIG_LITERAL};

/// Codec errors
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Wire string does not match the expected frame
    #[error("Malformed wire format: {reason} in {input:?}")]
    MalformedWireFormat {
        /// What was wrong
        reason: String,
        /// The offending input
        input: String,
    },
}

impl CodecError {
    pub(crate) fn malformed(reason: impl Into<String>, input: &str) -> Self {
        Self::MalformedWireFormat {
            reason: reason.into(),
            input: input.to_string(),
        }
    }
}

/// Split an integer into its `N` low bytes, least significant first
///
/// Bits above `8 * N` are dropped. Negative values are truncated in two's
/// complement, the same as masking with `0xFF` after each shift.
pub fn unpack_le<const N: usize>(value: i64) -> [u8; N] {
    let bytes = value.to_le_bytes();
    let mut out = [0u8; N];
    let n = N.min(bytes.len());
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

/// Reassemble bytes (least significant first) into an integer
pub fn pack_le(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .take(4)
        .enumerate()
        .fold(0u32, |acc, (i, b)| acc | (u32::from(*b) << (8 * i)))
}
