//! Core module containing the protocol engines
//!
//! This module provides:
//! - Configuration codec for the serial console
//! - Serial transport (line-oriented request/response)
//! - UDP discovery client
//! - Telemetry streaming session and rendering
//! - Cancellation tokens and deadlines for blocking calls

pub mod cancel;
pub mod codec;
pub mod discovery;
pub mod stream;
pub mod transport;
