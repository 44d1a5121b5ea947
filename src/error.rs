// PulseWatch: Error Types
//
// Startup errors are fatal (or retried forever, for Wi-Fi association).
// Everything raised inside a tick is logged and the loop carries on.

use thiserror::Error;

/// Raised by the payload builder. A config/programming error: the tick is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("failed to encode record: {0}")]
    Encode(String),
}

/// Failure reported by a [`Transport`](crate::delivery::Transport) before any
/// HTTP status was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    TimedOut,
    #[error("network not connected")]
    NotConnected,
    #[error("transport failure: {0}")]
    Io(String),
}

/// Why a single delivery attempt did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),
}

impl DeliveryError {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Errors that can stop the device before the first tick.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("pulse-oximeter sensor not found: {0}")]
    SensorInit(String),
    #[error("network association failed: {0}")]
    NetworkAssociation(String),
    #[error("wall clock never synchronised")]
    TimeSync,
}
