// src/error.rs - Sender error types
use std::io;
use std::time::Duration;
use thiserror::Error;

use crate::sender::SenderState;

/// Why the serial channel could not be opened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnavailableReason {
    #[error("device not found")]
    DeviceMissing,
    #[error("permission denied")]
    PermissionDenied,
    #[error("device busy")]
    Busy,
    #[error("{0}")]
    Other(String),
}

impl From<&io::Error> for UnavailableReason {
    fn from(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => UnavailableReason::DeviceMissing,
            io::ErrorKind::PermissionDenied => UnavailableReason::PermissionDenied,
            io::ErrorKind::ResourceBusy => UnavailableReason::Busy,
            _ => UnavailableReason::Other(err.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Cannot open serial port {device}: {reason}")]
    ChannelUnavailable {
        device: String,
        reason: UnavailableReason,
    },
    #[error("Serial write did not complete within {0:?}")]
    WriteTimeout(Duration),
    #[error("Serial I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Sender is {actual:?}, operation requires {expected:?}")]
    InvalidState {
        expected: SenderState,
        actual: SenderState,
    },
}

impl SyncError {
    pub fn unavailable(device: &str, err: &io::Error) -> Self {
        SyncError::ChannelUnavailable {
            device: device.to_string(),
            reason: err.into(),
        }
    }

    pub fn is_channel_unavailable(&self) -> bool {
        matches!(self, SyncError::ChannelUnavailable { .. })
    }
}
