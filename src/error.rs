use std::io;
use thiserror::Error;

use crate::client::NtpError;
use crate::delivery::DeliveryError;
use crate::protocol::distribution::FrameError;
use crate::protocol::ntp::CodecError;
use crate::sink::SinkError;

/// Errors that can occur while running NTD synchronization
#[derive(Debug, Error)]
pub enum SyncError {
    // ===== Protocol Errors =====
    /// NTP packet encoding/decoding failed
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Upstream NTP query failed
    #[error("NTP query failed: {0}")]
    Ntp(#[from] NtpError),

    /// Distribution frame could not be built
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Delivery to a single device failed
    #[error("delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    // ===== Log Sink Errors =====
    /// Sync attempt records could not be stored or read back
    #[error("log sink error: {0}")]
    Sink(#[from] SinkError),

    // ===== Control Errors =====
    /// A synchronization loop is already running
    #[error("synchronization already running against {server}")]
    AlreadyRunning {
        /// Upstream server of the running loop
        server: String,
    },

    /// No synchronization loop is running
    #[error("synchronization not running")]
    NotRunning,

    /// Invalid configuration value
    #[error("invalid configuration: {name} - {message}")]
    InvalidConfig {
        /// The name of the setting
        name: String,
        /// Description of the error
        message: String,
    },

    /// Control-plane payload could not be parsed
    #[error("invalid request payload: {0}")]
    InvalidRequest(#[from] serde_json::Error),

    // ===== I/O Errors =====
    /// I/O error outside a single device or upstream exchange
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SyncError {
    /// Check if this error is recoverable by retrying on a later cycle
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Ntp(_)
                | Self::Delivery(_)
                | Self::Io(_)
                | Self::Sink(SinkError::Io(_))
        )
    }

    /// Check if this error was raised by the control plane rather than by a cycle
    #[must_use]
    pub fn is_control_error(&self) -> bool {
        matches!(
            self,
            Self::AlreadyRunning { .. }
                | Self::NotRunning
                | Self::InvalidConfig { .. }
                | Self::InvalidRequest(_)
        )
    }
}

/// Result type alias for synchronization operations
pub type Result<T> = std::result::Result<T, SyncError>;
