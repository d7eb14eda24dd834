use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::corrected::CorrectedTimestamp;

/// Outcome of one delivery attempt to one display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncStatus {
    /// Connect, send and acknowledgment read all completed
    #[serde(rename = "Synchronized")]
    Synchronized,
    /// Any failure anywhere in the session
    #[serde(rename = "Not Connected")]
    NotConnected,
}

impl SyncStatus {
    /// Label stored in the log
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Synchronized => "Synchronized",
            Self::NotConnected => "Not Connected",
        }
    }

    /// Check if the display took the time
    #[must_use]
    pub fn is_synchronized(&self) -> bool {
        matches!(self, Self::Synchronized)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One log entry per display per cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncAttemptRecord {
    /// When the attempt finished
    pub timestamp: DateTime<Utc>,
    /// Display address
    pub ip: IpAddr,
    /// Attempt outcome
    pub status: SyncStatus,
    /// Bias in effect for the cycle
    pub bias: i64,
    /// Corrected time distributed in the cycle (seconds since the Unix epoch)
    pub corrected_time: i64,
}

impl SyncAttemptRecord {
    /// Create a record stamped with the current time
    #[must_use]
    pub fn new(ip: IpAddr, status: SyncStatus, bias: i64, corrected: CorrectedTimestamp) -> Self {
        Self {
            timestamp: Utc::now(),
            ip,
            status,
            bias,
            corrected_time: corrected.as_secs(),
        }
    }
}
