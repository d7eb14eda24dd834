//! Control-plane payloads

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use super::config::SyncConfig;
use crate::error::{Result, SyncError};

/// Body of a start-synchronization command
///
/// ```json
/// {"server": "10.0.0.1", "sync_time": "5", "bias": "-2"}
/// ```
///
/// `sync_time` is in minutes. Numbers are accepted either as JSON numbers
/// or as numeric strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartSyncRequest {
    /// Upstream NTP server
    pub server: String,
    /// Minutes between cycles
    #[serde(deserialize_with = "int_or_string")]
    pub sync_time: i64,
    /// Seconds added to the upstream time
    #[serde(deserialize_with = "int_or_string")]
    pub bias: i64,
}

impl StartSyncRequest {
    /// Create a request
    #[must_use]
    pub fn new(server: impl Into<String>, sync_time: i64, bias: i64) -> Self {
        Self {
            server: server.into(),
            sync_time,
            bias,
        }
    }

    /// Parse a JSON request body
    ///
    /// # Errors
    ///
    /// Returns `SyncError::InvalidRequest` if the body is not a valid request.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Overlay this request on a base configuration
    ///
    /// # Errors
    ///
    /// Returns `SyncError::InvalidConfig` for a negative interval or when the
    /// resulting configuration fails validation.
    pub fn apply_to(&self, base: &SyncConfig) -> Result<SyncConfig> {
        let minutes = u64::try_from(self.sync_time).map_err(|_| SyncError::InvalidConfig {
            name: "sync_time".to_string(),
            message: format!("must not be negative, got {}", self.sync_time),
        })?;

        let config = SyncConfig {
            server: self.server.trim().to_string(),
            interval: Duration::from_secs(minutes.saturating_mul(60)),
            bias: self.bias,
            ..base.clone()
        };
        config.validate()?;
        Ok(config)
    }
}

/// Acknowledgment returned when a loop has been started
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncAck {
    /// Human-readable status
    pub status: String,
}

impl SyncAck {
    /// Acknowledgment for a started loop
    #[must_use]
    pub fn started() -> Self {
        Self {
            status: "Synchronization started".to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntOrString {
    Int(i64),
    Str(String),
}

fn int_or_string<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match IntOrString::deserialize(deserializer)? {
        IntOrString::Int(value) => Ok(value),
        IntOrString::Str(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}
