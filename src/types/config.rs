use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::roster::DeviceRoster;
use crate::error::{Result, SyncError};
use crate::protocol::distribution::DISTRIBUTION_PORT;
use crate::protocol::ntp::{DEFAULT_VERSION, NTP_PORT};

/// Which calendar the corrected time is broken down in before it is sent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarZone {
    /// Host local time zone (the displays show local wall-clock time)
    #[default]
    Local,
    /// Coordinated Universal Time
    Utc,
}

/// Configuration for one synchronization loop
///
/// Captured once when the loop starts and owned by it for its lifetime.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Upstream NTP server (host name or address)
    pub server: String,

    /// Time between cycles (default: 1 minute)
    pub interval: Duration,

    /// Seconds added to the upstream transmit time before distribution
    pub bias: i64,

    /// NTP version placed in outbound requests (default: 3)
    pub ntp_version: u8,

    /// Upstream NTP port (default: 123)
    pub ntp_port: u16,

    /// Budget for one upstream exchange (default: 5 seconds)
    pub ntp_timeout: Duration,

    /// TCP port the displays listen on (default: 10000)
    pub device_port: u16,

    /// Budget for one device session (default: 5 seconds)
    pub delivery_timeout: Duration,

    /// Upper bound on the acknowledgment read (default: 1024 bytes)
    pub ack_buffer_size: usize,

    /// Maximum concurrent device sessions (default: 16)
    pub max_in_flight: usize,

    /// Calendar used to break down the corrected time (default: local)
    pub calendar: CalendarZone,

    /// Displays to synchronize
    pub roster: DeviceRoster,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            server: "pool.ntp.org".to_string(),
            interval: Duration::from_secs(60),
            bias: 0,
            ntp_version: DEFAULT_VERSION,
            ntp_port: NTP_PORT,
            ntp_timeout: Duration::from_secs(5),
            device_port: DISTRIBUTION_PORT,
            delivery_timeout: Duration::from_secs(5),
            ack_buffer_size: 1024,
            max_in_flight: 16,
            calendar: CalendarZone::Local,
            roster: DeviceRoster::default(),
        }
    }
}

impl SyncConfig {
    /// Create a new config builder
    #[must_use]
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }

    /// Check the settings a loop cannot run without
    ///
    /// # Errors
    ///
    /// Returns `SyncError::InvalidConfig` naming the first offending setting.
    pub fn validate(&self) -> Result<()> {
        if self.server.trim().is_empty() {
            return Err(invalid("server", "must not be empty"));
        }
        if self.interval.is_zero() {
            return Err(invalid("interval", "must be greater than zero"));
        }
        if !(1..=4).contains(&self.ntp_version) {
            return Err(invalid("ntp_version", "must be between 1 and 4"));
        }
        if self.max_in_flight == 0 {
            return Err(invalid("max_in_flight", "must be at least 1"));
        }
        if self.ack_buffer_size == 0 {
            return Err(invalid("ack_buffer_size", "must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(name: &str, message: &str) -> SyncError {
    SyncError::InvalidConfig {
        name: name.to_string(),
        message: message.to_string(),
    }
}

/// Builder for `SyncConfig`
#[derive(Debug, Clone, Default)]
pub struct SyncConfigBuilder {
    config: SyncConfig,
}

impl SyncConfigBuilder {
    /// Set upstream server
    #[must_use]
    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.config.server = server.into();
        self
    }

    /// Set cycle interval
    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    /// Set cycle interval in minutes
    #[must_use]
    pub fn interval_minutes(mut self, minutes: u64) -> Self {
        self.config.interval = Duration::from_secs(minutes.saturating_mul(60));
        self
    }

    /// Set bias in seconds
    #[must_use]
    pub fn bias(mut self, bias: i64) -> Self {
        self.config.bias = bias;
        self
    }

    /// Set NTP version for outbound requests
    #[must_use]
    pub fn ntp_version(mut self, version: u8) -> Self {
        self.config.ntp_version = version;
        self
    }

    /// Set upstream NTP port
    #[must_use]
    pub fn ntp_port(mut self, port: u16) -> Self {
        self.config.ntp_port = port;
        self
    }

    /// Set upstream exchange timeout
    #[must_use]
    pub fn ntp_timeout(mut self, timeout: Duration) -> Self {
        self.config.ntp_timeout = timeout;
        self
    }

    /// Set display TCP port
    #[must_use]
    pub fn device_port(mut self, port: u16) -> Self {
        self.config.device_port = port;
        self
    }

    /// Set device session timeout
    #[must_use]
    pub fn delivery_timeout(mut self, timeout: Duration) -> Self {
        self.config.delivery_timeout = timeout;
        self
    }

    /// Set acknowledgment read bound
    #[must_use]
    pub fn ack_buffer_size(mut self, size: usize) -> Self {
        self.config.ack_buffer_size = size;
        self
    }

    /// Set maximum concurrent device sessions
    #[must_use]
    pub fn max_in_flight(mut self, max: usize) -> Self {
        self.config.max_in_flight = max;
        self
    }

    /// Set calendar used for the distribution frame
    #[must_use]
    pub fn calendar(mut self, calendar: CalendarZone) -> Self {
        self.config.calendar = calendar;
        self
    }

    /// Set displays to synchronize
    #[must_use]
    pub fn roster(mut self, roster: DeviceRoster) -> Self {
        self.config.roster = roster;
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> SyncConfig {
        self.config
    }
}
