use std::fmt;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

use super::config::CalendarZone;
use crate::protocol::ntp::NtpExchangeResult;

/// Upstream transmit time plus bias, rounded to whole seconds since the Unix epoch
///
/// Recomputed every cycle and shared by every display in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CorrectedTimestamp(i64);

impl CorrectedTimestamp {
    /// Wrap whole seconds since the Unix epoch
    #[must_use]
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs)
    }

    /// `round(transmit + bias)`, halves rounded away from zero
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        reason = "Unix seconds and operator bias are far inside both ranges"
    )]
    pub fn from_transmit(transmit_secs: f64, bias: i64) -> Self {
        Self((transmit_secs + bias as f64).round() as i64)
    }

    /// Corrected time for a completed exchange
    #[must_use]
    pub fn from_exchange(result: &NtpExchangeResult, bias: i64) -> Self {
        Self::from_transmit(result.transmit_time(), bias)
    }

    /// Seconds since the Unix epoch
    #[must_use]
    pub const fn as_secs(&self) -> i64 {
        self.0
    }

    /// Break down into a calendar date and time
    ///
    /// Returns `None` when the value has no representation in the calendar.
    #[must_use]
    pub fn to_calendar(&self, zone: CalendarZone) -> Option<NaiveDateTime> {
        match zone {
            CalendarZone::Utc => DateTime::from_timestamp(self.0, 0).map(|dt| dt.naive_utc()),
            CalendarZone::Local => Local
                .timestamp_opt(self.0, 0)
                .single()
                .map(|dt| dt.naive_local()),
        }
    }
}

impl fmt::Display for CorrectedTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
