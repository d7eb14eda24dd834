//! NTP fixed-point time values.
//!
//! NTP carries time as unsigned fixed-point numbers counted from
//! 1900-01-01: 32.32 for the four packet timestamps and 16.16 for the
//! root delay and root dispersion fields. Conversion from floating-point
//! seconds truncates the integer part toward zero and floors the scaled
//! fractional part, so values reconstructed with [`join_fixed`] never
//! exceed the original.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::packet::CodecError;

/// Seconds between the NTP epoch (1900-01-01) and the Unix epoch (1970-01-01).
///
/// 25 567 days of 86 400 seconds.
pub const NTP_DELTA: u64 = 25_567 * 86_400;

/// Split floating-point seconds into an integer part and a fraction of `2^frac_bits`.
///
/// The integer part is truncated toward zero; the fraction is
/// `floor(|value - trunc(value)| * 2^frac_bits)`, saturated to `2^frac_bits - 1`.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    reason = "Fixed-point scaling works on values already bounded by the caller"
)]
pub fn split_fixed(value: f64, frac_bits: u32) -> (i64, u64) {
    let scale = (1u64 << frac_bits) as f64;
    let integer = value.trunc();
    let fraction = ((value - integer).abs() * scale).floor() as u64;
    (integer as i64, fraction.min((1u64 << frac_bits) - 1))
}

/// Rebuild floating-point seconds from an integer part and a fraction of `2^frac_bits`.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    reason = "NTP values fit well inside the f64 mantissa for the seconds part"
)]
pub fn join_fixed(integer: i64, fraction: u64, frac_bits: u32) -> f64 {
    integer as f64 + fraction as f64 / (1u64 << frac_bits) as f64
}

/// Convert seconds on the NTP timescale to seconds since the Unix epoch
#[must_use]
#[allow(clippy::cast_precision_loss, reason = "NTP_DELTA is exactly representable")]
pub fn ntp_to_system_time(timestamp: f64) -> f64 {
    timestamp - NTP_DELTA as f64
}

/// Convert seconds since the Unix epoch to seconds on the NTP timescale
#[must_use]
#[allow(clippy::cast_precision_loss, reason = "NTP_DELTA is exactly representable")]
pub fn system_to_ntp_time(timestamp: f64) -> f64 {
    timestamp + NTP_DELTA as f64
}

/// NTP timestamp (64-bit, seconds since 1900-01-01)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NtpTimestamp {
    /// Seconds since NTP epoch
    pub seconds: u32,
    /// Fractional seconds (1/2^32 of a second)
    pub fraction: u32,
}

impl NtpTimestamp {
    /// Zero timestamp, used for unset fields
    pub const ZERO: Self = Self {
        seconds: 0,
        fraction: 0,
    };

    /// Create a timestamp from its two halves
    #[must_use]
    pub const fn new(seconds: u32, fraction: u32) -> Self {
        Self { seconds, fraction }
    }

    /// Create from current system time
    #[must_use]
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Create from a [`SystemTime`]
    ///
    /// Times before the Unix epoch collapse to the Unix epoch. Seconds wrap
    /// at the end of NTP era 0 like every 32-bit NTP implementation.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        reason = "NTP seconds wrap per era; fraction fits in u32"
    )]
    pub fn from_system_time(time: SystemTime) -> Self {
        let since_unix = time.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);

        let seconds = since_unix.as_secs() + NTP_DELTA;
        let fraction = (u64::from(since_unix.subsec_nanos()) << 32) / 1_000_000_000;

        Self {
            seconds: seconds as u32,
            fraction: fraction as u32,
        }
    }

    /// Create from floating-point seconds on the NTP timescale
    ///
    /// # Errors
    ///
    /// Returns `CodecError::ValueOutOfRange` if the value is negative, not
    /// finite, or its integer part does not fit in 32 bits.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "Range checked before narrowing"
    )]
    pub fn from_secs_f64(value: f64) -> Result<Self, CodecError> {
        if !value.is_finite() || value < 0.0 || value >= 4_294_967_296.0 {
            return Err(CodecError::ValueOutOfRange {
                field: "timestamp",
                value,
            });
        }

        let (integer, fraction) = split_fixed(value, 32);
        Ok(Self {
            seconds: integer as u32,
            fraction: fraction as u32,
        })
    }

    /// Convert to floating-point seconds on the NTP timescale
    #[must_use]
    pub fn as_secs_f64(&self) -> f64 {
        join_fixed(i64::from(self.seconds), u64::from(self.fraction), 32)
    }

    /// Convert to floating-point seconds since the Unix epoch
    #[must_use]
    pub fn to_system_secs_f64(&self) -> f64 {
        ntp_to_system_time(self.as_secs_f64())
    }

    /// Convert to the 64-bit wire value
    #[must_use]
    pub fn to_bits(&self) -> u64 {
        (u64::from(self.seconds) << 32) | u64::from(self.fraction)
    }

    /// Create from the 64-bit wire value
    #[must_use]
    #[allow(clippy::cast_possible_truncation, reason = "Splitting a u64 into halves")]
    pub fn from_bits(value: u64) -> Self {
        Self {
            seconds: (value >> 32) as u32,
            fraction: value as u32,
        }
    }

    /// Signed difference `self - other` in seconds
    ///
    /// Computed on the exact fixed-point values before converting to `f64`.
    #[must_use]
    #[allow(clippy::cast_precision_loss, reason = "Differences are small in practice")]
    pub fn diff_secs(&self, other: &Self) -> f64 {
        let diff = i128::from(self.to_bits()) - i128::from(other.to_bits());
        diff as f64 / 4_294_967_296.0
    }
}

/// NTP short format (32-bit, 16.16 fixed-point seconds)
///
/// Used for root delay and root dispersion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NtpShort {
    /// Whole seconds
    pub seconds: u16,
    /// Fractional seconds (1/2^16 of a second)
    pub fraction: u16,
}

impl NtpShort {
    /// Create from floating-point seconds
    ///
    /// # Errors
    ///
    /// Returns `CodecError::ValueOutOfRange` if the value is negative, not
    /// finite, or its integer part does not fit in 16 bits.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "Range checked before narrowing"
    )]
    pub fn from_secs_f64(value: f64) -> Result<Self, CodecError> {
        if !value.is_finite() || value < 0.0 || value >= 65_536.0 {
            return Err(CodecError::ValueOutOfRange {
                field: "short",
                value,
            });
        }

        let (integer, fraction) = split_fixed(value, 16);
        Ok(Self {
            seconds: integer as u16,
            fraction: fraction as u16,
        })
    }

    /// Convert to floating-point seconds
    #[must_use]
    pub fn as_secs_f64(&self) -> f64 {
        join_fixed(i64::from(self.seconds), u64::from(self.fraction), 16)
    }

    /// Convert to the 32-bit wire value
    #[must_use]
    pub fn to_bits(&self) -> u32 {
        (u32::from(self.seconds) << 16) | u32::from(self.fraction)
    }

    /// Create from the 32-bit wire value
    #[must_use]
    #[allow(clippy::cast_possible_truncation, reason = "Splitting a u32 into halves")]
    pub fn from_bits(value: u32) -> Self {
        Self {
            seconds: (value >> 16) as u16,
            fraction: value as u16,
        }
    }
}
