use bytes::{BufMut, Bytes, BytesMut};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use thiserror::Error;

use crate::types::{CalendarZone, CorrectedTimestamp};

/// Constant preamble every display expects
pub const FRAME_HEADER: [u8; 28] = [
    0x55, 0xAA, 0x00, 0x00, 0x01, 0x01, 0x00, 0xC1, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0F, 0x00, //
    0x00, 0x00, 0x0F, 0x00, 0x10, 0x00, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x00,
];

/// Constant trailer, CR/LF terminated
pub const FRAME_FOOTER: [u8; 4] = [0x00, 0x00, 0x0D, 0x0A];

/// Encoded frame size
pub const FRAME_LEN: usize = FRAME_HEADER.len() + 7 + FRAME_FOOTER.len();

/// Distribution frame errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Seconds value has no calendar representation
    #[error("timestamp {secs} has no calendar representation")]
    InvalidTimestamp {
        /// Seconds since the Unix epoch
        secs: i64,
    },

    /// Year does not fit in the two year bytes
    #[error("year {year} out of range")]
    YearOutOfRange {
        /// Calendar year
        year: i32,
    },

    /// Frame has the wrong length
    #[error("frame length {have}, expected {expected}")]
    BadLength {
        /// Required length
        expected: usize,
        /// Supplied length
        have: usize,
    },

    /// Header or footer bytes differ from the constants
    #[error("frame envelope mismatch")]
    BadEnvelope,

    /// Date/time fields do not form a valid calendar time
    #[error("invalid date/time fields")]
    BadFields,
}

/// Date/time frame pushed to every display in a cycle
///
/// Layout (39 bytes):
///
/// ```text
/// header(28) | year lo | year hi | month | day | hour | minute | second | footer(4)
/// ```
///
/// The year goes out low byte first. Displays in the field depend on that
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionFrame {
    datetime: NaiveDateTime,
    bytes: Bytes,
}

impl DistributionFrame {
    /// Build a frame from a calendar date and time
    ///
    /// # Errors
    ///
    /// Returns `FrameError::YearOutOfRange` if the year is negative or above 65535.
    #[allow(clippy::cast_possible_truncation, reason = "Calendar fields fit in a byte")]
    pub fn from_datetime(datetime: NaiveDateTime) -> Result<Self, FrameError> {
        let year = u16::try_from(datetime.year()).map_err(|_| FrameError::YearOutOfRange {
            year: datetime.year(),
        })?;

        let mut buf = BytesMut::with_capacity(FRAME_LEN);
        buf.put_slice(&FRAME_HEADER);
        buf.put_u16_le(year);
        buf.put_u8(datetime.month() as u8);
        buf.put_u8(datetime.day() as u8);
        buf.put_u8(datetime.hour() as u8);
        buf.put_u8(datetime.minute() as u8);
        // Leap seconds are carried in the nanosecond field, second() stays below 60
        buf.put_u8(datetime.second() as u8);
        buf.put_slice(&FRAME_FOOTER);

        Ok(Self {
            datetime,
            bytes: buf.freeze(),
        })
    }

    /// Build a frame for a corrected timestamp
    ///
    /// # Errors
    ///
    /// Returns `FrameError::InvalidTimestamp` if the calendar has no such
    /// time, or `FrameError::YearOutOfRange`.
    pub fn from_timestamp(
        timestamp: CorrectedTimestamp,
        zone: CalendarZone,
    ) -> Result<Self, FrameError> {
        let datetime = timestamp
            .to_calendar(zone)
            .ok_or(FrameError::InvalidTimestamp {
                secs: timestamp.as_secs(),
            })?;
        Self::from_datetime(datetime)
    }

    /// Parse a frame received from the wire
    ///
    /// # Errors
    ///
    /// Returns `FrameError` if the length, envelope or fields are invalid.
    pub fn decode(buf: &[u8]) -> Result<Self, FrameError> {
        if buf.len() != FRAME_LEN {
            return Err(FrameError::BadLength {
                expected: FRAME_LEN,
                have: buf.len(),
            });
        }

        let (header, rest) = buf.split_at(FRAME_HEADER.len());
        let (fields, footer) = rest.split_at(7);
        if header != FRAME_HEADER || footer != FRAME_FOOTER {
            return Err(FrameError::BadEnvelope);
        }

        let year = u16::from_le_bytes([fields[0], fields[1]]);
        let datetime = NaiveDate::from_ymd_opt(
            i32::from(year),
            u32::from(fields[2]),
            u32::from(fields[3]),
        )
        .and_then(|date| {
            date.and_hms_opt(
                u32::from(fields[4]),
                u32::from(fields[5]),
                u32::from(fields[6]),
            )
        })
        .ok_or(FrameError::BadFields)?;

        Ok(Self {
            datetime,
            bytes: Bytes::copy_from_slice(buf),
        })
    }

    /// Calendar time carried by the frame
    #[must_use]
    pub fn datetime(&self) -> NaiveDateTime {
        self.datetime
    }

    /// Exact wire bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Wire bytes as a cheaply clonable buffer
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        self.bytes.clone()
    }
}
