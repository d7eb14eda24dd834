use bytes::{Buf, BufMut};
use thiserror::Error;

use super::timestamp::{NtpShort, NtpTimestamp};

/// NTP packet codec errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    /// Not enough bytes for a complete header
    #[error("buffer too small: need {needed}, have {have}")]
    BufferTooSmall {
        /// Bytes required
        needed: usize,
        /// Bytes supplied
        have: usize,
    },

    /// A bit-field does not fit in its allotted width
    #[error("{field} value {value} does not fit in {bits} bits")]
    FieldOverflow {
        /// Name of the field
        field: &'static str,
        /// Offending value
        value: u8,
        /// Width of the field
        bits: u8,
    },

    /// A time value cannot be expressed in NTP fixed-point
    #[error("{field} value {value} is outside the representable range")]
    ValueOutOfRange {
        /// Kind of fixed-point field
        field: &'static str,
        /// Offending value in seconds
        value: f64,
    },
}

/// Association mode: client
pub const MODE_CLIENT: u8 = 3;
/// Association mode: server
pub const MODE_SERVER: u8 = 4;

/// Fixed NTP header (48 bytes, no extension fields)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NtpPacket {
    /// Leap indicator (2 bits)
    pub leap: u8,
    /// Protocol version (3 bits)
    pub version: u8,
    /// Association mode (3 bits)
    pub mode: u8,
    /// Stratum of the server clock
    pub stratum: u8,
    /// Poll interval exponent
    pub poll: u8,
    /// Clock precision exponent (log2 seconds)
    pub precision: i8,
    /// Round-trip delay to the reference clock
    pub root_delay: NtpShort,
    /// Dispersion relative to the reference clock
    pub root_dispersion: NtpShort,
    /// Reference identifier
    pub reference_id: u32,
    /// Time the server clock was last set
    pub reference: NtpTimestamp,
    /// Client transmit time echoed by the server
    pub originate: NtpTimestamp,
    /// Time the server received the request
    pub receive: NtpTimestamp,
    /// Time the server sent the reply
    pub transmit: NtpTimestamp,
}

impl NtpPacket {
    /// Encoded header size
    pub const SIZE: usize = 48;

    /// Create an outbound client request
    ///
    /// Every timestamp is left at zero, including transmit.
    #[must_use]
    pub fn client_request(version: u8) -> Self {
        Self {
            version,
            mode: MODE_CLIENT,
            ..Self::default()
        }
    }

    /// Encode to the 48-byte wire form
    ///
    /// # Errors
    ///
    /// Returns `CodecError::FieldOverflow` if leap, version or mode do not fit
    /// their bit-fields. Nothing is produced in that case.
    pub fn encode(&self) -> Result<[u8; Self::SIZE], CodecError> {
        check_width("leap", self.leap, 2)?;
        check_width("version", self.version, 3)?;
        check_width("mode", self.mode, 3)?;

        let mut buf = [0u8; Self::SIZE];
        let mut out = &mut buf[..];

        // Byte 0: LI(2) | VN(3) | Mode(3)
        out.put_u8((self.leap << 6) | (self.version << 3) | self.mode);
        out.put_u8(self.stratum);
        out.put_u8(self.poll);
        out.put_i8(self.precision);

        out.put_u32(self.root_delay.to_bits());
        out.put_u32(self.root_dispersion.to_bits());
        out.put_u32(self.reference_id);

        for ts in [self.reference, self.originate, self.receive, self.transmit] {
            out.put_u32(ts.seconds);
            out.put_u32(ts.fraction);
        }

        Ok(buf)
    }

    /// Decode from bytes
    ///
    /// Anything past the first 48 bytes (extension fields, MAC) is ignored.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::BufferTooSmall` if fewer than 48 bytes are supplied.
    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        if buf.len() < Self::SIZE {
            return Err(CodecError::BufferTooSmall {
                needed: Self::SIZE,
                have: buf.len(),
            });
        }

        let mut input = &buf[..Self::SIZE];

        let first = input.get_u8();
        let stratum = input.get_u8();
        let poll = input.get_u8();
        let precision = input.get_i8();
        let root_delay = NtpShort::from_bits(input.get_u32());
        let root_dispersion = NtpShort::from_bits(input.get_u32());
        let reference_id = input.get_u32();

        let mut timestamp = || NtpTimestamp::new(input.get_u32(), input.get_u32());
        let reference = timestamp();
        let originate = timestamp();
        let receive = timestamp();
        let transmit = timestamp();

        Ok(Self {
            leap: (first >> 6) & 0x3,
            version: (first >> 3) & 0x7,
            mode: first & 0x7,
            stratum,
            poll,
            precision,
            root_delay,
            root_dispersion,
            reference_id,
            reference,
            originate,
            receive,
            transmit,
        })
    }
}

fn check_width(field: &'static str, value: u8, bits: u8) -> Result<(), CodecError> {
    if value >> bits == 0 {
        Ok(())
    } else {
        Err(CodecError::FieldOverflow { field, value, bits })
    }
}
