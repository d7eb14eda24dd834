//! NTP packet codec and exchange statistics
//!
//! Only the fixed 48-byte header is handled. The client side of the
//! exchange looks like this:
//!
//! ```text
//! Client                              Server
//!   |--- request (mode 3, T1) ---------->|  (server records T2)
//!   |<-- reply (T1 echoed, T2, T3) ------|
//!   |  (client records T4)               |
//!   |                                    |
//!   |  offset = ((T2-T1)+(T3-T4))/2      |
//!   |  delay  = (T4-T1) - (T3-T2)        |
//! ```

mod packet;
mod stats;
mod timestamp;

#[cfg(test)]
mod tests;

pub use packet::{CodecError, MODE_CLIENT, MODE_SERVER, NtpPacket};
pub use stats::NtpExchangeResult;
pub use timestamp::{
    NTP_DELTA, NtpShort, NtpTimestamp, join_fixed, ntp_to_system_time, split_fixed,
    system_to_ntp_time,
};

/// Well-known NTP server port
pub const NTP_PORT: u16 = 123;

/// Protocol version used for upstream queries
pub const DEFAULT_VERSION: u8 = 3;
