//! Offset and delay from one completed client/server exchange.

use std::ops::Deref;

use super::packet::NtpPacket;
use super::timestamp::NtpTimestamp;

/// A decoded server reply together with the local receipt time
///
/// Offset and delay follow the usual four-timestamp formulas:
///
/// ```text
/// offset = ((receive - originate) + (transmit - destination)) / 2
/// delay  = (destination - originate) - (transmit - receive)
/// ```
///
/// Both assume `destination >= originate`. Requests built by this crate
/// leave their transmit field at zero, so a server echoing it back yields
/// an originate of zero and the derived values are advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NtpExchangeResult {
    /// Reply as decoded from the wire
    pub packet: NtpPacket,
    /// Local time the reply was received
    pub destination: NtpTimestamp,
}

impl NtpExchangeResult {
    /// Pair a decoded reply with its receipt time
    #[must_use]
    pub fn new(packet: NtpPacket, destination: NtpTimestamp) -> Self {
        Self {
            packet,
            destination,
        }
    }

    /// Estimated clock offset in seconds (positive when the server is ahead)
    #[must_use]
    pub fn offset(&self) -> f64 {
        let p = &self.packet;
        (p.receive.diff_secs(&p.originate) + p.transmit.diff_secs(&self.destination)) / 2.0
    }

    /// Estimated round-trip delay in seconds
    #[must_use]
    pub fn delay(&self) -> f64 {
        let p = &self.packet;
        self.destination.diff_secs(&p.originate) - p.transmit.diff_secs(&p.receive)
    }

    /// Reference time in seconds since the Unix epoch
    #[must_use]
    pub fn reference_time(&self) -> f64 {
        self.packet.reference.to_system_secs_f64()
    }

    /// Originate time in seconds since the Unix epoch
    #[must_use]
    pub fn originate_time(&self) -> f64 {
        self.packet.originate.to_system_secs_f64()
    }

    /// Server receive time in seconds since the Unix epoch
    #[must_use]
    pub fn receive_time(&self) -> f64 {
        self.packet.receive.to_system_secs_f64()
    }

    /// Server transmit time in seconds since the Unix epoch
    #[must_use]
    pub fn transmit_time(&self) -> f64 {
        self.packet.transmit.to_system_secs_f64()
    }

    /// Local receipt time in seconds since the Unix epoch
    #[must_use]
    pub fn destination_time(&self) -> f64 {
        self.destination.to_system_secs_f64()
    }
}

impl Deref for NtpExchangeResult {
    type Target = NtpPacket;

    fn deref(&self) -> &NtpPacket {
        &self.packet
    }
}
