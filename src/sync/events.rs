//! Events published by a running synchronization loop

use std::net::IpAddr;
use std::time::Duration;

use crate::types::{CorrectedTimestamp, SyncStatus};

/// Events emitted by the sync loop
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Loop started
    Started {
        /// Upstream server
        server: String,
        /// Time between cycles
        interval: Duration,
        /// Bias in effect at start
        bias: i64,
        /// Roster size
        devices: usize,
    },

    /// Upstream query answered
    QuerySucceeded {
        /// Cycle number, starting at 1
        cycle: u64,
        /// Clock offset in seconds
        offset: f64,
        /// Round-trip delay in seconds
        delay: f64,
        /// Time that will be distributed
        corrected: CorrectedTimestamp,
    },

    /// Upstream query failed; nothing is distributed this cycle
    QueryFailed {
        /// Cycle number
        cycle: u64,
        /// Error description
        message: String,
    },

    /// Deliveries for the cycle were dispatched
    Distributed {
        /// Cycle number
        cycle: u64,
        /// Number of deliveries dispatched
        devices: usize,
        /// Time carried by the frame
        corrected: CorrectedTimestamp,
    },

    /// One display finished (or abandoned) its delivery
    DeviceResult {
        /// Cycle number
        cycle: u64,
        /// Display address
        ip: IpAddr,
        /// Outcome
        status: SyncStatus,
    },

    /// Cycle aborted by an unexpected error or panic
    CycleFailed {
        /// Cycle number
        cycle: u64,
        /// Error description
        message: String,
    },

    /// New bias took effect
    BiasUpdated {
        /// Previous bias
        previous: i64,
        /// Bias now in effect
        bias: i64,
    },

    /// Loop stopped
    Stopped {
        /// Cycles started before shutdown
        cycles: u64,
    },
}

/// Messages accepted by a running loop
///
/// Applied at the next cycle boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncCommand {
    /// Replace the bias
    SetBias(i64),
}
