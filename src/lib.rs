//! # ntdsync
//!
//! Keeps a fleet of network time displays (NTDs) on upstream time.
//!
//! ## Features
//!
//! - NTP client (48-byte header codec, offset/delay statistics)
//! - Operator bias applied to the upstream transmit time
//! - Binary date/time frame pushed to every display over TCP
//! - Long-running loop with bounded fan-out, cancellation and live bias updates
//! - Per-display attempt log (in memory or JSON lines)
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use ntdsync::{MemoryLogSink, StartSyncRequest, SyncConfig, SyncController};
//!
//! # async fn example() -> Result<(), ntdsync::SyncError> {
//! let controller = SyncController::new(SyncConfig::default(), Arc::new(MemoryLogSink::new()));
//!
//! controller
//!     .start_sync(&StartSyncRequest::new("pool.ntp.org", 1, 0))
//!     .await?;
//!
//! // ... later
//! controller.stop_sync().await?;
//! for record in controller.get_logs().await? {
//!     println!("{} {}", record.ip, record.status);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! - **Control plane**: `SyncController` - start/stop, bias, logs
//! - **Loop**: `SyncOrchestrator` - query, correct, distribute, sleep
//! - **Sessions**: `client` (NTP over UDP) and `delivery` (frames over TCP)
//! - **Low-level**: Protocol modules - codecs only, no I/O

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
/// Error types
pub mod error;
/// Core types
pub mod types;

/// Testing utilities
pub mod testing;

pub mod client;
pub mod delivery;
pub mod net;
pub mod protocol;
pub mod sink;
pub mod sync;

// Re-exports
pub use client::{NtpClient, NtpError, TimeSource};
pub use delivery::{DeliveryError, FrameDelivery, TcpDelivery};
pub use error::SyncError;
pub use protocol::distribution::{DistributionFrame, FrameError};
pub use protocol::ntp::{CodecError, NtpExchangeResult, NtpPacket, NtpTimestamp};
pub use sink::{JsonLinesLogSink, MemoryLogSink, SinkError, SyncLogSink};
pub use sync::{SyncCommand, SyncController, SyncEvent, SyncOrchestrator};
pub use types::{
    CalendarZone, CorrectedTimestamp, DeviceRoster, StartSyncRequest, SyncAck,
    SyncAttemptRecord, SyncConfig, SyncStatus,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for common imports
///
/// Convenient re-exports
pub mod prelude {
    pub use crate::{
        CalendarZone, DeviceRoster, JsonLinesLogSink, MemoryLogSink, NtpClient, StartSyncRequest,
        SyncAttemptRecord, SyncConfig, SyncController, SyncError, SyncEvent, SyncStatus,
        TcpDelivery,
    };
}
