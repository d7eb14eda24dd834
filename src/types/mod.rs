//! Core types module

mod config;
mod corrected;
mod record;
mod request;
mod roster;


pub use config::{CalendarZone, SyncConfig, SyncConfigBuilder};
pub use corrected::CorrectedTimestamp;
pub use record::{SyncAttemptRecord, SyncStatus};
pub use request::{StartSyncRequest, SyncAck};
pub use roster::DeviceRoster;
