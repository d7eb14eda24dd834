//! Synchronization loop and its control-plane facade
//!
//! ```text
//!            +---------------------- interval ----------------------+
//!            v                                                      |
//! query -> correct (+bias) -> build frame -> fan out -> sleep ------+
//!   |                                          |
//!   +-- failure: log, skip distribution        +-- one task per display,
//!                                                  at most max_in_flight
//!                                                  sessions at once
//! ```

mod controller;
mod events;
mod orchestrator;

#[cfg(test)]
mod tests;

pub use controller::SyncController;
pub use events::{SyncCommand, SyncEvent};
pub use orchestrator::SyncOrchestrator;
