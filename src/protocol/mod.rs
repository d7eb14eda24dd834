//! Wire protocols
//!
//! `ntp` is the upstream query format, `distribution` the frame the
//! displays accept.

pub mod distribution;
pub mod ntp;
