//! Time distribution protocol spoken by the displays
//!
//! One TCP connection per display per cycle carries a single fixed-length
//! frame. The display answers with a short acknowledgment whose content is
//! not interpreted.

mod frame;


pub use frame::{DistributionFrame, FRAME_FOOTER, FRAME_HEADER, FRAME_LEN, FrameError};

/// TCP port the displays listen on
pub const DISTRIBUTION_PORT: u16 = 10_000;
