//! Loopback fixtures and in-process doubles for exercising the crate
//! without real NTP servers or displays.

mod device;
mod doubles;
mod ntp_server;

#[cfg(test)]
/// Unit tests for the fixtures.
mod tests;

pub use device::{MockDevice, MockDeviceConfig};
pub use doubles::{RecordingDelivery, ScriptedReply, ScriptedTimeSource, exchange_at};
pub use ntp_server::{MockNtpServer, MockNtpServerConfig};

/// Initialize test logging once per process.
///
/// Honours `RUST_LOG`, defaulting to `info`.
#[cfg(test)]
pub(crate) fn init_logging() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
