//! Frame delivery to a single display
//!
//! One session is connect, send the whole frame, read one acknowledgment,
//! close. Any failure along the way leaves the display `NotConnected` for
//! this cycle.


use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::net::{Runtime, connect_tcp};
use crate::protocol::distribution::{DISTRIBUTION_PORT, DistributionFrame};
use crate::types::{SyncConfig, SyncStatus};

/// Device session errors
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// TCP connection could not be established
    #[error("connect to {addr} failed: {source}")]
    Connect {
        /// Device address
        addr: SocketAddr,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Frame could not be written
    #[error("sending frame to {addr} failed: {source}")]
    Send {
        /// Device address
        addr: SocketAddr,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Acknowledgment read failed
    #[error("reading acknowledgment from {addr} failed: {source}")]
    Receive {
        /// Device address
        addr: SocketAddr,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Session did not finish in time
    #[error("session with {addr} timed out after {timeout:?}")]
    Timeout {
        /// Device address
        addr: SocketAddr,
        /// Deadline that elapsed
        timeout: Duration,
    },
}

/// Pushes a frame to one display
#[async_trait]
pub trait FrameDelivery: Send + Sync {
    /// Deliver `frame` to `device` and report the outcome
    ///
    /// Never fails; errors are logged and reported as `NotConnected`.
    async fn deliver(&self, device: IpAddr, frame: &DistributionFrame) -> SyncStatus;
}

/// TCP delivery with a per-session deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpDelivery {
    /// Device port
    pub port: u16,
    /// Deadline for the whole session
    pub timeout: Duration,
    /// Size of the single acknowledgment read
    pub ack_buffer_size: usize,
}

impl TcpDelivery {
    /// Create a delivery with explicit settings
    #[must_use]
    pub fn new(port: u16, timeout: Duration, ack_buffer_size: usize) -> Self {
        Self {
            port,
            timeout,
            ack_buffer_size,
        }
    }

    /// Take the device settings from a sync configuration
    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(
            config.device_port,
            config.delivery_timeout,
            config.ack_buffer_size,
        )
    }

    /// Run one session and return the acknowledgment length
    ///
    /// A zero-length acknowledgment (the device closed after reading) is
    /// still a completed session.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError` if connect, send or receive fail, or the
    /// deadline passes.
    pub async fn try_deliver(
        &self,
        addr: SocketAddr,
        frame: &DistributionFrame,
    ) -> Result<usize, DeliveryError> {
        match Runtime::timeout(self.timeout, self.session(addr, frame)).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Timeout {
                addr,
                timeout: self.timeout,
            }),
        }
    }

    async fn session(
        &self,
        addr: SocketAddr,
        frame: &DistributionFrame,
    ) -> Result<usize, DeliveryError> {
        let mut stream = connect_tcp(addr)
            .await
            .map_err(|source| DeliveryError::Connect { addr, source })?;

        stream
            .write_all(frame.as_bytes())
            .await
            .map_err(|source| DeliveryError::Send { addr, source })?;

        let mut ack = vec![0u8; self.ack_buffer_size];
        let len = stream
            .read(&mut ack)
            .await
            .map_err(|source| DeliveryError::Receive { addr, source })?;
        tracing::trace!(%addr, len, "Acknowledgment received");

        // Close errors are irrelevant once the ack is in
        let _ = stream.shutdown().await;
        Ok(len)
    }
}

impl Default for TcpDelivery {
    fn default() -> Self {
        Self::new(DISTRIBUTION_PORT, Duration::from_secs(5), 1024)
    }
}

#[async_trait]
impl FrameDelivery for TcpDelivery {
    async fn deliver(&self, device: IpAddr, frame: &DistributionFrame) -> SyncStatus {
        let addr = SocketAddr::new(device, self.port);
        match self.try_deliver(addr, frame).await {
            Ok(_) => SyncStatus::Synchronized,
            Err(e) => {
                tracing::warn!(device = %device, error = %e, "Delivery failed");
                SyncStatus::NotConnected
            }
        }
    }
}
