//! Mock display for testing the distribution path.
//!
//! Accepts TCP connections, reads one frame per connection and answers
//! with a configurable acknowledgment.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{RwLock, mpsc};

use crate::protocol::distribution::{DistributionFrame, FRAME_LEN};

/// Configuration for the Mock Device.
#[derive(Debug, Clone)]
pub struct MockDeviceConfig {
    /// Address to bind.
    pub bind_ip: IpAddr,
    /// Port to listen on (0 picks an ephemeral port).
    pub port: u16,
    /// Bytes sent back after a frame. Empty closes without answering.
    pub ack: Vec<u8>,
    /// Pause between reading the frame and acknowledging it.
    pub ack_delay: Duration,
}

impl Default for MockDeviceConfig {
    fn default() -> Self {
        Self {
            bind_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            ack: b"OK".to_vec(),
            ack_delay: Duration::ZERO,
        }
    }
}

#[derive(Default)]
struct DeviceState {
    connections: usize,
    raw: Vec<Vec<u8>>,
    frames: Vec<DistributionFrame>,
}

/// A Mock display listening on TCP.
pub struct MockDevice {
    config: MockDeviceConfig,
    state: Arc<RwLock<DeviceState>>,
    shutdown: Option<mpsc::Sender<()>>,
    address: Option<SocketAddr>,
}

impl MockDevice {
    /// Creates a new `MockDevice` with the specified configuration.
    #[must_use]
    pub fn new(config: MockDeviceConfig) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(DeviceState::default())),
            shutdown: None,
            address: None,
        }
    }

    /// Starts listening and returns the bound address.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot be bound.
    pub async fn start(&mut self) -> Result<SocketAddr, std::io::Error> {
        let listener = TcpListener::bind((self.config.bind_ip, self.config.port)).await?;
        let addr = listener.local_addr()?;
        self.address = Some(addr);

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        self.shutdown = Some(shutdown_tx);

        let state = self.state.clone();
        let config = self.config.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let state = state.clone();
                                let config = config.clone();
                                tokio::spawn(async move {
                                    Self::handle_connection(stream, state, config).await;
                                });
                            }
                            Err(e) => {
                                tracing::error!("Accept error: {}", e);
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Ok(addr)
    }

    async fn handle_connection(
        mut stream: TcpStream,
        state: Arc<RwLock<DeviceState>>,
        config: MockDeviceConfig,
    ) {
        state.write().await.connections += 1;

        let mut buf = [0u8; FRAME_LEN];
        if let Err(e) = stream.read_exact(&mut buf).await {
            tracing::debug!("Mock device short read: {}", e);
            return;
        }

        {
            let mut state = state.write().await;
            state.raw.push(buf.to_vec());
            match DistributionFrame::decode(&buf) {
                Ok(frame) => state.frames.push(frame),
                Err(e) => tracing::warn!("Mock device received invalid frame: {}", e),
            }
        }

        if !config.ack_delay.is_zero() {
            tokio::time::sleep(config.ack_delay).await;
        }
        if !config.ack.is_empty() {
            let _ = stream.write_all(&config.ack).await;
        }
        let _ = stream.shutdown().await;
    }

    /// Stops accepting connections.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(()).await;
        }
    }

    /// Returns the address the device is listening on.
    #[must_use]
    pub fn address(&self) -> Option<SocketAddr> {
        self.address
    }

    /// Returns the number of accepted connections.
    pub async fn connection_count(&self) -> usize {
        self.state.read().await.connections
    }

    /// Returns the valid frames received.
    pub async fn frames(&self) -> Vec<DistributionFrame> {
        self.state.read().await.frames.clone()
    }

    /// Returns every frame-sized payload received, valid or not.
    pub async fn raw_frames(&self) -> Vec<Vec<u8>> {
        self.state.read().await.raw.clone()
    }

    /// Waits until at least `count` valid frames have arrived.
    ///
    /// Returns `false` if `timeout` elapses first.
    pub async fn wait_for_frames(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.state.read().await.frames.len() >= count {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}
