//! Mock NTP server for testing purposes.
//!
//! Answers client requests on a loopback UDP socket with a configurable
//! clock, or stays silent to exercise client timeouts.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::{RwLock, mpsc};

use crate::protocol::ntp::{MODE_SERVER, NtpPacket, NtpShort, NtpTimestamp};

/// Configuration for the Mock NTP Server.
#[derive(Debug, Clone)]
pub struct MockNtpServerConfig {
    /// Port to listen on (0 picks an ephemeral port).
    pub port: u16,
    /// Fixed transmit timestamp. When `None` the server uses its own clock.
    pub transmit: Option<NtpTimestamp>,
    /// Seconds added to the server clock.
    pub offset: f64,
    /// Stratum reported in replies.
    pub stratum: u8,
    /// Swallow requests without answering.
    pub silent: bool,
}

impl Default for MockNtpServerConfig {
    fn default() -> Self {
        Self {
            port: 0,
            transmit: None,
            offset: 0.0,
            stratum: 2,
            silent: false,
        }
    }
}

/// Internal state of the Mock NTP Server.
#[derive(Default)]
struct ServerState {
    /// Requests received, in arrival order.
    requests: Vec<NtpPacket>,
}

/// A Mock NTP server bound to 127.0.0.1.
pub struct MockNtpServer {
    /// Server configuration.
    config: MockNtpServerConfig,
    /// Shared server state.
    state: Arc<RwLock<ServerState>>,
    /// Channel to signal shutdown to the server task.
    shutdown: Option<mpsc::Sender<()>>,
    /// The local address the server is listening on.
    address: Option<SocketAddr>,
}

impl MockNtpServer {
    /// Creates a new `MockNtpServer` with the specified configuration.
    #[must_use]
    pub fn new(config: MockNtpServerConfig) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(ServerState::default())),
            shutdown: None,
            address: None,
        }
    }

    /// Starts the server and returns the socket address it is bound to.
    ///
    /// # Errors
    ///
    /// Returns an error if the UDP socket cannot be bound.
    pub async fn start(&mut self) -> Result<SocketAddr, std::io::Error> {
        let socket = UdpSocket::bind(("127.0.0.1", self.config.port)).await?;
        let addr = socket.local_addr()?;
        self.address = Some(addr);

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        self.shutdown = Some(shutdown_tx);

        let state = self.state.clone();
        let config = self.config.clone();

        tokio::spawn(async move {
            let mut buf = [0u8; 512];
            loop {
                tokio::select! {
                    result = socket.recv_from(&mut buf) => {
                        match result {
                            Ok((len, peer)) => {
                                Self::handle_request(&socket, &buf[..len], peer, &state, &config).await;
                            }
                            Err(e) => {
                                tracing::debug!("Mock NTP receive error: {}", e);
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

    async fn handle_request(
        socket: &UdpSocket,
        data: &[u8],
        peer: SocketAddr,
        state: &RwLock<ServerState>,
        config: &MockNtpServerConfig,
    ) {
        let request = match NtpPacket::decode(data) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!("Mock NTP dropping malformed request from {}: {}", peer, e);
                return;
            }
        };
        state.write().await.requests.push(request);

        if config.silent {
            return;
        }

        let now = shifted_now(config.offset);
        let reply = NtpPacket {
            leap: 0,
            version: request.version,
            mode: MODE_SERVER,
            stratum: config.stratum,
            poll: request.poll,
            precision: -20,
            root_delay: NtpShort::from_bits(0x0000_0100),
            root_dispersion: NtpShort::from_bits(0x0000_0200),
            reference_id: u32::from_be_bytes(*b"LOCL"),
            reference: now,
            originate: request.transmit,
            receive: now,
            transmit: config.transmit.unwrap_or(now),
        };

        match reply.encode() {
            Ok(bytes) => {
                if let Err(e) = socket.send_to(&bytes, peer).await {
                    tracing::debug!("Mock NTP send error: {}", e);
                }
            }
            Err(e) => tracing::warn!("Mock NTP could not encode reply: {}", e),
        }
    }

    /// Stops the server.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(()).await;
        }
    }

    /// Returns the address the server is listening on.
    #[must_use]
    pub fn address(&self) -> Option<SocketAddr> {
        self.address
    }

    /// Returns the number of requests received.
    pub async fn request_count(&self) -> usize {
        self.state.read().await.requests.len()
    }

    /// Returns the requests received so far.
    pub async fn requests(&self) -> Vec<NtpPacket> {
        self.state.read().await.requests.clone()
    }
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "Test offsets are a few seconds at most"
)]
fn shifted_now(offset: f64) -> NtpTimestamp {
    let shift = (offset * 4_294_967_296.0) as i64;
    NtpTimestamp::from_bits(NtpTimestamp::now().to_bits().wrapping_add_signed(shift))
}
