//! Upstream NTP client
//!
//! A single request/response exchange over UDP. The caller supplies the
//! deadline; nothing here retries.


use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::net::{Runtime, UdpSocket, bind_udp_for, resolve_first};
use crate::protocol::ntp::{
    CodecError, DEFAULT_VERSION, NTP_PORT, NtpExchangeResult, NtpPacket, NtpTimestamp,
};
use crate::types::SyncConfig;

/// Receive buffer for a single reply datagram
const RECV_BUFFER_SIZE: usize = 1024;

/// Upstream NTP query errors
#[derive(Debug, Error)]
pub enum NtpError {
    /// Host name could not be resolved
    #[error("failed to resolve {host}: {source}")]
    Resolve {
        /// Host as given
        host: String,
        /// Resolver error
        #[source]
        source: io::Error,
    },

    /// Host name resolved to nothing
    #[error("no address found for {host}")]
    NoAddress {
        /// Host as given
        host: String,
    },

    /// No matching reply before the deadline
    #[error("no response received from {host} within {timeout:?}")]
    Timeout {
        /// Host as given
        host: String,
        /// Deadline that elapsed
        timeout: Duration,
    },

    /// Socket operation failed
    #[error("socket error during {context}: {source}")]
    Socket {
        /// Operation that failed
        context: &'static str,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Reply or request could not be encoded/decoded
    #[error("malformed NTP packet: {0}")]
    Codec(#[from] CodecError),
}

impl NtpError {
    fn socket(context: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| Self::Socket { context, source }
    }
}

/// Query `host` once and return the decoded exchange
///
/// Resolution, send and the filtered receive loop all run under `timeout`.
/// Datagrams whose source address differs from the resolved server are
/// dropped.
///
/// # Errors
///
/// Returns `NtpError` if resolution fails, the deadline passes, the socket
/// fails, or the reply does not decode.
pub async fn request(
    host: &str,
    version: u8,
    port: u16,
    timeout: Duration,
) -> Result<NtpExchangeResult, NtpError> {
    match Runtime::timeout(timeout, exchange(host, version, port)).await {
        Ok(result) => result,
        Err(_) => Err(NtpError::Timeout {
            host: host.to_string(),
            timeout,
        }),
    }
}

async fn exchange(host: &str, version: u8, port: u16) -> Result<NtpExchangeResult, NtpError> {
    let server = resolve_first(host, port)
        .await
        .map_err(|source| NtpError::Resolve {
            host: host.to_string(),
            source,
        })?
        .ok_or_else(|| NtpError::NoAddress {
            host: host.to_string(),
        })?;

    let socket = bind_udp_for(&server)
        .await
        .map_err(NtpError::socket("bind"))?;

    let request = NtpPacket::client_request(version).encode()?;
    socket
        .send_to(&request, server)
        .await
        .map_err(NtpError::socket("send"))?;
    tracing::trace!(%server, version, "NTP request sent");

    receive_from(&socket, server).await
}

async fn receive_from(
    socket: &UdpSocket,
    server: SocketAddr,
) -> Result<NtpExchangeResult, NtpError> {
    let mut buf = [0u8; RECV_BUFFER_SIZE];
    loop {
        let (len, source) = socket
            .recv_from(&mut buf)
            .await
            .map_err(NtpError::socket("receive"))?;

        if source != server {
            tracing::debug!(%source, %server, len, "Discarding datagram from unexpected source");
            continue;
        }

        let destination = NtpTimestamp::now();
        let packet = NtpPacket::decode(&buf[..len])?;
        tracing::debug!(%server, stratum = packet.stratum, "NTP reply received");
        return Ok(NtpExchangeResult::new(packet, destination));
    }
}

/// Source of upstream time for the sync loop
#[async_trait]
pub trait TimeSource: Send + Sync {
    /// Perform one exchange against `server`
    async fn query(&self, server: &str) -> Result<NtpExchangeResult, NtpError>;
}

/// UDP NTP client with fixed version, port and deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NtpClient {
    /// Protocol version put in requests
    pub version: u8,
    /// Server port
    pub port: u16,
    /// Deadline for a whole exchange
    pub timeout: Duration,
}

impl NtpClient {
    /// Create a client
    #[must_use]
    pub fn new(version: u8, port: u16, timeout: Duration) -> Self {
        Self {
            version,
            port,
            timeout,
        }
    }

    /// Take the NTP settings from a sync configuration
    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.ntp_version, config.ntp_port, config.ntp_timeout)
    }
}

impl Default for NtpClient {
    fn default() -> Self {
        Self::new(DEFAULT_VERSION, NTP_PORT, Duration::from_secs(5))
    }
}

#[async_trait]
impl TimeSource for NtpClient {
    async fn query(&self, server: &str) -> Result<NtpExchangeResult, NtpError> {
        request(server, self.version, self.port, self.timeout).await
    }
}
