//! Network helpers shared by the NTP client and the frame delivery path
//!
//! Thin wrappers over tokio so the rest of the crate has one place that
//! decides how sockets are resolved, bound and connected.


use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

pub use tokio::net::{TcpStream, UdpSocket};

/// Runtime abstraction for common operations
pub struct Runtime;

impl Runtime {
    /// Sleep for the specified duration
    pub async fn sleep(duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Run a future with a timeout
    ///
    /// # Errors
    ///
    /// Returns `TimeoutError` if the future does not complete within the specified duration.
    pub async fn timeout<F, T>(duration: Duration, future: F) -> Result<T, TimeoutError>
    where
        F: Future<Output = T>,
    {
        tokio::time::timeout(duration, future)
            .await
            .map_err(|_| TimeoutError)
    }
}

/// Timeout error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutError;

impl std::fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "operation timed out")
    }
}

impl std::error::Error for TimeoutError {}

/// Resolve `host` and return the first address, if any
///
/// # Errors
///
/// Returns the resolver error.
pub async fn resolve_first(host: &str, port: u16) -> io::Result<Option<SocketAddr>> {
    Ok(tokio::net::lookup_host((host, port)).await?.next())
}

/// Bind an ephemeral UDP socket in the same family as `peer`
///
/// # Errors
///
/// Returns an error if the socket cannot be bound.
pub async fn bind_udp_for(peer: &SocketAddr) -> io::Result<UdpSocket> {
    let local: SocketAddr = match peer {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };
    UdpSocket::bind(local).await
}

/// TCP connection helper
///
/// # Errors
///
/// Returns an error if the connection is refused or unreachable.
pub async fn connect_tcp(addr: SocketAddr) -> io::Result<TcpStream> {
    let stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

/// Spawn a task
pub fn spawn<F>(future: F) -> tokio::task::JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(future)
}
