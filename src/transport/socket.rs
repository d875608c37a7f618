//! Async UDP transport for the SCR client.
//!
//! The socket is left unconnected and talks to the server with
//! `send_to`/`recv_from`, so ICMP errors from a server that is not up yet do
//! not surface as receive failures. Datagrams from any other peer are dropped.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tokio::net::{UdpSocket, lookup_host};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};

use super::error::{TransportError, TransportResult};
use super::{Received, Transport};
use crate::core::constants::DEFAULT_RECV_BUFFER_SIZE;

/// UDP transport bound to one server endpoint.
#[derive(Debug)]
pub struct UdpTransport {
    /// The underlying UDP socket.
    socket: UdpSocket,
    /// Server endpoint all traffic goes to and must come from.
    server: SocketAddr,
    /// Receive buffer.
    recv_buffer: Vec<u8>,
    /// Datagrams dropped because they came from another peer.
    stray_datagrams: u64,
}

impl UdpTransport {
    /// Resolve `host:port` and bind an ephemeral local socket for it.
    pub async fn connect(host: &str, port: u16) -> TransportResult<Self> {
        UdpTransportBuilder::new().connect(host, port).await
    }

    /// Bind an ephemeral local socket for an already resolved server.
    pub async fn bind(server: SocketAddr) -> TransportResult<Self> {
        UdpTransportBuilder::new().bind(server).await
    }

    /// Get the local address.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Get the server address.
    pub fn server_addr(&self) -> SocketAddr {
        self.server
    }

    /// Number of datagrams dropped because they did not come from the server.
    pub fn stray_datagrams(&self) -> u64 {
        self.stray_datagrams
    }
}

impl Transport for UdpTransport {
    async fn send(&mut self, datagram: &[u8]) -> TransportResult<()> {
        self.socket.send_to(datagram, self.server).await?;
        Ok(())
    }

    async fn recv(&mut self, timeout: Duration) -> TransportResult<Received> {
        let deadline = Instant::now() + timeout;
        loop {
            match timeout_at(deadline, self.socket.recv_from(&mut self.recv_buffer)).await {
                Err(_elapsed) => return Ok(Received::TimedOut),
                Ok(Ok((len, from))) if from == self.server => {
                    return Ok(Received::Datagram(self.recv_buffer[..len].to_vec()));
                }
                Ok(Ok((len, from))) => {
                    self.stray_datagrams += 1;
                    warn!(%from, len, "dropping datagram from unexpected peer");
                }
                // Some platforms report an ICMP port-unreachable here even on
                // unconnected sockets; the server may simply not be up yet.
                Ok(Err(err))
                    if matches!(
                        err.kind(),
                        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionRefused
                    ) =>
                {
                    debug!(%err, "server unreachable, still waiting");
                }
                Ok(Err(err)) => return Err(err.into()),
            }
        }
    }
}

/// Builder for creating UDP transports with custom options.
#[derive(Debug, Clone)]
pub struct UdpTransportBuilder {
    recv_buffer_size: usize,
    local_addr: Option<SocketAddr>,
}

impl Default for UdpTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl UdpTransportBuilder {
    /// Create a new transport builder with default options.
    pub fn new() -> Self {
        Self {
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
            local_addr: None,
        }
    }

    /// Set the receive buffer size.
    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.recv_buffer_size = size;
        self
    }

    /// Bind to a specific local address instead of an ephemeral one.
    pub fn local_addr(mut self, addr: SocketAddr) -> Self {
        self.local_addr = Some(addr);
        self
    }

    /// Resolve `host:port`, preferring IPv4, and bind.
    pub async fn connect(self, host: &str, port: u16) -> TransportResult<UdpTransport> {
        let resolved: Vec<SocketAddr> = lookup_host((host, port))
            .await
            .map_err(|source| TransportError::Resolve {
                host: host.to_string(),
                port,
                source,
            })?
            .collect();
        let server = resolved
            .iter()
            .find(|addr| addr.is_ipv4())
            .or_else(|| resolved.first())
            .copied()
            .ok_or_else(|| TransportError::NoAddress {
                host: host.to_string(),
            })?;
        self.bind(server).await
    }

    /// Bind a socket for the given server address.
    pub async fn bind(self, server: SocketAddr) -> TransportResult<UdpTransport> {
        let local = self.local_addr.unwrap_or_else(|| unspecified_for(server));
        let socket = UdpSocket::bind(local).await?;
        debug!(local = %socket.local_addr()?, %server, "udp transport bound");
        Ok(UdpTransport {
            socket,
            server,
            recv_buffer: vec![0u8; self.recv_buffer_size],
            stray_datagrams: 0,
        })
    }
}

fn unspecified_for(server: SocketAddr) -> SocketAddr {
    let ip = match server.ip() {
        IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    };
    SocketAddr::new(ip, 0)
}
