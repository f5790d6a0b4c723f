//! TCP connection to an NWS server.
//!
//! # Example
//!
//! ```ignore
//! use nws_client::transport::Transport;
//!
//! let mut transport = Transport::connect("localhost", 8765).await?;
//! transport.write(&request.encode()).await?;
//! transport.flush().await?;
//! let status = transport.read_exact(4).await?;
//! ```

use std::io;
use std::net::SocketAddr;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufStream};
use tokio::net::{lookup_host, TcpSocket, TcpStream};

use crate::error::{NwsError, Result};
use crate::protocol::{HANDSHAKE_REQUEST, LEGACY_PROTOCOL_REPLY};

/// A handshaken connection to an NWS server.
pub struct Transport {
    stream: BufStream<TcpStream>,
    peer: SocketAddr,
    handshake: [u8; 4],
}

impl Transport {
    /// Connect and perform the protocol handshake.
    ///
    /// Keep-alive is enabled and Nagle's algorithm disabled before the
    /// handshake is sent.
    ///
    /// # Errors
    ///
    /// - `Connect` if the host does not resolve or no address accepts
    /// - `UnsupportedProtocol` if the server only speaks the legacy protocol
    /// - `ConnectionDropped` if the server hangs up during the handshake
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let addr = format!("{}:{}", host, port);
        let stream = open_stream(&addr)
            .await
            .map_err(|source| NwsError::Connect {
                addr: addr.clone(),
                source,
            })?;
        let peer = stream.peer_addr()?;

        let mut transport = Self {
            stream: BufStream::new(stream),
            peer,
            handshake: [0u8; 4],
        };
        transport.handshake().await?;

        tracing::debug!(
            "Connected to NWS server {} at {} (handshake {:?})",
            addr,
            peer,
            String::from_utf8_lossy(&transport.handshake)
        );
        Ok(transport)
    }

    async fn handshake(&mut self) -> Result<()> {
        self.write(HANDSHAKE_REQUEST).await?;
        self.flush().await?;

        let reply = self.read_exact(4).await?;
        if &reply[..] == LEGACY_PROTOCOL_REPLY {
            tracing::warn!("NWS server at {} only speaks the old protocol", self.peer);
            return Err(NwsError::UnsupportedProtocol(
                String::from_utf8_lossy(&reply).into_owned(),
            ));
        }
        self.handshake.copy_from_slice(&reply);
        Ok(())
    }

    /// Token the server answered the handshake with.
    pub fn handshake_reply(&self) -> &[u8; 4] {
        &self.handshake
    }

    /// Address of the server.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Queue bytes for sending.
    ///
    /// Bytes sit in the write buffer until [`flush`](Self::flush) or until the
    /// buffer fills up.
    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.stream.write_all(data).await?;
        Ok(())
    }

    /// Force queued bytes onto the wire.
    pub async fn flush(&mut self) -> Result<()> {
        self.stream.flush().await?;
        Ok(())
    }

    /// Read exactly `n` bytes.
    ///
    /// # Errors
    ///
    /// `ConnectionDropped` if the peer closes before `n` bytes arrive.
    pub async fn read_exact(&mut self, n: usize) -> Result<Bytes> {
        let mut buf = BytesMut::zeroed(n);
        match self.stream.read_exact(&mut buf).await {
            Ok(_) => Ok(buf.freeze()),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(NwsError::ConnectionDropped),
            Err(e) => Err(NwsError::Io(e)),
        }
    }

    /// Read exactly `N` bytes into an array.
    pub async fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        match self.stream.read_exact(&mut buf).await {
            Ok(_) => Ok(buf),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(NwsError::ConnectionDropped),
            Err(e) => Err(NwsError::Io(e)),
        }
    }

    /// Close the connection.
    pub async fn shutdown(mut self) -> Result<()> {
        tracing::debug!("Closing connection to NWS server at {}", self.peer);
        self.stream.shutdown().await?;
        Ok(())
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("peer", &self.peer)
            .field("handshake", &String::from_utf8_lossy(&self.handshake))
            .finish()
    }
}

/// Resolve `addr` and connect to the first address that accepts.
async fn open_stream(addr: &str) -> io::Result<TcpStream> {
    let mut last_err = None;
    for candidate in lookup_host(addr).await? {
        let socket = match candidate {
            SocketAddr::V4(_) => TcpSocket::new_v4()?,
            SocketAddr::V6(_) => TcpSocket::new_v6()?,
        };
        socket.set_keepalive(true)?;
        socket.set_nodelay(true)?;

        match socket.connect(candidate).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                tracing::debug!("Connect to {} failed: {}", candidate, e);
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses")
    }))
}
