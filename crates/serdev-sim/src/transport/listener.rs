//! TCP listener transport
//!
//! Serves at most one peer at a time. While a peer is attached no further
//! connections are accepted; they wait in the OS backlog until the current
//! peer disconnects.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::TICK;
use crate::error::{is_timeout, TransportError};

/// Granularity of the non-blocking accept poll
const ACCEPT_POLL: Duration = Duration::from_millis(10);

/// Receive buffer size per read
const READ_CHUNK: usize = 1024;

/// Currently attached peer
struct Peer {
    stream: TcpStream,
    addr: SocketAddr,
}

/// TCP listener accepting one peer at a time
pub struct ListenerTransport {
    host: String,
    port: u16,
    listener: Option<TcpListener>,
    /// At most one live peer
    peer: Option<Peer>,
}

impl ListenerTransport {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            listener: None,
            peer: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.listener.is_some()
    }

    /// Whether a peer is currently attached
    pub fn has_peer(&self) -> bool {
        self.peer.is_some()
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// Address of the attached peer
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer.as_ref().map(|p| p.addr)
    }

    /// Bind and listen without accepting
    ///
    /// The standard library enables `SO_REUSEADDR` on Unix listeners, so a
    /// restart does not trip over sockets lingering in TIME_WAIT.
    pub fn open(&mut self) -> Result<(), TransportError> {
        if self.listener.is_some() {
            return Ok(());
        }

        let addr_str = if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        };
        let addr = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|_| TransportError::Resolve(addr_str.clone()))?
            .next()
            .ok_or_else(|| TransportError::Resolve(addr_str.clone()))?;

        let listener = TcpListener::bind(addr).map_err(|source| TransportError::Bind {
            addr: addr_str.clone(),
            source,
        })?;
        listener.set_nonblocking(true)?;

        let bound = listener
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or(addr_str);
        info!("Listening on {}", bound);
        self.listener = Some(listener);
        Ok(())
    }

    /// Wait up to `timeout` for a peer to connect
    ///
    /// Returns true once a peer is attached. Returns immediately if one
    /// already is.
    pub fn accept_peer(&mut self, timeout: Duration) -> Result<bool, TransportError> {
        if self.peer.is_some() {
            return Ok(true);
        }
        let listener = self.listener.as_ref().ok_or(TransportError::NotOpen)?;

        let deadline = Instant::now() + timeout;
        loop {
            match listener.accept() {
                Ok((stream, addr)) => {
                    // Accepted sockets inherit non-blocking mode on some platforms
                    stream.set_nonblocking(false)?;
                    stream.set_read_timeout(Some(TICK))?;
                    stream.set_nodelay(true)?;
                    info!("Client connected: {}", addr);
                    self.peer = Some(Peer { stream, addr });
                    return Ok(true);
                }
                Err(e) if is_timeout(&e) => {}
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::ConnectionAborted | io::ErrorKind::ConnectionReset
                    ) =>
                {
                    warn!("Connection aborted during accept: {}", e);
                }
                Err(e) => return Err(e.into()),
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            thread::sleep(ACCEPT_POLL.min(deadline - now));
        }
    }

    /// Accept or read, bounded by one tick
    ///
    /// Without a peer this waits for one and returns no data; a freshly
    /// accepted peer is first read on the next call. With a peer it returns
    /// whatever arrived within the read timeout. A zero-length read detaches
    /// the peer.
    pub fn read_available(&mut self) -> Result<Vec<u8>, TransportError> {
        let Some(peer) = self.peer.as_mut() else {
            self.accept_peer(TICK)?;
            return Ok(Vec::new());
        };

        let mut buf = [0u8; READ_CHUNK];
        match peer.stream.read(&mut buf) {
            Ok(0) => {
                info!("Client disconnected: {}", peer.addr);
                self.drop_peer();
                Ok(Vec::new())
            }
            Ok(n) => {
                debug!("Read {} bytes from {}", n, peer.addr);
                Ok(buf[..n].to_vec())
            }
            Err(e) if is_timeout(&e) => Ok(Vec::new()),
            Err(e) => Err(self.lose_peer(e)),
        }
    }

    /// Send to the attached peer
    pub fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let peer = self.peer.as_mut().ok_or(TransportError::NotOpen)?;
        let result = peer.stream.write_all(data).and_then(|_| peer.stream.flush());
        match result {
            Ok(()) => {
                debug!("Wrote {} bytes to {}", data.len(), peer.addr);
                Ok(())
            }
            Err(e) => Err(self.lose_peer(e)),
        }
    }

    /// Close the peer and the listen socket; safe to call repeatedly
    pub fn close(&mut self) {
        self.drop_peer();
        if let Some(listener) = self.listener.take() {
            info!(
                "Stopped listening on {}",
                listener
                    .local_addr()
                    .map(|a| a.to_string())
                    .unwrap_or_else(|_| self.host.clone())
            );
        }
    }

    fn drop_peer(&mut self) {
        if let Some(peer) = self.peer.take() {
            let _ = peer.stream.shutdown(std::net::Shutdown::Both);
        }
    }

    fn lose_peer(&mut self, source: io::Error) -> TransportError {
        let peer = self
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        self.drop_peer();
        TransportError::PeerLost { peer, source }
    }
}
