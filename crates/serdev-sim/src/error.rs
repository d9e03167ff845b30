//! Error types for transports and the emulator

use std::io;

use thiserror::Error;

/// Errors that can occur while opening or driving a transport
#[derive(Debug, Error)]
pub enum TransportError {
    /// Failed to open the serial device
    #[error("failed to open {target}: {source}")]
    Open {
        target: String,
        #[source]
        source: serialport::Error,
    },

    /// Failed to bind the listen socket
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Listen address did not resolve
    #[error("could not resolve listen address {0}")]
    Resolve(String),

    /// Line parameters the serial layer cannot express
    #[error("invalid line parameters: {0}")]
    InvalidLineParams(String),

    /// The current peer connection failed and was dropped
    #[error("peer {peer} dropped: {source}")]
    PeerLost {
        peer: String,
        #[source]
        source: io::Error,
    },

    /// Operation on a transport that is not open
    #[error("transport is not open")]
    NotOpen,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serial port error
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl TransportError {
    /// Whether the run loop can continue after this error
    ///
    /// Only the loss of a listener peer is recoverable; the listener keeps
    /// accepting new peers afterwards.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TransportError::PeerLost { .. })
    }
}

/// Returns true for I/O errors that only signal an elapsed timeout
pub(crate) fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}
