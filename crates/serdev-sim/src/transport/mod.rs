//! Transports the emulator can serve requests over
//!
//! Both variants share one capability set (`open`, `read_available`,
//! `write`, `close`) and bound every blocking call by [`TICK`] so the run
//! loop can observe a stop request promptly.

mod line;
mod listener;

use std::net::SocketAddr;
use std::time::Duration;

use serdev_protocol::{EmulatorConfig, TransportTarget};

pub use line::{serial_settings, LineTransport};
pub use listener::ListenerTransport;

use crate::error::TransportError;

/// Upper bound on any blocking accept or read
pub const TICK: Duration = Duration::from_millis(100);

/// Sleep between polls of an idle serial line
pub const LINE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Transport selected by the configured target
pub enum Transport {
    /// Serial-like device
    Line(LineTransport),
    /// TCP listener, one peer at a time
    Listener(ListenerTransport),
}

impl Transport {
    /// Build the (unopened) transport for a configuration
    pub fn from_config(config: &EmulatorConfig) -> Self {
        match &config.target {
            TransportTarget::Line(path) => {
                Transport::Line(LineTransport::new(path.clone(), config.line.clone()))
            }
            TransportTarget::Listener { host, port } => {
                Transport::Listener(ListenerTransport::new(host.clone(), *port))
            }
        }
    }

    pub fn open(&mut self) -> Result<(), TransportError> {
        match self {
            Transport::Line(t) => t.open(),
            Transport::Listener(t) => t.open(),
        }
    }

    /// Bytes received within one tick, possibly none
    pub fn read_available(&mut self) -> Result<Vec<u8>, TransportError> {
        match self {
            Transport::Line(t) => t.read_available(),
            Transport::Listener(t) => t.read_available(),
        }
    }

    pub fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        match self {
            Transport::Line(t) => t.write(data),
            Transport::Listener(t) => t.write(data),
        }
    }

    /// Release all handles; safe to call repeatedly
    pub fn close(&mut self) {
        match self {
            Transport::Line(t) => t.close(),
            Transport::Listener(t) => t.close(),
        }
    }

    pub fn is_open(&self) -> bool {
        match self {
            Transport::Line(t) => t.is_open(),
            Transport::Listener(t) => t.is_open(),
        }
    }

    /// Bound listen address (listener only)
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match self {
            Transport::Line(_) => None,
            Transport::Listener(t) => t.local_addr(),
        }
    }

    /// How long the run loop should sleep after an empty read
    ///
    /// The serial line does not block when idle, so the loop backs off to
    /// avoid spinning. Listener reads already wait out a full tick.
    pub fn idle_backoff(&self) -> Option<Duration> {
        match self {
            Transport::Line(_) => Some(LINE_POLL_INTERVAL),
            Transport::Listener(_) => None,
        }
    }
}
