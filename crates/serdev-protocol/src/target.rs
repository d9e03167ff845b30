//! Transport target resolution
//!
//! A target string selects which transport the emulator opens. Strings with
//! the `socket://` prefix select a TCP listener; anything else is handed to
//! the serial layer as a device identifier (e.g. `/dev/ttyUSB0`, `COM3`).

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// URI prefix selecting the listener transport
pub const SOCKET_PREFIX: &str = "socket://";

/// Listen host used when a socket target omits it
pub const DEFAULT_LISTEN_HOST: &str = "0.0.0.0";

/// Listen port used when a socket target omits it
pub const DEFAULT_LISTEN_PORT: u16 = 5000;

/// Where the emulator attaches to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportTarget {
    /// Serial-like device path or identifier
    Line(String),
    /// TCP listen address, one peer at a time
    Listener {
        /// Host or IP literal to bind
        host: String,
        /// Port to bind (0 picks an ephemeral port)
        port: u16,
    },
}

impl TransportTarget {
    /// Returns true for the TCP listener variant
    pub fn is_listener(&self) -> bool {
        matches!(self, TransportTarget::Listener { .. })
    }

    /// `host:port` string suitable for socket address resolution
    ///
    /// Returns `None` for line targets.
    pub fn listen_addr(&self) -> Option<String> {
        match self {
            TransportTarget::Line(_) => None,
            TransportTarget::Listener { host, port } if host.contains(':') => {
                Some(format!("[{}]:{}", host, port))
            }
            TransportTarget::Listener { host, port } => Some(format!("{}:{}", host, port)),
        }
    }

    fn parse_socket(target: &str, rest: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidTarget {
            target: target.to_string(),
            reason: reason.to_string(),
        };

        // Drop any path or query component
        let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();

        let (host, port) = if let Some(bracketed) = authority.strip_prefix('[') {
            let (host, after) = bracketed
                .split_once(']')
                .ok_or_else(|| invalid("unterminated IPv6 literal"))?;
            match after {
                "" => (host, None),
                _ => match after.strip_prefix(':') {
                    Some(port) => (host, Some(port)),
                    None => return Err(invalid("unexpected characters after IPv6 literal")),
                },
            }
        } else {
            match authority.rsplit_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (authority, None),
            }
        };

        let host = if host.is_empty() {
            DEFAULT_LISTEN_HOST.to_string()
        } else {
            host.to_string()
        };

        let port = match port {
            None | Some("") => DEFAULT_LISTEN_PORT,
            Some(p) => p
                .parse::<u16>()
                .map_err(|_| invalid(&format!("port {:?} is not a number in 0-65535", p)))?,
        };

        Ok(TransportTarget::Listener { host, port })
    }
}

impl FromStr for TransportTarget {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix(SOCKET_PREFIX) {
            return Self::parse_socket(s, rest);
        }
        if s.is_empty() {
            return Err(ConfigError::InvalidTarget {
                target: String::new(),
                reason: "empty device name".to_string(),
            });
        }
        Ok(TransportTarget::Line(s.to_string()))
    }
}

impl fmt::Display for TransportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportTarget::Line(path) => write!(f, "{}", path),
            TransportTarget::Listener { .. } => {
                // listen_addr is always Some for listeners
                write!(f, "{}{}", SOCKET_PREFIX, self.listen_addr().unwrap_or_default())
            }
        }
    }
}
