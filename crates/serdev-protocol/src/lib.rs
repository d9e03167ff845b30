//! Serial Device Emulation Protocol Library
//!
//! This crate holds the transport-independent half of the device emulator:
//!
//! - **RuleSet**: ordered (pattern, response, delay) rules plus the echo flag
//! - **process**: maps a received byte chunk to the emulated device's answer
//! - **DeviceConfig / ConfigLoader**: JSON configuration, resolved into an
//!   **EmulatorConfig** once the port is final
//! - **TransportTarget**: serial device vs. `socket://host:port` listener
//!
//! # Example
//!
//! ```rust
//! use serdev_protocol::{process, ResponseRule, RuleSet};
//!
//! let rules = RuleSet::with_rules(vec![ResponseRule::new("AT", "OK")]);
//!
//! assert_eq!(process(b"AT\r\n", &rules), Some(b"OK".to_vec()));
//! assert_eq!(process(b"XYZ", &rules), None);
//! ```

pub mod config;
pub mod error;
pub mod processor;
pub mod rules;
pub mod target;

pub use config::{ConfigLoader, DeviceConfig, EmulatorConfig, LineParams};
pub use error::ConfigError;
pub use processor::process;
pub use rules::{ResponseRule, RuleSet};
pub use target::{TransportTarget, DEFAULT_LISTEN_HOST, DEFAULT_LISTEN_PORT, SOCKET_PREFIX};
