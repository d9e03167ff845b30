//! Serial Device Emulator
//!
//! This crate lets client software exercise a serial protocol without real
//! hardware. It includes:
//!
//! - **Transport**: a serial line or a one-peer-at-a-time TCP listener
//! - **Emulator**: start/run/stop lifecycle answering requests from a rule set
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::thread;
//!
//! use serdev_protocol::{EmulatorConfig, ResponseRule, RuleSet};
//! use serdev_sim::Emulator;
//!
//! let config = EmulatorConfig::new(
//!     "socket://127.0.0.1:5000".parse().unwrap(),
//!     RuleSet::with_rules(vec![ResponseRule::new("AT", "OK\r\n")]),
//! );
//!
//! let emulator = Arc::new(Emulator::new(config));
//! emulator.start().unwrap();
//!
//! let runner = Arc::clone(&emulator);
//! let handle = thread::spawn(move || runner.run());
//!
//! // ... later, e.g. from a signal handler
//! emulator.stop();
//! handle.join().unwrap().unwrap();
//! ```

pub mod emulator;
pub mod error;
pub mod transport;

pub use emulator::Emulator;
pub use error::TransportError;
pub use transport::{LineTransport, ListenerTransport, Transport, LINE_POLL_INTERVAL, TICK};
