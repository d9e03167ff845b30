//! Virtual Serial Port Tool Detection Library
//!
//! This crate reports whether the host has a tool for creating virtual
//! serial port pairs (`socat` on Linux/macOS, `com0com` on Windows).
//!
//! # Example
//!
//! ```rust,no_run
//! use serdev_detect::VPortToolChecker;
//!
//! # async fn example() {
//! let status = VPortToolChecker::new().check().await;
//! if !status.is_installed {
//!     println!("{}", status.install_instruction());
//! }
//! # }
//! ```

pub mod vport;

pub use vport::{
    parse_socat_version, platform_name, CheckerConfig, VPortToolChecker, VPortToolStatus,
};
