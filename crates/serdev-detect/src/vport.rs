//! Virtual port tool detection
//!
//! Emulating a serial device locally needs a pair of connected virtual
//! ports: `socat` provides them on Linux and macOS, `com0com` on Windows.
//! This module reports whether the platform's tool is present. The result
//! is advisory only.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serialport::{available_ports, SerialPortType};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, trace};

/// Port name prefixes com0com uses for its port pairs
const COM0COM_PREFIXES: [&str; 2] = ["CNCA", "CNCB"];

/// Installation status of the platform's virtual port tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VPortToolStatus {
    /// `socat`, `com0com` or `unknown`
    pub tool_name: String,
    pub is_installed: bool,
    /// Tool version, if it could be determined
    pub version: Option<String>,
    /// `Linux`, `Darwin`, `Windows` or the raw OS name
    pub platform_name: String,
}

impl VPortToolStatus {
    fn missing(tool_name: &str, platform_name: &str) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            is_installed: false,
            version: None,
            platform_name: platform_name.to_string(),
        }
    }

    /// Human readable installation hint for this platform
    pub fn install_instruction(&self) -> String {
        match self.platform_name.as_str() {
            "Windows" => "Install com0com.\n\
                 Download: https://sourceforge.net/projects/com0com/"
                .to_string(),
            "Linux" => "Install socat.\n\
                 Command: apt-get install socat or yum install socat"
                .to_string(),
            "Darwin" => "Install socat.\nCommand: brew install socat".to_string(),
            _ => "Unsupported platform".to_string(),
        }
    }
}

/// Configuration for tool detection
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Program probed on Linux and macOS
    pub socat_program: String,
    /// Upper bound on the version probe
    pub timeout: Duration,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            socat_program: "socat".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Virtual port tool checker
pub struct VPortToolChecker {
    config: CheckerConfig,
}

impl VPortToolChecker {
    /// Create a checker with default configuration
    pub fn new() -> Self {
        Self {
            config: CheckerConfig::default(),
        }
    }

    /// Create a checker with custom configuration
    pub fn with_config(config: CheckerConfig) -> Self {
        Self { config }
    }

    /// Check the tool relevant to the current platform
    pub async fn check(&self) -> VPortToolStatus {
        let platform = platform_name();
        let status = match platform {
            "Windows" => self.check_com0com(),
            "Linux" | "Darwin" => self.check_socat(platform).await,
            other => VPortToolStatus::missing("unknown", other),
        };

        info!(
            "Virtual port tool {}: {}",
            status.tool_name,
            if status.is_installed {
                "installed"
            } else {
                "not installed"
            }
        );
        status
    }

    /// Run `socat -V` and pull the version out of its output
    ///
    /// Any completed run counts as installed, even with a non-zero exit.
    pub async fn check_socat(&self, platform: &str) -> VPortToolStatus {
        let program = &self.config.socat_program;
        trace!("Running {} -V", program);

        let mut cmd = Command::new(program);
        cmd.arg("-V").kill_on_drop(true);

        match timeout(self.config.timeout, cmd.output()).await {
            Ok(Ok(output)) => {
                let version = if output.status.success() {
                    parse_socat_version(&String::from_utf8_lossy(&output.stdout))
                } else {
                    None
                };
                debug!("{} reported version {:?}", program, version);
                VPortToolStatus {
                    tool_name: "socat".to_string(),
                    is_installed: true,
                    version,
                    platform_name: platform.to_string(),
                }
            }
            Ok(Err(e)) => {
                debug!("Could not run {}: {}", program, e);
                VPortToolStatus::missing("socat", platform)
            }
            Err(_) => {
                debug!("{} -V timed out after {:?}", program, self.config.timeout);
                VPortToolStatus::missing("socat", platform)
            }
        }
    }

    /// Look for com0com port pairs among the system's serial ports
    ///
    /// com0com does not expose a version, so none is reported.
    pub fn check_com0com(&self) -> VPortToolStatus {
        let ports = match available_ports() {
            Ok(ports) => ports,
            Err(e) => {
                debug!("Failed to enumerate ports: {}", e);
                return VPortToolStatus::missing("com0com", "Windows");
            }
        };

        let found = ports
            .iter()
            .any(|p| is_com0com_port(&p.port_name, &p.port_type));

        VPortToolStatus {
            tool_name: "com0com".to_string(),
            is_installed: found,
            version: None,
            platform_name: "Windows".to_string(),
        }
    }
}

impl Default for VPortToolChecker {
    fn default() -> Self {
        Self::new()
    }
}

/// Platform name in the form the status reports it
pub fn platform_name() -> &'static str {
    match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "Darwin",
        "windows" => "Windows",
        other => other,
    }
}

/// Extract the token following `version` in `socat -V` output
pub fn parse_socat_version(output: &str) -> Option<String> {
    let lower = output.to_ascii_lowercase();
    let mut search_from = 0;

    while let Some(pos) = lower[search_from..].find("version") {
        let after = search_from + pos + "version".len();
        let rest = &output[after..];
        let trimmed = rest.trim_start();
        if trimmed.len() < rest.len() {
            if let Some(token) = trimmed.split_whitespace().next() {
                return Some(token.to_string());
            }
        }
        search_from = after;
    }

    None
}

fn is_com0com_port(name: &str, port_type: &SerialPortType) -> bool {
    let upper = name.to_ascii_uppercase();
    if COM0COM_PREFIXES.iter().any(|p| upper.starts_with(p)) {
        return true;
    }

    match port_type {
        SerialPortType::UsbPort(usb) => [&usb.product, &usb.manufacturer]
            .into_iter()
            .flatten()
            .any(|s| s.to_ascii_lowercase().contains("com0com")),
        _ => false,
    }
}
