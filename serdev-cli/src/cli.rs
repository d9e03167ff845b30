//! Command line arguments

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serdev_protocol::{ConfigLoader, EmulatorConfig};

/// Serial device mock tool
#[derive(Debug, Parser)]
#[command(name = "serdevmock", version, about)]
pub struct Cli {
    /// Protocol to emulate
    #[arg(long, value_enum, default_value = "uart")]
    pub protocol: ProtocolKind,

    /// Serial port (e.g. COM3, /dev/ttyS0) or socket://host:port to listen on.
    /// Overrides the port in the config file.
    #[arg(long)]
    pub port: String,

    /// Path to the JSON config file
    #[arg(long)]
    pub config: PathBuf,

    /// Write logs to this file instead of stdout
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Supported device protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProtocolKind {
    Uart,
}

impl ProtocolKind {
    pub fn name(self) -> &'static str {
        match self {
            ProtocolKind::Uart => "UART",
        }
    }
}

impl Cli {
    /// Load the config file and apply the `--port` override
    pub fn load_config(&self) -> Result<EmulatorConfig> {
        let config = ConfigLoader::new()
            .load(&self.config)
            .with_context(|| format!("failed to load config {}", self.config.display()))?;

        config
            .with_port(self.port.as_str())
            .resolve()
            .with_context(|| format!("invalid --port {:?}", self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serdev_protocol::TransportTarget;
    use std::fs;

    fn temp_config(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "serdev-cli-{}-{}.json",
            std::process::id(),
            name
        ));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_command_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_minimal_args() {
        let cli = Cli::try_parse_from([
            "serdevmock",
            "--port",
            "/dev/ttyS0",
            "--config",
            "device.json",
        ])
        .unwrap();

        assert_eq!(cli.protocol, ProtocolKind::Uart);
        assert_eq!(cli.port, "/dev/ttyS0");
        assert_eq!(cli.config, PathBuf::from("device.json"));
        assert_eq!(cli.log_file, None);
    }

    #[test]
    fn test_parse_all_args() {
        let cli = Cli::try_parse_from([
            "serdevmock",
            "--protocol",
            "uart",
            "--port",
            "socket://0.0.0.0:5000",
            "--config",
            "device.json",
            "--log-file",
            "mock.log",
        ])
        .unwrap();

        assert_eq!(cli.log_file, Some(PathBuf::from("mock.log")));
    }

    #[test]
    fn test_required_args() {
        assert!(Cli::try_parse_from(["serdevmock", "--config", "device.json"]).is_err());
        assert!(Cli::try_parse_from(["serdevmock", "--port", "COM3"]).is_err());
    }

    #[test]
    fn test_unknown_protocol_rejected() {
        assert!(Cli::try_parse_from([
            "serdevmock",
            "--protocol",
            "spi",
            "--port",
            "COM3",
            "--config",
            "device.json",
        ])
        .is_err());
    }

    #[test]
    fn test_port_overrides_config() {
        let path = temp_config(
            "override",
            r#"{"port": "COM3", "baudrate": 9600, "data_bits": 8, "parity": "N", "stop_bits": 1}"#,
        );
        let cli = Cli {
            protocol: ProtocolKind::Uart,
            port: "socket://127.0.0.1:6000".to_string(),
            config: path.clone(),
            log_file: None,
        };

        let config = cli.load_config().unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(
            config.target,
            TransportTarget::Listener {
                host: "127.0.0.1".into(),
                port: 6000
            }
        );
    }

    #[test]
    fn test_port_overrides_placeholder() {
        let path = temp_config(
            "placeholder",
            r#"{"port": "", "baudrate": 9600, "data_bits": 8, "parity": "N", "stop_bits": 1}"#,
        );
        let cli = Cli {
            protocol: ProtocolKind::Uart,
            port: "/dev/ttyS1".to_string(),
            config: path.clone(),
            log_file: None,
        };

        let config = cli.load_config().unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(config.target, TransportTarget::Line("/dev/ttyS1".into()));
    }

    #[test]
    fn test_invalid_port_override_fails() {
        let path = temp_config(
            "bad-port",
            r#"{"port": "COM3", "baudrate": 9600, "data_bits": 8, "parity": "N", "stop_bits": 1}"#,
        );
        let cli = Cli {
            protocol: ProtocolKind::Uart,
            port: "socket://host:notaport".to_string(),
            config: path.clone(),
            log_file: None,
        };

        let result = cli.load_config();
        fs::remove_file(&path).ok();

        assert!(format!("{:#}", result.unwrap_err()).contains("invalid --port"));
    }

    #[test]
    fn test_malformed_config_fails() {
        let path = temp_config("malformed", "{ invalid json }");
        let cli = Cli {
            protocol: ProtocolKind::Uart,
            port: "COM3".to_string(),
            config: path.clone(),
            log_file: None,
        };

        let result = cli.load_config();
        fs::remove_file(&path).ok();

        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("failed to load config"));
    }
}
