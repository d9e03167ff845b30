//! Integration tests for the device emulator
//!
//! These tests drive a running emulator over real loopback sockets:
//! - Request/response scenarios, including sequential clients
//! - One-peer-at-a-time serving
//! - Response delay over the wire
//! - Stopping from another thread while `run()` is blocked
//! - The serial line run loop over a pseudo-terminal pair (unix only)

use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serdev_protocol::{EmulatorConfig, ResponseRule, RuleSet, TransportTarget};
use serdev_sim::{Emulator, TransportError};

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    /// Running emulator on an ephemeral loopback port
    pub struct Harness {
        pub emulator: Arc<Emulator>,
        pub addr: SocketAddr,
        runner: Option<JoinHandle<Result<(), TransportError>>>,
    }

    impl Harness {
        pub fn start(rules: RuleSet) -> Self {
            let config = EmulatorConfig::new("socket://127.0.0.1:0".parse().unwrap(), rules);
            let emulator = Arc::new(Emulator::new(config));
            emulator.start().unwrap();
            let addr = emulator.local_addr().unwrap();

            let runner = {
                let emulator = Arc::clone(&emulator);
                thread::spawn(move || emulator.run())
            };

            Self {
                emulator,
                addr,
                runner: Some(runner),
            }
        }

        pub fn connect(&self) -> TcpStream {
            let stream = TcpStream::connect(self.addr).unwrap();
            stream
                .set_read_timeout(Some(Duration::from_secs(3)))
                .unwrap();
            stream
        }

        /// Stop the emulator and wait for the run loop to exit
        pub fn shutdown(mut self) -> Result<(), TransportError> {
            self.emulator.stop();
            self.runner.take().unwrap().join().unwrap()
        }
    }

    impl Drop for Harness {
        fn drop(&mut self) {
            self.emulator.stop();
            if let Some(runner) = self.runner.take() {
                let _ = runner.join();
            }
        }
    }

    pub fn at_rules() -> RuleSet {
        RuleSet::with_rules(vec![
            ResponseRule::new("AT+CGMI", "Mock Inc\r\n"),
            ResponseRule::new("AT", "OK"),
        ])
    }

    /// Send a request and read the reply
    pub fn exchange(stream: &mut TcpStream, request: &[u8]) -> Vec<u8> {
        stream.write_all(request).unwrap();
        read_reply(stream)
    }

    pub fn read_reply(stream: &mut TcpStream) -> Vec<u8> {
        let mut buf = [0u8; 256];
        let n = stream.read(&mut buf).unwrap();
        buf[..n].to_vec()
    }

    /// True if nothing arrives within `wait`
    pub fn stays_silent(stream: &mut TcpStream, wait: Duration) -> bool {
        stream.set_read_timeout(Some(wait)).unwrap();
        let mut buf = [0u8; 16];
        let silent = match stream.read(&mut buf) {
            Err(e) => matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut),
            Ok(_) => false,
        };
        stream
            .set_read_timeout(Some(Duration::from_secs(3)))
            .unwrap();
        silent
    }
}

use helpers::Harness;

// ============================================================================
// Request / Response
// ============================================================================

#[test]
fn at_command_over_socket() {
    let harness = Harness::start(helpers::at_rules());
    let mut client = harness.connect();

    assert_eq!(helpers::exchange(&mut client, b"AT\r\n"), b"OK");
    assert_eq!(helpers::exchange(&mut client, b"AT+CGMI\r\n"), b"Mock Inc\r\n");
}

#[test]
fn unmatched_request_gets_no_reply() {
    let harness = Harness::start(helpers::at_rules());
    let mut client = harness.connect();

    client.write_all(b"XYZ").unwrap();
    assert!(helpers::stays_silent(&mut client, Duration::from_millis(300)));

    // Connection is still served afterwards
    assert_eq!(helpers::exchange(&mut client, b"AT\r\n"), b"OK");
}

#[test]
fn echo_mode_over_socket() {
    let mut rules = helpers::at_rules();
    rules.echo_mode = true;
    let harness = Harness::start(rules);
    let mut client = harness.connect();

    assert_eq!(helpers::exchange(&mut client, b"Hello"), b"Hello");
    assert_eq!(helpers::exchange(&mut client, b"AT\r\n"), b"AT\r\n");
}

#[test]
fn sequential_clients_served_identically() {
    let harness = Harness::start(helpers::at_rules());

    let mut first = harness.connect();
    assert_eq!(helpers::exchange(&mut first, b"AT\r\n"), b"OK");
    drop(first);

    let mut second = harness.connect();
    assert_eq!(helpers::exchange(&mut second, b"AT\r\n"), b"OK");
    drop(second);

    assert!(harness.emulator.is_running());
}

#[test]
fn second_peer_waits_for_first_to_disconnect() {
    let harness = Harness::start(helpers::at_rules());

    let mut first = harness.connect();
    assert_eq!(helpers::exchange(&mut first, b"AT\r\n"), b"OK");

    // Connects at the TCP level but is not accepted yet
    let mut second = harness.connect();
    second.write_all(b"AT\r\n").unwrap();
    assert!(helpers::stays_silent(&mut second, Duration::from_millis(400)));

    // First peer is still the one being served
    assert_eq!(helpers::exchange(&mut first, b"AT\r\n"), b"OK");

    drop(first);
    assert_eq!(helpers::read_reply(&mut second), b"OK");
}

#[test]
fn response_delay_over_socket() {
    let rules = RuleSet::with_rules(vec![
        ResponseRule::new("SLOW", "DONE").with_delay(Duration::from_millis(100)),
        ResponseRule::new("FAST", "DONE"),
    ]);
    let harness = Harness::start(rules);
    let mut client = harness.connect();

    // Warm up so the accept is out of the way
    assert_eq!(helpers::exchange(&mut client, b"FAST"), b"DONE");

    let start = Instant::now();
    assert_eq!(helpers::exchange(&mut client, b"SLOW"), b"DONE");
    assert!(start.elapsed() >= Duration::from_millis(100));
}

// ============================================================================
// Serial Line
// ============================================================================

#[cfg(unix)]
#[test]
fn at_command_over_pty_line() {
    use serialport::{SerialPort, TTYPort};

    let (mut master, slave) = TTYPort::pair().unwrap();
    let device = slave.name().unwrap();
    master.set_timeout(Duration::from_secs(3)).unwrap();

    let config = EmulatorConfig::new(TransportTarget::Line(device), helpers::at_rules());
    let emulator = Arc::new(Emulator::new(config));
    emulator.start().unwrap();
    let runner = {
        let emulator = Arc::clone(&emulator);
        thread::spawn(move || emulator.run())
    };

    master.write_all(b"AT\r\n").unwrap();
    let mut reply = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    while !reply.ends_with(b"OK") && Instant::now() < deadline {
        let mut buf = [0u8; 64];
        match master.read(&mut buf) {
            Ok(n) => reply.extend_from_slice(&buf[..n]),
            Err(e) if e.kind() == ErrorKind::TimedOut => break,
            Err(e) => panic!("read from pty master failed: {}", e),
        }
    }
    assert_eq!(reply, b"OK");

    // The idle line loop notices the stop within about one tick
    let start = Instant::now();
    emulator.stop();
    assert!(runner.join().unwrap().is_ok());
    assert!(start.elapsed() < Duration::from_millis(500));
    assert!(!emulator.is_running());

    drop(slave);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn stop_interrupts_idle_run_loop() {
    let harness = Harness::start(helpers::at_rules());
    thread::sleep(Duration::from_millis(150));

    let start = Instant::now();
    assert!(harness.shutdown().is_ok());
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn stop_with_connected_peer() {
    let harness = Harness::start(helpers::at_rules());
    let mut client = harness.connect();
    assert_eq!(helpers::exchange(&mut client, b"AT\r\n"), b"OK");

    let emulator = Arc::clone(&harness.emulator);
    assert!(harness.shutdown().is_ok());
    assert!(!emulator.is_running());

    // The peer sees the connection close
    let mut buf = [0u8; 8];
    match client.read(&mut buf) {
        Ok(n) => assert_eq!(n, 0),
        Err(e) => assert_ne!(e.kind(), ErrorKind::WouldBlock),
    }
}

#[test]
fn port_is_released_after_stop() {
    let harness = Harness::start(helpers::at_rules());
    let addr = harness.addr;
    assert!(harness.shutdown().is_ok());

    let config = EmulatorConfig::new(
        TransportTarget::Listener {
            host: "127.0.0.1".into(),
            port: addr.port(),
        },
        helpers::at_rules(),
    );
    let emulator = Emulator::new(config);
    assert!(emulator.start().is_ok());
    emulator.stop();
}

#[test]
fn stop_is_idempotent() {
    let harness = Harness::start(helpers::at_rules());
    harness.emulator.stop();
    harness.emulator.stop();
    assert!(!harness.emulator.is_running());
    assert!(harness.shutdown().is_ok());
}

#[test]
fn start_fails_when_port_in_use() {
    let harness = Harness::start(helpers::at_rules());

    let config = EmulatorConfig::new(
        TransportTarget::Listener {
            host: "127.0.0.1".into(),
            port: harness.addr.port(),
        },
        helpers::at_rules(),
    );
    let emulator = Emulator::new(config);
    assert!(matches!(emulator.start(), Err(TransportError::Bind { .. })));
    assert!(!emulator.is_running());
}

#[test]
fn missing_serial_device_fails_start() {
    let config = EmulatorConfig::new(
        TransportTarget::Line("/dev/serdevmock-no-such-device".into()),
        helpers::at_rules(),
    );
    let emulator = Emulator::new(config);

    assert!(matches!(emulator.start(), Err(TransportError::Open { .. })));
    assert!(!emulator.is_running());
    assert!(emulator.run().is_ok());
}
