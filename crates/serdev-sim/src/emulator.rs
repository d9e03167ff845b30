//! Device emulator lifecycle and run loop
//!
//! The emulator owns the transport and the configuration. It is designed to
//! be shared through an `Arc`: one thread blocks in [`Emulator::run`] while
//! another (typically a signal handler) calls [`Emulator::stop`].
//!
//! The run loop takes the transport lock for one bounded step at a time, so
//! a concurrent `stop()` waits at most one [`TICK`](crate::TICK) (plus any
//! in-flight response write) before closing the transport. The running flag
//! is re-checked every iteration.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;

use serdev_protocol::{process, EmulatorConfig};
use tracing::{debug, error, info, warn};

use crate::error::TransportError;
use crate::transport::Transport;

/// Outcome of a single run-loop step
enum Step {
    /// Nothing arrived; sleep this long before the next poll, if anything
    Idle(Option<std::time::Duration>),
    /// A request was handled
    Served,
}

/// Emulated serial device
pub struct Emulator {
    config: EmulatorConfig,
    running: AtomicBool,
    /// Open transport while running
    transport: Mutex<Option<Transport>>,
}

impl Emulator {
    /// Create a stopped emulator
    pub fn new(config: EmulatorConfig) -> Self {
        Self {
            config,
            running: AtomicBool::new(false),
            transport: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Bound listen address while a listener target is open
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.lock_transport().as_ref().and_then(Transport::local_addr)
    }

    /// Open the configured transport and enter the running state
    ///
    /// On failure the emulator stays stopped. Starting an emulator that is
    /// already running does nothing.
    pub fn start(&self) -> Result<(), TransportError> {
        let mut slot = self.lock_transport();
        if self.is_running() {
            debug!("Emulator for {} already running", self.config.target);
            return Ok(());
        }

        let mut transport = Transport::from_config(&self.config);
        if let Err(e) = transport.open() {
            transport.close();
            return Err(e);
        }

        *slot = Some(transport);
        self.running.store(true, Ordering::SeqCst);
        info!("Emulator started on {}", self.config.target);
        Ok(())
    }

    /// Serve requests until stopped
    ///
    /// Returns immediately when the emulator is not running. A fatal
    /// transport error stops the emulator, releasing the transport, and is
    /// returned. Lost listener peers are logged and the loop carries on.
    pub fn run(&self) -> Result<(), TransportError> {
        if !self.is_running() {
            return Ok(());
        }

        if self.config.target.is_listener() {
            info!("Waiting for client connection...");
        }

        while self.is_running() {
            match self.step() {
                Ok(Step::Idle(Some(backoff))) => thread::sleep(backoff),
                Ok(Step::Idle(None)) | Ok(Step::Served) => {}
                Err(e) if e.is_recoverable() => warn!("{}", e),
                Err(e) => {
                    error!("Transport error on {}: {}", self.config.target, e);
                    self.stop();
                    return Err(e);
                }
            }
        }

        debug!("Run loop for {} exited", self.config.target);
        Ok(())
    }

    /// Leave the running state and release the transport
    ///
    /// Safe to call at any time, repeatedly, and from another thread while
    /// `run()` is in progress.
    pub fn stop(&self) {
        let was_running = self.running.swap(false, Ordering::SeqCst);
        if let Some(mut transport) = self.lock_transport().take() {
            transport.close();
        }
        if was_running {
            info!("Emulator stopped on {}", self.config.target);
        }
    }

    /// Read once, then answer outside the lock so rule delays do not hold up `stop()`
    fn step(&self) -> Result<Step, TransportError> {
        let request = {
            let mut slot = self.lock_transport();
            let Some(transport) = slot.as_mut() else {
                return Ok(Step::Idle(None));
            };
            let request = transport.read_available()?;
            if request.is_empty() {
                return Ok(Step::Idle(transport.idle_backoff()));
            }
            request
        };

        let Some(response) = process(&request, &self.config.rules) else {
            return Ok(Step::Served);
        };

        let mut slot = self.lock_transport();
        match slot.as_mut() {
            Some(transport) if self.is_running() => transport.write(&response)?,
            _ => debug!("Dropping response, emulator stopped"),
        }
        Ok(Step::Served)
    }

    fn lock_transport(&self) -> MutexGuard<'_, Option<Transport>> {
        self.transport
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Emulator {
    fn drop(&mut self) {
        self.stop();
    }
}
