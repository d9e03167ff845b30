//! Serial line transport

use std::io::{Read, Write};

use serdev_protocol::LineParams;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use super::TICK;
use crate::error::{is_timeout, TransportError};

/// Serial-like device opened with configured line parameters
pub struct LineTransport {
    /// Device path or identifier
    path: String,
    params: LineParams,
    /// Open device handle
    port: Option<Box<dyn SerialPort>>,
}

impl LineTransport {
    pub fn new(path: impl Into<String>, params: LineParams) -> Self {
        Self {
            path: path.into(),
            params,
            port: None,
        }
    }

    /// Device path or identifier
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    /// Open the device with a one-tick read timeout
    pub fn open(&mut self) -> Result<(), TransportError> {
        if self.port.is_some() {
            return Ok(());
        }

        let (data_bits, parity, stop_bits) = serial_settings(&self.params)?;
        let port = serialport::new(&self.path, self.params.baudrate)
            .data_bits(data_bits)
            .parity(parity)
            .stop_bits(stop_bits)
            .flow_control(FlowControl::None)
            .timeout(TICK)
            .open()
            .map_err(|source| TransportError::Open {
                target: self.path.clone(),
                source,
            })?;

        info!(
            "Opened {} at {} baud ({}{}{})",
            self.path,
            self.params.baudrate,
            self.params.data_bits,
            self.params.parity.to_ascii_uppercase(),
            self.params.stop_bits
        );
        self.port = Some(port);
        Ok(())
    }

    /// Bytes currently buffered by the device, possibly none
    pub fn read_available(&mut self) -> Result<Vec<u8>, TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::NotOpen)?;

        let waiting = port.bytes_to_read()? as usize;
        if waiting == 0 {
            return Ok(Vec::new());
        }

        let mut buf = vec![0u8; waiting];
        match port.read(&mut buf) {
            Ok(n) => {
                buf.truncate(n);
                debug!("Read {} bytes from {}", n, self.path);
                Ok(buf)
            }
            Err(e) if is_timeout(&e) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::NotOpen)?;
        port.write_all(data)?;
        port.flush()?;
        debug!("Wrote {} bytes to {}", data.len(), self.path);
        Ok(())
    }

    /// Release the device handle; safe to call repeatedly
    pub fn close(&mut self) {
        if self.port.take().is_some() {
            info!("Closed {}", self.path);
        }
    }
}

/// Convert configured line parameters to serial port settings
pub fn serial_settings(
    params: &LineParams,
) -> Result<(DataBits, Parity, StopBits), TransportError> {
    if params.baudrate == 0 {
        return Err(TransportError::InvalidLineParams(
            "baudrate must be greater than 0".to_string(),
        ));
    }

    let data_bits = match params.data_bits {
        5 => DataBits::Five,
        6 => DataBits::Six,
        7 => DataBits::Seven,
        8 => DataBits::Eight,
        other => {
            return Err(TransportError::InvalidLineParams(format!(
                "data_bits must be 5-8, got {}",
                other
            )))
        }
    };

    let parity = match params.parity.to_ascii_uppercase().as_str() {
        "N" | "NONE" => Parity::None,
        "E" | "EVEN" => Parity::Even,
        "O" | "ODD" => Parity::Odd,
        other => {
            return Err(TransportError::InvalidLineParams(format!(
                "unsupported parity {:?}",
                other
            )))
        }
    };

    let stop_bits = match params.stop_bits {
        1 => StopBits::One,
        2 => StopBits::Two,
        other => {
            return Err(TransportError::InvalidLineParams(format!(
                "stop_bits must be 1 or 2, got {}",
                other
            )))
        }
    };

    Ok((data_bits, parity, stop_bits))
}
