//! Serial-port transport for the hand controller.
//!
//! The line is 8N1 with no flow control; the controller answers within a
//! fixed frame per command, so reads loop until the expected length is in
//! or the 500 ms inter-byte timeout fires.

use super::protocol::Channel;
use serialport::SerialPort;
use std::io::{Read, Write};
use std::time::Duration;

const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Lazily-opened serial channel; the port is opened on the first
/// transaction so that the server can start without the mount attached.
pub struct SerialChannel {
    path: String,
    baud_rate: u32,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialChannel {
    pub fn new(path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            path: path.into(),
            baud_rate,
            port: None,
        }
    }

    fn ensure_open(&mut self) -> std::io::Result<&mut Box<dyn SerialPort>> {
        if self.port.is_none() {
            let port = serialport::new(self.path.as_str(), self.baud_rate)
                .data_bits(serialport::DataBits::Eight)
                .parity(serialport::Parity::None)
                .stop_bits(serialport::StopBits::One)
                .flow_control(serialport::FlowControl::None)
                .timeout(READ_TIMEOUT)
                .open()
                .map_err(|err| {
                    tracing::warn!(path = %self.path, %err, "Failed to open serial port");
                    std::io::Error::new(std::io::ErrorKind::NotConnected, err)
                })?;

            tracing::info!(path = %self.path, baud = self.baud_rate, "Opened serial port");
            self.port = Some(port);
        }

        // The Option was just filled above.
        match self.port.as_mut() {
            Some(port) => Ok(port),
            None => Err(std::io::Error::from(std::io::ErrorKind::NotConnected)),
        }
    }
}

impl std::fmt::Debug for SerialChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialChannel")
            .field("path", &self.path)
            .field("baud_rate", &self.baud_rate)
            .field("open", &self.port.is_some())
            .finish()
    }
}

impl Channel for SerialChannel {
    fn send_command(&mut self, request: &[u8], response: &mut [u8]) -> std::io::Result<usize> {
        let result = (|| {
            let port = self.ensure_open()?;

            port.write_all(request)?;

            let mut filled = 0;
            while filled < response.len() {
                match port.read(&mut response[filled..]) {
                    Ok(0) => break,
                    Ok(count) => filled += count,
                    Err(err) if err.kind() == std::io::ErrorKind::TimedOut => break,
                    Err(err) => return Err(err),
                }
            }

            Ok(filled)
        })();

        // A failed transaction closes the port; the next one reopens it.
        if result.is_err() {
            self.port = None;
        }

        result
    }
}
