//! Line-oriented transports to the printer.
//!
//! The driver only needs to send one line and read one line back. The
//! [`LineTransport`] trait captures exactly that, so sessions can run over
//! the real serial port or over a scripted transport in tests.

use std::time::Duration;

use async_trait::async_trait;
use serial2_tokio::SerialPort;
use tracing::debug;

use crate::error::PrinterError;

use super::session::{PrinterConnector, PrinterSession};

/// Default serial device on a Raspberry Pi wired to the printer mainboard.
pub const DEFAULT_SERIAL_PORT: &str = "/dev/serial0";

/// Baud rate used by ChiTu mainboards.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default time to wait for one response line.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);

const READ_CHUNK_SIZE: usize = 256;

// =============================================================================
// LineTransport
// =============================================================================

/// Half-duplex, line-framed link to a device.
#[async_trait]
pub trait LineTransport: Send {
    /// Write one line. The terminator is appended by the transport.
    async fn send_line(&mut self, line: &str) -> Result<(), PrinterError>;

    /// Read one complete line as raw bytes, terminator included.
    ///
    /// End of stream is a [`PrinterError::Connection`].
    async fn receive_line(&mut self) -> Result<Vec<u8>, PrinterError>;

    /// Release the underlying link.
    async fn close(&mut self) -> Result<(), PrinterError>;
}

// =============================================================================
// Serial
// =============================================================================

/// Serial link settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERIAL_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// [`LineTransport`] over a serial port.
pub struct SerialTransport {
    port: Option<SerialPort>,
    /// Bytes read past the end of the last returned line
    pending: Vec<u8>,
}

impl SerialTransport {
    /// Open the serial device.
    pub fn open(port: &str, baud_rate: u32) -> Result<Self, PrinterError> {
        let serial = SerialPort::open(port, baud_rate)
            .map_err(|e| PrinterError::Connection(format!("{}: {}", port, e)))?;

        Ok(Self {
            port: Some(serial),
            pending: Vec::with_capacity(READ_CHUNK_SIZE),
        })
    }

    fn port(&self) -> Result<&SerialPort, PrinterError> {
        self.port
            .as_ref()
            .ok_or_else(|| PrinterError::Connection("serial port is closed".to_string()))
    }

    /// Split the first complete line off the pending buffer.
    fn take_line(&mut self) -> Option<Vec<u8>> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        Some(self.pending.drain(..=end).collect())
    }
}

#[async_trait]
impl LineTransport for SerialTransport {
    async fn send_line(&mut self, line: &str) -> Result<(), PrinterError> {
        let mut framed = Vec::with_capacity(line.len() + 1);
        framed.extend_from_slice(line.as_bytes());
        framed.push(b'\n');

        self.port()?
            .write_all(&framed)
            .await
            .map_err(|e| PrinterError::Connection(e.to_string()))
    }

    async fn receive_line(&mut self) -> Result<Vec<u8>, PrinterError> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            if let Some(line) = self.take_line() {
                return Ok(line);
            }

            let n = self
                .port()?
                .read(&mut chunk)
                .await
                .map_err(|e| PrinterError::Connection(e.to_string()))?;
            if n == 0 {
                return Err(PrinterError::Connection(
                    "serial port closed by device".to_string(),
                ));
            }
            self.pending.extend_from_slice(&chunk[..n]);
        }
    }

    async fn close(&mut self) -> Result<(), PrinterError> {
        // Dropping the handle closes the device
        self.port.take();
        self.pending.clear();
        Ok(())
    }
}

/// Opens a fresh serial session per use.
#[derive(Debug, Clone)]
pub struct SerialConnector {
    config: SerialConfig,
}

impl SerialConnector {
    pub fn new(config: SerialConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }
}

#[async_trait]
impl PrinterConnector for SerialConnector {
    type Printer = PrinterSession<SerialTransport>;

    async fn connect(&self) -> Result<Self::Printer, PrinterError> {
        debug!(
            port = %self.config.port,
            baud_rate = self.config.baud_rate,
            "Opening printer connection"
        );
        let transport = SerialTransport::open(&self.config.port, self.config.baud_rate)?;
        Ok(PrinterSession::new(transport, self.config.read_timeout))
    }

    async fn disconnect(&self, printer: Self::Printer) -> Result<(), PrinterError> {
        printer.close().await?;
        debug!(port = %self.config.port, "Printer connection closed");
        Ok(())
    }
}
