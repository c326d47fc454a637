//! Printer sessions and the scoped acquire/release pattern.
//!
//! A [`PrinterSession`] owns one transport and runs strictly one command at a
//! time: send a line, wait for one response line, parse it. There is no
//! pipelining and no internal retry.
//!
//! # Failure Modes
//!
//! - **Protocol error**: a complete but malformed line was read. The link is
//!   still framed on a line boundary and the session stays usable.
//! - **Timeout / connection error**: the framing state of the link is unknown.
//!   The session is poisoned and every further command fails with
//!   [`PrinterError::SessionPoisoned`] without touching the transport.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::PrinterError;

use super::protocol::{self, Command};
use super::status::PrinterRawStatus;
use super::transport::LineTransport;

// =============================================================================
// Traits
// =============================================================================

/// The operations a print server needs from a printer.
#[async_trait]
pub trait PrinterControl: Send {
    async fn query_status(&mut self) -> Result<PrinterRawStatus, PrinterError>;

    /// Name of the file currently selected on the printer, if any.
    async fn query_selected_file(&mut self) -> Result<Option<String>, PrinterError>;

    /// Start printing a file stored on the printer's media.
    async fn start_print(&mut self, filename: &str) -> Result<(), PrinterError>;

    async fn pause(&mut self) -> Result<(), PrinterError>;

    async fn resume(&mut self) -> Result<(), PrinterError>;

    async fn stop(&mut self) -> Result<(), PrinterError>;

    async fn reboot(&mut self) -> Result<(), PrinterError>;
}

/// Opens and closes printer sessions.
///
/// Use [`with_printer`] rather than calling these directly so the session is
/// released on every path.
#[async_trait]
pub trait PrinterConnector: Send + Sync {
    type Printer: PrinterControl;

    /// Open a session. Failure is always a connection error.
    async fn connect(&self) -> Result<Self::Printer, PrinterError>;

    /// Close a session previously returned by [`connect`](Self::connect).
    async fn disconnect(&self, printer: Self::Printer) -> Result<(), PrinterError>;
}

/// Boxed future returned by operations passed to [`with_printer`].
pub type PrinterFuture<'a, R> = Pin<Box<dyn Future<Output = Result<R, PrinterError>> + Send + 'a>>;

/// Run `op` against a freshly opened session, then close it.
///
/// The session is released whether `op` succeeds or fails. A failure to
/// release is logged but never masks the result of `op`.
///
/// # Example
///
/// ```ignore
/// let status = with_printer(&connector, |printer| {
///     Box::pin(async move { printer.query_status().await })
/// })
/// .await?;
/// ```
pub async fn with_printer<C, F, R>(connector: &C, op: F) -> Result<R, PrinterError>
where
    C: PrinterConnector,
    F: for<'a> FnOnce(&'a mut C::Printer) -> PrinterFuture<'a, R>,
{
    let mut printer = connector.connect().await?;
    let result = op(&mut printer).await;

    if let Err(e) = connector.disconnect(printer).await {
        warn!(error = %e, "Failed to close printer session");
    }

    result
}

// =============================================================================
// PrinterSession
// =============================================================================

/// A live command session over a [`LineTransport`].
pub struct PrinterSession<T: LineTransport> {
    transport: T,
    read_timeout: Duration,
    poisoned: bool,
}

impl<T: LineTransport> PrinterSession<T> {
    pub fn new(transport: T, read_timeout: Duration) -> Self {
        Self {
            transport,
            read_timeout,
            poisoned: false,
        }
    }

    /// Whether a previous failure left the link in an unknown state.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Send one command and return the raw response line.
    ///
    /// A command that fails to encode is rejected before anything is sent
    /// and leaves the session usable.
    pub async fn round_trip(&mut self, command: &Command) -> Result<Vec<u8>, PrinterError> {
        if self.poisoned {
            return Err(PrinterError::SessionPoisoned);
        }

        let line = command.encode()?;
        debug!(command = %line, "Sending printer command");

        if let Err(e) = self.transport.send_line(&line).await {
            self.poisoned = true;
            warn!(command = %line, error = %e, "Failed to send printer command");
            return Err(e);
        }

        match tokio::time::timeout(self.read_timeout, self.transport.receive_line()).await {
            Ok(Ok(response)) => {
                debug!(
                    command = %line,
                    response = ?String::from_utf8_lossy(&response),
                    "Received printer response"
                );
                Ok(response)
            }
            Ok(Err(e)) => {
                self.poisoned = true;
                warn!(command = %line, error = %e, "Failed to read printer response");
                Err(e)
            }
            Err(_) => {
                self.poisoned = true;
                warn!(
                    command = %line,
                    timeout_ms = self.read_timeout.as_millis() as u64,
                    "Printer response timed out; session discarded"
                );
                Err(PrinterError::Timeout {
                    command: line,
                    timeout: self.read_timeout,
                })
            }
        }
    }

    async fn acknowledged(&mut self, command: Command) -> Result<(), PrinterError> {
        let response = self.round_trip(&command).await?;
        protocol::parse_ack(&response)
    }

    /// Firmware version string reported by the mainboard.
    pub async fn firmware_version(&mut self) -> Result<String, PrinterError> {
        let response = self.round_trip(&Command::QueryFirmwareVersion).await?;
        protocol::parse_firmware_version(&response)
    }

    /// Release the transport.
    pub async fn close(mut self) -> Result<(), PrinterError> {
        self.transport.close().await
    }
}

#[async_trait]
impl<T: LineTransport> PrinterControl for PrinterSession<T> {
    async fn query_status(&mut self) -> Result<PrinterRawStatus, PrinterError> {
        let response = self.round_trip(&Command::QueryStatus).await?;
        protocol::parse_status(&response)
    }

    async fn query_selected_file(&mut self) -> Result<Option<String>, PrinterError> {
        let response = self.round_trip(&Command::QuerySelectedFile).await?;
        protocol::parse_selected_file(&response)
    }

    async fn start_print(&mut self, filename: &str) -> Result<(), PrinterError> {
        self.acknowledged(Command::StartPrint(filename.to_string()))
            .await
    }

    async fn pause(&mut self) -> Result<(), PrinterError> {
        self.acknowledged(Command::Pause).await
    }

    async fn resume(&mut self) -> Result<(), PrinterError> {
        self.acknowledged(Command::Resume).await
    }

    async fn stop(&mut self) -> Result<(), PrinterError> {
        self.acknowledged(Command::Stop).await
    }

    async fn reboot(&mut self) -> Result<(), PrinterError> {
        self.acknowledged(Command::Reboot).await
    }
}
