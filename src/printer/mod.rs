//! Printer protocol driver.
//!
//! Talks to ChiTu-based mainboards (Elegoo Mars and relatives) over a serial
//! line. The module is split into:
//!
//! - [`protocol`]: command encoding and response parsing, pure functions
//! - [`status`]: the printer state and raw status value types
//! - [`transport`]: the [`LineTransport`] abstraction and its serial implementation
//! - [`session`]: one-command-at-a-time sessions, the [`PrinterControl`] trait,
//!   and [`with_printer`] for scoped acquisition
//!
//! Access to one physical device must be serialised by the caller; the
//! driver assumes at most one live session per device.

pub mod protocol;
pub mod session;
pub mod status;
pub mod transport;

pub use protocol::Command;
pub use session::{with_printer, PrinterConnector, PrinterControl, PrinterFuture, PrinterSession};
pub use status::{PrinterRawStatus, PrinterState};
pub use transport::{
    LineTransport, SerialConfig, SerialConnector, SerialTransport, DEFAULT_BAUD_RATE,
    DEFAULT_READ_TIMEOUT, DEFAULT_SERIAL_PORT,
};
