//! Configuration management for Mariner.
//!
//! This module provides a configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `MARINER_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use mariner::config::{Cli, Command};
//!
//! match Cli::parse().command {
//!     Command::Serve(config) => println!("Serving {}", config.files_directory.display()),
//!     Command::Inspect(config) => println!("Inspecting {}", config.file.display()),
//!     Command::Status(config) => println!("Querying {}", config.printer.serial_port),
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `MARINER_HOST` - Server bind address (default: 0.0.0.0)
//! - `MARINER_PORT` - Server port (default: 5050)
//! - `MARINER_FILES_DIRECTORY` - Directory holding slice files (default: /mnt/usb_share)
//! - `MARINER_SERIAL_PORT` - Printer serial device (default: /dev/serial0)
//! - `MARINER_BAUD_RATE` - Serial baud rate (default: 115200)
//! - `MARINER_READ_TIMEOUT_MS` - Printer response timeout (default: 2000)
//! - `MARINER_CACHE_FILES` - Decoded slice files to keep in memory (default: 64)
//! - `MARINER_MAX_UPLOAD_MB` - Largest accepted upload (default: 512)
//! - `MARINER_CORS_ORIGINS` - Allowed CORS origins, comma-separated

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::files::DEFAULT_SLICE_CACHE_ENTRIES;
use crate::printer::{SerialConfig, DEFAULT_BAUD_RATE, DEFAULT_SERIAL_PORT};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 5050;

/// Default files directory (the USB mass-storage gadget image mount point).
pub const DEFAULT_FILES_DIRECTORY: &str = "/mnt/usb_share";

/// Default printer response timeout in milliseconds.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 2000;

/// Default upload limit in megabytes.
pub const DEFAULT_MAX_UPLOAD_MB: usize = 512;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Mariner - web control for ChiTu-based resin 3D printers.
#[derive(Parser, Debug, Clone)]
#[command(name = "mariner")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server
    Serve(ServeConfig),

    /// Decode a slice file and print its metadata as JSON
    Inspect(InspectConfig),

    /// Query the printer once and print its status
    Status(StatusConfig),
}

/// Serial link settings shared by commands that talk to the printer.
#[derive(Args, Debug, Clone)]
pub struct PrinterArgs {
    /// Serial device connected to the printer mainboard.
    #[arg(long, default_value = DEFAULT_SERIAL_PORT, env = "MARINER_SERIAL_PORT")]
    pub serial_port: String,

    /// Serial baud rate.
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE, env = "MARINER_BAUD_RATE")]
    pub baud_rate: u32,

    /// How long to wait for each printer response, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_READ_TIMEOUT_MS, env = "MARINER_READ_TIMEOUT_MS")]
    pub read_timeout_ms: u64,
}

impl PrinterArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.serial_port.is_empty() {
            return Err(
                "Serial port is required. Set --serial-port or MARINER_SERIAL_PORT".to_string(),
            );
        }
        if self.baud_rate == 0 {
            return Err("baud_rate must be greater than 0".to_string());
        }
        if self.read_timeout_ms == 0 {
            return Err("read_timeout_ms must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn serial_config(&self) -> SerialConfig {
        SerialConfig {
            port: self.serial_port.clone(),
            baud_rate: self.baud_rate,
            read_timeout: Duration::from_millis(self.read_timeout_ms),
        }
    }
}

/// Options for `mariner serve`.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "MARINER_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "MARINER_PORT")]
    pub port: u16,

    // =========================================================================
    // Files Configuration
    // =========================================================================
    /// Directory holding the slice files shown to users.
    #[arg(long, default_value = DEFAULT_FILES_DIRECTORY, env = "MARINER_FILES_DIRECTORY")]
    pub files_directory: PathBuf,

    /// Maximum number of decoded slice files to keep in memory.
    #[arg(long, default_value_t = DEFAULT_SLICE_CACHE_ENTRIES, env = "MARINER_CACHE_FILES")]
    pub cache_files: usize,

    /// Largest accepted upload, in megabytes.
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_MB, env = "MARINER_MAX_UPLOAD_MB")]
    pub max_upload_mb: usize,

    // =========================================================================
    // Printer Configuration
    // =========================================================================
    #[command(flatten)]
    pub printer: PrinterArgs,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "MARINER_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.files_directory.as_os_str().is_empty() {
            return Err(
                "Files directory is required. Set --files-directory or MARINER_FILES_DIRECTORY"
                    .to_string(),
            );
        }
        if self.cache_files == 0 {
            return Err("cache_files must be greater than 0".to_string());
        }
        if self.max_upload_mb == 0 {
            return Err("max_upload_mb must be greater than 0".to_string());
        }
        self.printer.validate()
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

/// Options for `mariner inspect`.
#[derive(Args, Debug, Clone)]
pub struct InspectConfig {
    /// Slice file to decode.
    pub file: PathBuf,

    /// Also list every layer record.
    #[arg(long, default_value_t = false)]
    pub layers: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// Options for `mariner status`.
#[derive(Args, Debug, Clone)]
pub struct StatusConfig {
    #[command(flatten)]
    pub printer: PrinterArgs,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

// =============================================================================
// Tests
// =============================================================================
