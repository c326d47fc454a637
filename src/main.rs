//! Mariner - web control for ChiTu-based resin 3D printers.
//!
//! This binary starts the HTTP server and provides a couple of offline
//! helpers for inspecting slice files and querying the printer.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mariner::{
    config::{Cli, Command, InspectConfig, ServeConfig, StatusConfig},
    files::SliceCache,
    format::{decode, SliceDocument},
    printer::{with_printer, PrinterControl, SerialConnector},
    server::{create_router, AppState, RouterConfig},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(config) => run_serve(config).await,
        Command::Inspect(config) => run_inspect(config).await,
        Command::Status(config) => run_status(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    print_banner();

    info!("Configuration:");
    info!("  Files directory: {}", config.files_directory.display());
    info!(
        "  Printer: {} @ {} baud ({}ms timeout)",
        config.printer.serial_port, config.printer.baud_rate, config.printer.read_timeout_ms
    );
    info!(
        "  Cache: {} slice files, {}MB max upload",
        config.cache_files, config.max_upload_mb
    );

    match tokio::fs::metadata(&config.files_directory).await {
        Ok(metadata) if metadata.is_dir() => {}
        Ok(_) => {
            error!(
                "Files directory {} is not a directory",
                config.files_directory.display()
            );
            return ExitCode::FAILURE;
        }
        Err(e) => {
            error!(
                "Cannot access files directory {}: {}",
                config.files_directory.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    }

    // Sessions are opened per request; the device may appear later
    if tokio::fs::metadata(&config.printer.serial_port).await.is_err() {
        warn!(
            "  Serial port {} does not exist yet; printer requests will fail until it appears",
            config.printer.serial_port
        );
    }

    let connector = SerialConnector::new(config.printer.serial_config());
    let state = AppState::with_cache(
        config.files_directory.clone(),
        connector,
        SliceCache::with_capacity(config.cache_files),
    );

    let router = create_router(state, build_router_config(&config));

    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    curl http://{}/api/print_status", addr);
    info!("    curl http://{}/api/list_files", addr);
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Print the startup banner.
fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("");
    info!("███╗   ███╗ █████╗ ██████╗ ██╗███╗   ██╗███████╗██████╗ ");
    info!("████╗ ████║██╔══██╗██╔══██╗██║████╗  ██║██╔════╝██╔══██╗");
    info!("██╔████╔██║███████║██████╔╝██║██╔██╗ ██║█████╗  ██████╔╝");
    info!("██║╚██╔╝██║██╔══██║██╔══██╗██║██║╚██╗██║██╔══╝  ██╔══██╗");
    info!("██║ ╚═╝ ██║██║  ██║██║  ██║██║██║ ╚████║███████╗██║  ██║");
    info!("╚═╝     ╚═╝╚═╝  ╚═╝╚═╝  ╚═╝╚═╝╚═╝  ╚═══╝╚══════╝╚═╝  ╚═╝");
    info!("");
    info!("                        v{}", version);
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "mariner=debug,tower_http=debug"
    } else {
        "mariner=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new().with_max_upload_bytes(config.max_upload_bytes());

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config.with_tracing(!config.no_tracing)
}

// =============================================================================
// Inspect Command
// =============================================================================

async fn run_inspect(config: InspectConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    let bytes = match tokio::fs::read(&config.file).await {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error: cannot read {}: {}", config.file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let document = match decode(&bytes) {
        Ok(document) => document,
        Err(e) => {
            eprintln!("Error: {}: {}", config.file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let summary = document_summary(&document, config.layers);
    match serde_json::to_string_pretty(&summary) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn document_summary(document: &SliceDocument, include_layers: bool) -> serde_json::Value {
    let (x, y, z) = document.bed_size_mm;
    let previews: Vec<_> = document
        .preview_images()
        .map(|bitmap| serde_json::json!([bitmap.width, bitmap.height]))
        .collect();

    let mut summary = serde_json::json!({
        "format": document.format.name(),
        "version": document.version,
        "resolution": [document.resolution.0, document.resolution.1],
        "bed_size_mm": [x, y, z],
        "height_mm": document.height_mm,
        "layer_height_mm": document.layer_height_mm,
        "layer_count": document.layer_count,
        "bottom_layer_count": document.bottom_layer_count,
        "exposure_secs": document.exposure_secs,
        "bottom_exposure_secs": document.bottom_exposure_secs,
        "light_off_secs": document.light_off_secs,
        "anti_alias_level": document.anti_alias_level,
        "mirrored": document.mirrored,
        "print_time_secs": document.print_time_secs,
        "payload_bytes": document.payload_end(),
        "previews": previews,
    });

    if include_layers {
        let layers: Vec<_> = document
            .layers
            .iter()
            .map(|layer| {
                serde_json::json!({
                    "z_mm": layer.z_mm,
                    "exposure_secs": layer.exposure_secs,
                    "light_off_secs": layer.light_off_secs,
                    "data_offset": layer.data_offset,
                    "data_length": layer.data_length,
                })
            })
            .collect();
        summary["layers"] = serde_json::Value::Array(layers);
    }

    summary
}

// =============================================================================
// Status Command
// =============================================================================

async fn run_status(config: StatusConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    if let Err(e) = config.printer.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    println!("Mariner Printer Check");
    println!("═════════════════════════════════");
    println!("Port: {}", config.printer.serial_port);
    println!("Baud: {}", config.printer.baud_rate);
    println!();

    let connector = SerialConnector::new(config.printer.serial_config());
    let result = with_printer(&connector, |printer| {
        Box::pin(async move {
            let firmware = printer.firmware_version().await?;
            let status = printer.query_status().await?;
            let selected_file = printer.query_selected_file().await?;
            Ok::<_, mariner::PrinterError>((firmware, status, selected_file))
        })
    })
    .await;

    match result {
        Ok((firmware, status, selected_file)) => {
            println!("✓ Firmware: {}", firmware);
            println!("✓ State: {}", status.state);
            println!(
                "✓ Selected file: {}",
                selected_file.as_deref().unwrap_or("(none)")
            );
            if status.state.is_active() {
                println!("  Bytes: {}/{}", status.current_byte, status.total_bytes);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("✗ {}", e);
            ExitCode::FAILURE
        }
    }
}
