//! Printer driver tests over a scripted serial line.
//!
//! Tests verify:
//! - Status, selected file and firmware queries
//! - Command lines sent for each control operation
//! - Session release on success and failure
//! - Timeout and protocol error behaviour

use mariner::error::PrinterError;
use mariner::printer::{with_printer, PrinterConnector, PrinterControl, PrinterState};

use super::test_utils::ScriptedPrinter;

#[tokio::test]
async fn test_query_printing_status() {
    let printer = ScriptedPrinter::new().printing(42, 120, false, "cube.ctb");

    let (status, selected) = with_printer(&printer, |session| {
        Box::pin(async move {
            let status = session.query_status().await?;
            let selected = session.query_selected_file().await?;
            Ok::<_, PrinterError>((status, selected))
        })
    })
    .await
    .unwrap();

    assert_eq!(status.state, PrinterState::Printing);
    assert_eq!(status.current_byte, 42);
    assert_eq!(status.total_bytes, 120);
    assert_eq!(selected.as_deref(), Some("cube.ctb"));
    assert_eq!(printer.sent(), vec!["M4000", "M4006"]);
}

#[tokio::test]
async fn test_query_idle_status() {
    let printer = ScriptedPrinter::new().idle();

    let (status, selected) = with_printer(&printer, |session| {
        Box::pin(async move {
            let status = session.query_status().await?;
            let selected = session.query_selected_file().await?;
            Ok::<_, PrinterError>((status, selected))
        })
    })
    .await
    .unwrap();

    assert_eq!(status.state, PrinterState::Idle);
    assert_eq!(selected, None);
}

#[tokio::test]
async fn test_paused_and_starting_states() {
    let paused = ScriptedPrinter::new().printing(42, 120, true, "cube.ctb");
    let status = with_printer(&paused, |s| Box::pin(async move { s.query_status().await }))
        .await
        .unwrap();
    assert_eq!(status.state, PrinterState::Paused);

    let starting = ScriptedPrinter::new().printing(0, 120, false, "cube.ctb");
    let status = with_printer(&starting, |s| Box::pin(async move { s.query_status().await }))
        .await
        .unwrap();
    assert_eq!(status.state, PrinterState::StartingPrint);
}

#[tokio::test]
async fn test_control_commands() {
    let printer = ScriptedPrinter::new();

    with_printer(&printer, |session| {
        Box::pin(async move {
            session.start_print("cube.ctb").await?;
            session.pause().await?;
            session.resume().await?;
            session.stop().await?;
            session.reboot().await
        })
    })
    .await
    .unwrap();

    assert_eq!(
        printer.sent(),
        vec!["M6030 'cube.ctb'", "M25", "M24", "M33 I5", "M6040 I0"]
    );
}

#[tokio::test]
async fn test_firmware_version() {
    let printer = ScriptedPrinter::new().reply("M4002", "ok V4.3.4_LCDC");

    let mut session = printer.connect().await.unwrap();
    assert_eq!(session.firmware_version().await.unwrap(), "V4.3.4_LCDC");
    printer.disconnect(session).await.unwrap();
}

#[tokio::test]
async fn test_session_released_on_error() {
    let printer = ScriptedPrinter::new().reply("M25", "foobar");

    let result = with_printer(&printer, |s| Box::pin(async move { s.pause().await })).await;

    assert!(matches!(
        result,
        Err(PrinterError::UnexpectedPrinterResponse { ref raw_text }) if raw_text == b"foobar\r\n"
    ));
    assert_eq!(printer.connections(), 1);
    assert_eq!(printer.disconnections(), 1);
}

#[tokio::test]
async fn test_protocol_error_keeps_session_usable() {
    let printer = ScriptedPrinter::new()
        .reply("M25", "error")
        .reply("M4000", "ok D1/2/0");

    let status = with_printer(&printer, |session| {
        Box::pin(async move {
            assert!(session.pause().await.is_err());
            session.query_status().await
        })
    })
    .await
    .unwrap();

    assert_eq!(status.state, PrinterState::Printing);
}

#[tokio::test]
async fn test_timeout_poisons_session() {
    let printer = ScriptedPrinter::new().hang_on("M4000");

    let (first, second) = with_printer(&printer, |session| {
        Box::pin(async move {
            let first = session.query_status().await;
            let second = session.query_selected_file().await;
            Ok::<_, PrinterError>((first, second))
        })
    })
    .await
    .unwrap();

    assert!(matches!(first, Err(PrinterError::Timeout { ref command, .. }) if command == "M4000"));
    assert!(matches!(second, Err(PrinterError::SessionPoisoned)));
    // Nothing is sent on a poisoned session
    assert_eq!(printer.sent(), vec!["M4000"]);
    assert_eq!(printer.disconnections(), 1);
}

#[tokio::test]
async fn test_connection_refused() {
    let printer = ScriptedPrinter::new().unplugged();

    let result = with_printer(&printer, |s| Box::pin(async move { s.query_status().await })).await;

    assert!(matches!(result, Err(PrinterError::Connection(_))));
    assert_eq!(printer.disconnections(), 0);
}
