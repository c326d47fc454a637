//! Test utilities for integration tests.
//!
//! This module provides a scripted printer (a fake serial line behind a real
//! [`PrinterSession`]) and a builder for synthetic CTB slice files.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mariner::error::PrinterError;
use mariner::format::ctb::{CTB_MAGIC, HEADER_SIZE, LAYER_RECORD_SIZE, PREVIEW_HEADER_SIZE};
use mariner::printer::{LineTransport, PrinterConnector, PrinterSession};
use mariner::server::{create_router, AppState, RouterConfig};

// =============================================================================
// Scripted Printer
// =============================================================================

/// How the fake printer answers one command line.
#[derive(Debug, Clone)]
pub enum Reply {
    Line(Vec<u8>),
    /// Never answer
    Hang,
}

#[derive(Debug, Default)]
struct PrinterScript {
    replies: HashMap<String, Reply>,
    sent: Vec<String>,
    connections: usize,
    disconnections: usize,
    refuse_connections: bool,
}

/// A printer that answers from a table of command line → reply.
///
/// Commands without an entry are acknowledged with `ok`. Every line sent is
/// recorded and can be inspected with [`ScriptedPrinter::sent`].
#[derive(Clone)]
pub struct ScriptedPrinter {
    script: Arc<Mutex<PrinterScript>>,
    read_timeout: Duration,
}

impl ScriptedPrinter {
    pub fn new() -> Self {
        Self {
            script: Arc::default(),
            read_timeout: Duration::from_millis(100),
        }
    }

    /// Answer `command` with `reply` (no line terminator needed).
    pub fn reply(self, command: &str, reply: &str) -> Self {
        self.set(command, Reply::Line(format!("{}\r\n", reply).into_bytes()))
    }

    /// Answer `command` with exactly `bytes`, terminator included.
    pub fn reply_bytes(self, command: &str, bytes: &[u8]) -> Self {
        self.set(command, Reply::Line(bytes.to_vec()))
    }

    /// Never answer `command`.
    pub fn hang_on(self, command: &str) -> Self {
        self.set(command, Reply::Hang)
    }

    /// Fail every connection attempt.
    pub fn unplugged(self) -> Self {
        self.script.lock().unwrap().refuse_connections = true;
        self
    }

    /// Configure status, selected file and firmware replies in one go.
    pub fn printing(self, current: u64, total: u64, paused: bool, file: &str) -> Self {
        self.reply(
            "M4000",
            &format!(
                "ok B:0/0 X:0.000 Y:0.000 Z:2.100 F:256/256 D{}/{}/{}",
                current,
                total,
                u8::from(paused)
            ),
        )
        .reply("M4006", &format!("ok '{}'", file))
    }

    pub fn idle(self) -> Self {
        self.reply("M4000", "ok B:0/0 X:0.000 Y:0.000 Z:150.000 F:0/0 D0/0/0")
            .reply("M4006", "ok 'N0'")
    }

    fn set(self, command: &str, reply: Reply) -> Self {
        self.script
            .lock()
            .unwrap()
            .replies
            .insert(command.to_string(), reply);
        self
    }

    /// Every command line sent so far, in order.
    pub fn sent(&self) -> Vec<String> {
        self.script.lock().unwrap().sent.clone()
    }

    pub fn connections(&self) -> usize {
        self.script.lock().unwrap().connections
    }

    pub fn disconnections(&self) -> usize {
        self.script.lock().unwrap().disconnections
    }
}

/// Line transport backed by a [`ScriptedPrinter`].
pub struct ScriptedTransport {
    script: Arc<Mutex<PrinterScript>>,
    pending: Option<Reply>,
}

#[async_trait]
impl LineTransport for ScriptedTransport {
    async fn send_line(&mut self, line: &str) -> Result<(), PrinterError> {
        let mut script = self.script.lock().unwrap();
        script.sent.push(line.to_string());
        self.pending = Some(
            script
                .replies
                .get(line)
                .cloned()
                .unwrap_or_else(|| Reply::Line(b"ok\r\n".to_vec())),
        );
        Ok(())
    }

    async fn receive_line(&mut self) -> Result<Vec<u8>, PrinterError> {
        match self.pending.take() {
            Some(Reply::Line(line)) => Ok(line),
            Some(Reply::Hang) => std::future::pending().await,
            None => Err(PrinterError::Connection("nothing was sent".to_string())),
        }
    }

    async fn close(&mut self) -> Result<(), PrinterError> {
        Ok(())
    }
}

#[async_trait]
impl PrinterConnector for ScriptedPrinter {
    type Printer = PrinterSession<ScriptedTransport>;

    async fn connect(&self) -> Result<Self::Printer, PrinterError> {
        let mut script = self.script.lock().unwrap();
        if script.refuse_connections {
            return Err(PrinterError::Connection(
                "No such file or directory".to_string(),
            ));
        }
        script.connections += 1;

        let transport = ScriptedTransport {
            script: Arc::clone(&self.script),
            pending: None,
        };
        Ok(PrinterSession::new(transport, self.read_timeout))
    }

    async fn disconnect(&self, printer: Self::Printer) -> Result<(), PrinterError> {
        self.script.lock().unwrap().disconnections += 1;
        printer.close().await
    }
}

/// Router over `files_directory` talking to `printer`.
pub fn test_router(files_directory: &Path, printer: ScriptedPrinter) -> axum::Router {
    let state = AppState::new(files_directory, printer);
    create_router(state, RouterConfig::new().with_tracing(false))
}

// =============================================================================
// Synthetic Slice Files
// =============================================================================

/// Builds CTB files with a known layout.
///
/// Layout: header | layer table | large preview | small preview | layer data.
/// Layer data is filler; only its extent matters to the decoder.
pub struct CtbBuilder {
    magic: u32,
    version: u32,
    print_time_secs: u32,
    layer_lengths: Vec<u32>,
    large_preview: Option<(u32, u32, u16)>,
    small_preview: Option<(u32, u32, u16)>,
}

impl Default for CtbBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CtbBuilder {
    /// 19 layers of 6 bytes each, 5621s print time, 4x3 white large preview.
    pub fn new() -> Self {
        Self {
            magic: CTB_MAGIC,
            version: 3,
            print_time_secs: 5621,
            layer_lengths: vec![6; 19],
            large_preview: Some((4, 3, 0xFFDF)),
            small_preview: None,
        }
    }

    pub fn magic(mut self, magic: u32) -> Self {
        self.magic = magic;
        self
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn print_time(mut self, secs: u32) -> Self {
        self.print_time_secs = secs;
        self
    }

    pub fn layers(mut self, lengths: Vec<u32>) -> Self {
        self.layer_lengths = lengths;
        self
    }

    /// Large preview filled with one 15-bit colour word (run flag ignored).
    pub fn large_preview(mut self, width: u32, height: u32, color: u16) -> Self {
        self.large_preview = Some((width, height, color));
        self
    }

    pub fn small_preview(mut self, width: u32, height: u32, color: u16) -> Self {
        self.small_preview = Some((width, height, color));
        self
    }

    pub fn without_previews(mut self) -> Self {
        self.large_preview = None;
        self.small_preview = None;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let layer_count = self.layer_lengths.len() as u32;
        let table_offset = HEADER_SIZE as u32;
        let mut cursor = table_offset + layer_count * LAYER_RECORD_SIZE as u32;

        let large = self.large_preview.map(|p| encode_preview(p, &mut cursor));
        let small = self.small_preview.map(|p| encode_preview(p, &mut cursor));
        let data_start = cursor;

        let mut out = vec![0u8; HEADER_SIZE];
        put_u32(&mut out, 0x00, self.magic);
        put_u32(&mut out, 0x04, self.version);
        put_f32(&mut out, 0x08, 68.04);
        put_f32(&mut out, 0x0C, 120.96);
        put_f32(&mut out, 0x10, 150.0);
        put_f32(&mut out, 0x1C, 20.0);
        put_f32(&mut out, 0x20, 0.05);
        put_f32(&mut out, 0x24, 8.0);
        put_f32(&mut out, 0x28, 60.0);
        put_f32(&mut out, 0x2C, 1.0);
        put_u32(&mut out, 0x30, 5);
        put_u32(&mut out, 0x34, 1440);
        put_u32(&mut out, 0x38, 2560);
        put_u32(&mut out, 0x3C, large.as_ref().map_or(0, |p| p.offset));
        put_u32(&mut out, 0x40, table_offset);
        put_u32(&mut out, 0x44, layer_count);
        put_u32(&mut out, 0x48, small.as_ref().map_or(0, |p| p.offset));
        put_u32(&mut out, 0x4C, self.print_time_secs);
        put_u32(&mut out, 0x5C, 1);

        let mut offset = data_start;
        for (i, &len) in self.layer_lengths.iter().enumerate() {
            out.extend_from_slice(&(0.05f32 * (i + 1) as f32).to_le_bytes());
            out.extend_from_slice(&8.0f32.to_le_bytes());
            out.extend_from_slice(&1.0f32.to_le_bytes());
            out.extend_from_slice(&offset.to_le_bytes());
            out.extend_from_slice(&len.to_le_bytes());
            out.extend_from_slice(&[0u8; 16]);
            offset += len;
        }

        for preview in [large, small].into_iter().flatten() {
            out.extend_from_slice(&preview.bytes);
        }

        for &len in &self.layer_lengths {
            out.extend(std::iter::repeat(0xAB).take(len as usize));
        }
        out
    }

    /// File offset where the first layer's data begins.
    pub fn data_start(&self) -> u64 {
        let previews: usize = [self.large_preview, self.small_preview]
            .into_iter()
            .flatten()
            // Two RLE words per row
            .map(|(_, height, _)| PREVIEW_HEADER_SIZE + height as usize * 4)
            .sum();
        (HEADER_SIZE + self.layer_lengths.len() * LAYER_RECORD_SIZE + previews) as u64
    }

    /// Absolute end offset of every layer, as the decoder should report it.
    pub fn expected_boundaries(&self) -> Vec<u64> {
        self.layer_lengths
            .iter()
            .scan(self.data_start(), |end, &len| {
                *end += u64::from(len);
                Some(*end)
            })
            .collect()
    }

    /// Build and write to `dir/name`.
    pub fn write_to(&self, dir: &Path, name: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.build()).unwrap();
        path
    }
}

struct EncodedPreview {
    offset: u32,
    bytes: Vec<u8>,
}

/// Header plus one full-row run per line, advancing `cursor` past both.
fn encode_preview((width, height, color): (u32, u32, u16), cursor: &mut u32) -> EncodedPreview {
    let offset = *cursor;
    let data: Vec<u8> = (0..height)
        .flat_map(|_| [color | 0x0020, 0x0FFF])
        .flat_map(|w| w.to_le_bytes())
        .collect();
    let data_offset = offset + PREVIEW_HEADER_SIZE as u32;

    let mut bytes = Vec::with_capacity(PREVIEW_HEADER_SIZE + data.len());
    bytes.extend_from_slice(&width.to_le_bytes());
    bytes.extend_from_slice(&height.to_le_bytes());
    bytes.extend_from_slice(&data_offset.to_le_bytes());
    bytes.extend_from_slice(&(data.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&[0u8; 16]);
    bytes.extend_from_slice(&data);

    *cursor += bytes.len() as u32;
    EncodedPreview { offset, bytes }
}

pub fn put_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn put_f32(buf: &mut [u8], offset: usize, value: f32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}
