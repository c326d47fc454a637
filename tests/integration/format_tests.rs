//! Slice-file decoding tests against synthetic CTB files.
//!
//! Tests verify:
//! - Header fields and layer boundaries
//! - Large and small preview decoding
//! - Rejection of malformed files
//! - Progress computed from decoded documents

use mariner::error::FormatError;
use mariner::format::ctb::CBDDLP_MAGIC;
use mariner::format::{decode, decode_preview, decode_preview_kind, detect_format, PreviewKind};
use mariner::printer::{PrinterRawStatus, PrinterState};
use mariner::progress::compute;
use mariner::SliceFormat;

use super::test_utils::{put_u32, CtbBuilder};

// =============================================================================
// Header and Layers
// =============================================================================

#[test]
fn test_decode_reference_file() {
    let document = decode(&CtbBuilder::new().build()).unwrap();

    assert_eq!(document.format, SliceFormat::Ctb);
    assert_eq!(document.version, 3);
    assert_eq!(document.layer_count, 19);
    assert_eq!(document.print_time_secs, 5621);
    assert_eq!(document.resolution, (1440, 2560));
    assert_eq!(document.bed_size_mm, (68.04, 120.96, 150.0));
    assert_eq!(document.height_mm, 20.0);
    assert_eq!(document.layer_height_mm, 0.05);
    assert_eq!(document.bottom_layer_count, 5);
    assert_eq!(document.layers.len(), 19);
}

#[test]
fn test_layer_boundaries_are_cumulative() {
    let builder = CtbBuilder::new().layers(vec![10, 20, 5]);
    let document = decode(&builder.build()).unwrap();

    // 112-byte header, 3 records of 36 bytes, 4x3 preview (32 + 3 rows x 4)
    let start = 112 + 3 * 36 + 32 + 12;
    assert_eq!(builder.data_start(), start);
    assert_eq!(
        document.layer_byte_boundaries,
        vec![start + 10, start + 30, start + 35]
    );
    assert_eq!(document.layer_byte_boundaries, builder.expected_boundaries());
}

#[test]
fn test_cbddlp_magic() {
    let bytes = CtbBuilder::new().magic(CBDDLP_MAGIC).build();
    assert_eq!(detect_format(&bytes).unwrap(), SliceFormat::Cbddlp);
    assert_eq!(decode(&bytes).unwrap().format, SliceFormat::Cbddlp);
}

#[test]
fn test_supported_versions() {
    for version in [2, 3, 4] {
        assert!(decode(&CtbBuilder::new().version(version).build()).is_ok());
    }
    assert!(matches!(
        decode(&CtbBuilder::new().version(5).build()),
        Err(FormatError::UnsupportedVersion(5))
    ));
}

#[test]
fn test_rejects_unknown_magic() {
    let mut bytes = CtbBuilder::new().build();
    put_u32(&mut bytes, 0, 0xDEAD_BEEF);
    assert!(matches!(
        decode(&bytes),
        Err(FormatError::InvalidMagic(0xDEAD_BEEF))
    ));
}

#[test]
fn test_rejects_file_without_layers() {
    let bytes = CtbBuilder::new().layers(vec![]).build();
    assert!(matches!(decode(&bytes), Err(FormatError::NoLayers)));
}

#[test]
fn test_rejects_truncated_layer_data() {
    let mut bytes = CtbBuilder::new().build();
    bytes.truncate(bytes.len() - 1);
    assert!(matches!(
        decode(&bytes),
        Err(FormatError::LayerOutOfBounds { layer: 18, .. })
    ));
}

#[test]
fn test_rejects_tiny_file() {
    assert!(decode(b"").is_err());
    assert!(decode(&[0x86, 0x00, 0xFD, 0x12]).is_err());
}

// =============================================================================
// Previews
// =============================================================================

#[test]
fn test_large_preview_pixels() {
    let bytes = CtbBuilder::new().large_preview(5, 2, 0xFFDF).build();
    let bitmap = decode_preview(&bytes).unwrap();

    assert_eq!((bitmap.width, bitmap.height), (5, 2));
    assert_eq!(bitmap.pixels.len(), 5 * 2 * 3);
    assert!(bitmap.pixels.iter().all(|&c| c == 0xFF));
}

#[test]
fn test_small_preview_is_decoded_separately() {
    // Pure blue: b = 31
    let bytes = CtbBuilder::new()
        .large_preview(4, 3, 0xFFDF)
        .small_preview(2, 2, 0x001F)
        .build();

    let small = decode_preview_kind(&bytes, PreviewKind::Small).unwrap();
    assert_eq!((small.width, small.height), (2, 2));
    assert_eq!(&small.pixels[..3], &[0, 0, 0xFF]);

    let document = decode(&bytes).unwrap();
    assert_eq!(document.preview_images().count(), 2);
}

#[test]
fn test_missing_preview() {
    let bytes = CtbBuilder::new().without_previews().build();

    assert!(matches!(
        decode_preview(&bytes),
        Err(FormatError::MissingPreview(_))
    ));
    // Layers still decode without previews
    let document = decode(&bytes).unwrap();
    assert!(document.large_preview.is_none());
    assert!(document.small_preview.is_none());
}

#[test]
fn test_oversized_preview_is_rejected() {
    // One row-end run declared 20 million pixels wide
    let bytes = CtbBuilder::new().large_preview(20_000_000, 1, 0xFFDF).build();

    assert!(matches!(
        decode_preview(&bytes),
        Err(FormatError::PreviewTooLarge {
            width: 20_000_000,
            height: 1,
            ..
        })
    ));
    assert!(matches!(
        decode(&bytes),
        Err(FormatError::PreviewTooLarge { .. })
    ));
}

// =============================================================================
// Progress
// =============================================================================

#[test]
fn test_progress_from_decoded_file() {
    let document = decode(&CtbBuilder::new().build()).unwrap();
    // Six layers fully streamed, seventh in progress
    let status = PrinterRawStatus {
        state: PrinterState::Printing,
        current_byte: document.layer_byte_boundaries[5] + 1,
        total_bytes: document.payload_end(),
    };

    let report = compute(&document, &status).unwrap();
    assert_eq!(report.current_layer, 7);
    assert_eq!(report.progress_pct, 31.57894736842105);
    assert_eq!(report.time_left_secs, 3846);
}

#[test]
fn test_progress_reaches_last_layer() {
    let document = decode(&CtbBuilder::new().build()).unwrap();
    let status = PrinterRawStatus {
        state: PrinterState::Printing,
        current_byte: document.payload_end() + 10_000,
        total_bytes: document.payload_end(),
    };

    let report = compute(&document, &status).unwrap();
    assert_eq!(report.current_layer, 19);
    assert!(report.progress_pct < 100.0);
}

#[test]
fn test_progress_at_layer_boundaries() {
    let builder = CtbBuilder::new();
    let document = decode(&builder.build()).unwrap();
    let boundaries = builder.expected_boundaries();

    let layer_at = |current_byte: u64| {
        let status = PrinterRawStatus {
            state: PrinterState::Printing,
            current_byte,
            total_bytes: document.payload_end(),
        };
        compute(&document, &status).unwrap().current_layer
    };

    // Before the data stream and exactly at the first boundary: still layer 1
    assert_eq!(layer_at(0), 1);
    assert_eq!(layer_at(builder.data_start()), 1);
    assert_eq!(layer_at(boundaries[0]), 1);
    assert_eq!(layer_at(boundaries[0] + 1), 2);
    assert_eq!(layer_at(boundaries[5] + 1), 7);
}
