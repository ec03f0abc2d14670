//! End-to-end tests that build synthetic Classic TIFF byte buffers by hand and drive them through
//! the public [`TiffReader`]/[`Image`] API, covering cases that single-module unit tests can't
//! reach on their own (a multi-IFD overview pyramid, a full JPEG tile fetch, a GeoKey string
//! fetched through the real tag-loading path).

use std::sync::Arc;

use cogtiff_core::{CompressionMethod, Image, MemorySource, Source, TiffReader};

fn le16(v: u16) -> [u8; 2] {
    v.to_le_bytes()
}
fn le32(v: u32) -> [u8; 4] {
    v.to_le_bytes()
}

struct Entry {
    id: u16,
    ty: u16,
    count: u32,
    value: [u8; 4],
}

fn inline_entry(id: u16, ty: u16, count: u32, value: u32) -> Entry {
    Entry {
        id,
        ty,
        count,
        value: le32(value),
    }
}

/// Appends one Classic IFD (tag count + entries + next-IFD pointer) to `buf`. `entries` whose
/// value doesn't fit inline should pass `0` as a placeholder and be patched via the returned
/// per-entry value-slot offsets.
fn write_ifd(buf: &mut Vec<u8>, entries: &[Entry], next_ifd_ptr: u32) -> (u32, Vec<u32>) {
    let ifd_start = buf.len() as u32;
    buf.extend_from_slice(&le16(entries.len() as u16));
    let mut value_slot_offsets = Vec::with_capacity(entries.len());
    for e in entries {
        buf.extend_from_slice(&le16(e.id));
        buf.extend_from_slice(&le16(e.ty));
        buf.extend_from_slice(&le32(e.count));
        value_slot_offsets.push(buf.len() as u32);
        buf.extend_from_slice(&e.value);
    }
    buf.extend_from_slice(&le32(next_ifd_ptr));
    (ifd_start, value_slot_offsets)
}

fn patch_u32(buf: &mut [u8], at: u32, value: u32) {
    buf[at as usize..at as usize + 4].copy_from_slice(&le32(value));
}

/// Scenario 1 (spec §8): a Classic TIFF, one untiled image, with no `Compression` tag at all.
/// TIFF defaults absent compression to uncompressed; `get_strip` must not mistake that for
/// `UnsupportedCompression` (which is specced for the *tile* path on a missing tag, not strips).
#[tokio::test]
async fn scenario_1_untiled_strip_with_no_compression_tag() {
    let strip_payload: &[u8] = &[0xABu8; 16];

    let mut buf = Vec::new();
    buf.extend_from_slice(b"II");
    buf.extend_from_slice(&le16(42));
    let first_ifd_pos = buf.len();
    buf.extend_from_slice(&le32(0));

    let (ifd_start, slots) = write_ifd(
        &mut buf,
        &[
            inline_entry(256, 4, 1, 256), // ImageWidth
            inline_entry(257, 4, 1, 256), // ImageLength
            inline_entry(273, 4, 1, 0),   // StripOffsets, patched below
            inline_entry(279, 4, 1, strip_payload.len() as u32), // StripByteCounts
        ],
        0,
    );
    patch_u32(&mut buf, first_ifd_pos as u32, ifd_start);

    let strip_offsets_slot = slots[2];
    let strip_offset = buf.len() as u32;
    patch_u32(&mut buf, strip_offsets_slot, strip_offset);
    buf.extend_from_slice(strip_payload);

    let source: Arc<dyn Source> = Arc::new(MemorySource::new(buf));
    let reader = TiffReader::open(source).await.unwrap();
    assert_eq!(reader.images().len(), 1);
    let image: &Arc<Image> = &reader.images()[0];
    assert!(!image.is_tiled());
    assert_eq!(image.strip_count().unwrap(), 1);

    let (mime, bytes) = image.get_strip(0).await.unwrap().unwrap();
    assert_eq!(mime, "application/octet-stream");
    assert_eq!(bytes.len(), strip_payload.len());
}

/// Scenario 2 (spec §8): an overview pyramid of 4 images at x-resolutions 1.0/2.0/4.0/8.0.
/// `getImageByResolution` should pick the finest image whose resolution is still coarse enough
/// to cover the requested `r`, falling back to the coarsest image once `r` exceeds all of them.
#[tokio::test]
async fn scenario_2_resolution_pyramid_selection() {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"II");
    buf.extend_from_slice(&le16(42));
    let first_ifd_pos = buf.len();
    buf.extend_from_slice(&le32(0)); // patched below

    let resolutions = [1.0f64, 2.0, 4.0, 8.0];
    let mut ifd_starts = Vec::new();
    let mut pixel_scale_patches = Vec::new();

    for (i, _) in resolutions.iter().enumerate() {
        // next-IFD pointer is patched below, once every IFD's start offset is known.
        let (ifd_start, slots) = write_ifd(
            &mut buf,
            &[
                inline_entry(256, 4, 1, 64), // ImageWidth
                inline_entry(257, 4, 1, 64), // ImageLength
                Entry {
                    id: 33_550, // ModelPixelScale
                    ty: 12,     // DOUBLE
                    count: 3,
                    value: le32(0), // patched: points at a 24-byte blob appended below
                },
            ],
            0,
        );
        ifd_starts.push(ifd_start);
        pixel_scale_patches.push(slots[2]);

        let blob_offset = buf.len() as u32;
        patch_u32(&mut buf, pixel_scale_patches[i], blob_offset);
        for v in [resolutions[i], -resolutions[i], 0.0] {
            buf.extend_from_slice(&v.to_le_bytes());
        }
    }

    // Patch each IFD's next-pointer now that every IFD's start offset is known.
    for i in 0..ifd_starts.len() {
        let next_ifd_ptr_offset = ifd_starts[i] + 2 + 3 * 12;
        let next = if i + 1 < ifd_starts.len() {
            ifd_starts[i + 1]
        } else {
            0
        };
        patch_u32(&mut buf, next_ifd_ptr_offset, next);
    }
    patch_u32(&mut buf, first_ifd_pos as u32, ifd_starts[0]);

    let source: Arc<dyn Source> = Arc::new(MemorySource::new(buf));
    let reader = TiffReader::open(source).await.unwrap();
    assert_eq!(reader.images().len(), 4);

    let pick = |r: f64| -> usize { reader.get_image_by_resolution(r).unwrap().index() };
    assert_eq!(pick(3.5), 2);
    assert_eq!(pick(0.5), 0);
    assert_eq!(pick(100.0), 3);
}

/// Scenario 3 (spec §8): a JPEG-compressed (code 7) tile is spliced onto its `JPEGTables` header
/// when fetched through `Image::get_tile`.
#[tokio::test]
async fn scenario_3_jpeg_tile_is_spliced_with_tables() {
    let tables_payload: &[u8] = &[0xFF, 0xD8, 0xAA, 0xBB, 0xFF, 0xD9];
    let tile_payload: &[u8] = &[0xFF, 0xD8, 0xCC, 0xDD, 0xEE];

    let mut buf = Vec::new();
    buf.extend_from_slice(b"II");
    buf.extend_from_slice(&le16(42));
    let first_ifd_pos = buf.len();
    buf.extend_from_slice(&le32(0));

    let (ifd_start, slots) = write_ifd(
        &mut buf,
        &[
            inline_entry(256, 4, 1, 8),  // ImageWidth
            inline_entry(257, 4, 1, 8),  // ImageLength
            inline_entry(322, 4, 1, 8),  // TileWidth
            inline_entry(323, 4, 1, 8),  // TileLength
            inline_entry(259, 3, 1, 7),  // Compression = 7
            inline_entry(324, 4, 1, 0),  // TileOffsets, patched below (single value, inline)
            inline_entry(325, 4, 1, tile_payload.len() as u32), // TileByteCounts
            Entry {
                id: 347, // JPEGTables
                ty: 1,   // BYTE
                count: tables_payload.len() as u32,
                value: le32(0), // patched below
            },
        ],
        0,
    );
    patch_u32(&mut buf, first_ifd_pos as u32, ifd_start);

    let jpeg_tables_slot = slots[7];
    let tile_offsets_slot = slots[5];

    let tables_offset = buf.len() as u32;
    patch_u32(&mut buf, jpeg_tables_slot, tables_offset);
    buf.extend_from_slice(tables_payload);

    let tile_offset = buf.len() as u32;
    patch_u32(&mut buf, tile_offsets_slot, tile_offset);
    buf.extend_from_slice(tile_payload);

    let source: Arc<dyn Source> = Arc::new(MemorySource::new(buf));
    let reader = TiffReader::open(source).await.unwrap();
    let image: &Arc<Image> = &reader.images()[0];
    assert_eq!(image.compression(), CompressionMethod::ModernJpeg);

    let (mime, bytes) = image.get_tile(0, 0).await.unwrap().unwrap();
    assert_eq!(mime, "image/jpeg");
    // tables minus trailing EOI, followed by tile minus leading SOI.
    assert_eq!(bytes.as_ref(), &[0xFF, 0xD8, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE]);
}

/// Scenario 6 (spec §8): a `GTCitationGeoKey` referencing `GeoAsciiParams` is readable through
/// `Image::value_geo` once `init()`'s geo-tag loading has run.
#[tokio::test]
async fn scenario_6_geo_ascii_key_readable_after_init() {
    let ascii_payload = "WGS 84|foo|";

    let mut buf = Vec::new();
    buf.extend_from_slice(b"II");
    buf.extend_from_slice(&le16(42));
    let first_ifd_pos = buf.len();
    buf.extend_from_slice(&le32(0));

    // GeoKeyDirectory: header {1,1,0,1} + one key {GTCitationGeoKey=1026, loc=GeoAsciiParams,
    // count=11, offset=0}, 8 u16s total = 16 bytes (too big to fit inline in Classic).
    let geo_key_dir: Vec<u16> = vec![1, 1, 0, 1, 1026, 34_737, 11, 0];
    let geo_key_dir_bytes: Vec<u8> = geo_key_dir.iter().flat_map(|v| v.to_le_bytes()).collect();

    let (ifd_start, slots) = write_ifd(
        &mut buf,
        &[
            inline_entry(256, 4, 1, 16),
            inline_entry(257, 4, 1, 16),
            Entry {
                id: 34_735, // GeoKeyDirectory
                ty: 3,      // SHORT
                count: geo_key_dir.len() as u32,
                value: le32(0), // patched below
            },
            Entry {
                id: 34_737, // GeoAsciiParams
                ty: 2,      // ASCII
                count: ascii_payload.len() as u32,
                value: le32(0), // patched below
            },
        ],
        0,
    );
    patch_u32(&mut buf, first_ifd_pos as u32, ifd_start);

    let geo_key_dir_slot = slots[2];
    let geo_ascii_slot = slots[3];

    let geo_key_dir_offset = buf.len() as u32;
    patch_u32(&mut buf, geo_key_dir_slot, geo_key_dir_offset);
    buf.extend_from_slice(&geo_key_dir_bytes);

    let ascii_offset = buf.len() as u32;
    patch_u32(&mut buf, geo_ascii_slot, ascii_offset);
    buf.extend_from_slice(ascii_payload.as_bytes());

    let source: Arc<dyn Source> = Arc::new(MemorySource::new(buf));
    let reader = TiffReader::open(source).await.unwrap();
    let image = &reader.images()[0];

    let value = image
        .value_geo(cogtiff_core::TiffTagGeo::GTCitationGeoKey)
        .unwrap()
        .unwrap();
    assert_eq!(value.as_str(), Some("WGS 84"));
}
