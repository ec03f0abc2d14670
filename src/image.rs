//! [`Image`]: one IFD's worth of tags, plus the derived geometry/tile/strip accessors built on
//! top of them (spec §4.F).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::OnceCell;

use crate::error::{CogTiffError, Result};
use crate::geo_key_directory::{self, GeoValue};
use crate::ghost_options::GhostOptions;
use crate::ifd_config::IfdConfig;
use crate::source::Source;
use crate::tag::{decode_value, Tag};
use crate::tags::{CompressionMethod, PhotometricInterpretation, SampleFormat, TiffTag, TiffTagGeo};
use crate::byte_view::ByteView;
use crate::value::Value;

/// Tags every image's `init()` fetches eagerly, since nearly every derived accessor needs one of
/// them and they're cheap (all but the geo ones are `Inline` in practice).
const BASELINE_TAGS: &[TiffTag] = &[
    TiffTag::NewSubfileType,
    TiffTag::ImageWidth,
    TiffTag::ImageLength,
    TiffTag::BitsPerSample,
    TiffTag::Compression,
    TiffTag::PhotometricInterpretation,
    TiffTag::SamplesPerPixel,
    TiffTag::SampleFormat,
    TiffTag::TileWidth,
    TiffTag::TileLength,
    TiffTag::ModelPixelScale,
    TiffTag::ModelTiePoint,
    TiffTag::ModelTransformation,
];

const GEO_TAGS: &[TiffTag] = &[
    TiffTag::GeoKeyDirectory,
    TiffTag::GeoAsciiParams,
    TiffTag::GeoDoubleParams,
];

/// One entry in the IFD chain, plus everything derived from it.
///
/// Holds its own handle to the [`Source`], [`IfdConfig`], and optional [`GhostOptions`] rather
/// than a back-reference to the owning `TiffReader`, so images can outlive (or be handed out
/// independently of) the reader that built them without a reference cycle.
pub struct Image {
    index: usize,
    tags: Mutex<HashMap<u16, Tag>>,
    geo_tags: OnceCell<HashMap<TiffTagGeo, GeoValue>>,
    /// Set once, to `images[0]`, for every image but the base itself. Lets mask/overview
    /// sub-images delegate origin/resolution lookups back to the base image.
    base: OnceCell<Arc<Image>>,
    source: Arc<dyn Source>,
    config: IfdConfig,
    ghost_options: Option<Arc<GhostOptions>>,
}

impl Image {
    pub(crate) fn new(
        index: usize,
        tags: HashMap<u16, Tag>,
        source: Arc<dyn Source>,
        config: IfdConfig,
        ghost_options: Option<Arc<GhostOptions>>,
    ) -> Arc<Image> {
        Arc::new(Image {
            index,
            tags: Mutex::new(tags),
            geo_tags: OnceCell::new(),
            base: OnceCell::new(),
            source,
            config,
            ghost_options,
        })
    }

    pub(crate) fn set_base(&self, base: Arc<Image>) {
        let _ = self.base.set(base);
    }

    /// This image's position in `TiffReader::images()`; `0` is always the full-resolution base.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Fetch the baseline + (optionally) GeoTIFF tag set up front, so later synchronous accessors
    /// don't need to perform I/O. Safe to call more than once; each call re-fetches, but
    /// `load_geo_tiff_tags` itself is idempotent.
    #[tracing::instrument(skip(self), fields(index = self.index))]
    pub async fn init(&self, load_geo_tags: bool) -> Result<()> {
        tracing::debug!("fetching baseline tag set");
        let mut futs = BASELINE_TAGS.iter().map(|t| self.fetch(*t)).collect::<Vec<_>>();
        if load_geo_tags {
            futs.extend(GEO_TAGS.iter().map(|t| self.fetch(*t)));
        }
        futures::future::try_join_all(futs).await?;
        if load_geo_tags {
            self.load_geo_tiff_tags().await?;
        }
        Ok(())
    }

    pub(crate) fn require_base_dimensions(&self) -> Result<()> {
        self.size()?;
        Ok(())
    }

    /// Look up a tag's decoded value without performing I/O. `None` if the tag is absent from
    /// this IFD, or present but not yet fetched (see [`Image::fetch`]).
    pub fn value(&self, tag: TiffTag) -> Option<Value> {
        let tags = self.tags.lock().unwrap();
        tags.get(&tag.to_u16()).and_then(Tag::loaded_value)
    }

    fn value_u32(&self, tag: TiffTag) -> Option<u32> {
        self.value(tag).and_then(|v| v.into_u32().ok())
    }

    fn value_u64(&self, tag: TiffTag) -> Option<u64> {
        self.value(tag).and_then(|v| v.into_u64().ok())
    }

    fn value_f64_vec(&self, tag: TiffTag) -> Option<Vec<f64>> {
        self.value(tag).and_then(|v| v.into_f64_vec().ok())
    }

    /// Fetch a tag's value, performing I/O the first time it's needed; subsequent calls return
    /// the cached value. `None` if the tag is absent from this IFD.
    pub async fn fetch(&self, tag: TiffTag) -> Result<Option<Value>> {
        let id = tag.to_u16();
        let snapshot = {
            let tags = self.tags.lock().unwrap();
            tags.get(&id).cloned()
        };
        let Some(entry) = snapshot else {
            return Ok(None);
        };

        match entry {
            Tag::Inline { value, .. } => Ok(Some(value)),
            Tag::Lazy { value: Some(v), .. } => Ok(Some(v)),
            Tag::Offset {
                loaded: Some(vals), ..
            } => Ok(Some(Value::List(vals))),
            Tag::Lazy {
                data_type,
                count,
                value_offset,
                ..
            } => {
                let value = self.fetch_and_decode(value_offset, data_type, count).await?;
                let mut tags = self.tags.lock().unwrap();
                if let Some(Tag::Lazy { value: slot, .. }) = tags.get_mut(&id) {
                    *slot = Some(value.clone());
                }
                Ok(Some(value))
            }
            Tag::Offset {
                data_type,
                count,
                value_offset,
                ..
            } => {
                let decoded = self.fetch_and_decode(value_offset, data_type, count).await?;
                let list = decoded.into_list()?;
                let mut tags = self.tags.lock().unwrap();
                if let Some(Tag::Offset { loaded, .. }) = tags.get_mut(&id) {
                    *loaded = Some(list.clone());
                }
                Ok(Some(Value::List(list)))
            }
        }
    }

    async fn fetch_and_decode(
        &self,
        value_offset: u64,
        data_type: crate::tags::TagType,
        count: u64,
    ) -> Result<Value> {
        let len = count
            .checked_mul(data_type.size())
            .ok_or_else(|| CogTiffError::General("tag payload size overflow".into()))?;
        let bytes = self.source.fetch(value_offset, len).await?;
        let view = ByteView::new(bytes, value_offset);
        decode_value(&view, value_offset, data_type, count)
    }

    fn tag_count(&self, tag: TiffTag) -> Option<u64> {
        let tags = self.tags.lock().unwrap();
        tags.get(&tag.to_u16()).map(Tag::count)
    }

    // --- GeoTIFF ------------------------------------------------------------------------------

    /// Parse and cache the GeoKeyDirectory, if present. A no-op on the second and later calls.
    pub async fn load_geo_tiff_tags(&self) -> Result<()> {
        if self.geo_tags.initialized() {
            return Ok(());
        }
        let dir = self.fetch(TiffTag::GeoKeyDirectory).await?;
        let Some(dir) = dir else {
            // No GeoKeyDirectory at all: record an empty map so `is_geo_located` etc. can tell
            // "not geo-referenced" apart from "not loaded yet".
            let _ = self.geo_tags.set(HashMap::new());
            return Ok(());
        };
        let dir = dir.into_u16_vec()?;
        let ascii = self
            .fetch(TiffTag::GeoAsciiParams)
            .await?
            .map(Value::into_string)
            .transpose()?;
        let doubles = self
            .fetch(TiffTag::GeoDoubleParams)
            .await?
            .map(Value::into_f64_vec)
            .transpose()?;
        let parsed = geo_key_directory::parse(&dir, ascii.as_deref(), doubles.as_deref())?;
        let _ = self.geo_tags.set(parsed);
        Ok(())
    }

    /// Look up a GeoKey's value. Errors with [`CogTiffError::GeoNotLoaded`] if
    /// [`Image::load_geo_tiff_tags`] hasn't completed yet.
    pub fn value_geo(&self, key: TiffTagGeo) -> Result<Option<GeoValue>> {
        let map = self.geo_tags.get().ok_or(CogTiffError::GeoNotLoaded)?;
        Ok(map.get(&key).cloned())
    }

    /// The EPSG code from `ProjectedCSTypeGeoKey`, falling back to `GeographicTypeGeoKey`. Both
    /// `32767` ("user-defined") and absence read as "no EPSG code".
    pub fn epsg(&self) -> Result<Option<u16>> {
        for key in [
            TiffTagGeo::ProjectedCSTypeGeoKey,
            TiffTagGeo::GeographicTypeGeoKey,
        ] {
            if let Some(code) = self.value_geo(key)?.and_then(|v| v.as_u16()) {
                if code != 32_767 {
                    return Ok(Some(code));
                }
            }
        }
        Ok(None)
    }

    /// True iff this image carries enough GeoTIFF tags to place it on the ground: a
    /// `ModelPixelScale`/`ModelTiePoint` pair, or a `ModelTransformation` matrix.
    ///
    /// An image with only a lone `ModelTiePoint` (no scale) reads as *not* geo-located; this
    /// mirrors upstream behavior rather than a stricter reading of the GeoTIFF spec (see
    /// `DESIGN.md`).
    pub fn is_geo_located(&self) -> bool {
        let has_scale_and_tiepoint =
            self.value(TiffTag::ModelPixelScale).is_some() && self.value(TiffTag::ModelTiePoint).is_some();
        let has_transform = self.value(TiffTag::ModelTransformation).is_some();
        has_scale_and_tiepoint || has_transform
    }

    // --- Geometry ------------------------------------------------------------------------------

    pub fn size(&self) -> Result<(u32, u32)> {
        let w = self
            .value_u32(TiffTag::ImageWidth)
            .ok_or(CogTiffError::RequiredTagMissing("ImageWidth"))?;
        let h = self
            .value_u32(TiffTag::ImageLength)
            .ok_or(CogTiffError::RequiredTagMissing("ImageLength"))?;
        Ok((w, h))
    }

    fn is_sub_image(&self) -> bool {
        self.value_u32(TiffTag::NewSubfileType) == Some(1)
    }

    pub fn origin(&self) -> Result<(f64, f64, f64)> {
        if let Some(tp) = self.value_f64_vec(TiffTag::ModelTiePoint) {
            if tp.len() >= 6 {
                return Ok((tp[3], tp[4], tp[5]));
            }
        }
        if let Some(tr) = self.value_f64_vec(TiffTag::ModelTransformation) {
            if tr.len() >= 16 {
                return Ok((tr[3], tr[7], tr[11]));
            }
        }
        if self.is_sub_image() {
            if let Some(base) = self.base.get() {
                return base.origin();
            }
        }
        Err(CogTiffError::NoGeoTransform)
    }

    pub fn resolution(&self) -> Result<(f64, f64, f64)> {
        if let Some(ps) = self.value_f64_vec(TiffTag::ModelPixelScale) {
            if ps.len() >= 3 {
                return Ok((ps[0], -ps[1], ps[2]));
            }
        }
        if let Some(tr) = self.value_f64_vec(TiffTag::ModelTransformation) {
            if tr.len() >= 16 {
                return Ok((tr[0], tr[5], tr[10]));
            }
        }
        if self.is_sub_image() {
            if let Some(base) = self.base.get() {
                let (bx, by, bz) = base.resolution()?;
                let (bw, _) = base.size()?;
                let (w, _) = self.size()?;
                let ratio = bw as f64 / w.max(1) as f64;
                return Ok((bx * ratio, by * ratio, bz));
            }
        }
        Err(CogTiffError::NoGeoTransform)
    }

    pub fn bbox(&self) -> Result<(f64, f64, f64, f64)> {
        let (ox, oy, _) = self.origin()?;
        let (rx, ry, _) = self.resolution()?;
        let (w, h) = self.size()?;
        let x2 = ox + rx * w as f64;
        let y2 = oy + ry * h as f64;
        Ok((ox.min(x2), oy.min(y2), ox.max(x2), oy.max(y2)))
    }

    pub fn compression(&self) -> CompressionMethod {
        self.value_u32(TiffTag::Compression)
            .map(|c| CompressionMethod::from_u16_exhaustive(c as u16))
            .unwrap_or(CompressionMethod::None)
    }

    /// Like [`Image::compression`], but errors rather than defaulting when the `Compression` tag
    /// is simply absent; used on the tile/strip fetch path, where the spec calls out
    /// `UnsupportedCompression` explicitly for a missing tag.
    fn require_compression(&self) -> Result<CompressionMethod> {
        self.value_u32(TiffTag::Compression)
            .map(|c| CompressionMethod::from_u16_exhaustive(c as u16))
            .ok_or(CogTiffError::UnsupportedCompression(None))
    }

    pub fn photometric_interpretation(&self) -> Option<PhotometricInterpretation> {
        self.value_u32(TiffTag::PhotometricInterpretation)
            .and_then(|v| PhotometricInterpretation::from_u16(v as u16))
    }

    pub fn sample_format(&self) -> SampleFormat {
        self.value_u32(TiffTag::SampleFormat)
            .map(|v| SampleFormat::from_u16_exhaustive(v as u16))
            .unwrap_or(SampleFormat::Uint)
    }

    pub fn bits_per_sample(&self) -> Vec<u16> {
        self.value(TiffTag::BitsPerSample)
            .and_then(|v| v.into_u16_vec().ok())
            .unwrap_or_default()
    }

    pub fn samples_per_pixel(&self) -> u32 {
        self.value_u32(TiffTag::SamplesPerPixel).unwrap_or(1)
    }

    /// `GDAL_NODATA`'s ASCII payload, fetched lazily (it isn't part of the baseline init set).
    pub async fn gdal_no_data(&self) -> Result<Option<String>> {
        self.fetch(TiffTag::GdalNoData)
            .await?
            .map(Value::into_string)
            .transpose()
    }

    pub fn is_tiled(&self) -> bool {
        self.value(TiffTag::TileWidth).is_some()
    }

    pub fn tile_size(&self) -> Result<(u32, u32)> {
        let w = self
            .value_u32(TiffTag::TileWidth)
            .ok_or(CogTiffError::RequiredTagMissing("TileWidth"))?;
        let h = self
            .value_u32(TiffTag::TileLength)
            .ok_or(CogTiffError::RequiredTagMissing("TileLength"))?;
        Ok((w, h))
    }

    fn tiles_across(&self) -> Result<(u32, u32)> {
        let (w, h) = self.size()?;
        let (tw, th) = self.tile_size()?;
        Ok((div_ceil(w, tw), div_ceil(h, th)))
    }

    pub fn tile_count(&self) -> Result<u64> {
        let (nx, ny) = self.tiles_across()?;
        Ok(nx as u64 * ny as u64)
    }

    pub fn strip_count(&self) -> Result<u64> {
        self.tag_count(TiffTag::StripByteCounts)
            .ok_or(CogTiffError::RequiredTagMissing("StripByteCounts"))
    }

    /// The file offset of tile `index`'s body, `0` if the tile is sparse. A thin wrapper over
    /// [`Image::get_tile_size`] for callers that only want the offset (e.g. building a read plan
    /// across many tiles without the byte length of each).
    pub async fn tile_offset(&self, index: u64) -> Result<u64> {
        self.get_tile_size(index).await.map(|(offset, _)| offset)
    }

    /// Pixel bounds `(x0, y0, x1, y1)` of tile `(x, y)`, clamped to the image edge.
    pub fn get_tile_bounds(&self, x: u32, y: u32) -> Result<(u32, u32, u32, u32)> {
        let (nx, ny) = self.tiles_across()?;
        if x >= nx || y >= ny {
            return Err(CogTiffError::IndexOutOfBounds {
                index: y as u64 * nx as u64 + x as u64,
                max: nx as u64 * ny as u64,
            });
        }
        let (tw, th) = self.tile_size()?;
        let (w, h) = self.size()?;
        let x0 = x * tw;
        let y0 = y * th;
        let x1 = (x0 + tw).min(w);
        let y1 = (y0 + th).min(h);
        Ok((x0, y0, x1, y1))
    }

    fn tile_index(&self, x: u32, y: u32) -> Result<u64> {
        let (nx, ny) = self.tiles_across()?;
        if x >= nx || y >= ny {
            return Err(CogTiffError::IndexOutOfBounds {
                index: y as u64 * nx.max(1) as u64 + x as u64,
                max: nx as u64 * ny as u64,
            });
        }
        Ok(y as u64 * nx as u64 + x as u64)
    }

    /// The tile body's `(offset, byte_length)` in the source file, `(0, 0)` if the tile is
    /// sparse. Uses the tile-leader optimization (a tiny read immediately before the tile body)
    /// instead of dereferencing `TileByteCounts` when the ghost block advertises one.
    pub async fn get_tile_size(&self, index: u64) -> Result<(u64, u64)> {
        let offsets = self
            .fetch(TiffTag::TileOffsets)
            .await?
            .ok_or(CogTiffError::RequiredTagMissing("TileOffsets"))?
            .into_u64_vec()?;
        let offset = *offsets
            .get(index as usize)
            .ok_or(CogTiffError::IndexOutOfBounds {
                index,
                max: offsets.len() as u64,
            })?;
        if offset == 0 {
            return Ok((0, 0));
        }

        if let Some(leader_size) = self
            .ghost_options
            .as_ref()
            .and_then(|g| g.tile_leader_byte_size())
        {
            let leader_size = leader_size as u64;
            let bytes = self.source.fetch(offset - leader_size, leader_size).await?;
            let view = ByteView::new(bytes, offset - leader_size);
            let size = view.read_uint(offset - leader_size, leader_size as u8)?;
            return Ok((offset, size));
        }

        tracing::warn!(
            index,
            "no tile-leader ghost option; materializing TileByteCounts"
        );
        let counts = self
            .fetch(TiffTag::TileByteCounts)
            .await?
            .ok_or(CogTiffError::RequiredTagMissing("TileByteCounts"))?
            .into_u64_vec()?;
        let size = *counts
            .get(index as usize)
            .ok_or(CogTiffError::IndexOutOfBounds {
                index,
                max: counts.len() as u64,
            })?;
        Ok((offset, size))
    }

    /// `true` iff tile `(x, y)` has a non-sparse body. Never errors: an out-of-range tile, or any
    /// I/O error encountered while consulting the offset table, simply reads as "no tile".
    pub async fn has_tile(&self, x: u32, y: u32) -> bool {
        let Ok(index) = self.tile_index(x, y) else {
            return false;
        };
        matches!(self.get_tile_size(index).await, Ok((offset, _)) if offset != 0)
    }

    /// Fetch tile `(x, y)`'s raw body and a MIME type describing its encoding. `Ok(None)` for a
    /// sparse tile (offset `0`) — the body is never fetched in that case.
    pub async fn get_tile(&self, x: u32, y: u32) -> Result<Option<(&'static str, Bytes)>> {
        let index = self.tile_index(x, y)?;
        let (offset, size) = self.get_tile_size(index).await?;
        if offset == 0 {
            return Ok(None);
        }
        let bytes = self.source.fetch(offset, size).await?;
        if (bytes.len() as u64) < size {
            return Err(CogTiffError::ShortRead {
                offset,
                expected: size,
                actual: bytes.len() as u64,
            });
        }

        let compression = self.require_compression()?;
        let mime = mime_for(compression);
        // Splicing is keyed to compression code 7, not the code TIFF 6.0 conventionally calls
        // "old-style JPEG" (6) — see DESIGN.md.
        let bytes = if compression == CompressionMethod::ModernJpeg {
            let tables = self
                .fetch(TiffTag::JPEGTables)
                .await?
                .map(value_as_bytes)
                .transpose()?;
            match tables {
                Some(tables) if tables.len() >= 2 && bytes.len() >= 2 => {
                    splice_jpeg_tables(&tables, &bytes)
                }
                _ => bytes,
            }
        } else {
            bytes
        };

        Ok(Some((mime, bytes)))
    }

    /// Fetch strip `i`'s raw body and a MIME type describing its encoding. `Ok(None)` for a
    /// sparse strip (offset `0`).
    pub async fn get_strip(&self, i: u64) -> Result<Option<(&'static str, Bytes)>> {
        let offsets = self
            .fetch(TiffTag::StripOffsets)
            .await?
            .ok_or(CogTiffError::RequiredTagMissing("StripOffsets"))?
            .into_u64_vec()?;
        let counts = self
            .fetch(TiffTag::StripByteCounts)
            .await?
            .ok_or(CogTiffError::RequiredTagMissing("StripByteCounts"))?
            .into_u64_vec()?;
        let offset = *offsets
            .get(i as usize)
            .ok_or(CogTiffError::IndexOutOfBounds {
                index: i,
                max: offsets.len() as u64,
            })?;
        let size = *counts.get(i as usize).unwrap_or(&0);
        if offset == 0 {
            return Ok(None);
        }
        let bytes = self.source.fetch(offset, size).await?;
        if (bytes.len() as u64) < size {
            return Err(CogTiffError::ShortRead {
                offset,
                expected: size,
                actual: bytes.len() as u64,
            });
        }
        Ok(Some((mime_for(self.compression()), bytes)))
    }
}

fn div_ceil(n: u32, d: u32) -> u32 {
    if d == 0 {
        0
    } else {
        (n + d - 1) / d
    }
}

fn value_as_bytes(value: Value) -> Result<Bytes> {
    let list = value.into_list()?;
    let mut out = Vec::with_capacity(list.len());
    for v in list {
        out.push(match v {
            Value::Byte(b) => b,
            other => other.into_u32()? as u8,
        });
    }
    Ok(Bytes::from(out))
}

/// Splice an "old-style" JPEG tile onto its `JPEGTables` header: the tables blob minus its
/// trailing EOI marker, followed by the tile minus its duplicate leading SOI marker.
fn splice_jpeg_tables(tables: &Bytes, tile: &Bytes) -> Bytes {
    let mut out = Vec::with_capacity(tables.len() - 2 + tile.len() - 2);
    out.extend_from_slice(&tables[..tables.len() - 2]);
    out.extend_from_slice(&tile[2..]);
    Bytes::from(out)
}

fn mime_for(compression: CompressionMethod) -> &'static str {
    match compression {
        CompressionMethod::OldJpeg | CompressionMethod::ModernJpeg => "image/jpeg",
        CompressionMethod::WebP => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use crate::tag::TagFactory;
    use std::sync::Arc;

    fn image_with_tags(tags: HashMap<u16, Tag>) -> Arc<Image> {
        Image::new(
            0,
            tags,
            Arc::new(MemorySource::new(Vec::<u8>::new())),
            IfdConfig::CLASSIC,
            None,
        )
    }

    fn inline_short(id: u16, v: u16) -> (u16, Tag) {
        (
            id,
            Tag::Inline {
                id,
                data_type: crate::tags::TagType::Short,
                count: 1,
                value: Value::Short(v),
            },
        )
    }

    #[test]
    fn size_reads_width_and_height() {
        let tags = HashMap::from([inline_short(256, 100), inline_short(257, 200)]);
        let image = image_with_tags(tags);
        assert_eq!(image.size().unwrap(), (100, 200));
    }

    #[test]
    fn size_missing_tag_errors() {
        let image = image_with_tags(HashMap::new());
        assert!(matches!(
            image.size(),
            Err(CogTiffError::RequiredTagMissing("ImageWidth"))
        ));
    }

    #[test]
    fn is_geo_located_requires_scale_and_tiepoint() {
        let image = image_with_tags(HashMap::new());
        assert!(!image.is_geo_located());
    }

    #[test]
    fn value_geo_before_load_errors() {
        let image = image_with_tags(HashMap::new());
        assert!(matches!(
            image.value_geo(TiffTagGeo::GTModelTypeGeoKey),
            Err(CogTiffError::GeoNotLoaded)
        ));
    }

    #[tokio::test]
    async fn sparse_tile_returns_none_without_fetching_body() {
        // TileOffsets = [0] (inline, fits in 4 bytes as a single LONG)
        let offsets_entry = Tag::Offset {
            id: TiffTag::TileOffsets.to_u16(),
            data_type: crate::tags::TagType::Long,
            count: 1,
            value_offset: 0,
            loaded: Some(vec![Value::Unsigned(0)]),
        };
        let tags = HashMap::from([
            inline_short(256, 128),
            inline_short(257, 128),
            inline_short(322, 128),
            inline_short(323, 128),
            (TiffTag::TileOffsets.to_u16(), offsets_entry),
        ]);
        let image = image_with_tags(tags);
        let tile = image.get_tile(0, 0).await.unwrap();
        assert!(tile.is_none());
    }

    #[tokio::test]
    async fn tile_leader_avoids_byte_counts_fetch() {
        // Body bytes: [leader(4 bytes LE = 10)][10 bytes of tile data] at offset 4.
        let mut body = Vec::new();
        body.extend_from_slice(&10u32.to_le_bytes());
        body.extend(std::iter::repeat(0x11u8).take(10));
        let source = Arc::new(MemorySource::new(body));

        let offsets_entry = Tag::Offset {
            id: TiffTag::TileOffsets.to_u16(),
            data_type: crate::tags::TagType::Long,
            count: 1,
            value_offset: 0,
            loaded: Some(vec![Value::Unsigned(4)]),
        };
        let tags = HashMap::from([
            inline_short(256, 128),
            inline_short(257, 128),
            inline_short(322, 128),
            inline_short(323, 128),
            (TiffTag::TileOffsets.to_u16(), offsets_entry),
        ]);

        let ghost = GhostOptions::parse(b"BLOCK_LEADER_SIZE_AS_UINT4=4\n").unwrap();
        let image = Image::new(0, tags, source, IfdConfig::CLASSIC, Some(Arc::new(ghost)));
        let (offset, size) = image.get_tile_size(0).await.unwrap();
        assert_eq!(offset, 4);
        assert_eq!(size, 10);
    }

    #[test]
    fn jpeg_splice_drops_tables_eoi_and_tile_soi() {
        let tables = Bytes::from_static(&[0xFF, 0xD8, 0xAA, 0xBB, 0xFF, 0xD9]);
        let tile = Bytes::from_static(&[0xFF, 0xD8, 0xCC, 0xDD]);
        let spliced = splice_jpeg_tables(&tables, &tile);
        assert_eq!(spliced.as_ref(), &[0xFF, 0xD8, 0xAA, 0xBB, 0xCC, 0xDD]);
    }

    #[test]
    fn tag_factory_still_used_for_entry_decoding() {
        // Sanity check that image.rs and tag.rs agree on Classic entry layout.
        let buf = {
            let mut b = vec![0u8; 12];
            b[0..2].copy_from_slice(&256u16.to_le_bytes());
            b[2..4].copy_from_slice(&3u16.to_le_bytes());
            b[4..8].copy_from_slice(&1u32.to_le_bytes());
            b[8..10].copy_from_slice(&7u16.to_le_bytes());
            b
        };
        let view = ByteView::new(Bytes::from(buf), 0);
        let tag = TagFactory::build(&IfdConfig::CLASSIC, &view, 0).unwrap();
        assert_eq!(tag.id(), 256);
    }
}
