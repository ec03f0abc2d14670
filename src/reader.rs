//! [`TiffReader`]: reads the header, walks the IFD chain, and builds [`Image`] records
//! (spec §4.E).

use std::sync::Arc;

use bytes::Bytes;
use futures::future::try_join_all;
use tokio::sync::OnceCell;

use crate::byte_view::ByteView;
use crate::error::{CogTiffError, Result};
use crate::ghost_options::GhostOptions;
use crate::ifd_config::{IfdConfig, TiffVersion};
use crate::image::Image;
use crate::source::Source;
use crate::tag::{Tag, TagFactory};

/// Default number of bytes fetched for the initial header read, and for each subsequent IFD
/// block, when the caller hasn't overridden it. 16 KiB comfortably covers a TIFF header, ghost
/// block, and a typical IFD's worth of entries in a single round trip.
pub const DEFAULT_READ_SIZE: u64 = 16 * 1024;

/// User-facing knobs for [`TiffReader::open_with_options`].
#[derive(Debug, Clone, Default)]
pub struct ReaderOptions {
    /// Override the number of bytes fetched for the initial header read. Defaults to
    /// [`DEFAULT_READ_SIZE`].
    pub header_size: Option<u64>,
    /// Override the ghost-block size ceiling. Defaults to
    /// [`crate::ghost_options::GHOST_SIZE_LIMIT`].
    pub ghost_size_limit: Option<u64>,
}

struct ReaderState {
    version: TiffVersion,
    config: IfdConfig,
    ghost_options: Option<Arc<GhostOptions>>,
    images: Vec<Arc<Image>>,
}

/// Top-level entry point: parses a TIFF/BigTIFF container lazily over a [`Source`].
pub struct TiffReader {
    source: Arc<dyn Source>,
    header_size: u64,
    ghost_size_limit: u64,
    state: OnceCell<Arc<ReaderState>>,
}

impl TiffReader {
    fn new(source: Arc<dyn Source>, options: ReaderOptions) -> Self {
        Self {
            source,
            header_size: options.header_size.unwrap_or(DEFAULT_READ_SIZE),
            ghost_size_limit: options
                .ghost_size_limit
                .unwrap_or(crate::ghost_options::GHOST_SIZE_LIMIT),
            state: OnceCell::new(),
        }
    }

    /// Construct a reader and run `init()` to completion.
    pub async fn open(source: Arc<dyn Source>) -> Result<Arc<Self>> {
        Self::open_with_options(source, ReaderOptions::default()).await
    }

    /// Construct a reader with explicit options and run `init()` to completion.
    pub async fn open_with_options(
        source: Arc<dyn Source>,
        options: ReaderOptions,
    ) -> Result<Arc<Self>> {
        let reader = Arc::new(Self::new(source, options));
        reader.init().await?;
        Ok(reader)
    }

    /// Parse the header and IFD chain if this is the first call; otherwise wait on (and share
    /// the result of) the call already in flight.
    #[tracing::instrument(skip(self))]
    pub async fn init(&self) -> Result<()> {
        self.state
            .get_or_try_init(|| async {
                tracing::debug!("parsing TIFF header and walking IFD chain");
                self.do_init().await.map(Arc::new)
            })
            .await?;
        Ok(())
    }

    fn state(&self) -> &ReaderState {
        self.state
            .get()
            .expect("TiffReader::init must complete before use")
    }

    /// All images in header order; `images()[0]` is the full-resolution base.
    pub fn images(&self) -> &[Arc<Image>] {
        &self.state().images
    }

    pub fn version(&self) -> TiffVersion {
        self.state().version
    }

    pub fn ghost_options(&self) -> Option<&Arc<GhostOptions>> {
        self.state().ghost_options.as_ref()
    }

    /// `(x, y, z)` resolution triples for every image, in header order.
    pub fn get_resolutions(&self) -> Result<Vec<(f64, f64, f64)>> {
        self.images().iter().map(|img| img.resolution()).collect()
    }

    /// Among the overview pyramid (including the base image), return the finest image whose
    /// x-resolution is still at least as coarse as `r` (within a small tolerance); if none is
    /// coarse enough, return the coarsest image available.
    ///
    /// See `DESIGN.md` for why this direction was chosen over a literal reading of the
    /// corresponding prose.
    pub fn get_image_by_resolution(&self, r: f64) -> Result<&Arc<Image>> {
        const TOLERANCE: f64 = 0.01;
        let images = self.images();
        for img in images {
            if img.resolution()?.0 >= r - TOLERANCE {
                return Ok(img);
            }
        }
        images
            .last()
            .ok_or_else(|| CogTiffError::General("reader has no images".into()))
    }

    async fn do_init(&self) -> Result<ReaderState> {
        let (mut view, version, first_ifd_offset, header_end) = self.read_header().await?;
        let config = IfdConfig::for_version(version);

        let ghost_options = self
            .read_ghost_options(&mut view, header_end, first_ifd_offset)
            .await?
            .map(Arc::new);

        let mut images = Vec::new();
        let mut next = first_ifd_offset;
        while let Some(offset) = next {
            let (tags, next_offset) = self.read_ifd(&mut view, &config, offset).await?;
            let image = Image::new(
                images.len(),
                tags,
                self.source.clone(),
                config,
                ghost_options.clone(),
            );
            images.push(image);
            next = next_offset;
        }

        if images.is_empty() {
            return Err(CogTiffError::General(
                "TIFF file contains no image file directories".into(),
            ));
        }

        let base = images[0].clone();
        for image in images.iter().skip(1) {
            image.set_base(base.clone());
        }

        try_join_all(images.iter().map(|img| img.init(true))).await?;

        for image in &images {
            image.require_base_dimensions()?;
        }

        Ok(ReaderState {
            version,
            config,
            ghost_options,
            images,
        })
    }

    /// Reads the byte-order mark, version word, and first-IFD pointer. Returns the `ByteView`
    /// covering the header (for ghost-block / first-IFD reuse), the detected version, the first
    /// IFD's absolute offset, and the absolute offset immediately following the header fields.
    async fn read_header(&self) -> Result<(ByteView, TiffVersion, Option<u64>, u64)> {
        let bytes = self.source.fetch(0, self.header_size).await?;
        let view = ByteView::new(bytes, 0);

        let bom = view.slice(0, 2)?;
        if bom.as_ref() == b"MM" {
            return Err(CogTiffError::UnsupportedEndian);
        }
        if bom.as_ref() != b"II" {
            return Err(CogTiffError::General(format!(
                "unrecognized byte-order mark: {bom:?}"
            )));
        }

        let version_word = view.read_u16(2)?;
        let (version, header_end, first_ifd_offset) = match version_word {
            42 => {
                let ptr = view.read_u32(4)? as u64;
                (TiffVersion::Classic, 8u64, ptr)
            }
            43 => {
                let pointer_size = view.read_u16(4)?;
                let reserved = view.read_u16(6)?;
                if pointer_size != 8 || reserved != 0 {
                    return Err(CogTiffError::UnsupportedPointerSize);
                }
                let ptr = view.read_u64(8)?;
                (TiffVersion::Big, 16u64, ptr)
            }
            other => return Err(CogTiffError::UnsupportedVersion(other)),
        };

        let first_ifd_offset = if first_ifd_offset == 0 {
            None
        } else {
            Some(first_ifd_offset)
        };

        Ok((view, version, first_ifd_offset, header_end))
    }

    async fn read_ghost_options(
        &self,
        view: &mut ByteView,
        header_end: u64,
        first_ifd_offset: Option<u64>,
    ) -> Result<Option<GhostOptions>> {
        let Some(first_ifd_offset) = first_ifd_offset else {
            return Ok(None);
        };
        if first_ifd_offset <= header_end {
            return Ok(None);
        }
        let ghost_size = first_ifd_offset - header_end;
        if ghost_size == 0 || ghost_size >= self.ghost_size_limit {
            return Ok(None);
        }

        self.ensure_view(view, header_end, ghost_size).await?;
        let raw = view.slice(header_end, ghost_size)?;
        Ok(GhostOptions::parse(&raw))
    }

    /// Ensures `view` covers `[abs, abs+len)`, refetching a block of at least `max(len,
    /// DEFAULT_READ_SIZE)` bytes starting at `abs` (clamped to the source's size, if known)
    /// otherwise.
    async fn ensure_view(&self, view: &mut ByteView, abs: u64, len: u64) -> Result<()> {
        if view.has_bytes(abs, len) {
            return Ok(());
        }
        let mut read_len = DEFAULT_READ_SIZE.max(len);
        if let Some(size) = self.source.size() {
            read_len = read_len.min(size.saturating_sub(abs));
        }
        let bytes: Bytes = self.source.fetch(abs, read_len).await?;
        *view = ByteView::new(bytes, abs);
        Ok(())
    }

    async fn read_ifd(
        &self,
        view: &mut ByteView,
        config: &IfdConfig,
        offset: u64,
    ) -> Result<(std::collections::HashMap<u16, Tag>, Option<u64>)> {
        // Ensure at least a generous first chunk is resident before we know exactly how large
        // the entry table is; only fetch again if this turns out to be insufficient.
        self.ensure_view(view, offset, 1024u64.min(self.header_size))
            .await?;

        let tag_count = view.read_uint(offset, config.offset)?;
        let entries_start = offset + config.offset as u64;
        let entries_bytes = tag_count * config.ifd as u64;
        let next_ptr_offset = entries_start + entries_bytes;
        let needed = next_ptr_offset + config.pointer as u64 - offset;

        if !view.has_bytes(offset, needed) {
            return Err(CogTiffError::IfdTruncated {
                offset,
                needed,
                available: view.end_offset().saturating_sub(offset),
            });
        }

        let mut tags = std::collections::HashMap::with_capacity(tag_count as usize);
        for i in 0..tag_count {
            let entry_offset = entries_start + i * config.ifd as u64;
            let tag = TagFactory::build(config, view, entry_offset)?;
            // Duplicate ids: last entry in file order wins.
            tags.insert(tag.id(), tag);
        }

        let next_offset = view.read_uint(next_ptr_offset, config.pointer)?;
        let next_offset = if next_offset == 0 {
            None
        } else {
            Some(next_offset)
        };

        Ok((tags, next_offset))
    }
}
