//! The byte-range [`Source`] abstraction.
//!
//! Everything in this module is a thin adapter: the parser never knows whether bytes came from
//! an HTTP range request, an object store, or a `Vec<u8>` sitting in RAM. `fetch` is the only
//! I/O boundary the rest of the crate crosses.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::path::Path;
use object_store::ObjectStore;

use crate::error::{CogTiffError, Result};

/// A byte-addressable, randomly-readable handle to a TIFF file.
///
/// Implementations must tolerate concurrent calls to `fetch`: the reader issues parallel fetches
/// across images once header parsing completes, and offset/lazy tags may race if several callers
/// touch the same tag before it's loaded.
#[async_trait]
pub trait Source: Send + Sync {
    /// Fetch `length` bytes starting at `offset`.
    ///
    /// The returned buffer's length may be less than `length` if the source ran out of bytes;
    /// callers that need an exact length (tile/strip bodies) check this themselves and return
    /// [`CogTiffError::ShortRead`](crate::error::CogTiffError::ShortRead).
    async fn fetch(&self, offset: u64, length: u64) -> Result<Bytes>;

    /// The total size of the underlying file, if known up front.
    fn size(&self) -> Option<u64> {
        None
    }
}

/// A [`Source`] backed by any [`ObjectStore`] implementation (local filesystem, HTTP, S3, GCS,
/// in-memory, ...).
pub struct ObjectStoreSource {
    store: Arc<dyn ObjectStore>,
    path: Path,
    size: Option<u64>,
}

impl ObjectStoreSource {
    /// Wrap a store + path as a [`Source`]. Does not perform any I/O; pass `size` if the caller
    /// already knows it (e.g. from a directory listing) to avoid a HEAD request.
    pub fn new(store: Arc<dyn ObjectStore>, path: Path, size: Option<u64>) -> Self {
        Self { store, path, size }
    }
}

#[async_trait]
impl Source for ObjectStoreSource {
    async fn fetch(&self, offset: u64, length: u64) -> Result<Bytes> {
        let range = offset as usize..(offset + length) as usize;
        tracing::debug!(offset, length, path = %self.path, "fetching byte range");
        let bytes = self.store.get_range(&self.path, range).await?;
        Ok(bytes)
    }

    fn size(&self) -> Option<u64> {
        self.size
    }
}

/// A [`Source`] backed by an in-memory buffer.
///
/// Useful for embedders who already hold the whole (typically small) file in RAM, and for tests
/// that build synthetic TIFF bytes by hand.
pub struct MemorySource {
    bytes: Bytes,
}

impl MemorySource {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }
}

#[async_trait]
impl Source for MemorySource {
    async fn fetch(&self, offset: u64, length: u64) -> Result<Bytes> {
        let start = offset as usize;
        let total = self.bytes.len();
        if start > total {
            return Err(CogTiffError::ShortRead {
                offset,
                expected: length,
                actual: 0,
            });
        }
        let end = total.min(start + length as usize);
        Ok(self.bytes.slice(start..end))
    }

    fn size(&self) -> Option<u64> {
        Some(self.bytes.len() as u64)
    }
}
