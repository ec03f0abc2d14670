//! Lazy, random-access parser and tile-serving engine for Cloud Optimized GeoTIFF (COG) files.
//!
//! [`TiffReader::open`] parses a header and IFD chain over any byte-range [`Source`], building an
//! [`Image`] per IFD. Tags are classified and fetched lazily: only the baseline tag set is
//! fetched during `init()`, and tile/strip bodies aren't touched until
//! [`Image::get_tile`]/[`Image::get_strip`] is actually called.

pub mod byte_view;
pub mod error;
pub mod geo_key_directory;
pub mod ghost_options;
pub mod ifd_config;
pub mod image;
pub mod reader;
pub mod source;
pub mod tag;
pub mod tags;
pub mod value;

pub use error::{CogTiffError, Result};
pub use geo_key_directory::GeoValue;
pub use ghost_options::{GhostOptions, GhostValue};
pub use ifd_config::{IfdConfig, TiffVersion};
pub use image::Image;
pub use reader::{ReaderOptions, TiffReader};
pub use source::{MemorySource, ObjectStoreSource, Source};
pub use tags::{CompressionMethod, PhotometricInterpretation, SampleFormat, TiffTag, TiffTagGeo};
pub use value::Value;
