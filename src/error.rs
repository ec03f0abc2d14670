//! Crate-wide error type.

use thiserror::Error;

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, CogTiffError>;

/// Errors produced while parsing a TIFF/BigTIFF container or serving tiles from it.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CogTiffError {
    /// The byte-order mark was `MM` (big-endian). Only little-endian files are supported.
    #[error("unsupported endianness: file is big-endian")]
    UnsupportedEndian,

    /// The version word was neither 42 (Classic) nor 43 (BigTIFF).
    #[error("unsupported TIFF version word: {0}")]
    UnsupportedVersion(u16),

    /// BigTIFF pointer size was not 8, or the reserved word after it was not 0.
    #[error("unsupported BigTIFF pointer size or malformed reserved word")]
    UnsupportedPointerSize,

    /// An IFD's entry table extends past the currently loaded byte range.
    #[error("IFD at offset {offset} is truncated: need {needed} bytes, have {available}")]
    IfdTruncated {
        offset: u64,
        needed: u64,
        available: u64,
    },

    /// A tag's data type code did not match any known TIFF/BigTIFF type.
    #[error("unknown tag data type code: {0}")]
    UnknownDataType(u16),

    /// The source returned fewer bytes than requested for a tile/strip body.
    #[error("short read at offset {offset}: expected {expected} bytes, got {actual}")]
    ShortRead {
        offset: u64,
        expected: u64,
        actual: u64,
    },

    /// A tile/strip index was outside the bounds of the image.
    #[error("index out of bounds: {index} (max {max})")]
    IndexOutOfBounds { index: u64, max: u64 },

    /// Origin/resolution were requested but no ModelTiePoint/ModelTransformation/ModelPixelScale
    /// tag is present.
    #[error("no geo transform available on this image")]
    NoGeoTransform,

    /// `value_geo` was called before `load_geo_tiff_tags`.
    #[error("GeoKey directory has not been loaded yet")]
    GeoNotLoaded,

    /// The GeoKeyDirectory pointed at a tag whose type didn't match the expected GeoAsciiParams
    /// or GeoDoubleParams shape.
    #[error("malformed GeoKey entry: {0}")]
    GeoKeyMalformed(String),

    /// A tile was requested but `Compression` is absent or not a recognized codec.
    #[error("unsupported or missing compression tag: {0:?}")]
    UnsupportedCompression(Option<u16>),

    /// A required baseline tag was missing from an IFD.
    #[error("required tag missing from IFD: {0}")]
    RequiredTagMissing(&'static str),

    /// Catch-all for malformed input that doesn't deserve its own variant.
    #[error("{0}")]
    General(String),

    #[error(transparent)]
    Source(#[from] object_store::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
