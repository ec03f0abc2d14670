//! TIFF tag, GeoKey, and enumerated-value definitions.
//!
//! The `tags!` macro generates a closed enum with an `Unknown(u16)` fallback for the handful of
//! id spaces this crate cares about: ordinary TIFF/BigTIFF tags, GeoKeys (a *different* id space
//! that happens to reuse 16-bit codes), and a few small value enumerations (compression method,
//! photometric interpretation, sample format, ...) used when decoding an `Inline` tag's value.

#![allow(missing_docs)]

macro_rules! tags {
    {
        $( #[$enum_attr:meta] )*
        $vis:vis enum $name:ident($ty:tt) $(unknown($unknown_doc:literal))* {
            $($(#[$ident_attr:meta])* $tag:ident = $val:expr,)*
        }
    } => {
        $( #[$enum_attr] )*
        #[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
        #[non_exhaustive]
        $vis enum $name {
            $($(#[$ident_attr])* $tag,)*
            $(
                #[doc = $unknown_doc]
                Unknown($ty),
            )*
        }

        impl $name {
            #[inline(always)]
            fn __from_inner(n: $ty) -> Result<Self, $ty> {
                match n {
                    $( $val => Ok($name::$tag), )*
                    n => Err(n),
                }
            }

            #[inline(always)]
            fn __to_inner(&self) -> $ty {
                match *self {
                    $( $name::$tag => $val, )*
                    $( $name::Unknown(n) => { $unknown_doc; n }, )*
                }
            }

            /// Construct from a raw numeric id, returning `None` if it is not recognized.
            #[inline(always)]
            pub fn from_u16(val: u16) -> Option<Self> {
                Self::__from_inner(val).ok()
            }

            $(
            /// Construct from a raw numeric id, falling back to `Unknown` rather than `None`.
            #[inline(always)]
            pub fn from_u16_exhaustive(val: u16) -> Self {
                $unknown_doc;
                Self::__from_inner(val).unwrap_or_else(|_| $name::Unknown(val))
            }
            )*

            /// Convert back to the raw numeric id.
            #[inline(always)]
            pub fn to_u16(self) -> u16 {
                Self::__to_inner(&self)
            }
        }
    };
}

tags! {
/// A 16-bit TIFF/BigTIFF tag identifier.
///
/// Covers the baseline TIFF 6.0 tags, the GeoTIFF extension tags, and GDAL's private tags.
/// Unrecognized ids still round-trip via `Unknown`, since a TagFactory must classify *every*
/// entry, not just the ones this crate names.
pub enum TiffTag(u16) unknown("a private or unrecognized tag") {
    NewSubfileType = 254,
    SubfileType = 255,
    ImageWidth = 256,
    ImageLength = 257,
    BitsPerSample = 258,
    Compression = 259,
    PhotometricInterpretation = 262,
    Threshholding = 263,
    CellWidth = 264,
    CellLength = 265,
    FillOrder = 266,
    ImageDescription = 270,
    Make = 271,
    Model = 272,
    StripOffsets = 273,
    Orientation = 274,
    SamplesPerPixel = 277,
    RowsPerStrip = 278,
    StripByteCounts = 279,
    MinSampleValue = 280,
    MaxSampleValue = 281,
    XResolution = 282,
    YResolution = 283,
    PlanarConfiguration = 284,
    FreeOffsets = 288,
    FreeByteCounts = 289,
    GrayResponseUnit = 290,
    GrayResponseCurve = 291,
    ResolutionUnit = 296,
    Software = 305,
    DateTime = 306,
    Artist = 315,
    HostComputer = 316,
    Predictor = 317,
    ColorMap = 320,
    TileWidth = 322,
    TileLength = 323,
    TileOffsets = 324,
    TileByteCounts = 325,
    ExtraSamples = 338,
    SampleFormat = 339,
    SMinSampleValue = 340,
    SMaxSampleValue = 341,
    JPEGTables = 347,
    Copyright = 33_432,
    // GeoTIFF
    ModelPixelScale = 33_550,
    ModelTiePoint = 33_922,
    ModelTransformation = 34_264,
    GeoKeyDirectory = 34_735,
    GeoDoubleParams = 34_736,
    GeoAsciiParams = 34_737,
    // GDAL private tags
    GdalMetadata = 42_112,
    GdalNoData = 42_113,
}
}

tags! {
/// The data type code of an IFD entry (a 2-byte field).
pub enum TagType(u16) {
    Byte = 1,
    Ascii = 2,
    Short = 3,
    Long = 4,
    Rational = 5,
    SByte = 6,
    Undefined = 7,
    SShort = 8,
    SLong = 9,
    SRational = 10,
    Float = 11,
    Double = 12,
    Ifd = 13,
    // BigTIFF additions
    Long8 = 16,
    SLong8 = 17,
    IfdLong8 = 18,
}
}

impl TagType {
    /// Byte width of a single element of this type.
    pub fn size(self) -> u64 {
        match self {
            TagType::Byte | TagType::SByte | TagType::Ascii | TagType::Undefined => 1,
            TagType::Short | TagType::SShort => 2,
            TagType::Long | TagType::SLong | TagType::Float | TagType::Ifd => 4,
            TagType::Rational | TagType::SRational => 8,
            TagType::Double => 8,
            TagType::Long8 | TagType::SLong8 | TagType::IfdLong8 => 8,
        }
    }
}

tags! {
/// Known TIFF compression methods (the `Compression` tag's value).
pub enum CompressionMethod(u16) unknown("a private or extension compression method") {
    None = 1,
    Huffman = 2,
    Fax3 = 3,
    Fax4 = 4,
    Lzw = 5,
    OldJpeg = 6,
    /// Tiles omit SOI/quant tables, spliced back on via `JPEGTables` (see
    /// `crate::image::Image::get_tile`).
    ModernJpeg = 7,
    Deflate = 8,
    OldDeflate = 0x80B2,
    PackBits = 0x8005,
    WebP = 50_001,
}
}

tags! {
/// The color space of the image data (the `PhotometricInterpretation` tag's value).
pub enum PhotometricInterpretation(u16) {
    WhiteIsZero = 0,
    BlackIsZero = 1,
    Rgb = 2,
    RgbPalette = 3,
    TransparencyMask = 4,
    Cmyk = 5,
    YCbCr = 6,
    CieLab = 8,
}
}

tags! {
/// The format of sample values (the `SampleFormat` tag's value).
pub enum SampleFormat(u16) unknown("an unknown extension sample format") {
    Uint = 1,
    Int = 2,
    Float = 3,
    Void = 4,
}
}

tags! {
/// A 16-bit GeoKey identifier, stored inside the GeoKeyDirectory sub-directory.
///
/// GeoKeys occupy their own id space distinct from ordinary TIFF tags, even though both are
/// encoded as `u16` — see spec §4.F.
pub enum TiffTagGeo(u16) unknown("a private or unrecognized GeoKey") {
    GTModelTypeGeoKey = 1024,
    GTRasterTypeGeoKey = 1025,
    GTCitationGeoKey = 1026,

    GeographicTypeGeoKey = 2048,
    GeogCitationGeoKey = 2049,
    GeogGeodeticDatumGeoKey = 2050,
    GeogPrimeMeridianGeoKey = 2051,
    GeogLinearUnitsGeoKey = 2052,
    GeogLinearUnitSizeGeoKey = 2053,
    GeogAngularUnitsGeoKey = 2054,
    GeogAngularUnitSizeGeoKey = 2055,
    GeogEllipsoidGeoKey = 2056,
    GeogSemiMajorAxisGeoKey = 2057,
    GeogSemiMinorAxisGeoKey = 2058,
    GeogInvFlatteningGeoKey = 2059,
    GeogAzimuthUnitsGeoKey = 2060,
    GeogPrimeMeridianLongGeoKey = 2061,

    ProjectedCSTypeGeoKey = 3072,
    PCSCitationGeoKey = 3073,
    ProjectionGeoKey = 3074,
    ProjCoordTransGeoKey = 3075,
    ProjLinearUnitsGeoKey = 3076,
    ProjLinearUnitSizeGeoKey = 3077,
    ProjStdParallel1GeoKey = 3078,
    ProjStdParallel2GeoKey = 3079,
    ProjNatOriginLongGeoKey = 3080,
    ProjNatOriginLatGeoKey = 3081,
    ProjFalseEastingGeoKey = 3082,
    ProjFalseNorthingGeoKey = 3083,
    ProjFalseOriginLongGeoKey = 3084,
    ProjFalseOriginLatGeoKey = 3085,
    ProjFalseOriginEastingGeoKey = 3086,
    ProjFalseOriginNorthingGeoKey = 3087,
    ProjCenterLongGeoKey = 3088,
    ProjCenterLatGeoKey = 3089,
    ProjCenterEastingGeoKey = 3090,
    ProjCenterNorthingGeoKey = 3091,
    ProjScaleAtNatOriginGeoKey = 3092,
    ProjScaleAtCenterGeoKey = 3093,
    ProjAzimuthAngleGeoKey = 3094,
    ProjStraightVertPoleLongGeoKey = 3095,

    VerticalGeoKey = 4096,
    VerticalCitationGeoKey = 4097,
    VerticalDatumGeoKey = 4098,
    VerticalUnitsGeoKey = 4099,
}
}

/// Tag ids whose values are arrays of primitives indexed by tile/strip number, rather than a
/// single logical blob. The TagFactory (spec §4.C) uses this to distinguish `Offset` tags from
/// `Lazy` tags once a value doesn't fit inline.
pub fn is_offset_array_tag(tag: TiffTag) -> bool {
    matches!(
        tag,
        TiffTag::TileOffsets
            | TiffTag::TileByteCounts
            | TiffTag::StripOffsets
            | TiffTag::StripByteCounts
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_round_trips() {
        assert_eq!(TiffTag::from_u16(256), Some(TiffTag::ImageWidth));
        assert_eq!(TiffTag::ImageWidth.to_u16(), 256);
        assert_eq!(TiffTag::from_u16(0xBEEF), None);
        assert_eq!(
            TiffTag::from_u16_exhaustive(0xBEEF),
            TiffTag::Unknown(0xBEEF)
        );
    }

    #[test]
    fn type_sizes() {
        assert_eq!(TagType::Byte.size(), 1);
        assert_eq!(TagType::Short.size(), 2);
        assert_eq!(TagType::Long.size(), 4);
        assert_eq!(TagType::Double.size(), 8);
        assert_eq!(TagType::Long8.size(), 8);
    }

    #[test]
    fn offset_array_tags() {
        assert!(is_offset_array_tag(TiffTag::TileOffsets));
        assert!(is_offset_array_tag(TiffTag::StripByteCounts));
        assert!(!is_offset_array_tag(TiffTag::ImageWidth));
    }

    #[test]
    fn geo_key_round_trips() {
        assert_eq!(
            TiffTagGeo::from_u16(3072),
            Some(TiffTagGeo::ProjectedCSTypeGeoKey)
        );
        assert_eq!(
            TiffTagGeo::from_u16_exhaustive(9999),
            TiffTagGeo::Unknown(9999)
        );
    }
}
