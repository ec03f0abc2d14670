//! GeoKey unpacking: turning the `GeoKeyDirectory` tag's flat `u16` array, plus the
//! `GeoAsciiParams`/`GeoDoubleParams` side tables it references, into a `TiffTagGeo -> GeoValue`
//! map (spec §4.F "GeoKey unpacking").

use std::collections::HashMap;

use crate::error::{CogTiffError, Result};
use crate::tags::{TiffTag, TiffTagGeo};

/// A decoded GeoKey value: either the numeric `valueOrOffset` itself, or a slice pulled out of
/// `GeoAsciiParams`/`GeoDoubleParams`.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoValue {
    Short(u16),
    Double(f64),
    DoubleList(Vec<f64>),
    Ascii(String),
}

impl GeoValue {
    pub fn as_u16(&self) -> Option<u16> {
        match self {
            GeoValue::Short(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            GeoValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            GeoValue::Ascii(s) => Some(s),
            _ => None,
        }
    }
}

/// Parse the `GeoKeyDirectory` tag's raw `u16` array into a keyed map.
///
/// `geo_ascii_params` and `geo_double_params` are the decoded `GeoAsciiParams`/`GeoDoubleParams`
/// tags, if present; a key referencing one that's missing is a [`CogTiffError::GeoKeyMalformed`].
pub fn parse(
    dir: &[u16],
    geo_ascii_params: Option<&str>,
    geo_double_params: Option<&[f64]>,
) -> Result<HashMap<TiffTagGeo, GeoValue>> {
    if dir.len() < 4 {
        return Err(CogTiffError::GeoKeyMalformed(
            "GeoKeyDirectory header is shorter than 4 u16s".into(),
        ));
    }

    let number_of_keys = dir[3] as usize;
    let mut out = HashMap::with_capacity(number_of_keys);

    for i in 0..number_of_keys {
        let base = 4 + i * 4;
        if base + 4 > dir.len() {
            return Err(CogTiffError::GeoKeyMalformed(format!(
                "GeoKeyDirectory declares {number_of_keys} keys but entry {i} is truncated"
            )));
        }
        let key_id = dir[base];
        let tiff_tag_location = dir[base + 1];
        let count = dir[base + 2] as usize;
        let value_or_offset = dir[base + 3] as usize;

        let Some(geo_key) = TiffTagGeo::from_u16(key_id) else {
            // Unrecognized GeoKey ids are simply dropped; the spec's "full registry" note means
            // this crate knows the common ones, not that unknown ids are an error.
            continue;
        };

        let value = if tiff_tag_location == 0 {
            GeoValue::Short(value_or_offset as u16)
        } else if tiff_tag_location == TiffTag::GeoAsciiParams.to_u16() {
            let ascii = geo_ascii_params.ok_or_else(|| {
                CogTiffError::GeoKeyMalformed(format!(
                    "GeoKey {key_id} references GeoAsciiParams but it was not loaded"
                ))
            })?;
            GeoValue::Ascii(slice_ascii(ascii, value_or_offset, count))
        } else if tiff_tag_location == TiffTag::GeoDoubleParams.to_u16() {
            let doubles = geo_double_params.ok_or_else(|| {
                CogTiffError::GeoKeyMalformed(format!(
                    "GeoKey {key_id} references GeoDoubleParams but it was not loaded"
                ))
            })?;
            let end = value_or_offset + count;
            if end > doubles.len() {
                return Err(CogTiffError::GeoKeyMalformed(format!(
                    "GeoKey {key_id} double slice [{value_or_offset}, {end}) out of range"
                )));
            }
            let slice = &doubles[value_or_offset..end];
            if count == 1 {
                GeoValue::Double(slice[0])
            } else {
                GeoValue::DoubleList(slice.to_vec())
            }
        } else {
            return Err(CogTiffError::GeoKeyMalformed(format!(
                "GeoKey {key_id} has unrecognized tiffTagLocation {tiff_tag_location}"
            )));
        };

        out.insert(geo_key, value);
    }

    Ok(out)
}

/// Slice a `count`-byte window out of `GeoAsciiParams` at `offset`, then truncate at the first
/// `|` delimiter found inside it (GeoTIFF terminates each key's string with `|` rather than NUL;
/// trusting `count` alone to land exactly on that terminator is fragile, so this stops at the
/// first one it actually finds). `count == 0` naturally yields an empty string.
fn slice_ascii(ascii: &str, offset: usize, count: usize) -> String {
    let bytes = ascii.as_bytes();
    let start = offset.min(bytes.len());
    let end = (offset + count).min(bytes.len());
    let window = &bytes[start..end];
    let stop = window.iter().position(|&b| b == b'|').unwrap_or(window.len());
    String::from_utf8_lossy(&window[..stop]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_key_read_in_place() {
        // header {1,1,0,1}, then one key {GTRasterTypeGeoKey=1025, loc=0, count=1, value=2}
        let dir = vec![1, 1, 0, 1, 1025, 0, 1, 2];
        let out = parse(&dir, None, None).unwrap();
        assert_eq!(
            out.get(&TiffTagGeo::GTRasterTypeGeoKey).unwrap().as_u16(),
            Some(2)
        );
    }

    #[test]
    fn ascii_key_trims_trailing_pipe() {
        // GTCitationGeoKey (1026) -> GeoAsciiParams, count 11, offset 0
        let dir = vec![1, 1, 0, 1, 1026, 34737, 11, 0];
        let ascii = "WGS 84|foo|";
        let out = parse(&dir, Some(ascii), None).unwrap();
        assert_eq!(
            out.get(&TiffTagGeo::GTCitationGeoKey).unwrap().as_str(),
            Some("WGS 84")
        );
    }

    #[test]
    fn double_key_reads_slice() {
        let dir = vec![1, 1, 0, 1, 2057, 34736, 1, 1];
        let doubles = vec![0.0, 6_378_137.0];
        let out = parse(&dir, None, Some(&doubles)).unwrap();
        assert_eq!(
            out.get(&TiffTagGeo::GeogSemiMajorAxisGeoKey)
                .unwrap()
                .as_f64(),
            Some(6_378_137.0)
        );
    }

    #[test]
    fn missing_ascii_params_is_malformed() {
        let dir = vec![1, 1, 0, 1, 1026, 34737, 11, 0];
        assert!(matches!(
            parse(&dir, None, None),
            Err(CogTiffError::GeoKeyMalformed(_))
        ));
    }

    #[test]
    fn zero_count_ascii_is_empty() {
        let dir = vec![1, 1, 0, 1, 1026, 34737, 0, 0];
        let out = parse(&dir, Some("whatever"), None).unwrap();
        assert_eq!(
            out.get(&TiffTagGeo::GTCitationGeoKey).unwrap().as_str(),
            Some("")
        );
    }
}
