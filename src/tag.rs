//! [`Tag`]: the three-way {Inline, Offset, Lazy} sum type, and the [`TagFactory`] that builds one
//! from a raw IFD entry (spec §3 "Tag", §4.C "TagFactory").

use bytes::Bytes;

use crate::byte_view::ByteView;
use crate::error::{CogTiffError, Result};
use crate::ifd_config::IfdConfig;
use crate::tags::{is_offset_array_tag, TagType};
use crate::value::Value;

/// A single IFD entry, classified by where and how its value is stored.
///
/// All three variants share `id`, `data_type`, and `count`; the spec models this as a tagged
/// union with shared + variant-specific fields, which maps directly onto a Rust enum whose
/// variants carry those fields individually (no separate "shared header" struct needed).
#[derive(Debug, Clone)]
pub enum Tag {
    /// The value was small enough to live inside the entry's own value slot; already decoded.
    Inline {
        id: u16,
        data_type: TagType,
        count: u64,
        value: Value,
    },
    /// The value is an array of primitives stored elsewhere, addressed by index (TileOffsets,
    /// TileByteCounts, StripOffsets, StripByteCounts). Not fetched until first use.
    Offset {
        id: u16,
        data_type: TagType,
        count: u64,
        value_offset: u64,
        /// Cached once the whole array has been fetched and decoded.
        loaded: Option<Vec<Value>>,
    },
    /// The value is a single logical blob (string, typed array, struct) stored elsewhere,
    /// fetched once on demand.
    Lazy {
        id: u16,
        data_type: TagType,
        count: u64,
        value_offset: u64,
        /// Cached once fetched and decoded.
        value: Option<Value>,
    },
}

impl Tag {
    pub fn id(&self) -> u16 {
        match self {
            Tag::Inline { id, .. } | Tag::Offset { id, .. } | Tag::Lazy { id, .. } => *id,
        }
    }

    pub fn data_type(&self) -> TagType {
        match self {
            Tag::Inline { data_type, .. }
            | Tag::Offset { data_type, .. }
            | Tag::Lazy { data_type, .. } => *data_type,
        }
    }

    pub fn count(&self) -> u64 {
        match self {
            Tag::Inline { count, .. } | Tag::Offset { count, .. } | Tag::Lazy { count, .. } => {
                *count
            }
        }
    }

    /// Returns the decoded value without triggering I/O: `Some` for `Inline`, or for `Offset`/
    /// `Lazy` tags that have already been fetched once; `None` otherwise.
    pub fn loaded_value(&self) -> Option<Value> {
        match self {
            Tag::Inline { value, .. } => Some(value.clone()),
            Tag::Offset { loaded, .. } => loaded.clone().map(Value::List),
            Tag::Lazy { value, .. } => value.clone(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        match self {
            Tag::Inline { .. } => true,
            Tag::Offset { loaded, .. } => loaded.is_some(),
            Tag::Lazy { value, .. } => value.is_some(),
        }
    }
}

/// Builds [`Tag`]s from raw IFD entries.
pub struct TagFactory;

impl TagFactory {
    /// Parse the entry at absolute offset `entry_offset` (the entry's `Tag` field starts here).
    /// `view` must already cover the full entry (`config.ifd` bytes starting at `entry_offset`).
    pub fn build(config: &IfdConfig, view: &ByteView, entry_offset: u64) -> Result<Tag> {
        let id = view.read_u16(entry_offset)?;
        let data_type_code = view.read_u16(entry_offset + 2)?;
        let pointer_width = config.pointer as u64;
        let count_offset = entry_offset + 4;
        let count = view.read_uint(count_offset, config.pointer)?;
        let value_slot_offset = count_offset + pointer_width;

        let data_type = match TagType::from_u16(data_type_code) {
            Some(t) => t,
            None => {
                // Best-effort: if the value would have fit inline we can still hand back its raw
                // bytes without knowing what they mean; anything living out-of-line is
                // unrecoverable without a known element width.
                let payload_bytes = count; // assume 1-byte elements, the most conservative guess
                if payload_bytes <= pointer_width {
                    let raw = view.slice(value_slot_offset, payload_bytes)?;
                    let value = Value::List(raw.iter().map(|b| Value::Byte(*b)).collect());
                    return Ok(Tag::Inline {
                        id,
                        data_type: TagType::Undefined,
                        count,
                        value,
                    });
                }
                return Err(CogTiffError::UnknownDataType(data_type_code));
            }
        };

        let payload_bytes = count
            .checked_mul(data_type.size())
            .ok_or_else(|| CogTiffError::General("tag payload size overflow".into()))?;

        if payload_bytes <= pointer_width {
            let value = decode_value(view, value_slot_offset, data_type, count)?;
            return Ok(Tag::Inline {
                id,
                data_type,
                count,
                value,
            });
        }

        let value_offset = view.read_uint(value_slot_offset, config.pointer)?;
        if let Some(tag) = crate::tags::TiffTag::from_u16(id) {
            if is_offset_array_tag(tag) {
                return Ok(Tag::Offset {
                    id,
                    data_type,
                    count,
                    value_offset,
                    loaded: None,
                });
            }
        }

        Ok(Tag::Lazy {
            id,
            data_type,
            count,
            value_offset,
            value: None,
        })
    }
}

/// Decode `count` elements of `data_type` starting at the absolute offset `base`, reading from
/// `view`. Used both for inline values (the value slot *is* `view`) and, by [`crate::image`],
/// once a `Lazy`/`Offset` tag's backing bytes have been fetched into a fresh `ByteView`.
pub(crate) fn decode_value(
    view: &ByteView,
    base: u64,
    data_type: TagType,
    count: u64,
) -> Result<Value> {
    if count == 0 {
        return Ok(Value::List(vec![]));
    }

    if data_type == TagType::Ascii {
        let raw = view.slice(base, count)?;
        return Ok(Value::Ascii(trim_ascii(&raw)));
    }

    if count == 1 {
        return decode_scalar(view, base, data_type);
    }

    let elem_size = data_type.size();
    let mut out = Vec::with_capacity(count as usize);
    for i in 0..count {
        out.push(decode_scalar(view, base + i * elem_size, data_type)?);
    }
    Ok(Value::List(out))
}

fn decode_scalar(view: &ByteView, at: u64, data_type: TagType) -> Result<Value> {
    Ok(match data_type {
        TagType::Byte | TagType::Undefined => Value::Byte(view.read_u8(at)?),
        TagType::SByte => Value::Signed(view.read_i8(at)? as i32),
        TagType::Short => Value::Short(view.read_u16(at)?),
        TagType::SShort => Value::Signed(view.read_i16(at)? as i32),
        TagType::Long | TagType::Ifd => Value::Unsigned(view.read_u32(at)?),
        TagType::SLong => Value::Signed(view.read_i32(at)?),
        TagType::Float => Value::Float(view.read_f32(at)?),
        TagType::Double => Value::Double(view.read_f64(at)?),
        TagType::Rational => Value::Rational(view.read_u32(at)?, view.read_u32(at + 4)?),
        TagType::SRational => Value::SRational(view.read_i32(at)?, view.read_i32(at + 4)?),
        TagType::Long8 | TagType::IfdLong8 => Value::UnsignedBig(view.read_u64(at)?),
        TagType::SLong8 => Value::SignedBig(view.read_i64(at)?),
        TagType::Ascii => unreachable!("handled by caller"),
    })
}

fn trim_ascii(raw: &Bytes) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}
