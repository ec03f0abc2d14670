//! [`GhostOptions`]: GDAL's optional key/value metadata block sitting between the TIFF header
//! and the first IFD (spec §3 "GhostOptions", §4.D).

use std::collections::HashMap;

/// Maximum size of the ghost block this crate will attempt to parse. GDAL documents this block
/// as always well under this size; anything larger is treated as "no ghost block" rather than a
/// parse target, since it would mean `ghostSize` was computed from something other than a real
/// ghost header (e.g. the first IFD sits immediately after the pointer with no gap at all).
pub const GHOST_SIZE_LIMIT: u64 = 16_384;

/// One parsed value from the ghost block: an integer if the text coerces cleanly, otherwise the
/// raw string.
#[derive(Debug, Clone, PartialEq)]
pub enum GhostValue {
    Int(i64),
    Str(String),
}

impl GhostValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            GhostValue::Int(v) => Some(*v),
            GhostValue::Str(_) => None,
        }
    }
}

/// GDAL's `KEY=VALUE`-per-line structural metadata block.
#[derive(Debug, Clone, Default)]
pub struct GhostOptions {
    entries: HashMap<String, GhostValue>,
}

impl GhostOptions {
    /// Parse the block iff `0 < ghost_bytes.len() < GHOST_SIZE_LIMIT`. Returns `None` otherwise
    /// (spec: "Iff `0 < ghostSize < 16384`, parse").
    pub fn parse(ghost_bytes: &[u8]) -> Option<Self> {
        if ghost_bytes.is_empty() || ghost_bytes.len() as u64 >= GHOST_SIZE_LIMIT {
            return None;
        }

        let text = String::from_utf8_lossy(ghost_bytes);
        let mut entries = HashMap::new();
        for line in text.split('\n') {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim().to_string();
            let value = value.trim();
            let parsed = match value.parse::<i64>() {
                Ok(n) => GhostValue::Int(n),
                Err(_) => GhostValue::Str(value.to_string()),
            };
            entries.insert(key, parsed);
        }

        Some(Self { entries })
    }

    /// Raw lookup, for keys this crate doesn't name explicitly.
    pub fn get(&self, key: &str) -> Option<&GhostValue> {
        self.entries.get(key)
    }

    /// The tile-leader byte width advertised by `BLOCK_LEADER_SIZE_AS_UINT4`, if present.
    ///
    /// When set, [`crate::image::Image::get_tile_size`] can recover a tile's compressed length
    /// from a tiny read immediately preceding the tile body instead of dereferencing the full
    /// `TileByteCounts` array — the whole point of the ghost-header optimization.
    pub fn tile_leader_byte_size(&self) -> Option<u32> {
        self.entries
            .get("BLOCK_LEADER_SIZE_AS_UINT4")
            .and_then(GhostValue::as_i64)
            .and_then(|n| u32::try_from(n).ok())
    }
}
