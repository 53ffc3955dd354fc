//! Compact binary tile encoding
//!
//! The blob is a flat run of fixed-size records. Field widths are not
//! hard-coded: the header declares how many bytes each field occupies,
//! and the decoder trusts only those widths. A width of zero means the
//! field was not written and decodes to its default.

use serde::{Deserialize, Serialize};

use crate::battle::battle_map::BattleMap;
use crate::battle::terrain::{PartLayer, PartRef};
use crate::core::error::{BattleError, Result};

/// Field widths (bytes) and record count for a tile blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileCodecHeader {
    pub index_size: u8,
    pub fire_size: u8,
    pub smoke_size: u8,
    pub offset_size: u8,
    pub part_id_size: u8,
    pub part_set_size: u8,
    pub bool_fields_size: u8,
    pub total_tiles: u32,
}

impl Default for TileCodecHeader {
    fn default() -> Self {
        Self {
            index_size: 4,
            fire_size: 1,
            smoke_size: 1,
            offset_size: 1,
            part_id_size: 2,
            part_set_size: 2,
            bool_fields_size: 1,
            total_tiles: 0,
        }
    }
}

impl TileCodecHeader {
    fn widths(&self) -> [(&'static str, u8); 7] {
        [
            ("index", self.index_size),
            ("fire", self.fire_size),
            ("smoke", self.smoke_size),
            ("offset", self.offset_size),
            ("part id", self.part_id_size),
            ("part set", self.part_set_size),
            ("flags", self.bool_fields_size),
        ]
    }

    /// Reject widths the decoder cannot read
    pub fn validate(&self) -> Result<()> {
        for (name, width) in self.widths() {
            if !matches!(width, 0 | 1 | 2 | 4 | 8) {
                return Err(BattleError::InvalidTileHeader(format!(
                    "{} width {} is not 0, 1, 2, 4 or 8",
                    name, width
                )));
            }
        }
        if self.index_size == 0 {
            return Err(BattleError::InvalidTileHeader(
                "index width must not be zero".into(),
            ));
        }
        Ok(())
    }

    /// Bytes per tile record
    pub fn record_size(&self) -> usize {
        self.index_size as usize
            + PartLayer::ALL.len() * (self.part_id_size as usize + self.part_set_size as usize)
            + self.fire_size as usize
            + self.smoke_size as usize
            + self.offset_size as usize
            + self.bool_fields_size as usize
    }
}

fn width_max(width: u8) -> u64 {
    match width {
        0 => 0,
        8 => u64::MAX,
        w => (1u64 << (w as u32 * 8)) - 1,
    }
}

fn write_uint(buf: &mut Vec<u8>, value: u64, width: u8) {
    buf.extend_from_slice(&value.to_le_bytes()[..width as usize]);
}

struct Reader<'a> {
    bytes: &'a [u8],
    cursor: usize,
}

impl<'a> Reader<'a> {
    fn read(&mut self, width: u8) -> u64 {
        let width = width as usize;
        let mut raw = [0u8; 8];
        raw[..width].copy_from_slice(&self.bytes[self.cursor..self.cursor + width]);
        self.cursor += width;
        u64::from_le_bytes(raw)
    }
}

/// Encode every non-default tile of `map` using the default field widths
pub fn encode_tiles(map: &BattleMap) -> Result<(TileCodecHeader, Vec<u8>)> {
    encode_tiles_with(map, TileCodecHeader::default())
}

/// Encode with caller-chosen widths; `total_tiles` is filled in
///
/// A zero-width field is simply left out. Any other value must fit its
/// field; part ids and sets must also stay below the all-ones value,
/// which is reserved for "no part".
pub fn encode_tiles_with(
    map: &BattleMap,
    mut header: TileCodecHeader,
) -> Result<(TileCodecHeader, Vec<u8>)> {
    header.validate()?;
    let mut data = Vec::new();
    let mut total = 0u32;

    for (index, tile) in map.tiles().iter().enumerate() {
        if tile.is_default() {
            continue;
        }
        total += 1;

        let mut put = |field: &'static str, value: u64, width: u8, reserve_top: bool| {
            let limit = width_max(width);
            let fits = width == 0 || value < limit || (!reserve_top && value == limit);
            if !fits {
                return Err(BattleError::TileValueOverflow { index, field, value });
            }
            write_uint(&mut data, value, width);
            Ok(())
        };

        put("index", index as u64, header.index_size, false)?;
        for layer in PartLayer::ALL {
            match tile.part(layer) {
                Some(part) => {
                    put("part id", part.id as u64, header.part_id_size, true)?;
                    put("part set", part.set as u64, header.part_set_size, true)?;
                }
                None => {
                    put("part id", width_max(header.part_id_size), header.part_id_size, false)?;
                    put("part set", width_max(header.part_set_size), header.part_set_size, false)?;
                }
            }
        }
        put("fire", tile.fire as u64, header.fire_size, false)?;
        put("smoke", tile.smoke as u64, header.smoke_size, false)?;
        put("offset", tile.animation_offset as u64, header.offset_size, false)?;
        put("flags", tile.flag_bits() as u64, header.bool_fields_size, false)?;
    }

    header.total_tiles = total;
    Ok((header, data))
}

/// Decode a tile blob into `map`, returning the number of records read
///
/// Tiles not mentioned in the blob are left untouched. Any inconsistency
/// is fatal; partially decoded tiles should be discarded by the caller.
pub fn decode_tiles(map: &mut BattleMap, header: &TileCodecHeader, data: &[u8]) -> Result<usize> {
    header.validate()?;

    let record = header.record_size();
    let expected = record * header.total_tiles as usize;
    if data.len() != expected {
        return Err(BattleError::TruncatedTileData {
            expected,
            actual: data.len(),
        });
    }

    let mut seen = vec![false; map.tile_count()];
    let mut reader = Reader {
        bytes: data,
        cursor: 0,
    };

    for _ in 0..header.total_tiles {
        let raw_index = reader.read(header.index_size);
        let index = usize::try_from(raw_index)
            .ok()
            .filter(|i| *i < map.tile_count())
            .ok_or(BattleError::TileIndexOutOfRange(raw_index))?;
        if std::mem::replace(&mut seen[index], true) {
            return Err(BattleError::InvalidTileHeader(format!(
                "tile index {} appears twice",
                index
            )));
        }

        let mut parts = [None; 4];
        for slot in parts.iter_mut() {
            let id = reader.read(header.part_id_size);
            let set = reader.read(header.part_set_size);
            let absent = header.part_id_size == 0
                || id == width_max(header.part_id_size)
                || (header.part_set_size != 0 && set == width_max(header.part_set_size));
            *slot = (!absent).then(|| PartRef::new(set as u16, id as u16));
        }
        let fire = reader.read(header.fire_size);
        let smoke = reader.read(header.smoke_size);
        let offset = reader.read(header.offset_size);
        let flags = reader.read(header.bool_fields_size);

        if let Some(tile) = map.tile_at_mut(index) {
            tile.parts = parts;
            tile.fire = fire.min(u8::MAX as u64) as u8;
            tile.smoke = smoke.min(u8::MAX as u64) as u8;
            tile.animation_offset = offset.min(u8::MAX as u64) as u8;
            tile.set_flag_bits(flags as u8);
        }
    }

    Ok(header.total_tiles as usize)
}
