//! `morx` (Extended Glyph Metamorphosis) table.
//!
//! Parses the chain/subtable envelope only: each subtable's body is handed
//! to [`crate::shape::morx_runner`] as raw bytes, since the five subtable
//! kinds (rearrangement/contextual/ligature/non-contextual/insertion) share
//! an extended-state-table header but diverge entirely in per-entry payload
//! layout and are cheaper to parse once, lazily, at the point they actually
//! run.

use crate::error::FontParseError;
use crate::reader::Reader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorxSubtableKind {
    Rearrangement,
    Contextual,
    Ligature,
    NonContextual,
    Insertion,
}

impl MorxSubtableKind {
    fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Rearrangement),
            1 => Some(Self::Contextual),
            2 => Some(Self::Ligature),
            4 => Some(Self::NonContextual),
            5 => Some(Self::Insertion),
            _ => None,
        }
    }
}

pub struct MorxSubtable<'a> {
    pub kind: MorxSubtableKind,
    /// Coverage byte: bit 0x20 vertical, 0x80 logical-order/reversed
    /// processing direction, per the AAT spec.
    pub coverage: u8,
    pub sub_feature_flags: u32,
    /// Subtable body immediately after the 12-byte common header.
    pub body: &'a [u8],
}

pub struct MorxChain<'a> {
    pub default_flags: u32,
    pub subtables: Vec<MorxSubtable<'a>>,
}

pub struct MorxTable<'a> {
    pub chains: Vec<MorxChain<'a>>,
}

impl<'a> MorxTable<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self, FontParseError> {
        let mut r = Reader::new(data, "morx");
        let version = r.read_u16()?;
        let _unused = r.read_u16()?;
        if version != 2 && version != 3 {
            return Err(FontParseError::UnsupportedFormat { table: "morx", format: version });
        }
        let chain_count = r.read_u32()?;

        let mut chains = Vec::with_capacity(chain_count as usize);
        for _ in 0..chain_count {
            let chain_start = r.pos();
            let default_flags = r.read_u32()?;
            let chain_length = r.read_u32()? as usize;
            let n_feature_entries = r.read_u32()?;
            let n_subtables = r.read_u32()?;

            r.skip(n_feature_entries as usize * 12)?; // feature subtable entries, not consumed

            let mut subtables = Vec::with_capacity(n_subtables as usize);
            for _ in 0..n_subtables {
                let subtable_start = r.pos();
                let length = r.read_u32()? as usize;
                let coverage_word = r.read_u32()?;
                let sub_feature_flags = r.read_u32()?;
                let coverage = (coverage_word >> 24) as u8;
                let subtable_type = (coverage_word & 0xFF) as u8;
                let kind = MorxSubtableKind::from_u8(subtable_type)
                    .ok_or(FontParseError::UnsupportedFormat { table: "morx", format: subtable_type as u16 })?;
                let body_len = length.saturating_sub(12);
                let body = r.read_bytes(body_len)?;
                subtables.push(MorxSubtable { kind, coverage, sub_feature_flags, body });
                r.set_pos(subtable_start + length);
            }

            chains.push(MorxChain { default_flags, subtables });
            r.set_pos(chain_start + chain_length);
        }

        Ok(MorxTable { chains })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_empty_non_contextual_chain() {
        let mut data = Vec::new();
        data.extend_from_slice(&2u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&1u32.to_be_bytes()); // chain count

        let chain_length = 16u32 + 12; // header + one subtable header, zero body
        data.extend_from_slice(&0x00000001u32.to_be_bytes()); // default flags
        data.extend_from_slice(&chain_length.to_be_bytes());
        data.extend_from_slice(&0u32.to_be_bytes()); // n feature entries
        data.extend_from_slice(&1u32.to_be_bytes()); // n subtables

        data.extend_from_slice(&12u32.to_be_bytes()); // subtable length (header only)
        data.extend_from_slice(&0x00000004u32.to_be_bytes()); // coverage=0, type=4 (non-contextual)
        data.extend_from_slice(&0x00000001u32.to_be_bytes()); // sub feature flags

        let morx = MorxTable::parse(&data).unwrap();
        assert_eq!(morx.chains.len(), 1);
        assert_eq!(morx.chains[0].subtables.len(), 1);
        assert_eq!(morx.chains[0].subtables[0].kind, MorxSubtableKind::NonContextual);
    }
}
