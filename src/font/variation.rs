//! Variable-font tables: `fvar`/`avar` (axis model), `HVAR` (horizontal
//! metric deltas, consumed by shaping), `gvar` (outline deltas, parsed
//! structurally only — this engine never rasterizes so it has no use for
//! the point deltas themselves), and `MATH` (parsed structurally, not yet
//! consumed by any operation).

use crate::error::FontParseError;
use crate::fixed_point::Fixed16;
use crate::reader::Reader;
use crate::tag::Tag;

#[derive(Debug, Clone, Copy)]
pub struct VariationAxis {
    pub tag: Tag,
    pub min_value: Fixed16,
    pub default_value: Fixed16,
    pub max_value: Fixed16,
    pub flags: u16,
}

pub struct FvarTable {
    pub axes: Vec<VariationAxis>,
    pub instances: Vec<Vec<Fixed16>>,
}

impl FvarTable {
    pub fn parse(data: &[u8]) -> Result<Self, FontParseError> {
        let mut r = Reader::new(data, "fvar");
        let _major = r.read_u16()?;
        let _minor = r.read_u16()?;
        let axes_array_offset = r.read_u16()?;
        let _reserved = r.read_u16()?;
        let axis_count = r.read_u16()? as usize;
        let axis_size = r.read_u16()? as usize;
        let instance_count = r.read_u16()? as usize;
        let instance_size = r.read_u16()? as usize;

        let mut axes = Vec::with_capacity(axis_count);
        let mut ar = r.slice_from(axes_array_offset as usize)?;
        for i in 0..axis_count {
            ar.set_pos(i * axis_size);
            let tag = Tag::new(ar.read_tag()?);
            let min_value = Fixed16::from_i32(ar.read_i32()?);
            let default_value = Fixed16::from_i32(ar.read_i32()?);
            let max_value = Fixed16::from_i32(ar.read_i32()?);
            let flags = ar.read_u16()?;
            axes.push(VariationAxis { tag, min_value, default_value, max_value, flags });
        }

        let instances_start = axes_array_offset as usize + axis_count * axis_size;
        let mut ir = r.slice_from(instances_start)?;
        let mut instances = Vec::with_capacity(instance_count);
        for i in 0..instance_count {
            ir.set_pos(i * instance_size);
            let _subfamily_name_id = ir.read_u16()?;
            let _flags = ir.read_u16()?;
            let mut coords = Vec::with_capacity(axis_count);
            for _ in 0..axis_count {
                coords.push(Fixed16::from_i32(ir.read_i32()?));
            }
            instances.push(coords);
        }

        Ok(FvarTable { axes, instances })
    }

    pub fn normalize(&self, axis_index: usize, user_value: f32) -> f32 {
        let Some(axis) = self.axes.get(axis_index) else { return 0.0 };
        let (min, default, max) =
            (axis.min_value.to_f32(), axis.default_value.to_f32(), axis.max_value.to_f32());
        if user_value < default {
            if min == default {
                return 0.0;
            }
            ((user_value - default) / (default - min)).max(-1.0)
        } else if user_value > default {
            if max == default {
                return 0.0;
            }
            ((user_value - default) / (max - default)).min(1.0)
        } else {
            0.0
        }
    }
}

struct AxisValueMap {
    from_coord: f32,
    to_coord: f32,
}

pub struct AvarTable {
    segment_maps: Vec<Vec<AxisValueMap>>,
}

impl AvarTable {
    pub fn parse(data: &[u8]) -> Result<Self, FontParseError> {
        let mut r = Reader::new(data, "avar");
        let _major = r.read_u16()?;
        let _minor = r.read_u16()?;
        let _reserved = r.read_u16()?;
        let axis_count = r.read_u16()? as usize;
        let mut segment_maps = Vec::with_capacity(axis_count);
        for _ in 0..axis_count {
            let pair_count = r.read_u16()? as usize;
            let mut maps = Vec::with_capacity(pair_count);
            for _ in 0..pair_count {
                maps.push(AxisValueMap { from_coord: r.read_f2dot14()?, to_coord: r.read_f2dot14()? });
            }
            segment_maps.push(maps);
        }
        Ok(AvarTable { segment_maps })
    }

    /// Piecewise-linear remap of a normalized (-1..1) coordinate for one axis.
    pub fn remap(&self, axis_index: usize, normalized: f32) -> f32 {
        let Some(maps) = self.segment_maps.get(axis_index) else { return normalized };
        if maps.is_empty() {
            return normalized;
        }
        for w in maps.windows(2) {
            let (a, b) = (&w[0], &w[1]);
            if normalized >= a.from_coord && normalized <= b.from_coord {
                if b.from_coord == a.from_coord {
                    return a.to_coord;
                }
                let t = (normalized - a.from_coord) / (b.from_coord - a.from_coord);
                return a.to_coord + t * (b.to_coord - a.to_coord);
            }
        }
        normalized
    }
}

struct VariationRegion {
    /// Per-axis (start, peak, end) in normalized coordinates.
    axes: Vec<(f32, f32, f32)>,
}

impl VariationRegion {
    fn scalar(&self, coords: &[f32]) -> f32 {
        let mut scalar = 1.0f32;
        for (axis, &(start, peak, end)) in self.axes.iter().enumerate() {
            let v = coords.get(axis).copied().unwrap_or(0.0);
            let factor = if peak == 0.0 {
                1.0
            } else if v < start || v > end {
                0.0
            } else if v < peak {
                if peak == start { 1.0 } else { (v - start) / (peak - start) }
            } else if v > peak {
                if peak == end { 1.0 } else { (end - v) / (end - peak) }
            } else {
                1.0
            };
            scalar *= factor;
        }
        scalar
    }
}

struct ItemVariationData {
    region_indices: Vec<u16>,
    /// One row of deltas (one per region index) per item.
    delta_rows: Vec<Vec<i32>>,
}

struct ItemVariationStore {
    regions: Vec<VariationRegion>,
    data: Vec<ItemVariationData>,
}

impl ItemVariationStore {
    fn parse(r: &Reader) -> Result<Self, FontParseError> {
        let mut r = r.slice_from(0)?;
        let _format = r.read_u16()?;
        let region_list_offset = r.read_u32()? as usize;
        let item_count = r.read_u16()? as usize;
        let mut data_offsets = Vec::with_capacity(item_count);
        for _ in 0..item_count {
            data_offsets.push(r.read_u32()? as usize);
        }

        let mut rr = r.slice_from(region_list_offset)?;
        let axis_count = rr.read_u16()? as usize;
        let region_count = rr.read_u16()? as usize;
        let mut regions = Vec::with_capacity(region_count);
        for _ in 0..region_count {
            let mut axes = Vec::with_capacity(axis_count);
            for _ in 0..axis_count {
                axes.push((rr.read_f2dot14()?, rr.read_f2dot14()?, rr.read_f2dot14()?));
            }
            regions.push(VariationRegion { axes });
        }

        let mut data = Vec::with_capacity(item_count);
        for offset in data_offsets {
            let mut dr = r.slice_from(offset)?;
            let item_count_in_data = dr.read_u16()? as usize;
            let short_delta_count = dr.read_u16()? as usize;
            let region_index_count = dr.read_u16()? as usize;
            let mut region_indices = Vec::with_capacity(region_index_count);
            for _ in 0..region_index_count {
                region_indices.push(dr.read_u16()?);
            }
            let mut delta_rows = Vec::with_capacity(item_count_in_data);
            for _ in 0..item_count_in_data {
                let mut row = Vec::with_capacity(region_index_count);
                for i in 0..region_index_count {
                    row.push(if i < short_delta_count { dr.read_i16()? as i32 } else { dr.read_i8()? as i32 });
                }
                delta_rows.push(row);
            }
            data.push(ItemVariationData { region_indices, delta_rows });
        }

        Ok(ItemVariationStore { regions, data })
    }

    fn delta(&self, outer: u16, inner: u16, coords: &[f32]) -> f32 {
        let Some(data) = self.data.get(outer as usize) else { return 0.0 };
        let Some(row) = data.delta_rows.get(inner as usize) else { return 0.0 };
        let mut total = 0.0f32;
        for (&region_idx, &delta) in data.region_indices.iter().zip(row.iter()) {
            if let Some(region) = self.regions.get(region_idx as usize) {
                total += region.scalar(coords) * delta as f32;
            }
        }
        total
    }
}

/// `HVAR`: per-glyph horizontal advance-width deltas.
pub struct HvarTable {
    store: ItemVariationStore,
    delta_set_index_map: Option<DeltaSetIndexMap>,
}

struct DeltaSetIndexMap {
    entries: Vec<(u16, u16)>, // (outer, inner)
}

impl DeltaSetIndexMap {
    fn parse(r: &Reader) -> Result<Self, FontParseError> {
        let mut r = r.slice_from(0)?;
        let format = r.read_u8()?;
        let entry_format = r.read_u8()?;
        let map_count = if format == 0 { r.read_u16()? as u32 } else { r.read_u32()? };
        let entry_size = ((entry_format >> 4) & 0x3) as usize + 1;
        let inner_bit_count = (entry_format & 0xF) as u32 + 1;
        let mut entries = Vec::with_capacity(map_count as usize);
        for _ in 0..map_count {
            let raw = match entry_size {
                1 => r.read_u8()? as u32,
                2 => r.read_u16()? as u32,
                3 => r.read_u24()?,
                _ => r.read_u32()?,
            };
            let inner = (raw & ((1u32 << inner_bit_count) - 1)) as u16;
            let outer = (raw >> inner_bit_count) as u16;
            entries.push((outer, inner));
        }
        Ok(DeltaSetIndexMap { entries })
    }
}

impl HvarTable {
    pub fn parse(data: &[u8]) -> Result<Self, FontParseError> {
        let mut r = Reader::new(data, "HVAR");
        let _major = r.read_u16()?;
        let _minor = r.read_u16()?;
        let item_store_offset = r.read_u32()? as usize;
        let advance_map_offset = r.read_u32()? as usize;
        let _lsb_map_offset = r.read_u32()?;
        let _rsb_map_offset = r.read_u32()?;

        let store = ItemVariationStore::parse(&r.slice_from(item_store_offset)?)?;
        let delta_set_index_map = if advance_map_offset != 0 {
            Some(DeltaSetIndexMap::parse(&r.slice_from(advance_map_offset)?)?)
        } else {
            None
        };
        Ok(HvarTable { store, delta_set_index_map })
    }

    pub fn advance_width_delta(&self, glyph: u16, coords: &[f32]) -> f32 {
        let (outer, inner) = match &self.delta_set_index_map {
            Some(map) => match map.entries.get(glyph as usize) {
                Some(&(o, i)) => (o, i),
                None => (0, glyph),
            },
            None => (0, glyph),
        };
        self.store.delta(outer, inner, coords)
    }
}

/// `gvar`: parsed structurally (per-glyph data offsets resolved and handed
/// back as raw byte slices); outline delta decoding is out of scope for a
/// shaping-only engine.
pub struct GvarTable<'a> {
    data: &'a [u8],
    glyph_offsets: Vec<u32>,
    glyph_variation_data_array_offset: usize,
}

impl<'a> GvarTable<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self, FontParseError> {
        let mut r = Reader::new(data, "gvar");
        let _major = r.read_u16()?;
        let _minor = r.read_u16()?;
        let _axis_count = r.read_u16()?;
        let _shared_tuple_count = r.read_u16()?;
        let _shared_tuples_offset = r.read_u32()?;
        let glyph_count = r.read_u16()? as usize;
        let flags = r.read_u16()?;
        let glyph_variation_data_array_offset = r.read_u32()? as usize;

        let long_offsets = flags & 1 != 0;
        let mut glyph_offsets = Vec::with_capacity(glyph_count + 1);
        for _ in 0..=glyph_count {
            glyph_offsets.push(if long_offsets { r.read_u32()? } else { r.read_u16()? as u32 * 2 });
        }

        Ok(GvarTable { data, glyph_offsets, glyph_variation_data_array_offset })
    }

    /// Raw `glyphVariationData` bytes for one glyph, undecoded.
    pub fn raw_variation_data(&self, glyph: u16) -> Option<&'a [u8]> {
        let i = glyph as usize;
        let start = *self.glyph_offsets.get(i)? as usize;
        let end = *self.glyph_offsets.get(i + 1)? as usize;
        if end <= start {
            return None;
        }
        let base = self.glyph_variation_data_array_offset;
        self.data.get(base + start..base + end)
    }
}

/// `MATH` table: parsed structurally only, not consumed by any shaping
/// operation (no math-layout pass exists in this engine).
pub struct MathTable {
    pub constants_offset: u16,
    pub glyph_info_offset: u16,
    pub variants_offset: u16,
}

impl MathTable {
    pub fn parse(data: &[u8]) -> Result<Self, FontParseError> {
        let mut r = Reader::new(data, "MATH");
        let _major = r.read_u16()?;
        let _minor = r.read_u16()?;
        let constants_offset = r.read_u16()?;
        let glyph_info_offset = r.read_u16()?;
        let variants_offset = r.read_u16()?;
        Ok(MathTable { constants_offset, glyph_info_offset, variants_offset })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fvar_normalize_clamps_to_unit_range() {
        let mut data = Vec::new();
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&16u16.to_be_bytes()); // axes array offset
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes()); // axis count
        data.extend_from_slice(&20u16.to_be_bytes()); // axis size
        data.extend_from_slice(&0u16.to_be_bytes()); // instance count
        data.extend_from_slice(&0u16.to_be_bytes()); // instance size
        data.extend_from_slice(b"wght");
        data.extend_from_slice(&Fixed16::from_i32(100 << 16).to_i32().to_be_bytes());
        data.extend_from_slice(&Fixed16::from_i32(400 << 16).to_i32().to_be_bytes());
        data.extend_from_slice(&Fixed16::from_i32(900 << 16).to_i32().to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes()); // padding to axis_size

        let fvar = FvarTable::parse(&data).unwrap();
        assert_eq!(fvar.normalize(0, 400.0), 0.0);
        assert!((fvar.normalize(0, 900.0) - 1.0).abs() < 0.001);
        assert!((fvar.normalize(0, 100.0) + 1.0).abs() < 0.001);
    }
}
