//! `GPOS` table: positioning lookups.
//!
//! Mirrors [`crate::font::gsub`]'s split: subtables parse here and expose an
//! `apply` against an already flag-filtered glyph window, the buffer-wide
//! driver loop lives in [`crate::shape::gpos_engine`]. Context and chained
//! context positioning (types 7/8) share their rule layout with GSUB's
//! contextual lookups, so they're built out to the same generality here
//! rather than left as unparsed placeholders.

use crate::coverage::{ClassDef, Coverage};
use crate::digest::SetDigest;
use crate::error::FontParseError;
use crate::font::layout_common::{Anchor, LookupFlag, SubstLookupRecord, ValueRecord};
use crate::reader::Reader;

pub struct GposLookup {
    pub flag: LookupFlag,
    pub mark_filtering_set: Option<u16>,
    pub digest: SetDigest,
    pub subtables: Vec<GposSubtable>,
}

pub enum GposSubtable {
    Single(SinglePos),
    Pair(PairPos),
    Cursive(CursivePos),
    MarkToBase(MarkToBasePos),
    MarkToLigature(MarkToLigaturePos),
    MarkToMark(MarkToMarkPos),
    Context(ContextPos),
    Chained(ChainedContextPos),
}

impl GposLookup {
    pub fn parse(r: &Reader) -> Result<Self, FontParseError> {
        let mut r = r.slice_from(0)?;
        let lookup_type = r.read_u16()?;
        let flag = LookupFlag::from_bits_truncate(r.read_u16()?);
        let subtable_count = r.read_u16()? as usize;
        let mut subtable_offsets = Vec::with_capacity(subtable_count);
        for _ in 0..subtable_count {
            subtable_offsets.push(r.read_u16()? as usize);
        }
        let mark_filtering_set = if flag.contains(LookupFlag::USE_MARK_FILTERING_SET) {
            Some(r.read_u16()?)
        } else {
            None
        };

        let mut subtables = Vec::with_capacity(subtable_count);
        let mut digest = SetDigest::new();
        for offset in subtable_offsets {
            let sub_r = r.slice_from(offset)?;
            let subtable = parse_subtable(&sub_r, lookup_type)?;
            digest.merge(&subtable_digest(&subtable));
            subtables.push(subtable);
        }

        Ok(GposLookup { flag, mark_filtering_set, digest, subtables })
    }
}

fn parse_subtable(r: &Reader, lookup_type: u16) -> Result<GposSubtable, FontParseError> {
    if lookup_type == 9 {
        let mut er = r.slice_from(0)?;
        let _format = er.read_u16()?;
        let extension_lookup_type = er.read_u16()?;
        let extension_offset = er.read_u32()? as usize;
        let inner = r.slice_from(extension_offset)?;
        return parse_subtable(&inner, extension_lookup_type);
    }

    Ok(match lookup_type {
        1 => GposSubtable::Single(SinglePos::parse(r)?),
        2 => GposSubtable::Pair(PairPos::parse(r)?),
        3 => GposSubtable::Cursive(CursivePos::parse(r)?),
        4 => GposSubtable::MarkToBase(MarkToBasePos::parse(r)?),
        5 => GposSubtable::MarkToLigature(MarkToLigaturePos::parse(r)?),
        6 => GposSubtable::MarkToMark(MarkToMarkPos::parse(r)?),
        7 => GposSubtable::Context(ContextPos::parse(r)?),
        8 => GposSubtable::Chained(ChainedContextPos::parse(r)?),
        other => return Err(FontParseError::UnsupportedFormat { table: "GPOS", format: other }),
    })
}

fn subtable_digest(s: &GposSubtable) -> SetDigest {
    match s {
        GposSubtable::Single(s) => s.coverage.digest(),
        GposSubtable::Pair(s) => s.coverage.digest(),
        GposSubtable::Cursive(s) => s.coverage.digest(),
        GposSubtable::MarkToBase(s) => s.mark_coverage.digest(),
        GposSubtable::MarkToLigature(s) => s.mark_coverage.digest(),
        GposSubtable::MarkToMark(s) => s.mark1_coverage.digest(),
        GposSubtable::Context(s) => s.digest(),
        GposSubtable::Chained(s) => s.digest(),
    }
}

pub struct SinglePos {
    pub coverage: Coverage,
    data: SinglePosData,
}

enum SinglePosData {
    Format1 { value_format: u16, value: ValueRecord },
    Format2 { values: Vec<ValueRecord> },
}

impl SinglePos {
    fn parse(r: &Reader) -> Result<Self, FontParseError> {
        let mut r = r.slice_from(0)?;
        let format = r.read_u16()?;
        let coverage_offset = r.read_u16()?;
        let value_format = r.read_u16()?;
        let data = match format {
            1 => SinglePosData::Format1 { value_format, value: ValueRecord::parse(&mut r, value_format)? },
            2 => {
                let count = r.read_u16()? as usize;
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    values.push(ValueRecord::parse(&mut r, value_format)?);
                }
                SinglePosData::Format2 { values }
            }
            other => return Err(FontParseError::UnsupportedFormat { table: "SinglePos", format: other }),
        };
        let coverage = Coverage::parse(&r.slice_from(coverage_offset as usize)?)?;
        Ok(SinglePos { coverage, data })
    }

    pub fn apply(&self, glyph: u16) -> Option<ValueRecord> {
        let idx = self.coverage.get(glyph)?;
        match &self.data {
            SinglePosData::Format1 { value, .. } => Some(*value),
            SinglePosData::Format2 { values } => values.get(idx as usize).copied(),
        }
    }
}

#[derive(Clone)]
struct PairValueRecord {
    second_glyph: u16,
    value1: ValueRecord,
    value2: ValueRecord,
}

#[derive(Clone)]
struct Class2Record {
    value1: ValueRecord,
    value2: ValueRecord,
}

pub struct PairPos {
    pub coverage: Coverage,
    data: PairPosData,
}

enum PairPosData {
    Format1 { pair_sets: Vec<Vec<PairValueRecord>> },
    Format2 { class_def1: ClassDef, class_def2: ClassDef, class1_records: Vec<Vec<Class2Record>> },
}

impl PairPos {
    fn parse(r: &Reader) -> Result<Self, FontParseError> {
        let mut r = r.slice_from(0)?;
        let format = r.read_u16()?;
        let coverage_offset = r.read_u16()?;
        let value_format1 = r.read_u16()?;
        let value_format2 = r.read_u16()?;
        let data = match format {
            1 => {
                let set_count = r.read_u16()? as usize;
                let mut set_offsets = Vec::with_capacity(set_count);
                for _ in 0..set_count {
                    set_offsets.push(r.read_u16()? as usize);
                }
                let mut pair_sets = Vec::with_capacity(set_count);
                for offset in set_offsets {
                    let mut sr = r.slice_from(offset)?;
                    let pair_count = sr.read_u16()? as usize;
                    let mut pairs = Vec::with_capacity(pair_count);
                    for _ in 0..pair_count {
                        let second_glyph = sr.read_u16()?;
                        let value1 = ValueRecord::parse(&mut sr, value_format1)?;
                        let value2 = ValueRecord::parse(&mut sr, value_format2)?;
                        pairs.push(PairValueRecord { second_glyph, value1, value2 });
                    }
                    pair_sets.push(pairs);
                }
                PairPosData::Format1 { pair_sets }
            }
            2 => {
                let class_def1_offset = r.read_u16()?;
                let class_def2_offset = r.read_u16()?;
                let class1_count = r.read_u16()? as usize;
                let class2_count = r.read_u16()? as usize;
                let mut class1_records = Vec::with_capacity(class1_count);
                for _ in 0..class1_count {
                    let mut class2_records = Vec::with_capacity(class2_count);
                    for _ in 0..class2_count {
                        let value1 = ValueRecord::parse(&mut r, value_format1)?;
                        let value2 = ValueRecord::parse(&mut r, value_format2)?;
                        class2_records.push(Class2Record { value1, value2 });
                    }
                    class1_records.push(class2_records);
                }
                let class_def1 = ClassDef::parse(&r.slice_from(class_def1_offset as usize)?)?;
                let class_def2 = ClassDef::parse(&r.slice_from(class_def2_offset as usize)?)?;
                PairPosData::Format2 { class_def1, class_def2, class1_records }
            }
            other => return Err(FontParseError::UnsupportedFormat { table: "PairPos", format: other }),
        };
        let coverage = Coverage::parse(&r.slice_from(coverage_offset as usize)?)?;
        Ok(PairPos { coverage, data })
    }

    pub fn apply(&self, first: u16, second: u16) -> Option<(ValueRecord, ValueRecord)> {
        match &self.data {
            PairPosData::Format1 { pair_sets } => {
                let idx = self.coverage.get(first)? as usize;
                let set = pair_sets.get(idx)?;
                set.iter().find(|p| p.second_glyph == second).map(|p| (p.value1, p.value2))
            }
            PairPosData::Format2 { class_def1, class_def2, class1_records } => {
                self.coverage.get(first)?;
                let c1 = class_def1.get(first) as usize;
                let c2 = class_def2.get(second) as usize;
                class1_records.get(c1)?.get(c2).map(|r| (r.value1, r.value2))
            }
        }
    }
}

#[derive(Clone, Copy)]
struct EntryExitRecord {
    entry_anchor: Option<Anchor>,
    exit_anchor: Option<Anchor>,
}

pub struct CursivePos {
    pub coverage: Coverage,
    entry_exit_records: Vec<EntryExitRecord>,
}

impl CursivePos {
    fn parse(r: &Reader) -> Result<Self, FontParseError> {
        let mut r = r.slice_from(0)?;
        let _format = r.read_u16()?;
        let coverage_offset = r.read_u16()?;
        let count = r.read_u16()? as usize;
        let mut records = Vec::with_capacity(count);
        for _ in 0..count {
            let entry_offset = r.read_u16()?;
            let exit_offset = r.read_u16()?;
            let entry_anchor = if entry_offset != 0 { Some(Anchor::parse(&r.slice_from(entry_offset as usize)?)?) } else { None };
            let exit_anchor = if exit_offset != 0 { Some(Anchor::parse(&r.slice_from(exit_offset as usize)?)?) } else { None };
            records.push(EntryExitRecord { entry_anchor, exit_anchor });
        }
        let coverage = Coverage::parse(&r.slice_from(coverage_offset as usize)?)?;
        Ok(CursivePos { coverage, entry_exit_records: records })
    }

    pub fn entry_exit(&self, glyph: u16) -> Option<(Option<Anchor>, Option<Anchor>)> {
        let idx = self.coverage.get(glyph)? as usize;
        self.entry_exit_records.get(idx).map(|r| (r.entry_anchor, r.exit_anchor))
    }
}

#[derive(Clone, Copy)]
struct MarkRecord {
    mark_class: u16,
    mark_anchor: Anchor,
}

fn parse_mark_array(r: &Reader) -> Result<Vec<MarkRecord>, FontParseError> {
    let mut mr = r.slice_from(0)?;
    let count = mr.read_u16()? as usize;
    let mut offsets = Vec::with_capacity(count);
    for _ in 0..count {
        let mark_class = mr.read_u16()?;
        let anchor_offset = mr.read_u16()?;
        offsets.push((mark_class, anchor_offset));
    }
    let mut out = Vec::with_capacity(count);
    for (mark_class, anchor_offset) in offsets {
        out.push(MarkRecord { mark_class, mark_anchor: Anchor::parse(&r.slice_from(anchor_offset as usize)?)? });
    }
    Ok(out)
}

fn parse_anchor_matrix(r: &Reader, rows: usize, cols: usize) -> Result<Vec<Vec<Option<Anchor>>>, FontParseError> {
    let mut rr = r.slice_from(0)?;
    let mut all_offsets = Vec::with_capacity(rows);
    for _ in 0..rows {
        let mut offsets = Vec::with_capacity(cols);
        for _ in 0..cols {
            offsets.push(rr.read_u16()?);
        }
        all_offsets.push(offsets);
    }
    let mut out = Vec::with_capacity(rows);
    for offsets in all_offsets {
        let mut row = Vec::with_capacity(cols);
        for offset in offsets {
            row.push(if offset != 0 { Some(Anchor::parse(&r.slice_from(offset as usize)?)?) } else { None });
        }
        out.push(row);
    }
    Ok(out)
}

pub struct MarkToBasePos {
    pub mark_coverage: Coverage,
    base_coverage: Coverage,
    mark_array: Vec<MarkRecord>,
    base_array: Vec<Vec<Option<Anchor>>>,
}

impl MarkToBasePos {
    fn parse(r: &Reader) -> Result<Self, FontParseError> {
        let mut r = r.slice_from(0)?;
        let _format = r.read_u16()?;
        let mark_coverage_offset = r.read_u16()?;
        let base_coverage_offset = r.read_u16()?;
        let mark_class_count = r.read_u16()? as usize;
        let mark_array_offset = r.read_u16()?;
        let base_array_offset = r.read_u16()?;

        let mark_array = parse_mark_array(&r.slice_from(mark_array_offset as usize)?)?;
        let base_array_r = r.slice_from(base_array_offset as usize)?;
        let mut bar = base_array_r.slice_from(0)?;
        let base_count = bar.read_u16()? as usize;
        let base_array = parse_anchor_matrix(&base_array_r.slice_from(2)?, base_count, mark_class_count)?;

        let mark_coverage = Coverage::parse(&r.slice_from(mark_coverage_offset as usize)?)?;
        let base_coverage = Coverage::parse(&r.slice_from(base_coverage_offset as usize)?)?;
        Ok(MarkToBasePos { mark_coverage, base_coverage, mark_array, base_array })
    }

    pub fn apply(&self, mark: u16, base: u16) -> Option<(Anchor, Anchor)> {
        let mark_idx = self.mark_coverage.get(mark)? as usize;
        let base_idx = self.base_coverage.get(base)? as usize;
        let mark_record = self.mark_array.get(mark_idx)?;
        let base_anchor = self.base_array.get(base_idx)?.get(mark_record.mark_class as usize)?.as_ref()?;
        Some((mark_record.mark_anchor, *base_anchor))
    }
}

pub struct MarkToLigaturePos {
    pub mark_coverage: Coverage,
    ligature_coverage: Coverage,
    mark_array: Vec<MarkRecord>,
    ligature_array: Vec<Vec<Vec<Option<Anchor>>>>,
}

impl MarkToLigaturePos {
    fn parse(r: &Reader) -> Result<Self, FontParseError> {
        let mut r = r.slice_from(0)?;
        let _format = r.read_u16()?;
        let mark_coverage_offset = r.read_u16()?;
        let ligature_coverage_offset = r.read_u16()?;
        let mark_class_count = r.read_u16()? as usize;
        let mark_array_offset = r.read_u16()?;
        let ligature_array_offset = r.read_u16()?;

        let mark_array = parse_mark_array(&r.slice_from(mark_array_offset as usize)?)?;

        let lig_array_r = r.slice_from(ligature_array_offset as usize)?;
        let mut lar = lig_array_r.slice_from(0)?;
        let ligature_count = lar.read_u16()? as usize;
        let mut lig_offsets = Vec::with_capacity(ligature_count);
        for _ in 0..ligature_count {
            lig_offsets.push(lar.read_u16()? as usize);
        }
        let mut ligature_array = Vec::with_capacity(ligature_count);
        for offset in lig_offsets {
            let attach_r = lig_array_r.slice_from(offset)?;
            let mut ar = attach_r.slice_from(0)?;
            let component_count = ar.read_u16()? as usize;
            ligature_array.push(parse_anchor_matrix(&attach_r.slice_from(2)?, component_count, mark_class_count)?);
        }

        let mark_coverage = Coverage::parse(&r.slice_from(mark_coverage_offset as usize)?)?;
        let ligature_coverage = Coverage::parse(&r.slice_from(ligature_coverage_offset as usize)?)?;
        Ok(MarkToLigaturePos { mark_coverage, ligature_coverage, mark_array, ligature_array })
    }

    /// `component` is the count of marks between this one and the ligature
    /// glyph; clamped to the ligature's last component so a mark after the
    /// last one still attaches there instead of failing to attach at all.
    pub fn apply(&self, mark: u16, ligature: u16, component: usize) -> Option<(Anchor, Anchor)> {
        let mark_idx = self.mark_coverage.get(mark)? as usize;
        let lig_idx = self.ligature_coverage.get(ligature)? as usize;
        let mark_record = self.mark_array.get(mark_idx)?;
        let components = self.ligature_array.get(lig_idx)?;
        let component = component.min(components.len().saturating_sub(1));
        let component_anchors = components.get(component)?;
        let lig_anchor = component_anchors.get(mark_record.mark_class as usize)?.as_ref()?;
        Some((mark_record.mark_anchor, *lig_anchor))
    }
}

pub struct MarkToMarkPos {
    pub mark1_coverage: Coverage,
    mark2_coverage: Coverage,
    mark1_array: Vec<MarkRecord>,
    mark2_array: Vec<Vec<Option<Anchor>>>,
}

impl MarkToMarkPos {
    fn parse(r: &Reader) -> Result<Self, FontParseError> {
        let mut r = r.slice_from(0)?;
        let _format = r.read_u16()?;
        let mark1_coverage_offset = r.read_u16()?;
        let mark2_coverage_offset = r.read_u16()?;
        let mark_class_count = r.read_u16()? as usize;
        let mark1_array_offset = r.read_u16()?;
        let mark2_array_offset = r.read_u16()?;

        let mark1_array = parse_mark_array(&r.slice_from(mark1_array_offset as usize)?)?;
        let mark2_array_r = r.slice_from(mark2_array_offset as usize)?;
        let mut m2r = mark2_array_r.slice_from(0)?;
        let mark2_count = m2r.read_u16()? as usize;
        let mark2_array = parse_anchor_matrix(&mark2_array_r.slice_from(2)?, mark2_count, mark_class_count)?;

        let mark1_coverage = Coverage::parse(&r.slice_from(mark1_coverage_offset as usize)?)?;
        let mark2_coverage = Coverage::parse(&r.slice_from(mark2_coverage_offset as usize)?)?;
        Ok(MarkToMarkPos { mark1_coverage, mark2_coverage, mark1_array, mark2_array })
    }

    pub fn apply(&self, mark1: u16, mark2: u16) -> Option<(Anchor, Anchor)> {
        let mark1_idx = self.mark1_coverage.get(mark1)? as usize;
        let mark2_idx = self.mark2_coverage.get(mark2)? as usize;
        let mark1_record = self.mark1_array.get(mark1_idx)?;
        let mark2_anchor = self.mark2_array.get(mark2_idx)?.get(mark1_record.mark_class as usize)?.as_ref()?;
        Some((mark1_record.mark_anchor, *mark2_anchor))
    }
}

/// Result of a context/chained-context positioning match: the engine applies
/// each referenced lookup at its local sequence index, same as for GSUB.
pub struct PosApply {
    pub lookup_records: Vec<SubstLookupRecord>,
    pub input_len: usize,
}

pub enum ContextPos {
    Format1 { coverage: Coverage, rule_sets: Vec<Vec<PosSequenceRule>> },
    Format2 { coverage: Coverage, class_def: ClassDef, rule_sets: Vec<Vec<PosSequenceRule>> },
    Format3 { input_coverages: Vec<Coverage>, lookup_records: Vec<SubstLookupRecord> },
}

pub struct PosSequenceRule {
    pub input: Vec<u16>,
    pub lookup_records: Vec<SubstLookupRecord>,
}

impl ContextPos {
    fn parse(r: &Reader) -> Result<Self, FontParseError> {
        let mut r = r.slice_from(0)?;
        let format = r.read_u16()?;
        match format {
            1 => {
                let coverage_offset = r.read_u16()?;
                let set_count = r.read_u16()? as usize;
                let mut set_offsets = Vec::with_capacity(set_count);
                for _ in 0..set_count {
                    set_offsets.push(r.read_u16()? as usize);
                }
                let rule_sets = parse_pos_rule_sets(&r, &set_offsets)?;
                let coverage = Coverage::parse(&r.slice_from(coverage_offset as usize)?)?;
                Ok(ContextPos::Format1 { coverage, rule_sets })
            }
            2 => {
                let coverage_offset = r.read_u16()?;
                let class_def_offset = r.read_u16()?;
                let set_count = r.read_u16()? as usize;
                let mut set_offsets = Vec::with_capacity(set_count);
                for _ in 0..set_count {
                    set_offsets.push(r.read_u16()? as usize);
                }
                let rule_sets = parse_pos_rule_sets(&r, &set_offsets)?;
                let coverage = Coverage::parse(&r.slice_from(coverage_offset as usize)?)?;
                let class_def = ClassDef::parse(&r.slice_from(class_def_offset as usize)?)?;
                Ok(ContextPos::Format2 { coverage, class_def, rule_sets })
            }
            3 => {
                let glyph_count = r.read_u16()? as usize;
                let lookup_count = r.read_u16()? as usize;
                let mut cov_offsets = Vec::with_capacity(glyph_count);
                for _ in 0..glyph_count {
                    cov_offsets.push(r.read_u16()? as usize);
                }
                let mut lookup_records = Vec::with_capacity(lookup_count);
                for _ in 0..lookup_count {
                    lookup_records.push(SubstLookupRecord::parse(&mut r)?);
                }
                let mut input_coverages = Vec::with_capacity(glyph_count);
                for offset in cov_offsets {
                    input_coverages.push(Coverage::parse(&r.slice_from(offset)?)?);
                }
                Ok(ContextPos::Format3 { input_coverages, lookup_records })
            }
            other => Err(FontParseError::UnsupportedFormat { table: "ContextPos", format: other }),
        }
    }

    pub fn digest(&self) -> SetDigest {
        match self {
            ContextPos::Format1 { coverage, .. } => coverage.digest(),
            ContextPos::Format2 { coverage, .. } => coverage.digest(),
            ContextPos::Format3 { input_coverages, .. } => input_coverages.first().map(|c| c.digest()).unwrap_or_default(),
        }
    }

    pub fn apply(&self, window: &[u16]) -> Option<PosApply> {
        match self {
            ContextPos::Format1 { coverage, rule_sets } => {
                let idx = coverage.get(window[0])?;
                for rule in rule_sets.get(idx as usize)? {
                    if rule.input.len() <= window[1..].len() && rule.input == window[1..1 + rule.input.len()] {
                        return Some(PosApply { lookup_records: rule.lookup_records.clone(), input_len: rule.input.len() + 1 });
                    }
                }
                None
            }
            ContextPos::Format2 { coverage, class_def, rule_sets } => {
                coverage.get(window[0])?;
                let class = class_def.get(window[0]);
                for rule in rule_sets.get(class as usize)? {
                    let classes: Vec<u16> = window[1..].iter().take(rule.input.len()).map(|&g| class_def.get(g)).collect();
                    if classes.len() == rule.input.len() && classes == rule.input {
                        return Some(PosApply { lookup_records: rule.lookup_records.clone(), input_len: rule.input.len() + 1 });
                    }
                }
                None
            }
            ContextPos::Format3 { input_coverages, lookup_records } => {
                if window.len() < input_coverages.len() {
                    return None;
                }
                for (g, cov) in window.iter().zip(input_coverages.iter()) {
                    cov.get(*g)?;
                }
                Some(PosApply { lookup_records: lookup_records.clone(), input_len: input_coverages.len() })
            }
        }
    }
}

fn parse_pos_rule_sets(r: &Reader, set_offsets: &[usize]) -> Result<Vec<Vec<PosSequenceRule>>, FontParseError> {
    let mut rule_sets = Vec::with_capacity(set_offsets.len());
    for &offset in set_offsets {
        if offset == 0 {
            rule_sets.push(Vec::new());
            continue;
        }
        let mut sr = r.slice_from(offset)?;
        let rule_count = sr.read_u16()? as usize;
        let mut rule_offsets = Vec::with_capacity(rule_count);
        for _ in 0..rule_count {
            rule_offsets.push(sr.read_u16()? as usize);
        }
        let mut rules = Vec::with_capacity(rule_count);
        for rule_offset in rule_offsets {
            let mut rr = sr.slice_from(rule_offset)?;
            let glyph_count = rr.read_u16()? as usize;
            let lookup_count = rr.read_u16()? as usize;
            let mut input = Vec::with_capacity(glyph_count.saturating_sub(1));
            for _ in 1..glyph_count {
                input.push(rr.read_u16()?);
            }
            let mut lookup_records = Vec::with_capacity(lookup_count);
            for _ in 0..lookup_count {
                lookup_records.push(SubstLookupRecord::parse(&mut rr)?);
            }
            rules.push(PosSequenceRule { input, lookup_records });
        }
        rule_sets.push(rules);
    }
    Ok(rule_sets)
}

pub enum ChainedContextPos {
    Format1 { coverage: Coverage, rule_sets: Vec<Vec<ChainedPosRule>> },
    Format2 {
        coverage: Coverage,
        backtrack_class_def: ClassDef,
        input_class_def: ClassDef,
        lookahead_class_def: ClassDef,
        rule_sets: Vec<Vec<ChainedPosRule>>,
    },
    Format3 {
        backtrack_coverages: Vec<Coverage>,
        input_coverages: Vec<Coverage>,
        lookahead_coverages: Vec<Coverage>,
        lookup_records: Vec<SubstLookupRecord>,
    },
}

pub struct ChainedPosRule {
    pub backtrack: Vec<u16>,
    pub input: Vec<u16>,
    pub lookahead: Vec<u16>,
    pub lookup_records: Vec<SubstLookupRecord>,
}

impl ChainedContextPos {
    fn parse(r: &Reader) -> Result<Self, FontParseError> {
        let mut r = r.slice_from(0)?;
        let format = r.read_u16()?;
        match format {
            1 => {
                let coverage_offset = r.read_u16()?;
                let set_count = r.read_u16()? as usize;
                let mut set_offsets = Vec::with_capacity(set_count);
                for _ in 0..set_count {
                    set_offsets.push(r.read_u16()? as usize);
                }
                let rule_sets = parse_chained_pos_rule_sets(&r, &set_offsets)?;
                let coverage = Coverage::parse(&r.slice_from(coverage_offset as usize)?)?;
                Ok(ChainedContextPos::Format1 { coverage, rule_sets })
            }
            2 => {
                let coverage_offset = r.read_u16()?;
                let backtrack_cd_offset = r.read_u16()?;
                let input_cd_offset = r.read_u16()?;
                let lookahead_cd_offset = r.read_u16()?;
                let set_count = r.read_u16()? as usize;
                let mut set_offsets = Vec::with_capacity(set_count);
                for _ in 0..set_count {
                    set_offsets.push(r.read_u16()? as usize);
                }
                let rule_sets = parse_chained_pos_rule_sets(&r, &set_offsets)?;
                let coverage = Coverage::parse(&r.slice_from(coverage_offset as usize)?)?;
                let backtrack_class_def = ClassDef::parse(&r.slice_from(backtrack_cd_offset as usize)?)?;
                let input_class_def = ClassDef::parse(&r.slice_from(input_cd_offset as usize)?)?;
                let lookahead_class_def = ClassDef::parse(&r.slice_from(lookahead_cd_offset as usize)?)?;
                Ok(ChainedContextPos::Format2 { coverage, backtrack_class_def, input_class_def, lookahead_class_def, rule_sets })
            }
            3 => {
                let backtrack_coverages = parse_coverage_array(&mut r)?;
                let input_coverages = parse_coverage_array(&mut r)?;
                let lookahead_coverages = parse_coverage_array(&mut r)?;
                let lookup_count = r.read_u16()? as usize;
                let mut lookup_records = Vec::with_capacity(lookup_count);
                for _ in 0..lookup_count {
                    lookup_records.push(SubstLookupRecord::parse(&mut r)?);
                }
                Ok(ChainedContextPos::Format3 { backtrack_coverages, input_coverages, lookahead_coverages, lookup_records })
            }
            other => Err(FontParseError::UnsupportedFormat { table: "ChainContextPos", format: other }),
        }
    }

    pub fn digest(&self) -> SetDigest {
        match self {
            ChainedContextPos::Format1 { coverage, .. } => coverage.digest(),
            ChainedContextPos::Format2 { coverage, .. } => coverage.digest(),
            ChainedContextPos::Format3 { input_coverages, .. } => input_coverages.first().map(|c| c.digest()).unwrap_or_default(),
        }
    }

    pub fn apply(&self, backtrack: &[u16], window: &[u16]) -> Option<PosApply> {
        match self {
            ChainedContextPos::Format1 { coverage, rule_sets } => {
                let idx = coverage.get(window[0])?;
                for rule in rule_sets.get(idx as usize)? {
                    if matches(&rule.backtrack, backtrack)
                        && matches(&rule.input, &window[1..])
                        && matches(&rule.lookahead, &window[1 + rule.input.len()..])
                    {
                        return Some(PosApply { lookup_records: rule.lookup_records.clone(), input_len: rule.input.len() + 1 });
                    }
                }
                None
            }
            ChainedContextPos::Format2 { coverage, backtrack_class_def, input_class_def, lookahead_class_def, rule_sets } => {
                coverage.get(window[0])?;
                let class = input_class_def.get(window[0]);
                for rule in rule_sets.get(class as usize)? {
                    let bt: Vec<u16> = backtrack.iter().take(rule.backtrack.len()).map(|&g| backtrack_class_def.get(g)).collect();
                    let input: Vec<u16> = window[1..].iter().take(rule.input.len()).map(|&g| input_class_def.get(g)).collect();
                    let la: Vec<u16> =
                        window[1 + rule.input.len()..].iter().take(rule.lookahead.len()).map(|&g| lookahead_class_def.get(g)).collect();
                    if bt == rule.backtrack && input == rule.input && la == rule.lookahead {
                        return Some(PosApply { lookup_records: rule.lookup_records.clone(), input_len: rule.input.len() + 1 });
                    }
                }
                None
            }
            ChainedContextPos::Format3 { backtrack_coverages, input_coverages, lookahead_coverages, lookup_records } => {
                if window.len() < input_coverages.len() + lookahead_coverages.len() || backtrack.len() < backtrack_coverages.len() {
                    return None;
                }
                for (g, cov) in backtrack.iter().zip(backtrack_coverages.iter()) {
                    cov.get(*g)?;
                }
                for (g, cov) in window.iter().zip(input_coverages.iter()) {
                    cov.get(*g)?;
                }
                for (g, cov) in window[input_coverages.len()..].iter().zip(lookahead_coverages.iter()) {
                    cov.get(*g)?;
                }
                Some(PosApply { lookup_records: lookup_records.clone(), input_len: input_coverages.len() })
            }
        }
    }
}

fn matches(expected: &[u16], actual: &[u16]) -> bool {
    expected.len() <= actual.len() && expected == &actual[..expected.len()]
}

fn parse_chained_pos_rule_sets(r: &Reader, set_offsets: &[usize]) -> Result<Vec<Vec<ChainedPosRule>>, FontParseError> {
    let mut rule_sets = Vec::with_capacity(set_offsets.len());
    for &offset in set_offsets {
        if offset == 0 {
            rule_sets.push(Vec::new());
            continue;
        }
        let mut sr = r.slice_from(offset)?;
        let rule_count = sr.read_u16()? as usize;
        let mut rule_offsets = Vec::with_capacity(rule_count);
        for _ in 0..rule_count {
            rule_offsets.push(sr.read_u16()? as usize);
        }
        let mut rules = Vec::with_capacity(rule_count);
        for rule_offset in rule_offsets {
            let mut rr = sr.slice_from(rule_offset)?;
            let backtrack_count = rr.read_u16()? as usize;
            let mut backtrack = Vec::with_capacity(backtrack_count);
            for _ in 0..backtrack_count {
                backtrack.push(rr.read_u16()?);
            }
            let input_count = rr.read_u16()? as usize;
            let mut input = Vec::with_capacity(input_count.saturating_sub(1));
            for _ in 1..input_count {
                input.push(rr.read_u16()?);
            }
            let lookahead_count = rr.read_u16()? as usize;
            let mut lookahead = Vec::with_capacity(lookahead_count);
            for _ in 0..lookahead_count {
                lookahead.push(rr.read_u16()?);
            }
            let lookup_count = rr.read_u16()? as usize;
            let mut lookup_records = Vec::with_capacity(lookup_count);
            for _ in 0..lookup_count {
                lookup_records.push(SubstLookupRecord::parse(&mut rr)?);
            }
            rules.push(ChainedPosRule { backtrack, input, lookahead, lookup_records });
        }
        rule_sets.push(rules);
    }
    Ok(rule_sets)
}

fn parse_coverage_array(r: &mut Reader) -> Result<Vec<Coverage>, FontParseError> {
    let count = r.read_u16()? as usize;
    let mut offsets = Vec::with_capacity(count);
    for _ in 0..count {
        offsets.push(r.read_u16()? as usize);
    }
    let mut out = Vec::with_capacity(count);
    for offset in offsets {
        out.push(Coverage::parse(&r.slice_from(offset)?)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_pos_format1(glyphs: &[u16], x_advance: i16) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&1u16.to_be_bytes());
        let coverage_offset = 8u16;
        data.extend_from_slice(&coverage_offset.to_be_bytes());
        data.extend_from_slice(&0x0004u16.to_be_bytes()); // XAdvance only
        data.extend_from_slice(&x_advance.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&(glyphs.len() as u16).to_be_bytes());
        for g in glyphs {
            data.extend_from_slice(&g.to_be_bytes());
        }
        data
    }

    #[test]
    fn single_pos_applies_advance() {
        let data = single_pos_format1(&[5], 120);
        let r = Reader::new(&data, "GPOS");
        let pos = SinglePos::parse(&r).unwrap();
        let v = pos.apply(5).unwrap();
        assert_eq!(v.x_advance, 120);
        assert!(pos.apply(6).is_none());
    }
}
