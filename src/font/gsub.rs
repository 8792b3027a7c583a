//! `GSUB` table: substitution lookups.
//!
//! Subtables parse into a small sum type per lookup kind and expose an
//! `apply` that matches against an already flag-filtered glyph window; the
//! driver loop that walks the buffer, builds that window and executes the
//! result lives in [`crate::shape::gsub_engine`].

use crate::coverage::{ClassDef, Coverage};
use crate::digest::SetDigest;
use crate::error::FontParseError;
use crate::font::layout_common::{LookupFlag, SubstLookupRecord};
use crate::reader::Reader;

pub const MAX_LIGATURE_COMPONENTS: usize = 16;

/// Result of a subtable matching the glyph window at the current cursor.
pub enum SubstApply {
    /// Replace the current glyph with this id.
    Single(u16),
    /// Replace the current glyph with this sequence (cluster/mask inherited
    /// by the engine for each inserted glyph).
    Multiple(Vec<u16>),
    /// Replace `input_len` consecutive filtered glyphs (starting at the
    /// cursor) with a single ligature glyph.
    Ligature { glyph: u16, input_len: usize },
    /// Contextual match over `input_len` filtered glyphs; the engine applies
    /// `lookup_records` locally over that span.
    Context { lookup_records: Vec<SubstLookupRecord>, input_len: usize },
}

pub struct GsubLookup {
    pub flag: LookupFlag,
    pub mark_filtering_set: Option<u16>,
    pub digest: SetDigest,
    pub subtables: Vec<GsubSubtable>,
}

pub enum GsubSubtable {
    Single(SingleSubst),
    Multiple(MultipleSubst),
    Alternate(AlternateSubst),
    Ligature(LigatureSubst),
    Context(ContextSubst),
    Chained(ChainedContextSubst),
    ReverseChainingSingle(ReverseChainSingleSubst),
}

impl GsubLookup {
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
            let (actual_type, subtable) = parse_subtable(&sub_r, lookup_type)?;
            let _ = actual_type;
            digest.merge(&subtable_digest(&subtable));
            subtables.push(subtable);
        }

        Ok(GsubLookup { flag, mark_filtering_set, digest, subtables })
    }
}

/// Parses one subtable, unwrapping Extension (type 7) into the real kind it
/// references. Returns the real lookup type alongside the parsed subtable
/// (the teacher's equivalent hardcoded this to `1` regardless of the
/// extension's actual referenced type).
fn parse_subtable(r: &Reader, lookup_type: u16) -> Result<(u16, GsubSubtable), FontParseError> {
    if lookup_type == 7 {
        let mut er = r.slice_from(0)?;
        let _format = er.read_u16()?;
        let extension_lookup_type = er.read_u16()?;
        let extension_offset = er.read_u32()? as usize;
        let inner = r.slice_from(extension_offset)?;
        return parse_subtable(&inner, extension_lookup_type);
    }

    let subtable = match lookup_type {
        1 => GsubSubtable::Single(SingleSubst::parse(r)?),
        2 => GsubSubtable::Multiple(MultipleSubst::parse(r)?),
        3 => GsubSubtable::Alternate(AlternateSubst::parse(r)?),
        4 => GsubSubtable::Ligature(LigatureSubst::parse(r)?),
        5 => GsubSubtable::Context(ContextSubst::parse(r)?),
        6 => GsubSubtable::Chained(ChainedContextSubst::parse(r)?),
        8 => GsubSubtable::ReverseChainingSingle(ReverseChainSingleSubst::parse(r)?),
        other => return Err(FontParseError::UnsupportedFormat { table: "GSUB", format: other }),
    };
    Ok((lookup_type, subtable))
}

fn subtable_digest(s: &GsubSubtable) -> SetDigest {
    match s {
        GsubSubtable::Single(s) => s.coverage.digest(),
        GsubSubtable::Multiple(s) => s.coverage.digest(),
        GsubSubtable::Alternate(s) => s.coverage.digest(),
        GsubSubtable::Ligature(s) => s.coverage.digest(),
        GsubSubtable::Context(s) => s.digest(),
        GsubSubtable::Chained(s) => s.digest(),
        GsubSubtable::ReverseChainingSingle(s) => s.coverage.digest(),
    }
}

pub enum SingleSubst {
    Format1 { coverage: Coverage, delta: i16 },
    Format2 { coverage: Coverage, substitutes: Vec<u16> },
}

impl SingleSubst {
    fn parse(r: &Reader) -> Result<Self, FontParseError> {
        let mut r = r.slice_from(0)?;
        let format = r.read_u16()?;
        let coverage_offset = r.read_u16()?;
        match format {
            1 => {
                let delta = r.read_i16()?;
                let coverage = Coverage::parse(&r.slice_from(coverage_offset as usize)?)?;
                Ok(SingleSubst::Format1 { coverage, delta })
            }
            2 => {
                let count = r.read_u16()? as usize;
                let mut substitutes = Vec::with_capacity(count);
                for _ in 0..count {
                    substitutes.push(r.read_u16()?);
                }
                let coverage = Coverage::parse(&r.slice_from(coverage_offset as usize)?)?;
                Ok(SingleSubst::Format2 { coverage, substitutes })
            }
            other => Err(FontParseError::UnsupportedFormat { table: "SingleSubst", format: other }),
        }
    }

    pub fn coverage(&self) -> &Coverage {
        match self {
            SingleSubst::Format1 { coverage, .. } => coverage,
            SingleSubst::Format2 { coverage, .. } => coverage,
        }
    }

    pub fn apply(&self, glyph: u16) -> Option<u16> {
        match self {
            SingleSubst::Format1 { coverage, delta } => {
                coverage.get(glyph).map(|_| (glyph as i32 + *delta as i32) as u16)
            }
            SingleSubst::Format2 { coverage, substitutes } => {
                coverage.get(glyph).and_then(|i| substitutes.get(i as usize).copied())
            }
        }
    }
}

pub struct MultipleSubst {
    pub coverage: Coverage,
    pub sequences: Vec<Vec<u16>>,
}

impl MultipleSubst {
    fn parse(r: &Reader) -> Result<Self, FontParseError> {
        let mut r = r.slice_from(0)?;
        let _format = r.read_u16()?;
        let coverage_offset = r.read_u16()?;
        let count = r.read_u16()? as usize;
        let mut seq_offsets = Vec::with_capacity(count);
        for _ in 0..count {
            seq_offsets.push(r.read_u16()? as usize);
        }
        let mut sequences = Vec::with_capacity(count);
        for offset in seq_offsets {
            let mut sr = r.slice_from(offset)?;
            let glyph_count = sr.read_u16()? as usize;
            let mut seq = Vec::with_capacity(glyph_count);
            for _ in 0..glyph_count {
                seq.push(sr.read_u16()?);
            }
            sequences.push(seq);
        }
        let coverage = Coverage::parse(&r.slice_from(coverage_offset as usize)?)?;
        Ok(MultipleSubst { coverage, sequences })
    }

    pub fn apply(&self, glyph: u16) -> Option<&[u16]> {
        let idx = self.coverage.get(glyph)?;
        self.sequences.get(idx as usize).map(|v| v.as_slice())
    }
}

pub struct AlternateSubst {
    pub coverage: Coverage,
    pub alternate_sets: Vec<Vec<u16>>,
}

impl AlternateSubst {
    fn parse(r: &Reader) -> Result<Self, FontParseError> {
        let mut r = r.slice_from(0)?;
        let _format = r.read_u16()?;
        let coverage_offset = r.read_u16()?;
        let count = r.read_u16()? as usize;
        let mut set_offsets = Vec::with_capacity(count);
        for _ in 0..count {
            set_offsets.push(r.read_u16()? as usize);
        }
        let mut alternate_sets = Vec::with_capacity(count);
        for offset in set_offsets {
            let mut sr = r.slice_from(offset)?;
            let glyph_count = sr.read_u16()? as usize;
            let mut alts = Vec::with_capacity(glyph_count);
            for _ in 0..glyph_count {
                alts.push(sr.read_u16()?);
            }
            alternate_sets.push(alts);
        }
        let coverage = Coverage::parse(&r.slice_from(coverage_offset as usize)?)?;
        Ok(AlternateSubst { coverage, alternate_sets })
    }

    /// Returns the alternate at `index` (the core's own dispatch always
    /// passes 0 — see design notes on user-selection hooks).
    pub fn apply(&self, glyph: u16, index: usize) -> Option<u16> {
        let cov_idx = self.coverage.get(glyph)?;
        self.alternate_sets.get(cov_idx as usize)?.get(index).copied()
    }
}

#[derive(Debug, Clone)]
pub struct Ligature {
    pub glyph: u16,
    /// Components *after* the first (coverage) glyph.
    pub components: Vec<u16>,
}

pub struct LigatureSubst {
    pub coverage: Coverage,
    pub ligature_sets: Vec<Vec<Ligature>>,
}

impl LigatureSubst {
    fn parse(r: &Reader) -> Result<Self, FontParseError> {
        let mut r = r.slice_from(0)?;
        let _format = r.read_u16()?;
        let coverage_offset = r.read_u16()?;
        let count = r.read_u16()? as usize;
        let mut set_offsets = Vec::with_capacity(count);
        for _ in 0..count {
            set_offsets.push(r.read_u16()? as usize);
        }
        let mut ligature_sets = Vec::with_capacity(count);
        for offset in set_offsets {
            let mut sr = r.slice_from(offset)?;
            let lig_count = sr.read_u16()? as usize;
            let mut lig_offsets = Vec::with_capacity(lig_count);
            for _ in 0..lig_count {
                lig_offsets.push(sr.read_u16()? as usize);
            }
            let mut ligatures = Vec::with_capacity(lig_count);
            for lig_offset in lig_offsets {
                let mut lr = sr.slice_from(lig_offset)?;
                let glyph = lr.read_u16()?;
                let comp_count = lr.read_u16()? as usize;
                let mut components = Vec::with_capacity(comp_count.saturating_sub(1));
                for _ in 1..comp_count {
                    components.push(lr.read_u16()?);
                }
                ligatures.push(Ligature { glyph, components });
            }
            ligature_sets.push(ligatures);
        }
        let coverage = Coverage::parse(&r.slice_from(coverage_offset as usize)?)?;
        Ok(LigatureSubst { coverage, ligature_sets })
    }

    /// `window[0]` is the anchor glyph (already coverage-matched by caller
    /// logic is not assumed here); matches `window[1..]` against each
    /// ligature's component tail, longest-first already guaranteed by font
    /// authoring order. Only the first `MAX_LIGATURE_COMPONENTS` filtered
    /// glyphs are considered, so a pathologically long run of matchable
    /// glyphs can't turn ligature matching into an O(buffer) scan.
    pub fn apply(&self, window: &[u16]) -> Option<SubstApply> {
        let window = &window[..window.len().min(MAX_LIGATURE_COMPONENTS)];
        let idx = self.coverage.get(window[0])?;
        let set = self.ligature_sets.get(idx as usize)?;
        for lig in set {
            let need = lig.components.len();
            if need >= window.len() {
                continue;
            }
            if window[1..=need] == lig.components[..] {
                return Some(SubstApply::Ligature { glyph: lig.glyph, input_len: need + 1 });
            }
        }
        None
    }
}

pub enum ContextSubst {
    Format1 { coverage: Coverage, rule_sets: Vec<Vec<SequenceRule>> },
    Format2 { coverage: Coverage, class_def: ClassDef, rule_sets: Vec<Vec<SequenceRule>> },
    Format3 { input_coverages: Vec<Coverage>, lookup_records: Vec<SubstLookupRecord> },
}

pub struct SequenceRule {
    /// Glyphs (format 1) or classes (format 2) after the first position.
    pub input: Vec<u16>,
    pub lookup_records: Vec<SubstLookupRecord>,
}

impl ContextSubst {
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
                let rule_sets = parse_rule_sets(&r, &set_offsets)?;
                let coverage = Coverage::parse(&r.slice_from(coverage_offset as usize)?)?;
                Ok(ContextSubst::Format1 { coverage, rule_sets })
            }
            2 => {
                let coverage_offset = r.read_u16()?;
                let class_def_offset = r.read_u16()?;
                let set_count = r.read_u16()? as usize;
                let mut set_offsets = Vec::with_capacity(set_count);
                for _ in 0..set_count {
                    set_offsets.push(r.read_u16()? as usize);
                }
                let rule_sets = parse_rule_sets(&r, &set_offsets)?;
                let coverage = Coverage::parse(&r.slice_from(coverage_offset as usize)?)?;
                let class_def = ClassDef::parse(&r.slice_from(class_def_offset as usize)?)?;
                Ok(ContextSubst::Format2 { coverage, class_def, rule_sets })
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
                Ok(ContextSubst::Format3 { input_coverages, lookup_records })
            }
            other => Err(FontParseError::UnsupportedFormat { table: "ContextSubst", format: other }),
        }
    }

    pub fn digest(&self) -> SetDigest {
        match self {
            ContextSubst::Format1 { coverage, .. } => coverage.digest(),
            ContextSubst::Format2 { coverage, .. } => coverage.digest(),
            ContextSubst::Format3 { input_coverages, .. } => {
                input_coverages.first().map(|c| c.digest()).unwrap_or_default()
            }
        }
    }

    pub fn apply(&self, window: &[u16]) -> Option<SubstApply> {
        match self {
            ContextSubst::Format1 { coverage, rule_sets } => {
                let idx = coverage.get(window[0])?;
                let rules = rule_sets.get(idx as usize)?;
                for rule in rules {
                    if matches_glyph_sequence(&rule.input, &window[1..]) {
                        return Some(SubstApply::Context {
                            lookup_records: rule.lookup_records.clone(),
                            input_len: rule.input.len() + 1,
                        });
                    }
                }
                None
            }
            ContextSubst::Format2 { coverage, class_def, rule_sets } => {
                coverage.get(window[0])?;
                let class = class_def.get(window[0]);
                let rules = rule_sets.get(class as usize)?;
                for rule in rules {
                    let classes: Vec<u16> = window[1..].iter().take(rule.input.len()).map(|&g| class_def.get(g)).collect();
                    if classes.len() == rule.input.len() && classes == rule.input {
                        return Some(SubstApply::Context {
                            lookup_records: rule.lookup_records.clone(),
                            input_len: rule.input.len() + 1,
                        });
                    }
                }
                None
            }
            ContextSubst::Format3 { input_coverages, lookup_records } => {
                if window.len() < input_coverages.len() {
                    return None;
                }
                for (g, cov) in window.iter().zip(input_coverages.iter()) {
                    cov.get(*g)?;
                }
                Some(SubstApply::Context {
                    lookup_records: lookup_records.clone(),
                    input_len: input_coverages.len(),
                })
            }
        }
    }
}

fn parse_rule_sets(r: &Reader, set_offsets: &[usize]) -> Result<Vec<Vec<SequenceRule>>, FontParseError> {
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
            rules.push(SequenceRule { input, lookup_records });
        }
        rule_sets.push(rules);
    }
    Ok(rule_sets)
}

fn matches_glyph_sequence(expected: &[u16], actual: &[u16]) -> bool {
    expected.len() <= actual.len() && expected == &actual[..expected.len()]
}

pub enum ChainedContextSubst {
    Format1 { coverage: Coverage, rule_sets: Vec<Vec<ChainedRule>> },
    Format2 {
        coverage: Coverage,
        backtrack_class_def: ClassDef,
        input_class_def: ClassDef,
        lookahead_class_def: ClassDef,
        rule_sets: Vec<Vec<ChainedRule>>,
    },
    Format3 {
        backtrack_coverages: Vec<Coverage>,
        input_coverages: Vec<Coverage>,
        lookahead_coverages: Vec<Coverage>,
        lookup_records: Vec<SubstLookupRecord>,
    },
}

pub struct ChainedRule {
    pub backtrack: Vec<u16>,
    pub input: Vec<u16>,
    pub lookahead: Vec<u16>,
    pub lookup_records: Vec<SubstLookupRecord>,
}

impl ChainedContextSubst {
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
                let rule_sets = parse_chained_rule_sets(&r, &set_offsets)?;
                let coverage = Coverage::parse(&r.slice_from(coverage_offset as usize)?)?;
                Ok(ChainedContextSubst::Format1 { coverage, rule_sets })
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
                let rule_sets = parse_chained_rule_sets(&r, &set_offsets)?;
                let coverage = Coverage::parse(&r.slice_from(coverage_offset as usize)?)?;
                let backtrack_class_def = ClassDef::parse(&r.slice_from(backtrack_cd_offset as usize)?)?;
                let input_class_def = ClassDef::parse(&r.slice_from(input_cd_offset as usize)?)?;
                let lookahead_class_def = ClassDef::parse(&r.slice_from(lookahead_cd_offset as usize)?)?;
                Ok(ChainedContextSubst::Format2 {
                    coverage,
                    backtrack_class_def,
                    input_class_def,
                    lookahead_class_def,
                    rule_sets,
                })
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
                Ok(ChainedContextSubst::Format3 {
                    backtrack_coverages,
                    input_coverages,
                    lookahead_coverages,
                    lookup_records,
                })
            }
            other => Err(FontParseError::UnsupportedFormat { table: "ChainContextSubst", format: other }),
        }
    }

    pub fn digest(&self) -> SetDigest {
        match self {
            ChainedContextSubst::Format1 { coverage, .. } => coverage.digest(),
            ChainedContextSubst::Format2 { coverage, .. } => coverage.digest(),
            ChainedContextSubst::Format3 { input_coverages, .. } => {
                input_coverages.first().map(|c| c.digest()).unwrap_or_default()
            }
        }
    }

    /// `backtrack` is the reversed sequence of already-filtered glyphs
    /// preceding the cursor (`backtrack[0]` immediately precedes it);
    /// `window[0]` is the current glyph and `window[1..]` the following
    /// filtered glyphs (covers both input tail and lookahead).
    pub fn apply(&self, backtrack: &[u16], window: &[u16]) -> Option<SubstApply> {
        match self {
            ChainedContextSubst::Format1 { coverage, rule_sets } => {
                let idx = coverage.get(window[0])?;
                let rules = rule_sets.get(idx as usize)?;
                for rule in rules {
                    if matches_glyph_sequence(&rule.backtrack, backtrack)
                        && matches_glyph_sequence(&rule.input, &window[1..])
                        && matches_glyph_sequence(&rule.lookahead, &window[1 + rule.input.len()..])
                    {
                        return Some(SubstApply::Context {
                            lookup_records: rule.lookup_records.clone(),
                            input_len: rule.input.len() + 1,
                        });
                    }
                }
                None
            }
            ChainedContextSubst::Format2 {
                coverage,
                backtrack_class_def,
                input_class_def,
                lookahead_class_def,
                rule_sets,
            } => {
                coverage.get(window[0])?;
                let class = input_class_def.get(window[0]);
                let rules = rule_sets.get(class as usize)?;
                for rule in rules {
                    let bt: Vec<u16> = backtrack.iter().take(rule.backtrack.len()).map(|&g| backtrack_class_def.get(g)).collect();
                    let input: Vec<u16> =
                        window[1..].iter().take(rule.input.len()).map(|&g| input_class_def.get(g)).collect();
                    let la: Vec<u16> = window[1 + rule.input.len()..]
                        .iter()
                        .take(rule.lookahead.len())
                        .map(|&g| lookahead_class_def.get(g))
                        .collect();
                    if bt.len() == rule.backtrack.len()
                        && bt == rule.backtrack
                        && input.len() == rule.input.len()
                        && input == rule.input
                        && la.len() == rule.lookahead.len()
                        && la == rule.lookahead
                    {
                        return Some(SubstApply::Context {
                            lookup_records: rule.lookup_records.clone(),
                            input_len: rule.input.len() + 1,
                        });
                    }
                }
                None
            }
            ChainedContextSubst::Format3 { backtrack_coverages, input_coverages, lookahead_coverages, lookup_records } => {
                if window.len() < input_coverages.len() + lookahead_coverages.len() {
                    return None;
                }
                if backtrack.len() < backtrack_coverages.len() {
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
                Some(SubstApply::Context {
                    lookup_records: lookup_records.clone(),
                    input_len: input_coverages.len(),
                })
            }
        }
    }
}

fn parse_chained_rule_sets(r: &Reader, set_offsets: &[usize]) -> Result<Vec<Vec<ChainedRule>>, FontParseError> {
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
            rules.push(ChainedRule { backtrack, input, lookahead, lookup_records });
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

pub struct ReverseChainSingleSubst {
    pub coverage: Coverage,
    pub backtrack_coverages: Vec<Coverage>,
    pub lookahead_coverages: Vec<Coverage>,
    pub substitutes: Vec<u16>,
}

impl ReverseChainSingleSubst {
    fn parse(r: &Reader) -> Result<Self, FontParseError> {
        let mut r = r.slice_from(0)?;
        let _format = r.read_u16()?;
        let coverage_offset = r.read_u16()?;
        let backtrack_coverages = parse_coverage_array(&mut r)?;
        let lookahead_coverages = parse_coverage_array(&mut r)?;
        let subst_count = r.read_u16()? as usize;
        let mut substitutes = Vec::with_capacity(subst_count);
        for _ in 0..subst_count {
            substitutes.push(r.read_u16()?);
        }
        let coverage = Coverage::parse(&r.slice_from(coverage_offset as usize)?)?;
        Ok(ReverseChainSingleSubst { coverage, backtrack_coverages, lookahead_coverages, substitutes })
    }

    /// `backtrack` reversed (immediately preceding glyph first), `lookahead`
    /// forward, both already flag-filtered by the engine.
    pub fn apply(&self, glyph: u16, backtrack: &[u16], lookahead: &[u16]) -> Option<u16> {
        let idx = self.coverage.get(glyph)?;
        if backtrack.len() < self.backtrack_coverages.len() || lookahead.len() < self.lookahead_coverages.len() {
            return None;
        }
        for (g, cov) in backtrack.iter().zip(self.backtrack_coverages.iter()) {
            cov.get(*g)?;
        }
        for (g, cov) in lookahead.iter().zip(self.lookahead_coverages.iter()) {
            cov.get(*g)?;
        }
        self.substitutes.get(idx as usize).copied()
    }
}
