//! Shape plan resolution: script/language → ordered lookup list.

pub mod cache;

use std::collections::BTreeSet;

use crate::font::layout_common::{FeatureList, ScriptList};
use crate::tag::Tag;

/// A single feature the caller asked to turn on or off, e.g. `+liga` or
/// `-kern`.
#[derive(Debug, Clone, Copy)]
pub struct FeatureSetting {
    pub tag: Tag,
    pub enabled: bool,
}

/// The resolved, ordered set of lookups a shape call will run for one
/// script/language/feature combination. Lookup indices run in ascending
/// lookup-list order (not feature order) since a glyph produced by an
/// earlier feature must still be visible to a later lookup that targets it.
#[derive(Debug, Clone, Default)]
pub struct ShapePlan {
    pub gsub_lookup_indices: Vec<u16>,
    pub gpos_lookup_indices: Vec<u16>,
}

impl ShapePlan {
    pub fn resolve(
        script: Tag,
        language: Option<Tag>,
        features: &[FeatureSetting],
        gsub: Option<(&ScriptList, &FeatureList)>,
        gpos: Option<(&ScriptList, &FeatureList)>,
    ) -> Self {
        ShapePlan {
            gsub_lookup_indices: gsub.map(|(s, f)| resolve_lookups(s, f, script, language, features)).unwrap_or_default(),
            gpos_lookup_indices: gpos.map(|(s, f)| resolve_lookups(s, f, script, language, features)).unwrap_or_default(),
        }
    }
}

fn resolve_lookups(
    scripts: &ScriptList,
    features: &FeatureList,
    script: Tag,
    language: Option<Tag>,
    settings: &[FeatureSetting],
) -> Vec<u16> {
    let Some(script_entry) = scripts.find_script(script) else { return Vec::new() };
    let Some(lang_sys) = script_entry.find_lang_sys(language) else { return Vec::new() };

    let mut feature_indices: Vec<u16> = lang_sys.required_feature_index.into_iter().collect();
    feature_indices.extend(lang_sys.feature_indices.iter().copied());

    let mut lookup_indices = BTreeSet::new();
    for idx in feature_indices {
        let Some(feature) = features.get(idx) else { continue };
        if let Some(setting) = settings.iter().find(|s| s.tag == feature.tag) {
            if !setting.enabled {
                continue;
            }
        }
        lookup_indices.extend(feature.lookup_indices.iter().copied());
    }

    lookup_indices.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::layout_common::{Feature, LangSys, Script};

    fn script_list_with_one_feature() -> (ScriptList, FeatureList) {
        let lang_sys = LangSys { required_feature_index: None, feature_indices: vec![0] };
        let script = Script { default_lang_sys: Some(lang_sys), lang_sys: Vec::new() };
        let scripts = ScriptList { scripts: vec![(Tag::LATN, script)] };
        let features = FeatureList { features: vec![Feature { tag: Tag::new(*b"liga"), lookup_indices: vec![2, 5] }] };
        (scripts, features)
    }

    #[test]
    fn resolves_default_lang_sys_lookups_sorted() {
        let (scripts, features) = script_list_with_one_feature();
        let lookups = resolve_lookups(&scripts, &features, Tag::LATN, None, &[]);
        assert_eq!(lookups, vec![2, 5]);
    }

    #[test]
    fn disabling_a_feature_drops_its_lookups() {
        let (scripts, features) = script_list_with_one_feature();
        let settings = [FeatureSetting { tag: Tag::new(*b"liga"), enabled: false }];
        let lookups = resolve_lookups(&scripts, &features, Tag::LATN, None, &settings);
        assert!(lookups.is_empty());
    }

    #[test]
    fn unknown_script_falls_back_to_dflt() {
        let lang_sys = LangSys { required_feature_index: None, feature_indices: vec![0] };
        let script = Script { default_lang_sys: Some(lang_sys), lang_sys: Vec::new() };
        let scripts = ScriptList { scripts: vec![(Tag::DFLT, script)] };
        let features = FeatureList { features: vec![Feature { tag: Tag::new(*b"liga"), lookup_indices: vec![1] }] };
        let lookups = resolve_lookups(&scripts, &features, Tag::ARAB, None, &[]);
        assert_eq!(lookups, vec![1]);
    }
}
