//! Voice catalog and selection (spec §4.7 "Voice selection"). Grounded on
//! `original_source/agents/voice_synthesizer/agent.py::_select_voice_type`,
//! generalized from the source's gender-only two-entry table to the
//! spec's `(gender, age_category)` catalog of ~28 entries.

use std::collections::HashMap;

use narrata_models::CharacterRenderInfo;

/// Coarse age bracket derived from a character's numeric age or
/// `age_stage` keyword (spec §4.7 step 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgeCategory {
    Child,
    Young,
    Adult,
    Elder,
}

impl AgeCategory {
    fn from_age(age: u32) -> Self {
        if age < 12 {
            AgeCategory::Child
        } else if age < 25 {
            AgeCategory::Young
        } else if age < 60 {
            AgeCategory::Adult
        } else {
            AgeCategory::Elder
        }
    }

    /// Keyword match against a free-form `age_stage` string (spec §4.7:
    /// "by keyword match on `age_stage` string against a built-in keyword
    /// map, defaulting to `adult`").
    fn from_stage_keyword(stage: &str) -> Self {
        let stage = stage.to_lowercase();
        const CHILD_KEYWORDS: [&str; 5] = ["child", "kid", "toddler", "infant", "boy"];
        const YOUNG_KEYWORDS: [&str; 5] = ["young", "teen", "youth", "adolescent", "girl"];
        const ELDER_KEYWORDS: [&str; 5] = ["elder", "elderly", "old", "senior", "aged"];

        if CHILD_KEYWORDS.iter().any(|k| stage.contains(k)) {
            AgeCategory::Child
        } else if ELDER_KEYWORDS.iter().any(|k| stage.contains(k)) {
            AgeCategory::Elder
        } else if YOUNG_KEYWORDS.iter().any(|k| stage.contains(k)) {
            AgeCategory::Young
        } else {
            AgeCategory::Adult
        }
    }

    /// Derive the category for a character: numeric age wins when present,
    /// otherwise fall back to the `age_stage` keyword map, otherwise adult
    /// (spec §4.7 step 2).
    pub fn derive(age: Option<u32>, age_stage: &str) -> Self {
        match age {
            Some(age) => Self::from_age(age),
            None if !age_stage.is_empty() => Self::from_stage_keyword(age_stage),
            None => AgeCategory::Adult,
        }
    }
}

/// One catalog entry: a voice type for a `(gender, age_category)` pair.
#[derive(Debug, Clone, Copy)]
struct VoiceEntry {
    gender: &'static str,
    age: AgeCategory,
    voice_type: &'static str,
}

/// The built-in voice catalog (spec §4.7: "≈28 entries"). Each entry names
/// an opaque voice type accepted by the TTS provider (spec GLOSSARY).
const CATALOG: &[VoiceEntry] = &[
    VoiceEntry { gender: "male", age: AgeCategory::Child, voice_type: "male_child_01" },
    VoiceEntry { gender: "male", age: AgeCategory::Child, voice_type: "male_child_02" },
    VoiceEntry { gender: "male", age: AgeCategory::Young, voice_type: "male_young_01" },
    VoiceEntry { gender: "male", age: AgeCategory::Young, voice_type: "male_young_02" },
    VoiceEntry { gender: "male", age: AgeCategory::Young, voice_type: "male_young_03" },
    VoiceEntry { gender: "male", age: AgeCategory::Adult, voice_type: "male_adult_01" },
    VoiceEntry { gender: "male", age: AgeCategory::Adult, voice_type: "male_adult_02" },
    VoiceEntry { gender: "male", age: AgeCategory::Adult, voice_type: "male_adult_03" },
    VoiceEntry { gender: "male", age: AgeCategory::Adult, voice_type: "male_adult_04" },
    VoiceEntry { gender: "male", age: AgeCategory::Elder, voice_type: "male_elder_01" },
    VoiceEntry { gender: "male", age: AgeCategory::Elder, voice_type: "male_elder_02" },
    VoiceEntry { gender: "female", age: AgeCategory::Child, voice_type: "female_child_01" },
    VoiceEntry { gender: "female", age: AgeCategory::Child, voice_type: "female_child_02" },
    VoiceEntry { gender: "female", age: AgeCategory::Young, voice_type: "female_young_01" },
    VoiceEntry { gender: "female", age: AgeCategory::Young, voice_type: "female_young_02" },
    VoiceEntry { gender: "female", age: AgeCategory::Young, voice_type: "female_young_03" },
    VoiceEntry { gender: "female", age: AgeCategory::Adult, voice_type: "female_adult_01" },
    VoiceEntry { gender: "female", age: AgeCategory::Adult, voice_type: "female_adult_02" },
    VoiceEntry { gender: "female", age: AgeCategory::Adult, voice_type: "female_adult_03" },
    VoiceEntry { gender: "female", age: AgeCategory::Adult, voice_type: "female_adult_04" },
    VoiceEntry { gender: "female", age: AgeCategory::Elder, voice_type: "female_elder_01" },
    VoiceEntry { gender: "female", age: AgeCategory::Elder, voice_type: "female_elder_02" },
    VoiceEntry { gender: "nonbinary", age: AgeCategory::Child, voice_type: "nb_child_01" },
    VoiceEntry { gender: "nonbinary", age: AgeCategory::Young, voice_type: "nb_young_01" },
    VoiceEntry { gender: "nonbinary", age: AgeCategory::Young, voice_type: "nb_young_02" },
    VoiceEntry { gender: "nonbinary", age: AgeCategory::Adult, voice_type: "nb_adult_01" },
    VoiceEntry { gender: "nonbinary", age: AgeCategory::Adult, voice_type: "nb_adult_02" },
    VoiceEntry { gender: "nonbinary", age: AgeCategory::Elder, voice_type: "nb_elder_01" },
];

/// Pick a voice type for a dialogue character (spec §4.7 steps 2-3):
/// exact `(gender, age_category)` match first, then gender-only, then
/// `default_voice_type`.
pub fn select_voice_for_character(character: &CharacterRenderInfo, default_voice_type: &str) -> String {
    let gender = normalize_gender(&character.gender);
    let age = AgeCategory::derive(character.age, &character.age_stage);

    if let Some(entry) = CATALOG.iter().find(|e| e.gender == gender && e.age == age) {
        return entry.voice_type.to_string();
    }
    if let Some(entry) = CATALOG.iter().find(|e| e.gender == gender) {
        return entry.voice_type.to_string();
    }
    default_voice_type.to_string()
}

fn normalize_gender(gender: &str) -> &'static str {
    match gender.to_lowercase().as_str() {
        "male" | "m" | "man" | "boy" => "male",
        "female" | "f" | "woman" | "girl" => "female",
        _ => "nonbinary",
    }
}

/// Per-task cache mapping a character's name to the voice type assigned on
/// their first dialogue scene (spec §4.7 "Maintain a per-task cache
/// `character_name -> voice_type`"). Task-local, owned by the Scene
/// Renderer for the duration of one `render` call (spec §5 "Voice cache
/// in C7 is task-local").
#[derive(Debug, Default)]
pub struct VoiceCache {
    assigned: HashMap<String, String>,
}

impl VoiceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve (and memoize) the voice type for `character`. Subsequent
    /// calls for the same name return the cached value, so a character
    /// speaks with the same voice across every scene in the task.
    pub fn voice_for(&mut self, character: &CharacterRenderInfo, default_voice_type: &str) -> String {
        self.assigned
            .entry(character.name.clone())
            .or_insert_with(|| select_voice_for_character(character, default_voice_type))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn character(gender: &str, age: Option<u32>, age_stage: &str) -> CharacterRenderInfo {
        CharacterRenderInfo {
            name: "Aiko".to_string(),
            gender: gender.to_string(),
            age,
            age_stage: age_stage.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn exact_gender_age_match_wins() {
        let c = character("female", Some(8), "");
        let voice = select_voice_for_character(&c, "fallback");
        assert_eq!(voice, "female_child_01");
    }

    #[test]
    fn age_stage_keyword_drives_category_when_age_absent() {
        let c = character("male", None, "a wizened elder");
        let voice = select_voice_for_character(&c, "fallback");
        assert_eq!(voice, "male_elder_01");
    }

    #[test]
    fn unrecognized_gender_string_normalizes_to_nonbinary_bucket() {
        let c = character("alien", Some(30), "");
        let voice = select_voice_for_character(&c, "fallback_voice");
        assert_eq!(voice, "nb_adult_01");
    }

    #[test]
    fn empty_gender_and_age_use_default_voice_type_only_if_catalog_has_no_bucket() {
        // The catalog covers every (gender-bucket, age-category) pair, so the
        // final `default_voice_type` fallback is a safety net for a catalog
        // that hasn't been fully populated yet, not a reachable path today.
        let c = character("", None, "");
        let voice = select_voice_for_character(&c, "fallback_voice");
        assert_eq!(voice, "nb_adult_01");
    }

    #[test]
    fn voice_cache_is_idempotent_per_character() {
        let mut cache = VoiceCache::new();
        let c = character("female", Some(30), "");
        let first = cache.voice_for(&c, "fallback");
        let second = cache.voice_for(&c, "fallback");
        assert_eq!(first, second);
    }
}
