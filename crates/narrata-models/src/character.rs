//! Character entities (spec §3 "CharacterInfo"; grounded on
//! `original_source/agents/novel_parser/models.py::CharacterInfo` and
//! `agents/storyboard/models.py::CharacterRenderInfo`).

use serde::{Deserialize, Serialize};

/// Physical appearance attributes. All fields are free-form strings sourced
/// from the parser LLM; empty string means "unknown", not "absent", so that
/// the merge algorithm (spec §4.5 step 4) can compare lengths uniformly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CharacterAppearance {
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub age_stage: String,
    #[serde(default)]
    pub hair: String,
    #[serde(default)]
    pub eyes: String,
    #[serde(default)]
    pub clothing: String,
    #[serde(default)]
    pub features: String,
    #[serde(default)]
    pub body_type: String,
    #[serde(default)]
    pub height: String,
    #[serde(default)]
    pub skin: String,
}

impl CharacterAppearance {
    /// Iterate the string-valued fields as `(field_name, value)` pairs, used
    /// by the merge algorithm's "keep the longest non-empty value" rule.
    pub fn string_fields(&self) -> [(&'static str, &str); 7] {
        [
            ("hair", &self.hair),
            ("eyes", &self.eyes),
            ("clothing", &self.clothing),
            ("features", &self.features),
            ("body_type", &self.body_type),
            ("height", &self.height),
            ("skin", &self.skin),
        ]
    }

    pub fn set_field(&mut self, name: &str, value: String) {
        match name {
            "hair" => self.hair = value,
            "eyes" => self.eyes = value,
            "clothing" => self.clothing = value,
            "features" => self.features = value,
            "body_type" => self.body_type = value,
            "height" => self.height = value,
            "skin" => self.skin = value,
            "gender" => self.gender = value,
            "age_stage" => self.age_stage = value,
            _ => {}
        }
    }

    pub fn field(&self, name: &str) -> &str {
        match name {
            "hair" => &self.hair,
            "eyes" => &self.eyes,
            "clothing" => &self.clothing,
            "features" => &self.features,
            "body_type" => &self.body_type,
            "height" => &self.height,
            "skin" => &self.skin,
            "gender" => &self.gender,
            "age_stage" => &self.age_stage,
            _ => "",
        }
    }
}

/// A character extracted by the parser stage (spec §3). `name` is the merge
/// key across chunks and must be unique per task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CharacterInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub appearance: CharacterAppearance,
    #[serde(default)]
    pub personality: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub age_variants: Vec<String>,
}

/// Per-scene denormalized rendering info for one character, copied forward
/// at storyboard time (spec §3 "StoryboardScene", §4.6 "Character
/// denormalization"). Field list grounded on
/// `original_source/agents/storyboard/models.py::CharacterRenderInfo`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CharacterRenderInfo {
    pub name: String,
    #[serde(default = "default_gender")]
    pub gender: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub age_stage: String,
    #[serde(default)]
    pub hair: String,
    #[serde(default)]
    pub eyes: String,
    #[serde(default)]
    pub clothing: String,
    #[serde(default)]
    pub features: String,
    #[serde(default)]
    pub body_type: String,
    #[serde(default)]
    pub height: String,
    #[serde(default)]
    pub skin: String,
    #[serde(default)]
    pub personality: String,
    #[serde(default)]
    pub role: String,
}

fn default_gender() -> String {
    "unknown".to_string()
}

impl CharacterRenderInfo {
    /// Build the denormalized render info for `name`, overriding
    /// project-level `character` fields with any non-empty value present in
    /// the scene-local `delta` (spec §4.6: "scene-local character_appearances
    /// override project-level character info field-by-field, non-empty
    /// wins").
    pub fn denormalize(character: &CharacterInfo, delta: Option<&CharacterAppearance>) -> Self {
        let mut info = Self {
            name: character.name.clone(),
            gender: non_empty_or(&character.appearance.gender, default_gender()),
            age: character.appearance.age,
            age_stage: character.appearance.age_stage.clone(),
            hair: character.appearance.hair.clone(),
            eyes: character.appearance.eyes.clone(),
            clothing: character.appearance.clothing.clone(),
            features: character.appearance.features.clone(),
            body_type: character.appearance.body_type.clone(),
            height: character.appearance.height.clone(),
            skin: character.appearance.skin.clone(),
            personality: character.personality.clone(),
            role: character.role.clone(),
        };

        if let Some(delta) = delta {
            if !delta.gender.is_empty() {
                info.gender = delta.gender.clone();
            }
            if delta.age.is_some() {
                info.age = delta.age;
            }
            if !delta.age_stage.is_empty() {
                info.age_stage = delta.age_stage.clone();
            }
            if !delta.hair.is_empty() {
                info.hair = delta.hair.clone();
            }
            if !delta.eyes.is_empty() {
                info.eyes = delta.eyes.clone();
            }
            if !delta.clothing.is_empty() {
                info.clothing = delta.clothing.clone();
            }
            if !delta.features.is_empty() {
                info.features = delta.features.clone();
            }
            if !delta.body_type.is_empty() {
                info.body_type = delta.body_type.clone();
            }
            if !delta.height.is_empty() {
                info.height = delta.height.clone();
            }
            if !delta.skin.is_empty() {
                info.skin = delta.skin.clone();
            }
        }

        info
    }
}

fn non_empty_or(value: &str, fallback: String) -> String {
    if value.is_empty() {
        fallback
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denormalize_without_delta_copies_project_fields() {
        let mut character = CharacterInfo {
            name: "Aiko".to_string(),
            ..Default::default()
        };
        character.appearance.gender = "female".to_string();
        character.appearance.hair = "long black hair".to_string();

        let info = CharacterRenderInfo::denormalize(&character, None);
        assert_eq!(info.gender, "female");
        assert_eq!(info.hair, "long black hair");
    }

    #[test]
    fn denormalize_delta_overrides_non_empty_fields_only() {
        let mut character = CharacterInfo {
            name: "Aiko".to_string(),
            ..Default::default()
        };
        character.appearance.hair = "long black hair".to_string();
        character.appearance.eyes = "brown".to_string();

        let mut delta = CharacterAppearance::default();
        delta.hair = "tied up in a ponytail".to_string();

        let info = CharacterRenderInfo::denormalize(&character, Some(&delta));
        assert_eq!(info.hair, "tied up in a ponytail");
        assert_eq!(info.eyes, "brown");
    }
}
