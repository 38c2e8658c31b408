//! Parsed-novel entities (spec §3 "Chapter"/"Scene (parsed)"; grounded on
//! `original_source/agents/novel_parser/models.py`).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::character::{CharacterAppearance, CharacterInfo};

/// A scene's narrative payload is either a block of narration or a single
/// line of dialogue (spec §9: "closed sum type"), not a free-form tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Narration,
    Dialogue,
}

/// A single parsed scene (spec §3). Invariant: `content_type = Dialogue`
/// implies `speaker` and `dialogue_text` are present; `Narration` implies
/// `narration` is present. Enforced by the parser stage's validation, not
/// by the type itself (the parser LLM's raw JSON doesn't guarantee it).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub scene_id: u32,
    pub chapter_id: u32,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub characters: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub atmosphere: String,
    #[serde(default)]
    pub lighting: String,
    pub content_type: ContentType,
    #[serde(default)]
    pub narration: Option<String>,
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub dialogue_text: Option<String>,
    #[serde(default)]
    pub action: Vec<String>,
    #[serde(default)]
    pub character_appearances: HashMap<String, CharacterAppearance>,
}

impl Scene {
    /// The text that will become this scene's audio track (spec §4.6
    /// "Audio"): the narration block, or the single dialogue line.
    pub fn audio_text(&self) -> &str {
        match self.content_type {
            ContentType::Narration => self.narration.as_deref().unwrap_or(""),
            ContentType::Dialogue => self.dialogue_text.as_deref().unwrap_or(""),
        }
    }
}

/// A chapter-level plot beat, carried through merge offsets alongside
/// scenes (spec §4.5 step 2: "Update plot_point.scene_id with the new
/// offsets").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotPoint {
    pub scene_id: u32,
    #[serde(default)]
    pub description: String,
}

/// An ordered, non-empty sequence of scenes (spec §3, GLOSSARY).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    pub chapter_id: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub scenes: Vec<Scene>,
}

/// The Parser Stage's public result (spec §4.5 "parse(...) →
/// NovelParseResult").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NovelParseResult {
    pub characters: Vec<CharacterInfo>,
    pub chapters: Vec<Chapter>,
    pub plot_points: Vec<PlotPoint>,
}

impl NovelParseResult {
    pub fn total_scenes(&self) -> usize {
        self.chapters.iter().map(|c| c.scenes.len()).sum()
    }
}
