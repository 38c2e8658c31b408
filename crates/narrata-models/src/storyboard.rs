//! Storyboard entities (spec §3 "StoryboardScene"; grounded on
//! `original_source/agents/storyboard/models.py`).

use serde::{Deserialize, Serialize};

use crate::character::CharacterRenderInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioContentType {
    Narration,
    Dialogue,
}

/// One audio track per scene (spec §4.6 "Audio").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioInfo {
    #[serde(rename = "type")]
    pub content_type: AudioContentType,
    #[serde(default)]
    pub speaker: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub estimated_duration: f64,
}

/// One image plan per scene (spec §4.6 "Image").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRenderInfo {
    #[serde(default)]
    pub prompt: String,
    #[serde(default = "default_negative_prompt")]
    pub negative_prompt: String,
    #[serde(default = "default_style_tags")]
    pub style_tags: Vec<String>,
    #[serde(default = "default_shot_type")]
    pub shot_type: String,
    #[serde(default = "default_camera_angle")]
    pub camera_angle: String,
    #[serde(default = "default_composition")]
    pub composition: String,
    #[serde(default = "default_lighting")]
    pub lighting: String,
}

fn default_negative_prompt() -> String {
    "low quality, blurry".to_string()
}
fn default_style_tags() -> Vec<String> {
    vec!["anime".to_string()]
}
fn default_shot_type() -> String {
    "medium_shot".to_string()
}
fn default_camera_angle() -> String {
    "eye_level".to_string()
}
fn default_composition() -> String {
    "centered".to_string()
}
fn default_lighting() -> String {
    "natural".to_string()
}

impl Default for ImageRenderInfo {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            negative_prompt: default_negative_prompt(),
            style_tags: default_style_tags(),
            shot_type: default_shot_type(),
            camera_angle: default_camera_angle(),
            composition: default_composition(),
            lighting: default_lighting(),
        }
    }
}

/// A rendering plan for one scene (spec §3). `duration` is clamped to
/// `[min_scene_duration, max_scene_duration]` by the storyboard stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryboardScene {
    pub scene_id: u32,
    pub chapter_id: u32,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub atmosphere: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub characters: Vec<CharacterRenderInfo>,
    pub audio: AudioInfo,
    #[serde(default)]
    pub image: ImageRenderInfo,
    #[serde(default = "default_duration")]
    pub duration: f64,
}

fn default_duration() -> f64 {
    3.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryboardChapter {
    pub chapter_id: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub scenes: Vec<StoryboardScene>,
}

/// The Storyboard Stage's public result (spec §4.6 "create(...) →
/// StoryboardResult").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoryboardResult {
    pub chapters: Vec<StoryboardChapter>,
    pub total_duration: f64,
    pub total_scenes: usize,
}
