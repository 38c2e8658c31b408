//! Render/compose results (spec §3 "RenderedScene"/"RenderedChapter /
//! RenderResult").

use serde::{Deserialize, Serialize};

/// A scene for which both media files exist on disk (GLOSSARY). Invariant:
/// `duration >= audio_duration` (spec §8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedScene {
    pub scene_id: u32,
    pub chapter_id: u32,
    pub image_path: String,
    pub audio_path: String,
    pub duration: f64,
    pub audio_duration: f64,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedChapter {
    pub chapter_id: u32,
    pub title: String,
    pub scenes: Vec<RenderedScene>,
}

/// The Scene Renderer's public result (spec §4.7 "render(...) →
/// RenderResult").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderResult {
    pub chapters: Vec<RenderedChapter>,
    pub total_scenes: usize,
    pub total_chapters: usize,
    /// Populated once the Composer finishes (spec §4.8); absent mid-render.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

impl RenderResult {
    pub fn new(chapters: Vec<RenderedChapter>) -> Self {
        let total_scenes = chapters.iter().map(|c| c.scenes.len()).sum();
        let total_chapters = chapters.len();
        Self {
            chapters,
            total_scenes,
            total_chapters,
            video_path: None,
            duration: None,
            file_size: None,
        }
    }
}
