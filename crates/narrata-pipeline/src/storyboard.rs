//! Storyboard Stage (spec §4.6). Grounded on
//! `original_source/agents/storyboard/agent.py::_enhance_scene`/
//! `_calculate_duration`/`_enhance_image_prompt`, reimplemented as a pure
//! function: the original's LLM-based design call is dropped, per the
//! redesign this system calls for (no provider field, no network I/O).

use std::collections::HashMap;

use narrata_models::{
    AudioContentType, AudioInfo, Chapter, CharacterInfo, ContentType, ImageRenderInfo,
    NovelParseResult, Scene, StoryboardChapter, StoryboardResult, StoryboardScene,
};

use crate::config::PipelineConfig;

/// Build the full storyboard for a parsed novel (spec §4.6 "create(parsed,
/// options) → StoryboardResult"). Pure function: identical input always
/// produces identical output.
pub fn create(parsed: &NovelParseResult, config: &PipelineConfig) -> StoryboardResult {
    let characters: HashMap<&str, &CharacterInfo> =
        parsed.characters.iter().map(|c| (c.name.as_str(), c)).collect();

    let chapters: Vec<StoryboardChapter> = parsed
        .chapters
        .iter()
        .map(|chapter| build_chapter(chapter, &characters, config))
        .collect();

    let total_scenes = chapters.iter().map(|c| c.scenes.len()).sum();
    let total_duration = chapters
        .iter()
        .flat_map(|c| c.scenes.iter())
        .map(|s| s.duration)
        .sum();

    StoryboardResult {
        chapters,
        total_duration,
        total_scenes,
    }
}

fn build_chapter(
    chapter: &Chapter,
    characters: &HashMap<&str, &CharacterInfo>,
    config: &PipelineConfig,
) -> StoryboardChapter {
    StoryboardChapter {
        chapter_id: chapter.chapter_id,
        title: chapter.title.clone(),
        summary: chapter.summary.clone(),
        scenes: chapter
            .scenes
            .iter()
            .map(|scene| build_scene(scene, characters, config))
            .collect(),
    }
}

fn build_scene(
    scene: &Scene,
    characters: &HashMap<&str, &CharacterInfo>,
    config: &PipelineConfig,
) -> StoryboardScene {
    let audio = build_audio(scene);
    let image = build_image(scene, config);
    let duration = compute_duration(&audio.text, scene.action.len(), config);

    let rendered_characters = scene
        .characters
        .iter()
        .filter_map(|name| {
            let character = characters.get(name.as_str())?;
            let delta = scene.character_appearances.get(name.as_str());
            Some(narrata_models::CharacterRenderInfo::denormalize(character, delta))
        })
        .collect();

    StoryboardScene {
        scene_id: scene.scene_id,
        chapter_id: scene.chapter_id,
        location: scene.location.clone(),
        time: scene.time.clone(),
        atmosphere: scene.atmosphere.clone(),
        description: scene.description.clone(),
        characters: rendered_characters,
        audio,
        image,
        duration,
    }
}

/// Narration gets a fixed `"narrator"` speaker; dialogue keeps its own
/// speaker (spec §4.6 "Audio").
fn build_audio(scene: &Scene) -> AudioInfo {
    match scene.content_type {
        ContentType::Narration => AudioInfo {
            content_type: AudioContentType::Narration,
            speaker: "narrator".to_string(),
            text: scene.narration.clone().unwrap_or_default(),
            estimated_duration: 0.0,
        },
        ContentType::Dialogue => AudioInfo {
            content_type: AudioContentType::Dialogue,
            speaker: scene.speaker.clone().unwrap_or_default(),
            text: scene.dialogue_text.clone().unwrap_or_default(),
            estimated_duration: 0.0,
        },
    }
}

/// Synthesize an image prompt from scene description/location/time/
/// atmosphere plus style tags; fill in the fixed defaults for the rest
/// (spec §4.6 "Image").
fn build_image(scene: &Scene, config: &PipelineConfig) -> ImageRenderInfo {
    let mut parts = Vec::new();
    if !scene.description.is_empty() {
        parts.push(scene.description.clone());
    }
    if !scene.location.is_empty() {
        parts.push(format!("at {}", scene.location));
    }
    if !scene.time.is_empty() {
        parts.push(format!("during {}", scene.time));
    }
    if !scene.atmosphere.is_empty() {
        parts.push(format!("{} atmosphere", scene.atmosphere));
    }
    parts.extend(config.default_style_tags.iter().cloned());

    ImageRenderInfo {
        prompt: parts.join(", "),
        style_tags: config.default_style_tags.clone(),
        ..ImageRenderInfo::default()
    }
}

/// `d = len(text)/dialogue_chars_per_second + action_count * action_duration`,
/// clamped to `[min_scene_duration, max_scene_duration]`, rounded to 0.1s
/// (spec §4.6 "Duration").
fn compute_duration(text: &str, action_count: usize, config: &PipelineConfig) -> f64 {
    let speech = text.chars().count() as f64 / config.dialogue_chars_per_second;
    let action = action_count as f64 * config.action_duration;
    let raw = speech + action;
    let clamped = raw.clamp(config.min_scene_duration, config.max_scene_duration);
    (clamped * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use narrata_models::CharacterAppearance;
    use std::collections::HashMap as StdHashMap;

    fn narration_scene(text: &str, actions: usize) -> Scene {
        Scene {
            scene_id: 1,
            chapter_id: 1,
            location: "a forest".to_string(),
            time: "dusk".to_string(),
            characters: vec![],
            description: "leaves rustle".to_string(),
            atmosphere: "tense".to_string(),
            lighting: String::new(),
            content_type: ContentType::Narration,
            narration: Some(text.to_string()),
            speaker: None,
            dialogue_text: None,
            action: vec!["x".to_string(); actions],
            character_appearances: StdHashMap::new(),
        }
    }

    #[test]
    fn duration_clamps_to_min_for_short_text() {
        let config = PipelineConfig::default();
        let d = compute_duration("hi", 0, &config);
        assert_eq!(d, config.min_scene_duration);
    }

    #[test]
    fn duration_clamps_to_max_for_long_text() {
        let config = PipelineConfig::default();
        let d = compute_duration(&"a".repeat(1000), 0, &config);
        assert_eq!(d, config.max_scene_duration);
    }

    #[test]
    fn duration_includes_action_count_and_rounds_to_tenth() {
        let config = PipelineConfig::default();
        // 12 chars / 3 cps = 4.0s + 1 action * 1.5s = 5.5s, within range.
        let d = compute_duration("abcdefghijkl", 1, &config);
        assert_eq!(d, 5.5);
    }

    #[test]
    fn narration_audio_uses_narrator_speaker() {
        let scene = narration_scene("Once upon a time.", 0);
        let audio = build_audio(&scene);
        assert_eq!(audio.speaker, "narrator");
        assert_eq!(audio.text, "Once upon a time.");
    }

    #[test]
    fn dialogue_audio_uses_scene_speaker() {
        let mut scene = narration_scene("", 0);
        scene.content_type = ContentType::Dialogue;
        scene.narration = None;
        scene.speaker = Some("Rin".to_string());
        scene.dialogue_text = Some("Wait!".to_string());

        let audio = build_audio(&scene);
        assert_eq!(audio.speaker, "Rin");
        assert_eq!(audio.text, "Wait!");
    }

    #[test]
    fn character_appearance_delta_overrides_project_fields() {
        let mut character = CharacterInfo {
            name: "Rin".to_string(),
            ..Default::default()
        };
        character.appearance.hair = "black".to_string();

        let mut scene = narration_scene("text", 0);
        scene.characters = vec!["Rin".to_string()];
        let mut delta = CharacterAppearance::default();
        delta.hair = "silver, newly dyed".to_string();
        scene.character_appearances.insert("Rin".to_string(), delta);

        let mut characters = HashMap::new();
        characters.insert("Rin", &character);

        let config = PipelineConfig::default();
        let storyboard_scene = build_scene(&scene, &characters, &config);
        assert_eq!(storyboard_scene.characters[0].hair, "silver, newly dyed");
    }

    #[test]
    fn create_sums_durations_and_counts_scenes() {
        let parsed = NovelParseResult {
            characters: vec![],
            chapters: vec![Chapter {
                chapter_id: 1,
                title: String::new(),
                summary: String::new(),
                scenes: vec![narration_scene("hi", 0), narration_scene("hi", 0)],
            }],
            plot_points: vec![],
        };
        let config = PipelineConfig::default();
        let result = create(&parsed, &config);
        assert_eq!(result.total_scenes, 2);
        assert_eq!(result.total_duration, config.min_scene_duration * 2.0);
    }
}
