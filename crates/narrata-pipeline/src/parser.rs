//! Parser Stage (spec §4.5). Grounded on
//! `original_source/agents/novel_parser/agent.py`: `_validate_input`,
//! `_split_text_into_chunks`, `_merge_results`/`_merge_character_occurrences`,
//! and `_create_safe_model`'s drop-the-invalid-entry fallback.

use std::collections::HashMap;

use narrata_models::{Chapter, CharacterInfo, NovelParseResult, PlotPoint, Scene, ValidationError};
use narrata_providers::ParserClient;

use crate::config::PipelineConfig;
use crate::error::PipelineResult;

/// Parse mode (spec §4.5, §6, §9 Open Question 1: both paths share the
/// same chunk/extract/merge machinery — "simple" is chunking with the
/// whole text as a single chunk).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Simple,
    Enhanced,
}

impl ParseMode {
    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "simple" => Some(ParseMode::Simple),
            "enhanced" => Some(ParseMode::Enhanced),
            _ => None,
        }
    }
}

/// Parse `text` into a merged `NovelParseResult` (spec §4.5 "public
/// contract"). `mode` only changes chunking: `Simple` treats the whole
/// input as one chunk, `Enhanced` splits it first — both go through the
/// same per-chunk-extract-then-merge pipeline, so a single-chunk
/// `Enhanced` run is byte-for-byte equivalent to `Simple` (spec §8
/// "Round-trip / idempotence").
pub async fn parse(
    client: &ParserClient,
    text: &str,
    mode: ParseMode,
    config: &PipelineConfig,
) -> PipelineResult<NovelParseResult> {
    validate_input(text, config)?;

    let chunks = match mode {
        ParseMode::Simple => vec![text.to_string()],
        ParseMode::Enhanced => split_into_chunks(text, config.chunk_size),
    };

    let mut chunk_results = Vec::with_capacity(chunks.len());
    for chunk in &chunks {
        let prompt = build_prompt(chunk, config);
        let parsed = client.extract(&prompt).await?;
        chunk_results.push(parsed);
    }

    let merged = merge_chunk_results(chunk_results);
    let merged = fallback_reconstruct(merged);

    validate_output(&merged)?;
    Ok(merged)
}

fn validate_input(text: &str, config: &PipelineConfig) -> Result<(), ValidationError> {
    let len = text.trim().chars().count();
    if len < config.min_text_length {
        return Err(ValidationError::new(format!(
            "novel text too short: {len} characters, minimum {}",
            config.min_text_length
        )));
    }
    if text.chars().count() > config.max_text_length {
        return Err(ValidationError::new(format!(
            "novel text too long: maximum {} characters allowed",
            config.max_text_length
        )));
    }
    Ok(())
}

/// Split `text` on blank-line paragraph boundaries and greedily pack
/// paragraphs into chunks no larger than `chunk_size` code points (spec
/// §4.5 "Chunking"). A paragraph that alone exceeds `chunk_size` is kept
/// intact as its own chunk rather than split further.
fn split_into_chunks(text: &str, chunk_size: usize) -> Vec<String> {
    let paragraphs: Vec<&str> = text.split("\n\n").collect();
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0usize;

    for para in paragraphs {
        let para_len = para.chars().count();
        if current_len + para_len > chunk_size && !current.is_empty() {
            chunks.push(current.join("\n\n"));
            current = vec![para];
            current_len = para_len;
        } else {
            current.push(para);
            current_len += para_len;
        }
    }
    if !current.is_empty() {
        chunks.push(current.join("\n\n"));
    }
    chunks
}

fn build_prompt(chunk: &str, config: &PipelineConfig) -> String {
    format!(
        "Extract structured scene data as a single JSON object with keys \
         `characters`, `chapters`, `plot_points`. At most {} characters and \
         {} scenes total. Text:\n\n{}",
        config.max_characters, config.max_scenes, chunk
    )
}

/// Merge per-chunk results with fresh dense id offsets (spec §4.5 "Merge
/// algorithm" steps 1-5).
fn merge_chunk_results(chunk_results: Vec<NovelParseResult>) -> NovelParseResult {
    let mut scene_offset: u32 = 0;
    let mut chapter_offset: u32 = 0;

    let mut all_chapters: Vec<Chapter> = Vec::new();
    let mut all_plot_points: Vec<PlotPoint> = Vec::new();
    let mut character_buckets: HashMap<String, Vec<CharacterInfo>> = HashMap::new();
    let mut character_order: Vec<String> = Vec::new();

    for chunk in chunk_results {
        for character in chunk.characters {
            if !character_buckets.contains_key(&character.name) {
                character_order.push(character.name.clone());
            }
            character_buckets
                .entry(character.name.clone())
                .or_default()
                .push(character);
        }

        let mut chunk_scene_count = 0u32;
        for mut chapter in chunk.chapters {
            chapter.chapter_id += chapter_offset;
            for mut scene in std::mem::take(&mut chapter.scenes) {
                scene.scene_id = scene_offset + 1;
                scene.chapter_id = chapter.chapter_id;
                scene_offset += 1;
                chunk_scene_count += 1;
                chapter.scenes.push(scene);
            }
            all_chapters.push(chapter);
        }

        for mut plot_point in chunk.plot_points {
            // plot_point.scene_id was chunk-local; shift it by the offset
            // this chunk's scenes started at (spec §4.5 step 2).
            plot_point.scene_id += scene_offset - chunk_scene_count;
            all_plot_points.push(plot_point);
        }

        chapter_offset = all_chapters
            .last()
            .map(|c| c.chapter_id)
            .unwrap_or(chapter_offset);
    }

    let characters = character_order
        .into_iter()
        .map(|name| {
            let occurrences = character_buckets.remove(&name).unwrap_or_default();
            merge_character_occurrences(occurrences)
        })
        .collect();

    NovelParseResult {
        characters,
        chapters: all_chapters,
        plot_points: all_plot_points,
    }
}

/// Merge same-named character occurrences across chunks (spec §4.5 step
/// 4): union descriptions/personalities as space-joined unique sets, keep
/// the longest non-empty value per appearance attribute.
fn merge_character_occurrences(occurrences: Vec<CharacterInfo>) -> CharacterInfo {
    let mut iter = occurrences.into_iter();
    let mut base = match iter.next() {
        Some(first) => first,
        None => return CharacterInfo::default(),
    };

    let mut descriptions = unique_words(&base.description);
    let mut personalities = unique_words(&base.personality);

    for occ in iter {
        descriptions.extend(unique_words(&occ.description));
        personalities.extend(unique_words(&occ.personality));

        for (field, value) in occ.appearance.string_fields() {
            if !value.is_empty() && value.len() > base.appearance.field(field).len() {
                base.appearance.set_field(field, value.to_string());
            }
        }
        if base.appearance.gender.is_empty() && !occ.appearance.gender.is_empty() {
            base.appearance.gender = occ.appearance.gender;
        }
        if base.appearance.age.is_none() {
            base.appearance.age = occ.appearance.age;
        }
        if base.appearance.age_stage.is_empty() && !occ.appearance.age_stage.is_empty() {
            base.appearance.age_stage = occ.appearance.age_stage;
        }
        for variant in occ.age_variants {
            if !base.age_variants.contains(&variant) {
                base.age_variants.push(variant);
            }
        }
    }

    base.description = descriptions.into_iter().collect::<Vec<_>>().join(" ");
    base.personality = personalities.into_iter().collect::<Vec<_>>().join(" ");
    base
}

/// Deduplicated, order-preserving set of whitespace-separated words, used
/// to implement the "space-joined unique sets" merge rule.
fn unique_words(text: &str) -> indexmap_like::OrderedSet {
    let mut set = indexmap_like::OrderedSet::default();
    for word in text.split_whitespace() {
        set.insert(word.to_string());
    }
    set
}

/// Tiny insertion-order-preserving string set, avoiding a dependency on
/// the `indexmap` crate for a single use site.
mod indexmap_like {
    use std::collections::HashSet;

    #[derive(Default)]
    pub struct OrderedSet {
        seen: HashSet<String>,
        order: Vec<String>,
    }

    impl OrderedSet {
        pub fn insert(&mut self, value: String) {
            if self.seen.insert(value.clone()) {
                self.order.push(value);
            }
        }

        pub fn extend(&mut self, other: OrderedSet) {
            for value in other.order {
                self.insert(value);
            }
        }
    }

    impl IntoIterator for OrderedSet {
        type Item = String;
        type IntoIter = std::vec::IntoIter<String>;

        fn into_iter(self) -> Self::IntoIter {
            self.order.into_iter()
        }
    }
}

/// Drop individually malformed characters/scenes/plot-points rather than
/// failing the whole stage (spec §4.5 "Fallback reconstruction"). Scenes
/// are malformed if a dialogue scene lacks `speaker`/`dialogue_text`, or a
/// narration scene lacks `narration`.
fn fallback_reconstruct(mut result: NovelParseResult) -> NovelParseResult {
    result.characters.retain(|c| !c.name.trim().is_empty());

    for chapter in &mut result.chapters {
        chapter.scenes.retain(is_well_formed_scene);
    }
    result.chapters.retain(|c| !c.scenes.is_empty());

    result
}

fn is_well_formed_scene(scene: &Scene) -> bool {
    use narrata_models::ContentType;
    match scene.content_type {
        ContentType::Dialogue => {
            scene.speaker.as_deref().is_some_and(|s| !s.trim().is_empty())
                && scene.dialogue_text.as_deref().is_some_and(|t| !t.trim().is_empty())
        }
        ContentType::Narration => scene
            .narration
            .as_deref()
            .is_some_and(|n| !n.trim().is_empty()),
    }
}

fn validate_output(result: &NovelParseResult) -> Result<(), ValidationError> {
    if result.characters.is_empty() {
        return Err(ValidationError::new("no characters extracted"));
    }
    if result.chapters.is_empty() {
        return Err(ValidationError::new("no chapters extracted"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use narrata_models::{CharacterAppearance, ContentType};

    fn scene(id: u32, chapter_id: u32, content: ContentType) -> Scene {
        Scene {
            scene_id: id,
            chapter_id,
            location: String::new(),
            time: String::new(),
            characters: vec![],
            description: String::new(),
            atmosphere: String::new(),
            lighting: String::new(),
            content_type: content,
            narration: Some("Once upon a time.".to_string()),
            speaker: None,
            dialogue_text: None,
            action: vec![],
            character_appearances: Default::default(),
        }
    }

    #[test]
    fn split_into_chunks_keeps_oversized_paragraph_intact() {
        let huge_para = "x".repeat(5000);
        let text = format!("short one\n\n{huge_para}");
        let chunks = split_into_chunks(&text, 100);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].len(), 5000);
    }

    #[test]
    fn split_into_chunks_packs_small_paragraphs_together() {
        let text = "a\n\nb\n\nc";
        let chunks = split_into_chunks(text, 100);
        assert_eq!(chunks, vec!["a\n\nb\n\nc".to_string()]);
    }

    #[test]
    fn merge_renumbers_scenes_densely_across_chunks() {
        let chunk_a = NovelParseResult {
            characters: vec![],
            chapters: vec![Chapter {
                chapter_id: 1,
                title: "A".to_string(),
                summary: String::new(),
                scenes: vec![scene(1, 1, ContentType::Narration), scene(2, 1, ContentType::Narration)],
            }],
            plot_points: vec![],
        };
        let chunk_b = NovelParseResult {
            characters: vec![],
            chapters: vec![Chapter {
                chapter_id: 1,
                title: "B".to_string(),
                summary: String::new(),
                scenes: vec![scene(1, 1, ContentType::Narration)],
            }],
            plot_points: vec![],
        };

        let merged = merge_chunk_results(vec![chunk_a, chunk_b]);
        let ids: Vec<u32> = merged
            .chapters
            .iter()
            .flat_map(|c| c.scenes.iter().map(|s| s.scene_id))
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(merged.chapters[0].chapter_id, 1);
        assert_eq!(merged.chapters[1].chapter_id, 2);
    }

    #[test]
    fn merge_character_occurrences_keeps_longest_appearance_fields() {
        let mut a = CharacterInfo {
            name: "Rin".to_string(),
            description: "brave".to_string(),
            personality: "kind".to_string(),
            ..Default::default()
        };
        a.appearance.hair = "black".to_string();

        let mut b = CharacterInfo {
            name: "Rin".to_string(),
            description: "clever".to_string(),
            personality: "kind".to_string(),
            ..Default::default()
        };
        b.appearance.hair = "long black hair tied in a braid".to_string();

        let merged = merge_character_occurrences(vec![a, b]);
        assert_eq!(merged.appearance.hair, "long black hair tied in a braid");
        assert!(merged.description.contains("brave"));
        assert!(merged.description.contains("clever"));
    }

    #[test]
    fn fallback_reconstruct_drops_malformed_dialogue_scene() {
        let mut dialogue_scene = scene(1, 1, ContentType::Dialogue);
        dialogue_scene.narration = None;
        // missing speaker/dialogue_text -> malformed

        let well_formed = scene(2, 1, ContentType::Narration);

        let result = NovelParseResult {
            characters: vec![CharacterInfo {
                name: "Rin".to_string(),
                ..Default::default()
            }],
            chapters: vec![Chapter {
                chapter_id: 1,
                title: String::new(),
                summary: String::new(),
                scenes: vec![dialogue_scene, well_formed],
            }],
            plot_points: vec![],
        };

        let cleaned = fallback_reconstruct(result);
        assert_eq!(cleaned.chapters[0].scenes.len(), 1);
        assert_eq!(cleaned.chapters[0].scenes[0].scene_id, 2);
    }

    #[test]
    fn validate_output_rejects_empty_characters_or_chapters() {
        let empty = NovelParseResult::default();
        assert!(validate_output(&empty).is_err());
    }

    #[test]
    fn validate_input_rejects_out_of_range_lengths() {
        let config = PipelineConfig::default();
        assert!(validate_input(&"x".repeat(99), &config).is_err());
        assert!(validate_input(&"x".repeat(100), &config).is_ok());
        assert!(validate_input(&"x".repeat(100_000), &config).is_ok());
        assert!(validate_input(&"x".repeat(100_001), &config).is_err());
    }

    #[test]
    fn appearance_field_helper_does_not_panic_for_unknown_name() {
        let appearance = CharacterAppearance::default();
        assert_eq!(appearance.field("nonexistent"), "");
    }
}
