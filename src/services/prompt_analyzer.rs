// src/services/prompt_analyzer.rs
use lazy_static::lazy_static;
use regex::Regex;

use crate::models::prompt::{
    AnalysisInfo, ContentType, LengthCheck, SafetyAnalysis, Suggestion, Suggestions,
};
use crate::services::llm::LlmService;

pub const MAX_ANALYZE_LENGTH: usize = 2000;

pub const SENSITIVE_KEYWORDS: [&str; 26] = [
    "暴力", "血腥", "恐怖", "仇恨", "歧視", "裸體", "色情", "毒品", "武器", "爆炸", "自殺", "死亡",
    "傷害", "攻擊", "violence", "blood", "horror", "hate", "nude", "porn", "drug", "weapon", "bomb",
    "suicide", "death", "harm",
];

lazy_static! {
    static ref SUGGESTION_MARKER: Regex =
        Regex::new(r"(?i)(?:建議\s*|option\s+)([ABC])\s*[：:]").expect("valid regex");
    static ref SENSITIVE_PATTERN: Regex = Regex::new(&format!(
        "(?i){}",
        SENSITIVE_KEYWORDS
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|")
    ))
    .expect("valid regex");
}

const TECHNICAL_WORDS: [&str; 10] = [
    "lighting", "composition", "style", "color", "texture", "光線", "構圖", "風格", "色彩", "質感",
];
const QUALITY_WORDS: [&str; 8] = [
    "professional", "high quality", "detail", "refined", "專業", "高品質", "細節", "精緻",
];

#[derive(Debug, Clone, PartialEq)]
pub enum AnalyzeError {
    EmptyPrompt,
    PromptTooLong { current_length: usize },
}

impl AnalyzeError {
    pub fn code(&self) -> &'static str {
        match self {
            AnalyzeError::EmptyPrompt => "EMPTY_PROMPT",
            AnalyzeError::PromptTooLong { .. } => "PROMPT_TOO_LONG",
        }
    }

    pub fn message(&self) -> String {
        match self {
            AnalyzeError::EmptyPrompt => "Prompt cannot be empty".to_string(),
            AnalyzeError::PromptTooLong { .. } => format!(
                "Prompt cannot exceed {} characters",
                MAX_ANALYZE_LENGTH
            ),
        }
    }
}

pub fn contains_sensitive_content(prompt: &str) -> bool {
    let lower = prompt.to_lowercase();
    SENSITIVE_KEYWORDS
        .iter()
        .any(|k| lower.contains(&k.to_lowercase()))
}

fn suggestion_templates() -> Suggestions {
    Suggestions {
        option_a: Suggestion {
            title: "Option A (safest)".to_string(),
            prompt: String::new(),
            description: "Removes all sensitive content so the prompt is fully safe".to_string(),
        },
        option_b: Suggestion {
            title: "Option B (moderate)".to_string(),
            prompt: String::new(),
            description: "Artistic phrasing that keeps creative elements".to_string(),
        },
        option_c: Suggestion {
            title: "Option C (closest to original)".to_string(),
            prompt: String::new(),
            description: "Keeps the original idea with richer visual detail".to_string(),
        },
    }
}

/// Extracts the A/B/C suggestions from an LLM reply. Each one runs from its
/// `建議A：` / `Option A:` marker to the next marker or the end of the text.
pub fn parse_suggestions(text: &str) -> Suggestions {
    let mut suggestions = suggestion_templates();

    let markers: Vec<(char, usize, usize)> = SUGGESTION_MARKER
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let letter = caps.get(1)?.as_str().to_ascii_uppercase().chars().next()?;
            Some((letter, whole.start(), whole.end()))
        })
        .collect();

    for (i, (letter, _, body_start)) in markers.iter().enumerate() {
        let body_end = markers.get(i + 1).map(|m| m.1).unwrap_or(text.len());
        let body = text[*body_start..body_end].trim().to_string();
        let slot = match letter {
            'A' => &mut suggestions.option_a,
            'B' => &mut suggestions.option_b,
            _ => &mut suggestions.option_c,
        };
        if slot.prompt.is_empty() {
            slot.prompt = body;
        }
    }

    suggestions
}

pub fn basic_optimization(prompt: &str, content_type: ContentType) -> String {
    let mut optimized = prompt.to_string();
    match content_type {
        ContentType::Image => {
            if !optimized.to_lowercase().contains("high quality") {
                optimized = format!("high quality, professional photography, {}", optimized);
            }
            if !optimized.to_lowercase().contains("detail") {
                optimized = format!("{}, rich detail", optimized);
            }
        }
        ContentType::Video => {
            if !optimized.to_lowercase().contains("smooth") {
                optimized = format!("smooth motion, {}", optimized);
            }
            if !optimized.to_lowercase().contains("professional") {
                optimized = format!("professional cinematography, {}", optimized);
            }
        }
    }
    optimized
}

pub fn mask_sensitive(prompt: &str) -> String {
    SENSITIVE_PATTERN
        .replace_all(prompt, "safe content")
        .into_owned()
}

pub fn basic_alternatives(prompt: &str, content_type: ContentType) -> Suggestions {
    let masked = mask_sensitive(prompt);
    let mut suggestions = suggestion_templates();
    suggestions.option_a.prompt = format!("Safe, positive {} content", content_type.as_str());
    suggestions.option_b.prompt = masked.clone();
    suggestions.option_c.prompt = format!("Creative {} concept: {}", content_type.as_str(), masked);
    suggestions
}

pub fn improvements(original: &str, optimized: &str) -> Vec<String> {
    let lower = optimized.to_lowercase();
    let mut notes = Vec::new();

    if optimized.chars().count() > original.chars().count() {
        notes.push("Added more descriptive detail".to_string());
    }
    if TECHNICAL_WORDS.iter().any(|w| lower.contains(w)) {
        notes.push("Added technical parameters".to_string());
    }
    if QUALITY_WORDS.iter().any(|w| lower.contains(w)) {
        notes.push("Raised quality requirements".to_string());
    }
    if notes.is_empty() {
        notes.push("Refined wording".to_string());
    }
    notes
}

const ELEMENT_CATEGORIES: [(&str, &[&str]); 5] = [
    (
        "subject",
        &["woman", "man", "child", "elderly", "young", "人", "女性", "男性", "小孩", "老人", "年輕", "中年"],
    ),
    (
        "scene",
        &["indoor", "outdoor", "beach", "mountain", "city", "countryside", "forest", "street",
          "室內", "戶外", "海邊", "山上", "城市", "鄉村", "森林", "街道"],
    ),
    (
        "time",
        &["daytime", "night", "dusk", "dawn", "noon", "evening", "白天", "夜晚", "黃昏", "清晨", "中午", "傍晚"],
    ),
    (
        "style",
        &["realistic", "cartoon", "oil painting", "watercolor", "sketch", "photography",
          "寫實", "藝術", "卡通", "油畫", "水彩", "素描", "攝影"],
    ),
    (
        "mood",
        &["happy", "sad", "calm", "excited", "warm", "mysterious", "romantic",
          "快樂", "悲傷", "平靜", "興奮", "溫暖", "神秘", "浪漫"],
    ),
];

/// Keyword-based tags such as `scene: beach`.
pub fn extract_key_elements(prompt: &str) -> Vec<String> {
    let lower = prompt.trim().to_lowercase();
    if lower.is_empty() {
        return Vec::new();
    }

    ELEMENT_CATEGORIES
        .iter()
        .flat_map(|(category, words)| {
            let lower = &lower;
            words
                .iter()
                .filter(move |w| lower.contains(*w))
                .map(move |w| format!("{}: {}", category, w))
        })
        .collect()
}

pub fn validate_prompt_length(prompt: &str) -> LengthCheck {
    let length = prompt.trim().chars().count();
    let percentage = (length as f64 / MAX_ANALYZE_LENGTH as f64 * 1000.0).round() / 10.0;
    LengthCheck {
        valid: length > 0 && length <= MAX_ANALYZE_LENGTH,
        length,
        max_length: MAX_ANALYZE_LENGTH,
        remaining: MAX_ANALYZE_LENGTH as i64 - length as i64,
        percentage,
    }
}

fn optimize_instructions(prompt: &str, content_type: ContentType) -> String {
    format!(
        "As an expert in optimizing prompts for AI {kind} generation, improve this user prompt:\n\n\
         Original prompt: {prompt}\n\n\
         Requirements:\n\
         1. Keep the user's original intent and scene\n\
         2. Use more specific, descriptive wording\n\
         3. Add suitable technical parameters (lighting, composition, style)\n\
         4. Keep the language fluent and well structured\n\
         5. Make it suitable for AI {kind} generation models\n\n\
         Return only the optimized prompt with no extra explanation or formatting.",
        kind = content_type.as_str(),
        prompt = prompt,
    )
}

fn alternatives_instructions(prompt: &str) -> String {
    format!(
        "As an AI content-safety expert: the user's prompt may contain inappropriate content: \"{prompt}\"\n\n\
         Write three alternatives at different safety levels:\n\n\
         Option A (safest): remove anything sensitive, use safe and positive wording, keep the scene intent.\n\
         Option B (moderate): express it indirectly and artistically, keeping some creative elements.\n\
         Option C (closest to original): keep as much of the idea as possible with richer detail.\n\n\
         Answer in exactly this format, each line giving the rewritten prompt:\n\
         Option A: [prompt]\n\
         Option B: [prompt]\n\
         Option C: [prompt]"
    )
}

#[derive(Clone)]
pub struct PromptAnalyzer {
    llm: LlmService,
}

impl PromptAnalyzer {
    pub fn new(llm: LlmService) -> Self {
        Self { llm }
    }

    pub async fn analyze_safety(
        &self,
        prompt: &str,
        content_type: ContentType,
    ) -> Result<SafetyAnalysis, AnalyzeError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(AnalyzeError::EmptyPrompt);
        }
        let length = prompt.chars().count();
        if length > MAX_ANALYZE_LENGTH {
            return Err(AnalyzeError::PromptTooLong {
                current_length: length,
            });
        }

        let mock_mode = self.llm.is_mock();
        let mut info = AnalysisInfo {
            original_length: length,
            content_type: content_type.as_str().to_string(),
            analysis_timestamp: chrono::Local::now().to_rfc3339(),
            optimized_length: None,
        };

        if !contains_sensitive_content(prompt) {
            let optimized = self.optimize_safe_prompt(prompt, content_type).await;
            let notes = if mock_mode {
                vec!["Basic optimization (mock mode)".to_string()]
            } else {
                improvements(prompt, &optimized)
            };
            info.optimized_length = Some(optimized.chars().count());
            return Ok(SafetyAnalysis::Safe {
                original_prompt: prompt.to_string(),
                optimized_prompt: optimized,
                improvements: notes,
                mock_mode,
                analysis_info: info,
            });
        }

        tracing::warn!("⚠️ Sensitive content detected in {} prompt", content_type.as_str());
        let suggestions = self.alternative_prompts(prompt, content_type).await;
        Ok(SafetyAnalysis::Unsafe {
            original_prompt: prompt.to_string(),
            risk_analysis: "Detected content that AI models are likely to reject; safe alternatives are provided".to_string(),
            suggestions,
            mock_mode,
            analysis_info: info,
        })
    }

    async fn optimize_safe_prompt(&self, prompt: &str, content_type: ContentType) -> String {
        if self.llm.is_mock() {
            return basic_optimization(prompt, content_type);
        }

        match self
            .llm
            .chat(
                Some("You are a professional AI prompt optimization expert."),
                &optimize_instructions(prompt, content_type),
                1000,
                0.7,
            )
            .await
        {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => basic_optimization(prompt, content_type),
            Err(e) => {
                tracing::error!("❌ Prompt optimization call failed: {}", e);
                basic_optimization(prompt, content_type)
            }
        }
    }

    async fn alternative_prompts(&self, prompt: &str, content_type: ContentType) -> Suggestions {
        if self.llm.is_mock() {
            return basic_alternatives(prompt, content_type);
        }

        match self
            .llm
            .chat(
                Some("You are a professional AI content-safety expert and prompt writer."),
                &alternatives_instructions(prompt),
                1500,
                0.8,
            )
            .await
        {
            Ok(text) => {
                let parsed = parse_suggestions(&text);
                if parsed.option_a.prompt.is_empty()
                    && parsed.option_b.prompt.is_empty()
                    && parsed.option_c.prompt.is_empty()
                {
                    basic_alternatives(prompt, content_type)
                } else {
                    parsed
                }
            }
            Err(e) => {
                tracing::error!("❌ Alternative prompt call failed: {}", e);
                basic_alternatives(prompt, content_type)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::llm::testing::ScriptedLlm;
    use std::sync::Arc;

    #[test]
    fn test_sensitive_detection_is_case_insensitive() {
        assert!(contains_sensitive_content("A scene full of VIOLENCE"));
        assert!(contains_sensitive_content("充滿暴力的場景"));
        assert!(!contains_sensitive_content("a quiet lake at dawn"));
    }

    #[test]
    fn test_parse_suggestions_chinese_markers() {
        let text = "建議A：寧靜的森林\n建議B: 藝術化的森林\n建議C：充滿細節的森林";
        let s = parse_suggestions(text);
        assert_eq!(s.option_a.prompt, "寧靜的森林");
        assert_eq!(s.option_b.prompt, "藝術化的森林");
        assert_eq!(s.option_c.prompt, "充滿細節的森林");
    }

    #[test]
    fn test_parse_suggestions_english_multiline() {
        let text = "Option A: a calm harbor\nat dusk\nOption B: a stormy harbor\nOption C: dramatic harbor";
        let s = parse_suggestions(text);
        assert_eq!(s.option_a.prompt, "a calm harbor\nat dusk");
        assert_eq!(s.option_c.prompt, "dramatic harbor");
    }

    #[test]
    fn test_parse_suggestions_missing_marker_leaves_empty() {
        let s = parse_suggestions("Option B: only b");
        assert!(s.option_a.prompt.is_empty());
        assert_eq!(s.option_b.prompt, "only b");
    }

    #[test]
    fn test_basic_optimization() {
        assert_eq!(
            basic_optimization("a cat", ContentType::Image),
            "high quality, professional photography, a cat, rich detail"
        );
        assert_eq!(
            basic_optimization("a cat", ContentType::Video),
            "professional cinematography, smooth motion, a cat"
        );
    }

    #[test]
    fn test_basic_alternatives_mask_keywords() {
        let s = basic_alternatives("a bomb in the city", ContentType::Image);
        assert_eq!(s.option_b.prompt, "a safe content in the city");
        assert!(s.option_c.prompt.ends_with("a safe content in the city"));
    }

    #[test]
    fn test_improvements() {
        assert_eq!(improvements("cat", "cat"), vec!["Refined wording"]);
        let notes = improvements("cat", "cat with soft lighting, professional detail");
        assert!(notes.contains(&"Added more descriptive detail".to_string()));
        assert!(notes.contains(&"Added technical parameters".to_string()));
        assert!(notes.contains(&"Raised quality requirements".to_string()));
    }

    #[test]
    fn test_extract_key_elements() {
        let elements = extract_key_elements("A young woman on the beach at dusk, watercolor");
        assert!(elements.contains(&"scene: beach".to_string()));
        assert!(elements.contains(&"time: dusk".to_string()));
        assert!(elements.contains(&"style: watercolor".to_string()));
        assert!(extract_key_elements("   ").is_empty());
    }

    #[test]
    fn test_validate_prompt_length() {
        let check = validate_prompt_length(&"a".repeat(500));
        assert!(check.valid);
        assert_eq!(check.remaining, 1500);
        assert_eq!(check.percentage, 25.0);
        assert!(!validate_prompt_length("").valid);
    }

    #[tokio::test]
    async fn test_analyze_rejects_empty_and_long() {
        let analyzer = PromptAnalyzer::new(LlmService::mock());
        assert_eq!(
            analyzer.analyze_safety("  ", ContentType::Image).await.unwrap_err(),
            AnalyzeError::EmptyPrompt
        );
        let err = analyzer
            .analyze_safety(&"x".repeat(2001), ContentType::Image)
            .await
            .unwrap_err();
        assert_eq!(err, AnalyzeError::PromptTooLong { current_length: 2001 });
        assert_eq!(err.code(), "PROMPT_TOO_LONG");
    }

    #[tokio::test]
    async fn test_mock_mode_uses_basic_rules() {
        let analyzer = PromptAnalyzer::new(LlmService::mock());
        match analyzer.analyze_safety("a cat", ContentType::Image).await.unwrap() {
            SafetyAnalysis::Safe {
                optimized_prompt,
                analysis_info,
                mock_mode,
                ..
            } => {
                assert!(mock_mode);
                assert_eq!(
                    optimized_prompt,
                    "high quality, professional photography, a cat, rich detail"
                );
                assert_eq!(analysis_info.optimized_length, Some(optimized_prompt.chars().count()));
            }
            other => panic!("expected safe analysis, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unsafe_prompt_uses_llm_suggestions() {
        let llm = LlmService::new(Arc::new(ScriptedLlm::new(vec![Ok(
            "Option A: a peaceful parade\nOption B: fireworks\nOption C: a festival",
        )])));
        let analyzer = PromptAnalyzer::new(llm);
        match analyzer.analyze_safety("a bomb at a parade", ContentType::Video).await.unwrap() {
            SafetyAnalysis::Unsafe { suggestions, .. } => {
                assert_eq!(suggestions.option_a.prompt, "a peaceful parade");
                assert_eq!(suggestions.option_c.prompt, "a festival");
            }
            other => panic!("expected unsafe analysis, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_llm_error_falls_back_to_basic_optimization() {
        let llm = LlmService::new(Arc::new(ScriptedLlm::new(vec![Err("down")])));
        let analyzer = PromptAnalyzer::new(llm);
        match analyzer.analyze_safety("a cat", ContentType::Video).await.unwrap() {
            SafetyAnalysis::Safe { optimized_prompt, .. } => {
                assert_eq!(optimized_prompt, "professional cinematography, smooth motion, a cat");
            }
            other => panic!("expected safe analysis, got {:?}", other),
        }
    }
}
