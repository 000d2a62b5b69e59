// src/services/prompt_optimizer.rs
use crate::models::prompt::{ContentType, OptimizeResponse, TranslateResponse};
use crate::services::llm::{LlmError, LlmService};

pub const VARIANT_COUNT: usize = 6;

pub const STYLE_NAMES: [&str; VARIANT_COUNT] = [
    "自然清新風 (Natural & Clean)",
    "電影感風格 (Cinematic Look)",
    "復古懷舊風 (Vintage/Retro)",
    "高質感商業風 (High-End Editorial)",
    "黑白極簡風 (Monochrome Minimalism)",
    "夢幻光影風 (Soft Dreamy)",
];

const IMAGE_STYLE_GUIDE: [&str; VARIANT_COUNT] = [
    "raise overall brightness and contrast, boost greens and blues, soften skin tones and reduce noise; suits landscapes and daylight portraits",
    "pull down highlights and deepen shadows, use a cool or orange-teal grade, add letterbox bars or a 21:9 film crop; suits street scenes, emotional portraits and night shots",
    "lower saturation, add a yellow or green cast, simulate film grain and faded tone curves; suits retro or old-town scenes",
    "precise skin-tone correction, sharpen key details such as eyes and accessories, clean the background, control depth of field; suits close-up portraits and product shots",
    "convert to grayscale, emphasise light, shadow and geometric lines, remove clutter; suits mood pieces and geometric structure",
    "add soft focus and glow, grade with pink, purple and pale blue, lower clarity with gentle transitions; suits weddings, sunsets and forest walks",
];

const VIDEO_STYLE_GUIDE: [&str; VARIANT_COUNT] = [
    "brighter, higher contrast footage with natural colour and clear, fluid motion; suits outdoor scenes and everyday life",
    "cinematic camera work, dramatic lighting, deep depth of field, slow motion or special camera moves; suits narrative pieces",
    "retro colour grading and filters that mimic old film stock, with grain and colour shifts; suits nostalgic themes",
    "commercial-grade colour correction and refined lighting at advertising quality; suits product or brand videos",
    "black and white grading that stresses light, contrast and composition lines in a minimalist look; suits artistic pieces",
    "soft halation, dreamy colour grading and gentle motion transitions; suits romantic or fantasy themes",
];

fn optimization_instructions(prompt: &str, content_type: ContentType) -> String {
    let (subject, guide, extra) = match content_type {
        ContentType::Image => ("image", &IMAGE_STYLE_GUIDE, "visual style"),
        ContentType::Video => ("video", &VIDEO_STYLE_GUIDE, "visual style and motion"),
    };

    let mut out = format!(
        "Provide six optimized versions of the following {subject} generation prompt in different styles.\n\n\
         Original prompt:\n{prompt}\n\n\
         Each version must keep the original intent but apply a different {extra}:\n\n"
    );
    for (i, (name, desc)) in STYLE_NAMES.iter().zip(guide.iter()).enumerate() {
        out.push_str(&format!("{}. {}: {}\n", i + 1, name, desc));
    }
    out.push_str("\nReturn them in this format, separating versions with \"---\":\n\n");
    for (i, name) in STYLE_NAMES.iter().enumerate() {
        if i > 0 {
            out.push_str("---\n");
        }
        out.push_str(&format!("Version {}: [{} prompt]\n", i + 1, name));
    }
    out
}

fn translation_instructions(prompt: &str, content_type: ContentType) -> String {
    match content_type {
        ContentType::Image => format!(
            "Translate the following image description into the English prompt best suited for AI image generation.\n\
             1. Keep the original meaning using vocabulary image models understand\n\
             2. Add suitable photography terms and artistic descriptors\n\
             3. Keep the structure clear and the description concrete\n\
             4. It should work with models such as Imagen and DALL-E\n\
             5. Return only the translated English prompt, with no commentary\n\n\
             Original description:\n{prompt}\n\n\
             English prompt:"
        ),
        ContentType::Video => format!(
            "Translate the following video description into the English prompt best suited for AI video generation.\n\
             1. Keep the original meaning using vocabulary video models understand\n\
             2. Add suitable cinematography terms and motion descriptors\n\
             3. Emphasise action, movement and the flow of time\n\
             4. It should work with models such as Veo and Runway\n\
             5. Return only the translated English prompt, with no commentary\n\n\
             Original description:\n{prompt}\n\n\
             English prompt:"
        ),
    }
}

/// Splits an LLM reply into exactly six prompt variants.
///
/// Pieces are separated by `---`; a leading label such as `Version 1:` or
/// `版本1：` is dropped (full-width colon checked first). Missing variants are
/// filled with `original`.
pub fn parse_variants(content: &str, original: &str) -> Vec<String> {
    let mut variants: Vec<String> = content
        .trim()
        .split("---")
        .map(|piece| {
            let piece = piece.trim();
            let stripped = if let Some((_, rest)) = piece.split_once('：') {
                rest
            } else if let Some((_, rest)) = piece.split_once(':') {
                rest
            } else {
                piece
            };
            stripped.trim().to_string()
        })
        .filter(|piece| !piece.is_empty())
        .collect();

    while variants.len() < VARIANT_COUNT {
        variants.push(original.to_string());
    }
    variants.truncate(VARIANT_COUNT);
    variants
}

#[derive(Clone)]
pub struct PromptOptimizer {
    llm: LlmService,
}

impl PromptOptimizer {
    pub fn new(llm: LlmService) -> Self {
        Self { llm }
    }

    pub async fn optimize(
        &self,
        prompt: &str,
        content_type: ContentType,
    ) -> Result<OptimizeResponse, LlmError> {
        tracing::info!(
            "🎨 Optimizing {} prompt ({} chars)",
            content_type.as_str(),
            prompt.chars().count()
        );

        let content = self
            .llm
            .provider()
            .generate_content(&optimization_instructions(prompt, content_type))
            .await?;

        Ok(OptimizeResponse {
            success: true,
            original_prompt: prompt.to_string(),
            optimizations: parse_variants(&content, prompt),
            style_names: STYLE_NAMES.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub async fn translate(
        &self,
        prompt: &str,
        content_type: ContentType,
    ) -> Result<TranslateResponse, LlmError> {
        tracing::info!("🌐 Translating {} prompt", content_type.as_str());

        let translated = self
            .llm
            .provider()
            .generate_content(&translation_instructions(prompt, content_type))
            .await?;

        Ok(TranslateResponse {
            success: true,
            original_prompt: prompt.to_string(),
            translated_prompt: translated.trim().to_string(),
            language: "en".to_string(),
        })
    }
}
