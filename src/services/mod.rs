// src/services/mod.rs
pub mod image_generation;
pub mod image_search;
pub mod llm;
pub mod placeholder;
pub mod pricing;
pub mod prompt_analyzer;
pub mod prompt_optimizer;
pub mod stats;
pub mod video_generation;

pub use image_generation::{DalleService, ImageGenerator, ImagenService};
pub use image_search::ImageSearchService;
pub use llm::{LlmProvider, LlmService};
pub use prompt_analyzer::PromptAnalyzer;
pub use prompt_optimizer::PromptOptimizer;
pub use stats::{MemoryStatsStore, PgStatsStore, StatsStore};
pub use video_generation::{OpenAiVideoService, VeoService, VideoGenerator};
