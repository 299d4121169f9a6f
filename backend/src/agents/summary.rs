//! Text summary generation for the metadata stage

use super::{AgentError, JobContext, MediaClass};
use async_trait::async_trait;
use rand::Rng;

/// Produces the `llm_summary` text for a job
#[async_trait]
pub trait SummaryProvider: Send + Sync {
    /// Model label reported next to the summary
    fn model_name(&self) -> &str;

    /// Summarize the input described by `ctx`
    async fn summarize(&self, ctx: &JobContext) -> Result<String, AgentError>;
}

/// Fills a fixed analysis template with randomized characteristics
#[derive(Debug, Clone)]
pub struct TemplateSummary {
    model: String,
}

impl Default for TemplateSummary {
    fn default() -> Self {
        Self {
            model: "mistralai/Mistral-7B-Instruct-v0.2".to_string(),
        }
    }
}

impl TemplateSummary {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }

    /// Render the template with the given randomness source
    pub fn render<R: Rng + ?Sized>(&self, ctx: &JobContext, rng: &mut R) -> String {
        let class = ctx.media_class();
        let top_level = ctx.file_type.split('/').next().unwrap_or("media");

        let description = match class {
            MediaClass::Video => "dynamic visual content with multiple scenes and transitions",
            MediaClass::Audio => "audio content with varying frequencies and tonal qualities",
            MediaClass::Image => "visual elements with structured composition",
        };
        let production = if rng.gen_bool(0.5) {
            "professional production quality"
        } else {
            "user-generated content"
        };
        let structure = if rng.gen_bool(0.5) {
            "clear narrative structure"
        } else {
            "documentary-style presentation"
        };
        let content_type = match class {
            MediaClass::Video => "Video content",
            MediaClass::Audio => "Audio content",
            MediaClass::Image => "Image content",
        };
        let duration = rng.gen_range(60..360);
        let complexity = if rng.gen_bool(0.5) { "High" } else { "Medium" };

        format!(
            "AI Analysis of {name}:\n\n\
             This {top_level} file appears to contain {description}. \
             The content suggests {production} with {structure}.\n\n\
             Key characteristics identified:\n\
             - Content type: {content_type}\n\
             - Quality indicators: High resolution, good lighting\n\
             - Estimated duration: {duration} seconds\n\
             - Complexity level: {complexity}",
            name = ctx.file_name,
        )
    }
}

#[async_trait]
impl SummaryProvider for TemplateSummary {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn summarize(&self, ctx: &JobContext) -> Result<String, AgentError> {
        Ok(self.render(ctx, &mut rand::thread_rng()))
    }
}
