//! Metadata extraction stage

use super::{seconds_label, AgentError, JobContext, MediaAgent, SummaryProvider, TemplateSummary};
use crate::state::AgentKind;
use async_trait::async_trait;
use rand::Rng;
use serde_json::{json, Value};
use std::sync::Arc;

/// Tags, detected objects, sentiment and a text summary
pub struct MetadataAgent {
    summary: Arc<dyn SummaryProvider>,
}

impl Default for MetadataAgent {
    fn default() -> Self {
        Self::new(Arc::new(TemplateSummary::default()))
    }
}

impl MetadataAgent {
    pub fn new(summary: Arc<dyn SummaryProvider>) -> Self {
        Self { summary }
    }

    fn build_result<R: Rng + ?Sized>(
        ctx: &JobContext,
        summary: String,
        model: &str,
        rng: &mut R,
    ) -> Value {
        let confidence: f64 = rng.gen_range(0.70..1.0);
        json!({
            "llm_summary": summary,
            "tags": ["ai-enhanced", ctx.media_class().as_str(), "processed", "analyzed"],
            "objects_detected": rng.gen_range(5..25),
            "sentiment": if rng.gen_bool(0.5) { "Positive" } else { "Neutral" },
            "confidence_score": format!("{:.2}", confidence),
            "processing_model": model,
            "extraction_time": seconds_label(rng, 1.0, 2.0),
        })
    }
}

#[async_trait]
impl MediaAgent for MetadataAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Metadata
    }

    async fn process(&self, ctx: &JobContext) -> Result<Value, AgentError> {
        let summary = self.summary.summarize(ctx).await?;
        Ok(Self::build_result(
            ctx,
            summary,
            self.summary.model_name(),
            &mut rand::thread_rng(),
        ))
    }
}
