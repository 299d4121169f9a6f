//! Audio optimization stage

use super::{seconds_label, AgentError, JobContext, MediaAgent};
use crate::state::AgentKind;
use async_trait::async_trait;
use rand::Rng;
use serde_json::{json, Value};

#[derive(Debug, Default, Clone)]
pub struct AudioAgent;

impl AudioAgent {
    fn build_result<R: Rng + ?Sized>(ctx: &JobContext, rng: &mut R) -> Value {
        let transcription = if ctx.media_class().has_audio() {
            "Transcription completed"
        } else {
            "No audio detected"
        };
        json!({
            "noise_reduction": format!("{}% improvement", rng.gen_range(85..100)),
            "quality": "48kHz stereo enhanced",
            "speech_to_text": transcription,
            "music_generated": rng.gen_bool(0.5),
            "audio_enhancement": ["noise_gate", "eq_adjustment", "dynamic_range_compression"],
            "sample_rate": "48000 Hz",
            "bit_depth": "24-bit",
            "processing_time": seconds_label(rng, 1.0, 2.0),
        })
    }
}

#[async_trait]
impl MediaAgent for AudioAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Audio
    }

    async fn process(&self, ctx: &JobContext) -> Result<Value, AgentError> {
        Ok(Self::build_result(ctx, &mut rand::thread_rng()))
    }
}
