//! Video enhancement stage

use super::{seconds_label, AgentError, JobContext, MediaAgent};
use crate::state::AgentKind;
use async_trait::async_trait;
use rand::Rng;
use serde_json::{json, Value};

/// Resolution upscaling, denoising and scene detection
#[derive(Debug, Default, Clone)]
pub struct VideoAgent;

impl VideoAgent {
    fn build_result<R: Rng + ?Sized>(rng: &mut R) -> Value {
        json!({
            "resolution": "4K Enhanced",
            "noise_reduction": format!("{}% improvement", rng.gen_range(80..100)),
            "color_correction": "Applied",
            "scenes_detected": rng.gen_range(8..23),
            "frames_processed": rng.gen_range(1000..3000),
            "enhancement_applied": ["upscaling", "denoising", "color_grading", "stabilization"],
            "output_format": "H.264/AVC",
            "processing_time": seconds_label(rng, 2.0, 3.0),
        })
    }
}

#[async_trait]
impl MediaAgent for VideoAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Video
    }

    async fn process(&self, _ctx: &JobContext) -> Result<Value, AgentError> {
        Ok(Self::build_result(&mut rand::thread_rng()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_video_result_ranges() {
        let ctx = JobContext {
            job_id: "job-1".to_string(),
            file_name: "clip.mp4".to_string(),
            file_type: "video/mp4".to_string(),
            file_path: None,
        };

        for _ in 0..10 {
            let result = VideoAgent.process(&ctx).await.unwrap();
            assert_eq!(result["resolution"], "4K Enhanced");

            let scenes = result["scenes_detected"].as_u64().unwrap();
            assert!((8..=22).contains(&scenes));

            let frames = result["frames_processed"].as_u64().unwrap();
            assert!((1000..=2999).contains(&frames));

            let noise = result["noise_reduction"].as_str().unwrap();
            let pct: u32 = noise.split('%').next().unwrap().parse().unwrap();
            assert!((80..=99).contains(&pct));
        }
    }
}
