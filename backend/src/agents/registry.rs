//! Ordered set of processing stages

use super::{AudioAgent, MediaAgent, MetadataAgent, StoryboardAgent, VideoAgent};
use std::sync::Arc;

/// Agents in the order the pipeline runs them
#[derive(Clone)]
pub struct AgentRegistry {
    agents: Vec<Arc<dyn MediaAgent>>,
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new(vec![
            Arc::new(MetadataAgent::default()),
            Arc::new(VideoAgent),
            Arc::new(AudioAgent),
            Arc::new(StoryboardAgent),
        ])
    }
}

impl AgentRegistry {
    /// Create a registry from agents already in processing order
    pub fn new(agents: Vec<Arc<dyn MediaAgent>>) -> Self {
        Self { agents }
    }

    /// Look up an agent by its identifier
    pub fn get(&self, id: &str) -> Option<Arc<dyn MediaAgent>> {
        self.agents.iter().find(|a| a.id() == id).cloned()
    }

    /// Agents in processing order
    pub fn order(&self) -> &[Arc<dyn MediaAgent>] {
        &self.agents
    }

    /// Identifiers in processing order
    pub fn ids(&self) -> Vec<&'static str> {
        self.agents.iter().map(|a| a.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Replace the agent of the same kind, keeping its position
    pub fn with_agent(mut self, agent: Arc<dyn MediaAgent>) -> Self {
        if let Some(slot) = self.agents.iter_mut().find(|a| a.kind() == agent.kind()) {
            *slot = agent;
        } else {
            self.agents.push(agent);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentError, JobContext};
    use crate::state::AgentKind;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct BrokenVideo;

    #[async_trait]
    impl MediaAgent for BrokenVideo {
        fn kind(&self) -> AgentKind {
            AgentKind::Video
        }

        async fn process(&self, _ctx: &JobContext) -> Result<Value, AgentError> {
            Ok(json!({ "broken": true }))
        }
    }

    #[test]
    fn test_default_order() {
        let registry = AgentRegistry::default();
        assert_eq!(
            registry.ids(),
            vec!["metadata-agent", "video-agent", "audio-agent", "storyboard-agent"]
        );
        assert!(registry.get("audio-agent").is_some());
        assert!(registry.get("orchestrator").is_none());
    }

    #[tokio::test]
    async fn test_with_agent_replaces_in_place() {
        let registry = AgentRegistry::default().with_agent(Arc::new(BrokenVideo));
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.order()[1].id(), "video-agent");

        let ctx = JobContext {
            job_id: "j".to_string(),
            file_name: "a.mp4".to_string(),
            file_type: "video/mp4".to_string(),
            file_path: None,
        };
        let result = registry.get("video-agent").unwrap().process(&ctx).await.unwrap();
        assert_eq!(result["broken"], true);
    }
}
