//! Agent profile module
//!
//! Defines the four fixed processing stages and their static profiles
//! (identifiers, display names, capabilities).
//!
//! For application-level configuration (server settings, persistence settings,
//! pipeline timings), see `config`.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Kind of simulated processing stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    /// Tags, objects, sentiment and a text summary
    Metadata,
    /// Resolution, denoising and scene detection
    Video,
    /// Noise reduction, transcription and music
    Audio,
    /// Key frames, scenes and timeline
    Storyboard,
}

/// Static description of an agent kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentProfile {
    /// Stable identifier, e.g. `video-agent`
    pub id: &'static str,
    /// Human-readable name
    pub name: &'static str,
    /// Capability labels shown on the dashboard
    pub capabilities: &'static [&'static str],
    /// Message shown while the agent is idle
    pub ready_message: &'static str,
}

/// Processing order used by the pipeline
pub const PROCESSING_ORDER: [AgentKind; 4] = [
    AgentKind::Metadata,
    AgentKind::Video,
    AgentKind::Audio,
    AgentKind::Storyboard,
];

static PROFILES: Lazy<[AgentProfile; 4]> = Lazy::new(|| {
    [
        AgentProfile {
            id: "metadata-agent",
            name: "Metadata Extraction Agent",
            capabilities: &["OCR", "Object Detection", "Tag Generation", "Content Analysis"],
            ready_message: "Metadata extraction ready",
        },
        AgentProfile {
            id: "video-agent",
            name: "Video Enhancement Agent",
            capabilities: &[
                "Noise Reduction",
                "Upscaling",
                "Color Correction",
                "Scene Detection",
            ],
            ready_message: "Ready for video processing",
        },
        AgentProfile {
            id: "audio-agent",
            name: "Audio Optimization Agent",
            capabilities: &[
                "Noise Reduction",
                "Enhancement",
                "Music Generation",
                "Speech-to-Text",
            ],
            ready_message: "Audio processing ready",
        },
        AgentProfile {
            id: "storyboard-agent",
            name: "Storyboard Generation Agent",
            capabilities: &[
                "Scene Analysis",
                "Key Frame Extraction",
                "Visual Composition",
                "Timeline Generation",
            ],
            ready_message: "Storyboard analysis ready",
        },
    ]
});

impl AgentKind {
    /// Static profile for this kind
    pub fn profile(&self) -> &'static AgentProfile {
        let index = match self {
            AgentKind::Metadata => 0,
            AgentKind::Video => 1,
            AgentKind::Audio => 2,
            AgentKind::Storyboard => 3,
        };
        &PROFILES[index]
    }

    /// Stable identifier, e.g. `audio-agent`
    pub fn id(&self) -> &'static str {
        self.profile().id
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        self.profile().name
    }

    /// Short type label (`video`, `audio`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Metadata => "metadata",
            AgentKind::Video => "video",
            AgentKind::Audio => "audio",
            AgentKind::Storyboard => "storyboard",
        }
    }

    /// Look up a kind from its agent identifier
    pub fn from_id(id: &str) -> Option<Self> {
        PROCESSING_ORDER.into_iter().find(|kind| kind.id() == id)
    }
}

/// Human-readable name for any agent identifier
///
/// Unknown identifiers are title-cased from their dashed form
/// (`orchestrator` → `Orchestrator`, `qa-agent` → `Qa Agent`).
pub fn agent_display_name(agent_id: &str) -> String {
    if let Some(kind) = AgentKind::from_id(agent_id) {
        return kind.display_name().to_string();
    }
    agent_id
        .split('-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
