//! Agent-to-agent (A2A) messaging
//!
//! A small envelope model for inter-agent messages, plus the pieces that move them around:
//!
//! - `message`: header/payload envelope, priorities, kinds and transport labels
//! - `endpoint`: per-agent handler table, history and pending acknowledgements
//! - `node`: an endpoint wired to a processing stage
//! - `network`: in-process delivery between nodes
//! - `bus`: the capped communication log shown to clients

pub mod bus;
pub mod endpoint;
pub mod message;
pub mod network;
pub mod node;

pub use bus::{MessageBus, DEFAULT_RECENT_LIMIT};
pub use endpoint::{A2AEndpoint, EndpointStats, MessageHandler, Reply};
pub use message::{
    A2AHeader, A2AMessage, A2APayload, MessageKind, MessagePriority, ProtocolVersion, Transport,
    BROADCAST_TARGET,
};
pub use network::A2ANetwork;
pub use node::{AgentNode, ORCHESTRATOR_ID};

use thiserror::Error;

/// Errors raised while creating, delivering or handling A2A messages
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// No endpoint is registered under the target id
    #[error("Unknown recipient: {0}")]
    UnknownRecipient(String),

    /// A registered handler failed
    #[error("Handler for '{action}' failed: {message}")]
    HandlerFailed {
        /// Action the handler was registered for
        action: String,
        /// What went wrong
        message: String,
    },

    /// Envelope could not be parsed or is missing fields
    #[error("Malformed message: {0}")]
    Malformed(String),
}
