//! A2A protocol walkthrough
//!
//! Builds the orchestrator and one node per processing stage, polls every node
//! for its status (with acknowledgements), then runs a file through the stages
//! over the network and prints per-node statistics.
//!
//! Run with: `cargo run --bin a2a_demo`

use media_suite_backend::agents::AgentRegistry;
use media_suite_backend::protocol::{A2ANetwork, MessageBus, MessagePriority, ORCHESTRATOR_ID};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("🤖 AI Multimedia Production Suite - A2A Protocol Demo");
    println!("{}", "=".repeat(60));

    let registry = AgentRegistry::default();
    let bus = MessageBus::new(1000);
    let mut network = A2ANetwork::with_registry(&registry, bus.clone());
    println!("Nodes: {}", network.node_ids().join(", "));

    println!("\n📡 Requesting status from all agents...");
    for message in network.request_status().await? {
        println!(
            "  {} → {}: {}",
            message.header.from_agent,
            message.header.to_agent,
            message.action()
        );
        if message.action() == "status_response" {
            let data = &message.payload.data;
            println!(
                "     capabilities: {}",
                data["capabilities"]
                    .as_array()
                    .map(|caps| caps
                        .iter()
                        .filter_map(|c| c.as_str())
                        .collect::<Vec<_>>()
                        .join(", "))
                    .unwrap_or_default()
            );
        }
    }

    println!("\n🎬 Processing sample_video.mp4 through the pipeline...");
    let job_id = uuid::Uuid::new_v4().to_string();
    let mut previous: Option<&'static str> = None;
    for agent_id in registry.ids() {
        let transcript = network
            .send(
                ORCHESTRATOR_ID,
                agent_id,
                "process",
                json!({
                    "job_id": job_id,
                    "file_name": "sample_video.mp4",
                    "file_type": "video/mp4",
                    "dependencies": previous.into_iter().collect::<Vec<_>>(),
                }),
                MessagePriority::High,
                true,
            )
            .await?;

        match transcript.iter().find(|m| m.action() == "process_complete") {
            Some(reply) => println!(
                "  ✅ {}: {}",
                agent_id,
                serde_json::to_string(&reply.payload.data["results"])?
            ),
            None => println!("  ❌ {}: no result", agent_id),
        }
        previous = Some(agent_id);
    }

    println!("\n📊 Network statistics:");
    for (node, stats) in network.stats() {
        println!(
            "  {:<18} messages: {:>3}  pending acks: {}  handlers: {}  peers: {}",
            node,
            stats.total_messages,
            stats.pending_acks,
            stats.registered_handlers,
            stats.connected_agents
        );
    }
    println!("\n📨 Messages on the bus: {}", bus.len().await);

    Ok(())
}
