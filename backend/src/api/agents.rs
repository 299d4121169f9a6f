//! Agent API handlers
//!
//! The four processing agents are fixed; these endpoints only read their cards.

use crate::api::utils::AppContext;
use crate::error::AppError;
use crate::state::{Agent, AgentId};
use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Serialize;

/// Agents list response
#[derive(Serialize)]
pub struct AgentsListResponse {
    /// Agents in processing order
    pub agents: Vec<Agent>,
    /// Total number of agents
    pub count: usize,
}

/// GET /api/agents - List all agents
pub async fn list_agents(
    State(ctx): State<AppContext>,
) -> Result<Json<AgentsListResponse>, AppError> {
    let state = ctx.state.read().await;
    let agents: Vec<Agent> = state.agents_list().into_iter().cloned().collect();

    Ok(Json(AgentsListResponse {
        count: agents.len(),
        agents,
    }))
}

/// GET /api/agents/:id - Get a specific agent
pub async fn get_agent(
    State(ctx): State<AppContext>,
    Path(id): Path<AgentId>,
) -> Result<Json<Agent>, AppError> {
    let state = ctx.state.read().await;
    let agent = state
        .agent(&id)
        .ok_or_else(|| AppError::AgentNotFound(id.clone()))?;

    Ok(Json(agent.clone()))
}
