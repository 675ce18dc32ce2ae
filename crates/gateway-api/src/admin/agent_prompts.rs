// Agent <-> prompt attachment admin routes.

use axum::extract::{Path, State};
use axum::routing::put;
use axum::{Json, Router};
use gateway_contracts::{AgentPrompt, Prompt, ReplaceAgentPromptsRequest};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/agents/:agent_id/prompts", put(replace_agent_prompts).get(list_agent_prompts))
        .with_state(state)
}

/// PUT /v1/agents/:agent_id/prompts - replace the agent's whole ordered
/// prompt set in one transaction; a request never appends.
#[utoipa::path(
    put,
    path = "/v1/agents/{agent_id}/prompts",
    params(("agent_id" = Uuid, Path, description = "Agent ID")),
    request_body = ReplaceAgentPromptsRequest,
    responses((status = 200, description = "Prompt set replaced", body = Vec<AgentPrompt>)),
    tag = "agent_prompts"
)]
pub async fn replace_agent_prompts(
    State(state): State<AppState>,
    Path(agent_id): Path<Uuid>,
    Json(request): Json<ReplaceAgentPromptsRequest>,
) -> Result<Json<Vec<AgentPrompt>>, ApiError> {
    let attached = state.repo.replace_agent_prompts(agent_id, request.prompt_ids).await?;
    Ok(Json(attached))
}

#[utoipa::path(
    get,
    path = "/v1/agents/{agent_id}/prompts",
    params(("agent_id" = Uuid, Path, description = "Agent ID")),
    responses((status = 200, description = "Prompts attached to the agent, in order", body = Vec<Prompt>)),
    tag = "agent_prompts"
)]
pub async fn list_agent_prompts(State(state): State<AppState>, Path(agent_id): Path<Uuid>) -> Result<Json<Vec<Prompt>>, ApiError> {
    let prompts = state.repo.prompts_for_agent(agent_id).await?;
    Ok(Json(prompts))
}
