// Tool registration admin routes. Re-declaring a tool never changes
// its existing trust defaults; this surface is the only
// way to set `allow_usage_when_untrusted_data_is_present`,
// `data_is_trusted_by_default`, and `mcp_endpoint`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use gateway_contracts::{Tool, UpsertToolRequest};
use gateway_core::GatewayError;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/tools", put(upsert_tool))
        .route("/v1/agents/:agent_id/tools", get(tools_for_agent))
        .route("/v1/tools/:tool_id", get(get_tool))
        .with_state(state)
}

#[utoipa::path(
    put,
    path = "/v1/tools",
    request_body = UpsertToolRequest,
    responses((status = 200, description = "Tool registered", body = Tool)),
    tag = "tools"
)]
pub async fn upsert_tool(
    State(state): State<AppState>,
    Json(request): Json<UpsertToolRequest>,
) -> Result<(StatusCode, Json<Tool>), ApiError> {
    let tool = state.repo.upsert_tool(request).await?;
    Ok((StatusCode::OK, Json(tool)))
}

#[utoipa::path(
    get,
    path = "/v1/agents/{agent_id}/tools",
    params(("agent_id" = Uuid, Path, description = "Agent ID")),
    responses((status = 200, description = "Tools registered for the agent", body = Vec<Tool>)),
    tag = "tools"
)]
pub async fn tools_for_agent(State(state): State<AppState>, Path(agent_id): Path<Uuid>) -> Result<Json<Vec<Tool>>, ApiError> {
    let tools = state.repo.tools_for_agent(agent_id).await?;
    Ok(Json(tools))
}

#[utoipa::path(
    get,
    path = "/v1/tools/{tool_id}",
    params(("tool_id" = Uuid, Path, description = "Tool ID")),
    responses(
        (status = 200, description = "Tool found", body = Tool),
        (status = 404, description = "Tool not found"),
    ),
    tag = "tools"
)]
pub async fn get_tool(State(state): State<AppState>, Path(tool_id): Path<Uuid>) -> Result<Json<Tool>, ApiError> {
    let tool = state
        .repo
        .get_tool_by_id(tool_id)
        .await?
        .ok_or_else(|| GatewayError::not_found(format!("tool {tool_id}")))?;
    Ok(Json(tool))
}
