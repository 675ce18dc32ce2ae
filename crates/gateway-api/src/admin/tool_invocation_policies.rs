// Tool-invocation policy admin routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use gateway_contracts::{CreateToolInvocationPolicyRequest, ToolInvocationPolicy};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/tool_invocation_policies", post(create_tool_invocation_policy))
        .route(
            "/v1/agents/:agent_id/tools/:tool_name/invocation_policies",
            get(tool_invocation_policies),
        )
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/v1/tool_invocation_policies",
    request_body = CreateToolInvocationPolicyRequest,
    responses((status = 201, description = "Policy created", body = ToolInvocationPolicy)),
    tag = "tool_invocation_policies"
)]
pub async fn create_tool_invocation_policy(
    State(state): State<AppState>,
    Json(request): Json<CreateToolInvocationPolicyRequest>,
) -> Result<(StatusCode, Json<ToolInvocationPolicy>), ApiError> {
    let policy = state.repo.create_tool_invocation_policy(request).await?;
    Ok((StatusCode::CREATED, Json(policy)))
}

#[utoipa::path(
    get,
    path = "/v1/agents/{agent_id}/tools/{tool_name}/invocation_policies",
    params(
        ("agent_id" = Uuid, Path, description = "Agent ID"),
        ("tool_name" = String, Path, description = "Tool name"),
    ),
    responses((status = 200, description = "Invocation policies for the tool", body = Vec<ToolInvocationPolicy>)),
    tag = "tool_invocation_policies"
)]
pub async fn tool_invocation_policies(
    State(state): State<AppState>,
    Path((agent_id, tool_name)): Path<(Uuid, String)>,
) -> Result<Json<Vec<ToolInvocationPolicy>>, ApiError> {
    let policies = state.repo.tool_invocation_policies(agent_id, &tool_name).await?;
    Ok(Json(policies))
}
