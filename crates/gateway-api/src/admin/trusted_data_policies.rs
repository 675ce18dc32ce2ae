// Trusted-data policy admin routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use gateway_contracts::{CreateTrustedDataPolicyRequest, TrustedDataPolicy};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/trusted_data_policies", post(create_trusted_data_policy))
        .route(
            "/v1/agents/:agent_id/tools/:tool_id/trusted_data_policies",
            get(trusted_data_policies_for_agent_and_tool),
        )
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/v1/trusted_data_policies",
    request_body = CreateTrustedDataPolicyRequest,
    responses((status = 201, description = "Policy created", body = TrustedDataPolicy)),
    tag = "trusted_data_policies"
)]
pub async fn create_trusted_data_policy(
    State(state): State<AppState>,
    Json(request): Json<CreateTrustedDataPolicyRequest>,
) -> Result<(StatusCode, Json<TrustedDataPolicy>), ApiError> {
    let policy = state.repo.create_trusted_data_policy(request).await?;
    Ok((StatusCode::CREATED, Json(policy)))
}

#[utoipa::path(
    get,
    path = "/v1/agents/{agent_id}/tools/{tool_id}/trusted_data_policies",
    params(
        ("agent_id" = Uuid, Path, description = "Agent ID"),
        ("tool_id" = Uuid, Path, description = "Tool ID"),
    ),
    responses((status = 200, description = "Policies the agent opted in to for the tool", body = Vec<TrustedDataPolicy>)),
    tag = "trusted_data_policies"
)]
pub async fn trusted_data_policies_for_agent_and_tool(
    State(state): State<AppState>,
    Path((agent_id, tool_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<TrustedDataPolicy>>, ApiError> {
    let policies = state.repo.trusted_data_policies_for_agent_and_tool(agent_id, tool_id).await?;
    Ok(Json(policies))
}
