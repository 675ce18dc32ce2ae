// Agent CRUD admin routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use gateway_contracts::{Agent, CreateAgentRequest, UpdateAgentRequest};
use gateway_core::GatewayError;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/agents", post(create_agent))
        .route("/v1/agents/:agent_id", get(get_agent).patch(update_agent))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/v1/agents",
    request_body = CreateAgentRequest,
    responses((status = 201, description = "Agent created", body = Agent)),
    tag = "agents"
)]
pub async fn create_agent(
    State(state): State<AppState>,
    Json(request): Json<CreateAgentRequest>,
) -> Result<(StatusCode, Json<Agent>), ApiError> {
    let agent = state.db.create_agent(request).await?;
    Ok((StatusCode::CREATED, Json(agent)))
}

#[utoipa::path(
    get,
    path = "/v1/agents/{agent_id}",
    params(("agent_id" = Uuid, Path, description = "Agent ID")),
    responses(
        (status = 200, description = "Agent found", body = Agent),
        (status = 404, description = "Agent not found"),
    ),
    tag = "agents"
)]
pub async fn get_agent(State(state): State<AppState>, Path(agent_id): Path<Uuid>) -> Result<Json<Agent>, ApiError> {
    let agent = state
        .repo
        .get_agent(agent_id)
        .await?
        .ok_or_else(|| GatewayError::agent_not_found(agent_id))?;
    Ok(Json(agent))
}

#[utoipa::path(
    patch,
    path = "/v1/agents/{agent_id}",
    params(("agent_id" = Uuid, Path, description = "Agent ID")),
    request_body = UpdateAgentRequest,
    responses(
        (status = 200, description = "Agent updated", body = Agent),
        (status = 404, description = "Agent not found"),
    ),
    tag = "agents"
)]
pub async fn update_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<Uuid>,
    Json(request): Json<UpdateAgentRequest>,
) -> Result<Json<Agent>, ApiError> {
    let agent = state
        .db
        .update_agent(agent_id, request)
        .await?
        .ok_or_else(|| GatewayError::agent_not_found(agent_id))?;
    Ok(Json(agent))
}
