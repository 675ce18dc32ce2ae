// Prompt CRUD admin routes. Updating a prompt never edits in place:
// `Database::update_prompt` deactivates the current row and inserts a
// new version, transactionally.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use gateway_contracts::{CreatePromptRequest, Prompt, UpdatePromptRequest};
use gateway_core::GatewayError;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/prompts", post(create_prompt))
        .route("/v1/prompts/:prompt_id", get(get_prompt).patch(update_prompt))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/v1/prompts",
    request_body = CreatePromptRequest,
    responses((status = 201, description = "Prompt created", body = Prompt)),
    tag = "prompts"
)]
pub async fn create_prompt(
    State(state): State<AppState>,
    Json(request): Json<CreatePromptRequest>,
) -> Result<(StatusCode, Json<Prompt>), ApiError> {
    let prompt = state.db.create_prompt(request).await?;
    Ok((StatusCode::CREATED, Json(prompt)))
}

#[utoipa::path(
    get,
    path = "/v1/prompts/{prompt_id}",
    params(("prompt_id" = Uuid, Path, description = "Prompt ID")),
    responses(
        (status = 200, description = "Prompt found", body = Prompt),
        (status = 404, description = "Prompt not found"),
    ),
    tag = "prompts"
)]
pub async fn get_prompt(State(state): State<AppState>, Path(prompt_id): Path<Uuid>) -> Result<Json<Prompt>, ApiError> {
    let prompt = state
        .db
        .get_prompt(prompt_id)
        .await?
        .ok_or_else(|| GatewayError::not_found(format!("prompt {prompt_id}")))?;
    Ok(Json(prompt))
}

/// PATCH /v1/prompts/:prompt_id - produce a new version, deactivating the
/// current one (invariant: exactly one active version per
/// (org, name, type)).
#[utoipa::path(
    patch,
    path = "/v1/prompts/{prompt_id}",
    params(("prompt_id" = Uuid, Path, description = "Prompt ID")),
    request_body = UpdatePromptRequest,
    responses(
        (status = 200, description = "New prompt version created", body = Prompt),
        (status = 404, description = "Prompt not found"),
    ),
    tag = "prompts"
)]
pub async fn update_prompt(
    State(state): State<AppState>,
    Path(prompt_id): Path<Uuid>,
    Json(request): Json<UpdatePromptRequest>,
) -> Result<Json<Prompt>, ApiError> {
    let prompt = state
        .db
        .update_prompt_by_id(prompt_id, request)
        .await?
        .ok_or_else(|| GatewayError::not_found(format!("prompt {prompt_id}")))?;
    Ok(Json(prompt))
}
