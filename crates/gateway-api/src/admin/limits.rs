// Quota limit admin routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use gateway_contracts::{CreateLimitRequest, EntityType, Limit};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/limits", post(create_limit))
        .route("/v1/limits/:entity_type/:entity_id", get(limits_for_entity))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/v1/limits",
    request_body = CreateLimitRequest,
    responses((status = 201, description = "Limit created", body = Limit)),
    tag = "limits"
)]
pub async fn create_limit(
    State(state): State<AppState>,
    Json(request): Json<CreateLimitRequest>,
) -> Result<(StatusCode, Json<Limit>), ApiError> {
    let limit = state.repo.create_limit(request).await?;
    Ok((StatusCode::CREATED, Json(limit)))
}

#[derive(Debug, Deserialize)]
pub struct EntityPath {
    pub entity_type: EntityType,
    pub entity_id: Uuid,
}

#[utoipa::path(
    get,
    path = "/v1/limits/{entity_type}/{entity_id}",
    params(
        ("entity_type" = EntityType, Path),
        ("entity_id" = Uuid, Path),
    ),
    responses((status = 200, description = "Limits scoped to the entity", body = Vec<Limit>)),
    tag = "limits"
)]
pub async fn limits_for_entity(
    State(state): State<AppState>,
    Path(EntityPath { entity_type, entity_id }): Path<EntityPath>,
) -> Result<Json<Vec<Limit>>, ApiError> {
    let limits = state.repo.limits_for_entity(entity_type, entity_id).await?;
    Ok(Json(limits))
}
