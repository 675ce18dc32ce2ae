// Archgate gateway HTTP server: provider-compatible proxy endpoints
// plus the admin CRUD surface, wiring up shared state and routers.

mod admin;
mod error;
mod mcp;
mod proxy;
mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{routing::get, Json, Router};
use gateway_core::GatewayConfig;
use gateway_storage::Database;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use mcp::HttpMcpToolClient;
use state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(OpenApi)]
#[openapi(
    paths(
        admin::agents::create_agent,
        admin::agents::get_agent,
        admin::agents::update_agent,
        admin::prompts::create_prompt,
        admin::prompts::get_prompt,
        admin::prompts::update_prompt,
        admin::agent_prompts::replace_agent_prompts,
        admin::agent_prompts::list_agent_prompts,
        admin::limits::create_limit,
        admin::limits::limits_for_entity,
        admin::tools::upsert_tool,
        admin::tools::tools_for_agent,
        admin::tools::get_tool,
        admin::trusted_data_policies::create_trusted_data_policy,
        admin::trusted_data_policies::trusted_data_policies_for_agent_and_tool,
        admin::tool_invocation_policies::create_tool_invocation_policy,
        admin::tool_invocation_policies::tool_invocation_policies,
    ),
    components(schemas(
        gateway_contracts::Agent,
        gateway_contracts::Label,
        gateway_contracts::CreateAgentRequest,
        gateway_contracts::UpdateAgentRequest,
        gateway_contracts::Prompt,
        gateway_contracts::PromptType,
        gateway_contracts::CreatePromptRequest,
        gateway_contracts::UpdatePromptRequest,
        gateway_contracts::AgentPrompt,
        gateway_contracts::ReplaceAgentPromptsRequest,
        gateway_contracts::Limit,
        gateway_contracts::EntityType,
        gateway_contracts::CreateLimitRequest,
        gateway_contracts::Tool,
        gateway_contracts::UpsertToolRequest,
        gateway_contracts::TrustedDataPolicy,
        gateway_contracts::CreateTrustedDataPolicyRequest,
        gateway_contracts::Operator,
        gateway_contracts::TrustAction,
        gateway_contracts::ToolInvocationPolicy,
        gateway_contracts::CreateToolInvocationPolicyRequest,
        gateway_contracts::ToolInvocationAction,
    )),
    tags(
        (name = "agents", description = "Agent CRUD"),
        (name = "prompts", description = "Prompt versioning"),
        (name = "agent_prompts", description = "Agent prompt attachment"),
        (name = "limits", description = "Quota limits"),
        (name = "tools", description = "Tool registration"),
        (name = "trusted_data_policies", description = "Trusted-data policy engine configuration"),
        (name = "tool_invocation_policies", description = "Tool-invocation policy engine configuration"),
    ),
    info(
        title = "Archgate Gateway API",
        version = "0.1.0",
        description = "Provider-compatible LLM proxy gateway with trust and quota policy enforcement",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gateway_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("archgate gateway starting...");

    let config = GatewayConfig::from_env().context("failed to load gateway configuration")?;

    let db = Database::from_url(&config.database_url)
        .await
        .context("failed to connect to database")?;
    db.run_migrations().await.context("failed to run database migrations")?;
    tracing::info!("connected to database, migrations applied");

    let state = AppState::new(Arc::new(db), Arc::new(config), Arc::new(HttpMcpToolClient::new()));

    let app = Router::new()
        .route("/health", get(health))
        .merge(proxy::anthropic::routes(state.clone()))
        .merge(proxy::openai::routes(state.clone()))
        .merge(admin::routes(state.clone()))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = "0.0.0.0:9000";
    let listener = tokio::net::TcpListener::bind(addr).await.context("failed to bind to address")?;
    tracing::info!("listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .context("server error")?;

    Ok(())
}

/// Wait for SIGINT/SIGTERM, then drain every permit of the background
/// usage-update semaphore before returning so in-flight quota increments
/// finish instead of being dropped mid-write.
async fn shutdown_signal(state: AppState) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, draining in-flight background updates");
    let total_permits = state.usage_permits.available_permits();
    let _ = state.usage_permits.acquire_many(total_permits.max(1) as u32).await;
    tracing::info!("drain complete, exiting");
}
