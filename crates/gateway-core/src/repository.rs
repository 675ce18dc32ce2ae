// Narrow repository interface the policy engine and orchestrator consume.
// Pure data access — no policy logic lives on the trait. `gateway-storage`
// provides the sqlx/Postgres implementation; tests use an in-memory fake.

use async_trait::async_trait;
use gateway_contracts::{
    Agent, AgentPrompt, CreateInteraction, CreateLimitRequest, CreateTrustedDataPolicyRequest,
    CreateToolInvocationPolicyRequest, EntityType, Interaction, Limit, Organization, Prompt, Team,
    TokenPrice, Tool, ToolInvocationPolicy, TrustedDataPolicy, UpsertToolRequest,
};
use uuid::Uuid;

use crate::error::Result;

/// Typed access to interactions, tools, policies, limits, token prices,
/// agents, and teams. No policy decisions are made here.
#[async_trait]
pub trait Repository: Send + Sync {
    // -- Agents / teams -----------------------------------------------

    async fn get_agent(&self, agent_id: Uuid) -> Result<Option<Agent>>;
    async fn get_or_create_default_agent(&self, label_hint: &str) -> Result<Agent>;
    async fn teams_for_agent(&self, agent_id: Uuid) -> Result<Vec<Team>>;

    // -- Organizations ----------------------------------------------------

    async fn get_organization(&self, org_id: Uuid) -> Result<Option<Organization>>;
    /// The single organization a teamless agent's quota rolls up to.
    /// Created on first use with the process's default cleanup cadence
    /// (see DESIGN.md for the single-implicit-org tradeoff).
    async fn default_organization(&self) -> Result<Organization>;

    // -- Tools ----------------------------------------------------------

    async fn get_tool(&self, agent_id: Uuid, name: &str) -> Result<Option<Tool>>;
    async fn get_tool_by_id(&self, tool_id: Uuid) -> Result<Option<Tool>>;
    async fn tools_for_agent(&self, agent_id: Uuid) -> Result<Vec<Tool>>;
    async fn upsert_tool(&self, request: UpsertToolRequest) -> Result<Tool>;

    // -- Trust / invocation policies -------------------------------------

    async fn trusted_data_policies_for_agent_and_tool(
        &self,
        agent_id: Uuid,
        tool_id: Uuid,
    ) -> Result<Vec<TrustedDataPolicy>>;
    async fn create_trusted_data_policy(
        &self,
        request: CreateTrustedDataPolicyRequest,
    ) -> Result<TrustedDataPolicy>;

    async fn tool_invocation_policies(
        &self,
        agent_id: Uuid,
        tool_name: &str,
    ) -> Result<Vec<ToolInvocationPolicy>>;
    async fn create_tool_invocation_policy(
        &self,
        request: CreateToolInvocationPolicyRequest,
    ) -> Result<ToolInvocationPolicy>;

    // -- Interactions -----------------------------------------------------

    async fn create_interaction(&self, create: CreateInteraction) -> Result<Interaction>;
    /// All interactions of a chat in ascending `created_at` order, used to
    /// reconstruct `tool_call_id` -> tool name mappings.
    async fn interactions_for_chat(&self, chat_id: Uuid) -> Result<Vec<Interaction>>;

    // -- Limits / pricing --------------------------------------------------

    async fn limits_for_entity(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> Result<Vec<Limit>>;
    async fn create_limit(&self, request: CreateLimitRequest) -> Result<Limit>;
    async fn token_price(&self, model: &str) -> Result<Option<TokenPrice>>;
    /// Atomically increment `current_usage_tokens_{in,out}` on one limit row.
    async fn increment_limit_usage(&self, limit_id: Uuid, tokens_in: i64, tokens_out: i64)
        -> Result<()>;
    /// Reset every limit under `org_id` whose `last_cleanup` is stale
    /// relative to `interval`. Idempotent; safe under concurrent callers.
    async fn sweep_reset_limits(
        &self,
        org_id: Uuid,
        interval: chrono::Duration,
    ) -> Result<u64>;

    // -- Prompts ------------------------------------------------------------

    async fn replace_agent_prompts(
        &self,
        agent_id: Uuid,
        prompt_ids: Vec<Uuid>,
    ) -> Result<Vec<AgentPrompt>>;
    async fn prompts_for_agent(&self, agent_id: Uuid) -> Result<Vec<Prompt>>;
}
