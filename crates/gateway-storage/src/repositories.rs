// Repository layer for database operations: a `sqlx::PgPool`-backed
// implementation of `gateway_core::Repository`. Conversions between row
// shapes and contract DTOs live here; enum columns are stored as the
// same text the wire format uses, so `serde_json` round-trips them.

use async_trait::async_trait;
use chrono::Utc;
use gateway_contracts::{
    Agent, AgentPrompt, CreateInteraction, CreateLimitRequest, CreateToolInvocationPolicyRequest,
    CreateTrustedDataPolicyRequest, EntityType, Interaction, Label, Limit, Organization, Prompt,
    Team, TokenPrice, Tool, ToolInvocationAction, ToolInvocationPolicy, TrustAction,
    TrustedDataPolicy, UpsertToolRequest,
};
use gateway_core::error::{GatewayError, Result};
use gateway_core::Repository;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::*;

fn to_text<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn from_text<T: DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(text.to_string()))
        .map_err(|e| GatewayError::repository(format!("invalid enum column value {text:?}: {e}")))
}

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn from_url(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| GatewayError::repository(e.to_string()))?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| GatewayError::repository(e.to_string()))
    }
}

fn agent_from_row(row: AgentRow) -> Result<Agent> {
    let mut labels: Vec<Label> = serde_json::from_value(row.labels)
        .map_err(|e| GatewayError::repository(format!("malformed agent labels: {e}")))?;
    labels.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(Agent {
        id: row.id,
        name: row.name,
        labels,
        team_ids: row.team_ids,
    })
}

fn organization_from_row(row: OrganizationRow) -> Result<Organization> {
    Ok(Organization {
        id: row.id,
        name: row.name,
        limit_cleanup_interval: from_text(&row.limit_cleanup_interval)?,
    })
}

fn tool_from_row(row: ToolRow) -> Tool {
    Tool {
        id: row.id,
        agent_id: row.agent_id,
        name: row.name,
        description: row.description,
        parameters: row.parameters,
        allow_usage_when_untrusted_data_is_present: row.allow_usage_when_untrusted_data_is_present,
        data_is_trusted_by_default: row.data_is_trusted_by_default,
        mcp_endpoint: row.mcp_endpoint,
    }
}

fn policy_from_row(row: TrustedDataPolicyRow) -> Result<TrustedDataPolicy> {
    Ok(TrustedDataPolicy {
        id: row.id,
        tool_id: row.tool_id,
        attribute_path: row.attribute_path,
        operator: from_text(&row.operator)?,
        value: row.value,
        action: from_text(&row.action)?,
        description: row.description,
    })
}

fn invocation_policy_from_row(row: ToolInvocationPolicyRow) -> Result<ToolInvocationPolicy> {
    Ok(ToolInvocationPolicy {
        id: row.id,
        agent_id: row.agent_id,
        tool_name: row.tool_name,
        condition: row.condition,
        action: from_text(&row.action)?,
        description: row.description,
    })
}

fn interaction_from_row(row: InteractionRow) -> Interaction {
    Interaction {
        id: row.id,
        agent_id: row.agent_id,
        chat_id: row.chat_id,
        r#type: row.r#type,
        request: row.request,
        response: row.response,
        input_tokens: row.input_tokens,
        output_tokens: row.output_tokens,
        content: row.content,
        trusted: row.trusted,
        blocked: row.blocked,
        reason: row.reason,
        created_at: row.created_at,
    }
}

fn limit_from_row(row: LimitRow) -> Result<Limit> {
    Ok(Limit {
        id: row.id,
        entity_type: from_text(&row.entity_type)?,
        entity_id: row.entity_id,
        limit_type: row.limit_type,
        model: row.model,
        limit_value: row.limit_value,
        current_usage_tokens_in: row.current_usage_tokens_in,
        current_usage_tokens_out: row.current_usage_tokens_out,
        last_cleanup: row.last_cleanup,
        updated_at: row.updated_at,
    })
}

fn prompt_from_row(row: PromptRow) -> Result<Prompt> {
    Ok(Prompt {
        id: row.id,
        org_id: row.org_id,
        name: row.name,
        r#type: from_text(&row.r#type)?,
        content: row.content,
        version: row.version,
        parent_prompt_id: row.parent_prompt_id,
        is_active: row.is_active,
        created_by: row.created_by,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[async_trait]
impl Repository for Database {
    async fn get_agent(&self, agent_id: Uuid) -> Result<Option<Agent>> {
        let row = sqlx::query_as::<_, AgentRow>(
            "SELECT id, name, labels, team_ids FROM agents WHERE id = $1",
        )
        .bind(agent_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| GatewayError::repository(e.to_string()))?;
        row.map(agent_from_row).transpose()
    }

    async fn get_or_create_default_agent(&self, label_hint: &str) -> Result<Agent> {
        let existing = sqlx::query_as::<_, AgentRow>(
            "SELECT id, name, labels, team_ids FROM agents WHERE name = $1",
        )
        .bind(label_hint)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| GatewayError::repository(e.to_string()))?;

        if let Some(row) = existing {
            return agent_from_row(row);
        }

        let row = sqlx::query_as::<_, AgentRow>(
            r#"
            INSERT INTO agents (id, name, labels, team_ids)
            VALUES ($1, $2, '[]'::jsonb, '{}')
            RETURNING id, name, labels, team_ids
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(label_hint)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| GatewayError::repository(e.to_string()))?;

        agent_from_row(row)
    }

    async fn teams_for_agent(&self, agent_id: Uuid) -> Result<Vec<Team>> {
        let rows = sqlx::query_as::<_, TeamRow>(
            r#"
            SELECT t.id, t.name, t.org_id
            FROM teams t
            JOIN agents a ON t.id = ANY(a.team_ids)
            WHERE a.id = $1
            "#,
        )
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GatewayError::repository(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|r| Team {
                id: r.id,
                name: r.name,
                org_id: r.org_id,
            })
            .collect())
    }

    async fn get_organization(&self, org_id: Uuid) -> Result<Option<Organization>> {
        let row = sqlx::query_as::<_, OrganizationRow>(
            "SELECT id, name, limit_cleanup_interval FROM organizations WHERE id = $1",
        )
        .bind(org_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| GatewayError::repository(e.to_string()))?;
        row.map(organization_from_row).transpose()
    }

    async fn default_organization(&self) -> Result<Organization> {
        const DEFAULT_ORG_NAME: &str = "default";

        let existing = sqlx::query_as::<_, OrganizationRow>(
            "SELECT id, name, limit_cleanup_interval FROM organizations WHERE name = $1",
        )
        .bind(DEFAULT_ORG_NAME)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| GatewayError::repository(e.to_string()))?;

        if let Some(row) = existing {
            return organization_from_row(row);
        }

        let row = sqlx::query_as::<_, OrganizationRow>(
            r#"
            INSERT INTO organizations (id, name, limit_cleanup_interval)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name, limit_cleanup_interval
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(DEFAULT_ORG_NAME)
        .bind(to_text(&gateway_contracts::LimitCleanupInterval::OneHour))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| GatewayError::repository(e.to_string()))?;

        organization_from_row(row)
    }

    async fn get_tool(&self, agent_id: Uuid, name: &str) -> Result<Option<Tool>> {
        let row = sqlx::query_as::<_, ToolRow>(
            r#"
            SELECT id, agent_id, name, description, parameters,
                   allow_usage_when_untrusted_data_is_present, data_is_trusted_by_default, mcp_endpoint
            FROM tools WHERE agent_id = $1 AND name = $2
            "#,
        )
        .bind(agent_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| GatewayError::repository(e.to_string()))?;
        Ok(row.map(tool_from_row))
    }

    async fn get_tool_by_id(&self, tool_id: Uuid) -> Result<Option<Tool>> {
        let row = sqlx::query_as::<_, ToolRow>(
            r#"
            SELECT id, agent_id, name, description, parameters,
                   allow_usage_when_untrusted_data_is_present, data_is_trusted_by_default, mcp_endpoint
            FROM tools WHERE id = $1
            "#,
        )
        .bind(tool_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| GatewayError::repository(e.to_string()))?;
        Ok(row.map(tool_from_row))
    }

    async fn tools_for_agent(&self, agent_id: Uuid) -> Result<Vec<Tool>> {
        let rows = sqlx::query_as::<_, ToolRow>(
            r#"
            SELECT id, agent_id, name, description, parameters,
                   allow_usage_when_untrusted_data_is_present, data_is_trusted_by_default, mcp_endpoint
            FROM tools WHERE agent_id = $1
            ORDER BY name ASC
            "#,
        )
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GatewayError::repository(e.to_string()))?;
        Ok(rows.into_iter().map(tool_from_row).collect())
    }

    async fn upsert_tool(&self, request: UpsertToolRequest) -> Result<Tool> {
        // Re-declaring an existing tool never changes its trust defaults.
        let row = sqlx::query_as::<_, ToolRow>(
            r#"
            INSERT INTO tools (id, agent_id, name, description, parameters,
                                allow_usage_when_untrusted_data_is_present, data_is_trusted_by_default,
                                mcp_endpoint)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (agent_id, name) DO UPDATE SET
                description = EXCLUDED.description,
                parameters = EXCLUDED.parameters
            RETURNING id, agent_id, name, description, parameters,
                      allow_usage_when_untrusted_data_is_present, data_is_trusted_by_default, mcp_endpoint
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(request.agent_id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(&request.parameters)
        .bind(request.allow_usage_when_untrusted_data_is_present)
        .bind(request.data_is_trusted_by_default)
        .bind(&request.mcp_endpoint)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| GatewayError::repository(e.to_string()))?;

        Ok(tool_from_row(row))
    }

    async fn trusted_data_policies_for_agent_and_tool(
        &self,
        agent_id: Uuid,
        tool_id: Uuid,
    ) -> Result<Vec<TrustedDataPolicy>> {
        let rows = sqlx::query_as::<_, TrustedDataPolicyRow>(
            r#"
            SELECT p.id, p.tool_id, p.attribute_path, p.operator, p.value, p.action, p.description
            FROM trusted_data_policies p
            JOIN agent_trusted_data_policies a ON a.policy_id = p.id
            WHERE a.agent_id = $1 AND p.tool_id = $2
            "#,
        )
        .bind(agent_id)
        .bind(tool_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GatewayError::repository(e.to_string()))?;

        rows.into_iter().map(policy_from_row).collect()
    }

    async fn create_trusted_data_policy(
        &self,
        request: CreateTrustedDataPolicyRequest,
    ) -> Result<TrustedDataPolicy> {
        let row = sqlx::query_as::<_, TrustedDataPolicyRow>(
            r#"
            INSERT INTO trusted_data_policies (id, tool_id, attribute_path, operator, value, action, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, tool_id, attribute_path, operator, value, action, description
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(request.tool_id)
        .bind(&request.attribute_path)
        .bind(to_text(&request.operator))
        .bind(&request.value)
        .bind(to_text(&request.action))
        .bind(&request.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| GatewayError::repository(e.to_string()))?;

        policy_from_row(row)
    }

    async fn tool_invocation_policies(
        &self,
        agent_id: Uuid,
        tool_name: &str,
    ) -> Result<Vec<ToolInvocationPolicy>> {
        let rows = sqlx::query_as::<_, ToolInvocationPolicyRow>(
            r#"
            SELECT id, agent_id, tool_name, condition, action, description
            FROM tool_invocation_policies
            WHERE agent_id = $1 AND tool_name = $2
            "#,
        )
        .bind(agent_id)
        .bind(tool_name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GatewayError::repository(e.to_string()))?;

        rows.into_iter().map(invocation_policy_from_row).collect()
    }

    async fn create_tool_invocation_policy(
        &self,
        request: CreateToolInvocationPolicyRequest,
    ) -> Result<ToolInvocationPolicy> {
        let row = sqlx::query_as::<_, ToolInvocationPolicyRow>(
            r#"
            INSERT INTO tool_invocation_policies (id, agent_id, tool_name, condition, action, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, agent_id, tool_name, condition, action, description
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(request.agent_id)
        .bind(&request.tool_name)
        .bind(&request.condition)
        .bind(to_text(&request.action))
        .bind(&request.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| GatewayError::repository(e.to_string()))?;

        invocation_policy_from_row(row)
    }

    async fn create_interaction(&self, create: CreateInteraction) -> Result<Interaction> {
        let row = sqlx::query_as::<_, InteractionRow>(
            r#"
            INSERT INTO interactions (id, agent_id, chat_id, type, request, response,
                                       input_tokens, output_tokens, content, trusted, blocked, reason, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, NOW())
            RETURNING id, agent_id, chat_id, type, request, response,
                      input_tokens, output_tokens, content, trusted, blocked, reason, created_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(create.agent_id)
        .bind(create.chat_id)
        .bind(&create.r#type)
        .bind(&create.request)
        .bind(&create.response)
        .bind(create.input_tokens)
        .bind(create.output_tokens)
        .bind(&create.content)
        .bind(create.trusted)
        .bind(create.blocked)
        .bind(&create.reason)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| GatewayError::repository(e.to_string()))?;

        Ok(interaction_from_row(row))
    }

    async fn interactions_for_chat(&self, chat_id: Uuid) -> Result<Vec<Interaction>> {
        let rows = sqlx::query_as::<_, InteractionRow>(
            r#"
            SELECT id, agent_id, chat_id, type, request, response,
                   input_tokens, output_tokens, content, trusted, blocked, reason, created_at
            FROM interactions
            WHERE chat_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GatewayError::repository(e.to_string()))?;

        Ok(rows.into_iter().map(interaction_from_row).collect())
    }

    async fn limits_for_entity(&self, entity_type: EntityType, entity_id: Uuid) -> Result<Vec<Limit>> {
        let rows = sqlx::query_as::<_, LimitRow>(
            r#"
            SELECT id, entity_type, entity_id, limit_type, model, limit_value,
                   current_usage_tokens_in, current_usage_tokens_out, last_cleanup, updated_at
            FROM limits
            WHERE entity_type = $1 AND entity_id = $2
            "#,
        )
        .bind(to_text(&entity_type))
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GatewayError::repository(e.to_string()))?;

        rows.into_iter().map(limit_from_row).collect()
    }

    async fn create_limit(&self, request: CreateLimitRequest) -> Result<Limit> {
        let row = sqlx::query_as::<_, LimitRow>(
            r#"
            INSERT INTO limits (id, entity_type, entity_id, limit_type, model, limit_value,
                                 current_usage_tokens_in, current_usage_tokens_out, last_cleanup, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, 0, 0, NULL, NOW())
            RETURNING id, entity_type, entity_id, limit_type, model, limit_value,
                      current_usage_tokens_in, current_usage_tokens_out, last_cleanup, updated_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(to_text(&request.entity_type))
        .bind(request.entity_id)
        .bind(Limit::TOKEN_COST)
        .bind(&request.model)
        .bind(request.limit_value)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| GatewayError::repository(e.to_string()))?;

        limit_from_row(row)
    }

    async fn token_price(&self, model: &str) -> Result<Option<TokenPrice>> {
        let row = sqlx::query_as::<_, TokenPriceRow>(
            "SELECT model, price_per_million_input, price_per_million_output FROM token_prices WHERE model = $1",
        )
        .bind(model)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| GatewayError::repository(e.to_string()))?;

        Ok(row.map(|r| TokenPrice {
            model: r.model,
            price_per_million_input: r.price_per_million_input,
            price_per_million_output: r.price_per_million_output,
        }))
    }

    async fn increment_limit_usage(&self, limit_id: Uuid, tokens_in: i64, tokens_out: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE limits
            SET current_usage_tokens_in = current_usage_tokens_in + $2,
                current_usage_tokens_out = current_usage_tokens_out + $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(limit_id)
        .bind(tokens_in)
        .bind(tokens_out)
        .execute(&self.pool)
        .await
        .map_err(|e| GatewayError::repository(e.to_string()))?;

        Ok(())
    }

    async fn sweep_reset_limits(&self, org_id: Uuid, interval: chrono::Duration) -> Result<u64> {
        let cutoff = Utc::now() - interval;
        let result = sqlx::query(
            r#"
            UPDATE limits
            SET current_usage_tokens_in = 0, current_usage_tokens_out = 0, last_cleanup = NOW()
            WHERE entity_type = 'organization' AND entity_id = $1
              AND (last_cleanup IS NULL OR last_cleanup < $2)
            "#,
        )
        .bind(org_id)
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(|e| GatewayError::repository(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn replace_agent_prompts(
        &self,
        agent_id: Uuid,
        prompt_ids: Vec<Uuid>,
    ) -> Result<Vec<AgentPrompt>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| GatewayError::repository(e.to_string()))?;

        sqlx::query("DELETE FROM agent_prompts WHERE agent_id = $1")
            .bind(agent_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| GatewayError::repository(e.to_string()))?;

        let types: Vec<PromptTypeRow> = sqlx::query_as("SELECT id, type FROM prompts WHERE id = ANY($1)")
            .bind(&prompt_ids)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| GatewayError::repository(e.to_string()))?;
        let types: std::collections::HashMap<Uuid, String> =
            types.into_iter().map(|r| (r.id, r.r#type)).collect();

        // The system prompt, if present, is always order 0; every regular
        // prompt is numbered 1.. in its input order, independent of where
        // a system prompt falls in that same list.
        let mut next_regular_order = 1;
        let mut result = Vec::with_capacity(prompt_ids.len());
        for prompt_id in prompt_ids {
            let order = match types.get(&prompt_id).map(String::as_str) {
                Some("system") => 0,
                _ => {
                    let order = next_regular_order;
                    next_regular_order += 1;
                    order
                }
            };

            let row = sqlx::query_as::<_, AgentPromptRow>(
                r#"
                INSERT INTO agent_prompts (id, agent_id, prompt_id, "order")
                VALUES ($1, $2, $3, $4)
                RETURNING id, agent_id, prompt_id, "order"
                "#,
            )
            .bind(Uuid::now_v7())
            .bind(agent_id)
            .bind(prompt_id)
            .bind(order)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| GatewayError::repository(e.to_string()))?;

            result.push(AgentPrompt {
                id: row.id,
                agent_id: row.agent_id,
                prompt_id: row.prompt_id,
                order: row.order,
            });
        }

        tx.commit().await.map_err(|e| GatewayError::repository(e.to_string()))?;
        Ok(result)
    }

    async fn prompts_for_agent(&self, agent_id: Uuid) -> Result<Vec<Prompt>> {
        let rows = sqlx::query_as::<_, PromptRow>(
            r#"
            SELECT p.id, p.org_id, p.name, p.type, p.content, p.version, p.parent_prompt_id,
                   p.is_active, p.created_by, p.created_at, p.updated_at
            FROM prompts p
            JOIN agent_prompts ap ON ap.prompt_id = p.id
            WHERE ap.agent_id = $1
            ORDER BY ap."order" ASC
            "#,
        )
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GatewayError::repository(e.to_string()))?;

        rows.into_iter().map(prompt_from_row).collect()
    }
}

/// Atomically deactivate the current active prompt and insert the new
/// version. Not part of the `Repository` trait itself since only the
/// admin surface needs it.
impl Database {
    pub async fn update_prompt(
        &self,
        org_id: Uuid,
        name: &str,
        prompt_type: &str,
        content: String,
        created_by: Uuid,
    ) -> Result<Prompt> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| GatewayError::repository(e.to_string()))?;

        let current = sqlx::query_as::<_, PromptRow>(
            r#"
            SELECT id, org_id, name, type, content, version, parent_prompt_id,
                   is_active, created_by, created_at, updated_at
            FROM prompts
            WHERE org_id = $1 AND name = $2 AND type = $3 AND is_active = TRUE
            "#,
        )
        .bind(org_id)
        .bind(name)
        .bind(prompt_type)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| GatewayError::repository(e.to_string()))?;

        let (next_version, parent_id) = match &current {
            Some(row) => (row.version + 1, Some(row.id)),
            None => (1, None),
        };

        if let Some(row) = &current {
            sqlx::query("UPDATE prompts SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
                .bind(row.id)
                .execute(&mut *tx)
                .await
                .map_err(|e| GatewayError::repository(e.to_string()))?;
        }

        let row = sqlx::query_as::<_, PromptRow>(
            r#"
            INSERT INTO prompts (id, org_id, name, type, content, version, parent_prompt_id,
                                  is_active, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, $8, NOW(), NOW())
            RETURNING id, org_id, name, type, content, version, parent_prompt_id,
                      is_active, created_by, created_at, updated_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(org_id)
        .bind(name)
        .bind(prompt_type)
        .bind(&content)
        .bind(next_version)
        .bind(parent_id)
        .bind(&created_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| GatewayError::repository(e.to_string()))?;

        tx.commit().await.map_err(|e| GatewayError::repository(e.to_string()))?;
        prompt_from_row(row)
    }

    pub async fn get_prompt(&self, prompt_id: Uuid) -> Result<Option<Prompt>> {
        let row = sqlx::query_as::<_, PromptRow>(
            r#"
            SELECT id, org_id, name, type, content, version, parent_prompt_id,
                   is_active, created_by, created_at, updated_at
            FROM prompts WHERE id = $1
            "#,
        )
        .bind(prompt_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| GatewayError::repository(e.to_string()))?;
        row.map(prompt_from_row).transpose()
    }

    /// Admin-only: create the first version of a prompt. Just
    /// `update_prompt` with no existing active row under the hood.
    pub async fn create_prompt(&self, request: gateway_contracts::CreatePromptRequest) -> Result<Prompt> {
        self.update_prompt(
            request.org_id,
            &request.name,
            &to_text(&request.r#type),
            request.content,
            request.created_by,
        )
        .await
    }

    /// Admin-only: look a prompt up by id to find the (org, name, type)
    /// it versions, then delegate to `update_prompt`.
    pub async fn update_prompt_by_id(
        &self,
        prompt_id: Uuid,
        request: gateway_contracts::UpdatePromptRequest,
    ) -> Result<Option<Prompt>> {
        let Some(current) = self.get_prompt(prompt_id).await? else {
            return Ok(None);
        };
        let prompt_type = to_text(&current.r#type);
        self.update_prompt(current.org_id, &current.name, &prompt_type, request.content, request.created_by)
            .await
            .map(Some)
    }

    /// Admin-only: agent CRUD beyond the implicit
    /// `get_or_create_default_agent` the proxy path uses, not part of
    /// `Repository` since only the admin surface needs it.
    pub async fn create_agent(&self, request: gateway_contracts::CreateAgentRequest) -> Result<Agent> {
        let labels = serde_json::to_value(&request.labels)
            .map_err(|e| GatewayError::repository(format!("invalid labels: {e}")))?;

        let row = sqlx::query_as::<_, AgentRow>(
            r#"
            INSERT INTO agents (id, name, labels, team_ids)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, labels, team_ids
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&request.name)
        .bind(&labels)
        .bind(&request.team_ids)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| GatewayError::repository(e.to_string()))?;

        agent_from_row(row)
    }

    pub async fn update_agent(
        &self,
        agent_id: Uuid,
        request: gateway_contracts::UpdateAgentRequest,
    ) -> Result<Option<Agent>> {
        let current = match self.get_agent(agent_id).await? {
            Some(agent) => agent,
            None => return Ok(None),
        };

        let name = request.name.unwrap_or(current.name);
        let labels = request.labels.unwrap_or(current.labels);
        let team_ids = request.team_ids.unwrap_or(current.team_ids);
        let labels_json = serde_json::to_value(&labels)
            .map_err(|e| GatewayError::repository(format!("invalid labels: {e}")))?;

        let row = sqlx::query_as::<_, AgentRow>(
            r#"
            UPDATE agents SET name = $2, labels = $3, team_ids = $4
            WHERE id = $1
            RETURNING id, name, labels, team_ids
            "#,
        )
        .bind(agent_id)
        .bind(&name)
        .bind(&labels_json)
        .bind(&team_ids)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| GatewayError::repository(e.to_string()))?;

        Ok(Some(agent_from_row(row)?))
    }
}
