// Integration tests for the Archgate gateway API.
// Run with: cargo test --test integration_test -- --ignored
// (requires a running gateway-api against a live Postgres database)

use gateway_contracts::{
    Agent, AgentPrompt, CreateAgentRequest, CreateLimitRequest, CreatePromptRequest,
    CreateToolInvocationPolicyRequest, CreateTrustedDataPolicyRequest, EntityType, Limit,
    Operator, Prompt, PromptType, ReplaceAgentPromptsRequest, Tool, ToolInvocationAction,
    ToolInvocationPolicy, TrustAction, TrustedDataPolicy, UpsertToolRequest,
};
use serde_json::json;
use uuid::Uuid;

const API_BASE_URL: &str = "http://localhost:9000";

#[tokio::test]
#[ignore]
async fn test_health_endpoint() {
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{API_BASE_URL}/health"))
        .send()
        .await
        .expect("failed to call health endpoint");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("failed to parse response");
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
#[ignore]
async fn test_openapi_spec() {
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{API_BASE_URL}/api-doc/openapi.json"))
        .send()
        .await
        .expect("failed to get OpenAPI spec");

    assert_eq!(response.status(), 200);
    let spec: serde_json::Value = response.json().await.expect("failed to parse spec");
    assert_eq!(spec["info"]["title"], "Archgate Gateway API");
}

#[tokio::test]
#[ignore]
async fn test_agent_crud_workflow() {
    let client = reqwest::Client::new();

    let create_response = client
        .post(format!("{API_BASE_URL}/v1/agents"))
        .json(&CreateAgentRequest {
            name: "billing-assistant".into(),
            labels: vec![],
            team_ids: vec![],
        })
        .send()
        .await
        .expect("failed to create agent");
    assert_eq!(create_response.status(), 201);
    let agent: Agent = create_response.json().await.expect("failed to parse agent");
    assert_eq!(agent.name, "billing-assistant");

    let get_response = client
        .get(format!("{API_BASE_URL}/v1/agents/{}", agent.id))
        .send()
        .await
        .expect("failed to get agent");
    assert_eq!(get_response.status(), 200);
    let fetched: Agent = get_response.json().await.expect("failed to parse agent");
    assert_eq!(fetched.id, agent.id);

    let update_response = client
        .patch(format!("{API_BASE_URL}/v1/agents/{}", agent.id))
        .json(&json!({ "name": "billing-assistant-v2" }))
        .send()
        .await
        .expect("failed to update agent");
    assert_eq!(update_response.status(), 200);
    let updated: Agent = update_response.json().await.expect("failed to parse agent");
    assert_eq!(updated.name, "billing-assistant-v2");

    let missing_response = client
        .get(format!("{API_BASE_URL}/v1/agents/{}", Uuid::now_v7()))
        .send()
        .await
        .expect("failed to request missing agent");
    assert_eq!(missing_response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_prompt_versioning_workflow() {
    let client = reqwest::Client::new();

    let agent_response = client
        .post(format!("{API_BASE_URL}/v1/agents"))
        .json(&CreateAgentRequest {
            name: "prompt-test-agent".into(),
            labels: vec![],
            team_ids: vec![],
        })
        .send()
        .await
        .expect("failed to create agent");
    let agent: Agent = agent_response.json().await.expect("failed to parse agent");

    let org_id = Uuid::now_v7();
    let created_by = Uuid::now_v7();

    let create_response = client
        .post(format!("{API_BASE_URL}/v1/prompts"))
        .json(&CreatePromptRequest {
            org_id,
            name: "support-system-prompt".into(),
            r#type: PromptType::System,
            content: "You are a support agent.".into(),
            created_by,
        })
        .send()
        .await
        .expect("failed to create prompt");
    assert_eq!(create_response.status(), 201);
    let prompt: Prompt = create_response.json().await.expect("failed to parse prompt");
    assert_eq!(prompt.version, 1);
    assert!(prompt.is_active);

    let update_response = client
        .patch(format!("{API_BASE_URL}/v1/prompts/{}", prompt.id))
        .json(&json!({ "content": "You are a support agent, v2.", "created_by": created_by }))
        .send()
        .await
        .expect("failed to update prompt");
    assert_eq!(update_response.status(), 200);
    let new_version: Prompt = update_response.json().await.expect("failed to parse prompt");
    assert_eq!(new_version.version, 2);
    assert_eq!(new_version.parent_prompt_id, Some(prompt.id));

    let attach_response = client
        .put(format!("{API_BASE_URL}/v1/agents/{}/prompts", agent.id))
        .json(&ReplaceAgentPromptsRequest {
            prompt_ids: vec![new_version.id],
        })
        .send()
        .await
        .expect("failed to attach prompts");
    assert_eq!(attach_response.status(), 200);
    let attached: Vec<AgentPrompt> = attach_response.json().await.expect("failed to parse agent prompts");
    assert_eq!(attached.len(), 1);
    assert_eq!(attached[0].order, 0, "a system prompt is always attached at order 0");

    let regular_response = client
        .post(format!("{API_BASE_URL}/v1/prompts"))
        .json(&CreatePromptRequest {
            org_id,
            name: "support-followup-prompt".into(),
            r#type: PromptType::Regular,
            content: "Ask a clarifying question if needed.".into(),
            created_by,
        })
        .send()
        .await
        .expect("failed to create regular prompt");
    assert_eq!(regular_response.status(), 201);
    let regular: Prompt = regular_response.json().await.expect("failed to parse prompt");

    // A regular prompt listed ahead of the system prompt still yields
    // order=0 for the system prompt and order=1 for the regular one —
    // order is keyed by prompt type, not raw list position.
    let reorder_response = client
        .put(format!("{API_BASE_URL}/v1/agents/{}/prompts", agent.id))
        .json(&ReplaceAgentPromptsRequest {
            prompt_ids: vec![regular.id, new_version.id],
        })
        .send()
        .await
        .expect("failed to attach prompts");
    assert_eq!(reorder_response.status(), 200);
    let reordered: Vec<AgentPrompt> = reorder_response.json().await.expect("failed to parse agent prompts");
    assert_eq!(reordered.len(), 2);
    let system_attachment = reordered.iter().find(|p| p.prompt_id == new_version.id).unwrap();
    let regular_attachment = reordered.iter().find(|p| p.prompt_id == regular.id).unwrap();
    assert_eq!(system_attachment.order, 0, "system prompt stays order 0 regardless of list position");
    assert_eq!(regular_attachment.order, 1, "regular prompt is numbered 1.. in input order");

    let list_response = client
        .get(format!("{API_BASE_URL}/v1/agents/{}/prompts", agent.id))
        .send()
        .await
        .expect("failed to list agent prompts");
    assert_eq!(list_response.status(), 200);
    let prompts: Vec<Prompt> = list_response.json().await.expect("failed to parse prompts");
    assert_eq!(prompts.len(), 2);
    assert!(prompts.iter().any(|p| p.id == new_version.id));
    assert!(prompts.iter().any(|p| p.id == regular.id));
}

#[tokio::test]
#[ignore]
async fn test_limit_workflow() {
    let client = reqwest::Client::new();

    let agent_response = client
        .post(format!("{API_BASE_URL}/v1/agents"))
        .json(&CreateAgentRequest {
            name: "limit-test-agent".into(),
            labels: vec![],
            team_ids: vec![],
        })
        .send()
        .await
        .expect("failed to create agent");
    let agent: Agent = agent_response.json().await.expect("failed to parse agent");

    let create_response = client
        .post(format!("{API_BASE_URL}/v1/limits"))
        .json(&CreateLimitRequest {
            entity_type: EntityType::Agent,
            entity_id: agent.id,
            model: None,
            limit_value: 1_000_000.0,
        })
        .send()
        .await
        .expect("failed to create limit");
    assert_eq!(create_response.status(), 201);
    let limit: Limit = create_response.json().await.expect("failed to parse limit");
    assert_eq!(limit.limit_type, Limit::TOKEN_COST);
    assert_eq!(limit.token_total(), 0);

    let list_response = client
        .get(format!("{API_BASE_URL}/v1/limits/agent/{}", agent.id))
        .send()
        .await
        .expect("failed to list limits");
    assert_eq!(list_response.status(), 200);
    let limits: Vec<Limit> = list_response.json().await.expect("failed to parse limits");
    assert!(limits.iter().any(|l| l.id == limit.id));
}

#[tokio::test]
#[ignore]
async fn test_tool_and_policy_workflow() {
    let client = reqwest::Client::new();

    let agent_response = client
        .post(format!("{API_BASE_URL}/v1/agents"))
        .json(&CreateAgentRequest {
            name: "tool-test-agent".into(),
            labels: vec![],
            team_ids: vec![],
        })
        .send()
        .await
        .expect("failed to create agent");
    let agent: Agent = agent_response.json().await.expect("failed to parse agent");

    let tool_response = client
        .put(format!("{API_BASE_URL}/v1/tools"))
        .json(&UpsertToolRequest {
            agent_id: agent.id,
            name: "search_kb".into(),
            description: "Search the knowledge base".into(),
            parameters: json!({"type": "object", "properties": {"query": {"type": "string"}}}),
            allow_usage_when_untrusted_data_is_present: false,
            data_is_trusted_by_default: false,
            mcp_endpoint: Some("http://mcp.local/search_kb".into()),
        })
        .send()
        .await
        .expect("failed to upsert tool");
    assert_eq!(tool_response.status(), 200);
    let tool: Tool = tool_response.json().await.expect("failed to parse tool");
    assert_eq!(tool.name, "search_kb");

    let get_tool_response = client
        .get(format!("{API_BASE_URL}/v1/tools/{}", tool.id))
        .send()
        .await
        .expect("failed to get tool");
    assert_eq!(get_tool_response.status(), 200);

    let tools_for_agent_response = client
        .get(format!("{API_BASE_URL}/v1/agents/{}/tools", agent.id))
        .send()
        .await
        .expect("failed to list tools for agent");
    let tools: Vec<Tool> = tools_for_agent_response.json().await.expect("failed to parse tools");
    assert!(tools.iter().any(|t| t.id == tool.id));

    let trust_policy_response = client
        .post(format!("{API_BASE_URL}/v1/trusted_data_policies"))
        .json(&CreateTrustedDataPolicyRequest {
            tool_id: tool.id,
            attribute_path: "source".into(),
            operator: Operator::Equal,
            value: json!("internal"),
            action: TrustAction::MarkAsTrusted,
            description: "internal sources are trusted".into(),
        })
        .send()
        .await
        .expect("failed to create trusted data policy");
    assert_eq!(trust_policy_response.status(), 201);
    let trust_policy: TrustedDataPolicy = trust_policy_response.json().await.expect("failed to parse policy");

    let trust_policies_response = client
        .get(format!(
            "{API_BASE_URL}/v1/agents/{}/tools/{}/trusted_data_policies",
            agent.id, tool.id
        ))
        .send()
        .await
        .expect("failed to list trusted data policies");
    let trust_policies: Vec<TrustedDataPolicy> =
        trust_policies_response.json().await.expect("failed to parse policies");
    assert!(trust_policies.iter().any(|p| p.id == trust_policy.id));

    let invocation_policy_response = client
        .post(format!("{API_BASE_URL}/v1/tool_invocation_policies"))
        .json(&CreateToolInvocationPolicyRequest {
            agent_id: agent.id,
            tool_name: tool.name.clone(),
            condition: None,
            action: ToolInvocationAction::RequireTrustedContext,
            description: "never call search_kb with untrusted context".into(),
        })
        .send()
        .await
        .expect("failed to create invocation policy");
    assert_eq!(invocation_policy_response.status(), 201);
    let invocation_policy: ToolInvocationPolicy =
        invocation_policy_response.json().await.expect("failed to parse policy");

    let invocation_policies_response = client
        .get(format!(
            "{API_BASE_URL}/v1/agents/{}/tools/{}/invocation_policies",
            agent.id, tool.name
        ))
        .send()
        .await
        .expect("failed to list invocation policies");
    let invocation_policies: Vec<ToolInvocationPolicy> =
        invocation_policies_response.json().await.expect("failed to parse policies");
    assert!(invocation_policies.iter().any(|p| p.id == invocation_policy.id));
}
