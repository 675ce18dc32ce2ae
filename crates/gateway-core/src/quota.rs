// Quota Enforcement.
//
// Pre-flight check against per-entity token-cost limits in agent -> team
// -> organization priority order; post-flight atomic increment; a
// best-effort reset sweep driven by each organization's cleanup
// interval.

use std::sync::Arc;

use chrono::Utc;
use gateway_contracts::{EntityType, Limit};
use uuid::Uuid;

use crate::error::Result;
use crate::refusal::RefusalPair;
use crate::repository::Repository;

/// Resolve the agent's governing limits in priority order and check each
/// against its current usage. Returns the first exceeded limit's refusal,
/// or `None` if every applicable limit has headroom. Also runs the
/// organization's reset sweep first, so a stale limit doesn't spuriously
/// refuse.
pub async fn pre_check(
    repo: &Arc<dyn Repository>,
    agent_id: Uuid,
    org_id: Uuid,
    cleanup_interval: chrono::Duration,
) -> Result<Option<RefusalPair>> {
    if let Err(err) = repo.sweep_reset_limits(org_id, cleanup_interval).await {
        tracing::warn!(%org_id, error = %err, "quota reset sweep failed, continuing with stale counters");
    }

    for limit in governing_limits(repo, agent_id, org_id).await? {
        if let Some(refusal) = check_limit(repo, &limit).await? {
            return Ok(Some(refusal));
        }
    }
    Ok(None)
}

/// Agent limits first, then each team's limits, then (if the agent has
/// no teams) the organization's limits.
async fn governing_limits(repo: &Arc<dyn Repository>, agent_id: Uuid, org_id: Uuid) -> Result<Vec<Limit>> {
    let mut limits = repo.limits_for_entity(EntityType::Agent, agent_id).await?;

    let teams = repo.teams_for_agent(agent_id).await?;
    if teams.is_empty() {
        limits.extend(repo.limits_for_entity(EntityType::Organization, org_id).await?);
    } else {
        for team in teams {
            limits.extend(repo.limits_for_entity(EntityType::Team, team.id).await?);
        }
    }

    Ok(limits.into_iter().filter(|l| l.limit_type == Limit::TOKEN_COST).collect())
}

async fn check_limit(repo: &Arc<dyn Repository>, limit: &Limit) -> Result<Option<RefusalPair>> {
    let exceeded = match &limit.model {
        None => limit.token_total() as f64 >= limit.limit_value,
        Some(model) => match repo.token_price(model).await? {
            Some(price) => {
                let cost = price.cost(limit.current_usage_tokens_in, limit.current_usage_tokens_out);
                cost >= limit.limit_value
            }
            None => {
                tracing::warn!(model, "no token price configured for priced limit, treating as not exceeded");
                false
            }
        },
    };

    if exceeded {
        return Ok(Some(RefusalPair::token_cost(
            limit.id.to_string(),
            "This agent has exceeded its configured usage limit.",
        )));
    }
    Ok(None)
}

/// Fire-and-forget post-completion increment: for every limit matching
/// `{(agent, agentId), (team, tᵢ), (organization, orgId)}` with
/// `limit_type='token_cost'`, atomically add the completed interaction's
/// token counts. Errors are logged and swallowed.
pub async fn apply_usage(
    repo: &Arc<dyn Repository>,
    agent_id: Uuid,
    org_id: Uuid,
    tokens_in: i64,
    tokens_out: i64,
) {
    let limits = match governing_limits(repo, agent_id, org_id).await {
        Ok(limits) => limits,
        Err(err) => {
            tracing::error!(error = %err, "quota_update_failure: could not resolve governing limits");
            return;
        }
    };

    for limit in limits {
        if let Err(err) = repo.increment_limit_usage(limit.id, tokens_in, tokens_out).await {
            tracing::error!(limit_id = %limit.id, error = %err, "quota_update_failure: increment failed");
        }
    }
}

/// Exposed for callers that want to time a sweep independent of a
/// pre-check (e.g. an admin endpoint or a scheduled task).
pub async fn run_reset_sweep(repo: &Arc<dyn Repository>, org_id: Uuid, cleanup_interval: chrono::Duration) -> Result<u64> {
    let count = repo.sweep_reset_limits(org_id, cleanup_interval).await?;
    if count > 0 {
        tracing::info!(%org_id, reset_count = count, at = %Utc::now(), "quota reset sweep completed");
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limit(limit_value: f64, tokens_in: i64, tokens_out: i64, model: Option<&str>) -> Limit {
        Limit {
            id: Uuid::nil(),
            entity_type: EntityType::Agent,
            entity_id: Uuid::nil(),
            limit_type: Limit::TOKEN_COST.to_string(),
            model: model.map(str::to_string),
            limit_value,
            current_usage_tokens_in: tokens_in,
            current_usage_tokens_out: tokens_out,
            last_cleanup: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn token_limit_exceeded_when_total_at_or_above_value() {
        let l = limit(1000.0, 600, 500, None);
        assert!(l.token_total() as f64 >= l.limit_value);
    }

    #[test]
    fn token_limit_not_exceeded_below_value() {
        let l = limit(1000.0, 100, 100, None);
        assert!((l.token_total() as f64) < l.limit_value);
    }
}
