// Quota DTOs.
//
// Invariant: current_usage_* is monotonically non-decreasing between
// resets; last_cleanup is advanced only by the reset sweep.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Organization,
    Team,
    Agent,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Limit {
    pub id: Uuid,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    /// The only limit_type in this spec is "token_cost"; kept as a
    /// string to leave room for future limit kinds without a migration.
    pub limit_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub limit_value: f64,
    pub current_usage_tokens_in: i64,
    pub current_usage_tokens_out: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_cleanup: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Limit {
    pub const TOKEN_COST: &'static str = "token_cost";

    /// Accumulated usage compared against `limit_value`: raw tokens when
    /// `model` is unset, dollars (via TokenPrice) otherwise. See
    /// `gateway-core::quota` for the dollar conversion.
    pub fn token_total(&self) -> i64 {
        self.current_usage_tokens_in + self.current_usage_tokens_out
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateLimitRequest {
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub limit_value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenPrice {
    pub model: String,
    pub price_per_million_input: f64,
    pub price_per_million_output: f64,
}

impl TokenPrice {
    pub fn cost(&self, tokens_in: i64, tokens_out: i64) -> f64 {
        let input_cost = tokens_in as f64 * self.price_per_million_input / 1_000_000.0;
        let output_cost = tokens_out as f64 * self.price_per_million_output / 1_000_000.0;
        input_cost + output_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_price_computes_blended_cost() {
        let price = TokenPrice {
            model: "claude-opus".into(),
            price_per_million_input: 15.0,
            price_per_million_output: 75.0,
        };
        // 1M in, 1M out -> 15 + 75
        assert_eq!(price.cost(1_000_000, 1_000_000), 90.0);
    }

    #[test]
    fn limit_token_total_sums_in_and_out() {
        let limit = Limit {
            id: Uuid::nil(),
            entity_type: EntityType::Agent,
            entity_id: Uuid::nil(),
            limit_type: Limit::TOKEN_COST.to_string(),
            model: None,
            limit_value: 1000.0,
            current_usage_tokens_in: 600,
            current_usage_tokens_out: 500,
            last_cleanup: None,
            updated_at: Utc::now(),
        };
        assert_eq!(limit.token_total(), 1100);
    }
}
