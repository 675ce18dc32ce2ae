// Gateway startup configuration.
//
// Collected once at process start from environment variables into a
// typed struct; no module reaches back into `std::env` after startup.

use std::time::Duration;

use gateway_contracts::LimitCleanupInterval;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub database_url: String,
    pub admin_email: String,
    pub admin_password: String,
    pub anthropic_base_url: String,
    pub openai_base_url: String,
    pub request_deadline: Duration,
    pub upstream_deadline: Duration,
    /// Model identifier used for the Dual-LLM Evaluator's isolated,
    /// sandboxed secondary calls.
    pub secondary_model: String,
    pub default_limit_cleanup_interval: LimitCleanupInterval,
}

impl GatewayConfig {
    /// Build configuration from environment variables, applying the same
    /// defaults a fresh checkout would get from `.env.example`.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable required"))?;

        Ok(Self {
            database_url,
            admin_email: std::env::var("ADMIN_EMAIL")
                .unwrap_or_else(|_| "admin@localhost".to_string()),
            admin_password: std::env::var("ADMIN_PASSWORD")
                .unwrap_or_else(|_| "changeme".to_string()),
            anthropic_base_url: std::env::var("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|_| "https://api.anthropic.com".to_string()),
            openai_base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com".to_string()),
            request_deadline: Duration::from_secs(parse_env_u64("REQUEST_DEADLINE_SECS", 120)),
            upstream_deadline: Duration::from_secs(parse_env_u64("UPSTREAM_DEADLINE_SECS", 60)),
            secondary_model: std::env::var("SECONDARY_MODEL")
                .unwrap_or_else(|_| "claude-haiku-4-5".to_string()),
            default_limit_cleanup_interval: parse_cleanup_interval(
                std::env::var("DEFAULT_LIMIT_CLEANUP_INTERVAL").ok().as_deref(),
            ),
        })
    }
}

fn parse_env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_cleanup_interval(raw: Option<&str>) -> LimitCleanupInterval {
    match raw {
        Some("12h") => LimitCleanupInterval::TwelveHours,
        Some("24h") => LimitCleanupInterval::TwentyFourHours,
        Some("1w") => LimitCleanupInterval::OneWeek,
        Some("1m") => LimitCleanupInterval::OneMonth,
        _ => LimitCleanupInterval::OneHour,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecognised_interval_defaults_to_one_hour() {
        assert_eq!(parse_cleanup_interval(Some("bogus")), LimitCleanupInterval::OneHour);
        assert_eq!(parse_cleanup_interval(None), LimitCleanupInterval::OneHour);
    }

    #[test]
    fn recognised_intervals_parse() {
        assert_eq!(parse_cleanup_interval(Some("1w")), LimitCleanupInterval::OneWeek);
        assert_eq!(parse_cleanup_interval(Some("1m")), LimitCleanupInterval::OneMonth);
    }
}
