// Agent DTOs — the unit of policy scoping.
//
// An Agent owns prompts, tools, and opts in to trusted-data policies.
// Labels are key/value pairs and are always returned sorted by key by
// the repository, never by callers.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Agent {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub team_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct Label {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateAgentRequest {
    pub name: String,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub team_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateAgentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<Label>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub org_id: Uuid,
}

/// Cleanup cadence for an organization's quota reset sweep (§4.5).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LimitCleanupInterval {
    OneHour,
    TwelveHours,
    TwentyFourHours,
    OneWeek,
    OneMonth,
}

impl Default for LimitCleanupInterval {
    fn default() -> Self {
        LimitCleanupInterval::OneHour
    }
}

impl LimitCleanupInterval {
    /// The interval as a fixed `chrono::Duration`. "One month" is treated
    /// as a calendar-agnostic 30 days, matching the other fixed intervals.
    pub fn as_duration(&self) -> chrono::Duration {
        match self {
            LimitCleanupInterval::OneHour => chrono::Duration::hours(1),
            LimitCleanupInterval::TwelveHours => chrono::Duration::hours(12),
            LimitCleanupInterval::TwentyFourHours => chrono::Duration::hours(24),
            LimitCleanupInterval::OneWeek => chrono::Duration::weeks(1),
            LimitCleanupInterval::OneMonth => chrono::Duration::days(30),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub limit_cleanup_interval: LimitCleanupInterval,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cleanup_interval_is_one_hour() {
        assert_eq!(LimitCleanupInterval::default(), LimitCleanupInterval::OneHour);
    }

    #[test]
    fn one_month_is_thirty_days() {
        assert_eq!(
            LimitCleanupInterval::OneMonth.as_duration(),
            chrono::Duration::days(30)
        );
    }
}
