// Error types for the policy engine and repository boundary.
//
// `PolicyMatchFailure`,
// `QuotaUpdateFailure`, and `AuditPersistFailure` are never returned past
// their call site — callers log them (`tracing::warn!`/`error!`) and fall
// back to the safe default; they exist here only so call sites share one
// vocabulary instead of ad-hoc strings.

use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("repository error: {0}")]
    Repository(String),

    #[error("agent not found: {0}")]
    AgentNotFound(Uuid),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl GatewayError {
    pub fn validation(msg: impl Into<String>) -> Self {
        GatewayError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        GatewayError::NotFound(msg.into())
    }

    pub fn repository(msg: impl Into<String>) -> Self {
        GatewayError::Repository(msg.into())
    }

    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        GatewayError::Upstream {
            status,
            message: message.into(),
        }
    }

    pub fn agent_not_found(agent_id: Uuid) -> Self {
        GatewayError::AgentNotFound(agent_id)
    }
}
