// Policy engine and proxy-support abstractions for the Archgate gateway.
//
// Key design decisions:
// - Repository trait keeps persistence DB-agnostic; gateway-storage provides the sqlx impl.
// - Attribute Evaluator is the shared primitive behind both policy engines.
// - Dual-LLM isolation never lets untrusted bytes reach the primary model.
// - Error handling distinguishes caller-visible kinds from internal, logged-and-swallowed ones.

pub mod attribute;
pub mod config;
pub mod dual_llm;
pub mod error;
pub mod llm;
pub mod quota;
pub mod refusal;
pub mod repository;
pub mod tool_invocation;
pub mod trust;

pub use config::GatewayConfig;
pub use error::{GatewayError, Result};
pub use refusal::{AuditRefusal, RefusalPair, UserRefusal};
pub use repository::Repository;
